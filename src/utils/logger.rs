use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes env_logger once per process. Tests call this first so
/// `RUST_LOG=debug cargo test` shows eviction and split traces.
pub fn init() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}
