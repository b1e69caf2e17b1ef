use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::debug;

use crate::types::{error::DatabaseError, PageId, PAGE_SIZE};

/// Page-granular access to the database file.
///
/// Every read and write moves exactly `PAGE_SIZE` bytes at offset
/// `page_id * PAGE_SIZE`. The file handle lives behind a mutex; callers
/// (the buffer pool) already serialize per-instance access, so the lock
/// is only contended across pool shards.
pub struct DiskManager {
    file: Mutex<File>,
    path: PathBuf,
}

impl DiskManager {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a page into the caller's buffer. A page that was allocated
    /// but never written lies past the end of the file; the missing tail
    /// is zero-filled so fresh pages always read as all zeroes.
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), DatabaseError> {
        if buf.len() != PAGE_SIZE {
            return Err(DatabaseError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }
        if page_id < 0 {
            return Err(DatabaseError::InvalidPageId(page_id));
        }

        let offset = page_id as u64 * PAGE_SIZE as u64;
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;

        let mut total = 0;
        while total < PAGE_SIZE {
            let n = file.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        if total < PAGE_SIZE {
            debug!(
                "short read of page {}: {} bytes, zero-filling the rest",
                page_id, total
            );
            buf[total..].fill(0);
        }
        Ok(())
    }

    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<(), DatabaseError> {
        if data.len() != PAGE_SIZE {
            return Err(DatabaseError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: data.len(),
            });
        }
        if page_id < 0 {
            return Err(DatabaseError::InvalidPageId(page_id));
        }

        let offset = page_id as u64 * PAGE_SIZE as u64;
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    /// Deallocation hook. The on-disk representation keeps no free map
    /// yet; deleted pages are simply left behind until a page with the
    /// same id is written again.
    pub fn deallocate_page(&self, page_id: PageId) {
        debug!("deallocate page {}", page_id);
    }
}
