//! The paged file store: a thin byte-level wrapper around a single OS
//! file whose length is always a multiple of [`PAGE_SIZE`].
//!
//! This crate deliberately does nothing clever. It has no cache, no
//! replacement policy, and no notion of a "dirty" page — it is the
//! external collaborator the buffer pool (`bufpool`) builds all of that
//! on top of. Every call is a direct seek + read/write against the
//! underlying file, flushed to the OS before returning.
//!
//! # Example
//!
//! ```no_run
//! use pagestore::{PagedFile, PAGE_SIZE};
//!
//! PagedFile::create("/tmp/example.db").unwrap();
//! let mut file = PagedFile::open("/tmp/example.db").unwrap();
//!
//! let mut buf = [0u8; PAGE_SIZE];
//! file.read_block(0, &mut buf).unwrap();
//! buf[0] = 42;
//! file.write_block(0, &buf).unwrap();
//! ```


use dbcore::{PageNum, StoreError, StoreResult};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Fixed size, in bytes, of every page in every table file.
pub const PAGE_SIZE: usize = 4096;

/// An open page file. Tracks the file's page count and a "current
/// position" cursor used by the relative read helpers, mirroring the
/// original storage manager's `SM_FileHandle`.
#[derive(Debug)]
pub struct PagedFile {
    file: File,
    name: String,
    total_pages: PageNum,
    cur_page: PageNum,
}

impl PagedFile {
    /// Create a new page file containing exactly one zero-filled page.
    /// Fails if a file already exists at `path` (callers that want
    /// idempotent creation should check first).
    pub fn create(path: impl AsRef<Path>) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(&[0u8; PAGE_SIZE])?;
        file.sync_data()?;
        Ok(())
    }

    /// Open an existing page file. The file's length must already be a
    /// multiple of [`PAGE_SIZE`]; this is not re-validated here.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        let total_pages = (len / PAGE_SIZE as u64) as PageNum;
        Ok(Self {
            file,
            name: path.display().to_string(),
            total_pages,
            cur_page: 0,
        })
    }

    /// Remove the page file at `path` from disk.
    pub fn destroy(path: impl AsRef<Path>) -> StoreResult<()> {
        std::fs::remove_file(path)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_pages(&self) -> PageNum {
        self.total_pages
    }

    pub fn cur_page(&self) -> PageNum {
        self.cur_page
    }

    fn check_range(&self, page_num: PageNum) -> StoreResult<()> {
        if page_num < 0 || page_num >= self.total_pages {
            return Err(StoreError::OutOfRangePage {
                page: page_num,
                total: self.total_pages,
            });
        }
        Ok(())
    }

    /// Read page `page_num` into `buf`, which must be exactly
    /// [`PAGE_SIZE`] bytes long. Updates the current-position cursor.
    pub fn read_block(&mut self, page_num: PageNum, buf: &mut [u8]) -> StoreResult<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "read buffer must be PAGE_SIZE bytes");
        self.check_range(page_num)?;
        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.read_exact(buf)?;
        self.cur_page = page_num;
        Ok(())
    }

    /// Write `buf` (exactly [`PAGE_SIZE`] bytes) to page `page_num`,
    /// flushing to the OS before returning. Updates the current-position
    /// cursor.
    pub fn write_block(&mut self, page_num: PageNum, buf: &[u8]) -> StoreResult<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "write buffer must be PAGE_SIZE bytes");
        self.check_range(page_num)?;
        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(buf)?;
        self.file.sync_data()?;
        self.cur_page = page_num;
        Ok(())
    }

    pub fn read_first(&mut self, buf: &mut [u8]) -> StoreResult<()> {
        self.read_block(0, buf)
    }

    pub fn read_previous(&mut self, buf: &mut [u8]) -> StoreResult<()> {
        if self.cur_page <= 0 {
            return Err(StoreError::OutOfRangePage {
                page: self.cur_page - 1,
                total: self.total_pages,
            });
        }
        self.read_block(self.cur_page - 1, buf)
    }

    pub fn read_current(&mut self, buf: &mut [u8]) -> StoreResult<()> {
        let cur = self.cur_page;
        self.read_block(cur, buf)
    }

    pub fn read_next(&mut self, buf: &mut [u8]) -> StoreResult<()> {
        if self.cur_page + 1 >= self.total_pages {
            return Err(StoreError::OutOfRangePage {
                page: self.cur_page + 1,
                total: self.total_pages,
            });
        }
        self.read_block(self.cur_page + 1, buf)
    }

    pub fn read_last(&mut self, buf: &mut [u8]) -> StoreResult<()> {
        if self.total_pages == 0 {
            return Err(StoreError::OutOfRangePage {
                page: 0,
                total: 0,
            });
        }
        let last = self.total_pages - 1;
        self.read_block(last, buf)
    }

    /// Extend the file by one zero-filled page and leave the cursor on
    /// it. Returns the new page's index.
    pub fn append_empty_block(&mut self) -> StoreResult<PageNum> {
        let page_num = self.total_pages;
        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;
        self.file.sync_data()?;
        self.total_pages += 1;
        self.cur_page = page_num;
        Ok(page_num)
    }

    /// Append empty pages until `total_pages >= n`.
    pub fn ensure_capacity(&mut self, n: PageNum) -> StoreResult<()> {
        while self.total_pages < n {
            self.append_empty_block()?;
        }
        Ok(())
    }
}
