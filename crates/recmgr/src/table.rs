//! The heap-file table handle: schema + free-list bookkeeping layered
//! on top of a private [`BufferPool`].

use crate::page::{self, Header};
use crate::record::Record;
use crate::schema::Schema;
use bufpool::{BufferPool, PageHandle, ReplacementStrategy};
use dbcore::{PageNum, Rid, StoreError, StoreResult, NO_PAGE};
use pagestore::{PagedFile, PAGE_SIZE};
use std::path::{Path, PathBuf};

const SCHEMA_PAGE: PageNum = 0;
const FIRST_DATA_PAGE: PageNum = 1;
const TEMP_POOL_FRAMES: usize = 3;

/// An open heap-file table: a schema, a private buffer pool over
/// `<name>.table`, and the free-list/tuple-count bookkeeping the record
/// manager's operations update as records come and go.
///
/// The free list is a singly linked chain of every data page threaded
/// through each page's `next_free_page` header field, rooted at page 1
/// and always growing at the tail (new pages are appended after the
/// current last page, never spliced in elsewhere) — see DESIGN.md for
/// why this departs from the original's head-splice, which only linked
/// a freshly appended page into the chain when page 1 itself was still
/// the cached free-list head. `first_free_page` is purely a search-start
/// hint: cheap to get wrong (worst case, insert walks a few extra full
/// pages before finding room), and reset conservatively to page 1 after
/// a reopen.
pub struct Table {
    name: String,
    data_dir: PathBuf,
    schema: Schema,
    pool: BufferPool,
    record_size: usize,
    slots_per_page: usize,
    num_tuples: u64,
    first_free_page: PageNum,
}

fn table_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(format!("{name}.table"))
}

impl Table {
    /// Create `<name>.table` in `data_dir`: a schema page, one empty
    /// data page, and nothing else.
    pub fn create(data_dir: impl AsRef<Path>, name: &str, schema: Schema) -> StoreResult<()> {
        let data_dir = data_dir.as_ref();
        let path = table_path(data_dir, name);
        let record_size = schema.record_size();
        let slots_per_page = page::slots_per_page(PAGE_SIZE, record_size);
        if slots_per_page == 0 {
            return Err(StoreError::Resource(format!(
                "record size {record_size} leaves no room for a single slot on a {PAGE_SIZE}-byte page"
            )));
        }
        let schema_bytes = schema.serialize()?;

        PagedFile::create(&path)?;
        let mut pool = BufferPool::open(&path, TEMP_POOL_FRAMES, ReplacementStrategy::Fifo)?;

        let write_pages = || -> StoreResult<()> {
            let h = pool_pin(&mut pool, SCHEMA_PAGE)?;
            pool.page_data_mut(&h)?.copy_from_slice(&schema_bytes);
            pool.mark_dirty(&h)?;
            pool.unpin(&h)?;

            let data_page = pool.append_empty_page()?;
            debug_assert_eq!(data_page, FIRST_DATA_PAGE);
            let h = pool_pin(&mut pool, data_page)?;
            page::write_header(
                pool.page_data_mut(&h)?,
                &Header {
                    slots_per_page: slots_per_page as i32,
                    free_slots: slots_per_page as i32,
                    next_free_page: NO_PAGE,
                },
            );
            pool.mark_dirty(&h)?;
            pool.unpin(&h)?;
            Ok(())
        };

        let result = write_pages();
        pool.shutdown().map_err(|(e, _)| e)?;
        result?;
        tracing::debug!(name, record_size, slots_per_page, "table created");
        Ok(())
    }

    /// Open an existing table, recomputing `num_tuples` and the
    /// free-list search-start hint by walking every reachable data page.
    pub fn open(data_dir: impl AsRef<Path>, name: &str) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let path = table_path(&data_dir, name);
        let mut pool = BufferPool::open(&path, TEMP_POOL_FRAMES, ReplacementStrategy::Fifo)?;

        let h = pool_pin(&mut pool, SCHEMA_PAGE)?;
        let schema = Schema::deserialize(pool.page_data(&h)?)?;
        pool.unpin(&h)?;

        let record_size = schema.record_size();
        let slots_per_page = page::slots_per_page(PAGE_SIZE, record_size);

        let mut num_tuples: u64 = 0;
        let mut first_free_page = FIRST_DATA_PAGE;
        let mut first_free_found = false;
        let mut page = FIRST_DATA_PAGE;
        while page != NO_PAGE {
            let h = pool_pin(&mut pool, page)?;
            let header = page::read_header(pool.page_data(&h)?);
            pool.unpin(&h)?;

            num_tuples += (header.slots_per_page - header.free_slots) as u64;
            if !first_free_found && header.free_slots > 0 {
                first_free_page = page;
                first_free_found = true;
            }
            page = header.next_free_page;
        }

        tracing::debug!(name, num_tuples, first_free_page, "table opened");
        Ok(Self {
            name: name.to_string(),
            data_dir,
            schema,
            pool,
            record_size,
            slots_per_page,
            num_tuples,
            first_free_page,
        })
    }

    /// Force-flush and release the table's buffer pool.
    pub fn close(self) -> StoreResult<()> {
        self.pool.shutdown().map_err(|(e, _)| e)
    }

    /// Remove `<name>.table` from `data_dir` entirely.
    pub fn delete(data_dir: impl AsRef<Path>, name: &str) -> StoreResult<()> {
        PagedFile::destroy(table_path(data_dir.as_ref(), name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn num_tuples(&self) -> u64 {
        self.num_tuples
    }

    pub(crate) fn pool_mut(&mut self) -> &mut BufferPool {
        &mut self.pool
    }

    pub fn insert(&mut self, record: &mut Record) -> StoreResult<Rid> {
        if record.data.len() != self.record_size {
            return Err(StoreError::Parameter(format!(
                "record payload is {} bytes, table expects {}",
                record.data.len(),
                self.record_size
            )));
        }

        let page = self.locate_free_page()?;
        let handle = pool_pin(&mut self.pool, page)?;
        let buf = self.pool.page_data_mut(&handle)?;
        let mut header = page::read_header(buf);
        let slot = (0..header.slots_per_page as usize)
            .find(|&s| !page::is_used(buf, s, self.record_size))
            .ok_or_else(|| {
                StoreError::Resource(format!(
                    "page {page} reported free_slots={} but no free tombstone was found",
                    header.free_slots
                ))
            })?;

        page::payload_mut(buf, slot, self.record_size).copy_from_slice(&record.data);
        page::set_used(buf, slot, self.record_size, true);
        header.free_slots -= 1;
        page::write_header(buf, &header);
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin(&handle)?;

        let rid = Rid::new(page, slot as i32);
        record.rid = rid;
        self.num_tuples += 1;
        Ok(rid)
    }

    pub fn delete(&mut self, rid: Rid) -> StoreResult<()> {
        let handle = self.pin_for_rid(rid)?;
        if self.slot_out_of_range(rid) {
            self.pool.unpin(&handle)?;
            return Err(StoreError::RecordNotFound(rid));
        }
        let buf = self.pool.page_data_mut(&handle)?;
        let slot = rid.slot as usize;
        if !page::is_used(buf, slot, self.record_size) {
            self.pool.unpin(&handle)?;
            return Err(StoreError::RecordNotFound(rid));
        }

        page::set_used(buf, slot, self.record_size, false);
        let mut header = page::read_header(buf);
        header.free_slots += 1;
        page::write_header(buf, &header);
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin(&handle)?;

        if rid.page < self.first_free_page {
            self.first_free_page = rid.page;
        }
        self.num_tuples -= 1;
        Ok(())
    }

    pub fn update(&mut self, record: &Record) -> StoreResult<()> {
        let rid = record.rid;
        if record.data.len() != self.record_size {
            return Err(StoreError::Parameter(format!(
                "record payload is {} bytes, table expects {}",
                record.data.len(),
                self.record_size
            )));
        }
        let handle = self.pin_for_rid(rid)?;
        if self.slot_out_of_range(rid) {
            self.pool.unpin(&handle)?;
            return Err(StoreError::RecordNotFound(rid));
        }
        let buf = self.pool.page_data_mut(&handle)?;
        let slot = rid.slot as usize;
        if !page::is_used(buf, slot, self.record_size) {
            self.pool.unpin(&handle)?;
            return Err(StoreError::RecordNotFound(rid));
        }
        page::payload_mut(buf, slot, self.record_size).copy_from_slice(&record.data);
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin(&handle)?;
        Ok(())
    }

    pub fn get(&mut self, rid: Rid, record: &mut Record) -> StoreResult<()> {
        let handle = self.pin_for_rid(rid)?;
        if self.slot_out_of_range(rid) {
            self.pool.unpin(&handle)?;
            return Err(StoreError::RecordNotFound(rid));
        }
        let buf = self.pool.page_data(&handle)?;
        let slot = rid.slot as usize;
        if !page::is_used(buf, slot, self.record_size) {
            self.pool.unpin(&handle)?;
            return Err(StoreError::RecordNotFound(rid));
        }
        if record.data.len() != self.record_size {
            record.data = vec![0u8; self.record_size];
        }
        record.data.copy_from_slice(page::payload(buf, slot, self.record_size));
        record.rid = rid;
        self.pool.unpin(&handle)?;
        Ok(())
    }

    pub fn scan<'t, 'p>(
        &'t mut self,
        predicate: Option<&'p dyn predicate::Predicate>,
    ) -> crate::scan::Scan<'t, 'p> {
        crate::scan::Scan::new(self, predicate)
    }

    /// Pin the RID's page, mapping an unplaced RID or a page past
    /// end-of-file to `RecordNotFound` instead of the lower-level
    /// parameter/range errors `bufpool`/`pagestore` would otherwise
    /// raise for a nonsense page index.
    fn pin_for_rid(&mut self, rid: Rid) -> StoreResult<PageHandle> {
        if !rid.is_placed() {
            return Err(StoreError::RecordNotFound(rid));
        }
        match self.pool.pin(rid.page) {
            Err(StoreError::OutOfRangePage { .. }) => Err(StoreError::RecordNotFound(rid)),
            other => other,
        }
    }

    /// `true` if `rid.slot` is past the last slot a page can hold, i.e. it
    /// could not have come from `insert` on this table. Callers must check
    /// this before indexing into a page buffer by slot — an out-of-range
    /// slot otherwise panics inside `page::slot_offset`.
    fn slot_out_of_range(&self, rid: Rid) -> bool {
        rid.slot < 0 || rid.slot as usize >= self.slots_per_page
    }

    /// Walk the free-list from `first_free_page` to the first page with
    /// a free slot, appending and linking a new tail page if the whole
    /// chain is full.
    fn locate_free_page(&mut self) -> StoreResult<PageNum> {
        let mut page = self.first_free_page;
        loop {
            let handle = pool_pin(&mut self.pool, page)?;
            let header = page::read_header(self.pool.page_data(&handle)?);
            self.pool.unpin(&handle)?;

            if header.free_slots > 0 {
                return Ok(page);
            }
            if header.next_free_page == NO_PAGE {
                break;
            }
            page = header.next_free_page;
        }

        let tail = page;
        let new_page = self.pool.append_empty_page()?;

        let handle = pool_pin(&mut self.pool, new_page)?;
        page::write_header(
            self.pool.page_data_mut(&handle)?,
            &Header {
                slots_per_page: self.slots_per_page as i32,
                free_slots: self.slots_per_page as i32,
                next_free_page: NO_PAGE,
            },
        );
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin(&handle)?;

        let tail_handle = pool_pin(&mut self.pool, tail)?;
        let mut tail_header = page::read_header(self.pool.page_data(&tail_handle)?);
        tail_header.next_free_page = new_page;
        page::write_header(self.pool.page_data_mut(&tail_handle)?, &tail_header);
        self.pool.mark_dirty(&tail_handle)?;
        self.pool.unpin(&tail_handle)?;

        self.first_free_page = new_page;
        tracing::trace!(new_page, tail, "appended data page to free list");
        Ok(new_page)
    }
}

fn pool_pin(pool: &mut BufferPool, page: PageNum) -> StoreResult<PageHandle> {
    pool.pin(page)
}
