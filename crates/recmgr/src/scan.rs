//! Sequential, optionally predicate-filtered table scans.

use crate::page;
use crate::record::Record;
use crate::table::Table;
use dbcore::{PageNum, Rid, StoreResult, NO_PAGE};
use predicate::{Predicate, Value};

const FIRST_DATA_PAGE: PageNum = 1;

/// A live cursor over a table's data pages. Holds the table mutably for
/// its lifetime, mirroring the single-threaded cooperative model the
/// rest of this crate assumes: no other operation can run against the
/// table while a scan is open.
pub struct Scan<'t, 'p> {
    table: &'t mut Table,
    predicate: Option<&'p dyn Predicate>,
    page: PageNum,
    slot: i32,
    scanned: u64,
}

impl<'t, 'p> Scan<'t, 'p> {
    pub(crate) fn new(table: &'t mut Table, predicate: Option<&'p dyn Predicate>) -> Self {
        Self {
            table,
            predicate,
            page: FIRST_DATA_PAGE,
            slot: 0,
            scanned: 0,
        }
    }

    /// How many tuples this scan has examined (matching or not) so far.
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    /// Advance to the next tuple satisfying the predicate (or any tuple,
    /// if there is none), filling `record` in place. Returns `Ok(false)`
    /// once the chain is exhausted — there is no end-of-scan error.
    pub fn next(&mut self, record: &mut Record) -> StoreResult<bool> {
        let record_size = self.table.record_size();

        loop {
            if self.page == NO_PAGE {
                return Ok(false);
            }

            let next_page;
            let mut found = false;
            {
                let pool = self.table.pool_mut();
                let handle = pool.pin(self.page)?;
                let buf = pool.page_data(&handle)?;
                let header = page::read_header(buf);

                while self.slot < header.slots_per_page {
                    let slot = self.slot as usize;
                    if page::is_used(buf, slot, record_size) {
                        if record.data.len() != record_size {
                            record.data = vec![0u8; record_size];
                        }
                        record.data.copy_from_slice(page::payload(buf, slot, record_size));
                        record.rid = Rid::new(self.page, self.slot);
                        self.scanned += 1;
                        self.slot += 1;
                        found = true;
                        break;
                    }
                    self.slot += 1;
                }

                next_page = header.next_free_page;
                pool.unpin(&handle)?;
            }

            if found {
                if self.matches(record)? {
                    return Ok(true);
                }
                // Predicate rejected this tuple; resume from the next
                // slot on the same page (self.slot already advanced).
                continue;
            }

            self.page = next_page;
            self.slot = 0;
        }
    }

    fn matches(&self, record: &Record) -> StoreResult<bool> {
        let Some(predicate) = self.predicate else {
            return Ok(true);
        };
        let schema = self.table.schema();
        let mut attrs = Vec::with_capacity(schema.num_attrs());
        for i in 0..schema.num_attrs() {
            attrs.push(record.get_attr(schema, i)?);
        }
        Ok(matches!(predicate.eval(&attrs)?, Value::Bool(true)))
    }

    /// Release the scan. Nothing to free explicitly; provided so callers
    /// can mirror the original's explicit `closeScan` lifecycle.
    pub fn close(self) {}
}
