//! Shared vocabulary for the paged record store: identifiers, the error
//! enum every layer propagates, and the handful of runtime knobs exposed
//! to callers.

#[cfg(test)]
mod tests;

use std::path::PathBuf;

/// Logical page number. Negative values are reserved for sentinels; only
/// [`NO_PAGE`] is currently defined, matching the on-disk header fields
/// (`next_free_page`), which are themselves signed 32-bit integers.
pub type PageNum = i32;

/// Sentinel meaning "no page bound" — used for empty buffer-pool frames
/// and free-list terminators.
pub const NO_PAGE: PageNum = -1;

/// Fully-qualified identifier for a record within a table: a page number
/// and a slot index within that page's slot array.
///
/// Examples:
/// - `Rid { page: 1, slot: 0 }` — the first slot of the first data page.
/// - `Rid::UNPLACED` — a freshly constructed record with no home yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rid {
    pub page: PageNum,
    pub slot: i32,
}

impl Rid {
    /// The RID carried by a record that has not yet been inserted.
    pub const UNPLACED: Rid = Rid { page: -1, slot: -1 };

    pub fn new(page: PageNum, slot: i32) -> Self {
        Self { page, slot }
    }

    pub fn is_placed(&self) -> bool {
        self.page >= 0 && self.slot >= 0
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.page, self.slot)
    }
}

/// Coarse type tag used only for reporting [`StoreError::TypeMismatch`];
/// the record manager's `DataType` carries the richer per-attribute
/// metadata (e.g. string length).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DataTypeTag {
    Int,
    Float,
    Bool,
    String,
}

impl std::fmt::Display for DataTypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataTypeTag::Int => "int",
            DataTypeTag::Float => "float",
            DataTypeTag::Bool => "bool",
            DataTypeTag::String => "string",
        };
        write!(f, "{s}")
    }
}

/// Canonical error type shared across the storage layers.
///
/// Every variant below corresponds 1:1 to one of the error categories in
/// the storage design: parameter validation, uninitialized handles, I/O,
/// out-of-range page access, resource exhaustion, eviction capacity,
/// missing records, and attribute type mismatches.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("parameter: {0}")]
    Parameter(String),
    #[error("not initialized: {0}")]
    NotInitialized(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("page {page} out of range (file has {total} pages)")]
    OutOfRangePage { page: PageNum, total: PageNum },
    #[error("resource: {0}")]
    Resource(String),
    #[error("capacity: {0}")]
    Capacity(String),
    #[error("record not found: {0}")]
    RecordNotFound(Rid),
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: DataTypeTag,
        got: DataTypeTag,
    },
}

/// Result alias that carries a [`StoreError`].
pub type StoreResult<T> = Result<T, StoreError>;

/// Runtime configuration for the storage layers.
///
/// # Example
/// ```
/// use dbcore::Config;
/// use std::path::PathBuf;
///
/// let config = Config::builder()
///     .data_dir(PathBuf::from("./my_db"))
///     .buffer_pool_pages(64)
///     .build();
/// ```
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, bon::Builder)]
pub struct Config {
    /// Directory where table files live.
    #[builder(default = PathBuf::from("./db_data"))]
    pub data_dir: PathBuf,
    /// Number of frames the buffer pool keeps resident per open table.
    #[builder(default = 64)]
    pub buffer_pool_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./db_data"),
            buffer_pool_pages: 64,
        }
    }
}
