use std::collections::{BTreeMap, HashSet};

use crate::error::DbResult;

/// Field name to value mapping of one record
pub type Record = BTreeMap<String, String>;

/// Port for the system under test
///
/// Bindings are thin protocol wrappers; the driver only uses them as the
/// executable body of an operation. A field filter of `None` means all
/// fields.
pub trait Database: Send + Sync {
    fn read(&self, table: &str, key: &str, fields: Option<&HashSet<String>>)
    -> DbResult<Record>;

    /// Up to `record_count` records in key order, starting at `start_key`
    fn scan(
        &self,
        table: &str,
        start_key: &str,
        record_count: usize,
        fields: Option<&HashSet<String>>,
    ) -> DbResult<Vec<Record>>;

    fn update(&self, table: &str, key: &str, values: Record) -> DbResult<()>;

    fn insert(&self, table: &str, key: &str, values: Record) -> DbResult<()>;

    fn delete(&self, table: &str, key: &str) -> DbResult<()>;
}
