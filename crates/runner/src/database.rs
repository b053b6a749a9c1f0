//! Database-backed operations
//!
//! [`DatabaseExecutor`] maps the five database operation kinds onto the
//! [`Database`] port. Parameters come from the operation's JSON params:
//!
//! | kind   | params |
//! |--------|--------|
//! | read   | `table`, `key`, optional `fields` |
//! | scan   | `table`, `key` (start key), `record_count`, optional `fields` |
//! | update | `table`, `key`, `values` |
//! | insert | `table`, `key`, `values` |
//! | delete | `table`, `key` |

use async_trait::async_trait;
use cadence_core::Operation;
use cadence_executor::{ExecutionFailure, OperationExecutor, OperationOutcome};
use cadence_ports::{Database, DbError, DbResult, Record};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

pub const DATABASE_OPERATION_KINDS: [&str; 5] = ["read", "scan", "update", "insert", "delete"];

pub struct DatabaseExecutor {
    db: Arc<dyn Database>,
}

impl DatabaseExecutor {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    fn run(&self, operation: &Operation) -> DbResult<Value> {
        let table = required_str(operation, "table")?;
        let key = required_str(operation, "key")?;

        match operation.kind.as_str() {
            "read" => {
                let record = self.db.read(table, key, fields(operation)?.as_ref())?;
                Ok(record_to_json(record))
            }
            "scan" => {
                let record_count = operation
                    .params
                    .get("record_count")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| missing(operation, "record_count"))?;
                let records = self.db.scan(
                    table,
                    key,
                    record_count as usize,
                    fields(operation)?.as_ref(),
                )?;
                Ok(Value::Array(records.into_iter().map(record_to_json).collect()))
            }
            "update" => {
                self.db.update(table, key, values(operation)?)?;
                Ok(Value::Null)
            }
            "insert" => {
                self.db.insert(table, key, values(operation)?)?;
                Ok(Value::Null)
            }
            "delete" => {
                self.db.delete(table, key)?;
                Ok(Value::Null)
            }
            other => Err(DbError::InvalidRequest(format!(
                "unsupported operation kind '{}'",
                other
            ))),
        }
    }
}

#[async_trait]
impl OperationExecutor for DatabaseExecutor {
    async fn execute(&self, operation: &Operation) -> Result<OperationOutcome, ExecutionFailure> {
        self.run(operation)
            .map(OperationOutcome::ok)
            .map_err(|e| ExecutionFailure::new(e.to_string(), e.code()))
    }
}

fn missing(operation: &Operation, param: &str) -> DbError {
    DbError::InvalidRequest(format!(
        "operation {} ({}) is missing '{}'",
        operation.id, operation.kind, param
    ))
}

fn required_str<'a>(operation: &'a Operation, param: &str) -> DbResult<&'a str> {
    operation
        .param_str(param)
        .ok_or_else(|| missing(operation, param))
}

fn fields(operation: &Operation) -> DbResult<Option<HashSet<String>>> {
    match operation.params.get("fields") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(names)) => names
            .iter()
            .map(|name| {
                name.as_str().map(str::to_string).ok_or_else(|| {
                    DbError::InvalidRequest(format!("field name {} is not a string", name))
                })
            })
            .collect::<DbResult<HashSet<_>>>()
            .map(Some),
        Some(other) => Err(DbError::InvalidRequest(format!(
            "fields must be an array, got {}",
            other
        ))),
    }
}

fn values(operation: &Operation) -> DbResult<Record> {
    let object = operation
        .params
        .get("values")
        .and_then(Value::as_object)
        .ok_or_else(|| missing(operation, "values"))?;

    Ok(object
        .iter()
        .map(|(field, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (field.clone(), value)
        })
        .collect())
}

fn record_to_json(record: Record) -> Value {
    Value::Object(
        record
            .into_iter()
            .map(|(field, value)| (field, Value::String(value)))
            .collect(),
    )
}

/// In-process [`Database`], tables of key-ordered records
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<HashMap<String, BTreeMap<String, Record>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `table`
    pub fn len(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

fn project(record: &Record, fields: Option<&HashSet<String>>) -> Record {
    match fields {
        None => record.clone(),
        Some(fields) => record
            .iter()
            .filter(|(field, _)| fields.contains(*field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect(),
    }
}

fn not_found(table: &str, key: &str) -> DbError {
    DbError::NotFound {
        table: table.to_string(),
        key: key.to_string(),
    }
}

impl Database for MemoryDatabase {
    fn read(&self, table: &str, key: &str, fields: Option<&HashSet<String>>) -> DbResult<Record> {
        let tables = self.tables.read();
        let record = tables
            .get(table)
            .and_then(|records| records.get(key))
            .ok_or_else(|| not_found(table, key))?;
        Ok(project(record, fields))
    }

    fn scan(
        &self,
        table: &str,
        start_key: &str,
        record_count: usize,
        fields: Option<&HashSet<String>>,
    ) -> DbResult<Vec<Record>> {
        let tables = self.tables.read();
        let Some(records) = tables.get(table) else {
            return Ok(Vec::new());
        };
        Ok(records
            .range(start_key.to_string()..)
            .take(record_count)
            .map(|(_, record)| project(record, fields))
            .collect())
    }

    fn update(&self, table: &str, key: &str, values: Record) -> DbResult<()> {
        let mut tables = self.tables.write();
        let record = tables
            .get_mut(table)
            .and_then(|records| records.get_mut(key))
            .ok_or_else(|| not_found(table, key))?;
        record.extend(values);
        Ok(())
    }

    fn insert(&self, table: &str, key: &str, values: Record) -> DbResult<()> {
        let mut tables = self.tables.write();
        let records = tables.entry(table.to_string()).or_default();
        if records.contains_key(key) {
            return Err(DbError::AlreadyExists {
                table: table.to_string(),
                key: key.to_string(),
            });
        }
        records.insert(key.to_string(), values);
        Ok(())
    }

    fn delete(&self, table: &str, key: &str) -> DbResult<()> {
        let mut tables = self.tables.write();
        tables
            .get_mut(table)
            .and_then(|records| records.remove(key))
            .map(|_| ())
            .ok_or_else(|| not_found(table, key))
    }
}
