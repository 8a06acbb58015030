//! The record-store collaborator boundary.
//!
//! The engine needs exactly three capabilities from its backing store:
//! scoped select, scoped delete with a count, and batched insert that
//! confirms how many rows actually persisted. Everything richer (policies,
//! transactions, auth) stays behind this trait.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{error::StoreError, normalize::Record};

/// Tenancy scope for every store operation: one sale event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub event_id: Uuid,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event {}", self.event_id)
    }
}

pub trait RecordStore {
    /// Check write permission on the scope before any row processing.
    fn authorize_write(&self, scope: &Scope) -> Result<(), StoreError>;

    /// All records in the table belonging to the scope.
    fn select(&self, scope: &Scope, table: &str) -> Result<Vec<Record>, StoreError>;

    /// Delete the scope's records from the table, returning the count
    /// removed.
    fn delete_scoped(&mut self, scope: &Scope, table: &str) -> Result<u64, StoreError>;

    /// Insert a batch, returning the count actually persisted. A result of
    /// zero with a non-empty batch is how silently-blocking authorization
    /// layers manifest; the importer treats it as a failure.
    fn insert_confirmed(
        &mut self,
        scope: &Scope,
        table: &str,
        rows: &[Record],
    ) -> Result<u64, StoreError>;
}

fn record_in_scope(record: &Record, scope: &Scope) -> bool {
    record
        .get("event_id")
        .and_then(Value::as_str)
        .is_some_and(|id| id == scope.event_id.to_string())
}

/// In-memory store with failure injection, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Vec<Record>>,
    pub deny_write: bool,
    pub fail_delete: bool,
    pub silently_block_inserts: bool,
    /// When set, `insert_confirmed` persists at most this many rows per
    /// batch without reporting an error.
    pub persist_cap_per_batch: Option<u64>,
}

impl MemoryStore {
    pub fn with_records(table: &str, records: Vec<Record>) -> Self {
        let mut store = MemoryStore::default();
        store.tables.insert(table.to_string(), records);
        store
    }

    pub fn table(&self, table: &str) -> &[Record] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl RecordStore for MemoryStore {
    fn authorize_write(&self, _scope: &Scope) -> Result<(), StoreError> {
        if self.deny_write {
            Err(StoreError::PermissionDenied)
        } else {
            Ok(())
        }
    }

    fn select(&self, scope: &Scope, table: &str) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .table(table)
            .iter()
            .filter(|record| record_in_scope(record, scope))
            .cloned()
            .collect())
    }

    fn delete_scoped(&mut self, scope: &Scope, table: &str) -> Result<u64, StoreError> {
        if self.fail_delete {
            return Err(StoreError::Backend("delete rejected".into()));
        }
        let rows = self.tables.entry(table.to_string()).or_default();
        let before = rows.len();
        rows.retain(|record| !record_in_scope(record, scope));
        Ok((before - rows.len()) as u64)
    }

    fn insert_confirmed(
        &mut self,
        _scope: &Scope,
        table: &str,
        rows: &[Record],
    ) -> Result<u64, StoreError> {
        if self.silently_block_inserts {
            return Ok(0);
        }
        let keep = match self.persist_cap_per_batch {
            Some(cap) => rows.len().min(cap as usize),
            None => rows.len(),
        };
        self.tables
            .entry(table.to_string())
            .or_default()
            .extend(rows.iter().take(keep).cloned());
        Ok(keep as u64)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileData {
    tables: BTreeMap<String, Vec<Record>>,
}

/// A record store persisted as one JSON file, enough to exercise the full
/// import path from the CLI without a managed backend.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: FileData,
}

impl JsonFileStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let data = if path.exists() {
            let contents = fs::read_to_string(path)?;
            serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            FileData::default()
        };
        Ok(JsonFileStore {
            path: path.to_path_buf(),
            data,
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(&self.data)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn authorize_write(&self, _scope: &Scope) -> Result<(), StoreError> {
        Ok(())
    }

    fn select(&self, scope: &Scope, table: &str) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .data
            .tables
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter(|record| record_in_scope(record, scope))
            .cloned()
            .collect())
    }

    fn delete_scoped(&mut self, scope: &Scope, table: &str) -> Result<u64, StoreError> {
        let rows = self.data.tables.entry(table.to_string()).or_default();
        let before = rows.len();
        rows.retain(|record| !record_in_scope(record, scope));
        let removed = (before - rows.len()) as u64;
        self.persist()?;
        Ok(removed)
    }

    fn insert_confirmed(
        &mut self,
        _scope: &Scope,
        table: &str,
        rows: &[Record],
    ) -> Result<u64, StoreError> {
        self.data
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        self.persist()?;
        Ok(rows.len() as u64)
    }
}
