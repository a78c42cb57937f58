//! Operation and test-case storage
//!
//! Operations are keyed by `(path, method)` and get a stable endpoint id on
//! first insert. Each endpoint owns one case table; case ids are unique across
//! all tables and never reused.
//!
//! ```text
//! .specrun/store/
//! ├── operations.json
//! └── cases/
//!     ├── endpoint_1.json
//!     └── endpoint_2.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{Operation, TestCase};

/// Persistence seam for operations and their generated cases.
pub trait CaseStore {
    /// Insert `op`, or replace the stored operation with the same `(path, method)`.
    /// Returns the endpoint id, which is stable across re-ingestion.
    fn insert_or_upsert_operation(&mut self, op: Operation) -> Result<u64, StoreError>;

    /// Supersede the stored operations with `ops`.
    ///
    /// Operations that survive by `(path, method)` keep their id and case
    /// table; the rest are removed along with their tables. Returns the ids
    /// of `ops` in input order.
    fn replace_operations(&mut self, ops: Vec<Operation>) -> Result<Vec<u64>, StoreError>;

    /// All operations in endpoint id order.
    fn list_operations(&self) -> Result<Vec<Operation>, StoreError>;

    /// Create an empty case table for `endpoint_id`, dropping any previous one.
    fn create_case_table(&mut self, endpoint_id: u64) -> Result<(), StoreError>;

    /// Append a case; returns its id.
    fn insert_case(&mut self, endpoint_id: u64, case: TestCase) -> Result<u64, StoreError>;

    /// Cases of one endpoint in insertion order; empty if no table exists.
    fn list_cases(&self, endpoint_id: u64) -> Result<Vec<TestCase>, StoreError>;

    fn get_case_by_id(&self, endpoint_id: u64, case_id: u64)
    -> Result<Option<TestCase>, StoreError>;

    /// Search every table for `case_id`.
    fn find_case(&self, case_id: u64) -> Result<Option<TestCase>, StoreError> {
        for op in self.list_operations()? {
            let Some(endpoint_id) = op.id else { continue };
            if let Some(case) = self.get_case_by_id(endpoint_id, case_id)? {
                return Ok(Some(case));
            }
        }
        Ok(None)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Catalog {
    next_endpoint_id: u64,
    next_case_id: u64,
    operations: Vec<Operation>,
}

/// In-process store, one run's lifetime.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: Catalog,
    tables: BTreeMap<u64, Vec<TestCase>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn has_endpoint(&self, endpoint_id: u64) -> bool {
        self.catalog
            .operations
            .iter()
            .any(|op| op.id == Some(endpoint_id))
    }

    /// Replace `(path, method)`'s entry, or append `op` under its own id or a
    /// fresh one.
    fn upsert(&mut self, mut op: Operation) -> u64 {
        if let Some(existing) = self
            .catalog
            .operations
            .iter_mut()
            .find(|e| e.same_action(&op))
        {
            let id = existing.id.unwrap_or_default();
            op.id = Some(id);
            *existing = op;
            return id;
        }
        let id = match op.id {
            Some(id) => id,
            None => {
                self.catalog.next_endpoint_id = self.catalog.next_endpoint_id.max(1);
                let id = self.catalog.next_endpoint_id;
                self.catalog.next_endpoint_id += 1;
                id
            }
        };
        op.id = Some(id);
        self.catalog.operations.push(op);
        id
    }

    /// Returns the ids of `ops` and the ids of retired operations.
    fn replace(&mut self, ops: Vec<Operation>) -> (Vec<u64>, Vec<u64>) {
        let previous = std::mem::take(&mut self.catalog.operations);
        let mut ids = Vec::with_capacity(ops.len());
        for mut op in ops {
            op.id = previous
                .iter()
                .find(|p| p.same_action(&op))
                .and_then(|p| p.id);
            ids.push(self.upsert(op));
        }
        let retired: Vec<u64> = previous
            .iter()
            .filter_map(|p| p.id)
            .filter(|id| !ids.contains(id))
            .collect();
        self.tables.retain(|id, _| !retired.contains(id));
        self.catalog.operations.sort_by_key(|op| op.id);
        (ids, retired)
    }
}

impl CaseStore for MemoryStore {
    fn insert_or_upsert_operation(&mut self, mut op: Operation) -> Result<u64, StoreError> {
        op.id = None;
        Ok(self.upsert(op))
    }

    fn replace_operations(&mut self, ops: Vec<Operation>) -> Result<Vec<u64>, StoreError> {
        let (ids, retired) = self.replace(ops);
        if !retired.is_empty() {
            tracing::info!(?retired, "retired operations");
        }
        Ok(ids)
    }

    fn list_operations(&self) -> Result<Vec<Operation>, StoreError> {
        Ok(self.catalog.operations.clone())
    }

    fn create_case_table(&mut self, endpoint_id: u64) -> Result<(), StoreError> {
        if !self.has_endpoint(endpoint_id) {
            return Err(StoreError::UnknownEndpoint(endpoint_id));
        }
        self.tables.insert(endpoint_id, Vec::new());
        Ok(())
    }

    fn insert_case(&mut self, endpoint_id: u64, mut case: TestCase) -> Result<u64, StoreError> {
        let table = self
            .tables
            .get_mut(&endpoint_id)
            .ok_or(StoreError::MissingTable(endpoint_id))?;
        self.catalog.next_case_id = self.catalog.next_case_id.max(1);
        let id = self.catalog.next_case_id;
        self.catalog.next_case_id += 1;
        case.id = Some(id);
        case.endpoint_id = endpoint_id;
        table.push(case);
        Ok(id)
    }

    fn list_cases(&self, endpoint_id: u64) -> Result<Vec<TestCase>, StoreError> {
        Ok(self.tables.get(&endpoint_id).cloned().unwrap_or_default())
    }

    fn get_case_by_id(
        &self,
        endpoint_id: u64,
        case_id: u64,
    ) -> Result<Option<TestCase>, StoreError> {
        Ok(self
            .tables
            .get(&endpoint_id)
            .and_then(|t| t.iter().find(|c| c.id == Some(case_id)))
            .cloned())
    }
}

/// JSON-file-backed store; every write is flushed to disk.
#[derive(Debug)]
pub struct JsonDirStore {
    dir: PathBuf,
    inner: MemoryStore,
}

impl JsonDirStore {
    /// Open (or create) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or a file is unreadable.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let cases_dir = dir.join("cases");
        std::fs::create_dir_all(&cases_dir)
            .map_err(|e| StoreError::Io(format!("create {}: {e}", cases_dir.display())))?;

        let catalog_path = dir.join("operations.json");
        let catalog: Catalog = if catalog_path.exists() {
            read_json(&catalog_path)?
        } else {
            Catalog::default()
        };

        let mut tables = BTreeMap::new();
        for op in &catalog.operations {
            let Some(id) = op.id else { continue };
            let path = table_path(dir, id);
            if path.exists() {
                tables.insert(id, read_json::<Vec<TestCase>>(&path)?);
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            inner: MemoryStore { catalog, tables },
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn flush_catalog(&self) -> Result<(), StoreError> {
        write_json(&self.dir.join("operations.json"), &self.inner.catalog)
    }

    fn flush_table(&self, endpoint_id: u64) -> Result<(), StoreError> {
        let cases = self.inner.list_cases(endpoint_id)?;
        write_json(&table_path(&self.dir, endpoint_id), &cases)
    }
}

impl CaseStore for JsonDirStore {
    fn insert_or_upsert_operation(&mut self, op: Operation) -> Result<u64, StoreError> {
        let id = self.inner.insert_or_upsert_operation(op)?;
        self.flush_catalog()?;
        Ok(id)
    }

    fn replace_operations(&mut self, ops: Vec<Operation>) -> Result<Vec<u64>, StoreError> {
        let (ids, retired) = self.inner.replace(ops);
        self.flush_catalog()?;
        for id in retired {
            let path = table_path(&self.dir, id);
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::info!(endpoint = id, "removed retired case table"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StoreError::Io(format!("remove {}: {e}", path.display())));
                }
            }
        }
        Ok(ids)
    }

    fn list_operations(&self) -> Result<Vec<Operation>, StoreError> {
        self.inner.list_operations()
    }

    fn create_case_table(&mut self, endpoint_id: u64) -> Result<(), StoreError> {
        self.inner.create_case_table(endpoint_id)?;
        self.flush_table(endpoint_id)
    }

    fn insert_case(&mut self, endpoint_id: u64, case: TestCase) -> Result<u64, StoreError> {
        let id = self.inner.insert_case(endpoint_id, case)?;
        self.flush_catalog()?;
        self.flush_table(endpoint_id)?;
        Ok(id)
    }

    fn list_cases(&self, endpoint_id: u64) -> Result<Vec<TestCase>, StoreError> {
        self.inner.list_cases(endpoint_id)
    }

    fn get_case_by_id(
        &self,
        endpoint_id: u64,
        case_id: u64,
    ) -> Result<Option<TestCase>, StoreError> {
        self.inner.get_case_by_id(endpoint_id, case_id)
    }
}

fn table_path(dir: &Path, endpoint_id: u64) -> PathBuf {
    dir.join("cases").join(format!("endpoint_{endpoint_id}.json"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Io(format!("read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| StoreError::Corrupt(path.to_path_buf(), e.to_string()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| StoreError::Serialize(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| StoreError::Io(format!("write {}: {e}", path.display())))
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Corrupt store file {0}: {1}")]
    Corrupt(PathBuf, String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("No endpoint with id {0}")]
    UnknownEndpoint(u64),
    #[error("No case table for endpoint {0}")]
    MissingTable(u64),
}
