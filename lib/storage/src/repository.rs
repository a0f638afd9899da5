//! Durable storage of reported accidents.
//!
//! Only the reported rows are kept; embeddings are never persisted.

use chrono::NaiveDate;
use heed::types::{Bytes, U64};
use heed::byteorder::BE;
use heed::{Database, Env, EnvOpenOptions};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use vialert_core::{Error, Result};

const DB_ACCIDENTS: &str = "accidents";

/// An accident as submitted, before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccident {
    pub date: Option<NaiveDate>,
    pub address: String,
    pub accident_type: String,
}

/// A persisted accident row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accident {
    pub id: u64,
    pub date: Option<NaiveDate>,
    pub address: String,
    pub accident_type: String,
}

impl Accident {
    fn from_new(id: u64, accident: NewAccident) -> Self {
        Self {
            id,
            date: accident.date,
            address: accident.address,
            accident_type: accident.accident_type,
        }
    }
}

/// Where reported accidents are stored.
pub trait AccidentRepository: Send + Sync {
    /// Store the accident and return it with its assigned id.
    fn save(&self, accident: NewAccident) -> Result<Accident>;

    fn find(&self, id: u64) -> Result<Option<Accident>>;

    fn count(&self) -> Result<usize>;
}

fn repo_err(e: impl std::fmt::Display) -> Error {
    Error::Repository(e.to_string())
}

/// LMDB-backed repository keyed by a monotonically increasing id
pub struct LmdbAccidentRepository {
    env: Arc<Env>,
    accidents_db: Database<U64<BE>, Bytes>,
}

impl LmdbAccidentRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        std::fs::create_dir_all(&path)?;

        let env = Arc::new(unsafe {
            EnvOpenOptions::new()
                .map_size(1024 * 1024 * 1024) // 1GB
                .max_dbs(1)
                .open(path)
                .map_err(repo_err)?
        });

        let mut wtxn = env.write_txn().map_err(repo_err)?;
        let accidents_db = env
            .create_database(&mut wtxn, Some(DB_ACCIDENTS))
            .map_err(repo_err)?;
        wtxn.commit().map_err(repo_err)?;

        Ok(Self { env, accidents_db })
    }
}

impl AccidentRepository for LmdbAccidentRepository {
    fn save(&self, accident: NewAccident) -> Result<Accident> {
        let mut wtxn = self.env.write_txn().map_err(repo_err)?;
        let id = match self.accidents_db.last(&wtxn).map_err(repo_err)? {
            Some((last, _)) => last + 1,
            None => 1,
        };

        let row = Accident::from_new(id, accident);
        let data = bincode::serialize(&row).map_err(|e| Error::Serialization(e.to_string()))?;
        self.accidents_db.put(&mut wtxn, &id, &data).map_err(repo_err)?;
        wtxn.commit().map_err(repo_err)?;
        Ok(row)
    }

    fn find(&self, id: u64) -> Result<Option<Accident>> {
        let rtxn = self.env.read_txn().map_err(repo_err)?;
        match self.accidents_db.get(&rtxn, &id).map_err(repo_err)? {
            Some(data) => bincode::deserialize(data)
                .map(Some)
                .map_err(|e| Error::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    fn count(&self) -> Result<usize> {
        let rtxn = self.env.read_txn().map_err(repo_err)?;
        let len = self.accidents_db.len(&rtxn).map_err(repo_err)?;
        Ok(len as usize)
    }
}

/// Process-local repository, used when no data directory is configured
#[derive(Default)]
pub struct InMemoryAccidentRepository {
    rows: Mutex<Vec<Accident>>,
}

impl InMemoryAccidentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccidentRepository for InMemoryAccidentRepository {
    fn save(&self, accident: NewAccident) -> Result<Accident> {
        let mut rows = self.rows.lock();
        let row = Accident::from_new(rows.len() as u64 + 1, accident);
        rows.push(row.clone());
        Ok(row)
    }

    fn find(&self, id: u64) -> Result<Option<Accident>> {
        Ok(self.rows.lock().iter().find(|r| r.id == id).cloned())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.rows.lock().len())
    }
}
