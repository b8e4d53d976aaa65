//! Async access to the store
//!
//! SQLite calls block. [`AsyncStore`] moves each call onto tokio's blocking
//! pool so an async caller's task keeps making progress.

use std::sync::Arc;
use crate::{Error, Result};
use super::Database;

/// Shared, cloneable async handle to a [`Database`]
#[derive(Clone)]
pub struct AsyncStore {
    db: Arc<Database>,
}

impl AsyncStore {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    pub fn from_shared(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Run `f` against the database on the blocking pool and await its result
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }
}
