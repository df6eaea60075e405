//! # praxis-db
//!
//! libSQL storage for Praxis.
//!
//! Holds every tenant's relational state: accounts and sessions, patients,
//! leads, pipelines, pages, chatbots, quizzes, referrals, analytics events,
//! productivity tools and the audit trail. Repositories live in [`repos`] as
//! `impl PraxisService` blocks.
//!
//! Statements are serialized through a single lock so that multi-statement
//! operations can run inside a [`Tx`] on the one shared connection. Reads
//! wait for an open transaction to finish and never see its uncommitted rows.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod service;
pub mod updates;

#[cfg(test)]
mod test_support;

use error::DatabaseError;
use libsql::params::IntoParams;
use libsql::{Builder, TransactionBehavior};
use tokio::sync::{Mutex, MutexGuard};

/// Central database handle.
///
/// Wraps a libSQL database and connection. Provides ID generation, locked
/// writes and transactions.
pub struct PraxisDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    write_lock: Mutex<()>,
}

impl PraxisDb {
    /// Open a local database at the given path (`":memory:"` for tests).
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let praxis_db = Self {
            db,
            conn,
            write_lock: Mutex::new(()),
        };
        praxis_db.run_migrations().await?;
        tracing::info!(path, "database opened");
        Ok(praxis_db)
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"led-a3f8b2c1"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))"),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }

    /// Random lowercase hex string of `bytes * 2` characters.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn random_hex(&self, bytes: u8) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(&format!("SELECT lower(hex(randomblob({bytes})))"), ())
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }

    /// Execute a single write statement under the write lock.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the statement fails.
    pub async fn execute(&self, sql: &str, params: impl IntoParams) -> Result<u64, DatabaseError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.conn.execute(sql, params).await?)
    }

    /// Run a read query once no transaction is open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query(
        &self,
        sql: &str,
        params: impl IntoParams,
    ) -> Result<libsql::Rows, DatabaseError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.conn.query(sql, params).await?)
    }

    /// Begin an immediate transaction. The write lock is held until the
    /// returned [`Tx`] is committed, rolled back or dropped.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if `BEGIN` fails.
    pub async fn transaction(&self) -> Result<Tx<'_>, DatabaseError> {
        let guard = self.write_lock.lock().await;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;
        Ok(Tx { tx, _guard: guard })
    }
}

/// An open transaction on the shared connection.
pub struct Tx<'a> {
    tx: libsql::Transaction,
    _guard: MutexGuard<'a, ()>,
}

impl Tx<'_> {
    /// # Errors
    ///
    /// Returns `DatabaseError` if the statement fails.
    pub async fn execute(&self, sql: &str, params: impl IntoParams) -> Result<u64, DatabaseError> {
        Ok(self.tx.execute(sql, params).await?)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query(
        &self,
        sql: &str,
        params: impl IntoParams,
    ) -> Result<libsql::Rows, DatabaseError> {
        Ok(self.tx.query(sql, params).await?)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if `COMMIT` fails.
    pub async fn commit(self) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if `ROLLBACK` fails.
    pub async fn rollback(self) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }

    /// Commit when `result` is `Ok`, roll back otherwise, and hand the
    /// result back.
    ///
    /// # Errors
    ///
    /// Returns the body's error, or the commit error.
    pub async fn finish<T>(self, result: Result<T, DatabaseError>) -> Result<T, DatabaseError> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
