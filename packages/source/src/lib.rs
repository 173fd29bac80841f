#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Complaint and film permit record loading.
//!
//! Each storage backend implements the [`RecordLoader`] trait to read raw
//! rows and normalize them into [`ComplaintRecord`]s and
//! [`PermitRecord`]s. Rows that cannot be normalized are dropped and
//! counted, never fatal.

pub mod json;
pub mod parsing;
pub mod records;
#[cfg(feature = "duckdb")]
pub mod store;

use block_activity_models::{ComplaintRecord, PermitRecord};

pub use json::JsonRecordLoader;
#[cfg(feature = "duckdb")]
pub use store::DuckDbLoader;

/// Errors that can occur while loading source records.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A required input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `DuckDB` query failed.
    #[cfg(feature = "duckdb")]
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),
}

/// Records loaded from a source, plus how many rows were rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    /// Normalized records.
    pub records: Vec<T>,
    /// Rows dropped because they could not be normalized.
    pub rejected: u64,
}

impl<T> Loaded<T> {
    /// Normalizes `rows` with `normalize`, counting the rows it rejects.
    pub fn from_rows<R>(
        rows: impl IntoIterator<Item = R>,
        normalize: impl Fn(R) -> Option<T>,
    ) -> Self {
        let mut records = Vec::new();
        let mut rejected = 0;
        for row in rows {
            match normalize(row) {
                Some(record) => records.push(record),
                None => rejected += 1,
            }
        }
        Self { records, rejected }
    }
}

/// Trait that all record backends must implement.
pub trait RecordLoader {
    /// Loads every 311 complaint.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the backing store cannot be read.
    fn load_complaints(&self) -> Result<Loaded<ComplaintRecord>, SourceError>;

    /// Loads every film permit.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the backing store cannot be read.
    fn load_permits(&self) -> Result<Loaded<PermitRecord>, SourceError>;
}
