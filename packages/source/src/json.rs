//! Loader for Socrata JSON exports on disk.

use std::path::{Path, PathBuf};

use block_activity_models::{ComplaintRecord, PermitRecord};
use serde::de::DeserializeOwned;

use crate::records::{RawComplaint, RawPermit};
use crate::{Loaded, RecordLoader, SourceError};

/// Reads complaints and permits from JSON array files, as downloaded
/// from the Socrata API.
#[derive(Debug, Clone)]
pub struct JsonRecordLoader {
    complaints_path: PathBuf,
    permits_path: PathBuf,
}

impl JsonRecordLoader {
    /// Creates a loader over the two export files.
    #[must_use]
    pub fn new(complaints_path: impl Into<PathBuf>, permits_path: impl Into<PathBuf>) -> Self {
        Self {
            complaints_path: complaints_path.into(),
            permits_path: permits_path.into(),
        }
    }

    /// Fails if either export is missing, so a run can abort before any
    /// work is done.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::FileNotFound`] naming the first missing file.
    pub fn check_inputs(&self) -> Result<(), SourceError> {
        for path in [&self.complaints_path, &self.permits_path] {
            if !path.exists() {
                return Err(SourceError::FileNotFound(path.display().to_string()));
            }
        }
        Ok(())
    }

    /// Reads the complaint export without normalizing it.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file is missing or not a JSON array
    /// of objects.
    pub fn read_raw_complaints(&self) -> Result<Vec<RawComplaint>, SourceError> {
        read_rows(&self.complaints_path)
    }

    /// Reads the permit export without normalizing it.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file is missing or not a JSON array
    /// of objects.
    pub fn read_raw_permits(&self) -> Result<Vec<RawPermit>, SourceError> {
        read_rows(&self.permits_path)
    }
}

fn read_rows<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>, SourceError> {
    if !path.exists() {
        return Err(SourceError::FileNotFound(path.display().to_string()));
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

impl RecordLoader for JsonRecordLoader {
    fn load_complaints(&self) -> Result<Loaded<ComplaintRecord>, SourceError> {
        let rows = self.read_raw_complaints()?;
        let raw_count = rows.len();
        let loaded = Loaded::from_rows(rows, RawComplaint::normalize);
        log::info!(
            "Normalized {} complaints from {raw_count} raw records ({} rejected)",
            loaded.records.len(),
            loaded.rejected
        );
        Ok(loaded)
    }

    fn load_permits(&self) -> Result<Loaded<PermitRecord>, SourceError> {
        let rows = self.read_raw_permits()?;
        let raw_count = rows.len();
        let loaded = Loaded::from_rows(rows, RawPermit::normalize);
        log::info!(
            "Normalized {} permits from {raw_count} raw records ({} rejected)",
            loaded.records.len(),
            loaded.rejected
        );
        Ok(loaded)
    }
}
