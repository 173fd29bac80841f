//! `DuckDB` intermediate store for raw complaint and permit rows.
//!
//! Rows are kept as text exactly as exported, so reading them back goes
//! through the same normalization as the JSON loader. The store is filled
//! from the JSON exports with [`import_json`].

use std::path::Path;

use block_activity_models::{ComplaintRecord, PermitRecord};
use duckdb::Connection;

use crate::json::JsonRecordLoader;
use crate::records::{RawComplaint, RawPermit};
use crate::{Loaded, RecordLoader, SourceError};

/// Rows written by [`import_json`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    /// Complaint rows written.
    pub complaints: usize,
    /// Permit rows written.
    pub permits: usize,
}

/// Opens (or creates) the store at `path`.
///
/// # Errors
///
/// Returns [`SourceError`] if the directory, connection, or schema
/// cannot be created.
pub fn open(path: &Path) -> Result<Connection, SourceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<(), SourceError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS complaints (
            unique_key TEXT,
            created_date TEXT,
            agency TEXT,
            complaint_type TEXT,
            x_coordinate_state_plane TEXT,
            y_coordinate_state_plane TEXT
        );
        CREATE TABLE IF NOT EXISTS permits (
            eventid TEXT,
            startdatetime TEXT,
            enddatetime TEXT,
            borough TEXT,
            parkingheld TEXT
        );",
    )?;
    Ok(())
}

/// Appends raw complaint rows.
///
/// # Errors
///
/// Returns [`SourceError`] if the insert fails.
pub fn insert_complaints(conn: &Connection, rows: &[RawComplaint]) -> Result<(), SourceError> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut stmt = conn.prepare(
        "INSERT INTO complaints (unique_key, created_date, agency, complaint_type,
            x_coordinate_state_plane, y_coordinate_state_plane)
         VALUES (?, ?, ?, ?, ?, ?)",
    )?;

    for row in rows {
        stmt.execute(duckdb::params![
            row.unique_key.as_deref(),
            row.created_date.as_deref(),
            row.agency.as_deref(),
            row.complaint_type.as_deref(),
            row.x_coordinate_state_plane.as_deref(),
            row.y_coordinate_state_plane.as_deref(),
        ])?;
    }

    Ok(())
}

/// Appends raw permit rows.
///
/// # Errors
///
/// Returns [`SourceError`] if the insert fails.
pub fn insert_permits(conn: &Connection, rows: &[RawPermit]) -> Result<(), SourceError> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut stmt = conn.prepare(
        "INSERT INTO permits (eventid, startdatetime, enddatetime, borough, parkingheld)
         VALUES (?, ?, ?, ?, ?)",
    )?;

    for row in rows {
        stmt.execute(duckdb::params![
            row.eventid.as_deref(),
            row.startdatetime.as_deref(),
            row.enddatetime.as_deref(),
            row.borough.as_deref(),
            row.parkingheld.as_deref(),
        ])?;
    }

    Ok(())
}

/// Replaces the store contents with the raw rows of both JSON exports.
///
/// Rows are copied unnormalized, so rows the loader would reject are
/// stored too and rejected again when read back.
///
/// # Errors
///
/// Returns [`SourceError`] if an export cannot be read or a write fails.
pub fn import_json(
    conn: &Connection,
    exports: &JsonRecordLoader,
) -> Result<ImportCounts, SourceError> {
    exports.check_inputs()?;
    let complaints = exports.read_raw_complaints()?;
    let permits = exports.read_raw_permits()?;

    conn.execute_batch("DELETE FROM complaints; DELETE FROM permits;")?;
    insert_complaints(conn, &complaints)?;
    insert_permits(conn, &permits)?;

    log::info!(
        "Imported {} complaint rows and {} permit rows",
        complaints.len(),
        permits.len()
    );

    Ok(ImportCounts {
        complaints: complaints.len(),
        permits: permits.len(),
    })
}

/// Reads records from a `DuckDB` store.
pub struct DuckDbLoader {
    conn: Connection,
}

impl DuckDbLoader {
    /// Wraps an open connection.
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens the store at `path`. The file must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file is missing or cannot be opened.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::FileNotFound(path.display().to_string()));
        }
        Ok(Self::new(open(path)?))
    }
}

impl RecordLoader for DuckDbLoader {
    fn load_complaints(&self) -> Result<Loaded<ComplaintRecord>, SourceError> {
        let mut stmt = self.conn.prepare(
            "SELECT unique_key, created_date, agency, complaint_type,
                x_coordinate_state_plane, y_coordinate_state_plane
             FROM complaints",
        )?;
        stmt.raw_execute()?;

        let mut raw = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            raw.push(RawComplaint {
                unique_key: row.get(0)?,
                created_date: row.get(1)?,
                agency: row.get(2)?,
                complaint_type: row.get(3)?,
                x_coordinate_state_plane: row.get(4)?,
                y_coordinate_state_plane: row.get(5)?,
            });
        }

        let loaded = Loaded::from_rows(raw, RawComplaint::normalize);
        log::info!(
            "Loaded {} complaints from DuckDB ({} rejected)",
            loaded.records.len(),
            loaded.rejected
        );
        Ok(loaded)
    }

    fn load_permits(&self) -> Result<Loaded<PermitRecord>, SourceError> {
        let mut stmt = self.conn.prepare(
            "SELECT eventid, startdatetime, enddatetime, borough, parkingheld FROM permits",
        )?;
        stmt.raw_execute()?;

        let mut raw = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            raw.push(RawPermit {
                eventid: row.get(0)?,
                startdatetime: row.get(1)?,
                enddatetime: row.get(2)?,
                borough: row.get(3)?,
                parkingheld: row.get(4)?,
            });
        }

        let loaded = Loaded::from_rows(raw, RawPermit::normalize);
        log::info!(
            "Loaded {} permits from DuckDB ({} rejected)",
            loaded.records.len(),
            loaded.rejected
        );
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn round_trips_rows_through_store() {
        let dir = temp_dir("block_activity_store_round_trip");
        let conn = open(&dir.join("store.duckdb")).unwrap();
        insert_complaints(
            &conn,
            &[
                RawComplaint {
                    unique_key: Some("1".to_string()),
                    created_date: Some("2023-08-01T10:00:00.000".to_string()),
                    x_coordinate_state_plane: Some("50".to_string()),
                    y_coordinate_state_plane: Some("60".to_string()),
                    ..RawComplaint::default()
                },
                RawComplaint {
                    unique_key: Some("2".to_string()),
                    ..RawComplaint::default()
                },
            ],
        )
        .unwrap();
        insert_permits(
            &conn,
            &[RawPermit {
                eventid: Some("10".to_string()),
                startdatetime: Some("2023-08-01T06:00:00".to_string()),
                enddatetime: Some("2023-08-01T20:00:00".to_string()),
                parkingheld: Some("A between B and C, A between C and D".to_string()),
                ..RawPermit::default()
            }],
        )
        .unwrap();

        let loader = DuckDbLoader::new(conn);
        let complaints = loader.load_complaints().unwrap();
        assert_eq!(complaints.records.len(), 1);
        assert_eq!(complaints.rejected, 1);
        assert_eq!(complaints.records[0].x, Some(50.0));

        let permits = loader.load_permits().unwrap();
        assert_eq!(permits.records.len(), 1);
        assert_eq!(permits.records[0].id, "10");
    }

    #[test]
    fn import_replaces_store_contents() {
        let dir = temp_dir("block_activity_store_import");
        let complaints = dir.join("complaints.json");
        let permits = dir.join("permits.json");
        std::fs::write(
            &complaints,
            r#"[
                { "unique_key": "1", "created_date": "2023-08-01T10:00:00.000",
                  "agency": "NYPD", "complaint_type": "Noise - Vehicle",
                  "x_coordinate_state_plane": 50, "y_coordinate_state_plane": "60" },
                { "unique_key": "2", "created_date": "garbage" }
            ]"#,
        )
        .unwrap();
        std::fs::write(
            &permits,
            r#"[
                { "eventid": 10, "startdatetime": "2023-08-01T06:00:00.000",
                  "enddatetime": "2023-08-01T20:00:00.000", "borough": "Manhattan",
                  "parkingheld": "A between B and C, A between C and D" }
            ]"#,
        )
        .unwrap();
        let exports = JsonRecordLoader::new(&complaints, &permits);

        let store = dir.join("store.duckdb");
        let conn = open(&store).unwrap();
        let first = import_json(&conn, &exports).unwrap();
        let second = import_json(&conn, &exports).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            second,
            ImportCounts {
                complaints: 2,
                permits: 1,
            }
        );
        drop(conn);

        let loader = DuckDbLoader::open(&store).unwrap();
        let loaded = loader.load_complaints().unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.rejected, 1);
        assert_eq!(loaded.records[0].agency.as_deref(), Some("NYPD"));
        assert_eq!(loaded.records[0].y, Some(60.0));
        assert_eq!(loader.load_permits().unwrap().records[0].id, "10");
    }

    #[test]
    fn import_requires_both_exports() {
        let dir = temp_dir("block_activity_store_import_missing");
        let conn = open(&dir.join("store.duckdb")).unwrap();
        let exports = JsonRecordLoader::new(dir.join("complaints.json"), dir.join("permits.json"));
        assert!(matches!(
            import_json(&conn, &exports),
            Err(SourceError::FileNotFound(_))
        ));
    }
}
