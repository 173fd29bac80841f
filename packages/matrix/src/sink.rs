//! Output writers for the finished matrix.

use std::path::{Path, PathBuf};

use block_activity_models::ParcelDayCell;
use serde::Serialize;

use crate::PipelineError;

/// Column header of the matrix table.
pub const HEADER: [&str; 5] = ["borough_id", "block_id", "date", "permits", "cases"];

/// Receives the finished matrix.
pub trait TabularSink {
    /// Writes every cell.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the destination cannot be written.
    fn write(&mut self, cells: &[ParcelDayCell]) -> Result<(), PipelineError>;
}

#[derive(Serialize)]
struct Row<'a> {
    borough_id: &'a str,
    block_id: &'a str,
    date: String,
    permits: u64,
    cases: u64,
}

impl<'a> From<&'a ParcelDayCell> for Row<'a> {
    fn from(cell: &'a ParcelDayCell) -> Self {
        Self {
            borough_id: &cell.key.borough,
            block_id: &cell.key.block,
            date: cell.date.format("%Y-%m-%d").to_string(),
            permits: cell.permits,
            cases: cell.cases,
        }
    }
}

/// Writes the matrix as CSV, sorted by borough, block, and date.
///
/// Borough and block identifiers are text and sort lexically, so block
/// `"100"` comes before block `"99"`. Dates sort chronologically.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Creates a sink writing to `path`. Parent directories are created
    /// on write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TabularSink for CsvSink {
    fn write(&mut self, cells: &[ParcelDayCell]) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut sorted: Vec<&ParcelDayCell> = cells.iter().collect();
        sorted.sort_by(|a, b| (&a.key, a.date).cmp(&(&b.key, b.date)));

        let mut writer = csv::Writer::from_path(&self.path)?;
        if sorted.is_empty() {
            writer.write_record(HEADER)?;
        }
        for cell in sorted {
            writer.serialize(Row::from(cell))?;
        }
        writer.flush()?;

        log::info!("Wrote {} rows to {}", cells.len(), self.path.display());
        Ok(())
    }
}

/// Keeps the matrix in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Cells received so far.
    pub cells: Vec<ParcelDayCell>,
}

impl TabularSink for MemorySink {
    fn write(&mut self, cells: &[ParcelDayCell]) -> Result<(), PipelineError> {
        self.cells.extend_from_slice(cells);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use block_activity_models::ParcelKey;
    use chrono::NaiveDate;

    fn cell(block: &str, d: u32, permits: u64, cases: u64) -> ParcelDayCell {
        ParcelDayCell {
            key: ParcelKey {
                borough: "1".to_string(),
                block: block.to_string(),
            },
            date: NaiveDate::from_ymd_opt(2023, 8, d).unwrap(),
            permits,
            cases,
        }
    }

    #[test]
    fn writes_sorted_csv_with_header() {
        let path = std::env::temp_dir()
            .join("block_activity_sink_tests")
            .join("matrix.csv");
        let mut sink = CsvSink::new(&path);
        sink.write(&[cell("200", 1, 0, 2), cell("100", 2, 1, 0), cell("100", 1, 1, 0)])
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "borough_id,block_id,date,permits,cases\n\
             1,100,2023-08-01,1,0\n\
             1,100,2023-08-02,1,0\n\
             1,200,2023-08-01,0,2\n"
        );
    }

    #[test]
    fn block_ids_sort_as_text() {
        let path = std::env::temp_dir()
            .join("block_activity_sink_tests")
            .join("lexical.csv");
        CsvSink::new(&path)
            .write(&[cell("99", 1, 0, 0), cell("100", 1, 0, 0)])
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let blocks: Vec<&str> = written
            .lines()
            .skip(1)
            .filter_map(|line| line.split(',').nth(1))
            .collect();
        assert_eq!(blocks, vec!["100", "99"]);
    }

    #[test]
    fn empty_matrix_still_has_header() {
        let path = std::env::temp_dir()
            .join("block_activity_sink_tests")
            .join("empty.csv");
        CsvSink::new(&path).write(&[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "borough_id,block_id,date,permits,cases\n"
        );
    }
}
