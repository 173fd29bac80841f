#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tax block × day activity matrix.
//!
//! Ties the pieces together: permits are geocoded through the
//! intersection catalog, permits and complaints are expanded to daily
//! point events, the events are buffered and joined against tax block
//! polygons, and the counts are assembled onto the full block × day
//! skeleton with zero fill.
//!
//! [`pipeline::build_matrix`] is the pure in-memory core.
//! [`pipeline::run`] adds configuration, file loading, and output.

pub mod assemble;
pub mod config;
pub mod filter;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod sink;
pub mod temporal;

use block_activity_intersections::CatalogError;
use block_activity_models::ModelError;
use block_activity_source::SourceError;
use block_activity_spatial::SpatialError;

pub use config::PipelineConfig;
pub use filter::ComplaintFilter;
pub use report::PipelineReport;

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A required input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// A configuration value is out of range.
    #[error("Invalid config: {message}")]
    InvalidConfig {
        /// Description of what went wrong.
        message: String,
    },

    /// The observation window is invalid.
    #[error(transparent)]
    Window(#[from] ModelError),

    /// Intersection catalog loading or caching failed.
    #[error("Intersection catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Parcel loading failed.
    #[error("Spatial error: {0}")]
    Spatial(#[from] SpatialError),

    /// Complaint or permit loading failed.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Writing the CSV output failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
