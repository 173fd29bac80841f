//! Pipeline configuration.
//!
//! Values come from an optional TOML file and are then overridden by
//! command-line flags. Every file path defaults to a fixed name under the
//! data directory.
//!
//! ```toml
//! start_date = "2023-08-01"
//! end_date = "2023-10-31"
//! buffer_radius = 200.0
//! data_dir = "data"
//! agencies = ["NYPD", "DOT", "DSNY"]
//! parcels_path = "geo/tax_blocks.geojson"
//! ```

use std::path::{Path, PathBuf};

use block_activity_models::ObservationWindow;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::PipelineError;
use crate::filter::{ComplaintFilter, DEFAULT_AGENCIES, DEFAULT_EXCLUDED_TYPES};

/// Environment variable overriding the default data directory.
pub const DATA_DIR_ENV: &str = "BLOCK_ACTIVITY_DATA_DIR";

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// First day of the observation window.
    pub start_date: NaiveDate,
    /// Last day of the observation window (inclusive).
    pub end_date: NaiveDate,
    /// Radius of the disc around each event point, in planar units.
    pub buffer_radius: f64,
    /// Agencies whose complaints are kept. Empty keeps every agency.
    pub agencies: Vec<String>,
    /// Complaint types that are dropped.
    pub excluded_complaint_types: Vec<String>,
    /// Parcel property holding the borough identifier.
    pub parcel_borough_field: String,
    /// Parcel property holding the block identifier.
    pub parcel_block_field: String,
    /// Rebuild the intersection catalog even if a cache exists.
    pub refresh: bool,
    /// Directory that relative paths below are resolved against.
    pub data_dir: PathBuf,
    /// 311 complaints export.
    pub complaints_path: Option<PathBuf>,
    /// Film permits export.
    pub permits_path: Option<PathBuf>,
    /// Tax block polygons.
    pub parcels_path: Option<PathBuf>,
    /// Street network nodes.
    pub street_nodes_path: Option<PathBuf>,
    /// Intersection catalog cache.
    pub intersection_cache_path: Option<PathBuf>,
    /// Where the matrix is written.
    pub output_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            end_date: default_end_date(),
            buffer_radius: 200.0,
            agencies: DEFAULT_AGENCIES.iter().map(ToString::to_string).collect(),
            excluded_complaint_types: DEFAULT_EXCLUDED_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
            parcel_borough_field: "BORO".to_string(),
            parcel_block_field: "BLOCK".to_string(),
            refresh: false,
            data_dir: default_data_dir(),
            complaints_path: None,
            permits_path: None,
            parcels_path: None,
            street_nodes_path: None,
            intersection_cache_path: None,
            output_path: None,
        }
    }
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 8, 1).unwrap_or_default()
}

fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 10, 31).unwrap_or_default()
}

/// Returns the data directory from [`DATA_DIR_ENV`], falling back to
/// `data/`.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV).map_or_else(|| PathBuf::from("data"), PathBuf::from)
}

impl PipelineConfig {
    /// Parses a configuration from TOML text. Missing keys take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the text is not valid TOML or
    /// contains unknown keys.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, PipelineError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Loads the configuration file at `path`, or the defaults if `path`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the file is missing, unreadable, or
    /// invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.display().to_string()));
        }
        log::info!("Loading configuration from {}", path.display());
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Checks the settings and returns the observation window.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the window is inverted or the buffer
    /// radius is not a positive finite number.
    pub fn validate(&self) -> Result<ObservationWindow, PipelineError> {
        if !(self.buffer_radius.is_finite() && self.buffer_radius > 0.0) {
            return Err(PipelineError::InvalidConfig {
                message: format!(
                    "buffer_radius must be positive and finite, got {}",
                    self.buffer_radius
                ),
            });
        }
        Ok(ObservationWindow::new(self.start_date, self.end_date)?)
    }

    /// The complaint filter described by `agencies` and
    /// `excluded_complaint_types`.
    #[must_use]
    pub fn complaint_filter(&self) -> ComplaintFilter {
        ComplaintFilter {
            agencies: self.agencies.clone(),
            excluded_types: self.excluded_complaint_types.clone(),
        }
    }

    fn resolve(&self, explicit: Option<&PathBuf>, default_name: &str) -> PathBuf {
        match explicit {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.data_dir.join(path),
            None => self.data_dir.join(default_name),
        }
    }

    /// 311 complaints export path.
    #[must_use]
    pub fn complaints_file(&self) -> PathBuf {
        self.resolve(self.complaints_path.as_ref(), "complaints.json")
    }

    /// Film permits export path.
    #[must_use]
    pub fn permits_file(&self) -> PathBuf {
        self.resolve(self.permits_path.as_ref(), "permits.json")
    }

    /// Tax block polygons path.
    #[must_use]
    pub fn parcels_file(&self) -> PathBuf {
        self.resolve(self.parcels_path.as_ref(), "tax_blocks.geojson")
    }

    /// Street network nodes path.
    #[must_use]
    pub fn street_nodes_file(&self) -> PathBuf {
        self.resolve(self.street_nodes_path.as_ref(), "street_nodes.geojson")
    }

    /// Intersection catalog cache path.
    #[must_use]
    pub fn intersection_cache_file(&self) -> PathBuf {
        self.resolve(self.intersection_cache_path.as_ref(), "intersections.geojson")
    }

    /// Matrix output path.
    #[must_use]
    pub fn output_file(&self) -> PathBuf {
        self.resolve(self.output_path.as_ref(), "block_activity.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_study_window() {
        let config = PipelineConfig::default();
        let window = config.validate().unwrap();
        assert_eq!(window.start().to_string(), "2023-08-01");
        assert_eq!(window.end().to_string(), "2023-10-31");
        assert_eq!(window.len_days(), 92);
        assert_eq!(config.parcel_borough_field, "BORO");
        assert_eq!(config.complaint_filter(), ComplaintFilter::default());
    }

    #[test]
    fn complaint_filter_lists_are_configurable() {
        let config = PipelineConfig::from_toml_str(
            r#"
            agencies = []
            excluded_complaint_types = ["Illegal Parking"]
            "#,
        )
        .unwrap();
        let filter = config.complaint_filter();
        assert!(filter.agencies.is_empty());
        assert_eq!(filter.excluded_types, vec!["Illegal Parking".to_string()]);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            start_date = "2023-09-01"
            end_date = "2023-09-30"
            buffer_radius = 50.0
            data_dir = "/srv/nyc"
            parcels_path = "geo/blocks.geojson"
            output_path = "/tmp/out.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.start_date.to_string(), "2023-09-01");
        assert!((config.buffer_radius - 50.0).abs() < f64::EPSILON);
        assert_eq!(config.parcels_file(), PathBuf::from("/srv/nyc/geo/blocks.geojson"));
        assert_eq!(config.output_file(), PathBuf::from("/tmp/out.csv"));
        assert_eq!(config.permits_file(), PathBuf::from("/srv/nyc/permits.json"));
        assert_eq!(config.parcel_block_field, "BLOCK");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml_str("buffer_radus = 10.0"),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn inverted_window_is_invalid() {
        let config = PipelineConfig {
            start_date: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Window(_))));
    }

    #[test]
    fn non_positive_radius_is_invalid() {
        for radius in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = PipelineConfig {
                buffer_radius: radius,
                ..PipelineConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(PipelineError::InvalidConfig { .. })
            ));
        }
    }
}
