#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street-pair intersection catalog.
//!
//! Maps every ordered pair of distinct streets meeting at a street-network
//! node to that node's point geometry. A three-way intersection therefore
//! contributes six directed pairs, all sharing one point. The catalog is
//! built once, cached to disk as `GeoJSON`, and treated as read-only for
//! the rest of a run.

pub mod cache;
pub mod nodes;

use std::collections::BTreeMap;
use std::path::Path;

use block_activity_models::{StreetNode, is_valid_point};
use geo::Point;

/// Errors that can occur while building, loading, or saving the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A required input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but is not a `FeatureCollection`.
    #[error("Expected a GeoJSON FeatureCollection in {path}")]
    NotFeatureCollection {
        /// Path of the offending file.
        path: String,
    },
}

/// A directed pair of street names, e.g. `("Main St", "1st Ave")`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreetPair {
    /// Street the lookup starts from.
    pub street_a: String,
    /// Crossing street.
    pub street_b: String,
}

impl StreetPair {
    /// Creates a pair from two street names.
    #[must_use]
    pub fn new(street_a: impl Into<String>, street_b: impl Into<String>) -> Self {
        Self {
            street_a: street_a.into(),
            street_b: street_b.into(),
        }
    }
}

/// Immutable lookup from directed street pairs to intersection points.
///
/// Both directions of every pair are present: if `(A, B)` resolves then
/// `(B, A)` resolves to the same point. When a pair occurs at more than
/// one node, the first node in input order wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntersectionCatalog {
    /// street A -> street B -> point
    pairs: BTreeMap<String, BTreeMap<String, Point<f64>>>,
    len: usize,
}

impl IntersectionCatalog {
    /// Builds the catalog from street-network nodes.
    ///
    /// Nodes with non-finite coordinates are skipped. Street names are
    /// trimmed, blank names dropped, and repeated names within a node
    /// collapsed before pairing, so a node with fewer than two distinct
    /// streets contributes nothing.
    #[must_use]
    pub fn build(nodes: &[StreetNode]) -> Self {
        let mut catalog = Self::default();
        let mut invalid = 0u64;
        let mut conflicts = 0u64;

        for node in nodes {
            if !is_valid_point(&node.geometry) {
                invalid += 1;
                continue;
            }

            let streets = distinct_streets(&node.streets);
            for street_a in &streets {
                for street_b in &streets {
                    if street_a == street_b {
                        continue;
                    }
                    if !catalog.insert_first(street_a, street_b, node.geometry) {
                        conflicts += 1;
                    }
                }
            }
        }

        if invalid > 0 {
            log::warn!("Skipped {invalid} street nodes with invalid geometry");
        }
        log::debug!("{conflicts} duplicate street pairs resolved first-wins");
        log::info!(
            "Built intersection catalog: {} directed pairs from {} nodes",
            catalog.len,
            nodes.len()
        );

        catalog
    }

    /// Inserts a pair unless it is already present. Returns whether the
    /// pair was inserted.
    fn insert_first(&mut self, street_a: &str, street_b: &str, point: Point<f64>) -> bool {
        let crossings = self.pairs.entry(street_a.to_string()).or_default();
        if crossings.contains_key(street_b) {
            return false;
        }
        crossings.insert(street_b.to_string(), point);
        self.len += 1;
        true
    }

    /// Looks up the intersection of `street_a` and `street_b`.
    #[must_use]
    pub fn lookup(&self, street_a: &str, street_b: &str) -> Option<Point<f64>> {
        self.pairs.get(street_a)?.get(street_b).copied()
    }

    /// Looks up a [`StreetPair`].
    #[must_use]
    pub fn lookup_pair(&self, pair: &StreetPair) -> Option<Point<f64>> {
        self.lookup(&pair.street_a, &pair.street_b)
    }

    /// Number of directed pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the catalog has no pairs.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates `(street_a, street_b, point)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Point<f64>)> {
        self.pairs.iter().flat_map(|(street_a, crossings)| {
            crossings
                .iter()
                .map(move |(street_b, point)| (street_a.as_str(), street_b.as_str(), *point))
        })
    }
}

/// Trims names and drops blanks and repeats, keeping first-seen order.
fn distinct_streets(streets: &[String]) -> Vec<&str> {
    let mut distinct: Vec<&str> = Vec::with_capacity(streets.len());
    for street in streets {
        let street = street.trim();
        if !street.is_empty() && !distinct.contains(&street) {
            distinct.push(street);
        }
    }
    distinct
}

/// Loads the catalog from `cache_path`, or builds it from the street
/// nodes at `nodes_path` (and writes the cache) when `refresh` is set or
/// no cache exists yet.
///
/// # Errors
///
/// Returns [`CatalogError`] if the node file is missing on rebuild, or if
/// any file cannot be read, parsed, or written.
pub fn load_or_build(
    cache_path: &Path,
    nodes_path: &Path,
    refresh: bool,
) -> Result<IntersectionCatalog, CatalogError> {
    if refresh || !cache_path.exists() {
        log::info!(
            "Creating intersection catalog from {}...",
            nodes_path.display()
        );
        let street_nodes = nodes::load_street_nodes(nodes_path)?;
        let catalog = IntersectionCatalog::build(&street_nodes);
        cache::save(&catalog, cache_path)?;
        log::info!("Intersection catalog saved to {}", cache_path.display());
        return Ok(catalog);
    }

    log::info!(
        "Loading intersection catalog from {}...",
        cache_path.display()
    );
    let catalog = cache::load(cache_path)?;
    log::info!("Loaded {} intersection pairs", catalog.len());
    Ok(catalog)
}
