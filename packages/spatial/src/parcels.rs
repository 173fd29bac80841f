//! Tax block polygon loading.
//!
//! Reads a `GeoJSON` `FeatureCollection` of `Polygon`/`MultiPolygon`
//! features. The borough and block identifiers are taken from
//! configurable property names; numeric and string values are both
//! accepted.

use std::path::Path;

use block_activity_models::{ParcelPolygon, RawParcelKey};
use geo::MultiPolygon;
use geojson::{Feature, GeoJson};
use serde_json::Value;

use crate::SpatialError;

/// Property names identifying a tax block.
#[derive(Debug, Clone, Copy)]
pub struct ParcelFields<'a> {
    /// Borough identifier property (e.g. `"BORO"`).
    pub borough: &'a str,
    /// Block identifier property (e.g. `"BLOCK"`).
    pub block: &'a str,
}

/// Loads tax block polygons from a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`SpatialError`] if the file is missing, unreadable, or not a
/// `FeatureCollection`.
pub fn load_parcels(
    path: &Path,
    fields: ParcelFields<'_>,
) -> Result<Vec<ParcelPolygon>, SpatialError> {
    if !path.exists() {
        return Err(SpatialError::FileNotFound(path.display().to_string()));
    }
    log::info!("Loading tax blocks from {}", path.display());
    let data = std::fs::read_to_string(path)?;
    parse_parcels(&data, &path.display().to_string(), fields)
}

/// Parses tax block polygons from `GeoJSON` text. `label` names the
/// source in errors.
///
/// Every feature yields a parcel. Features without a polygonal geometry
/// keep their key with no outline, so the block is still part of the
/// matrix. Missing or null identifier properties yield an incomplete
/// [`RawParcelKey`].
///
/// # Errors
///
/// Returns [`SpatialError`] if the text is not a `FeatureCollection`.
pub fn parse_parcels(
    data: &str,
    label: &str,
    fields: ParcelFields<'_>,
) -> Result<Vec<ParcelPolygon>, SpatialError> {
    let GeoJson::FeatureCollection(collection) = data.parse::<GeoJson>()? else {
        return Err(SpatialError::NotFeatureCollection {
            path: label.to_string(),
        });
    };

    let total = collection.features.len();
    let mut parcels = Vec::with_capacity(total);
    let mut without_polygon = 0;

    for feature in collection.features {
        let geometry = feature
            .geometry
            .clone()
            .and_then(parse_geojson_to_multipolygon);
        if geometry.is_none() {
            without_polygon += 1;
        }
        parcels.push(ParcelPolygon {
            key: RawParcelKey {
                borough: identifier(&feature, fields.borough),
                block: identifier(&feature, fields.block),
            },
            geometry,
        });
    }

    if without_polygon > 0 {
        log::warn!("{without_polygon} of {total} tax block features have no polygon geometry");
    }

    Ok(parcels)
}

/// Convert a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn parse_geojson_to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Reads an identifier property as text. Integral numbers are written
/// without a fractional part, so `1` and `1.0` both become `"1"`.
#[allow(clippy::float_cmp)]
fn identifier(feature: &Feature, property: &str) -> Option<String> {
    match feature.properties.as_ref()?.get(property)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => {
            if let Some(int) = n.as_i64() {
                Some(int.to_string())
            } else {
                let float = n.as_f64()?;
                if float.fract() == 0.0 {
                    Some(format!("{float:.0}"))
                } else {
                    Some(float.to_string())
                }
            }
        }
        _ => None,
    }
}
