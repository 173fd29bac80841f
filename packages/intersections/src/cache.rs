//! On-disk `GeoJSON` cache for the intersection catalog.
//!
//! One `Point` feature per directed pair, with the pair stored as a
//! two-element `street_combos` array. Features are written in key order,
//! so saving the same catalog twice produces identical bytes.

use std::path::Path;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use serde_json::Value;

use crate::nodes::point_geometry;
use crate::{CatalogError, IntersectionCatalog};

/// Property holding the `[street_a, street_b]` pair.
const STREET_COMBOS: &str = "street_combos";

/// Converts the catalog to a `FeatureCollection`.
#[must_use]
pub fn to_feature_collection(catalog: &IntersectionCatalog) -> FeatureCollection {
    let features = catalog
        .iter()
        .map(|(street_a, street_b, point)| {
            let mut properties = JsonObject::new();
            properties.insert(
                STREET_COMBOS.to_string(),
                Value::Array(vec![
                    Value::String(street_a.to_string()),
                    Value::String(street_b.to_string()),
                ]),
            );
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::Point(vec![
                    point.x(),
                    point.y(),
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Rebuilds a catalog from a cached `FeatureCollection`.
///
/// Features with a missing or non-finite point, or a malformed
/// `street_combos` property, are skipped. Duplicate pairs keep the first
/// occurrence.
#[must_use]
pub fn from_feature_collection(collection: &FeatureCollection) -> IntersectionCatalog {
    let mut catalog = IntersectionCatalog::default();
    let mut skipped = 0u64;

    for feature in &collection.features {
        let Some(point) = point_geometry(feature).filter(block_activity_models::is_valid_point)
        else {
            skipped += 1;
            continue;
        };
        let Some((street_a, street_b)) = street_combo(feature) else {
            skipped += 1;
            continue;
        };
        catalog.insert_first(street_a, street_b, point);
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} invalid intersection catalog entries");
    }

    catalog
}

fn street_combo(feature: &Feature) -> Option<(&str, &str)> {
    let combo = feature.properties.as_ref()?.get(STREET_COMBOS)?.as_array()?;
    match combo.as_slice() {
        [Value::String(street_a), Value::String(street_b)] => {
            Some((street_a.as_str(), street_b.as_str()))
        }
        _ => None,
    }
}

/// Writes the catalog to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`CatalogError`] if serialization or the write fails.
pub fn save(catalog: &IntersectionCatalog, path: &Path) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(&to_feature_collection(catalog))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Reads a catalog previously written by [`save`].
///
/// # Errors
///
/// Returns [`CatalogError`] if the file is missing, unreadable, or not a
/// `FeatureCollection`.
pub fn load(path: &Path) -> Result<IntersectionCatalog, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::FileNotFound(path.display().to_string()));
    }
    let data = std::fs::read_to_string(path)?;
    let GeoJson::FeatureCollection(collection) = data.parse::<GeoJson>()? else {
        return Err(CatalogError::NotFeatureCollection {
            path: path.display().to_string(),
        });
    };
    Ok(from_feature_collection(&collection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use block_activity_models::StreetNode;
    use geo::Point;
    use std::fs;

    fn sample_catalog() -> IntersectionCatalog {
        IntersectionCatalog::build(&[
            StreetNode {
                node_id: "1".to_string(),
                streets: vec!["Main St".to_string(), "1st Ave".to_string()],
                geometry: Point::new(0.0, 0.0),
            },
            StreetNode {
                node_id: "2".to_string(),
                streets: vec![
                    "Main St".to_string(),
                    "2nd Ave".to_string(),
                    "Broadway".to_string(),
                ],
                geometry: Point::new(10.0, 0.0),
            },
        ])
    }

    #[test]
    fn save_and_load_preserves_catalog() {
        let tmp = std::env::temp_dir().join("block_activity_catalog_roundtrip");
        let _ = fs::remove_dir_all(&tmp);
        let path = tmp.join("intersections.geojson");

        let catalog = sample_catalog();
        save(&catalog, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded, catalog);
        assert_eq!(loaded.lookup("2nd Ave", "Main St"), Some(Point::new(10.0, 0.0)));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn saving_twice_is_byte_identical() {
        let tmp = std::env::temp_dir().join("block_activity_catalog_bytes");
        let _ = fs::remove_dir_all(&tmp);
        let first = tmp.join("a.geojson");
        let second = tmp.join("b.geojson");

        save(&sample_catalog(), &first).unwrap();
        save(&sample_catalog(), &second).unwrap();
        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let data = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
                    "properties": { "street_combos": ["A", "B"] }
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
                    "properties": { "street_combos": ["A"] }
                },
                {
                    "type": "Feature",
                    "geometry": null,
                    "properties": { "street_combos": ["C", "D"] }
                }
            ]
        }"#;
        let GeoJson::FeatureCollection(collection) = data.parse::<GeoJson>().unwrap() else {
            panic!("expected a feature collection");
        };
        let catalog = from_feature_collection(&collection);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup("A", "B"), Some(Point::new(1.0, 2.0)));
    }

    #[test]
    fn load_or_build_respects_refresh() {
        let tmp = std::env::temp_dir().join("block_activity_catalog_refresh");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        let nodes_path = tmp.join("nodes.geojson");
        let cache_path = tmp.join("cache").join("intersections.geojson");

        fs::write(
            &nodes_path,
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":{"type":"Point","coordinates":[3.0,4.0]},
                 "properties":{"node_id":1,"streets":["A","B"]}}]}"#,
        )
        .unwrap();

        let built = crate::load_or_build(&cache_path, &nodes_path, false).unwrap();
        assert_eq!(built.len(), 2);
        assert!(cache_path.exists());

        // Cached result is used even after the node file changes.
        fs::write(
            &nodes_path,
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":{"type":"Point","coordinates":[3.0,4.0]},
                 "properties":{"node_id":1,"streets":["A","B","C"]}}]}"#,
        )
        .unwrap();
        let cached = crate::load_or_build(&cache_path, &nodes_path, false).unwrap();
        assert_eq!(cached.len(), 2);

        let refreshed = crate::load_or_build(&cache_path, &nodes_path, true).unwrap();
        assert_eq!(refreshed.len(), 6);

        let _ = fs::remove_dir_all(&tmp);
    }
}
