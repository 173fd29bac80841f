//! Street-network node loading.
//!
//! Reads a `GeoJSON` `FeatureCollection` of `Point` features, each carrying
//! a `node_id` and a `streets` array naming every street that meets at the
//! node.

use std::path::Path;

use block_activity_models::StreetNode;
use geojson::{Feature, GeoJson};
use serde_json::Value;

use crate::CatalogError;

/// Loads street nodes from a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`CatalogError`] if the file is missing, unreadable, or not a
/// `FeatureCollection`.
pub fn load_street_nodes(path: &Path) -> Result<Vec<StreetNode>, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::FileNotFound(path.display().to_string()));
    }
    let data = std::fs::read_to_string(path)?;
    let nodes = parse_street_nodes(&data, &path.display().to_string())?;
    log::info!("Loaded {} street nodes from {}", nodes.len(), path.display());
    Ok(nodes)
}

/// Parses street nodes from `GeoJSON` text. `label` names the source in
/// errors.
///
/// Features without a point geometry are skipped.
///
/// # Errors
///
/// Returns [`CatalogError`] if the text is not a `FeatureCollection`.
pub fn parse_street_nodes(data: &str, label: &str) -> Result<Vec<StreetNode>, CatalogError> {
    let GeoJson::FeatureCollection(collection) = data.parse::<GeoJson>()? else {
        return Err(CatalogError::NotFeatureCollection {
            path: label.to_string(),
        });
    };

    let total = collection.features.len();
    let nodes: Vec<StreetNode> = collection
        .features
        .into_iter()
        .enumerate()
        .filter_map(|(index, feature)| street_node_from_feature(index, feature))
        .collect();

    if nodes.len() < total {
        log::warn!(
            "Skipped {} of {total} street node features without a point geometry",
            total - nodes.len()
        );
    }

    Ok(nodes)
}

fn street_node_from_feature(index: usize, feature: Feature) -> Option<StreetNode> {
    let geometry = point_geometry(&feature)?;

    let property = |key: &str| feature.properties.as_ref().and_then(|props| props.get(key));

    let node_id = property("node_id")
        .and_then(value_to_string)
        .unwrap_or_else(|| index.to_string());

    let streets = match property("streets") {
        Some(Value::Array(names)) => names.iter().filter_map(value_to_string).collect(),
        Some(Value::String(name)) => vec![name.clone()],
        _ => Vec::new(),
    };

    Some(StreetNode {
        node_id,
        streets,
        geometry,
    })
}

/// Extracts a point from a feature's geometry, if it has one.
pub(crate) fn point_geometry(feature: &Feature) -> Option<geo::Point<f64>> {
    let geometry = feature.geometry.clone()?;
    match geo::Geometry::<f64>::try_from(geometry).ok()? {
        geo::Geometry::Point(point) => Some(point),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [987100.5, 211200.25] },
                "properties": { "node_id": 42, "streets": ["Main St", "1st Ave"] }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
                "properties": { "node_id": "n7", "streets": "Dead End Rd" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] },
                "properties": { "node_id": "line", "streets": ["A", "B"] }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": { "node_id": "missing", "streets": ["A", "B"] }
            }
        ]
    }"#;

    #[test]
    fn parses_point_nodes_and_skips_others() {
        let nodes = parse_street_nodes(NODES, "test").unwrap();
        assert_eq!(nodes.len(), 2);

        assert_eq!(nodes[0].node_id, "42");
        assert_eq!(nodes[0].streets, vec!["Main St", "1st Ave"]);
        assert!((nodes[0].geometry.x() - 987_100.5).abs() < f64::EPSILON);

        assert_eq!(nodes[1].node_id, "n7");
        assert_eq!(nodes[1].streets, vec!["Dead End Rd"]);
    }

    #[test]
    fn rejects_non_collection() {
        let single = r#"{ "type": "Point", "coordinates": [0.0, 0.0] }"#;
        assert!(matches!(
            parse_street_nodes(single, "single"),
            Err(CatalogError::NotFeatureCollection { .. })
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let path = std::env::temp_dir().join("block_activity_missing_nodes.geojson");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            load_street_nodes(&path),
            Err(CatalogError::FileNotFound(_))
        ));
    }
}
