//! GeoJSON export for cell boundaries, heatmaps and service areas.

use crate::compute::grid::{self, CellId};
use crate::error::{HexError, Result};
use geo::{MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, Value, feature::Id};
use hexloc_types::GeoPoint;
use serde_json::Map;
use std::collections::BTreeMap;

/// Closed GeoJSON ring (`[lon, lat]` positions) from boundary vertices.
fn ring_from_vertices(vertices: &[GeoPoint]) -> Vec<Vec<f64>> {
    let mut ring: Vec<Vec<f64>> = vertices.iter().map(|v| vec![v.lon, v.lat]).collect();
    if let Some(first) = ring.first().cloned() {
        ring.push(first);
    }
    ring
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect())
        .collect()
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| HexError::Serialization(format!("Failed to serialize {}: {}", what, e)))
}

/// Converts a cell's boundary into a GeoJSON Polygon geometry.
pub fn boundary_to_geojson(vertices: &[GeoPoint]) -> Result<String> {
    let geom = Geometry::new(Value::Polygon(vec![ring_from_vertices(vertices)]));
    to_json(&geom, "cell boundary")
}

/// Converts a service area union into a GeoJSON MultiPolygon geometry.
pub fn multi_polygon_to_geojson(polygons: &MultiPolygon<f64>) -> Result<String> {
    let geom = Geometry::new(Value::MultiPolygon(
        polygons.0.iter().map(polygon_rings).collect(),
    ));
    to_json(&geom, "multipolygon")
}

/// Heatmap as a FeatureCollection of cell hexagons with a `density`
/// property, ids being the cell ids.
pub fn heatmap_to_geojson(heatmap: &BTreeMap<CellId, f64>) -> Result<String> {
    let features = heatmap
        .iter()
        .map(|(cell, density)| {
            let mut props = Map::new();
            props.insert("density".to_string(), serde_json::json!(density));
            props.insert(
                "resolution".to_string(),
                serde_json::json!(grid::cell_resolution(*cell)),
            );

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Polygon(vec![ring_from_vertices(
                    &grid::cell_boundary(*cell),
                )]))),
                id: Some(Id::String(cell.to_string())),
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    to_json(&collection, "heatmap")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_boundary_ring_is_closed() {
        let vertices = vec![
            GeoPoint::from_lat_lon(0.0, 0.0),
            GeoPoint::from_lat_lon(0.0, 1.0),
            GeoPoint::from_lat_lon(1.0, 1.0),
        ];
        let json = boundary_to_geojson(&vertices).unwrap();
        let parsed: Geometry = serde_json::from_str(&json).unwrap();
        match parsed.value {
            Value::Polygon(rings) => {
                assert_eq!(rings[0].len(), 4);
                assert_eq!(rings[0][0], rings[0][3]);
                assert_eq!(rings[0][1], vec![1.0, 0.0]);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_polygon_export() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let json = multi_polygon_to_geojson(&MultiPolygon::new(vec![square])).unwrap();
        assert!(json.contains("MultiPolygon"));
    }

    #[test]
    fn test_heatmap_feature_collection() {
        let cell = grid::cell_for(
            GeoPoint::from_lat_lon(40.7580, -73.9855),
            grid::to_resolution(7).unwrap(),
        )
        .unwrap();
        let heatmap = BTreeMap::from([(cell, 1.0)]);

        let json = heatmap_to_geojson(&heatmap).unwrap();
        let parsed: FeatureCollection = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.features.len(), 1);
        assert_eq!(
            parsed.features[0].id,
            Some(Id::String(cell.to_string()))
        );
        assert!(json.contains("\"density\":1.0"));
    }
}
