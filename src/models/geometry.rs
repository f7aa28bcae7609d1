//! Geometry helpers for subdivision boundaries.

use geo::BoundingRect;
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use serde::Serialize;
use serde_json::{Number, Value};

use super::Feature;

/// Axis-aligned bounding box in lon/lat
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    fn union(self, other: BoundingBox) -> Self {
        Self::new(
            self.min_lon.min(other.min_lon),
            self.min_lat.min(other.min_lat),
            self.max_lon.max(other.max_lon),
            self.max_lat.max(other.max_lat),
        )
    }

    /// Bounding box of all (multi)polygon geometries in `features`
    pub fn of_features(features: &[Feature]) -> Option<Self> {
        features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .filter_map(to_multi_polygon)
            .filter_map(|mp| mp.bounding_rect())
            .map(|rect| Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
            .reduce(Self::union)
    }

    /// `LEFT,BOTTOM,RIGHT,TOP` as expected by `osmium extract -b`
    pub fn to_osmium_arg(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

fn parse_ring(value: &Value) -> Option<LineString<f64>> {
    let coords: Vec<Coord<f64>> = value
        .as_array()?
        .iter()
        .map(|pos| {
            let pos = pos.as_array()?;
            Some(Coord {
                x: pos.first()?.as_f64()?,
                y: pos.get(1)?.as_f64()?,
            })
        })
        .collect::<Option<_>>()?;

    // Unclosed or degenerate rings are not polygons
    if coords.len() < 4 {
        return None;
    }

    Some(LineString::new(coords))
}

fn parse_polygon(value: &Value) -> Option<Polygon<f64>> {
    let mut rings = value.as_array()?.iter().map(parse_ring);
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

/// Convert a GeoJSON Polygon or MultiPolygon into a geo MultiPolygon
pub fn to_multi_polygon(geometry: &Value) -> Option<MultiPolygon<f64>> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => Some(MultiPolygon::new(vec![parse_polygon(coordinates)?])),
        "MultiPolygon" => {
            let polygons = coordinates
                .as_array()?
                .iter()
                .map(parse_polygon)
                .collect::<Option<Vec<_>>>()?;
            Some(MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

fn round_numbers(value: &mut Value, factor: f64) {
    match value {
        Value::Array(items) => {
            for item in items {
                round_numbers(item, factor);
            }
        }
        Value::Number(n) => {
            if let Some(rounded) = n
                .as_f64()
                .map(|x| (x * factor).round() / factor)
                .and_then(Number::from_f64)
            {
                *n = rounded;
            }
        }
        _ => {}
    }
}

/// Round every coordinate of a GeoJSON geometry to `precision` decimals
pub fn round_coordinates(geometry: &mut Value, precision: u32) {
    let factor = 10f64.powi(precision as i32);

    if let Some(coordinates) = geometry.get_mut("coordinates") {
        round_numbers(coordinates, factor);
    }
    if let Some(Value::Array(geometries)) = geometry.get_mut("geometries") {
        for g in geometries {
            round_coordinates(g, precision);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn square(x0: f64, y0: f64, size: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[
                [x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size], [x0, y0]
            ]]
        })
    }

    #[test]
    fn test_polygon_to_multi_polygon() {
        let mp = to_multi_polygon(&square(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(mp.0.len(), 1);
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let geometry = json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 1.0]]]});
        assert!(to_multi_polygon(&geometry).is_none());
    }

    #[test]
    fn test_point_is_not_a_polygon() {
        let geometry = json!({"type": "Point", "coordinates": [120.5, 15.1]});
        assert!(to_multi_polygon(&geometry).is_none());
    }

    #[test]
    fn test_bbox_spans_all_features() {
        let features = vec![
            Feature::new(Map::new(), Some(square(120.0, 15.0, 1.0))),
            Feature::new(Map::new(), None),
            Feature::new(
                Map::new(),
                Some(json!({
                    "type": "MultiPolygon",
                    "coordinates": [square(122.0, 13.0, 0.5)["coordinates"].clone()]
                })),
            ),
        ];

        let bbox = BoundingBox::of_features(&features).unwrap();
        assert_eq!(bbox, BoundingBox::new(120.0, 13.0, 122.5, 16.0));
        assert_eq!(bbox.to_osmium_arg(), "120,13,122.5,16");
    }

    #[test]
    fn test_bbox_without_polygons() {
        let features = vec![Feature::new(Map::new(), None)];
        assert!(BoundingBox::of_features(&features).is_none());
    }

    #[test]
    fn test_round_coordinates() {
        let mut geometry = json!({
            "type": "GeometryCollection",
            "geometries": [
                {"type": "Point", "coordinates": [120.123456789, 15.987654321]},
                {"type": "LineString", "coordinates": [[1.000004, 2.000006], [3.0, 4.0]]}
            ]
        });

        round_coordinates(&mut geometry, 5);

        assert_eq!(
            geometry["geometries"][0]["coordinates"],
            json!([120.12346, 15.98765])
        );
        assert_eq!(
            geometry["geometries"][1]["coordinates"],
            json!([[1.0, 2.00001], [3.0, 4.0]])
        );
    }
}
