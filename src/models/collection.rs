//! FeatureCollection documents as read from and written to disk.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};

const FEATURE_COLLECTION: &str = "FeatureCollection";
const FEATURE: &str = "Feature";

fn feature_collection_type() -> String {
    FEATURE_COLLECTION.to_string()
}

fn feature_type() -> String {
    FEATURE.to_string()
}

/// A GeoJSON feature. Members other than `type`, `properties` and
/// `geometry` (e.g. `id`, `bbox`) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,

    #[serde(default)]
    pub properties: Option<Map<String, Value>>,

    #[serde(default)]
    pub geometry: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feature {
    pub fn new(properties: Map<String, Value>, geometry: Option<Value>) -> Self {
        Self {
            kind: feature_type(),
            properties: Some(properties),
            geometry,
            extra: Map::new(),
        }
    }

    /// Get a string property
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.as_ref()?.get(key)?.as_str()
    }
}

/// A GeoJSON FeatureCollection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub kind: String,

    /// Layer name, as written by GDAL's `-nln`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Value>,

    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: feature_collection_type(),
            name: None,
            crs: None,
            features,
        }
    }

    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<Self> {
        serde_json::from_reader(BufReader::new(reader)).map_err(|e| PipelineError::json(origin, e))
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_reader(file, path)
    }

    /// Write as compact JSON, replacing any existing file
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|e| PipelineError::json(path, e))?;
        writer.flush().map_err(|e| PipelineError::io(path, e))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_keeps_unknown_members() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": 7,
                "properties": {"NAME_1": "Abra"},
                "geometry": null
            }]
        });

        let fc: FeatureCollection = serde_json::from_value(doc).unwrap();
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.features[0].property_str("NAME_1"), Some("Abra"));
        assert_eq!(fc.features[0].extra.get("id"), Some(&json!(7)));

        let back = serde_json::to_value(&fc).unwrap();
        assert_eq!(back["features"][0]["id"], json!(7));
        assert!(back.get("name").is_none());
    }

    #[test]
    fn test_null_properties() {
        let feature: Feature =
            serde_json::from_value(json!({"type": "Feature", "properties": null, "geometry": null}))
                .unwrap();
        assert_eq!(feature.property_str("NAME_1"), None);
    }

    #[test]
    fn test_non_string_property() {
        let feature: Feature = serde_json::from_value(json!({
            "type": "Feature",
            "properties": {"NAME_1": 12},
            "geometry": null
        }))
        .unwrap();
        assert_eq!(feature.property_str("NAME_1"), None);
    }
}
