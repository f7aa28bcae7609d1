//! Object counts for produced region extracts.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use osmpbfreader::{OsmObj, OsmPbfReader};
use serde::Serialize;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObjectCounts {
    pub nodes: u64,
    pub ways: u64,
    pub relations: u64,
}

impl ObjectCounts {
    pub fn total(&self) -> u64 {
        self.nodes + self.ways + self.relations
    }

    fn add(&mut self, obj: &OsmObj) {
        match obj {
            OsmObj::Node(_) => self.nodes += 1,
            OsmObj::Way(_) => self.ways += 1,
            OsmObj::Relation(_) => self.relations += 1,
        }
    }
}

/// Read a PBF extract end to end and count its objects
pub fn count_objects(path: &Path) -> Result<ObjectCounts> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut reader = OsmPbfReader::new(BufReader::new(file));

    let mut counts = ObjectCounts::default();
    for obj in reader.iter() {
        let obj = obj.map_err(|e| PipelineError::Pbf {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        counts.add(&obj);
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total() {
        let counts = ObjectCounts {
            nodes: 10,
            ways: 3,
            relations: 1,
        };
        assert_eq!(counts.total(), 14);
    }

    #[test]
    fn test_counts_fixture() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/region.osm.pbf");
        let counts = count_objects(&path).unwrap();
        assert_eq!(
            counts,
            ObjectCounts {
                nodes: 3,
                ways: 1,
                relations: 1,
            }
        );
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn test_missing_extract() {
        let err = count_objects(Path::new("/nonexistent/region.pbf")).unwrap_err();
        assert!(matches!(err, PipelineError::PathIo { .. }));
    }
}
