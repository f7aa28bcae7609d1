//! GeoJSON data models shared by the pipeline stages.

pub mod collection;
pub mod geometry;

pub use collection::{Feature, FeatureCollection};
pub use geometry::{round_coordinates, BoundingBox};
