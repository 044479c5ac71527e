//! bim-geom
//!
//! Geometry core for serving building models through a semantic view and a
//! geospatial view. The crate walks a model's spatial decomposition, pulls
//! triangulated shapes from an external geometry kernel, merges them into a
//! single binary scene or a single 2D footprint, and moves the result between
//! the model frame and world coordinate reference systems.
//!
//! High-level modules
//! - `config`: service configuration, request parameters and logging setup
//! - `data_structures`: elements, shapes, the merged scene graph, an in-memory model
//! - `resources`: boundaries to the model store and the geometry kernel
//! - `walker`: collects the geometry-bearing leaves below an element
//! - `compose`: 2D unions/hulls and 3D scene composition
//! - `encoder`: binary mesh encoding with index rebasing across shapes
//! - `georef`: georeference resolution, reprojection and geodesy
//! - `feature`: GeoJSON features and navigation links
//! - `guid`: compressed IFC ids and their UUID spelling
//! - `service`: request-level orchestration of all of the above
//!

pub mod compose;
pub mod config;
pub mod data_structures;
pub mod encoder;
pub mod error;
pub mod feature;
pub mod georef;
pub mod guid;
pub mod resources;
pub mod service;
pub mod walker;

// Re-exports commonly used types for convenience in downstream code.
pub use config::{FootprintKind, GeometryKind, GeometryRequest, ServiceConfig};
pub use data_structures::element::{BuildingModel, Element, ElementCategory};
pub use data_structures::scene_graph::MergedMesh;
pub use data_structures::shape::{Shape, ShapeMaterial};
pub use error::{GeometryError, GeometryResult};
pub use georef::GeorefParams;
pub use resources::ShapeExtractor;
pub use service::{GeometryResponse, GeometryService};
