//! Core data types of the geometry pipeline.
//!
//! - `element` defines the capabilities an element of a source model exposes
//! - `shape` holds one triangulated element as delivered by the kernel
//! - `scene_graph` is the merged binary scene the encoder produces
//! - `memory` is a self-contained in-memory model, also used by the tests
//! - `spatial_tree` renders a project's decomposition as a navigable tree

pub mod element;
pub mod memory;
pub mod scene_graph;
pub mod shape;
pub mod spatial_tree;
