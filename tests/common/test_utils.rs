#![allow(dead_code)]

use bim_geom::{
    ElementCategory, Shape, ShapeMaterial,
    data_structures::{
        memory::{ElementRecord, InMemoryModel},
        shape::NO_MATERIAL,
    },
};
use rand::{Rng, rngs::StdRng};

/// Horizontal square at height `z`, two triangles, no material.
pub fn square(x0: f64, y0: f64, size: f64, z: f64) -> Shape {
    Shape::from_flat(
        &[
            x0,
            y0,
            z,
            x0 + size,
            y0,
            z,
            x0 + size,
            y0 + size,
            z,
            x0,
            y0 + size,
            z,
        ],
        &[0, 1, 2, 0, 2, 3],
        vec![],
        vec![NO_MATERIAL; 2],
    )
}

/// Closed axis-aligned box, twelve triangles, all faces on material 0.
pub fn cuboid(min: [f64; 3], max: [f64; 3], material: ShapeMaterial) -> Shape {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    let vertices = [
        x0, y0, z0, x1, y0, z0, x1, y1, z0, x0, y1, z0, // bottom
        x0, y0, z1, x1, y0, z1, x1, y1, z1, x0, y1, z1, // top
    ];
    let faces = [
        0, 2, 1, 0, 3, 2, // bottom
        4, 5, 6, 4, 6, 7, // top
        0, 1, 5, 0, 5, 4, // south
        1, 2, 6, 1, 6, 5, // east
        2, 3, 7, 2, 7, 6, // north
        3, 0, 4, 3, 4, 7, // west
    ];
    Shape::from_flat(&vertices, &faces, vec![material], vec![0; 12])
}

pub fn concrete() -> ShapeMaterial {
    ShapeMaterial::new("Concrete", Some([0.6, 0.6, 0.6]), None)
}

pub fn glass() -> ShapeMaterial {
    ShapeMaterial::new("Glass", Some([0.2, 0.4, 0.8]), Some(0.7))
}

/// Triangle soup over a random vertex cloud with a random palette; some faces
/// carry no material.
pub fn random_shape(rng: &mut StdRng, triangles: usize) -> Shape {
    let vertex_count = rng.gen_range(3..=triangles * 3);
    let vertices = (0..vertex_count)
        .map(|_| {
            [
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(0.0..20.0),
            ]
        })
        .collect();
    let palette_len = rng.gen_range(0..4);
    let materials = (0..palette_len)
        .map(|i| ShapeMaterial::new(&format!("m{i}"), Some([0.5, 0.5, 0.5]), None))
        .collect();
    let faces = (0..triangles)
        .map(|_| {
            [
                rng.gen_range(0..vertex_count as u32),
                rng.gen_range(0..vertex_count as u32),
                rng.gen_range(0..vertex_count as u32),
            ]
        })
        .collect();
    let material_ids = (0..triangles)
        .map(|_| rng.gen_range(-1..palette_len as i32))
        .collect();
    Shape {
        vertices,
        faces,
        edges: vec![],
        materials,
        material_ids,
    }
}

pub fn record(id: &str, type_name: &str, category: ElementCategory) -> ElementRecord {
    ElementRecord::new(id, type_name, category)
}

/**
 * project > site > building > storey, where the storey contains
 *
 * - wall-1 (box 0..4 x 0..0.3)
 * - slab-1 (box 0..4 x 0..4)
 * - assembly-1, decomposed into beam-1 and beam-2
 * - space-1 (box 1..2 x 1..2)
 */
pub fn storey_model() -> InMemoryModel {
    InMemoryModel::new("IFC4")
        .with(record("project", "IfcProject", ElementCategory::Project).with_parts(&["site"]))
        .with(
            record("site", "IfcSite", ElementCategory::SpatialStructure).with_parts(&["building"]),
        )
        .with(
            record("building", "IfcBuilding", ElementCategory::SpatialStructure)
                .with_parts(&["storey"]),
        )
        .with(
            record("storey", "IfcBuildingStorey", ElementCategory::SpatialStructure)
                .named("Ground floor")
                .containing(&["wall-1", "slab-1", "assembly-1", "space-1"]),
        )
        .with(
            record("wall-1", "IfcWall", ElementCategory::Normal)
                .with_shape(cuboid([0.0, 0.0, 0.0], [4.0, 0.3, 3.0], concrete())),
        )
        .with(
            record("slab-1", "IfcSlab", ElementCategory::Normal)
                .with_shape(cuboid([0.0, 0.0, -0.2], [4.0, 4.0, 0.0], concrete())),
        )
        .with(
            record("assembly-1", "IfcElementAssembly", ElementCategory::Assembly)
                .with_parts(&["beam-1", "beam-2"]),
        )
        .with(
            record("beam-1", "IfcBeam", ElementCategory::Normal)
                .with_shape(cuboid([0.0, 2.0, 2.8], [4.0, 2.2, 3.0], concrete())),
        )
        .with(
            record("beam-2", "IfcBeam", ElementCategory::Normal)
                .with_shape(cuboid([2.0, 0.0, 2.8], [2.2, 4.0, 3.0], glass())),
        )
        .with(
            record("space-1", "IfcSpace", ElementCategory::Space)
                .with_shape(cuboid([1.0, 1.0, 0.0], [2.0, 2.0, 2.5], concrete())),
        )
}

pub const SITE_MODEL_JSON: &str = include_str!("../fixtures/site_model.json");

pub fn site_model() -> InMemoryModel {
    InMemoryModel::from_json_str(SITE_MODEL_JSON).expect("fixture parses")
}
