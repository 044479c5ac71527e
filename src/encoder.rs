//! Binary mesh encoder.
//!
//! Every shape is encoded on its own into a one-node [`MergedMesh`] and then
//! folded into a [`SceneAccumulator`], which owns the running scene and rebases
//! the incoming indices:
//!
//! - accessor indices inside primitives by the accessor count
//! - buffer-view indices inside accessors by the buffer-view count
//! - buffer indices inside buffer views by the buffer count
//! - material indices inside primitives by the material count
//!
//! The accumulated buffers are consolidated into a single buffer at the end.

use std::collections::BTreeMap;

use crate::{
    data_structures::{
        scene_graph::{
            Accessor, AccessorType, BufferTarget, BufferView, ComponentType, Material, Mesh,
            MergedMesh, Node, Primitive,
        },
        shape::{DEFAULT_DIFFUSE, Shape, ShapeMaterial},
    },
    error::GeometryResult,
};

/// Transparency below this is treated as opaque.
const OPAQUE_EPSILON: f64 = 1e-9;

/// Source frame is Z up, the encoded frame is Y up.
pub fn to_y_up([x, y, z]: [f64; 3]) -> [f32; 3] {
    [x as f32, z as f32, -y as f32]
}

fn to_material(material: &ShapeMaterial) -> Material {
    let [r, g, b] = material.diffuse.unwrap_or(DEFAULT_DIFFUSE);
    let transparency = material.transparency.unwrap_or(0.0).clamp(0.0, 1.0);
    Material {
        name: material.name.clone(),
        base_color: [r as f32, g as f32, b as f32, (1.0 - transparency) as f32],
        blend: transparency > OPAQUE_EPSILON,
    }
}

/**
 * Encodes one shape as a single-node scene.
 *
 * Faces are grouped by (patched) material id, one primitive per group. Each
 * primitive only carries the vertices its faces use, renumbered from zero in
 * ascending order of their original index. Index bytes are written before
 * position bytes, both into the shape's own buffer.
 *
 * The shape is validated first; a shape without faces yields a node whose
 * mesh has no primitives.
 */
pub fn encode_shape(id: &str, shape: &Shape) -> GeometryResult<MergedMesh> {
    shape.validate(id)?;
    let (palette, material_ids) = shape.patched_materials();

    let mut groups: BTreeMap<u32, Vec<[u32; 3]>> = BTreeMap::new();
    for (face, material) in shape.faces.iter().zip(material_ids) {
        groups.entry(material).or_default().push(*face);
    }

    let mut scene = MergedMesh {
        materials: palette.iter().map(to_material).collect(),
        ..Default::default()
    };
    let mut buffer: Vec<u8> = Vec::new();
    let mut mesh = Mesh::default();

    for (material, faces) in groups {
        let mut used: Vec<u32> = faces.iter().flatten().copied().collect();
        used.sort_unstable();
        used.dedup();
        // `used` is sorted and holds every index of `faces`
        let local = |v: u32| used.binary_search(&v).unwrap_or_default() as u32;
        let indices: Vec<u32> = faces.iter().flatten().map(|&v| local(v)).collect();
        let positions: Vec<[f32; 3]> = used
            .iter()
            .map(|&v| to_y_up(shape.vertices[v as usize]))
            .collect();

        let index_view = push_view(
            &mut scene,
            &mut buffer,
            bytemuck::cast_slice(&indices),
            BufferTarget::ElementArrayBuffer,
        );
        let (lo, hi) = indices
            .iter()
            .fold((u32::MAX, 0), |(lo, hi), &i| (lo.min(i), hi.max(i)));
        scene.accessors.push(Accessor {
            buffer_view: index_view,
            component_type: ComponentType::U32,
            count: indices.len(),
            kind: AccessorType::Scalar,
            min: vec![lo as f64],
            max: vec![hi as f64],
        });
        let indices_accessor = scene.accessors.len() - 1;

        let position_view = push_view(
            &mut scene,
            &mut buffer,
            bytemuck::cast_slice(&positions),
            BufferTarget::ArrayBuffer,
        );
        let (min, max) = position_bounds(&positions);
        scene.accessors.push(Accessor {
            buffer_view: position_view,
            component_type: ComponentType::F32,
            count: positions.len(),
            kind: AccessorType::Vec3,
            min,
            max,
        });

        mesh.primitives.push(Primitive {
            indices: indices_accessor,
            position: scene.accessors.len() - 1,
            material: material as usize,
        });
    }

    scene.buffers.push(buffer);
    scene.meshes.push(mesh);
    scene.nodes.push(Node {
        name: Some(id.to_string()),
        mesh: 0,
    });
    Ok(scene)
}

fn push_view(
    scene: &mut MergedMesh,
    buffer: &mut Vec<u8>,
    bytes: &[u8],
    target: BufferTarget,
) -> usize {
    scene.buffer_views.push(BufferView {
        buffer: 0,
        byte_offset: buffer.len(),
        byte_length: bytes.len(),
        target,
    });
    buffer.extend_from_slice(bytes);
    scene.buffer_views.len() - 1
}

fn position_bounds(positions: &[[f32; 3]]) -> (Vec<f64>, Vec<f64>) {
    let mut min = vec![f64::INFINITY; 3];
    let mut max = vec![f64::NEG_INFINITY; 3];
    for p in positions {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis] as f64);
            max[axis] = max[axis].max(p[axis] as f64);
        }
    }
    (min, max)
}

/// Running scene that single-shape documents are merged into.
#[derive(Debug, Default)]
pub struct SceneAccumulator {
    scene: MergedMesh,
}

impl SceneAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scene.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scene.nodes.is_empty()
    }

    /// Appends `part`, offsetting each of its index fields by the matching
    /// running total.
    pub fn append(&mut self, part: MergedMesh) {
        let accessor_base = self.scene.accessors.len();
        let view_base = self.scene.buffer_views.len();
        let buffer_base = self.scene.buffers.len();
        let material_base = self.scene.materials.len();
        let mesh_base = self.scene.meshes.len();

        self.scene
            .accessors
            .extend(part.accessors.into_iter().map(|mut accessor| {
                accessor.buffer_view += view_base;
                accessor
            }));
        self.scene
            .buffer_views
            .extend(part.buffer_views.into_iter().map(|mut view| {
                view.buffer += buffer_base;
                view
            }));
        self.scene.buffers.extend(part.buffers);
        self.scene.materials.extend(part.materials);
        self.scene
            .meshes
            .extend(part.meshes.into_iter().map(|mut mesh| {
                for primitive in &mut mesh.primitives {
                    primitive.indices += accessor_base;
                    primitive.position += accessor_base;
                    primitive.material += material_base;
                }
                mesh
            }));
        self.scene
            .nodes
            .extend(part.nodes.into_iter().map(|mut node| {
                node.mesh += mesh_base;
                node
            }));
    }

    pub fn finish(self) -> MergedMesh {
        self.scene.consolidated()
    }
}

/**
 * Encodes an ordered list of identified shapes into one scene, one node per
 * shape, in input order.
 *
 * Shapes that fail validation or produce no primitive are logged and left
 * out; the result is always a well-formed (possibly empty) scene.
 */
pub fn encode(shapes: &[(String, Shape)]) -> MergedMesh {
    let mut accumulator = SceneAccumulator::new();
    for (id, shape) in shapes {
        match encode_shape(id, shape) {
            Ok(part) if part.meshes.iter().all(|m| m.primitives.is_empty()) => {
                log::warn!("Element {} has no faces and is left out of the scene.", id);
            }
            Ok(part) => accumulator.append(part),
            Err(e) => log::warn!("Element {} could not be encoded: {}", id, e),
        }
    }
    accumulator.finish()
}
