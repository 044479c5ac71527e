//! Reads encoded scenes back into plain per-node arrays.
//!
//! Goes through the `gltf` importer, so what comes out is what any glTF
//! consumer would see.

use crate::error::{GeometryError, GeometryResult};

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedPrimitive {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
    pub base_color: [f32; 4],
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedNode {
    pub name: Option<String>,
    pub primitives: Vec<DecodedPrimitive>,
}

/// Decodes a `.glb` or a `.gltf` document with embedded buffers.
pub fn decode_scene(bytes: &[u8]) -> GeometryResult<Vec<DecodedNode>> {
    let (document, buffers, _) =
        gltf::import_slice(bytes).map_err(|e| GeometryError::Encoding(e.to_string()))?;

    let mut nodes = Vec::new();
    for scene in document.scenes() {
        for node in scene.nodes() {
            let Some(mesh) = node.mesh() else {
                log::warn!("Node {} has no mesh.", node.index());
                continue;
            };
            let mut primitives = Vec::new();
            for primitive in mesh.primitives() {
                let reader =
                    primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &**data));
                let positions = reader
                    .read_positions()
                    .map(|positions| positions.collect())
                    .unwrap_or_default();
                let indices = reader
                    .read_indices()
                    .map(|indices| indices.into_u32().collect())
                    .unwrap_or_default();
                let material = primitive.material();
                primitives.push(DecodedPrimitive {
                    positions,
                    indices,
                    material: material.index(),
                    base_color: material.pbr_metallic_roughness().base_color_factor(),
                });
            }
            nodes.push(DecodedNode {
                name: node.name().map(str::to_string),
                primitives,
            });
        }
    }
    Ok(nodes)
}
