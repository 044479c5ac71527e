//! Merged binary scene graph.
//!
//! A [`MergedMesh`] is the output of the mesh encoder: one node per encoded
//! element, each referencing one mesh whose primitives point at index/position
//! accessors, which in turn point at buffer views over the backing buffers.
//! All cross references are plain indices into the flat lists so that merging
//! documents is a matter of offsetting them.
//!
//! The structure maps one-to-one onto glTF 2.0 and is serialized through the
//! `gltf` crate's JSON types, either as a `.gltf` document with base64 data
//! URIs or as a single-buffer `.glb`.

use std::{borrow::Cow, collections::BTreeMap, path::Path};

use anyhow::Context as _;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use gltf::json::{self, validation::Checked::Valid, validation::USize64};
use serde::Serialize;

use crate::error::{GeometryError, GeometryResult};

const DATA_URI_HEADER: &str = "data:application/octet-stream;base64,";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ComponentType {
    U32,
    F32,
}

impl ComponentType {
    pub fn size(self) -> usize {
        4
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AccessorType {
    Scalar,
    Vec3,
}

impl AccessorType {
    pub fn arity(self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec3 => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BufferTarget {
    ArrayBuffer,
    ElementArrayBuffer,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Accessor {
    pub buffer_view: usize,
    pub component_type: ComponentType,
    pub count: usize,
    pub kind: AccessorType,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl Accessor {
    pub fn byte_length(&self) -> usize {
        self.count * self.kind.arity() * self.component_type.size()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub target: BufferTarget,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Primitive {
    /// Accessor holding the local triangle indices.
    pub indices: usize,
    /// Accessor holding the compacted positions.
    pub position: usize,
    pub material: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    pub name: Option<String>,
    pub mesh: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Material {
    pub name: String,
    /// Linear RGBA; alpha is `1 - transparency`.
    pub base_color: [f32; 4],
    pub blend: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MergedMesh {
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    #[serde(skip)]
    pub buffers: Vec<Vec<u8>>,
    pub materials: Vec<Material>,
}

impl MergedMesh {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Raw bytes covered by a buffer view.
    pub fn view_bytes(&self, view: usize) -> GeometryResult<&[u8]> {
        let view = self
            .buffer_views
            .get(view)
            .ok_or_else(|| GeometryError::Encoding(format!("no buffer view {view}")))?;
        self.buffers
            .get(view.buffer)
            .and_then(|buffer| buffer.get(view.byte_offset..view.byte_offset + view.byte_length))
            .ok_or_else(|| {
                GeometryError::Encoding(format!(
                    "buffer view out of range: buffer {} [{}..+{}]",
                    view.buffer, view.byte_offset, view.byte_length
                ))
            })
    }

    /// Reads an index accessor back as `u32`s.
    pub fn read_indices(&self, accessor: usize) -> GeometryResult<Vec<u32>> {
        let accessor = self.accessor(accessor)?;
        let bytes = self.view_bytes(accessor.buffer_view)?;
        Ok(bytes
            .chunks_exact(4)
            .take(accessor.count)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    /// Reads a position accessor back as `[f32; 3]`s.
    pub fn read_positions(&self, accessor: usize) -> GeometryResult<Vec<[f32; 3]>> {
        let accessor = self.accessor(accessor)?;
        let bytes = self.view_bytes(accessor.buffer_view)?;
        Ok(bytes
            .chunks_exact(12)
            .take(accessor.count)
            .map(|b| {
                let f = |i: usize| f32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]]);
                [f(0), f(4), f(8)]
            })
            .collect())
    }

    fn accessor(&self, idx: usize) -> GeometryResult<&Accessor> {
        self.accessors
            .get(idx)
            .ok_or_else(|| GeometryError::Encoding(format!("no accessor {idx}")))
    }

    /**
     * Verifies every cross reference of the scene.
     *
     * Beyond plain bounds checks this decodes each primitive's index accessor
     * and makes sure no index points past that primitive's own position
     * accessor.
     */
    pub fn check_invariants(&self) -> GeometryResult<()> {
        let fail = |msg: String| Err(GeometryError::Encoding(msg));
        for (i, node) in self.nodes.iter().enumerate() {
            if node.mesh >= self.meshes.len() {
                return fail(format!("node {i} references missing mesh {}", node.mesh));
            }
        }
        for (i, view) in self.buffer_views.iter().enumerate() {
            let Some(buffer) = self.buffers.get(view.buffer) else {
                return fail(format!("view {i} references missing buffer {}", view.buffer));
            };
            if view.byte_offset + view.byte_length > buffer.len() {
                return fail(format!("view {i} overruns buffer {}", view.buffer));
            }
        }
        for (i, accessor) in self.accessors.iter().enumerate() {
            let Some(view) = self.buffer_views.get(accessor.buffer_view) else {
                return fail(format!(
                    "accessor {i} references missing view {}",
                    accessor.buffer_view
                ));
            };
            if accessor.byte_length() > view.byte_length {
                return fail(format!("accessor {i} overruns view {}", accessor.buffer_view));
            }
        }
        for (m, mesh) in self.meshes.iter().enumerate() {
            for primitive in &mesh.primitives {
                if primitive.material >= self.materials.len() {
                    return fail(format!(
                        "mesh {m} references missing material {}",
                        primitive.material
                    ));
                }
                let vertex_count = self.accessor(primitive.position)?.count;
                let indices = self.read_indices(primitive.indices)?;
                if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                    return fail(format!(
                        "mesh {m} index {bad} outside its {vertex_count} vertices"
                    ));
                }
            }
        }
        Ok(())
    }

    /// Folds all backing buffers into one, rewriting buffer views to point
    /// into the combined buffer.
    pub fn consolidated(mut self) -> Self {
        if self.buffers.len() <= 1 {
            return self;
        }
        let mut starts = Vec::with_capacity(self.buffers.len());
        let mut combined = Vec::with_capacity(self.buffers.iter().map(Vec::len).sum());
        for buffer in self.buffers.drain(..) {
            starts.push(combined.len());
            combined.extend_from_slice(&buffer);
            // Keep every chunk 4-byte aligned.
            combined.resize(combined.len().next_multiple_of(4), 0);
        }
        for view in &mut self.buffer_views {
            view.byte_offset += starts[view.buffer];
            view.buffer = 0;
        }
        self.buffers = vec![combined];
        self
    }

    /**
     * Converts the scene into glTF JSON types.
     *
     * `embed_buffers` chooses between base64 data URIs (standalone `.gltf`)
     * and URI-less buffers that refer to the GLB binary chunk.
     */
    pub fn to_gltf_root(&self, embed_buffers: bool) -> json::Root {
        let idx = |i: usize| i as u32;

        let buffers = self
            .buffers
            .iter()
            .map(|data| json::Buffer {
                byte_length: USize64::from(data.len()),
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                uri: embed_buffers.then(|| format!("{DATA_URI_HEADER}{}", BASE64.encode(data))),
            })
            .collect();

        let buffer_views = self
            .buffer_views
            .iter()
            .map(|view| json::buffer::View {
                buffer: json::Index::new(idx(view.buffer)),
                byte_length: USize64::from(view.byte_length),
                byte_offset: Some(USize64::from(view.byte_offset)),
                byte_stride: None,
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                target: Some(Valid(match view.target {
                    BufferTarget::ArrayBuffer => json::buffer::Target::ArrayBuffer,
                    BufferTarget::ElementArrayBuffer => json::buffer::Target::ElementArrayBuffer,
                })),
            })
            .collect();

        let accessors = self
            .accessors
            .iter()
            .map(|accessor| {
                let bound = |values: &[f64]| -> json::Value {
                    match accessor.component_type {
                        ComponentType::U32 => {
                            json::Value::from(values.iter().map(|v| *v as u64).collect::<Vec<_>>())
                        }
                        ComponentType::F32 => json::Value::from(values.to_vec()),
                    }
                };
                json::Accessor {
                    buffer_view: Some(json::Index::new(idx(accessor.buffer_view))),
                    byte_offset: Some(USize64(0)),
                    count: USize64::from(accessor.count),
                    component_type: Valid(json::accessor::GenericComponentType(
                        match accessor.component_type {
                            ComponentType::U32 => json::accessor::ComponentType::U32,
                            ComponentType::F32 => json::accessor::ComponentType::F32,
                        },
                    )),
                    extensions: Default::default(),
                    extras: Default::default(),
                    type_: Valid(match accessor.kind {
                        AccessorType::Scalar => json::accessor::Type::Scalar,
                        AccessorType::Vec3 => json::accessor::Type::Vec3,
                    }),
                    min: Some(bound(&accessor.min)),
                    max: Some(bound(&accessor.max)),
                    name: None,
                    normalized: false,
                    sparse: None,
                }
            })
            .collect();

        let meshes = self
            .meshes
            .iter()
            .map(|mesh| json::Mesh {
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                primitives: mesh
                    .primitives
                    .iter()
                    .map(|primitive| {
                        let mut attributes = BTreeMap::new();
                        attributes.insert(
                            Valid(json::mesh::Semantic::Positions),
                            json::Index::new(idx(primitive.position)),
                        );
                        json::mesh::Primitive {
                            attributes,
                            extensions: Default::default(),
                            extras: Default::default(),
                            indices: Some(json::Index::new(idx(primitive.indices))),
                            material: Some(json::Index::new(idx(primitive.material))),
                            mode: Valid(json::mesh::Mode::Triangles),
                            targets: None,
                        }
                    })
                    .collect(),
                weights: None,
            })
            .collect();

        let materials = self
            .materials
            .iter()
            .map(|material| json::Material {
                name: Some(material.name.clone()),
                alpha_mode: Valid(if material.blend {
                    json::material::AlphaMode::Blend
                } else {
                    json::material::AlphaMode::Opaque
                }),
                double_sided: true,
                pbr_metallic_roughness: json::material::PbrMetallicRoughness {
                    base_color_factor: json::material::PbrBaseColorFactor(material.base_color),
                    metallic_factor: json::material::StrengthFactor(0.0),
                    roughness_factor: json::material::StrengthFactor(0.5),
                    ..Default::default()
                },
                ..Default::default()
            })
            .collect();

        let nodes: Vec<json::Node> = self
            .nodes
            .iter()
            .map(|node| json::Node {
                camera: None,
                children: None,
                extensions: Default::default(),
                extras: Default::default(),
                matrix: None,
                mesh: Some(json::Index::new(idx(node.mesh))),
                name: node.name.clone(),
                rotation: None,
                scale: None,
                translation: None,
                skin: None,
                weights: None,
            })
            .collect();

        let scene = json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            nodes: (0..nodes.len()).map(|i| json::Index::new(idx(i))).collect(),
        };

        json::Root {
            asset: json::Asset {
                generator: Some(format!("bim-geom {}", env!("CARGO_PKG_VERSION"))),
                ..Default::default()
            },
            accessors,
            buffers,
            buffer_views,
            meshes,
            materials,
            nodes,
            scenes: vec![scene],
            scene: Some(json::Index::new(0)),
            ..Default::default()
        }
    }

    /// glTF JSON document with every buffer embedded as a data URI.
    pub fn to_gltf_json(&self) -> GeometryResult<serde_json::Value> {
        serde_json::to_value(self.to_gltf_root(true))
            .map_err(|e| GeometryError::Encoding(e.to_string()))
    }

    /// Binary glTF with the consolidated buffer as its BIN chunk.
    pub fn to_glb(&self) -> GeometryResult<Vec<u8>> {
        let packed = self.clone().consolidated();
        let root = packed.to_gltf_root(false);
        let json_bytes =
            serde_json::to_vec(&root).map_err(|e| GeometryError::Encoding(e.to_string()))?;
        let bin = packed.buffers.into_iter().next().filter(|b| !b.is_empty());

        // header + json chunk header + padded json (+ bin chunk header + padded bin)
        let mut length = 12 + 8 + json_bytes.len().next_multiple_of(4);
        if let Some(bin) = &bin {
            length += 8 + bin.len().next_multiple_of(4);
        }
        let glb = gltf::binary::Glb {
            header: gltf::binary::Header {
                magic: *b"glTF",
                version: 2,
                length: length as u32,
            },
            json: Cow::Owned(json_bytes),
            bin: bin.map(Cow::Owned),
        };
        glb.to_vec().map_err(|e| GeometryError::Encoding(e.to_string()))
    }

    pub fn write_glb(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bytes = self.to_glb()?;
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
