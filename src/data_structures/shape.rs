//! Triangulated element shapes as delivered by the geometry kernel.

use geo::{Area, Coord, LineString, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, GeometryResult};

/// Material id of a face that carries no material.
pub const NO_MATERIAL: i32 = -1;

/// Flat light gray assigned to faces without a material.
pub const DEFAULT_DIFFUSE: [f64; 3] = [0.9686, 0.9686, 0.9686];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeMaterial {
    pub name: String,
    #[serde(default)]
    pub diffuse: Option<[f64; 3]>,
    /// 0 is opaque, 1 fully transparent.
    #[serde(default)]
    pub transparency: Option<f64>,
}

impl ShapeMaterial {
    pub fn new(name: &str, diffuse: Option<[f64; 3]>, transparency: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            diffuse,
            transparency,
        }
    }

    pub fn default_gray() -> Self {
        Self::new("default", Some(DEFAULT_DIFFUSE), None)
    }
}

/// A triangulated shape in the model-local frame (right-handed, Z up).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<[u32; 3]>,
    #[serde(default)]
    pub edges: Vec<[u32; 2]>,
    #[serde(default)]
    pub materials: Vec<ShapeMaterial>,
    /// Parallel to `faces`; either a palette index or [`NO_MATERIAL`].
    #[serde(default)]
    pub material_ids: Vec<i32>,
}

impl Shape {
    /// Builds a shape from the kernel's flat buffers (`[x0, y0, z0, x1, ...]`
    /// and `[f0v0, f0v1, f0v2, ...]`).
    pub fn from_flat(
        vertices: &[f64],
        faces: &[u32],
        materials: Vec<ShapeMaterial>,
        material_ids: Vec<i32>,
    ) -> Self {
        Self {
            vertices: vertices
                .chunks_exact(3)
                .map(|v| [v[0], v[1], v[2]])
                .collect(),
            faces: faces.chunks_exact(3).map(|f| [f[0], f[1], f[2]]).collect(),
            edges: Vec::new(),
            materials,
            material_ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Checks the index invariants: one material id per face, ids inside the
    /// palette (or the sentinel), face indices inside the vertex list.
    pub fn validate(&self, id: &str) -> GeometryResult<()> {
        let invalid = |reason: String| GeometryError::InvalidShape {
            id: id.to_string(),
            reason,
        };
        if self.material_ids.len() != self.faces.len() {
            return Err(invalid(format!(
                "{} material ids for {} faces",
                self.material_ids.len(),
                self.faces.len()
            )));
        }
        if let Some(bad) = self
            .material_ids
            .iter()
            .find(|&&m| m != NO_MATERIAL && (m < 0 || m as usize >= self.materials.len()))
        {
            return Err(invalid(format!(
                "material id {bad} outside palette of {}",
                self.materials.len()
            )));
        }
        let vertex_count = self.vertices.len();
        if let Some(face) = self
            .faces
            .iter()
            .find(|face| face.iter().any(|&v| v as usize >= vertex_count))
        {
            return Err(invalid(format!(
                "face {face:?} references a vertex beyond {vertex_count}"
            )));
        }
        if let Some(edge) = self
            .edges
            .iter()
            .find(|edge| edge.iter().any(|&v| v as usize >= vertex_count))
        {
            return Err(invalid(format!(
                "edge {edge:?} references a vertex beyond {vertex_count}"
            )));
        }
        Ok(())
    }

    /**
     * Returns a palette in which every face is addressable, plus the face
     * material ids remapped onto it.
     *
     * When at least one face carries `NO_MATERIAL`, a flat gray default is
     * appended and those faces point at it (its id is the palette length
     * before the patch). The shape itself is left untouched.
     */
    pub fn patched_materials(&self) -> (Vec<ShapeMaterial>, Vec<u32>) {
        let mut palette = self.materials.clone();
        if !self.material_ids.contains(&NO_MATERIAL) {
            let ids = self.material_ids.iter().map(|&m| m as u32).collect();
            return (palette, ids);
        }
        let default_id = palette.len() as u32;
        palette.push(ShapeMaterial::default_gray());
        let ids = self
            .material_ids
            .iter()
            .map(|&m| if m == NO_MATERIAL { default_id } else { m as u32 })
            .collect();
        (palette, ids)
    }

    /// Axis-aligned 3D bounds as `(min, max)`.
    pub fn bounds_3d(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(mut lo, mut hi), v| {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(v[axis]);
                hi[axis] = hi[axis].max(v[axis]);
            }
            (lo, hi)
        }))
    }

    /// The X/Y extent of all vertices.
    pub fn bbox_2d(&self) -> Option<Rect<f64>> {
        self.bounds_3d().map(|(lo, hi)| {
            Rect::new(Coord { x: lo[0], y: lo[1] }, Coord { x: hi[0], y: hi[1] })
        })
    }

    /// Centre of the X/Y extent, used for approximate footprints.
    pub fn bbox_centroid_2d(&self) -> Option<Point<f64>> {
        self.bbox_2d().map(|rect| rect.center().into())
    }

    /// Every triangle dropped onto the X/Y plane, skipping the ones that
    /// collapse to zero area (vertical faces).
    pub fn projected_triangles(&self) -> Vec<Polygon<f64>> {
        self.faces
            .iter()
            .filter_map(|face| {
                let ring: Vec<Coord<f64>> = face
                    .iter()
                    .map(|&v| {
                        let [x, y, _] = self.vertices[v as usize];
                        Coord { x, y }
                    })
                    .collect();
                let triangle = Polygon::new(LineString::from(ring), vec![]);
                (triangle.unsigned_area() > f64::EPSILON).then_some(triangle)
            })
            .collect()
    }
}
