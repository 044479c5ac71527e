//! PROJ-backed transforms (feature `proj-transforms`).
//!
//! A transformer is built per call; `proj::Proj` is not `Sync`. Geocentric
//! systems go through the built-in conversion with `EPSG:4326` as pivot since
//! the planar `convert` drops the third axis.

use proj::Proj;

use super::geodesy::{BuiltinGeodesy, Crs, Geodesy, same_crs};
use crate::error::{GeometryError, GeometryResult};

const PIVOT: &str = "EPSG:4326";

#[derive(Clone, Copy, Debug, Default)]
pub struct ProjGeodesy;

impl ProjGeodesy {
    fn convert_planar(&self, [x, y, z]: [f64; 3], from: &str, to: &str) -> GeometryResult<[f64; 3]> {
        if same_crs(from, to) {
            return Ok([x, y, z]);
        }
        // new_known_crs normalizes both ends to (east, north) axis order
        let transformer = Proj::new_known_crs(from, to, None).map_err(|e| {
            log::warn!("PROJ could not build {} -> {}: {}", from, to, e);
            GeometryError::unsupported_pair(from, to)
        })?;
        let (tx, ty) = transformer
            .convert((x, y))
            .map_err(|e| GeometryError::InvalidGeoref(format!("PROJ transform failed: {e}")))?;
        Ok([tx, ty, z])
    }
}

impl Geodesy for ProjGeodesy {
    fn project(&self, point: [f64; 3], from: &str, to: &str) -> GeometryResult<[f64; 3]> {
        let geocentric = |crs: &str| Crs::parse(crs) == Some(Crs::Geocentric);
        match (geocentric(from), geocentric(to)) {
            (false, false) => self.convert_planar(point, from, to),
            (true, _) => {
                let geographic = BuiltinGeodesy.project(point, from, PIVOT)?;
                self.project(geographic, PIVOT, to)
            }
            (false, true) => {
                let geographic = self.convert_planar(point, from, PIVOT)?;
                BuiltinGeodesy.project(geographic, PIVOT, to)
            }
        }
    }

    fn is_geographic(&self, crs: &str) -> bool {
        Crs::parse(crs) == Some(Crs::Geographic)
    }
}
