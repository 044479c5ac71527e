//! Georeference resolution and reprojection.
//!
//! A model is georeferenced through a map conversion: a rotation about the
//! vertical axis, a uniform scale and a translation into a projected CRS.
//! [`resolve`] reads it from the model:
//!
//! - IFC4-family schemas: the first-class coordinate operations of the
//!   project's representation contexts (the last one declared wins)
//! - otherwise, or when none is declared: the `ePSet_MapConversion` and
//!   `ePSet_ProjectedCRS` property sets of the site
//!
//! The result is immutable and cached per model in a [`GeorefSlot`]. The
//! target CRS is a parameter of usage ([`reproject_point`], [`world_trs`]),
//! never part of the cached value.

pub mod geodesy;
#[cfg(feature = "proj-transforms")]
pub mod proj_backend;
pub mod transverse_mercator;

use std::sync::OnceLock;

use cgmath::{Matrix4, Point3, Rad, SquareMatrix, Transform, Vector3};
use geo::{Coord, Geometry, MapCoords};
use serde::Serialize;

use crate::{
    data_structures::element::{BuildingModel, CoordinateOperation, PropertySet},
    error::{GeometryError, GeometryResult},
};
use geodesy::{Geodesy, same_crs};

pub const MAP_CONVERSION_PSET: &str = "ePSet_MapConversion";
pub const PROJECTED_CRS_PSET: &str = "ePSet_ProjectedCRS";

pub const GEOCENTRIC_CRS: &str = "EPSG:4978";
pub const GEOGRAPHIC_CRS: &str = "EPSG:4326";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeorefParams {
    pub source_crs: String,
    /// Counter-clockwise, radians.
    pub rotation: f64,
    /// (eastings, northings, orthogonal height) of the local origin.
    pub translation: [f64; 3],
    pub scale: [f64; 3],
}

/// Origin, orientation and scale of a model in some CRS.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Trs {
    pub translation: [f64; 3],
    pub rotation: f64,
    pub scale: [f64; 3],
    pub crs: String,
}

/// Rotation encoded by the projected local X axis, counter-clockwise positive.
pub fn xaxis_to_angle(abscissa: f64, ordinate: f64) -> f64 {
    ordinate.atan2(abscissa)
}

impl GeorefParams {
    /**
     * Builds the parameters from a declared map conversion.
     *
     * A missing abscissa/ordinate becomes 0 and a missing scale becomes 1.
     * A literal zero, negative or non-finite scale would collapse or mirror
     * the geometry and is rejected.
     */
    pub fn from_operation(operation: &CoordinateOperation) -> GeometryResult<Self> {
        let abscissa = operation.x_axis_abscissa.unwrap_or(0.0);
        let ordinate = operation.x_axis_ordinate.unwrap_or(0.0);
        let scale = operation.scale.unwrap_or(1.0);
        if !scale.is_finite() || scale <= 0.0 {
            return Err(GeometryError::InvalidGeoref(format!(
                "scale {scale} in map conversion to {}",
                operation.target_crs
            )));
        }
        let translation = [
            operation.eastings,
            operation.northings,
            operation.orthogonal_height,
        ];
        if translation.iter().chain([&abscissa, &ordinate]).any(|v| !v.is_finite()) {
            return Err(GeometryError::InvalidGeoref(format!(
                "non-finite map conversion to {}",
                operation.target_crs
            )));
        }
        if operation.target_crs.trim().is_empty() {
            return Err(GeometryError::InvalidGeoref(
                "map conversion without target CRS".to_string(),
            ));
        }
        Ok(Self {
            source_crs: operation.target_crs.clone(),
            rotation: xaxis_to_angle(abscissa, ordinate),
            translation,
            scale: [scale; 3],
        })
    }

    pub fn to_matrix(&self) -> Matrix4<f64> {
        Matrix4::from_translation(Vector3::from(self.translation))
            * Matrix4::from_angle_z(Rad(self.rotation))
            * Matrix4::from_nonuniform_scale(self.scale[0], self.scale[1], self.scale[2])
    }

    /// Local (x, y, z) to (E, N, H) in `source_crs`.
    pub fn transform(&self, point: [f64; 3]) -> [f64; 3] {
        self.to_matrix().transform_point(Point3::from(point)).into()
    }

    /// (E, N, H) in `source_crs` back to the local frame.
    pub fn to_local(&self, point: [f64; 3]) -> GeometryResult<[f64; 3]> {
        let inverse = self
            .to_matrix()
            .invert()
            .ok_or_else(|| GeometryError::InvalidGeoref("singular map conversion".to_string()))?;
        Ok(inverse.transform_point(Point3::from(point)).into())
    }

    pub fn trs(&self) -> Trs {
        Trs {
            translation: self.translation,
            rotation: self.rotation,
            scale: self.scale,
            crs: self.source_crs.clone(),
        }
    }
}

fn number(pset: &PropertySet, key: &str) -> Option<f64> {
    pset.get(key).and_then(serde_json::Value::as_f64)
}

fn operation_from_psets(
    map_conversion: &PropertySet,
    projected_crs: &PropertySet,
) -> GeometryResult<CoordinateOperation> {
    let target_crs = projected_crs
        .get("Name")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            GeometryError::InvalidGeoref(format!("{PROJECTED_CRS_PSET} without a Name"))
        })?;
    Ok(CoordinateOperation {
        eastings: number(map_conversion, "Eastings").unwrap_or(0.0),
        northings: number(map_conversion, "Northings").unwrap_or(0.0),
        orthogonal_height: number(map_conversion, "OrthogonalHeight").unwrap_or(0.0),
        x_axis_abscissa: number(map_conversion, "XAxisAbscissa"),
        x_axis_ordinate: number(map_conversion, "XAxisOrdinate"),
        scale: number(map_conversion, "Scale"),
        target_crs: target_crs.to_string(),
    })
}

/**
 * Derives the local-to-world map of `model`.
 *
 * `Ok(None)` means the model carries no georeference at all; callers then
 * serve local coordinates. Degenerate parameters are an error.
 */
pub fn resolve<M: BuildingModel + ?Sized>(model: &M) -> GeometryResult<Option<GeorefParams>> {
    let mut operation = None;
    if model.schema().to_ascii_uppercase().starts_with("IFC4") {
        operation = model.coordinate_operations().pop();
    }
    if operation.is_none() {
        if let (Some(map_conversion), Some(projected_crs)) = (
            model.site_property_set(MAP_CONVERSION_PSET),
            model.site_property_set(PROJECTED_CRS_PSET),
        ) {
            log::debug!("Falling back to site property sets for the map conversion.");
            operation = Some(operation_from_psets(&map_conversion, &projected_crs)?);
        }
    }
    let Some(operation) = operation else {
        log::debug!("Model carries no georeference.");
        return Ok(None);
    };
    let params = GeorefParams::from_operation(&operation)?;
    log::info!(
        "Georeferenced to {} at ({}, {}, {}), rotation {:.6} rad, scale {}",
        params.source_crs,
        params.translation[0],
        params.translation[1],
        params.translation[2],
        params.rotation,
        params.scale[0]
    );
    Ok(Some(params))
}

/// Per-model cache of the resolver result.
#[derive(Debug, Default)]
pub struct GeorefSlot(OnceLock<Option<GeorefParams>>);

impl GeorefSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once; errors are returned and not cached.
    pub fn get_or_resolve<M: BuildingModel + ?Sized>(
        &self,
        model: &M,
    ) -> GeometryResult<Option<&GeorefParams>> {
        if let Some(cached) = self.0.get() {
            return Ok(cached.as_ref());
        }
        let resolved = resolve(model)?;
        Ok(self.0.get_or_init(|| resolved).as_ref())
    }

    pub fn is_resolved(&self) -> bool {
        self.0.get().is_some()
    }
}

/// Local point to `target_crs`, via the model's own CRS.
pub fn reproject_point(
    point: [f64; 3],
    georef: &GeorefParams,
    target_crs: &str,
    geodesy: &dyn Geodesy,
) -> GeometryResult<[f64; 3]> {
    let global = georef.transform(point);
    if same_crs(target_crs, &georef.source_crs) {
        return Ok(global);
    }
    geodesy.project(global, &georef.source_crs, target_crs)
}

/// 2D local geometry to `target_crs`; local z is taken as 0.
pub fn reproject_geometry(
    geometry: &Geometry<f64>,
    georef: &GeorefParams,
    target_crs: &str,
    geodesy: &dyn Geodesy,
) -> GeometryResult<Geometry<f64>> {
    geometry.try_map_coords(|c: Coord<f64>| {
        let [x, y, _] = reproject_point([c.x, c.y, 0.0], georef, target_crs, geodesy)?;
        Ok(Coord { x, y })
    })
}

/**
 * The model origin and orientation expressed in `target_crs`.
 *
 * For geographic targets the rotation is corrected by the meridian
 * convergence of the source projection at the model origin.
 */
pub fn world_trs(
    georef: &GeorefParams,
    target_crs: &str,
    geodesy: &dyn Geodesy,
) -> GeometryResult<Trs> {
    let origin = reproject_point([0.0; 3], georef, target_crs, geodesy)?;
    let mut rotation = georef.rotation;
    if geodesy.is_geographic(target_crs) {
        rotation += geodesy.meridian_convergence(georef.translation, &georef.source_crs)?;
    }
    Ok(Trs {
        translation: origin,
        rotation,
        scale: georef.scale,
        crs: target_crs.to_string(),
    })
}
