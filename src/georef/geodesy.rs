//! CRS-to-CRS transforms.
//!
//! [`Geodesy`] is the collaborator the resolver pipes world coordinates
//! through. Points are always `[x, y, z]` with x = east/longitude and
//! y = north/latitude, whatever the native axis order of the CRS.
//!
//! [`BuiltinGeodesy`] covers the systems building models are usually
//! georeferenced in:
//!
//! - geographic `EPSG:4326`, `EPSG:4258`, `EPSG:4979`, `EPSG:4937`
//! - geocentric `EPSG:4978`, `EPSG:4936`
//! - WGS84 UTM `EPSG:326zz` / `EPSG:327zz` and ETRS89 UTM `EPSG:258zz`
//! - Web Mercator `EPSG:3857`
//!
//! WGS84 and ETRS89 are treated as the same datum. Anything else is a
//! [`GeometryError::UnsupportedCrsPair`]; enable `proj-transforms` for PROJ.

use super::transverse_mercator::{
    GRS80, TransverseMercator, WGS84, web_mercator_forward, web_mercator_inverse,
};
use crate::error::{GeometryError, GeometryResult};

/// Latitude step used for the finite-difference convergence, in degrees.
const CONVERGENCE_STEP: f64 = 1e-5;

pub trait Geodesy: Send + Sync {
    /// Transforms `point` from `from` to `to`. Equal CRS codes are the identity.
    fn project(&self, point: [f64; 3], from: &str, to: &str) -> GeometryResult<[f64; 3]>;

    fn is_geographic(&self, crs: &str) -> bool;

    /// Angle from true north to grid north at `point` (given in
    /// `source_crs`), in radians, clockwise positive.
    fn meridian_convergence(&self, point: [f64; 3], source_crs: &str) -> GeometryResult<f64> {
        convergence_by_finite_difference(self, point, source_crs)
    }
}

/**
 * Meridian convergence from a small northward step.
 *
 * The point is taken to `EPSG:4326`, nudged north and brought back; the
 * direction of that step in grid coordinates is true north.
 */
pub fn convergence_by_finite_difference<G: Geodesy + ?Sized>(
    geodesy: &G,
    point: [f64; 3],
    source_crs: &str,
) -> GeometryResult<f64> {
    if geodesy.is_geographic(source_crs) {
        return Ok(0.0);
    }
    let [lon, lat, h] = geodesy.project(point, source_crs, "EPSG:4326")?;
    let north = [lon, (lat + CONVERGENCE_STEP).min(90.0), h];
    let south = [lon, (lat - CONVERGENCE_STEP).max(-90.0), h];
    let [x0, y0, _] = geodesy.project(south, "EPSG:4326", source_crs)?;
    let [x1, y1, _] = geodesy.project(north, "EPSG:4326", source_crs)?;
    Ok(-(x1 - x0).atan2(y1 - y0))
}

/// Parses `EPSG:n`, `epsg:n`, `urn:ogc:def:crs:EPSG::n` or a bare code.
pub fn epsg_code(crs: &str) -> Option<u32> {
    let crs = crs.trim();
    let lower = crs.to_ascii_lowercase();
    let code = lower
        .strip_prefix("urn:ogc:def:crs:epsg::")
        .or_else(|| lower.strip_prefix("urn:ogc:def:crs:epsg:"))
        .or_else(|| lower.strip_prefix("epsg::"))
        .or_else(|| lower.strip_prefix("epsg:"))
        .unwrap_or(&lower);
    code.parse().ok()
}

/// Whether two identifiers name the same CRS.
pub fn same_crs(a: &str, b: &str) -> bool {
    match (epsg_code(a), epsg_code(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Crs {
    Geographic,
    Geocentric,
    Utm { zone: u32, south: bool, etrs89: bool },
    WebMercator,
}

impl Crs {
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 | 4258 | 4979 | 4937 => Some(Crs::Geographic),
            4978 | 4936 => Some(Crs::Geocentric),
            32601..=32660 => Some(Crs::Utm {
                zone: code - 32600,
                south: false,
                etrs89: false,
            }),
            32701..=32760 => Some(Crs::Utm {
                zone: code - 32700,
                south: true,
                etrs89: false,
            }),
            25828..=25838 => Some(Crs::Utm {
                zone: code - 25800,
                south: false,
                etrs89: true,
            }),
            3857 | 900913 => Some(Crs::WebMercator),
            _ => None,
        }
    }

    pub fn parse(crs: &str) -> Option<Self> {
        epsg_code(crs).and_then(Self::from_epsg)
    }

    fn transverse_mercator(&self) -> GeometryResult<Option<TransverseMercator>> {
        match *self {
            Crs::Utm {
                zone,
                south,
                etrs89,
            } => TransverseMercator::utm(if etrs89 { GRS80 } else { WGS84 }, zone, south).map(Some),
            _ => Ok(None),
        }
    }

    /// Into geographic (lon, lat, h).
    fn unproject(&self, [x, y, z]: [f64; 3]) -> GeometryResult<[f64; 3]> {
        Ok(match self {
            Crs::Geographic => [x, y, z],
            Crs::Geocentric => geocentric_to_geographic([x, y, z]),
            Crs::WebMercator => {
                let (lon, lat) = web_mercator_inverse(x, y);
                [lon, lat, z]
            }
            Crs::Utm { .. } => match self.transverse_mercator()? {
                Some(tm) => {
                    let (lon, lat) = tm.inverse(x, y);
                    [lon, lat, z]
                }
                None => [x, y, z],
            },
        })
    }

    /// From geographic (lon, lat, h).
    fn project(&self, [lon, lat, h]: [f64; 3]) -> GeometryResult<[f64; 3]> {
        Ok(match self {
            Crs::Geographic => [lon, lat, h],
            Crs::Geocentric => geographic_to_geocentric([lon, lat, h]),
            Crs::WebMercator => {
                let (x, y) = web_mercator_forward(lon, lat);
                [x, y, h]
            }
            Crs::Utm { .. } => match self.transverse_mercator()? {
                Some(tm) => {
                    let (x, y) = tm.forward(lon, lat)?;
                    [x, y, h]
                }
                None => [lon, lat, h],
            },
        })
    }
}

pub fn geographic_to_geocentric([lon, lat, h]: [f64; 3]) -> [f64; 3] {
    let e2 = WGS84.e2();
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    let n = WGS84.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
    [
        (n + h) * lat.cos() * lon.cos(),
        (n + h) * lat.cos() * lon.sin(),
        (n * (1.0 - e2) + h) * lat.sin(),
    ]
}

/// Bowring's closed form, refined by one fixed-point step.
pub fn geocentric_to_geographic([x, y, z]: [f64; 3]) -> [f64; 3] {
    let a = WGS84.a;
    let e2 = WGS84.e2();
    let b = a * (1.0 - WGS84.f);
    let ep2 = (a * a - b * b) / (b * b);
    let p = x.hypot(y);
    let lon = y.atan2(x);
    if p < 1e-9 {
        let lat = if z >= 0.0 { 90.0 } else { -90.0 };
        return [lon.to_degrees(), lat, z.abs() - b];
    }
    let theta = (z * a).atan2(p * b);
    let mut lat = (z + ep2 * b * theta.sin().powi(3)).atan2(p - e2 * a * theta.cos().powi(3));
    let n = |lat: f64| a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
    let mut h = p / lat.cos() - n(lat);
    lat = z.atan2(p * (1.0 - e2 * n(lat) / (n(lat) + h)));
    h = p / lat.cos() - n(lat);
    [lon.to_degrees(), lat.to_degrees(), h]
}

/// Pure Rust transforms between the systems listed in the module docs.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinGeodesy;

impl Geodesy for BuiltinGeodesy {
    fn project(&self, point: [f64; 3], from: &str, to: &str) -> GeometryResult<[f64; 3]> {
        if same_crs(from, to) {
            return Ok(point);
        }
        let (Some(source), Some(target)) = (Crs::parse(from), Crs::parse(to)) else {
            return Err(GeometryError::unsupported_pair(from, to));
        };
        target.project(source.unproject(point)?)
    }

    fn is_geographic(&self, crs: &str) -> bool {
        Crs::parse(crs) == Some(Crs::Geographic)
    }

    fn meridian_convergence(&self, point: [f64; 3], source_crs: &str) -> GeometryResult<f64> {
        match Crs::parse(source_crs) {
            Some(crs @ Crs::Utm { .. }) => {
                let [lon, lat, _] = crs.unproject(point)?;
                let tm = crs
                    .transverse_mercator()?
                    .ok_or_else(|| GeometryError::unsupported_pair(source_crs, "EPSG:4326"))?;
                Ok(tm.convergence(lon, lat).to_radians())
            }
            Some(Crs::Geographic | Crs::WebMercator | Crs::Geocentric) => Ok(0.0),
            None => Err(GeometryError::unsupported_pair(source_crs, "EPSG:4326")),
        }
    }
}
