//! Transverse Mercator projection in Krüger's n-series, carried to sixth
//! order.
//!
//! The inverse recovers latitude from the conformal latitude by Newton
//! iteration, so a round trip inside a UTM zone stays at the nanometre
//! level. Angles at the public surface are in degrees.

use std::f64::consts::PI;

use crate::error::{GeometryError, GeometryResult};

/// Reference ellipsoid as semi-major axis and flattening.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    pub a: f64,
    pub f: f64,
}

pub const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    f: 1.0 / 298.257_223_563,
};

pub const GRS80: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    f: 1.0 / 298.257_222_101,
};

impl Ellipsoid {
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransverseMercator {
    pub ellipsoid: Ellipsoid,
    /// Central meridian in degrees.
    pub lon0: f64,
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    n: f64,
    /// Rectifying radius.
    rect_a: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
}

impl TransverseMercator {
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let n = ellipsoid.f / (2.0 - ellipsoid.f);
        let (n2, n3) = (n * n, n * n * n);
        let (n4, n5, n6) = (n3 * n, n3 * n2, n3 * n3);
        Self {
            ellipsoid,
            lon0,
            k0,
            false_easting,
            false_northing,
            n,
            rect_a: ellipsoid.a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0
                    - 127.0 * n5 / 288.0
                    + 7891.0 * n6 / 37800.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0 + 281.0 * n5 / 630.0
                    - 1_983_433.0 * n6 / 1_935_360.0,
                61.0 * n3 / 240.0 - 103.0 * n4 / 140.0
                    + 15061.0 * n5 / 26880.0
                    + 167_603.0 * n6 / 181_440.0,
                49561.0 * n4 / 161_280.0 - 179.0 * n5 / 168.0
                    + 6_601_661.0 * n6 / 7_257_600.0,
                34729.0 * n5 / 80640.0 - 3_418_889.0 * n6 / 1_995_840.0,
                212_378_941.0 * n6 / 319_334_400.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0 - 81.0 * n5 / 512.0
                    + 96199.0 * n6 / 604_800.0,
                n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0 + 46.0 * n5 / 105.0
                    - 1_118_711.0 * n6 / 3_870_720.0,
                17.0 * n3 / 480.0 - 37.0 * n4 / 840.0 - 209.0 * n5 / 4480.0
                    + 5569.0 * n6 / 90720.0,
                4397.0 * n4 / 161_280.0 - 11.0 * n5 / 504.0 - 830_251.0 * n6 / 7_257_600.0,
                4583.0 * n5 / 161_280.0 - 108_847.0 * n6 / 3_991_680.0,
                20_648_693.0 * n6 / 638_668_800.0,
            ],
        }
    }

    /// UTM zone `1..=60` on the given ellipsoid.
    pub fn utm(ellipsoid: Ellipsoid, zone: u32, south: bool) -> GeometryResult<Self> {
        if !(1..=60).contains(&zone) {
            return Err(GeometryError::InvalidGeoref(format!(
                "UTM zone {zone} outside 1..=60"
            )));
        }
        let lon0 = zone as f64 * 6.0 - 183.0;
        let false_northing = if south { 10_000_000.0 } else { 0.0 };
        Ok(Self::new(ellipsoid, lon0, 0.9996, 500_000.0, false_northing))
    }

    /// First eccentricity, `2√n/(1+n)`.
    fn eccentricity(&self) -> f64 {
        2.0 * self.n.sqrt() / (1.0 + self.n)
    }

    /// Conformal latitude helper `t = sinh(atanh(sin φ) - e atanh(e sin φ))`.
    fn conformal_t(&self, lat: f64) -> f64 {
        let e = self.eccentricity();
        let s = lat.sin();
        (s.atanh() - e * (e * s).atanh()).sinh()
    }

    /// `tan χ` of the conformal latitude for `tau = tan φ`.
    fn conformal_tau(&self, tau: f64) -> f64 {
        let e = self.eccentricity();
        let tau1 = tau.hypot(1.0);
        let sigma = (e * (e * tau / tau1).atanh()).sinh();
        tau * sigma.hypot(1.0) - sigma * tau1
    }

    /// Inverts [`Self::conformal_tau`] by Newton iteration.
    fn geodetic_tau(&self, taup: f64) -> f64 {
        const MAX_ITER: usize = 8;
        let e2m = 1.0 - self.ellipsoid.e2();
        let tolerance = f64::EPSILON.sqrt() * taup.abs().max(1.0);
        let mut tau = taup / e2m;
        for _ in 0..MAX_ITER {
            let taupa = self.conformal_tau(tau);
            let step = (taup - taupa) * (1.0 + e2m * tau * tau)
                / (e2m * tau.hypot(1.0) * taupa.hypot(1.0));
            tau += step;
            if step.abs() < tolerance {
                break;
            }
        }
        tau
    }

    /// Geographic (lon, lat) in degrees to (easting, northing) in metres.
    pub fn forward(&self, lon: f64, lat: f64) -> GeometryResult<(f64, f64)> {
        if !(-90.0..=90.0).contains(&lat) || !lon.is_finite() {
            return Err(GeometryError::InvalidGeoref(format!(
                "coordinate ({lon}, {lat}) outside the geographic domain"
            )));
        }
        let (xi_p, eta_p, _) = self.primed(lon, lat);
        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi += alpha * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += alpha * (k * xi_p).cos() * (k * eta_p).sinh();
        }
        let scale = self.k0 * self.rect_a;
        Ok((
            self.false_easting + scale * eta,
            self.false_northing + scale * xi,
        ))
    }

    /// (easting, northing) in metres back to geographic (lon, lat) in degrees.
    pub fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let scale = self.k0 * self.rect_a;
        let xi = (northing - self.false_northing) / scale;
        let eta = (easting - self.false_easting) / scale;
        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, beta) in self.beta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi_p -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_p -= beta * (k * xi).cos() * (k * eta).sinh();
        }
        let denominator = eta_p.sinh().hypot(xi_p.cos());
        let lat = if denominator > 0.0 {
            self.geodetic_tau(xi_p.sin() / denominator).atan()
        } else {
            (PI / 2.0).copysign(xi_p)
        };
        let lon = self.lon0.to_radians() + eta_p.sinh().atan2(xi_p.cos());
        (normalize_lon(lon.to_degrees()), lat.to_degrees())
    }

    /**
     * Grid convergence at a geographic point, in degrees.
     *
     * Positive east of the central meridian in the northern hemisphere, i.e.
     * the angle from true north to grid north measured clockwise.
     */
    pub fn convergence(&self, lon: f64, lat: f64) -> f64 {
        let (xi_p, eta_p, t) = self.primed(lon, lat);
        let dlon = (lon - self.lon0).to_radians();
        let mut sigma = 1.0;
        let mut tau = 0.0;
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            sigma += k * alpha * (k * xi_p).cos() * (k * eta_p).cosh();
            tau += k * alpha * (k * xi_p).sin() * (k * eta_p).sinh();
        }
        let root = (1.0 + t * t).sqrt();
        let tan_dlon = dlon.tan();
        ((tau * root + sigma * t * tan_dlon) / (sigma * root - tau * t * tan_dlon))
            .atan()
            .to_degrees()
    }

    fn primed(&self, lon: f64, lat: f64) -> (f64, f64, f64) {
        let lat = lat.to_radians();
        let dlon = (lon - self.lon0).to_radians();
        let t = self.conformal_t(lat);
        let xi_p = t.atan2(dlon.cos());
        let eta_p = (dlon.sin() / (1.0 + t * t).sqrt()).atanh();
        (xi_p, eta_p, t)
    }
}

fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 { 180.0 } else { wrapped }
}

/// Web Mercator (EPSG:3857) forward, (lon, lat) degrees to metres.
pub fn web_mercator_forward(lon: f64, lat: f64) -> (f64, f64) {
    let a = WGS84.a;
    let lat = lat.clamp(-85.051_128_779_806_59, 85.051_128_779_806_59);
    (
        a * lon.to_radians(),
        a * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln(),
    )
}

pub fn web_mercator_inverse(x: f64, y: f64) -> (f64, f64) {
    let a = WGS84.a;
    (
        (x / a).to_degrees(),
        (2.0 * (y / a).exp().atan() - PI / 2.0).to_degrees(),
    )
}
