//! Service configuration, per-request parameters and logging bootstrap.
//!
//! [`ServiceConfig`] can be read from a TOML file or from the environment
//! variables the HTTP layer is deployed with (`API_ADDRESS`, `API_PATH`,
//! `REL_URI`, `DEFAULT_FOOTPRINT_TYPE`, `PARALLEL_EXTRACTION`,
//! `LEAF_BUDGET_MS`). Unset values fall back to the defaults.

use std::{path::Path, str::FromStr, time::Duration};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Which 2D geometry stands in for an element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FootprintKind {
    /// Axis-aligned X/Y extent. Cheapest.
    #[default]
    #[serde(rename = "bbox")]
    BoundingBox,
    /// Union of all triangles dropped onto the X/Y plane.
    #[serde(rename = "footprint")]
    Footprint,
    /// Convex hull over the bbox centres of the leaves.
    #[serde(rename = "footprint_approx")]
    FootprintApprox,
}

impl FromStr for FootprintKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bbox" | "boundingbox" | "bounding_box" => Ok(Self::BoundingBox),
            "footprint" => Ok(Self::Footprint),
            "footprint_approx" | "approx" => Ok(Self::FootprintApprox),
            other => Err(format!("unknown footprint type {other:?}")),
        }
    }
}

/// Geometry a composer call produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryKind {
    Flat(FootprintKind),
    Mesh,
}

impl Default for GeometryKind {
    fn default() -> Self {
        GeometryKind::Flat(FootprintKind::default())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub api_address: String,
    pub api_path: String,
    /// Emit links without scheme and host.
    pub relative_uris: bool,
    pub default_footprint: FootprintKind,
    pub parallel_extraction: bool,
    /// Extractions slower than this are dropped from the result.
    pub leaf_budget_ms: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_address: "http://localhost:5000".to_string(),
            api_path: "/bimapi".to_string(),
            relative_uris: false,
            default_footprint: FootprintKind::BoundingBox,
            parallel_extraction: true,
            leaf_budget_ms: None,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl ServiceConfig {
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        toml::from_str(source).context("parsing service configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&source)
    }

    /// Reads the deployment environment through `lookup`, usually
    /// `|key| std::env::var(key).ok()`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(address) = lookup("API_ADDRESS") {
            config.api_address = address;
        }
        if let Some(path) = lookup("API_PATH") {
            config.api_path = path;
        }
        if let Some(relative) = lookup("REL_URI") {
            config.relative_uris = parse_flag(&relative);
        }
        if let Some(kind) = lookup("DEFAULT_FOOTPRINT_TYPE") {
            config.default_footprint = kind.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(parallel) = lookup("PARALLEL_EXTRACTION") {
            config.parallel_extraction = parse_flag(&parallel);
        }
        if let Some(budget) = lookup("LEAF_BUDGET_MS") {
            let budget = budget
                .trim()
                .parse()
                .with_context(|| format!("LEAF_BUDGET_MS={budget:?} is not a number"))?;
            config.leaf_budget_ms = Some(budget);
        }
        Ok(config)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Base URL the navigation links hang off.
    pub fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.api_address.trim_end_matches('/'),
            self.api_path
        )
    }

    pub fn leaf_budget(&self) -> Option<Duration> {
        self.leaf_budget_ms.map(Duration::from_millis)
    }
}

/// Parameters of one geometry request.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryRequest {
    /// Compose decomposed elements into one result instead of listing leaves.
    pub composed: bool,
    /// Compose assemblies even when `composed` is off.
    pub compose_assembly: bool,
    pub footprint: FootprintKind,
    /// `None` serves world coordinates in `EPSG:4326` when the model is
    /// georeferenced and local coordinates otherwise.
    pub crs: Option<String>,
}

impl GeometryRequest {
    /// Defaults of the 3D view: leaf links unless asked to compose.
    pub fn mesh() -> Self {
        Self {
            composed: false,
            compose_assembly: true,
            footprint: FootprintKind::default(),
            crs: None,
        }
    }

    /// Defaults of the geospatial view: one composed feature.
    pub fn features(footprint: FootprintKind) -> Self {
        Self {
            composed: true,
            compose_assembly: true,
            footprint,
            crs: None,
        }
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    pub fn composed(mut self, composed: bool) -> Self {
        self.composed = composed;
        self
    }
}

/// Installs `env_logger`, keeping going when a logger is already set.
pub fn init_logging() {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }
}
