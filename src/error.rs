//! Error kinds shared by every stage of the geometry pipeline.
//!
//! Per-leaf failures (`GeometryUnavailable`, `InvalidShape`) are absorbed by the
//! composer and only logged. Structural failures (`CyclicDecomposition`,
//! `InvalidGeoref`, `UnsupportedCrsPair`) travel up to the request boundary.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// The decomposition/containment graph loops back onto an element that is
    /// still being walked.
    #[error("cyclic decomposition: element {0} is its own ancestor")]
    CyclicDecomposition(String),

    /// The geometry kernel could not triangulate the element.
    #[error("geometry unavailable for element {id}: {reason}")]
    GeometryUnavailable { id: String, reason: String },

    /// A caller asked for world coordinates on a model without georeference.
    #[error("model carries no georeference metadata")]
    NoGeoreference,

    #[error("invalid georeference: {0}")]
    InvalidGeoref(String),

    #[error("cannot transform from {from} to {to}")]
    UnsupportedCrsPair { from: String, to: String },

    /// A triangulated shape breaks its own index invariants.
    #[error("invalid shape for element {id}: {reason}")]
    InvalidShape { id: String, reason: String },

    #[error("element {0} not found")]
    ElementNotFound(String),

    #[error("invalid global id {0}")]
    InvalidGuid(String),

    #[error("mesh encoding failed: {0}")]
    Encoding(String),
}

pub type GeometryResult<T> = Result<T, GeometryError>;

impl GeometryError {
    pub fn unavailable(id: impl Into<String>, reason: impl ToString) -> Self {
        Self::GeometryUnavailable {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn unsupported_pair(from: &str, to: &str) -> Self {
        Self::UnsupportedCrsPair {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether the composer may drop the offending leaf and carry on.
    pub fn is_leaf_recoverable(&self) -> bool {
        matches!(
            self,
            Self::GeometryUnavailable { .. } | Self::InvalidShape { .. }
        )
    }
}
