//! Ordered shape extraction with the partial-result policy.
//!
//! Leaves are independent, so extraction may fan out over rayon's pool. The
//! output keeps walker order either way. A leaf that fails, breaks its shape
//! invariants or overruns the per-leaf budget is logged and left out.

use std::time::Duration;

use instant::Instant;
use rayon::prelude::*;

use crate::{
    config::ServiceConfig,
    data_structures::{element::Element, shape::Shape},
    error::{GeometryError, GeometryResult},
    resources::ShapeExtractor,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExtractOptions {
    pub parallel: bool,
    pub leaf_budget: Option<Duration>,
}

impl From<&ServiceConfig> for ExtractOptions {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            parallel: config.parallel_extraction,
            leaf_budget: config.leaf_budget(),
        }
    }
}

/// Triangulates and validates a single element, enforcing the budget.
pub fn extract_one<E, X>(leaf: &E, extractor: &X, budget: Option<Duration>) -> GeometryResult<Shape>
where
    E: Element,
    X: ShapeExtractor<E> + ?Sized,
{
    let started = Instant::now();
    let shape = extractor.triangulate(leaf)?;
    let elapsed = started.elapsed();
    if let Some(budget) = budget.filter(|budget| elapsed > *budget) {
        return Err(GeometryError::unavailable(
            leaf.global_id(),
            format!("extraction took {elapsed:?}, budget is {budget:?}"),
        ));
    }
    shape.validate(leaf.global_id())?;
    Ok(shape)
}

/**
 * Extracts every leaf, keeping input order.
 *
 * Recoverable per-leaf errors are logged and the leaf is dropped. Any other
 * error aborts the whole extraction.
 */
pub fn extract_leaves<'l, E, X>(
    leaves: &'l [E],
    extractor: &X,
    options: ExtractOptions,
) -> GeometryResult<Vec<(&'l E, Shape)>>
where
    E: Element,
    X: ShapeExtractor<E> + ?Sized,
{
    let extract = |leaf: &E| extract_one(leaf, extractor, options.leaf_budget);
    let results: Vec<GeometryResult<Shape>> = if options.parallel {
        leaves.par_iter().map(extract).collect()
    } else {
        leaves.iter().map(extract).collect()
    };

    let mut shapes = Vec::with_capacity(results.len());
    for (leaf, result) in leaves.iter().zip(results) {
        match result {
            Ok(shape) => shapes.push((leaf, shape)),
            Err(e) if e.is_leaf_recoverable() => {
                log::warn!("Skipping element {}: {}", leaf.global_id(), e);
            }
            Err(e) => return Err(e),
        }
    }
    log::debug!("Extracted {} of {} leaves.", shapes.len(), leaves.len());
    Ok(shapes)
}

/// [`extract_leaves`] keyed by global id, as the encoder takes it.
pub fn extract_shapes<E, X>(
    leaves: &[E],
    extractor: &X,
    options: ExtractOptions,
) -> GeometryResult<Vec<(String, Shape)>>
where
    E: Element,
    X: ShapeExtractor<E> + ?Sized,
{
    Ok(extract_leaves(leaves, extractor, options)?
        .into_iter()
        .map(|(leaf, shape)| (leaf.global_id().to_string(), shape))
        .collect())
}
