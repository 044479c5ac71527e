//! Spatial decomposition walker.
//!
//! Collects the geometry-bearing leaves below an element, depth-first and in
//! relation-declared child order. Containment is expanded before
//! decomposition. Spaces are never expanded.

use std::collections::HashSet;

use crate::{
    data_structures::element::{Element, ElementCategory},
    error::{GeometryError, GeometryResult},
};

/**
 * Returns the ordered leaf set below `root`.
 *
 * - a contained child is recursed into when it is decomposed, otherwise it
 *   is a leaf
 * - a decomposition child is recursed into only when it has a representation
 *   and is itself decomposed or a container, otherwise it is a leaf
 *
 * Elements on the current path are tracked so that a relation loop fails with
 * [`GeometryError::CyclicDecomposition`] instead of recursing forever. The same
 * element reached through two different branches (a diamond) is not a cycle
 * and is reported once per branch.
 */
pub fn collect_geometry_leaves<E: Element>(root: &E) -> GeometryResult<Vec<E>> {
    let mut leaves = Vec::new();
    let mut path = HashSet::new();
    walk(root, &mut path, &mut leaves)?;
    Ok(leaves)
}

fn walk<E: Element>(
    element: &E,
    path: &mut HashSet<String>,
    leaves: &mut Vec<E>,
) -> GeometryResult<()> {
    if !path.insert(element.global_id().to_string()) {
        return Err(GeometryError::CyclicDecomposition(
            element.global_id().to_string(),
        ));
    }

    for child in element.containment_children() {
        if is_space(&child) || !child.is_decomposed() {
            push_leaf(child, path, leaves)?;
        } else {
            walk(&child, path, leaves)?;
        }
    }

    for child in element.decomposition_children() {
        let expand = !is_space(&child)
            && child.has_representation()
            && (child.is_decomposed() || child.is_container());
        if expand {
            walk(&child, path, leaves)?;
        } else {
            push_leaf(child, path, leaves)?;
        }
    }

    path.remove(element.global_id());
    Ok(())
}

fn push_leaf<E: Element>(
    leaf: E,
    path: &HashSet<String>,
    leaves: &mut Vec<E>,
) -> GeometryResult<()> {
    if path.contains(leaf.global_id()) {
        return Err(GeometryError::CyclicDecomposition(
            leaf.global_id().to_string(),
        ));
    }
    leaves.push(leaf);
    Ok(())
}

fn is_space<E: Element>(element: &E) -> bool {
    element.category() == ElementCategory::Space
}
