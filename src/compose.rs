//! 2D and 3D geometry composition.
//!
//! Both paths start from the walker's leaf set. The 2D path unions one
//! polygon per leaf (bbox rectangle or triangle footprint), or builds a convex
//! hull over leaf centroids for approximate footprints. The 3D path keeps
//! every leaf as its own node of a merged scene.
//!
//! Leaves that fail extraction are logged and left out; a composition with
//! missing leaves is still well formed.

use geo::{
    Area, BooleanOps, ConvexHull, Coord, Geometry, LineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};

use crate::{
    config::{FootprintKind, GeometryKind},
    data_structures::{
        element::{Element, ElementCategory},
        scene_graph::MergedMesh,
        shape::Shape,
    },
    encoder,
    error::GeometryResult,
    resources::{
        ShapeExtractor,
        extract::{ExtractOptions, extract_leaves, extract_one, extract_shapes},
    },
    walker::collect_geometry_leaves,
};

/// Hull areas below this count as collinear.
const DEGENERATE_AREA: f64 = 1e-12;

/**
 * Unions polygons into one boundary.
 *
 * A single polygon comes back unchanged, a union that ends up as one polygon
 * is returned as a `Polygon`, and no input yields an empty `MultiPolygon`.
 */
pub fn union_polygons(polygons: Vec<Polygon<f64>>) -> Geometry<f64> {
    let mut polygons = polygons.into_iter();
    let Some(first) = polygons.next() else {
        return Geometry::MultiPolygon(MultiPolygon::new(vec![]));
    };
    let merged = polygons.fold(MultiPolygon::new(vec![first]), |acc, polygon| {
        acc.union(&MultiPolygon::new(vec![polygon]))
    });
    simplify_multi(merged)
}

fn simplify_multi(mut multi: MultiPolygon<f64>) -> Geometry<f64> {
    if multi.0.len() == 1 {
        if let Some(polygon) = multi.0.pop() {
            return Geometry::Polygon(polygon);
        }
    }
    Geometry::MultiPolygon(multi)
}

/**
 * Smallest convex shape around `points`.
 *
 * Degenerates gracefully: one distinct point gives a `Point`, collinear
 * points give the `LineString` between the two extremes.
 */
pub fn hull_of_points(points: Vec<Point<f64>>) -> Option<Geometry<f64>> {
    let mut points = points;
    points.sort_by(|a, b| a.x().total_cmp(&b.x()).then(a.y().total_cmp(&b.y())));
    points.dedup();
    match points.len() {
        0 => None,
        1 => Some(Geometry::Point(points[0])),
        n => {
            let (first, last) = (points[0], points[n - 1]);
            let hull = MultiPoint::new(points).convex_hull();
            if hull.unsigned_area() < DEGENERATE_AREA {
                Some(Geometry::LineString(LineString::from(vec![
                    Coord::from(first),
                    Coord::from(last),
                ])))
            } else {
                Some(Geometry::Polygon(hull))
            }
        }
    }
}

/// Union of all non-vertical triangles of `shape` on the X/Y plane.
pub fn shape_footprint(shape: &Shape) -> Option<Geometry<f64>> {
    let triangles = shape.projected_triangles();
    if triangles.is_empty() {
        return None;
    }
    Some(union_polygons(triangles))
}

/// 2D stand-in for one element's shape.
pub fn element_geometry(shape: &Shape, kind: FootprintKind) -> Option<Geometry<f64>> {
    match kind {
        FootprintKind::BoundingBox => shape
            .bbox_2d()
            .map(|rect| Geometry::Polygon(rect.to_polygon())),
        FootprintKind::Footprint => shape_footprint(shape),
        FootprintKind::FootprintApprox => shape.bbox_centroid_2d().map(Geometry::Point),
    }
}

/// Polygons contributed by one leaf to a union.
fn leaf_polygons(shape: &Shape, kind: FootprintKind) -> Vec<Polygon<f64>> {
    match kind {
        FootprintKind::BoundingBox => shape
            .bbox_2d()
            .map(|rect| vec![rect.to_polygon()])
            .unwrap_or_default(),
        _ => match shape_footprint(shape) {
            Some(Geometry::Polygon(polygon)) => vec![polygon],
            Some(Geometry::MultiPolygon(multi)) => multi.0,
            _ => vec![],
        },
    }
}

/// Leaves standing for `root`: the root itself unless it decomposes.
pub fn geometry_leaves<E: Element>(root: &E) -> GeometryResult<Vec<E>> {
    if root.category() == ElementCategory::Space {
        return Ok(vec![root.clone()]);
    }
    let leaves = collect_geometry_leaves(root)?;
    if leaves.is_empty() {
        return Ok(vec![root.clone()]);
    }
    Ok(leaves)
}

/**
 * Composes the 2D geometry of `root` in its local frame.
 *
 * A space root is never expanded and contributes its own bounding box.
 * Returns `None` when no leaf produced any geometry.
 */
pub fn compose_footprint<E, X>(
    root: &E,
    extractor: &X,
    kind: FootprintKind,
    options: ExtractOptions,
) -> GeometryResult<Option<Geometry<f64>>>
where
    E: Element,
    X: ShapeExtractor<E> + ?Sized,
{
    if root.category() == ElementCategory::Space {
        return Ok(match extract_one(root, extractor, options.leaf_budget) {
            Ok(shape) => element_geometry(&shape, FootprintKind::BoundingBox),
            Err(e) if e.is_leaf_recoverable() => {
                log::warn!("Space {} has no usable geometry: {}", root.global_id(), e);
                None
            }
            Err(e) => return Err(e),
        });
    }

    let leaves = geometry_leaves(root)?;
    let shapes = extract_shapes(&leaves, extractor, options)?;
    log::debug!(
        "Composing {:?} of {} from {} leaves.",
        kind,
        root.global_id(),
        shapes.len()
    );

    if kind == FootprintKind::FootprintApprox {
        let centroids = shapes
            .iter()
            .filter_map(|(_, shape)| shape.bbox_centroid_2d())
            .collect();
        return Ok(hull_of_points(centroids));
    }

    let polygons: Vec<Polygon<f64>> = shapes
        .iter()
        .flat_map(|(_, shape)| leaf_polygons(shape, kind))
        .collect();
    if polygons.is_empty() {
        return Ok(None);
    }
    Ok(Some(union_polygons(polygons)))
}

/// Per-leaf 2D geometry, in walker order, for feature collections.
pub fn leaf_geometries<E, X>(
    root: &E,
    extractor: &X,
    kind: FootprintKind,
    options: ExtractOptions,
) -> GeometryResult<Vec<(E, Geometry<f64>)>>
where
    E: Element,
    X: ShapeExtractor<E> + ?Sized,
{
    let leaves = geometry_leaves(root)?;
    Ok(extract_leaves(&leaves, extractor, options)?
        .into_iter()
        .filter_map(|(leaf, shape)| match element_geometry(&shape, kind) {
            Some(geometry) => Some((leaf.clone(), geometry)),
            None => {
                log::warn!("Element {} has no 2D geometry.", leaf.global_id());
                None
            }
        })
        .collect())
}

/// Merged scene of all leaves below `root`, one node per leaf.
pub fn compose_mesh<E, X>(
    root: &E,
    extractor: &X,
    options: ExtractOptions,
) -> GeometryResult<MergedMesh>
where
    E: Element,
    X: ShapeExtractor<E> + ?Sized,
{
    let leaves = geometry_leaves(root)?;
    let shapes = extract_shapes(&leaves, extractor, options)?;
    Ok(encoder::encode(&shapes))
}

#[derive(Clone, Debug, PartialEq)]
pub enum Composition {
    Flat(Option<Geometry<f64>>),
    Mesh(MergedMesh),
}

/// Composes `root` into the geometry `kind` selects, in the model frame.
pub fn compose<E, X>(
    root: &E,
    extractor: &X,
    kind: GeometryKind,
    options: ExtractOptions,
) -> GeometryResult<Composition>
where
    E: Element,
    X: ShapeExtractor<E> + ?Sized,
{
    match kind {
        GeometryKind::Flat(footprint) => Ok(Composition::Flat(compose_footprint(
            root, extractor, footprint, options,
        )?)),
        GeometryKind::Mesh => Ok(Composition::Mesh(compose_mesh(root, extractor, options)?)),
    }
}
