use bim_geom::{
    BuildingModel, ElementCategory, FootprintKind, GeometryKind,
    compose::{Composition, compose, compose_footprint, hull_of_points, union_polygons},
    data_structures::memory::InMemoryModel,
    resources::extract::ExtractOptions,
};
use geo::{Area, Geometry, Point, Rect, coord};

use crate::common::test_utils::{concrete, cuboid, record, square, storey_model};

mod common;

fn unit_square(x: f64, y: f64) -> geo::Polygon<f64> {
    Rect::new(coord! { x: x, y: y }, coord! { x: x + 1.0, y: y + 1.0 }).to_polygon()
}

fn sequential() -> ExtractOptions {
    ExtractOptions {
        parallel: false,
        leaf_budget: None,
    }
}

#[test]
fn should_union_overlapping_squares_into_one_polygon() {
    let union = union_polygons(vec![unit_square(0.0, 0.0), unit_square(0.5, 0.5)]);
    let Geometry::Polygon(polygon) = union else {
        panic!("expected a single polygon");
    };
    assert!((polygon.unsigned_area() - 1.75).abs() < 1e-9);
}

#[test]
fn should_keep_disjoint_squares_apart() {
    let union = union_polygons(vec![unit_square(0.0, 0.0), unit_square(3.0, 0.0)]);
    let Geometry::MultiPolygon(multi) = union else {
        panic!("expected a multipolygon");
    };
    assert_eq!(multi.0.len(), 2);
    assert!((multi.unsigned_area() - 2.0).abs() < 1e-9);
}

#[test]
fn should_union_nothing_into_empty_multipolygon() {
    assert_eq!(
        union_polygons(vec![]),
        Geometry::MultiPolygon(geo::MultiPolygon::new(vec![]))
    );
}

#[test]
fn should_degrade_hull_gracefully() {
    assert_eq!(hull_of_points(vec![]), None);
    assert_eq!(
        hull_of_points(vec![Point::new(1.0, 1.0), Point::new(1.0, 1.0)]),
        Some(Geometry::Point(Point::new(1.0, 1.0)))
    );
    let Some(Geometry::LineString(line)) = hull_of_points(vec![
        Point::new(2.0, 2.0),
        Point::new(0.0, 0.0),
        Point::new(1.0, 1.0),
    ]) else {
        panic!("expected a line for collinear points");
    };
    assert_eq!(line.0.first().map(|c| (c.x, c.y)), Some((0.0, 0.0)));
    assert_eq!(line.0.last().map(|c| (c.x, c.y)), Some((2.0, 2.0)));

    let Some(Geometry::Polygon(hull)) = hull_of_points(vec![
        Point::new(0.0, 0.0),
        Point::new(2.0, 0.0),
        Point::new(0.0, 2.0),
        Point::new(0.5, 0.5),
    ]) else {
        panic!("expected a polygon");
    };
    assert!((hull.unsigned_area() - 2.0).abs() < 1e-9);
}

#[test]
fn should_compose_space_child_to_its_own_box() {
    let model = InMemoryModel::new("IFC4")
        .with(record("zone", "IfcZone", ElementCategory::Assembly).with_parts(&["room"]))
        .with(
            record("room", "IfcSpace", ElementCategory::Space)
                .with_shape(cuboid([0.0, 0.0, 0.0], [2.0, 2.0, 3.0], concrete())),
        );
    let root = model.element("zone").unwrap();
    let footprint = compose_footprint(&root, &model, FootprintKind::BoundingBox, sequential())
        .unwrap()
        .expect("a footprint");
    let expected = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 });
    let Geometry::Polygon(polygon) = footprint else {
        panic!("expected a polygon");
    };
    assert!((polygon.unsigned_area() - 4.0).abs() < 1e-9);
    assert_eq!(geo::BoundingRect::bounding_rect(&polygon), Some(expected));
}

#[test]
fn should_not_expand_space_root() {
    let model = InMemoryModel::new("IFC4")
        .with(
            record("room", "IfcSpace", ElementCategory::Space)
                .with_shape(cuboid([0.0, 0.0, 0.0], [3.0, 1.0, 3.0], concrete()))
                .with_parts(&["furniture"]),
        )
        .with(
            record("furniture", "IfcFurniture", ElementCategory::Normal)
                .with_shape(cuboid([10.0, 10.0, 0.0], [11.0, 11.0, 1.0], concrete())),
        );
    let root = model.element("room").unwrap();
    let footprint = compose_footprint(&root, &model, FootprintKind::Footprint, sequential())
        .unwrap()
        .expect("a footprint");
    assert!((footprint.unsigned_area() - 3.0).abs() < 1e-9);
}

#[test]
fn should_union_leaf_bounding_boxes() {
    let model = storey_model();
    let storey = model.element("storey").unwrap();
    let footprint = compose_footprint(&storey, &model, FootprintKind::BoundingBox, sequential())
        .unwrap()
        .expect("a footprint");
    // the slab covers every other leaf
    assert!((footprint.unsigned_area() - 16.0).abs() < 1e-9);
}

#[test]
fn should_union_triangle_footprints() {
    let model = InMemoryModel::new("IFC4")
        .with(
            record("storey", "IfcBuildingStorey", ElementCategory::SpatialStructure)
                .containing(&["a", "b"]),
        )
        .with(record("a", "IfcSlab", ElementCategory::Normal).with_shape(square(0.0, 0.0, 1.0, 0.0)))
        .with(record("b", "IfcSlab", ElementCategory::Normal).with_shape(square(0.5, 0.5, 1.0, 0.0)));
    let storey = model.element("storey").unwrap();
    let footprint = compose_footprint(&storey, &model, FootprintKind::Footprint, sequential())
        .unwrap()
        .expect("a footprint");
    assert!(matches!(footprint, Geometry::Polygon(_)));
    assert!((footprint.unsigned_area() - 1.75).abs() < 1e-9);
}

#[test]
fn should_hull_leaf_centroids_for_approximate_footprint() {
    let model = InMemoryModel::new("IFC4")
        .with(
            record("storey", "IfcBuildingStorey", ElementCategory::SpatialStructure)
                .containing(&["a", "b", "c"]),
        )
        .with(record("a", "IfcColumn", ElementCategory::Normal).with_shape(square(-0.5, -0.5, 1.0, 0.0)))
        .with(record("b", "IfcColumn", ElementCategory::Normal).with_shape(square(3.5, -0.5, 1.0, 0.0)))
        .with(record("c", "IfcColumn", ElementCategory::Normal).with_shape(square(-0.5, 2.5, 1.0, 0.0)));
    let storey = model.element("storey").unwrap();
    let hull = compose_footprint(&storey, &model, FootprintKind::FootprintApprox, sequential())
        .unwrap()
        .expect("a hull");
    // triangle over (0,0), (4,0), (0,3)
    assert!(matches!(hull, Geometry::Polygon(_)));
    assert!((hull.unsigned_area() - 6.0).abs() < 1e-9);
}

#[test]
fn should_skip_leaves_without_shape() {
    let mut model = storey_model().with(record("ghost", "IfcProxy", ElementCategory::Normal));
    model
        .elements
        .iter_mut()
        .find(|r| r.global_id == "storey")
        .unwrap()
        .contains
        .push("ghost".to_string());
    let storey = model.element("storey").unwrap();
    let Composition::Mesh(scene) = compose(&storey, &model, GeometryKind::Mesh, sequential()).unwrap()
    else {
        panic!("expected a mesh");
    };
    scene.check_invariants().expect("well-formed scene");
    let names: Vec<_> = scene.nodes.iter().filter_map(|n| n.name.clone()).collect();
    assert_eq!(names, vec!["wall-1", "slab-1", "beam-1", "beam-2", "space-1"]);
}

#[test]
fn should_compose_same_scene_in_parallel() {
    let model = storey_model();
    let project = model.project().unwrap();
    let parallel = ExtractOptions {
        parallel: true,
        leaf_budget: None,
    };
    let a = compose(&project, &model, GeometryKind::Mesh, parallel).unwrap();
    let b = compose(&project, &model, GeometryKind::Mesh, sequential()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn should_return_nothing_when_no_leaf_has_geometry() {
    let model = InMemoryModel::new("IFC4")
        .with(
            record("storey", "IfcBuildingStorey", ElementCategory::SpatialStructure)
                .containing(&["ghost"]),
        )
        .with(record("ghost", "IfcProxy", ElementCategory::Normal));
    let storey = model.element("storey").unwrap();
    assert_eq!(
        compose(&storey, &model, GeometryKind::default(), sequential()).unwrap(),
        Composition::Flat(None)
    );
}
