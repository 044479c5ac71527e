use bim_geom::{
    BuildingModel, Element, ElementCategory, GeometryError,
    data_structures::memory::InMemoryModel, walker::collect_geometry_leaves,
};

use crate::common::test_utils::{record, storey_model};

mod common;

fn leaf_ids(model: &InMemoryModel, root: &str) -> Vec<String> {
    let root = model.element(root).expect("root exists");
    collect_geometry_leaves(&root)
        .expect("acyclic model")
        .iter()
        .map(|leaf| leaf.global_id().to_string())
        .collect()
}

#[test]
fn should_collect_leaves_in_relation_order() {
    let model = storey_model();
    assert_eq!(
        leaf_ids(&model, "project"),
        vec!["wall-1", "slab-1", "beam-1", "beam-2", "space-1"]
    );
}

#[test]
fn should_be_deterministic() {
    let model = storey_model();
    let first = leaf_ids(&model, "storey");
    for _ in 0..10 {
        assert_eq!(leaf_ids(&model, "storey"), first);
    }
}

#[test]
fn should_expand_assembly_into_parts() {
    let model = storey_model();
    assert_eq!(leaf_ids(&model, "assembly-1"), vec!["beam-1", "beam-2"]);
}

#[test]
fn should_have_no_leaves_below_plain_element() {
    let model = storey_model();
    assert!(leaf_ids(&model, "wall-1").is_empty());
}

#[test]
fn should_not_expand_decomposed_space() {
    let model = InMemoryModel::new("IFC4")
        .with(record("storey", "IfcBuildingStorey", ElementCategory::SpatialStructure).containing(&["room"]))
        .with(record("room", "IfcSpace", ElementCategory::Space).with_parts(&["zone-a", "zone-b"]))
        .with(record("zone-a", "IfcSpace", ElementCategory::Space))
        .with(record("zone-b", "IfcSpace", ElementCategory::Space));
    assert_eq!(leaf_ids(&model, "storey"), vec!["room"]);
}

#[test]
fn should_keep_part_without_representation_as_leaf() {
    let model = InMemoryModel::new("IFC4")
        .with(record("a", "IfcElementAssembly", ElementCategory::Assembly).with_parts(&["b"]))
        .with(
            record("b", "IfcElementAssembly", ElementCategory::Assembly)
                .without_representation()
                .with_parts(&["c"]),
        )
        .with(record("c", "IfcPlate", ElementCategory::Normal));
    assert_eq!(leaf_ids(&model, "a"), vec!["b"]);
}

#[test]
fn should_expand_part_that_is_a_container() {
    let model = InMemoryModel::new("IFC4")
        .with(record("building", "IfcBuilding", ElementCategory::SpatialStructure).with_parts(&["storey"]))
        .with(record("storey", "IfcBuildingStorey", ElementCategory::SpatialStructure).containing(&["door"]))
        .with(record("door", "IfcDoor", ElementCategory::Normal));
    assert_eq!(leaf_ids(&model, "building"), vec!["door"]);
}

#[test]
fn should_visit_containment_before_decomposition() {
    let model = InMemoryModel::new("IFC4")
        .with(
            record("storey", "IfcBuildingStorey", ElementCategory::SpatialStructure)
                .with_parts(&["part"])
                .containing(&["contained"]),
        )
        .with(record("part", "IfcBuildingElementPart", ElementCategory::Normal))
        .with(record("contained", "IfcColumn", ElementCategory::Normal));
    assert_eq!(leaf_ids(&model, "storey"), vec!["contained", "part"]);
}

#[test]
fn should_report_shared_part_once_per_branch() {
    let model = InMemoryModel::new("IFC4")
        .with(record("root", "IfcElementAssembly", ElementCategory::Assembly).with_parts(&["left", "right"]))
        .with(record("left", "IfcElementAssembly", ElementCategory::Assembly).with_parts(&["shared"]))
        .with(record("right", "IfcElementAssembly", ElementCategory::Assembly).with_parts(&["shared"]))
        .with(record("shared", "IfcPlate", ElementCategory::Normal));
    assert_eq!(leaf_ids(&model, "root"), vec!["shared", "shared"]);
}

#[test]
fn should_fail_on_decomposition_cycle() {
    let model = InMemoryModel::new("IFC4")
        .with(record("a", "IfcElementAssembly", ElementCategory::Assembly).with_parts(&["b"]))
        .with(record("b", "IfcElementAssembly", ElementCategory::Assembly).with_parts(&["a"]));
    let root = model.element("a").expect("root exists");
    assert!(matches!(
        collect_geometry_leaves(&root),
        Err(GeometryError::CyclicDecomposition(_))
    ));
}

#[test]
fn should_fail_on_self_containment() {
    let model = InMemoryModel::new("IFC4").with(
        record("storey", "IfcBuildingStorey", ElementCategory::SpatialStructure)
            .containing(&["storey"]),
    );
    let root = model.element("storey").expect("root exists");
    assert!(matches!(
        collect_geometry_leaves(&root),
        Err(GeometryError::CyclicDecomposition(id)) if id == "storey"
    ));
}
