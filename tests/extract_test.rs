use std::{thread, time::Duration};

use bim_geom::{
    BuildingModel, Element, GeometryError, Shape, ShapeExtractor,
    data_structures::memory::{ElementRef, InMemoryModel},
    error::GeometryResult,
    resources::extract::{ExtractOptions, extract_leaves, extract_one},
    walker::collect_geometry_leaves,
};

use crate::common::test_utils::storey_model;

mod common;

/// Kernel wrapper that stalls or fails on chosen elements.
struct FlakyKernel<'m> {
    model: &'m InMemoryModel,
    slow: &'static str,
    fatal: Option<&'static str>,
}

impl<'m> ShapeExtractor<ElementRef<'m>> for FlakyKernel<'m> {
    fn triangulate(&self, element: &ElementRef<'m>) -> GeometryResult<Shape> {
        if Some(element.global_id()) == self.fatal {
            return Err(GeometryError::Encoding("kernel crashed".to_string()));
        }
        if element.global_id() == self.slow {
            thread::sleep(Duration::from_millis(50));
        }
        self.model.triangulate(element)
    }
}

fn ids(shapes: &[(&ElementRef<'_>, Shape)]) -> Vec<String> {
    shapes
        .iter()
        .map(|(leaf, _)| leaf.global_id().to_string())
        .collect()
}

#[test]
fn should_drop_leaf_over_budget() {
    let model = storey_model();
    let kernel = FlakyKernel {
        model: &model,
        slow: "slab-1",
        fatal: None,
    };
    let leaves = collect_geometry_leaves(&model.project().unwrap()).unwrap();
    for parallel in [false, true] {
        let options = ExtractOptions {
            parallel,
            leaf_budget: Some(Duration::from_millis(20)),
        };
        let shapes = extract_leaves(&leaves, &kernel, options).unwrap();
        assert_eq!(ids(&shapes), vec!["wall-1", "beam-1", "beam-2", "space-1"]);
    }
}

#[test]
fn should_report_budget_overrun_as_unavailable() {
    let model = storey_model();
    let kernel = FlakyKernel {
        model: &model,
        slow: "wall-1",
        fatal: None,
    };
    let wall = model.element("wall-1").unwrap();
    let result = extract_one(&wall, &kernel, Some(Duration::from_millis(5)));
    assert!(matches!(result, Err(GeometryError::GeometryUnavailable { .. })));
    assert!(extract_one(&wall, &kernel, None).is_ok());
}

#[test]
fn should_abort_on_unrecoverable_kernel_error() {
    let model = storey_model();
    let kernel = FlakyKernel {
        model: &model,
        slow: "",
        fatal: Some("beam-2"),
    };
    let leaves = collect_geometry_leaves(&model.project().unwrap()).unwrap();
    let result = extract_leaves(&leaves, &kernel, ExtractOptions::default());
    assert!(matches!(result, Err(GeometryError::Encoding(_))));
}

#[test]
fn should_skip_invalid_shape() {
    let mut model = storey_model();
    if let Some(record) = model.elements.iter_mut().find(|r| r.global_id == "beam-1") {
        if let Some(shape) = record.shape.as_mut() {
            shape.faces.push([0, 1, 99]);
            shape.material_ids.push(0);
        }
    }
    let assembly = model.element("assembly-1").unwrap();
    let leaves = collect_geometry_leaves(&assembly).unwrap();
    let shapes = extract_leaves(&leaves, &model, ExtractOptions::default()).unwrap();
    assert_eq!(ids(&shapes), vec!["beam-2"]);
}
