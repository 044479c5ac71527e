//! A plain in-memory building model.
//!
//! Elements are stored flat and refer to each other by global id. The model
//! deserializes from JSON, which makes it the format fixtures and the
//! command-line tooling exchange. It is its own geometry kernel: shapes are
//! stored pre-triangulated on the records.

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    data_structures::{
        element::{BuildingModel, CoordinateOperation, Element, ElementCategory, PropertySet},
        shape::Shape,
    },
    error::{GeometryError, GeometryResult},
    guid::Guids,
    resources::ShapeExtractor,
};

fn default_schema() -> String {
    "IFC4".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub global_id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: ElementCategory,
    #[serde(default = "default_true")]
    pub has_representation: bool,
    /// Parts, by global id.
    #[serde(default)]
    pub decomposes_into: Vec<String>,
    /// Contained elements, by global id.
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub shape: Option<Shape>,
}

impl ElementRecord {
    pub fn new(global_id: &str, type_name: &str, category: ElementCategory) -> Self {
        Self {
            global_id: global_id.to_string(),
            type_name: type_name.to_string(),
            name: None,
            category,
            has_representation: true,
            decomposes_into: Vec::new(),
            contains: Vec::new(),
            shape: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn with_parts<S: AsRef<str>>(mut self, parts: &[S]) -> Self {
        self.decomposes_into = parts.iter().map(|p| p.as_ref().to_string()).collect();
        self
    }

    pub fn containing<S: AsRef<str>>(mut self, elements: &[S]) -> Self {
        self.contains = elements.iter().map(|e| e.as_ref().to_string()).collect();
        self
    }

    pub fn without_representation(mut self) -> Self {
        self.has_representation = false;
        self
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryModel {
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Global id of the project element.
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub elements: Vec<ElementRecord>,
    #[serde(default)]
    pub coordinate_operations: Vec<CoordinateOperation>,
    /// Property sets of the site, by name.
    #[serde(default)]
    pub site_property_sets: BTreeMap<String, PropertySet>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl InMemoryModel {
    pub fn new(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json_str(source: &str) -> anyhow::Result<Self> {
        let mut model: Self = serde_json::from_str(source).context("parsing model JSON")?;
        model.reindex();
        Ok(model)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json_str(&source)
    }

    /// Rebuilds the id lookup; later records shadow earlier ones.
    pub fn reindex(&mut self) {
        self.index = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, record)| (record.global_id.clone(), i))
            .collect();
    }

    pub fn insert(&mut self, record: ElementRecord) -> &mut Self {
        if record.category == ElementCategory::Project && self.project.is_none() {
            self.project = Some(record.global_id.clone());
        }
        self.index
            .insert(record.global_id.clone(), self.elements.len());
        self.elements.push(record);
        self
    }

    pub fn with(mut self, record: ElementRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn with_coordinate_operation(mut self, operation: CoordinateOperation) -> Self {
        self.coordinate_operations.push(operation);
        self
    }

    pub fn with_site_property_set(mut self, name: &str, pset: PropertySet) -> Self {
        self.site_property_sets.insert(name.to_string(), pset);
        self
    }

    fn record(&self, global_id: &str) -> Option<&ElementRecord> {
        if let Some(&i) = self.index.get(global_id) {
            return self.elements.get(i);
        }
        // the other spelling of the same id
        let guids = Guids::from_any(global_id).ok()?;
        [guids.ifc, guids.json]
            .iter()
            .find_map(|id| self.index.get(id))
            .and_then(|&i| self.elements.get(i))
    }

    fn resolve_all<'m>(&'m self, ids: &[String], owner: &str) -> Vec<ElementRef<'m>> {
        ids.iter()
            .filter_map(|id| {
                let found = self.record(id);
                if found.is_none() {
                    log::warn!("Element {} references unknown element {}.", owner, id);
                }
                found.map(|record| ElementRef {
                    model: self,
                    record,
                })
            })
            .collect()
    }
}

/// Borrowed handle to one record of an [`InMemoryModel`].
#[derive(Clone, Copy, Debug)]
pub struct ElementRef<'m> {
    model: &'m InMemoryModel,
    record: &'m ElementRecord,
}

impl<'m> ElementRef<'m> {
    pub fn record(&self) -> &'m ElementRecord {
        self.record
    }
}

impl Element for ElementRef<'_> {
    fn global_id(&self) -> &str {
        &self.record.global_id
    }

    fn type_name(&self) -> &str {
        &self.record.type_name
    }

    fn name(&self) -> Option<&str> {
        self.record.name.as_deref()
    }

    fn category(&self) -> ElementCategory {
        self.record.category
    }

    fn has_representation(&self) -> bool {
        self.record.has_representation
    }

    fn decomposition_children(&self) -> Vec<Self> {
        self.model
            .resolve_all(&self.record.decomposes_into, &self.record.global_id)
    }

    fn containment_children(&self) -> Vec<Self> {
        self.model
            .resolve_all(&self.record.contains, &self.record.global_id)
    }

    fn is_decomposed(&self) -> bool {
        !self.record.decomposes_into.is_empty()
    }

    fn is_container(&self) -> bool {
        !self.record.contains.is_empty()
    }
}

impl BuildingModel for InMemoryModel {
    type Element<'a> = ElementRef<'a>;

    fn schema(&self) -> &str {
        &self.schema
    }

    fn project(&self) -> Option<ElementRef<'_>> {
        let record = match &self.project {
            Some(id) => self.record(id),
            None => self
                .elements
                .iter()
                .find(|record| record.category == ElementCategory::Project),
        }?;
        Some(ElementRef {
            model: self,
            record,
        })
    }

    fn element(&self, global_id: &str) -> Option<ElementRef<'_>> {
        self.record(global_id).map(|record| ElementRef {
            model: self,
            record,
        })
    }

    fn elements_of_type(&self, type_name: &str) -> Vec<ElementRef<'_>> {
        self.elements
            .iter()
            .filter(|record| record.type_name.eq_ignore_ascii_case(type_name))
            .map(|record| ElementRef {
                model: self,
                record,
            })
            .collect()
    }

    fn coordinate_operations(&self) -> Vec<CoordinateOperation> {
        self.coordinate_operations.clone()
    }

    fn site_property_set(&self, name: &str) -> Option<PropertySet> {
        self.site_property_sets.get(name).cloned()
    }
}

impl<'m> ShapeExtractor<ElementRef<'m>> for InMemoryModel {
    fn triangulate(&self, element: &ElementRef<'m>) -> GeometryResult<Shape> {
        if !element.record.has_representation {
            return Err(GeometryError::unavailable(
                element.global_id(),
                "element has no representation",
            ));
        }
        element
            .record
            .shape
            .clone()
            .ok_or_else(|| GeometryError::unavailable(element.global_id(), "no stored shape"))
    }
}
