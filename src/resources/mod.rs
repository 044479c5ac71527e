//! Boundaries to the collaborators that own the model: the store that hands
//! out parsed projects and the geometry kernel that triangulates single
//! elements.

use std::collections::HashMap;

use crate::{
    data_structures::{element::BuildingModel, memory::InMemoryModel, shape::Shape},
    error::{GeometryError, GeometryResult},
    georef::GeorefSlot,
};

pub mod decode;
pub mod extract;

/// The geometry kernel. Implementations must be callable from several worker
/// threads at once.
pub trait ShapeExtractor<E>: Sync {
    /// Triangulates one element in the model-local frame.
    fn triangulate(&self, element: &E) -> GeometryResult<Shape>;
}

/// A parsed project borrowed from a store for the duration of a request.
pub struct ProjectHandle<'s, M: BuildingModel> {
    pub collection: &'s str,
    pub name: &'s str,
    pub model: &'s M,
    pub georef: &'s GeorefSlot,
}

impl<'s, M: BuildingModel> ProjectHandle<'s, M> {
    /// Root of the spatial decomposition.
    pub fn root(&self) -> GeometryResult<M::Element<'s>> {
        self.model
            .project()
            .ok_or_else(|| GeometryError::ElementNotFound(format!("project of {}", self.name)))
    }

    pub fn element(&self, global_id: &str) -> GeometryResult<M::Element<'s>> {
        self.model
            .element(global_id)
            .ok_or_else(|| GeometryError::ElementNotFound(global_id.to_string()))
    }
}

pub trait ModelStore {
    type Model: BuildingModel;

    fn get_project(
        &self,
        collection: &str,
        name: &str,
    ) -> GeometryResult<ProjectHandle<'_, Self::Model>>;

    fn collections(&self) -> Vec<String>;

    fn projects(&self, collection: &str) -> Vec<String>;
}

struct StoredProject {
    collection: String,
    name: String,
    model: InMemoryModel,
    georef: GeorefSlot,
}

/// Store over already loaded in-memory models.
#[derive(Default)]
pub struct InMemoryStore {
    projects: HashMap<(String, String), StoredProject>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: &str, name: &str, model: InMemoryModel) {
        self.projects.insert(
            (collection.to_string(), name.to_string()),
            StoredProject {
                collection: collection.to_string(),
                name: name.to_string(),
                model,
                georef: GeorefSlot::new(),
            },
        );
    }
}

impl ModelStore for InMemoryStore {
    type Model = InMemoryModel;

    fn get_project(
        &self,
        collection: &str,
        name: &str,
    ) -> GeometryResult<ProjectHandle<'_, InMemoryModel>> {
        let stored = self
            .projects
            .get(&(collection.to_string(), name.to_string()))
            .ok_or_else(|| GeometryError::ElementNotFound(format!("{collection}/{name}")))?;
        Ok(ProjectHandle {
            collection: &stored.collection,
            name: &stored.name,
            model: &stored.model,
            georef: &stored.georef,
        })
    }

    fn collections(&self) -> Vec<String> {
        let mut collections: Vec<String> =
            self.projects.keys().map(|(c, _)| c.clone()).collect();
        collections.sort();
        collections.dedup();
        collections
    }

    fn projects(&self, collection: &str) -> Vec<String> {
        let mut projects: Vec<String> = self
            .projects
            .keys()
            .filter(|(c, _)| c == collection)
            .map(|(_, p)| p.clone())
            .collect();
        projects.sort();
        projects
    }
}
