//! GeoJSON features and navigation links.
//!
//! Features wrap 2D geometry that has already been brought into the caller's
//! CRS. Properties carry the element identity plus `@bim.navigationLink` /
//! `@gim.navigationLink` entries pointing back into the two read views.

use geo::Geometry;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue, feature::Id};

use crate::config::ServiceConfig;

/// Drops scheme and authority: `http://host:5000/bimapi` becomes `/bimapi`.
fn strip_origin(endpoint: &str) -> String {
    match endpoint.split_once("://") {
        Some((_, rest)) => rest
            .find('/')
            .map(|path| rest[path..].to_string())
            .unwrap_or_default(),
        None => endpoint.to_string(),
    }
}

/// URLs of the semantic (`bim`) and geospatial (`gim`) views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkBuilder {
    endpoint: String,
}

impl LinkBuilder {
    pub fn new(endpoint: &str, relative: bool) -> Self {
        let endpoint = endpoint.trim_end_matches('/');
        Self {
            endpoint: if relative {
                strip_origin(endpoint)
            } else {
                endpoint.to_string()
            },
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(&config.endpoint(), config.relative_uris)
    }

    pub fn bim_collections(&self) -> String {
        format!("{}/bim/collections", self.endpoint)
    }

    pub fn gim_collections(&self) -> String {
        format!("{}/gim/collections", self.endpoint)
    }

    pub fn bim_projects(&self, collection: &str) -> String {
        format!("{}/{collection}/projects", self.bim_collections())
    }

    pub fn gim_collection(&self, collection: &str) -> String {
        format!("{}/{collection}", self.gim_collections())
    }

    pub fn gim_items(&self, collection: &str) -> String {
        format!("{}/items", self.gim_collection(collection))
    }

    pub fn project<'a>(&'a self, collection: &'a str, project: &'a str) -> ProjectLinks<'a> {
        ProjectLinks {
            links: self,
            collection,
            project,
        }
    }
}

/// Links inside one project.
#[derive(Clone, Copy, Debug)]
pub struct ProjectLinks<'a> {
    links: &'a LinkBuilder,
    collection: &'a str,
    project: &'a str,
}

impl ProjectLinks<'_> {
    pub fn bim_project(&self) -> String {
        format!("{}/{}", self.links.bim_projects(self.collection), self.project)
    }

    pub fn tree(&self) -> String {
        format!("{}/tree", self.bim_project())
    }

    pub fn gim_project(&self) -> String {
        format!("{}/{}", self.links.gim_items(self.collection), self.project)
    }

    pub fn ifcitems(&self) -> String {
        format!("{}/ifcitems", self.bim_project())
    }

    pub fn ifcitem(&self, guid: &str) -> String {
        format!("{}/{guid}", self.ifcitems())
    }

    pub fn geometry(&self, guid: &str) -> String {
        format!("{}/geometry", self.ifcitem(guid))
    }

    pub fn feature(&self, guid: &str) -> String {
        format!("{}:{guid}", self.gim_project())
    }

    pub fn psets(&self, guid: &str) -> String {
        format!("{}/psets", self.ifcitem(guid))
    }

    pub fn materials(&self, guid: &str) -> String {
        format!("{}/materials", self.ifcitem(guid))
    }
}

/// Wraps `geometry` and `properties` into a feature identified by `element_id`.
pub fn build_feature(
    element_id: &str,
    geometry: Option<&Geometry<f64>>,
    properties: JsonObject,
) -> Feature {
    Feature {
        bbox: None,
        geometry: geometry.map(|g| geojson::Geometry::new(geojson::Value::from(g))),
        id: Some(Id::String(element_id.to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn build_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Identity and links of one element, `guid` in UUID form.
pub fn element_properties(links: &ProjectLinks<'_>, guid: &str, type_name: &str) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("globalId".into(), guid.into());
    properties.insert("type".into(), type_name.into());
    properties.insert("project@bim.navigationLink".into(), links.bim_project().into());
    properties.insert("ifcitem@bim.navigationLink".into(), links.ifcitem(guid).into());
    properties.insert("feature@gim.navigationLink".into(), links.feature(guid).into());
    properties.insert("geometry@bim.navigationLink".into(), links.geometry(guid).into());
    properties.insert("psets@bim.navigationLink".into(), links.psets(guid).into());
    properties.insert("materials@bim.navigationLink".into(), links.materials(guid).into());
    properties
}

/// Element properties plus the feature links of every composed leaf.
pub fn composed_properties(
    links: &ProjectLinks<'_>,
    guid: &str,
    type_name: &str,
    leaf_guids: &[String],
) -> JsonObject {
    let mut properties = element_properties(links, guid, type_name);
    properties.remove("feature@gim.navigationLink");
    let leaves: Vec<JsonValue> = leaf_guids
        .iter()
        .map(|leaf| links.feature(leaf).into())
        .collect();
    properties.insert("features@gim.navigationLink".into(), JsonValue::Array(leaves));
    properties
}

/// Summary of a project as listed in a collection.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub title: String,
    /// Footprint already brought into the served CRS.
    pub footprint: Option<Geometry<f64>>,
}

pub fn project_feature(links: &LinkBuilder, collection: &str, summary: &ProjectSummary) -> Feature {
    let project = links.project(collection, &summary.name);
    let mut properties = JsonObject::new();
    properties.insert("id".into(), summary.id.clone().into());
    properties.insert("name".into(), summary.name.clone().into());
    properties.insert("title".into(), summary.title.clone().into());
    properties.insert("project@bim.navigationLink".into(), project.bim_project().into());
    properties.insert("tree@bim.navigationLink".into(), project.tree().into());
    properties.insert("feature@gim.navigationLink".into(), project.gim_project().into());
    build_feature(&summary.id, summary.footprint.as_ref(), properties)
}

pub fn collection_features(
    links: &LinkBuilder,
    collection: &str,
    projects: &[ProjectSummary],
) -> FeatureCollection {
    build_collection(
        projects
            .iter()
            .map(|summary| project_feature(links, collection, summary))
            .collect(),
    )
}
