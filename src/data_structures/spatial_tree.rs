//! Spatial tree of a project: every element reachable from the project
//! through containment and decomposition, in relation order.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    data_structures::element::{BuildingModel, Element},
    error::{GeometryError, GeometryResult},
    feature::ProjectLinks,
    guid::json_guid,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpatialTreeNode {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    /// UUID spelling of the id.
    #[serde(rename = "globalId")]
    pub global_id: String,
    /// Id as stored in the model.
    #[serde(rename = "ifcGlobalId")]
    pub ifc_global_id: String,
    #[serde(
        rename = "ifcitem@bim.navigationLink",
        skip_serializing_if = "Option::is_none"
    )]
    pub item_link: Option<String>,
    #[serde(
        rename = "geometry@bim.navigationLink",
        skip_serializing_if = "Option::is_none"
    )]
    pub geometry_link: Option<String>,
    pub data: Vec<SpatialTreeNode>,
}

impl SpatialTreeNode {
    /// Number of nodes in this subtree, itself included.
    pub fn node_count(&self) -> usize {
        1 + self.data.iter().map(SpatialTreeNode::node_count).sum::<usize>()
    }

    /// Depth-first search by either id spelling.
    pub fn find(&self, global_id: &str) -> Option<&SpatialTreeNode> {
        if self.global_id == global_id || self.ifc_global_id == global_id {
            return Some(self);
        }
        self.data.iter().find_map(|child| child.find(global_id))
    }
}

/**
 * Builds the tree under a `File` root named after the project file.
 *
 * Containment children come before decomposition children. With `links`
 * every element node carries its item and geometry URLs.
 */
pub fn build_spatial_tree<M: BuildingModel + ?Sized>(
    model: &M,
    file_name: &str,
    links: Option<&ProjectLinks<'_>>,
) -> GeometryResult<SpatialTreeNode> {
    let mut root = SpatialTreeNode {
        name: Some(file_name.to_string()),
        type_name: "File".to_string(),
        global_id: file_name.to_string(),
        ifc_global_id: file_name.to_string(),
        item_link: None,
        geometry_link: None,
        data: Vec::new(),
    };
    if let Some(project) = model.project() {
        let mut path = HashSet::new();
        root.data.push(tree_node(&project, links, &mut path)?);
    }
    Ok(root)
}

fn tree_node<E: Element>(
    element: &E,
    links: Option<&ProjectLinks<'_>>,
    path: &mut HashSet<String>,
) -> GeometryResult<SpatialTreeNode> {
    let id = element.global_id().to_string();
    if !path.insert(id.clone()) {
        return Err(GeometryError::CyclicDecomposition(id));
    }
    let guid = json_guid(&id);
    let mut data = Vec::new();
    for child in element
        .containment_children()
        .into_iter()
        .chain(element.decomposition_children())
    {
        data.push(tree_node(&child, links, path)?);
    }
    path.remove(&id);
    Ok(SpatialTreeNode {
        name: element.name().map(str::to_string),
        type_name: element.type_name().to_string(),
        item_link: links.map(|l| l.ifcitem(&guid)),
        geometry_link: links.map(|l| l.geometry(&guid)),
        global_id: guid,
        ifc_global_id: id,
        data,
    })
}
