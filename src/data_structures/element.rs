//! Element capabilities and model-level metadata.
//!
//! The source model is never owned by this crate. Implementors hand out cheap
//! element handles (usually references into their own storage) that expose
//! the two relations the walker needs, with empty vectors standing in for an
//! absent relation.

use serde::{Deserialize, Serialize};

/// Property set as a plain JSON object (`name -> value`).
pub type PropertySet = serde_json::Map<String, serde_json::Value>;

/// Coarse classification of an element, as far as geometry composition cares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementCategory {
    /// Any physical element (wall, slab, furniture, ...).
    #[default]
    Normal,
    /// Void/room volume. Never expanded when composing geometry.
    Space,
    /// Top-level project context.
    Project,
    /// Site, building, storey and similar spatial containers.
    SpatialStructure,
    /// Element assembled from sub-parts.
    Assembly,
}

pub trait Element: Clone + Send + Sync {
    /// Stable global identifier as stored in the model.
    fn global_id(&self) -> &str;

    /// Schema type tag, e.g. `IfcWall`.
    fn type_name(&self) -> &str;

    fn name(&self) -> Option<&str> {
        None
    }

    fn category(&self) -> ElementCategory;

    /// True for products, whose representation slot exists even when it is empty.
    fn has_representation(&self) -> bool;

    /// Sub-parts, in relation-declared order.
    fn decomposition_children(&self) -> Vec<Self>;

    /// Directly contained elements, in relation-declared order.
    fn containment_children(&self) -> Vec<Self>;

    fn is_decomposed(&self) -> bool {
        !self.decomposition_children().is_empty()
    }

    fn is_container(&self) -> bool {
        !self.containment_children().is_empty()
    }

    /// Whether geometry requests on this element are answered by composing
    /// its leaves instead of triangulating the element itself.
    fn is_composite(&self) -> bool {
        match self.category() {
            ElementCategory::Space => false,
            ElementCategory::Project | ElementCategory::SpatialStructure => true,
            _ => self.is_decomposed(),
        }
    }
}

/// Map conversion parameters as declared by the model.
///
/// Missing abscissa/ordinate default to 0 and a missing scale defaults to 1
/// when the parameters are resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateOperation {
    pub eastings: f64,
    pub northings: f64,
    #[serde(default)]
    pub orthogonal_height: f64,
    #[serde(default)]
    pub x_axis_abscissa: Option<f64>,
    #[serde(default)]
    pub x_axis_ordinate: Option<f64>,
    #[serde(default)]
    pub scale: Option<f64>,
    /// Name of the target CRS, e.g. `EPSG:25832`.
    pub target_crs: String,
}

/// Read access to one parsed building model.
pub trait BuildingModel {
    type Element<'a>: Element
    where
        Self: 'a;

    /// Schema identifier, e.g. `IFC4` or `IFC2X3`.
    fn schema(&self) -> &str;

    fn project(&self) -> Option<Self::Element<'_>>;

    /// Looks an element up by its stored global id.
    fn element(&self, global_id: &str) -> Option<Self::Element<'_>>;

    fn elements_of_type(&self, type_name: &str) -> Vec<Self::Element<'_>>;

    /// First-class map conversions attached to the project's representation
    /// contexts, in declaration order.
    fn coordinate_operations(&self) -> Vec<CoordinateOperation>;

    /// A property set attached to the model's site element.
    fn site_property_set(&self, name: &str) -> Option<PropertySet>;
}
