//! Request-level orchestration of the geometry pipeline.
//!
//! The HTTP layer resolves a project and an element, then asks the
//! [`GeometryService`] for one of the two geometric views:
//!
//! - 3D: an encoded mesh for a leaf, a composed scene for a decomposed
//!   element, or the list of leaf geometry URLs when composition is off
//! - 2D: GeoJSON features in the requested CRS
//!
//! Everything here runs within one request; the only state shared between
//! requests is the per-model georeference cache.

use geo::Geometry;
use geojson::GeoJson;

use crate::{
    compose::{
        compose_footprint, compose_mesh, element_geometry, geometry_leaves, leaf_geometries,
    },
    config::{FootprintKind, GeometryRequest, ServiceConfig},
    data_structures::{
        element::{BuildingModel, Element, ElementCategory},
        scene_graph::MergedMesh,
        spatial_tree::{SpatialTreeNode, build_spatial_tree},
    },
    encoder,
    error::{GeometryError, GeometryResult},
    feature::{
        LinkBuilder, ProjectSummary, build_collection, build_feature, composed_properties,
        element_properties,
    },
    georef::{
        GEOCENTRIC_CRS, GEOGRAPHIC_CRS, GeorefParams, Trs,
        geodesy::{BuiltinGeodesy, Geodesy},
        reproject_geometry, world_trs,
    },
    guid::json_guid,
    resources::{
        ProjectHandle, ShapeExtractor,
        extract::{ExtractOptions, extract_one},
    },
};

/// Requested CRS value that keeps geometry in the model frame.
pub const LOCAL_CRS: &str = "local";

#[derive(Clone, Debug, PartialEq)]
pub enum GeometryResponse {
    /// A leaf element's own mesh.
    Single(MergedMesh),
    /// All leaves of a decomposed element, one node each.
    Composed(MergedMesh),
    /// Geometry URLs of the leaves, in walker order.
    Links(Vec<String>),
}

/// What one request sees of a project.
pub struct ProjectScope<'a, X: ?Sized> {
    pub collection: &'a str,
    pub project: &'a str,
    pub extractor: &'a X,
    pub georef: Option<&'a GeorefParams>,
}

impl<'a, X: ?Sized> ProjectScope<'a, X> {
    /// Resolves (or reuses) the georeference of the handle's model.
    pub fn from_handle<M: BuildingModel>(
        handle: &ProjectHandle<'a, M>,
        extractor: &'a X,
    ) -> GeometryResult<Self> {
        Ok(Self {
            collection: handle.collection,
            project: handle.name,
            extractor,
            georef: handle.georef.get_or_resolve(handle.model)?,
        })
    }
}

pub struct GeometryService {
    config: ServiceConfig,
    links: LinkBuilder,
    geodesy: Box<dyn Geodesy>,
}

impl GeometryService {
    pub fn new(config: ServiceConfig) -> Self {
        let links = LinkBuilder::from_config(&config);
        Self {
            config,
            links,
            geodesy: Box::new(BuiltinGeodesy),
        }
    }

    pub fn with_geodesy(mut self, geodesy: impl Geodesy + 'static) -> Self {
        self.geodesy = Box::new(geodesy);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    pub fn geodesy(&self) -> &dyn Geodesy {
        self.geodesy.as_ref()
    }

    fn options(&self) -> ExtractOptions {
        ExtractOptions::from(&self.config)
    }

    /**
     * CRS the 2D geometry is served in, `None` for the model frame.
     *
     * Without an explicit choice a georeferenced model is served in
     * `EPSG:4326`. Explicitly asking for a world CRS on a model without
     * georeference is an error rather than silently local output.
     */
    pub fn target_crs(
        &self,
        georef: Option<&GeorefParams>,
        request: &GeometryRequest,
    ) -> GeometryResult<Option<String>> {
        match (&request.crs, georef) {
            (Some(crs), _) if crs.eq_ignore_ascii_case(LOCAL_CRS) => Ok(None),
            (Some(_), None) => Err(GeometryError::NoGeoreference),
            (Some(crs), Some(_)) => Ok(Some(crs.clone())),
            (None, Some(_)) => Ok(Some(GEOGRAPHIC_CRS.to_string())),
            (None, None) => Ok(None),
        }
    }

    fn serve(
        &self,
        geometry: Geometry<f64>,
        georef: Option<&GeorefParams>,
        target: Option<&str>,
    ) -> GeometryResult<Geometry<f64>> {
        match (georef, target) {
            (Some(georef), Some(target)) => {
                reproject_geometry(&geometry, georef, target, self.geodesy())
            }
            (None, Some(_)) => Err(GeometryError::NoGeoreference),
            (_, None) => Ok(geometry),
        }
    }

    fn wants_composition<E: Element>(element: &E, request: &GeometryRequest) -> bool {
        request.composed
            || (request.compose_assembly && element.category() == ElementCategory::Assembly)
    }

    /// The 3D view of `element`, in the model frame.
    pub fn geometry_3d<E, X>(
        &self,
        scope: &ProjectScope<'_, X>,
        element: &E,
        request: &GeometryRequest,
    ) -> GeometryResult<GeometryResponse>
    where
        E: Element,
        X: ShapeExtractor<E> + ?Sized,
    {
        if element.is_composite() {
            if Self::wants_composition(element, request) {
                let scene = compose_mesh(element, scope.extractor, self.options())?;
                return Ok(GeometryResponse::Composed(scene));
            }
            let project = self.links.project(scope.collection, scope.project);
            let links = geometry_leaves(element)?
                .iter()
                .map(|leaf| project.geometry(&json_guid(leaf.global_id())))
                .collect();
            return Ok(GeometryResponse::Links(links));
        }

        let id = element.global_id().to_string();
        let shapes = match extract_one(element, scope.extractor, self.options().leaf_budget) {
            Ok(shape) => vec![(id, shape)],
            Err(e) if e.is_leaf_recoverable() => {
                log::warn!("Serving an empty mesh for {}: {}", id, e);
                vec![]
            }
            Err(e) => return Err(e),
        };
        Ok(GeometryResponse::Single(encoder::encode(&shapes)))
    }

    /// The GeoJSON view of `element`.
    pub fn geojson<E, X>(
        &self,
        scope: &ProjectScope<'_, X>,
        element: &E,
        request: &GeometryRequest,
    ) -> GeometryResult<GeoJson>
    where
        E: Element,
        X: ShapeExtractor<E> + ?Sized,
    {
        let target = self.target_crs(scope.georef, request)?;
        let target = target.as_deref();
        let project = self.links.project(scope.collection, scope.project);
        let guid = json_guid(element.global_id());

        if element.is_composite() {
            if request.composed {
                let footprint =
                    compose_footprint(element, scope.extractor, request.footprint, self.options())?;
                let geometry = footprint
                    .map(|geometry| self.serve(geometry, scope.georef, target))
                    .transpose()?;
                let leaf_guids: Vec<String> = geometry_leaves(element)?
                    .iter()
                    .map(|leaf| json_guid(leaf.global_id()))
                    .collect();
                let properties =
                    composed_properties(&project, &guid, element.type_name(), &leaf_guids);
                return Ok(GeoJson::Feature(build_feature(
                    &guid,
                    geometry.as_ref(),
                    properties,
                )));
            }

            let mut features = Vec::new();
            for (leaf, geometry) in
                leaf_geometries(element, scope.extractor, request.footprint, self.options())?
            {
                let leaf_guid = json_guid(leaf.global_id());
                match self.serve(geometry, scope.georef, target) {
                    Ok(geometry) => features.push(build_feature(
                        &leaf_guid,
                        Some(&geometry),
                        element_properties(&project, &leaf_guid, leaf.type_name()),
                    )),
                    Err(e) => log::warn!("Skipping feature {}: {}", leaf_guid, e),
                }
            }
            return Ok(GeoJson::FeatureCollection(build_collection(features)));
        }

        let geometry = match extract_one(element, scope.extractor, self.options().leaf_budget) {
            Ok(shape) => element_geometry(&shape, request.footprint),
            Err(e) if e.is_leaf_recoverable() => {
                log::warn!("Feature {} has no geometry: {}", guid, e);
                None
            }
            Err(e) => return Err(e),
        };
        let geometry = geometry
            .map(|geometry| self.serve(geometry, scope.georef, target))
            .transpose()?;
        Ok(GeoJson::Feature(build_feature(
            &guid,
            geometry.as_ref(),
            element_properties(&project, &guid, element.type_name()),
        )))
    }

    /**
     * Footprint of a whole project for collection listings, in the CRS the
     * request selects. Computed from the decomposition root.
     */
    pub fn project_summary<E, X>(
        &self,
        scope: &ProjectScope<'_, X>,
        root: &E,
        kind: Option<FootprintKind>,
        request: &GeometryRequest,
    ) -> GeometryResult<ProjectSummary>
    where
        E: Element,
        X: ShapeExtractor<E> + ?Sized,
    {
        let target = self.target_crs(scope.georef, request)?;
        let kind = kind.unwrap_or(self.config.default_footprint);
        let footprint = compose_footprint(root, scope.extractor, kind, self.options())?
            .map(|geometry| self.serve(geometry, scope.georef, target.as_deref()))
            .transpose()?;
        let name = scope.project.to_string();
        Ok(ProjectSummary {
            id: name.clone(),
            title: root.name().map(str::to_string).unwrap_or_else(|| name.clone()),
            name,
            footprint,
        })
    }

    /// Model origin and orientation in `EPSG:4978` and `EPSG:4326`.
    pub fn world_trs(&self, georef: Option<&GeorefParams>) -> GeometryResult<Vec<Trs>> {
        let georef = georef.ok_or(GeometryError::NoGeoreference)?;
        [GEOCENTRIC_CRS, GEOGRAPHIC_CRS]
            .iter()
            .map(|crs| world_trs(georef, crs, self.geodesy()))
            .collect()
    }

    pub fn spatial_tree<M: BuildingModel>(
        &self,
        handle: &ProjectHandle<'_, M>,
    ) -> GeometryResult<SpatialTreeNode> {
        let project = self.links.project(handle.collection, handle.name);
        build_spatial_tree(handle.model, handle.name, Some(&project))
    }
}
