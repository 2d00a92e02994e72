//! Facets shared between two simplices and the hyperplane separating their Voronoi vertices.

use std::sync::OnceLock;

use crate::constraint::HyperPlaneConstraint;
use crate::diagram::Diagram;
use crate::error::{DiagramError, Result};
use crate::simplex::SimplexKey;
use crate::site::SiteId;

/// A `(rank - 1)`-face of its owner simplex, linked to the simplex on the other side.
#[derive(Debug, Clone)]
pub(crate) struct Facet {
    owner: SimplexKey,
    external: Option<SimplexKey>,
    sites: Vec<SiteId>,
    plane: OnceLock<HyperPlaneConstraint>,
}

impl Facet {
    pub(crate) fn new(owner: SimplexKey, sites: Vec<SiteId>) -> Self {
        Self {
            owner,
            external: None,
            sites,
            plane: OnceLock::new(),
        }
    }

    pub(crate) fn owner(&self) -> SimplexKey {
        self.owner
    }

    pub(crate) fn external(&self) -> Option<SimplexKey> {
        self.external
    }

    pub(crate) fn sites(&self) -> &[SiteId] {
        &self.sites
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.external.is_some()
    }

    /// Only one side is updated; the diagram links both sides explicitly.
    pub(crate) fn set_external(&mut self, external: Option<SimplexKey>) {
        self.external = external;
        self.plane = OnceLock::new();
    }

    /// The hyperplane between the owner and external Voronoi vertices, derived on first use.
    pub(crate) fn hyperplane<'a, T>(&'a self, diagram: &Diagram<T>) -> Result<&'a HyperPlaneConstraint> {
        if let Some(plane) = self.plane.get() {
            return Ok(plane);
        }

        let external = self.external.ok_or(DiagramError::FacetNotInitialized)?;
        let owner = diagram
            .simplex(self.owner)
            .ok_or_else(|| DiagramError::invalid("facet owner is not a live simplex"))?;
        let external = diagram
            .simplex(external)
            .ok_or_else(|| DiagramError::invalid("facet external is not a live simplex"))?;

        let shared: Vec<&[f64]> = self.sites.iter().map(|&s| diagram.coordinates(s)).collect();
        let plane = derive_hyperplane(owner.vertex_geometry(), external.vertex_geometry(), &shared)?;

        Ok(self.plane.get_or_init(|| plane))
    }
}

// =============================================================================

/// Position of a Voronoi vertex: a circumcenter, or a direction towards infinity.
#[derive(Debug, Clone, Copy)]
pub(crate) enum VertexGeometry<'a> {
    Finite { center: &'a [f64] },
    /// `normal` is the outward unit normal of the hull facet the vertex escapes through.
    Infinite { normal: &'a [f64] },
}

/// Derive the hyperplane separating two Voronoi vertices, the owner being on the matching side.
///
/// A finite/infinite pair describes a Voronoi ray: the hyperplane goes through the
/// finite vertex, orthogonal to the ray. For a segment (two sites) the ray points
/// from the midpoint towards the shared site.
pub(crate) fn derive_hyperplane(
    owner: VertexGeometry<'_>,
    external: VertexGeometry<'_>,
    shared: &[&[f64]],
) -> Result<HyperPlaneConstraint> {
    match (owner, external) {
        (VertexGeometry::Finite { center: a }, VertexGeometry::Finite { center: b }) => {
            Ok(HyperPlaneConstraint::bisector(a, b))
        }
        (VertexGeometry::Finite { center }, VertexGeometry::Infinite { normal }) => {
            let inward: Vec<f64> = normal.iter().map(|n| -n).collect();
            Ok(HyperPlaneConstraint::through(center, &inward))
        }
        (VertexGeometry::Infinite { normal }, VertexGeometry::Finite { center }) => {
            Ok(HyperPlaneConstraint::through(center, normal))
        }
        (VertexGeometry::Infinite { .. }, VertexGeometry::Infinite { .. }) => match shared {
            [a, b] => Ok(HyperPlaneConstraint::bisector(a, b)),
            _ => Err(DiagramError::topology(format!(
                "two infinite vertices sharing {} sites",
                shared.len()
            ))),
        },
    }
}
