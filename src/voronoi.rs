//! Borrowed views over a [`Diagram`]: Voronoi regions and vertices, and the simplices and
//! facets of the triangulation behind them.

use std::fmt;

use crate::constraint::HyperPlaneConstraint;
use crate::diagram::Diagram;
use crate::error::{DiagramError, Result};
use crate::facet::Facet;
use crate::point::ToCoordinates;
use crate::simplex::{Simplex, SimplexKey};
use crate::site::{RegionBoundary, Site, SiteId};

fn coordinates_of<T, P: ToCoordinates + ?Sized>(diagram: &Diagram<T>, point: &P) -> Result<Vec<f64>> {
    let coordinates = point.to_coordinates();
    if coordinates.len() != diagram.dimensionality() {
        return Err(DiagramError::DimensionMismatch {
            expected: diagram.dimensionality(),
            actual: coordinates.len(),
        });
    }
    Ok(coordinates)
}

// =============================================================================

/// The Voronoi region of a site: every point closer to it than to any other site.
pub struct Region<'a, T> {
    diagram: &'a Diagram<T>,
    id: SiteId,
}

impl<'a, T> Region<'a, T> {
    pub(crate) fn new(diagram: &'a Diagram<T>, id: SiteId) -> Self {
        Self { diagram, id }
    }

    pub fn id(&self) -> SiteId {
        self.id
    }

    pub fn site(&self) -> &'a Site<T> {
        self.diagram.site_at(self.id)
    }

    pub fn coordinates(&self) -> &'a [f64] {
        self.site().coordinates()
    }

    pub fn data(&self) -> Option<&'a T> {
        self.site().data()
    }

    /// Sites whose regions share a facet with this one.
    pub fn neighbours(&self) -> impl Iterator<Item = SiteId> + 'a {
        self.diagram
            .region_boundaries(self.id)
            .iter()
            .map(|b| b.neighbour)
    }

    /// One facet per neighbouring site, lying on their bisector.
    pub fn facets(&self) -> impl Iterator<Item = RegionFacet<'a>> + 'a {
        let owner = self.id;
        self.diagram
            .region_boundaries(self.id)
            .iter()
            .map(move |boundary| RegionFacet { owner, boundary })
    }

    /// Returns `true` if `point` is strictly closer to this site than to every neighbour.
    pub fn contains<P: ToCoordinates + ?Sized>(&self, point: &P) -> Result<bool> {
        let coordinates = coordinates_of(self.diagram, point)?;
        Ok(self
            .facets()
            .all(|f| f.hyperplane().evaluate(&coordinates)))
    }

    /// Regions of convex hull sites extend to infinity.
    pub fn is_unbounded(&self) -> bool {
        self.diagram.is_hull_site(self.id)
    }

    /// The Voronoi vertices around this region, i.e. the simplices holding its site.
    pub fn vertices(&self) -> impl Iterator<Item = VoronoiVertex<'a, T>> + 'a {
        let diagram = self.diagram;
        self.site()
            .incident_simplices()
            .iter()
            .filter_map(move |&key| {
                diagram
                    .simplex(key)
                    .map(|simplex| VoronoiVertex::new(diagram, key, simplex))
            })
    }
}

impl<T> Clone for Region<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Region<'_, T> {}

impl<T> fmt::Debug for Region<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("id", &self.id)
            .field("coordinates", &self.coordinates())
            .finish()
    }
}

/// The bisector between a region and one of its neighbours.
#[derive(Debug, Clone, Copy)]
pub struct RegionFacet<'a> {
    owner: SiteId,
    boundary: &'a RegionBoundary,
}

impl<'a> RegionFacet<'a> {
    pub fn owner(&self) -> SiteId {
        self.owner
    }

    pub fn external(&self) -> SiteId {
        self.boundary.neighbour
    }

    /// The bisector hyperplane, positive on the owner's side.
    pub fn hyperplane(&self) -> &'a HyperPlaneConstraint {
        &self.boundary.plane
    }

    pub fn coefficient(&self, i: usize) -> f64 {
        self.boundary.plane.coefficient(i)
    }

    /// Returns `true` if `point` is strictly on the owner's side.
    pub fn separates<P: ToCoordinates + ?Sized>(&self, point: &P) -> Result<bool> {
        let coordinates = point.to_coordinates();
        let expected = self.boundary.plane.dimensionality();
        if coordinates.len() != expected {
            return Err(DiagramError::DimensionMismatch {
                expected,
                actual: coordinates.len(),
            });
        }
        Ok(self.boundary.plane.evaluate(&coordinates))
    }
}

// =============================================================================

/// A Voronoi vertex: the circumcenter of a finite simplex, or a point at infinity
/// beyond a convex hull facet.
pub struct VoronoiVertex<'a, T> {
    diagram: &'a Diagram<T>,
    key: SimplexKey,
    simplex: &'a Simplex,
}

impl<'a, T> VoronoiVertex<'a, T> {
    pub(crate) fn new(diagram: &'a Diagram<T>, key: SimplexKey, simplex: &'a Simplex) -> Self {
        Self {
            diagram,
            key,
            simplex,
        }
    }

    pub fn key(&self) -> SimplexKey {
        self.key
    }

    /// The simplex this vertex is dual to.
    pub fn simplex(&self) -> SimplexView<'a, T> {
        SimplexView::new(self.diagram, self.key, self.simplex)
    }

    pub fn is_infinite(&self) -> bool {
        self.simplex.is_infinite()
    }

    /// Position of a finite vertex.
    pub fn coordinates(&self) -> Option<&'a [f64]> {
        self.simplex.circumsphere().map(|s| s.center())
    }

    /// Distance to the sites around the vertex. Infinite for the single-site diagram.
    pub fn radius(&self) -> Option<f64> {
        self.simplex.circumsphere().map(|s| s.radius())
    }

    /// Direction an infinite vertex escapes towards, as the outward unit normal of its hull facet.
    pub fn direction(&self) -> Option<&'a [f64]> {
        self.simplex.hull().map(|h| h.normal())
    }

    /// The sites whose regions meet at this vertex.
    pub fn sites(&self) -> &'a [SiteId] {
        self.simplex.sites()
    }

    /// Vertices joined to this one by a Voronoi edge or ray, infinite ones included.
    pub fn neighbours(&self) -> impl Iterator<Item = VoronoiVertex<'a, T>> + 'a {
        let diagram = self.diagram;
        self.simplex
            .facets()
            .iter()
            .filter_map(|f| f.external())
            .filter_map(move |key| diagram.vertex(key))
    }
}

impl<T> Clone for VoronoiVertex<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for VoronoiVertex<'_, T> {}

impl<T> fmt::Debug for VoronoiVertex<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoronoiVertex")
            .field("key", &self.key)
            .field("sites", &self.sites())
            .field("coordinates", &self.coordinates())
            .finish()
    }
}

// =============================================================================

/// A simplex of the triangulation, finite or infinite.
pub struct SimplexView<'a, T> {
    diagram: &'a Diagram<T>,
    key: SimplexKey,
    simplex: &'a Simplex,
}

impl<'a, T> SimplexView<'a, T> {
    pub(crate) fn new(diagram: &'a Diagram<T>, key: SimplexKey, simplex: &'a Simplex) -> Self {
        Self {
            diagram,
            key,
            simplex,
        }
    }

    pub fn key(&self) -> SimplexKey {
        self.key
    }

    pub fn rank(&self) -> usize {
        self.simplex.rank()
    }

    /// Member sites in ascending order. An infinite simplex holds the sites of its hull facet.
    pub fn sites(&self) -> &'a [SiteId] {
        self.simplex.sites()
    }

    pub fn is_infinite(&self) -> bool {
        self.simplex.is_infinite()
    }

    pub fn circumcenter(&self) -> Option<&'a [f64]> {
        self.simplex.circumsphere().map(|s| s.center())
    }

    pub fn circumradius(&self) -> Option<f64> {
        self.simplex.circumsphere().map(|s| s.radius())
    }

    /// Closed circumsphere test, with the diagram tolerance. For an infinite simplex this
    /// is the region beyond its hull facet.
    pub fn circumsphere_contains<P: ToCoordinates + ?Sized>(&self, point: &P) -> Result<bool> {
        let coordinates = coordinates_of(self.diagram, point)?;
        Ok(self
            .simplex
            .circumsphere_contains(&coordinates, self.diagram.config().tolerance))
    }

    pub fn facets(&self) -> impl Iterator<Item = FacetView<'a, T>> + 'a {
        let diagram = self.diagram;
        self.simplex
            .facets()
            .iter()
            .map(move |facet| FacetView { diagram, facet })
    }

    /// Finite simplices sharing a facet with this one. Hull facets are skipped, so an
    /// infinite simplex has none.
    pub fn neighbour_simplices(&self) -> impl Iterator<Item = SimplexView<'a, T>> + 'a {
        let diagram = self.diagram;
        let infinite = self.simplex.is_infinite();
        self.simplex
            .facets()
            .iter()
            .filter(move |_| !infinite)
            .filter_map(|f| f.external())
            .filter_map(move |key| {
                diagram
                    .simplex(key)
                    .filter(|simplex| !simplex.is_infinite())
                    .map(|simplex| SimplexView::new(diagram, key, simplex))
            })
    }
}

impl<T> Clone for SimplexView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SimplexView<'_, T> {}

impl<T> fmt::Debug for SimplexView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimplexView")
            .field("key", &self.key)
            .field("rank", &self.rank())
            .field("sites", &self.sites())
            .field("infinite", &self.is_infinite())
            .finish()
    }
}

/// A facet shared by two simplices, dual to a Voronoi edge (or ray).
pub struct FacetView<'a, T> {
    diagram: &'a Diagram<T>,
    facet: &'a Facet,
}

impl<'a, T> FacetView<'a, T> {
    pub fn sites(&self) -> &'a [SiteId] {
        self.facet.sites()
    }

    pub fn owner(&self) -> SimplexKey {
        self.facet.owner()
    }

    pub fn external(&self) -> Option<SimplexKey> {
        self.facet.external()
    }

    pub fn is_initialized(&self) -> bool {
        self.facet.is_initialized()
    }

    /// Returns `true` if the facet lies on the convex hull, between a finite and an infinite simplex.
    pub fn is_hull_boundary(&self) -> Result<bool> {
        let external = self.facet.external().ok_or(DiagramError::FacetNotInitialized)?;
        let owner = self
            .diagram
            .simplex(self.facet.owner())
            .ok_or_else(|| DiagramError::invalid("facet owner is not a live simplex"))?;
        let external = self
            .diagram
            .simplex(external)
            .ok_or_else(|| DiagramError::invalid("facet external is not a live simplex"))?;
        Ok(owner.is_infinite() != external.is_infinite())
    }

    /// The hyperplane between the owner's and the external simplex's Voronoi vertices,
    /// positive on the owner's side.
    pub fn hyperplane(&self) -> Result<&'a HyperPlaneConstraint> {
        self.facet.hyperplane(self.diagram)
    }

    pub fn coefficient(&self, i: usize) -> Result<f64> {
        Ok(self.hyperplane()?.coefficient(i))
    }

    /// Returns `true` if `point` is strictly on the owner's side.
    pub fn separates<P: ToCoordinates + ?Sized>(&self, point: &P) -> Result<bool> {
        let coordinates = coordinates_of(self.diagram, point)?;
        Ok(self.hyperplane()?.evaluate(&coordinates))
    }
}

impl<T> Clone for FacetView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FacetView<'_, T> {}

impl<T> fmt::Debug for FacetView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacetView")
            .field("sites", &self.sites())
            .field("owner", &self.owner())
            .field("external", &self.external())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use glam::DVec2;

    use super::*;
    use crate::point::distance_squared;

    fn andalusia() -> (Diagram<&'static str>, Vec<SiteId>) {
        let mut diagram = Diagram::new(2);
        let ids = [
            ("Cordoba", [20.0, 5.0]),
            ("Huelva", [1.0, 1.0]),
            ("Cadiz", [5.0, -13.0]),
            ("Malaga", [20.0, -20.0]),
            ("Sevilla", [10.0, -10.0]),
        ]
        .into_iter()
        .map(|(name, point)| diagram.insert_with_data(&point, name).unwrap())
        .collect();
        (diagram, ids)
    }

    #[test]
    fn test_single_simplex_regions() {
        let mut diagram: Diagram<&str> = Diagram::new(2);
        let cordoba = diagram.insert_with_data(&[20.0, 5.0], "Cordoba").unwrap();
        let huelva = diagram.insert_with_data(&[1.0, 1.0], "Huelva").unwrap();
        let cadiz = diagram.insert_with_data(&[40.0, 1.0], "Cadiz").unwrap();

        assert_eq!(diagram.simplices().count(), 1);
        for region in diagram.regions() {
            assert!(region.is_unbounded());
            assert_eq!(region.neighbours().count(), 2);
            assert_eq!(region.vertices().count(), 3);
            assert_eq!(region.vertices().filter(|v| v.is_infinite()).count(), 2);
        }

        let region = diagram.region(huelva).unwrap();
        assert_eq!(region.data(), Some(&"Huelva"));
        assert!(region.contains(&[4.0, 4.0]).unwrap());
        assert!(!diagram.region(cordoba).unwrap().contains(&[4.0, 4.0]).unwrap());
        assert!(!diagram.region(cadiz).unwrap().contains(&[4.0, 4.0]).unwrap());
        assert_eq!(diagram.locate(&DVec2::new(4.0, 4.0)).unwrap().unwrap().id(), huelva);

        // equidistant from Huelva and Cadiz: in neither region
        let midpoint = [20.5, 1.0];
        assert!(!diagram.region(huelva).unwrap().contains(&midpoint).unwrap());
        assert!(!diagram.region(cadiz).unwrap().contains(&midpoint).unwrap());

        assert!(matches!(
            region.contains(&[1.0, 2.0, 3.0]),
            Err(DiagramError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_cities() {
        let (diagram, ids) = andalusia();
        assert_eq!(diagram.regions().count(), 5);
        assert_eq!(diagram.simplices().count(), 4);
        assert_eq!(diagram.infinite_simplices().count(), 4);
        diagram.validate().unwrap();

        let sevilla = diagram.region(ids[4]).unwrap();
        assert_eq!(sevilla.data(), Some(&"Sevilla"));
        assert!(!sevilla.is_unbounded());
        assert_eq!(sevilla.neighbours().count(), 4);
        assert!(sevilla.vertices().all(|v| !v.is_infinite()));
        assert!(ids[..4]
            .iter()
            .all(|&id| diagram.region(id).unwrap().is_unbounded()));

        // every point of the plane sampled on a grid falls in the region of its nearest site
        for x in -10..=50 {
            for y in -30..=15 {
                let point = [x as f64 + 0.37, y as f64 + 0.21];
                let region = diagram.locate(&point).unwrap().unwrap();
                let nearest = diagram
                    .sites()
                    .min_by(|(_, a), (_, b)| {
                        distance_squared(a.coordinates(), &point)
                            .total_cmp(&distance_squared(b.coordinates(), &point))
                    })
                    .map(|(id, _)| id)
                    .unwrap();
                assert_eq!(region.id(), nearest);
                assert!(region.contains(&point).unwrap());
            }
        }
    }

    #[test]
    fn test_region_facets() {
        let (diagram, ids) = andalusia();
        let sevilla = diagram.region(ids[4]).unwrap();

        for facet in sevilla.facets() {
            assert_eq!(facet.owner(), ids[4]);
            let neighbour = diagram.site(facet.external()).unwrap();
            assert!(facet.separates(sevilla.coordinates()).unwrap());
            assert!(!facet.separates(neighbour.coordinates()).unwrap());
            assert_eq!(facet.hyperplane().dimensionality(), 2);
            assert!(!facet.hyperplane().is_inverted());
        }
    }

    #[test]
    fn test_vertices_and_facets() {
        let (diagram, _) = andalusia();

        for vertex in diagram.vertices() {
            if vertex.is_infinite() {
                assert_eq!(vertex.sites().len(), 2);
                assert_eq!(vertex.neighbours().count(), 1);
                assert!(vertex.coordinates().is_none());
                assert_relative_eq!(
                    vertex.direction().unwrap().iter().map(|c| c * c).sum::<f64>(),
                    1.0,
                    epsilon = 1e-12
                );
                continue;
            }

            assert_eq!(vertex.sites().len(), 3);
            assert_eq!(vertex.neighbours().count(), 3);
            let center = vertex.coordinates().unwrap();
            let radius = vertex.radius().unwrap();
            for &site in vertex.sites() {
                let d = distance_squared(diagram.site(site).unwrap().coordinates(), center).sqrt();
                assert_relative_eq!(d, radius, max_relative = 1e-9);
            }

            let simplex = vertex.simplex();
            for facet in simplex.facets() {
                assert_eq!(facet.owner(), vertex.key());
                let plane = facet.hyperplane().unwrap();
                let other = diagram.vertex(facet.external().unwrap()).unwrap();

                if facet.is_hull_boundary().unwrap() {
                    assert!(other.is_infinite());
                    // the ray leaves the hull: the side of the owner points inwards
                    let inward: Vec<f64> = center
                        .iter()
                        .zip(other.direction().unwrap())
                        .map(|(c, n)| c - n)
                        .collect();
                    assert!(facet.separates(&inward).unwrap());
                } else {
                    assert!(plane.evaluate(center));
                    assert!(!plane.evaluate(other.coordinates().unwrap()));
                }
            }
        }

        let hull_facets = diagram
            .simplices()
            .flat_map(|s| s.facets().collect::<Vec<_>>())
            .filter(|f| f.is_hull_boundary().unwrap())
            .count();
        assert_eq!(hull_facets, diagram.infinite_simplices().count());
    }

    #[test]
    fn test_simplex_views() {
        let (diagram, ids) = andalusia();

        for simplex in diagram.simplices() {
            assert_eq!(simplex.rank(), 2);
            assert!(simplex.circumcenter().is_some());
            // every vertex of a finite simplex is on its circumsphere
            for &site in simplex.sites() {
                let point = diagram.site(site).unwrap().coordinates();
                assert!(simplex.circumsphere_contains(point).unwrap());
            }
            // one hull edge and two spokes around Sevilla
            assert_eq!(simplex.neighbour_simplices().count(), 2);
            assert!(simplex.neighbour_simplices().all(|s| !s.is_infinite()));
            assert_eq!(diagram.vertex(simplex.key()).unwrap().neighbours().count(), 3);
        }

        for ghost in diagram.infinite_simplices() {
            assert!(ghost.circumcenter().is_none());
            assert!(ghost.circumradius().is_none());
            assert!(!ghost.sites().contains(&ids[4]));
            assert!(!ghost
                .circumsphere_contains(diagram.site(ids[4]).unwrap().coordinates())
                .unwrap());
            assert_eq!(ghost.neighbour_simplices().count(), 0);
            assert_eq!(diagram.vertex(ghost.key()).unwrap().neighbours().count(), 1);
        }

        let any = diagram.simplices().next().unwrap();
        assert!(any.circumsphere_contains(&[1.0]).is_err());
    }

    #[test]
    fn test_segment_rays() {
        let mut diagram: Diagram = Diagram::new(3);
        diagram.insert(&[0.0, 0.0, 0.0]).unwrap();
        diagram.insert(&[2.0, 0.0, 0.0]).unwrap();

        let segment = diagram.simplices().next().unwrap();
        assert_eq!(segment.circumcenter().unwrap(), &[1.0, 0.0, 0.0]);

        for facet in segment.facets() {
            let ghost = diagram.vertex(facet.external().unwrap()).unwrap();
            let direction = ghost.direction().unwrap();
            let site = diagram.site(facet.sites()[0]).unwrap().coordinates();
            // the ray points from the midpoint towards the hull site
            assert_relative_eq!(direction[0], site[0] - 1.0, epsilon = 1e-12);
            assert!(facet.is_hull_boundary().unwrap());
        }

        let region = diagram.locate(&[1.5, 10.0, -3.0]).unwrap().unwrap();
        assert_eq!(region.coordinates(), &[2.0, 0.0, 0.0]);
        assert!(region.is_unbounded());
    }
}
