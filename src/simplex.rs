use itertools::Itertools;
use slotmap::new_key_type;

use crate::constraint::{HyperPlaneConstraint, HyperSphereConstraint, SphereSide};
use crate::error::Result;
use crate::facet::{Facet, VertexGeometry};
use crate::linalg;
use crate::point::distance_squared;
use crate::site::SiteId;

new_key_type! {
    /// Key of a simplex in the diagram's simplex arena.
    pub struct SimplexKey;
}

// =============================================================================

/// The half-space beyond a convex hull facet, seen from inside the current affine hull.
#[derive(Debug, Clone)]
pub(crate) struct HullBoundary {
    normal: Vec<f64>,
    plane: HyperPlaneConstraint,
    rim: HyperSphereConstraint,
}

impl HullBoundary {
    /// `facet` spans the hull facet, `opposite` is the remaining site of the finite simplex behind it.
    pub(crate) fn new(facet: &[&[f64]], opposite: &[f64], tolerance: f64) -> Result<Self> {
        let normal = linalg::hull_normal(facet, opposite, tolerance)?;
        let rim = HyperSphereConstraint::calculate(facet, tolerance)?;
        let plane = HyperPlaneConstraint::through(rim.center(), &normal);
        Ok(Self { normal, plane, rim })
    }

    pub(crate) fn normal(&self) -> &[f64] {
        &self.normal
    }

    /// A point strictly beyond the facet hyperplane is contained. A point on the
    /// hyperplane is contained when it falls inside the facet's own circumsphere.
    pub(crate) fn contains(&self, point: &[f64], tolerance: f64) -> bool {
        let distance = self.plane.value(point);
        let scale = self
            .rim
            .radius()
            .max(distance_squared(point, self.rim.center()).sqrt())
            .max(1.0);
        let band = tolerance * scale;

        if distance > band {
            true
        } else if distance < -band {
            false
        } else {
            self.rim.classify(point, tolerance) != SphereSide::Outside
        }
    }
}

/// Finite simplices span `rank + 1` sites; infinite ones span a hull facet of `rank` sites.
#[derive(Debug, Clone)]
pub(crate) enum SimplexKind {
    Finite(HyperSphereConstraint),
    Infinite(HullBoundary),
}

/// Sites of each facet slot, in slot order.
pub(crate) fn facet_sites(rank: usize, sites: &[SiteId], infinite: bool) -> Vec<Vec<SiteId>> {
    if infinite {
        vec![sites.to_vec()]
    } else if rank == 0 {
        Vec::new()
    } else {
        sites.iter().copied().combinations(rank).collect()
    }
}

// =============================================================================

/// A cell of the Delaunay triangulation, or the unbounded companion of a hull facet.
#[derive(Debug, Clone)]
pub(crate) struct Simplex {
    rank: usize,
    sites: Vec<SiteId>,
    facets: Vec<Facet>,
    kind: SimplexKind,
}

impl Simplex {
    /// Build a simplex with its facet slots. Site order is kept as given (sorted by the diagram).
    ///
    /// A finite simplex gets one facet per `rank`-subset of its sites, the rank 0
    /// bootstrap cell gets none. An infinite simplex gets a single facet spanning all
    /// its sites, facing its bounded neighbour.
    pub(crate) fn new(key: SimplexKey, rank: usize, sites: Vec<SiteId>, kind: SimplexKind) -> Self {
        let infinite = matches!(kind, SimplexKind::Infinite(_));
        debug_assert_eq!(sites.len(), if infinite { rank } else { rank + 1 });
        let facets = facet_sites(rank, &sites, infinite)
            .into_iter()
            .map(|subset| Facet::new(key, subset))
            .collect();

        Self {
            rank,
            sites,
            facets,
            kind,
        }
    }

    pub(crate) fn rank(&self) -> usize {
        self.rank
    }

    pub(crate) fn sites(&self) -> &[SiteId] {
        &self.sites
    }

    pub(crate) fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub(crate) fn is_infinite(&self) -> bool {
        matches!(self.kind, SimplexKind::Infinite(_))
    }

    pub(crate) fn circumsphere(&self) -> Option<&HyperSphereConstraint> {
        match &self.kind {
            SimplexKind::Finite(sphere) => Some(sphere),
            SimplexKind::Infinite(_) => None,
        }
    }

    pub(crate) fn hull(&self) -> Option<&HullBoundary> {
        match &self.kind {
            SimplexKind::Finite(_) => None,
            SimplexKind::Infinite(hull) => Some(hull),
        }
    }

    pub(crate) fn vertex_geometry(&self) -> VertexGeometry<'_> {
        match &self.kind {
            SimplexKind::Finite(sphere) => VertexGeometry::Finite {
                center: sphere.center(),
            },
            SimplexKind::Infinite(hull) => VertexGeometry::Infinite {
                normal: hull.normal(),
            },
        }
    }

    pub(crate) fn contains_site(&self, site: SiteId) -> bool {
        self.sites.contains(&site)
    }

    /// Closed circumsphere test. An infinite simplex contains the points beyond its hull facet.
    pub(crate) fn circumsphere_contains(&self, point: &[f64], tolerance: f64) -> bool {
        match &self.kind {
            SimplexKind::Finite(sphere) => sphere.classify(point, tolerance) != SphereSide::Outside,
            SimplexKind::Infinite(hull) => hull.contains(point, tolerance),
        }
    }

    /// Index of the facet whose sites all belong to `other`, if any.
    pub(crate) fn facet_shared_with(&self, other: &[SiteId]) -> Option<usize> {
        if self.rank == 0 {
            return None;
        }
        self.facets
            .iter()
            .position(|f| f.sites().iter().all(|s| other.contains(s)))
    }

    pub(crate) fn facet_with_sites(&self, sites: &[SiteId]) -> Option<usize> {
        self.facets.iter().position(|f| f.sites() == sites)
    }

    /// Point facet slot `index` at `other`. Only this side is updated.
    pub(crate) fn update_facet(&mut self, index: usize, other: SimplexKey) {
        if let Some(facet) = self.facets.get_mut(index) {
            facet.set_external(Some(other));
        }
    }

    /// Clear every facet pointing at `other`. Only this side is updated.
    pub(crate) fn remove_facet(&mut self, other: SimplexKey) -> bool {
        let mut removed = false;
        for facet in self.facets.iter_mut().filter(|f| f.external() == Some(other)) {
            facet.set_external(None);
            removed = true;
        }
        removed
    }

    /// Release every facet slot of a discarded simplex.
    pub(crate) fn dispose(&mut self) {
        self.facets.clear();
    }
}

#[cfg(test)]
mod test {
    use slotmap::SlotMap;

    use super::*;

    fn sites(ids: &[usize]) -> Vec<SiteId> {
        ids.iter().map(|&i| SiteId(i)).collect()
    }

    #[test]
    fn test_finite_facets() {
        let mut arena: SlotMap<SimplexKey, Simplex> = SlotMap::with_key();
        let sphere = HyperSphereConstraint::new(vec![0.0, 0.0, 0.0], 1.0);
        let key = arena.insert_with_key(|k| {
            Simplex::new(k, 3, sites(&[0, 1, 2, 3]), SimplexKind::Finite(sphere))
        });

        let simplex = &arena[key];
        assert_eq!(simplex.facets().len(), 4);
        assert!(simplex.facets().iter().all(|f| f.sites().len() == 3));
        assert!(simplex.facets().iter().all(|f| f.owner() == key));
        assert!(!simplex.is_infinite());
        assert_eq!(simplex.facet_with_sites(&sites(&[0, 2, 3])), Some(2));

        let expected = facet_sites(3, simplex.sites(), false);
        assert!(simplex
            .facets()
            .iter()
            .zip(&expected)
            .all(|(facet, subset)| facet.sites() == &subset[..]));
    }

    #[test]
    fn test_bootstrap_has_no_facets() {
        let mut arena: SlotMap<SimplexKey, Simplex> = SlotMap::with_key();
        let sphere = HyperSphereConstraint::unbounded(vec![1.0, 2.0]);
        let key = arena
            .insert_with_key(|k| Simplex::new(k, 0, sites(&[0]), SimplexKind::Finite(sphere)));

        let simplex = &arena[key];
        assert!(simplex.facets().is_empty());
        assert!(simplex.circumsphere_contains(&[1e9, -1e9], 1e-10));
        assert_eq!(simplex.facet_shared_with(&sites(&[0, 1])), None);
    }

    #[test]
    fn test_infinite_simplex() {
        let facet: [&[f64]; 2] = [&[0.0, 0.0], &[2.0, 0.0]];
        let hull = HullBoundary::new(&facet, &[1.0, 1.0], 1e-10).unwrap();

        let mut arena: SlotMap<SimplexKey, Simplex> = SlotMap::with_key();
        let key = arena
            .insert_with_key(|k| Simplex::new(k, 2, sites(&[0, 1]), SimplexKind::Infinite(hull)));
        let simplex = &arena[key];

        assert!(simplex.is_infinite());
        assert_eq!(simplex.facets().len(), 1);
        assert_eq!(simplex.facets()[0].sites(), &sites(&[0, 1])[..]);

        // strictly beyond the hull edge
        assert!(simplex.circumsphere_contains(&[5.0, -0.1], 1e-10));
        // inside the hull
        assert!(!simplex.circumsphere_contains(&[1.0, 0.5], 1e-10));
        // on the hull line: inside the edge's diametral sphere only
        assert!(simplex.circumsphere_contains(&[1.0, 0.0], 1e-10));
        assert!(!simplex.circumsphere_contains(&[3.0, 0.0], 1e-10));
    }

    #[test]
    fn test_update_and_remove_facet() {
        let mut arena: SlotMap<SimplexKey, Simplex> = SlotMap::with_key();
        let a = arena.insert_with_key(|k| {
            Simplex::new(
                k,
                2,
                sites(&[0, 1, 2]),
                SimplexKind::Finite(HyperSphereConstraint::new(vec![0.0, 0.0], 1.0)),
            )
        });
        let b = arena.insert_with_key(|k| {
            Simplex::new(
                k,
                2,
                sites(&[1, 2, 3]),
                SimplexKind::Finite(HyperSphereConstraint::new(vec![1.0, 0.0], 1.0)),
            )
        });

        let index = arena[a].facet_shared_with(&sites(&[1, 2, 3])).unwrap();
        assert_eq!(arena[a].facet_with_sites(&sites(&[1, 2])), Some(index));
        assert_eq!(arena[a].facet_shared_with(&sites(&[3, 4, 5])), None);

        arena[a].update_facet(index, b);
        assert_eq!(arena[a].facets()[index].external(), Some(b));
        assert_eq!(
            arena[a].facets().iter().filter(|f| f.is_initialized()).count(),
            1
        );

        assert!(arena[a].remove_facet(b));
        assert!(!arena[a].remove_facet(b));
        assert!(arena[a].facets().iter().all(|f| !f.is_initialized()));

        arena[a].dispose();
        assert!(arena[a].facets().is_empty());
    }
}
