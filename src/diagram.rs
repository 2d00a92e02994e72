//! The incremental Delaunay triangulation and the Voronoi diagram it induces.

use std::collections::{HashMap, HashSet, VecDeque};

use itertools::Itertools;
use slotmap::SlotMap;
use tracing::{debug, trace, warn};

use crate::config::DiagramConfig;
use crate::constraint::{HyperPlaneConstraint, HyperSphereConstraint, SphereSide};
use crate::error::{DiagramError, Result};
use crate::linalg;
use crate::point::{distance_squared, norm, ToCoordinates};
use crate::simplex::{facet_sites, HullBoundary, Simplex, SimplexKey, SimplexKind};
use crate::site::{RegionBoundary, Site, SiteId};
use crate::voronoi::{Region, SimplexView, VoronoiVertex};

/// How an insertion changed the triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertionState {
    /// The first site, held by a single rank 0 cell.
    Bootstrap,
    /// The site left the affine hull of the previous sites: every cell is lifted by one rank.
    RankGrowth,
    /// The site landed inside the convex hull.
    Standard,
    /// The site landed outside (or on) the convex hull, replacing some infinite simplices.
    HullExtension,
}

/// Counts describing the current state of a [`Diagram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagramStatistics {
    pub sites: usize,
    pub rank: usize,
    pub finite_simplices: usize,
    pub infinite_simplices: usize,
    pub hull_sites: usize,
}

// =============================================================================

/// A Delaunay triangulation of points in `D` dimensions, built one site at a time,
/// along with its dual Voronoi diagram.
///
/// Until the sites span the whole space the triangulation lives in their affine
/// hull, with `rank() < dimensionality()`.
#[derive(Debug)]
pub struct Diagram<T = ()> {
    dimensionality: usize,
    rank: usize,
    config: DiagramConfig,
    sites: Vec<Site<T>>,
    simplices: SlotMap<SimplexKey, Simplex>,
}

impl<T> Diagram<T> {
    pub fn new(dimensionality: usize) -> Self {
        Self::with_config(dimensionality, DiagramConfig::default())
    }

    pub fn with_config(dimensionality: usize, config: DiagramConfig) -> Self {
        Self {
            dimensionality,
            rank: 0,
            config,
            sites: Vec::new(),
            simplices: SlotMap::with_key(),
        }
    }

    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    /// Dimension of the affine hull of the inserted sites.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    /// Number of sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    // =========================================================================

    /// Insert a point, returning the id of its site.
    ///
    /// On error the diagram is left exactly as it was.
    pub fn insert<P: ToCoordinates + ?Sized>(&mut self, point: &P) -> Result<SiteId> {
        self.insert_site(point.to_coordinates(), None)
    }

    /// Insert a point carrying a payload.
    pub fn insert_with_data<P: ToCoordinates + ?Sized>(&mut self, point: &P, data: T) -> Result<SiteId> {
        self.insert_site(point.to_coordinates(), Some(data))
    }

    /// Insert points in order, stopping at the first failure. Sites inserted
    /// before the failure are kept.
    pub fn extend_points<I>(&mut self, points: I) -> Result<Vec<SiteId>>
    where
        I: IntoIterator,
        I::Item: ToCoordinates,
    {
        points.into_iter().map(|p| self.insert(&p)).collect()
    }

    /// The region containing `point`, i.e. the region of its nearest site.
    ///
    /// Returns `None` on an empty diagram.
    pub fn locate<P: ToCoordinates + ?Sized>(&self, point: &P) -> Result<Option<Region<'_, T>>> {
        let coordinates = point.to_coordinates();
        self.check_point(&coordinates)?;
        Ok(self
            .nearest_site(&coordinates)
            .map(|id| Region::new(self, id)))
    }

    // =========================================================================

    pub fn site(&self, id: SiteId) -> Option<&Site<T>> {
        self.sites.get(id.0)
    }

    pub fn sites(&self) -> impl Iterator<Item = (SiteId, &Site<T>)> + '_ {
        self.sites.iter().enumerate().map(|(i, s)| (SiteId(i), s))
    }

    pub fn region(&self, id: SiteId) -> Option<Region<'_, T>> {
        self.site(id).map(|_| Region::new(self, id))
    }

    /// Every Voronoi region, in insertion order.
    pub fn regions(&self) -> impl Iterator<Item = Region<'_, T>> + '_ {
        (0..self.sites.len()).map(|i| Region::new(self, SiteId(i)))
    }

    /// The finite simplices of the Delaunay triangulation.
    pub fn simplices(&self) -> impl Iterator<Item = SimplexView<'_, T>> + '_ {
        self.simplices
            .iter()
            .filter(|(_, s)| !s.is_infinite())
            .map(|(k, s)| SimplexView::new(self, k, s))
    }

    /// The infinite companions of the convex hull facets.
    pub fn infinite_simplices(&self) -> impl Iterator<Item = SimplexView<'_, T>> + '_ {
        self.simplices
            .iter()
            .filter(|(_, s)| s.is_infinite())
            .map(|(k, s)| SimplexView::new(self, k, s))
    }

    /// Every Voronoi vertex, the infinite ones included.
    pub fn vertices(&self) -> impl Iterator<Item = VoronoiVertex<'_, T>> + '_ {
        self.simplices
            .iter()
            .map(|(k, s)| VoronoiVertex::new(self, k, s))
    }

    pub fn vertex(&self, key: SimplexKey) -> Option<VoronoiVertex<'_, T>> {
        self.simplices
            .get(key)
            .map(|s| VoronoiVertex::new(self, key, s))
    }

    pub fn statistics(&self) -> DiagramStatistics {
        let infinite_simplices = self.simplices.values().filter(|s| s.is_infinite()).count();
        let hull_sites = (0..self.sites.len())
            .filter(|&i| self.is_hull_site(SiteId(i)))
            .count();

        DiagramStatistics {
            sites: self.sites.len(),
            rank: self.rank,
            finite_simplices: self.simplices.len() - infinite_simplices,
            infinite_simplices,
            hull_sites,
        }
    }

    // =========================================================================

    pub(crate) fn simplex(&self, key: SimplexKey) -> Option<&Simplex> {
        self.simplices.get(key)
    }

    pub(crate) fn site_at(&self, id: SiteId) -> &Site<T> {
        &self.sites[id.0]
    }

    pub(crate) fn coordinates(&self, id: SiteId) -> &[f64] {
        self.sites[id.0].coordinates()
    }

    /// Sites sharing a simplex with `id`, sorted. These are the sites whose regions
    /// border the region of `id`; empty for an unknown id.
    pub fn neighbour_sites(&self, id: SiteId) -> Vec<SiteId> {
        self.incident(id)
            .filter_map(|&k| self.simplices.get(k))
            .flat_map(|s| s.sites().iter().copied())
            .filter(|&s| s != id)
            .sorted()
            .dedup()
            .collect()
    }

    /// The bisectors bounding the region of `id`, derived on first use.
    pub(crate) fn region_boundaries(&self, id: SiteId) -> &[RegionBoundary] {
        self.sites[id.0].boundaries_cell().get_or_init(|| {
            let own = self.coordinates(id);
            self.neighbour_sites(id)
                .into_iter()
                .map(|neighbour| RegionBoundary {
                    neighbour,
                    plane: HyperPlaneConstraint::bisector(own, self.coordinates(neighbour)),
                })
                .collect()
        })
    }

    /// A site is on the hull while the sites do not span the space, or when an infinite simplex holds it.
    /// Exactly the sites with unbounded regions.
    pub fn is_hull_site(&self, id: SiteId) -> bool {
        id.0 < self.sites.len()
            && (self.rank < self.dimensionality
                || self
                    .incident(id)
                    .filter_map(|&k| self.simplices.get(k))
                    .any(|s| s.is_infinite()))
    }

    fn incident(&self, id: SiteId) -> std::slice::Iter<'_, SimplexKey> {
        self.sites
            .get(id.0)
            .map_or(&[][..], |s| s.incident_simplices())
            .iter()
    }

    /// Walk the Delaunay graph towards `point`, moving only to strictly closer sites.
    pub(crate) fn nearest_site(&self, point: &[f64]) -> Option<SiteId> {
        if self.sites.is_empty() {
            return None;
        }

        let mut current = SiteId(0);
        for _ in 0..self.sites.len() {
            let closer = self
                .region_boundaries(current)
                .iter()
                .find(|b| b.plane.value(point) < 0.0);

            match closer {
                Some(boundary) => {
                    trace!(from = current.index(), to = boundary.neighbour.index(), "locate step");
                    current = boundary.neighbour;
                }
                None => return Some(current),
            }
        }

        Some(current)
    }

    fn check_point(&self, coordinates: &[f64]) -> Result<()> {
        if coordinates.len() != self.dimensionality {
            return Err(DiagramError::DimensionMismatch {
                expected: self.dimensionality,
                actual: coordinates.len(),
            });
        }
        if coordinates.iter().any(|c| !c.is_finite()) {
            return Err(DiagramError::degenerate("coordinates must be finite"));
        }
        Ok(())
    }

    // =========================================================================

    fn insert_site(&mut self, coordinates: Vec<f64>, data: Option<T>) -> Result<SiteId> {
        self.check_point(&coordinates)?;
        let id = SiteId(self.sites.len());

        let Some(nearest) = self.nearest_site(&coordinates) else {
            let sphere = HyperSphereConstraint::unbounded(coordinates.clone());
            self.sites.push(Site::new(coordinates, data));
            self.attach(0, vec![id], SimplexKind::Finite(sphere));
            debug!(state = ?InsertionState::Bootstrap, site = id.index(), "inserted site");
            return Ok(id);
        };

        let (cavity, created) = self
            .plan_insertion(id, &coordinates, nearest)
            .inspect_err(|e| warn!(site = id.index(), error = %e, "insertion rejected"))?;

        debug!(
            state = ?cavity.state,
            site = id.index(),
            rank = cavity.rank,
            cavity = cavity.affected.len(),
            pool = cavity.pool.len(),
            created = created.len(),
            "inserted site"
        );

        self.sites.push(Site::new(coordinates, data));
        self.commit(cavity, created);
        Ok(id)
    }

    /// Everything an insertion will change, computed without touching the diagram.
    fn plan_insertion(
        &self,
        id: SiteId,
        point: &[f64],
        nearest: SiteId,
    ) -> Result<(Cavity, Vec<PlannedSimplex>)> {
        let tolerance = self.config.tolerance;
        let nearest_point = self.coordinates(nearest);
        let scale = norm(point).max(norm(nearest_point)).max(1.0);
        if distance_squared(point, nearest_point).sqrt() <= tolerance * scale {
            return Err(DiagramError::degenerate(format!(
                "point coincides with site {}",
                nearest.index()
            )));
        }

        let cavity = if self.raises_rank(point) {
            self.find_lifted_cavity()
        } else {
            self.find_cavity(point, nearest)?
        };

        let created = self.create_new_simplices(id, point, &cavity)?;
        Ok((cavity, created))
    }

    fn raises_rank(&self, point: &[f64]) -> bool {
        if self.rank >= self.dimensionality {
            return false;
        }
        let mut points: Vec<&[f64]> = self.sites.iter().map(|s| s.coordinates()).collect();
        points.push(point);
        linalg::rank(&points, self.config.tolerance) > self.rank
    }

    /// A site outside the affine hull conflicts with everything: each finite simplex becomes
    /// the base of a cone towards the new site.
    fn find_lifted_cavity(&self) -> Cavity {
        let frontier = self
            .simplices
            .values()
            .filter(|s| !s.is_infinite())
            .map(|s| (s.sites().to_vec(), None))
            .collect();

        Cavity {
            state: InsertionState::RankGrowth,
            rank: self.rank + 1,
            affected: self.simplices.keys().collect(),
            severed: Vec::new(),
            pool: (0..self.sites.len()).map(SiteId).collect(),
            frontier,
        }
    }

    /// Breadth-first search for the simplices whose circumsphere holds `point`,
    /// seeded from the simplices around the nearest site.
    fn find_cavity(&self, point: &[f64], nearest: SiteId) -> Result<Cavity> {
        let tolerance = self.config.tolerance;
        let conflicts = |key: SimplexKey| {
            self.simplices
                .get(key)
                .is_some_and(|s| s.circumsphere_contains(point, tolerance))
        };

        let mut seeds: Vec<SimplexKey> = self.sites[nearest.0]
            .incident_simplices()
            .iter()
            .copied()
            .filter(|&k| conflicts(k))
            .collect();
        if seeds.is_empty() {
            seeds = self
                .simplices
                .iter()
                .filter(|(_, s)| s.is_infinite())
                .map(|(k, _)| k)
                .filter(|&k| conflicts(k))
                .collect();
        }
        if seeds.is_empty() {
            return Err(DiagramError::topology(
                "no simplex has the point in its circumsphere",
            ));
        }

        let mut visited: HashSet<SimplexKey> = seeds.iter().copied().collect();
        let mut queue: VecDeque<SimplexKey> = seeds.iter().copied().collect();
        let mut affected = Vec::new();
        while let Some(key) = queue.pop_front() {
            affected.push(key);
            for next in self.adjacent_simplices(key) {
                if visited.insert(next) && conflicts(next) {
                    queue.push_back(next);
                }
            }
        }

        let members: HashSet<SimplexKey> = affected.iter().copied().collect();
        let mut frontier = HashMap::new();
        let mut severed = Vec::new();
        for &key in &affected {
            for facet in self.simplices[key].facets() {
                let external = facet.external().ok_or(DiagramError::FacetNotInitialized)?;
                if members.contains(&external) {
                    continue;
                }
                let index = self.simplices[external]
                    .facet_shared_with(self.simplices[key].sites())
                    .ok_or_else(|| DiagramError::topology("neighbour does not share the facet"))?;
                frontier.insert(facet.sites().to_vec(), Some((external, index)));
                severed.push((external, key));
            }
        }

        let state = if affected.iter().any(|&k| self.simplices[k].is_infinite()) {
            InsertionState::HullExtension
        } else {
            InsertionState::Standard
        };

        let pool = affected
            .iter()
            .flat_map(|&k| self.simplices[k].sites().iter().copied())
            .sorted()
            .dedup()
            .collect();

        Ok(Cavity {
            state,
            rank: self.rank,
            affected,
            severed,
            pool,
            frontier,
        })
    }

    /// Simplices across a facet, plus for an infinite simplex the infinite simplices of the
    /// neighbouring hull facets.
    fn adjacent_simplices(&self, key: SimplexKey) -> Vec<SimplexKey> {
        let simplex = &self.simplices[key];
        let mut adjacent: Vec<SimplexKey> = simplex.facets().iter().filter_map(|f| f.external()).collect();

        if simplex.is_infinite() {
            let ridge = self.rank.saturating_sub(1);
            if ridge == 0 {
                adjacent.extend(self.simplices.iter().filter(|(_, s)| s.is_infinite()).map(|(k, _)| k));
            } else {
                for site in simplex.sites() {
                    for &other in self.sites[site.0].incident_simplices() {
                        let Some(candidate) = self.simplices.get(other) else {
                            continue;
                        };
                        let shared = candidate
                            .sites()
                            .iter()
                            .filter(|s| simplex.contains_site(**s))
                            .count();
                        if candidate.is_infinite() && shared >= ridge {
                            adjacent.push(other);
                        }
                    }
                }
            }
        }

        adjacent.retain(|&k| k != key);
        adjacent.sort();
        adjacent.dedup();
        adjacent
    }

    /// Candidate simplices are the `rank`-combinations of the cavity sites completed by the
    /// new site. A candidate is built on a frontier facet and kept when no cavity site is
    /// strictly inside its circumsphere. Facets left open face the hull and get an infinite simplex.
    fn create_new_simplices(
        &self,
        id: SiteId,
        point: &[f64],
        cavity: &Cavity,
    ) -> Result<Vec<PlannedSimplex>> {
        let tolerance = self.config.tolerance;
        let lookup = Lookup {
            diagram: self,
            id,
            point,
        };
        let witnesses: Vec<SiteId> = if self.config.verify_global_emptiness {
            (0..self.sites.len()).map(SiteId).collect()
        } else {
            cavity.pool.clone()
        };

        let mut created = Vec::new();
        for base in cavity.pool.iter().copied().combinations(cavity.rank) {
            if !cavity.frontier.contains_key(&base) {
                continue;
            }

            let mut members = base;
            members.push(id);
            let coordinates: Vec<&[f64]> = members.iter().map(|&s| lookup.get(s)).collect();
            let sphere = HyperSphereConstraint::calculate(&coordinates, tolerance)?;

            let intruder = witnesses
                .iter()
                .copied()
                .filter(|s| !members.contains(s))
                .find(|&s| sphere.classify(lookup.get(s), tolerance) == SphereSide::Inside);
            if let Some(intruder) = intruder {
                trace!(?members, intruder = intruder.index(), "candidate rejected");
                continue;
            }

            let facets = facet_sites(cavity.rank, &members, false);
            created.push(PlannedSimplex {
                links: vec![None; facets.len()],
                facets,
                sites: members,
                kind: SimplexKind::Finite(sphere),
            });
        }

        if created.len() != cavity.frontier.len() {
            return Err(DiagramError::degenerate(format!(
                "{} of {} cavity facets have no empty simplex",
                cavity.frontier.len() - created.len(),
                cavity.frontier.len()
            )));
        }

        self.stitch(id, cavity, &mut created)?;
        self.close_hull(&lookup, cavity.rank, &mut created)?;
        Ok(created)
    }

    /// Pair the facets of the new simplices with each other and with the surviving neighbours.
    fn stitch(&self, id: SiteId, cavity: &Cavity, created: &mut [PlannedSimplex]) -> Result<()> {
        let mut open: HashMap<Vec<SiteId>, (usize, usize)> = HashMap::new();
        let mut paired: HashSet<Vec<SiteId>> = HashSet::new();

        for i in 0..created.len() {
            for j in 0..created[i].facets.len() {
                let facet = created[i].facets[j].clone();
                if !facet.contains(&id) {
                    if let Some(Some((simplex, index))) = cavity.frontier.get(&facet) {
                        created[i].links[j] = Some(Link::Survivor {
                            simplex: *simplex,
                            facet: *index,
                        });
                    }
                    continue;
                }

                if paired.contains(&facet) {
                    return Err(DiagramError::topology(format!(
                        "facet {facet:?} is shared by more than two new simplices"
                    )));
                }
                match open.remove(&facet) {
                    Some((k, l)) => {
                        created[i].links[j] = Some(Link::Created { simplex: k, facet: l });
                        created[k].links[l] = Some(Link::Created { simplex: i, facet: j });
                        paired.insert(facet);
                    }
                    None => {
                        open.insert(facet, (i, j));
                    }
                }
            }
        }

        Ok(())
    }

    /// Give every unlinked facet of the new simplices an infinite companion.
    fn close_hull(&self, lookup: &Lookup<'_, T>, rank: usize, created: &mut Vec<PlannedSimplex>) -> Result<()> {
        let tolerance = self.config.tolerance;
        let finite = created.len();

        for i in 0..finite {
            for j in 0..created[i].links.len() {
                if created[i].links[j].is_some() {
                    continue;
                }

                let facet = created[i].facets[j].clone();
                let opposite = created[i]
                    .sites
                    .iter()
                    .copied()
                    .find(|s| !facet.contains(s))
                    .ok_or_else(|| DiagramError::topology("facet spans its whole simplex"))?;
                let facet_points: Vec<&[f64]> = facet.iter().map(|&s| lookup.get(s)).collect();
                let hull = HullBoundary::new(&facet_points, lookup.get(opposite), tolerance)?;

                let ghost = created.len();
                created.push(PlannedSimplex {
                    facets: facet_sites(rank, &facet, true),
                    sites: facet,
                    kind: SimplexKind::Infinite(hull),
                    links: vec![Some(Link::Created { simplex: i, facet: j })],
                });
                created[i].links[j] = Some(Link::Created {
                    simplex: ghost,
                    facet: 0,
                });
            }
        }

        Ok(())
    }

    /// Apply a plan. Nothing here can fail.
    fn commit(&mut self, cavity: Cavity, created: Vec<PlannedSimplex>) {
        for &(survivor, neighbour) in &cavity.severed {
            if let Some(simplex) = self.simplices.get_mut(survivor) {
                simplex.remove_facet(neighbour);
            }
        }

        for &key in &cavity.affected {
            if let Some(mut simplex) = self.simplices.remove(key) {
                for site in simplex.sites() {
                    self.sites[site.0].remove_incident(key);
                }
                simplex.dispose();
            }
        }

        self.rank = cavity.rank;

        let mut keys = Vec::with_capacity(created.len());
        let mut links = Vec::with_capacity(created.len());
        for planned in created {
            keys.push(self.attach(cavity.rank, planned.sites, planned.kind));
            links.push(planned.links);
        }

        for (i, slots) in links.iter().enumerate() {
            for (j, link) in slots.iter().enumerate() {
                match *link {
                    Some(Link::Created { simplex, facet }) if i < simplex => {
                        self.link((keys[i], j), (keys[simplex], facet));
                    }
                    Some(Link::Survivor { simplex, facet }) => {
                        self.link((keys[i], j), (simplex, facet));
                    }
                    _ => {}
                }
            }
        }
    }

    fn attach(&mut self, rank: usize, sites: Vec<SiteId>, kind: SimplexKind) -> SimplexKey {
        let members = sites.clone();
        let key = self
            .simplices
            .insert_with_key(|k| Simplex::new(k, rank, sites, kind));
        for site in members {
            self.sites[site.0].add_incident(key);
        }
        key
    }

    /// Link facet slots on both sides.
    fn link(&mut self, (a, a_facet): (SimplexKey, usize), (b, b_facet): (SimplexKey, usize)) {
        if let Some(simplex) = self.simplices.get_mut(a) {
            simplex.update_facet(a_facet, b);
        }
        if let Some(simplex) = self.simplices.get_mut(b) {
            simplex.update_facet(b_facet, a);
        }
    }

    // =========================================================================

    /// Check the structural and geometric invariants of the whole diagram.
    pub fn validate(&self) -> Result<()> {
        let tolerance = self.config.tolerance;

        if self.sites.is_empty() {
            return if self.simplices.is_empty() {
                Ok(())
            } else {
                Err(DiagramError::invalid("simplices without sites"))
            };
        }
        if self.rank > self.dimensionality {
            return Err(DiagramError::invalid("rank exceeds dimensionality"));
        }

        for (key, simplex) in &self.simplices {
            if simplex.rank() != self.rank {
                return Err(DiagramError::invalid(format!(
                    "simplex of rank {} in a diagram of rank {}",
                    simplex.rank(),
                    self.rank
                )));
            }

            let (expected_sites, expected_facets) = match (simplex.is_infinite(), self.rank) {
                (true, rank) => (rank, 1),
                (false, 0) => (1, 0),
                (false, rank) => (rank + 1, rank + 1),
            };
            if simplex.sites().len() != expected_sites || simplex.facets().len() != expected_facets {
                return Err(DiagramError::invalid("simplex has the wrong number of sites or facets"));
            }
            if !simplex.sites().windows(2).all(|w| w[0] < w[1]) {
                return Err(DiagramError::invalid("simplex sites are not sorted and unique"));
            }
            if let Some(site) = simplex
                .sites()
                .iter()
                .find(|s| !self.sites[s.0].incident_simplices().contains(&key))
            {
                return Err(DiagramError::invalid(format!(
                    "site {} does not list a simplex holding it",
                    site.index()
                )));
            }

            for facet in simplex.facets() {
                let external_key = facet.external().ok_or(DiagramError::FacetNotInitialized)?;
                let external = self
                    .simplices
                    .get(external_key)
                    .ok_or_else(|| DiagramError::invalid("facet links a removed simplex"))?;

                if simplex.is_infinite() && external.is_infinite() {
                    return Err(DiagramError::invalid("two infinite simplices linked by a facet"));
                }
                if !facet.sites().iter().all(|s| external.contains_site(*s)) {
                    return Err(DiagramError::invalid("linked simplices do not share the facet"));
                }
                let linked_back = external
                    .facet_with_sites(facet.sites())
                    .is_some_and(|i| external.facets()[i].external() == Some(key));
                if !linked_back {
                    return Err(DiagramError::invalid("facet link is not symmetric"));
                }
            }

            if let Some(sphere) = simplex.circumsphere() {
                let intruder = (0..self.sites.len())
                    .map(SiteId)
                    .filter(|s| !simplex.contains_site(*s))
                    .find(|s| sphere.classify(self.coordinates(*s), tolerance) == SphereSide::Inside);
                if let Some(intruder) = intruder {
                    return Err(DiagramError::invalid(format!(
                        "site {} lies inside the circumsphere of {:?}",
                        intruder.index(),
                        simplex.sites()
                    )));
                }
            }
        }

        for (id, site) in self.sites() {
            let holds = site
                .incident_simplices()
                .iter()
                .all(|&k| self.simplices.get(k).is_some_and(|s| s.contains_site(id)));
            if !holds || site.incident_simplices().is_empty() {
                return Err(DiagramError::invalid(format!(
                    "incident simplices of site {} are inconsistent",
                    id.index()
                )));
            }
            if !self.region_boundaries(id).iter().all(|b| b.plane.evaluate(site.coordinates())) {
                return Err(DiagramError::invalid(format!(
                    "site {} is outside its own region",
                    id.index()
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================

/// The conflict region of an insertion.
#[derive(Debug)]
struct Cavity {
    state: InsertionState,
    /// Rank of the triangulation after the insertion.
    rank: usize,
    affected: Vec<SimplexKey>,
    /// `(survivor, removed neighbour)` links cut by the insertion.
    severed: Vec<(SimplexKey, SimplexKey)>,
    /// Sites of the affected simplices.
    pool: Vec<SiteId>,
    /// Boundary facets of the cavity, with the surviving simplex and its facet slot behind each.
    frontier: HashMap<Vec<SiteId>, Option<(SimplexKey, usize)>>,
}

#[derive(Debug)]
struct PlannedSimplex {
    sites: Vec<SiteId>,
    /// Facet sites in slot order, as [`Simplex::new`] lays them out.
    facets: Vec<Vec<SiteId>>,
    kind: SimplexKind,
    links: Vec<Option<Link>>,
}

/// The other side of a planned facet: another planned simplex or a survivor.
#[derive(Debug, Clone, Copy)]
enum Link {
    Created { simplex: usize, facet: usize },
    Survivor { simplex: SimplexKey, facet: usize },
}

/// Site coordinates, including the site being inserted.
struct Lookup<'a, T> {
    diagram: &'a Diagram<T>,
    id: SiteId,
    point: &'a [f64],
}

impl<'a, T> Lookup<'a, T> {
    fn get(&self, site: SiteId) -> &'a [f64] {
        if site == self.id {
            self.point
        } else {
            self.diagram.coordinates(site)
        }
    }
}
