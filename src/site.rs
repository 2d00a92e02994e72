use std::sync::OnceLock;

use crate::constraint::HyperPlaneConstraint;
use crate::simplex::SimplexKey;

/// Handle of a site. Sites are never removed, so ids stay valid for the lifetime of the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(pub(crate) usize);

impl SiteId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A bisector between a site and one of its neighbours, the site being on the matching side.
#[derive(Debug, Clone)]
pub(crate) struct RegionBoundary {
    pub(crate) neighbour: SiteId,
    pub(crate) plane: HyperPlaneConstraint,
}

/// An inserted point with its payload and the simplices it belongs to.
#[derive(Debug, Clone)]
pub struct Site<T> {
    coordinates: Vec<f64>,
    data: Option<T>,
    incident: Vec<SimplexKey>,
    boundaries: OnceLock<Vec<RegionBoundary>>,
}

impl<T> Site<T> {
    pub(crate) fn new(coordinates: Vec<f64>, data: Option<T>) -> Self {
        Self {
            coordinates,
            data,
            incident: Vec::new(),
            boundaries: OnceLock::new(),
        }
    }

    pub fn coordinates(&self) -> &[f64] {
        &self.coordinates
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Simplices (finite and infinite) having this site as a member.
    pub fn incident_simplices(&self) -> &[SimplexKey] {
        &self.incident
    }

    pub(crate) fn add_incident(&mut self, simplex: SimplexKey) {
        if !self.incident.contains(&simplex) {
            self.incident.push(simplex);
            self.boundaries = OnceLock::new();
        }
    }

    pub(crate) fn remove_incident(&mut self, simplex: SimplexKey) {
        let before = self.incident.len();
        self.incident.retain(|&k| k != simplex);
        if self.incident.len() != before {
            self.boundaries = OnceLock::new();
        }
    }

    pub(crate) fn boundaries_cell(&self) -> &OnceLock<Vec<RegionBoundary>> {
        &self.boundaries
    }
}
