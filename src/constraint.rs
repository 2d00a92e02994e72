use crate::error::Result;
use crate::linalg;
use crate::point::{distance_squared, dot};

/// A half-space `sum(c_i * x_i) > c_{D+1}`, stored as `D + 1` coefficients.
///
/// Points on the hyperplane itself belong to neither side.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperPlaneConstraint {
    coefficients: Vec<f64>,
    inverted: bool,
}

impl HyperPlaneConstraint {
    /// Build from `D + 1` coefficients, the last one being the independent term.
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self {
            coefficients,
            inverted: false,
        }
    }

    /// The perpendicular bisector of `owner` and `external`, `owner` being on the matching side.
    pub fn bisector(owner: &[f64], external: &[f64]) -> Self {
        let mut coefficients: Vec<f64> = owner.iter().zip(external).map(|(o, e)| o - e).collect();
        let independent = owner
            .iter()
            .zip(external)
            .zip(&coefficients)
            .map(|((o, e), c)| c * (o + e) / 2.0)
            .sum();
        coefficients.push(independent);
        Self::new(coefficients)
    }

    /// The hyperplane through `point` whose matching side is the one `normal` points to.
    pub fn through(point: &[f64], normal: &[f64]) -> Self {
        let mut coefficients = normal.to_vec();
        coefficients.push(dot(normal, point));
        Self::new(coefficients)
    }

    pub fn dimensionality(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Coefficient `i`, `i == dimensionality()` being the independent term.
    /// Inversion flips the sign of every coefficient.
    pub fn coefficient(&self, i: usize) -> f64 {
        if self.inverted {
            -self.coefficients[i]
        } else {
            self.coefficients[i]
        }
    }

    /// Signed value of `point` against the hyperplane, positive on the matching side.
    pub fn value(&self, point: &[f64]) -> f64 {
        let d = self.dimensionality();
        let value = dot(&self.coefficients[..d], point) - self.coefficients[d];
        if self.inverted {
            -value
        } else {
            value
        }
    }

    /// Returns `true` if `point` lies strictly on the matching side.
    pub fn evaluate(&self, point: &[f64]) -> bool {
        self.value(point) > 0.0
    }

    pub fn invert(&mut self) {
        self.inverted = !self.inverted;
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }
}

// =============================================================================

/// Where a point lies relative to a sphere, with a tolerance band around the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SphereSide {
    Inside,
    On,
    Outside,
}

/// A hypersphere given by center and radius.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperSphereConstraint {
    center: Vec<f64>,
    radius: f64,
}

impl HyperSphereConstraint {
    pub fn new(center: Vec<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    /// The sphere of infinite radius used by the single-site bootstrap cell.
    pub fn unbounded(center: Vec<f64>) -> Self {
        Self::new(center, f64::INFINITY)
    }

    /// Circumsphere of an affinely independent set of sites.
    pub fn calculate(sites: &[&[f64]], tolerance: f64) -> Result<Self> {
        let center = linalg::circumcenter(sites, tolerance)?;
        let radius = distance_squared(&center, sites[0]).sqrt();
        Ok(Self::new(center, radius))
    }

    pub fn center(&self) -> &[f64] {
        &self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn is_unbounded(&self) -> bool {
        self.radius.is_infinite()
    }

    /// Closed containment test: points on the sphere are contained.
    pub fn contains(&self, point: &[f64]) -> bool {
        self.is_unbounded() || distance_squared(point, &self.center) <= self.radius * self.radius
    }

    /// Classify `point`, treating a relative band of `tolerance` around the surface as on it.
    pub fn classify(&self, point: &[f64], tolerance: f64) -> SphereSide {
        if self.is_unbounded() {
            return SphereSide::Inside;
        }

        let r2 = self.radius * self.radius;
        let d2 = distance_squared(point, &self.center);
        let band = tolerance * r2.max(d2).max(f64::MIN_POSITIVE);

        if d2 < r2 - band {
            SphereSide::Inside
        } else if d2 > r2 + band {
            SphereSide::Outside
        } else {
            SphereSide::On
        }
    }
}

// =============================================================================
