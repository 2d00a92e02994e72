use glam::{DVec2, DVec3, DVec4};

/// Anything that can be read as a coordinate vector.
pub trait ToCoordinates {
    fn to_coordinates(&self) -> Vec<f64>;
}

impl ToCoordinates for [f64] {
    fn to_coordinates(&self) -> Vec<f64> {
        self.to_vec()
    }
}

impl<const N: usize> ToCoordinates for [f64; N] {
    fn to_coordinates(&self) -> Vec<f64> {
        self.to_vec()
    }
}

impl ToCoordinates for Vec<f64> {
    fn to_coordinates(&self) -> Vec<f64> {
        self.clone()
    }
}

impl<P: ToCoordinates + ?Sized> ToCoordinates for &P {
    fn to_coordinates(&self) -> Vec<f64> {
        (**self).to_coordinates()
    }
}

impl ToCoordinates for DVec2 {
    fn to_coordinates(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }
}

impl ToCoordinates for DVec3 {
    fn to_coordinates(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }
}

impl ToCoordinates for DVec4 {
    fn to_coordinates(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }
}

// =============================================================================

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn distance_squared(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub(crate) fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}
