/// Numeric settings of a [`crate::Diagram`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagramConfig {
    /// Relative tolerance used for rank detection, coincident sites and
    /// sphere/hyperplane boundary bands.
    pub tolerance: f64,
    /// Check every new simplex against all sites of the diagram instead of
    /// only the sites of the rebuilt cavity.
    pub verify_global_emptiness: bool,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            verify_global_emptiness: false,
        }
    }
}

impl DiagramConfig {
    /// Tight tolerance, every insertion is checked against the whole diagram.
    pub fn strict() -> Self {
        Self {
            tolerance: 1e-12,
            verify_global_emptiness: true,
        }
    }

    /// Loose tolerance for noisy input.
    pub fn relaxed() -> Self {
        Self {
            tolerance: 1e-8,
            verify_global_emptiness: false,
        }
    }
}
