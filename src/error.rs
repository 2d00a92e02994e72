use thiserror::Error;

/// Errors produced while building or querying a [`crate::Diagram`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagramError {
    /// A supplied point does not have the diagram's dimensionality.
    #[error("point has {actual} coordinates, the diagram is {expected}-dimensional")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A facet was queried before both of its sides were linked.
    #[error("facet is not initialized, its external side is unset")]
    FacetNotInitialized,

    /// The geometry cannot be resolved numerically (singular system, coincident sites, ...).
    #[error("degenerate configuration: {reason}")]
    DegenerateConfiguration { reason: String },

    /// The rebuild produced a complex that cannot be stitched together.
    #[error("unsupported topology: {reason}")]
    UnsupportedTopology { reason: String },

    /// [`crate::Diagram::validate`] found a broken invariant.
    #[error("invalid triangulation: {reason}")]
    InvalidTriangulation { reason: String },
}

impl DiagramError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateConfiguration {
            reason: reason.into(),
        }
    }

    pub(crate) fn topology(reason: impl Into<String>) -> Self {
        Self::UnsupportedTopology {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidTriangulation {
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = DiagramError> = std::result::Result<T, E>;
