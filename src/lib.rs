//! Incremental Delaunay triangulation and Voronoi diagram in any number of dimensions.
//!
//! Sites are inserted one at a time with the Bowyer-Watson method. While the sites do
//! not span the whole space, the triangulation lives in their affine hull and grows a
//! rank each time a site leaves it. Every convex hull facet carries an infinite
//! companion simplex, so unbounded Voronoi regions are handled like bounded ones.
//!
//! ```
//! use ndvoronoi::Diagram;
//!
//! let mut diagram: Diagram<&str> = Diagram::new(2);
//! diagram.insert_with_data(&[20.0, 5.0], "Cordoba").unwrap();
//! let huelva = diagram.insert_with_data(&[1.0, 1.0], "Huelva").unwrap();
//! diagram.insert_with_data(&[40.0, 1.0], "Cadiz").unwrap();
//!
//! let region = diagram.locate(&[4.0, 4.0]).unwrap().unwrap();
//! assert_eq!(region.id(), huelva);
//! assert_eq!(region.data(), Some(&"Huelva"));
//! ```

mod config;
mod constraint;
mod diagram;
mod error;
mod facet;
pub mod linalg;
mod point;
mod simplex;
mod site;
mod voronoi;

pub use config::DiagramConfig;
pub use constraint::{HyperPlaneConstraint, HyperSphereConstraint, SphereSide};
pub use diagram::{Diagram, DiagramStatistics};
pub use error::{DiagramError, Result};
pub use point::ToCoordinates;
pub use simplex::SimplexKey;
pub use site::{Site, SiteId};
pub use voronoi::{FacetView, Region, RegionFacet, SimplexView, VoronoiVertex};
