//! geoprep geo - coordinate reprojection of GeoJSON documents
//!
//! The coordinate walker rewrites `coordinates` values of any nesting depth,
//! the projector seam connects it to PROJ, and the feature driver applies it
//! across whole documents.

pub mod coordinates;
pub mod features;
pub mod projection;

pub use coordinates::CoordinateNode;
pub use features::{
    reproject, reproject_collection_parallel, reproject_document, reproject_with_progress,
    ReprojectOptions, ReprojectSummary,
};
pub use projection::{crs_match, FnProjector, Identity, ProjProjector, ProjectionError, Projector};
