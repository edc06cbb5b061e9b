//! geoprep core - error taxonomy, configuration, CRS model and format I/O
//!
//! This crate holds everything the other geoprep crates share: the error
//! type, the layered configuration, and the readers/writers that turn input
//! files into GeoJSON documents.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;

pub use error::{GeoprepError, Result};
