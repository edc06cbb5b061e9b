//! CRS matching and the point projection seam

use geoprep_core::error::{GeoprepError, Result};
use geoprep_core::models::Crs;
use proj::Proj;
use thiserror::Error;

/// Failure of a single point projection
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ProjectionError(pub String);

/// Maps a planar (x, y) position from the source CRS to the target CRS.
///
/// Implementations must be free of side effects; the coordinate walker may
/// call them in any order.
pub trait Projector {
    fn project(&self, x: f64, y: f64) -> std::result::Result<(f64, f64), ProjectionError>;
}

/// Projector that returns its input
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Projector for Identity {
    fn project(&self, x: f64, y: f64) -> std::result::Result<(f64, f64), ProjectionError> {
        Ok((x, y))
    }
}

/// Projector backed by an infallible closure
pub struct FnProjector<F>(F);

impl<F> FnProjector<F>
where
    F: Fn(f64, f64) -> (f64, f64),
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Projector for FnProjector<F>
where
    F: Fn(f64, f64) -> (f64, f64),
{
    fn project(&self, x: f64, y: f64) -> std::result::Result<(f64, f64), ProjectionError> {
        Ok((self.0)(x, y))
    }
}

/// Projector backed by PROJ, built once per (source, target) pair.
///
/// Axis order is normalised to (x, y) = (easting/longitude, northing/latitude)
/// regardless of what the EPSG definitions declare. A PROJ handle must not be
/// shared between threads; each rayon job builds its own.
pub struct ProjProjector {
    proj: Proj,
}

impl ProjProjector {
    pub fn new(from: &Crs, to: &Crs) -> Result<Self> {
        let from_proj = from.authority();
        let to_proj = to.authority();

        let proj = Proj::new_known_crs(&from_proj, &to_proj, None).map_err(|e| {
            GeoprepError::ConfigInvalid {
                key: "crs".to_string(),
                reason: format!(
                    "Failed to create projection from {} to {}: {}",
                    from_proj, to_proj, e
                ),
            }
        })?;

        tracing::debug!("Created projection {} -> {}", from, to);

        Ok(Self { proj })
    }
}

impl Projector for ProjProjector {
    fn project(&self, x: f64, y: f64) -> std::result::Result<(f64, f64), ProjectionError> {
        self.proj.convert((x, y)).map_err(|e| ProjectionError(e.to_string()))
    }
}

/// Check if two CRS are the same
pub fn crs_match(crs1: &Crs, crs2: &Crs) -> bool {
    crs1.epsg == crs2.epsg
}

/// Detect CRS mismatch and return error if they don't match
pub fn check_crs_mismatch(expected: &Crs, actual: &Crs) -> Result<()> {
    if !crs_match(expected, actual) {
        return Err(GeoprepError::ConfigInvalid {
            key: "source_crs".to_string(),
            reason: format!("input declares {}, but {} was requested", actual, expected),
        });
    }
    Ok(())
}
