//! Geocoder port definitions

use async_trait::async_trait;
use serde::Serialize;

/// A WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Result of a single address lookup
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    /// The service returned at least one match; the first one is kept
    Found(LatLng),

    /// The request succeeded but nothing matched the address
    NotFound,

    /// The request itself failed (network, HTTP status, unreadable body)
    Failed(String),
}

impl GeocodeOutcome {
    pub fn lat_lng(&self) -> Option<LatLng> {
        match self {
            GeocodeOutcome::Found(position) => Some(*position),
            _ => None,
        }
    }
}

/// Port for turning a postal address into coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up a single address
    async fn geocode(&self, address: &str) -> GeocodeOutcome;

    /// Name of the backing service, for logs and reports
    fn service_name(&self) -> &str;
}
