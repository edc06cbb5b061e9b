//! geoprep geocode - address to coordinate lookup for CSV tables
//!
//! This crate defines the geocoder port, the Kakao Local adapter and the
//! batch driver that filters a CSV table and appends latitude and longitude
//! columns to it.

pub mod batch;
pub mod kakao;
pub mod ports;
pub mod table;

// Re-export main types
pub use batch::{geocode_table, GeocodeOptions, GeocodeReport};
pub use kakao::KakaoGeocoder;
pub use ports::{GeocodeOutcome, Geocoder, LatLng};
pub use table::{ColumnSelector, CsvTable};
