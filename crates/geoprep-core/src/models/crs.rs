//! Coordinate reference system model shared by every geoprep crate.

use crate::error::{GeoprepError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coordinate Reference System identified by EPSG code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    pub epsg: u32,
    pub name: String,
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Crs {
    pub fn new(epsg: u32, name: impl Into<String>) -> Self {
        Self { epsg, name: name.into() }
    }

    /// Build a CRS from an EPSG code, naming it when the code is well known
    pub fn from_epsg(epsg: u32) -> Self {
        let name = match epsg {
            4326 => "WGS 84",
            3857 => "WGS 84 / Pseudo-Mercator",
            5179 => "Korea 2000 / Unified CS",
            5186 => "Korea 2000 / Central Belt 2010",
            4258 => "ETRS89",
            _ => return Self::new(epsg, format!("EPSG:{}", epsg)),
        };
        Self::new(epsg, name)
    }

    /// WGS 84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Korea 2000 Unified CS, a.k.a. UTM-K (EPSG:5179)
    pub fn korea_2000_unified() -> Self {
        Self::from_epsg(5179)
    }

    /// Authority string understood by PROJ, e.g. `EPSG:5179`
    pub fn authority(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }

    /// OGC URN used by the legacy GeoJSON `crs` member
    pub fn ogc_urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.epsg)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == self.authority() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "EPSG:{} ({})", self.epsg, self.name)
        }
    }
}

impl FromStr for Crs {
    type Err = GeoprepError;

    /// Accepts `4326`, `EPSG:4326`, `epsg:4326`, `urn:ogc:def:crs:EPSG::4326`
    /// and the OGC `CRS84` names, which are WGS 84 in longitude/latitude order
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.rsplit(':').next().is_some_and(|last| last.eq_ignore_ascii_case("CRS84")) {
            return Ok(Crs::wgs84());
        }

        let code = if trimmed.to_ascii_lowercase().contains("epsg") {
            trimmed.rsplit(':').next().unwrap_or_default()
        } else {
            trimmed
        };

        code.parse::<u32>().map(Crs::from_epsg).map_err(|_| GeoprepError::ConfigInvalid {
            key: "crs".to_string(),
            reason: format!("Invalid CRS '{}': expected an EPSG code such as EPSG:4326", s),
        })
    }
}
