//! Locators for positions inside a GeoJSON document.

use serde::Serialize;
use std::fmt;

/// Position of a coordinate node inside a document.
///
/// Renders as `features[3].geometries[0].coordinates[0][1]`. The feature and
/// GeometryCollection members are filled in by the caller as an error travels
/// outwards from the coordinate walker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatePath {
    feature: Option<usize>,
    members: Vec<usize>,
    indices: Vec<usize>,
}

impl CoordinatePath {
    /// Path to the root of a `coordinates` value
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices, ..Self::default() }
    }

    /// Prepend a coordinate array index
    pub fn in_coordinate(mut self, index: usize) -> Self {
        self.indices.insert(0, index);
        self
    }

    /// Prepend a GeometryCollection member index
    pub fn in_member(mut self, index: usize) -> Self {
        self.members.insert(0, index);
        self
    }

    pub fn in_feature(mut self, index: usize) -> Self {
        self.feature = Some(index);
        self
    }

    pub fn feature(&self) -> Option<usize> {
        self.feature
    }

    /// Index chain into the `coordinates` array
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl fmt::Display for CoordinatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(feature) = self.feature {
            write!(f, "features[{}].", feature)?;
        }
        for member in &self.members {
            write!(f, "geometries[{}].", member)?;
        }
        f.write_str("coordinates")?;
        for index in &self.indices {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}
