//! Depth-agnostic GeoJSON coordinate walker
//!
//! A `coordinates` value is either a position (`[x, y, ...]`) or an array of
//! coordinate values. Which one is decided by the first element alone, so
//! every geometry type (Point through MultiPolygon, and anything deeper) is
//! handled by the same recursion without looking at the geometry's `type`.

use crate::projection::Projector;
use geoprep_core::error::{GeoprepError, Result};
use geoprep_core::models::CoordinatePath;
use serde_json::Value;

/// A parsed `coordinates` value
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateNode {
    /// A position: x, y and optional trailing values (Z, M)
    Leaf(Vec<f64>),
    /// An ordered list of nested coordinate values
    Container(Vec<CoordinateNode>),
}

/// Array lengths at every level of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeShape {
    Leaf(usize),
    Container(Vec<NodeShape>),
}

fn malformed(reason: String) -> GeoprepError {
    GeoprepError::MalformedGeometry { path: CoordinatePath::root(), reason }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl CoordinateNode {
    /// Parse a JSON `coordinates` value.
    ///
    /// Errors carry the index chain of the offending element.
    pub fn from_value(value: &Value) -> Result<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(malformed(format!("expected an array, found {}", kind(other)))),
        };

        match items.first() {
            None => Ok(CoordinateNode::Container(Vec::new())),
            Some(Value::Number(_)) => Self::leaf_from_items(items),
            Some(Value::Array(_)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Array(_) => Self::from_value(item).map_err(|e| e.in_coordinate(i)),
                    other => Err(malformed(format!(
                        "expected an array like its siblings, found {}",
                        kind(other)
                    ))
                    .in_coordinate(i)),
                })
                .collect::<Result<Vec<_>>>()
                .map(CoordinateNode::Container),
            Some(other) => Err(malformed(format!(
                "expected a number or an array, found {}",
                kind(other)
            ))
            .in_coordinate(0)),
        }
    }

    fn leaf_from_items(items: &[Value]) -> Result<Self> {
        let values = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_f64().ok_or_else(|| {
                    malformed(format!("expected a number, found {}", kind(item))).in_coordinate(i)
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        if values.len() < 2 {
            return Err(malformed(format!(
                "a position needs at least two numbers, found {}",
                values.len()
            )));
        }

        Ok(CoordinateNode::Leaf(values))
    }

    /// Serialize back to a JSON `coordinates` value
    pub fn to_value(&self) -> Value {
        match self {
            CoordinateNode::Leaf(values) => Value::Array(
                values
                    .iter()
                    .map(|v| serde_json::Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null))
                    .collect(),
            ),
            CoordinateNode::Container(children) => {
                Value::Array(children.iter().map(CoordinateNode::to_value).collect())
            }
        }
    }

    /// Reproject every position, returning a new node of identical shape.
    ///
    /// Only the first two values of a position are passed to the projector;
    /// anything after them is copied unchanged. The first failing position
    /// aborts the walk.
    pub fn transform<P: Projector + ?Sized>(&self, projector: &P) -> Result<Self> {
        match self {
            CoordinateNode::Leaf(values) => {
                let (x, y) = projector.project(values[0], values[1]).map_err(|e| {
                    GeoprepError::ProjectionFailure {
                        path: CoordinatePath::root(),
                        reason: e.to_string(),
                    }
                })?;

                if !x.is_finite() || !y.is_finite() {
                    return Err(GeoprepError::ProjectionFailure {
                        path: CoordinatePath::root(),
                        reason: format!(
                            "({}, {}) projected to a non-finite position ({}, {})",
                            values[0], values[1], x, y
                        ),
                    });
                }

                let mut projected = Vec::with_capacity(values.len());
                projected.push(x);
                projected.push(y);
                projected.extend_from_slice(&values[2..]);
                Ok(CoordinateNode::Leaf(projected))
            }
            CoordinateNode::Container(children) => children
                .iter()
                .enumerate()
                .map(|(i, child)| child.transform(projector).map_err(|e| e.in_coordinate(i)))
                .collect::<Result<Vec<_>>>()
                .map(CoordinateNode::Container),
        }
    }

    /// Array lengths at every nesting level
    pub fn shape(&self) -> NodeShape {
        match self {
            CoordinateNode::Leaf(values) => NodeShape::Leaf(values.len()),
            CoordinateNode::Container(children) => {
                NodeShape::Container(children.iter().map(CoordinateNode::shape).collect())
            }
        }
    }

    /// Number of positions
    pub fn leaf_count(&self) -> usize {
        match self {
            CoordinateNode::Leaf(_) => 1,
            CoordinateNode::Container(children) => children.iter().map(|c| c.leaf_count()).sum(),
        }
    }

    /// Bounding box `[min_x, min_y, max_x, max_y]`; `None` without positions
    pub fn bounds(&self) -> Option<[f64; 4]> {
        match self {
            CoordinateNode::Leaf(values) => Some([values[0], values[1], values[0], values[1]]),
            CoordinateNode::Container(children) => {
                children.iter().filter_map(|c| c.bounds()).reduce(merge_bounds)
            }
        }
    }
}

/// Union of two bounding boxes
pub fn merge_bounds(a: [f64; 4], b: [f64; 4]) -> [f64; 4] {
    [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]
}

/// Parse, reproject and re-serialize a `coordinates` value.
///
/// Returns the new value and the number of positions rewritten.
pub fn transform_value<P: Projector + ?Sized>(value: &Value, projector: &P) -> Result<(Value, usize)> {
    let node = CoordinateNode::from_value(value)?;
    let transformed = node.transform(projector)?;
    Ok((transformed.to_value(), node.leaf_count()))
}
