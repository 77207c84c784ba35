//! Single-line codec for the rectangle and oriented label encodings.
//!
//! A line is tokenized on runs of whitespace. Five tokens form a rectangle
//! (`class cx cy w h`), nine tokens form an oriented box
//! (`class x1 y1 x2 y2 x3 y3 x4 y4`). Anything else is malformed. Errors are
//! per line: callers count them and keep going.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::geometry::{OrientedBox, Point, RectBox};

/// Token count of a rectangle line.
pub const RECT_TOKENS: usize = 5;
/// Token count of an oriented line.
pub const ORIENTED_TOKENS: usize = 9;

/// Fractional digits written for every coordinate.
pub const COORD_PRECISION: usize = 6;

/// The encoding a single line uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelEncoding {
    Rectangle,
    Oriented,
}

impl fmt::Display for LabelEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelEncoding::Rectangle => write!(f, "rectangle"),
            LabelEncoding::Oriented => write!(f, "obb"),
        }
    }
}

/// Geometry carried by a parsed line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Rect(RectBox),
    Oriented(OrientedBox),
}

/// One parsed annotation line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParsedAnnotation {
    pub class_id: usize,
    pub shape: Shape,
}

impl ParsedAnnotation {
    pub fn rect(class_id: usize, rect: RectBox) -> Self {
        Self {
            class_id,
            shape: Shape::Rect(rect),
        }
    }

    pub fn oriented(class_id: usize, quad: OrientedBox) -> Self {
        Self {
            class_id,
            shape: Shape::Oriented(quad),
        }
    }

    pub fn encoding(&self) -> LabelEncoding {
        match self.shape {
            Shape::Rect(_) => LabelEncoding::Rectangle,
            Shape::Oriented(_) => LabelEncoding::Oriented,
        }
    }

    /// Upgrades a rectangle to its oriented form; oriented lines are returned as-is.
    pub fn to_oriented(&self) -> ParsedAnnotation {
        match self.shape {
            Shape::Rect(rect) => ParsedAnnotation::oriented(self.class_id, rect.to_oriented()),
            Shape::Oriented(_) => *self,
        }
    }
}

/// Why a non-blank line could not be parsed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum LineError {
    #[error("expected {RECT_TOKENS} or {ORIENTED_TOKENS} tokens, found {found}")]
    TokenCount { found: usize },

    #[error("invalid class_id '{token}'; expected non-negative integer")]
    InvalidClassId { token: String },

    #[error("invalid {field} '{token}'; expected finite floating-point number")]
    InvalidCoordinate { field: &'static str, token: String },
}

const RECT_FIELDS: [&str; 4] = ["x_center", "y_center", "width", "height"];
const ORIENTED_FIELDS: [&str; 8] = ["x1", "y1", "x2", "y2", "x3", "y3", "x4", "y4"];

/// Parses one label line.
///
/// Returns `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<ParsedAnnotation>, LineError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // One token past the longest encoding is enough to reject the line, so
    // pathological inputs do not allocate unbounded memory.
    let tokens: Vec<&str> = trimmed
        .split_whitespace()
        .take(ORIENTED_TOKENS + 1)
        .collect();

    match tokens.len() {
        RECT_TOKENS => {
            let class_id = parse_class_id(tokens[0])?;
            let values = parse_coords::<4>(&tokens[1..], &RECT_FIELDS)?;
            Ok(Some(ParsedAnnotation::rect(
                class_id,
                RectBox::new(values[0], values[1], values[2], values[3]),
            )))
        }
        ORIENTED_TOKENS => {
            let class_id = parse_class_id(tokens[0])?;
            let values = parse_coords::<8>(&tokens[1..], &ORIENTED_FIELDS)?;
            let corners = [
                Point::new(values[0], values[1]),
                Point::new(values[2], values[3]),
                Point::new(values[4], values[5]),
                Point::new(values[6], values[7]),
            ];
            Ok(Some(ParsedAnnotation::oriented(
                class_id,
                OrientedBox::new(corners),
            )))
        }
        found => Err(LineError::TokenCount { found }),
    }
}

/// Serializes an annotation with a fixed coordinate precision.
pub fn format_line(annotation: &ParsedAnnotation) -> String {
    let mut out = annotation.class_id.to_string();
    let mut push = |value: f64| {
        out.push(' ');
        out.push_str(&format!("{:.*}", COORD_PRECISION, value));
    };

    match &annotation.shape {
        Shape::Rect(rect) => {
            for value in [rect.cx, rect.cy, rect.w, rect.h] {
                push(value);
            }
        }
        Shape::Oriented(quad) => {
            for corner in &quad.corners {
                push(corner.x);
                push(corner.y);
            }
        }
    }

    out
}

/// Fuzz-only entrypoint for single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_line(input: &str) {
    if let Ok(Some(parsed)) = parse_line(input) {
        let _ = format_line(&parsed.to_oriented());
    }
}

fn parse_class_id(raw: &str) -> Result<usize, LineError> {
    raw.parse::<usize>()
        .map_err(|_| LineError::InvalidClassId {
            token: raw.to_string(),
        })
}

fn parse_coords<const N: usize>(
    tokens: &[&str],
    fields: &[&'static str; N],
) -> Result<[f64; N], LineError> {
    let mut values = [0.0; N];
    for (slot, (raw, field)) in values
        .iter_mut()
        .zip(tokens.iter().zip(fields.iter().copied()))
    {
        *slot = raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| LineError::InvalidCoordinate {
                field,
                token: raw.to_string(),
            })?;
    }
    Ok(values)
}
