//! # Shape Engine
//!
//! Everything between an art node's SVG string and a priced, validated,
//! overlap-checked geometry:
//!
//! ```text
//! svg.rs       — normalization, lexing, command grammar
//! geometry.rs  — vertex sets, segments, bounds, validity rules
//! ink.rs       — perimeter / scan-line fill / circle costing
//! overlap.rs   — segment contact, ray-cast containment
//! ```
//!
//! The engine is pure: no I/O, no clocks, no global state. Given the same
//! shape string, every miner on the network computes the same geometry,
//! the same cost, and the same overlap verdicts — that determinism is what
//! lets shape validation participate in consensus at all.

pub mod geometry;
pub mod ink;
pub mod overlap;
pub mod svg;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::MinerError;
use geometry::{
    build_vertex_sets, Bounds, CircleGeometry, PathGeometry, Point, ShapeGeometry, ValidityError,
};
use svg::{parse_circle_commands, parse_path_commands};

pub use geometry::{LineSegment, ShapeGeometry as Geometry};
pub use overlap::has_overlap;
pub use svg::normalize;

/// Fill value that marks a shape as outline-only. Anything else is a fill.
pub const TRANSPARENT: &str = "transparent";

// ---------------------------------------------------------------------------
// ShapeType
// ---------------------------------------------------------------------------

/// The two shape families the canvas accepts.
///
/// Encoded on the wire as an integer (`0` path, `1` circle), matching the
/// rest of the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Path,
    Circle,
}

impl Serialize for ShapeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            Self::Path => 0,
            Self::Circle => 1,
        })
    }
}

impl<'de> Deserialize<'de> for ShapeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Path),
            1 => Ok(Self::Circle),
            other => Err(de::Error::custom(format!("unknown shape type {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// A shape as submitted by an art node: the raw SVG string plus fill,
/// stroke and owner identity. Geometry is computed on demand, never
/// carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "ShapeType")]
    pub shape_type: ShapeType,

    #[serde(rename = "ShapeSvgString")]
    pub svg: String,

    #[serde(rename = "Fill")]
    pub fill: String,

    #[serde(rename = "Stroke")]
    pub stroke: String,

    /// Owner public-key string (hex SEC1). Shapes of the same owner never
    /// overlap-conflict with each other.
    #[serde(rename = "Owner")]
    pub owner: String,
}

impl Shape {
    /// True when the fill is anything other than the literal
    /// `"transparent"`.
    pub fn filled(&self) -> bool {
        self.fill != TRANSPARENT
    }

    /// Parses the SVG string and computes this shape's geometry.
    ///
    /// Fails with `ShapeSvgStringTooLong` when the string exceeds the
    /// protocol cap, `InvalidShapeFillStroke` when the fill/stroke pair is
    /// undrawable, and `InvalidShapeSvgString` on any grammar violation —
    /// including the filled-path rule (a non-transparent path must be a
    /// single closed sub-path).
    pub fn geometry(&self) -> Result<ShapeGeometry, MinerError> {
        if self.svg.len() > crate::config::MAX_SVG_STRING_LEN {
            return Err(MinerError::ShapeSvgStringTooLong(self.svg.clone()));
        }
        self.check_fill_stroke()?;

        match self.shape_type {
            ShapeType::Path => self.path_geometry(),
            ShapeType::Circle => self.circle_geometry(),
        }
    }

    /// Computes geometry and checks it against the canvas.
    ///
    /// This is the full miner-side validity test: grammar, fill rules,
    /// bounds, and (for filled paths) self-intersection.
    pub fn validate(&self, x_max: u32, y_max: u32) -> Result<ShapeGeometry, MinerError> {
        let geometry = self.geometry()?;
        match geometry.validate(x_max, y_max) {
            Ok(()) => Ok(geometry),
            Err(ValidityError::OutOfBounds) => Err(MinerError::OutOfBounds),
            Err(ValidityError::SelfIntersecting) => {
                Err(MinerError::InvalidShapeSvgString(self.svg.clone()))
            }
        }
    }

    /// Ink cost of this shape's geometry.
    pub fn ink_cost(&self) -> Result<u64, MinerError> {
        Ok(ink_cost(&self.geometry()?))
    }

    fn check_fill_stroke(&self) -> Result<(), MinerError> {
        if self.fill.is_empty() || self.stroke.is_empty() {
            return Err(MinerError::InvalidShapeFillStroke(
                "fill and stroke must be specified".to_string(),
            ));
        }
        if self.fill == TRANSPARENT && self.stroke == TRANSPARENT {
            return Err(MinerError::InvalidShapeFillStroke(
                "fill and stroke cannot both be transparent".to_string(),
            ));
        }
        Ok(())
    }

    fn path_geometry(&self) -> Result<ShapeGeometry, MinerError> {
        let invalid = || MinerError::InvalidShapeSvgString(self.svg.clone());
        let commands = parse_path_commands(&self.svg).map_err(|_| invalid())?;
        let (vertex_sets, closed) = build_vertex_sets(&commands).map_err(|_| invalid())?;

        let filled = self.filled();
        if filled && (vertex_sets.len() != 1 || !closed) {
            // A fill needs exactly one closed polygon to pour into.
            return Err(invalid());
        }

        let bounds = Bounds::of_vertex_sets(&vertex_sets);
        Ok(ShapeGeometry::Path(PathGeometry {
            vertex_sets,
            filled,
            closed,
            bounds,
        }))
    }

    fn circle_geometry(&self) -> Result<ShapeGeometry, MinerError> {
        let invalid = || MinerError::InvalidShapeSvgString(self.svg.clone());
        let commands = parse_circle_commands(&self.svg).map_err(|_| invalid())?;

        let (mut x, mut y, mut r) = (0i64, 0i64, 0i64);
        for c in commands {
            match c.cmd {
                'X' => x = c.val,
                'Y' => y = c.val,
                _ => r = c.val,
            }
        }
        if r < 0 {
            return Err(invalid());
        }

        let center = Point::new(x, y);
        Ok(ShapeGeometry::Circle(CircleGeometry {
            center,
            radius: r,
            filled: self.filled(),
            bounds: Bounds {
                x_min: x - r,
                x_max: x + r,
                y_min: y - r,
                y_max: y + r,
            },
        }))
    }
}

/// Ink cost of a computed geometry.
///
/// Filled paths pay for interior pixels; everything else pays for
/// perimeter. Filled-but-open geometries cannot be constructed, so the
/// fallback to perimeter for paths without a fill polygon is exact.
pub fn ink_cost(geometry: &ShapeGeometry) -> u64 {
    match geometry {
        ShapeGeometry::Path(_) => match geometry.fill_polygon() {
            Some(polygon) => ink::fill_ink(polygon),
            None => ink::perimeter_ink(geometry.vertex_sets()),
        },
        ShapeGeometry::Circle(c) => ink::circle_ink(c.radius, c.filled),
    }
}
