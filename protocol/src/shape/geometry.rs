//! # Shape Geometry
//!
//! Computed geometry for canvas shapes: vertex sets walked out of path
//! commands, cached line-equation segments, bounding boxes, and the
//! validity rules (canvas bounds, closed-polygon discipline for filled
//! shapes, self-intersection).
//!
//! Everything here is integer arithmetic. Intersection tests that need
//! division are carried out on exact rationals in `i128`, so two miners
//! always agree on whether two segments touch — there is no float to
//! round differently on someone else's machine.

use super::svg::{PathCommand, SvgParseError};

// ---------------------------------------------------------------------------
// Point & Bounds
// ---------------------------------------------------------------------------

/// An integer point on (or off) the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box, inclusive on all sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x_min: i64,
    pub x_max: i64,
    pub y_min: i64,
    pub y_max: i64,
}

impl Bounds {
    /// Bounding box of a non-empty vertex collection.
    pub fn of_vertex_sets(sets: &[Vec<Point>]) -> Self {
        let mut b = Bounds {
            x_min: i64::MAX,
            x_max: i64::MIN,
            y_min: i64::MAX,
            y_max: i64::MIN,
        };
        for set in sets {
            for p in set {
                b.absorb(*p);
            }
        }
        b
    }

    /// Bounding box of a non-empty point slice.
    pub fn of_points(points: &[Point]) -> Self {
        let mut b = Bounds {
            x_min: i64::MAX,
            x_max: i64::MIN,
            y_min: i64::MAX,
            y_max: i64::MIN,
        };
        for p in points {
            b.absorb(*p);
        }
        b
    }

    fn absorb(&mut self, p: Point) {
        self.x_min = self.x_min.min(p.x);
        self.x_max = self.x_max.max(p.x);
        self.y_min = self.y_min.min(p.y);
        self.y_max = self.y_max.max(p.y);
    }

    /// True when the two boxes share at least one point (edges count).
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x_min <= other.x_max
            && other.x_min <= self.x_max
            && self.y_min <= other.y_max
            && other.y_min <= self.y_max
    }
}

// ---------------------------------------------------------------------------
// LineSegment
// ---------------------------------------------------------------------------

/// A directed line segment with cached line-equation coefficients
/// `A·x + B·y = C`, where `A = y2 − y1`, `B = x1 − x2`,
/// `C = A·x1 + B·y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
    pub a: i64,
    pub b: i64,
    pub c: i64,
}

impl LineSegment {
    pub fn new(start: Point, end: Point) -> Self {
        let a = end.y - start.y;
        let b = start.x - end.x;
        let c = a * start.x + b * start.y;
        Self { start, end, a, b, c }
    }

    fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    fn x_range(&self) -> (i64, i64) {
        (self.start.x.min(self.end.x), self.start.x.max(self.end.x))
    }

    fn y_range(&self) -> (i64, i64) {
        (self.start.y.min(self.end.y), self.start.y.max(self.end.y))
    }

    /// True when the two segments share at least one point.
    ///
    /// The infinite-line intersection is computed from the cached
    /// coefficients with the standard determinant and accepted when it
    /// falls within both segments' coordinate ranges, endpoints included.
    /// Parallel segments intersect only when collinear with overlapping
    /// ranges. Endpoint-on-endpoint contact counts.
    pub fn intersects(&self, other: &LineSegment) -> bool {
        if self.is_degenerate() || other.is_degenerate() {
            return false;
        }

        let (a1, b1, c1) = (self.a as i128, self.b as i128, self.c as i128);
        let (a2, b2, c2) = (other.a as i128, other.b as i128, other.c as i128);
        let det = a1 * b2 - a2 * b1;

        if det == 0 {
            // Parallel. Collinear iff `other` satisfies our line equation.
            if a1 * (other.start.x as i128) + b1 * (other.start.y as i128) != c1 {
                return false;
            }
            let (sx1, sx2) = self.x_range();
            let (ox1, ox2) = other.x_range();
            let (sy1, sy2) = self.y_range();
            let (oy1, oy2) = other.y_range();
            return sx1 <= ox2 && ox1 <= sx2 && sy1 <= oy2 && oy1 <= sy2;
        }

        // Intersection point as rationals x = xn/det, y = yn/det.
        let xn = c1 * b2 - c2 * b1;
        let yn = a1 * c2 - a2 * c1;

        let within = |seg: &LineSegment| {
            let (x_lo, x_hi) = seg.x_range();
            let (y_lo, y_hi) = seg.y_range();
            in_range(xn, det, x_lo, x_hi) && in_range(yn, det, y_lo, y_hi)
        };
        within(self) && within(other)
    }
}

/// True when `lo <= num/den <= hi`, exact over integers.
fn in_range(num: i128, den: i128, lo: i64, hi: i64) -> bool {
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    (lo as i128) * den <= num && num <= (hi as i128) * den
}

/// Builds the consecutive-pair segment list for a vertex set.
pub fn segments_of(vertices: &[Point]) -> Vec<LineSegment> {
    vertices
        .windows(2)
        .map(|w| LineSegment::new(w[0], w[1]))
        .collect()
}

// ---------------------------------------------------------------------------
// Vertex generation
// ---------------------------------------------------------------------------

/// Walks a parsed command sequence into per-sub-path vertex sets.
///
/// Each `M`/`m` opens a new set. Line commands append the new current
/// point. `Z`/`z` appends the sub-path start as a final vertex and marks
/// the sub-path closed; after a `Z`, only another moveto may follow. The
/// first moveto is absolute regardless of case.
///
/// Returns the vertex sets and whether *every* sub-path is closed (ended
/// with `Z`, or wrapped back to its own first vertex).
pub fn build_vertex_sets(
    commands: &[PathCommand],
) -> Result<(Vec<Vec<Point>>, bool), SvgParseError> {
    let mut sets: Vec<Vec<Point>> = Vec::new();
    let mut all_closed = true;

    let mut active: Vec<Point> = Vec::new();
    let mut active_z = false;
    let mut current = Point::new(0, 0);
    let mut subpath_start = Point::new(0, 0);
    let mut first = true;

    let mut seal =
        |active: &mut Vec<Point>, active_z: bool, all_closed: &mut bool, sets: &mut Vec<Vec<Point>>| {
            if !active.is_empty() {
                let closed = active_z || active.last() == active.first();
                *all_closed &= closed;
                sets.push(std::mem::take(active));
            }
        };

    for command in commands {
        if active_z && !matches!(command.cmd, 'M' | 'm') {
            return Err(SvgParseError::MissingMoveto);
        }
        match command.cmd {
            'M' | 'm' => {
                seal(&mut active, active_z, &mut all_closed, &mut sets);
                active_z = false;
                let p = if first || command.cmd == 'M' {
                    Point::new(command.x, command.y)
                } else {
                    Point::new(current.x + command.x, current.y + command.y)
                };
                current = p;
                subpath_start = p;
                active.push(p);
            }
            'L' => {
                current = Point::new(command.x, command.y);
                active.push(current);
            }
            'l' => {
                current = Point::new(current.x + command.x, current.y + command.y);
                active.push(current);
            }
            'H' => {
                current = Point::new(command.x, current.y);
                active.push(current);
            }
            'h' => {
                current = Point::new(current.x + command.x, current.y);
                active.push(current);
            }
            'V' => {
                current = Point::new(current.x, command.y);
                active.push(current);
            }
            'v' => {
                current = Point::new(current.x, current.y + command.y);
                active.push(current);
            }
            'Z' | 'z' => {
                active.push(subpath_start);
                current = subpath_start;
                active_z = true;
            }
            // The parser only emits the commands above.
            _ => return Err(SvgParseError::UnknownCommand(command.cmd)),
        }
        first = false;
    }
    seal(&mut active, active_z, &mut all_closed, &mut sets);

    Ok((sets, all_closed))
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Computed geometry of a path shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathGeometry {
    /// One vertex set per sub-path, in command order.
    pub vertex_sets: Vec<Vec<Point>>,
    /// Whether the shape's fill is non-transparent.
    pub filled: bool,
    /// Whether every sub-path is closed.
    pub closed: bool,
    /// Bounding box over all vertices.
    pub bounds: Bounds,
}

/// Computed geometry of a circle shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircleGeometry {
    pub center: Point,
    pub radius: i64,
    pub filled: bool,
    pub bounds: Bounds,
}

/// Geometry of any shape, ready for costing, validity and overlap checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeGeometry {
    Path(PathGeometry),
    Circle(CircleGeometry),
}

/// Reasons a geometry fails canvas validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityError {
    /// A vertex or part of the circle lies outside the canvas.
    OutOfBounds,
    /// A filled polygon's boundary crosses itself.
    SelfIntersecting,
}

impl ShapeGeometry {
    pub fn bounds(&self) -> Bounds {
        match self {
            Self::Path(p) => p.bounds,
            Self::Circle(c) => c.bounds,
        }
    }

    pub fn filled(&self) -> bool {
        match self {
            Self::Path(p) => p.filled,
            Self::Circle(c) => c.filled,
        }
    }

    /// The vertex sets backing segment and containment tests. Circles have
    /// none — they carry no polygon approximation.
    pub fn vertex_sets(&self) -> &[Vec<Point>] {
        match self {
            Self::Path(p) => &p.vertex_sets,
            Self::Circle(_) => &[],
        }
    }

    /// The single closed polygon of a filled path, if this geometry is one.
    pub fn fill_polygon(&self) -> Option<&[Point]> {
        match self {
            Self::Path(p) if p.filled && p.closed && p.vertex_sets.len() == 1 => {
                Some(&p.vertex_sets[0])
            }
            _ => None,
        }
    }

    /// Checks canvas bounds and, for filled paths, self-intersection.
    ///
    /// Bounds are inclusive: `[0, x_max] × [0, y_max]`.
    pub fn validate(&self, x_max: u32, y_max: u32) -> Result<(), ValidityError> {
        let (x_max, y_max) = (x_max as i64, y_max as i64);
        match self {
            Self::Path(p) => {
                for set in &p.vertex_sets {
                    for v in set {
                        if v.x < 0 || v.x > x_max || v.y < 0 || v.y > y_max {
                            return Err(ValidityError::OutOfBounds);
                        }
                    }
                }
                if let Some(polygon) = self.fill_polygon() {
                    if polygon_self_intersects(polygon) {
                        return Err(ValidityError::SelfIntersecting);
                    }
                }
                Ok(())
            }
            Self::Circle(c) => {
                if c.radius < 0
                    || c.center.x - c.radius < 0
                    || c.center.y - c.radius < 0
                    || c.center.x + c.radius > x_max
                    || c.center.y + c.radius > y_max
                {
                    return Err(ValidityError::OutOfBounds);
                }
                Ok(())
            }
        }
    }
}

/// Pairwise segment test over a closed polygon, excluding adjacent
/// segments and the closing-edge/first-edge pair (they legitimately share
/// the start vertex).
pub fn polygon_self_intersects(polygon: &[Point]) -> bool {
    let segments = segments_of(polygon);
    let n = segments.len();
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments[i].intersects(&segments[j]) {
                return true;
            }
        }
    }
    false
}
