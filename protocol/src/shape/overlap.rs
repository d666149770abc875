//! # Overlap Detection
//!
//! Whether two shapes contest the same canvas real estate. Two shapes
//! overlap when their outlines touch, or when one is filled and swallows
//! a vertex of the other. A transparent shape surrounding another shape
//! does NOT overlap it — there is canvas showing between them.
//!
//! The test sequence, cheapest first:
//!
//! 1. No vertices on either side → no overlap (circles carry no vertex
//!    approximation and never register overlap; preserved network
//!    behavior).
//! 2. Disjoint bounding boxes → no overlap.
//! 3. Any segment of one touches any segment of the other → overlap.
//! 4. One side is filled and any vertex of the other is strictly inside
//!    its polygon → overlap (checked in both directions).
//!
//! Point-in-polygon is a +x ray cast with the half-open `[min_y, max_y)`
//! edge convention, in exact integer arithmetic.

use super::geometry::{segments_of, Point, ShapeGeometry};

/// True when `p` lies strictly inside the closed polygon.
///
/// Casts a ray from `p` toward +x and counts boundary crossings. Each
/// non-horizontal edge is considered over the half-open span
/// `[min_y, max_y)`, which counts every vertex exactly once and keeps the
/// parity honest at shared endpoints. Crossings are counted only when
/// strictly right of `p`; a point on the boundary is not "inside" (the
/// segment test catches boundary contact separately).
pub fn point_strictly_inside(p: Point, polygon: &[Point]) -> bool {
    let mut crossings = 0u32;
    for edge in polygon.windows(2) {
        let (p1, p2) = (edge[0], edge[1]);
        let dy = p2.y - p1.y;
        if dy == 0 {
            continue;
        }
        let (y_lo, y_hi) = (p1.y.min(p2.y), p1.y.max(p2.y));
        if p.y < y_lo || p.y >= y_hi {
            continue;
        }
        // crossing_x = x1 + (p.y − y1)·dx/dy, compared against p.x exactly.
        let dx = (p2.x - p1.x) as i128;
        let num = (p1.x as i128) * (dy as i128) + ((p.y - p1.y) as i128) * dx;
        let (num, den) = if dy < 0 {
            (-num, -(dy as i128))
        } else {
            (num, dy as i128)
        };
        if num > (p.x as i128) * den {
            crossings += 1;
        }
    }
    crossings % 2 == 1
}

/// Full overlap test between two shape geometries.
pub fn has_overlap(a: &ShapeGeometry, b: &ShapeGeometry) -> bool {
    let sets_a = a.vertex_sets();
    let sets_b = b.vertex_sets();

    // 1. Shapes without vertices cannot overlap anything.
    if sets_a.iter().all(|s| s.is_empty()) || sets_b.iter().all(|s| s.is_empty()) {
        return false;
    }

    // 2. Bounding-box reject.
    if !a.bounds().intersects(&b.bounds()) {
        return false;
    }

    // 3. Segment-segment contact across every sub-path pair.
    for set_a in sets_a {
        for seg_a in segments_of(set_a) {
            for set_b in sets_b {
                for seg_b in segments_of(set_b) {
                    if seg_a.intersects(&seg_b) {
                        return true;
                    }
                }
            }
        }
    }

    // 4. Containment: a filled polygon swallows the other shape whole.
    if let Some(polygon) = a.fill_polygon() {
        for set in sets_b {
            if set.iter().any(|v| point_strictly_inside(*v, polygon)) {
                return true;
            }
        }
    }
    if let Some(polygon) = b.fill_polygon() {
        for set in sets_a {
            if set.iter().any(|v| point_strictly_inside(*v, polygon)) {
                return true;
            }
        }
    }

    false
}
