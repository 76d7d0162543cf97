//! Triangle setup
//!
//! Converts one clipped triangle into the per-triangle constants the
//! traversal steps over: biased starting edge values at the bounding-box
//! minimum, per-pixel edge increments, and the attribute deltas for depth and
//! perspective-correct UV.

use glam::{IVec2, Vec2};

use crate::clip::ClipVertex;
use crate::fixed::{SUB_HALF, SUB_MASK, SUB_ONE, is_top_or_left, winding};

pub(crate) struct TriangleSetup {
    /// Bounding box, clamped to the raster area and snapped to pixel centers
    /// (quad-aligned in quad mode), in fixed-point.
    pub min: IVec2,
    pub max: IVec2,
    /// Edge values at `min`, top-left bias applied. Entry i is the edge
    /// opposite vertex i.
    pub w_row: [i32; 3],
    /// Edge increments for a one-pixel step in x and y.
    pub step_x: [i32; 3],
    pub step_y: [i32; 3],
    /// 1 / (2A) for normalizing edge values into barycentric weights.
    pub inv_area: f32,
    /// Normalized depth at vertex 0 and deltas to vertices 1 and 2.
    pub z0: f32,
    pub dz1: f32,
    pub dz2: f32,
    /// Per-vertex 1/w.
    pub w_recip: [f32; 3],
    /// UV pre-multiplied by 1/w at vertex 0, plus deltas.
    pub uv0: Vec2,
    pub duv1: Vec2,
    pub duv2: Vec2,
}

impl TriangleSetup {
    /// Set up one fan triangle against a raster area.
    ///
    /// Returns None for clockwise or zero-area triangles (backfacing or
    /// degenerate; nothing would pass the coverage test) and for triangles
    /// whose clamped bounding box is empty.
    pub fn new(
        v0: &ClipVertex,
        v1: &ClipVertex,
        v2: &ClipVertex,
        rast_min: IVec2,
        rast_max: IVec2,
        quads: bool,
    ) -> Option<Self> {
        let two_area = winding(v0.pos, v1.pos, v2.pos);
        if two_area <= 0 {
            return None;
        }

        let mut min = v0.pos.min(v1.pos).min(v2.pos).max(rast_min);
        let mut max = v0.pos.max(v1.pos).max(v2.pos).min(rast_max);
        if min.x > max.x || min.y > max.y {
            return None;
        }

        // Snap min down and max up to pixel centers; in quad mode additionally
        // to 2x2 quad boundaries so the traversal visits whole quads. The
        // raster area is pixel-aligned (quad-aligned in quad mode), so the
        // snap never leaves it.
        if quads {
            min.x = ((min.x & !SUB_MASK) & !SUB_ONE) + SUB_HALF;
            min.y = ((min.y & !SUB_MASK) & !SUB_ONE) + SUB_HALF;
            max.x = ((max.x & !SUB_MASK) | SUB_ONE) + SUB_HALF;
            max.y = ((max.y & !SUB_MASK) | SUB_ONE) + SUB_HALF;
        } else {
            min.x = (min.x & !SUB_MASK) + SUB_HALF;
            min.y = (min.y & !SUB_MASK) + SUB_HALF;
            max.x = (max.x & !SUB_MASK) + SUB_HALF;
            max.y = (max.y & !SUB_MASK) + SUB_HALF;
        }

        let bias = |a: IVec2, b: IVec2| if is_top_or_left(a, b) { 0 } else { -1 };
        let w_row = [
            winding(v1.pos, v2.pos, min) + bias(v1.pos, v2.pos),
            winding(v2.pos, v0.pos, min) + bias(v2.pos, v0.pos),
            winding(v0.pos, v1.pos, min) + bias(v0.pos, v1.pos),
        ];
        let step_x = [
            v1.pos.y - v2.pos.y,
            v2.pos.y - v0.pos.y,
            v0.pos.y - v1.pos.y,
        ];
        let step_y = [
            v2.pos.x - v1.pos.x,
            v0.pos.x - v2.pos.x,
            v1.pos.x - v0.pos.x,
        ];

        let uv0 = v0.uv * v0.w_recip;
        Some(Self {
            min,
            max,
            w_row,
            step_x,
            step_y,
            inv_area: 1.0 / two_area as f32,
            z0: v0.z,
            dz1: v1.z - v0.z,
            dz2: v2.z - v0.z,
            w_recip: [v0.w_recip, v1.w_recip, v2.w_recip],
            uv0,
            duv1: v1.uv * v1.w_recip - uv0,
            duv2: v2.uv * v2.w_recip - uv0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vert(x: i32, y: i32) -> ClipVertex {
        ClipVertex {
            pos: IVec2::new(x * SUB_ONE, y * SUB_ONE),
            z: 0.0,
            w_recip: 1.0,
            uv: Vec2::ZERO,
        }
    }

    fn big_area() -> (IVec2, IVec2) {
        (
            IVec2::new(-64 * SUB_ONE, -64 * SUB_ONE),
            IVec2::new(64 * SUB_ONE, 64 * SUB_ONE),
        )
    }

    #[test]
    fn clockwise_and_degenerate_triangles_are_skipped() {
        let (min, max) = big_area();
        // Clockwise winding.
        assert!(TriangleSetup::new(&vert(0, 0), &vert(0, 8), &vert(8, 0), min, max, false).is_none());
        // Collinear points.
        assert!(TriangleSetup::new(&vert(0, 0), &vert(4, 4), &vert(8, 8), min, max, false).is_none());
    }

    #[test]
    fn bounding_box_snaps_to_pixel_centers() {
        let (min, max) = big_area();
        let s = TriangleSetup::new(&vert(0, 0), &vert(8, 0), &vert(0, 8), min, max, false).unwrap();
        assert_eq!(s.min, IVec2::new(SUB_HALF, SUB_HALF));
        assert_eq!(s.max, IVec2::new(8 * SUB_ONE + SUB_HALF, 8 * SUB_ONE + SUB_HALF));
    }

    #[test]
    fn quad_mode_aligns_the_box_to_quads() {
        let (min, max) = big_area();
        let s = TriangleSetup::new(&vert(1, 1), &vert(7, 1), &vert(1, 7), min, max, true).unwrap();
        // Min rounds down to an even pixel center, max up to an odd one.
        assert_eq!(s.min, IVec2::new(SUB_HALF, SUB_HALF));
        assert_eq!(s.max, IVec2::new(7 * SUB_ONE + SUB_HALF, 7 * SUB_ONE + SUB_HALF));
    }

    #[test]
    fn starting_edge_values_carry_the_top_left_bias() {
        let (min, max) = big_area();
        let (a, b, c) = (vert(0, 0), vert(8, 0), vert(0, 8));
        let s = TriangleSetup::new(&a, &b, &c, min, max, false).unwrap();
        // Edge b->c (right, heading up-left from x=8): its top-or-left status
        // decides whether w_row[0] keeps the raw winding value.
        let raw = [
            winding(b.pos, c.pos, s.min),
            winding(c.pos, a.pos, s.min),
            winding(a.pos, b.pos, s.min),
        ];
        // c->a heads down: a left edge, no bias. a->b heads right along the
        // bottom: biased. b->c heads up-left: top only if horizontal, so
        // biased here.
        assert_eq!(s.w_row[0], raw[0] - 1);
        assert_eq!(s.w_row[1], raw[1]);
        assert_eq!(s.w_row[2], raw[2] - 1);
    }

    #[test]
    fn bbox_outside_area_is_skipped() {
        let rast_min = IVec2::new(0, 0);
        let rast_max = IVec2::new(16 * SUB_ONE, 16 * SUB_ONE);
        assert!(
            TriangleSetup::new(&vert(20, 0), &vert(28, 0), &vert(20, 8), rast_min, rast_max, false)
                .is_none()
        );
    }
}
