//! Fixed-point kernel
//!
//! Screen coordinates are signed integers carrying `SUB_BITS` fractional bits,
//! so one pixel equals `SUB_ONE` units. All triangle setup and traversal
//! arithmetic runs on these units; the sub-pixel exponent is audited here and
//! nowhere else.

use glam::IVec2;

/// Sub-pixel precision: 4 bits = 16 sub-pixel steps per pixel.
///
/// 4 sub bits keep the guard band inside `i32`, which caps the render target
/// at [-2048, 2047] pixels per axis.
pub const SUB_BITS: i32 = 4;

/// One pixel in sub-pixel units.
pub const SUB_ONE: i32 = 1 << SUB_BITS;

/// Half a pixel in sub-pixel units (offset to a pixel center).
pub const SUB_HALF: i32 = SUB_ONE >> 1;

/// Mask of the fractional bits.
pub const SUB_MASK: i32 = SUB_ONE - 1;

/// Convert a floating value in pixels to fixed-point sub-pixel units.
#[inline(always)]
pub const fn to_fixed(v: f32) -> i32 {
    (v * SUB_ONE as f32 + 0.5) as i32
}

/// Signed double area of the triangle `(p1, p2, p3)` in sub-pixel units.
///
/// Positive for counter-clockwise triples in a y-up coordinate system. The
/// sum is divided once, with a floored division, which keeps the result
/// affine in `p3`: stepping by whole pixels and re-evaluating at the stepped
/// point give the same value, so edge walks anchored at different bounding
/// boxes agree on every pixel.
#[inline]
pub fn winding(p1: IVec2, p2: IVec2, p3: IVec2) -> i32 {
    let a = (p1.y - p2.y) as i64 * p3.x as i64;
    let b = (p2.x - p1.x) as i64 * p3.y as i64;
    let c = p1.x as i64 * p2.y as i64 - p1.y as i64 * p2.x as i64;
    (a + b + c).div_euclid(SUB_ONE as i64) as i32
}

/// Top-left fill rule predicate for the directed edge `p1 -> p2` of a CCW
/// triangle: true for left edges (heading down) and top edges (heading left
/// on a horizontal).
#[inline]
pub fn is_top_or_left(p1: IVec2, p2: IVec2) -> bool {
    (p2.y < p1.y) || (p2.x < p1.x && p1.y == p2.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(x: i32, y: i32) -> IVec2 {
        IVec2::new(x * SUB_ONE, y * SUB_ONE)
    }

    #[test]
    fn to_fixed_rounds_to_nearest() {
        assert_eq!(to_fixed(1.0), 16);
        assert_eq!(to_fixed(0.5), 8);
        assert_eq!(to_fixed(0.49), 8);
        assert_eq!(to_fixed(-2.0), -32);
    }

    #[test]
    fn winding_sign_follows_orientation() {
        let a = px(0, 0);
        let b = px(4, 0);
        let c = px(0, 4);
        // CCW with y-up: positive double area, 2 * (4*4/2) pixels.
        assert_eq!(winding(a, b, c), 16 * SUB_ONE);
        assert_eq!(winding(a, c, b), -16 * SUB_ONE);
    }

    #[test]
    fn winding_is_affine_under_pixel_steps() {
        // Deliberately awkward vertices so the floored division matters.
        let a = IVec2::new(-37, 13);
        let b = IVec2::new(55, -90);
        for k in -3..=3 {
            let p = IVec2::new(5 + SUB_HALF, -11 + SUB_HALF);
            let q = IVec2::new(p.x + k * SUB_ONE, p.y);
            let step = a.y - b.y;
            assert_eq!(winding(a, b, q), winding(a, b, p) + k * step);
        }
    }

    #[test]
    fn opposite_edge_directions_never_both_claim_a_point() {
        // The floored division may differ by one unit between the two
        // directions of an edge, but the pair always satisfies
        // w(a,b,p) + w(b,a,p) in {-1, 0}, so with the top-left bias on
        // exactly one side no point is claimed by both.
        for (a, b, p) in [
            (IVec2::new(3, 7), IVec2::new(-41, 23), IVec2::new(9, -5)),
            (IVec2::new(1, 2), IVec2::new(30, 5), IVec2::new(-7, 11)),
            (IVec2::new(-13, -29), IVec2::new(17, 3), IVec2::new(40, 1)),
        ] {
            let sum = winding(a, b, p) + winding(b, a, p);
            assert!(sum == 0 || sum == -1, "sum was {sum}");
        }
    }

    #[test]
    fn top_left_classification() {
        // Left edge: heads down.
        assert!(is_top_or_left(px(0, 4), px(0, 0)));
        // Top edge: horizontal, heads left.
        assert!(is_top_or_left(px(4, 4), px(0, 4)));
        // Bottom edge of a CCW triangle heads right: not top-left.
        assert!(!is_top_or_left(px(0, 0), px(4, 0)));
        // Right edge heads up: not top-left.
        assert!(!is_top_or_left(px(4, 0), px(4, 4)));
    }
}
