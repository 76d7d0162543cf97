//! Surface layouts
//!
//! The color and depth buffers share one of three storage arrangements. The
//! swizzle is a property of the storage, not of the traversal: every layout
//! answers the same index queries, and the traversal is written once against
//! this trait.
//!
//! - `Linear`: row-major pixels, memory row 0 at the top of the image, y-up
//!   clip coordinates. Row base for pixel `(px, py)` is `(h - 1 - py) * w + px`.
//! - `Quad`: pixels grouped in 2x2 quads of four consecutive words. A quad
//!   record stores `[TL, TR, BL, BR]` in image orientation; quads are
//!   row-major over the image.
//! - `TiledQuad`: the quad arrangement inside `TILE_SIZE`-square tiles,
//!   tiles row-major over the image. Surfaces are allocated at the padded
//!   size, a tile multiple per axis.

use glam::IVec2;

/// Tile edge in pixels for the tiled layout. 64x64 keeps a tile's color and
/// depth rows inside L1.
pub const TILE_SIZE: i32 = 64;

/// Storage arrangement of a color or depth surface.
///
/// `px`/`py` are clip-space pixel coordinates: `py` grows upward, `(0, 0)` is
/// the bottom-left pixel of the target.
pub trait Layout {
    /// Whether the traversal should walk 2x2 quads over this layout.
    const QUADS: bool;

    /// Whether surfaces are tiled (and therefore padded).
    const TILED: bool;

    /// Allocation size for a target: the target itself, or the target rounded
    /// up to a tile multiple per axis.
    fn padded(target: IVec2) -> IVec2;

    /// Word index of a single pixel.
    fn pixel_index(target: IVec2, px: i32, py: i32) -> usize;

    /// Word indices of the four pixels of the quad with bottom-left corner
    /// `(px, py)` (both even), for lane order
    /// `[(0, 0), (+1, 0), (0, +1), (+1, +1)]` in y-up quad-relative steps.
    fn quad_indices(target: IVec2, px: i32, py: i32) -> [usize; 4];
}

/// Plain row-major storage.
pub struct Linear;

impl Layout for Linear {
    const QUADS: bool = false;
    const TILED: bool = false;

    #[inline]
    fn padded(target: IVec2) -> IVec2 {
        target
    }

    #[inline(always)]
    fn pixel_index(target: IVec2, px: i32, py: i32) -> usize {
        debug_assert!(px >= 0 && px < target.x && py >= 0 && py < target.y);
        ((target.y - 1 - py) * target.x + px) as usize
    }

    #[inline(always)]
    fn quad_indices(target: IVec2, px: i32, py: i32) -> [usize; 4] {
        [
            Self::pixel_index(target, px, py),
            Self::pixel_index(target, px + 1, py),
            Self::pixel_index(target, px, py + 1),
            Self::pixel_index(target, px + 1, py + 1),
        ]
    }
}

/// 2x2 quad-swizzled storage.
pub struct Quad;

/// Record slot of a pixel inside its `[TL, TR, BL, BR]` quad, from image-space
/// coordinates.
#[inline(always)]
fn quad_slot(img_y: i32, px: i32) -> usize {
    ((img_y & 1) * 2 + (px & 1)) as usize
}

impl Layout for Quad {
    const QUADS: bool = true;
    const TILED: bool = false;

    #[inline]
    fn padded(target: IVec2) -> IVec2 {
        target
    }

    #[inline(always)]
    fn pixel_index(target: IVec2, px: i32, py: i32) -> usize {
        debug_assert!(px >= 0 && px < target.x && py >= 0 && py < target.y);
        let img_y = target.y - 1 - py;
        let base = ((img_y / 2) * (target.x / 2) + px / 2) * 4;
        base as usize + quad_slot(img_y, px)
    }

    #[inline(always)]
    fn quad_indices(target: IVec2, px: i32, py: i32) -> [usize; 4] {
        debug_assert!(px % 2 == 0 && py % 2 == 0, "quad origin must be even");
        debug_assert!(target.x % 2 == 0 && target.y % 2 == 0);
        // Image row of the quad's top pixel row; py is the quad's bottom row
        // in clip space.
        let img_top = target.y - 2 - py;
        let base = (((img_top / 2) * (target.x / 2) + px / 2) * 4) as usize;
        // Lanes walk the quad bottom-up; the record stores top row first.
        [base + 2, base + 3, base, base + 1]
    }
}

/// Quad-swizzled storage inside row-major tiles, padded to tile multiples.
pub struct TiledQuad;

impl Layout for TiledQuad {
    const QUADS: bool = true;
    const TILED: bool = true;

    #[inline]
    fn padded(target: IVec2) -> IVec2 {
        IVec2::new(
            target.x + (TILE_SIZE - target.x % TILE_SIZE) % TILE_SIZE,
            target.y + (TILE_SIZE - target.y % TILE_SIZE) % TILE_SIZE,
        )
    }

    #[inline(always)]
    fn pixel_index(target: IVec2, px: i32, py: i32) -> usize {
        let padded = Self::padded(target);
        debug_assert!(px >= 0 && px < padded.x && py >= 0 && py < padded.y);
        let img_y = padded.y - 1 - py;
        let tile = (img_y / TILE_SIZE) * (padded.x / TILE_SIZE) + px / TILE_SIZE;
        let local_x = px % TILE_SIZE;
        let local_y = img_y % TILE_SIZE;
        let quad = (local_y / 2) * (TILE_SIZE / 2) + local_x / 2;
        (tile * TILE_SIZE * TILE_SIZE + quad * 4) as usize + quad_slot(local_y, local_x)
    }

    #[inline(always)]
    fn quad_indices(target: IVec2, px: i32, py: i32) -> [usize; 4] {
        debug_assert!(px % 2 == 0 && py % 2 == 0, "quad origin must be even");
        let padded = Self::padded(target);
        let img_top = padded.y - 2 - py;
        let tile = (img_top / TILE_SIZE) * (padded.x / TILE_SIZE) + px / TILE_SIZE;
        let local_x = px % TILE_SIZE;
        let local_y = img_top % TILE_SIZE;
        let quad = (local_y / 2) * (TILE_SIZE / 2) + local_x / 2;
        let base = (tile * TILE_SIZE * TILE_SIZE + quad * 4) as usize;
        [base + 2, base + 3, base, base + 1]
    }
}

/// Rewrite a swizzled (and possibly padded) surface into `Linear` order,
/// cropping any tile padding. `dst` is `target.x * target.y` words.
pub fn deswizzle<L: Layout>(src: &[u32], dst: &mut [u32], target: IVec2) {
    let (w, h) = (target.x, target.y);
    debug_assert!(dst.len() >= (w * h) as usize);
    for py in 0..h {
        let row = ((h - 1 - py) * w) as usize;
        for px in 0..w {
            dst[row + px as usize] = src[L::pixel_index(target, px, py)];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_row_base_is_bottom_left_origin() {
        let size = IVec2::new(8, 4);
        assert_eq!(Linear::pixel_index(size, 0, 0), 3 * 8);
        assert_eq!(Linear::pixel_index(size, 7, 3), 7);
    }

    #[test]
    fn quad_records_are_contiguous() {
        let size = IVec2::new(8, 8);
        let idx = Quad::quad_indices(size, 2, 4);
        let base = *idx.iter().min().unwrap();
        assert_eq!(base % 4, 0);
        let mut sorted = idx;
        sorted.sort_unstable();
        assert_eq!(sorted, [base, base + 1, base + 2, base + 3]);
        // Lane (0,1) is the top-left pixel of the quad, stored first.
        assert_eq!(idx[2], base);
    }

    #[test]
    fn quad_pixel_index_matches_quad_indices() {
        let size = IVec2::new(8, 8);
        for py in (0..8).step_by(2) {
            for px in (0..8).step_by(2) {
                let quad = Quad::quad_indices(size, px, py);
                assert_eq!(quad[0], Quad::pixel_index(size, px, py));
                assert_eq!(quad[1], Quad::pixel_index(size, px + 1, py));
                assert_eq!(quad[2], Quad::pixel_index(size, px, py + 1));
                assert_eq!(quad[3], Quad::pixel_index(size, px + 1, py + 1));
            }
        }
    }

    #[test]
    fn tiled_padding_rounds_up_per_axis() {
        assert_eq!(
            TiledQuad::padded(IVec2::new(100, 64)),
            IVec2::new(128, 64)
        );
        assert_eq!(
            TiledQuad::padded(IVec2::new(128, 130)),
            IVec2::new(128, 192)
        );
    }

    #[test]
    fn tiled_indices_cover_every_word_once() {
        let target = IVec2::new(100, 60);
        let padded = TiledQuad::padded(target);
        let words = (padded.x * padded.y) as usize;
        let mut seen = vec![false; words];
        for py in 0..padded.y {
            for px in 0..padded.x {
                let idx = TiledQuad::pixel_index(target, px, py);
                assert!(!seen[idx], "index {idx} hit twice");
                seen[idx] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn deswizzle_quads_restores_linear_order() {
        let target = IVec2::new(4, 4);
        // Write each pixel's linear index through the Quad layout, then
        // deswizzle and expect the identity image.
        let mut quad_buf = vec![0u32; 16];
        for py in 0..4 {
            for px in 0..4 {
                let linear = Linear::pixel_index(target, px, py) as u32;
                quad_buf[Quad::pixel_index(target, px, py)] = linear;
            }
        }
        let mut out = vec![0u32; 16];
        deswizzle::<Quad>(&quad_buf, &mut out, target);
        let expect: Vec<u32> = (0..16).collect();
        assert_eq!(out, expect);
    }
}
