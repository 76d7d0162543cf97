//! Raster areas and frame partitioning
//!
//! A raster area is the rectangle of pixels one worker owns exclusively for a
//! frame. Non-tiled targets split into worker columns with an upper and lower
//! half; tiled targets enumerate every tile of the padded surface. Areas are
//! handed to workers round-robin, so a worker may own several disjoint tiles.

use glam::IVec2;

use crate::layout::{Layout, TILE_SIZE};

/// An axis-aligned pixel rectangle, inclusive on both ends, in y-up target
/// coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterArea {
    pub min: IVec2,
    pub max: IVec2,
}

impl RasterArea {
    pub fn new(min: IVec2, max: IVec2) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y);
        Self { min, max }
    }
}

/// Compute the frame's raster areas for a worker count.
///
/// Tiled layouts get one area per tile of the padded surface, row-major.
/// Otherwise the target splits into exactly `workers` rectangles, one per
/// worker: columns of roughly equal width split into an upper and lower
/// half, with an odd worker taking a full-height column. Boundaries are kept
/// even so quad-mode alignment holds. (Targets too small to split that far
/// yield fewer areas and leave the surplus workers idle.)
pub fn frame_areas<L: Layout>(target: IVec2, workers: usize) -> Vec<RasterArea> {
    if L::TILED {
        let padded = L::padded(target);
        let mut areas =
            Vec::with_capacity(((padded.x / TILE_SIZE) * (padded.y / TILE_SIZE)) as usize);
        let mut ty = 0;
        while ty < padded.y {
            let mut tx = 0;
            while tx < padded.x {
                areas.push(RasterArea::new(
                    IVec2::new(tx, ty),
                    IVec2::new(tx + TILE_SIZE - 1, ty + TILE_SIZE - 1),
                ));
                tx += TILE_SIZE;
            }
            ty += TILE_SIZE;
        }
        return areas;
    }

    let (w, h) = (target.x, target.y);
    let workers = workers.max(1) as i32;

    let min_col_width = if L::QUADS { 2 } else { 1 };
    let cols = ((workers as u32).div_ceil(2) as i32).min((w / min_col_width).max(1));
    // The first `split_cols` columns contribute an upper and a lower
    // rectangle; the rest stay full height, so the count comes out at
    // exactly `workers` whenever the target is large enough.
    let can_split = h >= 2 * min_col_width;
    let split_cols = if can_split {
        (workers - cols).clamp(0, cols)
    } else {
        0
    };
    let mid = if L::QUADS { (h / 2) & !1 } else { h / 2 };

    let mut areas = Vec::with_capacity(workers as usize);
    for c in 0..cols {
        let mut x0 = w * c / cols;
        let mut x1 = w * (c + 1) / cols;
        if L::QUADS {
            x0 &= !1;
            if c + 1 < cols {
                x1 &= !1;
            }
        }
        if c < split_cols {
            areas.push(RasterArea::new(
                IVec2::new(x0, 0),
                IVec2::new(x1 - 1, mid - 1),
            ));
            areas.push(RasterArea::new(
                IVec2::new(x0, mid),
                IVec2::new(x1 - 1, h - 1),
            ));
        } else {
            areas.push(RasterArea::new(IVec2::new(x0, 0), IVec2::new(x1 - 1, h - 1)));
        }
    }
    areas
}
