//! Tile-parallel software triangle rasterizer
//!
//! Consumes post-projection homogeneous vertices, UVs and CCW triangle
//! indices and writes perspective-correct, depth-tested, nearest-neighbor
//! textured pixels into a 32-bit color buffer with a paired 24-bit depth
//! buffer.
//!
//! The pipeline per triangle: near/far reject, projection to 1/16-pixel
//! fixed point, guard-band clipping (Sutherland-Hodgman past a +/-2048 pixel
//! band), incremental edge-function traversal with the top-left fill rule,
//! and a scalar or 2x2-quad shading loop. Frames parallelize over disjoint
//! raster areas through [`WorkerPool`]; within one worker draw order is
//! preserved and the depth test decides visibility.
//!
//! Cargo features pick the build's traversal and surface layout, mirroring
//! the capability queries:
//!
//! - `simd` (default): quad traversal over quad-swizzled surfaces.
//! - `tiles`: quad traversal over 64x64-tiled surfaces, padded per axis.
//! - neither: scalar traversal over plain row-major surfaces.
//!
//! Color is `0x00RRGGBB` throughout; there is no alpha in this path.

pub mod clip;
pub mod depth;
pub mod fixed;
pub mod layout;
pub mod pool;
pub mod raster;
pub mod setup;
pub mod texture;
pub mod tiles;

pub use depth::clear_depth_buffer;
pub use layout::{Layout, Linear, Quad, TiledQuad, deswizzle};
pub use pool::{PoolError, WorkerPool};
pub use raster::{DrawCall, rasterize_with};
pub use texture::Texture;
pub use tiles::RasterArea;

use glam::IVec2;

/// The layout selected by the build's feature set.
#[cfg(feature = "tiles")]
pub type DefaultLayout = layout::TiledQuad;
#[cfg(all(feature = "simd", not(feature = "tiles")))]
pub type DefaultLayout = layout::Quad;
#[cfg(not(feature = "simd"))]
pub type DefaultLayout = layout::Linear;

/// Rasterize one draw call into one raster area using the build's default
/// layout. Area bounds are inclusive; in SIMD builds the minimum must be even
/// and the maximum odd on both axes, and in tiled builds the area must be one
/// tile of the padded surface.
pub fn rasterize(
    color: &mut [u32],
    depth: &mut [u32],
    target_size: IVec2,
    area_min: IVec2,
    area_max: IVec2,
    call: &DrawCall<'_>,
) {
    rasterize_with::<DefaultLayout>(color, depth, target_size, area_min, area_max, call);
}

/// Whether this build traverses 2x2 quads.
pub const fn uses_simd() -> bool {
    cfg!(feature = "simd")
}

/// Whether this build stores surfaces as 64x64 tiles.
pub const fn uses_tiles() -> bool {
    cfg!(feature = "tiles")
}

/// Tile edge length in pixels.
pub const fn tile_size() -> u32 {
    layout::TILE_SIZE as u32
}

/// Allocation size for a target under the build's default layout: the target
/// itself, or each axis rounded up to a tile multiple.
pub fn padded_size(target_size: IVec2) -> IVec2 {
    <DefaultLayout as Layout>::padded(target_size)
}
