//! Triangle traversal and shading
//!
//! The per-area driver: near/far reject, projection to fixed-point screen
//! coordinates, clipping, then an incremental edge walk over the bounding
//! box. Two traversals share the setup math: a scalar walk for the linear
//! layout and a 2x2 quad walk with a four-lane coverage and depth mask for
//! the swizzled layouts. Each covered pixel is depth-tested against the low
//! 24 bits of its depth word and, on pass, receives the nearest-neighbor
//! texel of the perspective-correct UV.

use glam::{IVec2, Vec2, Vec4};

use crate::clip::{ClipScratch, ClipVertex, GUARD_MIN, clip};
use crate::depth::{DEPTH_MASK, DEPTH_SCALE};
use crate::fixed::{SUB_HALF, SUB_ONE, to_fixed};
use crate::layout::{Layout, TILE_SIZE};
use crate::setup::TriangleSetup;
use crate::texture::Texture;

/// One batch of geometry sharing a texture: post-projection homogeneous
/// vertices, their UVs, and a CCW triangle index list.
pub struct DrawCall<'a> {
    pub vertices: &'a [Vec4],
    pub uvs: &'a [Vec2],
    pub indices: &'a [u32],
    pub texture: Texture<'a>,
}

/// Raw view of one frame's color and depth surfaces.
///
/// Holds pointers rather than slices so disjoint raster areas of the same
/// surface can be filled from several workers at once; every store goes
/// through the bounds-checked accessors below.
pub(crate) struct RenderContext {
    color: *mut u32,
    depth: *mut u32,
    len: usize,
    target: IVec2,
}

impl RenderContext {
    pub fn new(color: &mut [u32], depth: &mut [u32], target: IVec2, padded: IVec2) -> Self {
        let len = (padded.x * padded.y) as usize;
        debug_assert!(color.len() >= len, "color buffer smaller than {padded}");
        debug_assert!(depth.len() >= len, "depth buffer smaller than {padded}");
        Self {
            color: color.as_mut_ptr(),
            depth: depth.as_mut_ptr(),
            len,
            target,
        }
    }

    /// Build a context from raw parts.
    ///
    /// Safety: `color` and `depth` must stay valid for `len` words for the
    /// context's lifetime, and no other context may touch the raster areas
    /// this one is handed.
    pub unsafe fn from_raw(color: *mut u32, depth: *mut u32, len: usize, target: IVec2) -> Self {
        Self {
            color,
            depth,
            len,
            target,
        }
    }

    #[inline]
    pub fn target(&self) -> IVec2 {
        self.target
    }

    #[inline(always)]
    fn depth_at(&self, index: usize) -> u32 {
        debug_assert!(index < self.len);
        // Safety: index is within the allocation checked at construction.
        unsafe { *self.depth.add(index) }
    }

    #[inline(always)]
    fn write(&self, index: usize, texel: u32, z: u32) {
        debug_assert!(index < self.len);
        // Safety: as for depth_at; the scheduler guarantees no two workers
        // share an index.
        unsafe {
            *self.depth.add(index) = z;
            *self.color.add(index) = texel;
        }
    }
}

/// Rasterize one draw call into one raster area.
///
/// The area is inclusive on both ends and owned exclusively by the caller
/// for the duration; in quad mode it must be even-aligned (min) and odd-ended
/// (max), and in tiled mode exactly one tile.
pub(crate) fn rasterize_area<L: Layout>(
    ctx: &RenderContext,
    area_min: IVec2,
    area_max: IVec2,
    call: &DrawCall<'_>,
    scratch: &mut ClipScratch,
) {
    let target = ctx.target();
    debug_assert!(call.indices.len() % 3 == 0, "index count not a triangle list");
    debug_assert!(call.uvs.len() >= call.vertices.len(), "missing UVs");
    debug_assert!(
        target.x <= 2 * -GUARD_MIN && target.y <= 2 * -GUARD_MIN,
        "render target larger than the guard band"
    );
    debug_assert!(area_min.x >= 0 && area_min.y >= 0, "area below the target");
    debug_assert!(
        area_min.x < area_max.x && area_min.y < area_max.y,
        "inverted raster area"
    );
    if !L::TILED {
        debug_assert!(
            area_max.x < target.x && area_max.y < target.y,
            "area beyond the target"
        );
    }
    if L::QUADS {
        // The quad snap aligns in center-origin coordinates, so quad parity
        // only matches the storage when the half-extents are even.
        debug_assert!(
            target.x % 4 == 0 && target.y % 4 == 0,
            "quad-mode targets must be multiples of four"
        );
        debug_assert!(
            area_min.x % 2 == 0 && area_min.y % 2 == 0,
            "quad-mode area min must be even"
        );
        debug_assert!(
            area_max.x % 2 == 1 && area_max.y % 2 == 1,
            "quad-mode area max must be odd"
        );
    }
    if L::TILED {
        debug_assert!(
            area_min.x % TILE_SIZE == 0 && area_min.y % TILE_SIZE == 0,
            "tiled areas must be tile-aligned"
        );
        debug_assert!(
            area_max.x - area_min.x == TILE_SIZE - 1 && area_max.y - area_min.y == TILE_SIZE - 1,
            "tiled areas must be tile-sized"
        );
    }

    let half = IVec2::new(target.x / 2, target.y / 2);
    // Raster area in fixed-point, centered coordinates.
    let rast_min = IVec2::new(
        to_fixed((area_min.x - half.x) as f32),
        to_fixed((area_min.y - half.y) as f32),
    );
    let rast_max = IVec2::new(
        to_fixed((area_max.x - half.x) as f32),
        to_fixed((area_max.y - half.y) as f32),
    );

    for tri in call.indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let (a, b, c) = (call.vertices[i0], call.vertices[i1], call.vertices[i2]);

        // Triangles straddling the near or far plane are dropped whole rather
        // than clipped in z.
        if a.z < 0.0 || a.z > a.w || b.z < 0.0 || b.z > b.w || c.z < 0.0 || c.z > c.w {
            continue;
        }

        scratch.load(
            project(a, call.uvs[i0], half),
            project(b, call.uvs[i1], half),
            project(c, call.uvs[i2], half),
        );
        if !clip(scratch, rast_min, rast_max) {
            continue;
        }

        for fan in 0..scratch.index_count / 3 {
            let v0 = scratch.verts[scratch.indices[fan * 3]];
            let v1 = scratch.verts[scratch.indices[fan * 3 + 1]];
            let v2 = scratch.verts[scratch.indices[fan * 3 + 2]];
            let Some(setup) = TriangleSetup::new(&v0, &v1, &v2, rast_min, rast_max, L::QUADS)
            else {
                continue;
            };
            if L::QUADS {
                fill_quad::<L>(ctx, &setup, &call.texture, half);
            } else {
                fill_scalar::<L>(ctx, &setup, &call.texture, half);
            }
        }
    }
}

/// Rasterize one draw call into one raster area of the given surface layout.
///
/// The explicit-layout entry point; `crate::rasterize` forwards here with the
/// build's default layout. Creates the clip scratch on the stack, so repeated
/// callers that care should prefer the worker pool, which reuses one per
/// thread.
pub fn rasterize_with<L: Layout>(
    color: &mut [u32],
    depth: &mut [u32],
    target_size: IVec2,
    area_min: IVec2,
    area_max: IVec2,
    call: &DrawCall<'_>,
) {
    let mut scratch = ClipScratch::new();
    let ctx = RenderContext::new(color, depth, target_size, L::padded(target_size));
    rasterize_area::<L>(&ctx, area_min, area_max, call, &mut scratch);
}

/// Project one homogeneous vertex to a clip vertex: fixed-point screen
/// position, normalized depth, reciprocal w. Assumes frustum-accepted input
/// with w > 0.
#[inline]
fn project(v: Vec4, uv: Vec2, half: IVec2) -> ClipVertex {
    ClipVertex {
        pos: IVec2::new(
            to_fixed(v.x / v.w * half.x as f32),
            to_fixed(v.y / v.w * half.y as f32),
        ),
        z: v.z / v.w,
        w_recip: 1.0 / v.w,
        uv,
    }
}

/// Scalar traversal: one pixel center per step.
fn fill_scalar<L: Layout>(ctx: &RenderContext, tri: &TriangleSetup, texture: &Texture<'_>, half: IVec2) {
    let target = ctx.target();
    let mut w_row = tri.w_row;

    let mut py = (tri.min.y - SUB_HALF) / SUB_ONE + half.y;
    let mut y = tri.min.y;
    while y <= tri.max.y {
        let mut w = w_row;
        let mut px = (tri.min.x - SUB_HALF) / SUB_ONE + half.x;
        let mut x = tri.min.x;
        while x <= tri.max.x {
            // All three edge values non-negative: one sign test on the OR.
            if (w[0] | w[1] | w[2]) >= 0 {
                let w0 = (w[0] as f32 * tri.inv_area).min(1.0);
                let w1 = (w[1] as f32 * tri.inv_area).min(1.0);
                let w2 = (1.0 - w0 - w1).max(0.0);

                let z = ((tri.z0 + w1 * tri.dz1 + w2 * tri.dz2) * DEPTH_SCALE) as u32;
                let index = L::pixel_index(target, px, py);
                if z < (ctx.depth_at(index) & DEPTH_MASK) {
                    let interp_w =
                        tri.w_recip[0] * w0 + tri.w_recip[1] * w1 + tri.w_recip[2] * w2;
                    let u = (tri.uv0.x + w1 * tri.duv1.x + w2 * tri.duv2.x) / interp_w;
                    let v = (tri.uv0.y + w1 * tri.duv1.y + w2 * tri.duv2.y) / interp_w;
                    ctx.write(index, texture.fetch(u, v), z);
                }
            }

            w[0] += tri.step_x[0];
            w[1] += tri.step_x[1];
            w[2] += tri.step_x[2];
            x += SUB_ONE;
            px += 1;
        }

        w_row[0] += tri.step_y[0];
        w_row[1] += tri.step_y[1];
        w_row[2] += tri.step_y[2];
        y += SUB_ONE;
        py += 1;
    }
}

/// Four lane values for one edge at a quad origin: the lanes visit
/// `(0,0), (+1,0), (0,+1), (+1,+1)` in pixels.
#[inline(always)]
fn quad_lanes(row: i32, step_x: i32, step_y: i32) -> [i32; 4] {
    [row, row + step_x, row + step_y, row + step_y + step_x]
}

/// Quad traversal: a 2x2 block of pixel centers per step, with a four-lane
/// mask combining the edge test and the depth test. Semantically identical to
/// the scalar walk; lane arithmetic is written per-lane over fixed arrays so
/// the compiler can keep it in vector registers.
fn fill_quad<L: Layout>(ctx: &RenderContext, tri: &TriangleSetup, texture: &Texture<'_>, half: IVec2) {
    let target = ctx.target();
    let step2_x = [tri.step_x[0] * 2, tri.step_x[1] * 2, tri.step_x[2] * 2];
    let step2_y = [tri.step_y[0] * 2, tri.step_y[1] * 2, tri.step_y[2] * 2];

    let mut w0_row = tri.w_row[0];
    let mut w1_row = tri.w_row[1];
    let mut w2_row = tri.w_row[2];

    let mut py = (tri.min.y - SUB_HALF) / SUB_ONE + half.y;
    let mut y = tri.min.y;
    while y <= tri.max.y {
        let mut w0 = quad_lanes(w0_row, tri.step_x[0], tri.step_y[0]);
        let mut w1 = quad_lanes(w1_row, tri.step_x[1], tri.step_y[1]);
        let mut w2 = quad_lanes(w2_row, tri.step_x[2], tri.step_y[2]);

        let mut px = (tri.min.x - SUB_HALF) / SUB_ONE + half.x;
        let mut x = tri.min.x;
        while x <= tri.max.x {
            let mut covered = [false; 4];
            let mut any = false;
            for lane in 0..4 {
                covered[lane] = (w0[lane] | w1[lane] | w2[lane]) >= 0;
                any |= covered[lane];
            }

            if any {
                let indices = L::quad_indices(target, px, py);

                let mut w0f = [0.0f32; 4];
                let mut w1f = [0.0f32; 4];
                let mut w2f = [0.0f32; 4];
                let mut z = [0u32; 4];
                for lane in 0..4 {
                    w0f[lane] = (w0[lane] as f32 * tri.inv_area).min(1.0);
                    w1f[lane] = (w1[lane] as f32 * tri.inv_area).min(1.0);
                    w2f[lane] = (1.0 - w0f[lane] - w1f[lane]).max(0.0);
                    z[lane] =
                        ((tri.z0 + w1f[lane] * tri.dz1 + w2f[lane] * tri.dz2) * DEPTH_SCALE) as u32;
                }

                let mut pass = [false; 4];
                let mut any_pass = false;
                for lane in 0..4 {
                    pass[lane] =
                        covered[lane] && z[lane] < (ctx.depth_at(indices[lane]) & DEPTH_MASK);
                    any_pass |= pass[lane];
                }

                if any_pass {
                    for lane in 0..4 {
                        if !pass[lane] {
                            continue;
                        }
                        let interp_w = tri.w_recip[0] * w0f[lane]
                            + tri.w_recip[1] * w1f[lane]
                            + tri.w_recip[2] * w2f[lane];
                        let u =
                            (tri.uv0.x + w1f[lane] * tri.duv1.x + w2f[lane] * tri.duv2.x) / interp_w;
                        let v =
                            (tri.uv0.y + w1f[lane] * tri.duv1.y + w2f[lane] * tri.duv2.y) / interp_w;
                        ctx.write(indices[lane], texture.fetch(u, v), z[lane]);
                    }
                }
            }

            for lane in 0..4 {
                w0[lane] += step2_x[0];
                w1[lane] += step2_x[1];
                w2[lane] += step2_x[2];
            }
            x += 2 * SUB_ONE;
            px += 2;
        }

        w0_row += step2_y[0];
        w1_row += step2_y[1];
        w2_row += step2_y[2];
        y += 2 * SUB_ONE;
        py += 2;
    }
}
