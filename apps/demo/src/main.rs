//! Textured scene demo
//!
//! Builds a small perspective scene (a checkered floor and a spinning-cube
//! pose), pushes it through the worker pool, deswizzles the surface and
//! writes `demo.png`. Camera and matrix math stay in this layer; the
//! rasterizer only ever sees post-projection vertices.

use std::time::Instant;

use glam::{IVec2, Mat4, Vec2, Vec3, Vec4};
use rasterizer::{
    DefaultLayout, DrawCall, Texture, WorkerPool, clear_depth_buffer, deswizzle, padded_size,
    rasterize_with,
};

const TARGET: IVec2 = IVec2::new(640, 480);

/// Procedural checkerboard in `0x00RRGGBB`.
fn checker_texture(size: i32, cell: i32, a: u32, b: u32) -> Vec<u32> {
    let mut texels = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            texels.push(if on { a } else { b });
        }
    }
    texels
}

/// Unit cube centered at the origin: 24 vertices (4 per face) and 36 CCW
/// indices, each face mapping the full texture.
fn cube_mesh() -> (Vec<Vec3>, Vec<Vec2>, Vec<u32>) {
    // (normal axis, sign) per face; vertices wound CCW seen from outside.
    let faces: [[Vec3; 4]; 6] = [
        // +z
        [
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ],
        // -z
        [
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
        ],
        // +x
        [
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(0.5, 0.5, 0.5),
        ],
        // -x
        [
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, -0.5),
        ],
        // +y
        [
            Vec3::new(-0.5, 0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
        ],
        // -y
        [
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(-0.5, -0.5, 0.5),
        ],
    ];

    let mut positions = Vec::with_capacity(24);
    let mut uvs = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for face in faces {
        let base = positions.len() as u32;
        positions.extend(face);
        uvs.extend([
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ]);
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (positions, uvs, indices)
}

/// Floor quad in world space. Kept small enough that no corner falls behind
/// the near plane from the demo camera; straddling triangles would be
/// dropped whole.
fn floor_mesh() -> (Vec<Vec3>, Vec<Vec2>, Vec<u32>) {
    let s = 4.0;
    (
        vec![
            Vec3::new(-s, 0.0, s),
            Vec3::new(s, 0.0, s),
            Vec3::new(s, 0.0, -s),
            Vec3::new(-s, 0.0, -s),
        ],
        vec![
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ],
        vec![0, 1, 2, 0, 2, 3],
    )
}

/// World positions to post-projection homogeneous vertices.
fn transform(positions: &[Vec3], mvp: Mat4) -> Vec<Vec4> {
    positions.iter().map(|&p| mvp * p.extend(1.0)).collect()
}

fn main() {
    env_logger::init();

    let padded = padded_size(TARGET);
    let surface = (padded.x * padded.y) as usize;
    let mut color = vec![0u32; surface];
    let mut depth = vec![0u32; surface];
    clear_depth_buffer(&mut depth, padded);

    // Camera: glam's perspective_rh maps depth to [0, 1], which is exactly
    // the 0 <= z <= w frustum convention the rasterizer assumes.
    let aspect = TARGET.x as f32 / TARGET.y as f32;
    let projection = Mat4::perspective_rh(60f32.to_radians(), aspect, 0.1, 100.0);
    let view = Mat4::look_at_rh(
        Vec3::new(5.0, 4.0, 6.0),
        Vec3::new(0.0, 0.4, 0.0),
        Vec3::Y,
    );
    let view_projection = projection * view;

    let (floor_pos, floor_uvs, floor_idx) = floor_mesh();
    let floor_verts = transform(&floor_pos, view_projection);
    let floor_tex = checker_texture(64, 8, 0x00D0D0D0, 0x00303840);

    let (cube_pos, cube_uvs, cube_idx) = cube_mesh();
    let cube_model = Mat4::from_translation(Vec3::new(0.0, 0.55, 0.0))
        * Mat4::from_rotation_y(35f32.to_radians());
    let cube_verts = transform(&cube_pos, view_projection * cube_model);
    let cube_tex = checker_texture(64, 16, 0x00C04828, 0x00E8D8B0);

    let calls = [
        DrawCall {
            vertices: &floor_verts,
            uvs: &floor_uvs,
            indices: &floor_idx,
            texture: Texture::new(&floor_tex, IVec2::new(64, 64)),
        },
        DrawCall {
            vertices: &cube_verts,
            uvs: &cube_uvs,
            indices: &cube_idx,
            texture: Texture::new(&cube_tex, IVec2::new(64, 64)),
        },
    ];

    let started = Instant::now();
    match WorkerPool::new() {
        Ok(mut pool) => {
            log::info!(
                "rendering {}x{} on {} workers (simd: {}, tiles: {})",
                TARGET.x,
                TARGET.y,
                pool.worker_count(),
                rasterizer::uses_simd(),
                rasterizer::uses_tiles(),
            );
            pool.render_frame(&mut color, &mut depth, TARGET, &calls);
        }
        Err(err) => {
            // Thread creation failing is the one startup error the scheduler
            // reports; fall back to walking the frame's areas inline.
            log::warn!("worker pool unavailable ({err}), rendering inline");
            for area in rasterizer::tiles::frame_areas::<DefaultLayout>(TARGET, 1) {
                for call in &calls {
                    rasterize_with::<DefaultLayout>(
                        &mut color, &mut depth, TARGET, area.min, area.max, call,
                    );
                }
            }
        }
    }
    log::info!("frame took {:.2?}", started.elapsed());

    // Deswizzle into a top-down linear image and save.
    let len = (TARGET.x * TARGET.y) as usize;
    let mut linear = vec![0u32; len];
    deswizzle::<DefaultLayout>(&color, &mut linear, TARGET);

    let img = image::RgbImage::from_fn(TARGET.x as u32, TARGET.y as u32, |x, y| {
        let word = linear[(y * TARGET.x as u32 + x) as usize];
        image::Rgb([(word >> 16) as u8, (word >> 8) as u8, word as u8])
    });
    match img.save("demo.png") {
        Ok(()) => log::info!("wrote demo.png"),
        Err(err) => {
            log::error!("failed to write demo.png: {err}");
            std::process::exit(1);
        }
    }
}
