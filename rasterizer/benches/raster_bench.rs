//! Traversal throughput
//!
//! Fills the same large triangle through the scalar and quad walks so the
//! two inner loops can be compared directly, independent of the crate's
//! feature selection.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::{IVec2, Vec2, Vec4};
use rasterizer::{DrawCall, Linear, Quad, Texture, clear_depth_buffer, rasterize_with};

const TARGET: IVec2 = IVec2::new(256, 256);

fn call_buffers() -> (Vec<Vec4>, Vec<Vec2>, Vec<u32>, Vec<u32>) {
    let vertices = vec![
        Vec4::new(-0.9, -0.9, 0.5, 1.0),
        Vec4::new(0.9, -0.9, 0.5, 1.0),
        Vec4::new(0.0, 0.9, 0.5, 1.0),
    ];
    let uvs = vec![Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(0.5, 0.0)];
    let indices = vec![0u32, 1, 2];
    let texels = vec![0x0000FF00u32; 64 * 64];
    (vertices, uvs, indices, texels)
}

fn traversal(c: &mut Criterion) {
    let (vertices, uvs, indices, texels) = call_buffers();
    let len = (TARGET.x * TARGET.y) as usize;
    let mut color = vec![0u32; len];
    let mut depth = vec![0u32; len];

    let mut group = c.benchmark_group("traversal");
    group.bench_function("scalar", |b| {
        b.iter(|| {
            clear_depth_buffer(&mut depth, TARGET);
            rasterize_with::<Linear>(
                black_box(&mut color),
                &mut depth,
                TARGET,
                IVec2::ZERO,
                TARGET - 1,
                &DrawCall {
                    vertices: &vertices,
                    uvs: &uvs,
                    indices: &indices,
                    texture: Texture::new(&texels, IVec2::new(64, 64)),
                },
            );
        })
    });
    group.bench_function("quad", |b| {
        b.iter(|| {
            clear_depth_buffer(&mut depth, TARGET);
            rasterize_with::<Quad>(
                black_box(&mut color),
                &mut depth,
                TARGET,
                IVec2::ZERO,
                TARGET - 1,
                &DrawCall {
                    vertices: &vertices,
                    uvs: &uvs,
                    indices: &indices,
                    texture: Texture::new(&texels, IVec2::new(64, 64)),
                },
            );
        })
    });
    group.finish();
}

criterion_group!(benches, traversal);
criterion_main!(benches);
