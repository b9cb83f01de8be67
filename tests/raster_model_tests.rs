/// Clock-stepped tile model against the software scan converter
use std::collections::HashSet;

use glam::{vec3, vec4, Vec4};
use quad_setup::hw::{ControlState, QuadBufferCell, DEPTH_SCALE, QUAD_BUFFER_CAPACITY};
use quad_setup::setup::QuadCollector;
use quad_setup::*;

fn pos(x: f32, y: f32) -> [Vec4; 1] {
    [vec4(x, y, 0.0, 1.0)]
}

fn clipped_context(clip: Scissor) -> SetupContext {
    SetupContext::new(PipelineState::new(
        FramebufferState::with_size(512, 512).with_cliprect(clip),
    ))
}

fn collect_cells(model: &mut RasterModel, job: &RasterJob, clip: &Scissor) -> (usize, Vec<QuadBufferCell>) {
    let mut cells = Vec::new();
    let tiles = model
        .raster_triangle(job, clip, |buffer| cells.extend_from_slice(buffer.cells()))
        .unwrap();
    (tiles, cells)
}

#[test]
fn test_fully_covered_tile_matches_software() {
    let clip = Scissor::new(64, 64, 128, 128);
    let (a, b, c) = (pos(0.0, 0.0), pos(400.0, 0.0), pos(0.0, 400.0));

    let mut ctx = clipped_context(clip);
    let mut software = QuadCollector::new();
    ctx.setup_tri(&mut software, &a, &b, &c);

    let mut model = RasterModel::new();
    let mut hardware = QuadCollector::new();
    let outcome = ctx.raster_tri_model(&mut model, &mut hardware, &a, &b, &c).unwrap();
    assert_eq!(outcome, PrimOutcome::Rasterized);

    assert!(model.done());
    assert_eq!(model.state(), ControlState::Done);
    assert_eq!(hardware.quads.len(), QUAD_BUFFER_CAPACITY);
    assert!(hardware.quads.iter().all(|q| q.mask == 0xF));
    assert_eq!(hardware.quad_keys(), software.quad_keys());
    assert_eq!(ctx.stats().c_primitives, 2);
}

#[test]
fn test_every_tile_visited_once() {
    let clip = Scissor::new(64, 64, 192, 192);
    let job = RasterJob::new(vec3(0.0, 0.0, 0.0), vec3(1000.0, 0.0, 0.0), vec3(0.0, 1000.0, 0.0), &clip);
    let mut model = RasterModel::new();

    let mut origins = Vec::new();
    let tiles = model
        .raster_triangle(&job, &clip, |buffer| {
            assert_eq!(buffer.len(), QUAD_BUFFER_CAPACITY);
            origins.push((buffer.tile.x0, buffer.tile.y0));
        })
        .unwrap();
    assert_eq!(tiles, 4);
    assert_eq!(origins, vec![(64, 64), (128, 64), (64, 128), (128, 128)]);

    // Same result through setup, compared with software.
    let (a, b, c) = (pos(0.0, 0.0), pos(1000.0, 0.0), pos(0.0, 1000.0));
    let mut ctx = clipped_context(clip);
    let mut software = QuadCollector::new();
    let mut hardware = QuadCollector::new();
    ctx.setup_tri(&mut software, &a, &b, &c);
    ctx.raster_tri_model(&mut model, &mut hardware, &a, &b, &c).unwrap();
    assert_eq!(hardware.quads.len(), 4 * QUAD_BUFFER_CAPACITY);
    assert_eq!(hardware.quad_keys(), software.quad_keys());
}

#[test]
fn test_stored_quads_are_unique_and_inside_tile() {
    let clip = Scissor::new(0, 0, 128, 64);
    let job = RasterJob::new(vec3(3.0, 5.0, 0.0), vec3(120.0, 17.0, 0.0), vec3(40.0, 60.0, 0.0), &clip);
    let mut model = RasterModel::new();

    let mut seen = HashSet::new();
    let tiles = model
        .raster_triangle(&job, &clip, |buffer| {
            for cell in buffer.cells() {
                assert!(cell.x >= buffer.tile.x0 && cell.x <= buffer.tile.x1);
                assert!(cell.y >= buffer.tile.y0 && cell.y <= buffer.tile.y1);
                assert_ne!(cell.mask, 0);
                assert!(seen.insert((cell.x, cell.y)), "quad ({}, {}) stored twice", cell.x, cell.y);
            }
        })
        .unwrap();
    assert_eq!(tiles, 2);
    assert!(!seen.is_empty());
}

#[test]
fn test_interior_pixels_agree_with_software() {
    // Away from the edges both rasterizers must agree on full quads.
    let clip = Scissor::new(0, 0, 64, 64);
    let (a, b, c) = (pos(2.0, 2.0), pos(60.0, 6.0), pos(10.0, 58.0));

    let mut ctx = clipped_context(clip);
    let mut software = QuadCollector::new();
    let mut hardware = QuadCollector::new();
    let mut model = RasterModel::new();
    ctx.setup_tri(&mut software, &a, &b, &c);
    ctx.raster_tri_model(&mut model, &mut hardware, &a, &b, &c).unwrap();

    let full = |sink: &QuadCollector| -> HashSet<(i32, i32)> {
        sink.quads.iter().filter(|q| q.mask == 0xF).map(|q| (q.x0, q.y0)).collect()
    };
    let soft = full(&software);
    let hard = full(&hardware);
    let common = soft.intersection(&hard).count();
    assert!(common * 10 >= soft.len() * 9, "{common} of {} full quads shared", soft.len());
}

#[test]
fn test_depth_plane_matches_vertex_depths() {
    let clip = Scissor::new(0, 0, 64, 64);
    let (v0, v1, v2) = (vec3(0.0, 0.0, 0.25), vec3(32.0, 0.0, 0.5), vec3(0.0, 32.0, 0.75));
    let job = RasterJob::new(v0, v1, v2, &clip);

    let at = |x: u32, y: u32| job.depth.eval(x, y) as f32 / DEPTH_SCALE as f32;
    assert!((at(0, 0) - 0.25).abs() < 1e-3);
    assert!((at(32, 0) - 0.5).abs() < 1e-3);
    assert!((at(0, 32) - 0.75).abs() < 1e-3);
    assert!((at(16, 16) - 0.625).abs() < 1e-3);
}

/// Three collinear vertices enclose nothing, yet lanes exactly on their line
/// pass all three edge tests and are stored. The software path rejects the
/// same triangle as degenerate.
#[test]
fn test_collinear_triangle_stores_lanes_on_the_line() {
    let clip = Scissor::new(0, 0, 16, 16);
    let job = RasterJob::new(vec3(2.0, 2.0, 0.0), vec3(4.0, 4.0, 0.0), vec3(6.0, 6.0, 0.0), &clip);
    let mut model = RasterModel::new();

    let (tiles, cells) = collect_cells(&mut model, &job, &clip);
    assert_eq!(tiles, 1);
    let mut quads: Vec<_> = cells.iter().map(|c| (c.x, c.y, c.mask)).collect();
    quads.sort_unstable();
    let diagonal: Vec<_> = (0..=8u16).map(|i| (2 * i, 2 * i, 0b1001)).collect();
    assert_eq!(quads, diagonal);

    let mut ctx = clipped_context(clip);
    let (a, b, c) = (pos(2.0, 2.0), pos(4.0, 4.0), pos(6.0, 6.0));
    let mut sink = QuadCollector::new();
    let outcome = ctx.raster_tri_model(&mut model, &mut sink, &a, &b, &c).unwrap();
    assert_eq!(outcome, PrimOutcome::Degenerate);
    assert!(sink.quads.is_empty());
}

#[test]
fn test_independent_models_do_not_interfere() {
    let clip = Scissor::new(0, 0, 64, 64);
    let small = RasterJob::new(vec3(0.0, 0.0, 0.0), vec3(8.0, 0.0, 0.0), vec3(0.0, 8.0, 0.0), &clip);
    let large = RasterJob::new(vec3(0.0, 0.0, 0.0), vec3(200.0, 0.0, 0.0), vec3(0.0, 200.0, 0.0), &clip);
    let tile = Tile::first(&clip);

    let mut reference = RasterModel::new();
    let expected_small = reference.run_tile(&small, tile).unwrap().len();

    let mut first = RasterModel::new();
    let mut second = RasterModel::new();
    first.run_tile(&large, tile).unwrap();
    let got_small = second.run_tile(&small, tile).unwrap().len();
    let got_large = first.run_tile(&large, tile).unwrap().len();

    assert_eq!(got_small, expected_small);
    assert_eq!(got_large, QUAD_BUFFER_CAPACITY);
    assert!(second.half_cycles() < first.half_cycles());
}
