/// Demo entry point
/// Rasterizes a few primitives through every back end and prints the coverage
use std::collections::BTreeSet;
use std::time::Instant;

use glam::{vec4, Vec4};
use log::info;
use quad_setup::*;

const WIDTH: u32 = 48;
const HEIGHT: u32 = 24;

fn print_grid(title: &str, pixels: &[(i32, i32)]) {
    let covered: BTreeSet<_> = pixels.iter().copied().collect();
    println!("{title} ({} pixels)", covered.len());
    for y in 0..HEIGHT as i32 {
        let row: String = (0..WIDTH as i32)
            .map(|x| if covered.contains(&(x, y)) { '#' } else { '.' })
            .collect();
        println!("  {row}");
    }
    println!();
}

fn main() {
    let verbose = std::env::args().any(|arg| arg == "-v" || arg == "--verbose");
    let use_device = std::env::args().any(|arg| arg == "--device");

    let log_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    println!("=== Quad Setup - Primitive Setup Demo ===");
    println!("Options:");
    println!("  -v, --verbose  Debug logging");
    println!("  --device       Try the coprocessor at /dev/mem");
    println!();

    // Slot 0 is the position, slot 1 a colour.
    let linkage = ShaderLinkage::new(vec![
        FragmentInput::new(1, Interp::Perspective),
        FragmentInput::new(1, Interp::Constant),
    ]);
    let state = PipelineState::new(FramebufferState::with_size(WIDTH, HEIGHT)).with_linkage(linkage);

    let v0: [Vec4; 2] = [vec4(3.0, 2.0, 0.2, 1.0), vec4(1.0, 0.0, 0.0, 1.0)];
    let v1: [Vec4; 2] = [vec4(44.0, 6.0, 0.5, 1.0), vec4(0.0, 1.0, 0.0, 1.0)];
    let v2: [Vec4; 2] = [vec4(14.0, 21.0, 0.8, 1.0), vec4(0.0, 0.0, 1.0, 1.0)];

    let mut ctx = SetupContext::new(state);

    // Software scan conversion
    let mut software = QuadCollector::new();
    ctx.prepare(&mut software);
    let start = Instant::now();
    let outcome = ctx.setup_tri(&mut software, &v0, &v1, &v2);
    println!(
        "Software triangle: {:?} in {}μs, {} quads in {} batches",
        outcome,
        start.elapsed().as_micros(),
        software.quads.len(),
        software.batches
    );
    if let Some(interp) = &software.last_interp {
        let colour = interp.inputs[0].eval(20.0, 10.0);
        println!("  colour/w at (20, 10): {colour:.3}");
    }
    print_grid("Software", &software.covered_pixels());

    // Clock-stepped model
    let mut model = QuadCollector::new();
    let mut router: TriangleRouter<SimulatedCoprocessor> = TriangleRouter::new(RasterPath::Model);
    let start = Instant::now();
    let outcome = router.setup_tri(&mut ctx, &mut model, &v0, &v1, &v2);
    println!(
        "Model triangle: {:?} in {}μs, {} quads",
        outcome,
        start.elapsed().as_micros(),
        model.quads.len()
    );
    print_grid("Model", &model.covered_pixels());

    // Register protocol against the simulated device
    let mut simulated = QuadCollector::new();
    let mut router = TriangleRouter::with_coprocessor(Coprocessor::new(SimulatedCoprocessor::new()));
    let start = Instant::now();
    let outcome = router.setup_tri(&mut ctx, &mut simulated, &v0, &v1, &v2);
    let handshakes = router.coprocessor().map_or(0, Coprocessor::handshakes);
    println!(
        "Simulated coprocessor: {:?} in {}μs, {} quads over {} handshakes",
        outcome,
        start.elapsed().as_micros(),
        simulated.quads.len(),
        handshakes
    );
    println!(
        "  model and simulated coprocessor agree: {}",
        model.quad_keys() == simulated.quad_keys()
    );

    let soft: BTreeSet<_> = software.covered_pixels().into_iter().collect();
    let hard: BTreeSet<_> = model.covered_pixels().into_iter().collect();
    println!(
        "  pixels only in software: {}, only in model: {}",
        soft.difference(&hard).count(),
        hard.difference(&soft).count()
    );
    println!();

    if use_device {
        let config = TransportConfig::default();
        info!("Opening coprocessor at {} + {:#x}", config.device.display(), config.base);
        let mut router = TriangleRouter::open(RasterPath::Coprocessor, &config);
        let mut device = QuadCollector::new();
        let outcome = router.setup_tri(&mut ctx, &mut device, &v0, &v1, &v2);
        println!(
            "Device triangle ({}): {:?}, {} quads",
            if router.has_coprocessor() { "coprocessor" } else { "software fallback" },
            outcome,
            device.quads.len()
        );
        println!();
    }

    // Lines and points
    let mut lines = QuadCollector::new();
    let ends = [
        ([vec4(1.0, 22.0, 0.0, 1.0), Vec4::ONE], [vec4(46.0, 1.0, 0.0, 1.0), Vec4::ZERO]),
        ([vec4(2.0, 2.0, 0.0, 1.0), Vec4::ONE], [vec4(2.0, 20.0, 0.0, 1.0), Vec4::ZERO]),
    ];
    for (a, b) in &ends {
        ctx.setup_line(&mut lines, a, b);
    }

    let mut rast = ctx.state().rasterizer.clone();
    rast.point_size = 5.0;
    ctx.set_state(ctx.state().clone().with_rasterizer(rast));
    ctx.prepare(&mut lines);
    let point = [vec4(36.5, 17.5, 0.0, 1.0), Vec4::ONE];
    ctx.setup_point(&mut lines, &point);
    print_grid("Lines and a square point", &lines.covered_pixels());

    println!("Primitives rasterized: {}", ctx.stats().c_primitives);

    #[cfg(feature = "profiling")]
    RASTER_COUNTERS.snapshot().print_report();
}
