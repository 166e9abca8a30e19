use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use glam::{Vec2, Vec3};
use image::RgbaImage;
use psychfluid::config::{DeviceClass, FluidConfig};
use psychfluid::forcing::SplatRequest;
use psychfluid::input::InputEvent;
use psychfluid::palette::PaletteName;
use psychfluid::simulation::{MAX_FRAME_DT, Simulation};
use psychfluid::solver::FluidSolver;

fn seeded_solver(config: &FluidConfig) -> FluidSolver {
    let mut solver = FluidSolver::with_cpu(1280, 720, config).unwrap();
    solver.splat(
        &SplatRequest::new(Vec2::new(0.5, 0.5), Vec2::new(400.0, 100.0), Vec3::new(1.0, 0.3, 0.1)),
        config,
    );
    for _ in 0..5 {
        solver.step(MAX_FRAME_DT, config);
    }
    solver
}

fn benchmark_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver_step");

    // Short-axis resolution of both grids.
    for resolution in [64.0f32, 128.0, 256.0] {
        group.bench_with_input(BenchmarkId::from_parameter(resolution), &resolution, |b, &resolution| {
            let config = FluidConfig {
                sim_resolution: resolution.min(128.0),
                dye_resolution: resolution,
                ..FluidConfig::default()
            };
            let mut solver = seeded_solver(&config);

            b.iter(|| {
                solver.step(black_box(MAX_FRAME_DT), &config);
            });
        });
    }
    group.finish();
}

fn benchmark_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("passes");
    let config = FluidConfig::default();

    group.bench_function("project_desktop", |b| {
        let mut solver = seeded_solver(&config);
        b.iter(|| solver.project(black_box(DeviceClass::Desktop.pressure_iterations())));
    });

    group.bench_function("project_mobile", |b| {
        let mut solver = seeded_solver(&config);
        b.iter(|| solver.project(black_box(DeviceClass::Mobile.pressure_iterations())));
    });

    group.bench_function("advect_dye", |b| {
        let mut solver = seeded_solver(&config);
        b.iter(|| solver.advect_dye(black_box(MAX_FRAME_DT), config.density_dissipation));
    });

    group.bench_function("curl_and_vorticity", |b| {
        let mut solver = seeded_solver(&config);
        b.iter(|| {
            solver.compute_curl(config.curl_radius);
            solver.apply_vorticity(black_box(30.0), MAX_FRAME_DT);
        });
    });

    group.bench_function("splat", |b| {
        let mut solver = seeded_solver(&config);
        let request = SplatRequest::new(Vec2::new(0.3, 0.7), Vec2::new(-200.0, 50.0), Vec3::new(0.2, 0.8, 0.4));
        b.iter(|| solver.splat(black_box(&request), &config));
    });

    group.finish();
}

fn benchmark_display(c: &mut Criterion) {
    let mut group = c.benchmark_group("display");
    let palette = PaletteName::Rainbow.colors();

    for posterize in [false, true] {
        group.bench_with_input(BenchmarkId::new("posterize", posterize), &posterize, |b, &posterize| {
            let config = FluidConfig {
                posterize,
                ..FluidConfig::default()
            };
            let solver = seeded_solver(&config);
            let (width, height) = solver.dye_size();
            let mut surface = RgbaImage::new(width as u32, height as u32);

            b.iter(|| solver.render(&config, palette, black_box(&mut surface)));
        });
    }
    group.finish();
}

fn benchmark_full_frame(c: &mut Criterion) {
    c.bench_function("frame_with_pointer_and_auto_splats", |b| {
        let mut sim = Simulation::cpu(1280, 720, FluidConfig::default(), DeviceClass::Desktop, 1).unwrap();
        sim.warm_up();
        sim.push_event(InputEvent::PointerDown {
            id: 0,
            position: Vec2::new(0.5, 0.5),
        });
        let mut t = 0.0f32;

        b.iter(|| {
            t += MAX_FRAME_DT;
            sim.push_event(InputEvent::PointerMove {
                id: 0,
                position: Vec2::new(0.5 + 0.3 * t.cos(), 0.5 + 0.3 * t.sin()),
            });
            black_box(sim.frame(MAX_FRAME_DT));
        });
    });
}

criterion_group!(benches, benchmark_step, benchmark_passes, benchmark_display, benchmark_full_frame);
criterion_main!(benches);
