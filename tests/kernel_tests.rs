use glam::{Vec2, Vec3};
use image::RgbaImage;
use psychfluid::config::FluidConfig;
use psychfluid::cpu::{CpuBackend, nearest_palette_color};
use psychfluid::field::{ChannelLayout, Field};
use psychfluid::kernel::{
    CompiledPass, DisplayParams, KernelBackend, KernelSet, PassName, PassParams, Target,
};
use psychfluid::solver::FluidSolver;

/// Compiles everything except one pass.
struct BrokenBackend {
    broken: PassName,
}

impl KernelBackend for BrokenBackend {
    fn label(&self) -> &str {
        "broken"
    }

    fn compile(&self, pass: PassName) -> anyhow::Result<CompiledPass> {
        if pass == self.broken {
            anyhow::bail!("no program for {}", pass);
        }
        Ok(CompiledPass::new(pass))
    }

    fn dispatch(&self, _pass: &CompiledPass, _inputs: &[&Field], _params: &PassParams, _target: Target<'_>) {}
}

fn cpu_kernels() -> KernelSet {
    KernelSet::compile(Box::new(CpuBackend::new())).unwrap()
}

fn display_params(palette: Vec<Vec3>, posterize: bool) -> PassParams {
    outlined_params(palette, posterize, 2.0, 16.0)
}

/// `canvas_width` sets the pixel size the outline thickness is measured in.
fn outlined_params(palette: Vec<Vec3>, posterize: bool, thickness: f32, canvas_width: f32) -> PassParams {
    PassParams::Display(DisplayParams {
        brightness: 1.0,
        normalize_hdr: true,
        posterize,
        palette,
        outline_thickness: thickness,
        canvas_texel: Vec2::splat(1.0 / canvas_width),
    })
}

#[test]
fn test_compile_failure_aborts_solver_construction() {
    let backend = BrokenBackend {
        broken: PassName::Vorticity,
    };
    let result = FluidSolver::new(Box::new(backend), 256, 256, &FluidConfig::default());

    let err = match result {
        Ok(_) => panic!("solver must not build with a missing pass"),
        Err(err) => format!("{err:#}"),
    };
    assert!(err.contains("vorticity"), "error should name the pass: {}", err);
    assert!(err.contains("broken"), "error should name the backend: {}", err);
}

#[test]
fn test_every_pass_compiles_on_cpu() {
    let kernels = cpu_kernels();
    assert_eq!(kernels.backend_label(), "cpu");

    for name in PassName::ALL {
        let pass = kernels.pass(name);
        assert_eq!(pass.name(), name);
        assert_eq!(pass.slots(), name.input_slots());
    }
    assert_eq!(kernels.pass(PassName::Advection).slots(), &["velocity", "source"]);
    assert!(PassName::Display.writes_surface());
    assert!(!PassName::Pressure.writes_surface());
}

#[test]
fn test_wrong_input_count_is_skipped() {
    let kernels = cpu_kernels();
    let velocity = Field::new(4, 4, ChannelLayout::Rg);
    let mut out = Field::new(4, 4, ChannelLayout::R);
    out.par_fill(|_, _| [7.0; 4]);

    kernels.run(&PassParams::Divergence, &[&velocity, &velocity], Target::Field(&mut out));

    assert!(out.data().iter().all(|&v| v == 7.0), "skipped pass must leave its target untouched");
}

#[test]
fn test_wrong_target_kind_is_skipped() {
    let kernels = cpu_kernels();
    let dye = Field::new(4, 4, ChannelLayout::Rgba);
    let mut out = Field::new(4, 4, ChannelLayout::R);
    out.par_fill(|_, _| [3.0; 4]);

    kernels.run(&display_params(vec![], false), &[&dye], Target::Field(&mut out));
    assert!(out.data().iter().all(|&v| v == 3.0));

    let mut surface = RgbaImage::new(4, 4);
    kernels.run(&PassParams::Divergence, &[&dye], Target::Surface(&mut surface));
    assert!(surface.as_raw().iter().all(|&b| b == 0));
}

#[test]
fn test_advection_with_still_velocity_only_dissipates() {
    let kernels = cpu_kernels();
    let velocity = Field::new(8, 8, ChannelLayout::Rg);
    let mut source = Field::new(8, 8, ChannelLayout::Rgba);
    source.par_fill(|x, y| [x as f32, y as f32, 1.0, 1.0]);
    let mut out = Field::new(8, 8, ChannelLayout::Rgba);

    let params = PassParams::Advection {
        texel_size: source.texel_size(),
        dt: 0.016,
        dissipation: 0.5,
    };
    kernels.run(&params, &[&velocity, &source], Target::Field(&mut out));

    for y in 0..8 {
        for x in 0..8 {
            assert!((out.get(x, y, 0) - 0.5 * x as f32).abs() < 1e-5);
            assert!((out.get(x, y, 1) - 0.5 * y as f32).abs() < 1e-5);
        }
    }
}

#[test]
fn test_advection_moves_along_velocity() {
    let kernels = cpu_kernels();
    let mut velocity = Field::new(16, 16, ChannelLayout::Rg);
    // One texel per unit of time to the right.
    velocity.par_fill(|_, _| [1.0, 0.0, 0.0, 0.0]);
    let mut source = Field::new(16, 16, ChannelLayout::Rgba);
    source.set(5, 8, 0, 1.0);
    let mut out = Field::new(16, 16, ChannelLayout::Rgba);

    let params = PassParams::Advection {
        texel_size: source.texel_size(),
        dt: 1.0,
        dissipation: 1.0,
    };
    kernels.run(&params, &[&velocity, &source], Target::Field(&mut out));

    assert!((out.get(6, 8, 0) - 1.0).abs() < 1e-5, "dye should move one texel right");
    assert!(out.get(5, 8, 0).abs() < 1e-5);
}

#[test]
fn test_gradient_subtract_uses_central_difference() {
    let kernels = cpu_kernels();
    let mut pressure = Field::new(8, 8, ChannelLayout::R);
    pressure.par_fill(|x, _| [x as f32, 0.0, 0.0, 0.0]);
    let velocity = Field::new(8, 8, ChannelLayout::Rg);
    let mut out = Field::new(8, 8, ChannelLayout::Rg);

    kernels.run(&PassParams::GradientSubtract, &[&pressure, &velocity], Target::Field(&mut out));

    for y in 0..8 {
        for x in 1..7 {
            assert!((out.get(x, y, 0) + 1.0).abs() < 1e-6, "interior dp/dx is 1");
            assert!(out.get(x, y, 1).abs() < 1e-6);
        }
    }
    // Clamped edge sees half the difference.
    assert!((out.get(0, 3, 0) + 0.5).abs() < 1e-6);
}

#[test]
fn test_jacobi_keeps_zero_pressure_without_divergence() {
    let kernels = cpu_kernels();
    let pressure = Field::new(8, 8, ChannelLayout::R);
    let divergence = Field::new(8, 8, ChannelLayout::R);
    let mut out = Field::new(8, 8, ChannelLayout::R);
    out.par_fill(|_, _| [1.0; 4]);

    kernels.run(&PassParams::Pressure, &[&pressure, &divergence], Target::Field(&mut out));
    assert_eq!(out.max_abs(), 0.0);
}

#[test]
fn test_curl_of_rigid_rotation() {
    let kernels = cpu_kernels();
    let mut velocity = Field::new(16, 16, ChannelLayout::Rg);
    velocity.par_fill(|x, y| [-(y as f32), x as f32, 0.0, 0.0]);
    let mut out = Field::new(16, 16, ChannelLayout::R);

    let params = PassParams::Curl {
        texel_size: velocity.texel_size(),
        curl_radius: 1.0,
    };
    kernels.run(&params, &[&velocity], Target::Field(&mut out));

    for y in 1..15 {
        for x in 1..15 {
            assert!((out.get(x, y, 0) - 2.0).abs() < 1e-4, "curl at ({}, {}) = {}", x, y, out.get(x, y, 0));
        }
    }
}

#[test]
fn test_zero_vorticity_strength_leaves_velocity() {
    let kernels = cpu_kernels();
    let mut velocity = Field::new(8, 8, ChannelLayout::Rg);
    velocity.par_fill(|x, y| [x as f32 * 0.1, y as f32 * -0.2, 0.0, 0.0]);
    let mut curl = Field::new(8, 8, ChannelLayout::R);
    curl.par_fill(|x, _| [x as f32, 0.0, 0.0, 0.0]);
    let mut out = Field::new(8, 8, ChannelLayout::Rg);

    let params = PassParams::Vorticity { curl: 0.0, dt: 0.016 };
    kernels.run(&params, &[&velocity, &curl], Target::Field(&mut out));

    assert_eq!(out, velocity);
}

/// Positive Gaussian curl bump centered on texel (8, 8).
fn curl_bump(x: usize, y: usize) -> f32 {
    let dx = x as f32 - 8.0;
    let dy = y as f32 - 8.0;
    (-(dx * dx + dy * dy) / 9.0).exp()
}

#[test]
fn test_vorticity_confinement_direction() {
    let kernels = cpu_kernels();
    let base = [0.1, -0.2];
    let mut velocity = Field::new(16, 16, ChannelLayout::Rg);
    velocity.par_fill(|_, _| [base[0], base[1], 0.0, 0.0]);
    let mut curl = Field::new(16, 16, ChannelLayout::R);
    curl.par_fill(|x, y| [curl_bump(x, y), 0.0, 0.0, 0.0]);
    let mut out = Field::new(16, 16, ChannelLayout::Rg);

    let (strength, dt) = (30.0, 0.016);
    kernels.run(&PassParams::Vorticity { curl: strength, dt }, &[&velocity, &curl], Target::Field(&mut out));

    // Right of the peak |curl| falls off along +x; the y component is flipped.
    let expected = strength * curl_bump(10, 8) * dt;
    let right = [out.get(10, 8, 0) - base[0], out.get(10, 8, 1) - base[1]];
    println!("push right of peak: {:?}, expected (0, {})", right, expected);
    assert!(right[0].abs() < 1e-6);
    assert!(right[1] > 0.0);
    assert!((right[1] - expected).abs() < 1e-3);

    // Above the peak |curl| falls off along +y; the x component keeps its sign.
    let above = [out.get(8, 10, 0) - base[0], out.get(8, 10, 1) - base[1]];
    println!("push above peak: {:?}, expected ({}, 0)", above, -expected);
    assert!(above[0] < 0.0);
    assert!((above[0] + expected).abs() < 1e-3);
    assert!(above[1].abs() < 1e-6);

    // Flat at the peak itself.
    assert!((out.get(8, 8, 0) - base[0]).abs() < 1e-6);
    assert!((out.get(8, 8, 1) - base[1]).abs() < 1e-6);
}

#[test]
fn test_vorticity_on_uniform_curl_stays_finite() {
    let kernels = cpu_kernels();
    let mut velocity = Field::new(8, 8, ChannelLayout::Rg);
    velocity.par_fill(|x, y| [x as f32 * 0.1, y as f32 * -0.2, 0.0, 0.0]);
    let mut curl = Field::new(8, 8, ChannelLayout::R);
    curl.par_fill(|_, _| [3.0, 0.0, 0.0, 0.0]);
    let mut out = Field::new(8, 8, ChannelLayout::Rg);

    kernels.run(&PassParams::Vorticity { curl: 30.0, dt: 0.016 }, &[&velocity, &curl], Target::Field(&mut out));

    for y in 0..8 {
        for x in 0..8 {
            assert!(out.get(x, y, 0).is_finite() && out.get(x, y, 1).is_finite());
        }
    }
    assert_eq!(out, velocity);
}

#[test]
fn test_display_maps_bottom_row_to_last_image_row() {
    let kernels = cpu_kernels();
    let mut dye = Field::new(4, 4, ChannelLayout::Rgba);
    for x in 0..4 {
        dye.set(x, 0, 0, 0.5);
    }
    let mut surface = RgbaImage::new(4, 4);

    kernels.run(&display_params(vec![], false), &[&dye], Target::Surface(&mut surface));

    assert_eq!(surface.get_pixel(1, 3).0, [128, 0, 0, 255]);
    assert_eq!(surface.get_pixel(1, 0).0, [0, 0, 0, 255]);
}

#[test]
fn test_display_normalizes_hdr_color() {
    let kernels = cpu_kernels();
    let mut dye = Field::new(2, 2, ChannelLayout::Rgba);
    dye.par_fill(|_, _| [2.0, 1.0, 0.0, 1.0]);
    let mut surface = RgbaImage::new(2, 2);

    kernels.run(&display_params(vec![], false), &[&dye], Target::Surface(&mut surface));
    assert_eq!(surface.get_pixel(0, 0).0, [255, 128, 0, 255]);
}

#[test]
fn test_display_posterize_draws_outline_between_regions() {
    let kernels = cpu_kernels();
    let red = Vec3::new(1.0, 0.0, 0.0);
    let blue = Vec3::new(0.0, 0.0, 1.0);

    let mut dye = Field::new(16, 16, ChannelLayout::Rgba);
    dye.par_fill(|x, _| if x < 8 { [0.9, 0.0, 0.1, 1.0] } else { [0.1, 0.0, 0.8, 1.0] });
    let mut surface = RgbaImage::new(16, 16);

    kernels.run(&display_params(vec![red, blue], true), &[&dye], Target::Surface(&mut surface));

    assert_eq!(surface.get_pixel(0, 8).0, [255, 0, 0, 255]);
    assert_eq!(surface.get_pixel(15, 8).0, [0, 0, 255, 255]);
    assert_eq!(surface.get_pixel(7, 8).0, [0, 0, 0, 255], "boundary pixel should be outlined");
    assert_eq!(surface.get_pixel(8, 8).0, [0, 0, 0, 255], "boundary pixel should be outlined");
}

#[test]
fn test_outline_thickness_is_measured_in_canvas_pixels() {
    let kernels = cpu_kernels();
    let red = Vec3::new(1.0, 0.0, 0.0);
    let blue = Vec3::new(0.0, 0.0, 1.0);

    let mut dye = Field::new(16, 16, ChannelLayout::Rgba);
    dye.par_fill(|x, _| if x < 8 { [0.9, 0.0, 0.1, 1.0] } else { [0.1, 0.0, 0.8, 1.0] });
    let mut surface = RgbaImage::new(16, 16);

    // A 128 pixel canvas: two canvas pixels are a quarter of a dye texel.
    kernels.run(
        &outlined_params(vec![red, blue], true, 2.0, 128.0),
        &[&dye],
        Target::Surface(&mut surface),
    );
    assert_eq!(surface.get_pixel(7, 8).0, [255, 0, 0, 255], "thin outline stays under one surface pixel");
    assert_eq!(surface.get_pixel(8, 8).0, [0, 0, 255, 255]);

    // Eight canvas pixels reach the neighboring texel again.
    kernels.run(
        &outlined_params(vec![red, blue], true, 8.0, 128.0),
        &[&dye],
        Target::Surface(&mut surface),
    );
    assert_eq!(surface.get_pixel(7, 8).0, [0, 0, 0, 255]);
    assert_eq!(surface.get_pixel(8, 8).0, [0, 0, 0, 255]);
    assert_eq!(surface.get_pixel(0, 8).0, [255, 0, 0, 255]);
}

#[test]
fn test_nearest_palette_color() {
    let palette = [Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)];
    assert_eq!(nearest_palette_color(Vec3::new(0.2, 0.7, 0.1), &palette), palette[1]);
    assert_eq!(nearest_palette_color(Vec3::new(0.0, 0.0, 0.0), &palette), palette[0]);
}

#[test]
fn test_splat_is_additive() {
    let kernels = cpu_kernels();
    let mut target = Field::new(8, 8, ChannelLayout::Rg);
    target.par_fill(|_, _| [1.0, -1.0, 0.0, 0.0]);
    let mut out = Field::new(8, 8, ChannelLayout::Rg);

    let params = PassParams::Splat {
        aspect_ratio: 1.0,
        point: Vec2::new(0.5, 0.5),
        value: Vec3::new(2.0, 0.0, 0.0),
        radius: 0.01,
    };
    kernels.run(&params, &[&target], Target::Field(&mut out));

    // Far corner: Gaussian is effectively zero.
    assert!((out.get(0, 0, 0) - 1.0).abs() < 1e-6);
    assert!((out.get(0, 0, 1) + 1.0).abs() < 1e-6);
    // Near the center the bump adds on top of the existing value.
    assert!(out.get(4, 4, 0) > 1.5);
    assert!((out.get(4, 4, 1) + 1.0).abs() < 1e-6);
}
