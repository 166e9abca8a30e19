//! CPU evaluation of every pass, one rayon task per output row.
//!
//! Texel `(x, y)` sits at UV `((x + 0.5) / w, (y + 0.5) / h)`. Neighbor taps one
//! texel away land exactly on texel centers, so they use clamped fetches;
//! fractional taps (curl radius, advection backtrace, display) sample bilinearly.

use crate::field::{ChannelLayout, Field};
use crate::kernel::{CompiledPass, DisplayParams, KernelBackend, MAX_DISPLAY_PALETTE, PassName, PassParams, Target};
use glam::{Vec2, Vec3};
use image::RgbaImage;
use rayon::prelude::*;

/// Keeps the vorticity force finite where the curl gradient vanishes.
pub const VORTICITY_EPSILON: f32 = 1e-4;

/// Smallest Gaussian radius a splat will use.
pub const MIN_SPLAT_RADIUS: f32 = 1e-6;

#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

impl KernelBackend for CpuBackend {
    fn label(&self) -> &str {
        "cpu"
    }

    fn compile(&self, pass: PassName) -> anyhow::Result<CompiledPass> {
        Ok(CompiledPass::new(pass))
    }

    fn dispatch(&self, _pass: &CompiledPass, inputs: &[&Field], params: &PassParams, target: Target<'_>) {
        match (params, target) {
            (
                PassParams::Splat {
                    aspect_ratio,
                    point,
                    value,
                    radius,
                },
                Target::Field(out),
            ) => splat(inputs[0], *aspect_ratio, *point, *value, *radius, out),
            (
                PassParams::Advection {
                    texel_size,
                    dt,
                    dissipation,
                },
                Target::Field(out),
            ) => advect(inputs[0], inputs[1], *texel_size, *dt, *dissipation, out),
            (PassParams::Divergence, Target::Field(out)) => divergence(inputs[0], out),
            (PassParams::Pressure, Target::Field(out)) => jacobi(inputs[0], inputs[1], out),
            (PassParams::GradientSubtract, Target::Field(out)) => gradient_subtract(inputs[0], inputs[1], out),
            (
                PassParams::Curl {
                    texel_size,
                    curl_radius,
                },
                Target::Field(out),
            ) => curl(inputs[0], *texel_size, *curl_radius, out),
            (PassParams::Vorticity { curl, dt }, Target::Field(out)) => {
                vorticity(inputs[0], inputs[1], *curl, *dt, out)
            }
            (PassParams::Display(params), Target::Surface(surface)) => display(inputs[0], params, surface),
            (params, _) => log::warn!("cpu backend: `{}` pass given the wrong target", params.pass()),
        }
    }
}

fn splat(target: &Field, aspect_ratio: f32, point: Vec2, value: Vec3, radius: f32, out: &mut Field) {
    let radius = radius.max(MIN_SPLAT_RADIUS);
    let rgba = target.layout() == ChannelLayout::Rgba;

    out.par_fill(|x, y| {
        let uv = target.texel_center(x, y);
        let mut p = uv - point;
        p.x *= aspect_ratio;
        let weight = (-p.dot(p) / radius).exp();

        let base = target.fetch(x as isize, y as isize);
        [
            base[0] + weight * value.x,
            base[1] + weight * value.y,
            base[2] + weight * value.z,
            if rgba { 1.0 } else { base[3] },
        ]
    });
}

fn advect(velocity: &Field, source: &Field, texel_size: Vec2, dt: f32, dissipation: f32, out: &mut Field) {
    out.par_fill(|x, y| {
        let uv = source.texel_center(x, y);
        let v = velocity.sample(uv);
        let coord = uv - dt * Vec2::new(v[0], v[1]) * texel_size;
        let s = source.sample(coord);
        [
            dissipation * s[0],
            dissipation * s[1],
            dissipation * s[2],
            dissipation * s[3],
        ]
    });
}

fn divergence(velocity: &Field, out: &mut Field) {
    out.par_fill(|x, y| {
        let (x, y) = (x as isize, y as isize);
        let l = velocity.fetch(x - 1, y)[0];
        let r = velocity.fetch(x + 1, y)[0];
        let t = velocity.fetch(x, y + 1)[1];
        let b = velocity.fetch(x, y - 1)[1];
        [0.5 * (r - l + t - b), 0.0, 0.0, 0.0]
    });
}

fn jacobi(pressure: &Field, divergence: &Field, out: &mut Field) {
    out.par_fill(|x, y| {
        let (x, y) = (x as isize, y as isize);
        let l = pressure.fetch(x - 1, y)[0];
        let r = pressure.fetch(x + 1, y)[0];
        let t = pressure.fetch(x, y + 1)[0];
        let b = pressure.fetch(x, y - 1)[0];
        let div = divergence.fetch(x, y)[0];
        [(l + r + b + t - div) * 0.25, 0.0, 0.0, 0.0]
    });
}

fn gradient_subtract(pressure: &Field, velocity: &Field, out: &mut Field) {
    out.par_fill(|x, y| {
        let (x, y) = (x as isize, y as isize);
        let l = pressure.fetch(x - 1, y)[0];
        let r = pressure.fetch(x + 1, y)[0];
        let t = pressure.fetch(x, y + 1)[0];
        let b = pressure.fetch(x, y - 1)[0];
        let v = velocity.fetch(x, y);
        [v[0] - 0.5 * (r - l), v[1] - 0.5 * (t - b), 0.0, 0.0]
    });
}

fn curl(velocity: &Field, texel_size: Vec2, curl_radius: f32, out: &mut Field) {
    let offset = texel_size * curl_radius;

    out.par_fill(|x, y| {
        let uv = velocity.texel_center(x, y);
        let l = velocity.sample(uv - Vec2::new(offset.x, 0.0))[1];
        let r = velocity.sample(uv + Vec2::new(offset.x, 0.0))[1];
        let t = velocity.sample(uv + Vec2::new(0.0, offset.y))[0];
        let b = velocity.sample(uv - Vec2::new(0.0, offset.y))[0];
        [0.5 * (r - l - t + b), 0.0, 0.0, 0.0]
    });
}

fn vorticity(velocity: &Field, curl: &Field, strength: f32, dt: f32, out: &mut Field) {
    out.par_fill(|x, y| {
        let (x, y) = (x as isize, y as isize);
        let l = curl.fetch(x - 1, y)[0];
        let r = curl.fetch(x + 1, y)[0];
        let t = curl.fetch(x, y + 1)[0];
        let b = curl.fetch(x, y - 1)[0];
        let c = curl.fetch(x, y)[0];

        let mut force = 0.5 * Vec2::new(t.abs() - b.abs(), r.abs() - l.abs());
        force /= force.length() + VORTICITY_EPSILON;
        force *= strength * c;
        force.y = -force.y;

        let v = velocity.fetch(x, y);
        [v[0] + force.x * dt, v[1] + force.y * dt, 0.0, 0.0]
    });
}

fn display(dye: &Field, params: &DisplayParams, surface: &mut RgbaImage) {
    let width = surface.width() as usize;
    let height = surface.height() as usize;
    if width == 0 || height == 0 {
        return;
    }

    let palette = &params.palette[..params.palette.len().min(MAX_DISPLAY_PALETTE)];
    let posterize = params.posterize && !palette.is_empty();

    let sample_color = |uv: Vec2| {
        let s = dye.sample(uv);
        let mut color = Vec3::new(s[0], s[1], s[2]) * params.brightness;
        if params.normalize_hdr {
            let max = color.max_element();
            if max > 1.0 {
                color /= max;
            }
        }
        color
    };

    let buffer: &mut [u8] = surface;
    buffer.par_chunks_mut(width * 4).enumerate().for_each(|(row, pixels)| {
        // Image rows run top-down, UVs bottom-up.
        let v = 1.0 - (row as f32 + 0.5) / height as f32;

        for (column, pixel) in pixels.chunks_mut(4).enumerate() {
            let uv = Vec2::new((column as f32 + 0.5) / width as f32, v);
            let mut color = sample_color(uv);

            if posterize {
                let center = nearest_palette_color(color, palette);
                let mut edge = false;

                if params.outline_thickness > 0.0 {
                    for i in 0..8 {
                        let angle = i as f32 * std::f32::consts::FRAC_PI_4;
                        let direction = Vec2::new(angle.cos(), angle.sin());
                        let offset = direction * params.canvas_texel * params.outline_thickness;
                        let neighbor = nearest_palette_color(sample_color(uv + offset), palette);
                        if center.distance(neighbor) > 0.01 {
                            edge = true;
                            break;
                        }
                    }
                }

                color = if edge { Vec3::ZERO } else { center };
            }

            pixel[0] = to_byte(color.x);
            pixel[1] = to_byte(color.y);
            pixel[2] = to_byte(color.z);
            pixel[3] = 255;
        }
    });
}

/// Palette entry closest to `color` in RGB space. `palette` must be non-empty.
pub fn nearest_palette_color(color: Vec3, palette: &[Vec3]) -> Vec3 {
    let mut closest = palette[0];
    let mut best = f32::MAX;
    for &candidate in palette {
        let dist = (color - candidate).length_squared();
        if dist < best {
            best = dist;
            closest = candidate;
        }
    }
    closest
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
