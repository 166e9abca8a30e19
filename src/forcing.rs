//! Splat requests and the fading sources that spread one event over many frames.
//!
//! The solver can only add, never set, so a source that fades in applies the
//! per-frame increment of its envelope. The increments telescope: over a
//! source's lifetime they sum to exactly one full-strength contribution.

use crate::config::{DeviceClass, FluidConfig};
use glam::{Vec2, Vec3};
use std::f32::consts::TAU;

/// Touch bursts fade in over this many seconds.
pub const BURST_DURATION: f32 = 0.8;

/// UV distance of the push ring around an auto splat.
pub const AUTO_PUSH_OFFSET: f32 = 0.03;

/// UV distance of the push ring around a touch burst or pointer move.
pub const TOUCH_PUSH_OFFSET: f32 = 0.02;

/// Share of the burst force used for its push ring.
pub const BURST_PUSH_SCALE: f32 = 0.5;

/// Floor for fade durations so progress never divides by zero.
const MIN_DURATION: f32 = 1e-6;

/// One Gaussian injection into velocity and dye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatRequest {
    /// UV position, origin bottom-left.
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: Vec3,
    /// Radius in configuration units; `None` uses `touch_splat_radius`.
    pub radius: Option<f32>,
}

impl SplatRequest {
    pub fn new(position: Vec2, velocity: Vec2, color: Vec3) -> Self {
        Self {
            position,
            velocity,
            color,
            radius: None,
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }
}

/// Pushes `count` colorless splats on a ring around `center`, each aimed outward.
pub fn radial_push(center: Vec2, offset: f32, speed: f32, count: usize, out: &mut Vec<SplatRequest>) {
    for j in 0..count {
        let direction = Vec2::from_angle(j as f32 / count as f32 * TAU);
        out.push(SplatRequest::new(
            center + direction * offset,
            direction * speed,
            Vec3::ZERO,
        ));
    }
}

/// Envelope position for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeStep {
    /// `min(elapsed / duration, 1)`.
    pub progress: f32,
    /// Progress at the start of the frame, `max((elapsed - dt) / duration, 0)`.
    pub previous: f32,
}

impl FadeStep {
    pub fn delta(&self) -> f32 {
        self.progress - self.previous
    }

    /// Increment of the ease-out envelope over this frame.
    pub fn ease_delta(&self) -> f32 {
        ease_out(self.progress) - ease_out(self.previous)
    }
}

/// `elapsed` already includes this frame's `dt`.
pub fn fade_step(elapsed: f32, dt: f32, duration: f32) -> FadeStep {
    let duration = duration.max(MIN_DURATION);
    FadeStep {
        progress: (elapsed / duration).min(1.0),
        previous: ((elapsed - dt) / duration).max(0.0),
    }
}

pub fn ease_out(progress: f32) -> f32 {
    1.0 - (1.0 - progress).powi(2)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplatKind {
    /// Timer-spawned splat that fades in linearly with a decaying push.
    Auto,
    /// Pointer-down burst radiating in all directions.
    Burst { force: f32 },
}

/// A forcing source alive for a fixed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct FadingSplat {
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: Vec3,
    pub elapsed: f32,
    pub kind: SplatKind,
}

impl FadingSplat {
    pub fn auto(position: Vec2, velocity: Vec2, color: Vec3) -> Self {
        Self {
            position,
            velocity,
            color,
            elapsed: 0.0,
            kind: SplatKind::Auto,
        }
    }

    pub fn burst(position: Vec2, color: Vec3, force: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            color,
            elapsed: 0.0,
            kind: SplatKind::Burst { force },
        }
    }

    pub fn duration(&self, config: &FluidConfig) -> f32 {
        match self.kind {
            SplatKind::Auto => config.auto_splat_fade_duration,
            SplatKind::Burst { .. } => BURST_DURATION,
        }
    }

    /// Advances by `dt` and appends this frame's splats. Returns true once expired.
    pub fn advance(&mut self, dt: f32, config: &FluidConfig, device: DeviceClass, out: &mut Vec<SplatRequest>) -> bool {
        self.elapsed += dt;
        let duration = self.duration(config);
        let step = fade_step(self.elapsed, dt, duration);

        match self.kind {
            SplatKind::Auto => {
                let delta = step.delta();
                out.push(
                    SplatRequest::new(self.position, self.velocity * delta, self.color * delta)
                        .with_radius(config.auto_splat_radius),
                );

                if config.auto_splat_push > 0.0 {
                    // Strongest at birth, gone once fully faded in.
                    let speed = config.auto_splat_push * delta * (1.0 - step.progress);
                    radial_push(self.position, AUTO_PUSH_OFFSET, speed, device.push_splats(), out);
                }
            }
            SplatKind::Burst { force } => {
                let delta = step.ease_delta();
                let count = device.burst_splats();
                for j in 0..count {
                    let direction = Vec2::from_angle(j as f32 / count as f32 * TAU);
                    out.push(SplatRequest::new(
                        self.position,
                        direction * force * delta,
                        self.color * delta,
                    ));
                }

                let speed = force * BURST_PUSH_SCALE * delta;
                radial_push(self.position, TOUCH_PUSH_OFFSET, speed, device.push_splats(), out);
            }
        }

        step.progress >= 1.0
    }
}

/// Owns every live fading source.
#[derive(Debug, Clone, Default)]
pub struct ForcingModel {
    sources: Vec<FadingSplat>,
}

impl ForcingModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: FadingSplat) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> &[FadingSplat] {
        &self.sources
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }

    /// Advances every source once, newest first, dropping expired ones.
    ///
    /// A negative or non-finite `dt` is treated as zero.
    pub fn update(&mut self, dt: f32, config: &FluidConfig, device: DeviceClass, out: &mut Vec<SplatRequest>) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        for i in (0..self.sources.len()).rev() {
            if self.sources[i].advance(dt, config, device, out) {
                self.sources.remove(i);
            }
        }
    }
}
