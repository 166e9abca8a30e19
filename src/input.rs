//! Pointer tracking: interpolated drag splats and touch bursts.

use crate::config::{DeviceClass, FluidConfig};
use crate::forcing::{FadingSplat, SplatRequest, TOUCH_PUSH_OFFSET, radial_push};
use crate::palette::{ColorProvider, ColorRequest};
use glam::Vec2;

/// Hue spacing between simultaneously held pointers, in degrees.
const POINTER_HUE_SPACING: f32 = 60.0;

/// Hue drift of a held pointer, degrees per second.
pub const POINTER_HUE_RATE: f32 = 120.0;

/// Share of `touch_splat_push` applied at the end of each move.
const MOVE_PUSH_SCALE: f32 = 0.3;

/// Burst force relative to `touch_splat_push`.
const BURST_FORCE_SCALE: f32 = 3.0;

/// Sub-splats with both velocity components at or below this are skipped.
const MIN_SPLAT_VELOCITY: f32 = 1e-4;

/// Discrete pointer events, positions normalized to [0, 1] with origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { id: u64, position: Vec2 },
    PointerMove { id: u64, position: Vec2 },
    PointerUp { id: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pointer {
    pub id: u64,
    pub position: Vec2,
    pub previous: Vec2,
    pub hue: f32,
}

#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    pointers: Vec<Pointer>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Pointer> {
        self.pointers.iter().find(|p| p.id == id)
    }

    pub fn clear(&mut self) {
        self.pointers.clear();
    }

    /// Drifts the hue of every held pointer.
    pub fn advance_hues(&mut self, dt: f32) {
        for pointer in &mut self.pointers {
            pointer.hue += dt * POINTER_HUE_RATE;
        }
    }

    /// Starts tracking a pointer and returns the burst it spawns.
    pub fn pointer_down(
        &mut self,
        id: u64,
        position: Vec2,
        hue_offset: f32,
        config: &FluidConfig,
        colors: &mut dyn ColorProvider,
    ) -> FadingSplat {
        self.pointers.retain(|p| p.id != id);
        let hue = hue_offset + self.pointers.len() as f32 * POINTER_HUE_SPACING;
        self.pointers.push(Pointer {
            id,
            position,
            previous: position,
            hue,
        });

        let color = colors.request_color(ColorRequest::Pointer { hue }) * config.touch_splat_brightness;
        FadingSplat::burst(position, color, config.touch_splat_push * BURST_FORCE_SCALE)
    }

    /// Moves a tracked pointer, spreading the motion over evenly spaced sub-splats.
    /// Unknown ids are ignored.
    pub fn pointer_move(
        &mut self,
        id: u64,
        target: Vec2,
        config: &FluidConfig,
        device: DeviceClass,
        colors: &mut dyn ColorProvider,
        out: &mut Vec<SplatRequest>,
    ) {
        let Some(pointer) = self.pointers.iter_mut().find(|p| p.id == id) else {
            return;
        };

        pointer.previous = pointer.position;
        let start = pointer.previous;
        let delta = target - start;

        let steps = ((delta.length() * device.pointer_steps_per_unit()).floor() as usize).max(1);
        let velocity = delta * config.splat_force / steps as f32;

        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            let position = start + delta * t;

            if velocity.x.abs() > MIN_SPLAT_VELOCITY || velocity.y.abs() > MIN_SPLAT_VELOCITY {
                let color =
                    colors.request_color(ColorRequest::Pointer { hue: pointer.hue }) * config.touch_splat_brightness;
                out.push(SplatRequest::new(position, velocity, color));

                if i == steps {
                    let push = config.touch_splat_push * MOVE_PUSH_SCALE;
                    if push > 0.0 {
                        radial_push(position, TOUCH_PUSH_OFFSET, push, device.push_splats(), out);
                    }
                }
            }
        }

        pointer.position = target;
    }

    pub fn pointer_up(&mut self, id: u64) {
        self.pointers.retain(|p| p.id != id);
    }
}
