//! Frame scheduling: input, timers, forcing, then one solver step.

use crate::config::{DeviceClass, FluidConfig};
use crate::forcing::{FadingSplat, ForcingModel, SplatRequest};
use crate::input::{InputEvent, PointerTracker};
use crate::kernel::KernelBackend;
use crate::palette::{ColorProvider, ColorRequest, PaletteColors};
use crate::solver::FluidSolver;
use glam::Vec2;
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::f32::consts::TAU;

/// Longest step a single frame may take, in seconds.
pub const MAX_FRAME_DT: f32 = 0.016;

/// Step used while warming up.
pub const WARM_UP_DT: f32 = 0.016;

/// Global hue clock speed, degrees per second.
pub const HUE_RATE: f32 = 60.0;

/// Clamps a wall-clock delta into `[0, max]`; non-finite deltas become zero.
pub fn clamp_frame_dt(raw_dt: f32, max: f32) -> f32 {
    if raw_dt.is_finite() { raw_dt.clamp(0.0, max) } else { 0.0 }
}

pub type DefaultColors = PaletteColors<StdRng>;

pub struct Simulation<C: ColorProvider = DefaultColors> {
    solver: FluidSolver,
    forcing: ForcingModel,
    pointers: PointerTracker,
    colors: C,
    rng: StdRng,
    config: FluidConfig,
    device: DeviceClass,
    events: VecDeque<InputEvent>,
    pending_resize: Option<(u32, u32)>,
    hue_offset: f32,
    auto_splat_timer: f32,
    frame_count: u64,
    splats: Vec<SplatRequest>,
}

impl Simulation<DefaultColors> {
    /// CPU-backed simulation whose randomness derives entirely from `seed`.
    pub fn cpu(
        canvas_width: u32,
        canvas_height: u32,
        config: FluidConfig,
        device: DeviceClass,
        seed: u64,
    ) -> anyhow::Result<Self> {
        let solver = FluidSolver::with_cpu(canvas_width, canvas_height, &config)?;
        let colors = PaletteColors::new(config.palette, StdRng::seed_from_u64(seed.wrapping_add(1)));
        Ok(Self::from_parts(solver, config, device, colors, seed))
    }
}

impl<C: ColorProvider> Simulation<C> {
    pub fn new(
        backend: Box<dyn KernelBackend>,
        canvas_width: u32,
        canvas_height: u32,
        config: FluidConfig,
        device: DeviceClass,
        colors: C,
        seed: u64,
    ) -> anyhow::Result<Self> {
        let solver = FluidSolver::new(backend, canvas_width, canvas_height, &config)?;
        Ok(Self::from_parts(solver, config, device, colors, seed))
    }

    pub fn from_parts(solver: FluidSolver, config: FluidConfig, device: DeviceClass, colors: C, seed: u64) -> Self {
        Self {
            solver,
            forcing: ForcingModel::new(),
            pointers: PointerTracker::new(),
            colors,
            rng: StdRng::seed_from_u64(seed),
            config,
            device,
            events: VecDeque::new(),
            pending_resize: None,
            hue_offset: 0.0,
            auto_splat_timer: 0.0,
            frame_count: 0,
            splats: Vec::new(),
        }
    }

    pub fn solver(&self) -> &FluidSolver {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut FluidSolver {
        &mut self.solver
    }

    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    /// Live tuning. Changes take effect at the next frame.
    pub fn config_mut(&mut self) -> &mut FluidConfig {
        &mut self.config
    }

    pub fn set_config(&mut self, config: FluidConfig) {
        self.config = config;
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn forcing(&self) -> &ForcingModel {
        &self.forcing
    }

    pub fn pointers(&self) -> &PointerTracker {
        &self.pointers
    }

    pub fn colors(&self) -> &C {
        &self.colors
    }

    pub fn hue_offset(&self) -> f32 {
        self.hue_offset
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Queues an input event for the next frame boundary.
    pub fn push_event(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    /// Drops queued downs and moves, keeping pointer-ups so no pointer is
    /// left active. Used while frames are not being run.
    pub fn discard_forcing_events(&mut self) {
        self.events
            .retain(|event| matches!(event, InputEvent::PointerUp { .. }));
    }

    /// Queues a canvas resize. Applied at the start of the next frame.
    pub fn request_resize(&mut self, canvas_width: u32, canvas_height: u32) {
        let scheduled = self.pending_resize.unwrap_or(self.solver.canvas_size());
        if scheduled != (canvas_width, canvas_height) {
            self.pending_resize = Some((canvas_width, canvas_height));
        }
    }

    /// Applies a splat right away, outside the frame schedule.
    pub fn splat(&mut self, request: &SplatRequest) {
        self.solver.splat(request, &self.config);
    }

    /// Queues a timer-style auto splat at a random position and heading.
    pub fn spawn_auto_splat(&mut self) {
        let position = Vec2::new(self.rng.gen_range(0.0..1.0), self.rng.gen_range(0.0..1.0));
        let angle = self.rng.gen_range(0.0..TAU);
        let speed = self.config.auto_splat_velocity * (0.75 + self.rng.gen_range(0.0..0.5));
        let color = self.colors.request_color(ColorRequest::Ambient {
            base_hue: self.hue_offset,
        });

        self.forcing
            .push(FadingSplat::auto(position, Vec2::from_angle(angle) * speed, color));
    }

    /// Seeds the canvas with random splats and lets them blend.
    pub fn warm_up(&mut self) {
        let splats = self.device.warm_up_splats();
        let steps = self.device.warm_up_steps();

        for _ in 0..splats {
            let position = Vec2::new(self.rng.gen_range(0.0..1.0), self.rng.gen_range(0.0..1.0));
            let angle = self.rng.gen_range(0.0..TAU);
            let speed = self.rng.gen_range(300.0..600.0);
            let color = self.colors.request_color(ColorRequest::Ambient {
                base_hue: self.hue_offset,
            });
            let request = SplatRequest::new(position, Vec2::from_angle(angle) * speed, color);
            self.solver.splat(&request, &self.config);
        }

        for _ in 0..steps {
            self.solver.step(WARM_UP_DT, &self.config);
        }

        log::info!("warmed up with {} splats and {} steps", splats, steps);
    }

    /// Runs one frame and returns the `dt` actually simulated.
    pub fn frame(&mut self, raw_dt: f32) -> f32 {
        let dt = clamp_frame_dt(raw_dt, MAX_FRAME_DT);

        if let Some((width, height)) = self.pending_resize.take() {
            self.solver.resize(width, height, &self.config);
        }
        self.solver.sync_resolution(&self.config);
        self.colors.set_palette(self.config.palette);

        self.hue_offset = (self.hue_offset + dt * HUE_RATE).rem_euclid(360.0);
        self.pointers.advance_hues(dt);

        let mut splats = std::mem::take(&mut self.splats);
        splats.clear();

        while let Some(event) = self.events.pop_front() {
            self.handle_event(event, &mut splats);
        }

        if self.config.auto_splat_rate > 0.0 {
            self.auto_splat_timer += dt;
            if self.auto_splat_timer > 1.0 / self.config.auto_splat_rate {
                self.auto_splat_timer = 0.0;
                self.spawn_auto_splat();
            }
        }

        self.forcing.update(dt, &self.config, self.device, &mut splats);

        for request in &splats {
            self.solver.splat(request, &self.config);
        }
        self.splats = splats;

        self.solver.step(dt, &self.config);
        self.frame_count += 1;
        dt
    }

    fn handle_event(&mut self, event: InputEvent, out: &mut Vec<SplatRequest>) {
        match event {
            InputEvent::PointerDown { id, position } => {
                let burst = self
                    .pointers
                    .pointer_down(id, position, self.hue_offset, &self.config, &mut self.colors);
                self.forcing.push(burst);
            }
            InputEvent::PointerMove { id, position } => {
                self.pointers
                    .pointer_move(id, position, &self.config, self.device, &mut self.colors, out);
            }
            InputEvent::PointerUp { id } => self.pointers.pointer_up(id),
        }
    }

    /// Draws the current dye through the display pass.
    pub fn render(&self, surface: &mut RgbaImage) {
        let palette = self.colors.display_palette();
        self.solver.render(&self.config, &palette, surface);
    }
}
