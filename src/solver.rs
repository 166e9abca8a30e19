//! Stable-fluids solver over a coarse dynamics grid and a finer dye grid.

use crate::config::FluidConfig;
use crate::cpu::CpuBackend;
use crate::field::{ChannelLayout, DoubleField, Field};
use crate::forcing::SplatRequest;
use crate::geometry::{aspect_ratio, correct_radius, derive_grid_size};
use crate::kernel::{DisplayParams, KernelBackend, KernelSet, PassParams, Target};
use anyhow::Context;
use glam::{Vec2, Vec3};
use image::RgbaImage;

/// Configured splat radii are in hundredths of UV space.
pub const SPLAT_RADIUS_SCALE: f32 = 100.0;

pub struct FluidSolver {
    kernels: KernelSet,
    canvas_width: u32,
    canvas_height: u32,
    sim_resolution: f32,
    dye_resolution: f32,
    velocity: DoubleField,
    pressure: DoubleField,
    dye: DoubleField,
    divergence: Field,
    curl: Field,
}

impl FluidSolver {
    /// Compiles every pass on `backend` and allocates all fields for the canvas.
    pub fn new(
        backend: Box<dyn KernelBackend>,
        canvas_width: u32,
        canvas_height: u32,
        config: &FluidConfig,
    ) -> anyhow::Result<Self> {
        let kernels = KernelSet::compile(backend).context("failed to initialize fluid kernels")?;

        let (sim_width, sim_height) = derive_grid_size(config.sim_resolution, canvas_width, canvas_height);
        let (dye_width, dye_height) = derive_grid_size(config.dye_resolution, canvas_width, canvas_height);
        log::info!(
            "fluid solver on `{}` backend: sim {}x{}, dye {}x{}",
            kernels.backend_label(),
            sim_width,
            sim_height,
            dye_width,
            dye_height
        );

        Ok(Self {
            kernels,
            canvas_width,
            canvas_height,
            sim_resolution: config.sim_resolution,
            dye_resolution: config.dye_resolution,
            velocity: DoubleField::new(sim_width, sim_height, ChannelLayout::Rg),
            pressure: DoubleField::new(sim_width, sim_height, ChannelLayout::R),
            dye: DoubleField::new(dye_width, dye_height, ChannelLayout::Rgba),
            divergence: Field::new(sim_width, sim_height, ChannelLayout::R),
            curl: Field::new(sim_width, sim_height, ChannelLayout::R),
        })
    }

    pub fn with_cpu(canvas_width: u32, canvas_height: u32, config: &FluidConfig) -> anyhow::Result<Self> {
        Self::new(Box::new(CpuBackend::new()), canvas_width, canvas_height, config)
    }

    /// Re-derives both grids for a new canvas. All field contents are dropped.
    pub fn resize(&mut self, canvas_width: u32, canvas_height: u32, config: &FluidConfig) {
        self.canvas_width = canvas_width;
        self.canvas_height = canvas_height;
        self.reallocate_sim(config.sim_resolution);
        self.reallocate_dye(config.dye_resolution);
        log::info!(
            "resized canvas to {}x{}: sim {}x{}, dye {}x{}",
            canvas_width,
            canvas_height,
            self.velocity.width(),
            self.velocity.height(),
            self.dye.width(),
            self.dye.height()
        );
    }

    /// Reallocates whichever grid's configured resolution changed. Returns true if any did.
    pub fn sync_resolution(&mut self, config: &FluidConfig) -> bool {
        let mut changed = false;
        if config.sim_resolution != self.sim_resolution {
            self.reallocate_sim(config.sim_resolution);
            changed = true;
        }
        if config.dye_resolution != self.dye_resolution {
            self.reallocate_dye(config.dye_resolution);
            changed = true;
        }
        changed
    }

    fn reallocate_sim(&mut self, resolution: f32) {
        let (width, height) = derive_grid_size(resolution, self.canvas_width, self.canvas_height);
        self.sim_resolution = resolution;
        self.velocity.resize(width, height);
        self.pressure.resize(width, height);
        self.divergence = Field::new(width, height, ChannelLayout::R);
        self.curl = Field::new(width, height, ChannelLayout::R);
        log::debug!("sim grid reallocated at {}x{}", width, height);
    }

    fn reallocate_dye(&mut self, resolution: f32) {
        let (width, height) = derive_grid_size(resolution, self.canvas_width, self.canvas_height);
        self.dye_resolution = resolution;
        self.dye.resize(width, height);
        log::debug!("dye grid reallocated at {}x{}", width, height);
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        aspect_ratio(self.canvas_width, self.canvas_height)
    }

    pub fn sim_size(&self) -> (usize, usize) {
        (self.velocity.width(), self.velocity.height())
    }

    pub fn dye_size(&self) -> (usize, usize) {
        (self.dye.width(), self.dye.height())
    }

    pub fn kernels(&self) -> &KernelSet {
        &self.kernels
    }

    pub fn velocity(&self) -> &DoubleField {
        &self.velocity
    }

    pub fn velocity_mut(&mut self) -> &mut DoubleField {
        &mut self.velocity
    }

    pub fn pressure(&self) -> &DoubleField {
        &self.pressure
    }

    pub fn dye(&self) -> &DoubleField {
        &self.dye
    }

    pub fn dye_mut(&mut self) -> &mut DoubleField {
        &mut self.dye
    }

    pub fn divergence(&self) -> &Field {
        &self.divergence
    }

    pub fn curl(&self) -> &Field {
        &self.curl
    }

    /// Adds a Gaussian bump of velocity, then of dye, committing each with a swap.
    pub fn splat(&mut self, request: &SplatRequest, config: &FluidConfig) {
        let aspect = self.aspect_ratio();
        let radius = request.radius.unwrap_or(config.touch_splat_radius);
        let radius = correct_radius(radius / SPLAT_RADIUS_SCALE, aspect);

        let velocity_params = PassParams::Splat {
            aspect_ratio: aspect,
            point: request.position,
            value: request.velocity.extend(0.0),
            radius,
        };
        let (read, write) = self.velocity.split();
        self.kernels.run(&velocity_params, &[read], Target::Field(write));
        self.velocity.swap();

        let dye_params = PassParams::Splat {
            aspect_ratio: aspect,
            point: request.position,
            value: request.color,
            radius,
        };
        let (read, write) = self.dye.split();
        self.kernels.run(&dye_params, &[read], Target::Field(write));
        self.dye.swap();
    }

    /// One full simulation step.
    pub fn step(&mut self, dt: f32, config: &FluidConfig) {
        self.compute_curl(config.curl_radius);
        self.apply_vorticity(config.curl, dt);
        self.project(config.pressure_iterations);
        self.advect_velocity(dt, config.velocity_dissipation);
        self.advect_dye(dt, config.density_dissipation);
    }

    pub fn compute_curl(&mut self, curl_radius: f32) {
        let params = PassParams::Curl {
            texel_size: self.velocity.texel_size(),
            curl_radius,
        };
        self.kernels
            .run(&params, &[self.velocity.read()], Target::Field(&mut self.curl));
    }

    /// Vorticity confinement from the last computed curl field.
    pub fn apply_vorticity(&mut self, strength: f32, dt: f32) {
        let params = PassParams::Vorticity { curl: strength, dt };
        let (read, write) = self.velocity.split();
        self.kernels
            .run(&params, &[read, &self.curl], Target::Field(write));
        self.velocity.swap();
    }

    pub fn compute_divergence(&mut self) {
        self.kernels.run(
            &PassParams::Divergence,
            &[self.velocity.read()],
            Target::Field(&mut self.divergence),
        );
    }

    /// Divergence, a cold-started Jacobi pressure solve, and gradient subtraction.
    ///
    /// Runs exactly `iterations` relaxations; a negative count runs none.
    pub fn project(&mut self, iterations: i32) {
        self.compute_divergence();

        self.pressure.read_mut().clear();
        for _ in 0..iterations.max(0) {
            let (read, write) = self.pressure.split();
            self.kernels
                .run(&PassParams::Pressure, &[read, &self.divergence], Target::Field(write));
            self.pressure.swap();
        }

        let (read, write) = self.velocity.split();
        self.kernels.run(
            &PassParams::GradientSubtract,
            &[self.pressure.read(), read],
            Target::Field(write),
        );
        self.velocity.swap();
    }

    pub fn advect_velocity(&mut self, dt: f32, dissipation: f32) {
        let params = PassParams::Advection {
            texel_size: self.velocity.texel_size(),
            dt,
            dissipation,
        };
        let (read, write) = self.velocity.split();
        self.kernels.run(&params, &[read, read], Target::Field(write));
        self.velocity.swap();
    }

    /// Moves dye along the velocity field using the dye grid's own texel size.
    pub fn advect_dye(&mut self, dt: f32, dissipation: f32) {
        let params = PassParams::Advection {
            texel_size: self.dye.texel_size(),
            dt,
            dissipation,
        };
        let velocity = self.velocity.read();
        let (read, write) = self.dye.split();
        self.kernels
            .run(&params, &[velocity, read], Target::Field(write));
        self.dye.swap();
    }

    /// Composites the current dye into `surface`.
    pub fn render(&self, config: &FluidConfig, palette: &[Vec3], surface: &mut RgbaImage) {
        let params = PassParams::Display(DisplayParams {
            brightness: config.brightness,
            normalize_hdr: config.normalize_hdr,
            posterize: config.posterize,
            palette: palette.to_vec(),
            outline_thickness: config.outline_thickness,
            canvas_texel: Vec2::new(
                1.0 / self.canvas_width.max(1) as f32,
                1.0 / self.canvas_height.max(1) as f32,
            ),
        });
        self.kernels
            .run(&params, &[self.dye.read()], Target::Surface(surface));
    }
}
