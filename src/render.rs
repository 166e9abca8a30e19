use crate::palette::ColorProvider;
use crate::simulation::Simulation;
use crate::solver::FluidSolver;
use glam::Vec2;
use image::{ImageBuffer, Rgb, RgbImage, RgbaImage};

/// Owns the display surface the display pass draws into.
pub struct Renderer {
    surface: RgbaImage,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: RgbaImage::new(width.max(1), height.max(1)),
        }
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Reallocates the surface if the size changed.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if self.surface.dimensions() != (width, height) {
            self.surface = RgbaImage::new(width, height);
        }
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    pub fn render<C: ColorProvider>(&mut self, simulation: &Simulation<C>) -> &RgbaImage {
        simulation.render(&mut self.surface);
        &self.surface
    }

    /// Velocity magnitude per axis as red (|vx|) and green (|vy|), normalized to the peak.
    pub fn render_velocity_field(&self, solver: &FluidSolver) -> RgbImage {
        let velocity = solver.velocity().read();
        let peak = velocity.max_abs().max(1e-6);
        let (width, height) = self.surface.dimensions();

        let mut img = ImageBuffer::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let uv = Vec2::new(
                (x as f32 + 0.5) / width as f32,
                1.0 - (y as f32 + 0.5) / height as f32,
            );
            let v = velocity.sample(uv);

            let r = ((v[0].abs() / peak * 255.0).min(255.0)) as u8;
            let g = ((v[1].abs() / peak * 255.0).min(255.0)) as u8;
            *pixel = Rgb([r, g, 128]);
        }

        img
    }
}
