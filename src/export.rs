use crate::palette::ColorProvider;
use crate::render::Renderer;
use crate::simulation::Simulation;
use anyhow::Context;
use std::path::Path;

pub struct ImageExporter {
    renderer: Renderer,
}

impl ImageExporter {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            renderer: Renderer::new(width, height),
        }
    }

    pub fn export_dye_png<C: ColorProvider>(&mut self, simulation: &Simulation<C>, path: &Path) -> anyhow::Result<()> {
        let img = self.renderer.render(simulation);
        img.save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn export_velocity_png<C: ColorProvider>(&self, simulation: &Simulation<C>, path: &Path) -> anyhow::Result<()> {
        let img = self.renderer.render_velocity_field(simulation.solver());
        img.save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Runs `frames` frames of `dt`, writing one dye PNG per frame.
    pub fn export_frame_sequence<C: ColorProvider>(
        &mut self,
        simulation: &mut Simulation<C>,
        frames: usize,
        dt: f32,
        output_dir: &Path,
        prefix: &str,
    ) -> anyhow::Result<()> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create {}", output_dir.display()))?;

        for i in 0..frames {
            simulation.frame(dt);

            let filename = format!("{}_frame_{:04}.png", prefix, i);
            self.export_dye_png(simulation, &output_dir.join(filename))?;
        }
        log::info!("exported {} frames to {}", frames, output_dir.display());
        Ok(())
    }
}
