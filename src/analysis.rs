use crate::solver::FluidSolver;

#[derive(Debug, Clone)]
pub struct FluidMetrics {
    pub dye_mass: [f32; 3],
    pub max_dye: f32,
    pub total_kinetic_energy: f32,
    pub max_velocity: f32,
    pub avg_velocity: f32,
    /// Mean |div v| over the sim grid, central differences with clamped edges.
    pub velocity_divergence: f32,
    pub vorticity: f32,
    pub max_pressure: f32,
    pub frame: u64,
}

impl FluidMetrics {
    pub fn analyze(solver: &FluidSolver, frame: u64) -> Self {
        let velocity = solver.velocity().read();
        let dye = solver.dye().read();

        let mut total_kinetic_energy: f32 = 0.0;
        let mut max_velocity: f32 = 0.0;
        let mut velocity_sum: f32 = 0.0;
        let mut total_divergence = 0.0;
        let mut total_vorticity = 0.0;

        let (width, height) = (velocity.width(), velocity.height());
        let size = (width * height) as f32;

        for y in 0..height as isize {
            for x in 0..width as isize {
                let v = velocity.fetch(x, y);
                let speed_sq = v[0] * v[0] + v[1] * v[1];
                total_kinetic_energy += 0.5 * speed_sq;
                max_velocity = max_velocity.max(speed_sq.sqrt());
                velocity_sum += speed_sq.sqrt();

                let left = velocity.fetch(x - 1, y);
                let right = velocity.fetch(x + 1, y);
                let top = velocity.fetch(x, y + 1);
                let bottom = velocity.fetch(x, y - 1);

                // ∇·v
                let divergence = 0.5 * (right[0] - left[0] + top[1] - bottom[1]);
                total_divergence += divergence.abs();

                // ∇×v
                let vorticity = 0.5 * (right[1] - left[1] - (top[0] - bottom[0]));
                total_vorticity += vorticity.abs();
            }
        }

        let max_dye = dye
            .data()
            .chunks(dye.channels())
            .map(|texel| texel[0].max(texel[1]).max(texel[2]))
            .fold(0.0f32, f32::max);

        Self {
            dye_mass: [dye.channel_sum(0), dye.channel_sum(1), dye.channel_sum(2)],
            max_dye,
            total_kinetic_energy,
            max_velocity,
            avg_velocity: velocity_sum / size,
            velocity_divergence: total_divergence / size,
            vorticity: total_vorticity / size,
            max_pressure: solver.pressure().read().max_abs(),
            frame,
        }
    }

    pub fn total_dye(&self) -> f32 {
        self.dye_mass.iter().sum()
    }

    pub fn print_summary(&self) {
        println!("Frame {} Metrics:", self.frame);
        println!(
            "  Dye Mass: R={:.3} G={:.3} B={:.3}",
            self.dye_mass[0], self.dye_mass[1], self.dye_mass[2]
        );
        println!("  Max Dye: {:.6}", self.max_dye);
        println!("  Kinetic Energy: {:.6}", self.total_kinetic_energy);
        println!("  Max Velocity: {:.6}", self.max_velocity);
        println!("  Avg Velocity: {:.6}", self.avg_velocity);
        println!("  Velocity Divergence: {:.6}", self.velocity_divergence);
        println!("  Vorticity: {:.6}", self.vorticity);
        println!("  Max |Pressure|: {:.6}", self.max_pressure);
        println!();
    }
}

#[derive(Default)]
pub struct AnalysisRecorder {
    pub metrics_history: Vec<FluidMetrics>,
}

impl AnalysisRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self, solver: &FluidSolver, frame: u64) -> &FluidMetrics {
        self.metrics_history.push(FluidMetrics::analyze(solver, frame));
        &self.metrics_history[self.metrics_history.len() - 1]
    }

    pub fn print_trends(&self) {
        let (Some(first), Some(last)) = (self.metrics_history.first(), self.metrics_history.last()) else {
            return;
        };
        if self.metrics_history.len() < 2 {
            return;
        }

        println!("=== TREND ANALYSIS ===");
        println!(
            "Dye change: {:.6} -> {:.6} ({:+.3}%)",
            first.total_dye(),
            last.total_dye(),
            (last.total_dye() - first.total_dye()) / first.total_dye().max(0.001) * 100.0
        );
        println!(
            "Kinetic Energy change: {:.6} -> {:.6} ({:+.3}%)",
            first.total_kinetic_energy,
            last.total_kinetic_energy,
            (last.total_kinetic_energy - first.total_kinetic_energy) / first.total_kinetic_energy.max(0.001)
                * 100.0
        );
        println!(
            "Divergence change: {:.6} -> {:.6}",
            first.velocity_divergence, last.velocity_divergence
        );
    }
}
