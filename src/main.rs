use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec2;
use psychfluid::simulation::MAX_FRAME_DT;
use psychfluid::{AnalysisRecorder, DeviceClass, FluidApp, FluidConfig, ImageExporter, InputEvent, Simulation};
use std::f32::consts::TAU;
use std::path::{Path, PathBuf};

const WINDOW_SIZE: [f32; 2] = [1280.0, 720.0];

#[derive(Parser)]
#[command(name = "psychfluid", about = "Interactive stable-fluids dye simulator")]
struct Cli {
    /// Use the lighter mobile defaults
    #[arg(long, global = true)]
    mobile: bool,

    /// JSON settings file; missing keys fall back to defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for splat placement and palette jitter
    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the interactive window (default)
    Gui,
    /// Run a scripted session and export PNG frames
    Headless {
        #[arg(long, default_value_t = 120)]
        frames: u64,
        #[arg(long, default_value_t = 640)]
        width: u32,
        #[arg(long, default_value_t = 360)]
        height: u32,
        #[arg(long, default_value = "frames")]
        output: PathBuf,
        #[arg(long, default_value_t = 10)]
        export_every: u64,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Cli::parse()) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let device = if cli.mobile { DeviceClass::Mobile } else { DeviceClass::Desktop };
    let config = match &cli.config {
        Some(path) => Some(FluidConfig::load(path, device)?),
        None => None,
    };

    match cli.command.unwrap_or(Command::Gui) {
        Command::Gui => run_gui_app(config, device, cli.seed),
        Command::Headless {
            frames,
            width,
            height,
            output,
            export_every,
        } => {
            let config = config.unwrap_or_else(|| FluidConfig::for_device(device));
            let simulation = Simulation::cpu(width, height, config, device, cli.seed)
                .context("failed to initialize the simulation")?;
            run_headless(simulation, frames, &output, export_every.max(1))
        }
    }
}

fn run_gui_app(config: Option<FluidConfig>, device: DeviceClass, seed: u64) -> anyhow::Result<()> {
    let keep_config = config.is_some();
    let config = config.unwrap_or_else(|| FluidConfig::for_device(device));
    let simulation = Simulation::cpu(WINDOW_SIZE[0] as u32, WINDOW_SIZE[1] as u32, config, device, seed)
        .context("failed to initialize the simulation")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(WINDOW_SIZE)
            .with_title("psychfluid"),
        ..Default::default()
    };

    eframe::run_native(
        "psychfluid",
        options,
        Box::new(move |cc| Box::new(FluidApp::new(cc, simulation, keep_config))),
    )
    .map_err(|err| anyhow::anyhow!("window closed with an error: {err}"))
}

/// Drives one pointer around a circle for the first two thirds of the run,
/// letting the auto splats carry the rest.
fn run_headless(mut simulation: Simulation, frames: u64, output: &Path, export_every: u64) -> anyhow::Result<()> {
    std::fs::create_dir_all(output).with_context(|| format!("failed to create {}", output.display()))?;

    let (dye_width, dye_height) = simulation.solver().dye_size();
    let mut exporter = ImageExporter::new(dye_width as u32, dye_height as u32);
    let mut recorder = AnalysisRecorder::new();

    simulation.warm_up();
    recorder.record_frame(simulation.solver(), 0).print_summary();

    let pointer_frames = frames * 2 / 3;
    let circle = |frame: u64| {
        let angle = frame as f32 / frames.max(1) as f32 * TAU * 2.0;
        Vec2::new(0.5, 0.5) + Vec2::from_angle(angle) * 0.25
    };

    simulation.push_event(InputEvent::PointerDown {
        id: 0,
        position: circle(0),
    });

    for frame in 1..=frames {
        if frame < pointer_frames {
            simulation.push_event(InputEvent::PointerMove {
                id: 0,
                position: circle(frame),
            });
        } else if frame == pointer_frames {
            simulation.push_event(InputEvent::PointerUp { id: 0 });
        }

        simulation.frame(MAX_FRAME_DT);

        if frame % export_every == 0 {
            let path = output.join(format!("dye_{:04}.png", frame));
            exporter.export_dye_png(&simulation, &path)?;
            exporter.export_velocity_png(&simulation, &output.join(format!("velocity_{:04}.png", frame)))?;
            recorder.record_frame(simulation.solver(), frame).print_summary();
        }
    }

    recorder.print_trends();
    log::info!("wrote {} frames of output to {}", frames / export_every, output.display());
    Ok(())
}
