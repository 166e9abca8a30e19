//! Interactive stable-fluids dye simulator for psychfluid

pub mod analysis;
pub mod app;
pub mod config;
pub mod cpu;
pub mod export;
pub mod field;
pub mod forcing;
pub mod geometry;
pub mod input;
pub mod kernel;
pub mod palette;
pub mod render;
pub mod simulation;
pub mod solver;

pub use analysis::{AnalysisRecorder, FluidMetrics};
pub use app::FluidApp;
pub use config::{DeviceClass, FluidConfig};
pub use cpu::CpuBackend;
pub use export::ImageExporter;
pub use field::{ChannelLayout, DoubleField, Field};
pub use forcing::{FadingSplat, ForcingModel, SplatRequest};
pub use input::{InputEvent, PointerTracker};
pub use kernel::{KernelBackend, KernelSet, PassName, PassParams};
pub use palette::{ColorProvider, PaletteColors, PaletteName};
pub use render::Renderer;
pub use simulation::Simulation;
pub use solver::FluidSolver;
