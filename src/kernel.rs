//! Named compute passes and the backend seam that evaluates them.
//!
//! Every pass is compiled once when the solver is built. A [`CompiledPass`]
//! records which inputs the pass binds and in what order, so callers hand
//! fields over positionally instead of looking bindings up by name each frame.

use crate::field::Field;
use anyhow::Context;
use glam::{Vec2, Vec3};
use image::RgbaImage;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassName {
    Splat,
    Advection,
    Divergence,
    Pressure,
    GradientSubtract,
    Curl,
    Vorticity,
    Display,
}

impl PassName {
    pub const ALL: [PassName; 8] = [
        PassName::Splat,
        PassName::Advection,
        PassName::Divergence,
        PassName::Pressure,
        PassName::GradientSubtract,
        PassName::Curl,
        PassName::Vorticity,
        PassName::Display,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PassName::Splat => "splat",
            PassName::Advection => "advection",
            PassName::Divergence => "divergence",
            PassName::Pressure => "pressure",
            PassName::GradientSubtract => "gradientSubtract",
            PassName::Curl => "curl",
            PassName::Vorticity => "vorticity",
            PassName::Display => "display",
        }
    }

    /// Input bindings in the order `KernelSet::run` expects them.
    pub fn input_slots(self) -> &'static [&'static str] {
        match self {
            PassName::Splat => &["target"],
            PassName::Advection => &["velocity", "source"],
            PassName::Divergence => &["velocity"],
            PassName::Pressure => &["pressure", "divergence"],
            PassName::GradientSubtract => &["pressure", "velocity"],
            PassName::Curl => &["velocity"],
            PassName::Vorticity => &["velocity", "curl"],
            PassName::Display => &["dye"],
        }
    }

    /// Whether the pass draws to the display surface instead of a field.
    pub fn writes_surface(self) -> bool {
        matches!(self, PassName::Display)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final compositing parameters for the display pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayParams {
    pub brightness: f32,
    pub normalize_hdr: bool,
    pub posterize: bool,
    /// At most [`MAX_DISPLAY_PALETTE`] colors are considered.
    pub palette: Vec<Vec3>,
    /// Outline width in canvas pixels.
    pub outline_thickness: f32,
    /// UV size of one canvas pixel.
    pub canvas_texel: Vec2,
}

pub const MAX_DISPLAY_PALETTE: usize = 8;

/// Scalar and vector parameters of one invocation. The variant selects the pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PassParams {
    Splat {
        aspect_ratio: f32,
        point: Vec2,
        value: Vec3,
        radius: f32,
    },
    Advection {
        texel_size: Vec2,
        dt: f32,
        dissipation: f32,
    },
    Divergence,
    Pressure,
    GradientSubtract,
    Curl {
        texel_size: Vec2,
        curl_radius: f32,
    },
    Vorticity {
        curl: f32,
        dt: f32,
    },
    Display(DisplayParams),
}

impl PassParams {
    pub fn pass(&self) -> PassName {
        match self {
            PassParams::Splat { .. } => PassName::Splat,
            PassParams::Advection { .. } => PassName::Advection,
            PassParams::Divergence => PassName::Divergence,
            PassParams::Pressure => PassName::Pressure,
            PassParams::GradientSubtract => PassName::GradientSubtract,
            PassParams::Curl { .. } => PassName::Curl,
            PassParams::Vorticity { .. } => PassName::Vorticity,
            PassParams::Display(_) => PassName::Display,
        }
    }
}

/// Where a pass writes.
pub enum Target<'a> {
    Field(&'a mut Field),
    Surface(&'a mut RgbaImage),
}

/// A pass resolved by a backend, paired with its input binding order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPass {
    name: PassName,
    slots: &'static [&'static str],
}

impl CompiledPass {
    pub fn new(name: PassName) -> Self {
        Self {
            name,
            slots: name.input_slots(),
        }
    }

    pub fn name(&self) -> PassName {
        self.name
    }

    pub fn slots(&self) -> &'static [&'static str] {
        self.slots
    }
}

/// Something that can evaluate the solver's passes over a full grid.
pub trait KernelBackend: Send {
    fn label(&self) -> &str;

    /// Resolves a pass. Failing here aborts solver construction.
    fn compile(&self, pass: PassName) -> anyhow::Result<CompiledPass>;

    /// Evaluates `pass` for every texel of `target`. `inputs` follow `pass.slots()`.
    fn dispatch(&self, pass: &CompiledPass, inputs: &[&Field], params: &PassParams, target: Target<'_>);
}

/// All passes compiled against one backend.
pub struct KernelSet {
    backend: Box<dyn KernelBackend>,
    passes: Vec<CompiledPass>,
}

impl KernelSet {
    pub fn compile(backend: Box<dyn KernelBackend>) -> anyhow::Result<Self> {
        let mut passes = Vec::with_capacity(PassName::ALL.len());
        for name in PassName::ALL {
            let pass = backend
                .compile(name)
                .with_context(|| format!("backend `{}` failed to compile the `{name}` pass", backend.label()))?;
            log::debug!("compiled `{}` pass on `{}` backend", name, backend.label());
            passes.push(pass);
        }

        Ok(Self { backend, passes })
    }

    pub fn backend_label(&self) -> &str {
        self.backend.label()
    }

    pub fn pass(&self, name: PassName) -> &CompiledPass {
        &self.passes[name.index()]
    }

    /// Runs the pass selected by `params`. A wrong input count or target kind is
    /// logged and the invocation skipped.
    pub fn run(&self, params: &PassParams, inputs: &[&Field], target: Target<'_>) {
        let pass = self.pass(params.pass());

        if inputs.len() != pass.slots().len() {
            log::warn!(
                "`{}` pass expects {} inputs ({:?}), got {}",
                pass.name(),
                pass.slots().len(),
                pass.slots(),
                inputs.len()
            );
            return;
        }

        let surface_target = matches!(target, Target::Surface(_));
        if surface_target != pass.name().writes_surface() {
            log::warn!("`{}` pass given the wrong kind of target", pass.name());
            return;
        }

        self.backend.dispatch(pass, inputs, params, target);
    }
}
