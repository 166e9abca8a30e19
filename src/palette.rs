//! Color palettes and the color provider used for splats.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-channel jitter applied to ambient palette colors.
const AMBIENT_VARIATION: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaletteName {
    #[default]
    Rainbow,
    Synthwave,
    RetroSwirl,
    DripWave,
    FreshPop,
    SeventiesGroove,
    PurpleHaze,
    PopArt,
    /// No fixed colors: hues cycle continuously through HSL space.
    Spectrum,
}

const fn rgb(r: f32, g: f32, b: f32) -> Vec3 {
    Vec3::new(r, g, b)
}

const RAINBOW: [Vec3; 8] = [
    rgb(1.0, 0.0, 0.0),
    rgb(1.0, 0.5, 0.0),
    rgb(1.0, 1.0, 0.0),
    rgb(0.0, 1.0, 0.0),
    rgb(0.0, 1.0, 1.0),
    rgb(0.0, 0.0, 1.0),
    rgb(0.5, 0.0, 1.0),
    rgb(1.0, 0.0, 0.5),
];

const SYNTHWAVE: [Vec3; 5] = [
    rgb(1.0, 0.08, 0.58),
    rgb(1.0, 0.84, 0.0),
    rgb(0.0, 0.81, 0.82),
    rgb(0.58, 0.0, 0.83),
    rgb(1.0, 0.41, 0.71),
];

const RETRO_SWIRL: [Vec3; 5] = [
    rgb(0.83, 0.66, 0.29),
    rgb(0.91, 0.52, 0.49),
    rgb(0.96, 0.65, 0.69),
    rgb(0.49, 0.71, 0.84),
    rgb(0.55, 0.78, 0.49),
];

const DRIP_WAVE: [Vec3; 5] = [
    rgb(0.95, 0.75, 0.2),
    rgb(0.9, 0.45, 0.5),
    rgb(0.3, 0.75, 0.85),
    rgb(0.28, 0.28, 0.7),
    rgb(0.6, 0.35, 0.75),
];

const FRESH_POP: [Vec3; 5] = [
    rgb(0.35, 0.7, 0.8),
    rgb(0.55, 0.85, 0.45),
    rgb(0.9, 0.78, 0.4),
    rgb(0.92, 0.38, 0.45),
    rgb(0.75, 0.25, 0.75),
];

const SEVENTIES_GROOVE: [Vec3; 5] = [
    rgb(0.2, 0.55, 0.6),
    rgb(0.85, 0.3, 0.25),
    rgb(0.95, 0.65, 0.2),
    rgb(0.95, 0.88, 0.7),
    rgb(0.3, 0.45, 0.5),
];

const PURPLE_HAZE: [Vec3; 5] = [
    rgb(0.7, 0.3, 0.65),
    rgb(0.95, 0.25, 0.55),
    rgb(0.95, 0.5, 0.35),
    rgb(1.0, 0.8, 0.3),
    rgb(0.8, 0.5, 0.7),
];

const POP_ART: [Vec3; 5] = [
    rgb(1.0, 0.15, 0.55),
    rgb(1.0, 0.5, 0.15),
    rgb(0.2, 0.85, 0.4),
    rgb(0.95, 0.3, 0.4),
    rgb(0.85, 0.25, 0.7),
];

impl PaletteName {
    pub const ALL: [PaletteName; 9] = [
        PaletteName::Rainbow,
        PaletteName::Synthwave,
        PaletteName::RetroSwirl,
        PaletteName::DripWave,
        PaletteName::FreshPop,
        PaletteName::SeventiesGroove,
        PaletteName::PurpleHaze,
        PaletteName::PopArt,
        PaletteName::Spectrum,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            PaletteName::Rainbow => "Rainbow",
            PaletteName::Synthwave => "Synthwave Sunset",
            PaletteName::RetroSwirl => "Retro Swirl",
            PaletteName::DripWave => "Drip Wave",
            PaletteName::FreshPop => "Fresh Pop",
            PaletteName::SeventiesGroove => "70s Groove",
            PaletteName::PurpleHaze => "Purple Haze",
            PaletteName::PopArt => "Pop Art",
            PaletteName::Spectrum => "Spectrum",
        }
    }

    /// Fixed colors, empty for [`PaletteName::Spectrum`].
    pub fn colors(self) -> &'static [Vec3] {
        match self {
            PaletteName::Rainbow => &RAINBOW,
            PaletteName::Synthwave => &SYNTHWAVE,
            PaletteName::RetroSwirl => &RETRO_SWIRL,
            PaletteName::DripWave => &DRIP_WAVE,
            PaletteName::FreshPop => &FRESH_POP,
            PaletteName::SeventiesGroove => &SEVENTIES_GROOVE,
            PaletteName::PurpleHaze => &PURPLE_HAZE,
            PaletteName::PopArt => &POP_ART,
            PaletteName::Spectrum => &[],
        }
    }
}

/// Hue in degrees (any range), saturation and lightness in [0, 1].
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Vec3 {
    let h = hue.rem_euclid(360.0);
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = lightness - c / 2.0;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    Vec3::new(r + m, g + m, b + m)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorRequest {
    /// Periodic and warm-up splats. `base_hue` is the global hue clock in degrees.
    Ambient { base_hue: f32 },
    /// Splats tied to a pointer whose hue keeps drifting while it is held.
    Pointer { hue: f32 },
}

/// Supplies RGB colors in [0, 1] for new splats.
pub trait ColorProvider {
    fn request_color(&mut self, request: ColorRequest) -> Vec3;

    /// Colors the display pass may snap to when posterizing.
    fn display_palette(&self) -> Vec<Vec3>;

    fn set_palette(&mut self, palette: PaletteName);
}

/// Walks a named palette in order, with a little random jitter for ambient splats.
#[derive(Debug, Clone)]
pub struct PaletteColors<R: Rng> {
    palette: PaletteName,
    index: usize,
    rng: R,
}

impl<R: Rng> PaletteColors<R> {
    pub fn new(palette: PaletteName, rng: R) -> Self {
        Self { palette, index: 0, rng }
    }

    pub fn palette(&self) -> PaletteName {
        self.palette
    }
}

impl<R: Rng> ColorProvider for PaletteColors<R> {
    fn request_color(&mut self, request: ColorRequest) -> Vec3 {
        let colors = self.palette.colors();

        match request {
            ColorRequest::Ambient { base_hue } => {
                if colors.is_empty() {
                    return hsl_to_rgb(base_hue + self.rng.gen_range(0.0..120.0), 1.0, 0.5);
                }

                let base = colors[self.index % colors.len()];
                self.index = self.index.wrapping_add(1);

                let mut jitter = || (self.rng.gen_range(0.0..1.0) - 0.5) * AMBIENT_VARIATION;
                Vec3::new(
                    (base.x + jitter()).clamp(0.0, 1.0),
                    (base.y + jitter()).clamp(0.0, 1.0),
                    (base.z + jitter()).clamp(0.0, 1.0),
                )
            }
            ColorRequest::Pointer { hue } => {
                if colors.is_empty() {
                    return hsl_to_rgb(hue, 1.0, 0.5);
                }
                let slot = (hue / 60.0).floor().max(0.0) as usize;
                colors[slot % colors.len()]
            }
        }
    }

    fn display_palette(&self) -> Vec<Vec3> {
        self.palette.colors().to_vec()
    }

    fn set_palette(&mut self, palette: PaletteName) {
        if palette != self.palette {
            self.palette = palette;
            self.index = 0;
        }
    }
}
