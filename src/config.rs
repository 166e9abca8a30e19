//! Tunable simulation parameters and their JSON persistence.

use crate::palette::PaletteName;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Key used for persisted settings in the desktop app's storage.
pub const SETTINGS_KEY: &str = "psychFluidSettings";

/// Hardware class. Phones get fewer pressure iterations and fewer splats per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

impl DeviceClass {
    pub fn pressure_iterations(self) -> i32 {
        match self {
            DeviceClass::Desktop => 50,
            DeviceClass::Mobile => 10,
        }
    }

    /// Radial splats issued per frame by a touch burst.
    pub fn burst_splats(self) -> usize {
        match self {
            DeviceClass::Desktop => 12,
            DeviceClass::Mobile => 6,
        }
    }

    /// Outward push splats around a splat center.
    pub fn push_splats(self) -> usize {
        match self {
            DeviceClass::Desktop => 8,
            DeviceClass::Mobile => 4,
        }
    }

    /// Interpolated sub-splats per unit of UV distance on pointer moves.
    pub fn pointer_steps_per_unit(self) -> f32 {
        match self {
            DeviceClass::Desktop => 50.0,
            DeviceClass::Mobile => 20.0,
        }
    }

    pub fn warm_up_splats(self) -> usize {
        match self {
            DeviceClass::Desktop => 30,
            DeviceClass::Mobile => 15,
        }
    }

    pub fn warm_up_steps(self) -> usize {
        match self {
            DeviceClass::Desktop => 60,
            DeviceClass::Mobile => 30,
        }
    }
}

/// Flat parameter set read by every component once per frame.
///
/// Values are not range-checked. A negative `pressure_iterations` runs no
/// relaxation; zero radii and durations are clamped where they would divide by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FluidConfig {
    // Simulation
    pub sim_resolution: f32,
    pub dye_resolution: f32,
    pub pressure_iterations: i32,
    pub velocity_dissipation: f32,
    pub density_dissipation: f32,

    // Vorticity
    pub curl: f32,
    pub curl_radius: f32,

    // Touch input
    pub touch_splat_radius: f32,
    pub splat_force: f32,
    pub touch_splat_push: f32,
    pub touch_splat_brightness: f32,

    // Auto splats
    pub auto_splat_rate: f32,
    pub auto_splat_radius: f32,
    pub auto_splat_velocity: f32,
    pub auto_splat_fade_duration: f32,
    pub auto_splat_push: f32,

    // Display
    pub brightness: f32,
    #[serde(rename = "normalizeHDR")]
    pub normalize_hdr: bool,
    pub posterize: bool,
    pub outline_thickness: f32,
    pub palette: PaletteName,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self::for_device(DeviceClass::Desktop)
    }
}

impl FluidConfig {
    pub fn for_device(device: DeviceClass) -> Self {
        Self {
            sim_resolution: 64.0,
            dye_resolution: 256.0,
            pressure_iterations: device.pressure_iterations(),
            velocity_dissipation: 1.0,
            density_dissipation: 0.994,
            curl: 0.0,
            curl_radius: 1.0,
            touch_splat_radius: 0.25,
            splat_force: 1000.0,
            touch_splat_push: 300.0,
            touch_splat_brightness: 0.4,
            auto_splat_rate: 20.0,
            auto_splat_radius: 0.6,
            auto_splat_velocity: 150.0,
            auto_splat_fade_duration: 3.2,
            auto_splat_push: 500.0,
            brightness: 0.9,
            normalize_hdr: true,
            posterize: true,
            outline_thickness: 2.0,
            palette: PaletteName::Rainbow,
        }
    }

    /// Parses stored settings on top of the device defaults.
    ///
    /// Keys missing from `json` keep their defaults and unknown keys are ignored,
    /// so files written by older or newer builds still load.
    pub fn from_json(json: &str, device: DeviceClass) -> anyhow::Result<Self> {
        let stored: serde_json::Value = serde_json::from_str(json).context("settings are not valid JSON")?;
        let serde_json::Value::Object(stored) = stored else {
            anyhow::bail!("settings must be a JSON object");
        };

        let mut merged = serde_json::to_value(Self::for_device(device))?;
        if let serde_json::Value::Object(defaults) = &mut merged {
            for (key, value) in stored {
                if defaults.contains_key(&key) {
                    defaults.insert(key, value);
                }
            }
        }

        serde_json::from_value(merged).context("settings contain a value of the wrong type")
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize settings")
    }

    pub fn load(path: &Path, device: DeviceClass) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        let config = Self::from_json(&json, device)
            .with_context(|| format!("failed to parse settings in {}", path.display()))?;
        log::info!("loaded settings from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("failed to write settings to {}", path.display()))?;
        log::info!("saved settings to {}", path.display());
        Ok(())
    }
}
