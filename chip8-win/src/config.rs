//! Frontend settings.
use std::path::Path;

use chip8::{constants::*, prelude::Chip8Conf};
use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_SCALE_FACTOR: u32 = 20;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Virtual machine parameters.
    pub vm: Chip8Conf,
    /// Size of one CHIP-8 pixel, in window pixels.
    pub scale_factor: u32,
    /// Colour of lit pixels.
    pub foreground: Color,
    /// Colour of unlit pixels.
    pub background: Color,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vm: Chip8Conf::default(),
            scale_factor: DEFAULT_SCALE_FACTOR,
            foreground: Color::WHITE,
            background: Color::BLACK,
        }
    }
}

impl AppConfig {
    pub fn from_file(filepath: impl AsRef<Path>) -> Result<Self, AppError> {
        let file = std::fs::File::open(filepath)?;
        let config: Self = serde_yaml::from_reader(file)?;
        log::debug!("loaded config: {config:?}");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, AppError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Initial window size in physical pixels.
    pub fn window_size(&self) -> (u32, u32) {
        let scale = self.scale_factor.max(1);
        (DISPLAY_WIDTH as u32 * scale, DISPLAY_HEIGHT as u32 * scale)
    }
}

/// Colour packed as `0xRRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0xFFFFFFFF);
    pub const BLACK: Color = Color(0x000000FF);

    /// Normalised RGBA channels.
    pub fn to_f32(self) -> [f32; 4] {
        let [r, g, b, a] = self.0.to_be_bytes();
        [r, g, b, a].map(|c| c as f32 / 255.0)
    }
}
