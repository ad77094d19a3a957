use std::fs;
use std::path::Path;

use ratatui::style::Color;
use serde::Deserialize;
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub error: Color,
    pub warning: Color,
    pub muted: Color,
    pub text: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color::Rgb(0, 255, 157),
            secondary: Color::Rgb(0, 191, 255),
            error: Color::Rgb(255, 75, 75),
            warning: Color::Rgb(255, 215, 0),
            muted: Color::Rgb(102, 102, 102),
            text: Color::Rgb(255, 255, 255),
        }
    }
}

impl Theme {
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path_ref = path.as_ref();
        match fs::read_to_string(path_ref) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(theme) => theme,
                Err(err) => {
                    warn!(
                        path = %path_ref.display(),
                        error = %err,
                        "theme parse failed, using defaults"
                    );
                    Self::default()
                }
            },
            Err(err) => {
                warn!(
                    path = %path_ref.display(),
                    error = %err,
                    "theme read failed, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Parses a palette. Colours missing from the file keep their default.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ThemeToml = toml::from_str(s)?;
        let base = Self::default();
        let pick =
            |value: Option<RgbToml>, fallback: Color| value.map_or(fallback, RgbToml::to_color);
        Ok(Self {
            primary: pick(cfg.colors.primary, base.primary),
            secondary: pick(cfg.colors.secondary, base.secondary),
            error: pick(cfg.colors.error, base.error),
            warning: pick(cfg.colors.warning, base.warning),
            muted: pick(cfg.colors.muted, base.muted),
            text: pick(cfg.colors.text, base.text),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ThemeToml {
    colors: ThemeColorsToml,
}

#[derive(Debug, Deserialize)]
struct ThemeColorsToml {
    primary: Option<RgbToml>,
    secondary: Option<RgbToml>,
    error: Option<RgbToml>,
    warning: Option<RgbToml>,
    muted: Option<RgbToml>,
    text: Option<RgbToml>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RgbToml {
    r: u8,
    g: u8,
    b: u8,
}

impl RgbToml {
    fn to_color(self) -> Color {
        Color::Rgb(self.r, self.g, self.b)
    }
}
