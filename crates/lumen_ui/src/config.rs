//! # UI Configuration
//!
//! Screen definitions and router limits, loaded once at startup from TOML:
//!
//! ```toml
//! [[screen]]
//! name = "hud"
//! screen_type = "overlay"
//! resolution = [1280.0, 720.0]
//! reference_resolution = [1920.0, 1080.0]
//! scale_mode = "blend"
//! scale_blend = 0.5
//!
//! [router]
//! max_pointers = 10
//! ```
//!
//! Every field has a default. Out-of-range numbers are clamped when the
//! screen is built, never rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{UiError, UiResult};
use crate::screen::{ScaleMode, ScreenType};

/// Configuration of one screen context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Debug name, also used for the screen's scene node.
    pub name: String,
    /// Coordinate regime.
    pub screen_type: ScreenType,
    /// Device resolution in pixels.
    pub resolution: [f32; 2],
    /// Resolution the layout was authored for.
    pub reference_resolution: [f32; 2],
    /// How layout units follow device pixels.
    pub scale_mode: ScaleMode,
    /// `0` follows width, `1` follows height.
    pub scale_blend: f32,
    /// Router order, higher first.
    pub priority: i32,
    /// Camera screens: distance in front of the camera.
    pub screen_distance: f32,
    /// World units per layout unit (camera and world screens).
    pub world_scale: f32,
    /// Disabled screens are skipped by the router.
    pub enabled: bool,
}

impl ScreenConfig {
    /// Default world units per layout unit.
    pub const DEFAULT_WORLD_SCALE: f32 = 0.01;

    /// Overlay screen at the given resolution.
    #[must_use]
    pub fn overlay(name: impl Into<String>, width: f32, height: f32) -> Self {
        Self {
            name: name.into(),
            resolution: [width, height],
            reference_resolution: [width, height],
            ..Self::default()
        }
    }

    /// Sets the screen type.
    #[must_use]
    pub fn with_type(mut self, screen_type: ScreenType) -> Self {
        self.screen_type = screen_type;
        self
    }

    /// Sets the router priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets blend scaling against a reference resolution.
    #[must_use]
    pub const fn with_blend(mut self, reference: [f32; 2], blend: f32) -> Self {
        self.scale_mode = ScaleMode::Blend;
        self.reference_resolution = reference;
        self.scale_blend = blend;
        self
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            name: String::from("screen"),
            screen_type: ScreenType::Overlay,
            resolution: [1280.0, 720.0],
            reference_resolution: [1280.0, 720.0],
            scale_mode: ScaleMode::None,
            scale_blend: 0.5,
            priority: 0,
            screen_distance: 1.0,
            world_scale: Self::DEFAULT_WORLD_SCALE,
            enabled: true,
        }
    }
}

/// Pointer router limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Maximum simultaneously tracked pointer ids. Samples for new ids
    /// beyond this are dropped.
    pub max_pointers: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { max_pointers: 16 }
    }
}

/// Top-level UI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Screens created at startup.
    #[serde(rename = "screen")]
    pub screens: Vec<ScreenConfig>,
    /// Router limits.
    pub router: RouterConfig,
}

impl UiConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidConfig`] if the text is not valid TOML or
    /// has fields of the wrong type.
    pub fn from_toml_str(text: &str) -> UiResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ConfigIo`] if the file cannot be read and
    /// [`UiError::InvalidConfig`] if it does not parse.
    pub fn load(path: impl AsRef<Path>) -> UiResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| UiError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("loaded {} screen(s) from {}", config.screens.len(), path.display());
        Ok(config)
    }
}
