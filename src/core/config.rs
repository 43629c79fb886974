//! Configuration system for session behaviour
//!
//! Every tunable of the engine lives here. Presets are available through
//! [`ConfigProfile`], and a full [`SessionConfig`] can be read from a JSON
//! file where missing fields fall back to their defaults.

use crate::core::constants::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigProfile {
    /// Wheel-resize on hover only, diameters up to 500
    Classic,
    /// Wheel-resize on hover or drag, diameters up to 600, autosave on
    Persistent,
    Custom(SessionConfig),
}

impl ConfigProfile {
    pub fn resolve(&self) -> SessionConfig {
        match self {
            Self::Classic => SessionConfig {
                tokens: TokenConfig {
                    max_diameter: CLASSIC_MAX_TOKEN_DIAMETER,
                    resize_binding: ResizeBinding::Hover,
                    ..TokenConfig::default()
                },
                persistence: PersistenceConfig {
                    autosave: false,
                    ..PersistenceConfig::default()
                },
                ..SessionConfig::default()
            },
            Self::Persistent => SessionConfig {
                tokens: TokenConfig {
                    max_diameter: MAX_TOKEN_DIAMETER,
                    resize_binding: ResizeBinding::HoverOrDrag,
                    ..TokenConfig::default()
                },
                persistence: PersistenceConfig {
                    autosave: true,
                    ..PersistenceConfig::default()
                },
                ..SessionConfig::default()
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for ConfigProfile {
    fn default() -> Self {
        Self::Persistent
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub viewport: ViewportConfig,
    pub fog: FogConfig,
    pub tokens: TokenConfig,
    pub overlay: OverlayConfig,
    pub persistence: PersistenceConfig,
    pub import: ImportConfig,
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_intensity: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            zoom_intensity: ZOOM_INTENSITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    /// Manual brush radius in native pixels
    pub brush_size: f64,
    /// Token reveal radius = diameter * multiplier
    pub reveal_multiplier: f64,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            brush_size: DEFAULT_BRUSH_SIZE,
            reveal_multiplier: REVEAL_MULTIPLIER,
        }
    }
}

/// Which pointer state turns a wheel gesture into a token resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeBinding {
    Hover,
    Drag,
    HoverOrDrag,
}

impl ResizeBinding {
    pub fn allows_hover(self) -> bool {
        matches!(self, Self::Hover | Self::HoverOrDrag)
    }

    pub fn allows_drag(self) -> bool {
        matches!(self, Self::Drag | Self::HoverOrDrag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub default_diameter: f64,
    pub min_diameter: f64,
    pub max_diameter: f64,
    pub resize_step: f64,
    pub resize_binding: ResizeBinding,
    /// Ordered border palette. Entries are any CSS color string; scenes
    /// store an entry by value when it maps back to a single index and by
    /// index otherwise.
    pub palette: Vec<String>,
    pub default_color_index: usize,
    pub default_label: String,
}

impl TokenConfig {
    pub fn clamp_diameter(&self, diameter: f64) -> f64 {
        if diameter.is_nan() {
            return self.default_diameter.clamp(self.min_diameter, self.max_diameter);
        }
        diameter.clamp(self.min_diameter, self.max_diameter)
    }

    pub fn palette_len(&self) -> usize {
        self.palette.len().max(1)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            default_diameter: DEFAULT_TOKEN_DIAMETER,
            min_diameter: MIN_TOKEN_DIAMETER,
            max_diameter: MAX_TOKEN_DIAMETER,
            resize_step: TOKEN_RESIZE_STEP,
            resize_binding: ResizeBinding::HoverOrDrag,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            default_color_index: 0,
            default_label: DEFAULT_TOKEN_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub pixels_per_unit: f64,
    pub unit_suffix: String,
    pub effect_line_lifetime_ms: u64,
    pub burst_lifetime_ms: u64,
}

impl OverlayConfig {
    pub fn effect_line_lifetime(&self) -> Duration {
        Duration::from_millis(self.effect_line_lifetime_ms)
    }

    pub fn burst_lifetime(&self) -> Duration {
        Duration::from_millis(self.burst_lifetime_ms)
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            pixels_per_unit: PIXELS_PER_UNIT,
            unit_suffix: "m".to_string(),
            effect_line_lifetime_ms: EFFECT_LINE_LIFETIME_MS,
            burst_lifetime_ms: BURST_LIFETIME_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub autosave: bool,
    pub debounce_ms: u64,
    /// Directory used by the file-backed store
    pub store_dir: Option<PathBuf>,
}

impl PersistenceConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            autosave: true,
            debounce_ms: AUTOSAVE_DEBOUNCE_MS,
            store_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Keep the current tokens until an import has fully loaded.
    /// Off by default: tokens are cleared as soon as an import starts.
    pub defer_token_clear: bool,
}
