//! Overlay configuration.
//!
//! Tunable limits for the annotation overlay: size floors, the drag clamp
//! extent, zoom bounds and export styling. Configuration can be loaded from a
//! JSON file, environment variables, or built programmatically.

use crate::geometry::Size;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Zoom limits and step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub initial: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: 0.5, max: 3.0, step: 0.1, initial: 1.0 }
    }
}

impl ZoomLimits {
    /// Positive ordered bounds, a positive step and an initial zoom between them
    pub fn is_valid(&self) -> bool {
        self.min > 0.0
            && self.min <= self.max
            && self.step > 0.0
            && (self.min..=self.max).contains(&self.initial)
    }
}

/// Configuration for the annotation overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Smallest size a signature can be resized to (document units)
    pub min_size: Size,
    /// Size given to signatures created without one
    pub default_signature_size: Size,
    /// Extent used to keep a dragged annotation inside the page
    pub drag_extent: Size,
    pub zoom: ZoomLimits,
    /// Opacity of comment backgrounds in exported documents
    pub comment_background_opacity: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            min_size: Size::new(50.0, 30.0),
            default_signature_size: Size::new(200.0, 80.0),
            drag_extent: Size::new(120.0, 60.0),
            zoom: ZoomLimits::default(),
            comment_background_opacity: 0.8,
        }
    }
}

impl OverlayConfig {
    pub fn with_min_size(mut self, size: Size) -> Self {
        self.min_size = size;
        self
    }

    pub fn with_default_signature_size(mut self, size: Size) -> Self {
        self.default_signature_size = size;
        self
    }

    pub fn with_drag_extent(mut self, size: Size) -> Self {
        self.drag_extent = size;
        self
    }

    pub fn with_zoom(mut self, zoom: ZoomLimits) -> Self {
        self.zoom = zoom;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `OVERLAY_MIN_WIDTH` / `OVERLAY_MIN_HEIGHT`: signature size floor (default: 50 x 30)
    /// - `OVERLAY_DRAG_WIDTH` / `OVERLAY_DRAG_HEIGHT`: drag clamp extent (default: 120 x 60)
    /// - `OVERLAY_ZOOM_MIN` / `OVERLAY_ZOOM_MAX`: zoom bounds (default: 0.5 / 3.0)
    ///
    /// # Errors
    /// Returns an error if any variable is set to something other than a positive number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let targets: [(&str, &mut f32); 6] = [
            ("OVERLAY_MIN_WIDTH", &mut config.min_size.width),
            ("OVERLAY_MIN_HEIGHT", &mut config.min_size.height),
            ("OVERLAY_DRAG_WIDTH", &mut config.drag_extent.width),
            ("OVERLAY_DRAG_HEIGHT", &mut config.drag_extent.height),
            ("OVERLAY_ZOOM_MIN", &mut config.zoom.min),
            ("OVERLAY_ZOOM_MAX", &mut config.zoom.max),
        ];
        for (key, target) in targets {
            if let Ok(value) = std::env::var(key) {
                *target = parse_positive(key, &value)?;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    ///
    /// Missing keys keep their defaults:
    /// ```json
    /// { "minSize": { "width": 50, "height": 30 }, "zoom": { "max": 4.0 } }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("minSize", self.min_size),
            ("defaultSignatureSize", self.default_signature_size),
            ("dragExtent", self.drag_extent),
        ];
        if let Some((key, _)) = sizes.iter().find(|(_, size)| !size.is_positive()) {
            return Err(ConfigError::InvalidValue((*key).to_owned()));
        }

        if !self.zoom.is_valid() {
            return Err(ConfigError::InvalidValue("zoom".to_owned()));
        }

        if !(0.0..=1.0).contains(&self.comment_background_opacity) {
            return Err(ConfigError::InvalidValue("commentBackgroundOpacity".to_owned()));
        }
        Ok(())
    }
}

fn parse_positive(key: &str, value: &str) -> Result<f32, ConfigError> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| ConfigError::InvalidValue(key.to_owned()))
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
