use std::fmt;
use std::path::PathBuf;

use crate::config::WatermarkConfig;
use crate::geometry::{Color, ImageBounds};
use crate::surface::{resolve_font, FontArc, Surface, SurfaceResult, TextAnchor, TextPlacement};

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkOptions {
    pub text: String,
    pub font_size_fraction: f32,
    pub opacity: f32,
    pub anchor: TextAnchor,
    pub color: Color,
    pub font_family: String,
    pub font_path: Option<PathBuf>,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self::from(&WatermarkConfig::default())
    }
}

impl From<&WatermarkConfig> for WatermarkOptions {
    fn from(config: &WatermarkConfig) -> Self {
        Self {
            text: config.text.clone(),
            font_size_fraction: config.font_size_fraction,
            opacity: config.opacity.clamp(0.0, 1.0),
            anchor: TextAnchor::bottom_right_inset(
                config.inset_x_fraction,
                config.inset_y_fraction,
            ),
            color: Color::WHITE,
            font_family: config.font_family.clone(),
            font_path: config.font_path.clone(),
        }
    }
}

impl WatermarkOptions {
    /// Baseline origin and pixel size the stamp takes on a raster of `bounds`.
    pub fn layout(&self, bounds: ImageBounds) -> TextPlacement {
        TextPlacement::resolve(bounds, self.font_size_fraction, self.anchor)
    }
}

/// Fixed-text stamp. The font is resolved on first use and kept afterwards.
#[derive(Clone, Default)]
pub struct Watermark {
    options: WatermarkOptions,
    font: Option<FontArc>,
}

impl fmt::Debug for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watermark")
            .field("options", &self.options)
            .field("font_loaded", &self.font.is_some())
            .finish()
    }
}

impl Watermark {
    pub fn new(options: WatermarkOptions) -> Self {
        Self {
            options,
            font: None,
        }
    }

    pub fn with_font(options: WatermarkOptions, font: FontArc) -> Self {
        Self {
            options,
            font: Some(font),
        }
    }

    pub fn options(&self) -> &WatermarkOptions {
        &self.options
    }

    /// Font used for the stamp, resolving it on first call.
    pub fn font(&mut self) -> SurfaceResult<FontArc> {
        if let Some(font) = &self.font {
            return Ok(font.clone());
        }
        let font = resolve_font(self.options.font_path.as_deref(), &self.options.font_family)?;
        self.font = Some(font.clone());
        Ok(font)
    }

    /// Draws the stamp with an already resolved font.
    pub fn stamp(&self, surface: &mut Surface, font: &FontArc) -> bool {
        surface.stamp_text(
            &self.options.text,
            font,
            self.options.font_size_fraction,
            self.options.opacity,
            self.options.anchor,
            self.options.color,
        )
    }
}
