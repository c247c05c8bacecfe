mod brush;
mod crop;
mod watermark;

use crate::state::EditMode;

pub use brush::{BlurBrush, BrushOptions};
pub use crop::{apply_crop, CropPreset, CropState};
pub use watermark::{Watermark, WatermarkOptions};

pub const CROP_MIN_SIZE: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Crop,
    Brush,
    Watermark,
    AiTransform,
}

impl ToolKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Brush => "brush",
            Self::Watermark => "watermark",
            Self::AiTransform => "ai transform",
        }
    }

    /// Mode in which the tool is offered; every tool belongs to exactly one.
    pub const fn home_mode(self) -> EditMode {
        match self {
            Self::Crop => EditMode::Crop,
            Self::Brush | Self::Watermark => EditMode::Effects,
            Self::AiTransform => EditMode::AiTools,
        }
    }

    pub fn available_in(self, mode: EditMode) -> bool {
        self.home_mode() == mode
    }
}

pub(crate) fn adjust_ratio_to_fit(
    width: u32,
    height: u32,
    ratio_x: u32,
    ratio_y: u32,
) -> (u32, u32) {
    let target_w = scale_ratio_dimension(height, ratio_x, ratio_y);
    let target_h = scale_ratio_dimension(width, ratio_y, ratio_x);

    if target_w <= width {
        (target_w, height)
    } else {
        (width, target_h)
    }
}

pub(crate) fn scale_ratio_dimension(base: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        0
    } else {
        let scaled = (u64::from(base) * u64::from(numerator)) / u64::from(denominator);
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }
}
