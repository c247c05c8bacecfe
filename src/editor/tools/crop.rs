use serde::Deserialize;

use super::{adjust_ratio_to_fit, CROP_MIN_SIZE};
use crate::geometry::{ImageBounds, PixelRect};
use crate::surface::{Surface, SurfaceError, SurfaceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum CropPreset {
    #[default]
    #[serde(rename = "16:9")]
    Ratio16x9,
    #[serde(rename = "1:1")]
    Ratio1x1,
    #[serde(rename = "9:16")]
    Ratio9x16,
}

impl CropPreset {
    pub const ALL: [CropPreset; 3] = [Self::Ratio16x9, Self::Ratio1x1, Self::Ratio9x16];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Ratio16x9 => "16:9",
            Self::Ratio1x1 => "1:1",
            Self::Ratio9x16 => "9:16",
        }
    }

    pub const fn ratio(self) -> (u32, u32) {
        match self {
            Self::Ratio16x9 => (16, 9),
            Self::Ratio1x1 => (1, 1),
            Self::Ratio9x16 => (9, 16),
        }
    }
}

/// Pending crop selection; nothing is applied until the session commits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropState {
    preset: CropPreset,
    pending: Option<PixelRect>,
}

impl CropState {
    pub const fn new() -> Self {
        Self {
            preset: CropPreset::Ratio16x9,
            pending: None,
        }
    }

    pub const fn preset(&self) -> CropPreset {
        self.preset
    }

    pub const fn pending_region(&self) -> Option<PixelRect> {
        self.pending
    }

    /// Stores `region` clamped into `bounds`; a region with nothing left
    /// after clamping is ignored.
    pub fn set_region(&mut self, region: PixelRect, bounds: ImageBounds) -> Option<PixelRect> {
        match region.clamp_to(bounds) {
            Some(clamped) => {
                self.pending = Some(clamped);
                Some(clamped)
            }
            None => {
                tracing::debug!(?region, ?bounds, "ignoring crop region outside image");
                self.pending
            }
        }
    }

    /// Switches the aspect preset and re-derives the pending region, if any,
    /// so it matches the new ratio and stays inside `bounds`.
    pub fn set_aspect(&mut self, preset: CropPreset, bounds: ImageBounds) -> Option<PixelRect> {
        self.preset = preset;
        self.pending = self
            .pending
            .and_then(|region| region.clamp_to(bounds))
            .map(|region| fit_region_to_ratio(region, preset.ratio(), bounds));
        self.pending
    }

    /// Region a crop would use right now: the pending selection, or the full
    /// image when nothing was selected.
    pub fn resolved_region(&self, bounds: ImageBounds) -> PixelRect {
        self.pending
            .and_then(|region| region.clamp_to(bounds))
            .unwrap_or_else(|| PixelRect::full(bounds))
    }

    pub fn reset(&mut self) {
        self.pending = None;
    }
}

/// Shrinks `region` around its center to the largest rectangle of the given
/// ratio. Falls back to the whole image when the region is too small to hold
/// that ratio, and never returns an empty or out-of-bounds rectangle for a
/// non-empty `bounds`.
pub(crate) fn fit_region_to_ratio(
    region: PixelRect,
    (ratio_x, ratio_y): (u32, u32),
    bounds: ImageBounds,
) -> PixelRect {
    let (mut width, mut height) =
        adjust_ratio_to_fit(region.width, region.height, ratio_x, ratio_y);
    let mut anchor = region;
    if width < CROP_MIN_SIZE.min(region.width)
        || height < CROP_MIN_SIZE.min(region.height)
        || width == 0
        || height == 0
    {
        let (full_width, full_height) =
            adjust_ratio_to_fit(bounds.width, bounds.height, ratio_x, ratio_y);
        width = full_width;
        height = full_height;
        anchor = PixelRect::full(bounds);
    }
    let width = width.clamp(1, bounds.width.max(1));
    let height = height.clamp(1, bounds.height.max(1));

    let (center_x, center_y) = anchor.center();
    let x = centered_offset(center_x, width, bounds.width);
    let y = centered_offset(center_y, height, bounds.height);
    PixelRect::new(x, y, width, height)
}

fn centered_offset(center: f64, extent: u32, limit: u32) -> u32 {
    let max_offset = limit.saturating_sub(extent);
    let start = (center - f64::from(extent) / 2.0).round();
    if start <= 0.0 {
        0
    } else {
        (start as u32).min(max_offset)
    }
}

/// Produces a new surface holding exactly `region` of `surface`, drawn at the
/// origin.
pub fn apply_crop(surface: &Surface, region: PixelRect) -> SurfaceResult<Surface> {
    let bounds = surface.bounds();
    if !region.fits_within(bounds) {
        return Err(SurfaceError::RegionOutOfBounds {
            region,
            width: bounds.width,
            height: bounds.height,
        });
    }

    let mut cropped = Surface::blank(region.width, region.height);
    cropped.draw_subregion(
        surface.image(),
        region,
        PixelRect::new(0, 0, region.width, region.height),
    )?;
    Ok(cropped)
}
