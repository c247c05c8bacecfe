use std::path::Path;

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use font_kit::family_name::FamilyName;
use font_kit::properties::{Properties, Weight};
use font_kit::source::SystemSource;
use image::RgbaImage;

use super::{SurfaceError, SurfaceResult};
use crate::geometry::{Color, ImageBounds, RasterPoint};

/// Text anchor expressed as an inset from the bottom-right corner, in
/// fractions of the surface dimensions. The anchor is the left end of the
/// text baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextAnchor {
    pub inset_x_fraction: f32,
    pub inset_y_fraction: f32,
}

impl TextAnchor {
    pub const fn bottom_right_inset(inset_x_fraction: f32, inset_y_fraction: f32) -> Self {
        Self {
            inset_x_fraction,
            inset_y_fraction,
        }
    }
}

/// Concrete baseline origin and pixel size for text on a given surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    pub origin: RasterPoint,
    pub font_px: f32,
}

impl TextPlacement {
    pub fn resolve(bounds: ImageBounds, font_size_fraction: f32, anchor: TextAnchor) -> Self {
        let width = bounds.width as f32;
        let height = bounds.height as f32;
        Self {
            origin: RasterPoint::new(
                width - width * anchor.inset_x_fraction,
                height - height * anchor.inset_y_fraction,
            ),
            font_px: width * font_size_fraction,
        }
    }
}

pub fn load_font(path: &Path) -> SurfaceResult<FontArc> {
    let bytes = std::fs::read(path).map_err(|err| SurfaceError::FontLoad {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    FontArc::try_from_vec(bytes).map_err(|err| SurfaceError::FontLoad {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Best bold face of `family` installed on the system, falling back to the
/// system's default sans-serif family.
pub fn load_system_font(family: &str) -> SurfaceResult<FontArc> {
    let unavailable = |message: String| SurfaceError::FontUnavailable {
        family: family.to_string(),
        message,
    };

    let mut properties = Properties::new();
    properties.weight = Weight::BOLD;
    let handle = SystemSource::new()
        .select_best_match(
            &[FamilyName::Title(family.to_string()), FamilyName::SansSerif],
            &properties,
        )
        .map_err(|err| unavailable(err.to_string()))?;
    let font = handle.load().map_err(|err| unavailable(err.to_string()))?;
    let bytes = font
        .copy_font_data()
        .ok_or_else(|| unavailable("font data is not readable".to_string()))?;
    tracing::debug!(family, resolved = %font.full_name(), "resolved system font");

    FontArc::try_from_vec(bytes.to_vec()).map_err(|err| unavailable(err.to_string()))
}

/// Loads the font file at `configured` when one is set, otherwise the best
/// bold match for `family`.
pub fn resolve_font(configured: Option<&Path>, family: &str) -> SurfaceResult<FontArc> {
    match configured {
        Some(path) => load_font(path),
        None => load_system_font(family),
    }
}

/// Scale whose em square equals `font_px`, the CSS notion of font size.
fn px_scale_for_font_size(font: &FontArc, font_px: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(font_px * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(font_px),
    }
}

pub(super) fn draw_text(
    image: &mut RgbaImage,
    text: &str,
    font: &FontArc,
    placement: &TextPlacement,
    color: Color,
    opacity: f32,
) -> bool {
    let opacity = opacity.clamp(0.0, 1.0);
    if text.is_empty() || opacity == 0.0 || !(placement.font_px > 0.0) {
        return false;
    }

    let scale = px_scale_for_font_size(font, placement.font_px);
    let scaled = font.as_scaled(scale);
    let (width, height) = image.dimensions();
    let (r, g, b) = color.rgb();
    let mut cursor_x = placement.origin.x;
    let mut last_glyph: Option<GlyphId> = None;
    let mut touched = false;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(previous) = last_glyph {
            cursor_x += scaled.kern(previous, glyph_id);
        }
        let glyph = glyph_id.with_scale_and_position(scale, point(cursor_x, placement.origin.y));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let glyph_bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = glyph_bounds.min.x as i64 + i64::from(gx);
            let py = glyph_bounds.min.y as i64 + i64::from(gy);
            if px < 0 || py < 0 || px >= i64::from(width) || py >= i64::from(height) {
                return;
            }
            let alpha = coverage.clamp(0.0, 1.0) * opacity;
            if alpha <= 0.0 {
                return;
            }

            let pixel = image.get_pixel_mut(px as u32, py as u32);
            let [dr, dg, db, da] = pixel.0;
            pixel.0 = [
                blend_channel(dr, r, alpha),
                blend_channel(dg, g, alpha),
                blend_channel(db, b, alpha),
                (alpha * 255.0 + f32::from(da) * (1.0 - alpha)).round() as u8,
            ];
            touched = true;
        });
    }

    touched
}

fn blend_channel(destination: u8, source: u8, alpha: f32) -> u8 {
    (f32::from(source) * alpha + f32::from(destination) * (1.0 - alpha))
        .round()
        .clamp(0.0, 255.0) as u8
}
