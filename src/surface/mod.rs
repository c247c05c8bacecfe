//! Working raster and its drawing primitives.
//!
//! A [`Surface`] shares its pixel buffer until it is written to, so taking a
//! snapshot before a destructive operation costs a reference count rather
//! than a full copy.

mod blur;
mod text;

use std::path::PathBuf;
use std::sync::Arc;

use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{imageops, RgbImage, RgbaImage};
use serde::Deserialize;
use thiserror::Error;

use crate::geometry::{Color, ImageBounds, PixelRect, RasterPoint};

pub(crate) use blur::blur_region;
pub use text::{load_font, load_system_font, resolve_font, TextAnchor, TextPlacement};

pub use ab_glyph::FontArc;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("decoded image has no pixels")]
    Empty,
    #[error("failed to encode image as {format}: {source}")]
    Encode {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },
    #[error("region {region:?} lies outside the {width}x{height} surface")]
    RegionOutOfBounds {
        region: PixelRect,
        width: u32,
        height: u32,
    },
    #[error("no usable {family} font found: {message}")]
    FontUnavailable { family: String, message: String },
    #[error("failed to load font {path}: {message}")]
    FontLoad { path: PathBuf, message: String },
}

pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

pub const DEFAULT_OUTPUT_QUALITY: u8 = 90;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pixels: Arc<RgbaImage>,
}

impl Surface {
    pub fn from_image(image: RgbaImage) -> SurfaceResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SurfaceError::Empty);
        }
        Ok(Self {
            pixels: Arc::new(image),
        })
    }

    /// Transparent surface of the given size; zero dimensions are bumped to 1.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            pixels: Arc::new(RgbaImage::new(width.max(1), height.max(1))),
        }
    }

    /// Decodes an encoded image at its natural size.
    pub fn decode(bytes: &[u8]) -> SurfaceResult<Self> {
        let decoded = image::load_from_memory(bytes).map_err(SurfaceError::Decode)?;
        tracing::debug!(
            width = decoded.width(),
            height = decoded.height(),
            bytes = bytes.len(),
            "decoded image into surface"
        );
        Self::from_image(decoded.to_rgba8())
    }

    /// Replaces the contents with a decoded image, taking its dimensions.
    pub fn load_into(&mut self, bytes: &[u8]) -> SurfaceResult<()> {
        *self = Self::decode(bytes)?;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn bounds(&self) -> ImageBounds {
        ImageBounds::new(self.width(), self.height())
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    fn pixels_mut(&mut self) -> &mut RgbaImage {
        Arc::make_mut(&mut self.pixels)
    }

    /// Draws `source_rect` of `source` into `dest_rect` of this surface,
    /// rescaling when the two rectangles differ in size. Pixels falling
    /// outside this surface are clipped.
    pub fn draw_subregion(
        &mut self,
        source: &RgbaImage,
        source_rect: PixelRect,
        dest_rect: PixelRect,
    ) -> SurfaceResult<()> {
        let source_bounds = ImageBounds::new(source.width(), source.height());
        if !source_rect.fits_within(source_bounds) {
            return Err(SurfaceError::RegionOutOfBounds {
                region: source_rect,
                width: source_bounds.width,
                height: source_bounds.height,
            });
        }
        if dest_rect.is_empty() {
            return Ok(());
        }

        let cropped = imageops::crop_imm(
            source,
            source_rect.x,
            source_rect.y,
            source_rect.width,
            source_rect.height,
        )
        .to_image();
        let patch = if source_rect.dimensions() == dest_rect.dimensions() {
            cropped
        } else {
            imageops::resize(
                &cropped,
                dest_rect.width,
                dest_rect.height,
                imageops::FilterType::Lanczos3,
            )
        };

        imageops::replace(
            self.pixels_mut(),
            &patch,
            i64::from(dest_rect.x),
            i64::from(dest_rect.y),
        );
        Ok(())
    }

    /// Blurs the pixels inside a circle using the surface's current contents,
    /// so repeated passes over one area accumulate. Returns whether any pixel
    /// was touched.
    pub fn blur_circle(&mut self, center: RasterPoint, radius: f32, sigma: f32) -> bool {
        let bounds = self.bounds();
        let Some(plan) = blur::plan_circle(center, radius, sigma, bounds) else {
            return false;
        };
        blur::blur_circle(self.pixels_mut(), &plan);
        true
    }

    /// Overlays translucent text whose size and anchor scale with the surface.
    pub fn stamp_text(
        &mut self,
        text: &str,
        font: &FontArc,
        font_size_fraction: f32,
        opacity: f32,
        anchor: TextAnchor,
        color: Color,
    ) -> bool {
        let placement = TextPlacement::resolve(self.bounds(), font_size_fraction, anchor);
        text::draw_text(self.pixels_mut(), text, font, &placement, color, opacity)
    }

    /// Encodes the surface; JPEG output drops the alpha channel.
    pub fn serialize(&self, format: OutputFormat, quality: u8) -> SurfaceResult<Vec<u8>> {
        let mut bytes = Vec::new();
        let result = match format {
            OutputFormat::Jpeg => {
                let rgb: RgbImage = self.pixels.convert();
                rgb.write_with_encoder(JpegEncoder::new_with_quality(
                    &mut bytes,
                    quality.clamp(1, 100),
                ))
            }
            OutputFormat::Png => self.pixels.write_with_encoder(PngEncoder::new(&mut bytes)),
        };
        result.map_err(|source| SurfaceError::Encode {
            format: format.label(),
            source,
        })?;

        tracing::debug!(
            format = format.label(),
            quality,
            bytes = bytes.len(),
            "serialized surface"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
impl Surface {
    /// True when both surfaces still share one pixel buffer.
    fn shares_buffer_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{mean_abs_difference, patterned_image};
    use super::*;

    #[test]
    fn decode_rejects_garbage_bytes() {
        let error = Surface::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(error, SurfaceError::Decode(_)));
    }

    #[test]
    fn serialize_then_decode_keeps_dimensions() {
        let surface = Surface::from_image(patterned_image(64, 48)).unwrap();
        let jpeg = surface
            .serialize(OutputFormat::Jpeg, DEFAULT_OUTPUT_QUALITY)
            .expect("jpeg encode should work");
        let png = surface
            .serialize(OutputFormat::Png, DEFAULT_OUTPUT_QUALITY)
            .expect("png encode should work");

        assert_eq!(Surface::decode(&jpeg).unwrap().bounds(), surface.bounds());
        let decoded_png = Surface::decode(&png).unwrap();
        assert_eq!(decoded_png.image(), surface.image());
    }

    #[test]
    fn load_into_takes_decoded_dimensions() {
        let mut surface = Surface::blank(4, 4);
        let bytes = Surface::from_image(patterned_image(30, 20))
            .unwrap()
            .serialize(OutputFormat::Png, DEFAULT_OUTPUT_QUALITY)
            .unwrap();
        surface.load_into(&bytes).expect("png should decode");
        assert_eq!(surface.bounds(), ImageBounds::new(30, 20));
    }

    #[test]
    fn draw_subregion_copies_region_to_origin() {
        let source = patterned_image(40, 30);
        let mut dest = Surface::blank(10, 8);
        dest.draw_subregion(
            &source,
            PixelRect::new(5, 7, 10, 8),
            PixelRect::new(0, 0, 10, 8),
        )
        .expect("in-bounds region should draw");

        assert_eq!(dest.image().get_pixel(0, 0), source.get_pixel(5, 7));
        assert_eq!(dest.image().get_pixel(9, 7), source.get_pixel(14, 14));
    }

    #[test]
    fn draw_subregion_rescales_when_sizes_differ() {
        let source = patterned_image(40, 30);
        let mut dest = Surface::blank(20, 15);
        dest.draw_subregion(
            &source,
            PixelRect::new(0, 0, 40, 30),
            PixelRect::new(0, 0, 20, 15),
        )
        .unwrap();
        assert_eq!(dest.bounds(), ImageBounds::new(20, 15));
    }

    #[test]
    fn draw_subregion_rejects_out_of_bounds_source() {
        let source = patterned_image(40, 30);
        let mut dest = Surface::blank(10, 10);
        let error = dest
            .draw_subregion(
                &source,
                PixelRect::new(35, 0, 10, 10),
                PixelRect::new(0, 0, 10, 10),
            )
            .unwrap_err();
        assert!(matches!(error, SurfaceError::RegionOutOfBounds { .. }));
    }

    #[test]
    fn blur_circle_is_cumulative() {
        let original = Surface::from_image(patterned_image(160, 120)).unwrap();
        let center = RasterPoint::new(80.0, 60.0);

        let mut once = original.clone();
        assert!(once.blur_circle(center, 30.0, 10.0));
        let mut twice = once.clone();
        assert!(twice.blur_circle(center, 30.0, 10.0));

        let first_pass = mean_abs_difference(original.image(), once.image());
        let second_pass = mean_abs_difference(once.image(), twice.image());
        assert!(first_pass > 0.0);
        assert!(
            second_pass > 0.0,
            "second pass should blur the already blurred pixels further"
        );
    }

    #[test]
    fn blur_circle_leaves_pixels_outside_circle_untouched() {
        let original = Surface::from_image(patterned_image(160, 120)).unwrap();
        let mut blurred = original.clone();
        blurred.blur_circle(RasterPoint::new(80.0, 60.0), 20.0, 6.0);

        assert_eq!(blurred.image().get_pixel(0, 0), original.image().get_pixel(0, 0));
        assert_eq!(
            blurred.image().get_pixel(80, 90),
            original.image().get_pixel(80, 90)
        );
        assert_ne!(
            blurred.image().get_pixel(80, 60),
            original.image().get_pixel(80, 60)
        );
    }

    #[test]
    fn blur_circle_outside_raster_is_noop() {
        let mut surface = Surface::from_image(patterned_image(50, 50)).unwrap();
        let before = surface.clone();
        assert!(!surface.blur_circle(RasterPoint::new(-200.0, 400.0), 30.0, 10.0));
        assert!(surface.shares_buffer_with(&before));
    }

    #[test]
    fn clone_shares_buffer_until_written() {
        let original = Surface::from_image(patterned_image(64, 64)).unwrap();
        let mut edited = original.clone();
        assert!(edited.shares_buffer_with(&original));

        edited.blur_circle(RasterPoint::new(32.0, 32.0), 10.0, 4.0);
        assert!(!edited.shares_buffer_with(&original));
        assert_ne!(edited.image(), original.image());
    }
}
