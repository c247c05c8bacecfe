use image::{imageops, Rgba, RgbaImage};

use super::{AiAction, AiDelegate, AiError, AiResult};
use crate::storage::{ImageFetcher, ImageId, StorageError};
use crate::surface::{blur_region, OutputFormat, Surface};

const EXPAND_RATIO: (u32, u32) = (16, 9);
const EXPAND_BACKGROUND_SIGMA: f32 = 30.0;
const EXPAND_BACKGROUND_DIM: f32 = 0.7;
const ENHANCE_SCALE: u32 = 2;
const ENHANCE_SHARPEN_SIGMA: f32 = 2.0;

/// In-process delegate for offline use. Background removal needs a
/// segmentation model and is reported as unsupported.
#[derive(Debug, Clone)]
pub struct LocalAiDelegate<F> {
    fetcher: F,
}

impl<F> LocalAiDelegate<F> {
    pub const fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F> AiDelegate for LocalAiDelegate<F>
where
    F: ImageFetcher + Sync,
{
    async fn transform(&self, image_id: ImageId, action: AiAction) -> AiResult<Vec<u8>> {
        if action == AiAction::RemoveBackground {
            return Err(AiError::Unsupported { action });
        }

        let bytes = self
            .fetcher
            .fetch_by_id(image_id)
            .await
            .map_err(|err| match err {
                StorageError::MissingImage(id) => AiError::MissingImage(id),
                other => AiError::Transport(other.to_string()),
            })?;

        tracing::info!(image_id, %action, "running local AI transform");
        tokio::task::spawn_blocking(move || process(action, &bytes))
            .await
            .map_err(|err| AiError::Transport(format!("transform worker failed: {err}")))?
    }
}

fn process(action: AiAction, bytes: &[u8]) -> AiResult<Vec<u8>> {
    let source = Surface::decode(bytes).map_err(|err| AiError::InvalidResult(err.to_string()))?;
    let output = match action {
        AiAction::SmartExpand => smart_expand(source.image()),
        AiAction::Enhance => enhance(source.image()),
        AiAction::RemoveBackground => return Err(AiError::Unsupported { action }),
    };
    Surface::from_image(output)
        .and_then(|surface| surface.serialize(OutputFormat::Png, 100))
        .map_err(|err| AiError::InvalidResult(err.to_string()))
}

/// Pads the image out to 16:9 with a blurred, dimmed cover of itself and
/// centers the original on top.
pub(crate) fn smart_expand(image: &RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let (ratio_x, ratio_y) = EXPAND_RATIO;
    let (target_width, target_height) =
        if u64::from(width) * u64::from(ratio_y) >= u64::from(height) * u64::from(ratio_x) {
            let padded =
                (f64::from(width) * f64::from(ratio_y) / f64::from(ratio_x)).round() as u32;
            (width, padded.max(height))
        } else {
            let padded =
                (f64::from(height) * f64::from(ratio_x) / f64::from(ratio_y)).round() as u32;
            (padded.max(width), height)
        };

    let scale = (f64::from(target_width) / f64::from(width))
        .max(f64::from(target_height) / f64::from(height));
    let cover_width = ((f64::from(width) * scale).ceil() as u32).max(target_width);
    let cover_height = ((f64::from(height) * scale).ceil() as u32).max(target_height);
    let cover = imageops::resize(
        image,
        cover_width,
        cover_height,
        imageops::FilterType::Triangle,
    );
    let cover = imageops::crop_imm(
        &cover,
        (cover_width - target_width) / 2,
        (cover_height - target_height) / 2,
        target_width,
        target_height,
    )
    .to_image();

    let mut canvas = blur_region(&cover, EXPAND_BACKGROUND_SIGMA);
    for pixel in canvas.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        *pixel = Rgba([dim(r), dim(g), dim(b), 255]);
    }

    imageops::overlay(
        &mut canvas,
        image,
        i64::from((target_width - width) / 2),
        i64::from((target_height - height) / 2),
    );
    canvas
}

fn dim(channel: u8) -> u8 {
    (f32::from(channel) * EXPAND_BACKGROUND_DIM) as u8
}

/// Upscales 2x with bicubic filtering, then sharpens with an unsharp mask.
pub(crate) fn enhance(image: &RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let upscaled = imageops::resize(
        image,
        width.saturating_mul(ENHANCE_SCALE),
        height.saturating_mul(ENHANCE_SCALE),
        imageops::FilterType::CatmullRom,
    );
    let softened = imageops::blur(&upscaled, ENHANCE_SHARPEN_SIGMA);

    let mut sharpened = upscaled.clone();
    for (pixel, soft) in sharpened.pixels_mut().zip(softened.pixels()) {
        for channel in 0..3 {
            let value = 1.5 * f32::from(pixel.0[channel]) - 0.5 * f32::from(soft.0[channel]);
            pixel.0[channel] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    sharpened
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ImageSource, StorageResult};
    use crate::surface::test_support::patterned_image;

    struct SingleImageFetcher {
        bytes: Vec<u8>,
    }

    impl ImageFetcher for SingleImageFetcher {
        async fn fetch(&self, _source: &ImageSource) -> StorageResult<Vec<u8>> {
            Ok(self.bytes.clone())
        }

        async fn fetch_by_id(&self, image_id: ImageId) -> StorageResult<Vec<u8>> {
            if image_id == 1 {
                Ok(self.bytes.clone())
            } else {
                Err(StorageError::MissingImage(image_id))
            }
        }
    }

    fn png_fetcher(width: u32, height: u32) -> SingleImageFetcher {
        let bytes = Surface::from_image(patterned_image(width, height))
            .unwrap()
            .serialize(OutputFormat::Png, 100)
            .unwrap();
        SingleImageFetcher { bytes }
    }

    #[test]
    fn smart_expand_widens_portrait_images_to_sixteen_by_nine() {
        let image = patterned_image(90, 160);
        let expanded = smart_expand(&image);
        assert_eq!(expanded.dimensions(), (284, 160));
        // original pixels sit centered
        assert_eq!(expanded.get_pixel(97, 0), image.get_pixel(0, 0));
    }

    #[test]
    fn smart_expand_pads_wide_images_vertically() {
        let expanded = smart_expand(&patterned_image(400, 100));
        assert_eq!(expanded.dimensions(), (400, 225));
    }

    #[test]
    fn smart_expand_keeps_exact_sixteen_by_nine_size() {
        let expanded = smart_expand(&patterned_image(160, 90));
        assert_eq!(expanded.dimensions(), (160, 90));
    }

    #[test]
    fn enhance_doubles_dimensions() {
        let enhanced = enhance(&patterned_image(30, 20));
        assert_eq!(enhanced.dimensions(), (60, 40));
    }

    #[tokio::test]
    async fn transform_runs_enhance_on_fetched_image() {
        let delegate = LocalAiDelegate::new(png_fetcher(24, 16));
        let bytes = delegate
            .transform(1, AiAction::Enhance)
            .await
            .expect("enhance should succeed");
        let surface = Surface::decode(&bytes).unwrap();
        assert_eq!((surface.width(), surface.height()), (48, 32));
    }

    #[tokio::test]
    async fn transform_reports_unsupported_background_removal() {
        let delegate = LocalAiDelegate::new(png_fetcher(8, 8));
        let error = delegate
            .transform(1, AiAction::RemoveBackground)
            .await
            .unwrap_err();
        assert_eq!(
            error,
            AiError::Unsupported {
                action: AiAction::RemoveBackground
            }
        );
    }

    #[tokio::test]
    async fn transform_maps_missing_image() {
        let delegate = LocalAiDelegate::new(png_fetcher(8, 8));
        let error = delegate.transform(2, AiAction::Enhance).await.unwrap_err();
        assert_eq!(error, AiError::MissingImage(2));
    }
}
