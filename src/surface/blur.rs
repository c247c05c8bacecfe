use image::{imageops, GrayImage, Luma, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;

use crate::geometry::{ImageBounds, PixelRect, RasterPoint};

/// Sampling window and circle geometry for one brush dab, clamped to the raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct CirclePlan {
    pub(super) window: PixelRect,
    pub(super) center: RasterPoint,
    pub(super) radius: f32,
    pub(super) sigma: f32,
}

pub(super) fn plan_circle(
    center: RasterPoint,
    radius: f32,
    sigma: f32,
    bounds: ImageBounds,
) -> Option<CirclePlan> {
    if !center.x.is_finite() || !center.y.is_finite() || !(radius > 0.0) || !(sigma > 0.0) {
        return None;
    }

    // the circle itself must touch the raster, otherwise nothing changes
    bounded_window(center, radius, bounds)?;

    let margin = (sigma * 3.0).ceil();
    let window = bounded_window(center, radius + margin, bounds)?;
    Some(CirclePlan {
        window,
        center,
        radius,
        sigma,
    })
}

fn bounded_window(center: RasterPoint, half_extent: f32, bounds: ImageBounds) -> Option<PixelRect> {
    if bounds.is_empty() {
        return None;
    }

    let left = (center.x - half_extent).floor();
    let top = (center.y - half_extent).floor();
    let right = (center.x + half_extent).ceil();
    let bottom = (center.y + half_extent).ceil();

    let max_x = bounds.width as f32;
    let max_y = bounds.height as f32;
    if right <= 0.0 || bottom <= 0.0 || left >= max_x || top >= max_y {
        return None;
    }

    let x0 = left.max(0.0) as u32;
    let y0 = top.max(0.0) as u32;
    let x1 = right.min(max_x) as u32;
    let y1 = bottom.min(max_y) as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(PixelRect::new(x0, y0, x1 - x0, y1 - y0))
}

pub(super) fn blur_circle(image: &mut RgbaImage, plan: &CirclePlan) {
    let window = plan.window;
    let patch =
        imageops::crop_imm(image, window.x, window.y, window.width, window.height).to_image();
    let blurred = blur_region(&patch, plan.sigma);

    let mut mask = GrayImage::new(window.width, window.height);
    draw_filled_circle_mut(
        &mut mask,
        (
            (plan.center.x - window.x as f32).round() as i32,
            (plan.center.y - window.y as f32).round() as i32,
        ),
        plan.radius.round().max(1.0) as i32,
        Luma([255]),
    );

    for (x, y, coverage) in mask.enumerate_pixels() {
        if coverage.0[0] == 0 {
            continue;
        }
        image.put_pixel(window.x + x, window.y + y, *blurred.get_pixel(x, y));
    }
}

fn blur_downsample_factor(width: u32, height: u32, sigma: f32) -> u32 {
    let area = width.saturating_mul(height);
    if area < 32_768 || sigma < 6.0 {
        return 1;
    }
    if area >= 262_144 && sigma >= 10.0 {
        return 4;
    }
    if area >= 65_536 && sigma >= 8.0 {
        return 3;
    }
    2
}

/// Gaussian blur of a whole region; large regions with a wide kernel are
/// blurred at reduced resolution and scaled back up.
pub(crate) fn blur_region(region: &RgbaImage, sigma: f32) -> RgbaImage {
    let width = region.width();
    let height = region.height();
    let downsample = blur_downsample_factor(width, height, sigma)
        .min(width.max(1))
        .min(height.max(1));
    if downsample <= 1 {
        return imageops::blur(region, sigma);
    }

    let reduced_width = (width / downsample).max(1);
    let reduced_height = (height / downsample).max(1);
    let reduced = imageops::resize(
        region,
        reduced_width,
        reduced_height,
        imageops::FilterType::Triangle,
    );
    let reduced_sigma = (sigma / downsample as f32).max(0.8);
    let blurred = imageops::blur(&reduced, reduced_sigma);
    imageops::resize(&blurred, width, height, imageops::FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_circle_clamps_window_to_raster() {
        let plan = plan_circle(
            RasterPoint::new(5.0, 5.0),
            30.0,
            10.0,
            ImageBounds::new(64, 48),
        )
        .expect("circle overlapping the raster should plan");
        assert_eq!(plan.window, PixelRect::new(0, 0, 64, 48));
    }

    #[test]
    fn plan_circle_skips_circle_outside_raster_even_when_margin_overlaps() {
        let plan = plan_circle(
            RasterPoint::new(-40.0, 10.0),
            30.0,
            10.0,
            ImageBounds::new(64, 48),
        );
        assert_eq!(plan, None);
    }

    #[test]
    fn plan_circle_rejects_degenerate_brush() {
        let bounds = ImageBounds::new(64, 48);
        assert_eq!(plan_circle(RasterPoint::new(10.0, 10.0), 0.0, 10.0, bounds), None);
        assert_eq!(plan_circle(RasterPoint::new(f32::NAN, 10.0), 5.0, 10.0, bounds), None);
    }

    #[test]
    fn blur_downsample_factor_uses_larger_factor_for_heavier_regions() {
        assert_eq!(blur_downsample_factor(128, 128, 5.5), 1);
        assert_eq!(blur_downsample_factor(320, 240, 7.0), 2);
        assert_eq!(blur_downsample_factor(320, 240, 8.2), 3);
        assert_eq!(blur_downsample_factor(900, 700, 10.0), 4);
    }

    #[test]
    fn blur_region_preserves_original_size() {
        let mut region = RgbaImage::new(96, 72);
        for pixel in region.pixels_mut() {
            *pixel = image::Rgba([180, 120, 50, 255]);
        }
        let blurred = blur_region(&region, 11.0);
        assert_eq!(blurred.dimensions(), region.dimensions());
    }
}
