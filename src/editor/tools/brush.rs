use crate::config::BrushConfig;
use crate::geometry::RasterPoint;
use crate::surface::Surface;

const MIN_RADIUS: f32 = 1.0;
const MIN_SIGMA: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushOptions {
    pub radius: f32,
    pub sigma: f32,
}

impl Default for BrushOptions {
    fn default() -> Self {
        Self::from(&BrushConfig::default())
    }
}

impl From<&BrushConfig> for BrushOptions {
    fn from(config: &BrushConfig) -> Self {
        let mut options = Self {
            radius: 0.0,
            sigma: 0.0,
        };
        options.set_radius(config.radius);
        options.set_sigma(config.sigma);
        options
    }
}

impl BrushOptions {
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = if radius.is_finite() {
            radius.max(MIN_RADIUS)
        } else {
            MIN_RADIUS
        };
    }

    pub fn set_sigma(&mut self, sigma: f32) {
        self.sigma = if sigma.is_finite() {
            sigma.max(MIN_SIGMA)
        } else {
            MIN_SIGMA
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BrushPhase {
    #[default]
    Idle,
    Dragging,
}

/// Drag-to-blur gesture. The brush only tracks the gesture; undo bookkeeping
/// belongs to whoever calls [`BlurBrush::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlurBrush {
    options: BrushOptions,
    phase: BrushPhase,
}

impl BlurBrush {
    pub fn new(options: BrushOptions) -> Self {
        Self {
            options,
            phase: BrushPhase::Idle,
        }
    }

    pub const fn is_dragging(&self) -> bool {
        matches!(self.phase, BrushPhase::Dragging)
    }

    /// Starts a gesture and blurs under `point`. Returns `false` when a
    /// gesture was already running, in which case nothing is drawn.
    pub fn begin(&mut self, surface: &mut Surface, point: RasterPoint) -> bool {
        if self.is_dragging() {
            return false;
        }
        self.phase = BrushPhase::Dragging;
        self.dab(surface, point);
        true
    }

    /// Blurs under `point` if a gesture is running.
    pub fn drag(&mut self, surface: &mut Surface, point: RasterPoint) -> bool {
        self.is_dragging() && self.dab(surface, point)
    }

    /// Ends the gesture; returns whether one was running.
    pub fn end(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        self.phase = BrushPhase::Idle;
        was_dragging
    }

    fn dab(&self, surface: &mut Surface, point: RasterPoint) -> bool {
        surface.blur_circle(point, self.options.radius, self.options.sigma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::test_support::patterned_image;

    fn surface() -> Surface {
        Surface::from_image(patterned_image(120, 90)).unwrap()
    }

    #[test]
    fn options_are_clamped_to_usable_values() {
        let options = BrushOptions::from(&BrushConfig {
            radius: -4.0,
            sigma: f32::NAN,
        });
        assert_eq!(options.radius, MIN_RADIUS);
        assert_eq!(options.sigma, MIN_SIGMA);
    }

    #[test]
    fn begin_blurs_and_enters_dragging() {
        let mut surface = surface();
        let original = surface.clone();
        let mut brush = BlurBrush::default();

        assert!(brush.begin(&mut surface, RasterPoint::new(60.0, 45.0)));
        assert!(brush.is_dragging());
        assert_ne!(surface, original);
    }

    #[test]
    fn second_begin_is_rejected_while_dragging() {
        let mut surface = surface();
        let mut brush = BlurBrush::default();
        brush.begin(&mut surface, RasterPoint::new(10.0, 10.0));
        let after_first = surface.clone();

        assert!(!brush.begin(&mut surface, RasterPoint::new(100.0, 80.0)));
        assert_eq!(surface, after_first);
    }

    #[test]
    fn drag_without_gesture_does_nothing() {
        let mut surface = surface();
        let original = surface.clone();
        let mut brush = BlurBrush::default();

        assert!(!brush.drag(&mut surface, RasterPoint::new(60.0, 45.0)));
        assert_eq!(surface, original);
    }

    #[test]
    fn end_returns_to_idle() {
        let mut surface = surface();
        let mut brush = BlurBrush::default();
        brush.begin(&mut surface, RasterPoint::new(60.0, 45.0));

        assert!(brush.end());
        assert_eq!(brush.phase, BrushPhase::Idle);
        assert!(!brush.end());
    }
}
