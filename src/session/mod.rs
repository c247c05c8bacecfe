//! One editing session over a single image.
//!
//! The session owns the working surface, its undo history and the current
//! mode, and gates every operation on that mode. All pixel work is
//! synchronous; only opening, saving and AI transforms await a collaborator.

mod ai;
mod error;

use crate::config::AppConfig;
use crate::editor::tools::{self, BlurBrush, BrushOptions, CropPreset, CropState, ToolKind};
use crate::editor::{EditHistory, UndoEntry, Watermark, WatermarkOptions};
use crate::geometry::{DisplayMapping, PixelRect};
use crate::state::{EditEvent, EditMode, ModeMachine, StateTransition};
use crate::storage::{
    CommitRequest, ImageCommitter, ImageFetcher, ImageId, ImageSource, PersistedImageRecord,
};
use crate::surface::{OutputFormat, Surface, DEFAULT_OUTPUT_QUALITY};

pub use ai::AiTicket;
pub use error::{SessionError, SessionResult};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub brush: BrushOptions,
    pub watermark: WatermarkOptions,
    pub output_format: OutputFormat,
    pub output_quality: u8,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            brush: BrushOptions::default(),
            watermark: WatermarkOptions::default(),
            output_format: OutputFormat::default(),
            output_quality: DEFAULT_OUTPUT_QUALITY,
        }
    }
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            brush: BrushOptions::from(&config.brush),
            watermark: WatermarkOptions::from(&config.watermark),
            output_format: config.output.format,
            output_quality: config.output.quality,
        }
    }
}

#[derive(Debug)]
pub struct EditSession {
    surface: Surface,
    source: ImageSource,
    image_id: Option<ImageId>,
    machine: ModeMachine,
    history: EditHistory,
    crop: CropState,
    brush: BlurBrush,
    watermark: Watermark,
    output_format: OutputFormat,
    output_quality: u8,
    pending_ticket: Option<u64>,
}

impl EditSession {
    /// Fetches and decodes `source`. Fails without creating a session when
    /// the bytes cannot be fetched or decoded.
    pub async fn open<F>(
        fetcher: &F,
        source: ImageSource,
        image_id: Option<ImageId>,
        settings: SessionSettings,
    ) -> SessionResult<Self>
    where
        F: ImageFetcher + Sync,
    {
        let bytes = fetcher.fetch(&source).await.map_err(|err| {
            tracing::warn!(source = %source.describe(), ?err, "failed to fetch image");
            SessionError::Fetch(err)
        })?;
        let surface = Surface::decode(&bytes).map_err(|err| {
            tracing::warn!(source = %source.describe(), ?err, "failed to decode image");
            SessionError::Open(err)
        })?;
        Ok(Self::with_surface(surface, source, image_id, settings))
    }

    pub fn from_bytes(
        bytes: Vec<u8>,
        image_id: Option<ImageId>,
        settings: SessionSettings,
    ) -> SessionResult<Self> {
        let surface = Surface::decode(&bytes).map_err(SessionError::Open)?;
        Ok(Self::with_surface(
            surface,
            ImageSource::from_bytes(bytes),
            image_id,
            settings,
        ))
    }

    pub fn with_surface(
        surface: Surface,
        source: ImageSource,
        image_id: Option<ImageId>,
        settings: SessionSettings,
    ) -> Self {
        tracing::info!(
            source = %source.describe(),
            ?image_id,
            width = surface.width(),
            height = surface.height(),
            "opened edit session"
        );
        Self {
            surface,
            source,
            image_id,
            machine: ModeMachine::new(),
            history: EditHistory::new(),
            crop: CropState::new(),
            brush: BlurBrush::new(settings.brush),
            watermark: Watermark::new(settings.watermark),
            output_format: settings.output_format,
            output_quality: settings.output_quality,
            pending_ticket: None,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.machine.mode()
    }

    pub fn raster(&self) -> &Surface {
        &self.surface
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.surface.width(), self.surface.height())
    }

    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    pub fn is_busy(&self) -> bool {
        self.pending_ticket.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.brush.is_dragging()
    }

    pub fn crop_preset(&self) -> CropPreset {
        self.crop.preset()
    }

    pub fn pending_crop_region(&self) -> Option<PixelRect> {
        self.crop.pending_region()
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    pub fn image_id(&self) -> Option<ImageId> {
        self.image_id
    }

    pub fn mode_history(&self) -> &[StateTransition] {
        self.machine.history()
    }

    /// Tab switch. Never touches pixels or history.
    pub fn select_mode(&mut self, mode: EditMode) -> SessionResult<EditMode> {
        self.ensure_idle()?;
        self.brush.end();
        let mode = self.machine.transition(EditEvent::SelectMode(mode))?;
        tracing::debug!(%mode, "mode selected");
        Ok(mode)
    }

    pub fn set_crop_region(&mut self, region: PixelRect) -> SessionResult<Option<PixelRect>> {
        self.ensure_tool(ToolKind::Crop)?;
        Ok(self.crop.set_region(region, self.surface.bounds()))
    }

    pub fn set_crop_aspect(&mut self, preset: CropPreset) -> SessionResult<Option<PixelRect>> {
        self.ensure_tool(ToolKind::Crop)?;
        let region = self.crop.set_aspect(preset, self.surface.bounds());
        tracing::debug!(preset = preset.label(), ?region, "crop aspect changed");
        Ok(region)
    }

    /// Commits the pending crop (the full image when none was selected) and
    /// moves on to Effects. The crop is permanent: it records no undo entry,
    /// though undoing an older entry still restores the uncropped image.
    pub fn apply_crop(&mut self) -> SessionResult<PixelRect> {
        self.ensure_tool(ToolKind::Crop)?;
        let region = self.crop.resolved_region(self.surface.bounds());
        let cropped = tools::apply_crop(&self.surface, region)?;
        self.machine.transition(EditEvent::ApplyCrop)?;

        self.surface = cropped;
        self.crop.reset();
        tracing::info!(?region, "crop applied");
        Ok(region)
    }

    /// Starts a blur stroke at a client position. Ignored outside Effects
    /// mode or while a stroke is already running.
    pub fn pointer_down(
        &mut self,
        client_x: f32,
        client_y: f32,
        mapping: DisplayMapping,
    ) -> SessionResult<bool> {
        self.ensure_idle()?;
        if !ToolKind::Brush.available_in(self.mode()) || self.brush.is_dragging() {
            return Ok(false);
        }

        let snapshot = self.snapshot();
        let point = mapping.to_raster(client_x, client_y, self.surface.bounds());
        if !self.brush.begin(&mut self.surface, point) {
            return Ok(false);
        }
        self.history.record(snapshot);
        tracing::debug!(x = point.x, y = point.y, "blur stroke started");
        Ok(true)
    }

    pub fn pointer_move(&mut self, client_x: f32, client_y: f32, mapping: DisplayMapping) -> bool {
        if !self.brush.is_dragging() {
            return false;
        }
        let point = mapping.to_raster(client_x, client_y, self.surface.bounds());
        self.brush.drag(&mut self.surface, point)
    }

    pub fn pointer_up(&mut self) -> bool {
        let ended = self.brush.end();
        if ended {
            tracing::debug!(depth = self.history.len(), "blur stroke finished");
        }
        ended
    }

    pub fn pointer_leave(&mut self) -> bool {
        self.pointer_up()
    }

    /// Stamps the configured watermark. The font is resolved before any
    /// snapshot is taken, so a missing font leaves the session untouched.
    pub fn apply_watermark(&mut self) -> SessionResult<()> {
        self.ensure_tool(ToolKind::Watermark)?;
        let font = self.watermark.font().map_err(|err| {
            tracing::warn!(?err, "watermark font unavailable");
            SessionError::Surface(err)
        })?;

        self.brush.end();
        self.record_snapshot();
        self.watermark.stamp(&mut self.surface, &font);
        tracing::info!(text = %self.watermark.options().text, "watermark applied");
        Ok(())
    }

    /// Restores the most recent snapshot. Mode is left as is. Returns `false`
    /// when there is nothing to undo or an AI request is pending.
    pub fn undo(&mut self) -> bool {
        if self.is_busy() {
            tracing::warn!("undo ignored while AI request is pending");
            return false;
        }
        self.brush.end();
        let Some(entry) = self.history.pop() else {
            return false;
        };
        self.surface = entry.surface;
        self.source = entry.source;
        self.crop.reset();
        true
    }

    /// Encoded output as it would be saved right now. In Crop mode the
    /// pending (or full-image) crop is rendered without touching the session.
    pub fn render_output(&self) -> SessionResult<Vec<u8>> {
        let bytes = if self.mode() == EditMode::Crop {
            let region = self.crop.resolved_region(self.surface.bounds());
            tools::apply_crop(&self.surface, region)?
                .serialize(self.output_format, self.output_quality)?
        } else {
            self.surface
                .serialize(self.output_format, self.output_quality)?
        };
        Ok(bytes)
    }

    /// Hands the rendered output to `committer`. A failed commit leaves the
    /// session open and editable so the caller may retry.
    pub async fn save<C>(&self, committer: &C) -> SessionResult<PersistedImageRecord>
    where
        C: ImageCommitter + Sync,
    {
        self.ensure_idle()?;
        let bytes = self.render_output()?;
        let request = CommitRequest {
            image_id: self.image_id,
            format: self.output_format,
        };
        tracing::info!(
            image_id = ?self.image_id,
            format = self.output_format.label(),
            bytes = bytes.len(),
            "saving edited image"
        );
        committer.commit(bytes, request).await.map_err(|err| {
            tracing::warn!(?err, "save failed; session stays open");
            SessionError::Commit(err)
        })
    }

    pub fn close(self) {
        tracing::info!(
            source = %self.source.describe(),
            undo_depth = self.history.len(),
            "closed edit session"
        );
    }

    fn snapshot(&self) -> UndoEntry {
        UndoEntry::new(self.surface.clone(), self.source.clone())
    }

    fn record_snapshot(&mut self) {
        let snapshot = self.snapshot();
        self.history.record(snapshot);
    }

    fn ensure_idle(&self) -> SessionResult<()> {
        if self.is_busy() {
            tracing::warn!("operation rejected while AI request is pending");
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    fn ensure_tool(&self, tool: ToolKind) -> SessionResult<()> {
        self.ensure_idle()?;
        let mode = self.mode();
        if tool.available_in(mode) {
            Ok(())
        } else {
            tracing::warn!(tool = tool.label(), %mode, "tool unavailable in current mode");
            Err(SessionError::UnavailableInMode {
                action: tool.label(),
                mode,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StorageError, StorageResult};
    use crate::surface::test_support::patterned_image;
    use crate::surface::SurfaceError;

    enum FixedFetcher {
        Bytes(Vec<u8>),
        Offline,
    }

    impl ImageFetcher for FixedFetcher {
        async fn fetch(&self, _source: &ImageSource) -> StorageResult<Vec<u8>> {
            match self {
                Self::Bytes(bytes) => Ok(bytes.clone()),
                Self::Offline => Err(StorageError::Http("could not connect".to_string())),
            }
        }

        async fn fetch_by_id(&self, image_id: ImageId) -> StorageResult<Vec<u8>> {
            Err(StorageError::MissingImage(image_id))
        }
    }

    fn session(width: u32, height: u32) -> EditSession {
        EditSession::with_surface(
            Surface::from_image(patterned_image(width, height)).unwrap(),
            ImageSource::Url("http://example.invalid/original.jpg".to_string()),
            Some(1),
            SessionSettings::default(),
        )
    }

    #[test]
    fn new_session_starts_in_crop_with_empty_history() {
        let session = session(64, 36);
        assert_eq!(session.mode(), EditMode::Crop);
        assert_eq!(session.undo_depth(), 0);
        assert_eq!(session.crop_preset(), CropPreset::Ratio16x9);
        assert!(!session.is_busy());
    }

    #[test]
    fn crop_tools_are_rejected_outside_crop_mode() {
        let mut session = session(64, 36);
        session.apply_crop().unwrap();

        let error = session.apply_crop().unwrap_err();
        assert!(matches!(
            error,
            SessionError::UnavailableInMode {
                action: "crop",
                mode: EditMode::Effects
            }
        ));
        assert_eq!(session.dimensions(), (64, 36));
    }

    #[test]
    fn watermark_is_rejected_in_crop_mode() {
        let mut session = session(64, 36);
        assert!(matches!(
            session.apply_watermark(),
            Err(SessionError::UnavailableInMode { .. })
        ));
        assert_eq!(session.undo_depth(), 0);
    }

    #[test]
    fn apply_crop_without_region_keeps_full_image() {
        let mut session = session(64, 36);
        let original = session.raster().clone();

        assert_eq!(session.apply_crop().unwrap(), PixelRect::new(0, 0, 64, 36));
        assert_eq!(session.mode(), EditMode::Effects);
        assert_eq!(session.raster(), &original);
        assert_eq!(session.undo_depth(), 0);
    }

    #[test]
    fn pointer_down_outside_effects_is_ignored() {
        let mut session = session(64, 36);
        let mapping = DisplayMapping::native(session.raster().bounds());
        assert!(!session.pointer_down(10.0, 10.0, mapping).unwrap());
        assert!(!session.is_dragging());
        assert_eq!(session.undo_depth(), 0);
    }

    #[test]
    fn pointer_coordinates_are_mapped_from_display_space() {
        let mut session = session(200, 100);
        session.apply_crop().unwrap();
        let original = session.raster().clone();
        // displayed at half size, offset by (10, 20)
        let mapping = DisplayMapping::new(10.0, 20.0, 100.0, 50.0);

        assert!(session.pointer_down(15.0, 25.0, mapping).unwrap());
        session.pointer_up();

        let touched = session.raster().image().get_pixel(10, 10);
        let far = session.raster().image().get_pixel(150, 80);
        assert_ne!(touched, original.image().get_pixel(10, 10));
        assert_eq!(far, original.image().get_pixel(150, 80));
    }

    #[test]
    fn undo_on_empty_history_is_noop() {
        let mut session = session(32, 32);
        assert!(!session.undo());
        assert_eq!(session.mode(), EditMode::Crop);
    }

    #[test]
    fn undo_restores_snapshot_and_clears_pending_crop() {
        let mut session = session(64, 36);
        session.apply_crop().unwrap();
        let original = session.raster().clone();
        let mapping = DisplayMapping::native(session.raster().bounds());
        session.pointer_down(32.0, 18.0, mapping).unwrap();
        session.pointer_up();
        session.select_mode(EditMode::Crop).unwrap();
        session
            .set_crop_region(PixelRect::new(0, 0, 16, 9))
            .unwrap();

        assert!(session.undo());
        assert_eq!(session.raster(), &original);
        assert_eq!(session.pending_crop_region(), None);
        assert_eq!(session.mode(), EditMode::Crop);
    }

    #[test]
    fn undo_after_crop_restores_uncropped_image_from_older_entry() {
        let mut session = session(64, 36);
        let original = session.raster().clone();
        session.select_mode(EditMode::AiTools).unwrap();
        let ticket = session
            .begin_ai_transform(crate::ai::AiAction::Enhance)
            .unwrap();
        let enhanced = Surface::from_image(patterned_image(128, 72))
            .unwrap()
            .serialize(OutputFormat::Png, 100)
            .unwrap();
        session.finish_ai_transform(ticket, Ok(enhanced)).unwrap();

        session
            .set_crop_region(PixelRect::new(0, 0, 32, 18))
            .unwrap();
        session.apply_crop().unwrap();
        assert_eq!(session.dimensions(), (32, 18));
        assert_eq!(session.undo_depth(), 1);

        assert!(session.undo());
        assert_eq!(session.raster(), &original);
        assert_eq!(session.mode(), EditMode::Effects);
    }

    #[test]
    fn mode_switches_are_recorded_without_history_entries() {
        let mut session = session(32, 32);
        session.select_mode(EditMode::AiTools).unwrap();
        session.select_mode(EditMode::Effects).unwrap();

        assert_eq!(session.mode_history().len(), 2);
        assert_eq!(session.undo_depth(), 0);
    }

    #[test]
    fn render_output_in_crop_mode_does_not_mutate() {
        let mut session = session(64, 36);
        session
            .set_crop_region(PixelRect::new(8, 4, 32, 18))
            .unwrap();

        let bytes = session.render_output().unwrap();
        let rendered = Surface::decode(&bytes).unwrap();
        assert_eq!((rendered.width(), rendered.height()), (32, 18));
        assert_eq!(session.dimensions(), (64, 36));
        assert_eq!(session.undo_depth(), 0);
    }

    #[test]
    fn settings_follow_app_config() {
        let mut config = AppConfig::default();
        config.brush.radius = 12.0;
        config.output.format = OutputFormat::Png;
        config.watermark.text = "AJANS".to_string();

        let settings = SessionSettings::from(&config);
        assert_eq!(settings.brush.radius, 12.0);
        assert_eq!(settings.output_format, OutputFormat::Png);
        assert_eq!(settings.watermark.text, "AJANS");
    }

    #[test]
    fn undecodable_bytes_do_not_open_a_session() {
        let error = EditSession::from_bytes(
            b"<html>not found</html>".to_vec(),
            Some(1),
            SessionSettings::default(),
        )
        .unwrap_err();

        assert!(matches!(error, SessionError::Open(_)));
        assert!(!error.is_recoverable());
    }

    #[tokio::test]
    async fn open_reports_fetch_failures() {
        let error = EditSession::open(
            &FixedFetcher::Offline,
            ImageSource::Url("http://example.invalid/1.jpg".to_string()),
            Some(1),
            SessionSettings::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, SessionError::Fetch(StorageError::Http(_))));
        assert!(!error.is_recoverable());
    }

    #[tokio::test]
    async fn open_reports_decode_failures() {
        let error = EditSession::open(
            &FixedFetcher::Bytes(vec![0xff, 0xd8, 0x00, 0x01]),
            ImageSource::Url("http://example.invalid/truncated.jpg".to_string()),
            Some(1),
            SessionSettings::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, SessionError::Open(SurfaceError::Decode(_))));
    }

    #[tokio::test]
    async fn open_decodes_fetched_bytes_at_natural_size() {
        let bytes = Surface::from_image(patterned_image(40, 30))
            .unwrap()
            .serialize(OutputFormat::Png, 100)
            .unwrap();
        let session = EditSession::open(
            &FixedFetcher::Bytes(bytes),
            ImageSource::Path("photo.png".into()),
            None,
            SessionSettings::default(),
        )
        .await
        .expect("png should open");

        assert_eq!(session.dimensions(), (40, 30));
        assert_eq!(session.mode(), EditMode::Crop);
        assert_eq!(session.source(), &ImageSource::Path("photo.png".into()));
    }

    #[test]
    fn effects_is_only_reached_by_applying_the_crop() {
        let mut session = session(64, 36);

        let error = session.select_mode(EditMode::Effects).unwrap_err();
        assert!(matches!(error, SessionError::State(_)));
        assert!(error.is_recoverable());
        assert_eq!(session.mode(), EditMode::Crop);
        assert!(session.mode_history().is_empty());

        session.apply_crop().unwrap();
        assert_eq!(session.mode(), EditMode::Effects);
    }
}
