use std::sync::atomic::{AtomicU64, Ordering};

use super::{EditSession, SessionError, SessionResult};
use crate::ai::{AiAction, AiDelegate, AiError, AiResult};
use crate::editor::tools::ToolKind;
use crate::editor::UndoEntry;
use crate::state::{EditEvent, EditMode};
use crate::storage::{ImageId, ImageSource};
use crate::surface::Surface;

static NEXT_TICKET_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Pending AI request. Holds the snapshot that becomes the undo entry if the
/// transform succeeds.
#[derive(Debug)]
pub struct AiTicket {
    serial: u64,
    image_id: ImageId,
    action: AiAction,
    snapshot: UndoEntry,
}

impl AiTicket {
    pub fn image_id(&self) -> ImageId {
        self.image_id
    }

    pub fn action(&self) -> AiAction {
        self.action
    }
}

impl EditSession {
    /// Marks the session busy and captures the pre-request state. At most
    /// one request may be pending.
    pub fn begin_ai_transform(&mut self, action: AiAction) -> SessionResult<AiTicket> {
        self.ensure_tool(ToolKind::AiTransform)?;
        let image_id = self.image_id.ok_or_else(|| {
            tracing::warn!(%action, "AI transform requested without persisted image");
            SessionError::MissingImageId
        })?;

        self.brush.end();
        let serial = NEXT_TICKET_SERIAL.fetch_add(1, Ordering::Relaxed);
        self.pending_ticket = Some(serial);
        tracing::info!(image_id, %action, serial, "AI transform started");
        Ok(AiTicket {
            serial,
            image_id,
            action,
            snapshot: self.snapshot(),
        })
    }

    /// Applies the delegate's outcome. On success the result replaces the
    /// surface and the session returns to Crop; on failure nothing but the
    /// busy flag changes.
    pub fn finish_ai_transform(
        &mut self,
        ticket: AiTicket,
        result: AiResult<Vec<u8>>,
    ) -> SessionResult<EditMode> {
        if self.pending_ticket != Some(ticket.serial) {
            tracing::warn!(serial = ticket.serial, "ignoring stale AI ticket");
            return Err(SessionError::StaleTicket);
        }
        self.pending_ticket = None;

        let action = ticket.action;
        let outcome = result.and_then(|bytes| {
            Surface::decode(&bytes)
                .map(|surface| (surface, bytes))
                .map_err(|err| AiError::InvalidResult(err.to_string()))
        });
        let (surface, bytes) = outcome.map_err(|err| {
            tracing::warn!(%action, ?err, "AI transform failed; session unchanged");
            SessionError::Ai(err)
        })?;

        let mode = self.machine.transition(EditEvent::AiTransformApplied)?;
        self.history.record(ticket.snapshot);
        tracing::info!(
            %action,
            width = surface.width(),
            height = surface.height(),
            "AI transform applied"
        );
        self.surface = surface;
        self.source = ImageSource::from_bytes(bytes);
        self.crop.reset();
        Ok(mode)
    }

    /// Gives up on a pending request without applying anything. Returns
    /// `false` when the ticket is not the pending one.
    pub fn abandon_ai_transform(&mut self, ticket: AiTicket) -> bool {
        self.release_ticket(ticket.serial)
    }

    /// Runs one transform end to end: begin, await the delegate, finish.
    /// Dropping the returned future before it completes abandons the request.
    pub async fn run_ai_transform<D>(
        &mut self,
        delegate: &D,
        action: AiAction,
    ) -> SessionResult<EditMode>
    where
        D: AiDelegate + Sync,
    {
        let ticket = self.begin_ai_transform(action)?;
        let pending = PendingRequest {
            session: self,
            serial: ticket.serial,
        };
        let result = delegate.transform(ticket.image_id(), ticket.action()).await;
        pending.session.finish_ai_transform(ticket, result)
    }

    fn release_ticket(&mut self, serial: u64) -> bool {
        if self.pending_ticket != Some(serial) {
            return false;
        }
        self.pending_ticket = None;
        tracing::warn!(serial, "AI transform abandoned; session unchanged");
        true
    }
}

/// Clears the busy flag if the request is still pending when dropped.
struct PendingRequest<'a> {
    session: &'a mut EditSession,
    serial: u64,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        self.session.release_ticket(self.serial);
    }
}
