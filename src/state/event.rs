use super::model::EditMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditEvent {
    /// A crop was committed to the working raster.
    ApplyCrop,
    /// The user picked a tool tab.
    SelectMode(EditMode),
    /// An AI transform replaced the working raster.
    AiTransformApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: Option<EditMode>,
    pub event: EditEvent,
    pub to: EditMode,
}

impl StateTransition {
    pub const fn new(from: Option<EditMode>, event: EditEvent, to: EditMode) -> Self {
        Self { from, event, to }
    }
}
