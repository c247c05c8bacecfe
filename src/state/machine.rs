use super::error::{StateError, StateResult};
use super::{event::StateTransition, EditEvent, EditMode};

#[derive(Debug, Clone)]
pub struct ModeMachine {
    mode: EditMode,
    transition_history: Vec<StateTransition>,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self {
            mode: EditMode::default(),
            transition_history: Vec::new(),
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }

    pub fn next_mode(&self, event: EditEvent) -> Option<EditMode> {
        use EditEvent::*;
        match (self.mode, event) {
            (EditMode::Crop, ApplyCrop) => Some(EditMode::Effects),
            // Effects is only reachable from Crop by applying the crop
            (EditMode::Crop, SelectMode(EditMode::Effects)) => None,
            (_, SelectMode(target)) => Some(target),
            (_, AiTransformApplied) => Some(EditMode::Crop),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: EditEvent) -> StateResult<EditMode> {
        tracing::debug!(from = ?self.mode, event = ?event, "request mode transition");
        let next = self.next_mode(event).ok_or_else(|| {
            let from = self.mode;
            tracing::warn!(from = ?from, event = ?event, "invalid mode transition requested");
            StateError::InvalidStateTransition { from, event }
        })?;

        let record = StateTransition::new(Some(self.mode), event, next);
        self.mode = next;
        self.transition_history.push(record);

        Ok(self.mode)
    }
}

#[cfg(test)]
impl ModeMachine {
    fn can_transition(&self, event: EditEvent) -> bool {
        self.next_mode(event).is_some()
    }
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ModeMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EditMode::{:?}", self.mode)
    }
}
