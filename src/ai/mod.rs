//! Whole-image transforms delegated to an external AI service.
//!
//! The editor treats the service as a black box: it names one of a closed set
//! of actions for a persisted image and receives encoded image bytes back.

mod local;

use std::future::Future;

use serde::Deserialize;
use thiserror::Error;

use crate::config::AiActionNames;
use crate::storage::ImageId;

pub use local::LocalAiDelegate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum AiAction {
    RemoveBackground,
    SmartExpand,
    Enhance,
}

impl AiAction {
    pub const ALL: [AiAction; 3] = [Self::RemoveBackground, Self::SmartExpand, Self::Enhance];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RemoveBackground => "remove_background",
            Self::SmartExpand => "smart_expand",
            Self::Enhance => "enhance",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::RemoveBackground => "Remove BG",
            Self::SmartExpand => "Smart Expand",
            Self::Enhance => "Enhance",
        }
    }

    /// Identifier sent to the service for this action.
    pub fn wire_name(self, names: &AiActionNames) -> &str {
        match self {
            Self::RemoveBackground => &names.remove_background,
            Self::SmartExpand => &names.smart_expand,
            Self::Enhance => &names.enhance,
        }
    }

    pub fn parse(value: &str) -> AiResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remove_background" | "remove_bg" => Ok(Self::RemoveBackground),
            "smart_expand" => Ok(Self::SmartExpand),
            "enhance" => Ok(Self::Enhance),
            _ => Err(AiError::UnknownAction(value.to_string())),
        }
    }
}

impl TryFrom<String> for AiAction {
    type Error = AiError;

    fn try_from(value: String) -> AiResult<Self> {
        Self::parse(&value)
    }
}

impl std::fmt::Display for AiAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    #[error("unknown AI action: {0}")]
    UnknownAction(String),
    #[error("AI service rejected {action} ({status}): {detail}")]
    Rejected {
        action: AiAction,
        status: u16,
        detail: String,
    },
    #[error("AI request failed: {0}")]
    Transport(String),
    #[error("AI service returned an unreadable image: {0}")]
    InvalidResult(String),
    #[error("{action} is not supported by this delegate")]
    Unsupported { action: AiAction },
    #[error("AI service is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("no persisted image with id {0}")]
    MissingImage(ImageId),
}

impl AiError {
    /// Message shown to the user, preferring the server-provided detail.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { detail, .. } => format!("AI Processing Failed: {detail}"),
            other => format!("AI Processing Failed: {other}"),
        }
    }
}

pub type AiResult<T> = std::result::Result<T, AiError>;

/// External whole-image transform. Slow and fallible; never cancelled.
pub trait AiDelegate {
    fn transform(
        &self,
        image_id: ImageId,
        action: AiAction,
    ) -> impl Future<Output = AiResult<Vec<u8>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_canonical_names_and_service_alias() {
        assert_eq!(AiAction::parse("remove_background"), Ok(AiAction::RemoveBackground));
        assert_eq!(AiAction::parse("remove_bg"), Ok(AiAction::RemoveBackground));
        assert_eq!(AiAction::parse(" Smart_Expand "), Ok(AiAction::SmartExpand));
        assert_eq!(AiAction::parse("enhance"), Ok(AiAction::Enhance));
    }

    #[test]
    fn parse_rejects_unknown_actions() {
        assert_eq!(
            AiAction::parse("colorize"),
            Err(AiError::UnknownAction("colorize".to_string()))
        );
    }

    #[test]
    fn every_action_round_trips_through_its_name() {
        for action in AiAction::ALL {
            assert_eq!(AiAction::parse(action.as_str()), Ok(action));
        }
    }

    #[test]
    fn wire_name_follows_configuration() {
        let mut names = AiActionNames::default();
        assert_eq!(AiAction::RemoveBackground.wire_name(&names), "remove_bg");
        names.enhance = "super_resolution".to_string();
        assert_eq!(AiAction::Enhance.wire_name(&names), "super_resolution");
    }

    #[test]
    fn user_message_prefers_server_detail() {
        let error = AiError::Rejected {
            action: AiAction::RemoveBackground,
            status: 500,
            detail: "model not loaded".to_string(),
        };
        assert_eq!(error.user_message(), "AI Processing Failed: model not loaded");
    }

    #[test]
    fn deserializes_from_action_name() {
        let action: AiAction = serde_json::from_str("\"smart_expand\"").unwrap();
        assert_eq!(action, AiAction::SmartExpand);
        assert!(serde_json::from_str::<AiAction>("\"sharpen\"").is_err());
    }
}
