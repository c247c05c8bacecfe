//! Headless front end: replays a JSON edit script against one image and
//! saves the result.
//!
//! ```text
//! newsdesk-editor apply --input photo.jpg --script edits.json --output-dir out/
//! ```

use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use thiserror::Error;

use crate::ai::{AiAction, AiDelegate, AiError, LocalAiDelegate};
use crate::config::{load_app_config, load_app_config_from, AppConfig};
use crate::editor::CropPreset;
use crate::error::AppResult;
use crate::geometry::{DisplayMapping, PixelRect};
use crate::remote::ApiClient;
use crate::session::{EditSession, SessionError, SessionSettings};
use crate::state::EditMode;
use crate::storage::{FileImageStore, ImageId, ImageSource, PersistedImageRecord};

#[derive(Parser, Debug)]
#[command(
    name = "newsdesk-editor",
    version,
    about = "Crop, redact, watermark and AI-transform newsroom images"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply an edit script to an image and save the result.
    Apply(ApplyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// Image to edit.
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// JSON list of edit steps. Without a script the image is re-encoded as is.
    #[arg(short, long, value_name = "EDITS.json")]
    pub script: Option<PathBuf>,

    /// Record id of the input; needed for AI steps.
    #[arg(long, value_name = "ID")]
    pub image_id: Option<ImageId>,

    /// Where the edited image is written. Defaults to `storage.output_dir`,
    /// then the current directory.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Config file to use instead of the XDG location.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read edit script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse edit script {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("step {index} ({op}) failed: {source}")]
    Step {
        index: usize,
        op: &'static str,
        #[source]
        source: SessionError,
    },
}

/// One user action. Stroke points are raster coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    Mode {
        mode: EditMode,
    },
    Aspect {
        preset: CropPreset,
    },
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    ApplyCrop,
    Stroke {
        points: Vec<[f32; 2]>,
    },
    Watermark,
    Undo,
    Ai {
        action: AiAction,
    },
}

impl ScriptStep {
    pub const fn op(&self) -> &'static str {
        match self {
            Self::Mode { .. } => "mode",
            Self::Aspect { .. } => "aspect",
            Self::Crop { .. } => "crop",
            Self::ApplyCrop => "apply_crop",
            Self::Stroke { .. } => "stroke",
            Self::Watermark => "watermark",
            Self::Undo => "undo",
            Self::Ai { .. } => "ai",
        }
    }
}

pub fn parse_script(contents: &str, path: &Path) -> Result<Vec<ScriptStep>, ScriptError> {
    serde_json::from_str(contents).map_err(|source| ScriptError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn apply(args: ApplyArgs) -> AppResult<PersistedImageRecord> {
    let config = match &args.config {
        Some(path) => load_app_config_from(path)?,
        None => load_app_config(),
    };
    let steps = match &args.script {
        Some(path) => {
            let contents =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ScriptError::Read {
                        path: path.clone(),
                        source,
                    })?;
            parse_script(&contents, path)?
        }
        None => Vec::new(),
    };

    let output_dir = resolve_output_dir(&args, &config);
    let mut store = FileImageStore::with_paths(output_dir);
    if let Some(image_id) = args.image_id {
        store.register_image(image_id, args.input.clone());
    }
    tracing::debug!(output_dir = %store.output_dir().display(), "edited images go here");

    let mut session = EditSession::open(
        &store,
        ImageSource::Path(args.input.clone()),
        args.image_id,
        SessionSettings::from(&config),
    )
    .await?;
    match ApiClient::new(&config.ai) {
        Ok(client) => {
            tracing::info!(base_url = client.base_url(), "AI steps use the remote service");
            run_steps(&mut session, &client, &steps).await?;
        }
        Err(AiError::NotConfigured(_)) => {
            tracing::debug!("ai.base_url not set; AI steps run locally");
            run_steps(&mut session, &LocalAiDelegate::new(&store), &steps).await?;
        }
        Err(err) => return Err(err.into()),
    }

    let record = session.save(&store).await?;
    session.close();
    Ok(record)
}

fn resolve_output_dir(args: &ApplyArgs, config: &AppConfig) -> PathBuf {
    args.output_dir
        .clone()
        .or_else(|| config.storage.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn run_steps<D>(
    session: &mut EditSession,
    delegate: &D,
    steps: &[ScriptStep],
) -> Result<(), ScriptError>
where
    D: AiDelegate + Sync,
{
    for (index, step) in steps.iter().enumerate() {
        run_step(session, delegate, step)
            .await
            .map_err(|source| ScriptError::Step {
                index,
                op: step.op(),
                source,
            })?;
    }
    Ok(())
}

async fn run_step<D>(
    session: &mut EditSession,
    delegate: &D,
    step: &ScriptStep,
) -> Result<(), SessionError>
where
    D: AiDelegate + Sync,
{
    tracing::debug!(op = step.op(), mode = %session.mode(), "running edit step");
    match step {
        ScriptStep::Mode { mode } => {
            session.select_mode(*mode)?;
        }
        ScriptStep::Aspect { preset } => {
            session.set_crop_aspect(*preset)?;
        }
        ScriptStep::Crop {
            x,
            y,
            width,
            height,
        } => {
            session.set_crop_region(PixelRect::new(*x, *y, *width, *height))?;
        }
        ScriptStep::ApplyCrop => {
            session.apply_crop()?;
        }
        ScriptStep::Stroke { points } => {
            let mapping = DisplayMapping::native(session.raster().bounds());
            let Some(([first_x, first_y], rest)) = points.split_first() else {
                tracing::warn!("skipping stroke without points");
                return Ok(());
            };
            session.pointer_down(*first_x, *first_y, mapping)?;
            for [x, y] in rest {
                session.pointer_move(*x, *y, mapping);
            }
            session.pointer_up();
        }
        ScriptStep::Watermark => {
            session.apply_watermark()?;
        }
        ScriptStep::Undo => {
            if !session.undo() {
                tracing::warn!("undo stack empty");
            }
        }
        ScriptStep::Ai { action } => match session.run_ai_transform(delegate, *action).await {
            Ok(_) => {}
            Err(SessionError::Ai(err)) => {
                tracing::warn!(%action, "{}", err.user_message());
            }
            Err(err) => return Err(err),
        },
    }
    Ok(())
}
