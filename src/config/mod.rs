use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::surface::{OutputFormat, DEFAULT_OUTPUT_QUALITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

const APP_DIR: &str = "newsdesk-editor";
const APP_CONFIG_FILE: &str = "config.json";

pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub watermark: WatermarkConfig,
    pub brush: BrushConfig,
    pub output: OutputConfig,
    pub ai: AiConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub text: String,
    pub font_family: String,
    pub font_path: Option<PathBuf>,
    pub font_size_fraction: f32,
    pub opacity: f32,
    pub inset_x_fraction: f32,
    pub inset_y_fraction: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "MUHABİR".to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_path: None,
            font_size_fraction: 0.05,
            opacity: 0.5,
            inset_x_fraction: 0.25,
            inset_y_fraction: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    pub radius: f32,
    pub sigma: f32,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            radius: 30.0,
            sigma: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: DEFAULT_OUTPUT_QUALITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub actions: AiActionNames,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 120,
            actions: AiActionNames::default(),
        }
    }
}

/// Identifiers the AI service expects for each action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AiActionNames {
    pub remove_background: String,
    pub smart_expand: String,
    pub enhance: String,
}

impl Default for AiActionNames {
    fn default() -> Self {
        Self {
            remove_background: "remove_bg".to_string(),
            smart_expand: "smart_expand".to_string(),
            enhance: "enhance".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub output_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Pulls out-of-range values back into their usable range.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        let watermark = &mut self.watermark;
        if watermark.font_family.trim().is_empty() {
            watermark.font_family = defaults.watermark.font_family;
        }
        if !(watermark.font_size_fraction > 0.0 && watermark.font_size_fraction <= 1.0) {
            watermark.font_size_fraction = defaults.watermark.font_size_fraction;
        }
        watermark.opacity = clamp_fraction(watermark.opacity, defaults.watermark.opacity);
        watermark.inset_x_fraction =
            clamp_fraction(watermark.inset_x_fraction, defaults.watermark.inset_x_fraction);
        watermark.inset_y_fraction =
            clamp_fraction(watermark.inset_y_fraction, defaults.watermark.inset_y_fraction);

        if !(self.brush.radius >= 1.0) {
            self.brush.radius = defaults.brush.radius;
        }
        if !(self.brush.sigma > 0.0) {
            self.brush.sigma = defaults.brush.sigma;
        }
        self.output.quality = self.output.quality.clamp(1, 100);
        if self.ai.timeout_secs == 0 {
            self.ai.timeout_secs = defaults.ai.timeout_secs;
        }
        self
    }
}

fn clamp_fraction(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    load_app_config_from(&path).unwrap_or_else(|err| {
        tracing::warn!(?err, ?path, "failed to load config.json; using defaults");
        AppConfig::default()
    })
}

/// Strict load of an explicitly named config file.
pub fn load_app_config_from(path: &Path) -> ConfigResult<AppConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(config.normalized())
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
