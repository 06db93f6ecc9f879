use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default config file name, resolved against the working directory.
pub const CONFIG_FILE: &str = "dewatermark.json";

/// Top-level configuration for a dewatermark run.
///
/// Controls where images are read from and written to, which model and
/// prompt the edit service is driven with, and how results are encoded.
///
/// # Loading
///
/// ```rust,no_run
/// use dewatermark::config::Config;
///
/// // From a JSON file (falls back to defaults when the file is absent)
/// let config = Config::load(Some("dewatermark.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.output.jpeg_quality = 90;
/// config.edit.model = "gemini-2.5-flash-image".into();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input and output directories.
    pub paths: PathsConfig,
    /// Edit service model and prompt.
    pub edit: EditConfig,
    /// JPEG encoding and review behavior.
    pub output: OutputConfig,
    /// Metadata copy backend.
    pub metadata: MetadataConfig,
}

/// Directory layout, relative to the working directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Source JPEGs. Files are deleted from here when skipped.
    pub input_dir: PathBuf,
    /// Generated JPEGs, one per processed file, same name as the input.
    pub output_dir: PathBuf,
}

/// Gemini edit service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    pub model: String,
    /// Base URL of the `generateContent` API, without the model path.
    pub endpoint: String,
    /// Instruction sent with every fresh request; operator comments are appended to it.
    pub base_prompt: String,
}

/// Output and review behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JPEG quality (1–100). Higher values give larger, more faithful files.
    pub jpeg_quality: u8,
    /// If `true`, accept the first generated image without asking the operator.
    pub auto_accept: bool,
}

/// Which mechanism copies metadata from the original onto the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    /// A long-lived `exiftool -stay_open` process.
    Exiftool,
    /// In-process copy of the EXIF and ICC segments.
    Native,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub backend: MetadataBackend,
    /// Executable name or path for the exiftool backend.
    pub exiftool_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-image".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            base_prompt: "Remove all watermarks, logos and overlaid text from this photo. \
                Reconstruct the covered areas so they blend naturally with their surroundings. \
                Do not change anything else: keep the composition, colors, lighting and \
                resolution of the original image."
                .to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 95,
            auto_accept: false,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::Exiftool,
            exiftool_path: PathBuf::from("exiftool"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            edit: EditConfig::default(),
            output: OutputConfig::default(),
            metadata: MetadataConfig::default(),
        }
    }
}

impl Config {
    /// Resolve the config file path: `dewatermark.json` in the working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Load config from the given path, or from the default location.
    ///
    /// A missing file is not an error: defaults are returned.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path(),
        };

        if !config_path.exists() {
            log::debug!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path(),
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(Error::Config(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.output.jpeg_quality
            )));
        }
        if self.edit.model.trim().is_empty() {
            return Err(Error::Config("edit.model must not be empty".into()));
        }
        if self.edit.base_prompt.trim().is_empty() {
            return Err(Error::Config("edit.base_prompt must not be empty".into()));
        }
        Ok(())
    }

    /// Read the edit service credential from the environment.
    pub fn api_key_from_env() -> crate::error::Result<String> {
        api_key_from(std::env::var(API_KEY_ENV).ok())
    }
}

fn api_key_from(value: Option<String>) -> crate::error::Result<String> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(Error::Config(format!(
            "{API_KEY_ENV} is not set. Export your Gemini API key or add it to a .env file."
        ))),
    }
}
