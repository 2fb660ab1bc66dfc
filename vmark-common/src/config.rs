//! Configuration loading and config directory resolution
//!
//! Three small JSON documents live in the config directory:
//! - `api_config.json`: LLM endpoint, keys and prompt templates
//! - `output_folder_config.json`: where ledgers and copied videos are written
//! - `diagnosis_labels_config.json`: the selectable diagnosis tags
//!
//! Every document is loaded with defaults-merge semantics: missing keys take their
//! built-in default, and a missing or corrupt file yields the full default document
//! (with a warning) instead of an error. An optional `vmark.toml` carries bootstrap
//! settings (logging, output folder override).

use crate::fs_utils::write_atomic;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "VMARK_CONFIG_DIR";

/// Environment variable overriding the output folder
pub const OUTPUT_FOLDER_ENV: &str = "VMARK_OUTPUT_FOLDER";

/// Bootstrap TOML file name inside the config directory
pub const BOOTSTRAP_FILE: &str = "vmark.toml";

/// Config directory resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable `VMARK_CONFIG_DIR`
/// 3. Platform config directory (`~/.config/vmark` on Linux)
/// 4. `./config` (fallback)
pub fn resolve_config_dir(cli_arg: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_DIR_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: Platform config directory
    if let Some(dir) = dirs::config_dir() {
        return dir.join("vmark");
    }

    // Priority 4: Relative fallback
    PathBuf::from("config")
}

// ============================================================================
// Bootstrap TOML
// ============================================================================

/// Bootstrap configuration loaded from `vmark.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Output folder override (takes precedence over `output_folder_config.json`)
    #[serde(default)]
    pub output_folder: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BootstrapConfig {
    /// Load `vmark.toml` from the config directory
    ///
    /// A missing file is normal; an unreadable or malformed one is reported on stderr
    /// and replaced by defaults. (Logging is not initialised yet when this runs.)
    pub fn load(config_dir: &Path) -> Self {
        let path = config_dir.join(BOOTSTRAP_FILE);
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }
}

// ============================================================================
// JSON config documents
// ============================================================================

/// A JSON document stored in the config directory
pub trait ConfigDocument: Serialize + DeserializeOwned + Default {
    /// File name inside the config directory
    const FILE_NAME: &'static str;
}

/// Loads and saves [`ConfigDocument`]s from one directory
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for<T: ConfigDocument>(&self) -> PathBuf {
        self.dir.join(T::FILE_NAME)
    }

    /// Load a document, falling back to its default on a missing or corrupt file
    pub fn load<T: ConfigDocument>(&self) -> T {
        let path = self.path_for::<T>();
        if !path.exists() {
            debug!(file = %path.display(), "Config file not present, using defaults");
            return T::default();
        }
        match self.try_load::<T>() {
            Ok(doc) => doc,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to load config, using defaults");
                T::default()
            }
        }
    }

    /// Load a document, surfacing read and parse errors
    pub fn try_load<T: ConfigDocument>(&self) -> Result<T> {
        let content = std::fs::read_to_string(self.path_for::<T>())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save a document as pretty-printed JSON
    pub fn save<T: ConfigDocument>(&self, doc: &T) -> Result<()> {
        let path = self.path_for::<T>();
        let json = serde_json::to_string_pretty(doc)?;
        write_atomic(&path, json.as_bytes())
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))?;
        info!(file = %path.display(), "Config saved");
        Ok(())
    }
}

// ============================================================================
// API settings
// ============================================================================

/// LLM endpoint settings and prompt templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Supports `{description}` and `{final_diagnosis}` placeholders
    #[serde(default = "default_user_prompt_template")]
    pub user_prompt_template: String,
    /// Stored verbatim as the `human` turn of every ledger entry
    #[serde(default = "default_human_prompt_template")]
    pub human_prompt_template: String,
}

fn default_api_base() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_model() -> String {
    "deepseek-reasoner".to_string()
}

fn default_system_prompt() -> String {
    "You are an expert assistant that analyses annotated video observations.".to_string()
}

fn default_user_prompt_template() -> String {
    "{description}\n\nFinal diagnosis: {final_diagnosis}\n\n\
     The above is what was observed in the video. Reason step by step about these \
     observations and explain how they support the diagnosis."
        .to_string()
}

fn default_human_prompt_template() -> String {
    "<image>\nAnalyse the given video and describe your findings.".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            api_base: default_api_base(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            user_prompt_template: default_user_prompt_template(),
            human_prompt_template: default_human_prompt_template(),
        }
    }
}

impl ConfigDocument for ApiConfig {
    const FILE_NAME: &'static str = "api_config.json";
}

impl ApiConfig {
    pub fn add_key(&mut self, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidInput("API key must not be empty".to_string()));
        }
        self.api_keys.push(key.to_string());
        Ok(())
    }

    pub fn clear_keys(&mut self) {
        self.api_keys.clear();
    }

    pub fn has_keys(&self) -> bool {
        self.api_keys.iter().any(|k| !k.trim().is_empty())
    }

    /// Check the fields a save requires
    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() || self.model.trim().is_empty() {
            return Err(Error::Config(
                "API base URL and model name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Fill the user prompt template
    pub fn user_prompt(&self, description: &str, final_diagnosis: &str) -> String {
        self.user_prompt_template
            .replace("{description}", description)
            .replace("{final_diagnosis}", final_diagnosis)
    }
}

// ============================================================================
// Output folder setting
// ============================================================================

/// Output folder setting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputFolderConfig {
    #[serde(default)]
    pub output_folder: Option<PathBuf>,
}

impl ConfigDocument for OutputFolderConfig {
    const FILE_NAME: &'static str = "output_folder_config.json";
}

impl OutputFolderConfig {
    /// Resolve the effective output folder
    ///
    /// The configured folder is used only if it exists; otherwise the default
    /// `<desktop or home>/video_annotations` is created and returned.
    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(folder) = &self.output_folder {
            if folder.is_dir() {
                return Ok(folder.clone());
            }
            warn!(folder = %folder.display(), "Configured output folder does not exist, using default");
        }
        let folder = default_output_folder();
        std::fs::create_dir_all(&folder)?;
        Ok(folder)
    }
}

/// Default output folder: `video_annotations` on the desktop (or in the home directory)
pub fn default_output_folder() -> PathBuf {
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("video_annotations")
}

/// Output folder resolution, in priority order:
/// 1. Command-line argument
/// 2. Environment variable `VMARK_OUTPUT_FOLDER`
/// 3. Bootstrap TOML `output_folder`
/// 4. `output_folder_config.json` (if the folder exists), else the default folder
///
/// Explicit overrides (1-3) are created if missing.
pub fn resolve_output_folder(
    cli_arg: Option<&Path>,
    bootstrap: &BootstrapConfig,
    store: &ConfigStore,
) -> Result<PathBuf> {
    let explicit = cli_arg
        .map(Path::to_path_buf)
        .or_else(|| {
            std::env::var(OUTPUT_FOLDER_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        })
        .or_else(|| bootstrap.output_folder.clone());

    if let Some(folder) = explicit {
        std::fs::create_dir_all(&folder)?;
        return Ok(folder);
    }

    store.load::<OutputFolderConfig>().resolve()
}

// ============================================================================
// Diagnosis labels
// ============================================================================

/// Selectable diagnosis labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisLabelsConfig {
    #[serde(default = "default_diagnosis_labels")]
    pub diagnosis_labels: Vec<String>,
}

fn default_diagnosis_labels() -> Vec<String> {
    vec!["Label 1".to_string(), "Label 2".to_string(), "Label 3".to_string()]
}

impl Default for DiagnosisLabelsConfig {
    fn default() -> Self {
        Self {
            diagnosis_labels: default_diagnosis_labels(),
        }
    }
}

impl ConfigDocument for DiagnosisLabelsConfig {
    const FILE_NAME: &'static str = "diagnosis_labels_config.json";
}

impl DiagnosisLabelsConfig {
    pub fn contains(&self, label: &str) -> bool {
        self.diagnosis_labels.iter().any(|l| l == label)
    }

    pub fn add(&mut self, label: &str) -> Result<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::InvalidInput("Label must not be empty".to_string()));
        }
        if self.contains(label) {
            return Err(Error::InvalidInput(format!("Label already exists: {}", label)));
        }
        self.diagnosis_labels.push(label.to_string());
        Ok(())
    }

    pub fn rename(&mut self, current: &str, new_label: &str) -> Result<()> {
        let new_label = new_label.trim();
        if new_label.is_empty() {
            return Err(Error::InvalidInput("Label must not be empty".to_string()));
        }
        let index = self
            .diagnosis_labels
            .iter()
            .position(|l| l == current)
            .ok_or_else(|| Error::NotFound(format!("Label: {}", current)))?;
        if new_label != current && self.contains(new_label) {
            return Err(Error::InvalidInput(format!("Label already exists: {}", new_label)));
        }
        self.diagnosis_labels[index] = new_label.to_string();
        Ok(())
    }

    pub fn remove(&mut self, label: &str) -> Result<()> {
        let before = self.diagnosis_labels.len();
        self.diagnosis_labels.retain(|l| l != label);
        if self.diagnosis_labels.len() == before {
            return Err(Error::NotFound(format!("Label: {}", label)));
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.diagnosis_labels = default_diagnosis_labels();
    }
}
