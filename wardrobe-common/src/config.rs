//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the metadata table inside the root folder
pub const METADATA_FILE: &str = "metadata.csv";

/// Name of the image folder inside the root folder
pub const IMAGE_FOLDER: &str = "wardrobe_images";

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "WARDROBE_ROOT_FOLDER";

/// Environment variable holding the generative service API key
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Environment variable holding the remove.bg API key
pub const ENV_REMOVE_BG_API_KEY: &str = "REMOVE_BG_API_KEY";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional in the file; a missing file yields the defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Folder holding metadata.csv and the image folder
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted upload in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub stylist: StylistConfig,

    #[serde(default)]
    pub background: BackgroundConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            logging: LoggingConfig::default(),
            stylist: StylistConfig::default(),
            background: BackgroundConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
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

/// Outfit suggestion service settings
#[derive(Debug, Clone, Deserialize)]
pub struct StylistConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Ask the service for schema-constrained JSON instead of free text
    #[serde(default = "default_true")]
    pub structured_output: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StylistConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            structured_output: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Background removal service settings
#[derive(Debug, Clone, Deserialize)]
pub struct BackgroundConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_port() -> u16 {
    5730
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    60
}

/// Load the TOML configuration
///
/// An explicit path must exist and parse. Without one, the platform config file
/// is used when present; otherwise the defaults apply.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return read_toml_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => read_toml_config(&path),
        Some(path) => {
            warn!("Config file not found at {}, using defaults", path.display());
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Parse a TOML configuration file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Platform configuration file path (`<config dir>/wardrobe/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wardrobe").join("config.toml"))
}

/// Root folder resolution priority:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("wardrobe"))
        .unwrap_or_else(|| PathBuf::from("./wardrobe_data"))
}

/// Resolve an API key from the environment, then the TOML value
///
/// Blank values count as absent.
pub fn resolve_api_key(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    if let Ok(key) = std::env::var(env_var) {
        if is_valid_key(&key) {
            info!("{} loaded from environment", env_var);
            return Some(key.trim().to_string());
        }
    }

    match toml_value {
        Some(key) if is_valid_key(key) => {
            info!("{} loaded from TOML config", env_var);
            Some(key.trim().to_string())
        }
        _ => None,
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Files and folders derived from the root folder
#[derive(Debug, Clone)]
pub struct RootLayout {
    root: PathBuf,
}

impl RootLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root.join(IMAGE_FOLDER)
    }

    /// Table value recorded for an image stored under the image folder
    pub fn stored_image_path(&self, file_name: &str) -> String {
        format!("{}/{}", IMAGE_FOLDER, file_name)
    }

    /// Filesystem location of a stored image path
    ///
    /// Relative paths are taken from the root folder; absolute paths are kept.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        let path = Path::new(stored);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Create the root and image folders if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.image_dir())?;
        Ok(())
    }
}
