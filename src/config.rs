//! Browser options, loadable from a TOML file.
//!
//! Missing keys take their defaults. `load_options` never fails: an
//! unreadable or invalid file is logged and the defaults are used, so a
//! broken options file cannot keep the browser from opening.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::navigation::DEFAULT_PDF_VIEWER_PREFIX;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Clear web storage whenever the PDF viewer finishes loading.
    pub clear_cache: bool,
    pub custom_user_agent: Option<String>,
    pub show_url: bool,
    pub show_navigation_buttons: bool,
    /// Let the system back press walk renderer history.
    pub hardware_back: bool,
    pub http_timeout_secs: u64,
    pub max_redirects: usize,
    pub pdf_viewer_prefix: String,
    pub file_provider_authority: String,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            clear_cache: false,
            custom_user_agent: None,
            show_url: true,
            show_navigation_buttons: true,
            hardware_back: true,
            http_timeout_secs: 15,
            max_redirects: 10,
            pdf_viewer_prefix: DEFAULT_PDF_VIEWER_PREFIX.to_string(),
            file_provider_authority: "inapp_browser.fileprovider".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read options: {}", e),
            ConfigError::Parse(e) => write!(f, "invalid options: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

pub fn parse_options(text: &str) -> Result<BrowserOptions, ConfigError> {
    toml::from_str(text).map_err(ConfigError::Parse)
}

pub fn read_options(path: &Path) -> Result<BrowserOptions, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_options(&text)
}

pub fn load_options(path: &Path) -> BrowserOptions {
    match read_options(path) {
        Ok(options) => {
            log::info!("Loaded browser options from {}", path.display());
            options
        }
        Err(e) => {
            log::warn!("{} ({}); using defaults", e, path.display());
            BrowserOptions::default()
        }
    }
}
