use std::time::Duration;

use crate::config::BrowserOptions;

/// Default user agent for probe and download requests.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; InAppBrowser/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Error during an HTTP exchange
#[derive(Debug)]
pub struct FetchError {
    pub message: String,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError {
            message: format!("Request failed: {}", e),
        }
    }
}

/// Limits applied to every client the browser core builds.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(15),
            max_redirects: 10,
        }
    }
}

impl ClientSettings {
    pub fn from_options(options: &BrowserOptions) -> Self {
        Self {
            user_agent: options
                .custom_user_agent
                .clone()
                .filter(|ua| !ua.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout: Duration::from_secs(options.http_timeout_secs),
            max_redirects: options.max_redirects,
        }
    }
}

/// Build the blocking client shared by the probe and the PDF cache.
///
/// Redirects are followed up to `max_redirects` hops.
pub fn build_client(settings: &ClientSettings) -> Result<reqwest::blocking::Client, FetchError> {
    reqwest::blocking::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout)
        .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
        .build()
        .map_err(|e| FetchError {
            message: format!("Client error: {}", e),
        })
}
