//! Navigation routing by URL scheme.
//!
//! `classify` is a pure function of the URL and the static scheme table:
//! the longest matching prefix decides whether the renderer loads the URL,
//! another app handles it, or the renderer keeps its default behaviour.

use crate::intent::{parse_intent_uri, IntentAction, IntentParseError, IntentSpec};
use crate::platform::{ActivityLauncher, LaunchError};

pub const STORE_PACKAGE: &str = "com.android.vending";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemeKind {
    Dial,
    SendTo,
    View,
    IntentUri,
    Store,
    Embedded,
}

const SCHEME_TABLE: &[(&str, SchemeKind)] = &[
    ("tel:", SchemeKind::Dial),
    ("sms:", SchemeKind::SendTo),
    ("mailto:", SchemeKind::SendTo),
    ("geo:", SchemeKind::View),
    ("intent:", SchemeKind::IntentUri),
    ("https://play.google.com/store", SchemeKind::Store),
    ("market:", SchemeKind::Store),
    ("http:", SchemeKind::Embedded),
    ("https:", SchemeKind::Embedded),
];

/// Hand-off target for a URL another application should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalIntent {
    Dial(String),
    SendTo(String),
    View(String),
    /// Raw `intent:` URI, parsed when launched.
    IntentUri(String),
    /// View pinned to the store app.
    Store(String),
}

impl ExternalIntent {
    /// Build the concrete intent for the launcher.
    pub fn resolve(&self) -> Result<IntentSpec, RouteError> {
        Ok(match self {
            ExternalIntent::Dial(url) => IntentSpec::new(IntentAction::Dial).with_data(url),
            ExternalIntent::SendTo(url) => IntentSpec::new(IntentAction::SendTo).with_data(url),
            ExternalIntent::View(url) => IntentSpec::new(IntentAction::View).with_data(url),
            ExternalIntent::IntentUri(uri) => parse_intent_uri(uri)?,
            ExternalIntent::Store(url) => IntentSpec::new(IntentAction::View)
                .with_data(url)
                .with_package(STORE_PACKAGE),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    LoadEmbedded(String),
    LaunchExternal(ExternalIntent),
    Unhandled,
}

#[derive(Debug)]
pub enum RouteError {
    MalformedIntent(IntentParseError),
    NoHandler(LaunchError),
}

impl std::fmt::Display for RouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteError::MalformedIntent(e) => write!(f, "malformed intent: {}", e),
            RouteError::NoHandler(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RouteError {}

impl From<IntentParseError> for RouteError {
    fn from(e: IntentParseError) -> Self {
        RouteError::MalformedIntent(e)
    }
}

impl From<LaunchError> for RouteError {
    fn from(e: LaunchError) -> Self {
        RouteError::NoHandler(e)
    }
}

/// Scheme and authority lower-cased; path and query left as they are.
fn match_key(url: &str) -> String {
    let Some(colon) = url.find(':') else {
        return url.to_string();
    };
    let (scheme, rest) = url.split_at(colon);
    let mut key = scheme.to_ascii_lowercase();
    match rest.strip_prefix("://") {
        Some(after) => {
            let end = after.find(['/', '?', '#']).unwrap_or(after.len());
            key.push_str("://");
            key.push_str(&after[..end].to_ascii_lowercase());
            key.push_str(&after[end..]);
        }
        None => key.push_str(rest),
    }
    key
}

pub fn classify(url: &str) -> RouteDecision {
    let key = match_key(url);
    let kind = SCHEME_TABLE
        .iter()
        .filter(|(prefix, _)| key.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, kind)| *kind);

    let url = url.to_string();
    match kind {
        Some(SchemeKind::Dial) => RouteDecision::LaunchExternal(ExternalIntent::Dial(url)),
        Some(SchemeKind::SendTo) => RouteDecision::LaunchExternal(ExternalIntent::SendTo(url)),
        Some(SchemeKind::View) => RouteDecision::LaunchExternal(ExternalIntent::View(url)),
        Some(SchemeKind::IntentUri) => {
            RouteDecision::LaunchExternal(ExternalIntent::IntentUri(url))
        }
        Some(SchemeKind::Store) => RouteDecision::LaunchExternal(ExternalIntent::Store(url)),
        Some(SchemeKind::Embedded) => RouteDecision::LoadEmbedded(url),
        None => RouteDecision::Unhandled,
    }
}

/// Resolve and start an external intent.
pub fn try_launch(
    intent: &ExternalIntent,
    launcher: &mut dyn ActivityLauncher,
) -> Result<(), RouteError> {
    let spec = intent.resolve()?;
    launcher.start_external(&spec)?;
    Ok(())
}

/// Like [`try_launch`], but a failure only means "not handled".
pub fn launch_external(intent: &ExternalIntent, launcher: &mut dyn ActivityLauncher) -> bool {
    match try_launch(intent, launcher) {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Failed to launch external intent {:?}: {}", intent, e);
            false
        }
    }
}
