//! Explicit intent descriptions handed to the host's activity launcher.

use url::form_urlencoded;

pub const CATEGORY_OPENABLE: &str = "android.intent.category.OPENABLE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentAction {
    View,
    Dial,
    SendTo,
    ImageCapture,
    VideoCapture,
    GetContent,
    Chooser,
    Custom(String),
}

impl IntentAction {
    pub fn from_name(name: &str) -> Self {
        match name {
            "android.intent.action.VIEW" => IntentAction::View,
            "android.intent.action.DIAL" => IntentAction::Dial,
            "android.intent.action.SENDTO" => IntentAction::SendTo,
            "android.media.action.IMAGE_CAPTURE" => IntentAction::ImageCapture,
            "android.media.action.VIDEO_CAPTURE" => IntentAction::VideoCapture,
            "android.intent.action.GET_CONTENT" => IntentAction::GetContent,
            "android.intent.action.CHOOSER" => IntentAction::Chooser,
            other => IntentAction::Custom(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentSpec {
    pub action: IntentAction,
    pub data: Option<String>,
    pub mime_type: Option<String>,
    pub package: Option<String>,
    pub component: Option<String>,
    pub categories: Vec<String>,
    pub extras: Vec<(String, String)>,
    /// Where a capture app should write its output.
    pub output: Option<String>,
    /// Chooser only: the default choice.
    pub target: Option<Box<IntentSpec>>,
    /// Chooser only: extra choices shown next to the default.
    pub alternates: Vec<IntentSpec>,
}

impl IntentSpec {
    pub fn new(action: IntentAction) -> Self {
        Self {
            action,
            data: None,
            mime_type: None,
            package: None,
            component: None,
            categories: Vec::new(),
            extras: Vec::new(),
            output: None,
            target: None,
            alternates: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Photo or video capture writing into `output`.
    pub fn capture(action: IntentAction, output: impl Into<String>) -> Self {
        let mut intent = Self::new(action);
        intent.output = Some(output.into());
        intent
    }

    /// Openable-content picker narrowed to `mime_type`.
    pub fn get_content(mime_type: impl Into<String>) -> Self {
        let mut intent = Self::new(IntentAction::GetContent);
        intent.mime_type = Some(mime_type.into());
        intent.categories.push(CATEGORY_OPENABLE.to_string());
        intent
    }

    pub fn chooser(target: IntentSpec, alternates: Vec<IntentSpec>) -> Self {
        let mut intent = Self::new(IntentAction::Chooser);
        intent.target = Some(Box::new(target));
        intent.alternates = alternates;
        intent
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentParseError {
    NotIntentUri,
    MissingFragment,
    MissingTerminator,
    BadEntry(String),
}

impl std::fmt::Display for IntentParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentParseError::NotIntentUri => write!(f, "not an intent: URI"),
            IntentParseError::MissingFragment => write!(f, "missing #Intent; section"),
            IntentParseError::MissingTerminator => write!(f, "#Intent; section is not closed by end"),
            IntentParseError::BadEntry(entry) => write!(f, "malformed intent entry {:?}", entry),
        }
    }
}

impl std::error::Error for IntentParseError {}

/// Parse `intent:<data>#Intent;key=value;...;end`.
///
/// `scheme=` rebuilds the data URI, `S.`/`B.`/`i.`/`l.` entries become
/// extras keyed by their name without the type prefix.
pub fn parse_intent_uri(uri: &str) -> Result<IntentSpec, IntentParseError> {
    let rest = uri
        .strip_prefix("intent:")
        .ok_or(IntentParseError::NotIntentUri)?;
    let (data_part, fragment) = rest
        .split_once("#Intent;")
        .ok_or(IntentParseError::MissingFragment)?;
    let body = if fragment == "end" {
        ""
    } else {
        fragment
            .strip_suffix(";end")
            .ok_or(IntentParseError::MissingTerminator)?
    };

    let mut intent = IntentSpec::new(IntentAction::View);
    let mut scheme: Option<String> = None;

    for entry in body.split(';').filter(|e| !e.is_empty()) {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| IntentParseError::BadEntry(entry.to_string()))?;
        let value = decode_component(value);
        match key {
            "action" => intent.action = IntentAction::from_name(&value),
            "package" => intent.package = Some(value),
            "component" => intent.component = Some(value),
            "category" => intent.categories.push(value),
            "type" => intent.mime_type = Some(value),
            "scheme" => scheme = Some(value),
            "launchFlags" | "flags" => {}
            _ => match key.split_once('.') {
                Some((kind, name)) if ["S", "B", "i", "l", "f", "d", "b", "c", "s"].contains(&kind) => {
                    intent.extras.push((decode_component(name), value));
                }
                _ => log::debug!("Ignoring intent entry {}", key),
            },
        }
    }

    if !data_part.is_empty() {
        intent.data = Some(match scheme {
            Some(s) => format!("{}:{}", s, data_part),
            None => data_part.to_string(),
        });
    }

    Ok(intent)
}

fn decode_component(raw: &str) -> String {
    // Keep literal '+' and '&' out of form decoding.
    let escaped = raw.replace('+', "%2B").replace('&', "%26");
    form_urlencoded::parse(format!("v={}", escaped).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
