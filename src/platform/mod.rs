//! Host collaborators the browser core talks to.
//!
//! The embedding application implements these traits for its renderer,
//! OS permission layer, activity launcher and event bus. Renderer callbacks
//! arrive as [`RendererEvent`] values so the core never depends on a
//! specific web-view implementation.

pub mod headless;
pub mod storage;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use serde::Serialize;

use crate::intent::IntentSpec;

// ─── Single-shot replies ─────────────────────────────────────────────────────

/// One-shot completion handle for a renderer-originated request.
///
/// `send` consumes the handle, so a reply can be delivered at most once.
pub struct Responder<T> {
    reply: Box<dyn FnOnce(T) + Send>,
}

impl<T> Responder<T> {
    pub fn new(reply: impl FnOnce(T) + Send + 'static) -> Self {
        Self {
            reply: Box::new(reply),
        }
    }

    pub fn send(self, value: T) {
        (self.reply)(value)
    }
}

impl<T> std::fmt::Debug for Responder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Responder(..)")
    }
}

// ─── Renderer events ─────────────────────────────────────────────────────────

/// Media resources a page can ask for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    VideoCapture,
    AudioCapture,
    ProtectedMediaId,
    MidiSysex,
}

/// Answer to a standard permission request. Grants are all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionGrant {
    Granted(Vec<ResourceKind>),
    Denied,
}

/// Answer to a geolocation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeolocationDecision {
    pub origin: String,
    pub allow: bool,
    /// Whether the renderer should remember the decision. Always false.
    pub retain: bool,
}

/// URIs picked in a file chooser; `None` means nothing was selected.
pub type FileSelection = Option<Vec<String>>;

/// Load error codes reported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorCode {
    HostLookup,
    UnsupportedScheme,
    BadUrl,
    Connect,
    Timeout,
    FileNotFound,
    Other(i32),
}

impl LoadErrorCode {
    /// Errors that replace the page with the error display. Sub-resource
    /// failures such as a broken image are left to the renderer.
    pub fn is_page_fatal(self) -> bool {
        matches!(
            self,
            LoadErrorCode::HostLookup | LoadErrorCode::UnsupportedScheme | LoadErrorCode::BadUrl
        )
    }
}

/// Callbacks emitted by the renderer, in arrival order.
#[derive(Debug)]
pub enum RendererEvent {
    PageStarted {
        url: String,
    },
    PageFinished {
        url: String,
    },
    ReceivedError {
        code: LoadErrorCode,
    },
    /// The page wants to navigate; the dispatcher reports whether the core took it over.
    NavigationRequested {
        url: String,
    },
    PermissionRequested {
        resources: Vec<ResourceKind>,
        responder: Responder<PermissionGrant>,
    },
    GeolocationPrompt {
        origin: String,
        responder: Responder<GeolocationDecision>,
    },
    ShowFileChooser {
        accept_types: Vec<String>,
        capture_enabled: bool,
        responder: Responder<FileSelection>,
    },
    VisitedHistoryUpdated,
}

// ─── OS permission layer ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Camera,
    RecordAudio,
    ModifyAudioSettings,
    FineLocation,
    CoarseLocation,
}

/// Independent permission classes; also the request token handed to the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionClass {
    Standard,
    Geolocation,
    Camera,
}

pub trait PermissionSystem {
    fn is_granted(&self, permission: Permission) -> bool;
    /// Whether the host application declares the permission at all.
    fn is_declared(&self, permission: Permission) -> bool;
    /// Show one OS prompt. The answer comes back through
    /// `Browser::on_permissions_result` tagged with `class`.
    fn request(&mut self, permissions: &[Permission], class: PermissionClass);
}

// ─── Renderer / chrome ───────────────────────────────────────────────────────

pub trait Renderer {
    fn load_url(&mut self, url: &str, headers: &[(String, String)]);
    fn stop_loading(&mut self);
    fn can_go_back(&self) -> bool;
    fn can_go_forward(&self) -> bool;
    fn go_back(&mut self);
    fn go_forward(&mut self);
    fn evaluate_script(&mut self, script: &str);
}

/// Browser UI surrounding the renderer.
pub trait Chrome {
    fn set_loading_visible(&mut self, visible: bool);
    fn set_error_visible(&mut self, visible: bool);
    fn set_url_text(&mut self, url: &str);
    fn set_navigation_state(&mut self, can_go_back: bool, can_go_forward: bool);
}

// ─── Activity launcher ───────────────────────────────────────────────────────

#[derive(Debug)]
pub enum LaunchError {
    NoHandler(String),
    Rejected(String),
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchError::NoHandler(what) => write!(f, "no activity handles {}", what),
            LaunchError::Rejected(why) => write!(f, "launch rejected: {}", why),
        }
    }
}

impl std::error::Error for LaunchError {}

pub trait ActivityLauncher {
    /// Hand the intent to another application.
    fn start_external(&mut self, intent: &IntentSpec) -> Result<(), LaunchError>;
    /// Start an activity whose result comes back through
    /// `Browser::on_chooser_result`.
    fn launch_for_result(&mut self, intent: &IntentSpec) -> Result<(), LaunchError>;
}

// ─── Scratch storage ─────────────────────────────────────────────────────────

pub trait ScratchStorage {
    fn cache_dir(&self) -> &Path;
    /// Create an empty file named `<prefix><timestamp>_<n><suffix>` that no
    /// other operation uses.
    fn create_unique_file(&self, prefix: &str, suffix: &str) -> io::Result<PathBuf>;
    /// Shareable reference that lets another app write into `file`.
    fn content_uri_for(&self, file: &Path) -> String;
}

// ─── Event bus ───────────────────────────────────────────────────────────────

/// Payloads published to the host's event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum BrowserEvent {
    BrowserPageLoaded {
        browser_id: String,
    },
    BrowserPageNavigationCompleted {
        browser_id: String,
        url: String,
    },
    BrowserFinished {
        browser_id: String,
    },
}

/// Fire-and-forget publisher.
pub trait EventSink {
    fn publish(&mut self, event: BrowserEvent);
}

impl EventSink for mpsc::Sender<BrowserEvent> {
    fn publish(&mut self, event: BrowserEvent) {
        if self.send(event).is_err() {
            log::debug!("Event bus receiver dropped");
        }
    }
}

impl EventSink for Vec<BrowserEvent> {
    fn publish(&mut self, event: BrowserEvent) {
        self.push(event);
    }
}
