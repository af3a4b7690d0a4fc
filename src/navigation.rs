//! Page-load lifecycle for one browser session.
//!
//! Turns raw renderer callbacks into the events the host sees:
//! `BrowserPageLoaded` once for the first successful load,
//! `BrowserPageNavigationCompleted` for every later one. PDFs are shown in a
//! bundled viewer page, so finished viewer URLs are reported as the
//! original PDF URL.

use std::path::Path;

use url::{form_urlencoded, Url};

use crate::platform::{BrowserEvent, LoadErrorCode};

pub const DEFAULT_PDF_VIEWER_PREFIX: &str = "file:///android_asset/pdfjs/web/viewer.html?file=";

/// Viewer URL for a cached PDF: `<prefix><percent-encoded file:// URL>`.
pub fn pdf_viewer_url(prefix: &str, file: &Path) -> Option<String> {
    let file_url = Url::from_file_path(file).ok()?;
    let encoded: String = form_urlencoded::byte_serialize(file_url.as_str().as_bytes()).collect();
    Some(format!("{}{}", prefix, encoded))
}

/// Session state, owned by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSession {
    pub browser_id: String,
    pub current_url: Option<String>,
    /// Source URL of the PDF while the viewer is showing it.
    pub original_url: Option<String>,
    pub is_first_load: bool,
    pub has_load_error: bool,
    pub last_finished_url: Option<String>,
}

impl BrowserSession {
    pub fn new(browser_id: impl Into<String>) -> Self {
        Self {
            browser_id: browser_id.into(),
            current_url: None,
            original_url: None,
            is_first_load: true,
            has_load_error: false,
            last_finished_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// What the chrome should do on page start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStart {
    pub hide_error: bool,
}

/// Outcome of a finish callback that was not suppressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFinish {
    pub event: Option<BrowserEvent>,
    /// URL shown to the user and reported to the host.
    pub reported_url: String,
    pub is_pdf_viewer: bool,
}

pub struct NavigationController {
    session: BrowserSession,
    state: LoadState,
    pdf_viewer_prefix: String,
}

impl NavigationController {
    pub fn new(browser_id: impl Into<String>, pdf_viewer_prefix: impl Into<String>) -> Self {
        Self {
            session: BrowserSession::new(browser_id),
            state: LoadState::Idle,
            pdf_viewer_prefix: pdf_viewer_prefix.into(),
        }
    }

    pub fn session(&self) -> &BrowserSession {
        &self.session
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_pdf_viewer_url(&self, url: &str) -> bool {
        url.starts_with(&self.pdf_viewer_prefix)
    }

    /// Remember `original_url` and return the viewer URL for `file`.
    pub fn begin_pdf_view(&mut self, original_url: &str, file: &Path) -> Option<String> {
        let viewer = pdf_viewer_url(&self.pdf_viewer_prefix, file)?;
        self.session.original_url = Some(original_url.to_string());
        Some(viewer)
    }

    /// A non-PDF load replaces whatever the viewer was showing.
    pub fn begin_direct_load(&mut self) {
        self.session.original_url = None;
    }

    /// URL a reload should fetch: the PDF source while the viewer is showing.
    pub fn reload_url(&self) -> Option<String> {
        let current = self.session.current_url.as_deref()?;
        if self.is_pdf_viewer_url(current) {
            if let Some(original) = &self.session.original_url {
                return Some(original.clone());
            }
        }
        Some(current.to_string())
    }

    pub fn on_page_started(&mut self, url: &str) -> PageStart {
        log::debug!("Page started: {}", url);
        self.state = LoadState::Loading;
        PageStart {
            hide_error: !self.session.has_load_error,
        }
    }

    /// `None` when the callback is a repeat finish from the PDF viewer.
    pub fn on_page_finished(&mut self, url: &str) -> Option<PageFinish> {
        let is_pdf_viewer = self.is_pdf_viewer_url(url);
        if is_pdf_viewer && self.session.last_finished_url.as_deref() == Some(url) {
            log::debug!("Suppressing repeated viewer finish for {}", url);
            return None;
        }
        self.session.last_finished_url = Some(url.to_string());

        let reported_url = match (&self.session.original_url, is_pdf_viewer) {
            (Some(original), true) => original.clone(),
            _ => url.to_string(),
        };

        let browser_id = self.session.browser_id.clone();
        let event = if self.session.has_load_error {
            None
        } else if self.session.is_first_load {
            self.session.is_first_load = false;
            Some(BrowserEvent::BrowserPageLoaded { browser_id })
        } else {
            Some(BrowserEvent::BrowserPageNavigationCompleted {
                browser_id,
                url: reported_url.clone(),
            })
        };

        self.state = if self.session.has_load_error {
            LoadState::Errored
        } else {
            LoadState::Loaded
        };
        self.session.has_load_error = false;
        self.session.current_url = Some(url.to_string());

        Some(PageFinish {
            event,
            reported_url,
            is_pdf_viewer,
        })
    }

    /// Returns true when the error display should be shown.
    pub fn on_received_error(&mut self, code: LoadErrorCode) -> bool {
        if !code.is_page_fatal() {
            log::debug!("Leaving load error {:?} to the renderer", code);
            return false;
        }
        log::debug!("Page load failed: {:?}", code);
        self.session.has_load_error = true;
        self.state = LoadState::Errored;
        true
    }
}
