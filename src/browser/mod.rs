//! `Browser`: one in-app browser session.
//!
//! This module declares the `Browser` struct and its constructor. The
//! methods are split across the sibling sub-modules:
//!
//! - `loading`: load pipeline (PDF probe + download off-thread), reload
//! - `dispatch`: renderer events, OS permission and chooser results, history
//!
//! All state lives on the thread that owns the `Browser`. Network work runs
//! on a spawned thread and is applied only when `poll_loads` (or
//! `wait_for_load`) hands the result back.

pub mod dispatch;
pub mod loading;


use std::sync::{mpsc, Arc};

use crate::chooser::{ChooserContext, FileChooserCoordinator};
use crate::config::BrowserOptions;
use crate::navigation::NavigationController;
use crate::net::fetch::{ClientSettings, FetchError};
use crate::net::pdf_cache::PdfCache;
use crate::net::probe::ContentTypeProbe;
use crate::permission::PermissionBroker;
use crate::platform::{
    ActivityLauncher, Chrome, EventSink, PermissionSystem, Renderer, ScratchStorage,
};

use loading::{LoadOutcome, PageLoader};

/// Host collaborators for one session.
pub struct Host {
    pub renderer: Box<dyn Renderer>,
    pub chrome: Box<dyn Chrome>,
    pub permissions: Box<dyn PermissionSystem>,
    pub launcher: Box<dyn ActivityLauncher>,
    pub storage: Box<dyn ScratchStorage>,
    pub events: Box<dyn EventSink>,
}

impl Host {
    fn chooser_context(&mut self) -> ChooserContext<'_> {
        ChooserContext {
            os: &mut *self.permissions,
            launcher: &mut *self.launcher,
            storage: &*self.storage,
        }
    }
}

// ─── Session state ───────────────────────────────────────────────────────────

pub struct Browser {
    pub options: BrowserOptions,
    host: Host,
    navigation: NavigationController,
    permissions: PermissionBroker,
    chooser: FileChooserCoordinator,
    loader: PageLoader,
    load_seq: u64,
    load_rx: Option<mpsc::Receiver<LoadOutcome>>,
    finished: bool,
}

impl Browser {
    /// New session with the real HTTP probe; PDFs are cached in the
    /// storage's cache directory.
    pub fn new(
        browser_id: impl Into<String>,
        options: BrowserOptions,
        host: Host,
    ) -> Result<Self, FetchError> {
        let settings = ClientSettings::from_options(&options);
        let probe = ContentTypeProbe::with_settings(&settings)?;
        let cache = PdfCache::new(host.storage.cache_dir(), &settings)?;
        Ok(Self::with_loader(browser_id, options, host, probe, cache))
    }

    pub fn with_loader(
        browser_id: impl Into<String>,
        options: BrowserOptions,
        host: Host,
        probe: ContentTypeProbe,
        cache: PdfCache,
    ) -> Self {
        let navigation =
            NavigationController::new(browser_id, options.pdf_viewer_prefix.clone());
        Self {
            options,
            host,
            navigation,
            permissions: PermissionBroker::new(),
            chooser: FileChooserCoordinator::new(),
            loader: PageLoader::new(probe, Arc::new(cache)),
            load_seq: 0,
            load_rx: None,
            finished: false,
        }
    }

    pub fn browser_id(&self) -> &str {
        &self.navigation.session().browser_id
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.navigation
    }

    pub fn permissions(&self) -> &PermissionBroker {
        &self.permissions
    }

    pub fn is_loading(&self) -> bool {
        self.load_rx.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
