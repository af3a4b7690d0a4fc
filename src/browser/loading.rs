//! Load pipeline for `Browser`.
//!
//! Every load first asks the probe whether the URL serves a PDF. PDFs are
//! downloaded to scratch storage and shown through the viewer page; anything
//! else, including a failed download, goes straight to the renderer. The
//! network work runs on a spawned thread and its result is applied by
//! `poll_loads` on the owning thread.

use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use crate::net::pdf_cache::PdfCache;
use crate::net::probe::ContentTypeProbe;

use super::Browser;

/// Probe + download half of a load, shared with the worker thread.
#[derive(Clone)]
pub(crate) struct PageLoader {
    probe: ContentTypeProbe,
    cache: Arc<PdfCache>,
}

/// Result handed back from the worker thread.
#[derive(Debug)]
pub(crate) struct LoadOutcome {
    seq: u64,
    url: String,
    headers: Vec<(String, String)>,
    pdf: Option<PathBuf>,
}

/// A downloaded PDF still owned by the outcome is removed when the outcome
/// is dropped, whether it was superseded in flight, left in a replaced
/// channel, or dropped on close.
impl Drop for LoadOutcome {
    fn drop(&mut self) {
        if let Some(path) = self.pdf.take() {
            log::debug!("Load #{} not shown; removing {}", self.seq, path.display());
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("Cannot remove {}: {}", path.display(), e);
            }
        }
    }
}

impl PageLoader {
    pub(crate) fn new(probe: ContentTypeProbe, cache: Arc<PdfCache>) -> Self {
        Self { probe, cache }
    }

    fn run(&self, seq: u64, url: String, headers: Vec<(String, String)>) -> LoadOutcome {
        let pdf = if self.probe.probe(&url) {
            match self.cache.download(&url) {
                Ok(path) => Some(path),
                Err(e) => {
                    log::warn!("{}; loading {} directly", e, url);
                    None
                }
            }
        } else {
            None
        };
        LoadOutcome {
            seq,
            url,
            headers,
            pdf,
        }
    }
}

impl Browser {
    /// Open `url` with optional request headers. This is the session's
    /// entry point; later navigations come through `handle_event`.
    pub fn open(&mut self, url: &str, headers: Vec<(String, String)>) {
        log::info!("Opening {} in browser {}", url, self.browser_id());
        self.host.chrome.set_loading_visible(true);
        if self.options.show_url {
            self.host.chrome.set_url_text(url);
        }
        self.load_url(url, headers);
    }

    /// Start an asynchronous load. A load already in flight is superseded:
    /// its result is dropped and any file it downloaded is removed.
    pub fn load_url(&mut self, url: &str, headers: Vec<(String, String)>) {
        if self.finished {
            log::warn!("Ignoring load of {} after close", url);
            return;
        }
        self.abandon_pending_load();

        self.load_seq += 1;
        let seq = self.load_seq;

        let (tx, rx) = mpsc::channel();
        self.load_rx = Some(rx);

        let loader = self.loader.clone();
        let url = url.to_string();

        std::thread::spawn(move || {
            // A failed send drops the outcome, which cleans up its file.
            let _ = tx.send(loader.run(seq, url, headers));
        });
    }

    /// Apply a finished load if one is ready. Returns true when a URL was
    /// handed to the renderer.
    pub fn poll_loads(&mut self) -> bool {
        let Some(rx) = &self.load_rx else {
            return false;
        };
        match rx.try_recv() {
            Ok(outcome) => {
                self.load_rx = None;
                self.apply_load(outcome);
                true
            }
            Err(mpsc::TryRecvError::Empty) => false,
            Err(mpsc::TryRecvError::Disconnected) => {
                log::error!("Load #{} worker exited without a result", self.load_seq);
                self.load_rx = None;
                false
            }
        }
    }

    /// Block up to `timeout` for the pending load and apply it.
    pub fn wait_for_load(&mut self, timeout: Duration) -> bool {
        let Some(rx) = &self.load_rx else {
            return false;
        };
        match rx.recv_timeout(timeout) {
            Ok(outcome) => {
                self.load_rx = None;
                self.apply_load(outcome);
                true
            }
            Err(mpsc::RecvTimeoutError::Timeout) => false,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                log::error!("Load #{} worker exited without a result", self.load_seq);
                self.load_rx = None;
                false
            }
        }
    }

    /// Reload the current page. While the PDF viewer is showing, the PDF
    /// itself is fetched again.
    pub fn reload(&mut self) {
        match self.navigation.reload_url() {
            Some(url) => {
                self.host.chrome.set_loading_visible(true);
                self.load_url(&url, Vec::new());
            }
            None => log::debug!("Nothing to reload"),
        }
    }

    /// Drop the in-flight load, including a result already waiting in its
    /// channel. Dropped outcomes remove their downloaded file.
    pub(crate) fn abandon_pending_load(&mut self) {
        let Some(rx) = self.load_rx.take() else {
            return;
        };
        log::debug!("Abandoning load #{}", self.load_seq);
        rx.try_iter().for_each(drop);
    }

    fn apply_load(&mut self, mut outcome: LoadOutcome) {
        if outcome.seq != self.load_seq {
            log::debug!("Dropping stale load #{}", outcome.seq);
            return;
        }

        if let Some(path) = outcome.pdf.take() {
            if let Some(viewer) = self.navigation.begin_pdf_view(&outcome.url, &path) {
                log::debug!("Showing {} in the PDF viewer", outcome.url);
                self.host.renderer.stop_loading();
                self.host.renderer.load_url(&viewer, &[]);
                return;
            }
            log::warn!("No viewer URL for {}; loading directly", path.display());
            outcome.pdf = Some(path);
        }

        self.navigation.begin_direct_load();
        self.host.renderer.load_url(&outcome.url, &outcome.headers);
    }
}
