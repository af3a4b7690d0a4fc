//! Event dispatch for `Browser`.
//!
//! Renderer callbacks, OS permission answers and chooser activity results
//! all arrive here on the owning thread.

use crate::chooser::ChooserResult;
use crate::navigation::PageFinish;
use crate::platform::{
    BrowserEvent, FileSelection, GeolocationDecision, LoadErrorCode, Permission,
    PermissionClass, PermissionGrant, RendererEvent, Responder,
};
use crate::route::{self, RouteDecision};

use super::Browser;

/// Evaluated in the PDF viewer when `clear_cache` is set.
pub const CLEAR_STORAGE_SCRIPT: &str = "localStorage.clear(); sessionStorage.clear();";

impl Browser {
    /// Handle one renderer callback. For `NavigationRequested` the return
    /// value tells the renderer whether the browser took the navigation
    /// over; every other event returns true once handled.
    pub fn handle_event(&mut self, event: RendererEvent) -> bool {
        if self.finished {
            log::debug!("Browser closed; rejecting {:?}", event);
            reject(event);
            return false;
        }
        match event {
            RendererEvent::PageStarted { url } => {
                self.on_page_started(&url);
                true
            }
            RendererEvent::PageFinished { url } => {
                self.on_page_finished(&url);
                true
            }
            RendererEvent::ReceivedError { code } => {
                self.on_received_error(code);
                true
            }
            RendererEvent::NavigationRequested { url } => self.route_navigation(&url),
            RendererEvent::PermissionRequested {
                resources,
                responder,
            } => {
                self.permissions
                    .request_standard(resources, responder, &mut *self.host.permissions);
                true
            }
            RendererEvent::GeolocationPrompt { origin, responder } => {
                self.permissions
                    .request_geolocation(origin, responder, &mut *self.host.permissions);
                true
            }
            RendererEvent::ShowFileChooser {
                accept_types,
                capture_enabled,
                responder,
            } => self.show_file_chooser(accept_types, capture_enabled, responder),
            RendererEvent::VisitedHistoryUpdated => {
                self.refresh_navigation_state();
                true
            }
        }
    }

    /// Answer from the OS permission prompt issued for `class`.
    pub fn on_permissions_result(&mut self, class: PermissionClass, results: &[(Permission, bool)]) {
        if let Some(outcome) = self.permissions.on_result(class, results) {
            self.chooser
                .on_camera_outcome(outcome, self.host.chooser_context());
        }
    }

    /// Result of the chooser activity.
    pub fn on_chooser_result(&mut self, result: ChooserResult) {
        self.chooser.on_result(result);
    }

    pub fn go_back(&mut self) {
        if self.host.renderer.can_go_back() {
            self.host.renderer.go_back();
        }
    }

    pub fn go_forward(&mut self) {
        if self.host.renderer.can_go_forward() {
            self.host.renderer.go_forward();
        }
    }

    /// System back press. Returns false when the host should handle it,
    /// usually by closing the browser.
    pub fn on_back_pressed(&mut self) -> bool {
        if !self.options.hardware_back || !self.host.renderer.can_go_back() {
            return false;
        }
        self.host.chrome.set_error_visible(false);
        self.host.renderer.go_back();
        true
    }

    /// End the session. `BrowserFinished` is published once; an open
    /// chooser is answered with no selection.
    pub fn close(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.abandon_pending_load();
        if self.chooser.is_pending() {
            self.chooser.cancel();
        }
        let browser_id = self.browser_id().to_string();
        log::info!("Closing browser {}", browser_id);
        self.host
            .events
            .publish(BrowserEvent::BrowserFinished { browser_id });
    }

    fn route_navigation(&mut self, url: &str) -> bool {
        match route::classify(url) {
            RouteDecision::LoadEmbedded(url) => {
                self.load_url(&url, Vec::new());
                if self.options.show_url {
                    self.host.chrome.set_url_text(&url);
                }
                true
            }
            RouteDecision::LaunchExternal(intent) => {
                route::launch_external(&intent, &mut *self.host.launcher)
            }
            RouteDecision::Unhandled => false,
        }
    }

    fn show_file_chooser(
        &mut self,
        accept_types: Vec<String>,
        capture_enabled: bool,
        responder: Responder<FileSelection>,
    ) -> bool {
        self.chooser.open(
            accept_types,
            capture_enabled,
            responder,
            &mut self.permissions,
            self.host.chooser_context(),
        )
    }

    fn on_page_started(&mut self, url: &str) {
        let start = self.navigation.on_page_started(url);
        if start.hide_error {
            self.host.chrome.set_error_visible(false);
        }
        self.host.chrome.set_loading_visible(true);
    }

    fn on_page_finished(&mut self, url: &str) {
        let Some(PageFinish {
            event,
            reported_url,
            is_pdf_viewer,
        }) = self.navigation.on_page_finished(url)
        else {
            return;
        };

        self.host.chrome.set_loading_visible(false);
        if let Some(event) = event {
            self.host.events.publish(event);
        }
        if is_pdf_viewer && self.options.clear_cache {
            self.host.renderer.evaluate_script(CLEAR_STORAGE_SCRIPT);
        }
        self.refresh_navigation_state();
        if self.options.show_url {
            self.host.chrome.set_url_text(&reported_url);
        }
    }

    fn on_received_error(&mut self, code: LoadErrorCode) {
        if self.navigation.on_received_error(code) {
            self.host.chrome.set_loading_visible(false);
            self.host.chrome.set_error_visible(true);
        }
    }

    fn refresh_navigation_state(&mut self) {
        if !self.options.show_navigation_buttons {
            return;
        }
        let back = self.host.renderer.can_go_back();
        let forward = self.host.renderer.can_go_forward();
        self.host.chrome.set_navigation_state(back, forward);
    }
}

/// Answer a request that arrived after close so the page is not left waiting.
fn reject(event: RendererEvent) {
    match event {
        RendererEvent::PermissionRequested { responder, .. } => {
            responder.send(PermissionGrant::Denied)
        }
        RendererEvent::GeolocationPrompt { origin, responder } => {
            responder.send(GeolocationDecision {
                origin,
                allow: false,
                retain: false,
            })
        }
        RendererEvent::ShowFileChooser { responder, .. } => responder.send(None),
        _ => {}
    }
}
