//! Headless collaborators.
//!
//! Nothing is rendered and nothing is launched; every call is logged. The
//! renderer keeps a simple history so back/forward behave, and records the
//! URLs it was asked to load so a driver can play the page callbacks back.

use std::sync::{Arc, Mutex};

use crate::intent::IntentSpec;

use super::{ActivityLauncher, Chrome, LaunchError, Permission, PermissionClass, PermissionSystem, Renderer};

#[derive(Default)]
pub struct HeadlessRenderer {
    requested: Arc<Mutex<Vec<String>>>,
    history: Vec<String>,
    index: usize,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared list of every URL passed to `load_url`, in order.
    pub fn requested(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.requested)
    }
}

impl Renderer for HeadlessRenderer {
    fn load_url(&mut self, url: &str, headers: &[(String, String)]) {
        log::info!("renderer: load {} ({} extra headers)", url, headers.len());
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }
        if !self.history.is_empty() {
            self.history.truncate(self.index + 1);
        }
        self.history.push(url.to_string());
        self.index = self.history.len() - 1;
    }

    fn stop_loading(&mut self) {
        log::info!("renderer: stop loading");
    }

    fn can_go_back(&self) -> bool {
        self.index > 0
    }

    fn can_go_forward(&self) -> bool {
        self.index + 1 < self.history.len()
    }

    fn go_back(&mut self) {
        if self.can_go_back() {
            self.index -= 1;
            log::info!("renderer: back to {}", self.history[self.index]);
        }
    }

    fn go_forward(&mut self) {
        if self.can_go_forward() {
            self.index += 1;
            log::info!("renderer: forward to {}", self.history[self.index]);
        }
    }

    fn evaluate_script(&mut self, script: &str) {
        log::info!("renderer: evaluate `{}`", script);
    }
}

pub struct HeadlessChrome;

impl Chrome for HeadlessChrome {
    fn set_loading_visible(&mut self, visible: bool) {
        log::debug!("chrome: loading indicator {}", if visible { "shown" } else { "hidden" });
    }

    fn set_error_visible(&mut self, visible: bool) {
        log::debug!("chrome: error display {}", if visible { "shown" } else { "hidden" });
    }

    fn set_url_text(&mut self, url: &str) {
        log::info!("chrome: url {}", url);
    }

    fn set_navigation_state(&mut self, can_go_back: bool, can_go_forward: bool) {
        log::debug!("chrome: back={} forward={}", can_go_back, can_go_forward);
    }
}

/// Declares no permissions and holds none, so prompts never happen.
pub struct HeadlessPermissions;

impl PermissionSystem for HeadlessPermissions {
    fn is_granted(&self, _permission: Permission) -> bool {
        false
    }

    fn is_declared(&self, _permission: Permission) -> bool {
        false
    }

    fn request(&mut self, permissions: &[Permission], class: PermissionClass) {
        log::warn!("permissions: cannot prompt for {:?} ({:?})", permissions, class);
    }
}

pub struct HeadlessLauncher;

impl ActivityLauncher for HeadlessLauncher {
    fn start_external(&mut self, intent: &IntentSpec) -> Result<(), LaunchError> {
        Err(LaunchError::NoHandler(describe(intent)))
    }

    fn launch_for_result(&mut self, intent: &IntentSpec) -> Result<(), LaunchError> {
        Err(LaunchError::NoHandler(describe(intent)))
    }
}

fn describe(intent: &IntentSpec) -> String {
    match &intent.data {
        Some(data) => format!("{:?} {}", intent.action, data),
        None => format!("{:?}", intent.action),
    }
}
