//! File chooser arbitration.
//!
//! A page's `<input type=file>` becomes either a capture-only launch
//! (camera / camcorder) or a generic content picker with capture apps offered
//! as alternates. Capture needs the camera permission when the host declares
//! it; in that case the launch is deferred behind one camera prompt. Each
//! chooser request is answered exactly once.

use std::path::{Path, PathBuf};

use crate::intent::{IntentAction, IntentSpec};
use crate::permission::{CameraGate, CameraOutcome, PermissionBroker};
use crate::platform::{
    ActivityLauncher, FileSelection, PermissionSystem, Responder, ScratchStorage,
};

/// Result payload of the chooser activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChooserResult {
    pub ok: bool,
    /// URIs carried in the result data (gallery / file manager picks, and
    /// video captures on some devices).
    pub data: Vec<String>,
}

impl ChooserResult {
    pub fn cancelled() -> Self {
        Self::default()
    }

    pub fn picked(uris: Vec<String>) -> Self {
        Self { ok: true, data: uris }
    }

    /// Capture finished; the output went to the stashed scratch file.
    pub fn captured() -> Self {
        Self {
            ok: true,
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct CaptureArtifacts {
    photo: Option<(PathBuf, String)>,
    video: Option<(PathBuf, String)>,
}

impl CaptureArtifacts {
    fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.photo.iter().chain(self.video.iter()).map(|(path, _)| path)
    }
}

struct FileChooserRequest {
    accept_types: Vec<String>,
    capture_enabled: bool,
    callback: Responder<FileSelection>,
    artifacts: CaptureArtifacts,
}

impl FileChooserRequest {
    fn accept_text(&self) -> String {
        self.accept_types
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn wants_photo(&self) -> bool {
        let text = self.accept_text();
        text.is_empty() || text.contains("image")
    }

    fn wants_video(&self) -> bool {
        let text = self.accept_text();
        text.is_empty() || text.contains("video")
    }

    /// MIME filter for the generic picker.
    fn content_mime(&self) -> &'static str {
        let text = self.accept_text();
        match (text.contains("image"), text.contains("video")) {
            (true, false) => "image/*",
            (false, true) => "video/*",
            _ => "*/*",
        }
    }
}

/// Host collaborators a chooser operation needs.
pub struct ChooserContext<'a> {
    pub os: &'a mut dyn PermissionSystem,
    pub launcher: &'a mut dyn ActivityLauncher,
    pub storage: &'a dyn ScratchStorage,
}

#[derive(Default)]
pub struct FileChooserCoordinator {
    pending: Option<FileChooserRequest>,
}

impl FileChooserCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a chooser for the page. Returns false when the request was
    /// answered with no selection straight away.
    pub fn open(
        &mut self,
        accept_types: Vec<String>,
        capture_enabled: bool,
        responder: Responder<FileSelection>,
        broker: &mut PermissionBroker,
        ctx: ChooserContext<'_>,
    ) -> bool {
        if self.pending.is_some() {
            log::warn!("File chooser already open; rejecting new request");
            responder.send(None);
            return false;
        }

        self.pending = Some(FileChooserRequest {
            accept_types,
            capture_enabled,
            callback: responder,
            artifacts: CaptureArtifacts::default(),
        });

        if CameraGate::check(&*ctx.os) == CameraGate::NeedsPrompt {
            if broker.request_camera(ctx.os) {
                log::debug!("File chooser waiting for camera permission");
                return true;
            }
            self.cancel();
            return false;
        }

        self.launch(ctx)
    }

    /// Continue a chooser deferred behind the camera prompt.
    pub fn on_camera_outcome(&mut self, outcome: CameraOutcome, ctx: ChooserContext<'_>) {
        if self.pending.is_none() {
            log::warn!("Camera permission answered with no chooser waiting");
            return;
        }
        match outcome {
            CameraOutcome::Retry => {
                self.launch(ctx);
            }
            CameraOutcome::Cancel => self.cancel(),
        }
    }

    /// Deliver the chooser activity's result to the page.
    pub fn on_result(&mut self, result: ChooserResult) {
        let Some(request) = self.pending.as_ref() else {
            log::error!("File chooser result with no pending request");
            return;
        };

        let non_empty = |entry: &Option<(PathBuf, String)>| {
            entry.as_ref().and_then(|(path, uri)| {
                let len = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                (len > 0).then(|| uri.clone())
            })
        };

        let selection = if !result.ok {
            None
        } else if !result.data.is_empty() {
            Some(result.data)
        } else if let Some(uri) = non_empty(&request.artifacts.photo) {
            Some(vec![uri])
        } else {
            non_empty(&request.artifacts.video).map(|uri| vec![uri])
        };

        self.resolve(selection);
    }

    /// Answer the pending request with no selection.
    pub fn cancel(&mut self) {
        self.resolve(None);
    }

    fn launch(&mut self, ctx: ChooserContext<'_>) -> bool {
        let ChooserContext {
            os,
            launcher,
            storage,
        } = ctx;
        let Some(request) = self.pending.as_mut() else {
            return false;
        };

        let capture_allowed = CameraGate::check(&*os).allows_capture();
        let mut captures = Vec::new();
        if capture_allowed {
            match build_capture_intents(request, storage) {
                Ok(intents) => captures = intents,
                Err(e) => {
                    log::warn!("Cannot prepare capture scratch file: {}", e);
                    self.cancel();
                    return false;
                }
            }
        }

        let intent = if request.capture_enabled {
            if !capture_allowed {
                log::debug!("Capture-only chooser without camera permission");
                self.cancel();
                return false;
            }
            let mut captures = captures.into_iter();
            match (captures.next(), captures.len()) {
                (Some(only), 0) => only,
                (Some(first), _) => IntentSpec::chooser(first, captures.collect()),
                (None, _) => {
                    log::debug!("No capture app matches {:?}", request.accept_types);
                    self.cancel();
                    return false;
                }
            }
        } else {
            IntentSpec::chooser(IntentSpec::get_content(request.content_mime()), captures)
        };

        match launcher.launch_for_result(&intent) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Error launching file chooser: {}", e);
                self.cancel();
                false
            }
        }
    }

    fn resolve(&mut self, selection: FileSelection) {
        debug_assert!(self.pending.is_some(), "file chooser resolved twice");
        let Some(request) = self.pending.take() else {
            log::error!("File chooser resolved twice");
            return;
        };

        for path in request.artifacts.files() {
            discard_if_empty(path);
        }
        log::debug!("File chooser resolved with {:?}", selection);
        request.callback.send(selection);
    }
}

fn build_capture_intents(
    request: &mut FileChooserRequest,
    storage: &dyn ScratchStorage,
) -> std::io::Result<Vec<IntentSpec>> {
    let mut intents = Vec::new();

    if request.wants_photo() {
        let file = storage.create_unique_file("IMG_", ".jpg")?;
        let uri = storage.content_uri_for(&file);
        intents.push(IntentSpec::capture(IntentAction::ImageCapture, uri.clone()));
        request.artifacts.photo = Some((file, uri));
    }
    if request.wants_video() {
        let file = storage.create_unique_file("VID_", ".mp4")?;
        let uri = storage.content_uri_for(&file);
        intents.push(IntentSpec::capture(IntentAction::VideoCapture, uri.clone()));
        request.artifacts.video = Some((file, uri));
    }

    Ok(intents)
}

fn discard_if_empty(path: &Path) {
    let empty = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(false);
    if empty {
        if let Err(e) = std::fs::remove_file(path) {
            log::debug!("Could not remove unused scratch file {}: {}", path.display(), e);
        }
    }
}
