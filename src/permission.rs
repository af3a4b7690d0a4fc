//! OS permission arbitration for renderer requests.
//!
//! Three independent classes (standard media capture, geolocation, camera
//! for file capture) each run `Idle -> Pending -> Idle`. The broker never
//! caches grants: the OS is asked every time, except that one geolocation
//! denial is remembered for the rest of the session.

use crate::platform::{
    GeolocationDecision, Permission, PermissionClass, PermissionGrant, PermissionSystem,
    ResourceKind, Responder,
};

const LOCATION_ALTERNATIVES: [Permission; 2] = [Permission::FineLocation, Permission::CoarseLocation];

/// OS permissions needed to satisfy one renderer resource.
pub fn required_permissions(resource: &ResourceKind) -> &'static [Permission] {
    match resource {
        ResourceKind::VideoCapture => &[Permission::Camera],
        ResourceKind::AudioCapture => &[Permission::RecordAudio, Permission::ModifyAudioSettings],
        ResourceKind::ProtectedMediaId | ResourceKind::MidiSysex => &[],
    }
}

/// Camera precondition for file-chooser capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraGate {
    /// The host never declares the camera permission; capture needs no prompt.
    NotRequired,
    Granted,
    /// Declared but not granted: a prompt is needed before capture.
    NeedsPrompt,
}

impl CameraGate {
    pub fn check(os: &dyn PermissionSystem) -> Self {
        if !os.is_declared(Permission::Camera) {
            CameraGate::NotRequired
        } else if os.is_granted(Permission::Camera) {
            CameraGate::Granted
        } else {
            CameraGate::NeedsPrompt
        }
    }

    pub fn allows_capture(self) -> bool {
        !matches!(self, CameraGate::NeedsPrompt)
    }
}

/// What the file chooser should do once the camera prompt is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraOutcome {
    Retry,
    Cancel,
}

struct PendingStandard {
    resources: Vec<ResourceKind>,
    requested: Vec<Permission>,
    responder: Responder<PermissionGrant>,
}

struct PendingGeolocation {
    origin: String,
    responder: Responder<GeolocationDecision>,
}

#[derive(Default)]
pub struct PermissionBroker {
    standard: Option<PendingStandard>,
    geolocation: Option<PendingGeolocation>,
    camera_pending: bool,
    geolocation_denied: bool,
}

impl PermissionBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self, class: PermissionClass) -> bool {
        match class {
            PermissionClass::Standard => self.standard.is_some(),
            PermissionClass::Geolocation => self.geolocation.is_some(),
            PermissionClass::Camera => self.camera_pending,
        }
    }

    /// Sticky for the whole session once set.
    pub fn was_geolocation_denied(&self) -> bool {
        self.geolocation_denied
    }

    pub fn request_standard(
        &mut self,
        resources: Vec<ResourceKind>,
        responder: Responder<PermissionGrant>,
        os: &mut dyn PermissionSystem,
    ) {
        if self.standard.is_some() {
            log::warn!("Permission request while another is pending; denying {:?}", resources);
            responder.send(PermissionGrant::Denied);
            return;
        }

        let mut missing: Vec<Permission> = Vec::new();
        for permission in resources.iter().flat_map(required_permissions) {
            if !os.is_granted(*permission) && !missing.contains(permission) {
                missing.push(*permission);
            }
        }

        if missing.is_empty() {
            responder.send(PermissionGrant::Granted(resources));
            return;
        }

        log::debug!("Requesting {:?} for {:?}", missing, resources);
        os.request(&missing, PermissionClass::Standard);
        self.standard = Some(PendingStandard {
            resources,
            requested: missing,
            responder,
        });
    }

    pub fn request_geolocation(
        &mut self,
        origin: String,
        responder: Responder<GeolocationDecision>,
        os: &mut dyn PermissionSystem,
    ) {
        if self.geolocation_denied {
            responder.send(decision(origin, false));
            return;
        }
        if self.geolocation.is_some() {
            log::warn!("Geolocation prompt while another is pending; denying {}", origin);
            responder.send(decision(origin, false));
            return;
        }
        if LOCATION_ALTERNATIVES.iter().any(|p| os.is_granted(*p)) {
            responder.send(decision(origin, true));
            return;
        }

        os.request(&LOCATION_ALTERNATIVES, PermissionClass::Geolocation);
        self.geolocation = Some(PendingGeolocation { origin, responder });
    }

    /// Prompt for the camera on behalf of the file chooser. Returns false
    /// when a camera prompt is already outstanding.
    pub fn request_camera(&mut self, os: &mut dyn PermissionSystem) -> bool {
        if self.camera_pending {
            return false;
        }
        os.request(&[Permission::Camera], PermissionClass::Camera);
        self.camera_pending = true;
        true
    }

    /// Apply the OS answer for `class`. Only the camera class produces an
    /// outcome, which the file chooser must act on.
    pub fn on_result(
        &mut self,
        class: PermissionClass,
        results: &[(Permission, bool)],
    ) -> Option<CameraOutcome> {
        let granted = |p: &Permission| results.iter().any(|(q, ok)| q == p && *ok);

        match class {
            PermissionClass::Standard => {
                let Some(pending) = self.standard.take() else {
                    log::warn!("Standard permission result with no pending request");
                    return None;
                };
                if pending.requested.iter().all(granted) {
                    pending.responder.send(PermissionGrant::Granted(pending.resources));
                } else {
                    pending.responder.send(PermissionGrant::Denied);
                }
                None
            }
            PermissionClass::Geolocation => {
                let Some(pending) = self.geolocation.take() else {
                    log::warn!("Geolocation result with no pending prompt");
                    return None;
                };
                let allow = LOCATION_ALTERNATIVES.iter().any(granted);
                if !allow {
                    self.geolocation_denied = true;
                }
                pending.responder.send(decision(pending.origin, allow));
                None
            }
            PermissionClass::Camera => {
                if !self.camera_pending {
                    log::warn!("Camera permission result with no pending prompt");
                    return None;
                }
                self.camera_pending = false;
                if granted(&Permission::Camera) {
                    Some(CameraOutcome::Retry)
                } else {
                    Some(CameraOutcome::Cancel)
                }
            }
        }
    }
}

fn decision(origin: String, allow: bool) -> GeolocationDecision {
    GeolocationDecision {
        origin,
        allow,
        retain: false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    pub(crate) struct FakeOs {
        pub granted: HashSet<Permission>,
        pub declared: HashSet<Permission>,
        pub prompts: Vec<(Vec<Permission>, PermissionClass)>,
    }

    impl PermissionSystem for FakeOs {
        fn is_granted(&self, permission: Permission) -> bool {
            self.granted.contains(&permission)
        }

        fn is_declared(&self, permission: Permission) -> bool {
            self.declared.contains(&permission)
        }

        fn request(&mut self, permissions: &[Permission], class: PermissionClass) {
            self.prompts.push((permissions.to_vec(), class));
        }
    }

    pub(crate) fn capture<T: Send + 'static>() -> (Responder<T>, Arc<Mutex<Vec<T>>>) {
        let slot = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&slot);
        (Responder::new(move |v| sink.lock().unwrap().push(v)), slot)
    }

    #[test]
    fn already_granted_resources_resolve_without_prompt() {
        let mut os = FakeOs::default();
        os.granted.insert(Permission::Camera);
        let mut broker = PermissionBroker::new();
        let (responder, got) = capture();

        broker.request_standard(vec![ResourceKind::VideoCapture], responder, &mut os);

        assert!(os.prompts.is_empty());
        assert_eq!(
            *got.lock().unwrap(),
            vec![PermissionGrant::Granted(vec![ResourceKind::VideoCapture])]
        );
        assert!(!broker.is_pending(PermissionClass::Standard));
    }

    #[test]
    fn prompts_once_for_union_of_missing_permissions() {
        let mut os = FakeOs::default();
        os.granted.insert(Permission::ModifyAudioSettings);
        let mut broker = PermissionBroker::new();
        let (responder, got) = capture();

        broker.request_standard(
            vec![ResourceKind::VideoCapture, ResourceKind::AudioCapture],
            responder,
            &mut os,
        );

        assert_eq!(os.prompts.len(), 1);
        assert_eq!(
            os.prompts[0].0,
            vec![Permission::Camera, Permission::RecordAudio]
        );
        assert!(broker.is_pending(PermissionClass::Standard));
        assert!(got.lock().unwrap().is_empty());

        broker.on_result(
            PermissionClass::Standard,
            &[(Permission::Camera, true), (Permission::RecordAudio, true)],
        );
        assert_eq!(
            *got.lock().unwrap(),
            vec![PermissionGrant::Granted(vec![
                ResourceKind::VideoCapture,
                ResourceKind::AudioCapture
            ])]
        );
        assert!(!broker.is_pending(PermissionClass::Standard));
    }

    #[test]
    fn partial_grant_denies_everything() {
        let mut os = FakeOs::default();
        let mut broker = PermissionBroker::new();
        let (responder, got) = capture();

        broker.request_standard(
            vec![ResourceKind::VideoCapture, ResourceKind::AudioCapture],
            responder,
            &mut os,
        );
        broker.on_result(
            PermissionClass::Standard,
            &[
                (Permission::Camera, true),
                (Permission::RecordAudio, false),
                (Permission::ModifyAudioSettings, true),
            ],
        );
        assert_eq!(*got.lock().unwrap(), vec![PermissionGrant::Denied]);
    }

    #[test]
    fn dismissed_prompt_denies() {
        let mut os = FakeOs::default();
        let mut broker = PermissionBroker::new();
        let (responder, got) = capture();
        broker.request_standard(vec![ResourceKind::VideoCapture], responder, &mut os);
        broker.on_result(PermissionClass::Standard, &[]);
        assert_eq!(*got.lock().unwrap(), vec![PermissionGrant::Denied]);
    }

    #[test]
    fn second_standard_request_while_pending_is_denied() {
        let mut os = FakeOs::default();
        let mut broker = PermissionBroker::new();
        let (first, _) = capture();
        let (second, got) = capture();

        broker.request_standard(vec![ResourceKind::VideoCapture], first, &mut os);
        broker.request_standard(vec![ResourceKind::AudioCapture], second, &mut os);

        assert_eq!(os.prompts.len(), 1);
        assert_eq!(*got.lock().unwrap(), vec![PermissionGrant::Denied]);
    }

    #[test]
    fn geolocation_granted_if_any_alternative_held() {
        let mut os = FakeOs::default();
        os.granted.insert(Permission::CoarseLocation);
        let mut broker = PermissionBroker::new();
        let (responder, got) = capture();

        broker.request_geolocation("https://a.example".into(), responder, &mut os);

        assert!(os.prompts.is_empty());
        assert!(got.lock().unwrap()[0].allow);
    }

    #[test]
    fn geolocation_one_alternative_is_enough() {
        let mut os = FakeOs::default();
        let mut broker = PermissionBroker::new();
        let (responder, got) = capture();

        broker.request_geolocation("https://a.example".into(), responder, &mut os);
        assert_eq!(
            os.prompts[0].0,
            vec![Permission::FineLocation, Permission::CoarseLocation]
        );
        broker.on_result(
            PermissionClass::Geolocation,
            &[(Permission::FineLocation, false), (Permission::CoarseLocation, true)],
        );

        let decisions = got.lock().unwrap();
        assert!(decisions[0].allow);
        assert_eq!(decisions[0].origin, "https://a.example");
        assert!(!broker.was_geolocation_denied());
    }

    #[test]
    fn geolocation_denial_is_sticky() {
        let mut os = FakeOs::default();
        let mut broker = PermissionBroker::new();
        let (first, got_first) = capture();

        broker.request_geolocation("https://a.example".into(), first, &mut os);
        broker.on_result(
            PermissionClass::Geolocation,
            &[(Permission::FineLocation, false), (Permission::CoarseLocation, false)],
        );
        assert!(!got_first.lock().unwrap()[0].allow);
        assert!(broker.was_geolocation_denied());

        // Even if the user later grants it in system settings.
        os.granted.insert(Permission::FineLocation);
        let (second, got_second) = capture();
        broker.request_geolocation("https://a.example".into(), second, &mut os);

        assert_eq!(os.prompts.len(), 1);
        assert!(!got_second.lock().unwrap()[0].allow);
    }

    #[test]
    fn camera_gate_follows_declaration() {
        let mut os = FakeOs::default();
        assert_eq!(CameraGate::check(&os), CameraGate::NotRequired);
        os.declared.insert(Permission::Camera);
        assert_eq!(CameraGate::check(&os), CameraGate::NeedsPrompt);
        assert!(!CameraGate::check(&os).allows_capture());
        os.granted.insert(Permission::Camera);
        assert_eq!(CameraGate::check(&os), CameraGate::Granted);
    }

    #[test]
    fn camera_prompt_resolves_to_retry_or_cancel() {
        let mut os = FakeOs::default();
        let mut broker = PermissionBroker::new();

        assert!(broker.request_camera(&mut os));
        assert!(!broker.request_camera(&mut os));
        assert_eq!(os.prompts.len(), 1);
        assert_eq!(
            broker.on_result(PermissionClass::Camera, &[(Permission::Camera, true)]),
            Some(CameraOutcome::Retry)
        );

        assert!(broker.request_camera(&mut os));
        assert_eq!(
            broker.on_result(PermissionClass::Camera, &[(Permission::Camera, false)]),
            Some(CameraOutcome::Cancel)
        );
        assert_eq!(broker.on_result(PermissionClass::Camera, &[]), None);
    }
}
