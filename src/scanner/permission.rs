// SPDX-License-Identifier: GPL-3.0-only

//! Camera permission gate
//!
//! Reads the camera authorization state once per scan attempt and routes the
//! attempt to the source selector, to the denial notice, or nowhere.

use std::sync::Arc;
use tracing::{debug, info, warn};

/// Camera authorization as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
    Authorized,
    /// The user has not been asked yet; a request will prompt
    NotDetermined,
    Denied,
    /// Blocked by policy; the user cannot grant it
    Restricted,
    Unknown,
}

/// Continuation for an access request; `true` means granted
pub type AccessReply = Box<dyn FnOnce(bool) + Send>;

/// Platform permission API
pub trait CameraAuthority: Send + Sync {
    /// Current authorization state (no prompt)
    fn authorization_status(&self) -> AuthorizationState;

    /// Prompt for access; `reply` is invoked exactly once, possibly from another thread
    fn request_access(&self, reply: AccessReply);

    /// Open the system privacy settings
    fn open_settings(&self) -> Result<(), String>;
}

/// Where a scan attempt goes after the permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Show the source selector
    Proceed,
    /// Show the denial notice with the settings link
    DenialNotice,
    /// Unrecognised status: logged, nothing shown
    Ignored,
}

pub struct PermissionGate {
    authority: Arc<dyn CameraAuthority>,
}

impl PermissionGate {
    pub fn new(authority: Arc<dyn CameraAuthority>) -> Self {
        Self { authority }
    }

    /// Decide the attempt's route; `deliver` is called exactly once
    ///
    /// Only `NotDetermined` prompts. `deliver` may run on the caller's thread
    /// (settled states) or on the authority's thread (after a prompt).
    pub fn request_camera_access<F>(&self, deliver: F)
    where
        F: FnOnce(GateOutcome) + Send + 'static,
    {
        let state = self.authority.authorization_status();
        debug!(?state, "Camera authorization status");

        match state {
            AuthorizationState::Authorized => deliver(GateOutcome::Proceed),
            AuthorizationState::NotDetermined => {
                info!("Requesting camera access");
                self.authority.request_access(Box::new(move |granted| {
                    info!(granted, "Camera access request answered");
                    deliver(if granted {
                        GateOutcome::Proceed
                    } else {
                        GateOutcome::DenialNotice
                    });
                }));
            }
            AuthorizationState::Denied | AuthorizationState::Restricted => {
                deliver(GateOutcome::DenialNotice)
            }
            AuthorizationState::Unknown => {
                warn!("Unknown camera authorization status, ignoring scan request");
                deliver(GateOutcome::Ignored);
            }
        }
    }

    /// Follow the denial notice's settings link
    pub fn open_settings(&self) {
        if let Err(e) = self.authority.open_settings() {
            warn!(error = %e, "Failed to open privacy settings");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedAuthority {
        state: AuthorizationState,
        grant: bool,
        prompts: AtomicUsize,
    }

    impl FixedAuthority {
        fn new(state: AuthorizationState, grant: bool) -> Arc<Self> {
            Arc::new(Self {
                state,
                grant,
                prompts: AtomicUsize::new(0),
            })
        }
    }

    impl CameraAuthority for FixedAuthority {
        fn authorization_status(&self) -> AuthorizationState {
            self.state
        }

        fn request_access(&self, reply: AccessReply) {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            reply(self.grant);
        }

        fn open_settings(&self) -> Result<(), String> {
            Ok(())
        }
    }

    fn outcomes_for(authority: Arc<FixedAuthority>) -> Vec<GateOutcome> {
        let gate = PermissionGate::new(authority);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        gate.request_camera_access(move |outcome| sink.lock().unwrap().push(outcome));
        let outcomes = seen.lock().unwrap().clone();
        outcomes
    }

    #[test]
    fn test_every_state_reaches_exactly_one_outcome() {
        let cases = [
            (AuthorizationState::Authorized, true, GateOutcome::Proceed),
            (AuthorizationState::NotDetermined, true, GateOutcome::Proceed),
            (AuthorizationState::NotDetermined, false, GateOutcome::DenialNotice),
            (AuthorizationState::Denied, true, GateOutcome::DenialNotice),
            (AuthorizationState::Restricted, true, GateOutcome::DenialNotice),
            (AuthorizationState::Unknown, true, GateOutcome::Ignored),
        ];

        for (state, grant, expected) in cases {
            let outcomes = outcomes_for(FixedAuthority::new(state, grant));
            assert_eq!(outcomes, vec![expected], "state {:?}, grant {}", state, grant);
        }
    }

    #[test]
    fn test_only_not_determined_prompts() {
        for state in [
            AuthorizationState::Authorized,
            AuthorizationState::Denied,
            AuthorizationState::Restricted,
            AuthorizationState::Unknown,
        ] {
            let authority = FixedAuthority::new(state, true);
            outcomes_for(authority.clone());
            assert_eq!(authority.prompts.load(Ordering::SeqCst), 0, "{:?}", state);
        }

        let authority = FixedAuthority::new(AuthorizationState::NotDetermined, true);
        outcomes_for(authority.clone());
        assert_eq!(authority.prompts.load(Ordering::SeqCst), 1);
    }
}
