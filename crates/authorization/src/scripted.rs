use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{AuthorizationStatus, Authorizer, Completion};

/// How the simulated user answers a prompt.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    specta::Type,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ScriptedResponse {
    /// Allows access
    #[default]
    Grant,
    /// Refuses access
    Deny,
    /// Closes the prompt without deciding
    Dismiss,
}

impl ScriptedResponse {
    pub fn resolve(&self) -> AuthorizationStatus {
        match self {
            Self::Grant => AuthorizationStatus::Authorized,
            Self::Deny => AuthorizationStatus::Denied,
            Self::Dismiss => AuthorizationStatus::NotDetermined,
        }
    }
}

#[derive(Debug)]
struct State {
    status: AuthorizationStatus,
    response: ScriptedResponse,
}

/// In-memory permission subsystem that answers prompts with a scripted
/// response.
///
/// Like the real subsystems it only prompts while the status is
/// `NotDetermined`. Prompts resolve after `latency` on the current tokio
/// runtime, on a dedicated thread when there is no runtime, or inline when the
/// latency is zero.
#[derive(Debug, Clone)]
pub struct ScriptedAuthorizer {
    state: Arc<Mutex<State>>,
    latency: Duration,
    prompts: Arc<AtomicUsize>,
}

impl ScriptedAuthorizer {
    pub fn new(status: AuthorizationStatus, response: ScriptedResponse) -> Self {
        Self {
            state: Arc::new(Mutex::new(State { status, response })),
            latency: Duration::ZERO,
            prompts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Changes the status from outside, like a user toggling the permission
    /// in System Settings.
    pub fn set_status(&self, status: AuthorizationStatus) {
        debug!(%status, "Authorization status changed externally");
        self.state.lock().status = status;
    }

    pub fn set_response(&self, response: ScriptedResponse) {
        self.state.lock().response = response;
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl Authorizer for ScriptedAuthorizer {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.state.lock().status
    }

    fn request_authorization(&self, completion: Completion) {
        let current = self.authorization_status();
        if current.is_determined() {
            completion.complete(current);
            return;
        }

        let prompt = self.prompts.fetch_add(1, Ordering::SeqCst) + 1;
        info!(prompt, latency = ?self.latency, "Prompting for authorization");

        let state = self.state.clone();
        let answer = move || {
            let status = {
                let mut state = state.lock();
                let decided = state.response.resolve();
                if decided.is_determined() {
                    state.status = decided;
                }
                state.status
            };

            debug!(%status, "Prompt answered");
            completion.complete(status);
        };

        let latency = self.latency;
        if latency.is_zero() {
            answer();
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => drop(handle.spawn(async move {
                tokio::time::sleep(latency).await;
                answer();
            })),
            Err(_) => drop(std::thread::spawn(move || {
                std::thread::sleep(latency);
                answer();
            })),
        }
    }
}

/// Authorizer for resources that need no permission on this platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl Authorizer for Unrestricted {
    fn authorization_status(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    fn request_authorization(&self, completion: Completion) {
        completion.complete(AuthorizationStatus::Authorized)
    }
}
