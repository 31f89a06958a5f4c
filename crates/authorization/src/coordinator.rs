use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{AuthorizationStatus, Authorizer, Completion};

/// What to do with a request that arrives while another one is still pending.
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
pub enum PendingRequestPolicy {
    /// Join the pending request and receive its result
    #[default]
    Coalesce,
    /// Issue a second request to the underlying authorizer
    Independent,
    /// Answer straight away with the current status
    Reject,
}

/// Where completion callbacks run.
#[derive(Debug, Clone, Default)]
pub enum Delivery {
    /// On the thread that finished the request. Requests answered without
    /// contacting the underlying authorizer complete on the caller's thread.
    #[default]
    Inline,
    /// Always as a task on the given runtime.
    Runtime(tokio::runtime::Handle),
}

impl Delivery {
    fn deliver(&self, completion: Completion, status: AuthorizationStatus) {
        match self {
            Self::Inline => completion.complete(status),
            Self::Runtime(handle) => {
                // If the runtime shuts down first the task is dropped along
                // with the completion, which then reports NotDetermined.
                drop(handle.spawn(async move { completion.complete(status) }));
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub pending: PendingRequestPolicy,
    pub delivery: Delivery,
    /// Answer requests for an already decided resource without asking again.
    pub skip_when_determined: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            pending: PendingRequestPolicy::default(),
            delivery: Delivery::default(),
            skip_when_determined: true,
        }
    }
}

struct Shared {
    // `Some` while a coalescable request is in flight
    waiters: Mutex<Option<Vec<Completion>>>,
    // Requests sent to the inner authorizer that haven't completed
    outstanding: AtomicUsize,
    status_tx: watch::Sender<AuthorizationStatus>,
}

impl Shared {
    fn publish(&self, status: AuthorizationStatus) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }

            *current = status;
            true
        });
    }
}

/// Applies a [`PendingRequestPolicy`] and a [`Delivery`] to another authorizer.
pub struct CoordinatedAuthorizer<A> {
    inner: A,
    config: CoordinatorConfig,
    shared: Arc<Shared>,
}

impl<A: Authorizer> CoordinatedAuthorizer<A> {
    pub fn new(inner: A, config: CoordinatorConfig) -> Self {
        let (status_tx, _) = watch::channel(inner.authorization_status());

        Self {
            inner,
            config,
            shared: Arc::new(Shared {
                waiters: Mutex::new(None),
                outstanding: AtomicUsize::new(0),
                status_tx,
            }),
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Receives the status each time a request through this coordinator
    /// changes it.
    pub fn subscribe(&self) -> watch::Receiver<AuthorizationStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn in_flight(&self) -> bool {
        self.shared.outstanding.load(Ordering::SeqCst) > 0
    }

    fn start(&self) {
        let shared = self.shared.clone();
        let delivery = self.config.delivery.clone();

        debug!("Starting authorization request");

        self.shared.outstanding.fetch_add(1, Ordering::SeqCst);
        self.inner
            .request_authorization(Completion::new(move |status| {
                shared.outstanding.fetch_sub(1, Ordering::SeqCst);
                let waiters = shared.waiters.lock().take().unwrap_or_default();
                shared.publish(status);

                info!(%status, waiters = waiters.len(), "Authorization request finished");

                for waiter in waiters {
                    delivery.deliver(waiter, status);
                }
            }));
    }

    fn forward(&self, completion: Completion) {
        let shared = self.shared.clone();
        let delivery = self.config.delivery.clone();

        debug!("Forwarding independent authorization request");

        self.shared.outstanding.fetch_add(1, Ordering::SeqCst);
        self.inner
            .request_authorization(Completion::new(move |status| {
                shared.outstanding.fetch_sub(1, Ordering::SeqCst);
                shared.publish(status);
                delivery.deliver(completion, status);
            }));
    }
}

impl<A: Authorizer> Authorizer for CoordinatedAuthorizer<A> {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.inner.authorization_status()
    }

    fn request_authorization(&self, completion: Completion) {
        let current = self.inner.authorization_status();

        if self.config.skip_when_determined && current.is_determined() {
            debug!(%current, "Authorization already determined");
            self.shared.publish(current);
            self.config.delivery.deliver(completion, current);
            return;
        }

        let mut waiters = self.shared.waiters.lock();

        match &mut *waiters {
            None => {
                *waiters = Some(vec![completion]);
                drop(waiters);
                self.start();
            }
            Some(pending) => match self.config.pending {
                PendingRequestPolicy::Coalesce => {
                    pending.push(completion);
                    debug!(waiters = pending.len(), "Joined pending authorization request");
                }
                PendingRequestPolicy::Independent => {
                    drop(waiters);
                    self.forward(completion);
                }
                PendingRequestPolicy::Reject => {
                    drop(waiters);
                    warn!(%current, "Authorization request already pending, rejecting");
                    self.config.delivery.deliver(completion, current);
                }
            },
        }
    }
}
