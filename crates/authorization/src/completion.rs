use futures::channel::oneshot;
use tracing::warn;

use crate::AuthorizationStatus;

type Callback = Box<dyn FnOnce(AuthorizationStatus) + Send + 'static>;

/// Single-shot handle to the callback of an authorization request.
///
/// [`Completion::complete`] consumes the handle, so a callback can't be
/// invoked twice. A handle dropped before completing delivers
/// [`AuthorizationStatus::NotDetermined`] instead, so the callback always
/// fires exactly once.
pub struct Completion {
    callback: Option<Callback>,
}

impl Completion {
    pub fn new(f: impl FnOnce(AuthorizationStatus) + Send + 'static) -> Self {
        Self {
            callback: Some(Box::new(f)),
        }
    }

    /// A completion that forwards its status into a oneshot channel.
    pub fn channel() -> (Self, oneshot::Receiver<AuthorizationStatus>) {
        let (tx, rx) = oneshot::channel();

        (
            Self::new(move |status| {
                let _ = tx.send(status);
            }),
            rx,
        )
    }

    pub fn complete(mut self, status: AuthorizationStatus) {
        if let Some(callback) = self.callback.take() {
            callback(status);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            warn!("Authorization completion dropped without a result, delivering NotDetermined");
            callback(AuthorizationStatus::NotDetermined);
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use parking_lot::Mutex;

    use super::*;

    fn recorder() -> (Completion, Arc<Mutex<Vec<AuthorizationStatus>>>) {
        let calls = Arc::new(Mutex::new(vec![]));
        let completion = Completion::new({
            let calls = calls.clone();
            move |status| calls.lock().push(status)
        });

        (completion, calls)
    }

    #[test]
    fn complete_fires_once() {
        let (completion, calls) = recorder();

        completion.complete(AuthorizationStatus::Authorized);

        assert_eq!(*calls.lock(), vec![AuthorizationStatus::Authorized]);
    }

    #[test]
    fn drop_delivers_not_determined() {
        let (completion, calls) = recorder();

        drop(completion);

        assert_eq!(*calls.lock(), vec![AuthorizationStatus::NotDetermined]);
    }

    #[test]
    fn complete_does_not_refire_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let completion = Completion::new({
            let count = count.clone();
            move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });

        completion.complete(AuthorizationStatus::Denied);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn channel_receives_status() {
        let (completion, rx) = Completion::channel();

        std::thread::spawn(move || completion.complete(AuthorizationStatus::Denied));

        assert_eq!(rx.await.unwrap(), AuthorizationStatus::Denied);
    }
}
