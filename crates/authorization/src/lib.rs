//! Permkit Authorization: reporting and requesting the authorization status of
//! a protected resource such as the camera, microphone or accessibility APIs.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::{FutureExt, channel::oneshot};

mod completion;
mod coordinator;
mod scripted;
mod set;
mod status;

pub use completion::Completion;
pub use coordinator::{CoordinatedAuthorizer, CoordinatorConfig, Delivery, PendingRequestPolicy};
pub use scripted::{ScriptedAuthorizer, ScriptedResponse, Unrestricted};
pub use set::AuthorizerSet;
pub use status::AuthorizationStatus;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Unknown authorization status value {0}")]
    UnknownStatus(u64),
    #[error("Authorization completion dropped before delivering a status")]
    CompletionDropped,
    #[error("Unknown resource '{0}'")]
    UnknownResource(String),
}

/// Reports and requests authorization for a protected resource.
pub trait Authorizer: Send + Sync {
    /// Current permission state. Never prompts and never blocks on the user.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask for access, which may prompt the user.
    ///
    /// `completion` fires exactly once with the resulting status. Unless the
    /// implementation says otherwise it fires on whichever thread finished
    /// the request.
    fn request_authorization(&self, completion: Completion);
}

impl<A: Authorizer + ?Sized> Authorizer for Arc<A> {
    fn authorization_status(&self) -> AuthorizationStatus {
        (**self).authorization_status()
    }

    fn request_authorization(&self, completion: Completion) {
        (**self).request_authorization(completion)
    }
}

impl<A: Authorizer + ?Sized> Authorizer for Box<A> {
    fn authorization_status(&self) -> AuthorizationStatus {
        (**self).authorization_status()
    }

    fn request_authorization(&self, completion: Completion) {
        (**self).request_authorization(completion)
    }
}

impl<A: Authorizer + ?Sized> Authorizer for &A {
    fn authorization_status(&self) -> AuthorizationStatus {
        (**self).authorization_status()
    }

    fn request_authorization(&self, completion: Completion) {
        (**self).request_authorization(completion)
    }
}

pub trait AuthorizerExt: Authorizer {
    /// Issues the request immediately and resolves once its completion fires.
    fn request(&self) -> AuthorizationRequest {
        let (completion, rx) = Completion::channel();
        self.request_authorization(completion);
        AuthorizationRequest { rx }
    }

    fn request_with(&self, f: impl FnOnce(AuthorizationStatus) + Send + 'static) {
        self.request_authorization(Completion::new(f))
    }
}

impl<A: Authorizer + ?Sized> AuthorizerExt for A {}

/// Future returned by [`AuthorizerExt::request`].
#[must_use = "the request has been issued, but its status is only observed by awaiting this"]
pub struct AuthorizationRequest {
    rx: oneshot::Receiver<AuthorizationStatus>,
}

impl Future for AuthorizationRequest {
    type Output = Result<AuthorizationStatus, AuthorizationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx
            .poll_unpin(cx)
            .map(|result| result.map_err(|_| AuthorizationError::CompletionDropped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(AuthorizationStatus);

    impl Authorizer for Fixed {
        fn authorization_status(&self) -> AuthorizationStatus {
            self.0
        }

        fn request_authorization(&self, completion: Completion) {
            completion.complete(self.0)
        }
    }

    struct Forgetful;

    impl Authorizer for Forgetful {
        fn authorization_status(&self) -> AuthorizationStatus {
            AuthorizationStatus::NotDetermined
        }

        fn request_authorization(&self, completion: Completion) {
            drop(completion)
        }
    }

    #[tokio::test]
    async fn request_through_trait_object() {
        let authorizer: Arc<dyn Authorizer> = Arc::new(Fixed(AuthorizationStatus::Denied));

        assert_eq!(authorizer.request().await, Ok(AuthorizationStatus::Denied));
        assert_eq!(
            Box::new(Fixed(AuthorizationStatus::Authorized))
                .request()
                .await,
            Ok(AuthorizationStatus::Authorized)
        );
    }

    #[tokio::test]
    async fn dropped_completion_still_resolves() {
        assert_eq!(
            Forgetful.request().await,
            Ok(AuthorizationStatus::NotDetermined)
        );
    }
}
