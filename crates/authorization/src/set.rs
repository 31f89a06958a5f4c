use std::{collections::BTreeMap, sync::Arc};

use tracing::info;

use crate::{AuthorizationError, AuthorizationStatus, Authorizer, AuthorizerExt};

/// Authorizers for several resources, keyed by name.
#[derive(Default, Clone)]
pub struct AuthorizerSet {
    authorizers: BTreeMap<String, Arc<dyn Authorizer>>,
}

impl AuthorizerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, authorizer: impl Authorizer + 'static) {
        self.authorizers.insert(name.into(), Arc::new(authorizer));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Authorizer>> {
        self.authorizers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.authorizers.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.authorizers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.authorizers.len()
    }

    pub fn check(&self) -> BTreeMap<String, AuthorizationStatus> {
        self.authorizers
            .iter()
            .map(|(name, authorizer)| (name.clone(), authorizer.authorization_status()))
            .collect()
    }

    pub fn all_authorized(&self) -> bool {
        self.authorizers
            .values()
            .all(|authorizer| authorizer.authorization_status().is_authorized())
    }

    pub async fn request(&self, name: &str) -> Result<AuthorizationStatus, AuthorizationError> {
        let authorizer = self
            .get(name)
            .ok_or_else(|| AuthorizationError::UnknownResource(name.to_string()))?;

        authorizer.request().await
    }

    /// Requests every resource that isn't authorized yet, one at a time so
    /// only one prompt is visible at once.
    pub async fn request_missing(
        &self,
    ) -> Result<BTreeMap<String, AuthorizationStatus>, AuthorizationError> {
        for (name, authorizer) in &self.authorizers {
            if authorizer.authorization_status().is_authorized() {
                continue;
            }

            let status = authorizer.request().await?;
            info!(resource = %name, %status, "Requested authorization");
        }

        Ok(self.check())
    }
}

impl std::fmt::Debug for AuthorizerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.check()).finish()
    }
}
