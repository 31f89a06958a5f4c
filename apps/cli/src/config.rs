use std::{collections::BTreeSet, path::Path, time::Duration};

use anyhow::{Context, Result, bail};
use permkit_authorization::{
    AuthorizationStatus, AuthorizerSet, CoordinatedAuthorizer, CoordinatorConfig, Delivery,
    PendingRequestPolicy, ScriptedAuthorizer, ScriptedResponse,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default = "default_resources")]
    pub resources: Vec<ResourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub pending: PendingRequestPolicy,
    #[serde(default)]
    pub delivery: DeliveryMode,
    #[serde(default = "default_skip_when_determined")]
    pub skip_when_determined: bool,
}

fn default_skip_when_determined() -> bool {
    true
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            pending: PendingRequestPolicy::default(),
            delivery: DeliveryMode::default(),
            skip_when_determined: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryMode {
    #[default]
    Inline,
    Runtime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    #[serde(default)]
    pub initial: AuthorizationStatus,
    #[serde(default)]
    pub response: ScriptedResponse,
    #[serde(default = "default_latency")]
    pub latency_ms: u64,
}

fn default_latency() -> u64 {
    250
}

impl ResourceConfig {
    pub fn new(name: &str, initial: AuthorizationStatus, response: ScriptedResponse) -> Self {
        Self {
            name: name.to_string(),
            initial,
            response,
            latency_ms: default_latency(),
        }
    }
}

fn default_resources() -> Vec<ResourceConfig> {
    vec![
        ResourceConfig::new(
            "screenRecording",
            AuthorizationStatus::NotDetermined,
            ScriptedResponse::Grant,
        ),
        ResourceConfig::new(
            "camera",
            AuthorizationStatus::NotDetermined,
            ScriptedResponse::Grant,
        ),
        ResourceConfig::new(
            "microphone",
            AuthorizationStatus::NotDetermined,
            ScriptedResponse::Deny,
        ),
        ResourceConfig::new(
            "accessibility",
            AuthorizationStatus::Denied,
            ScriptedResponse::Grant,
        ),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request: RequestConfig::default(),
            resources: default_resources(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();

        for resource in &self.resources {
            if resource.name.is_empty() {
                bail!("Resource names must not be empty");
            }

            if !seen.insert(resource.name.as_str()) {
                bail!("Duplicate resource '{}'", resource.name);
            }
        }

        Ok(())
    }

    pub fn coordinator_config(&self) -> Result<CoordinatorConfig> {
        let delivery = match self.request.delivery {
            DeliveryMode::Inline => Delivery::Inline,
            DeliveryMode::Runtime => Delivery::Runtime(
                tokio::runtime::Handle::try_current()
                    .context("Runtime delivery needs a tokio runtime")?,
            ),
        };

        Ok(CoordinatorConfig {
            pending: self.request.pending,
            delivery,
            skip_when_determined: self.request.skip_when_determined,
        })
    }

    pub fn build(&self) -> Result<AuthorizerSet> {
        let coordinator = self.coordinator_config()?;
        let mut set = AuthorizerSet::new();

        for resource in &self.resources {
            let scripted = ScriptedAuthorizer::new(resource.initial, resource.response)
                .with_latency(Duration::from_millis(resource.latency_ms));

            set.insert(
                resource.name.clone(),
                CoordinatedAuthorizer::new(scripted, coordinator.clone()),
            );
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_for_missing_sections() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.request.pending, PendingRequestPolicy::Coalesce);
        assert_eq!(config.request.delivery, DeliveryMode::Inline);
        assert!(config.request.skip_when_determined);
        assert_eq!(config.resources.len(), 4);
    }

    #[test]
    fn parse_resources() {
        let config: Config = toml::from_str(
            r#"
            [request]
            pending = "reject"
            delivery = "runtime"
            skip_when_determined = false

            [[resources]]
            name = "camera"
            initial = "authorized"
            response = "dismiss"
            latency_ms = 0

            [[resources]]
            name = "contacts"
            "#,
        )
        .unwrap();

        assert_eq!(config.request.pending, PendingRequestPolicy::Reject);
        assert_eq!(config.request.delivery, DeliveryMode::Runtime);
        assert!(!config.request.skip_when_determined);

        let camera = &config.resources[0];
        assert_eq!(camera.initial, AuthorizationStatus::Authorized);
        assert_eq!(camera.response, ScriptedResponse::Dismiss);
        assert_eq!(camera.latency_ms, 0);

        let contacts = &config.resources[1];
        assert_eq!(contacts.initial, AuthorizationStatus::NotDetermined);
        assert_eq!(contacts.response, ScriptedResponse::Grant);
        assert_eq!(contacts.latency_ms, 250);
    }

    #[test]
    fn rejects_unknown_status() {
        let result = toml::from_str::<Config>(
            r#"
            [[resources]]
            name = "camera"
            initial = "granted"
            "#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn load_rejects_duplicates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[resources]]
            name = "camera"

            [[resources]]
            name = "camera"
            "#
        )
        .unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate resource 'camera'"));
    }

    #[test]
    fn load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/permkit.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[tokio::test]
    async fn build_set_from_config() {
        let mut config = Config::default();
        for resource in &mut config.resources {
            resource.latency_ms = 0;
        }

        let set = config.build().unwrap();

        assert_eq!(set.len(), 4);
        assert_eq!(
            set.request("camera").await,
            Ok(AuthorizationStatus::Authorized)
        );
        assert_eq!(
            set.request("microphone").await,
            Ok(AuthorizationStatus::Denied)
        );
        assert_eq!(
            set.request("accessibility").await,
            Ok(AuthorizationStatus::Denied)
        );
    }

    #[test]
    fn runtime_delivery_needs_runtime() {
        let mut config = Config::default();
        config.request.delivery = DeliveryMode::Runtime;

        assert!(config.coordinator_config().is_err());
    }
}
