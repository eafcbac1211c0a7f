// Environment-driven configuration, resolved once at startup.

use secrecy::SecretString;

use crate::error::Error;

pub const ENDPOINT_VAR: &str = "AZURE_OPENAI_ENDPOINT";
pub const API_KEY_VAR: &str = "AZURE_OPENAI_KEY";
pub const DEPLOYMENT_VAR: &str = "AZURE_OPENAI_DEPLOYMENT";
pub const API_VERSION_VAR: &str = "AZURE_OPENAI_API_VERSION";

pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Resolved connection settings for an Azure OpenAI resource.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    pub api_key: SecretString,
    /// Deployment identifier, selects the model behind the endpoint.
    pub deployment: String,
    pub api_version: String,
}

impl Settings {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: SecretString::from(api_key.into()),
            deployment: deployment.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Builder-style override for the API version.
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Read settings from the environment. A missing or empty required
    /// variable fails with `ErrorKind::ConfigurationMissing` naming it;
    /// `AZURE_OPENAI_API_VERSION` is optional and defaults to
    /// [`DEFAULT_API_VERSION`].
    pub fn from_env() -> Result<Self, Error> {
        let endpoint = require_var(ENDPOINT_VAR)?;
        let api_key = require_var(API_KEY_VAR)?;
        let deployment = require_var(DEPLOYMENT_VAR)?;

        let mut settings = Self::new(endpoint, api_key, deployment);
        if let Ok(version) = std::env::var(API_VERSION_VAR)
            && !version.trim().is_empty()
        {
            settings.api_version = version;
        }
        Ok(settings)
    }
}

fn require_var(name: &str) -> Result<String, Error> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::configuration_missing(format!("{name} is not set"))),
    }
}
