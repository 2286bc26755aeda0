use azure_core::credentials::TokenCredential;
use azure_core::http::Url;
use azure_security_keyvault_secrets::SecretClient;
use std::sync::Arc;
use tracing::{debug, info};

use super::secret_source::{SecretSource, SourceParams};
use crate::config::AzureEnvConfig;
use crate::credentials::default_chain;
use crate::error::SecretSourceError;

/// Name the Key Vault source is registered under
pub const SOURCE_NAME: &str = "azkeyvault";

/// Secret source backed by Azure Key Vault
///
/// Every lookup is a fresh `GET` of the latest secret version; nothing is cached.
pub struct AzureKeyVaultSource {
    client: SecretClient,
    vault_url: String,
}

impl AzureKeyVaultSource {
    /// Create a source using an explicit credential instead of the ambient chain
    pub fn with_credential(
        vault_url: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, SecretSourceError> {
        let client_init = |message: String| SecretSourceError::ClientInit {
            vault_url: vault_url.to_string(),
            message,
        };

        check_vault_url(vault_url).map_err(client_init)?;
        let client = SecretClient::new(vault_url, credential, None)
            .map_err(|e| client_init(e.to_string()))?;

        debug!("Created Key Vault client for: {}", vault_url);
        Ok(Self {
            client,
            vault_url: vault_url.to_string(),
        })
    }

    pub fn vault_url(&self) -> &str {
        &self.vault_url
    }

    fn fetch_error(&self, key: &str, error: azure_core::Error) -> SecretSourceError {
        SecretSourceError::RemoteFetch {
            key: key.to_string(),
            vault_url: self.vault_url.clone(),
            message: error.to_string(),
        }
    }
}

/// Only absolute http(s) URLs with a host can address a vault
fn check_vault_url(vault_url: &str) -> Result<(), String> {
    let url = Url::parse(vault_url).map_err(|e| format!("invalid vault endpoint: {e}"))?;

    if !matches!(url.scheme(), "https" | "http") {
        return Err(format!(
            "invalid vault endpoint: unsupported scheme '{}'",
            url.scheme()
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("invalid vault endpoint: missing host".to_string());
    }
    Ok(())
}

/// Factory registered under [`SOURCE_NAME`]: ambient credentials from the process environment
pub fn construct(params: &SourceParams) -> Result<Box<dyn SecretSource>, SecretSourceError> {
    construct_with(params, &AzureEnvConfig::from_env())
}

/// Factory with an explicit environment snapshot
pub fn construct_with(
    params: &SourceParams,
    env: &AzureEnvConfig,
) -> Result<Box<dyn SecretSource>, SecretSourceError> {
    let vault_url = params.config_argument.as_str();
    debug!("Constructing Azure Key Vault source for: {}", vault_url);

    let credential = default_chain(env).map_err(|e| SecretSourceError::Credential {
        message: e.to_string(),
    })?;

    let source = AzureKeyVaultSource::with_credential(vault_url, Arc::new(credential))?;
    info!("Azure Key Vault source ready for vault: {}", vault_url);
    Ok(Box::new(source))
}

#[async_trait::async_trait]
impl SecretSource for AzureKeyVaultSource {
    fn describe(&self) -> String {
        format!("Azure Key Vault (vault: {})", self.vault_url)
    }

    async fn get(&self, key: &str) -> Result<String, SecretSourceError> {
        debug!("Reading secret '{}' from: {}", key, self.vault_url);

        // No version in the options: the latest version is returned
        let response = self
            .client
            .get_secret(key, None)
            .await
            .map_err(|e| self.fetch_error(key, e))?;
        let secret = response.into_body().map_err(|e| self.fetch_error(key, e))?;

        secret.value.ok_or_else(|| SecretSourceError::MissingValue {
            key: key.to_string(),
            vault_url: self.vault_url.clone(),
        })
    }
}
