//! Ambient credential resolution
//!
//! The ordered chain of Microsoft Entra ID credentials tried one after another
//! until one yields an access token:
//! environment (client secret) → workload identity → managed identity → Azure CLI.
//! The token flows themselves are the `azure_identity` credentials; this module
//! decides which of them take part and in what order.

mod chain;

pub use chain::{is_fresh_at, ChainedTokenCredential};

use azure_core::credentials::{Secret, TokenCredential};
use azure_identity::{
    AzureCliCredential, AzureCliCredentialOptions, ClientSecretCredential,
    ManagedIdentityCredential, ManagedIdentityCredentialOptions, UserAssignedId,
    WorkloadIdentityCredential, WorkloadIdentityCredentialOptions,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AzureEnvConfig;

/// Scope requested for Key Vault data-plane calls
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

#[derive(Debug, Error)]
pub enum CredentialError {
    /// A credential rejected its settings while being created
    #[error("{credential}: invalid configuration: {message}")]
    Configuration {
        credential: &'static str,
        message: String,
    },

    #[error("no credential is enabled in the chain")]
    EmptyChain,

    #[error("no credential in the chain could provide a token: {}", join_failures(.0))]
    ChainExhausted(Vec<(&'static str, String)>),
}

fn join_failures(failures: &[(&'static str, String)]) -> String {
    failures
        .iter()
        .map(|(name, message)| format!("{name}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Tenant IDs are GUIDs or domain names
fn validate_tenant_id(credential: &'static str, tenant_id: &str) -> Result<(), CredentialError> {
    let valid = !tenant_id.is_empty()
        && tenant_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(CredentialError::Configuration {
            credential,
            message: format!(
                "invalid tenant id '{tenant_id}': only alphanumerics, '-' and '.' are allowed"
            ),
        })
    }
}

fn configuration_error(
    credential: &'static str,
) -> impl FnOnce(azure_core::Error) -> CredentialError {
    move |e| CredentialError::Configuration {
        credential,
        message: e.to_string(),
    }
}

/// Build the default ambient credential chain from an environment snapshot
///
/// Credentials whose environment is incomplete are left out of the chain.
pub fn default_chain(config: &AzureEnvConfig) -> Result<ChainedTokenCredential, CredentialError> {
    let mut links: Vec<(&'static str, Arc<dyn TokenCredential>)> = Vec::new();

    match (&config.tenant_id, &config.client_id, &config.client_secret) {
        (Some(tenant_id), Some(client_id), Some(client_secret)) => {
            const NAME: &str = "ClientSecretCredential";
            validate_tenant_id(NAME, tenant_id)?;
            let credential = ClientSecretCredential::new(
                tenant_id,
                client_id.clone(),
                Secret::new(client_secret.clone()),
                None,
            )
            .map_err(configuration_error(NAME))?;
            links.push((NAME, credential as Arc<dyn TokenCredential>));
        }
        _ => debug!("Environment credential not configured, skipping"),
    }

    match (&config.tenant_id, &config.client_id, &config.federated_token_file) {
        (Some(tenant_id), Some(client_id), Some(token_file)) => {
            const NAME: &str = "WorkloadIdentityCredential";
            validate_tenant_id(NAME, tenant_id)?;
            let options = WorkloadIdentityCredentialOptions {
                tenant_id: Some(tenant_id.clone()),
                client_id: Some(client_id.clone()),
                token_file_path: Some(token_file.clone()),
                ..Default::default()
            };
            let credential = WorkloadIdentityCredential::new(Some(options))
                .map_err(configuration_error(NAME))?;
            links.push((NAME, credential as Arc<dyn TokenCredential>));
        }
        _ => debug!("Workload identity not configured, skipping"),
    }

    if !config.exclude_managed_identity {
        const NAME: &str = "ManagedIdentityCredential";
        // AZURE_CLIENT_ID selects a user-assigned identity
        let options = config
            .client_id
            .as_ref()
            .map(|client_id| ManagedIdentityCredentialOptions {
                user_assigned_id: Some(UserAssignedId::ClientId(client_id.clone())),
                ..Default::default()
            });
        let credential =
            ManagedIdentityCredential::new(options).map_err(configuration_error(NAME))?;
        links.push((NAME, credential as Arc<dyn TokenCredential>));
    }

    if !config.exclude_azure_cli {
        const NAME: &str = "AzureCliCredential";
        let options = match &config.tenant_id {
            Some(tenant_id) => {
                validate_tenant_id(NAME, tenant_id)?;
                Some(AzureCliCredentialOptions {
                    tenant_id: Some(tenant_id.clone()),
                    ..Default::default()
                })
            }
            None => None,
        };
        let credential = AzureCliCredential::new(options).map_err(configuration_error(NAME))?;
        links.push((NAME, credential as Arc<dyn TokenCredential>));
    }

    let chain = ChainedTokenCredential::new(links)?;
    info!("Credential chain: {}", chain.source_names().join(" -> "));
    Ok(chain)
}
