use anyhow::{bail, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Snapshot of the identity-related environment variables
///
/// The credential chain decides which credentials take part from this
/// snapshot, so tests can describe an environment without mutating the process.
/// Managed identity endpoints (`IDENTITY_ENDPOINT`, IMDS) are discovered by the
/// managed identity credential itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AzureEnvConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub federated_token_file: Option<PathBuf>,
    /// Skip the `az` CLI fallback at the end of the chain
    pub exclude_azure_cli: bool,
    /// Skip the managed identity step of the chain
    pub exclude_managed_identity: bool,
}

impl AzureEnvConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Self {
            tenant_id: var("AZURE_TENANT_ID"),
            client_id: var("AZURE_CLIENT_ID"),
            client_secret: var("AZURE_CLIENT_SECRET"),
            federated_token_file: var("AZURE_FEDERATED_TOKEN_FILE").map(PathBuf::from),
            exclude_azure_cli: false,
            exclude_managed_identity: false,
        }
    }
}

/// A host-side `name=config` secret source selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: String,
    pub config: String,
}

impl FromStr for SourceSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((name, config)) = s.split_once('=') else {
            bail!("Invalid secret source '{}'. Expected format: name=config", s);
        };

        let name = name.trim();
        if name.is_empty() {
            bail!("Invalid secret source '{}': missing source name", s);
        }

        Ok(Self {
            name: name.to_string(),
            config: config.to_string(),
        })
    }
}
