use thiserror::Error;

/// Errors surfaced by secret sources and the source registry
#[derive(Debug, Error)]
pub enum SecretSourceError {
    /// Ambient credentials could not be acquired while constructing a source
    #[error("azkeyvault: failed to obtain credential: {message}")]
    Credential { message: String },

    /// The Key Vault client could not be built for the configured endpoint
    #[error("azkeyvault: failed to create client for vault '{vault_url}': {message}")]
    ClientInit { vault_url: String, message: String },

    /// The remote call for a secret failed (not found, denied, network, service error)
    #[error("azkeyvault: getting secret '{key}' from vault '{vault_url}' failed: {message}")]
    RemoteFetch {
        key: String,
        vault_url: String,
        message: String,
    },

    /// The remote call succeeded but the secret carried no value
    #[error("azkeyvault: secret '{key}' in vault '{vault_url}' has nil value")]
    MissingValue { key: String, vault_url: String },

    /// No factory is registered under the requested source name
    #[error("no secret source registered under '{name}'")]
    UnknownExtension { name: String },

    /// A factory is already registered under this source name
    #[error("secret source '{name}' is already registered")]
    DuplicateExtension { name: String },
}

impl SecretSourceError {
    /// Secret name the error refers to, for per-call lookup errors
    pub fn key(&self) -> Option<&str> {
        match self {
            SecretSourceError::RemoteFetch { key, .. }
            | SecretSourceError::MissingValue { key, .. } => Some(key),
            _ => None,
        }
    }
}
