//! Secret source implementations
//!
//! This module provides the source abstraction the host resolves secrets
//! through, the name-to-factory registry, and the Azure Key Vault source.

mod azure_key_vault;
pub mod registry;
mod secret_source;

pub use azure_key_vault::{construct, construct_with, AzureKeyVaultSource, SOURCE_NAME};
pub use registry::SourceRegistry;
pub use secret_source::{SecretSource, SourceFactory, SourceParams};
