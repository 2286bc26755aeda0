use azure_core::credentials::{AccessToken, TokenCredential, TokenRequestOptions};
use azure_core::error::ErrorKind;
use azure_core::time::{Duration, OffsetDateTime};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use super::CredentialError;

/// Tokens this close to expiry are refreshed instead of reused
const EXPIRY_SKEW: Duration = Duration::minutes(5);

/// Whether `token` can still be handed out at `now`
pub fn is_fresh_at(token: &AccessToken, now: OffsetDateTime) -> bool {
    token.expires_on - EXPIRY_SKEW > now
}

struct ChainLink {
    name: &'static str,
    credential: Arc<dyn TokenCredential>,
}

struct CachedToken {
    scopes: String,
    token: AccessToken,
}

/// Ordered list of credentials, tried in sequence until one succeeds
///
/// The last issued token is reused until it gets close to expiry. The cache
/// lock is only held to read or replace the slot, never across a token request,
/// so concurrent lookups that miss the cache acquire tokens in parallel.
pub struct ChainedTokenCredential {
    links: Vec<ChainLink>,
    cached: Mutex<Option<CachedToken>>,
}

impl ChainedTokenCredential {
    /// Create a chain from named credentials, in the order they are tried
    pub fn new(
        links: Vec<(&'static str, Arc<dyn TokenCredential>)>,
    ) -> Result<Self, CredentialError> {
        if links.is_empty() {
            return Err(CredentialError::EmptyChain);
        }

        Ok(Self {
            links: links
                .into_iter()
                .map(|(name, credential)| ChainLink { name, credential })
                .collect(),
            cached: Mutex::new(None),
        })
    }

    /// Names of the chained credentials, in the order they are tried
    pub fn source_names(&self) -> Vec<&'static str> {
        self.links.iter().map(|link| link.name).collect()
    }

    /// Walk the chain and return the first token issued
    pub async fn acquire(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        let scope_key = scopes.join(" ");
        if let Some(token) = self.cached_token(&scope_key, OffsetDateTime::now_utc()) {
            return Ok(token);
        }

        let mut failures = Vec::new();
        for link in &self.links {
            match link.credential.get_token(scopes, None).await {
                Ok(token) => {
                    info!("Acquired token for '{}' using {}", scope_key, link.name);
                    self.store(scope_key, token.clone());
                    return Ok(token);
                }
                Err(err) => {
                    debug!("Credential {} failed, trying next: {}", link.name, err);
                    failures.push((link.name, err.to_string()));
                }
            }
        }

        warn!("No credential could provide a token for '{}'", scope_key);
        Err(CredentialError::ChainExhausted(failures))
    }

    fn cached_token(&self, scope_key: &str, now: OffsetDateTime) -> Option<AccessToken> {
        let cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        cached
            .as_ref()
            .filter(|entry| entry.scopes == scope_key && is_fresh_at(&entry.token, now))
            .map(|entry| entry.token.clone())
    }

    fn store(&self, scopes: String, token: AccessToken) {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        *cached = Some(CachedToken { scopes, token });
    }
}

impl fmt::Debug for ChainedTokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedTokenCredential")
            .field("sources", &self.source_names())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl TokenCredential for ChainedTokenCredential {
    async fn get_token(
        &self,
        scopes: &[&str],
        _options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        self.acquire(scopes)
            .await
            .map_err(|e| azure_core::Error::new(ErrorKind::Credential, e))
    }
}
