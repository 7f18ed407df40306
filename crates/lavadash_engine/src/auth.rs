//! Authentication tokens.
//!
//! Tokens are keyed by `(username, host[:port])`. The keyring backed
//! store files each one under the service `lava-tool-{host}` with the
//! username as account, which is where other LAVA tools look as well.

use crate::error::{EngineError, EngineResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// Persistent `(user, host) -> token` mapping.
pub trait TokenStore: Send + Sync {
    /// Stores `token` for `username` at `host`, replacing any previous one.
    fn add_token(&self, username: &str, host: &str, token: &str) -> EngineResult<()>;

    /// Returns the token for `username` at `host`, or `None`.
    fn get_token_for_host(&self, username: &str, host: &str) -> EngineResult<Option<String>>;
}

/// Resolved HTTP Basic credential for one endpoint.
#[derive(Clone)]
pub struct Credential {
    username: String,
    host: String,
    token: Zeroizing<String>,
}

impl Credential {
    /// Creates a credential.
    pub fn new(username: impl Into<String>, host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            host: host.into(),
            token: Zeroizing::new(token.into()),
        }
    }

    /// User name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// `host[:port]` the credential applies to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Secret token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Token store held in memory, for tests and one-shot checks.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<(String, String), Zeroizing<String>>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from `(user, host, token)` triples.
    pub fn from_triples<I, U, H, T>(triples: I) -> Self
    where
        I: IntoIterator<Item = (U, H, T)>,
        U: Into<String>,
        H: Into<String>,
        T: Into<String>,
    {
        let tokens = triples
            .into_iter()
            .map(|(user, host, token)| ((user.into(), host.into()), Zeroizing::new(token.into())))
            .collect();
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    /// Number of stored tokens.
    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    /// Returns true if no token is stored.
    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }
}

impl TokenStore for MemoryTokenStore {
    fn add_token(&self, username: &str, host: &str, token: &str) -> EngineResult<()> {
        self.tokens.write().insert(
            (username.to_string(), host.to_string()),
            Zeroizing::new(token.to_string()),
        );
        Ok(())
    }

    fn get_token_for_host(&self, username: &str, host: &str) -> EngineResult<Option<String>> {
        Ok(self
            .tokens
            .read()
            .get(&(username.to_string(), host.to_string()))
            .map(|t| t.as_str().to_owned()))
    }
}

/// Token store backed by the OS credential service.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    /// Creates a keyring store.
    pub fn new() -> Self {
        Self
    }

    /// Keyring service name for `host`.
    pub fn service_name(host: &str) -> String {
        format!("lava-tool-{host}")
    }

    fn entry(username: &str, host: &str) -> EngineResult<keyring::Entry> {
        keyring::Entry::new(&Self::service_name(host), username)
            .map_err(|e| EngineError::Credential(e.to_string()))
    }
}

impl TokenStore for KeyringTokenStore {
    fn add_token(&self, username: &str, host: &str, token: &str) -> EngineResult<()> {
        debug!(username, host, "storing token in keyring");
        Self::entry(username, host)?
            .set_password(token)
            .map_err(|e| EngineError::Credential(e.to_string()))
    }

    fn get_token_for_host(&self, username: &str, host: &str) -> EngineResult<Option<String>> {
        match Self::entry(username, host)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(EngineError::Credential(e.to_string())),
        }
    }
}
