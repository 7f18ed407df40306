//! The `auth-add` flow: resolve a token, optionally validate it with
//! `system.whoami()`, then store it.

use crate::auth::{Credential, TokenStore};
use crate::config::{ClientConfig, EndpointStyle};
use crate::dashboard::Dashboard;
use crate::endpoint::Endpoint;
use crate::error::{EngineError, EngineResult};
use crate::http::HttpClient;
use crate::proxy::ServerProxy;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Inputs of one `auth-add` run.
#[derive(Debug, Clone)]
pub struct AuthAddOptions {
    /// Server URL, optionally `user[:token]@`-qualified.
    pub host_url: String,
    /// File to read the token from.
    pub token_file: Option<PathBuf>,
    /// Skip the `whoami()` round trip.
    pub no_check: bool,
    /// User to assume when the URL names none.
    pub default_username: String,
}

impl AuthAddOptions {
    /// Options for `host_url` with checking enabled.
    pub fn new(host_url: impl Into<String>, default_username: impl Into<String>) -> Self {
        Self {
            host_url: host_url.into(),
            token_file: None,
            no_check: false,
            default_username: default_username.into(),
        }
    }

    /// Reads the token from `path`.
    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }

    /// Sets whether validation is skipped.
    pub fn with_no_check(mut self, no_check: bool) -> Self {
        self.no_check = no_check;
        self
    }
}

/// Validates and stores a token, returning the stored credential.
///
/// The token comes from the URL, from `options.token_file`, or from
/// `prompt`, which receives the text to show the user. Endpoints are
/// always resolved with the `/RPC2/` suffix. Nothing is stored unless
/// validation succeeds or is skipped.
pub fn auth_add<C, P>(
    options: &AuthAddOptions,
    store: &dyn TokenStore,
    client: C,
    config: &ClientConfig,
    prompt: P,
) -> EngineResult<Credential>
where
    C: HttpClient,
    P: FnOnce(&str) -> EngineResult<String>,
{
    let mut endpoint = Endpoint::parse(&options.host_url, EndpointStyle::Rpc2)?;
    if endpoint.username().is_none() {
        endpoint = endpoint.with_username(options.default_username.clone());
    }
    let username = endpoint.username().unwrap_or_default().to_string();

    let token = match (endpoint.token(), &options.token_file) {
        (Some(_), Some(_)) => {
            return Err(EngineError::usage(
                "Token specified in url but --token-file also passed.",
            ))
        }
        (Some(token), None) => token.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|e| EngineError::command(format!("opening {path:?} failed: {e}")))?
            .trim()
            .to_string(),
        (None, None) => prompt(&format!("Paste token for {}: ", endpoint.url_with_user()))?
            .trim()
            .to_string(),
    };

    let credential = Credential::new(username.clone(), endpoint.host_key(), token);

    if !options.no_check {
        let proxy = ServerProxy::new(
            endpoint.clone(),
            client,
            Arc::new(NoTokens),
            config.clone().with_endpoint_style(EndpointStyle::Rpc2),
        )
        .with_credential(credential.clone());
        check_whoami(&proxy, &username)?;
    } else {
        debug!(username = %username, "skipping token check");
    }

    store.add_token(credential.username(), credential.host(), credential.token())?;
    info!(username = %username, host = %credential.host(), "token stored");
    Ok(credential)
}

fn check_whoami<D: Dashboard + ?Sized>(server: &D, username: &str) -> EngineResult<()> {
    let returned = match server.whoami() {
        Ok(returned) => returned,
        Err(EngineError::Http { status: 401, .. }) | Err(EngineError::Fault { code: 401, .. }) => {
            return Err(EngineError::AuthRejected {
                username: username.to_string(),
            })
        }
        Err(EngineError::Fault { message, .. }) => {
            return Err(EngineError::command(format!(
                "Server reported error during check: {message}."
            )))
        }
        Err(err) => return Err(err),
    };
    match returned {
        Some(user) if user == username => Ok(()),
        other => Err(EngineError::Internal(format!(
            "whoami() returned {} rather than expected {username} -- this is a bug.",
            other.as_deref().unwrap_or("None")
        ))),
    }
}

/// Store used while validating: the credential is always supplied
/// directly, so lookups find nothing.
struct NoTokens;

impl TokenStore for NoTokens {
    fn add_token(&self, _username: &str, _host: &str, _token: &str) -> EngineResult<()> {
        Ok(())
    }

    fn get_token_for_host(&self, _username: &str, _host: &str) -> EngineResult<Option<String>> {
        Ok(None)
    }
}
