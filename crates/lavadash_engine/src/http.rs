//! HTTP transport for XML-RPC requests.
//!
//! The proxy only needs "POST these bytes with these headers". The
//! [`HttpClient`] trait captures that so tests can route requests to an
//! in-process server through [`LoopbackClient`] instead of a socket.

use crate::config::ClientConfig;
use std::error::Error as StdError;
use std::io::{self, Read};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Failure of a single HTTP exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP {code} {reason}")]
    Status {
        /// Status code.
        code: u16,
        /// Reason phrase.
        reason: String,
    },
    /// The connection was refused.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),
    /// The host name did not resolve.
    #[error("unable to resolve address: {0}")]
    Unresolved(String),
    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Minimal HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request and returns the response body.
    fn post(&self, url: &str, headers: &[(&str, String)], body: Vec<u8>)
        -> Result<Vec<u8>, TransportError>;
}

impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    fn post(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).post(url, headers, body)
    }
}

/// Blocking client over `ureq`, with TLS for `https` endpoints.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    /// Creates a client honouring the timeouts of `config`.
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout_read(config.read_timeout)
            .timeout_write(config.read_timeout)
            .user_agent(&config.user_agent)
            .build();
        Self { agent }
    }
}

impl HttpClient for UreqClient {
    fn post(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<Vec<u8>, TransportError> {
        let mut request = self.agent.post(url);
        for (name, value) in headers {
            request = request.set(name, value);
        }
        match request.send_bytes(&body) {
            Ok(response) => {
                let mut buf = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut buf)
                    .map_err(|e| TransportError::Other(e.to_string()))?;
                Ok(buf)
            }
            Err(ureq::Error::Status(code, response)) => Err(TransportError::Status {
                code,
                reason: response.status_text().to_string(),
            }),
            Err(ureq::Error::Transport(transport)) => {
                let message = transport.to_string();
                Err(match transport.kind() {
                    ureq::ErrorKind::ConnectionFailed if is_connection_refused(&transport) => {
                        TransportError::ConnectionRefused(message)
                    }
                    ureq::ErrorKind::Dns => TransportError::Unresolved(message),
                    _ => TransportError::Other(message),
                })
            }
        }
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a POST request to `path` and returns the response body.
    fn handle_post(
        &self,
        path: &str,
        headers: &[(&str, String)],
        body: &[u8],
    ) -> Result<Vec<u8>, TransportError>;
}

impl<S: LoopbackServer + ?Sized> LoopbackServer for Arc<S> {
    fn handle_post(
        &self,
        path: &str,
        headers: &[(&str, String)],
        body: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        (**self).handle_post(path, headers, body)
    }
}

/// A loopback HTTP client that routes requests directly to a server object.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }

    /// The server requests are routed to.
    pub fn server(&self) -> &S {
        &self.server
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn post(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<Vec<u8>, TransportError> {
        self.server.handle_post(&url_path(url), headers, &body)
    }
}

/// Path part of an absolute URL; anything else is taken as a path.
fn url_path(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_owned(), |u| u.path().to_owned())
}

/// Whether the error chain bottoms out in a refused TCP connection.
///
/// ureq reports refusals, timeouts and resets alike as `ConnectionFailed`.
fn is_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut next = Some(err);
    while let Some(err) = next {
        if let Some(io) = err.downcast_ref::<io::Error>() {
            if io.kind() == io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        next = err.source();
    }
    false
}
