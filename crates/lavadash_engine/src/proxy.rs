//! Authenticating XML-RPC proxy.

use crate::auth::{Credential, TokenStore};
use crate::config::ClientConfig;
use crate::dashboard::{ApiNamespace, Dashboard};
use crate::endpoint::Endpoint;
use crate::error::{EngineError, EngineResult, NetworkFailure};
use crate::http::{HttpClient, TransportError, UreqClient};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lavadash_protocol::{Bundle, BundleContent, DataView, ProtocolError, QueryResult, Stream};
use lavadash_xmlrpc::{decode_response, encode_call, Response, Value};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// XML-RPC proxy for one dashboard endpoint.
///
/// Adds `Authorization: Basic` to every request when the endpoint names
/// a user. The token comes from the endpoint itself or, lazily on the
/// first call, from the token store.
pub struct ServerProxy<C: HttpClient> {
    endpoint: Endpoint,
    client: C,
    tokens: Arc<dyn TokenStore>,
    config: ClientConfig,
    namespace: ApiNamespace,
    credential: Mutex<Option<Credential>>,
}

impl ServerProxy<UreqClient> {
    /// Creates a proxy that talks HTTP(S) through `ureq`.
    pub fn connect(endpoint: Endpoint, tokens: Arc<dyn TokenStore>, config: ClientConfig) -> Self {
        let client = UreqClient::new(&config);
        Self::new(endpoint, client, tokens, config)
    }
}

impl<C: HttpClient> ServerProxy<C> {
    /// Creates a proxy using the legacy flat namespace.
    pub fn new(endpoint: Endpoint, client: C, tokens: Arc<dyn TokenStore>, config: ClientConfig) -> Self {
        Self {
            endpoint,
            client,
            tokens,
            config,
            namespace: ApiNamespace::Legacy,
            credential: Mutex::new(None),
        }
    }

    /// Uses `credential` instead of consulting the token store.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        *self.credential.get_mut() = Some(credential);
        self
    }

    /// Endpoint this proxy talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Currently selected method root.
    pub fn namespace(&self) -> ApiNamespace {
        self.namespace
    }

    /// Switches to the `dashboard.` namespace when the server offers it.
    pub fn negotiate_namespace(&mut self) -> EngineResult<ApiNamespace> {
        let methods = self.list_methods()?;
        self.namespace = ApiNamespace::from_methods(&methods);
        debug!(endpoint = %self.endpoint, namespace = ?self.namespace, "selected API namespace");
        Ok(self.namespace)
    }

    /// Performs one XML-RPC call and returns the reply value.
    pub fn call(&self, method: &str, params: &[Value]) -> EngineResult<Value> {
        let method = self.namespace.qualify(method);
        let body = encode_call(&method, params);

        let mut headers = vec![("Content-Type", "text/xml".to_string())];
        if let Some(credential) = self.credential()? {
            if !credential.token().is_empty() {
                headers.push(("Authorization", basic_auth(&credential)));
            }
        }

        debug!(endpoint = %self.endpoint, method = %method, "xml-rpc call");
        if self.config.verbose_xml_rpc {
            debug!(body = %String::from_utf8_lossy(&body), "xml-rpc request");
        }

        let reply = self
            .client
            .post(self.endpoint.url(), &headers, body)
            .map_err(|e| self.transport_error(e))?;

        if self.config.verbose_xml_rpc {
            debug!(body = %String::from_utf8_lossy(&reply), "xml-rpc response");
        }

        match decode_response(&reply)? {
            Response::Success(value) => Ok(value),
            Response::Fault { code, message } => {
                debug!(method = %method, code, message = %message, "xml-rpc fault");
                Err(EngineError::Fault { code, message })
            }
        }
    }

    fn credential(&self) -> EngineResult<Option<Credential>> {
        let Some(username) = self.endpoint.username() else {
            return Ok(None);
        };
        let mut cached = self.credential.lock();
        if let Some(credential) = cached.as_ref() {
            return Ok(Some(credential.clone()));
        }

        let host = self.endpoint.host_key();
        let token = match self.endpoint.token() {
            Some(token) => token.to_string(),
            None => self
                .tokens
                .get_token_for_host(username, &host)?
                .ok_or_else(|| EngineError::AuthMissing {
                    username: username.to_string(),
                    host: host.clone(),
                })?,
        };
        let credential = Credential::new(username, host, token);
        *cached = Some(credential.clone());
        Ok(Some(credential))
    }

    fn transport_error(&self, err: TransportError) -> EngineError {
        let url = self.endpoint.url().to_string();
        match err {
            TransportError::Status { code, reason } => EngineError::Http {
                url,
                status: code,
                reason,
            },
            TransportError::ConnectionRefused(message) => EngineError::Network {
                url,
                kind: NetworkFailure::ConnectionRefused,
                message,
            },
            TransportError::Unresolved(message) => EngineError::Network {
                url,
                kind: NetworkFailure::Unresolved,
                message,
            },
            TransportError::Other(message) => EngineError::Network {
                url,
                kind: NetworkFailure::Other,
                message,
            },
        }
    }
}

fn basic_auth(credential: &Credential) -> String {
    let pair = format!("{}:{}", credential.username(), credential.token());
    format!("Basic {}", STANDARD.encode(pair))
}

fn expect_str(method: &'static str, value: Value) -> EngineResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ProtocolError::UnexpectedReply {
            method,
            message: format!("expected string, got {}", other.type_name()),
        }
        .into()),
    }
}

impl<C: HttpClient> Dashboard for ServerProxy<C> {
    fn list_methods(&self) -> EngineResult<Vec<String>> {
        let reply = self.call("system.listMethods", &[])?;
        let methods = reply.as_array().ok_or_else(|| ProtocolError::UnexpectedReply {
            method: "system.listMethods",
            message: format!("expected array, got {}", reply.type_name()),
        })?;
        Ok(methods
            .iter()
            .filter_map(|m| m.as_str().map(str::to_string))
            .collect())
    }

    fn version(&self) -> EngineResult<String> {
        expect_str("version", self.call("version", &[])?)
    }

    fn streams(&self) -> EngineResult<Vec<Stream>> {
        Ok(Stream::list_from_value(&self.call("streams", &[])?)?)
    }

    fn bundles(&self, pathname: &str) -> EngineResult<Vec<Bundle>> {
        let reply = self.call("bundles", &[Value::from(pathname)])?;
        Ok(Bundle::list_from_value(&reply)?)
    }

    fn get(&self, content_sha1: &str) -> EngineResult<BundleContent> {
        let reply = self.call("get", &[Value::from(content_sha1)])?;
        Ok(BundleContent::from_value(&reply)?)
    }

    fn put(&self, content: &[u8], content_filename: &str, pathname: &str) -> EngineResult<String> {
        let params = [
            Value::Base64(content.to_vec()),
            Value::from(content_filename),
            Value::from(pathname),
        ];
        expect_str("put", self.call("put", &params)?)
    }

    fn deserialize(&self, content_sha1: &str) -> EngineResult<()> {
        self.call("deserialize", &[Value::from(content_sha1)])?;
        Ok(())
    }

    fn make_stream(&self, pathname: &str, name: &str) -> EngineResult<String> {
        let reply = self.call("make_stream", &[Value::from(pathname), Value::from(name)])?;
        expect_str("make_stream", reply)
    }

    fn data_views(&self) -> EngineResult<Vec<DataView>> {
        Ok(DataView::list_from_value(&self.call("data_views", &[])?)?)
    }

    fn query_data_view(
        &self,
        name: &str,
        arguments: &BTreeMap<String, String>,
    ) -> EngineResult<QueryResult> {
        let arguments = Value::structure(
            arguments
                .iter()
                .map(|(k, v)| (k.as_str(), Value::from(v.as_str()))),
        );
        let reply = self.call("query_data_view", &[Value::from(name), arguments])?;
        Ok(QueryResult::from_value(&reply)?)
    }

    fn whoami(&self) -> EngineResult<Option<String>> {
        match self.call("system.whoami", &[])? {
            Value::Nil => Ok(None),
            other => expect_str("system.whoami", other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::config::EndpointStyle;
    use crate::http::{LoopbackClient, LoopbackServer};
    use lavadash_xmlrpc::{decode_call, encode_fault, encode_response};

    /// Answers every call with a canned reply and remembers the last request.
    #[derive(Default)]
    struct Canned {
        reply: Mutex<Option<Vec<u8>>>,
        last: Mutex<Option<(String, Option<String>)>>,
    }

    impl Canned {
        fn replying(reply: Vec<u8>) -> Arc<Self> {
            let canned = Self::default();
            *canned.reply.lock() = Some(reply);
            Arc::new(canned)
        }
    }

    impl LoopbackServer for Canned {
        fn handle_post(
            &self,
            _path: &str,
            headers: &[(&str, String)],
            body: &[u8],
        ) -> Result<Vec<u8>, TransportError> {
            let call = decode_call(body).map_err(|e| TransportError::Other(e.to_string()))?;
            let auth = headers
                .iter()
                .find(|(n, _)| *n == "Authorization")
                .map(|(_, v)| v.clone());
            *self.last.lock() = Some((call.method, auth));
            self.reply
                .lock()
                .clone()
                .ok_or_else(|| TransportError::Other("no reply".into()))
        }
    }

    fn proxy(url: &str, server: Arc<Canned>, store: MemoryTokenStore) -> ServerProxy<LoopbackClient<Arc<Canned>>> {
        let endpoint = Endpoint::parse(url, EndpointStyle::XmlRpc).unwrap();
        ServerProxy::new(
            endpoint,
            LoopbackClient::new(server),
            Arc::new(store),
            ClientConfig::default(),
        )
    }

    #[test]
    fn anonymous_call_has_no_authorization() {
        let server = Canned::replying(encode_response(&Value::from("0.4.0.final.0")));
        let proxy = proxy("http://host/", Arc::clone(&server), MemoryTokenStore::new());
        assert_eq!(proxy.version().unwrap(), "0.4.0.final.0");
        let last = server.last.lock().clone().unwrap();
        assert_eq!(last, ("version".to_string(), None));
    }

    #[test]
    fn stored_token_is_sent_as_basic_auth() {
        let server = Canned::replying(encode_response(&Value::Array(vec![])));
        let store = MemoryTokenStore::from_triples([("alice", "host:8000", "TOKEN")]);
        let proxy = proxy("http://alice@host:8000/", Arc::clone(&server), store);
        assert!(proxy.streams().unwrap().is_empty());
        let (_, auth) = server.last.lock().clone().unwrap();
        assert_eq!(auth.as_deref(), Some("Basic YWxpY2U6VE9LRU4="));
    }

    #[test]
    fn missing_token_is_reported_before_sending() {
        let server = Canned::replying(encode_response(&Value::Nil));
        let proxy = proxy("http://bob@host/", Arc::clone(&server), MemoryTokenStore::new());
        let err = proxy.streams().unwrap_err();
        assert!(matches!(err, EngineError::AuthMissing { ref username, .. } if username == "bob"));
        assert!(server.last.lock().is_none());
    }

    #[test]
    fn faults_become_errors() {
        let server = Canned::replying(encode_fault(404, "Bundle stream not found"));
        let proxy = proxy("http://host/", server, MemoryTokenStore::new());
        let err = proxy.bundles("/missing/").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn negotiated_namespace_prefixes_methods() {
        let server = Canned::replying(encode_response(&Value::Array(vec![
            Value::from("system.listMethods"),
            Value::from("dashboard.version"),
        ])));
        let mut proxy = proxy("http://host/", Arc::clone(&server), MemoryTokenStore::new());
        assert_eq!(proxy.negotiate_namespace().unwrap(), ApiNamespace::Dashboard);

        *server.reply.lock() = Some(encode_response(&Value::from("0.5.0.final.0")));
        proxy.version().unwrap();
        assert_eq!(server.last.lock().clone().unwrap().0, "dashboard.version");
        proxy.whoami().unwrap();
        assert_eq!(server.last.lock().clone().unwrap().0, "system.whoami");
    }

    #[test]
    fn http_status_maps_to_http_error() {
        struct Unauthorized;
        impl LoopbackServer for Unauthorized {
            fn handle_post(
                &self,
                _path: &str,
                _headers: &[(&str, String)],
                _body: &[u8],
            ) -> Result<Vec<u8>, TransportError> {
                Err(TransportError::Status {
                    code: 401,
                    reason: "Unauthorized".into(),
                })
            }
        }
        let endpoint = Endpoint::parse("http://host/", EndpointStyle::Rpc2).unwrap();
        let proxy = ServerProxy::new(
            endpoint,
            LoopbackClient::new(Unauthorized),
            Arc::new(MemoryTokenStore::new()),
            ClientConfig::default(),
        );
        let err = proxy.whoami().unwrap_err();
        assert!(matches!(err, EngineError::Http { status: 401, .. }));
    }
}
