//! The remote dashboard API as seen by the engine.

use crate::error::EngineResult;
use lavadash_protocol::{Bundle, BundleContent, DataView, QueryResult, Stream};
use std::collections::BTreeMap;

/// Methods the engine calls on a dashboard.
///
/// Names are relative to the resolved API root; see [`ApiNamespace`].
/// Implemented by [`ServerProxy`](crate::ServerProxy) for real servers
/// and by [`MemoryDashboard`](crate::MemoryDashboard) for tests.
pub trait Dashboard: Send + Sync {
    /// `system.listMethods()`.
    fn list_methods(&self) -> EngineResult<Vec<String>>;

    /// `version()`, the five-part server version.
    fn version(&self) -> EngineResult<String>;

    /// `streams()`, every stream visible to the caller.
    fn streams(&self) -> EngineResult<Vec<Stream>>;

    /// `bundles(pathname)`. Faults with 404 for an unknown stream.
    fn bundles(&self, pathname: &str) -> EngineResult<Vec<Bundle>>;

    /// `get(sha1)`. Faults with 404 for an unknown bundle.
    fn get(&self, content_sha1: &str) -> EngineResult<BundleContent>;

    /// `put(content, filename, pathname)`, returning the content SHA-1.
    ///
    /// Faults with 409 when the content is already stored in any stream
    /// and with 404 when the stream does not exist.
    fn put(&self, content: &[u8], content_filename: &str, pathname: &str) -> EngineResult<String>;

    /// `deserialize(sha1)`.
    fn deserialize(&self, content_sha1: &str) -> EngineResult<()>;

    /// `make_stream(pathname, name)`, returning the pathname.
    /// Faults with 409 when the stream exists.
    fn make_stream(&self, pathname: &str, name: &str) -> EngineResult<String>;

    /// `data_views()`.
    fn data_views(&self) -> EngineResult<Vec<DataView>>;

    /// `query_data_view(name, arguments)`.
    fn query_data_view(
        &self,
        name: &str,
        arguments: &BTreeMap<String, String>,
    ) -> EngineResult<QueryResult>;

    /// `system.whoami()`, the authenticated user or `None` when anonymous.
    fn whoami(&self) -> EngineResult<Option<String>>;
}

/// Method root selected once per command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiNamespace {
    /// Methods registered at the top level (older servers).
    #[default]
    Legacy,
    /// Methods registered under `dashboard.`.
    Dashboard,
}

impl ApiNamespace {
    /// Probe method whose presence selects [`ApiNamespace::Dashboard`].
    pub const PROBE_METHOD: &'static str = "dashboard.version";

    /// Picks the namespace from a `system.listMethods()` reply.
    pub fn from_methods<S: AsRef<str>>(methods: &[S]) -> Self {
        if methods.iter().any(|m| m.as_ref() == Self::PROBE_METHOD) {
            ApiNamespace::Dashboard
        } else {
            ApiNamespace::Legacy
        }
    }

    /// Full wire name of `method`. `system.` methods are never prefixed.
    pub fn qualify(self, method: &str) -> String {
        match self {
            ApiNamespace::Dashboard if !method.starts_with("system.") => {
                format!("dashboard.{method}")
            }
            _ => method.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_probe() {
        let modern = ["system.listMethods", "dashboard.version", "dashboard.streams"];
        assert_eq!(ApiNamespace::from_methods(&modern), ApiNamespace::Dashboard);
        let legacy = ["system.listMethods", "version", "streams"];
        assert_eq!(ApiNamespace::from_methods(&legacy), ApiNamespace::Legacy);
    }

    #[test]
    fn qualified_names() {
        assert_eq!(ApiNamespace::Dashboard.qualify("streams"), "dashboard.streams");
        assert_eq!(ApiNamespace::Dashboard.qualify("system.whoami"), "system.whoami");
        assert_eq!(ApiNamespace::Legacy.qualify("streams"), "streams");
    }
}
