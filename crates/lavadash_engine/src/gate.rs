//! Server capability checks.

use crate::dashboard::Dashboard;
use crate::error::{EngineError, EngineResult};
use lavadash_protocol::{ServerVersion, StrictVersion};
use std::fmt;
use tracing::debug;

/// Server features that need a minimum version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// `make_stream()`
    MakeStream,
    /// Re-uploading a backup tree.
    Restore,
    /// Server to server replication.
    Pull,
    /// `data_views()`
    DataViews,
    /// `query_data_view()`
    QueryDataView,
}

impl Capability {
    /// Oldest server version offering the capability.
    pub const fn minimum(self) -> StrictVersion {
        match self {
            Capability::MakeStream | Capability::Restore | Capability::Pull => {
                StrictVersion::new(0, 3, 0)
            }
            Capability::DataViews | Capability::QueryDataView => StrictVersion::new(0, 4, 0),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::MakeStream => "make_stream",
            Capability::Restore => "restore",
            Capability::Pull => "pull",
            Capability::DataViews => "data_views",
            Capability::QueryDataView => "query_data_view",
        })
    }
}

/// Fails unless `server` reports at least `required`.
///
/// Calls `version()` exactly once. Returns the normalized server
/// version on success.
pub fn check_server_version<D: Dashboard + ?Sized>(
    server: &D,
    required: StrictVersion,
) -> EngineResult<StrictVersion> {
    let raw = server.version()?;
    let actual = raw.parse::<ServerVersion>()?.to_strict();
    debug!(server = %raw, required = %required, "checking server version");
    if actual < required {
        return Err(EngineError::InsufficientServerVersion {
            server: actual.to_string(),
            required: required.to_string(),
        });
    }
    Ok(actual)
}

/// Fails unless `server` offers `capability`.
pub fn require<D: Dashboard + ?Sized>(server: &D, capability: Capability) -> EngineResult<StrictVersion> {
    check_server_version(server, capability.minimum())
}
