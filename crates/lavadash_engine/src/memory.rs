//! In-memory dashboard for tests.

use crate::dashboard::Dashboard;
use crate::error::{EngineError, EngineResult, FAULT_DUPLICATE, FAULT_NOT_FOUND};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use lavadash_protocol::{Bundle, BundleContent, DataView, QueryResult, Stream};
use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, HashMap};

/// One call received by a [`MemoryDashboard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCall {
    /// `system.listMethods()`
    ListMethods,
    /// `version()`
    Version,
    /// `streams()`
    Streams,
    /// `bundles(pathname)`
    Bundles(String),
    /// `get(sha1)`
    Get(String),
    /// `put(content, filename, pathname)`
    Put {
        /// SHA-1 of the uploaded content.
        content_sha1: String,
        /// Filename argument.
        content_filename: String,
        /// Target stream.
        pathname: String,
    },
    /// `deserialize(sha1)`
    Deserialize(String),
    /// `make_stream(pathname, name)`
    MakeStream {
        /// Stream pathname.
        pathname: String,
        /// Stream name.
        name: String,
    },
    /// `data_views()`
    DataViews,
    /// `query_data_view(name, arguments)`
    QueryDataView {
        /// View name.
        name: String,
        /// Arguments passed.
        arguments: BTreeMap<String, String>,
    },
    /// `system.whoami()`
    Whoami,
}

impl DashboardCall {
    /// Returns true for calls that change server state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            DashboardCall::Put { .. } | DashboardCall::MakeStream { .. } | DashboardCall::Deserialize(_)
        )
    }
}

struct StoredBundle {
    content: Vec<u8>,
    content_filename: String,
    uploaded_by: Option<String>,
    uploaded_on: NaiveDateTime,
    is_deserialized: bool,
}

struct State {
    version: String,
    namespaced: bool,
    legacy_bundles: bool,
    whoami: Option<String>,
    streams: Vec<(Stream, Vec<String>)>,
    bundles: HashMap<String, StoredBundle>,
    data_views: Vec<(DataView, QueryResult)>,
    faults: HashMap<String, (i32, String)>,
    calls: Vec<DashboardCall>,
    clock: u32,
}

impl State {
    fn stream(&self, pathname: &str) -> Option<&(Stream, Vec<String>)> {
        self.streams.iter().find(|(s, _)| s.pathname == pathname)
    }

    fn stream_mut(&mut self, pathname: &str) -> Option<&mut (Stream, Vec<String>)> {
        self.streams.iter_mut().find(|(s, _)| s.pathname == pathname)
    }

    /// Deterministic upload timestamps for seeded bundles.
    fn tick(&mut self) -> NaiveDateTime {
        self.clock += 1;
        NaiveDate::from_ymd_opt(2011, 6, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap_or_default()
            + Duration::minutes(i64::from(self.clock))
    }

    fn store(
        &mut self,
        content: &[u8],
        content_filename: &str,
        pathname: &str,
        uploaded_by: Option<&str>,
        uploaded_on: NaiveDateTime,
    ) -> EngineResult<String> {
        if self.stream(pathname).is_none() {
            return Err(fault(FAULT_NOT_FOUND, format!("Bundle stream {pathname} not found")));
        }
        let sha1 = content_sha1(content);
        if self.bundles.contains_key(&sha1) {
            return Err(fault(FAULT_DUPLICATE, format!("Bundle {sha1} is already uploaded")));
        }
        let (stream, members) = self
            .stream_mut(pathname)
            .ok_or_else(|| fault(FAULT_NOT_FOUND, format!("Bundle stream {pathname} not found")))?;
        members.push(sha1.clone());
        stream.bundle_count += 1;
        self.bundles.insert(
            sha1.clone(),
            StoredBundle {
                content: content.to_vec(),
                content_filename: content_filename.to_string(),
                uploaded_by: uploaded_by.map(str::to_string),
                uploaded_on,
                is_deserialized: false,
            },
        );
        Ok(sha1)
    }
}

/// Hex SHA-1 of `content`, the dashboard's bundle key.
pub fn content_sha1(content: &[u8]) -> String {
    Sha1::digest(content)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn fault(code: i32, message: impl Into<String>) -> EngineError {
    EngineError::Fault {
        code,
        message: message.into(),
    }
}

/// A dashboard held entirely in memory.
///
/// Behaves like the real server where the engine depends on it: bundle
/// content is deduplicated globally by SHA-1 (409), unknown streams and
/// bundles fault with 404, and every call is recorded for assertions.
pub struct MemoryDashboard {
    state: Mutex<State>,
}

impl Default for MemoryDashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDashboard {
    /// Creates an empty dashboard reporting version `0.4.0.final.0`.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                version: "0.4.0.final.0".to_string(),
                namespaced: true,
                legacy_bundles: false,
                whoami: None,
                streams: Vec::new(),
                bundles: HashMap::new(),
                data_views: Vec::new(),
                faults: HashMap::new(),
                calls: Vec::new(),
                clock: 0,
            }),
        }
    }

    /// Sets the reported server version.
    pub fn with_version(self, version: impl Into<String>) -> Self {
        self.state.lock().version = version.into();
        self
    }

    /// Registers methods at the top level instead of under `dashboard.`.
    pub fn with_legacy_namespace(self) -> Self {
        self.state.lock().namespaced = false;
        self
    }

    /// Omits `content_size` from `bundles()`, like servers before 0.3.
    pub fn with_legacy_bundles(self) -> Self {
        self.state.lock().legacy_bundles = true;
        self
    }

    /// Sets the user returned by `whoami()`.
    pub fn with_whoami(self, user: impl Into<String>) -> Self {
        self.state.lock().whoami = Some(user.into());
        self
    }

    /// Adds a stream without recording a call.
    pub fn with_stream(self, pathname: &str, name: &str) -> Self {
        self.add_stream(Stream::new(pathname, name));
        self
    }

    /// Adds a data view and the result its queries return.
    pub fn with_data_view(self, view: DataView, result: QueryResult) -> Self {
        self.state.lock().data_views.push((view, result));
        self
    }

    /// Adds a stream record without recording a call.
    pub fn add_stream(&self, stream: Stream) {
        let mut state = self.state.lock();
        if state.stream(&stream.pathname).is_none() {
            state.streams.push((Stream { bundle_count: 0, ..stream }, Vec::new()));
        }
    }

    /// Stores a bundle without recording a call, returning its SHA-1.
    pub fn seed_bundle(
        &self,
        pathname: &str,
        content_filename: &str,
        content: &[u8],
        uploaded_by: Option<&str>,
    ) -> EngineResult<String> {
        let mut state = self.state.lock();
        let uploaded_on = state.tick();
        state.store(content, content_filename, pathname, uploaded_by, uploaded_on)
    }

    /// Makes the next call of `method` fail with the given fault.
    pub fn fail_next(&self, method: &str, code: i32, message: impl Into<String>) {
        self.state
            .lock()
            .faults
            .insert(method.to_string(), (code, message.into()));
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<DashboardCall> {
        self.state.lock().calls.clone()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Stream record for `pathname`.
    pub fn stream(&self, pathname: &str) -> Option<Stream> {
        self.state.lock().stream(pathname).map(|(s, _)| s.clone())
    }

    /// SHA-1s stored in `pathname`, in upload order.
    pub fn stream_sha1s(&self, pathname: &str) -> Option<Vec<String>> {
        self.state.lock().stream(pathname).map(|(_, m)| m.clone())
    }

    /// Stored content for `sha1`.
    pub fn content(&self, sha1: &str) -> Option<Vec<u8>> {
        self.state.lock().bundles.get(sha1).map(|b| b.content.clone())
    }

    /// Whether `sha1` has been deserialized.
    pub fn is_deserialized(&self, sha1: &str) -> Option<bool> {
        self.state.lock().bundles.get(sha1).map(|b| b.is_deserialized)
    }

    /// Method names as `system.listMethods()` reports them.
    pub fn method_names(&self) -> Vec<String> {
        const METHODS: [&str; 9] = [
            "version",
            "streams",
            "bundles",
            "get",
            "put",
            "deserialize",
            "make_stream",
            "data_views",
            "query_data_view",
        ];
        let prefix = if self.state.lock().namespaced {
            "dashboard."
        } else {
            ""
        };
        let mut names = vec![
            "system.listMethods".to_string(),
            "system.whoami".to_string(),
        ];
        names.extend(METHODS.iter().map(|m| format!("{prefix}{m}")));
        names
    }

    /// Records `call` and returns any fault queued for `method`.
    fn enter(&self, method: &str, call: DashboardCall) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match state.faults.remove(method) {
            Some((code, message)) => Err(fault(code, message)),
            None => Ok(()),
        }
    }
}

impl Dashboard for MemoryDashboard {
    fn list_methods(&self) -> EngineResult<Vec<String>> {
        self.enter("system.listMethods", DashboardCall::ListMethods)?;
        Ok(self.method_names())
    }

    fn version(&self) -> EngineResult<String> {
        self.enter("version", DashboardCall::Version)?;
        Ok(self.state.lock().version.clone())
    }

    fn streams(&self) -> EngineResult<Vec<Stream>> {
        self.enter("streams", DashboardCall::Streams)?;
        Ok(self
            .state
            .lock()
            .streams
            .iter()
            .map(|(s, _)| s.clone())
            .collect())
    }

    fn bundles(&self, pathname: &str) -> EngineResult<Vec<Bundle>> {
        self.enter("bundles", DashboardCall::Bundles(pathname.to_string()))?;
        let state = self.state.lock();
        let (_, members) = state
            .stream(pathname)
            .ok_or_else(|| fault(FAULT_NOT_FOUND, format!("Bundle stream {pathname} not found")))?;
        Ok(members
            .iter()
            .filter_map(|sha1| {
                state.bundles.get(sha1).map(|b| Bundle {
                    content_sha1: sha1.clone(),
                    content_filename: b.content_filename.clone(),
                    content_size: (!state.legacy_bundles).then_some(b.content.len() as u64),
                    uploaded_by: b.uploaded_by.clone(),
                    uploaded_on: Some(b.uploaded_on),
                    is_deserialized: Some(b.is_deserialized),
                })
            })
            .collect())
    }

    fn get(&self, content_sha1: &str) -> EngineResult<BundleContent> {
        self.enter("get", DashboardCall::Get(content_sha1.to_string()))?;
        self.state
            .lock()
            .bundles
            .get(content_sha1)
            .map(|b| BundleContent {
                content: b.content.clone(),
                content_filename: b.content_filename.clone(),
            })
            .ok_or_else(|| fault(FAULT_NOT_FOUND, format!("Bundle {content_sha1} not found")))
    }

    fn put(&self, content: &[u8], content_filename: &str, pathname: &str) -> EngineResult<String> {
        self.enter(
            "put",
            DashboardCall::Put {
                content_sha1: content_sha1(content),
                content_filename: content_filename.to_string(),
                pathname: pathname.to_string(),
            },
        )?;
        let mut state = self.state.lock();
        let uploaded_by = state.whoami.clone();
        let now = Utc::now().naive_utc();
        state.store(content, content_filename, pathname, uploaded_by.as_deref(), now)
    }

    fn deserialize(&self, content_sha1: &str) -> EngineResult<()> {
        self.enter("deserialize", DashboardCall::Deserialize(content_sha1.to_string()))?;
        let mut state = self.state.lock();
        let bundle = state
            .bundles
            .get_mut(content_sha1)
            .ok_or_else(|| fault(FAULT_NOT_FOUND, format!("Bundle {content_sha1} not found")))?;
        bundle.is_deserialized = true;
        Ok(())
    }

    fn make_stream(&self, pathname: &str, name: &str) -> EngineResult<String> {
        self.enter(
            "make_stream",
            DashboardCall::MakeStream {
                pathname: pathname.to_string(),
                name: name.to_string(),
            },
        )?;
        let mut state = self.state.lock();
        if state.stream(pathname).is_some() {
            return Err(fault(
                FAULT_DUPLICATE,
                format!("Stream with the specified pathname already exists: {pathname}"),
            ));
        }
        state.streams.push((Stream::new(pathname, name), Vec::new()));
        Ok(pathname.to_string())
    }

    fn data_views(&self) -> EngineResult<Vec<DataView>> {
        self.enter("data_views", DashboardCall::DataViews)?;
        Ok(self
            .state
            .lock()
            .data_views
            .iter()
            .map(|(v, _)| v.clone())
            .collect())
    }

    fn query_data_view(
        &self,
        name: &str,
        arguments: &BTreeMap<String, String>,
    ) -> EngineResult<QueryResult> {
        self.enter(
            "query_data_view",
            DashboardCall::QueryDataView {
                name: name.to_string(),
                arguments: arguments.clone(),
            },
        )?;
        self.state
            .lock()
            .data_views
            .iter()
            .find(|(v, _)| v.name == name)
            .map(|(_, r)| r.clone())
            .ok_or_else(|| fault(FAULT_NOT_FOUND, format!("Data view {name} not found")))
    }

    fn whoami(&self) -> EngineResult<Option<String>> {
        self.enter("system.whoami", DashboardCall::Whoami)?;
        Ok(self.state.lock().whoami.clone())
    }
}
