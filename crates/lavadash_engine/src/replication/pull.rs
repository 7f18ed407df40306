//! Dashboard to dashboard replication.

use super::{ReplicationEvent, ReplicationObserver};
use crate::dashboard::Dashboard;
use crate::error::{EngineError, EngineResult};
use crate::gate::{require, Capability};
use lavadash_protocol::Stream;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Outcome of replicating one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamPullReport {
    /// Stream pathname.
    pub pathname: String,
    /// Whether the stream had to be created locally.
    pub created: bool,
    /// Bundles missing locally before the run.
    pub missing: usize,
    /// Bytes missing locally, if the remote reports sizes.
    pub missing_bytes: Option<u64>,
    /// Bundles uploaded into this stream.
    pub transferred: usize,
    /// Bundles the local server already had in another stream.
    pub duplicates: usize,
}

/// Outcome of a whole pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    /// Per-stream results, in remote order.
    pub streams: Vec<StreamPullReport>,
}

impl PullReport {
    /// Bundles uploaded across all streams.
    pub fn transferred(&self) -> usize {
        self.streams.iter().map(|s| s.transferred).sum()
    }

    /// Bundles found to be duplicates across all streams.
    pub fn duplicates(&self) -> usize {
        self.streams.iter().map(|s| s.duplicates).sum()
    }
}

/// Makes `local` a superset of the selected streams of `remote`.
///
/// With an empty `whitelist` every remote stream is pulled; otherwise
/// every whitelisted pathname must exist remotely. Remote state is
/// never modified. Bundles are transferred in remote listing order and
/// a duplicate (409) on upload is counted, not raised.
pub fn pull<R, L, O>(remote: &R, local: &L, whitelist: &[String], observer: &mut O) -> EngineResult<PullReport>
where
    R: Dashboard + ?Sized,
    L: Dashboard + ?Sized,
    O: ReplicationObserver + ?Sized,
{
    require(remote, Capability::Pull)?;
    require(local, Capability::Pull)?;

    observer.on_event(&ReplicationEvent::CheckingStreams);
    let remote_streams = select_streams(remote.streams()?, whitelist)?;
    let local_pathnames: HashSet<String> = local
        .streams()?
        .into_iter()
        .map(|s| s.pathname)
        .collect();

    let mut report = PullReport::default();
    for stream in remote_streams {
        let stream_report = pull_stream(remote, local, &stream, &local_pathnames, observer)?;
        report.streams.push(stream_report);
    }

    info!(
        streams = report.streams.len(),
        transferred = report.transferred(),
        duplicates = report.duplicates(),
        "pull finished"
    );
    Ok(report)
}

fn select_streams(remote: Vec<Stream>, whitelist: &[String]) -> EngineResult<Vec<Stream>> {
    if whitelist.is_empty() {
        return Ok(remote);
    }
    let requested: BTreeSet<&str> = whitelist.iter().map(String::as_str).collect();
    let available: HashSet<&str> = remote.iter().map(|s| s.pathname.as_str()).collect();
    let unavailable: Vec<&str> = requested
        .iter()
        .copied()
        .filter(|p| !available.contains(p))
        .collect();
    if !unavailable.is_empty() {
        return Err(EngineError::usage(format!(
            "Remote stream not found: {}",
            unavailable.join(", ")
        )));
    }
    Ok(remote
        .into_iter()
        .filter(|s| requested.contains(s.pathname.as_str()))
        .collect())
}

fn pull_stream<R, L, O>(
    remote: &R,
    local: &L,
    stream: &Stream,
    local_pathnames: &HashSet<String>,
    observer: &mut O,
) -> EngineResult<StreamPullReport>
where
    R: Dashboard + ?Sized,
    L: Dashboard + ?Sized,
    O: ReplicationObserver + ?Sized,
{
    let pathname = stream.pathname.as_str();
    let mut report = StreamPullReport {
        pathname: pathname.to_string(),
        ..StreamPullReport::default()
    };

    let local_sha1s: HashSet<String> = if local_pathnames.contains(pathname) {
        local
            .bundles(pathname)?
            .into_iter()
            .map(|b| b.content_sha1)
            .collect()
    } else {
        local.make_stream(pathname, &stream.name)?;
        report.created = true;
        observer.on_event(&ReplicationEvent::StreamCreated {
            pathname: pathname.to_string(),
        });
        HashSet::new()
    };

    let remote_bundles = local_missing(remote.bundles(pathname)?, &local_sha1s);
    report.missing = remote_bundles.missing.len();
    report.missing_bytes = remote_bundles.missing_bytes;
    observer.on_event(&ReplicationEvent::StreamStatus {
        pathname: pathname.to_string(),
        missing_bundles: report.missing,
        missing_bytes: report.missing_bytes,
    });

    for content_sha1 in remote_bundles.missing {
        observer.on_event(&ReplicationEvent::BundleFetching {
            content_sha1: content_sha1.clone(),
        });
        let data = remote.get(&content_sha1)?;
        debug!(content_sha1 = %content_sha1, size = data.content.len(), "fetched bundle");
        observer.on_event(&ReplicationEvent::BundleFetched {
            content_sha1: content_sha1.clone(),
            size: data.content.len(),
        });

        let duplicate = match local.put(&data.content, &data.content_filename, pathname) {
            Ok(_) => false,
            Err(err) if err.is_duplicate() => true,
            Err(err) => return Err(err),
        };
        if duplicate {
            report.duplicates += 1;
        } else {
            report.transferred += 1;
        }
        observer.on_event(&ReplicationEvent::BundleStored {
            content_sha1,
            duplicate,
        });
    }
    Ok(report)
}

struct Missing {
    missing: Vec<String>,
    missing_bytes: Option<u64>,
}

/// Remote SHA-1s absent from `local`, in remote order without repeats.
fn local_missing(remote: Vec<lavadash_protocol::Bundle>, local: &HashSet<String>) -> Missing {
    let sized = remote.iter().all(|b| b.content_size.is_some());
    let mut seen = HashSet::new();
    let mut missing = Vec::new();
    let mut bytes = 0u64;
    for bundle in remote {
        if local.contains(&bundle.content_sha1) || !seen.insert(bundle.content_sha1.clone()) {
            continue;
        }
        bytes += bundle.content_size.unwrap_or(0);
        missing.push(bundle.content_sha1);
    }
    Missing {
        missing,
        missing_bytes: sized.then_some(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{content_sha1, DashboardCall, MemoryDashboard};
    use crate::replication::Quiet;

    fn remote() -> MemoryDashboard {
        let remote = MemoryDashboard::new()
            .with_stream("/s1/", "first")
            .with_stream("/s2/", "second");
        remote.seed_bundle("/s1/", "a.json", b"A", None).unwrap();
        remote.seed_bundle("/s1/", "b.json", b"B", None).unwrap();
        remote.seed_bundle("/s2/", "c.json", b"C", None).unwrap();
        remote
    }

    #[test]
    fn pull_transfers_only_missing_bundles() {
        let remote = remote();
        let local = MemoryDashboard::new().with_stream("/s1/", "first");
        local.seed_bundle("/s1/", "a.json", b"A", None).unwrap();

        let report = pull(&remote, &local, &[], &mut Quiet).unwrap();
        assert_eq!(report.transferred(), 2);

        let b = content_sha1(b"B");
        let c = content_sha1(b"C");
        let writes: Vec<_> = local.calls().into_iter().filter(DashboardCall::is_write).collect();
        assert_eq!(
            writes,
            vec![
                DashboardCall::Put {
                    content_sha1: b.clone(),
                    content_filename: "b.json".into(),
                    pathname: "/s1/".into()
                },
                DashboardCall::MakeStream {
                    pathname: "/s2/".into(),
                    name: "second".into()
                },
                DashboardCall::Put {
                    content_sha1: c.clone(),
                    content_filename: "c.json".into(),
                    pathname: "/s2/".into()
                },
            ]
        );
        let gets: Vec<_> = remote
            .calls()
            .into_iter()
            .filter(|c| matches!(c, DashboardCall::Get(_)))
            .collect();
        assert_eq!(gets, vec![DashboardCall::Get(b), DashboardCall::Get(c)]);
        assert!(!remote.calls().iter().any(DashboardCall::is_write));
    }

    #[test]
    fn second_pull_is_a_no_op() {
        let remote = remote();
        let local = MemoryDashboard::new();
        pull(&remote, &local, &[], &mut Quiet).unwrap();
        remote.clear_calls();
        local.clear_calls();

        let report = pull(&remote, &local, &[], &mut Quiet).unwrap();
        assert_eq!(report.transferred(), 0);
        assert!(!local.calls().iter().any(DashboardCall::is_write));
        assert!(!remote
            .calls()
            .iter()
            .any(|c| matches!(c, DashboardCall::Get(_))));
    }

    #[test]
    fn content_in_another_local_stream_is_a_duplicate() {
        let remote = remote();
        let local = MemoryDashboard::new()
            .with_stream("/s1/", "")
            .with_stream("/elsewhere/", "");
        local.seed_bundle("/elsewhere/", "b.json", b"B", None).unwrap();

        let report = pull(&remote, &local, &["/s1/".to_string()], &mut Quiet).unwrap();
        assert_eq!(report.streams.len(), 1);
        assert_eq!(report.streams[0].transferred, 1);
        assert_eq!(report.streams[0].duplicates, 1);
    }

    #[test]
    fn unknown_whitelist_entries_are_all_named() {
        let err = pull(
            &remote(),
            &MemoryDashboard::new(),
            &["/zz/".to_string(), "/s1/".to_string(), "/aa/".to_string()],
            &mut Quiet,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Remote stream not found: /aa/, /zz/");
    }

    #[test]
    fn both_servers_are_gated() {
        let local = MemoryDashboard::new().with_version("0.2.0.final.0");
        let err = pull(&remote(), &local, &[], &mut Quiet).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientServerVersion { .. }));
        assert!(!local.calls().iter().any(DashboardCall::is_write));
    }

    #[test]
    fn other_put_faults_abort_the_run() {
        let remote = remote();
        let local = MemoryDashboard::new();
        local.fail_next("put", 500, "disk full");
        let err = pull(&remote, &local, &[], &mut Quiet).unwrap_err();
        assert_eq!(err.fault_code(), Some(500));
    }

    #[test]
    fn download_start_is_reported_before_a_failing_get() {
        let remote = remote();
        remote.fail_next("get", 500, "storage offline");
        let mut events = Vec::new();
        let err = pull(&remote, &MemoryDashboard::new(), &["/s1/".to_string()], &mut |e: &ReplicationEvent| {
            events.push(e.clone())
        })
        .unwrap_err();
        assert_eq!(err.fault_code(), Some(500));
        assert!(matches!(events.last(), Some(ReplicationEvent::BundleFetching { .. })));
        assert!(!events.iter().any(|e| matches!(e, ReplicationEvent::BundleFetched { .. })));
    }

    #[test]
    fn progress_reports_sizes_when_available() {
        let remote = remote();
        let mut events = Vec::new();
        pull(&remote, &MemoryDashboard::new(), &["/s1/".to_string()], &mut |e: &ReplicationEvent| {
            events.push(e.clone())
        })
        .unwrap();
        assert!(events.contains(&ReplicationEvent::StreamStatus {
            pathname: "/s1/".into(),
            missing_bundles: 2,
            missing_bytes: Some(2),
        }));

        let legacy = MemoryDashboard::new().with_legacy_bundles().with_stream("/s1/", "");
        legacy.seed_bundle("/s1/", "a.json", b"A", None).unwrap();
        let report = pull(&legacy, &MemoryDashboard::new(), &[], &mut Quiet).unwrap();
        assert_eq!(report.streams[0].missing_bytes, None);
        assert_eq!(report.streams[0].transferred, 1);
    }
}
