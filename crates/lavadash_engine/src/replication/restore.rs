//! Disk to dashboard.

use super::tree::BackupTree;
use super::{ReplicationEvent, ReplicationObserver};
use crate::dashboard::Dashboard;
use crate::error::EngineResult;
use crate::gate::{require, Capability};
use std::path::Path;
use tracing::{info, warn};

/// Stream name used when a stream directory has no metadata.
pub const DEFAULT_STREAM_NAME: &str = "Restored from backup";

/// Outcome of a restore run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Stream directories processed.
    pub streams: usize,
    /// Streams that had to be created.
    pub created_streams: usize,
    /// Bundles uploaded.
    pub restored: usize,
    /// Bundles the server already had.
    pub duplicates: usize,
    /// Blobs skipped for lack of a sidecar.
    pub skipped: usize,
}

/// Re-uploads every stream and bundle found under `root` to `server`.
///
/// Existing streams and bundles (409) are left alone, so running a
/// restore twice makes no writes the second time. Entries are processed
/// in sorted name order.
pub fn restore<D, O>(server: &D, root: &Path, observer: &mut O) -> EngineResult<RestoreReport>
where
    D: Dashboard + ?Sized,
    O: ReplicationObserver + ?Sized,
{
    require(server, Capability::Restore)?;

    let tree = BackupTree::new(root);
    let mut report = RestoreReport::default();
    for stream in tree.streams()? {
        observer.on_event(&ReplicationEvent::ProcessingStream {
            pathname: stream.pathname.clone(),
        });
        let name = tree
            .read_stream_metadata(&stream.dir)?
            .and_then(|m| m.name)
            .unwrap_or_else(|| DEFAULT_STREAM_NAME.to_string());
        match server.make_stream(&stream.pathname, &name) {
            Ok(_) => report.created_streams += 1,
            Err(err) if err.is_duplicate() => {}
            Err(err) => return Err(err),
        }
        report.streams += 1;

        for entry in tree.bundles(&stream.dir)? {
            if !entry.sidecar.is_file() {
                warn!(
                    blob = %entry.blob.display(),
                    "skipping bundle without metadata sidecar"
                );
                observer.on_event(&ReplicationEvent::SkippedBundle {
                    content_sha1: entry.content_sha1,
                });
                report.skipped += 1;
                continue;
            }
            let (content, metadata) = tree.read_bundle(&entry)?;
            observer.on_event(&ReplicationEvent::Restoring {
                content_sha1: entry.content_sha1.clone(),
            });
            match server.put(&content, &metadata.content_filename, &stream.pathname) {
                Ok(_) => report.restored += 1,
                Err(err) if err.is_duplicate() => report.duplicates += 1,
                Err(err) => return Err(err),
            }
        }
    }

    info!(
        root = %root.display(),
        streams = report.streams,
        restored = report.restored,
        duplicates = report.duplicates,
        skipped = report.skipped,
        "restore finished"
    );
    Ok(report)
}
