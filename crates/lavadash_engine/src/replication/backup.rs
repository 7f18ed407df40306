//! Dashboard to disk.

use super::tree::{check_sha1, BackupTree, BundleMetadata, StreamMetadata};
use super::{ReplicationEvent, ReplicationObserver};
use crate::dashboard::Dashboard;
use crate::error::EngineResult;
use std::path::Path;
use tracing::{debug, info};

/// Outcome of a backup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    /// Streams written.
    pub streams: usize,
    /// Bundles written.
    pub bundles: usize,
    /// Bytes of bundle content written.
    pub bytes: u64,
}

/// Copies every stream and bundle visible on `server` into `root`.
///
/// Existing files are overwritten; nothing is ever deleted, so bundles
/// removed from the server stay in the tree.
pub fn backup<D, O>(server: &D, root: &Path, observer: &mut O) -> EngineResult<BackupReport>
where
    D: Dashboard + ?Sized,
    O: ReplicationObserver + ?Sized,
{
    let tree = BackupTree::new(root);
    tree.ensure_root()?;

    let mut report = BackupReport::default();
    for stream in server.streams()? {
        observer.on_event(&ReplicationEvent::ProcessingStream {
            pathname: stream.pathname.clone(),
        });
        let dir = tree.write_stream(&StreamMetadata {
            pathname: stream.pathname.clone(),
            name: Some(stream.name.clone()),
            user: stream.user.clone(),
            group: stream.group.clone(),
        })?;
        report.streams += 1;

        for bundle in server.bundles(&stream.pathname)? {
            check_sha1(&bundle.content_sha1)?;
            observer.on_event(&ReplicationEvent::BackedUp {
                content_sha1: bundle.content_sha1.clone(),
            });
            let data = server.get(&bundle.content_sha1)?;
            let size = data.content.len() as u64;
            let metadata = BundleMetadata {
                uploaded_by: bundle.uploaded_by,
                uploaded_on: BundleMetadata::format_uploaded_on(bundle.uploaded_on),
                content_filename: bundle.content_filename,
                content_sha1: bundle.content_sha1,
                content_size: Some(bundle.content_size.unwrap_or(size)),
            };
            tree.write_bundle(&dir, &data.content, &metadata)?;
            debug!(content_sha1 = %metadata.content_sha1, size, "bundle written");
            report.bundles += 1;
            report.bytes += size;
        }
    }

    info!(
        root = %root.display(),
        streams = report.streams,
        bundles = report.bundles,
        "backup finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::memory::{content_sha1, DashboardCall, MemoryDashboard};
    use lavadash_protocol::{Bundle, BundleContent, DataView, QueryResult, Stream};
    use std::collections::BTreeMap;
    use crate::replication::tree::stream_dir_name;
    use crate::replication::Quiet;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn backup_writes_metadata_blob_and_sidecar() {
        let server = MemoryDashboard::new().with_stream("/x y/", "spaced");
        let sha1 = server
            .seed_bundle("/x y/", "bundle.json", b"\xff\x00binary", Some("alice"))
            .unwrap();
        let dir = tempdir().unwrap();
        let root = dir.path().join("backup");

        let report = backup(&server, &root, &mut Quiet).unwrap();
        assert_eq!(report, BackupReport { streams: 1, bundles: 1, bytes: 8 });

        let stream_dir = root.join(stream_dir_name("/x y/"));
        assert_eq!(stream_dir.file_name().unwrap(), "%2Fx%20y%2F");
        let mut names: Vec<_> = fs::read_dir(&stream_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                format!("{sha1}.json"),
                format!("{sha1}.metadata.json"),
                "metadata.json".to_string()
            ]
        );
        assert_eq!(fs::read(stream_dir.join(format!("{sha1}.json"))).unwrap(), b"\xff\x00binary");

        let stream: serde_json::Value =
            serde_json::from_slice(&fs::read(stream_dir.join("metadata.json")).unwrap()).unwrap();
        assert_eq!(stream["pathname"], "/x y/");
        assert_eq!(stream["name"], "spaced");
        assert!(stream["user"].is_null());

        let sidecar: serde_json::Value = serde_json::from_slice(
            &fs::read(stream_dir.join(format!("{sha1}.metadata.json"))).unwrap(),
        )
        .unwrap();
        assert_eq!(sidecar["uploaded_by"], "alice");
        assert_eq!(sidecar["content_filename"], "bundle.json");
        assert_eq!(sidecar["content_sha1"], content_sha1(b"\xff\x00binary"));
        assert_eq!(sidecar["content_size"], 8);
        assert!(sidecar["uploaded_on"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn legacy_servers_still_record_sizes() {
        let server = MemoryDashboard::new()
            .with_legacy_bundles()
            .with_stream("/anonymous/", "");
        let sha1 = server.seed_bundle("/anonymous/", "a", b"abc", None).unwrap();
        let dir = tempdir().unwrap();
        backup(&server, dir.path(), &mut Quiet).unwrap();

        let sidecar = dir
            .path()
            .join(stream_dir_name("/anonymous/"))
            .join(format!("{sha1}.metadata.json"));
        let sidecar: serde_json::Value = serde_json::from_slice(&fs::read(sidecar).unwrap()).unwrap();
        assert_eq!(sidecar["content_size"], 3);
    }

    /// Reports every bundle of the wrapped server under a fixed SHA-1.
    struct Renaming {
        inner: MemoryDashboard,
        sha1: &'static str,
    }

    impl Dashboard for Renaming {
        fn list_methods(&self) -> EngineResult<Vec<String>> {
            self.inner.list_methods()
        }
        fn version(&self) -> EngineResult<String> {
            self.inner.version()
        }
        fn streams(&self) -> EngineResult<Vec<Stream>> {
            self.inner.streams()
        }
        fn bundles(&self, pathname: &str) -> EngineResult<Vec<Bundle>> {
            let mut bundles = self.inner.bundles(pathname)?;
            for bundle in &mut bundles {
                bundle.content_sha1 = self.sha1.to_string();
            }
            Ok(bundles)
        }
        fn get(&self, content_sha1: &str) -> EngineResult<BundleContent> {
            self.inner.get(content_sha1)
        }
        fn put(&self, content: &[u8], content_filename: &str, pathname: &str) -> EngineResult<String> {
            self.inner.put(content, content_filename, pathname)
        }
        fn deserialize(&self, content_sha1: &str) -> EngineResult<()> {
            self.inner.deserialize(content_sha1)
        }
        fn make_stream(&self, pathname: &str, name: &str) -> EngineResult<String> {
            self.inner.make_stream(pathname, name)
        }
        fn data_views(&self) -> EngineResult<Vec<DataView>> {
            self.inner.data_views()
        }
        fn query_data_view(&self, name: &str, arguments: &BTreeMap<String, String>) -> EngineResult<QueryResult> {
            self.inner.query_data_view(name, arguments)
        }
        fn whoami(&self) -> EngineResult<Option<String>> {
            self.inner.whoami()
        }
    }

    #[test]
    fn server_sha1_cannot_escape_the_tree() {
        let inner = MemoryDashboard::new().with_stream("/anonymous/", "");
        inner.seed_bundle("/anonymous/", "a.json", b"{}", None).unwrap();
        let server = Renaming {
            inner,
            sha1: "../../escaped",
        };
        let dir = tempdir().unwrap();
        let root = dir.path().join("tree");

        let err = backup(&server, &root, &mut Quiet).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSha1 { ref sha1 } if sha1 == "../../escaped"));
        assert!(!dir.path().join("escaped.json").exists());
        assert!(!server.inner.calls().iter().any(|c| matches!(c, DashboardCall::Get(_))));
    }

    #[test]
    fn backup_is_additive() {
        let dir = tempdir().unwrap();
        let stale = dir.path().join(stream_dir_name("/gone/"));
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("metadata.json"), b"{}").unwrap();

        backup(&MemoryDashboard::new().with_stream("/anonymous/", ""), dir.path(), &mut Quiet)
            .unwrap();
        assert!(stale.join("metadata.json").exists());
    }
}
