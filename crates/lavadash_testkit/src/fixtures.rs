//! Test fixtures and dashboard helpers.
//!
//! Provides sample bundles, pre-populated dashboards and scratch
//! directories for backup trees.

use lavadash_engine::{content_sha1, MemoryDashboard};
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Default stream every dashboard has.
pub const ANONYMOUS: &str = "/anonymous/";

/// A small but realistic bundle document, unique per `index`.
pub fn sample_bundle(index: usize) -> Vec<u8> {
    let document = json!({
        "format": "Dashboard Bundle Format 1.3",
        "test_runs": [{
            "test_id": "stream",
            "analyzer_assigned_uuid": format!("00000000-0000-4000-8000-{index:012}"),
            "analyzer_assigned_date": "2011-06-01T12:00:00Z",
            "time_check_performed": false,
            "test_results": [
                {"test_case_id": "copy", "result": "pass", "measurement": 100 + index},
            ],
        }],
    });
    serde_json::to_vec_pretty(&document).expect("sample bundle serializes")
}

/// A dashboard with two streams and three bundles.
///
/// `/anonymous/` holds `sample_bundle(0)` and `sample_bundle(1)`,
/// `/anonymous/second/` holds `sample_bundle(2)`.
pub fn populated_dashboard() -> MemoryDashboard {
    let dashboard = MemoryDashboard::new()
        .with_stream(ANONYMOUS, "Anonymous")
        .with_stream("/anonymous/second/", "Second");
    for (index, pathname) in [ANONYMOUS, ANONYMOUS, "/anonymous/second/"].iter().enumerate() {
        dashboard
            .seed_bundle(pathname, &format!("bundle-{index}.json"), &sample_bundle(index), Some("alice"))
            .expect("seeding a fresh dashboard succeeds");
    }
    dashboard
}

/// Seeds `dashboard` with `layout`, creating streams as needed.
///
/// Returns the SHA-1s stored per stream, in `layout` order. Content
/// repeated across the layout is skipped, as the server would refuse it.
pub fn seed_layout(dashboard: &MemoryDashboard, layout: &[(String, Vec<Vec<u8>>)]) -> Vec<(String, Vec<String>)> {
    let mut seeded = Vec::new();
    for (pathname, contents) in layout {
        dashboard.add_stream(lavadash_protocol::Stream::new(pathname.as_str(), ""));
        let mut sha1s = Vec::new();
        for (index, content) in contents.iter().enumerate() {
            if dashboard.content(&content_sha1(content)).is_some() {
                continue;
            }
            let sha1 = dashboard
                .seed_bundle(pathname, &format!("{index}.json"), content, None)
                .expect("stream was just added");
            sha1s.push(sha1);
        }
        seeded.push((pathname.clone(), sha1s));
    }
    seeded
}

/// A scratch directory for a backup tree, removed on drop.
pub struct TempBackup {
    dir: TempDir,
}

impl TempBackup {
    /// Creates an empty scratch directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Path of the backup root, which does not exist until written.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("backup")
    }

    /// The scratch directory itself.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for TempBackup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lavadash_engine::Dashboard;

    #[test]
    fn sample_bundles_are_distinct_json() {
        let a: serde_json::Value = serde_json::from_slice(&sample_bundle(0)).unwrap();
        assert_eq!(a["format"], "Dashboard Bundle Format 1.3");
        assert_ne!(sample_bundle(0), sample_bundle(1));
    }

    #[test]
    fn populated_dashboard_layout() {
        let dashboard = populated_dashboard();
        assert_eq!(dashboard.stream_sha1s(ANONYMOUS).unwrap().len(), 2);
        assert_eq!(dashboard.stream_sha1s("/anonymous/second/").unwrap().len(), 1);
        assert_eq!(dashboard.bundles(ANONYMOUS).unwrap()[0].uploaded_by.as_deref(), Some("alice"));
    }

    #[test]
    fn seed_layout_skips_repeated_content() {
        let dashboard = MemoryDashboard::new();
        let seeded = seed_layout(
            &dashboard,
            &[
                ("/a/".to_string(), vec![b"x".to_vec(), b"x".to_vec()]),
                ("/b/".to_string(), vec![b"x".to_vec(), b"y".to_vec()]),
            ],
        );
        assert_eq!(seeded[0].1.len(), 1);
        assert_eq!(seeded[1].1, vec![content_sha1(b"y")]);
    }

    #[test]
    fn temp_backup_root_is_fresh() {
        let backup = TempBackup::new();
        assert!(!backup.root().exists());
        assert!(backup.path().is_dir());
    }
}
