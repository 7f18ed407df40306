//! Single-bundle commands: put, get, deserialize.
//!
//! None of these are version gated; they map straight onto the remote
//! method of the same name.

use crate::dashboard::Dashboard;
use crate::error::EngineResult;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result of [`get_bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    /// Bundle content was written to `path`.
    Written {
        /// Destination file.
        path: PathBuf,
        /// Bytes written.
        size: usize,
    },
    /// `path` already exists and overwriting was not requested.
    ///
    /// The server is not contacted in this case.
    AlreadyExists {
        /// Existing file.
        path: PathBuf,
    },
}

/// Uploads the file at `path` into `pathname`, returning the SHA-1 the
/// server assigned.
///
/// The file name sent to the server is `path` as given.
pub fn put_bundle<D: Dashboard + ?Sized>(server: &D, path: &Path, pathname: &str) -> EngineResult<String> {
    let content = fs::read(path)?;
    let filename = path.to_string_lossy();
    debug!(file = %filename, size = content.len(), pathname, "uploading bundle");
    server.put(&content, &filename, pathname)
}

/// Downloads `content_sha1` into `output`, defaulting to a file named
/// after the SHA-1 in the current directory.
pub fn get_bundle<D: Dashboard + ?Sized>(
    server: &D,
    content_sha1: &str,
    output: Option<&Path>,
    overwrite: bool,
) -> EngineResult<GetOutcome> {
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(content_sha1));
    if path.exists() && !overwrite {
        return Ok(GetOutcome::AlreadyExists { path });
    }
    let data = server.get(content_sha1)?;
    fs::write(&path, &data.content)?;
    debug!(content_sha1, path = %path.display(), "bundle downloaded");
    Ok(GetOutcome::Written {
        path,
        size: data.content.len(),
    })
}

/// Asks the server to deserialize `content_sha1`.
pub fn deserialize_bundle<D: Dashboard + ?Sized>(server: &D, content_sha1: &str) -> EngineResult<()> {
    server.deserialize(content_sha1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{content_sha1, DashboardCall, MemoryDashboard};
    use tempfile::tempdir;

    fn server() -> MemoryDashboard {
        MemoryDashboard::new().with_stream("/anonymous/", "")
    }

    #[test]
    fn put_sends_the_path_as_filename() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bundle.json");
        fs::write(&file, b"{\"format\": \"x\"}").unwrap();

        let server = server();
        let sha1 = put_bundle(&server, &file, "/anonymous/").unwrap();
        assert_eq!(sha1, content_sha1(b"{\"format\": \"x\"}"));
        assert_eq!(
            server.calls(),
            vec![DashboardCall::Put {
                content_sha1: sha1,
                content_filename: file.to_string_lossy().into_owned(),
                pathname: "/anonymous/".into(),
            }]
        );
    }

    #[test]
    fn put_of_duplicate_content_reports_409() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("b");
        fs::write(&file, b"same").unwrap();
        let server = server();
        put_bundle(&server, &file, "/anonymous/").unwrap();
        assert!(put_bundle(&server, &file, "/anonymous/").unwrap_err().is_duplicate());
    }

    #[test]
    fn missing_local_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = put_bundle(&server(), &dir.path().join("nope"), "/anonymous/").unwrap_err();
        assert!(matches!(err, crate::EngineError::Io(_)));
    }

    #[test]
    fn get_writes_content() {
        let server = server();
        let sha1 = server.seed_bundle("/anonymous/", "a.json", b"payload", None).unwrap();
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.json");

        let outcome = get_bundle(&server, &sha1, Some(&out), false).unwrap();
        assert_eq!(outcome, GetOutcome::Written { path: out.clone(), size: 7 });
        assert_eq!(fs::read(&out).unwrap(), b"payload");
    }

    #[test]
    fn get_refuses_to_overwrite() {
        let server = server();
        let sha1 = server.seed_bundle("/anonymous/", "a.json", b"new", None).unwrap();
        let dir = tempdir().unwrap();
        let out = dir.path().join("existing");
        fs::write(&out, b"old").unwrap();

        let outcome = get_bundle(&server, &sha1, Some(&out), false).unwrap();
        assert_eq!(outcome, GetOutcome::AlreadyExists { path: out.clone() });
        assert_eq!(fs::read(&out).unwrap(), b"old");
        assert!(server.calls().is_empty());

        get_bundle(&server, &sha1, Some(&out), true).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"new");
    }

    #[test]
    fn get_of_unknown_bundle_is_not_found() {
        let dir = tempdir().unwrap();
        let err = get_bundle(&server(), "ffff", Some(&dir.path().join("x")), false).unwrap_err();
        assert!(err.is_not_found());
        assert!(!dir.path().join("x").exists());
    }

    #[test]
    fn deserialize_marks_bundle() {
        let server = server();
        let sha1 = server.seed_bundle("/anonymous/", "a.json", b"x", None).unwrap();
        deserialize_bundle(&server, &sha1).unwrap();
        assert_eq!(server.is_deserialized(&sha1), Some(true));
    }
}
