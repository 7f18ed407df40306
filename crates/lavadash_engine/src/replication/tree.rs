//! On-disk backup layout.
//!
//! ```text
//! BACKUP_DIR/
//!   %2Fanonymous%2F/            one directory per stream, pathname percent-encoded
//!     metadata.json             {pathname, name, user, group}
//!     {sha1}.json               raw bundle bytes
//!     {sha1}.metadata.json      {uploaded_by, uploaded_on, content_filename, content_sha1, content_size}
//! ```
//!
//! A bundle belongs to the tree only when both its blob and its sidecar
//! exist; the blob is always written first.

use crate::error::{EngineError, EngineResult};
use chrono::NaiveDateTime;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Stream metadata file name.
pub const STREAM_METADATA_FILE: &str = "metadata.json";
/// Suffix of bundle blob files.
pub const BUNDLE_SUFFIX: &str = ".json";
/// Suffix of bundle sidecar files.
pub const SIDECAR_SUFFIX: &str = ".metadata.json";
/// Timestamp layout used in sidecars.
pub const UPLOADED_ON_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Bytes left unescaped in stream directory names.
const STREAM_DIR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Checks that `sha1` is 40 lowercase hex digits and so safe to use as
/// a file name stem.
pub fn check_sha1(sha1: &str) -> EngineResult<()> {
    let valid = sha1.len() == 40 && sha1.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if valid {
        Ok(())
    } else {
        Err(EngineError::InvalidSha1 { sha1: sha1.to_string() })
    }
}

/// Directory name for a stream pathname.
pub fn stream_dir_name(pathname: &str) -> String {
    utf8_percent_encode(pathname, STREAM_DIR).to_string()
}

/// Stream pathname for a directory name.
///
/// `+` decodes to a space so trees written with form quoting restore
/// correctly; [`stream_dir_name`] always escapes `+` itself.
pub fn stream_pathname(dir_name: &str) -> Option<String> {
    let spaced = dir_name.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Contents of a stream's `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMetadata {
    /// Stream pathname.
    #[serde(default)]
    pub pathname: String,
    /// Stream name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning user.
    #[serde(default)]
    pub user: Option<String>,
    /// Owning group.
    #[serde(default)]
    pub group: Option<String>,
}

/// Contents of a `{sha1}.metadata.json` sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMetadata {
    /// Uploader, `null` for anonymous uploads.
    pub uploaded_by: Option<String>,
    /// Upload time in [`UPLOADED_ON_FORMAT`].
    pub uploaded_on: Option<String>,
    /// Original file name.
    pub content_filename: String,
    /// SHA-1 of the blob.
    pub content_sha1: String,
    /// Blob size in bytes.
    pub content_size: Option<u64>,
}

impl BundleMetadata {
    /// Formats an upload timestamp for a sidecar.
    pub fn format_uploaded_on(at: Option<NaiveDateTime>) -> Option<String> {
        at.map(|at| at.format(UPLOADED_ON_FORMAT).to_string())
    }
}

/// A bundle file pair found in a stream directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// SHA-1 taken from the file name.
    pub content_sha1: String,
    /// Path of the blob.
    pub blob: PathBuf,
    /// Path of the sidecar; may not exist.
    pub sidecar: PathBuf,
}

/// A stream directory found in a backup tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Decoded stream pathname.
    pub pathname: String,
    /// Directory path.
    pub dir: PathBuf,
}

/// A backup tree rooted at a directory.
#[derive(Debug, Clone)]
pub struct BackupTree {
    root: PathBuf,
}

impl BackupTree {
    /// Opens a tree rooted at `root`; nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding `pathname`.
    pub fn stream_dir(&self, pathname: &str) -> PathBuf {
        self.root.join(stream_dir_name(pathname))
    }

    /// Creates the root directory if needed.
    pub fn ensure_root(&self) -> EngineResult<()> {
        create_dir(&self.root)
    }

    /// Creates the directory for `metadata.pathname` and rewrites its metadata.
    pub fn write_stream(&self, metadata: &StreamMetadata) -> EngineResult<PathBuf> {
        let dir = self.stream_dir(&metadata.pathname);
        create_dir(&dir)?;
        write_json(&dir.join(STREAM_METADATA_FILE), metadata)?;
        Ok(dir)
    }

    /// Writes the blob, then its sidecar.
    ///
    /// Fails without touching the disk unless the SHA-1 passes [`check_sha1`].
    pub fn write_bundle(&self, dir: &Path, content: &[u8], metadata: &BundleMetadata) -> EngineResult<()> {
        check_sha1(&metadata.content_sha1)?;
        let blob = dir.join(format!("{}{BUNDLE_SUFFIX}", metadata.content_sha1));
        fs::write(&blob, content).map_err(|source| EngineError::Backup { path: blob, source })?;
        let sidecar = dir.join(format!("{}{SIDECAR_SUFFIX}", metadata.content_sha1));
        write_json(&sidecar, metadata)
    }

    /// Stream directories, sorted by directory name.
    ///
    /// Plain files at the top level are ignored, as are directory names
    /// that do not decode to UTF-8.
    pub fn streams(&self) -> EngineResult<Vec<StreamEntry>> {
        let mut entries = Vec::new();
        for (name, path) in sorted_entries(&self.root)? {
            if !path.is_dir() {
                continue;
            }
            match name.to_str().and_then(stream_pathname) {
                Some(pathname) => entries.push(StreamEntry { pathname, dir: path }),
                None => tracing::warn!(path = %path.display(), "skipping undecodable stream directory"),
            }
        }
        Ok(entries)
    }

    /// Reads a stream's `metadata.json`, if present.
    pub fn read_stream_metadata(&self, dir: &Path) -> EngineResult<Option<StreamMetadata>> {
        let path = dir.join(STREAM_METADATA_FILE);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Bundle blobs in a stream directory, sorted by SHA-1.
    pub fn bundles(&self, dir: &Path) -> EngineResult<Vec<BundleEntry>> {
        let mut entries = Vec::new();
        for (name, path) in sorted_entries(dir)? {
            let Some(name) = name.to_str() else { continue };
            if name == STREAM_METADATA_FILE || name.ends_with(SIDECAR_SUFFIX) {
                continue;
            }
            let Some(sha1) = name.strip_suffix(BUNDLE_SUFFIX) else {
                continue;
            };
            if !path.is_file() {
                continue;
            }
            entries.push(BundleEntry {
                content_sha1: sha1.to_string(),
                sidecar: dir.join(format!("{sha1}{SIDECAR_SUFFIX}")),
                blob: path,
            });
        }
        Ok(entries)
    }

    /// Reads a bundle's blob and sidecar.
    pub fn read_bundle(&self, entry: &BundleEntry) -> EngineResult<(Vec<u8>, BundleMetadata)> {
        let metadata = read_json(&entry.sidecar)?;
        let content = fs::read(&entry.blob).map_err(|source| EngineError::Backup {
            path: entry.blob.clone(),
            source,
        })?;
        Ok((content, metadata))
    }
}

fn create_dir(path: &Path) -> EngineResult<()> {
    fs::create_dir_all(path).map_err(|source| EngineError::Backup {
        path: path.to_path_buf(),
        source,
    })
}

fn sorted_entries(dir: &Path) -> EngineResult<Vec<(std::ffi::OsString, PathBuf)>> {
    let backup_err = |source| EngineError::Backup {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(backup_err)?
        .map(|entry| entry.map(|e| (e.file_name(), e.path())))
        .collect::<Result<Vec<_>, _>>()
        .map_err(backup_err)?;
    entries.sort();
    Ok(entries)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> EngineResult<()> {
    let text = serde_json::to_string(value).map_err(|source| EngineError::BackupMetadata {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| EngineError::Backup {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> EngineResult<T> {
    let text = fs::read_to_string(path).map_err(|source| EngineError::Backup {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| EngineError::BackupMetadata {
        path: path.to_path_buf(),
        source,
    })
}
