//! Bundle replication: dashboard to dashboard, dashboard to disk, and back.
//!
//! All three workflows are restartable. Writes go through the server's
//! SHA-1 deduplication, so a 409 on `put` (or on `make_stream`) means
//! "already there" and the run simply continues.

mod backup;
mod pull;
mod restore;
pub mod tree;

pub use backup::{backup, BackupReport};
pub use pull::{pull, PullReport, StreamPullReport};
pub use restore::{restore, RestoreReport};

/// Progress notification emitted while replicating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationEvent {
    /// Stream lists are being compared.
    CheckingStreams,
    /// A stream missing on the target was created.
    StreamCreated {
        /// Stream pathname.
        pathname: String,
    },
    /// Pull computed the work needed for a stream.
    StreamStatus {
        /// Stream pathname.
        pathname: String,
        /// Number of bundles to transfer.
        missing_bundles: usize,
        /// Bytes to transfer, when every remote bundle reports its size.
        missing_bytes: Option<u64>,
    },
    /// A bundle download from the source is starting.
    BundleFetching {
        /// Bundle SHA-1.
        content_sha1: String,
    },
    /// A bundle was downloaded from the source.
    BundleFetched {
        /// Bundle SHA-1.
        content_sha1: String,
        /// Downloaded size in bytes.
        size: usize,
    },
    /// A bundle was uploaded to the target.
    BundleStored {
        /// Bundle SHA-1.
        content_sha1: String,
        /// True when the target already had the content.
        duplicate: bool,
    },
    /// Backup or restore started on a stream.
    ProcessingStream {
        /// Stream pathname.
        pathname: String,
    },
    /// Backup wrote a bundle to disk.
    BackedUp {
        /// Bundle SHA-1.
        content_sha1: String,
    },
    /// Restore is uploading a bundle from disk.
    Restoring {
        /// Bundle SHA-1.
        content_sha1: String,
    },
    /// Restore skipped a blob without a sidecar.
    SkippedBundle {
        /// Bundle SHA-1.
        content_sha1: String,
    },
}

/// Receives [`ReplicationEvent`]s.
pub trait ReplicationObserver {
    /// Called for every event, in order.
    fn on_event(&mut self, event: &ReplicationEvent);
}

impl<F: FnMut(&ReplicationEvent)> ReplicationObserver for F {
    fn on_event(&mut self, event: &ReplicationEvent) {
        self(event)
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Quiet;

impl ReplicationObserver for Quiet {
    fn on_event(&mut self, _event: &ReplicationEvent) {}
}

/// Formats a byte count the way transfer progress is shown.
///
/// ```
/// use lavadash_engine::replication::filesize_format;
///
/// assert_eq!(filesize_format(100), "100 bytes");
/// assert_eq!(filesize_format(1536), "1.50 KB");
/// ```
pub fn filesize_format(num_bytes: u64) -> String {
    const KB: f64 = 1024.0;
    // Rounded to one decimal, shown with two.
    let format = |value: f64| format!("{:.2}", (value * 10.0).round() / 10.0);
    let n = num_bytes as f64;
    if num_bytes < 1024 {
        format!("{num_bytes} bytes")
    } else if n < KB * KB {
        format!("{} KB", format(n / KB))
    } else if n < KB * KB * KB {
        format!("{} MB", format(n / (KB * KB)))
    } else {
        format!("{} GB", format(n / (KB * KB * KB)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes() {
        assert_eq!(filesize_format(0), "0 bytes");
        assert_eq!(filesize_format(1023), "1023 bytes");
        assert_eq!(filesize_format(1024), "1.00 KB");
        assert_eq!(filesize_format(1100), "1.10 KB");
        assert_eq!(filesize_format(5 * 1024 * 1024 + 300 * 1024), "5.30 MB");
        assert_eq!(filesize_format(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn closures_observe_events() {
        let mut seen = Vec::new();
        let mut observer = |e: &ReplicationEvent| seen.push(e.clone());
        observer.on_event(&ReplicationEvent::CheckingStreams);
        assert_eq!(seen, vec![ReplicationEvent::CheckingStreams]);
    }
}
