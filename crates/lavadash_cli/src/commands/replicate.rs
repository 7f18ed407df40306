//! `pull`, `backup` and `restore`.

use super::{Console, Status};
use lavadash_engine::replication::filesize_format;
use lavadash_engine::{backup, pull, restore, Dashboard, EngineResult, ReplicationEvent, ReplicationObserver};
use std::io::{self, Write};
use std::path::Path;

/// Prints replication progress as it happens.
///
/// Observers cannot fail, so the first write error is kept and returned
/// by [`ProgressPrinter::finish`].
pub struct ProgressPrinter<'c, 'a> {
    console: &'c mut Console<'a>,
    failed: Option<io::Error>,
}

impl<'c, 'a> ProgressPrinter<'c, 'a> {
    /// Prints to `console.out`.
    pub fn new(console: &'c mut Console<'a>) -> Self {
        Self { console, failed: None }
    }

    fn print(&mut self, text: &str, newline: bool) {
        if self.failed.is_some() {
            return;
        }
        let out = &mut self.console.out;
        let result = if newline {
            writeln!(out, "{text}")
        } else {
            write!(out, "{text}").and_then(|()| out.flush())
        };
        if let Err(err) = result {
            self.failed = Some(err);
        }
    }

    /// Returns the first write error, if any.
    pub fn finish(self) -> io::Result<()> {
        match self.failed {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl ReplicationObserver for ProgressPrinter<'_, '_> {
    fn on_event(&mut self, event: &ReplicationEvent) {
        match event {
            ReplicationEvent::CheckingStreams => self.print("Checking local and remote streams", true),
            ReplicationEvent::StreamCreated { .. } => {}
            ReplicationEvent::StreamStatus {
                pathname,
                missing_bundles,
                missing_bytes,
            } => {
                let line = match (missing_bundles, missing_bytes) {
                    (0, _) => format!("Stream {pathname} is up to date"),
                    (_, Some(bytes)) => format!("Stream {pathname} needs update ({})", filesize_format(*bytes)),
                    (_, None) => format!("Stream {pathname} needs update (no estimate available)"),
                };
                self.print(&line, true);
            }
            ReplicationEvent::BundleFetching { content_sha1 } => {
                self.print(&format!("Getting {content_sha1}"), false);
            }
            ReplicationEvent::BundleFetched { size, .. } => {
                self.print(&format!(" got {}, storing ", filesize_format(*size as u64)), false);
            }
            ReplicationEvent::BundleStored { duplicate, .. } => {
                if *duplicate {
                    self.print("already present (in another stream)", true);
                } else {
                    self.print("done", true);
                }
            }
            ReplicationEvent::ProcessingStream { pathname } => {
                self.print(&format!("Processing stream {pathname}"), true);
            }
            ReplicationEvent::BackedUp { content_sha1 } => {
                self.print(&format!(" * Backing up bundle {content_sha1}"), true);
            }
            ReplicationEvent::Restoring { content_sha1 } => {
                self.print(&format!(" * Restoring bundle {content_sha1}"), true);
            }
            ReplicationEvent::SkippedBundle { content_sha1 } => {
                self.print(&format!(" * Skipping bundle {content_sha1} (no metadata)"), true);
            }
        }
    }
}

/// Copies bundles from `remote` into `local`.
pub fn pull_streams<R, L>(remote: &R, local: &L, streams: &[String], console: &mut Console<'_>) -> EngineResult<Status>
where
    R: Dashboard + ?Sized,
    L: Dashboard + ?Sized,
{
    let mut printer = ProgressPrinter::new(console);
    pull(remote, local, streams, &mut printer)?;
    printer.finish()?;
    Ok(Status::Success)
}

/// Writes every accessible bundle under `root`.
pub fn backup_to<D: Dashboard + ?Sized>(server: &D, root: &Path, console: &mut Console<'_>) -> EngineResult<Status> {
    let mut printer = ProgressPrinter::new(console);
    backup(server, root, &mut printer)?;
    printer.finish()?;
    Ok(Status::Success)
}

/// Uploads a backup tree back into `server`.
pub fn restore_from<D: Dashboard + ?Sized>(server: &D, root: &Path, console: &mut Console<'_>) -> EngineResult<Status> {
    let mut printer = ProgressPrinter::new(console);
    restore(server, root, &mut printer)?;
    printer.finish()?;
    Ok(Status::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lavadash_engine::MemoryDashboard;
    use tempfile::TempDir;

    fn printed(events: &[ReplicationEvent]) -> String {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut console = Console::new(&mut out, &mut err);
        let mut printer = ProgressPrinter::new(&mut console);
        for event in events {
            printer.on_event(event);
        }
        printer.finish().unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn pull_progress_lines() {
        let out = printed(&[
            ReplicationEvent::CheckingStreams,
            ReplicationEvent::StreamStatus {
                pathname: "/a/".into(),
                missing_bundles: 2,
                missing_bytes: Some(2048),
            },
            ReplicationEvent::BundleFetching {
                content_sha1: "aa".into(),
            },
            ReplicationEvent::BundleFetched {
                content_sha1: "aa".into(),
                size: 10,
            },
            ReplicationEvent::BundleStored {
                content_sha1: "aa".into(),
                duplicate: false,
            },
            ReplicationEvent::BundleFetching {
                content_sha1: "bb".into(),
            },
            ReplicationEvent::BundleFetched {
                content_sha1: "bb".into(),
                size: 1024,
            },
            ReplicationEvent::BundleStored {
                content_sha1: "bb".into(),
                duplicate: true,
            },
            ReplicationEvent::StreamStatus {
                pathname: "/b/".into(),
                missing_bundles: 1,
                missing_bytes: None,
            },
            ReplicationEvent::StreamStatus {
                pathname: "/c/".into(),
                missing_bundles: 0,
                missing_bytes: Some(0),
            },
        ]);
        assert_eq!(
            out,
            "Checking local and remote streams\n\
             Stream /a/ needs update (2.00 KB)\n\
             Getting aa got 10 bytes, storing done\n\
             Getting bb got 1.00 KB, storing already present (in another stream)\n\
             Stream /b/ needs update (no estimate available)\n\
             Stream /c/ is up to date\n"
        );
    }

    #[test]
    fn download_is_announced_before_it_finishes() {
        let out = printed(&[
            ReplicationEvent::BundleFetching {
                content_sha1: "cc".into(),
            },
        ]);
        assert_eq!(out, "Getting cc");
    }

    #[test]
    fn failed_download_leaves_the_announcement() {
        let remote = MemoryDashboard::new().with_stream("/anonymous/", "");
        let sha1 = remote.seed_bundle("/anonymous/", "a.json", b"{}", None).unwrap();
        remote.fail_next("get", 500, "storage offline");

        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = pull_streams(&remote, &MemoryDashboard::new(), &[], &mut Console::new(&mut out, &mut err));
        assert!(result.is_err());
        assert!(String::from_utf8(out).unwrap().ends_with(&format!("Getting {sha1}")));
    }

    #[test]
    fn backup_and_restore_print_each_bundle() {
        let source = MemoryDashboard::new().with_stream("/anonymous/", "");
        let sha1 = source.seed_bundle("/anonymous/", "a.json", b"{}", None).unwrap();
        let dir = TempDir::new().unwrap();

        let mut out = Vec::new();
        let mut err = Vec::new();
        backup_to(&source, dir.path(), &mut Console::new(&mut out, &mut err)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("Processing stream /anonymous/\n * Backing up bundle {sha1}\n")
        );

        let target = MemoryDashboard::new();
        let mut out = Vec::new();
        restore_from(&target, dir.path(), &mut Console::new(&mut out, &mut err)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("Processing stream /anonymous/\n * Restoring bundle {sha1}\n")
        );
        assert_eq!(target.stream_sha1s("/anonymous/"), Some(vec![sha1]));
    }

    #[test]
    fn pull_prints_a_stream_summary() {
        let remote = MemoryDashboard::new().with_stream("/anonymous/", "");
        remote.seed_bundle("/anonymous/", "a.json", b"{}", None).unwrap();
        let local = MemoryDashboard::new();

        let mut out = Vec::new();
        let mut err = Vec::new();
        let status = pull_streams(&remote, &local, &[], &mut Console::new(&mut out, &mut err)).unwrap();
        assert_eq!(status, Status::Success);
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Checking local and remote streams\nStream /anonymous/ needs update (2 bytes)\n"));
        assert!(out.ends_with(", storing done\n"));
    }
}
