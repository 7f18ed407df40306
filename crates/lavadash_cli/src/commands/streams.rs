//! Stream listing and creation commands.

use super::{rephrase, Console, Status};
use crate::render::{row, DataSetRenderer};
use lavadash_engine::{require, Capability, Dashboard, EngineResult, FAULT_NOT_FOUND};
use std::io::Write;

/// Prints the server version string.
pub fn server_version<D: Dashboard + ?Sized>(server: &D, console: &mut Console<'_>) -> EngineResult<Status> {
    let version = server.version()?;
    console.line(format!("Dashboard server version: {version}"))?;
    Ok(Status::Success)
}

/// Lists the bundle streams visible to the caller.
pub fn streams<D: Dashboard + ?Sized>(server: &D, console: &mut Console<'_>) -> EngineResult<Status> {
    let rows: Vec<_> = server
        .streams()?
        .into_iter()
        .map(|s| {
            row([
                ("pathname", s.pathname),
                ("bundle_count", s.bundle_count.to_string()),
                ("name", s.name),
            ])
        })
        .collect();
    let table = DataSetRenderer::pretty()
        .with_order(["pathname", "bundle_count", "name"])
        .with_title("pathname", "Pathname")
        .with_title("bundle_count", "Number of bundles")
        .with_title("name", "Name")
        .with_formatter("name", |name| {
            if name.is_empty() {
                "(not set)".to_string()
            } else {
                name.to_string()
            }
        })
        .with_empty("There are no streams you can access on the server")
        .with_caption("Bundle streams")
        .render(&rows);
    write!(console.out, "{table}")?;
    Ok(Status::Success)
}

/// Lists the bundles of one stream.
pub fn bundles<D: Dashboard + ?Sized>(
    server: &D,
    pathname: &str,
    console: &mut Console<'_>,
) -> EngineResult<Status> {
    let listed = server.bundles(pathname).map_err(|err| {
        rephrase(err, FAULT_NOT_FOUND, |_| format!("Bundle stream {pathname} does not exist"))
    })?;
    let rows: Vec<_> = listed
        .into_iter()
        .map(|b| {
            row([
                ("content_sha1", b.content_sha1),
                ("content_filename", b.content_filename),
                ("uploaded_by", b.uploaded_by.unwrap_or_else(|| "(anonymous)".to_string())),
                (
                    "uploaded_on",
                    b.uploaded_on
                        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default(),
                ),
                (
                    "is_deserialized",
                    if b.is_deserialized.unwrap_or(false) { "yes" } else { "no" }.to_string(),
                ),
            ])
        })
        .collect();
    let table = DataSetRenderer::pretty()
        .with_order(["content_sha1", "content_filename", "uploaded_by", "uploaded_on", "is_deserialized"])
        .with_title("content_sha1", "SHA1")
        .with_title("content_filename", "File name")
        .with_title("uploaded_by", "Uploader")
        .with_title("uploaded_on", "Upload date")
        .with_title("is_deserialized", "Deserialized?")
        .with_empty("There are no bundles in this stream")
        .with_caption("Bundles")
        .render(&rows);
    write!(console.out, "{table}")?;
    Ok(Status::Success)
}

/// Creates a bundle stream.
pub fn make_stream<D: Dashboard + ?Sized>(
    server: &D,
    pathname: &str,
    name: &str,
    console: &mut Console<'_>,
) -> EngineResult<Status> {
    require(server, Capability::MakeStream)?;
    let created = server.make_stream(pathname, name)?;
    console.line(format!("Bundle stream {created} created"))?;
    Ok(Status::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lavadash_engine::{DashboardCall, EngineError, MemoryDashboard};

    fn run<F>(f: F) -> (EngineResult<Status>, String)
    where
        F: FnOnce(&mut Console<'_>) -> EngineResult<Status>,
    {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = f(&mut Console::new(&mut out, &mut err));
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn prints_server_version() {
        let server = MemoryDashboard::new().with_version("0.4.0.candidate.2");
        let (status, out) = run(|c| server_version(&server, c));
        assert_eq!(status.unwrap(), Status::Success);
        assert_eq!(out, "Dashboard server version: 0.4.0.candidate.2\n");
    }

    #[test]
    fn stream_table_marks_unnamed_streams() {
        let server = MemoryDashboard::new()
            .with_stream("/anonymous/", "")
            .with_stream("/public/team/", "Team");
        server.seed_bundle("/anonymous/", "a.json", b"{}", None).unwrap();

        let (_, out) = run(|c| streams(&server, c));
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("Bundle streams"));
        assert!(lines[1].chars().all(|c| c == '='));
        assert_eq!(lines[2], format!("{:^13} | Number of bundles | {:^9}", "Pathname", "Name"));
        assert_eq!(lines[3], "-".repeat(13 + 3 + 17 + 3 + 9));
        assert_eq!(lines[4], format!("{:13} | {:17} | (not set)", "/anonymous/", "1"));
        assert_eq!(lines[5], format!("/public/team/ | {:17} | Team     ", "0"));
    }

    #[test]
    fn empty_listings() {
        let server = MemoryDashboard::new().with_stream("/anonymous/", "");
        let (_, out) = run(|c| bundles(&server, "/anonymous/", c));
        assert_eq!(out, "There are no bundles in this stream\n");

        let server = MemoryDashboard::new();
        let (_, out) = run(|c| streams(&server, c));
        assert_eq!(out, "There are no streams you can access on the server\n");
    }

    #[test]
    fn bundle_table_shows_uploader_and_state() {
        let server = MemoryDashboard::new().with_stream("/anonymous/", "");
        let sha1 = server
            .seed_bundle("/anonymous/", "run.json", b"{\"a\": 1}", Some("alice"))
            .unwrap();
        server.seed_bundle("/anonymous/", "anon.json", b"{}", None).unwrap();
        server.deserialize(&sha1).unwrap();

        let (_, out) = run(|c| bundles(&server, "/anonymous/", c));
        let alice = out.lines().find(|l| l.starts_with(&sha1)).unwrap();
        assert!(alice.contains("run.json"));
        assert!(alice.contains("alice"));
        assert!(alice.trim_end().ends_with("yes"));
        let anon = out.lines().find(|l| l.contains("anon.json")).unwrap();
        assert!(anon.contains("(anonymous)"));
        assert!(anon.trim_end().ends_with("no"));
    }

    #[test]
    fn missing_stream_is_rephrased() {
        let server = MemoryDashboard::new();
        let (result, _) = run(|c| bundles(&server, "/nope/", c));
        assert!(matches!(
            result.unwrap_err(),
            EngineError::Command(m) if m == "Bundle stream /nope/ does not exist"
        ));
    }

    #[test]
    fn make_stream_checks_version_first() {
        let server = MemoryDashboard::new();
        let (status, out) = run(|c| make_stream(&server, "/anonymous/x/", "X", c));
        assert_eq!(status.unwrap(), Status::Success);
        assert_eq!(out, "Bundle stream /anonymous/x/ created\n");

        let old = MemoryDashboard::new().with_version("0.2.0.final.0");
        let (result, _) = run(|c| make_stream(&old, "/anonymous/x/", "", c));
        assert!(matches!(result, Err(EngineError::InsufficientServerVersion { .. })));
        assert!(!old.calls().iter().any(DashboardCall::is_write));
    }
}
