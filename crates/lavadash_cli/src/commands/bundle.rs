//! Single-bundle commands: `put`, `get` and `deserialize`.

use super::{rephrase, Console, Status};
use lavadash_engine::{
    deserialize_bundle, get_bundle, put_bundle, Dashboard, EngineResult, GetOutcome, FAULT_DUPLICATE,
    FAULT_NOT_FOUND,
};
use std::path::Path;

/// Uploads `local` into the stream `remote`.
pub fn put<D: Dashboard + ?Sized>(
    server: &D,
    local: &Path,
    remote: &str,
    console: &mut Console<'_>,
) -> EngineResult<Status> {
    let sha1 = put_bundle(server, local, remote)
        .map_err(|err| rephrase(err, FAULT_NOT_FOUND, |_| format!("Bundle stream {remote} does not exist")))
        .map_err(|err| {
            rephrase(err, FAULT_DUPLICATE, |_| {
                "You have already uploaded this bundle to the dashboard".to_string()
            })
        })?;
    console.line(format!("Stored as bundle {sha1}"))?;
    Ok(Status::Success)
}

/// Downloads a bundle, refusing to clobber an existing file.
pub fn get<D: Dashboard + ?Sized>(
    server: &D,
    sha1: &str,
    output: Option<&Path>,
    overwrite: bool,
    console: &mut Console<'_>,
) -> EngineResult<Status> {
    let outcome = get_bundle(server, sha1, output, overwrite)
        .map_err(|err| rephrase(err, FAULT_NOT_FOUND, |_| format!("Bundle {sha1} does not exist")))?;
    match outcome {
        GetOutcome::Written { path, .. } => {
            console.line(format!("Downloaded bundle {sha1} to file '{}'", path.display()))?;
            Ok(Status::Success)
        }
        GetOutcome::AlreadyExists { path } => {
            console.error(format!("File '{}' already exists", path.display()))?;
            console.error("You may pass --overwrite to write over it")?;
            Ok(Status::Refused)
        }
    }
}

/// Asks the server to deserialize a bundle.
pub fn deserialize<D: Dashboard + ?Sized>(server: &D, sha1: &str, console: &mut Console<'_>) -> EngineResult<Status> {
    deserialize_bundle(server, sha1)
        .map_err(|err| rephrase(err, FAULT_NOT_FOUND, |_| format!("Bundle {sha1} does not exist")))
        .map_err(|err| {
            rephrase(err, FAULT_DUPLICATE, |fault| {
                format!("Unable to deserialize bundle {sha1}\n{fault}")
            })
        })?;
    console.line(format!("Bundle {sha1} deserialized"))?;
    Ok(Status::Success)
}
