//! Turns engine errors into user-facing diagnostics.

use super::{Console, Status};
use lavadash_engine::{Endpoint, EndpointStyle, EngineError, NetworkFailure, FAULT_INTERNAL};

/// Diagnostic lines for `err`.
pub fn diagnostics(err: &EngineError) -> Vec<String> {
    match err {
        EngineError::Network { url, kind, message } => {
            let mut lines = vec![format!("Unable to connect to server at {url}")];
            match kind {
                NetworkFailure::ConnectionRefused => {
                    lines.push("Connection was refused.".to_string());
                    let local = Endpoint::parse(url, EndpointStyle::XmlRpc)
                        .map(|e| e.is_local_dev_server())
                        .unwrap_or(false);
                    if local {
                        lines.push("Perhaps the server is not running?".to_string());
                    }
                }
                NetworkFailure::Unresolved => lines.push("Unable to resolve address".to_string()),
                NetworkFailure::Other => lines.push(message.clone()),
            }
            lines
        }
        EngineError::Http { status, reason, .. } => vec![
            "Unable to exchange XML-RPC message with dashboard server".to_string(),
            format!("HTTP error code: {status}/{reason}"),
        ],
        EngineError::Fault { code, message } if *code == FAULT_INTERNAL => vec![
            "Dashboard server has experienced internal error".to_string(),
            message.clone(),
        ],
        other => other.to_string().lines().map(str::to_string).collect(),
    }
}

/// Prints the diagnostic for `err` and returns the exit status.
pub fn report(err: &EngineError, console: &mut Console<'_>) -> Status {
    tracing::debug!(error = ?err, "command failed");
    for line in diagnostics(err) {
        if console.error(line).is_err() {
            break;
        }
    }
    Status::Failure
}
