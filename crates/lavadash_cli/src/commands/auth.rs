//! `auth-add`.

use super::{Console, Status};
use lavadash_engine::{auth_add, AuthAddOptions, ClientConfig, EngineError, EngineResult, HttpClient, TokenStore};
use std::io::Write;

/// Validates and stores a token, asking for it when needed.
pub fn add_token<C, P>(
    options: &AuthAddOptions,
    store: &dyn TokenStore,
    client: C,
    config: &ClientConfig,
    prompt: P,
    console: &mut Console<'_>,
) -> EngineResult<Status>
where
    C: HttpClient,
    P: FnOnce(&str) -> EngineResult<String>,
{
    let credential = auth_add(options, store, client, config, prompt)?;
    console.line(format!("Token added successfully for user {}.", credential.username()))?;
    Ok(Status::Success)
}

/// Reads a token from the terminal without echoing it.
pub fn prompt_for_token(prompt: &str) -> EngineResult<String> {
    std::io::stderr().flush()?;
    rpassword::prompt_password(prompt).map_err(EngineError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lavadash_engine::{LoopbackClient, MemoryDashboard, MemoryTokenStore};
    use lavadash_testkit::prelude::FakeDashboard;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn token_from_file_is_checked_and_stored() {
        let fake = FakeDashboard::new(MemoryDashboard::new()).with_user("alice", "s3cret");
        let dir = TempDir::new().unwrap();
        let token_file = dir.path().join("token");
        fs::write(&token_file, "s3cret\n").unwrap();
        let options = AuthAddOptions::new("https://alice@validation.example.org", "nobody")
            .with_token_file(&token_file);
        let store = MemoryTokenStore::new();

        let mut out = Vec::new();
        let mut err = Vec::new();
        let status = add_token(
            &options,
            &store,
            LoopbackClient::new(fake),
            &ClientConfig::default(),
            |_| unreachable!("token comes from a file"),
            &mut Console::new(&mut out, &mut err),
        )
        .unwrap();
        assert_eq!(status, Status::Success);
        assert_eq!(String::from_utf8(out).unwrap(), "Token added successfully for user alice.\n");
        assert_eq!(
            store
                .get_token_for_host("alice", "validation.example.org")
                .unwrap()
                .as_deref(),
            Some("s3cret")
        );
    }

    #[test]
    fn prompt_is_used_for_the_default_user() {
        let fake = FakeDashboard::new(MemoryDashboard::new());
        let store = MemoryTokenStore::new();
        let options = AuthAddOptions::new("http://example.org", "bob").with_no_check(true);
        let mut asked = String::new();

        let mut out = Vec::new();
        let mut err = Vec::new();
        add_token(
            &options,
            &store,
            LoopbackClient::new(fake),
            &ClientConfig::default(),
            |text| {
                asked = text.to_string();
                Ok("typed-token".to_string())
            },
            &mut Console::new(&mut out, &mut err),
        )
        .unwrap();
        assert_eq!(asked, "Paste token for http://bob@example.org/RPC2/: ");
        assert_eq!(
            store.get_token_for_host("bob", "example.org").unwrap().as_deref(),
            Some("typed-token")
        );
    }
}
