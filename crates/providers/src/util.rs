//! Shared helpers for the wire client.

use scribe_domain::config::AuthConfig;
use scribe_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeouts map to [`Error::Timeout`]; everything else at this level is a
/// connection failure, [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key from an [`AuthConfig`].
///
/// Precedence:
/// 1. `key` field (plaintext — warn)
/// 2. `env` field (reads environment variable)
/// 3. `service` + `account` → OS keychain via `keyring`
/// 4. Error (`Error::Auth` — fails session start)
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    if let Some(ref key) = auth.key {
        tracing::warn!(
            "API key loaded from plaintext config field 'key' — \
             prefer 'env' or keychain 'service'+'account' instead"
        );
        return Ok(key.clone());
    }

    if let Some(ref env_var) = auth.env {
        return std::env::var(env_var).map_err(|_| {
            Error::Auth(format!(
                "environment variable '{env_var}' not set or not valid UTF-8"
            ))
        });
    }

    if let (Some(ref service), Some(ref account)) = (&auth.service, &auth.account) {
        return resolve_from_keychain(service, account);
    }

    Err(Error::Auth(
        "no API key configured: set 'key', 'env', or keychain \
         'service'+'account' in the provider auth config"
            .into(),
    ))
}

/// Read a secret from the OS keychain.
///
/// The `keyring` crate wraps the platform-native credential stores (macOS
/// Keychain, Windows Credential Manager, Linux Secret Service).  Fails on
/// headless systems with no keychain daemon.
fn resolve_from_keychain(service: &str, account: &str) -> Result<String> {
    let entry = keyring::Entry::new(service, account)
        .map_err(|e| Error::Auth(format!("keyring entry creation failed: {e}")))?;
    entry
        .get_password()
        .map_err(|e| Error::Auth(format!("keyring get_password failed: {e}")))
}
