//! Google Calendar credentials.
//!
//! The client authenticates with a bearer access token. It is read from
//! `FOCUSBOARD_GOOGLE_TOKEN` first and then from the OS keyring, where
//! `focusboard auth set-token` puts it.

use tracing::debug;

use crate::error::CoreError;

/// Environment variable that overrides the stored token.
pub const TOKEN_ENV: &str = "FOCUSBOARD_GOOGLE_TOKEN";

/// Keyring entry holding the access token.
pub const TOKEN_KEY: &str = "google_access_token";

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    const SERVICE: &str = "focusboard";

    pub fn get(key: &str) -> Result<Option<String>, keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)
    }

    pub fn delete(key: &str) -> Result<(), keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// The access token to use, if any.
///
/// A keyring that cannot be reached counts as "no token".
pub fn access_token() -> Option<String> {
    if let Some(token) = token_from_env() {
        return Some(token);
    }
    match keyring_store::get(TOKEN_KEY) {
        Ok(token) => token.filter(|t| !t.trim().is_empty()),
        Err(e) => {
            debug!(error = %e, "keyring unavailable");
            None
        }
    }
}

fn token_from_env() -> Option<String> {
    std::env::var(TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Store a token in the keyring.
pub fn store_access_token(token: &str) -> Result<(), CoreError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(crate::error::ValidationError::MissingField("token".into()).into());
    }
    keyring_store::set(TOKEN_KEY, token)?;
    Ok(())
}

/// Remove the stored token. The environment override is not affected.
pub fn clear_access_token() -> Result<(), CoreError> {
    keyring_store::delete(TOKEN_KEY)?;
    Ok(())
}
