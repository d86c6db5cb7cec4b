//! Vendor-account credential resolution.
//!
//! The controller core only cares about presence or absence; storage
//! lives in the OS keyring under one service name, with environment
//! variables as a non-interactive override (CI, containers). Secrets
//! never touch the config file.

use keyring::Entry;
use secrecy::SecretString;
use tracing::debug;

use crate::error::ConfigError;

/// Keyring service the account entries are filed under.
pub const KEYRING_SERVICE: &str = "kasactl";

const EMAIL_KEY: &str = "email";
const PASSWORD_KEY: &str = "password";

const EMAIL_ENV: &str = "KASACTL_EMAIL";
const PASSWORD_ENV: &str = "KASACTL_PASSWORD";

/// A resolved vendor account.
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// Resolve credentials: environment first, then the keyring.
///
/// `Ok(None)` means no credentials are configured anywhere -- callers
/// decide whether that is an error for their operation.
pub fn resolve_credentials() -> Result<Option<Credentials>, ConfigError> {
    if let (Ok(email), Ok(password)) = (std::env::var(EMAIL_ENV), std::env::var(PASSWORD_ENV)) {
        debug!("credentials resolved from environment");
        return Ok(Some(Credentials {
            email,
            password: SecretString::from(password),
        }));
    }

    let Some(email) = read_entry(EMAIL_KEY)? else {
        return Ok(None);
    };
    let Some(password) = read_entry(PASSWORD_KEY)? else {
        return Ok(None);
    };
    debug!("credentials resolved from keyring");
    Ok(Some(Credentials {
        email,
        password: SecretString::from(password),
    }))
}

/// Store credentials in the keyring, replacing any existing entries.
pub fn store_credentials(email: &str, password: &str) -> Result<(), ConfigError> {
    Entry::new(KEYRING_SERVICE, EMAIL_KEY)?.set_password(email)?;
    Entry::new(KEYRING_SERVICE, PASSWORD_KEY)?.set_password(password)?;
    Ok(())
}

/// Remove stored credentials. Absent entries are not an error.
pub fn clear_credentials() -> Result<(), ConfigError> {
    for key in [EMAIL_KEY, PASSWORD_KEY] {
        match Entry::new(KEYRING_SERVICE, key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn read_entry(key: &str) -> Result<Option<String>, ConfigError> {
    match Entry::new(KEYRING_SERVICE, key)?.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    // One test exercises the whole store/resolve/clear cycle: the mock
    // credential builder is process-global.
    #[test]
    fn keyring_cycle_with_mock_store() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());

        assert!(resolve_credentials().unwrap().is_none());

        store_credentials("kim@example.net", "hunter2").unwrap();
        let creds = resolve_credentials().unwrap().unwrap();
        assert_eq!(creds.email, "kim@example.net");
        assert_eq!(creds.password.expose_secret(), "hunter2");

        clear_credentials().unwrap();
        assert!(resolve_credentials().unwrap().is_none());
        // Clearing twice is fine.
        clear_credentials().unwrap();
    }
}
