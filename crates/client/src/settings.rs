//! Environment-based client settings.
//!
//! Connection parameters come from `MDMFORGE_*` environment variables,
//! optionally seeded from a `.env` file. `load_dotenv()` must be called
//! explicitly; the `DOTENV_DISABLED` variable gates it off in tests.

use secrecy::SecretString;
use std::time::Duration;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::models::Credentials;

pub const ENV_SERVER_URL: &str = "MDMFORGE_SERVER_URL";
pub const ENV_USERNAME: &str = "MDMFORGE_USERNAME";
pub const ENV_PASSWORD: &str = "MDMFORGE_PASSWORD";

/// Settings for building and connecting a client.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub request_timeout: Duration,
    pub resource_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: None,
            username: None,
            password: None,
            request_timeout: Duration::from_secs(30),
            resource_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self {
            server_url: std::env::var(ENV_SERVER_URL).ok(),
            username: std::env::var(ENV_USERNAME).ok(),
            password: std::env::var(ENV_PASSWORD)
                .ok()
                .map(|value| SecretString::new(value.into())),
            ..Self::default()
        }
    }

    /// Load environment variables from a `.env` file if present.
    ///
    /// If the `DOTENV_DISABLED` environment variable is set to "true" or "1",
    /// the `.env` file will not be loaded (useful for testing).
    pub fn load_dotenv(self) -> Self {
        if !dotenv_disabled() {
            dotenvy::dotenv().ok();
            debug!("loaded .env file if present");
        }
        self
    }

    /// Credentials from the environment, or an error naming what is missing.
    pub fn credentials(&self) -> Result<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(ApiError::Storage(format!(
                "{ENV_USERNAME} and {ENV_PASSWORD} must both be set"
            ))),
        }
    }
}

fn dotenv_disabled() -> bool {
    matches!(
        std::env::var("DOTENV_DISABLED").ok().as_deref(),
        Some("true") | Some("1")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_from_env_reads_connection_variables() {
        temp_env::with_vars(
            [
                (ENV_SERVER_URL, Some("https://mdm.example.com")),
                (ENV_USERNAME, Some("admin")),
                (ENV_PASSWORD, Some("hunter2")),
            ],
            || {
                let settings = ClientSettings::from_env();
                assert_eq!(
                    settings.server_url.as_deref(),
                    Some("https://mdm.example.com")
                );
                let creds = settings.credentials().unwrap();
                assert_eq!(creds.username, "admin");
                assert_eq!(creds.password.expose_secret(), "hunter2");
            },
        );
    }

    #[test]
    fn test_missing_credentials_is_an_error() {
        temp_env::with_vars(
            [
                (ENV_SERVER_URL, Some("https://mdm.example.com")),
                (ENV_USERNAME, None::<&str>),
                (ENV_PASSWORD, None),
            ],
            || {
                let settings = ClientSettings::from_env();
                assert!(matches!(
                    settings.credentials(),
                    Err(ApiError::Storage(_))
                ));
            },
        );
    }

    #[test]
    fn test_defaults_carry_bounded_timeouts() {
        let settings = ClientSettings::default();
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.resource_timeout, Duration::from_secs(60));
    }
}
