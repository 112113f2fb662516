//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `APP_NAME` (optional): display name used in invitation emails
/// - `PUBLIC_BASE_URL` (optional): base URL for invitation links
/// - `PRIVATE_BETA_ENABLED` (optional): restrict registration to invited
///   or approved emails, defaults to false
/// - `OPEN_REGISTRATION_ENABLED` (optional): allow anyone to register when
///   private beta is off, defaults to true
/// - `INVITE_TTL_HOURS` (optional): invitation token lifetime, defaults to 24
/// - `SUBMIT_RATE_LIMIT_MAX` / `SUBMIT_RATE_LIMIT_WINDOW_SECS` (optional):
///   per-IP limit on the public submission endpoint, defaults to 5 per 900s
/// - `RESEND_API_KEY` (optional): email provider key; invitation emails are
///   reported as undeliverable (and logged) when unset
/// - `EMAIL_FROM` / `EMAIL_FROM_NAME` (optional): invitation sender address
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default)]
    pub private_beta_enabled: bool,

    #[serde(default = "default_true")]
    pub open_registration_enabled: bool,

    #[serde(default = "default_invite_ttl_hours")]
    pub invite_ttl_hours: i64,

    #[serde(default = "default_submit_rate_limit_max")]
    pub submit_rate_limit_max: u32,

    #[serde(default = "default_submit_rate_limit_window_secs")]
    pub submit_rate_limit_window_secs: u64,

    pub resend_api_key: Option<String>,

    #[serde(default = "default_email_from")]
    pub email_from: String,

    pub email_from_name: Option<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_app_name() -> String {
    "Private Beta".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_invite_ttl_hours() -> i64 {
    24
}

fn default_submit_rate_limit_max() -> u32 {
    5
}

fn default_submit_rate_limit_window_secs() -> u64 {
    900
}

fn default_email_from() -> String {
    "noreply@localhost".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - Cross-field validation fails (see [`Config::validate`])
    pub fn from_env() -> anyhow::Result<Self> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate values envy cannot check on its own.
    ///
    /// The base URL must parse so invitation links can be built from it, and
    /// the sender address must look like an email when a provider key is set.
    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.public_base_url)
            .map_err(|e| anyhow::anyhow!("PUBLIC_BASE_URL is not a valid URL: {e}"))?;

        if self.invite_ttl_hours <= 0 {
            anyhow::bail!("INVITE_TTL_HOURS must be positive");
        }
        if self.submit_rate_limit_max == 0 {
            anyhow::bail!("SUBMIT_RATE_LIMIT_MAX must be positive");
        }

        if self.resend_api_key.is_some() && !self.email_from.contains('@') {
            anyhow::bail!("EMAIL_FROM must be an email address");
        }

        Ok(())
    }

    /// Formatted `From` header value for invitation emails.
    ///
    /// Falls back to the application display name when no explicit sender
    /// name is configured.
    pub fn email_from_header(&self) -> String {
        let name = self.email_from_name.as_deref().unwrap_or(&self.app_name);
        format!("{} <{}>", name, self.email_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            database_url: "postgres://localhost/whitelist".to_string(),
            server_port: default_port(),
            app_name: default_app_name(),
            public_base_url: default_public_base_url(),
            private_beta_enabled: false,
            open_registration_enabled: true,
            invite_ttl_hours: default_invite_ttl_hours(),
            submit_rate_limit_max: default_submit_rate_limit_max(),
            submit_rate_limit_window_secs: default_submit_rate_limit_window_secs(),
            resend_api_key: None,
            email_from: default_email_from(),
            email_from_name: None,
        }
    }

    #[test]
    fn defaults_are_sane() {
        let config = base_config();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.invite_ttl_hours, 24);
        assert_eq!(config.submit_rate_limit_max, 5);
        assert!(config.open_registration_enabled);
        assert!(!config.private_beta_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_header_falls_back_to_app_name() {
        let config = base_config();
        assert_eq!(
            config.email_from_header(),
            "Private Beta <noreply@localhost>"
        );
    }

    #[test]
    fn from_header_uses_explicit_sender_name() {
        let config = Config {
            email_from_name: Some("The Team".to_string()),
            email_from: "invites@example.com".to_string(),
            ..base_config()
        };
        assert_eq!(config.email_from_header(), "The Team <invites@example.com>");
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let config = Config {
            public_base_url: "not a url".to_string(),
            ..base_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_ttl() {
        let config = Config {
            invite_ttl_hours: 0,
            ..base_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_sender_when_provider_configured() {
        let config = Config {
            resend_api_key: Some("re_test_key".to_string()),
            email_from: "not-an-address".to_string(),
            ..base_config()
        };
        assert!(config.validate().is_err());
    }
}
