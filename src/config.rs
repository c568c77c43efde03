use std::time::Duration;

use anyhow::Context;
use config::{Config, File};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::ConnectOptions;

use crate::domain::SubscriberEmail;
use crate::notifications::Senders;

#[derive(Clone, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email_client: EmailClientSettings,
    pub captcha: CaptchaSettings,
    pub notifications: NotificationSettings,
}

#[derive(Clone, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Deserialize)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub authorization_token: Secret<String>,
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(Clone, Deserialize)]
pub struct CaptchaSettings {
    pub verify_url: String,
    pub secret_key: Secret<String>,
    /// Scores must be strictly above this to pass.
    pub score_threshold: f64,
    pub timeout_milliseconds: u64,
}

impl CaptchaSettings {
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(Clone, Deserialize)]
pub struct NotificationSettings {
    /// Team inbox that hears about new subscribers and contact messages.
    pub recipient_email: String,
    pub newsletter_sender_email: String,
    pub contact_sender_email: String,
}

impl NotificationSettings {
    pub fn recipient(&self) -> Result<SubscriberEmail, String> {
        SubscriberEmail::parse(self.recipient_email.clone())
    }

    pub fn senders(&self) -> Result<Senders, String> {
        Ok(Senders {
            newsletter: SubscriberEmail::parse(self.newsletter_sender_email.clone())?,
            contact: SubscriberEmail::parse(self.contact_sender_email.clone())?,
        })
    }
}

#[derive(Clone, Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        let mut pg_connection = PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .ssl_mode(ssl_mode);
        pg_connection.log_statements(tracing::log::LevelFilter::Trace);
        pg_connection
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

/// Layers `configuration/base.yaml`, the per-environment file and `APP_*`
/// environment variables (`APP_CAPTCHA__SECRET_KEY=...`).
pub fn get_configuration() -> Result<Settings, anyhow::Error> {
    let base_path =
        std::env::current_dir().context("Failed to determine the current directory.")?;
    let config_dir = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(anyhow::Error::msg)
        .context("Failed to parse APP_ENVIRONMENT.")?;

    let env_config = config::Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true);

    let settings = Config::builder()
        .add_source(File::from(config_dir.join("base")))
        .add_source(File::from(config_dir.join(environment.as_str())))
        .add_source(env_config)
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[derive(Debug, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{other} is not a supported environment. Use either `local` or `production`"
            )),
        }
    }
}
