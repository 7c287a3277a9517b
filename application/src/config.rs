//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use smart_default::SmartDefault;
use url::Url;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,

    /// Cookies configuration.
    pub cookies: Cookies,

    /// Human verification configuration.
    pub captcha: Captcha,

    /// Authentication configuration.
    pub auth: Auth,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    ///
    /// Credentials (cookies) are allowed, so a wildcard is not accepted.
    #[default(vec!["http://localhost:5173".to_owned()])]
    pub origins: Vec<String>,
}

/// Configuration of the session and CSRF cookies.
///
/// Both cookies always share the same attributes.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Cookies {
    /// `SameSite` attribute of the cookies.
    pub same_site: SameSite,

    /// Whether the cookies are sent over HTTPS only.
    ///
    /// Always enabled for [`SameSite::None`].
    pub secure: bool,
}

/// `SameSite` attribute of a cookie.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Cookies are sent for same-site requests only.
    #[default]
    Strict,

    /// Cookies are also sent on top-level cross-site navigations.
    Lax,

    /// Cookies are sent for cross-site requests too.
    None,
}

/// Human verification configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Captcha {
    /// Verification mode.
    pub mode: CaptchaMode,

    /// Secret key of the verification provider.
    ///
    /// Required in [`CaptchaMode::Enforce`].
    pub secret: Option<String>,

    /// URL of the provider's verification endpoint.
    #[default(Url::parse("https://www.google.com/recaptcha/api/siteverify")
        .expect("valid URL"))]
    pub verify_url: Url,

    /// Minimal score a verification must have to be accepted.
    #[default(0.5)]
    pub min_score: f64,

    /// Timeout of a single verification request.
    #[default(time::Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,
}

/// Human verification mode.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CaptchaMode {
    /// Every login must be verified.
    #[default]
    Enforce,

    /// Verification is skipped. Meant for local development only.
    Bypass,
}

/// Authentication configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Auth {
    /// Whether a failed login tells an unknown email apart from a wrong
    /// password.
    ///
    /// Disabled by default, so no account enumeration is possible.
    pub detailed_login_errors: bool,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default("secret".to_owned())]
    pub jwt_secret: String,

    /// Lifetime of a user session.
    #[default(time::Duration::from_secs(60 * 60 * 24))]
    #[serde(with = "humantime_serde")]
    pub session_ttl: time::Duration,

    /// Document store configuration.
    pub documents: Documents,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            jwt_secret,
            session_ttl,
            documents: _,
        } = value;
        Self {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            session_ttl,
        }
    }
}

/// Document store configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Documents {
    /// Base URL of the document store HTTP API.
    ///
    /// Mirroring is disabled if not specified.
    pub base_url: Option<Url>,

    /// Timeout of a single document store request.
    #[default(time::Duration::from_secs(5))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,
}

impl From<Documents> for service::infra::documents::Config {
    fn from(value: Documents) -> Self {
        let Documents { base_url, timeout } = value;
        Self { base_url, timeout }
    }
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("restaurant".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use super::{CaptchaMode, Config, SameSite};

    #[test]
    fn defaults_are_safe() {
        let conf = Config::default();

        assert_eq!(conf.server.cookies.same_site, SameSite::Strict);
        assert_eq!(conf.server.captcha.mode, CaptchaMode::Enforce);
        assert!(!conf.server.auth.detailed_login_errors);
        assert!(conf.service.documents.base_url.is_none());
        assert_eq!(conf.service.session_ttl.as_secs(), 24 * 60 * 60);
    }

    #[test]
    fn loads_without_file() {
        let conf = Config::new("definitely-missing-config").unwrap();

        assert_eq!(conf.server.port, 8080);
        assert!((conf.server.captcha.min_score - 0.5).abs() < f64::EPSILON);
    }
}
