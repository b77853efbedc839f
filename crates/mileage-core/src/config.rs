//! Configuration types for the mileage sync components.
//!
//! Every struct here has a `Default` matching the documented environment
//! defaults; the CLI layer fills them from `clap` arguments and `.env`.

use std::fmt;
use std::time::Duration;

use crate::error::AppError;

/// Default subject prefix used in summary mails.
pub const DEFAULT_SUBJECT_PREFIX: &str = "ATS Mileage";

/// Parses a boolean feature flag as it appears in environment variables.
///
/// Accepts `1`, `true`, `yes`, `y` and `0`, `false`, `no`, `n`
/// (case-insensitive, surrounding whitespace ignored).
///
/// # Examples
///
/// ```
/// use mileage_core::config::parse_flag;
///
/// assert!(parse_flag("Yes").unwrap());
/// assert!(!parse_flag(" 0 ").unwrap());
/// assert!(parse_flag("maybe").is_err());
/// ```
pub fn parse_flag(value: &str) -> Result<bool, AppError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        other => Err(AppError::ConfigError(format!(
            "Invalid boolean flag: '{}'. Valid options: 1, true, yes, y, 0, false, no, n",
            other
        ))),
    }
}

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        // A run holds one transaction at a time; a second connection is
        // only used by health checks.
        Self {
            max_connections: 2,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client configuration for the report service.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

/// Connection details and credentials for the SOAP report service.
#[derive(Clone)]
pub struct SoapConfig {
    /// Endpoint URL the envelope is posted to.
    pub url: String,
    /// Value of the `SOAPAction` header.
    pub action: String,
    pub username: String,
    pub password: String,
    pub company_code: String,
    pub http: HttpConfig,
}

impl SoapConfig {
    pub fn new(
        url: impl Into<String>,
        action: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        company_code: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            action: action.into(),
            username: username.into(),
            password: password.into(),
            company_code: company_code.into(),
            http: HttpConfig::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = timeout;
        self
    }

    /// Checks that every field the service requires is present and the
    /// request timeout is non-zero.
    pub fn validate(&self) -> Result<(), AppError> {
        let missing: Vec<&str> = [
            ("SOAP_URL", &self.url),
            ("SOAP_ACTION", &self.action),
            ("SOAP_USERNAME", &self.username),
            ("SOAP_PASSWORD", &self.password),
            ("SOAP_COMPANY_CODE", &self.company_code),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(AppError::ConfigError(format!(
                "Missing SOAP settings: {}",
                missing.join(", ")
            )));
        }
        if self.http.timeout.is_zero() {
            return Err(AppError::ConfigError(
                "SOAP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SoapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoapConfig")
            .field("url", &self.url)
            .field("action", &self.action)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("company_code", &self.company_code)
            .field("http", &self.http)
            .finish()
    }
}

/// SMTP settings for the summary notification.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            user: None,
            password: None,
            from: None,
            to: Vec::new(),
        }
    }
}

impl SmtpConfig {
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Sets recipients from a comma-separated list, dropping blank entries.
    pub fn with_recipients(mut self, list: &str) -> Self {
        self.to = split_recipients(list);
        self
    }

    /// Checks that host, sender and at least one recipient are configured.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.host.trim().is_empty() {
            return Err(AppError::NotificationError("SMTP_HOST is empty".to_string()));
        }
        if self.from.as_deref().is_none_or(|f| f.trim().is_empty()) {
            return Err(AppError::NotificationError("MAIL_FROM is not set".to_string()));
        }
        if self.to.is_empty() {
            return Err(AppError::NotificationError(
                "MAIL_TO has no recipients".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

/// Splits a comma-separated recipient list.
pub fn split_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Behavior switches for one sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Skip records whose device already has a row for the report date.
    pub deduplicate: bool,
    /// Prefix of the notification subject line.
    pub subject_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            deduplicate: true,
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn with_deduplicate(mut self, enabled: bool) -> Self {
        self.deduplicate = enabled;
        self
    }

    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }
}
