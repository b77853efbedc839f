use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{ArgAction, Parser};
use mileage_core::config::{DEFAULT_SUBJECT_PREFIX, parse_flag};
use mileage_core::{DbConfig, SmtpConfig, SoapConfig, SyncConfig};

static VERSION_INFO: LazyLock<String> = LazyLock::new(|| {
    let version = env!("CARGO_PKG_VERSION");

    let mut commit = option_env!("VERGEN_GIT_SHA")
        .map(|s| s.chars().take(7).collect::<String>())
        .unwrap_or_else(|| "unknown".to_string());
    if option_env!("VERGEN_GIT_DIRTY") == Some("true") {
        commit.push_str(" (dirty)");
    }

    let built = option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown"); // YYYY-MM-DD
    let target = option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown");
    let rustc = option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown");

    format!("{version}\ncommit: {commit}\nbuilt: {built}\ntarget: {target}\nrustc: {rustc}")
});

pub fn version_info() -> &'static str {
    &VERSION_INFO
}

fn flag(value: &str) -> Result<bool, String> {
    parse_flag(value).map_err(|e| e.to_string())
}

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser)]
#[command(name = "ats-mileage")]
#[command(
    author,
    version = version_info(),
    about = "Daily vehicle mileage synchronization from the ATS report service into PostgreSQL"
)]
#[command(after_help = "Examples:
  ats-mileage                         # Synchronize yesterday
  ats-mileage --date 2024-03-15       # Synchronize a specific day
  ats-mileage --json > run.json       # Machine-readable run summary
  ats-mileage --init-schema --verbose # Create the table first, log every phase

Exit status is 0 when the run finished without errors, 1 otherwise.
Settings are read from the environment or a .env file.")]
pub struct Config {
    /// Day to synchronize (defaults to yesterday, local time)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Log every phase transition and record decision
    #[arg(short, long)]
    pub verbose: bool,

    /// Also append logs to this file
    #[arg(long, env = "LOG_FILE", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Create the arac_km_log table and index before running
    #[arg(long)]
    pub init_schema: bool,

    /// SOAP endpoint of the mileage report service
    #[arg(long, env = "SOAP_URL")]
    pub soap_url: String,

    /// SOAPAction header value
    #[arg(long, env = "SOAP_ACTION")]
    pub soap_action: String,

    #[arg(long, env = "SOAP_USERNAME")]
    pub soap_username: String,

    #[arg(long, env = "SOAP_PASSWORD", hide_env_values = true)]
    pub soap_password: String,

    #[arg(long, env = "SOAP_COMPANY_CODE")]
    pub soap_company_code: String,

    /// Report request timeout in seconds
    #[arg(long, env = "SOAP_TIMEOUT_SECS", default_value_t = 60)]
    pub soap_timeout_secs: u64,

    /// PostgreSQL database connection URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 2)]
    pub db_max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[arg(long, env = "DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 30)]
    pub db_acquire_timeout_secs: u64,

    /// Skip devices already stored for the day (1/true/yes/y or 0/false/no/n)
    #[arg(long, env = "DEDUPLICATE", default_value = "true", value_parser = flag, action = ArgAction::Set)]
    pub deduplicate: bool,

    /// Send the run summary by mail [default: on when SMTP_USER, SMTP_PASSWORD,
    /// MAIL_FROM and MAIL_TO are all set]
    #[arg(long, env = "MAIL_ENABLED", value_parser = flag, action = ArgAction::Set)]
    pub mail_enabled: Option<bool>,

    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USER")]
    pub smtp_user: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    #[arg(long, env = "MAIL_FROM")]
    pub mail_from: Option<String>,

    /// Comma-separated recipient list
    #[arg(long, env = "MAIL_TO")]
    pub mail_to: Option<String>,

    #[arg(long, env = "MAIL_SUBJECT_PREFIX", default_value = DEFAULT_SUBJECT_PREFIX)]
    pub mail_subject_prefix: String,
}

impl Config {
    pub fn soap_config(&self) -> SoapConfig {
        SoapConfig::new(
            &self.soap_url,
            &self.soap_action,
            &self.soap_username,
            &self.soap_password,
            &self.soap_company_code,
        )
        .with_timeout(Duration::from_secs(self.soap_timeout_secs))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            max_connections: self.db_max_connections.max(1),
            acquire_timeout: Duration::from_secs(self.db_acquire_timeout_secs),
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::default()
            .with_deduplicate(self.deduplicate)
            .with_subject_prefix(&self.mail_subject_prefix)
    }

    fn mail_settings(&self) -> [Option<&str>; 4] {
        [
            self.smtp_user.as_deref(),
            self.smtp_password.as_deref(),
            self.mail_from.as_deref(),
            self.mail_to.as_deref(),
        ]
        .map(|v| v.filter(|s| !s.trim().is_empty()))
    }

    /// Whether summaries are mailed.
    ///
    /// An explicit `MAIL_ENABLED` wins. Without it, mail is on exactly when
    /// SMTP_USER, SMTP_PASSWORD, MAIL_FROM and MAIL_TO are all set.
    pub fn mail_enabled(&self) -> bool {
        self.mail_enabled
            .unwrap_or_else(|| self.mail_settings().iter().all(Option::is_some))
    }

    /// True when some, but not all, of the mail settings are present and
    /// `MAIL_ENABLED` is unset, so mail stays off.
    pub fn mail_settings_incomplete(&self) -> bool {
        let settings = self.mail_settings();
        self.mail_enabled.is_none()
            && settings.iter().any(Option::is_some)
            && !settings.iter().all(Option::is_some)
    }

    /// SMTP settings, or `None` when mail is disabled.
    pub fn smtp_config(&self) -> Option<SmtpConfig> {
        if !self.mail_enabled() {
            return None;
        }
        let mut smtp = SmtpConfig {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            user: self.smtp_user.clone(),
            password: self.smtp_password.clone(),
            ..SmtpConfig::default()
        };
        if let Some(from) = &self.mail_from {
            smtp = smtp.with_from(from);
        }
        if let Some(to) = &self.mail_to {
            smtp = smtp.with_recipients(to);
        }
        Some(smtp)
    }
}
