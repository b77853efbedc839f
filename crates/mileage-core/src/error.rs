use thiserror::Error;

/// Application-wide error types.
///
/// This enum represents all possible errors that can occur while synchronizing
/// mileage readings. It uses the `thiserror` crate for ergonomic error handling
/// and automatic conversion from underlying library errors.
///
/// # Error Conversion
///
/// - `sqlx::Error` → `AppError::DatabaseError`
///
/// Transport, document and notification failures carry a rendered message
/// because the crates that produce them (`reqwest`, `roxmltree`, `lettre`)
/// are not dependencies of the core crate.
///
/// # Examples
///
/// ```
/// use mileage_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::TransportError("HTTP 503 from https://example.com".to_string()))
/// }
///
/// assert!(matches!(example(), Err(AppError::TransportError(_))));
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// Wraps query, insert, commit and rollback failures on an open session.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// The store could not be reached when opening a session.
    ///
    /// Nothing was opened, so there is nothing to roll back or close.
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// A session was used outside its transactional discipline
    /// (insert after commit, double commit, ...).
    #[error("Invalid store session state: {0}")]
    StoreState(String),

    /// The remote report service could not be reached or answered with a
    /// non-success status.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The remote report service did not answer within the configured timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The response body is not well-formed XML.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// The summary notification could not be delivered.
    #[error("Notification error: {0}")]
    NotificationError(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => format!("Database error: {}", e),
            AppError::ConnectionError(msg) => format!(
                "Cannot connect to database: {}\n   Check DATABASE_URL and that PostgreSQL is running.",
                msg
            ),
            AppError::TransportError(msg) => format!(
                "Cannot reach the mileage report service: {}\n   Check SOAP_URL and your network connection.",
                msg
            ),
            AppError::Timeout(secs) => format!(
                "The mileage report service did not answer within {} seconds.\n   Try again later or raise SOAP_TIMEOUT_SECS.",
                secs
            ),
            AppError::MalformedDocument(msg) => format!(
                "The mileage report service returned an unreadable response: {}",
                msg
            ),
            AppError::NotificationError(msg) => format!(
                "Summary mail could not be sent: {}\n   Check the SMTP_* and MAIL_* settings.",
                msg
            ),
            AppError::ConfigError(msg) => format!(
                "Configuration error: {}\n   Check your environment or .env file.",
                msg
            ),
            _ => self.to_string(),
        }
    }
}
