//! SOAP client for the ATS mileage report service.
//!
//! The service exposes a single `wsMileageReport` operation that returns every
//! mileage entry for a device (or all devices) inside a time window.

use mileage_core::config::SoapConfig;
use mileage_core::error::AppError;
use mileage_core::models::{RawDocument, ReportWindow};
use mileage_core::notification::escape_markup;
use mileage_core::traits::MileageSource;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Url};
use tracing::debug;

/// Namespace of the `wsMileageReport` operation.
pub const SERVICE_NAMESPACE: &str = "http://tempuri.org/";

const CONTENT_TYPE_XML: &str = "text/xml; charset=utf-8";

/// HTTP client for the mileage report SOAP endpoint.
///
/// One request per [`fetch`](MileageSource::fetch) call, no retries.
///
/// # Examples
///
/// ```no_run
/// use mileage_client::SoapClient;
/// use mileage_core::{ReportWindow, SoapConfig};
/// use mileage_core::traits::MileageSource;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SoapConfig::new(
///     "https://ats.example.com/Service.asmx",
///     "http://tempuri.org/wsMileageReport",
///     "user",
///     "secret",
///     "ACME",
/// );
/// let client = SoapClient::new(config)?;
/// let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
/// let doc = client.fetch(&ReportWindow::for_day(day)).await?;
/// println!("Received {} bytes", doc.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SoapClient {
    client: Client,
    endpoint: Url,
    config: SoapConfig,
}

impl SoapClient {
    /// Creates a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if a required setting is empty.
    /// Returns `AppError::InvalidUrl` if the endpoint is not a valid URL.
    /// Returns `AppError::TransportError` if the HTTP client cannot be built.
    pub fn new(config: SoapConfig) -> Result<Self, AppError> {
        config.validate()?;

        let endpoint =
            Url::parse(&config.url).map_err(|_| AppError::InvalidUrl(config.url.clone()))?;

        let client = Client::builder()
            .user_agent(concat!("ats-mileage/", env!("CARGO_PKG_VERSION")))
            .timeout(config.http.timeout)
            .build()
            .map_err(|e| AppError::TransportError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Builds the `wsMileageReport` envelope for `window`.
    ///
    /// Credentials are XML-escaped; `DeviceID` is left empty to request
    /// every device of the company.
    pub fn build_envelope(&self, window: &ReportWindow) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
               xmlns:xsd="http://www.w3.org/2001/XMLSchema"
               xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <wsMileageReport xmlns="{ns}">
      <User>
        <UserName>{user}</UserName>
        <Password>{password}</Password>
        <CompanyCode>{company}</CompanyCode>
      </User>
      <DeviceID></DeviceID>
      <Startdate>{start}</Startdate>
      <Enddate>{end}</Enddate>
    </wsMileageReport>
  </soap:Body>
</soap:Envelope>
"#,
            ns = SERVICE_NAMESPACE,
            user = escape_markup(&self.config.username),
            password = escape_markup(&self.config.password),
            company = escape_markup(&self.config.company_code),
            start = window.start_param(),
            end = window.end_param(),
        )
    }

    async fn post(&self, envelope: String) -> Result<String, AppError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_XML))
            .header("SOAPAction", self.config.action.as_str())
            .body(envelope)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::TransportError(format!(
                "HTTP {} from {}",
                status.as_u16(),
                self.endpoint
            )));
        }

        resp.text()
            .await
            .map_err(|e| AppError::TransportError(format!("Failed to read response body: {}", e)))
    }

    fn map_send_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.config.http.timeout.as_secs())
        } else if e.is_connect() {
            AppError::TransportError(format!("Connection failed: {}", e))
        } else {
            AppError::TransportError(e.to_string())
        }
    }
}

impl MileageSource for SoapClient {
    async fn fetch(&self, window: &ReportWindow) -> Result<RawDocument, AppError> {
        debug!(
            endpoint = %self.endpoint,
            company = %self.config.company_code,
            start = %window.start_param(),
            end = %window.end_param(),
            "Sending wsMileageReport request"
        );

        let body = self.post(self.build_envelope(window)).await?;

        debug!(bytes = body.len(), "wsMileageReport response received");
        Ok(RawDocument::from(body))
    }
}
