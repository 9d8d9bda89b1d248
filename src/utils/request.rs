use std::fmt;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::debug;
use crate::error::CotendoError;

/// Account credentials for HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Posts a SOAP envelope and returns the raw response body, faults included.
pub trait SoapTransport: Send + Sync {
    fn call(
        &self,
        endpoint: &str,
        action: &str,
        credentials: &Credentials,
        envelope: String,
    ) -> impl Future<Output = Result<String, CotendoError>> + Send;
}

pub struct DefaultSoapClient {
    inner: Client,
}

impl DefaultSoapClient {
    pub fn new() -> Self {
        Self {
            inner: Client::new(),
        }
    }
}

impl Default for DefaultSoapClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SoapTransport for DefaultSoapClient {
    async fn call(
        &self,
        endpoint: &str,
        action: &str,
        credentials: &Credentials,
        envelope: String,
    ) -> Result<String, CotendoError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/xml; charset=utf-8"));
        headers.insert(
            "SOAPAction",
            HeaderValue::from_str(action).map_err(|e| CotendoError::InvalidParam(e.to_string()))?,
        );

        let response = self
            .inner
            .post(endpoint)
            .headers(headers)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .body(envelope)
            .send()
            .await?;

        // Faults arrive with a 500 status and are decoded from the body.
        let status = response.status();
        let text = response.text().await?;
        debug!(action, %status, bytes = text.len(), "SOAP response received");

        Ok(text)
    }
}
