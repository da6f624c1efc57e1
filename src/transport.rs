use crate::errors::AppError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

/// Request headers sent to a provider.
pub type Headers = BTreeMap<String, String>;

/// Raw provider reply: HTTP status code and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Decodes a provider JSON body, tolerating garbage on failed replies.
///
/// Returns the decoded body and the HTTP status when it is non-zero and not
/// 2xx. A failed reply whose body does not decode yields `T::default()` so the
/// normalizer can still report the status code.
pub fn decode_lenient<T>(reply: &TransportResponse, provider: &str) -> Result<(T, Option<u16>), AppError>
where
    T: DeserializeOwned + Default,
{
    let error_code = (reply.status != 0 && !reply.is_success()).then_some(reply.status);

    match serde_json::from_slice::<T>(&reply.body) {
        Ok(body) => Ok((body, error_code)),
        Err(e) if error_code.is_some() => {
            tracing::debug!(
                "{} returned status {} with an unreadable body: {}",
                provider,
                reply.status,
                e
            );
            Ok((T::default(), error_code))
        }
        Err(e) => Err(AppError::Transport(format!(
            "Failed to parse {} response: {}",
            provider, e
        ))),
    }
}

/// The only network seam the providers depend on.
///
/// Implementations must be safe to share between tasks. Non-2xx replies are
/// returned as `Ok`; only failures to get a reply at all are `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        headers: &Headers,
        body: Vec<u8>,
    ) -> Result<TransportResponse, AppError>;

    async fn get(&self, url: &str, headers: &Headers) -> Result<TransportResponse, AppError>;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a new `HttpTransport`.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Per-request deadline; `None` keeps reqwest's default (no timeout).
    pub fn new(timeout: Option<Duration>) -> Result<Self, AppError> {
        Self::build(reqwest::Client::builder(), timeout)
    }

    /// Same as `new`, sending every request through `proxy_url`.
    ///
    /// Some providers only answer whitelisted hosts.
    pub fn with_proxy(timeout: Option<Duration>, proxy_url: &str) -> Result<Self, AppError> {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
            AppError::InternalError(format!("Invalid proxy URL '{}': {}", proxy_url, e))
        })?;
        Self::build(reqwest::Client::builder().proxy(proxy), timeout)
    }

    fn build(
        mut builder: reqwest::ClientBuilder,
        timeout: Option<Duration>,
    ) -> Result<Self, AppError> {
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            AppError::InternalError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> Result<TransportResponse, AppError> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to read response body: {}", e)))?;

        tracing::debug!("Provider replied with status {} ({} bytes)", status, body.len());
        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        headers: &Headers,
        body: Vec<u8>,
    ) -> Result<TransportResponse, AppError> {
        let mut request = self.client.post(url).body(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("POST {} failed: {}", url, e)))?;

        Self::read(response).await
    }

    async fn get(&self, url: &str, headers: &Headers) -> Result<TransportResponse, AppError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("GET {} failed: {}", url, e)))?;

        Self::read(response).await
    }
}
