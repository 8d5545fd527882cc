use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Serialize;
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    CHAT_REQUESTS, CHAT_REQUEST_DURATION, CHAT_REQUEST_ERRORS, CHAT_REQUEST_TIMEOUTS,
};
use crate::types::{ChatRequest, ChatResponse};

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest slice of an error body kept in [`Error::Api`].
const MAX_ERROR_BODY: usize = 512;

/// The remote side of a chat exchange.
///
/// One call to [`exchange`](ChatTransport::exchange) is exactly one request
/// and one response.  Implementations must not retry.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one request and await its response.
    async fn exchange(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// Client for the conversational webhook.
///
/// Every exchange is a single unauthenticated JSON POST to a fixed endpoint.
#[derive(Clone)]
pub struct WebhookClient {
    client: ReqwestClient,
    endpoint: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl WebhookClient {
    /// Create a client for the given endpoint with the default timeout.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_options(endpoint, None)
    }

    /// Create a client with custom settings.
    pub fn with_options(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = build_http_client(timeout)?;
        Ok(Self {
            client,
            endpoint,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that observes every exchange.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The endpoint this client posts to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = post_json(&self.client, &self.endpoint, request, self.timeout).await?;
        response.json::<ChatResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}

impl std::fmt::Debug for WebhookClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

#[async_trait::async_trait]
impl ChatTransport for WebhookClient {
    async fn exchange(&self, request: &ChatRequest) -> Result<ChatResponse> {
        CHAT_REQUESTS.click();
        if let Some(logger) = &self.logger {
            logger.log_request(request);
        }
        tracing::debug!(endpoint = %self.endpoint, session_id = %request.session_id, "posting chat message");

        let start = Instant::now();
        let result = self.send(request).await;
        CHAT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        match &result {
            Ok(response) => {
                if let Some(logger) = &self.logger {
                    logger.log_response(response);
                }
            }
            Err(err) => {
                CHAT_REQUEST_ERRORS.click();
                if err.is_timeout() {
                    CHAT_REQUEST_TIMEOUTS.click();
                }
                if let Some(logger) = &self.logger {
                    logger.log_failure(err);
                }
                tracing::warn!(error = %err, "chat exchange failed");
            }
        }
        result
    }
}

/// Parse and check an endpoint URL; only http and https are accepted.
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::url(
            format!("unsupported scheme {scheme:?} in {endpoint}"),
            None,
        )),
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<ReqwestClient> {
    ReqwestClient::builder().timeout(timeout).build().map_err(|e| {
        Error::http_client(
            format!("Failed to build HTTP client: {}", e),
            Some(Box::new(e)),
        )
    })
}

pub(crate) fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// POST a JSON body and return the response if its status is 2xx.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &ReqwestClient,
    url: &Url,
    body: &B,
    timeout: Duration,
) -> Result<Response> {
    post_json_with_headers(client, url, body, timeout, default_headers()).await
}

pub(crate) async fn post_json_with_headers<B: Serialize + ?Sized>(
    client: &ReqwestClient,
    url: &Url,
    body: &B,
    timeout: Duration,
    headers: HeaderMap,
) -> Result<Response> {
    let response = client
        .post(url.clone())
        .headers(headers)
        .json(body)
        .send()
        .await
        .map_err(|e| Error::from_reqwest(e, timeout.as_secs_f64()))?;

    if !response.status().is_success() {
        return Err(process_error_response(response).await);
    }
    Ok(response)
}

/// Convert a non-2xx response into an [`Error::Api`].
async fn process_error_response(response: Response) -> Error {
    let status_code = response.status().as_u16();
    match response.text().await {
        Ok(body) => {
            let mut message = body.trim().to_string();
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            Error::api(status_code, message)
        }
        Err(e) => Error::http_client(
            format!("Failed to read error response: {}", e),
            Some(Box::new(e)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = WebhookClient::new("https://hooks.example.com/webhook/abc").unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://hooks.example.com/webhook/abc"
        );
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);

        let client = WebhookClient::with_options(
            "http://localhost:5678/webhook/test",
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_endpoints() {
        assert!(matches!(
            WebhookClient::new("not a url"),
            Err(Error::Url { .. })
        ));
        assert!(matches!(
            WebhookClient::new("ftp://example.com/hook"),
            Err(Error::Url { .. })
        ));
    }

    #[test]
    fn debug_hides_internals() {
        let client = WebhookClient::new("https://hooks.example.com/x").unwrap();
        let rendered = format!("{client:?}");
        assert!(rendered.contains("hooks.example.com"));
        assert!(rendered.contains("logger: false"));
    }
}
