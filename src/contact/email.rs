//! Notification emails for contact submissions.
//!
//! The relay turns each submission into one HTML email to the site owner and
//! posts it to a transactional email API.

use std::time::{Duration, Instant};

use reqwest::Client as ReqwestClient;
use reqwest::header::{self, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::{build_http_client, default_headers, parse_endpoint, post_json_with_headers};
use crate::contact::ContactForm;
use crate::error::{Error, Result};
use crate::observability::EMAILS_SENT;

/// Default transactional email endpoint.
pub const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";

/// Sender shown on notification emails.
pub const NOTIFICATION_FROM: &str = "NovaNexus Contact <noreply@novanexus.ai>";

/// Recipient of notification emails.
pub const NOTIFICATION_TO: &str = "contact@novanexus.ai";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An email ready to hand to the email API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEmail {
    /// Sender, with display name.
    pub from: String,
    /// Recipients.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

impl NotificationEmail {
    /// Builds the owner notification for a submission.
    ///
    /// Fields are used as submitted.  User-supplied text is HTML-escaped;
    /// newlines in the message become `<br>`.
    pub fn compose(form: &ContactForm) -> Self {
        let name = escape_html(&form.name);
        let email = escape_html(&form.email);
        let message = escape_html(&form.message)
            .replace("\r\n", "\n")
            .replace('\n', "<br>");
        let html = format!(
            "<h2>New Contact Form Submission</h2>\n\
             <p><strong>Name:</strong> {name}</p>\n\
             <p><strong>Email:</strong> {email}</p>\n\
             <p><strong>Message:</strong></p>\n\
             <p>{message}</p>\n"
        );
        Self {
            from: NOTIFICATION_FROM.to_string(),
            to: vec![NOTIFICATION_TO.to_string()],
            // Headers cannot carry line breaks.
            subject: format!(
                "New Contact Form Submission from {}",
                form.name.replace(['\r', '\n'], " ")
            ),
            html,
        }
    }
}

/// Escapes the five characters that are significant in HTML text and
/// attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Acknowledgement returned by the email API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmailReceipt {
    /// Provider-assigned message id, when returned.
    #[serde(default)]
    pub id: Option<String>,
}

/// Client for the transactional email API.
#[derive(Clone)]
pub struct EmailApiClient {
    client: ReqwestClient,
    endpoint: Url,
    api_key: String,
    timeout: Duration,
}

impl EmailApiClient {
    /// Creates a client for the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_options(api_key, DEFAULT_EMAIL_API_URL, None)
    }

    /// Creates a client with a custom endpoint and timeout.
    pub fn with_options(
        api_key: impl Into<String>,
        endpoint: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::config("email API key is empty"));
        }
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoint: parse_endpoint(endpoint)?,
            api_key,
            timeout,
        })
    }

    /// The endpoint this client posts to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one email.
    pub async fn send(&self, email: &NotificationEmail) -> Result<EmailReceipt> {
        let mut headers = default_headers();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key.trim()))
            .map_err(|_| Error::config("email API key contains invalid characters"))?;
        headers.insert(header::AUTHORIZATION, bearer);

        let start = Instant::now();
        let response =
            post_json_with_headers(&self.client, &self.endpoint, email, self.timeout, headers)
                .await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, self.timeout.as_secs_f64()))?;
        let receipt = if body.trim().is_empty() {
            EmailReceipt::default()
        } else {
            serde_json::from_str(&body)?
        };
        EMAILS_SENT.click();
        tracing::info!(
            id = receipt.id.as_deref().unwrap_or("-"),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "notification email accepted"
        );
        Ok(receipt)
    }
}

impl std::fmt::Debug for EmailApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailApiClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
