use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as ReqwestClient;
use url::Url;

use crate::client::{build_http_client, parse_endpoint, post_json};
use crate::contact::{ContactForm, EmailApiClient, NotificationEmail};
use crate::error::{Error, Result};
use crate::observability::{CONTACT_FAILURES, CONTACT_SUBMISSIONS};

/// Shown after a submission is accepted.
pub const SENT_TEXT: &str = "Thank you for your message!";

/// Shown after a submission fails for any reason.
pub const FAILED_TEXT: &str = "Failed to send message. Please try again.";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Somewhere a validated contact form can be delivered.
#[async_trait::async_trait]
pub trait ContactDelivery: Send + Sync {
    /// Deliver one form.  Exactly one attempt; no retry.
    async fn deliver(&self, form: &ContactForm) -> Result<()>;
}

/// Posts the form as JSON to a relay route, which sends the email.
#[derive(Clone, Debug)]
pub struct RelayClient {
    client: ReqwestClient,
    endpoint: Url,
    timeout: Duration,
}

impl RelayClient {
    /// Creates a client for the relay at `endpoint`.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_options(endpoint, None)
    }

    /// Creates a client with a custom timeout.
    pub fn with_options(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoint: parse_endpoint(endpoint)?,
            timeout,
        })
    }

    /// The relay endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl ContactDelivery for RelayClient {
    async fn deliver(&self, form: &ContactForm) -> Result<()> {
        // Any 2xx counts; the body is not inspected.
        post_json(&self.client, &self.endpoint, form, self.timeout).await?;
        Ok(())
    }
}

/// Performs the relay's job in-process: compose the notification and hand it
/// to the email API.
#[async_trait::async_trait]
impl ContactDelivery for EmailApiClient {
    async fn deliver(&self, form: &ContactForm) -> Result<()> {
        self.send(&NotificationEmail::compose(form)).await?;
        Ok(())
    }
}

/// What the visitor sees after submitting.
#[derive(Debug, Clone)]
pub enum ContactOutcome {
    /// The delivery accepted the form.
    Sent,
    /// Delivery failed; the error is kept for logging.
    Failed {
        /// Why delivery failed.
        error: Error,
    },
}

impl ContactOutcome {
    /// The fixed notice for this outcome.
    pub fn notice(&self) -> &'static str {
        match self {
            ContactOutcome::Sent => SENT_TEXT,
            ContactOutcome::Failed { .. } => FAILED_TEXT,
        }
    }

    /// Returns true if the form was delivered.
    pub fn is_sent(&self) -> bool {
        matches!(self, ContactOutcome::Sent)
    }
}

/// Submits contact forms through a [`ContactDelivery`].
#[derive(Clone)]
pub struct ContactClient {
    delivery: Arc<dyn ContactDelivery>,
}

impl ContactClient {
    /// Creates a client over the given delivery.
    pub fn new(delivery: Arc<dyn ContactDelivery>) -> Self {
        Self { delivery }
    }

    /// Validates and delivers a form.
    ///
    /// An invalid form is returned as an error and never reaches the
    /// network.  Delivery failures are absorbed into
    /// [`ContactOutcome::Failed`].
    pub async fn submit(&self, form: &ContactForm) -> Result<ContactOutcome> {
        form.validate()?;
        CONTACT_SUBMISSIONS.click();
        match self.delivery.deliver(form).await {
            Ok(()) => {
                tracing::info!("contact form delivered");
                Ok(ContactOutcome::Sent)
            }
            Err(error) => {
                CONTACT_FAILURES.click();
                tracing::warn!(error = %error, "contact form delivery failed");
                Ok(ContactOutcome::Failed { error })
            }
        }
    }
}

impl std::fmt::Debug for ContactClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactClient").finish_non_exhaustive()
    }
}
