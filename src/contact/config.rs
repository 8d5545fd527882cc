//! Configuration for the nexus-contact tool.

use std::sync::Arc;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::contact::{ContactDelivery, ContactForm, EmailApiClient, RelayClient};
use crate::contact::email::DEFAULT_EMAIL_API_URL;
use crate::error::{Error, Result};

/// Environment variable supplying the relay URL.
pub const RELAY_ENV: &str = "NEXUS_CONTACT_RELAY";

/// Environment variable supplying the email API key.
pub const API_KEY_ENV: &str = "RESEND_API_KEY";

/// Command-line arguments for the nexus-contact tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ContactArgs {
    /// Visitor name.
    #[arrrg(optional, "Your name", "NAME")]
    pub name: Option<String>,

    /// Reply address.
    #[arrrg(optional, "Your email address", "EMAIL")]
    pub email: Option<String>,

    /// Message body; read from stdin when omitted.
    #[arrrg(optional, "Message text (default: read stdin)", "TEXT")]
    pub message: Option<String>,

    /// Relay route accepting `{name, email, message}`.
    #[arrrg(optional, "Relay URL (default: $NEXUS_CONTACT_RELAY)", "URL")]
    pub relay_url: Option<String>,

    /// Email API endpoint used when no relay is configured.
    #[arrrg(optional, "Email API URL (default: https://api.resend.com/emails)", "URL")]
    pub email_api_url: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 30)", "SECONDS")]
    pub timeout_secs: Option<u64>,
}

/// How a form gets delivered.
#[derive(Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    /// POST the form to a relay route.
    Relay(String),
    /// Compose the email locally and POST it to the email API.
    EmailApi {
        /// API endpoint.
        url: String,
        /// Bearer key.
        api_key: String,
    },
}

impl std::fmt::Debug for DeliveryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryTarget::Relay(url) => f.debug_tuple("Relay").field(url).finish(),
            DeliveryTarget::EmailApi { url, .. } => f
                .debug_struct("EmailApi")
                .field("url", url)
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}

/// Resolved configuration for contact submissions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactConfig {
    /// Where forms go.
    pub target: DeliveryTarget,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

impl ContactConfig {
    /// Resolves the delivery target from arguments and the environment.
    ///
    /// A relay URL wins over the email API.  Without either a relay URL or
    /// an API key, this is a configuration error.
    pub fn resolve(args: &ContactArgs) -> Result<Self> {
        Self::layer(
            args,
            std::env::var(RELAY_ENV).ok(),
            std::env::var(API_KEY_ENV).ok(),
        )
    }

    fn layer(
        args: &ContactArgs,
        env_relay: Option<String>,
        env_api_key: Option<String>,
    ) -> Result<Self> {
        let relay = args
            .relay_url
            .clone()
            .or(env_relay)
            .filter(|s| !s.trim().is_empty());
        let api_key = env_api_key.filter(|s| !s.trim().is_empty());
        let target = match (relay, api_key) {
            (Some(url), _) => DeliveryTarget::Relay(url),
            (None, Some(api_key)) => DeliveryTarget::EmailApi {
                url: args
                    .email_api_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EMAIL_API_URL.to_string()),
                api_key,
            },
            (None, None) => {
                return Err(Error::config(format!(
                    "nowhere to send the form; pass --relay-url, set {RELAY_ENV}, or set {API_KEY_ENV}"
                )));
            }
        };
        Ok(Self {
            target,
            timeout: args.timeout_secs.map(Duration::from_secs),
        })
    }

    /// Builds the delivery for the configured target.
    pub fn delivery(&self) -> Result<Arc<dyn ContactDelivery>> {
        let delivery: Arc<dyn ContactDelivery> = match &self.target {
            DeliveryTarget::Relay(url) => Arc::new(RelayClient::with_options(url, self.timeout)?),
            DeliveryTarget::EmailApi { url, api_key } => Arc::new(EmailApiClient::with_options(
                api_key.as_str(),
                url,
                self.timeout,
            )?),
        };
        Ok(delivery)
    }
}

impl ContactArgs {
    /// Assembles the form, using `stdin_message` when `--message` is absent.
    pub fn form(&self, stdin_message: Option<String>) -> ContactForm {
        ContactForm::new(
            self.name.clone().unwrap_or_default(),
            self.email.clone().unwrap_or_default(),
            self.message.clone().or(stdin_message).unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_wins() {
        let args = ContactArgs {
            relay_url: Some("https://novanexus.ai/api/send-email".to_string()),
            ..ContactArgs::default()
        };
        let config = ContactConfig::layer(&args, None, Some("re_key".to_string())).unwrap();
        assert_eq!(
            config.target,
            DeliveryTarget::Relay("https://novanexus.ai/api/send-email".to_string())
        );

        let config = ContactConfig::layer(
            &ContactArgs::default(),
            Some("https://env.example.com/relay".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(
            config.target,
            DeliveryTarget::Relay("https://env.example.com/relay".to_string())
        );
    }

    #[test]
    fn email_api_fallback() {
        let args = ContactArgs {
            timeout_secs: Some(4),
            ..ContactArgs::default()
        };
        let config = ContactConfig::layer(&args, Some(" ".to_string()), Some("re_key".to_string()))
            .unwrap();
        assert_eq!(
            config.target,
            DeliveryTarget::EmailApi {
                url: DEFAULT_EMAIL_API_URL.to_string(),
                api_key: "re_key".to_string()
            }
        );
        assert_eq!(config.timeout, Some(Duration::from_secs(4)));
        assert!(config.delivery().is_ok());
        assert!(!format!("{:?}", config.target).contains("re_key"));
    }

    #[test]
    fn nothing_configured() {
        let err = ContactConfig::layer(&ContactArgs::default(), None, None).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn form_from_args() {
        let args = ContactArgs {
            name: Some("Ada".to_string()),
            email: Some("ada@example.com".to_string()),
            ..ContactArgs::default()
        };
        let form = args.form(Some("from stdin\n".to_string()));
        assert_eq!(form.message, "from stdin\n");
        assert!(form.validate().is_ok());
    }
}
