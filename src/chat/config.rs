//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! configuration file, and the resolved [`ChatConfig`].  Values are layered:
//! command line over config file over environment over defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variable supplying the webhook URL.
pub const WEBHOOK_ENV: &str = "NEXUS_CHAT_WEBHOOK";

/// Command-line arguments for the nexus-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Conversational webhook endpoint.
    #[arrrg(optional, "Webhook URL (default: $NEXUS_CHAT_WEBHOOK)", "URL")]
    pub webhook_url: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "Path to a YAML config file", "FILE")]
    pub config: Option<String>,

    /// Where the session identifier is persisted.
    #[arrrg(optional, "Session state file (default: platform data dir)", "FILE")]
    pub state_file: Option<String>,

    /// Per-request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Comma-separated context tags sent with each message.
    #[arrrg(optional, "Comma-separated context tags", "TAGS")]
    pub tags: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// On-disk form of the configuration.  Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfigFile {
    /// Conversational webhook endpoint.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Session state file.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    /// Context tags sent with each message.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Whether to use ANSI colors.
    #[serde(default)]
    pub color: Option<bool>,
}

impl ChatConfigFile {
    /// Loads a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Self::parse(&contents)
    }

    /// Parses a configuration document.
    pub fn parse(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after layering the
/// command line, config file and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// The conversational webhook endpoint.
    pub webhook_url: Option<String>,

    /// Upper bound on one request/response exchange.
    pub request_timeout: Duration,

    /// Explicit session state file; `None` uses the default location.
    pub state_file: Option<PathBuf>,

    /// Context tags sent with each message.
    pub selected_tags: Vec<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Webhook: unset
    /// - Timeout: 60 seconds
    /// - Tags: none
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            webhook_url: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            state_file: None,
            selected_tags: Vec::new(),
            use_color: true,
        }
    }

    /// Resolves the configuration from command-line arguments.
    ///
    /// Reads the config file named by `--config` if any, then applies the
    /// remaining arguments on top, then falls back to `NEXUS_CHAT_WEBHOOK`.
    pub fn resolve(args: ChatArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => ChatConfigFile::load(path)?,
            None => ChatConfigFile::default(),
        };
        let env_webhook = std::env::var(WEBHOOK_ENV).ok().filter(|s| !s.is_empty());
        Ok(Self::layer(args, file, env_webhook))
    }

    fn layer(args: ChatArgs, file: ChatConfigFile, env_webhook: Option<String>) -> Self {
        let mut config = Self::new().with_file(file);
        if let Some(url) = args.webhook_url {
            config.webhook_url = Some(url);
        }
        if config.webhook_url.is_none() {
            config.webhook_url = env_webhook;
        }
        if let Some(secs) = args.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(path) = args.state_file {
            config.state_file = Some(PathBuf::from(path));
        }
        if let Some(tags) = args.tags {
            config.selected_tags = parse_tags(&tags);
        }
        if args.no_color {
            config.use_color = false;
        }
        config
    }

    /// Applies the values present in a config file.
    pub fn with_file(mut self, file: ChatConfigFile) -> Self {
        if file.webhook_url.is_some() {
            self.webhook_url = file.webhook_url;
        }
        if let Some(secs) = file.timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if file.state_file.is_some() {
            self.state_file = file.state_file;
        }
        if let Some(tags) = file.tags {
            self.selected_tags = normalize_tags(tags);
        }
        if let Some(color) = file.color {
            self.use_color = color;
        }
        self
    }

    /// Sets the webhook URL.
    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the state file path.
    pub fn with_state_file(mut self, path: Option<PathBuf>) -> Self {
        self.state_file = path;
        self
    }

    /// Sets the context tags.
    pub fn with_selected_tags(mut self, tags: Vec<String>) -> Self {
        self.selected_tags = normalize_tags(tags);
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Returns the webhook URL or a configuration error naming where to set it.
    pub fn webhook_url(&self) -> Result<&str> {
        self.webhook_url.as_deref().ok_or_else(|| {
            Error::config(format!(
                "no webhook URL; pass --webhook-url, set webhook_url in the config file, or set {WEBHOOK_ENV}"
            ))
        })
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a comma-separated tag list, dropping blanks and duplicates.
pub fn parse_tags(input: &str) -> Vec<String> {
    normalize_tags(input.split(',').map(str::to_string).collect())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|existing| existing == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
