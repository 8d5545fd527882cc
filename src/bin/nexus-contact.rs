//! Submit the NovaNexus contact form from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Through the site's relay route
//! nexus-contact --relay-url https://novanexus.ai/api/send-email \
//!     --name "Ada" --email ada@example.com --message "Hello!"
//!
//! # Straight to the email API; the message is read from stdin
//! RESEND_API_KEY=re_... nexus-contact --name "Ada" --email ada@example.com < note.txt
//! ```
//!
//! Exits with status 1 when the form is invalid or delivery fails.

use std::io::{IsTerminal, Read};
use std::process::ExitCode;

use arrrg::CommandLine;
use tracing_subscriber::EnvFilter;

use nexus_chat::contact::{ContactArgs, ContactClient, ContactConfig};

const LOG_ENV: &str = "NEXUS_CHAT_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let (args, _) = ContactArgs::from_command_line_relaxed("nexus-contact [OPTIONS]");
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: ContactArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let config = ContactConfig::resolve(&args)?;
    let stdin_message = if args.message.is_none() && !std::io::stdin().is_terminal() {
        let mut message = String::new();
        std::io::stdin().read_to_string(&mut message)?;
        Some(message)
    } else {
        None
    };
    let form = args.form(stdin_message);

    let client = ContactClient::new(config.delivery()?);
    let outcome = client.submit(&form).await?;
    println!("{}", outcome.notice());
    Ok(outcome.is_sent())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
