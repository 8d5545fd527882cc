//! Contact form submission.
//!
//! A visitor fills in name, email and message.  The form is validated
//! locally, then either posted to a relay route or turned into a notification
//! email and sent straight to the email API.

pub mod config;
pub mod email;
mod form;
mod relay;

pub use config::{ContactArgs, ContactConfig, DeliveryTarget};
pub use email::{EmailApiClient, EmailReceipt, NotificationEmail, escape_html};
pub use form::ContactForm;
pub use relay::{
    ContactClient, ContactDelivery, ContactOutcome, FAILED_TEXT, RelayClient, SENT_TEXT,
};
