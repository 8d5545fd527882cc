use biometrics::{Collector, Counter, Moments};

pub(crate) static CHAT_REQUESTS: Counter = Counter::new("nexus_chat.client.requests");
pub(crate) static CHAT_REQUEST_ERRORS: Counter = Counter::new("nexus_chat.client.request_errors");
pub(crate) static CHAT_REQUEST_TIMEOUTS: Counter = Counter::new("nexus_chat.client.timeouts");
pub(crate) static CHAT_REQUEST_DURATION: Moments =
    Moments::new("nexus_chat.client.request_duration_seconds");

pub(crate) static SESSION_SUBMITS: Counter = Counter::new("nexus_chat.session.submits");
pub(crate) static SESSION_IGNORED: Counter = Counter::new("nexus_chat.session.ignored");
pub(crate) static SESSION_FAILURES: Counter = Counter::new("nexus_chat.session.failures");
pub(crate) static SESSION_CANCELLED: Counter = Counter::new("nexus_chat.session.cancelled");
pub(crate) static SESSION_DISCARDED: Counter = Counter::new("nexus_chat.session.discarded");
pub(crate) static SESSION_CREATED: Counter = Counter::new("nexus_chat.session.created");

pub(crate) static CONTACT_SUBMISSIONS: Counter = Counter::new("nexus_chat.contact.submissions");
pub(crate) static CONTACT_FAILURES: Counter = Counter::new("nexus_chat.contact.failures");
pub(crate) static EMAILS_SENT: Counter = Counter::new("nexus_chat.contact.emails_sent");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CHAT_REQUESTS);
    collector.register_counter(&CHAT_REQUEST_ERRORS);
    collector.register_counter(&CHAT_REQUEST_TIMEOUTS);
    collector.register_moments(&CHAT_REQUEST_DURATION);

    collector.register_counter(&SESSION_SUBMITS);
    collector.register_counter(&SESSION_IGNORED);
    collector.register_counter(&SESSION_FAILURES);
    collector.register_counter(&SESSION_CANCELLED);
    collector.register_counter(&SESSION_DISCARDED);
    collector.register_counter(&SESSION_CREATED);

    collector.register_counter(&CONTACT_SUBMISSIONS);
    collector.register_counter(&CONTACT_FAILURES);
    collector.register_counter(&EMAILS_SENT);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_all() {
        register_biometrics(Collector::new());
    }
}
