//! Core chat session management.
//!
//! This module provides the [`ChatSession`] handle which owns the session
//! identifier, the in-memory transcript, and the single request/response
//! cycle against the remote agent.
//!
//! A session is either `Idle` or `AwaitingResponse`.  Submitting non-empty
//! text while idle appends the user turn immediately, then exactly one
//! assistant turn once the exchange settles, whatever the outcome.  Submitting
//! while a request is pending does nothing.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use serde_json::to_writer_pretty;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::chat::config::ChatConfig;
use crate::client::ChatTransport;
use crate::error::{Error, Result};
use crate::observability::{
    SESSION_CANCELLED, SESSION_DISCARDED, SESSION_FAILURES, SESSION_IGNORED, SESSION_SUBMITS,
};
use crate::session_store::{SessionStore, ensure_session, rotate_session};
use crate::types::{ChatRequest, ChatResponse, Message, SessionId, Transcript};

/// Assistant text appended when an exchange fails for any reason.
pub const ERROR_TEXT: &str = "Sorry, there was an error processing your request.";

/// Observable state of a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No request in flight; submissions are accepted.
    Idle,
    /// A request is in flight; submissions are ignored.
    AwaitingResponse,
}

/// Why a submission was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The text was empty after trimming.
    EmptyInput,
    /// Another submission is still awaiting its response.
    Busy,
}

/// Result of a call to [`ChatSession::submit`].
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Nothing was appended and nothing was sent.
    Ignored(IgnoreReason),
    /// The remote answered; `reply` is the appended assistant turn.
    Answered {
        /// The appended assistant message.
        reply: Message,
    },
    /// The exchange failed; the apology was appended.
    Failed {
        /// The appended assistant message.
        reply: Message,
        /// What went wrong, for logging.  Never shown to the user.
        error: Error,
    },
    /// The request was cancelled; the apology was appended.
    Cancelled {
        /// The appended assistant message.
        reply: Message,
    },
    /// The view was reset while the request was in flight.  The late response
    /// was dropped and nothing was appended to the new transcript.
    Discarded,
}

impl SubmitOutcome {
    /// The assistant message appended by this submission, if any.
    pub fn reply(&self) -> Option<&Message> {
        match self {
            SubmitOutcome::Answered { reply }
            | SubmitOutcome::Failed { reply, .. }
            | SubmitOutcome::Cancelled { reply } => Some(reply),
            SubmitOutcome::Ignored(_) | SubmitOutcome::Discarded => None,
        }
    }

    /// Returns true if the submission was ignored.
    pub fn is_ignored(&self) -> bool {
        matches!(self, SubmitOutcome::Ignored(_))
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The session identifier, once established.
    pub session_id: Option<SessionId>,
    /// The number of messages in the current transcript.
    pub message_count: usize,
    /// Total number of requests sent.
    pub total_requests: u64,
    /// Requests that settled with the apology text (failures and cancels).
    pub failed_requests: u64,
    /// Requests cancelled by the user.
    pub cancelled_requests: u64,
    /// Responses dropped because the view was reset.
    pub discarded_responses: u64,
    /// The context tags sent with each message.
    pub selected_tags: Vec<String>,
    /// The per-request timeout.
    pub request_timeout: Duration,
    /// When the current transcript view started.
    pub started_at: OffsetDateTime,
}

struct Pending {
    epoch: u64,
    cancel: CancellationToken,
}

struct Inner {
    session_id: Option<SessionId>,
    messages: Vec<Message>,
    pending: Option<Pending>,
    // Bumped on every reset; a response is only appended if the epoch it was
    // issued under is still current.
    epoch: u64,
    selected_tags: Vec<String>,
    started_at: OffsetDateTime,
    total_requests: u64,
    failed_requests: u64,
    cancelled_requests: u64,
    discarded_responses: u64,
}

/// A chat session that manages conversation state and the remote exchange.
///
/// `ChatSession` is a cheap, cloneable handle; clones share the same
/// transcript and state.  This lets a signal handler call
/// [`cancel`](ChatSession::cancel) while another task awaits
/// [`submit`](ChatSession::submit).
#[derive(Clone)]
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    store: Arc<dyn SessionStore>,
    request_timeout: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl ChatSession {
    /// Creates a new chat session.
    ///
    /// The session identifier is not read until the first call to
    /// [`ensure_session`](ChatSession::ensure_session) or
    /// [`submit`](ChatSession::submit).
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn SessionStore>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            transport,
            store,
            request_timeout: config.request_timeout,
            inner: Arc::new(Mutex::new(Inner {
                session_id: None,
                messages: Vec::new(),
                pending: None,
                epoch: 0,
                selected_tags: config.selected_tags.clone(),
                started_at: OffsetDateTime::now_utc(),
                total_requests: 0,
                failed_requests: 0,
                cancelled_requests: 0,
                discarded_responses: 0,
            })),
        }
    }

    /// Returns the session identifier, reading or creating it on first use.
    pub fn ensure_session(&self) -> Result<SessionId> {
        if let Some(session_id) = self.lock().session_id.clone() {
            return Ok(session_id);
        }
        let session_id = ensure_session(self.store.as_ref())?;
        let mut inner = self.lock();
        // Another clone may have raced us here; keep whichever landed first.
        Ok(inner.session_id.get_or_insert(session_id).clone())
    }

    /// Returns the session identifier if it has been established.
    pub fn session_id(&self) -> Option<SessionId> {
        self.lock().session_id.clone()
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        if self.lock().pending.is_some() {
            SessionState::AwaitingResponse
        } else {
            SessionState::Idle
        }
    }

    /// Returns true while a request is in flight.
    pub fn is_pending(&self) -> bool {
        self.state() == SessionState::AwaitingResponse
    }

    /// Sends `user_text` with the session's selected tags.
    pub async fn send(&self, user_text: &str) -> SubmitOutcome {
        let tags = self.lock().selected_tags.clone();
        self.submit(user_text, Some(tags)).await
    }

    /// Submits one user turn and awaits the assistant turn.
    ///
    /// This method:
    /// 1. Ignores empty input and input arriving while a request is pending
    /// 2. Appends the user message and enters `AwaitingResponse`
    /// 3. Sends exactly one request, bounded by the timeout and cancellation
    /// 4. Appends the reply, the fallback, or the apology and returns to `Idle`
    ///
    /// Errors never escape; they are reported inside the outcome.
    pub async fn submit(&self, user_text: &str, tags: Option<Vec<String>>) -> SubmitOutcome {
        let (epoch, cancel) = {
            let mut inner = self.lock();
            if user_text.trim().is_empty() {
                SESSION_IGNORED.click();
                return SubmitOutcome::Ignored(IgnoreReason::EmptyInput);
            }
            if inner.pending.is_some() {
                SESSION_IGNORED.click();
                tracing::debug!("submission ignored while awaiting response");
                return SubmitOutcome::Ignored(IgnoreReason::Busy);
            }
            inner.messages.push(Message::user(user_text));
            let cancel = CancellationToken::new();
            let epoch = inner.epoch;
            inner.pending = Some(Pending {
                epoch,
                cancel: cancel.clone(),
            });
            inner.total_requests += 1;
            (epoch, cancel)
        };
        SESSION_SUBMITS.click();

        let mut guard = PendingGuard {
            inner: self.inner.as_ref(),
            epoch,
            armed: true,
        };
        let result = self.exchange(user_text, tags, &cancel).await;
        guard.armed = false;
        self.settle(epoch, result)
    }

    /// Cancels the in-flight request, if any.
    ///
    /// The pending submission settles with the apology text.  Returns true if
    /// there was something to cancel.
    pub fn cancel(&self) -> bool {
        match &self.lock().pending {
            Some(pending) => {
                pending.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Abandons the current view and starts a new conversation.
    ///
    /// Any in-flight request is cancelled and its response is discarded.  The
    /// transcript is cleared and a new session identifier is persisted.
    pub fn reset(&self) -> Result<SessionId> {
        {
            let mut inner = self.lock();
            inner.epoch += 1;
            if let Some(pending) = inner.pending.take() {
                pending.cancel.cancel();
            }
            inner.messages.clear();
            inner.started_at = OffsetDateTime::now_utc();
        }
        let session_id = rotate_session(self.store.as_ref())?;
        self.lock().session_id = Some(session_id.clone());
        Ok(session_id)
    }

    /// Returns a read-only snapshot of the transcript.
    pub fn render(&self) -> Transcript {
        Transcript::new(&self.lock().messages)
    }

    /// Returns the number of messages in the transcript.
    pub fn message_count(&self) -> usize {
        self.lock().messages.len()
    }

    /// Sets the context tags sent by [`send`](ChatSession::send).
    pub fn set_selected_tags(&self, tags: Vec<String>) {
        self.lock().selected_tags = tags;
    }

    /// Returns the context tags sent by [`send`](ChatSession::send).
    pub fn selected_tags(&self) -> Vec<String> {
        self.lock().selected_tags.clone()
    }

    /// Returns the per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Exports the transcript to a JSON file.
    pub fn save_transcript_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let transcript = {
            let inner = self.lock();
            TranscriptFile {
                version: 1,
                session_id: inner.session_id.clone(),
                saved_at: OffsetDateTime::now_utc(),
                messages: inner.messages.clone(),
            }
        };
        let file = File::create(path.as_ref())
            .map_err(|err| Error::io("failed to create transcript file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &transcript).map_err(|err| {
            Error::serialization("failed to serialize transcript", Some(Box::new(err)))
        })
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let inner = self.lock();
        SessionStats {
            session_id: inner.session_id.clone(),
            message_count: inner.messages.len(),
            total_requests: inner.total_requests,
            failed_requests: inner.failed_requests,
            cancelled_requests: inner.cancelled_requests,
            discarded_responses: inner.discarded_responses,
            selected_tags: inner.selected_tags.clone(),
            request_timeout: self.request_timeout,
            started_at: inner.started_at,
        }
    }

    async fn exchange(
        &self,
        user_text: &str,
        tags: Option<Vec<String>>,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse> {
        let session_id = self.ensure_session()?;
        let request = ChatRequest::new(session_id, user_text, tags);
        let timeout = self.request_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::abort("request cancelled")),
            result = tokio::time::timeout(timeout, self.transport.exchange(&request)) => {
                match result {
                    Ok(result) => result,
                    Err(_) => Err(Error::timeout(
                        "no response before the deadline",
                        Some(timeout.as_secs_f64()),
                    )),
                }
            }
        }
    }

    fn settle(&self, epoch: u64, result: Result<ChatResponse>) -> SubmitOutcome {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            inner.discarded_responses += 1;
            SESSION_DISCARDED.click();
            tracing::debug!("dropping response issued before reset");
            return SubmitOutcome::Discarded;
        }
        inner.pending = None;
        match result {
            Ok(response) => {
                let reply = Message::assistant(response.reply_text());
                inner.messages.push(reply.clone());
                SubmitOutcome::Answered { reply }
            }
            Err(error) => {
                let reply = Message::assistant(ERROR_TEXT);
                inner.messages.push(reply.clone());
                inner.failed_requests += 1;
                SESSION_FAILURES.click();
                if error.is_abort() {
                    inner.cancelled_requests += 1;
                    SESSION_CANCELLED.click();
                    SubmitOutcome::Cancelled { reply }
                } else {
                    tracing::warn!(error = %error, "chat submission failed");
                    SubmitOutcome::Failed { reply, error }
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Resolves the pending turn if the submit future is dropped before settling,
// so the session never gets stuck in `AwaitingResponse`.
struct PendingGuard<'a> {
    inner: &'a Mutex<Inner>,
    epoch: u64,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = lock_inner(self.inner);
        if inner.epoch == self.epoch && inner.pending.is_some() {
            inner.pending = None;
            inner.messages.push(Message::assistant(ERROR_TEXT));
            inner.failed_requests += 1;
            inner.cancelled_requests += 1;
            SESSION_CANCELLED.click();
        }
    }
}

#[derive(Serialize)]
struct TranscriptFile {
    version: u8,
    session_id: Option<SessionId>,
    #[serde(with = "crate::utils::time")]
    saved_at: OffsetDateTime,
    messages: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_store::MemorySessionStore;
    use crate::types::NO_RESPONSE_TEXT;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    enum Reply {
        Ok(ChatResponse),
        Err(Error),
        Delayed(Duration, ChatResponse),
        Hang,
        Gated(Arc<Notify>, ChatResponse),
    }

    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<ChatRequest>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn exchange(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request");
            match reply {
                Reply::Ok(response) => Ok(response),
                Reply::Err(err) => Err(err),
                Reply::Delayed(delay, response) => {
                    tokio::time::sleep(delay).await;
                    Ok(response)
                }
                Reply::Hang => std::future::pending().await,
                Reply::Gated(gate, response) => {
                    gate.notified().await;
                    Ok(response)
                }
            }
        }
    }

    fn session_with(transport: Arc<ScriptedTransport>) -> (ChatSession, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let config = ChatConfig::new().with_request_timeout(Duration::from_secs(30));
        let session = ChatSession::new(transport, store.clone(), &config);
        (session, store)
    }

    async fn wait_until_pending(session: &ChatSession) {
        while !session.is_pending() {
            tokio::task::yield_now().await;
        }
    }

    fn texts(session: &ChatSession) -> Vec<(String, bool)> {
        session
            .render()
            .iter()
            .map(|m| (m.text.clone(), m.is_user))
            .collect()
    }

    #[tokio::test]
    async fn new_session_is_idle_and_empty() {
        let (session, _) = session_with(ScriptedTransport::new(vec![]));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.message_count(), 0);
        assert!(session.session_id().is_none());
    }

    #[tokio::test]
    async fn ensure_session_is_stable() {
        let (session, store) = session_with(ScriptedTransport::new(vec![]));
        let first = session.ensure_session().unwrap();
        assert_eq!(session.ensure_session().unwrap(), first);
        assert_eq!(store.get().unwrap().as_deref(), Some(first.as_str()));
    }

    #[tokio::test]
    async fn successful_submit_appends_two_messages() {
        let transport =
            ScriptedTransport::new(vec![Reply::Ok(ChatResponse::new("We build **agents**."))]);
        let (session, _) = session_with(transport.clone());

        let outcome = session.submit("What do you do?", None).await;
        assert!(matches!(outcome, SubmitOutcome::Answered { .. }));
        assert_eq!(
            texts(&session),
            vec![
                ("What do you do?".to_string(), true),
                ("We build **agents**.".to_string(), false),
            ]
        );
        assert_eq!(session.state(), SessionState::Idle);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "What do you do?");
        assert_eq!(Some(&requests[0].session_id), session.session_id().as_ref());
        assert!(requests[0].selected_properties.is_none());
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() {
        let transport = ScriptedTransport::new(vec![]);
        let (session, _) = session_with(transport.clone());
        for input in ["", "   ", "\n\t"] {
            let outcome = session.submit(input, None).await;
            assert!(matches!(
                outcome,
                SubmitOutcome::Ignored(IgnoreReason::EmptyInput)
            ));
        }
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn missing_output_uses_fallback() {
        let transport = ScriptedTransport::new(vec![Reply::Ok(ChatResponse::empty())]);
        let (session, _) = session_with(transport);
        let outcome = session.submit("hello", None).await;
        assert_eq!(outcome.reply().unwrap().text, NO_RESPONSE_TEXT);
        assert_eq!(session.render().last().unwrap().text, "No response from server");
    }

    #[tokio::test]
    async fn failure_appends_apology() {
        let transport = ScriptedTransport::new(vec![
            Reply::Err(Error::connection("refused", None)),
            Reply::Err(Error::api(500, "boom")),
        ]);
        let (session, _) = session_with(transport);

        let outcome = session.submit("first", None).await;
        match outcome {
            SubmitOutcome::Failed { reply, error } => {
                assert_eq!(reply.text, ERROR_TEXT);
                assert!(error.is_connection());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let outcome = session.submit("second", None).await;
        assert!(matches!(outcome, SubmitOutcome::Failed { ref error, .. } if error.is_api()));

        assert_eq!(
            texts(&session),
            vec![
                ("first".to_string(), true),
                (ERROR_TEXT.to_string(), false),
                ("second".to_string(), true),
                (
                    "Sorry, there was an error processing your request.".to_string(),
                    false
                ),
            ]
        );
        assert_eq!(session.stats().failed_requests, 2);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn submit_while_pending_is_ignored() {
        let gate = Arc::new(Notify::new());
        let transport = ScriptedTransport::new(vec![Reply::Gated(
            gate.clone(),
            ChatResponse::new("done"),
        )]);
        let (session, _) = session_with(transport.clone());

        let background = session.clone();
        let first = tokio::spawn(async move { background.submit("A", None).await });
        wait_until_pending(&session).await;

        let second = session.submit("B", None).await;
        assert!(matches!(second, SubmitOutcome::Ignored(IgnoreReason::Busy)));
        assert_eq!(session.message_count(), 1);
        assert_eq!(transport.calls(), 1);

        gate.notify_one();
        let first = first.await.unwrap();
        assert!(matches!(first, SubmitOutcome::Answered { .. }));
        assert_eq!(
            texts(&session),
            vec![("A".to_string(), true), ("done".to_string(), false)]
        );
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ordering_holds_under_latency() {
        let transport = ScriptedTransport::new(vec![
            Reply::Delayed(Duration::from_millis(900), ChatResponse::new("answer A")),
            Reply::Delayed(Duration::from_millis(5), ChatResponse::new("answer B")),
        ]);
        let (session, _) = session_with(transport);

        session.submit("A", None).await;
        session.submit("B", None).await;
        assert_eq!(
            texts(&session),
            vec![
                ("A".to_string(), true),
                ("answer A".to_string(), false),
                ("B".to_string(), true),
                ("answer B".to_string(), false),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_failure() {
        let transport = ScriptedTransport::new(vec![Reply::Delayed(
            Duration::from_secs(120),
            ChatResponse::new("too late"),
        )]);
        let (session, _) = session_with(transport);

        let outcome = session.submit("slow?", None).await;
        match outcome {
            SubmitOutcome::Failed { reply, error } => {
                assert_eq!(reply.text, ERROR_TEXT);
                assert!(error.is_timeout());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn cancel_settles_with_apology() {
        let transport = ScriptedTransport::new(vec![Reply::Hang]);
        let (session, _) = session_with(transport);

        let background = session.clone();
        let task = tokio::spawn(async move { background.submit("hello", None).await });
        wait_until_pending(&session).await;

        assert!(session.cancel());
        let outcome = task.await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Cancelled { .. }));
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.render().last().unwrap().text, ERROR_TEXT);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.cancel());
        assert_eq!(session.stats().cancelled_requests, 1);
    }

    #[tokio::test]
    async fn reset_discards_stale_response() {
        let gate = Arc::new(Notify::new());
        let transport = ScriptedTransport::new(vec![
            Reply::Gated(gate.clone(), ChatResponse::new("stale")),
            Reply::Ok(ChatResponse::new("fresh")),
        ]);
        let (session, store) = session_with(transport);
        let original = session.ensure_session().unwrap();

        let background = session.clone();
        let task = tokio::spawn(async move { background.submit("old question", None).await });
        wait_until_pending(&session).await;

        let rotated = session.reset().unwrap();
        assert_ne!(rotated, original);
        assert_eq!(store.get().unwrap().as_deref(), Some(rotated.as_str()));
        gate.notify_one();

        let outcome = task.await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Discarded));
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.state(), SessionState::Idle);

        session.submit("new question", None).await;
        assert_eq!(
            texts(&session),
            vec![
                ("new question".to_string(), true),
                ("fresh".to_string(), false)
            ]
        );
        assert_eq!(session.stats().discarded_responses, 1);
    }

    #[tokio::test]
    async fn dropped_submit_does_not_wedge_the_session() {
        let transport = ScriptedTransport::new(vec![
            Reply::Hang,
            Reply::Ok(ChatResponse::new("ok")),
        ]);
        let (session, _) = session_with(transport);

        let background = session.clone();
        let task = tokio::spawn(async move { background.submit("abandoned", None).await });
        wait_until_pending(&session).await;
        task.abort();
        let _ = task.await;

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.message_count(), 2);
        let outcome = session.submit("again", None).await;
        assert!(matches!(outcome, SubmitOutcome::Answered { .. }));
        assert_eq!(session.message_count(), 4);
    }

    #[tokio::test]
    async fn send_uses_selected_tags() {
        let transport = ScriptedTransport::new(vec![
            Reply::Ok(ChatResponse::new("one")),
            Reply::Ok(ChatResponse::new("two")),
        ]);
        let (session, _) = session_with(transport.clone());

        session.set_selected_tags(vec!["brochure.pdf".to_string()]);
        session.send("scoped").await;
        session.set_selected_tags(Vec::new());
        session.send("unscoped").await;

        let requests = transport.requests();
        assert_eq!(
            requests[0].selected_properties,
            Some(vec!["brochure.pdf".to_string()])
        );
        assert_eq!(requests[1].selected_properties, None);
    }

    #[tokio::test]
    async fn render_is_a_snapshot() {
        let transport = ScriptedTransport::new(vec![Reply::Ok(ChatResponse::new("hi"))]);
        let (session, _) = session_with(transport);
        let before = session.render();
        session.submit("hello", None).await;
        assert!(before.is_empty());
        assert_eq!(session.render().len(), 2);
    }

    #[tokio::test]
    async fn store_failure_still_resolves_the_turn() {
        struct BrokenStore;

        impl SessionStore for BrokenStore {
            fn get(&self) -> Result<Option<String>> {
                Err(Error::storage("disk on fire"))
            }

            fn put(&self, _: &str) -> Result<()> {
                Err(Error::storage("disk on fire"))
            }
        }

        let transport = ScriptedTransport::new(vec![]);
        let session = ChatSession::new(transport.clone(), Arc::new(BrokenStore), &ChatConfig::new());
        let outcome = session.submit("hello", None).await;
        assert!(matches!(outcome, SubmitOutcome::Failed { .. }));
        assert_eq!(session.message_count(), 2);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn message_text_is_sent_as_typed() {
        let transport = ScriptedTransport::new(vec![Reply::Ok(ChatResponse::new("hi"))]);
        let (session, _) = session_with(transport.clone());
        session.send("  hi  ").await;
        assert_eq!(transport.requests()[0].message, "  hi  ");
        assert_eq!(session.render().as_slice()[0].text, "  hi  ");
    }

    #[tokio::test]
    async fn corrupt_state_file_starts_a_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let transport = ScriptedTransport::new(vec![Reply::Ok(ChatResponse::new("hi"))]);
        let store = Arc::new(crate::session_store::FileSessionStore::new(&path));
        let session = ChatSession::new(transport.clone(), store.clone(), &ChatConfig::new());
        let outcome = session.submit("hello", None).await;
        assert!(matches!(outcome, SubmitOutcome::Answered { .. }));
        assert_eq!(transport.calls(), 1);

        let session_id = session.session_id().unwrap();
        assert_eq!(transport.requests()[0].session_id, session_id);
        assert_eq!(store.get().unwrap().as_deref(), Some(session_id.as_str()));
    }

    #[tokio::test]
    async fn save_transcript_writes_json() {
        let transport = ScriptedTransport::new(vec![Reply::Ok(ChatResponse::new("hi"))]);
        let (session, _) = session_with(transport);
        session.submit("hello", None).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.json");
        session.save_transcript_to(&path).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["version"], 1);
        assert_eq!(saved["messages"][0]["text"], "hello");
        assert_eq!(saved["messages"][0]["isUser"], true);
        assert_eq!(saved["messages"][1]["isUser"], false);
        assert!(saved["saved_at"].is_string());
    }
}
