//! Chat controller.
//!
//! Owns the [`ChatState`] of one chat view and drives the streaming request:
//! - optimistic session creation and navigation
//! - one background stream worker per send, at most one in flight
//! - cooperative cancellation that settles state synchronously
//! - session list, history and deletion round-trips

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crate::api::types::{AttachmentMeta, DEFAULT_USER_ID};
use crate::api::{ApiError, ChatBackend, ChatRequest};
use crate::auth::CredentialStore;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::event_bus::{ChatEvent, EventBus};
use crate::history;
use crate::logging::{Direction, Transcript};
use crate::session::{Answer, Attachment, ChatState, Location, Message, SessionId, SessionSummary};
use crate::stream::{decode_reader, CancelToken, ReadEnd, StreamEvent};

/// How a send settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The body reached its end.
    Completed,
    /// Stopped by the user or interrupted by a newer send.
    Aborted,
    /// The request or the body read failed.
    Failed(String),
}

/// Settings that don't change over a controller's lifetime.
#[derive(Debug, Clone, Default)]
pub struct ControllerOptions {
    /// User id sent with chat requests when nobody is signed in.
    pub fallback_user_id: Option<String>,
    /// Directory for raw stream transcripts.
    pub log_dir: Option<String>,
}

impl ControllerOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            fallback_user_id: config.user_id.clone(),
            log_dir: config.log_dir.clone(),
        }
    }
}

/// State shared between the controller and its stream workers.
struct Shared {
    state: Mutex<ChatState>,
    backend: Arc<dyn ChatBackend>,
    credentials: Arc<CredentialStore>,
    event_bus: Arc<EventBus>,
    options: ControllerOptions,
}

impl Shared {
    fn emit(&self, event: ChatEvent) {
        self.event_bus.emit(event);
    }

    fn request_user_id(&self) -> String {
        self.credentials
            .user_email()
            .or_else(|| self.options.fallback_user_id.clone())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string())
    }

    /// Replace the session list. Returns `Ok(false)` when nobody is signed in.
    fn load_sessions(&self) -> Result<bool, ApiError> {
        let Some(user_id) = self.credentials.user_email() else {
            log::debug!("Not signed in; skipping session list");
            return Ok(false);
        };

        let sessions = self.backend.list_sessions(&user_id).map_err(|e| {
            log::error!("Failed to load sessions for {}: {}", user_id, e);
            e
        })?;

        self.state.lock().unwrap().sessions = sessions;
        self.emit(ChatEvent::SessionsChanged);
        Ok(true)
    }

    fn reload_sessions(&self) {
        let _ = self.load_sessions();
    }
}

/// Settles one send exactly once, whichever path gets there first.
struct StreamFinalizer {
    message_id: String,
    shared: Arc<Shared>,
    done: AtomicBool,
    outcome: Mutex<Option<StreamOutcome>>,
    settled: Condvar,
}

impl StreamFinalizer {
    fn new(message_id: String, shared: Arc<Shared>) -> Self {
        Self {
            message_id,
            shared,
            done: AtomicBool::new(false),
            outcome: Mutex::new(None),
            settled: Condvar::new(),
        }
    }

    /// Clear `is_loading` and publish the outcome. Returns `false` if the
    /// send had already settled.
    fn finalize(&self, outcome: StreamOutcome) -> bool {
        if self.done.swap(true, Ordering::SeqCst) {
            return false;
        }

        {
            let mut state = self.shared.state.lock().unwrap();
            if let Some(message) = state.message_mut(&self.message_id) {
                message.is_loading = false;
            }
        }

        *self.outcome.lock().unwrap() = Some(outcome.clone());
        self.settled.notify_all();

        log::debug!("Stream for message {} settled: {:?}", self.message_id, outcome);
        self.shared.emit(ChatEvent::StreamFinished {
            message_id: self.message_id.clone(),
            outcome,
        });
        true
    }

    fn outcome(&self) -> Option<StreamOutcome> {
        self.outcome.lock().unwrap().clone()
    }

    fn wait(&self, timeout: Option<Duration>) -> Option<StreamOutcome> {
        let mut outcome = self.outcome.lock().unwrap();
        loop {
            if let Some(settled) = outcome.as_ref() {
                return Some(settled.clone());
            }
            outcome = match timeout {
                None => self.settled.wait(outcome).unwrap(),
                Some(timeout) => {
                    let (guard, result) = self.settled.wait_timeout(outcome, timeout).unwrap();
                    if result.timed_out() {
                        return (*guard).clone();
                    }
                    guard
                }
            };
        }
    }
}

/// Finalizes as failed if the worker unwinds before settling.
struct FinalizeOnDrop(Arc<StreamFinalizer>);

impl Drop for FinalizeOnDrop {
    fn drop(&mut self) {
        self.0
            .finalize(StreamOutcome::Failed("stream worker exited unexpectedly".to_string()));
    }
}

struct InFlight {
    cancel: CancelToken,
    finalizer: Arc<StreamFinalizer>,
}

impl InFlight {
    fn interrupt(&self) -> bool {
        self.cancel.cancel();
        self.finalizer.finalize(StreamOutcome::Aborted)
    }
}

/// Handle to one send.
pub struct SendHandle {
    pub message_id: String,
    pub session_id: SessionId,
    cancel: CancelToken,
    finalizer: Arc<StreamFinalizer>,
}

impl SendHandle {
    /// Abort this send. A no-op once it has settled.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.finalizer.finalize(StreamOutcome::Aborted);
    }

    pub fn is_finished(&self) -> bool {
        self.finalizer.outcome().is_some()
    }

    /// Block until the send settles.
    ///
    /// An aborted send settles immediately; the worker thread may still be
    /// parked on a read and is not joined.
    pub fn wait(&self) -> StreamOutcome {
        self.finalizer
            .wait(None)
            .unwrap_or(StreamOutcome::Aborted)
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<StreamOutcome> {
        self.finalizer.wait(Some(timeout))
    }
}

/// Background half of a send: issues the request and applies the stream.
struct StreamWorker {
    shared: Arc<Shared>,
    request: ChatRequest,
    message_id: String,
    cancel: CancelToken,
    finalizer: Arc<StreamFinalizer>,
    transcript: Transcript,
}

impl StreamWorker {
    fn run(self) {
        let _guard = FinalizeOnDrop(Arc::clone(&self.finalizer));
        let outcome = self.stream();
        self.finalizer.finalize(outcome);
    }

    fn stream(&self) -> StreamOutcome {
        if let Ok(body) = serde_json::to_string(&self.request) {
            self.transcript.record(Direction::Request, &body);
        }

        let body = match self.shared.backend.open_chat_stream(&self.request) {
            Ok(body) => body,
            Err(_) if self.cancel.is_cancelled() => return StreamOutcome::Aborted,
            Err(e) => {
                log::error!(
                    "Chat request for session {} failed: {}",
                    self.request.session_id,
                    e
                );
                self.transcript.record(Direction::Error, &e.to_string());
                return StreamOutcome::Failed(e.to_string());
            }
        };

        let read = decode_reader(body, &self.cancel, |line, value| {
            self.transcript.record(Direction::Received, line);
            if let Some(event) = StreamEvent::from_value(value) {
                self.handle(event);
            }
        });

        match read {
            Ok(ReadEnd::Eof) if self.cancel.is_cancelled() => StreamOutcome::Aborted,
            Ok(ReadEnd::Eof) => {
                self.shared.reload_sessions();
                StreamOutcome::Completed
            }
            Ok(ReadEnd::Cancelled) => StreamOutcome::Aborted,
            Err(e) => {
                log::error!(
                    "Reading chat stream for session {} failed: {}",
                    self.request.session_id,
                    e
                );
                self.transcript.record(Direction::Error, &e.to_string());
                StreamOutcome::Failed(e.to_string())
            }
        }
    }

    fn handle(&self, event: StreamEvent) {
        match event {
            StreamEvent::Title { title } => {
                log::debug!("Session {} titled {:?}", self.request.session_id, title);
                self.shared.reload_sessions();
            }
            StreamEvent::Error { error } => {
                log::error!("Server error in stream for {}: {}", self.request.session_id, error);
                self.shared.emit(ChatEvent::StreamError {
                    message_id: self.message_id.clone(),
                    error,
                });
            }
            StreamEvent::Unknown => {}
            event => {
                let mut state = self.shared.state.lock().unwrap();
                // Checked under the lock so nothing lands after a stop settled.
                if self.cancel.is_cancelled() {
                    return;
                }
                let Some(message) = state.streaming_target(&self.message_id) else {
                    return;
                };
                message.apply(&event);
                // Emitted before unlocking so it always precedes StreamFinished.
                match event {
                    StreamEvent::Content { content } => self.shared.emit(ChatEvent::ContentDelta {
                        message_id: self.message_id.clone(),
                        delta: content,
                    }),
                    _ => self.shared.emit(ChatEvent::MessagesChanged),
                };
                drop(state);
            }
        }
    }
}

/// Drives one chat view.
pub struct ChatController {
    shared: Arc<Shared>,
    in_flight: Mutex<Option<InFlight>>,
}

impl ChatController {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        credentials: Arc<CredentialStore>,
        event_bus: Arc<EventBus>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ChatState::new()),
                backend,
                credentials,
                event_bus,
                options,
            }),
            in_flight: Mutex::new(None),
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.shared.event_bus
    }

    /// Send a user message and stream the reply into a new assistant message.
    ///
    /// Returns `Ok(None)` without doing anything when there is neither text
    /// nor an attachment. Any send still in flight is aborted first.
    pub fn send_message(
        &self,
        input: &str,
        attachments: Vec<Attachment>,
        voice_id: Option<String>,
    ) -> Result<Option<SendHandle>, ClientError> {
        if input.trim().is_empty() && attachments.is_empty() {
            return Ok(None);
        }

        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(previous) = in_flight.take() {
            if previous.interrupt() {
                log::info!(
                    "Interrupted stream for message {}",
                    previous.finalizer.message_id
                );
            }
        }

        let session_id = match self.location() {
            Location::Chat(id) => id,
            Location::NewChat => {
                let id = SessionId::new();
                self.shared.state.lock().unwrap().just_created = Some(id.clone());
                self.navigate(Location::Chat(id.clone()))?;
                id
            }
        };

        let request = ChatRequest {
            message: input.to_string(),
            session_id: session_id.to_string(),
            user_id: self.shared.request_user_id(),
            attachments: attachments.iter().map(AttachmentMeta::from).collect(),
            brand_voice_id: voice_id,
        };

        let placeholder = Message::assistant_placeholder();
        let message_id = placeholder.id.clone();
        {
            let mut state = self.shared.state.lock().unwrap();
            state.messages.push(Message::user(input, attachments));
            state.messages.push(placeholder);
        }
        self.shared.emit(ChatEvent::MessagesChanged);

        let cancel = CancelToken::new();
        let finalizer = Arc::new(StreamFinalizer::new(
            message_id.clone(),
            Arc::clone(&self.shared),
        ));
        let worker = StreamWorker {
            shared: Arc::clone(&self.shared),
            request,
            message_id: message_id.clone(),
            cancel: cancel.clone(),
            finalizer: Arc::clone(&finalizer),
            transcript: Transcript::open(self.shared.options.log_dir.as_deref(), &session_id),
        };

        let thread_name = format!("chat-stream-{}", message_id.get(..8).unwrap_or(&message_id));
        if let Err(e) = thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker.run())
        {
            log::error!("Failed to spawn stream worker: {}", e);
            finalizer.finalize(StreamOutcome::Failed(e.to_string()));
            return Err(e.into());
        }

        *in_flight = Some(InFlight {
            cancel: cancel.clone(),
            finalizer: Arc::clone(&finalizer),
        });

        Ok(Some(SendHandle {
            message_id,
            session_id,
            cancel,
            finalizer,
        }))
    }

    /// Abort the in-flight send, if any.
    ///
    /// The assistant message stops loading before this returns. Returns
    /// `false` if there was nothing left to stop.
    pub fn stop_generating(&self) -> bool {
        match self.in_flight.lock().unwrap().take() {
            Some(in_flight) => in_flight.interrupt(),
            None => false,
        }
    }

    /// Fetch the signed-in user's sessions and replace the list.
    ///
    /// Does nothing when nobody is signed in. On error the previous list is
    /// kept.
    pub fn load_sessions(&self) -> Result<(), ApiError> {
        self.shared.load_sessions().map(|_| ())
    }

    /// Navigate to an existing session and load its history.
    pub fn switch_session(&self, session_id: SessionId) -> Result<(), ApiError> {
        self.navigate(Location::Chat(session_id))
    }

    /// Navigate to a blank chat.
    pub fn create_new_chat(&self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.messages.clear();
            state.just_created = None;
        }
        // NewChat never fetches history.
        let _ = self.navigate(Location::NewChat);
        self.shared.emit(ChatEvent::MessagesChanged);
    }

    /// Delete a session server-side, then refresh the list.
    ///
    /// Deleting the active session navigates to a new chat.
    pub fn delete_session(&self, session_id: &SessionId) -> Result<(), ApiError> {
        self.shared.backend.delete_session(session_id).map_err(|e| {
            log::error!("Failed to delete session {}: {}", session_id, e);
            e
        })?;
        log::info!("Deleted session {}", session_id);

        self.shared.reload_sessions();
        if self.location().session_id() == Some(session_id) {
            self.create_new_chat();
        }
        Ok(())
    }

    /// Replace the messages with the server's history for `session_id`.
    pub fn load_history(&self, session_id: &SessionId) -> Result<(), ApiError> {
        let stored = self.shared.backend.fetch_history(session_id).map_err(|e| {
            log::error!("Failed to load history for {}: {}", session_id, e);
            e
        })?;
        let messages = history::hydrate(stored);

        {
            let mut state = self.shared.state.lock().unwrap();
            if state.active_session() != Some(session_id) {
                log::debug!("Discarding history for {}: no longer active", session_id);
                return Ok(());
            }
            state.messages = messages;
        }
        self.shared.emit(ChatEvent::MessagesChanged);
        Ok(())
    }

    /// Replace the answer of the message with `message_id`.
    ///
    /// Returns `false` if no such message exists.
    pub fn edit_message(&self, message_id: &str, content: &str) -> bool {
        {
            let mut state = self.shared.state.lock().unwrap();
            let Some(message) = state.message_mut(message_id) else {
                return false;
            };
            message.answer = Some(Answer {
                content: content.to_string(),
            });
        }
        self.shared.emit(ChatEvent::MessagesChanged);
        true
    }

    pub fn snapshot(&self) -> ChatState {
        self.shared.state.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.state.lock().unwrap().messages.clone()
    }

    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.shared.state.lock().unwrap().sessions.clone()
    }

    pub fn location(&self) -> Location {
        self.shared.state.lock().unwrap().location.clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.state.lock().unwrap().is_streaming()
    }

    /// Replace the location and run the history effect for it.
    ///
    /// Navigating to the current location is a no-op. A session this
    /// controller just created is skipped once so the
    /// optimistic messages survive.
    fn navigate(&self, location: Location) -> Result<(), ApiError> {
        let fetch = {
            let mut state = self.shared.state.lock().unwrap();
            if state.location == location {
                return Ok(());
            }
            state.location = location.clone();
            match location.session_id() {
                Some(id) if state.just_created.as_ref() == Some(id) => {
                    state.just_created = None;
                    None
                }
                Some(id) => Some(id.clone()),
                None => None,
            }
        };
        log::debug!("Navigated to {}", location.path());
        self.shared.emit(ChatEvent::Navigated(location));

        match fetch {
            Some(id) => self.load_history(&id),
            None => Ok(()),
        }
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if let Some(in_flight) = in_flight.take() {
                in_flight.interrupt();
            }
        }
    }
}
