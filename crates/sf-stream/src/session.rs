use crate::frames::{GenerateRequest, StreamFrame};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid generation endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One streamed fragment, already appended to the buffer.
    Token(String),
    /// Terminal frame received; carries the full accumulated buffer.
    Completed { content: String },
    /// Error frame or transport failure. The partial buffer is kept.
    Failed { message: String },
    /// Connection closed without a terminal frame (including `stop()`).
    Closed,
}

struct Inner {
    active: AtomicBool,
    buffer: watch::Sender<String>,
    last_error: watch::Sender<Option<String>>,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    cancel: watch::Sender<bool>,
}

/// One streaming generation run at a time over a duplex connection.
///
/// `generate` is single-flight: while a run is live, further calls are
/// no-ops. The accumulated buffer is cleared when a run starts and only
/// appended to afterwards; whatever was streamed survives errors and
/// cancellation. Whenever the connection closes, for any reason, the
/// session returns to `Idle` so a caller can never observe a wedged
/// "generating" state.
#[derive(Clone)]
pub struct GenerationSession {
    endpoint: Url,
    inner: Arc<Inner>,
}

impl GenerationSession {
    pub fn new(endpoint: Url) -> Self {
        let (buffer, _) = watch::channel(String::new());
        let (last_error, _) = watch::channel(None);
        let (state, _) = watch::channel(SessionState::Idle);
        let (events, _) = broadcast::channel(256);
        let (cancel, _) = watch::channel(false);
        Self {
            endpoint,
            inner: Arc::new(Inner {
                active: AtomicBool::new(false),
                buffer,
                last_error,
                state,
                events,
                cancel,
            }),
        }
    }

    pub fn from_endpoint(endpoint: &str) -> Result<Self, StreamError> {
        Ok(Self::new(Url::parse(endpoint)?))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Starts a run; returns `false` without side effects if one is already
    /// live. Connection failures surface as a `Failed` event and reset the
    /// session; retrying is the caller's decision.
    pub fn generate(&self, request: GenerateRequest) -> bool {
        if self
            .inner
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.inner.buffer.send_replace(String::new());
        self.inner.last_error.send_replace(None);
        self.inner.cancel.send_replace(false);
        self.inner.state.send_replace(SessionState::Connecting);

        let inner = Arc::clone(&self.inner);
        let endpoint = self.endpoint.clone();
        let cancel = self.inner.cancel.subscribe();
        tokio::spawn(async move {
            run(&inner, &endpoint, request, cancel).await;
            // Idle whenever the connection is gone, no matter how it went.
            // The flag drops under the state lock: a caller that observes
            // it clear publishes its Connecting only after this Idle, so a
            // fresh run's state is never overwritten by stale teardown.
            inner.state.send_modify(|state| {
                inner.active.store(false, Ordering::SeqCst);
                *state = SessionState::Idle;
            });
        });
        true
    }

    /// Force-closes the connection. Idempotent, callable in any state; the
    /// partial buffer is not discarded.
    pub fn stop(&self) {
        self.inner.cancel.send_replace(true);
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_generating(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Snapshot of the accumulated buffer.
    pub fn content(&self) -> String {
        self.inner.buffer.borrow().clone()
    }

    pub fn watch_content(&self) -> watch::Receiver<String> {
        self.inner.buffer.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.borrow().clone()
    }
}

fn fail(inner: &Inner, message: String) {
    inner.state.send_replace(SessionState::Failed);
    inner.last_error.send_replace(Some(message.clone()));
    let _ = inner.events.send(SessionEvent::Failed { message });
}

fn closed(inner: &Inner) {
    let _ = inner.events.send(SessionEvent::Closed);
}

async fn run(
    inner: &Inner,
    endpoint: &Url,
    request: GenerateRequest,
    mut cancel: watch::Receiver<bool>,
) {
    let mut ws = tokio::select! {
        connected = connect_async(endpoint.as_str()) => match connected {
            Ok((ws, _response)) => ws,
            Err(err) => {
                fail(inner, format!("connection failed: {err}"));
                return;
            }
        },
        _ = cancel.changed() => {
            closed(inner);
            return;
        }
    };

    let init = match serde_json::to_string(&request) {
        Ok(init) => init,
        Err(err) => {
            fail(inner, format!("could not encode request: {err}"));
            return;
        }
    };
    if let Err(err) = ws.send(Message::Text(init)).await {
        fail(inner, format!("could not send request: {err}"));
        return;
    }
    inner.state.send_replace(SessionState::Streaming);

    loop {
        tokio::select! {
            _ = cancel.changed() => {
                let _ = ws.close(None).await;
                closed(inner);
                return;
            }
            message = ws.next() => match message {
                None => {
                    // transport dropped without a terminal frame
                    closed(inner);
                    return;
                }
                Some(Err(err)) => {
                    fail(inner, format!("connection lost: {err}"));
                    return;
                }
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<StreamFrame>(&text) {
                    Ok(StreamFrame::Token { content }) => {
                        inner.buffer.send_modify(|buffer| buffer.push_str(&content));
                        let _ = inner.events.send(SessionEvent::Token(content));
                    }
                    Ok(StreamFrame::Done) => {
                        inner.state.send_replace(SessionState::Completed);
                        let content = inner.buffer.borrow().clone();
                        let _ = inner.events.send(SessionEvent::Completed { content });
                        let _ = ws.close(None).await;
                        return;
                    }
                    Ok(StreamFrame::Error { error }) => {
                        fail(inner, error);
                        let _ = ws.close(None).await;
                        return;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping malformed stream frame");
                    }
                },
                Some(Ok(Message::Close(_))) => {
                    closed(inner);
                    return;
                }
                Some(Ok(_)) => {}
            }
        }
    }
}
