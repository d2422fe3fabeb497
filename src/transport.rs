//! Async drivers that pull byte chunks from a transport and feed a
//! [`Session`].
//!
//! Connection setup stays with the caller; these functions only consume an
//! already-open body stream.

use crate::config::SessionConfig;
use crate::session::{Session, StreamHandler};
use crate::types::{ApiError, SessionEvent, StreamError, TransportError};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Feed every chunk of `stream` into `session` until the transport ends,
/// fails, is cancelled, or the sentinel completes the session.
///
/// The terminal outcome is reported through `Session::complete` and also
/// returned. When the sentinel arrives, reading stops and the stream is
/// dropped without a second completion. The same happens, with no
/// completion at all, once the handler reports that its consumer is gone.
pub async fn drive<S, B, E, T, H>(
    stream: S,
    session: &mut Session<T, H>,
    cancel: CancellationToken,
) -> Result<(), TransportError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
    T: DeserializeOwned,
    H: StreamHandler<T>,
{
    let mut stream = std::pin::pin!(stream);

    let outcome = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("SSE stream cancelled");
                break Err(TransportError::Cancelled);
            }
            chunk = stream.next() => {
                match chunk {
                    None => break Ok(()),
                    Some(Ok(bytes)) => {
                        session.feed(bytes.as_ref());
                        if session.is_completed() {
                            debug!("SSE sentinel received, closing stream");
                            return Ok(());
                        }
                        if session.is_handler_closed() {
                            debug!("SSE consumer dropped, closing stream");
                            return Ok(());
                        }
                    }
                    Some(Err(e)) => {
                        let err_str = e.to_string();
                        warn!("SSE transport error: {}", err_str);
                        break Err(TransportError::Network(err_str));
                    }
                }
            }
        }
    };

    session.complete(outcome.clone().err());
    outcome
}

/// Run a session over `stream` on a new tokio task and return its events.
pub fn spawn_events<T, S, B, E>(
    stream: S,
    config: SessionConfig,
    cancel: CancellationToken,
) -> EventStream<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: fmt::Display + Send,
{
    let (tx, rx) = mpsc::unbounded_channel::<SessionEvent<T>>();
    tokio::spawn(async move {
        let mut session = Session::<T, _>::with_config(config, tx);
        let _ = drive(stream, &mut session, cancel).await;
    });
    EventStream::new(rx)
}

/// Run a session over the body of an HTTP response.
///
/// A non-success status is not parsed as SSE: if the body matches the
/// error schema it is sent as `StreamError::Api`, then the stream completes
/// with `TransportError::Status`.
pub fn response_events<T>(
    response: reqwest::Response,
    config: SessionConfig,
    cancel: CancellationToken,
) -> EventStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<SessionEvent<T>>();
    tokio::spawn(async move {
        let mut session = Session::<T, _>::with_config(config, tx);
        let status = response.status();
        if !status.is_success() {
            match read_error_body(response, &cancel).await {
                Ok(body) => {
                    warn!("SSE request failed with status {}: {}", status, body);
                    report_status(&mut session, status.as_u16(), body);
                }
                Err(e) => session.complete(Some(e)),
            }
            return;
        }
        debug!("SSE response opened: status={}", status);
        let _ = drive(response.bytes_stream(), &mut session, cancel).await;
    });
    EventStream::new(rx)
}

async fn read_error_body(
    response: reqwest::Response,
    cancel: &CancellationToken,
) -> Result<String, TransportError> {
    let status = response.status();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        body = response.text() => body.map_err(|e| {
            warn!("Failed to read body of HTTP {} response: {}", status, e);
            TransportError::Network(e.to_string())
        }),
    }
}

fn report_status<T, H>(session: &mut Session<T, H>, status: u16, body: String)
where
    T: DeserializeOwned,
    H: StreamHandler<T>,
{
    if let Ok(api) = serde_json::from_str::<ApiError>(&body) {
        session.handler_mut().on_error(StreamError::Api(api));
    }
    session.complete(Some(TransportError::Status { status, body }));
}

/// Receiving end of a spawned session, as a `Stream` of [`SessionEvent`]s.
///
/// Ends after the task finishes, which is right after `Complete`.
pub struct EventStream<T> {
    inner: UnboundedReceiverStream<SessionEvent<T>>,
}

impl<T> EventStream<T> {
    pub fn new(rx: mpsc::UnboundedReceiver<SessionEvent<T>>) -> Self {
        Self {
            inner: UnboundedReceiverStream::new(rx),
        }
    }

    pub fn into_inner(self) -> mpsc::UnboundedReceiver<SessionEvent<T>> {
        self.inner.into_inner()
    }
}

impl<T> Stream for EventStream<T> {
    type Item = SessionEvent<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
