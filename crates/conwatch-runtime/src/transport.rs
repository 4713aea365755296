//! Single-shot request/response between contexts.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The receiving context is gone, or dropped the request unanswered.
    #[error("receiving context unreachable")]
    Unreachable,
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// A message plus an optional reply slot. `None` means fire-and-forget.
pub struct Envelope<M, R> {
    pub message: M,
    pub reply: Option<oneshot::Sender<R>>,
}

impl<M, R> Envelope<M, R> {
    /// Answer the sender, if it is still waiting.
    pub fn respond(self, response: R) {
        if let Some(reply) = self.reply {
            let _ = reply.send(response);
        }
    }
}

/// Sending half of a context's inbox.
pub struct Channel<M, R> {
    tx: mpsc::UnboundedSender<Envelope<M, R>>,
    timeout: Duration,
}

impl<M, R> Clone for Channel<M, R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            timeout: self.timeout,
        }
    }
}

/// Create an inbox whose requests time out after `timeout`.
pub fn channel<M, R>(timeout: Duration) -> (Channel<M, R>, mpsc::UnboundedReceiver<Envelope<M, R>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Channel { tx, timeout }, rx)
}

impl<M, R> Channel<M, R> {
    /// Send `message` and wait for the single response.
    pub async fn request(&self, message: M) -> Result<R, TransportError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                message,
                reply: Some(reply),
            })
            .map_err(|_| TransportError::Unreachable)?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(TransportError::Unreachable),
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }

    /// Send `message` without waiting for (or expecting) a response.
    pub fn notify(&self, message: M) -> Result<(), TransportError> {
        self.tx
            .send(Envelope {
                message,
                reply: None,
            })
            .map_err(|_| TransportError::Unreachable)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
