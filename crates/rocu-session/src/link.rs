use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("vehicle link not connected")]
    NotConnected,
    #[error("link closed")]
    Closed,
    #[error("link outbound queue full")]
    Full,
    #[error("encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound side of one connection (vehicle or observer).
///
/// The transport drains the paired receiver into its socket; once the
/// connection dies the receiver is dropped and every send reports `Closed`.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    id: u64,
    tx: mpsc::Sender<String>,
}

impl LinkHandle {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { id: NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed), tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Never waits: a full queue is `Full`, a dropped receiver is `Closed`.
    pub fn try_send(&self, text: String) -> Result<(), LinkError> {
        self.tx.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => LinkError::Full,
            TrySendError::Closed(_) => LinkError::Closed,
        })
    }
}
