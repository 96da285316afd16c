//! FIFO of accepted provision requests awaiting host assignment.

use tokio::sync::mpsc;

use crate::model::{ProvisionInput, ProvisionOutput};

/// A provision request accepted by the pool and queued for assignment.
#[derive(Clone, Debug)]
pub(crate) struct ProvisionRequest {
    /// Original caller input.
    pub input: ProvisionInput,
    /// Ledger snapshot taken when the request was accepted.
    pub snapshot: ProvisionOutput,
}

/// Sending half of the request FIFO, held by the pool.
#[derive(Clone, Debug)]
pub(crate) struct RequestQueue {
    tx: mpsc::UnboundedSender<ProvisionRequest>,
}

/// Receiving half of the request FIFO, owned by the assignment loop.
#[derive(Debug)]
pub(crate) struct RequestReceiver {
    rx: mpsc::UnboundedReceiver<ProvisionRequest>,
}

/// Creates an unbounded request FIFO.
pub(crate) fn request_queue() -> (RequestQueue, RequestReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RequestQueue { tx }, RequestReceiver { rx })
}

impl RequestQueue {
    /// Appends a request without blocking. Returns `false` once the
    /// assignment loop has stopped.
    pub fn enqueue(&self, request: ProvisionRequest) -> bool {
        self.tx.send(request).is_ok()
    }
}

impl RequestReceiver {
    /// Removes the oldest request, waiting until one is enqueued. Returns
    /// `None` when every sender has been dropped.
    pub async fn take(&mut self) -> Option<ProvisionRequest> {
        self.rx.recv().await
    }
}
