//! Process-wide "unauthorized" broadcast.

use tokio::sync::broadcast;
use tracing::debug;

/// Buffered emissions per subscriber before it starts lagging.
const SIGNAL_CAPACITY: usize = 16;

/// Event emitted when any request receives a 401. Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthorized;

/// Broadcast channel fired by the HTTP client on authentication failure.
///
/// Every failing response emits once, so subscribers see repeated events
/// when several in-flight requests fail together and must treat them
/// idempotently.
#[derive(Debug, Clone)]
pub struct UnauthorizedSignal {
    tx: broadcast::Sender<Unauthorized>,
}

impl UnauthorizedSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to future emissions.
    pub fn subscribe(&self) -> broadcast::Receiver<Unauthorized> {
        self.tx.subscribe()
    }

    /// Emit the signal. Returns the number of subscribers reached.
    pub fn emit(&self) -> usize {
        let reached = self.tx.send(Unauthorized).unwrap_or(0);
        debug!(subscribers = reached, "Unauthorized signal emitted");
        reached
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for UnauthorizedSignal {
    fn default() -> Self {
        Self::new()
    }
}
