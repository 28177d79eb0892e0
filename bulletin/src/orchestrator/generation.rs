use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request counter used to discard results of superseded requests.
#[derive(Debug, Default)]
pub struct RequestGeneration(AtomicU64);

/// Generation captured when a request started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl RequestGeneration {
    /// Start a new request, invalidating every ticket handed out before.
    pub fn advance(&self) -> Ticket {
        Ticket(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.0.load(Ordering::SeqCst) == ticket.0
    }

    /// Zero until the first request starts.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
