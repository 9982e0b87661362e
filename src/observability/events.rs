//! Observable events
//!
//! Every log line the service emits names one of these.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Process lifecycle
    ConfigLoaded,
    ServerListening,

    // Query lifecycle
    /// New query accepted, state reset
    QueryStart,
    /// Query rejected before any state was created
    QueryRejected,
    /// Block merged into the running state
    BlockFetched,
    /// Source failure, state untouched
    BlockFailed,
    /// Source returned a short block
    QueryExhausted,
    /// Refine on an exhausted query
    RefineNoop,

    // Sessions
    SessionCreated,
    SessionEvicted,
    SessionClosed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ServerListening => "SERVER_LISTENING",
            Event::QueryStart => "QUERY_START",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::BlockFetched => "BLOCK_FETCHED",
            Event::BlockFailed => "BLOCK_FAILED",
            Event::QueryExhausted => "QUERY_EXHAUSTED",
            Event::RefineNoop => "REFINE_NOOP",
            Event::SessionCreated => "SESSION_CREATED",
            Event::SessionEvicted => "SESSION_EVICTED",
            Event::SessionClosed => "SESSION_CLOSED",
        }
    }

    /// Events that indicate something went wrong for the caller
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::QueryRejected | Event::BlockFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
