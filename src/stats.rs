//! Engine and session statistics for monitoring and tests.
//!
//! This module provides [`EngineStats`], a point-in-time snapshot of the
//! engine handle, served by `GET /stats`.
//!
//! # Example
//!
//! ```rust,ignore
//! let stats = handle.stats();
//! println!("generation {:?}, {} sessions in flight",
//!     stats.generation, stats.sessions_in_flight());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of engine statistics.
///
/// # Fields
///
/// | Field | Description |
/// |-------|-------------|
/// | `installed` | An engine occupies the handle's slot |
/// | `generation` | Launch number of the installed engine |
/// | `launches` | Successful launches, startup included |
/// | `restarts` | Recovery attempts made on behalf of requests |
/// | `sessions_opened` | Sessions opened since startup |
/// | `sessions_closed` | Sessions closed since startup |
///
/// `installed` does not probe the process; use
/// [`EngineHandle::is_live`](crate::EngineHandle::is_live) for that.
///
/// # Example
///
/// ```rust
/// use html2pdf_server::EngineStats;
///
/// let stats = EngineStats {
///     installed: true,
///     generation: Some(2),
///     launches: 2,
///     restarts: 1,
///     sessions_opened: 10,
///     sessions_closed: 8,
/// };
///
/// assert_eq!(stats.sessions_in_flight(), 2);
/// assert!(!stats.is_balanced());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub installed: bool,
    pub generation: Option<u64>,
    pub launches: u64,
    pub restarts: u64,
    pub sessions_opened: u64,
    pub sessions_closed: u64,
}

impl EngineStats {
    /// Sessions opened but not yet closed.
    #[inline]
    pub fn sessions_in_flight(&self) -> u64 {
        self.sessions_opened.saturating_sub(self.sessions_closed)
    }

    /// Every opened session has been closed.
    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.sessions_opened == self.sessions_closed
    }
}

impl fmt::Display for EngineStats {
    /// ```rust
    /// use html2pdf_server::EngineStats;
    ///
    /// let stats = EngineStats {
    ///     installed: true,
    ///     generation: Some(1),
    ///     launches: 1,
    ///     restarts: 0,
    ///     sessions_opened: 4,
    ///     sessions_closed: 3,
    /// };
    ///
    /// assert_eq!(
    ///     stats.to_string(),
    ///     "EngineStats { generation: 1, launches: 1, restarts: 0, sessions: 3/4 closed }"
    /// );
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let generation = match self.generation {
            Some(g) => g.to_string(),
            None => "none".to_string(),
        };
        write!(
            f,
            "EngineStats {{ generation: {}, launches: {}, restarts: {}, sessions: {}/{} closed }}",
            generation, self.launches, self.restarts, self.sessions_closed, self.sessions_opened
        )
    }
}

/// Process-wide session counters, shared by every engine generation.
#[derive(Debug, Default)]
pub(crate) struct SessionLedger {
    opened: AtomicU64,
    closed: AtomicU64,
}

impl SessionLedger {
    /// Record an open and return the new session's id.
    pub(crate) fn record_open(&self) -> u64 {
        self.opened.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn record_close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> u64 {
        self.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_saturates() {
        let stats = EngineStats {
            installed: false,
            generation: None,
            launches: 0,
            restarts: 0,
            sessions_opened: 1,
            sessions_closed: 2,
        };
        assert_eq!(stats.sessions_in_flight(), 0);
    }

    #[test]
    fn test_display_without_engine() {
        let stats = EngineStats {
            installed: false,
            generation: None,
            launches: 0,
            restarts: 0,
            sessions_opened: 0,
            sessions_closed: 0,
        };
        assert!(stats.to_string().contains("generation: none"));
        assert!(stats.is_balanced());
    }

    #[test]
    fn test_serializes_to_json() {
        let stats = EngineStats {
            installed: true,
            generation: Some(1),
            launches: 1,
            restarts: 0,
            sessions_opened: 5,
            sessions_closed: 5,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["generation"], 1);
        assert_eq!(json["sessions_closed"], 5);
        assert_eq!(json["installed"], true);
    }

    #[test]
    fn test_ledger_ids_are_sequential() {
        let ledger = SessionLedger::default();
        assert_eq!(ledger.record_open(), 1);
        assert_eq!(ledger.record_open(), 2);
        ledger.record_close();
        assert_eq!(ledger.opened(), 2);
        assert_eq!(ledger.closed(), 1);
    }
}
