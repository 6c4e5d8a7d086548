//! A launched engine plus the metadata the handle tracks for it.
//!
//! # Architecture
//!
//! ```text
//! TrackedEngine
//! ├── generation: u64 (1 for the first launch, +1 per restart)
//! ├── engine: Arc<dyn RenderEngine> (shared with in-flight requests)
//! ├── ledger: Arc<SessionLedger> (outlives restarts)
//! └── launched_at: Instant
//! ```
//!
//! Cloning is cheap. Requests clone a snapshot out of the
//! [`EngineHandle`](crate::EngineHandle) and use it without holding any lock;
//! a restart swaps the handle's slot and never touches existing snapshots.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::RenderEngine;
use crate::stats::SessionLedger;

/// A live (or formerly live) engine with its launch metadata.
#[derive(Clone)]
pub struct TrackedEngine {
    generation: u64,
    engine: Arc<dyn RenderEngine>,
    ledger: Arc<SessionLedger>,
    launched_at: Instant,
}

impl TrackedEngine {
    pub(crate) fn new(
        generation: u64,
        engine: Box<dyn RenderEngine>,
        ledger: Arc<SessionLedger>,
    ) -> Self {
        Self {
            generation,
            engine: Arc::from(engine),
            ledger,
            launched_at: Instant::now(),
        }
    }

    /// Launch sequence number.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Time since launch.
    pub fn age(&self) -> Duration {
        self.launched_at.elapsed()
    }

    pub fn engine(&self) -> &dyn RenderEngine {
        self.engine.as_ref()
    }

    /// Session counters shared across every generation.
    pub(crate) fn ledger(&self) -> &Arc<SessionLedger> {
        &self.ledger
    }

    /// Blocking liveness probe.
    pub fn is_live(&self) -> bool {
        self.engine.is_live()
    }
}

impl fmt::Debug for TrackedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedEngine")
            .field("generation", &self.generation)
            .field("age", &self.age())
            .finish()
    }
}
