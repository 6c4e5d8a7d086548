//! Process-wide owner of the rendering engine.
//!
//! This module provides [`EngineHandle`], which holds at most one live
//! engine and is the only thing allowed to launch, replace, or close it.
//!
//! # Overview
//!
//! ```text
//! EngineHandle
//! ├── current: RwLock<Option<TrackedEngine>>   slot, swapped on launch/close
//! ├── restart_gate: tokio Mutex<()>            serializes launch/restart/shutdown
//! ├── factory: Arc<dyn EngineFactory>
//! └── ledger: Arc<SessionLedger>               sessions opened/closed
//! ```
//!
//! # Restart Protocol
//!
//! [`ensure_live()`](EngineHandle::ensure_live) is called once per request:
//!
//! ```text
//! probe slot ──live──▶ return snapshot
//!     │
//!   dead/empty
//!     ▼
//! acquire restart_gate ──▶ probe again ──live──▶ return snapshot
//!                              │                 (someone else restarted)
//!                            dead
//!                              ▼
//!                    close old engine, launch new one
//! ```
//!
//! Requests that find the engine dead while a restart is in progress queue
//! on the gate and then see the freshly launched engine, so a burst of
//! requests after a crash causes one launch.
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_server::{ChromeEngineFactory, EngineConfig, EngineHandle};
//!
//! let handle = EngineHandle::builder()
//!     .config(EngineConfig::default())
//!     .factory(Box::new(ChromeEngineFactory::new()))
//!     .build()?;
//!
//! handle.launch().await?;
//! let engine = handle.ensure_live().await?;
//! // ... open sessions on `engine` ...
//! handle.shutdown().await;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use crate::config::EngineConfig;
use crate::engine::EngineFactory;
use crate::error::{EngineError, Result};
use crate::stats::{EngineStats, SessionLedger};
use crate::tracked::TrackedEngine;

/// Upper bound on one liveness probe. A hung engine counts as dead.
const LIVENESS_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Owner of the single engine process.
///
/// Shared as `Arc<EngineHandle>` between the lifecycle controller and the
/// HTTP router. All methods take `&self`.
pub struct EngineHandle {
    config: EngineConfig,
    factory: Arc<dyn EngineFactory>,
    current: RwLock<Option<TrackedEngine>>,
    restart_gate: tokio::sync::Mutex<()>,
    ledger: Arc<SessionLedger>,
    launches: AtomicU64,
    restarts: AtomicU64,
    shutting_down: AtomicBool,
}

impl EngineHandle {
    /// Create a builder.
    pub fn builder() -> EngineHandleBuilder {
        EngineHandleBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of the installed engine, live or not. Does not probe.
    pub fn current(&self) -> Option<TrackedEngine> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    fn slot_mut(&self) -> RwLockWriteGuard<'_, Option<TrackedEngine>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launch the engine, replacing (and closing) any installed one.
    ///
    /// Used at startup. Requests go through
    /// [`ensure_live()`](Self::ensure_live) instead.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ShuttingDown`] after [`shutdown()`](Self::shutdown)
    /// - Whatever the factory returns, typically [`EngineError::Launch`]
    pub async fn launch(&self) -> Result<TrackedEngine> {
        let _gate = self.restart_gate.lock().await;
        self.replace_engine().await
    }

    /// Close the installed engine, then launch a new one. Caller holds the
    /// restart gate.
    async fn replace_engine(&self) -> Result<TrackedEngine> {
        if self.is_shutting_down() {
            return Err(EngineError::ShuttingDown);
        }

        let previous = self.slot_mut().take();
        let factory = Arc::clone(&self.factory);
        let config = self.config.clone();

        let result = tokio::task::spawn_blocking(move || {
            if let Some(previous) = previous {
                log::debug!("Closing engine generation {}", previous.generation());
                previous.engine().close();
            }
            factory.launch(&config)
        })
        .await;

        let engine = match result {
            Ok(Ok(engine)) => engine,
            Ok(Err(e)) => {
                log::error!("❌ Engine launch failed: {}", e);
                return Err(e);
            }
            Err(e) => {
                log::error!("❌ Engine launch task failed: {}", e);
                return Err(EngineError::Launch(e.to_string()));
            }
        };

        let generation = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
        let tracked = TrackedEngine::new(generation, engine, Arc::clone(&self.ledger));
        *self.slot_mut() = Some(tracked.clone());

        log::info!("✅ Engine generation {} is live", generation);
        Ok(tracked)
    }

    /// Probe the installed engine and return it if it responds.
    pub async fn live_engine(&self) -> Option<TrackedEngine> {
        let tracked = self.current()?;
        let probe = tracked.clone();

        let result = tokio::time::timeout(
            LIVENESS_PROBE_TIMEOUT,
            tokio::task::spawn_blocking(move || probe.is_live()),
        )
        .await;

        match result {
            Ok(Ok(true)) => Some(tracked),
            Ok(Ok(false)) => None,
            Ok(Err(e)) => {
                log::warn!("⚠️ Liveness probe task failed: {}", e);
                None
            }
            Err(_) => {
                log::warn!(
                    "⚠️ Engine generation {} did not answer within {:?}",
                    tracked.generation(),
                    LIVENESS_PROBE_TIMEOUT
                );
                None
            }
        }
    }

    /// Whether an engine is installed and responds to a probe.
    pub async fn is_live(&self) -> bool {
        self.live_engine().await.is_some()
    }

    /// Return a live engine, restarting at most once if needed.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ShuttingDown`] once shutdown has started
    /// - The launch error if the single restart attempt fails
    pub async fn ensure_live(&self) -> Result<TrackedEngine> {
        if self.is_shutting_down() {
            return Err(EngineError::ShuttingDown);
        }

        if let Some(tracked) = self.live_engine().await {
            return Ok(tracked);
        }

        let _gate = self.restart_gate.lock().await;

        if let Some(tracked) = self.live_engine().await {
            log::debug!(
                "Engine generation {} was restarted by a concurrent request",
                tracked.generation()
            );
            return Ok(tracked);
        }

        log::warn!("⚠️ Engine not live. Attempting restart.");
        self.restarts.fetch_add(1, Ordering::SeqCst);
        self.replace_engine().await
    }

    /// Refuse new work and close the installed engine.
    ///
    /// Waits for an in-progress launch or restart to finish first, so no
    /// engine can be installed after this returns. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            log::debug!("Engine shutdown already requested");
        }

        let _gate = self.restart_gate.lock().await;
        let Some(tracked) = self.slot_mut().take() else {
            log::debug!("No engine to close");
            return;
        };

        let generation = tracked.generation();
        log::info!("Closing engine generation {}...", generation);
        match tokio::task::spawn_blocking(move || tracked.engine().close()).await {
            Ok(()) => log::info!("✅ Engine generation {} closed", generation),
            Err(e) => log::error!("❌ Engine close task failed: {}", e),
        }
    }

    /// Point-in-time statistics.
    pub fn stats(&self) -> EngineStats {
        let current = self.current();
        EngineStats {
            installed: current.is_some(),
            generation: current.map(|t| t.generation()),
            launches: self.launches.load(Ordering::SeqCst),
            restarts: self.restarts.load(Ordering::SeqCst),
            sessions_opened: self.ledger.opened(),
            sessions_closed: self.ledger.closed(),
        }
    }
}

impl Drop for EngineHandle {
    /// Close any engine still installed, so the process never outlives
    /// the handle.
    fn drop(&mut self) {
        let slot = self
            .current
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(tracked) = slot.take() {
            log::debug!(
                "EngineHandle dropped, closing engine generation {}",
                tracked.generation()
            );
            tracked.engine().close();
        }
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`EngineHandle`].
///
/// # Example
///
/// ```rust
/// use html2pdf_server::EngineHandle;
///
/// // A factory is required
/// assert!(EngineHandle::builder().build().is_err());
/// ```
pub struct EngineHandleBuilder {
    config: Option<EngineConfig>,
    factory: Option<Box<dyn EngineFactory>>,
}

impl EngineHandleBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            factory: None,
        }
    }

    /// Engine configuration. Defaults to [`EngineConfig::default()`].
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Engine factory (required).
    pub fn factory(mut self, factory: Box<dyn EngineFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Build the handle. No engine is launched yet.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if no factory was provided.
    pub fn build(self) -> Result<Arc<EngineHandle>> {
        let factory = self
            .factory
            .ok_or_else(|| EngineError::Configuration("No engine factory provided".to_string()))?;
        let config = self.config.unwrap_or_default();

        log::debug!("Building engine handle with config: {:?}", config);

        Ok(Arc::new(EngineHandle {
            config,
            factory: Arc::from(factory),
            current: RwLock::new(None),
            restart_gate: tokio::sync::Mutex::new(()),
            ledger: Arc::new(SessionLedger::default()),
            launches: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
        }))
    }
}

impl Default for EngineHandleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngineFactory;

    fn handle_with(factory: MockEngineFactory) -> Arc<EngineHandle> {
        EngineHandle::builder()
            .factory(Box::new(factory))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_launch_installs_engine() {
        let factory = MockEngineFactory::new();
        let probe = factory.probe();
        let handle = handle_with(factory);

        assert!(!handle.is_live().await);
        let tracked = handle.launch().await.unwrap();

        assert_eq!(tracked.generation(), 1);
        assert!(handle.is_live().await);
        assert_eq!(probe.launches(), 1);

        let stats = handle.stats();
        assert!(stats.installed);
        assert_eq!(stats.generation, Some(1));
        assert_eq!(stats.restarts, 0);
    }

    #[tokio::test]
    async fn test_launch_failure_leaves_slot_empty() {
        let handle = handle_with(MockEngineFactory::always_fails("no chrome"));

        let err = handle.launch().await.unwrap_err();
        assert!(matches!(err, EngineError::Launch(msg) if msg == "no chrome"));
        assert!(handle.current().is_none());
        assert_eq!(handle.stats().launches, 0);
    }

    /// Verifies a live engine is returned without any restart.
    #[tokio::test]
    async fn test_ensure_live_with_live_engine() {
        let factory = MockEngineFactory::new();
        let probe = factory.probe();
        let handle = handle_with(factory);
        handle.launch().await.unwrap();

        for _ in 0..5 {
            handle.ensure_live().await.unwrap();
        }

        assert_eq!(probe.launch_attempts(), 1);
        assert_eq!(handle.stats().restarts, 0);
    }

    /// Verifies a dead engine is closed and replaced exactly once.
    #[tokio::test]
    async fn test_ensure_live_restarts_dead_engine() {
        let factory = MockEngineFactory::new();
        let probe = factory.probe();
        let handle = handle_with(factory);
        handle.launch().await.unwrap();

        probe.kill_engine();
        let tracked = handle.ensure_live().await.unwrap();

        assert_eq!(tracked.generation(), 2);
        assert_eq!(probe.launches(), 2);
        assert_eq!(handle.stats().restarts, 1);
        assert!(handle.is_live().await);
    }

    #[tokio::test]
    async fn test_ensure_live_failed_restart() {
        let factory = MockEngineFactory::fail_after_n(1, "out of memory");
        let probe = factory.probe();
        let handle = handle_with(factory);
        handle.launch().await.unwrap();

        probe.kill_engine();
        let err = handle.ensure_live().await.unwrap_err();

        assert!(matches!(err, EngineError::Launch(_)));
        assert_eq!(probe.launch_attempts(), 2, "exactly one restart attempt");
        assert!(handle.current().is_none(), "dead engine was removed");
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_final() {
        let factory = MockEngineFactory::new();
        let probe = factory.probe();
        let handle = handle_with(factory);
        handle.launch().await.unwrap();

        handle.shutdown().await;
        handle.shutdown().await;

        assert_eq!(probe.engines_closed(), 1);
        assert!(handle.current().is_none());
        assert!(matches!(
            handle.ensure_live().await,
            Err(EngineError::ShuttingDown)
        ));
        assert!(matches!(handle.launch().await, Err(EngineError::ShuttingDown)));
        assert_eq!(probe.launch_attempts(), 1);
    }

    #[tokio::test]
    async fn test_drop_closes_engine() {
        let factory = MockEngineFactory::new();
        let probe = factory.probe();
        let handle = handle_with(factory);
        handle.launch().await.unwrap();

        drop(handle);
        assert_eq!(probe.engines_closed(), 1);
    }

    #[tokio::test]
    async fn test_relaunch_closes_previous_engine() {
        let factory = MockEngineFactory::new();
        let probe = factory.probe();
        let handle = handle_with(factory);

        handle.launch().await.unwrap();
        handle.launch().await.unwrap();

        assert_eq!(probe.launches(), 2);
        assert_eq!(probe.engines_closed(), 1, "at most one engine at a time");
    }
}
