//! In-memory engine for tests.
//!
//! [`MockEngineFactory`] launches engines that need no Chrome install. They
//! count every launch, session open, and session close, and can be steered
//! into failures in two ways:
//!
//! - **Per factory**: launch failures ([`always_fails`](MockEngineFactory::always_fails),
//!   [`fail_after_n`](MockEngineFactory::fail_after_n)), slow launches, and
//!   session-open failures.
//! - **Per request**: markers embedded in the HTML source, so one factory can
//!   serve a mix of healthy and failing requests concurrently:
//!
//! | Marker | Effect |
//! |--------|--------|
//! | [`LOAD_ERROR_MARKER`] | `load` returns `EngineError::Load` |
//! | [`NEVER_SETTLES_MARKER`] | `load` blocks until its timeout, then `LoadTimeout` |
//! | [`SLOW_LOAD_MARKER`] | `load` sleeps [`SLOW_LOAD_DELAY`] then succeeds |
//! | [`RENDER_ERROR_MARKER`] | `render` returns `EngineError::Render` |
//! | [`EMPTY_RENDER_MARKER`] | `render` returns zero bytes |
//! | [`PANIC_MARKER`] | `load` panics |
//!
//! # Feature Flag
//!
//! Available with the `test-utils` feature or under `#[cfg(test)]`.
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_server::engine::mock::MockEngineFactory;
//!
//! let factory = MockEngineFactory::new();
//! let probe = factory.probe();
//!
//! // ... hand `factory` to an EngineHandle, run requests ...
//!
//! assert_eq!(probe.sessions_opened(), probe.sessions_closed());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{EngineFactory, RenderEngine, RenderSession};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::options::{ContentSource, LoadOptions, PageOptions};

/// Makes `load` fail.
pub const LOAD_ERROR_MARKER: &str = "mock:load-error";

/// Makes `load` block until its timeout elapses.
pub const NEVER_SETTLES_MARKER: &str = "mock:never-settles";

/// Makes `load` take [`SLOW_LOAD_DELAY`].
pub const SLOW_LOAD_MARKER: &str = "mock:slow";

/// Makes `render` fail.
pub const RENDER_ERROR_MARKER: &str = "mock:render-error";

/// Makes `render` succeed with an empty document.
pub const EMPTY_RENDER_MARKER: &str = "mock:empty-render";

/// Makes `load` panic.
pub const PANIC_MARKER: &str = "mock:panic";

/// How long a [`SLOW_LOAD_MARKER`] load takes.
pub const SLOW_LOAD_DELAY: Duration = Duration::from_millis(300);

const SETTLE_POLL: Duration = Duration::from_millis(10);

/// Counters and last-seen values shared by a factory and everything it
/// launches.
#[derive(Default)]
struct MockState {
    launch_attempts: AtomicUsize,
    launches: AtomicUsize,
    engines_closed: AtomicUsize,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    renders: AtomicUsize,
    current: Mutex<Option<Arc<AtomicBool>>>,
    last_source: Mutex<Option<ContentSource>>,
    last_page: Mutex<Option<PageOptions>>,
}

// ============================================================================
// Factory
// ============================================================================

/// Engine factory for tests without Chrome.
///
/// # Example
///
/// ```rust,ignore
/// use html2pdf_server::engine::mock::MockEngineFactory;
/// use std::time::Duration;
///
/// // Launch fails every time
/// let factory = MockEngineFactory::always_fails("Chrome not installed");
///
/// // First launch succeeds, restarts fail
/// let factory = MockEngineFactory::fail_after_n(1, "Out of memory");
///
/// // Slow launch, to widen restart races
/// let factory = MockEngineFactory::new().with_launch_delay(Duration::from_millis(200));
/// ```
pub struct MockEngineFactory {
    state: Arc<MockState>,
    launch_error: Option<String>,
    fail_after: Option<usize>,
    launch_delay: Duration,
    open_error: Option<String>,
}

impl MockEngineFactory {
    /// Factory whose launches always succeed.
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::default()),
            launch_error: None,
            fail_after: None,
            launch_delay: Duration::ZERO,
            open_error: None,
        }
    }

    /// Factory whose launches always fail with `message`.
    pub fn always_fails<S: Into<String>>(message: S) -> Self {
        Self {
            launch_error: Some(message.into()),
            ..Self::new()
        }
    }

    /// Factory that launches `n` engines, then fails with `message`.
    pub fn fail_after_n<S: Into<String>>(n: usize, message: S) -> Self {
        Self {
            launch_error: Some(message.into()),
            fail_after: Some(n),
            ..Self::new()
        }
    }

    /// Sleep for `delay` inside every launch.
    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    /// Engines refuse to open sessions, with `message`.
    pub fn with_open_error<S: Into<String>>(mut self, message: S) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// Observer sharing this factory's counters. Stays valid after the
    /// factory is moved into a handle.
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn should_fail(&self, attempt: usize) -> Option<&str> {
        let message = self.launch_error.as_deref()?;
        match self.fail_after {
            Some(n) if attempt < n => None,
            _ => Some(message),
        }
    }
}

impl Default for MockEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockEngineFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockEngineFactory")
            .field("launch_error", &self.launch_error)
            .field("fail_after", &self.fail_after)
            .field("launch_delay", &self.launch_delay)
            .field("open_error", &self.open_error)
            .field("launches", &self.state.launches.load(Ordering::SeqCst))
            .finish()
    }
}

impl EngineFactory for MockEngineFactory {
    fn launch(&self, _config: &EngineConfig) -> Result<Box<dyn RenderEngine>> {
        let attempt = self.state.launch_attempts.fetch_add(1, Ordering::SeqCst);

        if !self.launch_delay.is_zero() {
            std::thread::sleep(self.launch_delay);
        }

        if let Some(message) = self.should_fail(attempt) {
            log::debug!("MockEngineFactory: launch #{} failing", attempt + 1);
            return Err(EngineError::Launch(message.to_string()));
        }

        let alive = Arc::new(AtomicBool::new(true));
        *self
            .state
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&alive));
        self.state.launches.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockEngine {
            state: Arc::clone(&self.state),
            alive,
            open_error: self.open_error.clone(),
        }))
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Read-side view of a [`MockEngineFactory`]'s counters.
#[derive(Clone)]
pub struct MockProbe {
    state: Arc<MockState>,
}

impl MockProbe {
    /// Launch calls, failed ones included.
    pub fn launch_attempts(&self) -> usize {
        self.state.launch_attempts.load(Ordering::SeqCst)
    }

    /// Successful launches.
    pub fn launches(&self) -> usize {
        self.state.launches.load(Ordering::SeqCst)
    }

    /// Engines closed through [`RenderEngine::close`]. Crashes from
    /// [`kill_engine`](Self::kill_engine) do not count.
    pub fn engines_closed(&self) -> usize {
        self.state.engines_closed.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.sessions_closed.load(Ordering::SeqCst)
    }

    /// Successful renders.
    pub fn renders(&self) -> usize {
        self.state.renders.load(Ordering::SeqCst)
    }

    /// Simulate a crash of the most recently launched engine.
    pub fn kill_engine(&self) {
        if let Some(alive) = self
            .state
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            alive.store(false, Ordering::SeqCst);
        }
    }

    /// Source passed to the most recent `load`.
    pub fn last_source(&self) -> Option<ContentSource> {
        self.state
            .last_source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Page options passed to the most recent `render`.
    pub fn last_page(&self) -> Option<PageOptions> {
        *self
            .state
            .last_page
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Engine and Session
// ============================================================================

struct MockEngine {
    state: Arc<MockState>,
    alive: Arc<AtomicBool>,
    open_error: Option<String>,
}

impl RenderEngine for MockEngine {
    fn open_session(&self) -> Result<Box<dyn RenderSession>> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(EngineError::SessionOpen("engine is not running".to_string()));
        }
        if let Some(message) = &self.open_error {
            return Err(EngineError::SessionOpen(message.clone()));
        }

        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
            loaded: None,
        }))
    }

    fn is_live(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn close(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            self.state.engines_closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn version(&self) -> Option<String> {
        Some("MockEngine/1.0".to_string())
    }
}

struct MockSession {
    state: Arc<MockState>,
    loaded: Option<ContentSource>,
}

fn has_marker(source: &ContentSource, marker: &str) -> bool {
    match source {
        ContentSource::Html(html) => html.contains(marker),
        ContentSource::Url(url) => url.contains(marker),
    }
}

impl RenderSession for MockSession {
    fn load(&mut self, source: &ContentSource, options: &LoadOptions) -> Result<()> {
        *self
            .state
            .last_source
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(source.clone());

        if has_marker(source, PANIC_MARKER) {
            panic!("mock engine crashed while loading");
        }
        if has_marker(source, LOAD_ERROR_MARKER) {
            return Err(EngineError::Load("net::ERR_NAME_NOT_RESOLVED".to_string()));
        }
        if has_marker(source, NEVER_SETTLES_MARKER) {
            let started = Instant::now();
            while started.elapsed() < options.timeout {
                std::thread::sleep(SETTLE_POLL);
            }
            return Err(EngineError::LoadTimeout(format!(
                "network did not settle within {:?}",
                options.timeout
            )));
        }
        if has_marker(source, SLOW_LOAD_MARKER) {
            std::thread::sleep(SLOW_LOAD_DELAY);
        }

        self.loaded = Some(source.clone());
        Ok(())
    }

    fn render(&mut self, options: &PageOptions) -> Result<Vec<u8>> {
        let source = self
            .loaded
            .as_ref()
            .ok_or_else(|| EngineError::Render("nothing loaded".to_string()))?;

        if has_marker(source, RENDER_ERROR_MARKER) {
            return Err(EngineError::Render("printToPDF failed".to_string()));
        }
        if has_marker(source, EMPTY_RENDER_MARKER) {
            return Ok(Vec::new());
        }

        *self
            .state
            .last_page
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(*options);
        self.state.renders.fetch_add(1, Ordering::SeqCst);

        let (width, height) = options.format.dimensions_inches();
        Ok(format!(
            "%PDF-1.7\n% mock {}x{}in landscape={}\n%%EOF\n",
            width, height, options.landscape
        )
        .into_bytes())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.state.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Verifies that always_fails factory fails and counts attempts.
    #[test]
    fn test_mock_factory_always_fails() {
        let factory = MockEngineFactory::always_fails("Test error");
        let probe = factory.probe();

        let result = factory.launch(&EngineConfig::default());
        match result {
            Err(EngineError::Launch(msg)) => assert_eq!(msg, "Test error"),
            _ => panic!("Expected Launch error"),
        }
        assert_eq!(probe.launch_attempts(), 1);
        assert_eq!(probe.launches(), 0);
    }

    /// Verifies that fail_after_n allows N launches before failing.
    #[test]
    fn test_mock_factory_fail_after_n() {
        let factory = MockEngineFactory::fail_after_n(2, "Exhausted");
        let config = EngineConfig::default();

        assert!(factory.launch(&config).is_ok());
        assert!(factory.launch(&config).is_ok());
        assert!(factory.launch(&config).is_err());
        assert!(factory.launch(&config).is_err());
        assert_eq!(factory.probe().launches(), 2);
        assert_eq!(factory.probe().launch_attempts(), 4);
    }

    #[test]
    fn test_mock_session_renders_pdf_bytes() {
        let factory = MockEngineFactory::new();
        let probe = factory.probe();
        let engine = factory.launch(&EngineConfig::default()).unwrap();

        let mut session = engine.open_session().unwrap();
        session
            .load(&ContentSource::html("<h1>ok</h1>"), &LoadOptions::default())
            .unwrap();
        let pdf = session.render(&PageOptions::default()).unwrap();
        session.close().unwrap();

        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(probe.sessions_opened(), 1);
        assert_eq!(probe.sessions_closed(), 1);
        assert_eq!(probe.renders(), 1);
        assert_eq!(probe.last_page(), Some(PageOptions::default()));
    }

    #[test]
    fn test_mock_markers() {
        let factory = MockEngineFactory::new();
        let engine = factory.launch(&EngineConfig::default()).unwrap();
        let options = LoadOptions {
            timeout: Duration::from_millis(50),
            ..LoadOptions::default()
        };

        let mut session = engine.open_session().unwrap();
        let err = session
            .load(&ContentSource::html(LOAD_ERROR_MARKER), &options)
            .unwrap_err();
        assert!(matches!(err, EngineError::Load(_)));

        let started = Instant::now();
        let err = session
            .load(&ContentSource::html(NEVER_SETTLES_MARKER), &options)
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() >= Duration::from_millis(50));

        session
            .load(&ContentSource::html(RENDER_ERROR_MARKER), &options)
            .unwrap();
        let err = session.render(&PageOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::Render(_)));
    }

    /// Verifies kill_engine flips liveness without counting as a close.
    #[test]
    fn test_kill_and_close() {
        let factory = MockEngineFactory::new();
        let probe = factory.probe();
        let engine = factory.launch(&EngineConfig::default()).unwrap();

        assert!(engine.is_live());
        probe.kill_engine();
        assert!(!engine.is_live());
        assert!(engine.open_session().is_err());
        assert_eq!(probe.engines_closed(), 0);

        let engine = factory.launch(&EngineConfig::default()).unwrap();
        engine.close();
        engine.close();
        assert_eq!(probe.engines_closed(), 1, "close is idempotent");
    }
}
