//! Rendering engine abstraction.
//!
//! The service talks to the engine through three traits:
//!
//! | Trait | Lifetime | Responsibility |
//! |-------|----------|----------------|
//! | [`EngineFactory`] | process | Launch an engine from [`EngineConfig`] |
//! | [`RenderEngine`] | until closed or crashed | Liveness, open sessions, close |
//! | [`RenderSession`] | one request | Load content, print, close |
//!
//! All trait methods are synchronous. Callers on the async side move them
//! onto the blocking pool with `tokio::task::spawn_blocking`.
//!
//! # Available Factories
//!
//! | Factory | Description |
//! |---------|-------------|
//! | [`ChromeEngineFactory`] | Headless Chrome/Chromium via `headless_chrome` |
//! | [`mock::MockEngineFactory`] | In-memory engine for tests (feature-gated) |
//!
//! # Custom Factory
//!
//! ```rust,ignore
//! use html2pdf_server::{EngineConfig, EngineFactory, RenderEngine, Result};
//!
//! struct RemoteChromeFactory {
//!     ws_url: String,
//! }
//!
//! impl EngineFactory for RemoteChromeFactory {
//!     fn launch(&self, config: &EngineConfig) -> Result<Box<dyn RenderEngine>> {
//!         // connect instead of launching
//!         todo!()
//!     }
//! }
//! ```

mod chrome;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use chrome::{ChromeEngine, ChromeEngineFactory, ChromeSession, build_print_options, create_chrome_options};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::options::{ContentSource, LoadOptions, PageOptions};

/// Launches rendering engines.
///
/// # Thread Safety
///
/// Requires `Send + Sync`: the factory is shared by every request that may
/// trigger a restart.
pub trait EngineFactory: Send + Sync {
    /// Start a new engine process.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Configuration`](crate::EngineError::Configuration) -
    ///   launch options could not be built
    /// - [`EngineError::Launch`](crate::EngineError::Launch) - the process
    ///   failed to start
    fn launch(&self, config: &EngineConfig) -> Result<Box<dyn RenderEngine>>;
}

/// A running engine process.
///
/// Shared read-only between requests; only the owning
/// [`EngineHandle`](crate::EngineHandle) closes or replaces it.
pub trait RenderEngine: Send + Sync {
    /// Allocate a new session (tab).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionOpen`](crate::EngineError::SessionOpen)
    /// if the engine cannot create a tab.
    fn open_session(&self) -> Result<Box<dyn RenderSession>>;

    /// Whether the process is still running and responsive.
    fn is_live(&self) -> bool;

    /// Terminate the process. Calling this on a closed engine is a no-op.
    fn close(&self);

    /// Engine version string, when the engine can report one.
    fn version(&self) -> Option<String> {
        None
    }
}

/// One tab, used by exactly one request.
///
/// Not `Sync`: a session is never shared.
pub trait RenderSession: Send {
    /// Load `source` and wait according to `options`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Load`](crate::EngineError::Load) - navigation failed
    /// - [`EngineError::LoadTimeout`](crate::EngineError::LoadTimeout) -
    ///   the page did not become ready within `options.timeout`
    fn load(&mut self, source: &ContentSource, options: &LoadOptions) -> Result<()>;

    /// Print the loaded page.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Render`](crate::EngineError::Render) on failure.
    fn render(&mut self, options: &PageOptions) -> Result<Vec<u8>>;

    /// Close the tab.
    fn close(self: Box<Self>) -> Result<()>;
}
