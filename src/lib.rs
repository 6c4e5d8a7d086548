//! # html2pdf-server
//!
//! HTTP service that renders HTML to PDF through one long-lived headless
//! Chrome process.
//!
//! Each request opens its own tab on the shared engine, loads inline HTML
//! or a same-origin URL, prints it, and closes the tab. If the engine has
//! died, the request triggers one restart; concurrent requests that see the
//! same dead engine wait on that restart instead of starting their own.
//!
//! ## Features
//!
//! - **Single Engine**: One Chrome process shared by all requests
//! - **Single-Flight Restart**: At most one relaunch per dead engine
//! - **RAII Sessions**: Tabs are closed on success, error, and panic
//! - **Bounded Requests**: Navigation and whole-request timeouts
//! - **Graceful Shutdown**: In-flight requests drain before Chrome exits
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             axum Router (server)            │
//! │  /generate-pdf  /health  /ready  /stats     │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │          service::generate_pdf()            │
//! │   validate ─▶ ensure_live ─▶ spawn_blocking │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │               EngineHandle                  │
//! │ ┌─────────────────────────────────────────┐ │
//! │ │  slot: Option<TrackedEngine>            │ │
//! │ │  restart gate (single flight)           │ │
//! │ └─────────────────────────────────────────┘ │
//! └─────────────────┬───────────────────────────┘
//!                   │ Session (one tab per request)
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │        Headless Chrome (headless_chrome)    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use html2pdf_server::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let config = ServerConfigBuilder::new()
//!         .port(3001)
//!         .static_dir("./public")
//!         .build()
//!         .unwrap();
//!
//!     match lifecycle::run(config, Box::new(ChromeEngineFactory::new())).await {
//!         Ok(()) => std::process::ExitCode::SUCCESS,
//!         Err(e) => std::process::ExitCode::from(e.exit_code()),
//!     }
//! }
//! ```
//!
//! ## Using the Engine Directly
//!
//! ```rust,ignore
//! use html2pdf_server::prelude::*;
//!
//! let handle = EngineHandle::builder()
//!     .config(EngineConfig::default())
//!     .factory(Box::new(ChromeEngineFactory::new()))
//!     .build()?;
//! handle.launch().await?;
//!
//! let engine = handle.ensure_live().await?;
//! let pdf = tokio::task::spawn_blocking(move || {
//!     render_document(
//!         &engine,
//!         ContentSource::html("<h1>Hello</h1>"),
//!         &LoadOptions::default(),
//!         &PageOptions::default(),
//!     )
//! })
//! .await??;
//!
//! handle.shutdown().await;
//! ```
//!
//! ## Environment Configuration
//!
//! With the `env-config` feature (default), [`config::env::from_env`] reads
//! an optional `app.env` file and then the process environment:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SERVER_HOST` | `0.0.0.0` |
//! | `SERVER_PORT` | 3001 |
//! | `STATIC_DIR` | unset |
//! | `CHROME_PATH` | auto-detected |
//! | `ENGINE_PROTOCOL_TIMEOUT_SECONDS` | 90 |
//! | `ENGINE_NAVIGATION_TIMEOUT_SECONDS` | 60 |
//! | `ENGINE_NETWORK_IDLE_MILLIS` | 500 |
//! | `REQUEST_TIMEOUT_SECONDS` | 120 |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `env-config` | Environment-based configuration and the binary |
//! | `test-utils` | Enable [`engine::mock`] for testing |
//!
//! ## Testing
//!
//! Enable `test-utils` to drive everything without Chrome:
//!
//! ```rust,ignore
//! use html2pdf_server::engine::mock::MockEngineFactory;
//!
//! let factory = MockEngineFactory::new();
//! let probe = factory.probe();
//! let handle = EngineHandle::builder().factory(Box::new(factory)).build()?;
//! handle.launch().await?;
//!
//! probe.kill_engine();
//! handle.ensure_live().await?; // restarts once
//! assert_eq!(probe.launches(), 2);
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod handle;
pub mod lifecycle;
pub mod options;
pub mod prelude;
pub mod server;
pub mod service;
pub mod session;
pub mod stats;

// Internal modules (not publicly exposed)
pub(crate) mod tracked;

// ============================================================================
// Re-exports (Public API)
// ============================================================================

pub use config::{EngineConfig, EngineConfigBuilder, ServerConfig, ServerConfigBuilder};
pub use engine::{ChromeEngineFactory, EngineFactory, RenderEngine, RenderSession};
pub use error::{EngineError, Result};
pub use handle::{EngineHandle, EngineHandleBuilder};
pub use lifecycle::LifecycleError;
pub use options::{ContentSource, LoadOptions, Margins, PageOptions, PaperFormat, WaitPolicy};
pub use session::{DocumentBuffer, Session, render_document};
pub use stats::EngineStats;
pub use tracked::TrackedEngine;

#[cfg(feature = "env-config")]
pub use config::env::{chrome_path_from_env, from_env};
