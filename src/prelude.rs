//! Convenient imports for common usage patterns.
//!
//! ```rust,ignore
//! use html2pdf_server::prelude::*;
//! ```
//!
//! Brings in the configuration builders, the engine handle and its
//! factories, the request and page option types, the session guard, and
//! the [`lifecycle`] module for running the server.

pub use crate::config::{EngineConfig, EngineConfigBuilder, ServerConfig, ServerConfigBuilder};
pub use crate::engine::{ChromeEngineFactory, EngineFactory};
pub use crate::error::{EngineError, Result};
pub use crate::handle::{EngineHandle, EngineHandleBuilder};
pub use crate::lifecycle::{self, LifecycleError};
pub use crate::options::{ContentSource, LoadOptions, Margins, PageOptions, PaperFormat, WaitPolicy};
pub use crate::service::{PdfRequest, PdfResponse, PdfServiceError};
pub use crate::session::{DocumentBuffer, Session, render_document};
pub use crate::stats::EngineStats;
pub use crate::tracked::TrackedEngine;

#[cfg(feature = "env-config")]
pub use crate::config::env::from_env;

pub use std::sync::Arc;
