//! RAII guard for one rendering session.
//!
//! This module provides [`Session`], which wraps a tab opened on the live
//! engine and guarantees it is closed exactly once, and [`DocumentBuffer`],
//! the rendered PDF bytes.
//!
//! # Overview
//!
//! A session is closed on every path out of a request:
//! - the happy path calls [`Session::close()`] explicitly
//! - an early `?` return drops the guard
//! - a panic unwinds through the guard's `Drop`
//!
//! Close failures are logged and never propagated.
//!
//! # Usage Pattern
//!
//! ```rust,ignore
//! let engine = handle.ensure_live().await?;
//!
//! let mut session = Session::open(&engine)?;
//! session.load(ContentSource::html("<h1>Hi</h1>"), &LoadOptions::default())?;
//! let pdf = session.render(&PageOptions::default())?;
//! session.close();
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::RenderSession;
use crate::error::{EngineError, Result};
use crate::options::{ContentSource, LoadOptions, PageOptions};
use crate::stats::SessionLedger;
use crate::tracked::TrackedEngine;

/// Leading bytes of every PDF file.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

// ============================================================================
// DocumentBuffer
// ============================================================================

/// Immutable rendered document.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentBuffer(Vec<u8>);

impl DocumentBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the buffer starts with `%PDF-`.
    ///
    /// ```rust
    /// use html2pdf_server::DocumentBuffer;
    ///
    /// assert!(DocumentBuffer::new(b"%PDF-1.7 ...".to_vec()).has_pdf_signature());
    /// assert!(!DocumentBuffer::new(b"<html>".to_vec()).has_pdf_signature());
    /// ```
    pub fn has_pdf_signature(&self) -> bool {
        self.0.starts_with(PDF_SIGNATURE)
    }
}

impl std::fmt::Debug for DocumentBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentBuffer")
            .field("len", &self.0.len())
            .finish()
    }
}

// ============================================================================
// Session
// ============================================================================

/// One tab on the engine, owned by one request.
///
/// # Thread Safety
///
/// `Session` is `Send` but not `Sync`: it moves onto the blocking pool with
/// its request and is never shared.
pub struct Session {
    id: u64,
    generation: u64,
    opened_at: Instant,
    source: Option<ContentSource>,
    inner: Option<Box<dyn RenderSession>>,
    ledger: Arc<SessionLedger>,
}

impl Session {
    /// Open a new tab on `engine`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionOpen`] (or whatever the engine reports)
    /// if no tab can be created. Nothing needs closing in that case.
    pub fn open(engine: &TrackedEngine) -> Result<Self> {
        let inner = engine.engine().open_session()?;
        let ledger = Arc::clone(engine.ledger());
        let id = ledger.record_open();

        log::debug!(
            "Session {} opened on engine generation {}",
            id,
            engine.generation()
        );

        Ok(Self {
            id,
            generation: engine.generation(),
            opened_at: Instant::now(),
            source: None,
            inner: Some(inner),
            ledger,
        })
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Generation of the engine this session was opened on.
    pub fn engine_generation(&self) -> u64 {
        self.generation
    }

    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Most recently loaded source.
    pub fn source(&self) -> Option<&ContentSource> {
        self.source.as_ref()
    }

    fn inner_mut(&mut self) -> Result<&mut Box<dyn RenderSession>> {
        self.inner
            .as_mut()
            .ok_or_else(|| EngineError::SessionOpen("session already closed".to_string()))
    }

    /// Load content into the tab.
    ///
    /// # Errors
    ///
    /// [`EngineError::Load`] or [`EngineError::LoadTimeout`].
    pub fn load(&mut self, source: ContentSource, options: &LoadOptions) -> Result<()> {
        let started = Instant::now();
        log::debug!("Session {} loading {}", self.id, source);

        self.inner_mut()?.load(&source, options)?;
        log::debug!("Session {} loaded in {:?}", self.id, started.elapsed());

        self.source = Some(source);
        Ok(())
    }

    /// Print the loaded page.
    ///
    /// # Errors
    ///
    /// [`EngineError::Render`] if printing fails or yields no bytes.
    pub fn render(&mut self, options: &PageOptions) -> Result<DocumentBuffer> {
        let id = self.id;
        let bytes = self.inner_mut()?.render(options)?;

        if bytes.is_empty() {
            return Err(EngineError::Render("engine returned an empty document".to_string()));
        }

        let buffer = DocumentBuffer::new(bytes);
        if !buffer.has_pdf_signature() {
            log::warn!("⚠️ Session {} produced a buffer without a PDF signature", id);
        }

        log::debug!("Session {} rendered {} bytes", id, buffer.len());
        Ok(buffer)
    }

    /// Close the tab now.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };

        if let Err(e) = inner.close() {
            log::warn!("⚠️ Session {} did not close cleanly: {}", self.id, e);
        }
        self.ledger.record_close();

        log::trace!("Session {} closed after {:?}", self.id, self.age());
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.inner.is_some() {
            log::debug!("Session {} dropped while open, closing", self.id);
            self.release();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("engine_generation", &self.generation)
            .field("age", &self.age())
            .field("open", &self.inner.is_some())
            .finish()
    }
}

/// Run one full session on `engine`: open, load, render, close.
///
/// The session is closed on every path, including a panic inside the
/// engine.
///
/// # Thread Blocking
///
/// Blocks for the whole load and render; call from a blocking context.
pub fn render_document(
    engine: &TrackedEngine,
    source: ContentSource,
    load: &LoadOptions,
    page: &PageOptions,
) -> Result<DocumentBuffer> {
    let mut session = Session::open(engine)?;
    session.load(source, load)?;
    let buffer = session.render(page)?;
    session.close();
    Ok(buffer)
}

// ============================================================================
// Unit Tests
// ============================================================================
