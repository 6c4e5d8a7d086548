//! Error types for the rendering engine and its sessions.
//!
//! This module provides [`EngineError`], the error type for every operation
//! that touches the external rendering engine (launch, session open, content
//! load, render), and a convenient [`Result`] type alias.
//!
//! Request-level classification (HTTP status codes, client-facing messages)
//! lives one layer up in [`PdfServiceError`](crate::service::PdfServiceError);
//! process-level failures live in
//! [`LifecycleError`](crate::lifecycle::LifecycleError).
//!
//! # Example
//!
//! ```rust
//! use html2pdf_server::{EngineError, Result};
//!
//! fn render() -> Result<Vec<u8>> {
//!     Err(EngineError::Render("printToPDF returned nothing".to_string()))
//! }
//!
//! match render() {
//!     Ok(pdf) => println!("Generated {} bytes", pdf.len()),
//!     Err(e) if e.is_timeout() => println!("Timed out: {}", e),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

/// Errors that can occur while driving the rendering engine.
///
/// Each variant maps onto one step of the request lifecycle:
///
/// | Variant | Step | Typical cause |
/// |---------|------|---------------|
/// | [`Launch`](Self::Launch) | engine launch | Chrome binary missing, bad flags |
/// | [`SessionOpen`](Self::SessionOpen) | open tab | engine crashed, CDP connection lost |
/// | [`Load`](Self::Load) | load content | navigation rejected, unreachable URL |
/// | [`LoadTimeout`](Self::LoadTimeout) | load content | page never settled |
/// | [`Render`](Self::Render) | print to PDF | CDP `printToPDF` failed |
/// | [`SessionClose`](Self::SessionClose) | close tab | engine already gone |
/// | [`NotLive`](Self::NotLive) | check engine | no engine installed |
/// | [`ShuttingDown`](Self::ShuttingDown) | any | shutdown already started |
/// | [`Configuration`](Self::Configuration) | startup | invalid settings |
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine process failed to start.
    ///
    /// Fatal when it happens at process startup; request-scoped when it
    /// happens during a restart attempt.
    ///
    /// # Example
    ///
    /// ```rust
    /// use html2pdf_server::EngineError;
    ///
    /// let error = EngineError::Launch("Chrome binary not found".to_string());
    /// assert_eq!(error.to_string(), "Failed to launch engine: Chrome binary not found");
    /// ```
    #[error("Failed to launch engine: {0}")]
    Launch(String),

    /// A new session (tab) could not be allocated from the engine.
    #[error("Failed to open session: {0}")]
    SessionOpen(String),

    /// Content failed to load into the session.
    #[error("Failed to load content: {0}")]
    Load(String),

    /// Content did not finish loading within the configured timeout.
    ///
    /// Raised both when navigation itself times out and when the page never
    /// reaches the configured wait policy (e.g. network never settles).
    #[error("Content load timed out: {0}")]
    LoadTimeout(String),

    /// Exporting the loaded page to PDF failed.
    #[error("Failed to render document: {0}")]
    Render(String),

    /// The engine refused to close a session. Logged, never surfaced to
    /// clients.
    #[error("Failed to close session: {0}")]
    SessionClose(String),

    /// No live engine is installed in the handle.
    #[error("Rendering engine is not live")]
    NotLive,

    /// The handle is shutting down and refuses new work.
    #[error("Rendering engine is shutting down")]
    ShuttingDown,

    /// Invalid configuration provided.
    ///
    /// # Example
    ///
    /// ```rust
    /// use html2pdf_server::EngineError;
    ///
    /// let error = EngineError::Configuration("port must be set".to_string());
    /// assert_eq!(error.to_string(), "Configuration error: port must be set");
    /// ```
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// Whether this error is a timeout classification.
    ///
    /// ```rust
    /// use html2pdf_server::EngineError;
    ///
    /// assert!(EngineError::LoadTimeout("5s".to_string()).is_timeout());
    /// assert!(!EngineError::Load("refused".to_string()).is_timeout());
    /// ```
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::LoadTimeout(_))
    }

    /// Whether this error means the engine itself is unusable, as opposed to
    /// a failure scoped to one session.
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, Self::Launch(_) | Self::NotLive | Self::ShuttingDown)
    }
}

/// Convenience conversion from [`String`] to [`EngineError::Configuration`].
///
/// Lets configuration builders that report `String` errors be used with `?`.
impl From<String> for EngineError {
    fn from(msg: String) -> Self {
        EngineError::Configuration(msg)
    }
}

/// Convenience conversion from `&str` to [`EngineError::Configuration`].
impl From<&str> for EngineError {
    fn from(msg: &str) -> Self {
        EngineError::Configuration(msg.to_string())
    }
}

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Verifies error type conversions from String and &str.
    #[test]
    fn test_error_conversion() {
        let error: EngineError = "test error".into();
        match error {
            EngineError::Configuration(msg) => {
                assert_eq!(msg, "test error", "Error message should be preserved");
            }
            _ => panic!("Expected Configuration error variant"),
        }

        let error: EngineError = "another error".to_string().into();
        match error {
            EngineError::Configuration(msg) => {
                assert_eq!(msg, "another error", "Error message should be preserved");
            }
            _ => panic!("Expected Configuration error variant"),
        }
    }

    /// Verifies that error Display formatting works correctly.
    #[test]
    fn test_error_display() {
        let error = EngineError::Launch("chrome not found".to_string());
        assert_eq!(error.to_string(), "Failed to launch engine: chrome not found");

        let error = EngineError::SessionOpen("connection closed".to_string());
        assert_eq!(error.to_string(), "Failed to open session: connection closed");

        let error = EngineError::Load("net::ERR_FAILED".to_string());
        assert_eq!(error.to_string(), "Failed to load content: net::ERR_FAILED");

        let error = EngineError::LoadTimeout("60s".to_string());
        assert_eq!(error.to_string(), "Content load timed out: 60s");

        let error = EngineError::Render("printToPDF".to_string());
        assert_eq!(error.to_string(), "Failed to render document: printToPDF");

        assert_eq!(EngineError::NotLive.to_string(), "Rendering engine is not live");
        assert_eq!(
            EngineError::ShuttingDown.to_string(),
            "Rendering engine is shutting down"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(EngineError::LoadTimeout(String::new()).is_timeout());
        assert!(!EngineError::Render(String::new()).is_timeout());

        assert!(EngineError::Launch(String::new()).is_engine_failure());
        assert!(EngineError::NotLive.is_engine_failure());
        assert!(EngineError::ShuttingDown.is_engine_failure());
        assert!(!EngineError::SessionOpen(String::new()).is_engine_failure());
        assert!(!EngineError::Load(String::new()).is_engine_failure());
    }

    /// Verifies that EngineError is Send + Sync for thread safety.
    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + std::error::Error>() {}
        assert_send_sync::<EngineError>();
    }
}
