//! Request, response, and error types for the PDF service.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`PdfRequest`] | Body of `POST /generate-pdf` |
//! | [`PdfResponse`] | Rendered document plus download metadata |
//! | [`HealthResponse`] | Body of `GET /health` |
//! | [`ReadinessResponse`] | Body of `GET /ready` |
//! | [`PdfServiceError`] | Per-request failure with HTTP mapping |

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::session::DocumentBuffer;

/// Download name for every generated document.
pub const DOWNLOAD_FILENAME: &str = "documento_gerado.pdf";

/// Body returned when the engine cannot be brought up for a request.
pub const NOT_READY_MESSAGE: &str = "Server is not ready to generate PDFs.";

/// Body returned for any failure after the engine was confirmed live.
pub const GENERIC_FAILURE_MESSAGE: &str = "Error generating PDF";

// ============================================================================
// Request
// ============================================================================

/// Body of `POST /generate-pdf`.
///
/// Exactly one of `html` or `url` must be set.
///
/// # JSON Examples
///
/// ```json
/// { "html": "<h1>Invoice</h1><p>...</p>" }
/// ```
///
/// ```json
/// { "url": "/reports/march.html", "landscape": true }
/// ```
///
/// A relative `url` resolves against this server's own address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfRequest {
    /// Inline HTML document.
    #[serde(default)]
    pub html: Option<String>,

    /// Page to navigate to. Must be served by this server.
    #[serde(default)]
    pub url: Option<String>,

    /// Landscape orientation. Default: portrait.
    #[serde(default)]
    pub landscape: Option<bool>,

    /// Print CSS backgrounds. Default: server setting (on).
    #[serde(default)]
    pub print_background: Option<bool>,
}

impl PdfRequest {
    /// Request for inline HTML with server defaults.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            ..Self::default()
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// A rendered document ready to be written to the client.
///
/// ```rust
/// use html2pdf_server::DocumentBuffer;
/// use html2pdf_server::service::PdfResponse;
///
/// let response = PdfResponse::attachment(DocumentBuffer::new(b"%PDF-1.7".to_vec()));
/// assert_eq!(
///     response.content_disposition(),
///     "attachment; filename=\"documento_gerado.pdf\""
/// );
/// assert_eq!(response.size(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct PdfResponse {
    pub document: DocumentBuffer,
    pub filename: String,

    /// `attachment` when true, `inline` otherwise.
    pub force_download: bool,
}

impl PdfResponse {
    pub fn new(document: DocumentBuffer, filename: String, force_download: bool) -> Self {
        Self {
            document,
            filename,
            force_download,
        }
    }

    /// Download response named [`DOWNLOAD_FILENAME`].
    pub fn attachment(document: DocumentBuffer) -> Self {
        Self::new(document, DOWNLOAD_FILENAME.to_string(), true)
    }

    /// `Content-Disposition` header value.
    pub fn content_disposition(&self) -> String {
        let disposition_type = if self.force_download {
            "attachment"
        } else {
            "inline"
        };
        format!("{}; filename=\"{}\"", disposition_type, self.filename)
    }

    pub fn size(&self) -> usize {
        self.document.len()
    }
}

/// Body of `GET /health`. Answers as long as the HTTP process runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// Body of `GET /ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// `"ready"` or `"not_ready"`.
    pub status: String,

    /// Generation of the live engine, if any.
    pub generation: Option<u64>,
}

impl ReadinessResponse {
    pub fn ready(generation: u64) -> Self {
        Self {
            status: "ready".to_string(),
            generation: Some(generation),
        }
    }

    pub fn not_ready() -> Self {
        Self {
            status: "not_ready".to_string(),
            generation: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while serving one PDF request.
///
/// The detailed message (via `Display`) is for logs. Clients receive
/// [`client_message()`](Self::client_message), which never includes engine
/// internals.
///
/// # Status Mapping
///
/// | Variant | Status | Client body |
/// |---------|--------|-------------|
/// | `InvalidUrl`, `EmptyHtml`, `InvalidRequest` | 400 | detailed message |
/// | `EngineUnavailable` | 500 | [`NOT_READY_MESSAGE`] |
/// | everything else | 500 | [`GENERIC_FAILURE_MESSAGE`] |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfServiceError {
    /// URL failed to parse, or is not served by this server.
    InvalidUrl(String),

    /// `html` was present but blank.
    EmptyHtml,

    /// Body was structurally wrong, e.g. both or neither of `html`/`url`.
    InvalidRequest(String),

    /// Engine not live and the single restart attempt failed, or the
    /// server is shutting down.
    EngineUnavailable(String),

    SessionOpenFailed(String),
    LoadFailed(String),

    /// Content did not become ready within the navigation timeout.
    LoadTimeout(String),

    RenderFailed(String),

    /// The whole request exceeded its outer timeout.
    Timeout(String),

    /// Unexpected failure, e.g. a panic inside the engine call.
    Internal(String),
}

impl std::fmt::Display for PdfServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            Self::EmptyHtml => write!(f, "HTML content is required"),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::EngineUnavailable(msg) => write!(f, "Engine unavailable: {}", msg),
            Self::SessionOpenFailed(msg) => write!(f, "Failed to open session: {}", msg),
            Self::LoadFailed(msg) => write!(f, "Content load failed: {}", msg),
            Self::LoadTimeout(msg) => write!(f, "Content load timeout: {}", msg),
            Self::RenderFailed(msg) => write!(f, "PDF rendering failed: {}", msg),
            Self::Timeout(msg) => write!(f, "Operation timeout: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for PdfServiceError {}

impl PdfServiceError {
    /// HTTP status code.
    ///
    /// ```rust
    /// use html2pdf_server::service::PdfServiceError;
    ///
    /// assert_eq!(PdfServiceError::EmptyHtml.status_code(), 400);
    /// assert_eq!(PdfServiceError::EngineUnavailable("down".into()).status_code(), 500);
    /// assert_eq!(PdfServiceError::LoadTimeout("60s".into()).status_code(), 500);
    /// ```
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidUrl(_) | Self::EmptyHtml | Self::InvalidRequest(_) => 400,
            _ => 500,
        }
    }

    /// Stable machine-readable code, used in logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "INVALID_URL",
            Self::EmptyHtml => "EMPTY_HTML",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::EngineUnavailable(_) => "ENGINE_UNAVAILABLE",
            Self::SessionOpenFailed(_) => "SESSION_OPEN_FAILED",
            Self::LoadFailed(_) => "LOAD_FAILED",
            Self::LoadTimeout(_) => "LOAD_TIMEOUT",
            Self::RenderFailed(_) => "RENDER_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure is transient and a retry may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EngineUnavailable(_)
            | Self::SessionOpenFailed(_)
            | Self::LoadTimeout(_)
            | Self::Timeout(_) => true,

            Self::InvalidUrl(_) | Self::EmptyHtml | Self::InvalidRequest(_) => false,

            Self::LoadFailed(_) | Self::RenderFailed(_) | Self::Internal(_) => false,
        }
    }

    /// Whether this is a timeout classification.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::LoadTimeout(_) | Self::Timeout(_))
    }

    /// Plain-text body sent to the client.
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidUrl(_) | Self::EmptyHtml | Self::InvalidRequest(_) => self.to_string(),
            Self::EngineUnavailable(_) => NOT_READY_MESSAGE.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<EngineError> for PdfServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Launch(msg) => Self::EngineUnavailable(msg),
            EngineError::NotLive | EngineError::ShuttingDown => {
                Self::EngineUnavailable(err.to_string())
            }
            EngineError::SessionOpen(msg) => Self::SessionOpenFailed(msg),
            EngineError::Load(msg) => Self::LoadFailed(msg),
            EngineError::LoadTimeout(msg) => Self::LoadTimeout(msg),
            EngineError::Render(msg) => Self::RenderFailed(msg),
            EngineError::SessionClose(msg) | EngineError::Configuration(msg) => {
                Self::Internal(msg)
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
