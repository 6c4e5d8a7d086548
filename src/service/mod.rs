//! PDF generation service, independent of the HTTP framework.
//!
//! The HTTP handlers in [`server`](crate::server) stay thin: they
//! deserialize, call [`generate_pdf`], and map the result. Everything else
//! (validation, engine recovery, session handling, timeouts, error
//! classification) lives here so it can be tested without HTTP.
//!
//! # Module Overview
//!
//! ```text
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │ types.rs                     │     │ pdf.rs                       │
//! │  PdfRequest                  │     │  GenerationSettings          │
//! │  PdfResponse                 │◀────│  resolve_source()            │
//! │  PdfServiceError             │     │  generate_pdf()              │
//! │  HealthResponse              │     └──────────────┬───────────────┘
//! │  ReadinessResponse           │                    │ uses
//! └──────────────────────────────┘                    ▼
//!                                       EngineHandle::ensure_live()
//!                                       session::render_document()
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_server::service::{generate_pdf, GenerationSettings, PdfRequest};
//!
//! let settings = GenerationSettings::new(&config, origin);
//! let pdf = generate_pdf(&handle, &settings, &PdfRequest::from_html("<h1>Hi</h1>")).await?;
//! assert!(pdf.document.has_pdf_signature());
//! ```

mod pdf;
mod types;

pub use pdf::{GenerationSettings, generate_pdf, resolve_source};
pub use types::{
    DOWNLOAD_FILENAME, GENERIC_FAILURE_MESSAGE, HealthResponse, NOT_READY_MESSAGE, PdfRequest,
    PdfResponse, PdfServiceError, ReadinessResponse,
};
