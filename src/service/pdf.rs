//! Per-request coordination: validate, ensure the engine, render.
//!
//! # Request State Machine
//!
//! ```text
//! VALIDATE ──▶ CHECK_ENGINE ──▶ (RESTART_ENGINE)? ──▶ OPEN_SESSION ──▶ LOAD ──▶ RENDER ──▶ RESPOND
//!    │              │                  │                   │            │         │
//!    ▼              └──── failed ──────┘                   └────────────┴─────────┤
//!  400                     │                                                      ▼
//!                          ▼                                               CLOSE_SESSION
//!               500 "Server is not ready"                                  (Session guard)
//! ```
//!
//! Validation and the engine check run on the async side. Open, load,
//! render, and close run together in one `spawn_blocking` task bounded by
//! the request timeout. A timed-out task keeps running until the engine's
//! own navigation timeout fires, and its session guard still closes the tab.

use std::time::{Duration, Instant};

use url::Url;

use super::types::{PdfRequest, PdfResponse, PdfServiceError};
use crate::config::ServerConfig;
use crate::handle::EngineHandle;
use crate::options::{ContentSource, LoadOptions, PageOptions};
use crate::session::render_document;

/// Everything a request needs besides the engine handle.
///
/// Built once at startup from [`ServerConfig`] and the address the listener
/// actually bound.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub load: LoadOptions,
    pub page: PageOptions,
    pub request_timeout: Duration,

    /// This server's own base URL. Relative URL sources resolve against it
    /// and absolute ones must share its origin.
    pub origin: Url,
}

impl GenerationSettings {
    /// Settings for a server reachable at `origin`.
    pub fn new(config: &ServerConfig, origin: Url) -> Self {
        Self {
            load: config.engine.load_options(),
            page: config.page,
            request_timeout: config.request_timeout,
            origin,
        }
    }

    /// Origin URL for a listener bound to `addr`.
    ///
    /// Wildcard addresses become loopback so the engine, which runs on the
    /// same host, can reach them.
    ///
    /// ```rust
    /// use html2pdf_server::service::GenerationSettings;
    ///
    /// let origin = GenerationSettings::origin_for("0.0.0.0:3001".parse().unwrap()).unwrap();
    /// assert_eq!(origin.as_str(), "http://127.0.0.1:3001/");
    /// ```
    pub fn origin_for(addr: std::net::SocketAddr) -> Result<Url, url::ParseError> {
        let host = match addr.ip() {
            ip if ip.is_unspecified() && ip.is_ipv4() => "127.0.0.1".to_string(),
            ip if ip.is_unspecified() => "[::1]".to_string(),
            std::net::IpAddr::V6(ip) => format!("[{}]", ip),
            ip => ip.to_string(),
        };
        Url::parse(&format!("http://{}:{}/", host, addr.port()))
    }
}

/// Turn a request body into a content source.
///
/// # Errors
///
/// - [`PdfServiceError::InvalidRequest`] - both or neither of `html`/`url`
/// - [`PdfServiceError::EmptyHtml`] - blank `html`
/// - [`PdfServiceError::InvalidUrl`] - unparseable, non-HTTP, or foreign URL
pub fn resolve_source(request: &PdfRequest, origin: &Url) -> Result<ContentSource, PdfServiceError> {
    match (&request.html, &request.url) {
        (Some(_), Some(_)) => Err(PdfServiceError::InvalidRequest(
            "provide either html or url, not both".to_string(),
        )),
        (None, None) => Err(PdfServiceError::InvalidRequest(
            "one of html or url is required".to_string(),
        )),
        (Some(html), None) => {
            if html.trim().is_empty() {
                Err(PdfServiceError::EmptyHtml)
            } else {
                Ok(ContentSource::html(html.clone()))
            }
        }
        (None, Some(url)) => validate_url(url, origin).map(ContentSource::url),
    }
}

/// Resolve `url` against `origin` and require the same origin.
fn validate_url(url: &str, origin: &Url) -> Result<String, PdfServiceError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(PdfServiceError::InvalidUrl("URL is required".to_string()));
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => origin
            .join(url)
            .map_err(|e| PdfServiceError::InvalidUrl(e.to_string()))?,
        Err(e) => return Err(PdfServiceError::InvalidUrl(e.to_string())),
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PdfServiceError::InvalidUrl(format!(
            "unsupported scheme: {}",
            parsed.scheme()
        )));
    }

    if parsed.origin() != origin.origin() {
        return Err(PdfServiceError::InvalidUrl(
            "URL must be served by this server".to_string(),
        ));
    }

    Ok(parsed.to_string())
}

/// Serve one PDF request end to end.
///
/// # Errors
///
/// Any [`PdfServiceError`]; the caller maps it with
/// [`status_code()`](PdfServiceError::status_code) and
/// [`client_message()`](PdfServiceError::client_message).
pub async fn generate_pdf(
    handle: &EngineHandle,
    settings: &GenerationSettings,
    request: &PdfRequest,
) -> Result<PdfResponse, PdfServiceError> {
    let started = Instant::now();
    let source = resolve_source(request, &settings.origin)?;

    let engine = handle.ensure_live().await.map_err(|e| {
        log::error!("❌ Engine unavailable for request: {}", e);
        PdfServiceError::from(e)
    })?;

    let mut page = settings.page;
    if let Some(landscape) = request.landscape {
        page = page.with_landscape(landscape);
    }
    if let Some(print_background) = request.print_background {
        page.print_background = print_background;
    }
    let load = settings.load;

    log::debug!(
        "Rendering {} on engine generation {}",
        source,
        engine.generation()
    );

    let task = tokio::task::spawn_blocking(move || render_document(&engine, source, &load, &page));

    match tokio::time::timeout(settings.request_timeout, task).await {
        Ok(Ok(Ok(document))) => {
            log::info!(
                "✅ PDF generated ({} bytes) in {:?}",
                document.len(),
                started.elapsed()
            );
            Ok(PdfResponse::attachment(document))
        }
        Ok(Ok(Err(e))) => {
            if e.is_engine_failure() {
                log::warn!("⚠️ Engine lost mid-request; the next request relaunches it");
            }
            let err = PdfServiceError::from(e);
            log::error!(
                "❌ PDF generation failed [{}] (retryable: {}): {}",
                err.error_code(),
                err.is_retryable(),
                err
            );
            Err(err)
        }
        Ok(Err(e)) => {
            log::error!("❌ PDF generation task failed: {}", e);
            Err(PdfServiceError::Internal(e.to_string()))
        }
        Err(_) => {
            log::error!(
                "❌ PDF generation timed out after {:?}",
                settings.request_timeout
            );
            Err(PdfServiceError::Timeout(format!(
                "request exceeded {:?}",
                settings.request_timeout
            )))
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://127.0.0.1:3001/").unwrap()
    }

    #[test]
    fn test_resolve_html() {
        let source = resolve_source(&PdfRequest::from_html("<p>x</p>"), &origin()).unwrap();
        assert_eq!(source, ContentSource::html("<p>x</p>"));
    }

    #[test]
    fn test_resolve_rejects_blank_html() {
        let err = resolve_source(&PdfRequest::from_html("  \n"), &origin()).unwrap_err();
        assert_eq!(err, PdfServiceError::EmptyHtml);
    }

    #[test]
    fn test_resolve_requires_exactly_one_source() {
        let err = resolve_source(&PdfRequest::default(), &origin()).unwrap_err();
        assert!(matches!(err, PdfServiceError::InvalidRequest(_)));

        let both = PdfRequest {
            html: Some("<p>x</p>".to_string()),
            url: Some("/x.html".to_string()),
            ..PdfRequest::default()
        };
        let err = resolve_source(&both, &origin()).unwrap_err();
        assert!(matches!(err, PdfServiceError::InvalidRequest(_)));
    }

    /// Verifies relative URLs resolve against the server origin.
    #[test]
    fn test_validate_url_relative() {
        let url = validate_url("/reports/a.html?x=1", &origin()).unwrap();
        assert_eq!(url, "http://127.0.0.1:3001/reports/a.html?x=1");

        let url = validate_url("page.html", &origin()).unwrap();
        assert_eq!(url, "http://127.0.0.1:3001/page.html");
    }

    #[test]
    fn test_validate_url_same_origin_absolute() {
        let url = validate_url("http://127.0.0.1:3001/doc.html", &origin()).unwrap();
        assert_eq!(url, "http://127.0.0.1:3001/doc.html");
    }

    #[test]
    fn test_validate_url_rejects_foreign_origin() {
        for url in [
            "https://example.com/",
            "http://127.0.0.1:9999/doc.html",
            "https://127.0.0.1:3001/doc.html",
        ] {
            let err = validate_url(url, &origin()).unwrap_err();
            assert!(matches!(err, PdfServiceError::InvalidUrl(_)), "{}", url);
        }
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        let err = validate_url("file:///etc/passwd", &origin()).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));

        let err = validate_url("data:text/html,<p>x</p>", &origin()).unwrap_err();
        assert!(matches!(err, PdfServiceError::InvalidUrl(_)));
    }

    #[test]
    fn test_validate_url_empty() {
        let err = validate_url("   ", &origin()).unwrap_err();
        assert_eq!(err, PdfServiceError::InvalidUrl("URL is required".to_string()));
    }

    #[test]
    fn test_origin_for() {
        let origin = GenerationSettings::origin_for("127.0.0.1:8080".parse().unwrap()).unwrap();
        assert_eq!(origin.as_str(), "http://127.0.0.1:8080/");

        let origin = GenerationSettings::origin_for("[::]:8080".parse().unwrap()).unwrap();
        assert_eq!(origin.as_str(), "http://[::1]:8080/");
    }

    #[test]
    fn test_settings_from_config() {
        let config = ServerConfig::default();
        let settings = GenerationSettings::new(&config, origin());
        assert_eq!(settings.page, PageOptions::default());
        assert_eq!(settings.load, config.engine.load_options());
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
    }
}
