//! Per-request load and page options.
//!
//! These types describe *what* a [`Session`](crate::Session) should load and
//! *how* the result should be laid out on paper:
//!
//! - [`ContentSource`] - inline HTML or a URL to navigate to
//! - [`LoadOptions`] / [`WaitPolicy`] - when the page counts as loaded
//! - [`PageOptions`] / [`PaperFormat`] / [`Margins`] - print geometry
//!
//! # Example
//!
//! ```rust
//! use html2pdf_server::{ContentSource, PageOptions, PaperFormat};
//!
//! let source = ContentSource::html("<h1>Hello</h1>");
//! assert!(source.navigation_url().starts_with("data:text/html;charset=utf-8,"));
//!
//! let page = PageOptions::default();
//! assert_eq!(page.format, PaperFormat::A4);
//! assert!(page.print_background);
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default navigation timeout in seconds.
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 60;

/// Default quiet window for [`WaitPolicy::NetworkIdle`], in milliseconds.
pub const DEFAULT_NETWORK_IDLE_MILLIS: u64 = 500;

/// Default margin on every edge, in centimeters.
pub const DEFAULT_MARGIN_CM: f64 = 1.0;

/// Inches per centimeter, as the print protocol takes inches.
const INCHES_PER_CM: f64 = 0.393_700_787;

/// Maximum characters of a source shown in log lines.
const LOG_PREVIEW_CHARS: usize = 80;

// ============================================================================
// Content Source
// ============================================================================

/// The content a session loads before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Inline HTML, loaded through a `data:` URL.
    Html(String),

    /// An absolute URL the engine navigates to.
    Url(String),
}

impl ContentSource {
    /// Inline HTML source.
    pub fn html(html: impl Into<String>) -> Self {
        Self::Html(html.into())
    }

    /// URL source. The URL is expected to be absolute and already validated.
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    /// The URL the engine should navigate to for this source.
    ///
    /// Inline HTML becomes a percent-encoded `data:` URL.
    ///
    /// ```rust
    /// use html2pdf_server::ContentSource;
    ///
    /// let source = ContentSource::html("<p>a b</p>");
    /// assert_eq!(
    ///     source.navigation_url(),
    ///     "data:text/html;charset=utf-8,%3Cp%3Ea%20b%3C%2Fp%3E"
    /// );
    ///
    /// let source = ContentSource::url("http://localhost:3001/report.html");
    /// assert_eq!(source.navigation_url(), "http://localhost:3001/report.html");
    /// ```
    pub fn navigation_url(&self) -> String {
        match self {
            Self::Html(html) => format!(
                "data:text/html;charset=utf-8,{}",
                urlencoding::encode(html)
            ),
            Self::Url(url) => url.clone(),
        }
    }

    /// Short description for log lines. Never contains the full document.
    pub fn describe(&self) -> String {
        match self {
            Self::Html(html) => format!("inline HTML ({} bytes)", html.len()),
            Self::Url(url) => truncate_for_log(url, LOG_PREVIEW_CHARS),
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Truncate a string to `max_chars` characters, appending `...` when cut.
///
/// Counts characters, not bytes, so multi-byte text never splits mid-char.
pub fn truncate_for_log(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let kept: String = value.chars().take(max_chars).collect();
        format!("{}...", kept)
    }
}

// ============================================================================
// Load Options
// ============================================================================

/// When a loaded page is considered ready to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Navigation finished; subresources may still be in flight.
    Load,

    /// Document is complete and no new network resources were fetched
    /// for `idle_window`.
    NetworkIdle {
        /// How long the network has to stay quiet.
        idle_window: Duration,
    },
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::NetworkIdle {
            idle_window: Duration::from_millis(DEFAULT_NETWORK_IDLE_MILLIS),
        }
    }
}

/// Options for [`Session::load`](crate::Session::load).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Readiness condition.
    pub wait: WaitPolicy,

    /// Upper bound on the whole load, navigation included.
    pub timeout: Duration,
}

impl Default for LoadOptions {
    /// Network-idle (500ms window) with a 60 second timeout.
    fn default() -> Self {
        Self {
            wait: WaitPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_NAVIGATION_TIMEOUT_SECS),
        }
    }
}

// ============================================================================
// Page Options
// ============================================================================

/// Supported paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperFormat {
    /// 297 x 420 mm.
    A3,
    /// 210 x 297 mm.
    #[default]
    A4,
    /// 148 x 210 mm.
    A5,
    /// 8.5 x 11 in.
    Letter,
    /// 8.5 x 14 in.
    Legal,
}

impl PaperFormat {
    /// Portrait `(width, height)` in inches.
    ///
    /// ```rust
    /// use html2pdf_server::PaperFormat;
    ///
    /// assert_eq!(PaperFormat::A4.dimensions_inches(), (8.27, 11.69));
    /// assert_eq!(PaperFormat::Letter.dimensions_inches(), (8.5, 11.0));
    /// ```
    pub fn dimensions_inches(self) -> (f64, f64) {
        match self {
            Self::A3 => (11.69, 16.54),
            Self::A4 => (8.27, 11.69),
            Self::A5 => (5.83, 8.27),
            Self::Letter => (8.5, 11.0),
            Self::Legal => (8.5, 14.0),
        }
    }
}

impl std::str::FromStr for PaperFormat {
    type Err = String;

    /// Case-insensitive parse, e.g. `"a4"` or `"Letter"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a3" => Ok(Self::A3),
            "a4" => Ok(Self::A4),
            "a5" => Ok(Self::A5),
            "letter" => Ok(Self::Letter),
            "legal" => Ok(Self::Legal),
            other => Err(format!("unknown paper format: {}", other)),
        }
    }
}

/// Page margins in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top_cm: f64,
    pub right_cm: f64,
    pub bottom_cm: f64,
    pub left_cm: f64,
}

impl Margins {
    /// The same margin on all four edges.
    pub fn uniform_cm(cm: f64) -> Self {
        Self {
            top_cm: cm,
            right_cm: cm,
            bottom_cm: cm,
            left_cm: cm,
        }
    }

    /// `(top, right, bottom, left)` in inches.
    pub fn to_inches(self) -> (f64, f64, f64, f64) {
        (
            self.top_cm * INCHES_PER_CM,
            self.right_cm * INCHES_PER_CM,
            self.bottom_cm * INCHES_PER_CM,
            self.left_cm * INCHES_PER_CM,
        )
    }

    fn is_valid(&self) -> bool {
        [self.top_cm, self.right_cm, self.bottom_cm, self.left_cm]
            .iter()
            .all(|m| m.is_finite() && *m >= 0.0)
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform_cm(DEFAULT_MARGIN_CM)
    }
}

/// Options for [`Session::render`](crate::Session::render).
///
/// | Field | Default |
/// |-------|---------|
/// | `format` | A4 |
/// | `landscape` | `false` |
/// | `print_background` | `true` |
/// | `margins` | 1cm on every edge |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageOptions {
    pub format: PaperFormat,
    pub landscape: bool,
    pub print_background: bool,
    pub margins: Margins,
}

impl PageOptions {
    /// Copy of these options with a different orientation.
    pub fn with_landscape(mut self, landscape: bool) -> Self {
        self.landscape = landscape;
        self
    }

    /// Check margins are finite, non-negative, and leave printable area.
    pub fn validate(&self) -> Result<(), String> {
        if !self.margins.is_valid() {
            return Err("margins must be finite and non-negative".to_string());
        }

        let (width, height) = self.format.dimensions_inches();
        let (top, right, bottom, left) = self.margins.to_inches();
        if left + right >= width || top + bottom >= height {
            return Err("margins leave no printable area".to_string());
        }

        Ok(())
    }
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            format: PaperFormat::A4,
            landscape: false,
            print_background: true,
            margins: Margins::default(),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_source_becomes_data_url() {
        let source = ContentSource::html("<h1>Título</h1>");
        let url = source.navigation_url();

        assert!(url.starts_with("data:text/html;charset=utf-8,"));
        assert!(!url.contains('<'), "HTML must be percent-encoded");
        assert!(url.contains("%3Ch1%3E"));
    }

    #[test]
    fn test_describe_never_leaks_document() {
        let html = "<p>secret</p>".repeat(100);
        let described = ContentSource::html(html.clone()).describe();
        assert!(!described.contains("secret"));
        assert!(described.contains(&html.len().to_string()));
    }

    /// Verifies truncation counts chars so multi-byte text does not panic.
    #[test]
    fn test_truncate_for_log_multibyte() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("ãããããã", 3), "ããã...");
        assert_eq!(truncate_for_log("abcdef", 6), "abcdef");
    }

    #[test]
    fn test_default_load_options() {
        let options = LoadOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(60));
        assert_eq!(
            options.wait,
            WaitPolicy::NetworkIdle {
                idle_window: Duration::from_millis(500)
            }
        );
    }

    /// Verifies the default page is A4, backgrounds on, 1cm margins.
    #[test]
    fn test_default_page_options() {
        let page = PageOptions::default();
        assert_eq!(page.format, PaperFormat::A4);
        assert!(!page.landscape);
        assert!(page.print_background);
        assert_eq!(page.margins, Margins::uniform_cm(1.0));
        assert!(page.validate().is_ok());
    }

    #[test]
    fn test_margins_to_inches() {
        let (top, right, bottom, left) = Margins::uniform_cm(1.0).to_inches();
        for edge in [top, right, bottom, left] {
            assert!((edge - 0.3937).abs() < 0.001, "got {}", edge);
        }

        let (top, _, _, _) = Margins::uniform_cm(2.54).to_inches();
        assert!((top - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_page_validation() {
        let mut page = PageOptions::default();
        page.margins = Margins::uniform_cm(-1.0);
        assert!(page.validate().is_err());

        page.margins = Margins::uniform_cm(f64::NAN);
        assert!(page.validate().is_err());

        // 11cm each side exceeds A4 width (21cm)
        page.margins = Margins::uniform_cm(11.0);
        let err = page.validate().unwrap_err();
        assert!(err.contains("printable area"));
    }

    #[test]
    fn test_paper_format_parse() {
        assert_eq!("a4".parse::<PaperFormat>(), Ok(PaperFormat::A4));
        assert_eq!(" Letter ".parse::<PaperFormat>(), Ok(PaperFormat::Letter));
        assert_eq!("LEGAL".parse::<PaperFormat>(), Ok(PaperFormat::Legal));
        assert!("b5".parse::<PaperFormat>().is_err());
    }
}
