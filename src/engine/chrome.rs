//! Chrome/Chromium engine backed by `headless_chrome`.
//!
//! # Overview
//!
//! - [`ChromeEngineFactory`] builds launch options from [`EngineConfig`] and
//!   starts one browser process.
//! - [`ChromeEngine`] owns that process. Dropping the last reference to the
//!   `Browser` kills it.
//! - [`ChromeSession`] wraps one tab.
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_server::{ChromeEngineFactory, EngineConfig, EngineFactory};
//!
//! let factory = ChromeEngineFactory::new();
//! let engine = factory.launch(&EngineConfig::default())?;
//! assert!(engine.is_live());
//! ```

use std::collections::HashSet;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use headless_chrome::browser::tab::EventListener;
use headless_chrome::protocol::cdp::Network;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, LaunchOptions, Tab};

use super::{EngineFactory, RenderEngine, RenderSession};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::options::{ContentSource, LoadOptions, PageOptions, WaitPolicy};

/// Interval between network idle checks.
const NETWORK_POLL_INTERVAL_MS: u64 = 100;

/// How long the CDP connection may go without events before the library
/// drops it. A server engine sits idle between requests for arbitrarily
/// long, so this is effectively unbounded; liveness is checked per request.
pub const ENGINE_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

const READY_STATE_COMPLETE: &str = "document.readyState === 'complete'";

type TabListener = dyn EventListener<Event> + Send + Sync;

/// Chrome flags applied to every launch.
///
/// Sandboxing is off because the service usually runs as root inside a
/// container, where the setuid sandbox cannot start.
pub const CHROME_LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--single-process",
    "--disable-gpu",
];

// ============================================================================
// Factory
// ============================================================================

/// Launches headless Chrome.
///
/// The binary comes from [`EngineConfig::chrome_path`] when set, otherwise
/// from `headless_chrome`'s auto-detection (which, with the `fetch` feature,
/// downloads a Chromium build if none is installed).
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeEngineFactory;

impl ChromeEngineFactory {
    pub fn new() -> Self {
        Self
    }
}

impl EngineFactory for ChromeEngineFactory {
    fn launch(&self, config: &EngineConfig) -> Result<Box<dyn RenderEngine>> {
        log::trace!("ChromeEngineFactory::launch() called");

        let options = create_chrome_options(config)?;

        log::debug!("🚀 Launching Chrome...");
        let browser = Browser::new(options).map_err(|e| {
            log::error!("❌ Chrome launch failed: {}", e);
            EngineError::Launch(e.to_string())
        })?;

        let engine = ChromeEngine::new(browser, config.protocol_timeout);
        match engine.version() {
            Some(version) => log::info!("✅ Chrome launched ({})", version),
            None => log::info!("✅ Chrome launched"),
        }

        Ok(Box::new(engine))
    }
}

/// Build `headless_chrome` launch options from `config`.
///
/// Applies [`CHROME_LAUNCH_ARGS`] in place of the library defaults and sets
/// the browser idle timeout to [`ENGINE_IDLE_TIMEOUT`].
/// [`EngineConfig::protocol_timeout`] bounds individual tab calls instead.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] if the options builder rejects the
/// configuration.
pub fn create_chrome_options(config: &EngineConfig) -> Result<LaunchOptions<'static>> {
    let mut builder = LaunchOptions::default_builder();

    match &config.chrome_path {
        Some(path) => {
            log::debug!("Chrome path: {}", path.display());
            builder.path(Some(path.clone()));
        }
        None => log::trace!("Chrome path: auto-detect"),
    }

    builder
        .headless(config.headless)
        .sandbox(false)
        .disable_default_args(true)
        .idle_browser_timeout(ENGINE_IDLE_TIMEOUT)
        .args(CHROME_LAUNCH_ARGS.iter().map(|arg| OsStr::new(*arg)).collect())
        .build()
        .map_err(|e| {
            log::error!("❌ Failed to build Chrome launch options: {}", e);
            EngineError::Configuration(e.to_string())
        })
}

// ============================================================================
// Engine
// ============================================================================

/// A running Chrome process.
pub struct ChromeEngine {
    browser: Mutex<Option<Arc<Browser>>>,
    protocol_timeout: Duration,
}

impl ChromeEngine {
    /// Wrap a launched browser. `protocol_timeout` bounds every tab call
    /// that is not part of navigation.
    pub fn new(browser: Browser, protocol_timeout: Duration) -> Self {
        Self {
            browser: Mutex::new(Some(Arc::new(browser))),
            protocol_timeout,
        }
    }

    fn browser(&self) -> Option<Arc<Browser>> {
        self.browser
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RenderEngine for ChromeEngine {
    fn open_session(&self) -> Result<Box<dyn RenderSession>> {
        let browser = self.browser().ok_or(EngineError::NotLive)?;

        log::trace!("Creating new tab");
        let tab = browser.new_tab().map_err(|e| {
            log::error!("❌ Failed to create tab: {}", e);
            EngineError::SessionOpen(e.to_string())
        })?;
        tab.set_default_timeout(self.protocol_timeout);

        let network = Arc::new(Mutex::new(NetworkActivity::new()));
        match track_network(&tab, &network) {
            Ok(listener) => Ok(Box::new(ChromeSession {
                tab,
                protocol_timeout: self.protocol_timeout,
                network,
                listener,
            })),
            Err(e) => {
                log::error!("❌ Failed to enable network tracking: {}", e);
                if let Err(close_err) = tab.close(true) {
                    log::warn!("⚠️ Failed to close tab: {}", close_err);
                }
                Err(e)
            }
        }
    }

    fn is_live(&self) -> bool {
        match self.browser() {
            Some(browser) => browser.get_version().is_ok(),
            None => false,
        }
    }

    fn close(&self) {
        let taken = self
            .browser
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if taken.is_some() {
            log::debug!("Closing Chrome process");
        }
        // Dropping the Browser terminates the process.
        drop(taken);
    }

    fn version(&self) -> Option<String> {
        self.browser()
            .and_then(|browser| browser.get_version().ok())
            .map(|v| v.product)
    }
}

// ============================================================================
// Session
// ============================================================================

/// One Chrome tab.
pub struct ChromeSession {
    tab: Arc<Tab>,
    protocol_timeout: Duration,
    network: Arc<Mutex<NetworkActivity>>,
    listener: Weak<TabListener>,
}

impl ChromeSession {
    fn navigate(&self, source: &ContentSource, options: &LoadOptions) -> Result<()> {
        let started = Instant::now();

        log::trace!("Loading {}", source);
        self.tab
            .navigate_to(&source.navigation_url())
            .map_err(|e| {
                log::error!("❌ Failed to navigate: {}", e);
                EngineError::Load(e.to_string())
            })?
            .wait_until_navigated()
            .map_err(|e| {
                log::error!("❌ Navigation did not complete: {}", e);
                navigation_error(e.downcast_ref::<Timeout>().is_some(), e.to_string())
            })?;
        log::debug!("Navigation completed in {:?}", started.elapsed());

        match options.wait {
            WaitPolicy::Load => Ok(()),
            WaitPolicy::NetworkIdle { idle_window } => {
                let remaining = options.timeout.saturating_sub(started.elapsed());
                wait_for_network_idle(&self.tab, &self.network, idle_window, remaining)
            }
        }
    }
}

impl RenderSession for ChromeSession {
    fn load(&mut self, source: &ContentSource, options: &LoadOptions) -> Result<()> {
        self.tab.set_default_timeout(options.timeout);
        let result = self.navigate(source, options);
        self.tab.set_default_timeout(self.protocol_timeout);
        result
    }

    fn render(&mut self, options: &PageOptions) -> Result<Vec<u8>> {
        let started = Instant::now();
        let pdf = self
            .tab
            .print_to_pdf(Some(build_print_options(options)))
            .map_err(|e| {
                log::error!("❌ Failed to print PDF: {}", e);
                EngineError::Render(e.to_string())
            })?;

        log::debug!("PDF printed in {:?} ({} bytes)", started.elapsed(), pdf.len());
        Ok(pdf)
    }

    fn close(self: Box<Self>) -> Result<()> {
        if let Err(e) = self.tab.remove_event_listener(&self.listener) {
            log::warn!("⚠️ Failed to remove network listener: {}", e);
        }
        self.tab
            .close(true)
            .map(|_| ())
            .map_err(|e| EngineError::SessionClose(e.to_string()))
    }
}

/// Map page options onto CDP print options.
///
/// Paper size is given explicitly in inches; orientation is left to Chrome
/// through `landscape` rather than swapping dimensions.
pub fn build_print_options(options: &PageOptions) -> PrintToPdfOptions {
    let (paper_width, paper_height) = options.format.dimensions_inches();
    let (top, right, bottom, left) = options.margins.to_inches();

    PrintToPdfOptions {
        landscape: Some(options.landscape),
        display_header_footer: Some(false),
        print_background: Some(options.print_background),
        paper_width: Some(paper_width),
        paper_height: Some(paper_height),
        margin_top: Some(top),
        margin_right: Some(right),
        margin_bottom: Some(bottom),
        margin_left: Some(left),
        ..Default::default()
    }
}

/// Classify a failed wait for navigation.
///
/// Only the library's own timeout is a [`EngineError::LoadTimeout`]; anything
/// else (a dropped connection, a crashed target) is a plain load failure.
fn navigation_error(timed_out: bool, message: String) -> EngineError {
    if timed_out {
        EngineError::LoadTimeout(message)
    } else {
        EngineError::Load(message)
    }
}

/// Requests a tab has started but not yet finished.
///
/// Fed from `Network.requestWillBeSent`, `Network.loadingFinished` and
/// `Network.loadingFailed`. A redirect reuses its request id, so it stays
/// one entry until the final response finishes.
#[derive(Debug)]
pub(crate) struct NetworkActivity {
    in_flight: HashSet<String>,
    last_change: Instant,
}

impl NetworkActivity {
    pub(crate) fn new() -> Self {
        Self {
            in_flight: HashSet::new(),
            last_change: Instant::now(),
        }
    }

    pub(crate) fn request_started(&mut self, request_id: &str) {
        self.in_flight.insert(request_id.to_string());
        self.last_change = Instant::now();
    }

    pub(crate) fn request_finished(&mut self, request_id: &str) {
        if self.in_flight.remove(request_id) {
            self.last_change = Instant::now();
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// True once nothing is in flight and nothing has changed for `window`.
    pub(crate) fn is_idle_for(&self, window: Duration) -> bool {
        self.in_flight.is_empty() && self.last_change.elapsed() >= window
    }

    fn on_event(&mut self, event: &Event) {
        match event {
            Event::NetworkRequestWillBeSent(ev) => self.request_started(&ev.params.request_id),
            Event::NetworkLoadingFinished(ev) => self.request_finished(&ev.params.request_id),
            Event::NetworkLoadingFailed(ev) => self.request_finished(&ev.params.request_id),
            _ => {}
        }
    }
}

/// Subscribe `network` to the tab's request events and enable the Network
/// domain so they are emitted.
fn track_network(tab: &Tab, network: &Arc<Mutex<NetworkActivity>>) -> Result<Weak<TabListener>> {
    let sink = Arc::clone(network);
    let listener: Arc<TabListener> = Arc::new(move |event: &Event| {
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_event(event);
    });

    let weak = tab
        .add_event_listener(listener)
        .map_err(|e| EngineError::SessionOpen(e.to_string()))?;

    tab.call_method(Network::Enable {
        max_total_buffer_size: None,
        max_resource_buffer_size: None,
        max_post_data_size: None,
        report_direct_socket_traffic: None,
        enable_durable_messages: None,
    })
    .map_err(|e| EngineError::SessionOpen(e.to_string()))?;

    Ok(weak)
}

/// Block until the document is complete and no request has been in flight
/// for `idle_window`.
///
/// A request that never finishes keeps the page busy until `max_wait`.
///
/// # Errors
///
/// Returns [`EngineError::LoadTimeout`] if the page is still busy after
/// `max_wait`.
///
/// # Thread Blocking
///
/// Sleeps the calling thread; call from a blocking context.
fn wait_for_network_idle(
    tab: &Tab,
    network: &Mutex<NetworkActivity>,
    idle_window: Duration,
    max_wait: Duration,
) -> Result<()> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(NETWORK_POLL_INTERVAL_MS);

    log::trace!(
        "Waiting up to {:?} for {:?} of network idle",
        max_wait,
        idle_window
    );

    loop {
        let (idle, in_flight) = {
            let activity = network.lock().unwrap_or_else(PoisonError::into_inner);
            (activity.is_idle_for(idle_window), activity.in_flight())
        };

        if idle && document_complete(tab) {
            log::debug!("Network idle after {:?}", start.elapsed());
            return Ok(());
        }

        if start.elapsed() >= max_wait {
            log::warn!(
                "⚠️ Network did not settle within {:?} ({} requests in flight)",
                max_wait,
                in_flight
            );
            return Err(EngineError::LoadTimeout(format!(
                "network did not settle within {:?}",
                max_wait
            )));
        }

        std::thread::sleep(poll_interval);
    }
}

fn document_complete(tab: &Tab) -> bool {
    tab.evaluate(READY_STATE_COMPLETE, false)
        .ok()
        .and_then(|result| result.value)
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Margins, PaperFormat};

    /// Verifies that Chrome launch options build for both path modes.
    ///
    /// Does not launch Chrome.
    #[test]
    fn test_create_chrome_options() {
        let result = create_chrome_options(&EngineConfig::default());
        assert!(
            result.is_ok(),
            "Auto-detect Chrome options should build successfully: {:?}",
            result.err()
        );

        let config = crate::config::EngineConfigBuilder::new()
            .chrome_path("/custom/chrome/path")
            .build()
            .unwrap();
        let result = create_chrome_options(&config);
        assert!(
            result.is_ok(),
            "Custom path Chrome options should build successfully: {:?}",
            result.err()
        );
    }

    /// Verifies an engine idle between requests is not disconnected.
    #[test]
    fn test_engine_idle_timeout_outlives_quiet_periods() {
        let config = EngineConfig::default();
        let options = create_chrome_options(&config).unwrap();

        assert!(options.idle_browser_timeout > Duration::from_secs(3600));
        assert!(options.idle_browser_timeout > config.protocol_timeout);
    }

    #[test]
    fn test_launch_args_include_hardening_flags() {
        for flag in ["--no-sandbox", "--disable-gpu", "--single-process", "--no-zygote"] {
            assert!(CHROME_LAUNCH_ARGS.contains(&flag), "missing {}", flag);
        }
    }

    /// Verifies default page options print A4 with backgrounds and 1cm margins.
    #[test]
    fn test_build_print_options_defaults() {
        let options = build_print_options(&PageOptions::default());

        assert_eq!(options.landscape, Some(false));
        assert_eq!(options.print_background, Some(true));
        assert_eq!(options.display_header_footer, Some(false));
        assert_eq!(options.paper_width, Some(8.27));
        assert_eq!(options.paper_height, Some(11.69));

        for margin in [
            options.margin_top,
            options.margin_right,
            options.margin_bottom,
            options.margin_left,
        ] {
            let inches = margin.expect("margin set");
            assert!((inches - 0.3937).abs() < 0.001, "got {}", inches);
        }
    }

    #[test]
    fn test_build_print_options_landscape_letter() {
        let page = PageOptions {
            format: PaperFormat::Letter,
            landscape: true,
            print_background: false,
            margins: Margins::uniform_cm(0.0),
        };
        let options = build_print_options(&page);

        assert_eq!(options.landscape, Some(true));
        assert_eq!(options.print_background, Some(false));
        assert_eq!(options.paper_width, Some(8.5));
        assert_eq!(options.paper_height, Some(11.0));
        assert_eq!(options.margin_top, Some(0.0));
    }

    #[test]
    fn test_navigation_error_kind() {
        assert!(matches!(
            navigation_error(true, "timed out".into()),
            EngineError::LoadTimeout(_)
        ));
        assert!(matches!(
            navigation_error(false, "connection closed".into()),
            EngineError::Load(_)
        ));
        assert!(!navigation_error(false, "target crashed".into()).is_timeout());
    }

    #[test]
    fn test_network_activity_idle_after_window() {
        let mut activity = NetworkActivity::new();
        activity.request_started("1");
        activity.request_started("2");
        activity.request_finished("1");
        assert_eq!(activity.in_flight(), 1);
        assert!(!activity.is_idle_for(Duration::ZERO));

        activity.request_finished("2");
        assert_eq!(activity.in_flight(), 0);
        assert!(activity.is_idle_for(Duration::ZERO));
        assert!(!activity.is_idle_for(Duration::from_secs(60)));

        std::thread::sleep(Duration::from_millis(30));
        assert!(activity.is_idle_for(Duration::from_millis(20)));
    }

    /// Verifies a request that never finishes keeps the page busy no matter
    /// how long it has been quiet.
    #[test]
    fn test_network_activity_hanging_request_is_never_idle() {
        let mut activity = NetworkActivity::new();
        activity.request_started("long-poll");

        std::thread::sleep(Duration::from_millis(30));
        assert!(!activity.is_idle_for(Duration::from_millis(10)));

        // Unknown ids do not reset the quiet period.
        activity.request_finished("unknown");
        assert_eq!(activity.in_flight(), 1);
        assert!(!activity.is_idle_for(Duration::ZERO));
    }

    #[test]
    fn test_poll_interval_reasonable() {
        assert!(NETWORK_POLL_INTERVAL_MS >= 50);
        assert!(NETWORK_POLL_INTERVAL_MS <= 500);
    }
}
