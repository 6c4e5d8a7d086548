//! Configuration for the rendering engine and the HTTP server.
//!
//! This module provides [`EngineConfig`] / [`EngineConfigBuilder`] for how the
//! engine process is launched and how content is loaded, and
//! [`ServerConfig`] / [`ServerConfigBuilder`] for the HTTP surface.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use html2pdf_server::{EngineConfigBuilder, ServerConfigBuilder};
//!
//! let engine = EngineConfigBuilder::new()
//!     .navigation_timeout(Duration::from_secs(30))
//!     .build()
//!     .expect("Invalid engine configuration");
//!
//! let server = ServerConfigBuilder::new()
//!     .port(8080)
//!     .engine(engine)
//!     .build()
//!     .expect("Invalid server configuration");
//!
//! assert_eq!(server.port, 8080);
//! assert_eq!(server.engine.navigation_timeout, Duration::from_secs(30));
//! ```
//!
//! # Environment Configuration
//!
//! When the `env-config` feature is enabled, you can load configuration
//! from environment variables and an optional `app.env` file:
//!
//! ```rust,ignore
//! use html2pdf_server::config::env::from_env;
//!
//! let config = from_env()?;
//! ```
//!
//! See [`mod@env`] module for available environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::options::{
    DEFAULT_NAVIGATION_TIMEOUT_SECS, DEFAULT_NETWORK_IDLE_MILLIS, LoadOptions, PageOptions,
    WaitPolicy,
};

/// Default CDP protocol timeout in seconds.
pub const DEFAULT_PROTOCOL_TIMEOUT_SECS: u64 = 90;

/// Default bound on a whole request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3001;

/// Default listen address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

// ============================================================================
// Engine Configuration
// ============================================================================

/// How the engine process is launched and how sessions load content.
///
/// # Fields Overview
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `chrome_path` | auto | Custom Chrome binary |
/// | `headless` | `true` | Run without a window |
/// | `protocol_timeout` | 90s | Max silence on the CDP connection |
/// | `navigation_timeout` | 60s | Max time for one content load |
/// | `network_idle_window` | 500ms | Quiet period for network idle |
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use html2pdf_server::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert!(config.headless);
/// assert_eq!(config.protocol_timeout, Duration::from_secs(90));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Chrome binary to launch. `None` uses auto-detection.
    pub chrome_path: Option<PathBuf>,

    /// Launch without a visible window.
    pub headless: bool,

    /// How long the CDP connection may stay silent before the engine is
    /// considered gone.
    ///
    /// Keep this above `navigation_timeout`, since a long page load is a
    /// silent period from the connection's point of view.
    pub protocol_timeout: Duration,

    /// Upper bound on one content load, navigation and readiness wait
    /// included.
    pub navigation_timeout: Duration,

    /// Quiet period required by [`WaitPolicy::NetworkIdle`].
    ///
    /// Zero selects [`WaitPolicy::Load`].
    pub network_idle_window: Duration,
}

impl EngineConfig {
    /// Load options derived from this configuration.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use html2pdf_server::{EngineConfigBuilder, WaitPolicy};
    ///
    /// let config = EngineConfigBuilder::new()
    ///     .network_idle_window(Duration::ZERO)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(config.load_options().wait, WaitPolicy::Load);
    /// ```
    pub fn load_options(&self) -> LoadOptions {
        let wait = if self.network_idle_window.is_zero() {
            WaitPolicy::Load
        } else {
            WaitPolicy::NetworkIdle {
                idle_window: self.network_idle_window,
            }
        };

        LoadOptions {
            wait,
            timeout: self.navigation_timeout,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            protocol_timeout: Duration::from_secs(DEFAULT_PROTOCOL_TIMEOUT_SECS),
            navigation_timeout: Duration::from_secs(DEFAULT_NAVIGATION_TIMEOUT_SECS),
            network_idle_window: Duration::from_millis(DEFAULT_NETWORK_IDLE_MILLIS),
        }
    }
}

/// Builder for [`EngineConfig`] with validation.
///
/// # Validation
///
/// The [`build()`](Self::build) method validates:
/// - `protocol_timeout` and `navigation_timeout` must be greater than 0
/// - `network_idle_window` must be shorter than `navigation_timeout`
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Set a custom Chrome binary path.
    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Run headless (default) or with a window, for debugging.
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set the CDP protocol timeout.
    pub fn protocol_timeout(mut self, timeout: Duration) -> Self {
        self.config.protocol_timeout = timeout;
        self
    }

    /// Set the per-load navigation timeout.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use html2pdf_server::EngineConfigBuilder;
    ///
    /// let config = EngineConfigBuilder::new()
    ///     .navigation_timeout(Duration::from_secs(10))
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(config.load_options().timeout, Duration::from_secs(10));
    /// ```
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.config.navigation_timeout = timeout;
        self
    }

    /// Set the network-idle quiet window. Zero disables the idle wait.
    pub fn network_idle_window(mut self, window: Duration) -> Self {
        self.config.network_idle_window = window;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// - Returns error if either timeout is zero
    /// - Returns error if the idle window does not fit inside the
    ///   navigation timeout
    pub fn build(self) -> std::result::Result<EngineConfig, String> {
        if self.config.protocol_timeout.is_zero() {
            return Err("protocol_timeout must be greater than 0".to_string());
        }

        if self.config.navigation_timeout.is_zero() {
            return Err("navigation_timeout must be greater than 0".to_string());
        }

        if self.config.network_idle_window >= self.config.navigation_timeout {
            return Err("network_idle_window must be shorter than navigation_timeout".to_string());
        }

        Ok(self.config)
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP surface configuration, including the engine configuration it starts.
///
/// | Field | Default |
/// |-------|---------|
/// | `host` | `0.0.0.0` |
/// | `port` | 3001 |
/// | `static_dir` | none |
/// | `request_timeout` | 120s |
/// | `page` | A4, backgrounds, 1cm margins |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Directory served as the router fallback. URL sources resolve
    /// against this server, so the engine can fetch these files.
    pub static_dir: Option<PathBuf>,

    /// Outer bound on a whole request, engine restart excluded.
    pub request_timeout: Duration,

    pub engine: EngineConfig,

    /// Page options applied to every render unless the request overrides
    /// orientation.
    pub page: PageOptions,
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            static_dir: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            engine: EngineConfig::default(),
            page: PageOptions::default(),
        }
    }
}

/// Builder for [`ServerConfig`] with validation.
///
/// # Validation
///
/// - `host` must not be empty
/// - `request_timeout` must be at least the engine's `navigation_timeout`
/// - `page` must leave printable area
///
/// Port 0 is accepted and binds an ephemeral port.
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.static_dir = Some(dir.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn page(mut self, page: PageOptions) -> Self {
        self.config.page = page;
        self
    }

    /// Build and validate the configuration.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use html2pdf_server::ServerConfigBuilder;
    ///
    /// // Request timeout shorter than one page load
    /// let config = ServerConfigBuilder::new()
    ///     .request_timeout(Duration::from_secs(1))
    ///     .build();
    /// assert!(config.is_err());
    /// ```
    pub fn build(self) -> std::result::Result<ServerConfig, String> {
        if self.config.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }

        if self.config.request_timeout < self.config.engine.navigation_timeout {
            return Err("request_timeout must be at least navigation_timeout".to_string());
        }

        self.config.page.validate()?;

        Ok(self.config)
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Environment Configuration (feature-gated)
// ============================================================================

/// Environment-based configuration loading.
///
/// This module is only available when the `env-config` feature is enabled.
///
/// # Environment File
///
/// Variables are read from the process environment after loading an optional
/// `app.env` file from the current directory via `dotenvy`.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `SERVER_HOST` | String | 0.0.0.0 | Listen address |
/// | `SERVER_PORT` | u16 | 3001 | Listen port |
/// | `STATIC_DIR` | path | unset | Directory served as fallback |
/// | `CHROME_PATH` | path | auto | Custom Chrome binary path |
/// | `ENGINE_PROTOCOL_TIMEOUT_SECONDS` | u64 | 90 | CDP protocol timeout |
/// | `ENGINE_NAVIGATION_TIMEOUT_SECONDS` | u64 | 60 | Per-load timeout |
/// | `ENGINE_NETWORK_IDLE_MILLIS` | u64 | 500 | Network idle window (0 = off) |
/// | `REQUEST_TIMEOUT_SECONDS` | u64 | 120 | Whole-request timeout |
///
/// Unparseable values fall back to the default.
///
/// # Example `app.env` File
///
/// ```text
/// SERVER_PORT=3001
/// STATIC_DIR=./public
/// ENGINE_NAVIGATION_TIMEOUT_SECONDS=60
/// # CHROME_PATH=/usr/bin/chromium
/// ```
#[cfg(feature = "env-config")]
pub mod env {
    use super::*;
    use crate::error::EngineError;

    /// Default environment file name.
    pub const ENV_FILE_NAME: &str = "app.env";

    /// Load environment variables from `app.env`.
    ///
    /// Called by [`from_env`]; exposed for callers that want to load the
    /// file earlier or inspect the error.
    pub fn load_env_file() -> Result<PathBuf, dotenvy::Error> {
        dotenvy::from_filename(ENV_FILE_NAME)
    }

    fn var_or<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Load the full server configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if the resulting values fail
    /// builder validation.
    pub fn from_env() -> Result<ServerConfig, EngineError> {
        match load_env_file() {
            Ok(path) => {
                log::info!("📄 Loaded configuration from: {:?}", path);
            }
            Err(e) => {
                log::debug!(
                    "📄 No {} file found or failed to load: {} (using environment variables and defaults)",
                    ENV_FILE_NAME,
                    e
                );
            }
        }

        let host = std::env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = var_or("SERVER_PORT", DEFAULT_PORT);
        let static_dir = std::env::var("STATIC_DIR").ok().filter(|s| !s.is_empty());
        let protocol_secs = var_or("ENGINE_PROTOCOL_TIMEOUT_SECONDS", DEFAULT_PROTOCOL_TIMEOUT_SECS);
        let navigation_secs = var_or(
            "ENGINE_NAVIGATION_TIMEOUT_SECONDS",
            DEFAULT_NAVIGATION_TIMEOUT_SECS,
        );
        let idle_millis = var_or("ENGINE_NETWORK_IDLE_MILLIS", DEFAULT_NETWORK_IDLE_MILLIS);
        let request_secs = var_or("REQUEST_TIMEOUT_SECONDS", DEFAULT_REQUEST_TIMEOUT_SECS);

        log::info!("🔧 Loading server configuration from environment:");
        log::info!("   - Listen: {}:{}", host, port);
        log::info!("   - Static dir: {:?}", static_dir);
        log::info!("   - Protocol timeout: {}s", protocol_secs);
        log::info!("   - Navigation timeout: {}s", navigation_secs);
        log::info!("   - Network idle window: {}ms", idle_millis);
        log::info!("   - Request timeout: {}s", request_secs);

        let mut engine = EngineConfigBuilder::new()
            .protocol_timeout(Duration::from_secs(protocol_secs))
            .navigation_timeout(Duration::from_secs(navigation_secs))
            .network_idle_window(Duration::from_millis(idle_millis));
        if let Some(path) = chrome_path_from_env() {
            log::info!("   - Chrome path: {}", path);
            engine = engine.chrome_path(path);
        }
        let engine = engine.build().map_err(EngineError::Configuration)?;

        let mut server = ServerConfigBuilder::new()
            .host(host)
            .port(port)
            .request_timeout(Duration::from_secs(request_secs))
            .engine(engine);
        if let Some(dir) = static_dir {
            server = server.static_dir(dir);
        }

        server.build().map_err(EngineError::Configuration)
    }

    /// Read `CHROME_PATH`, ignoring empty values.
    pub fn chrome_path_from_env() -> Option<String> {
        std::env::var("CHROME_PATH").ok().filter(|s| !s.is_empty())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
