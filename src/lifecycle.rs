//! Process lifecycle: launch, serve, shut down.
//!
//! ```text
//! run_until()
//!   ├── EngineHandle::launch()     fatal on failure, nothing is bound yet
//!   ├── TcpListener::bind()
//!   └── serve()
//!         ├── axum::serve(..).with_graceful_shutdown(signal)
//!         │     in-flight requests drain after the signal
//!         └── EngineHandle::shutdown()
//! ```

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::engine::EngineFactory;
use crate::error::EngineError;
use crate::handle::EngineHandle;
use crate::server::{AppState, router};
use crate::service::GenerationSettings;

/// Errors that end the process.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Initial engine launch failed: {0}")]
    Launch(#[source] EngineError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LifecycleError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Run until SIGINT or SIGTERM.
pub async fn run(
    config: ServerConfig,
    factory: Box<dyn EngineFactory>,
) -> Result<(), LifecycleError> {
    run_until(config, factory, shutdown_signal()).await
}

/// Run until `shutdown` resolves.
///
/// The engine is launched before the listener is bound. If the launch
/// fails nothing is served and [`LifecycleError::Launch`] is returned.
pub async fn run_until<F>(
    config: ServerConfig,
    factory: Box<dyn EngineFactory>,
    shutdown: F,
) -> Result<(), LifecycleError>
where
    F: Future<Output = ()> + Send + 'static,
{
    log::info!(
        "🚀 Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let handle = EngineHandle::builder()
        .config(config.engine.clone())
        .factory(factory)
        .build()
        .map_err(|e| LifecycleError::Configuration(e.to_string()))?;

    let engine = handle.launch().await.map_err(|e| {
        log::error!("❌ Failed to launch engine: {}", e);
        LifecycleError::Launch(e)
    })?;
    log::info!("✅ Engine generation {} ready", engine.generation());

    let addr = config.bind_address();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(source) => {
            log::error!("❌ Failed to bind {}: {}", addr, source);
            handle.shutdown().await;
            return Err(LifecycleError::Bind { addr, source });
        }
    };

    serve(listener, handle, &config, shutdown).await
}

/// Serve on an already-bound listener with an already-launched engine.
///
/// After `shutdown` resolves, in-flight requests finish and then the
/// engine is closed.
pub async fn serve<F>(
    listener: TcpListener,
    handle: Arc<EngineHandle>,
    config: &ServerConfig,
    shutdown: F,
) -> Result<(), LifecycleError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            handle.shutdown().await;
            return Err(LifecycleError::Serve(e));
        }
    };

    let origin = match GenerationSettings::origin_for(local_addr) {
        Ok(origin) => origin,
        Err(e) => {
            handle.shutdown().await;
            return Err(LifecycleError::Configuration(e.to_string()));
        }
    };

    let state = AppState::new(Arc::clone(&handle), GenerationSettings::new(config, origin));
    let app = router(state, config.static_dir.clone());

    log::info!("🚀 Listening on http://{}", local_addr);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    log::info!("🔧 Server stopped accepting requests, closing engine...");
    handle.shutdown().await;
    log::info!("{}", handle.stats());

    result.map_err(LifecycleError::Serve)
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("❌ Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("❌ Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => log::info!("Received SIGTERM, shutting down..."),
    }
}
