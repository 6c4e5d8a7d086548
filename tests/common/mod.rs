//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use html2pdf_server::engine::mock::MockEngineFactory;
use html2pdf_server::server::{AppState, router};
use html2pdf_server::service::GenerationSettings;
use html2pdf_server::{EngineConfig, EngineConfigBuilder, EngineHandle, ServerConfig, ServerConfigBuilder};
use url::Url;

pub const ORIGIN: &str = "http://127.0.0.1:3001/";

/// Engine config with a one second navigation timeout.
pub fn engine_config() -> EngineConfig {
    EngineConfigBuilder::new()
        .navigation_timeout(Duration::from_secs(1))
        .network_idle_window(Duration::from_millis(100))
        .build()
        .unwrap()
}

/// Loopback server on an ephemeral port with short timeouts.
pub fn server_config() -> ServerConfig {
    ServerConfigBuilder::new()
        .host("127.0.0.1")
        .port(0)
        .request_timeout(Duration::from_secs(5))
        .engine(engine_config())
        .build()
        .unwrap()
}

pub fn settings() -> GenerationSettings {
    GenerationSettings::new(&server_config(), Url::parse(ORIGIN).unwrap())
}

/// Handle over `factory` with the first engine already launched.
pub async fn launched_handle(factory: MockEngineFactory) -> Arc<EngineHandle> {
    let handle = EngineHandle::builder()
        .config(engine_config())
        .factory(Box::new(factory))
        .build()
        .unwrap();
    handle.launch().await.unwrap();
    handle
}

/// Router over `handle`, without static files.
pub fn app(handle: Arc<EngineHandle>) -> Router {
    router(AppState::new(handle, settings()), None)
}
