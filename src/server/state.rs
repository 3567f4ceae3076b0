use crate::{config::Config, upstream};
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Shared HTTP client carrying the fixed browser identity
    pub http_client: Client,
    /// In-flight request count; logged and exported, never used as a gate
    pub active_requests: Arc<AtomicUsize>,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: Config) -> Self {
        let http_client = upstream::build_client(Duration::from_secs(config.page_timeout_secs));

        Self {
            config: Arc::new(config),
            http_client,
            active_requests: Arc::new(AtomicUsize::new(0)),
        }
    }
}
