use std::env;

/// Hosts probed when the primary and mobile origins fail to yield a manifest.
const DEFAULT_FALLBACK_ORIGINS: &str = "https://youtube.com,https://m.youtube.com,https://www.youtube.com/embed,https://www.youtube-nocookie.com";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Public base URL of this proxy; rewritten playlist links are built
    /// from it plus the inbound request path.
    pub base_url: String,
    pub is_dev: bool,
    /// Primary origin for channel/watch/embed page probes.
    pub page_origin: String,
    /// Mobile origin, probed after the primary page shapes.
    pub mobile_origin: String,
    /// Alternate origins tried last, one candidate each.
    pub fallback_origins: Vec<String>,
    /// Timeout for page and playlist fetches, in seconds.
    pub page_timeout_secs: u64,
    /// Timeout for each segment fetch attempt, in seconds.
    pub segment_timeout_secs: u64,
    /// Permit `url`/`variant` targets on private/loopback addresses.
    ///
    /// Off by default (SSRF guard); enabled for deployments whose origins
    /// live on the local network and by the integration tests.
    pub allow_private_targets: bool,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, PORT and
    /// BASE_URL are required; origin hosts always default to YouTube.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        // Port: required in prod, defaults to 3000 in dev
        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        // Base URL: required in prod, defaults to localhost in dev
        let base_url = if is_dev {
            env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
        } else {
            env::var("BASE_URL").map_err(|_| "BASE_URL is required in production")?
        };

        // Origin hosts are well-known; env overrides exist mainly so tests
        // and region-specific deployments can redirect the probes.
        let page_origin =
            env::var("PAGE_ORIGIN").unwrap_or_else(|_| "https://www.youtube.com".to_string());
        let mobile_origin =
            env::var("MOBILE_ORIGIN").unwrap_or_else(|_| "https://m.youtube.com".to_string());
        let fallback_origins = env::var("FALLBACK_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_FALLBACK_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let page_timeout_secs: u64 = env::var("PAGE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);
        let segment_timeout_secs: u64 = env::var("SEGMENT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .unwrap_or(20);

        let allow_private_targets = env::var("ALLOW_PRIVATE_TARGETS")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        Ok(Config {
            port,
            base_url,
            is_dev,
            page_origin,
            mobile_origin,
            fallback_origins,
            page_timeout_secs,
            segment_timeout_secs,
            allow_private_targets,
        })
    }
}
