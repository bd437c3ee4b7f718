use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Client-side settings, read once at startup from `APP_*` environment
/// variables and carried by the session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the managed backend's document API.
    pub backend_url: String,
    pub api_key: Option<String>,
    /// Fixed refresh interval for pollers; the staleness bound of the
    /// pull-based sync model.
    pub poll_interval: Duration,
    /// Directory holding per-user local conversation caches.
    pub cache_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8080".to_string(),
            api_key: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            cache_dir: std::env::temp_dir().join("social-cache"),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let backend_url = std::env::var("APP_BACKEND_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.backend_url);

        let api_key = std::env::var("APP_BACKEND_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let poll_interval = std::env::var("APP_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        let cache_dir = std::env::var("APP_CACHE_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        Self {
            backend_url,
            api_key,
            poll_interval,
            cache_dir,
        }
    }

    /// Local conversation cache database for one signed-in user.
    pub fn cache_path(&self, user_id: Uuid) -> PathBuf {
        self.cache_dir.join(format!("{user_id}.sqlite"))
    }
}
