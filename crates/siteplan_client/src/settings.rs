use std::time::Duration;

/// Environment variable holding the platform base address.
pub const BASE_URL_ENV: &str = "SITEPLAN_API_BASE";

/// Connection settings for the remote platform.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Base address every relative request path is joined onto.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientSettings {
    /// Reads the base address from [`BASE_URL_ENV`], falling back to `/`
    /// when the variable is absent or blank. Read once at startup; the
    /// client never re-reads the environment.
    pub fn from_env() -> Self {
        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "/".to_string());
        Self {
            base_url,
            ..Self::default()
        }
    }
}
