use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub data_ttl: Duration,
    pub metadata_ttl: Duration,
    pub slow_request_threshold: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 16 * 1024,
            request_timeout: Duration::from_secs(10),
            data_ttl: Duration::from_secs(30),
            metadata_ttl: Duration::from_secs(300),
            slow_request_threshold: Duration::from_millis(500),
        }
    }
}

pub fn validate_startup_config_contract(
    api: &ApiConfig,
    cache: &crate::SheetCacheConfig,
) -> Result<(), String> {
    if api.max_body_bytes == 0 {
        return Err("api size limits must be > 0".to_string());
    }
    if api.request_timeout.is_zero() {
        return Err("timeouts must be > 0".to_string());
    }
    if cache.worksheet_titles.is_empty() {
        return Err("at least one worksheet title is required".to_string());
    }
    if cache
        .worksheet_titles
        .iter()
        .any(|t| t.trim().is_empty())
    {
        return Err("worksheet titles must be non-empty".to_string());
    }
    Ok(())
}
