use serde::Deserialize;

/// State repository tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// TTL applied to cached state records, in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Attempts per durable operation before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff delay; doubles per attempt
    #[serde(default = "default_retry_delay_ms")]
    pub retry_initial_delay_ms: u64,
    /// TTL for cache latency observability samples, in seconds
    #[serde(default = "default_latency_sample_ttl")]
    pub latency_sample_ttl_seconds: u64,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl(),
            max_retries: default_max_retries(),
            retry_initial_delay_ms: default_retry_delay_ms(),
            latency_sample_ttl_seconds: default_latency_sample_ttl(),
        }
    }
}

/// Cache backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Valkey/Redis connection URL
    #[serde(default = "default_cache_url")]
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: default_cache_url(),
        }
    }
}

const fn default_cache_ttl() -> u64 {
    60
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    50
}

const fn default_latency_sample_ttl() -> u64 {
    300
}

fn default_cache_url() -> String {
    "redis://127.0.0.1:6379".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RepositoryConfig::default();
        assert_eq!(config.cache_ttl_seconds, 60);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_initial_delay_ms, 50);
        assert_eq!(config.latency_sample_ttl_seconds, 300);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: RepositoryConfig = toml::from_str("max_retries = 5").unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.cache_ttl_seconds, 60);
    }
}
