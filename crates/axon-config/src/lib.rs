//! Configuration for the Axon runtime
//!
//! TOML-based configuration with `{{ env.VAR }}` placeholder expansion,
//! covering the router's provider table and budget caps plus the state
//! repository's cache and retry tuning.

mod env;
mod loader;
mod repository;
mod router;

pub use env::{EnvError, expand_env};
pub use repository::{CacheConfig, RepositoryConfig};
pub use router::{ProviderBudget, ProviderConfig, RouterConfig};

/// Root configuration
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Model router: providers and budget caps
    #[serde(default)]
    pub router: RouterConfig,
    /// State repository tuning
    #[serde(default)]
    pub repository: RepositoryConfig,
    /// Cache backend
    #[serde(default)]
    pub cache: CacheConfig,
}
