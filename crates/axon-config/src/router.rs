use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;

/// Model router configuration
///
/// The provider table keeps insertion order: ordering ties between
/// providers with equal accuracy weights are broken by table position.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Hard daily spend cap
    #[serde(default)]
    pub daily_cap: f64,
    /// Hard monthly spend cap
    #[serde(default)]
    pub monthly_cap: f64,
    /// Utilization percentage at which budget alerts fire
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold_percent: f64,
    /// Provider configurations keyed by name
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            daily_cap: 0.0,
            monthly_cap: 0.0,
            alert_threshold_percent: default_alert_threshold(),
            providers: IndexMap::new(),
        }
    }
}

/// Configuration for a single inference provider
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Opaque endpoint identifier (URL for cloud providers, `local` for
    /// the in-process fallback)
    pub endpoint: String,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Latency scoring weight
    #[serde(default)]
    pub latency_weight: f64,
    /// Cost scoring weight
    #[serde(default)]
    pub cost_weight: f64,
    /// Accuracy scoring weight; orders failover candidates
    #[serde(default)]
    pub accuracy_weight: f64,
    /// Per-request token ceiling for this provider
    pub max_tokens: u32,
    /// Cost model for budget enforcement
    pub budget: ProviderBudget,
    /// Task types this provider accepts as a failover target
    #[serde(default)]
    pub failover: Vec<String>,
    /// Per-attempt invocation deadline in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
}

/// Per-provider cost model
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderBudget {
    /// Cost per 1000 tokens
    pub unit_cost: f64,
    /// Latency budget in milliseconds, surfaced in routing decisions
    #[serde(default = "default_latency_budget")]
    pub latency: f64,
}

const fn default_alert_threshold() -> f64 {
    80.0
}

const fn default_timeout_seconds() -> f64 {
    2.0
}

const fn default_latency_budget() -> f64 {
    120.0
}

impl RouterConfig {
    /// Validate provider weights, token limits, and failover references
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending provider and field
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.daily_cap < 0.0 || self.monthly_cap < 0.0 {
            anyhow::bail!("budget caps must not be negative");
        }

        for (name, provider) in &self.providers {
            if provider.latency_weight < 0.0 || provider.cost_weight < 0.0 || provider.accuracy_weight < 0.0 {
                anyhow::bail!("provider '{name}': weights must not be negative");
            }
            if provider.max_tokens == 0 {
                anyhow::bail!("provider '{name}': max_tokens must be greater than zero");
            }
            if provider.budget.unit_cost < 0.0 {
                anyhow::bail!("provider '{name}': unit_cost must not be negative");
            }
            if provider.timeout_seconds <= 0.0 {
                anyhow::bail!("provider '{name}': timeout_seconds must be positive");
            }
            for target in &provider.failover {
                if !self.providers.contains_key(target) {
                    anyhow::bail!("provider '{name}': failover target '{target}' is not a configured provider");
                }
            }
        }

        Ok(())
    }
}
