use std::time::Duration;

use async_trait::async_trait;
use axon_config::ProviderConfig;
use serde_json::Value;
use thiserror::Error;

/// A task descriptor; the kind selects the primary provider
#[derive(Debug, Clone)]
pub struct Task {
    pub kind: String,
}

impl Task {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// An inference request: a token estimate plus an opaque body
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Requested token count; clamped to each provider's `max_tokens`
    /// when estimating cost
    pub tokens: u32,
    /// Payload forwarded verbatim to the provider handler
    pub body: Value,
}

impl RouteRequest {
    pub fn new(tokens: u32, body: Value) -> Self {
        Self { tokens, body }
    }
}

/// Errors a provider attempt can produce
///
/// Everything here is transient from the router's point of view: it
/// drives failover to the next candidate rather than failing the call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The handler exceeded the provider's deadline
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The handler reported a failure
    #[error("{0}")]
    Failed(String),
    /// No handler is registered under the provider's name
    #[error("no handler registered for provider '{0}'")]
    NoHandler(String),
}

/// Async handler invoked to serve a request against one provider
///
/// Handlers receive the opaque request and return a structured response.
/// The router applies the per-provider deadline around the invocation;
/// any handler error is treated as transient and drives failover.
#[async_trait]
pub trait ProviderHandler: Send + Sync {
    async fn invoke(&self, request: &RouteRequest) -> Result<Value, ProviderError>;
}

/// Built-in terminal-fallback handler
///
/// Echoes the request payload back under the `local` provider name.
/// Used when every candidate fails and no `local` handler is registered.
pub struct LocalEcho;

#[async_trait]
impl ProviderHandler for LocalEcho {
    async fn invoke(&self, request: &RouteRequest) -> Result<Value, ProviderError> {
        Ok(serde_json::json!({
            "provider": "local",
            "payload": request.body,
        }))
    }
}

/// Runtime view of one provider from the configuration table
///
/// Built once at router construction and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub name: String,
    pub endpoint: String,
    pub latency_weight: f64,
    pub cost_weight: f64,
    pub accuracy_weight: f64,
    pub max_tokens: u32,
    /// Cost per 1000 tokens
    pub unit_cost: f64,
    /// Latency budget in milliseconds, surfaced in decisions
    pub latency_budget: f64,
    /// Task kinds this provider accepts as a failover target
    pub failover: Vec<String>,
    /// Per-attempt invocation deadline
    pub timeout: Duration,
}

impl ProviderSpec {
    pub fn from_config(name: &str, config: &ProviderConfig) -> Self {
        Self {
            name: name.to_owned(),
            endpoint: config.endpoint.clone(),
            latency_weight: config.latency_weight,
            cost_weight: config.cost_weight,
            accuracy_weight: config.accuracy_weight,
            max_tokens: config.max_tokens,
            unit_cost: config.budget.unit_cost,
            latency_budget: config.budget.latency,
            failover: config.failover.clone(),
            timeout: Duration::from_secs_f64(config.timeout_seconds),
        }
    }

    /// Synthetic `local` provider for the terminal fallback path when
    /// the table does not configure one
    pub(crate) fn synthetic_local(max_tokens: u32) -> Self {
        Self {
            name: "local".to_owned(),
            endpoint: "local".to_owned(),
            latency_weight: 1.0,
            cost_weight: 1.0,
            accuracy_weight: 0.1,
            max_tokens: max_tokens.max(1),
            unit_cost: 0.0,
            latency_budget: 999.0,
            failover: Vec::new(),
            timeout: Duration::from_secs(2),
        }
    }
}
