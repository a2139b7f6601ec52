use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axon_config::RouterConfig;
use indexmap::IndexMap;
use jiff::Timestamp;
use serde_json::Value;

use crate::breaker::ProviderBreakers;
use crate::budget::{BudgetStatus, BudgetTracker, RemainingBudget};
use crate::decision::{AuditEntry, DecisionMetadata, RouteOutcome, RouteReason, RoutingDecision};
use crate::error::RouterError;
use crate::provider::{LocalEcho, ProviderError, ProviderHandler, ProviderSpec, RouteRequest, Task};

/// Provider handler table keyed by provider name
pub type HandlerMap = HashMap<String, Arc<dyn ProviderHandler>>;

/// Callback invoked after every recorded routing decision
///
/// Failures are logged and swallowed; they never affect routing.
pub type GuardrailHook = Arc<dyn Fn(&RoutingDecision) -> anyhow::Result<()> + Send + Sync>;

/// Sort providers by descending accuracy weight, stably
fn sort_by_accuracy_desc(providers: &mut [&ProviderSpec]) {
    providers.sort_by(|a, b| b.accuracy_weight.partial_cmp(&a.accuracy_weight).unwrap_or(std::cmp::Ordering::Equal));
}

/// Routes tasks across providers under hard budget caps
///
/// Each router instance owns its provider table, budget counters,
/// breaker map, and audit history. Concurrent `route` calls on one
/// instance are safe: budget checks and spend updates are mutually
/// exclusive, so no interleaving can jointly breach a cap.
pub struct ModelRouter {
    providers: IndexMap<String, ProviderSpec>,
    handlers: HandlerMap,
    budget: BudgetTracker,
    breakers: ProviderBreakers,
    history: Mutex<Vec<RoutingDecision>>,
    audit_log: Mutex<Vec<AuditEntry>>,
    guardrail: Mutex<Option<GuardrailHook>>,
    local_echo: Arc<dyn ProviderHandler>,
}

impl ModelRouter {
    /// Build a router from configuration and a handler table
    pub fn from_config(config: &RouterConfig, handlers: HandlerMap) -> Self {
        let providers = config
            .providers
            .iter()
            .map(|(name, provider)| (name.clone(), ProviderSpec::from_config(name, provider)))
            .collect();

        Self {
            providers,
            handlers,
            budget: BudgetTracker::new(config.daily_cap, config.monthly_cap),
            breakers: ProviderBreakers::new(),
            history: Mutex::new(Vec::new()),
            audit_log: Mutex::new(Vec::new()),
            guardrail: Mutex::new(None),
            local_echo: Arc::new(LocalEcho),
        }
    }

    /// Look up a provider from the table
    pub fn provider(&self, name: &str) -> Option<&ProviderSpec> {
        self.providers.get(name)
    }

    /// Estimated cost of a request: `(tokens / 1000) * unit_cost`
    #[allow(clippy::unused_self)]
    pub fn estimate_cost(&self, provider: &ProviderSpec, tokens: u32) -> f64 {
        (f64::from(tokens) / 1000.0) * provider.unit_cost
    }

    /// Record spend against both caps
    pub fn record_spend(&self, amount: f64) {
        self.budget.record_spend(amount);
    }

    /// Remaining headroom under each cap
    pub fn remaining_budget(&self) -> RemainingBudget {
        self.budget.remaining()
    }

    /// Cumulative recorded spend
    pub fn budget_status(&self) -> BudgetStatus {
        self.budget.status()
    }

    /// Clear spend counters and breaker state for a new reporting period
    pub fn reset_budget(&self) {
        self.budget.reset();
        self.breakers.reset();
        tracing::info!("budget and breakers reset");
    }

    /// Current breaker failure count for a provider
    pub fn breaker_failures(&self, provider: &str) -> u32 {
        self.breakers.failures(provider)
    }

    /// Register the guardrail callback fired after each recorded decision
    pub fn attach_guardrails(&self, hook: GuardrailHook) {
        *self.guardrail.lock().unwrap_or_else(|e| e.into_inner()) = Some(hook);
    }

    /// Immutable snapshot of all routing decisions
    pub fn audit_trail(&self) -> Vec<RoutingDecision> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Immutable snapshot of recorded audit events
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit_log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Route a task, enforcing budgets and failing over on transient errors
    ///
    /// Candidates are attempted in order. A budget breach is terminal;
    /// a timeout or handler failure charges the provider's breaker and
    /// moves on. When every candidate fails, the local handler serves
    /// the request unconditionally with the last error attached.
    ///
    /// # Errors
    ///
    /// [`RouterError::BudgetExceeded`] when the next attempt's estimated
    /// cost would breach a cap, or [`RouterError::FallbackFailed`] when
    /// even the local fallback errors
    pub async fn route(&self, task: &Task, request: &RouteRequest) -> Result<RouteOutcome, RouterError> {
        let candidates = self.ordered_candidates(&task.kind);
        let primary = candidates.first().map(|provider| provider.name.clone());
        let mut last_error: Option<String> = None;

        for provider in candidates {
            if self.breakers.is_open(&provider.name) {
                tracing::warn!(provider = %provider.name, "skipping provider, circuit breaker open");
                continue;
            }

            let tokens = request.tokens.min(provider.max_tokens);
            let cost = self.estimate_cost(provider, tokens);
            let reservation = self.budget.reserve(cost).map_err(|breach| {
                tracing::error!(
                    provider = %provider.name,
                    requested = breach.requested,
                    remaining_daily = breach.remaining_daily,
                    remaining_monthly = breach.remaining_monthly,
                    "budget breach prevented"
                );
                RouterError::BudgetExceeded {
                    requested: breach.requested,
                    remaining_daily: breach.remaining_daily,
                    remaining_monthly: breach.remaining_monthly,
                }
            })?;

            match self.invoke_handler(provider, request).await {
                Ok(mut body) => {
                    reservation.commit();
                    let failover = primary.as_deref() != Some(provider.name.as_str());
                    let reason = if failover {
                        RouteReason::Failover
                    } else {
                        RouteReason::BestScore
                    };
                    let decision = self.record_decision(
                        provider,
                        cost,
                        DecisionMetadata {
                            reason,
                            failover,
                            error: None,
                        },
                    );
                    merge_decision(&mut body, &decision);
                    return Ok(RouteOutcome {
                        body,
                        decision,
                        error: None,
                    });
                }
                Err(e @ ProviderError::NoHandler(_)) => {
                    drop(reservation);
                    tracing::warn!(provider = %provider.name, error = %e, "provider not invocable");
                    // A configuration gap, not an invocation failure: no breaker
                    // charge, and a real upstream error is not overwritten
                    if last_error.is_none() {
                        last_error = Some(e.to_string());
                    }
                }
                Err(e) => {
                    drop(reservation);
                    let failures = self.breakers.record_failure(&provider.name);
                    tracing::warn!(
                        provider = %provider.name,
                        failures,
                        error = %e,
                        "provider attempt failed, trying next candidate"
                    );
                    last_error = Some(e.to_string());
                }
            }
        }

        self.fallback_to_local(request, last_error).await
    }

    /// Terminal path: serve from the local handler, costing nothing
    async fn fallback_to_local(
        &self,
        request: &RouteRequest,
        last_error: Option<String>,
    ) -> Result<RouteOutcome, RouterError> {
        tracing::error!("all providers failed, invoking local fallback");

        let local = self
            .providers
            .get("local")
            .cloned()
            .unwrap_or_else(|| ProviderSpec::synthetic_local(request.tokens));
        let handler = self
            .handlers
            .get("local")
            .map_or_else(|| Arc::clone(&self.local_echo), Arc::clone);

        let mut body = handler.invoke(request).await.map_err(RouterError::FallbackFailed)?;

        let decision = self.record_decision(
            &local,
            0.0,
            DecisionMetadata {
                reason: RouteReason::Failover,
                failover: true,
                error: last_error.clone(),
            },
        );
        merge_decision(&mut body, &decision);
        if let (Value::Object(map), Some(error)) = (&mut body, &last_error) {
            map.insert("error".to_owned(), Value::String(error.clone()));
        }

        Ok(RouteOutcome {
            body,
            decision,
            error: last_error,
        })
    }

    /// Candidates for a task kind, most preferred first
    ///
    /// Primary: the provider named after the kind. Secondary: providers
    /// listing the kind in their failover set, by descending accuracy
    /// weight. With neither, the whole table by descending accuracy
    /// weight. The sort is stable, so equal weights keep table order.
    fn ordered_candidates(&self, kind: &str) -> Vec<&ProviderSpec> {
        let primary: Vec<&ProviderSpec> = self.providers.values().filter(|p| p.name == kind).collect();
        let mut secondary: Vec<&ProviderSpec> = self
            .providers
            .values()
            .filter(|p| p.name != kind && p.failover.iter().any(|target| target == kind))
            .collect();
        sort_by_accuracy_desc(&mut secondary);

        if primary.is_empty() && secondary.is_empty() {
            let mut all: Vec<&ProviderSpec> = self.providers.values().collect();
            sort_by_accuracy_desc(&mut all);
            return all;
        }

        primary.into_iter().chain(secondary).collect()
    }

    /// Invoke a provider's handler under its deadline
    async fn invoke_handler(&self, provider: &ProviderSpec, request: &RouteRequest) -> Result<Value, ProviderError> {
        let Some(handler) = self.handlers.get(&provider.name) else {
            return Err(ProviderError::NoHandler(provider.name.clone()));
        };
        match tokio::time::timeout(provider.timeout, handler.invoke(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(provider.timeout)),
        }
    }

    fn record_decision(&self, provider: &ProviderSpec, cost: f64, metadata: DecisionMetadata) -> RoutingDecision {
        let decision = RoutingDecision {
            provider: provider.name.clone(),
            reason: metadata.reason,
            estimated_cost: cost,
            latency_budget: provider.latency_budget,
            budget_snapshot: self.budget.remaining(),
            timestamp: Timestamp::now(),
            audit_trail: metadata.clone(),
        };

        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(decision.clone());
        self.audit_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(AuditEntry {
                provider: decision.provider.clone(),
                timestamp: decision.timestamp,
                budget: decision.budget_snapshot,
                metadata,
            });

        self.notify_guardrails(&decision);
        tracing::info!(
            provider = %decision.provider,
            cost,
            reason = ?decision.reason,
            "routed task"
        );
        decision
    }

    fn notify_guardrails(&self, decision: &RoutingDecision) {
        let hook = self.guardrail.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(hook) = hook
            && let Err(e) = hook(decision)
        {
            tracing::error!(error = %e, "guardrail callback failed");
        }
    }
}

/// Merge the decision and timestamp into an object-shaped response body
fn merge_decision(body: &mut Value, decision: &RoutingDecision) {
    if let Value::Object(map) = body {
        map.insert(
            "decision".to_owned(),
            serde_json::to_value(decision).unwrap_or(Value::Null),
        );
        map.insert("timestamp".to_owned(), Value::String(decision.timestamp.to_string()));
    }
}
