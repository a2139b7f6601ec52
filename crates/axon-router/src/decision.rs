use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::budget::RemainingBudget;

/// Why a provider was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    /// The head of the ordered candidate list served the request
    BestScore,
    /// A later candidate (or the terminal local fallback) served it
    Failover,
}

/// Audit metadata attached to a decision
#[derive(Debug, Clone, Serialize)]
pub struct DecisionMetadata {
    pub reason: RouteReason,
    /// Whether a provider other than the first candidate served the call
    pub failover: bool,
    /// Last upstream error, present on the terminal fallback path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of routing a task to a provider
///
/// Appended to the router's history at creation and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingDecision {
    pub provider: String,
    pub reason: RouteReason,
    pub estimated_cost: f64,
    /// Provider latency budget in milliseconds
    pub latency_budget: f64,
    /// Remaining budget right after this decision was recorded
    pub budget_snapshot: RemainingBudget,
    pub timestamp: Timestamp,
    pub audit_trail: DecisionMetadata,
}

/// One compliance audit record per successful decision
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub provider: String,
    pub timestamp: Timestamp,
    pub budget: RemainingBudget,
    pub metadata: DecisionMetadata,
}

/// A routed response: provider output plus the decision that produced it
///
/// The decision and its timestamp are also merged into `body` when the
/// handler returned a JSON object, so downstream consumers that only see
/// the body still get the routing context.
#[derive(Debug)]
pub struct RouteOutcome {
    pub body: Value,
    pub decision: RoutingDecision,
    /// Last upstream error when the terminal fallback served the call
    pub error: Option<String>,
}
