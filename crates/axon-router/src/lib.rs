//! Multi-provider model routing with hard budget caps
//!
//! The router dispatches inference tasks across a table of providers:
//! it orders candidates for the task, enforces daily and monthly spend
//! caps *before* each attempt, invokes the provider handler under a
//! per-provider deadline, and fails over to the next candidate on
//! transient errors. Every successful decision lands in an audit log
//! and is offered to an optional guardrail callback. A per-provider
//! circuit breaker keeps a consistently failing provider out of
//! rotation until the next budget reset.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod alarm;
mod breaker;
mod budget;
mod decision;
mod error;
mod provider;
mod router;

pub use alarm::{AlertKind, BudgetAlarm, BudgetAlert, BudgetSnapshot, DEFAULT_ALERT_THRESHOLD};
pub use breaker::{FAILURE_THRESHOLD, ProviderBreakers};
pub use budget::{BudgetStatus, BudgetTracker, RemainingBudget};
pub use decision::{AuditEntry, DecisionMetadata, RouteOutcome, RouteReason, RoutingDecision};
pub use error::RouterError;
pub use provider::{LocalEcho, ProviderError, ProviderHandler, ProviderSpec, RouteRequest, Task};
pub use router::{GuardrailHook, HandlerMap, ModelRouter};
