//! Budget utilization alarms
//!
//! Tracks point-in-time budget snapshots and raises alerts when spend
//! crosses a utilization threshold. Designed to sit behind the router's
//! guardrail hook: every recorded decision feeds a snapshot.

use std::sync::{Arc, Mutex};

use jiff::Timestamp;
use serde::Serialize;

use crate::router::GuardrailHook;

/// Default utilization percentage at which alerts fire
pub const DEFAULT_ALERT_THRESHOLD: f64 = 80.0;

/// Point-in-time view of budget utilization
#[derive(Debug, Clone, Serialize)]
pub struct BudgetSnapshot {
    pub daily_cap: f64,
    pub monthly_cap: f64,
    pub daily_spend: f64,
    pub monthly_spend: f64,
    pub timestamp: Timestamp,
}

impl BudgetSnapshot {
    pub fn remaining_daily(&self) -> f64 {
        (self.daily_cap - self.daily_spend).max(0.0)
    }

    pub fn remaining_monthly(&self) -> f64 {
        (self.monthly_cap - self.monthly_spend).max(0.0)
    }
}

/// Which cap an alert concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Daily,
    Monthly,
}

/// A raised utilization alert
#[derive(Debug, Clone, Serialize)]
pub struct BudgetAlert {
    pub kind: AlertKind,
    pub message: String,
    pub utilization_percent: f64,
    pub timestamp: Timestamp,
}

/// Budget alarm with snapshot and alert history
pub struct BudgetAlarm {
    daily_cap: f64,
    monthly_cap: f64,
    threshold_percent: f64,
    state: Mutex<AlarmState>,
}

#[derive(Default)]
struct AlarmState {
    history: Vec<BudgetSnapshot>,
    alerts: Vec<BudgetAlert>,
}

impl BudgetAlarm {
    pub fn new(daily_cap: f64, monthly_cap: f64, threshold_percent: f64) -> Self {
        Self {
            daily_cap,
            monthly_cap,
            threshold_percent,
            state: Mutex::new(AlarmState::default()),
        }
    }

    /// Record a snapshot, raising alerts for caps past the threshold
    pub fn record_snapshot(&self, daily_spend: f64, monthly_spend: f64) -> BudgetSnapshot {
        let snapshot = BudgetSnapshot {
            daily_cap: self.daily_cap,
            monthly_cap: self.monthly_cap,
            daily_spend,
            monthly_spend,
            timestamp: Timestamp::now(),
        };

        let mut state = self.lock();
        state.history.push(snapshot.clone());

        let daily_utilization = utilization(daily_spend, self.daily_cap);
        if daily_utilization >= self.threshold_percent {
            push_alert(&mut state.alerts, AlertKind::Daily, self.daily_cap, daily_utilization);
        }
        let monthly_utilization = utilization(monthly_spend, self.monthly_cap);
        if monthly_utilization >= self.threshold_percent {
            push_alert(&mut state.alerts, AlertKind::Monthly, self.monthly_cap, monthly_utilization);
        }

        snapshot
    }

    /// Whether a single call of this cost can ever fit under the caps
    pub fn check_budget(&self, estimated_cost: f64) -> bool {
        if estimated_cost > self.daily_cap {
            tracing::error!(estimated_cost, daily_cap = self.daily_cap, "cost exceeds daily cap");
            return false;
        }
        if estimated_cost > self.monthly_cap {
            tracing::error!(estimated_cost, monthly_cap = self.monthly_cap, "cost exceeds monthly cap");
            return false;
        }
        true
    }

    /// Alert history for auditing
    pub fn alerts(&self) -> Vec<BudgetAlert> {
        self.lock().alerts.clone()
    }

    /// Snapshot history
    pub fn history(&self) -> Vec<BudgetSnapshot> {
        self.lock().history.clone()
    }

    /// Most recent snapshot, if any
    pub fn latest_snapshot(&self) -> Option<BudgetSnapshot> {
        self.lock().history.last().cloned()
    }

    /// Clear history and alerts
    pub fn reset(&self) {
        let mut state = self.lock();
        state.history.clear();
        state.alerts.clear();
    }

    /// Adapter producing a guardrail hook that feeds this alarm
    ///
    /// The hook derives spends from the decision's remaining-budget
    /// snapshot, so the alarm's caps should match the router's.
    pub fn hook(self: Arc<Self>) -> GuardrailHook {
        Arc::new(move |decision| {
            let daily_spend = (self.daily_cap - decision.budget_snapshot.daily).max(0.0);
            let monthly_spend = (self.monthly_cap - decision.budget_snapshot.monthly).max(0.0);
            self.record_snapshot(daily_spend, monthly_spend);
            Ok(())
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AlarmState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn utilization(spend: f64, cap: f64) -> f64 {
    if cap > 0.0 { (spend / cap) * 100.0 } else { 0.0 }
}

fn push_alert(alerts: &mut Vec<BudgetAlert>, kind: AlertKind, cap: f64, utilization_percent: f64) {
    tracing::warn!(?kind, cap, utilization_percent, "budget utilization alert");
    alerts.push(BudgetAlert {
        kind,
        message: format!("{kind:?} cap {cap} nearly exhausted"),
        utilization_percent,
        timestamp: Timestamp::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_tracks_remaining() {
        let alarm = BudgetAlarm::new(100.0, 1000.0, DEFAULT_ALERT_THRESHOLD);
        let snapshot = alarm.record_snapshot(25.0, 100.0);
        assert!((snapshot.remaining_daily() - 75.0).abs() < 1e-9);
        assert!((snapshot.remaining_monthly() - 900.0).abs() < 1e-9);
        assert!(alarm.alerts().is_empty());
        assert_eq!(alarm.history().len(), 1);
    }

    #[test]
    fn crossing_threshold_raises_alert() {
        let alarm = BudgetAlarm::new(100.0, 1000.0, 80.0);
        alarm.record_snapshot(85.0, 100.0);

        let alerts = alarm.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Daily);
        assert!((alerts[0].utilization_percent - 85.0).abs() < 1e-9);
    }

    #[test]
    fn both_caps_can_alert_at_once() {
        let alarm = BudgetAlarm::new(100.0, 100.0, 80.0);
        alarm.record_snapshot(90.0, 95.0);
        assert_eq!(alarm.alerts().len(), 2);
    }

    #[test]
    fn zero_cap_never_alerts() {
        let alarm = BudgetAlarm::new(0.0, 0.0, 80.0);
        alarm.record_snapshot(0.0, 0.0);
        assert!(alarm.alerts().is_empty());
    }

    #[test]
    fn check_budget_compares_against_caps() {
        let alarm = BudgetAlarm::new(1.0, 10.0, 80.0);
        assert!(alarm.check_budget(0.5));
        assert!(!alarm.check_budget(2.0));
    }

    #[test]
    fn reset_clears_state() {
        let alarm = BudgetAlarm::new(100.0, 1000.0, 80.0);
        alarm.record_snapshot(90.0, 100.0);
        alarm.reset();
        assert!(alarm.alerts().is_empty());
        assert!(alarm.latest_snapshot().is_none());
    }
}
