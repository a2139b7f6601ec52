use std::sync::Mutex;

use serde::Serialize;

/// Remaining headroom under each cap, clamped at zero
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RemainingBudget {
    pub daily: f64,
    pub monthly: f64,
}

/// Cumulative recorded spend
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub daily_spend: f64,
    pub monthly_spend: f64,
}

/// Details of a rejected reservation
#[derive(Debug, Clone, Copy)]
pub(crate) struct BudgetBreach {
    pub requested: f64,
    pub remaining_daily: f64,
    pub remaining_monthly: f64,
}

/// Spend tracker enforcing daily and monthly caps
///
/// Attempts reserve their estimated cost before invoking a provider and
/// settle afterwards: commit on success, release on failure. Checking
/// and reserving happen under one lock, so concurrent routes cannot
/// jointly pass a cap they would breach together.
#[derive(Debug)]
pub struct BudgetTracker {
    daily_cap: f64,
    monthly_cap: f64,
    state: Mutex<SpendState>,
}

#[derive(Debug, Default)]
struct SpendState {
    daily_spend: f64,
    monthly_spend: f64,
    reserved: f64,
}

impl BudgetTracker {
    pub fn new(daily_cap: f64, monthly_cap: f64) -> Self {
        Self {
            daily_cap,
            monthly_cap,
            state: Mutex::new(SpendState::default()),
        }
    }

    pub const fn daily_cap(&self) -> f64 {
        self.daily_cap
    }

    pub const fn monthly_cap(&self) -> f64 {
        self.monthly_cap
    }

    /// Reserve headroom for an attempt, or report the breach
    pub(crate) fn reserve(&self, amount: f64) -> Result<Reservation<'_>, BudgetBreach> {
        let mut state = self.lock();
        let headroom_daily = self.daily_cap - state.daily_spend - state.reserved;
        let headroom_monthly = self.monthly_cap - state.monthly_spend - state.reserved;
        if amount > headroom_daily || amount > headroom_monthly {
            return Err(BudgetBreach {
                requested: amount,
                remaining_daily: (self.daily_cap - state.daily_spend).max(0.0),
                remaining_monthly: (self.monthly_cap - state.monthly_spend).max(0.0),
            });
        }
        state.reserved += amount;
        Ok(Reservation {
            tracker: self,
            amount,
            settled: false,
        })
    }

    /// Record spend directly against both caps
    pub fn record_spend(&self, amount: f64) {
        let mut state = self.lock();
        state.daily_spend += amount;
        state.monthly_spend += amount;
    }

    pub fn remaining(&self) -> RemainingBudget {
        let state = self.lock();
        RemainingBudget {
            daily: (self.daily_cap - state.daily_spend).max(0.0),
            monthly: (self.monthly_cap - state.monthly_spend).max(0.0),
        }
    }

    pub fn status(&self) -> BudgetStatus {
        let state = self.lock();
        BudgetStatus {
            daily_spend: state.daily_spend,
            monthly_spend: state.monthly_spend,
        }
    }

    /// Clear recorded spend for a new reporting period
    pub fn reset(&self) {
        let mut state = self.lock();
        state.daily_spend = 0.0;
        state.monthly_spend = 0.0;
    }

    fn settle(&self, amount: f64, spent: bool) {
        let mut state = self.lock();
        state.reserved = (state.reserved - amount).max(0.0);
        if spent {
            state.daily_spend += amount;
            state.monthly_spend += amount;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SpendState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A held slice of budget headroom
///
/// Dropping without `commit` releases the reservation without spending.
#[derive(Debug)]
pub(crate) struct Reservation<'a> {
    tracker: &'a BudgetTracker,
    amount: f64,
    settled: bool,
}

impl Reservation<'_> {
    /// Convert the reservation into recorded spend
    pub(crate) fn commit(mut self) {
        self.tracker.settle(self.amount, true);
        self.settled = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.tracker.settle(self.amount, false);
        }
    }
}
