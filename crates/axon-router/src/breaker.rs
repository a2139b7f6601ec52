use dashmap::DashMap;

/// Consecutive failures before a provider is taken out of rotation
pub const FAILURE_THRESHOLD: u32 = 3;

/// Per-provider failure counters
///
/// A provider at or past the threshold is skipped by candidate
/// selection until the counters are cleared by a budget reset. There is
/// no timed recovery: reset is an explicit operator action.
pub struct ProviderBreakers {
    counts: DashMap<String, u32>,
    threshold: u32,
}

impl Default for ProviderBreakers {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderBreakers {
    pub fn new() -> Self {
        Self {
            counts: DashMap::new(),
            threshold: FAILURE_THRESHOLD,
        }
    }

    /// Record a failed attempt, returning the new count
    pub fn record_failure(&self, provider: &str) -> u32 {
        let mut count = self.counts.entry(provider.to_owned()).or_insert(0);
        *count += 1;
        if *count == self.threshold {
            tracing::warn!(provider, failures = *count, "circuit breaker opened for provider");
        }
        *count
    }

    pub fn failures(&self, provider: &str) -> u32 {
        self.counts.get(provider).map_or(0, |count| *count)
    }

    /// Whether the provider should be skipped
    pub fn is_open(&self, provider: &str) -> bool {
        self.failures(provider) >= self.threshold
    }

    /// Clear all counters
    pub fn reset(&self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_provider_is_closed() {
        let breakers = ProviderBreakers::new();
        assert!(!breakers.is_open("openai"));
        assert_eq!(breakers.failures("openai"), 0);
    }

    #[test]
    fn opens_at_threshold() {
        let breakers = ProviderBreakers::new();
        for _ in 0..FAILURE_THRESHOLD - 1 {
            breakers.record_failure("openai");
        }
        assert!(!breakers.is_open("openai"));

        breakers.record_failure("openai");
        assert!(breakers.is_open("openai"));
    }

    #[test]
    fn providers_are_tracked_independently() {
        let breakers = ProviderBreakers::new();
        for _ in 0..FAILURE_THRESHOLD {
            breakers.record_failure("bad");
        }
        assert!(breakers.is_open("bad"));
        assert!(!breakers.is_open("good"));
    }

    #[test]
    fn reset_closes_everything() {
        let breakers = ProviderBreakers::new();
        for _ in 0..FAILURE_THRESHOLD {
            breakers.record_failure("openai");
        }
        breakers.reset();
        assert!(!breakers.is_open("openai"));
        assert_eq!(breakers.failures("openai"), 0);
    }
}
