//! Wall-clock budget shared by every probe of one resolution.

use std::time::Duration;

use tokio::time::Instant;

/// Deadline for a probing phase plus a per-call ceiling.
#[derive(Debug, Clone, Copy)]
pub struct ProbeBudget {
    deadline: Instant,
    per_call_cap: Duration,
}

impl ProbeBudget {
    pub fn new(total: Duration, per_call_cap: Duration) -> Self {
        Self {
            deadline: Instant::now() + total,
            per_call_cap,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Timeout for the next call: time remaining, capped. `None` once the
    /// budget is spent.
    pub fn per_call_timeout(&self) -> Option<Duration> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            None
        } else {
            Some(remaining.min(self.per_call_cap))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_is_capped_then_shrinks() {
        let cap = Duration::from_millis(80);
        let budget = ProbeBudget::new(Duration::from_millis(200), cap);
        assert_eq!(budget.per_call_timeout(), Some(cap));

        tokio::time::sleep(Duration::from_millis(150)).await;
        let shrunk = budget.per_call_timeout().unwrap_or_default();
        assert!(shrunk < cap);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(budget.is_exhausted());
        assert_eq!(budget.per_call_timeout(), None);
    }

    #[test]
    fn test_zero_budget_is_exhausted_immediately() {
        let budget = ProbeBudget::new(Duration::ZERO, Duration::from_secs(8));
        assert!(budget.is_exhausted());
        assert_eq!(budget.per_call_timeout(), None);
    }
}
