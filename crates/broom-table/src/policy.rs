//! The spend cost policy.

/// How spend amounts translate into ledger costs.
///
/// Spending on your own roll costs face value; spending on someone else's
/// costs `amount * cost_multiplier`. The multiplier is table configuration,
/// not a rule constant: set it to 1 to disable the premium entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendPolicy {
    cost_multiplier: u32,
}

impl Default for SpendPolicy {
    fn default() -> Self {
        Self { cost_multiplier: 2 }
    }
}

impl SpendPolicy {
    /// Create a policy with the given cross-participant multiplier
    /// (clamped to at least 1 so spends are never free).
    pub fn new(cost_multiplier: u32) -> Self {
        Self {
            cost_multiplier: cost_multiplier.max(1),
        }
    }

    /// A policy with the premium disabled: every spend costs face value.
    pub fn flat() -> Self {
        Self::new(1)
    }

    /// The cross-participant cost multiplier.
    pub fn cost_multiplier(&self) -> u32 {
        self.cost_multiplier
    }

    /// The ledger cost of raising a roll by `amount`.
    pub fn cost_for(&self, amount: u32, own_roll: bool) -> u32 {
        if own_roll {
            amount
        } else {
            amount.saturating_mul(self.cost_multiplier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_doubles_cross_spends() {
        let policy = SpendPolicy::default();
        assert_eq!(policy.cost_for(3, true), 3);
        assert_eq!(policy.cost_for(3, false), 6);
    }

    #[test]
    fn flat_disables_premium() {
        let policy = SpendPolicy::flat();
        assert_eq!(policy.cost_for(3, false), 3);
    }

    #[test]
    fn zero_multiplier_clamped() {
        let policy = SpendPolicy::new(0);
        assert_eq!(policy.cost_multiplier(), 1);
        assert_eq!(policy.cost_for(2, false), 2);
    }

    #[test]
    fn large_amount_saturates() {
        let policy = SpendPolicy::new(3);
        assert_eq!(policy.cost_for(u32::MAX, false), u32::MAX);
    }
}
