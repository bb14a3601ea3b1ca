//! Standardness policy values used during transaction selection.

use std::fmt;

use quagga_chain::amount::COIN;

/// The default minimum relay fee rate, in zatoshis per 1000 bytes.
pub const MIN_RELAY_TX_FEE: i64 = 100;

/// The marginal fee most wallets attach by default, in zatoshis.
///
/// Transactions paying at least this much are never treated as free.
pub const DEFAULT_FEE: i64 = 10_000;

/// Returns `true` if a transaction with `priority` may be relayed and
/// mined without a fee.
///
/// "Free" transactions must have a priority at least as high as a one-day
/// old, 1-ZEC coin spent in a transaction of median size.
pub fn allow_free(priority: f64) -> bool {
    priority > (COIN as f64) * 144.0 / 250.0
}

/// A fee rate in zatoshis per 1000 bytes.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Default)]
pub struct FeeRate(i64);

impl FeeRate {
    /// Computes the fee rate paid by a transaction of `size` bytes paying
    /// `fee_paid` zatoshis.
    pub fn new(fee_paid: i64, size: usize) -> FeeRate {
        if size > 0 {
            FeeRate(fee_paid.saturating_mul(1000) / size as i64)
        } else {
            FeeRate(0)
        }
    }

    /// Creates a fee rate directly from zatoshis per 1000 bytes.
    pub fn from_zats_per_kb(zats: i64) -> FeeRate {
        FeeRate(zats)
    }

    /// Returns the rate in zatoshis per 1000 bytes.
    pub fn zats_per_kb(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeeRate({} zat/kB)", self.0)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} zat/kB", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_rate_is_per_kilobyte() {
        assert_eq!(FeeRate::new(1000, 1000).zats_per_kb(), 1000);
        assert_eq!(FeeRate::new(500, 250).zats_per_kb(), 2000);
        assert_eq!(FeeRate::new(0, 100).zats_per_kb(), 0);
    }

    #[test]
    fn free_threshold() {
        assert!(!allow_free(0.0));
        assert!(allow_free((COIN as f64) * 144.0 / 250.0 + 1.0));
    }
}
