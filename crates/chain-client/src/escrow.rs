use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A party's escrow position for one token on one network.
///
/// Invariant `total = available + locked` must hold after every
/// construction and mutation; `new` and `lock`/`unlock` are the only ways
/// to build or change one, and both maintain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowBalance {
    pub total: Decimal,
    pub available: Decimal,
    pub locked: Decimal,
}

impl EscrowBalance {
    pub fn new(total: Decimal, locked: Decimal) -> Self {
        Self {
            total,
            available: total - locked,
            locked,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.available + self.locked
    }

    pub fn lock(&self, amount: Decimal) -> Option<EscrowBalance> {
        if amount > self.available {
            return None;
        }
        Some(EscrowBalance {
            total: self.total,
            available: self.available - amount,
            locked: self.locked + amount,
        })
    }

    pub fn unlock(&self, amount: Decimal) -> Option<EscrowBalance> {
        if amount > self.locked {
            return None;
        }
        Some(EscrowBalance {
            total: self.total,
            available: self.available + amount,
            locked: self.locked - amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_maintains_invariant() {
        let bal = EscrowBalance::new(Decimal::from(100), Decimal::from(30));
        assert!(bal.is_consistent());
        assert_eq!(bal.available, Decimal::from(70));
    }

    #[test]
    fn lock_over_available_fails() {
        let bal = EscrowBalance::new(Decimal::from(100), Decimal::from(90));
        assert!(bal.lock(Decimal::from(20)).is_none());
        let locked = bal.lock(Decimal::from(10)).unwrap();
        assert!(locked.is_consistent());
        assert_eq!(locked.locked, Decimal::from(100));
        assert_eq!(locked.available, Decimal::ZERO);
    }

    #[test]
    fn unlock_restores_availability() {
        let bal = EscrowBalance::new(Decimal::from(100), Decimal::from(40));
        let unlocked = bal.unlock(Decimal::from(40)).unwrap();
        assert!(unlocked.is_consistent());
        assert_eq!(unlocked.locked, Decimal::ZERO);
        assert_eq!(unlocked.available, Decimal::from(100));
    }
}
