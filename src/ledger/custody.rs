//! Value-transfer boundary.
//!
//! The engine only ever asks to "move exactly X from A to B" and "report the
//! balance of A". Real custody lives elsewhere; `PaperValueLedger` keeps
//! balances in memory for simulations and tests.

use std::collections::HashMap;

use super::{Address, Amount};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient funds in {account}: {available} < {required}")]
    InsufficientFunds {
        account: Address,
        available: Amount,
        required: Amount,
    },

    #[error("balance overflow in {0}")]
    Overflow(Address),
}

pub trait ValueLedger {
    /// Move exactly `amount` from `from` to `to`. All or nothing.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), LedgerError>;

    fn balance(&self, account: &Address) -> Amount;
}

#[derive(Debug, Clone, Default)]
pub struct PaperValueLedger {
    balances: HashMap<Address, Amount>,
    /// Number of transfers applied
    pub transfer_count: u64,
    /// Number of transfers rejected
    pub reject_count: u64,
}

impl PaperValueLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint funds into an account (deposits from outside the engine).
    pub fn credit(&mut self, account: &Address, amount: Amount) -> Result<(), LedgerError> {
        let entry = self.balances.entry(account.clone()).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(account.clone()))?;
        Ok(())
    }

    /// Sum of every balance. Constant under transfers.
    pub fn total_supply(&self) -> Amount {
        self.balances.values().sum()
    }
}

impl ValueLedger for PaperValueLedger {
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance(from);
        if available < amount {
            self.reject_count += 1;
            return Err(LedgerError::InsufficientFunds {
                account: from.clone(),
                available,
                required: amount,
            });
        }
        if from == to || amount == 0 {
            self.transfer_count += 1;
            return Ok(());
        }

        let to_balance = self.balance(to);
        let new_to = to_balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(to.clone()))?;

        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), new_to);
        self.transfer_count += 1;
        Ok(())
    }

    fn balance(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_moves_exact_amount() {
        let alice = Address::new("alice");
        let pool = Address::new("pool");
        let mut ledger = PaperValueLedger::new();
        ledger.credit(&alice, 100).unwrap();

        ledger.transfer(&alice, &pool, 40).unwrap();
        assert_eq!(ledger.balance(&alice), 60);
        assert_eq!(ledger.balance(&pool), 40);
        assert_eq!(ledger.total_supply(), 100);
        assert_eq!(ledger.transfer_count, 1);
    }

    #[test]
    fn test_insufficient_funds_leaves_balances() {
        let alice = Address::new("alice");
        let pool = Address::new("pool");
        let mut ledger = PaperValueLedger::new();
        ledger.credit(&alice, 10).unwrap();

        let err = ledger.transfer(&alice, &pool, 11).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account: alice.clone(),
                available: 10,
                required: 11,
            }
        );
        assert_eq!(ledger.balance(&alice), 10);
        assert_eq!(ledger.balance(&pool), 0);
        assert_eq!(ledger.reject_count, 1);
    }

    #[test]
    fn test_self_transfer_is_noop() {
        let alice = Address::new("alice");
        let mut ledger = PaperValueLedger::new();
        ledger.credit(&alice, 10).unwrap();
        ledger.transfer(&alice, &alice, 10).unwrap();
        assert_eq!(ledger.balance(&alice), 10);
    }
}
