//! Exact integer money arithmetic.
//!
//! Amounts are base units of the native currency (wei-scale). No floating point
//! anywhere on the settlement path.

use crate::error::{EngineError, EngineResult};

pub type Amount = u128;

/// Fee rates are expressed per mille.
pub const PERMILLE: u128 = 1_000;
pub const PERCENT: u128 = 100;

/// Fee charged on a gross stake: `gross * fee_permille / 1000`, truncated.
pub fn fee_of(gross: Amount, fee_permille: u16) -> EngineResult<Amount> {
    gross
        .checked_mul(fee_permille as u128)
        .map(|x| x / PERMILLE)
        .ok_or(EngineError::Overflow("origination fee"))
}

/// Net stake recorded for a gross stake: `gross - gross * fee_permille / 1000`.
pub fn net_stake(gross: Amount, fee_permille: u16) -> EngineResult<Amount> {
    let fee = fee_of(gross, fee_permille)?;
    gross
        .checked_sub(fee)
        .ok_or(EngineError::Overflow("net stake"))
}

/// `amount * pct / 100`, truncated.
pub fn percent_of(amount: Amount, pct: u8) -> EngineResult<Amount> {
    amount
        .checked_mul(pct as u128)
        .map(|x| x / PERCENT)
        .ok_or(EngineError::Overflow("percent share"))
}

/// `amount * numerator / denominator`, truncated. Zero when the denominator is zero.
pub fn pro_rata(amount: Amount, numerator: Amount, denominator: Amount) -> EngineResult<Amount> {
    if denominator == 0 {
        return Ok(0);
    }
    amount
        .checked_mul(numerator)
        .map(|x| x / denominator)
        .ok_or(EngineError::Overflow("pro rata share"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINNEY: Amount = 1_000_000_000_000_000;
    const MICROETHER: Amount = 1_000_000_000_000;

    #[test]
    fn test_net_stake_five_permille() {
        // 10 finney at 5 per mille -> 9950 microether
        assert_eq!(net_stake(10 * FINNEY, 5).unwrap(), 9_950 * MICROETHER);
        assert_eq!(fee_of(10 * FINNEY, 5).unwrap(), 50 * MICROETHER);
        assert_eq!(net_stake(100 * FINNEY, 5).unwrap(), 99_500 * MICROETHER);
    }

    #[test]
    fn test_net_stake_truncates_fee() {
        // 199 * 5 / 1000 = 0.995 -> fee 0
        assert_eq!(net_stake(199, 5).unwrap(), 199);
        assert_eq!(net_stake(200, 5).unwrap(), 199);
        assert_eq!(net_stake(1_000, 0).unwrap(), 1_000);
        assert_eq!(net_stake(1_000, 1_000).unwrap(), 0);
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(
            fee_of(u128::MAX, 5),
            Err(EngineError::Overflow("origination fee"))
        );
        assert!(percent_of(u128::MAX, 2).is_err());
    }

    #[test]
    fn test_pro_rata() {
        assert_eq!(pro_rata(100, 1, 3).unwrap(), 33);
        assert_eq!(pro_rata(100, 5, 0).unwrap(), 0);
        assert_eq!(percent_of(99_500, 20).unwrap(), 19_900);
    }
}
