//! Settlement Engine
//!
//! - `winners`: change computation and the winner selection policy
//! - `awards`: pure award calculation over a closed round
//! - `engine`: the mutating entry points (close, claim, forfeiture sweep)

pub mod awards;
pub mod engine;
pub mod winners;

pub use awards::{award_breakdown, calculate_award, entry_award, outcome_shares, AwardBreakdown};
pub use engine::{
    award_details, calculate_award_amount, claim_award, close_round, sweep_forfeited, CloseOutcome,
    SweepReceipt,
};
pub use winners::{change_pct, change_vector, select_winners, VoidReason, WinnerSet};
