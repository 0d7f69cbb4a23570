//! Ledger Math
//!
//! Pure money computations shared by bet placement, settlement and reporting:
//! - potential return (stake x decimal odds), fixed at placement
//! - commission schedule (informational, never deducted from the return)
//! - payout per outcome class, including void and half outcomes
//! - per-user profit / win-rate / ROI aggregation

use crate::models::{Bet, BetOutcome, Commission};
use serde::{Deserialize, Serialize};

/// Standard fee charged on every stake.
pub const STANDARD_COMMISSION_RATE: f64 = 0.03;
/// Extra fee when the bet followed an AI recommendation.
pub const AI_PREMIUM_RATE: f64 = 0.01;
/// Flat profit-percentage marker recorded with each bet.
pub const PROFIT_PERCENTAGE: f64 = 5.0;

/// Round to two decimal places (cents).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn potential_return(stake: f64, odds: f64) -> f64 {
    stake * odds
}

pub fn commission(stake: f64, use_ai: bool) -> Commission {
    Commission {
        standard: round2(stake * STANDARD_COMMISSION_RATE),
        ai_premium: if use_ai {
            round2(stake * AI_PREMIUM_RATE)
        } else {
            0.0
        },
        profit_percentage: PROFIT_PERCENTAGE,
    }
}

/// Amount handed back to the bettor and the resulting profit (negative on loss).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub returned: f64,
    pub profit: f64,
}

/// Payout for a stake with a fixed potential return under `outcome`.
pub fn payout(stake: f64, potential_return: f64, outcome: BetOutcome) -> Payout {
    let winnings = potential_return - stake;
    match outcome {
        BetOutcome::Win => Payout {
            returned: potential_return,
            profit: winnings,
        },
        BetOutcome::Loss => Payout {
            returned: 0.0,
            profit: -stake,
        },
        BetOutcome::Void => Payout {
            returned: stake,
            profit: 0.0,
        },
        BetOutcome::HalfWin => Payout {
            returned: stake + winnings / 2.0,
            profit: winnings / 2.0,
        },
        BetOutcome::HalfLoss => Payout {
            returned: stake / 2.0,
            profit: -stake / 2.0,
        },
    }
}

pub fn settle_payout(bet: &Bet, outcome: BetOutcome) -> Payout {
    payout(bet.stake_amount, bet.potential_return, outcome)
}

/// Aggregate betting statistics for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfitStats {
    pub total_bets: usize,
    pub total_staked: f64,
    pub total_returned: f64,
    pub total_profit: f64,
    pub win_count: f64,
    pub loss_count: f64,
    /// Percentage of settled bets won
    pub win_rate: f64,
    /// Total profit over total staked, as a percentage
    pub roi: f64,
}

/// Aggregate settled bets. Bets without a result are ignored.
///
/// Half outcomes count 0.5 towards both the win and the loss tally; void bets
/// count towards `total_bets` only.
pub fn aggregate_user_profit(settled_bets: &[Bet]) -> UserProfitStats {
    let mut stats = UserProfitStats::default();

    for bet in settled_bets {
        let Some(outcome) = bet.result else {
            continue;
        };
        let p = settle_payout(bet, outcome);

        stats.total_bets += 1;
        stats.total_staked += bet.stake_amount;
        stats.total_returned += p.returned;
        stats.total_profit += p.profit;

        match outcome {
            BetOutcome::Win => stats.win_count += 1.0,
            BetOutcome::Loss => stats.loss_count += 1.0,
            BetOutcome::HalfWin | BetOutcome::HalfLoss => {
                stats.win_count += 0.5;
                stats.loss_count += 0.5;
            }
            BetOutcome::Void => {}
        }
    }

    stats.win_rate = if stats.total_bets > 0 {
        round2(stats.win_count / stats.total_bets as f64 * 100.0)
    } else {
        0.0
    };
    stats.roi = if stats.total_staked > 0.0 {
        round2(stats.total_profit / stats.total_staked * 100.0)
    } else {
        0.0
    };
    stats.total_staked = round2(stats.total_staked);
    stats.total_returned = round2(stats.total_returned);
    stats.total_profit = round2(stats.total_profit);

    stats
}
