//! Planned writes and their translation into one guarded store batch

use chrono::{DateTime, Utc};
use roster_ledger::{
    AssignmentReplacement, ClaimId, ClaimOutcome, ClaimResolution, ClaimUpdate, CommitBatch,
    Guard, LeagueId, Period, PickId, PickUpdate, PlayerId, RosterProjection, TeamId, TradeId,
    TradeStatus, TradeUpdate, Transaction,
};

/// One planned write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Guard(Guard),
    Append(Transaction),
    ResolveClaim { claim: ClaimId, outcome: ClaimOutcome, reason: Option<String> },
    CancelClaim { claim: ClaimId, reason: String },
    CloseTrade { trade: TradeId, status: TradeStatus, reason: Option<String> },
    TransferPick { pick: PickId, to: TeamId },
    FillPick { pick: PickId, player: PlayerId },
    ReplaceRoster { team: TeamId, period: Period, projection: Box<RosterProjection> },
}

impl Effect {
    pub fn replace_roster(projection: RosterProjection) -> Self {
        Effect::ReplaceRoster {
            team: projection.team(),
            period: projection.period(),
            projection: Box::new(projection),
        }
    }
}

/// Fold effects into a single batch; terminal writes are stamped with `at`
pub fn into_batch(league: LeagueId, at: DateTime<Utc>, effects: Vec<Effect>) -> CommitBatch {
    let mut batch = CommitBatch::new(league);

    for effect in effects {
        match effect {
            Effect::Guard(guard) => {
                if !batch.guards.contains(&guard) {
                    batch.guards.push(guard);
                }
            }
            Effect::Append(tx) => batch.transactions.push(tx),
            Effect::ResolveClaim { claim, outcome, reason } => {
                let resolution = ClaimResolution::Processed { outcome, reason };
                batch.claim_updates.push(ClaimUpdate { claim, resolution, at });
            }
            Effect::CancelClaim { claim, reason } => {
                let resolution = ClaimResolution::Cancelled { reason };
                batch.claim_updates.push(ClaimUpdate { claim, resolution, at });
            }
            Effect::CloseTrade { trade, status, reason } => {
                batch.trade_updates.push(TradeUpdate { trade, status, reason, at })
            }
            Effect::TransferPick { pick, to } => {
                batch.pick_updates.push(PickUpdate::Transfer { pick, to })
            }
            Effect::FillPick { pick, player } => {
                batch.pick_updates.push(PickUpdate::Fill { pick, player, at })
            }
            Effect::ReplaceRoster { team, period, projection } => {
                // A later replacement for the same roster wins
                batch.assignments.retain(|a| !(a.team == team && a.period == period));
                batch.assignments.push(AssignmentReplacement {
                    team,
                    period,
                    rows: projection.to_assignments(league),
                });
            }
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_ledger::{LeagueConfig, Salary, SlotCategory, TransactionKind};

    #[test]
    fn test_effects_fold_into_one_batch() {
        let at = Utc::now();
        let period = Period::new(2025, 3);
        let config = LeagueConfig::default();
        let add = Transaction::new(
            1,
            2,
            10,
            TransactionKind::RosterAdd,
            Salary::from_dollars(1),
            Some(SlotCategory::Bench),
            period,
            at,
        );
        let roster = RosterProjection::from_ledger(&config, &[], 2, 2025, 3);

        let effects = vec![
            Effect::Guard(Guard::ClaimPending(4)),
            Effect::Guard(Guard::ClaimPending(4)),
            Effect::Append(add),
            Effect::ResolveClaim { claim: 4, outcome: ClaimOutcome::Success, reason: None },
            Effect::CancelClaim { claim: 5, reason: "player traded".into() },
            Effect::CloseTrade { trade: 9, status: TradeStatus::Cancelled, reason: None },
            Effect::TransferPick { pick: 7, to: 2 },
            Effect::replace_roster(roster.clone()),
            Effect::replace_roster(roster),
        ];

        let batch = into_batch(1, at, effects);
        assert_eq!(batch.guards, vec![Guard::ClaimPending(4)]);
        assert_eq!(batch.transactions.len(), 1);
        assert_eq!(batch.claim_updates.len(), 2);
        assert_eq!(batch.trade_updates[0].at, at);
        assert_eq!(batch.pick_updates, vec![PickUpdate::Transfer { pick: 7, to: 2 }]);
        assert_eq!(batch.assignments.len(), 1);
    }
}
