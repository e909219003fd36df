//! Waiver, poach and transition claim resolution
//!
//! Pending claims are grouped by player. Each ready group is resolved under the
//! player's lock: candidates are re-validated in arbitration order, the first
//! valid one is committed, and every other claim in the group is marked as a
//! loser. Each claim is settled by its own guarded commit, so a failure never
//! rolls back a sibling and a second run finds nothing left to do.

use crate::effects::Effect;
use crate::engine::TransactionEngine;
use crate::error::{Rejection, Result};
use crate::locks::Resource;
use crate::notify::{LeagueEvent, Notification, NotificationKind};
use crate::snapshot::LeagueSnapshot;
use crate::trade::TRADE_ASSET_GONE;
use crate::validator::{validate_claim, ClaimRequest, ValidatedClaim, ValidationMode};
use chrono::{DateTime, Duration, Utc};
use roster_ledger::{
    ClaimFilter, ClaimId, ClaimKind, ClaimOutcome, Guard, LeagueId, PlayerId, SlotCategory,
    TradeStatus, TransactionKind, WaiverClaim,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

pub const OUTBID: &str = "outbid";
pub const LOWER_WAIVER_PRIORITY: &str = "lower waiver priority";
pub const SUBMITTED_LATER: &str = "submitted later";
pub const NO_LONGER_FREE_AGENT: &str = "player no longer a free agent";

const MAX_COMMIT_ATTEMPTS: usize = 3;

/// Summary of one resolver run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WaiverReport {
    pub league: LeagueId,
    pub kind: Option<ClaimKind>,
    pub won: Vec<ClaimId>,
    pub lost: Vec<ClaimId>,
    /// Players whose bidding window is still open
    pub deferred: Vec<PlayerId>,
    /// Claims left pending after repeated commit conflicts
    pub conflicted: Vec<ClaimId>,
}

impl WaiverReport {
    fn new(league: LeagueId, kind: ClaimKind) -> Self {
        Self { league, kind: Some(kind), ..Default::default() }
    }

    /// Whether any claim was settled
    pub fn settled_any(&self) -> bool {
        !self.won.is_empty() || !self.lost.is_empty()
    }
}

/// Sort candidates best first
pub fn arbitration_order(kind: ClaimKind, claims: &mut [WaiverClaim]) {
    claims.sort_by(|a, b| compare_claims(kind, a, b));
}

fn compare_claims(kind: ClaimKind, a: &WaiverClaim, b: &WaiverClaim) -> Ordering {
    let by_bid = if kind.is_bid_ordered() {
        b.bid_amount().cmp(&a.bid_amount())
    } else {
        Ordering::Equal
    };

    b.super_priority
        .cmp(&a.super_priority)
        .then(by_bid)
        .then(a.priority_order.cmp(&b.priority_order))
        .then(a.submitted_at.cmp(&b.submitted_at))
        .then(a.id.cmp(&b.id))
}

/// Why `loser` lost to `winner`
pub fn loser_reason(kind: ClaimKind, winner: &WaiverClaim, loser: &WaiverClaim) -> &'static str {
    if winner.super_priority && !loser.super_priority {
        return LOWER_WAIVER_PRIORITY;
    }
    if kind.is_bid_ordered() && loser.bid_amount() < winner.bid_amount() {
        return OUTBID;
    }
    if loser.priority_order > winner.priority_order {
        return LOWER_WAIVER_PRIORITY;
    }
    SUBMITTED_LATER
}

/// When the bidding window for a group of claims on one player closes
///
/// `None` means the group can be resolved immediately.
pub fn ready_at(
    snap: &LeagueSnapshot,
    kind: ClaimKind,
    claims: &[WaiverClaim],
) -> Option<DateTime<Utc>> {
    let first = claims.iter().min_by_key(|c| (c.submitted_at, c.id))?;
    let player = first.player;

    match kind {
        ClaimKind::Transition => snap.clock.rfa_period_end(),
        ClaimKind::Poach => {
            snap.last_transaction(player).map(|tx| snap.clock.poach_resolves_at(tx))
        }
        ClaimKind::FreeAgency | ClaimKind::FreeAgencyPractice => {
            if let Some(released) = snap.released_at(player) {
                if snap.clock.on_waivers(released, first.submitted_at) {
                    return Some(snap.clock.waivers_clear_at(released));
                }
            }
            if let Some(window) = snap.clock.current_waiver_period(first.submitted_at) {
                return Some(window.end);
            }
            // Off-season claims bid against each other for one waiver interval
            Some(first.submitted_at + Duration::hours(snap.config.calendar.waiver_hours))
        }
    }
}

enum Award {
    Won,
    Failed(String),
    /// The claim was settled elsewhere while we worked on it
    Gone,
    Conflicted,
}

impl TransactionEngine {
    /// Resolve every ready group of pending claims of `kind`
    ///
    /// With `force`, bidding windows are ignored.
    pub async fn run_waivers(
        &self,
        league: LeagueId,
        kind: ClaimKind,
        force: bool,
    ) -> Result<WaiverReport> {
        let pending = self.store.claims(league, &ClaimFilter::pending().kind(kind)).await?;
        let players: BTreeMap<PlayerId, usize> =
            pending.iter().fold(BTreeMap::new(), |mut acc, claim| {
                *acc.entry(claim.player).or_default() += 1;
                acc
            });

        let mut report = WaiverReport::new(league, kind);
        for (player, count) in players {
            debug!(league, player, claims = count, kind = %kind, "resolving claim group");
            let _locks = self.locks.acquire([Resource::Player(player)]).await;
            self.resolve_group(league, kind, player, force, &mut report).await?;
        }

        self.metrics.waiver_runs.inc();
        self.metrics.claims_won.add(report.won.len() as u64);
        self.metrics.claims_lost.add(report.lost.len() as u64);

        if report.settled_any() {
            info!(
                league,
                kind = %kind,
                won = report.won.len(),
                lost = report.lost.len(),
                deferred = report.deferred.len(),
                "waivers processed"
            );
            self.broadcast(LeagueEvent::WaiverProcessed {
                league,
                kind,
                won: report.won.clone(),
                lost: report.lost.clone(),
            });
        }

        Ok(report)
    }

    async fn resolve_group(
        &self,
        league: LeagueId,
        kind: ClaimKind,
        player: PlayerId,
        force: bool,
        report: &mut WaiverReport,
    ) -> Result<()> {
        let mut snap = self.snapshot(league, &[player]).await?;
        let mut candidates: Vec<WaiverClaim> = snap
            .pending_claims()
            .filter(|c| c.player == player && c.kind == kind)
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }

        if !force {
            if let Some(ready) = ready_at(&snap, kind, &candidates) {
                if snap.now < ready {
                    debug!(league, player, ready_at = %ready, "bidding window still open");
                    report.deferred.push(player);
                    return Ok(());
                }
            }
        }

        arbitration_order(kind, &mut candidates);
        let mut remaining = candidates.into_iter();
        let mut winner = None;

        for claim in remaining.by_ref() {
            match self.award(&mut snap, &claim).await? {
                Award::Won => {
                    info!(league, player, claim = claim.id, team = claim.team, "claim won");
                    report.won.push(claim.id);
                    winner = Some(claim);
                    break;
                }
                Award::Failed(reason) => {
                    if self.settle_failed(&claim, &reason).await? {
                        report.lost.push(claim.id);
                    }
                }
                Award::Gone => {}
                Award::Conflicted => {
                    report.conflicted.push(claim.id);
                    return Ok(());
                }
            }
        }

        if let Some(winner) = winner {
            for loser in remaining {
                let reason = loser_reason(kind, &winner, &loser);
                if self.settle_failed(&loser, reason).await? {
                    report.lost.push(loser.id);
                }
            }
        }

        Ok(())
    }

    /// Re-validate one candidate and commit it, reloading on guard conflicts
    async fn award(&self, snap: &mut LeagueSnapshot, claim: &WaiverClaim) -> Result<Award> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            if !snap.pending_claims().any(|c| c.id == claim.id) {
                return Ok(Award::Gone);
            }

            let request = ClaimRequest::from_claim(claim);
            let mode = ValidationMode::Resolution { submitted_at: claim.submitted_at };
            let effects = match validate_claim(snap, &request, mode)
                .and_then(|validated| plan_award(snap, claim, &validated))
            {
                Ok(effects) => effects,
                Err(Rejection::PlayerRostered) => {
                    return Ok(Award::Failed(NO_LONGER_FREE_AGENT.into()))
                }
                Err(rejection) => return Ok(Award::Failed(rejection.to_string())),
            };

            match self.commit(snap.league, effects).await {
                Ok(_) => return Ok(Award::Won),
                Err(err) if err.is_conflict() => {
                    warn!(claim = claim.id, attempt, "claim award conflicted; reloading");
                    *snap = self.snapshot(snap.league, &[claim.player]).await?;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Award::Conflicted)
    }

    /// Mark a claim failed; false if it was already settled
    async fn settle_failed(&self, claim: &WaiverClaim, reason: &str) -> Result<bool> {
        let effects = vec![
            Effect::Guard(Guard::ClaimPending(claim.id)),
            Effect::ResolveClaim {
                claim: claim.id,
                outcome: ClaimOutcome::Failure,
                reason: Some(reason.to_string()),
            },
        ];
        match self.commit(claim.league, effects).await {
            Ok(_) => {}
            Err(err) if err.is_conflict() => return Ok(false),
            Err(err) => return Err(err),
        }

        debug!(claim = claim.id, team = claim.team, reason, "claim failed");
        if claim.kind == ClaimKind::Poach {
            self.send(Notification {
                league: claim.league,
                team: Some(claim.team),
                kind: NotificationKind::PoachFailed,
                message: format!("Poach claim for player {} failed: {reason}", claim.player),
                sent_at: self.clock.now(),
            })
            .await;
        }
        Ok(true)
    }
}

/// Ledger entries and state changes for a winning claim
///
/// Releases are written first, then the previous holder's removal, then the add.
fn plan_award(
    snap: &LeagueSnapshot,
    claim: &WaiverClaim,
    validated: &ValidatedClaim,
) -> std::result::Result<Vec<Effect>, Rejection> {
    let team = validated.team;
    let player = validated.player;
    let mut effects = vec![
        Effect::Guard(Guard::ClaimPending(claim.id)),
        Effect::Guard(snap.player_guard(player)),
        Effect::Guard(snap.team_guard(team)),
    ];

    for &release in &validated.releases {
        let value = snap.holding(release).map(|h| h.value).unwrap_or_default();
        effects.push(Effect::Guard(snap.player_guard(release)));
        effects.push(Effect::Append(snap.ledger_entry(
            team,
            release,
            TransactionKind::RosterRelease,
            value,
            None,
        )));
    }

    if let Some(previous) = validated.previous_holder {
        let remaining = snap.roster(previous).with_player_removed(player)?;
        effects.push(Effect::Guard(snap.team_guard(previous)));
        effects.push(Effect::Append(snap.ledger_entry(
            previous,
            player,
            TransactionKind::Poached,
            validated.value,
            None,
        )));
        effects.push(Effect::replace_roster(remaining));
    }

    let kind = if validated.slot == SlotCategory::PracticeSquad {
        TransactionKind::PracticeAdd
    } else {
        TransactionKind::RosterAdd
    };
    effects.push(Effect::Append(snap.ledger_entry(
        team,
        player,
        kind,
        validated.value,
        Some(validated.slot),
    )));
    effects.push(Effect::ResolveClaim {
        claim: claim.id,
        outcome: ClaimOutcome::Success,
        reason: None,
    });
    effects.push(Effect::replace_roster(validated.roster_after.clone()));

    let mut moved: HashSet<PlayerId> = validated.releases.iter().copied().collect();
    moved.insert(player);
    for trade in snap.trades_touching(&moved, &HashSet::new()) {
        effects.push(Effect::CloseTrade {
            trade: trade.id,
            status: TradeStatus::Cancelled,
            reason: Some(TRADE_ASSET_GONE.into()),
        });
    }

    Ok(effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn claim(id: ClaimId, bid: i64, priority: u32, minute: u32) -> WaiverClaim {
        WaiverClaim {
            id,
            league: 1,
            team: id as i64,
            player: 99,
            kind: ClaimKind::FreeAgency,
            bid: Some(bid),
            priority_order: priority,
            releases: vec![],
            super_priority: false,
            year: 2025,
            week: 3,
            submitted_at: Utc.with_ymd_and_hms(2025, 9, 20, 12, minute, 0).unwrap(),
            processed_at: None,
            cancelled_at: None,
            outcome: None,
            reason: None,
        }
    }

    #[test]
    fn test_bid_then_priority_then_time() {
        let mut claims = vec![claim(1, 50, 2, 0), claim(2, 50, 1, 5), claim(3, 30, 1, 0)];
        arbitration_order(ClaimKind::FreeAgency, &mut claims);
        let order: Vec<ClaimId> = claims.iter().map(|c| c.id).collect();
        assert_eq!(order, vec![2, 1, 3]);

        assert_eq!(loser_reason(ClaimKind::FreeAgency, &claims[0], &claims[1]), LOWER_WAIVER_PRIORITY);
        assert_eq!(loser_reason(ClaimKind::FreeAgency, &claims[0], &claims[2]), OUTBID);
    }

    #[test]
    fn test_practice_claims_ignore_bids() {
        let mut claims = vec![claim(1, 90, 3, 0), claim(2, 0, 1, 10)];
        arbitration_order(ClaimKind::FreeAgencyPractice, &mut claims);
        assert_eq!(claims[0].id, 2);
        assert_eq!(
            loser_reason(ClaimKind::FreeAgencyPractice, &claims[0], &claims[1]),
            LOWER_WAIVER_PRIORITY
        );
    }

    #[test]
    fn test_super_priority_wins_first() {
        let mut claims = vec![claim(1, 90, 1, 0), claim(2, 10, 4, 30)];
        claims[1].super_priority = true;
        arbitration_order(ClaimKind::FreeAgency, &mut claims);
        assert_eq!(claims[0].id, 2);
        assert_eq!(loser_reason(ClaimKind::FreeAgency, &claims[0], &claims[1]), LOWER_WAIVER_PRIORITY);
    }

    #[test]
    fn test_ties_fall_to_submission_time() {
        let mut claims = vec![claim(1, 20, 1, 30), claim(2, 20, 1, 10)];
        arbitration_order(ClaimKind::FreeAgency, &mut claims);
        assert_eq!(claims[0].id, 2);
        assert_eq!(loser_reason(ClaimKind::FreeAgency, &claims[0], &claims[1]), SUBMITTED_LATER);
    }

    proptest! {
        #[test]
        fn prop_winner_dominates_every_loser(
            entries in prop::collection::vec((0i64..100, 1u32..6, 0u32..59, any::<bool>()), 1..12)
        ) {
            let mut claims: Vec<WaiverClaim> = entries
                .iter()
                .enumerate()
                .map(|(i, (bid, priority, minute, sp))| {
                    let mut c = claim(i as u64 + 1, *bid, *priority, *minute);
                    c.super_priority = *sp;
                    c
                })
                .collect();
            arbitration_order(ClaimKind::FreeAgency, &mut claims);

            let winner = &claims[0];
            for loser in &claims[1..] {
                prop_assert!(winner.super_priority >= loser.super_priority);
                if winner.super_priority == loser.super_priority {
                    prop_assert!(winner.bid_amount() >= loser.bid_amount());
                    if winner.bid_amount() == loser.bid_amount() {
                        prop_assert!(winner.priority_order <= loser.priority_order);
                    }
                }
                let reason = loser_reason(ClaimKind::FreeAgency, winner, loser);
                prop_assert!([OUTBID, LOWER_WAIVER_PRIORITY, SUBMITTED_LATER].contains(&reason));
            }
        }
    }
}
