//! Rookie draft: turn order and pick execution

use crate::auth::Actor;
use crate::effects::Effect;
use crate::engine::TransactionEngine;
use crate::error::{Rejection, Result};
use crate::locks::Resource;
use crate::notify::LeagueEvent;
use crate::snapshot::LeagueSnapshot;
use crate::trade::TRADE_ASSET_GONE;
use roster_ledger::{
    DraftPick, Guard, PickId, PlayerId, Position, RosterProjection, Salary, SlotCategory,
    TradeStatus, TransactionKind,
};
use std::collections::HashSet;
use tracing::info;

/// Whether `pick` may be used now
///
/// Pick 1 opens when the draft starts. Every later pick opens once its
/// predecessor is filled, or when a timed draft's fallback window for it opens.
pub fn on_the_clock(
    snap: &LeagueSnapshot,
    board: &[DraftPick],
    pick: &DraftPick,
) -> std::result::Result<(), Rejection> {
    if !snap.clock.draft_started(snap.now) {
        return Err(Rejection::DraftNotStarted);
    }
    if pick.overall <= 1 {
        return Ok(());
    }

    let previous_filled = board
        .iter()
        .find(|p| p.year == pick.year && p.overall == pick.overall - 1)
        .map_or(true, DraftPick::is_filled);
    if previous_filled || snap.clock.draft_fallback_open(pick.overall, snap.now) {
        Ok(())
    } else {
        Err(Rejection::PickNotOnClock(pick.id))
    }
}

/// Roster with the rookie added; practice squad first, then bench
fn place_rookie(
    roster: &RosterProjection,
    player: PlayerId,
    position: Position,
    value: Salary,
) -> std::result::Result<(SlotCategory, RosterProjection), Rejection> {
    if roster.has_open_practice_squad_slot(position) {
        let next = roster.with_player_added(player, position, SlotCategory::PracticeSquad, value)?;
        if next.check_invariants().is_ok() {
            return Ok((SlotCategory::PracticeSquad, next));
        }
    }
    if !roster.has_open_bench_slot(position) {
        return Err(Rejection::NoSlotsAvailable);
    }
    let next = roster.with_player_added(player, position, SlotCategory::Bench, value)?;
    next.check_invariants()?;
    Ok((SlotCategory::Bench, next))
}

/// Every write a draft selection makes
pub fn plan_pick(
    snap: &LeagueSnapshot,
    board: &[DraftPick],
    pick: &DraftPick,
    player_id: PlayerId,
) -> std::result::Result<Vec<Effect>, Rejection> {
    if pick.is_filled() {
        return Err(Rejection::PickFilled(pick.id));
    }
    on_the_clock(snap, board, pick)?;

    let player = snap.player(player_id)?;
    if !player.is_rookie(pick.year) {
        return Err(Rejection::NotARookie);
    }
    if snap.projection.is_rostered(player_id) {
        return Err(Rejection::PlayerRostered);
    }

    let value = snap.config.rookie_salary(pick.round);
    let (slot, roster) = place_rookie(&snap.roster(pick.owner), player_id, player.position, value)?;

    let mut effects = vec![
        Effect::Guard(Guard::PickAvailable { pick: pick.id, owner: pick.owner }),
        Effect::Guard(snap.player_guard(player_id)),
        Effect::Guard(snap.team_guard(pick.owner)),
        Effect::Append(snap.ledger_entry(
            pick.owner,
            player_id,
            TransactionKind::Draft,
            value,
            Some(slot),
        )),
        Effect::FillPick { pick: pick.id, player: player_id },
    ];

    let picks: HashSet<PickId> = HashSet::from([pick.id]);
    let players: HashSet<PlayerId> = HashSet::from([player_id]);
    for trade in snap.trades_touching(&players, &picks) {
        effects.push(Effect::CloseTrade {
            trade: trade.id,
            status: TradeStatus::Cancelled,
            reason: Some(TRADE_ASSET_GONE.into()),
        });
    }
    for claim in snap.claims_touching(&players) {
        effects.push(Effect::CancelClaim { claim: claim.id, reason: "player drafted".into() });
    }
    effects.push(Effect::replace_roster(roster));

    Ok(effects)
}

impl TransactionEngine {
    /// Use `pick` on `player`
    pub async fn make_pick(
        &self,
        actor: &Actor,
        pick_id: PickId,
        player: PlayerId,
    ) -> Result<DraftPick> {
        let pick = self.store.draft_pick(pick_id).await?;
        actor.authorize_team(&self.load_team(pick.owner).await?)?;

        let _locks = self.locks.acquire([Resource::Pick(pick_id), Resource::Player(player)]).await;
        let pick = self.store.draft_pick(pick_id).await?;
        let snap = self.snapshot(pick.league, &[player]).await?;
        let board = self.store.draft_picks(pick.league, pick.year).await?;

        let effects = match plan_pick(&snap, &board, &pick, player) {
            Ok(effects) => effects,
            Err(rejection) => {
                info!(
                    league = pick.league,
                    pick = pick.id,
                    player,
                    code = rejection.code(),
                    "draft pick rejected: {rejection}"
                );
                return Err(rejection.into());
            }
        };
        self.commit(pick.league, effects).await?;
        self.metrics.picks_made.inc();
        info!(
            league = pick.league,
            pick = pick.id,
            overall = pick.overall,
            player,
            "player drafted"
        );

        self.broadcast(LeagueEvent::PlayerDrafted {
            league: pick.league,
            pick: pick.id,
            overall: pick.overall,
            team: pick.owner,
            player,
        });

        Ok(self.store.draft_pick(pick_id).await?)
    }
}
