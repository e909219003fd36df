//! Direct roster changes: releases, slot moves and free-agent signings

use crate::auth::Actor;
use crate::effects::Effect;
use crate::engine::TransactionEngine;
use crate::error::{Rejection, Result};
use crate::locks::Resource;
use crate::snapshot::LeagueSnapshot;
use crate::trade::TRADE_ASSET_GONE;
use crate::validator::{roster_with, validate_releases};
use roster_ledger::{
    ClaimKind, PlayerId, SlotCategory, StoreError, TeamId, TradeStatus, TransactionId,
    TransactionKind,
};
use std::collections::HashSet;
use tracing::info;

/// Ledger entry kind for a slot change
pub fn move_kind(from: SlotCategory, to: SlotCategory) -> TransactionKind {
    match (from, to) {
        (SlotCategory::PracticeSquad, SlotCategory::ProtectedPracticeSquad) => {
            TransactionKind::PracticeProtect
        }
        (from, to) if from.is_practice_squad() && to.is_active_roster() => {
            TransactionKind::RosterActivate
        }
        (from, to) if from.is_active_roster() && to.is_practice_squad() => {
            TransactionKind::RosterDeactivate
        }
        _ => TransactionKind::RosterMove,
    }
}

/// Cancel claims and offered trades that reference players leaving a roster
fn cascade(snap: &LeagueSnapshot, players: &HashSet<PlayerId>, reason: &str) -> Vec<Effect> {
    let mut effects: Vec<Effect> = snap
        .claims_touching(players)
        .into_iter()
        .map(|claim| Effect::CancelClaim { claim: claim.id, reason: reason.to_string() })
        .collect();
    effects.extend(snap.trades_touching(players, &HashSet::new()).into_iter().map(|trade| {
        Effect::CloseTrade {
            trade: trade.id,
            status: TradeStatus::Cancelled,
            reason: Some(TRADE_ASSET_GONE.into()),
        }
    }));
    effects
}

pub fn plan_release(
    snap: &LeagueSnapshot,
    team: TeamId,
    player: PlayerId,
) -> std::result::Result<Vec<Effect>, Rejection> {
    let holding = snap
        .holding(player)
        .filter(|h| h.team == team)
        .ok_or_else(|| Rejection::InvalidMove(format!("player {player} is not on your roster")))?;
    if snap.is_locked(player) {
        return Err(Rejection::PlayerLocked(player));
    }
    let roster = snap.roster(team).with_player_removed(player)?;

    let mut effects = vec![
        Effect::Guard(snap.player_guard(player)),
        Effect::Guard(snap.team_guard(team)),
        Effect::Append(snap.ledger_entry(
            team,
            player,
            TransactionKind::RosterRelease,
            holding.value,
            None,
        )),
    ];
    effects.extend(cascade(snap, &HashSet::from([player]), "player released"));
    effects.push(Effect::replace_roster(roster));
    Ok(effects)
}

pub fn plan_move(
    snap: &LeagueSnapshot,
    team: TeamId,
    player: PlayerId,
    to: SlotCategory,
) -> std::result::Result<Vec<Effect>, Rejection> {
    let holding = snap
        .holding(player)
        .filter(|h| h.team == team)
        .ok_or_else(|| Rejection::InvalidMove(format!("player {player} is not on your roster")))?;
    if holding.slot == to {
        return Err(Rejection::InvalidMove(format!("player {player} is already in {to}")));
    }
    if snap.is_locked(player) {
        return Err(Rejection::PlayerLocked(player));
    }

    // Open poach claims pin the player to the unprotected practice squad
    if holding.slot == SlotCategory::PracticeSquad
        && snap.pending_claims().any(|c| c.player == player && c.kind == ClaimKind::Poach)
    {
        return Err(Rejection::PendingClaims);
    }

    let position = snap.player(player)?.position;
    let roster = snap.roster(team).with_player_moved(player, position, to)?;
    roster.check_invariants()?;

    let kind = move_kind(holding.slot, to);
    Ok(vec![
        Effect::Guard(snap.player_guard(player)),
        Effect::Guard(snap.team_guard(team)),
        Effect::Append(snap.ledger_entry(team, player, kind, holding.value, Some(to))),
        Effect::replace_roster(roster),
    ])
}

/// Immediate ROSTER_ADD of an unclaimed free agent outside the waiver period
pub fn plan_signing(
    snap: &LeagueSnapshot,
    team: TeamId,
    player_id: PlayerId,
    releases: &[PlayerId],
) -> std::result::Result<Vec<Effect>, Rejection> {
    if snap.clock.season_locked(snap.now) {
        return Err(Rejection::SeasonLocked);
    }
    if snap.clock.in_waiver_period(snap.now) {
        return Err(Rejection::WaiverPeriod);
    }

    let player = snap.player(player_id)?;
    if snap.projection.is_rostered(player_id) {
        return Err(Rejection::PlayerRostered);
    }
    if snap.on_waivers(player_id, snap.now) {
        return Err(Rejection::PlayerOnWaivers);
    }
    if snap.pending_claims().any(|c| c.player == player_id) {
        return Err(Rejection::PendingClaims);
    }
    if snap.period.is_offseason() && !snap.clock.free_agency_open(snap.now) {
        return Err(Rejection::FreeAgencyClosed);
    }

    validate_releases(snap, team, releases, &[player_id])?;
    let value = snap.config.min_salary;
    let roster = roster_with(
        snap.roster(team),
        releases,
        player_id,
        player.position,
        SlotCategory::Bench,
        value,
    )?;

    let mut effects = vec![
        Effect::Guard(snap.player_guard(player_id)),
        Effect::Guard(snap.team_guard(team)),
    ];
    for &release in releases {
        let released_value = snap.holding(release).map(|h| h.value).unwrap_or_default();
        effects.push(Effect::Guard(snap.player_guard(release)));
        effects.push(Effect::Append(snap.ledger_entry(
            team,
            release,
            TransactionKind::RosterRelease,
            released_value,
            None,
        )));
    }
    effects.push(Effect::Append(snap.ledger_entry(
        team,
        player_id,
        TransactionKind::RosterAdd,
        value,
        Some(SlotCategory::Bench),
    )));
    let released: HashSet<PlayerId> = releases.iter().copied().collect();
    effects.extend(cascade(snap, &released, "player released"));
    effects.push(Effect::replace_roster(roster));

    Ok(effects)
}

impl TransactionEngine {
    /// Drop a player; the release starts the player's waiver window
    pub async fn release_player(
        &self,
        actor: &Actor,
        team: TeamId,
        player: PlayerId,
    ) -> Result<TransactionId> {
        let team = self.load_team(team).await?;
        actor.authorize_team(&team)?;

        let _locks = self.locks.acquire([Resource::Player(player)]).await;
        let snap = self.snapshot(team.league, &[player]).await?;
        let effects = plan_release(&snap, team.id, player)?;
        let ids = self.commit(team.league, effects).await?;

        self.metrics.roster_moves.inc();
        info!(league = team.league, team = team.id, player, "player released");
        first_id(ids)
    }

    /// Move a rostered player to another slot category
    pub async fn move_player(
        &self,
        actor: &Actor,
        team: TeamId,
        player: PlayerId,
        to: SlotCategory,
    ) -> Result<TransactionId> {
        let team = self.load_team(team).await?;
        actor.authorize_team(&team)?;

        let _locks = self.locks.acquire([Resource::Player(player)]).await;
        let snap = self.snapshot(team.league, &[player]).await?;
        let effects = plan_move(&snap, team.id, player, to)?;
        let ids = self.commit(team.league, effects).await?;

        self.metrics.roster_moves.inc();
        info!(league = team.league, team = team.id, player, to = %to, "player moved");
        first_id(ids)
    }

    /// Sign an unclaimed free agent straight to the bench
    pub async fn sign_free_agent(
        &self,
        actor: &Actor,
        team: TeamId,
        player: PlayerId,
        releases: Vec<PlayerId>,
    ) -> Result<TransactionId> {
        let team = self.load_team(team).await?;
        actor.authorize_team(&team)?;

        let resources = releases.iter().chain([&player]).map(|p| Resource::Player(*p));
        let _locks = self.locks.acquire(resources).await;
        let mut players = releases.clone();
        players.push(player);
        let snap = self.snapshot(team.league, &players).await?;

        let effects = match plan_signing(&snap, team.id, player, &releases) {
            Ok(effects) => effects,
            Err(rejection) => {
                info!(
                    league = team.league,
                    team = team.id,
                    player,
                    code = rejection.code(),
                    "signing rejected: {rejection}"
                );
                return Err(rejection.into());
            }
        };
        let ids = self.commit(team.league, effects).await?;

        self.metrics.roster_moves.inc();
        info!(league = team.league, team = team.id, player, "free agent signed");
        ids.last().copied().ok_or_else(|| missing_entry().into())
    }
}

fn first_id(ids: Vec<TransactionId>) -> Result<TransactionId> {
    ids.first().copied().ok_or_else(|| missing_entry().into())
}

fn missing_entry() -> StoreError {
    StoreError::invalid_operation("commit wrote no ledger entry")
}
