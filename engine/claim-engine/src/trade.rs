//! Trade proposals and the offered → accepted | rejected | cancelled | vetoed lifecycle

use crate::auth::Actor;
use crate::effects::Effect;
use crate::engine::TransactionEngine;
use crate::error::{Rejection, Result};
use crate::locks::Resource;
use crate::notify::{LeagueEvent, Notification, NotificationKind};
use crate::snapshot::LeagueSnapshot;
use crate::validator::validate_releases;
use roster_ledger::{
    DraftPick, Guard, PickId, PlayerId, RosterProjection, SlotCategory, StoreError, TeamId,
    TradeId, TradeProposal, TradeStatus, TransactionKind,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

pub const TRADE_ASSET_GONE: &str = "trade asset no longer available";
pub const PLAYER_TRADED: &str = "player traded";

/// Assets offered by the proposing team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    pub proposing_team: TeamId,
    pub accepting_team: TeamId,
    #[serde(default)]
    pub proposed_players: Vec<PlayerId>,
    #[serde(default)]
    pub accepted_players: Vec<PlayerId>,
    #[serde(default)]
    pub proposed_picks: Vec<PickId>,
    #[serde(default)]
    pub accepted_picks: Vec<PickId>,
    /// Players the proposing team drops to make room
    #[serde(default)]
    pub releases: Vec<PlayerId>,
}

/// Structural checks that do not depend on league state
fn check_shape(trade: &TradeProposal) -> std::result::Result<(), Rejection> {
    if trade.proposing_team == trade.accepting_team {
        return Err(Rejection::InvalidTrade("a team cannot trade with itself".into()));
    }
    if trade.traded_players().next().is_none() && trade.traded_picks().next().is_none() {
        return Err(Rejection::InvalidTrade("trade has no assets".into()));
    }

    let mut players = HashSet::new();
    let mut listed = trade.traded_players().chain(trade.releases.iter().copied());
    if let Some(p) = listed.find(|p| !players.insert(*p)) {
        return Err(Rejection::InvalidTrade(format!("player {p} is listed twice")));
    }
    let mut picks = HashSet::new();
    if let Some(p) = trade.traded_picks().find(|p| !picks.insert(*p)) {
        return Err(Rejection::InvalidTrade(format!("pick {p} is listed twice")));
    }
    Ok(())
}

/// Slot a traded player lands in on the receiving roster
fn landing_slot(from: SlotCategory) -> SlotCategory {
    if from.is_practice_squad() {
        SlotCategory::PracticeSquad
    } else {
        SlotCategory::Bench
    }
}

/// A checked trade: both rosters after the exchange
#[derive(Debug, Clone)]
pub struct TradePlan {
    pub proposing_roster: RosterProjection,
    pub accepting_roster: RosterProjection,
}

/// Validate ownership, timing and both resulting rosters
pub fn check_trade(
    snap: &LeagueSnapshot,
    trade: &TradeProposal,
    picks: &HashMap<PickId, DraftPick>,
) -> std::result::Result<TradePlan, Rejection> {
    check_shape(trade)?;

    if snap.clock.trading_closed(snap.now) {
        return Err(Rejection::TradeDeadlinePassed);
    }

    let sides = [
        (trade.proposing_team, &trade.proposed_players, &trade.proposed_picks),
        (trade.accepting_team, &trade.accepted_players, &trade.accepted_picks),
    ];
    for (team, players, team_picks) in sides {
        if !snap.teams.contains_key(&team) {
            let msg = format!("team {team} is not in league {}", snap.league);
            return Err(Rejection::InvalidTrade(msg));
        }
        for &player in players {
            if snap.projection.holder(player) != Some(team) {
                return Err(Rejection::AssetNotOwned(format!("player {player}")));
            }
        }
        for pick_id in team_picks {
            let pick = picks
                .get(pick_id)
                .filter(|p| p.league == snap.league && p.owner == team)
                .ok_or_else(|| Rejection::AssetNotOwned(format!("pick {pick_id}")))?;
            if pick.is_filled() {
                return Err(Rejection::PickFilled(pick.id));
            }
        }
    }

    if snap.clock.in_rfa_period(snap.now) {
        if let Some(player) = trade.traded_players().find(|p| snap.has_pending_transition(*p)) {
            return Err(Rejection::PendingTransition(player));
        }
    }

    if let Some(player) = trade.traded_players().find(|p| snap.is_locked(*p)) {
        return Err(Rejection::PlayerLocked(player));
    }

    let traded: Vec<PlayerId> = trade.traded_players().collect();
    validate_releases(snap, trade.proposing_team, &trade.releases, &traded)?;

    let proposing_roster = exchange(
        snap,
        snap.roster(trade.proposing_team),
        trade.proposed_players.iter().chain(trade.releases.iter()),
        &trade.accepted_players,
    )?;
    let accepting_roster = exchange(
        snap,
        snap.roster(trade.accepting_team),
        trade.accepted_players.iter(),
        &trade.proposed_players,
    )?;

    Ok(TradePlan { proposing_roster, accepting_roster })
}

/// `roster` minus `outgoing` plus `incoming`, at last-known salary
fn exchange<'a>(
    snap: &LeagueSnapshot,
    roster: RosterProjection,
    outgoing: impl Iterator<Item = &'a PlayerId>,
    incoming: &[PlayerId],
) -> std::result::Result<RosterProjection, Rejection> {
    let mut next = roster;
    for player in outgoing {
        next = next.with_player_removed(*player)?;
    }
    for &player in incoming {
        let position = snap.player(player)?.position;
        let holding = snap
            .holding(player)
            .ok_or_else(|| Rejection::AssetNotOwned(format!("player {player}")))?;
        next =
            next.with_player_added(player, position, landing_slot(holding.slot), holding.value)?;
    }
    next.check_invariants()?;
    Ok(next)
}

/// Every write an accepted trade makes, as one batch
pub fn plan_accept(
    snap: &LeagueSnapshot,
    trade: &TradeProposal,
    picks: &HashMap<PickId, DraftPick>,
) -> std::result::Result<Vec<Effect>, Rejection> {
    if !trade.is_offered() {
        return Err(Rejection::TradeNotOffered);
    }
    let plan = check_trade(snap, trade, picks)?;

    let mut effects = vec![
        Effect::Guard(Guard::TradeOffered(trade.id)),
        Effect::Guard(snap.team_guard(trade.proposing_team)),
        Effect::Guard(snap.team_guard(trade.accepting_team)),
    ];

    let moved: HashSet<PlayerId> = moving_players(trade).collect();
    let mut moved_sorted: Vec<PlayerId> = moved.iter().copied().collect();
    moved_sorted.sort_unstable();
    for &player in &moved_sorted {
        effects.push(Effect::Guard(snap.player_guard(player)));
    }
    for pick in trade.traded_picks() {
        if let Some(pick) = picks.get(&pick) {
            effects.push(Effect::Guard(Guard::PickAvailable { pick: pick.id, owner: pick.owner }));
        }
    }

    for claim in snap.claims_touching(&moved) {
        effects.push(Effect::CancelClaim { claim: claim.id, reason: PLAYER_TRADED.into() });
    }
    let traded_picks: HashSet<PickId> = trade.traded_picks().collect();
    for other in snap.trades_touching(&moved, &traded_picks) {
        if other.id != trade.id {
            effects.push(Effect::CloseTrade {
                trade: other.id,
                status: TradeStatus::Cancelled,
                reason: Some(TRADE_ASSET_GONE.into()),
            });
        }
    }

    let legs = [
        (&trade.proposed_players, trade.accepting_team),
        (&trade.accepted_players, trade.proposing_team),
    ];
    for (players, to) in legs {
        for &player in players {
            let holding = snap
                .holding(player)
                .ok_or_else(|| Rejection::AssetNotOwned(format!("player {player}")))?;
            let slot = Some(landing_slot(holding.slot));
            let tx = snap.ledger_entry(to, player, TransactionKind::Trade, holding.value, slot);
            effects.push(Effect::Append(tx));
        }
    }
    for &release in &trade.releases {
        let value = snap.holding(release).map(|h| h.value).unwrap_or_default();
        effects.push(Effect::Append(snap.ledger_entry(
            trade.proposing_team,
            release,
            TransactionKind::RosterRelease,
            value,
            None,
        )));
    }

    for &pick in &trade.proposed_picks {
        effects.push(Effect::TransferPick { pick, to: trade.accepting_team });
    }
    for &pick in &trade.accepted_picks {
        effects.push(Effect::TransferPick { pick, to: trade.proposing_team });
    }

    effects.push(Effect::replace_roster(plan.proposing_roster));
    effects.push(Effect::replace_roster(plan.accepting_roster));
    effects.push(Effect::CloseTrade {
        trade: trade.id,
        status: TradeStatus::Accepted,
        reason: None,
    });

    Ok(effects)
}

/// Human summary of the exchange for league notifications
fn describe(snap: &LeagueSnapshot, trade: &TradeProposal) -> String {
    let team =
        |id: TeamId| snap.teams.get(&id).map_or_else(|| format!("team {id}"), |t| t.name.clone());
    let assets = |players: &[PlayerId], picks: &[PickId]| {
        let mut names: Vec<String> = players
            .iter()
            .map(|p| snap.players.get(p).map_or_else(|| format!("player {p}"), |p| p.name.clone()))
            .collect();
        names.extend(picks.iter().map(|p| format!("pick {p}")));
        if names.is_empty() {
            "nothing".to_string()
        } else {
            names.join(", ")
        }
    };

    format!(
        "{} trades {} to {} for {}",
        team(trade.proposing_team),
        assets(&trade.proposed_players, &trade.proposed_picks),
        team(trade.accepting_team),
        assets(&trade.accepted_players, &trade.accepted_picks),
    )
}

/// Traded players plus the proposing team's releases
fn moving_players(trade: &TradeProposal) -> impl Iterator<Item = PlayerId> + '_ {
    trade.traded_players().chain(trade.releases.iter().copied())
}

fn trade_resources(trade: &TradeProposal) -> Vec<Resource> {
    let mut resources = vec![Resource::Trade(trade.id)];
    resources.extend(moving_players(trade).map(Resource::Player));
    resources.extend(trade.traded_picks().map(Resource::Pick));
    resources
}

impl TransactionEngine {
    /// Validate and record a trade offer, then notify the accepting team
    pub async fn propose_trade(&self, actor: &Actor, offer: TradeOffer) -> Result<TradeProposal> {
        let proposing = self.load_team(offer.proposing_team).await?;
        actor.authorize_team(&proposing)?;
        let accepting = self.load_team(offer.accepting_team).await?;
        if accepting.league != proposing.league {
            return Err(Rejection::InvalidTrade("teams are in different leagues".into()).into());
        }

        let mut trade = TradeProposal {
            id: 0,
            league: proposing.league,
            proposing_team: proposing.id,
            accepting_team: accepting.id,
            proposed_players: offer.proposed_players,
            accepted_players: offer.accepted_players,
            proposed_picks: offer.proposed_picks,
            accepted_picks: offer.accepted_picks,
            releases: offer.releases,
            year: 0,
            week: 0,
            offered_at: self.clock.now(),
            accepted_at: None,
            rejected_at: None,
            cancelled_at: None,
            vetoed_at: None,
            reason: None,
        };

        let _locks = self.locks.acquire(trade_resources(&trade)).await;
        let players: Vec<PlayerId> = moving_players(&trade).collect();
        let snap = self.snapshot(trade.league, &players).await?;
        let picks = self.load_picks(&trade).await?;

        if let Err(rejection) = check_trade(&snap, &trade, &picks) {
            info!(
                league = trade.league,
                team = proposing.id,
                code = rejection.code(),
                "trade rejected: {rejection}"
            );
            return Err(rejection.into());
        }

        trade.year = snap.period.year;
        trade.week = snap.period.week;
        trade.offered_at = snap.now;
        trade.id = self.store.insert_trade(trade.clone()).await?;
        self.metrics.trades_proposed.inc();
        info!(
            league = trade.league,
            trade = trade.id,
            from = trade.proposing_team,
            to = trade.accepting_team,
            "trade proposed"
        );

        self.send(Notification {
            league: trade.league,
            team: Some(trade.accepting_team),
            kind: NotificationKind::TradeProposed,
            message: format!("Trade offer: {}", describe(&snap, &trade)),
            sent_at: snap.now,
        })
        .await;

        Ok(trade)
    }

    /// Execute an offered trade atomically
    pub async fn accept_trade(&self, actor: &Actor, trade_id: TradeId) -> Result<TradeProposal> {
        let trade = self.store.trade(trade_id).await?;
        let accepting = self.load_team(trade.accepting_team).await?;
        actor.authorize_team(&accepting)?;

        let _locks = self.locks.acquire(trade_resources(&trade)).await;
        let trade = self.store.trade(trade_id).await?;
        let players: Vec<PlayerId> = moving_players(&trade).collect();
        let snap = self.snapshot(trade.league, &players).await?;
        let picks = self.load_picks(&trade).await?;

        let effects = match plan_accept(&snap, &trade, &picks) {
            Ok(effects) => effects,
            Err(rejection) => {
                info!(
                    league = trade.league,
                    trade = trade.id,
                    code = rejection.code(),
                    "trade accept rejected: {rejection}"
                );
                return Err(rejection.into());
            }
        };
        let cascaded = effects
            .iter()
            .filter(|e| matches!(e, Effect::CloseTrade { status: TradeStatus::Cancelled, .. }))
            .count();
        self.commit(trade.league, effects).await?;

        self.metrics.trades_accepted.inc();
        self.metrics.trades_closed.add(cascaded as u64);
        info!(league = trade.league, trade = trade.id, cascaded, "trade accepted");

        self.send(Notification {
            league: trade.league,
            team: None,
            kind: NotificationKind::TradeAccepted,
            message: format!("Trade accepted: {}", describe(&snap, &trade)),
            sent_at: snap.now,
        })
        .await;
        self.broadcast(LeagueEvent::TradeAccepted {
            league: trade.league,
            trade: trade.id,
            proposing_team: trade.proposing_team,
            accepting_team: trade.accepting_team,
        });

        Ok(self.store.trade(trade_id).await?)
    }

    /// Accepting team declines the offer
    pub async fn reject_trade(&self, actor: &Actor, trade_id: TradeId) -> Result<TradeProposal> {
        let trade = self.store.trade(trade_id).await?;
        actor.authorize_team(&self.load_team(trade.accepting_team).await?)?;
        self.close_trade(trade, TradeStatus::Rejected, None).await
    }

    /// Proposing team withdraws the offer
    pub async fn cancel_trade(&self, actor: &Actor, trade_id: TradeId) -> Result<TradeProposal> {
        let trade = self.store.trade(trade_id).await?;
        actor.authorize_team(&self.load_team(trade.proposing_team).await?)?;
        self.close_trade(trade, TradeStatus::Cancelled, None).await
    }

    /// Commissioner blocks the offer
    pub async fn veto_trade(
        &self,
        actor: &Actor,
        trade_id: TradeId,
        reason: Option<String>,
    ) -> Result<TradeProposal> {
        let trade = self.store.trade(trade_id).await?;
        actor.authorize_commissioner(trade.league)?;
        self.close_trade(trade, TradeStatus::Vetoed, reason).await
    }

    async fn close_trade(
        &self,
        trade: TradeProposal,
        status: TradeStatus,
        reason: Option<String>,
    ) -> Result<TradeProposal> {
        let _locks = self.locks.acquire([Resource::Trade(trade.id)]).await;
        let trade = self.store.trade(trade.id).await?;
        if !trade.is_offered() {
            return Err(Rejection::TradeNotOffered.into());
        }

        let effects = vec![
            Effect::Guard(Guard::TradeOffered(trade.id)),
            Effect::CloseTrade { trade: trade.id, status, reason: reason.clone() },
        ];
        match self.commit(trade.league, effects).await {
            Ok(_) => {}
            Err(err) if err.is_conflict() => return Err(Rejection::TradeNotOffered.into()),
            Err(err) => return Err(err),
        }
        self.metrics.trades_closed.inc();
        info!(league = trade.league, trade = trade.id, status = ?status, "trade closed");

        let (kind, team, verb) = match status {
            TradeStatus::Rejected => {
                (NotificationKind::TradeRejected, Some(trade.proposing_team), "rejected")
            }
            TradeStatus::Cancelled => {
                (NotificationKind::TradeCancelled, Some(trade.accepting_team), "withdrawn")
            }
            _ => (NotificationKind::TradeVetoed, None, "vetoed"),
        };
        let message = match reason {
            Some(reason) => format!("Trade {} was {verb}: {reason}", trade.id),
            None => format!("Trade {} was {verb}", trade.id),
        };
        let sent_at = self.clock.now();
        self.send(Notification { league: trade.league, team, kind, message, sent_at }).await;

        Ok(self.store.trade(trade.id).await?)
    }

    async fn load_picks(&self, trade: &TradeProposal) -> Result<HashMap<PickId, DraftPick>> {
        let mut picks = HashMap::new();
        for id in trade.traded_picks() {
            match self.store.draft_pick(id).await {
                Ok(pick) => {
                    picks.insert(id, pick);
                }
                Err(StoreError::NotFound(_)) => {
                    return Err(Rejection::InvalidTrade(format!("pick {id} does not exist")).into())
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(picks)
    }
}
