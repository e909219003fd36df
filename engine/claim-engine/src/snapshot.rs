//! Read model for one league at one instant
//!
//! A snapshot is loaded from the store before every decision. Validation and
//! effect planning are pure functions over it; staleness between load and
//! commit is caught by the commit guards.

use crate::error::{Rejection, Result};
use chrono::{DateTime, Utc};
use eligibility_clock::EligibilityClock;
use roster_ledger::{
    project_league, ClaimFilter, ClaimKind, ClaimOutcome, DraftPick, Guard, Holding, LeagueConfig,
    LeagueId, LeagueProjection, LeagueStore, Period, PickId, Player, PlayerId, RosterProjection,
    RosterRules, Salary, SlotCategory, Team, TeamId, TradeProposal, Transaction, TransactionKind,
    WaiverClaim,
};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct LeagueSnapshot {
    pub league: LeagueId,
    pub config: LeagueConfig,
    pub clock: EligibilityClock,
    pub now: DateTime<Utc>,
    pub period: Period,
    pub projection: LeagueProjection,
    pub teams: HashMap<TeamId, Team>,
    pub players: HashMap<PlayerId, Player>,
    /// Every claim of the league this season, pending and processed
    pub claims: Vec<WaiverClaim>,
    pub offered_trades: Vec<TradeProposal>,
    pub picks: Vec<DraftPick>,
    /// Kickoff per NFL team for the current week
    pub kickoffs: HashMap<String, DateTime<Utc>>,
}

impl LeagueSnapshot {
    /// Load the league as of `now`, including `extra_players` not yet on the ledger
    pub async fn load(
        store: &dyn LeagueStore,
        league: LeagueId,
        now: DateTime<Utc>,
        extra_players: &[PlayerId],
    ) -> Result<Self> {
        let config = store.league_config(league).await?;
        let clock = EligibilityClock::new(&config)?;
        let period = clock.period(now);

        let ledger = store.ledger(league, period.year).await?;
        let projection = project_league(&ledger, period.year, period.week);

        let claims: Vec<WaiverClaim> = store
            .claims(league, &ClaimFilter::default())
            .await?
            .into_iter()
            .filter(|c| c.year == period.year)
            .collect();

        let mut player_ids: HashSet<PlayerId> = ledger.iter().map(|tx| tx.player).collect();
        player_ids.extend(extra_players.iter().copied());
        player_ids.extend(claims.iter().filter(|c| c.is_pending()).map(|c| c.player));
        let player_ids: Vec<PlayerId> = player_ids.into_iter().collect();
        let players = store.players(&player_ids).await?.into_iter().map(|p| (p.id, p)).collect();

        let teams = store.teams(league).await?.into_iter().map(|t| (t.id, t)).collect();
        let offered_trades = store.trades(league, true).await?;
        let picks = store.draft_picks(league, config.season_year).await?;
        let kickoffs = store
            .kickoffs(period.year, period.week)
            .await?
            .into_iter()
            .map(|k| (k.nfl_team, k.kickoff))
            .collect();

        Ok(Self {
            league,
            config,
            clock,
            now,
            period,
            projection,
            teams,
            players,
            claims,
            offered_trades,
            picks,
            kickoffs,
        })
    }

    pub fn player(&self, id: PlayerId) -> std::result::Result<&Player, Rejection> {
        self.players.get(&id).ok_or(Rejection::PlayerNotFound(id))
    }

    pub fn holding(&self, player: PlayerId) -> Option<Holding> {
        self.projection.holding(player)
    }

    pub fn last_transaction(&self, player: PlayerId) -> Option<&Transaction> {
        self.projection.last_transaction(player)
    }

    pub fn rules(&self) -> RosterRules {
        RosterRules::from_config(&self.config)
    }

    pub fn roster(&self, team: TeamId) -> RosterProjection {
        RosterProjection::from_league(self.rules(), &self.projection, team, self.period)
    }

    /// Uncommitted ledger entry stamped with the snapshot's period and time
    pub fn ledger_entry(
        &self,
        team: TeamId,
        player: PlayerId,
        kind: TransactionKind,
        value: Salary,
        slot: Option<SlotCategory>,
    ) -> Transaction {
        Transaction::new(self.league, team, player, kind, value, slot, self.period, self.now)
    }

    /// Release time if the player's latest entry is a release
    pub fn released_at(&self, player: PlayerId) -> Option<DateTime<Utc>> {
        self.last_transaction(player)
            .filter(|tx| tx.kind == TransactionKind::RosterRelease)
            .map(|tx| tx.timestamp)
    }

    /// A released player stays on waivers for `waiver_hours`
    pub fn on_waivers(&self, player: PlayerId, at: DateTime<Utc>) -> bool {
        self.released_at(player).is_some_and(|released| self.clock.on_waivers(released, at))
    }

    /// A starter whose NFL game this week has kicked off
    pub fn is_locked(&self, player: PlayerId) -> bool {
        let Some(holding) = self.holding(player) else { return false };
        if holding.slot != SlotCategory::Starter {
            return false;
        }
        self.players
            .get(&player)
            .and_then(|p| p.nfl_team.as_ref())
            .and_then(|team| self.kickoffs.get(team))
            .is_some_and(|kickoff| *kickoff <= self.now)
    }

    pub fn pending_claims(&self) -> impl Iterator<Item = &WaiverClaim> {
        self.claims.iter().filter(|c| c.is_pending())
    }

    /// FAAB left for `team`: budget minus the bids of its successful claims
    pub fn faab_remaining(&self, team: TeamId) -> i64 {
        let spent: i64 = self
            .claims
            .iter()
            .filter(|c| c.team == team && c.outcome == Some(ClaimOutcome::Success))
            .map(WaiverClaim::bid_amount)
            .sum();
        self.config.faab_budget - spent
    }

    /// Every pick of the season has been made
    pub fn rookie_draft_complete(&self) -> bool {
        if self.picks.is_empty() {
            return self.clock.draft_started(self.now);
        }
        self.picks.iter().all(DraftPick::is_filled)
    }

    pub fn pick_by_overall(&self, overall: u32) -> Option<&DraftPick> {
        self.picks.iter().find(|p| p.overall == overall)
    }

    pub fn has_pending_transition(&self, player: PlayerId) -> bool {
        self.pending_claims().any(|c| c.player == player && c.kind == ClaimKind::Transition)
    }

    /// Guard pinning the player's latest ledger entry
    pub fn player_guard(&self, player: PlayerId) -> Guard {
        Guard::PlayerUnchanged {
            league: self.league,
            year: self.period.year,
            player,
            last_transaction: self.last_transaction(player).map(|tx| tx.id),
        }
    }

    /// Guard pinning the team's latest ledger entry
    pub fn team_guard(&self, team: TeamId) -> Guard {
        Guard::TeamUnchanged {
            league: self.league,
            year: self.period.year,
            team,
            last_transaction: self.projection.last_team_transaction(team),
        }
    }

    /// Pending claims made stale by players leaving or changing hands
    pub fn claims_touching(&self, players: &HashSet<PlayerId>) -> Vec<&WaiverClaim> {
        self.pending_claims()
            .filter(|c| {
                players.contains(&c.player) || c.releases.iter().any(|r| players.contains(r))
            })
            .collect()
    }

    /// Offered trades referencing any of the players or picks
    pub fn trades_touching(
        &self,
        players: &HashSet<PlayerId>,
        picks: &HashSet<PickId>,
    ) -> Vec<&TradeProposal> {
        self.offered_trades
            .iter()
            .filter(|t| {
                players.iter().any(|p| t.involves_player(*p))
                    || picks.iter().any(|p| t.involves_pick(*p))
            })
            .collect()
    }
}
