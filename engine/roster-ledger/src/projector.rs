//! Roster projection: slot occupancy and cap usage replayed from the ledger
//!
//! Projections are plain values. The hypothetical edits used by the claim
//! validator return new projections and never touch the ledger.

use crate::config::{LeagueConfig, SlotLimits};
use crate::error::ProjectionError;
use crate::money::Salary;
use crate::types::{
    LeagueId, Period, PlayerId, Position, RosterSlotAssignment, SlotCategory, TeamId,
    Transaction, TransactionId, TransactionKind,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Where a player currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holding {
    pub team: TeamId,
    pub slot: SlotCategory,
    pub value: Salary,
}

/// League-wide replay of one season up to a week
#[derive(Debug, Clone, Default)]
pub struct LeagueProjection {
    period: Option<Period>,
    holdings: HashMap<PlayerId, Holding>,
    last_transactions: HashMap<PlayerId, Transaction>,
    last_team_transactions: HashMap<TeamId, TransactionId>,
    poached: HashSet<(TeamId, PlayerId)>,
}

/// Replay `ledger` in id order for `year`, through `week`
pub fn project_league(ledger: &[Transaction], year: i32, week: u32) -> LeagueProjection {
    let mut entries: Vec<&Transaction> =
        ledger.iter().filter(|tx| tx.year == year && tx.week <= week).collect();
    entries.sort_by_key(|tx| tx.id);

    let mut projection =
        LeagueProjection { period: Some(Period::new(year, week)), ..Default::default() };

    for tx in entries {
        let held_by_team = projection.holdings.get(&tx.player).is_some_and(|h| h.team == tx.team);

        if tx.kind.acquires() {
            let slot = tx.slot.or(tx.kind.default_slot()).unwrap_or(SlotCategory::Bench);
            projection
                .holdings
                .insert(tx.player, Holding { team: tx.team, slot, value: tx.value });
        } else if tx.kind.removes() {
            if held_by_team {
                projection.holdings.remove(&tx.player);
            }
            if tx.kind == TransactionKind::Poached {
                projection.poached.insert((tx.team, tx.player));
            }
        } else if tx.kind.moves() && held_by_team {
            if let Some(holding) = projection.holdings.get_mut(&tx.player) {
                holding.slot = tx.slot.or(tx.kind.default_slot()).unwrap_or(holding.slot);
            }
        }

        projection.last_team_transactions.insert(tx.team, tx.id);
        projection.last_transactions.insert(tx.player, tx.clone());
    }

    projection
}

impl LeagueProjection {
    pub fn period(&self) -> Option<Period> {
        self.period
    }

    pub fn holding(&self, player: PlayerId) -> Option<Holding> {
        self.holdings.get(&player).copied()
    }

    pub fn holder(&self, player: PlayerId) -> Option<TeamId> {
        self.holdings.get(&player).map(|h| h.team)
    }

    pub fn is_rostered(&self, player: PlayerId) -> bool {
        self.holdings.contains_key(&player)
    }

    /// Most recent ledger entry naming the player
    pub fn last_transaction(&self, player: PlayerId) -> Option<&Transaction> {
        self.last_transactions.get(&player)
    }

    /// Id of the most recent ledger entry naming the team
    pub fn last_team_transaction(&self, team: TeamId) -> Option<TransactionId> {
        self.last_team_transactions.get(&team).copied()
    }

    /// Whether `team` lost `player` to a poach or transition bid this season
    pub fn lost_by_poach(&self, team: TeamId, player: PlayerId) -> bool {
        self.poached.contains(&(team, player))
    }

    /// Players held by `team`
    pub fn roster(&self, team: TeamId) -> impl Iterator<Item = (PlayerId, Holding)> + '_ {
        self.holdings.iter().filter(move |(_, h)| h.team == team).map(|(p, h)| (*p, *h))
    }
}

/// Cap and slot limits a roster is checked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRules {
    pub salary_cap: Salary,
    pub limits: SlotLimits,
    pub eligibility: BTreeMap<SlotCategory, Vec<Position>>,
}

impl RosterRules {
    pub fn from_config(config: &LeagueConfig) -> Self {
        Self {
            salary_cap: config.salary_cap,
            limits: config.slots,
            eligibility: config.slot_eligibility.clone(),
        }
    }

    pub fn accepts(&self, slot: SlotCategory, position: Position) -> bool {
        self.eligibility.get(&slot).is_some_and(|positions| positions.contains(&position))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterEntry {
    pub player: PlayerId,
    pub slot: SlotCategory,
    pub value: Salary,
}

/// One team's roster for one period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterProjection {
    team: TeamId,
    period: Period,
    rules: RosterRules,
    entries: Vec<RosterEntry>,
}

impl RosterProjection {
    /// Project a team straight from the ledger
    pub fn from_ledger(
        config: &LeagueConfig,
        ledger: &[Transaction],
        team: TeamId,
        year: i32,
        week: u32,
    ) -> Self {
        let league = project_league(ledger, year, week);
        Self::from_league(RosterRules::from_config(config), &league, team, Period::new(year, week))
    }

    /// Project a team from an existing league replay
    pub fn from_league(
        rules: RosterRules,
        league: &LeagueProjection,
        team: TeamId,
        period: Period,
    ) -> Self {
        let entries = league
            .roster(team)
            .map(|(player, h)| RosterEntry { player, slot: h.slot, value: h.value })
            .collect();
        let mut projection = Self { team, period, rules, entries };
        projection.sort();
        projection
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(|e| (e.slot, e.player));
    }

    pub fn team(&self) -> TeamId {
        self.team
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn rules(&self) -> &RosterRules {
        &self.rules
    }

    /// Entries ordered by slot category, then player id
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn entry(&self, player: PlayerId) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.player == player)
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.entry(player).is_some()
    }

    pub fn count(&self, slot: SlotCategory) -> usize {
        self.entries.iter().filter(|e| e.slot == slot).count()
    }

    pub fn available_slots(&self, slot: SlotCategory) -> usize {
        self.rules.limits.limit(slot).saturating_sub(self.count(slot))
    }

    /// Combined salary of the active roster
    pub fn used_cap(&self) -> Salary {
        self.entries.iter().filter(|e| e.slot.is_active_roster()).map(|e| e.value).sum()
    }

    /// Cap room; negative when the team is over the cap
    pub fn available_cap(&self) -> Salary {
        self.rules.salary_cap - self.used_cap()
    }

    pub fn has_open_bench_slot(&self, position: Position) -> bool {
        self.rules.accepts(SlotCategory::Bench, position)
            && self.available_slots(SlotCategory::Bench) > 0
    }

    pub fn has_open_practice_squad_slot(&self, position: Position) -> bool {
        self.rules.accepts(SlotCategory::PracticeSquad, position)
            && self.available_slots(SlotCategory::PracticeSquad) > 0
    }

    /// The roster without `player`
    pub fn with_player_removed(&self, player: PlayerId) -> Result<Self, ProjectionError> {
        if !self.contains(player) {
            return Err(ProjectionError::invalid_player(self.team, player, "not on roster"));
        }
        let mut next = self.clone();
        next.entries.retain(|e| e.player != player);
        Ok(next)
    }

    /// The roster with `player` placed in `slot`
    pub fn with_player_added(
        &self,
        player: PlayerId,
        position: Position,
        slot: SlotCategory,
        value: Salary,
    ) -> Result<Self, ProjectionError> {
        if self.contains(player) {
            return Err(ProjectionError::invalid_player(self.team, player, "already on roster"));
        }
        if !self.rules.accepts(slot, position) {
            return Err(ProjectionError::invalid_player(
                self.team,
                player,
                format!("{position:?} is not eligible for {slot}"),
            ));
        }
        let mut next = self.clone();
        next.entries.push(RosterEntry { player, slot, value });
        next.sort();
        Ok(next)
    }

    /// The roster with `player` moved to `slot`
    pub fn with_player_moved(
        &self,
        player: PlayerId,
        position: Position,
        slot: SlotCategory,
    ) -> Result<Self, ProjectionError> {
        let value = self
            .entry(player)
            .map(|e| e.value)
            .ok_or_else(|| ProjectionError::invalid_player(self.team, player, "not on roster"))?;
        self.with_player_removed(player)?.with_player_added(player, position, slot, value)
    }

    /// Check the cap and every slot limit
    pub fn check_invariants(&self) -> Result<(), ProjectionError> {
        for slot in SlotCategory::ALL {
            let count = self.count(slot);
            let limit = self.rules.limits.limit(slot);
            if count > limit {
                return Err(ProjectionError::SlotExceeded { team: self.team, slot, count, limit });
            }
        }

        let used = self.used_cap();
        if used > self.rules.salary_cap {
            return Err(ProjectionError::CapExceeded {
                team: self.team,
                used,
                cap: self.rules.salary_cap,
            });
        }

        Ok(())
    }

    /// Materialized rows for the slot-assignment snapshot
    pub fn to_assignments(&self, league: LeagueId) -> Vec<RosterSlotAssignment> {
        self.entries
            .iter()
            .map(|e| RosterSlotAssignment {
                league,
                team: self.team,
                year: self.period.year,
                week: self.period.week,
                player: e.player,
                slot: e.slot,
                value: e.value,
                contract_extensions: 0,
            })
            .collect()
    }
}
