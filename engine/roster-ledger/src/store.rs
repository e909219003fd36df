//! League store trait and the in-memory implementation
//!
//! Every write goes through [`LeagueStore::apply`] as a [`StoreMutation`]. A
//! [`CommitBatch`] carries [`Guard`]s that are checked under the store's write
//! lock before anything is touched, so a batch either lands completely or not
//! at all.

use crate::config::LeagueConfig;
use crate::error::{Result, StoreError};
use crate::types::{
    ClaimId, ClaimKind, ClaimOutcome, DraftPick, GameKickoff, LeagueId, Period, PickId, Player,
    PlayerId, RosterSlotAssignment, Team, TeamId, TradeId, TradeProposal, TradeStatus,
    Transaction, TransactionId, WaiverClaim,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Selects claims in [`LeagueStore::claims`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimFilter {
    pub pending_only: bool,
    pub kind: Option<ClaimKind>,
    pub team: Option<TeamId>,
    pub player: Option<PlayerId>,
}

impl ClaimFilter {
    pub fn pending() -> Self {
        Self { pending_only: true, ..Default::default() }
    }

    pub fn kind(mut self, kind: ClaimKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn team(mut self, team: TeamId) -> Self {
        self.team = Some(team);
        self
    }

    pub fn player(mut self, player: PlayerId) -> Self {
        self.player = Some(player);
        self
    }

    pub fn matches(&self, claim: &WaiverClaim) -> bool {
        (!self.pending_only || claim.is_pending())
            && self.kind.map_or(true, |kind| claim.kind == kind)
            && self.team.map_or(true, |team| claim.team == team)
            && self.player.map_or(true, |player| claim.player == player)
    }
}

/// Compare-and-commit precondition checked before a batch is applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Guard {
    ClaimPending(ClaimId),
    TradeOffered(TradeId),
    /// Pick is unfilled and still owned by `owner`
    PickAvailable { pick: PickId, owner: TeamId },
    /// Latest ledger entry for the player in the season is still `last_transaction`
    PlayerUnchanged {
        league: LeagueId,
        year: i32,
        player: PlayerId,
        last_transaction: Option<TransactionId>,
    },
    /// Latest ledger entry for the team in the season is still `last_transaction`
    TeamUnchanged {
        league: LeagueId,
        year: i32,
        team: TeamId,
        last_transaction: Option<TransactionId>,
    },
}

/// Terminal write for one claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimResolution {
    Processed { outcome: ClaimOutcome, reason: Option<String> },
    Cancelled { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimUpdate {
    pub claim: ClaimId,
    pub resolution: ClaimResolution,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeUpdate {
    pub trade: TradeId,
    pub status: TradeStatus,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickUpdate {
    Transfer { pick: PickId, to: TeamId },
    Fill { pick: PickId, player: PlayerId, at: DateTime<Utc> },
}

/// Replaces the materialized roster rows of one team for one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentReplacement {
    pub team: TeamId,
    pub period: Period,
    pub rows: Vec<RosterSlotAssignment>,
}

/// Multi-row effect applied atomically
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitBatch {
    pub league: LeagueId,
    pub guards: Vec<Guard>,
    pub transactions: Vec<Transaction>,
    pub claim_updates: Vec<ClaimUpdate>,
    pub trade_updates: Vec<TradeUpdate>,
    pub pick_updates: Vec<PickUpdate>,
    pub assignments: Vec<AssignmentReplacement>,
}

impl CommitBatch {
    pub fn new(league: LeagueId) -> Self {
        Self { league, ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
            && self.claim_updates.is_empty()
            && self.trade_updates.is_empty()
            && self.pick_updates.is_empty()
            && self.assignments.is_empty()
    }
}

/// Every write the store accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreMutation {
    PutLeagueConfig { league: LeagueId, config: Box<LeagueConfig> },
    UpsertTeam { team: Team },
    UpsertPlayer { player: Player },
    InsertPick { pick: DraftPick },
    PutKickoff { kickoff: GameKickoff },
    InsertClaim { claim: WaiverClaim },
    InsertTrade { trade: TradeProposal },
    Commit { batch: CommitBatch },
}

impl StoreMutation {
    pub fn name(&self) -> &'static str {
        match self {
            StoreMutation::PutLeagueConfig { .. } => "put_league_config",
            StoreMutation::UpsertTeam { .. } => "upsert_team",
            StoreMutation::UpsertPlayer { .. } => "upsert_player",
            StoreMutation::InsertPick { .. } => "insert_pick",
            StoreMutation::PutKickoff { .. } => "put_kickoff",
            StoreMutation::InsertClaim { .. } => "insert_claim",
            StoreMutation::InsertTrade { .. } => "insert_trade",
            StoreMutation::Commit { .. } => "commit",
        }
    }
}

/// Result of an applied mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Done,
    /// Id of the inserted claim, trade or pick
    Inserted(u64),
    /// Ids of the appended ledger entries, in order
    Committed(Vec<TransactionId>),
}

/// Abstract league storage backend
#[async_trait::async_trait]
pub trait LeagueStore: Send + Sync {
    async fn leagues(&self) -> Result<Vec<LeagueId>>;

    async fn league_config(&self, league: LeagueId) -> Result<LeagueConfig>;

    async fn team(&self, team: TeamId) -> Result<Team>;

    async fn teams(&self, league: LeagueId) -> Result<Vec<Team>>;

    async fn player(&self, player: PlayerId) -> Result<Player>;

    /// Players by id; unknown ids are skipped
    async fn players(&self, ids: &[PlayerId]) -> Result<Vec<Player>>;

    /// Ledger of a league season, ordered by transaction id
    async fn ledger(&self, league: LeagueId, year: i32) -> Result<Vec<Transaction>>;

    async fn claims(&self, league: LeagueId, filter: &ClaimFilter) -> Result<Vec<WaiverClaim>>;

    async fn claim(&self, claim: ClaimId) -> Result<WaiverClaim>;

    async fn trades(&self, league: LeagueId, offered_only: bool) -> Result<Vec<TradeProposal>>;

    async fn trade(&self, trade: TradeId) -> Result<TradeProposal>;

    async fn draft_picks(&self, league: LeagueId, year: i32) -> Result<Vec<DraftPick>>;

    async fn draft_pick(&self, pick: PickId) -> Result<DraftPick>;

    async fn kickoffs(&self, year: i32, week: u32) -> Result<Vec<GameKickoff>>;

    async fn slot_assignments(
        &self,
        team: TeamId,
        period: Period,
    ) -> Result<Vec<RosterSlotAssignment>>;

    /// Apply one mutation atomically
    async fn apply(&self, mutation: StoreMutation) -> Result<Applied>;

    async fn put_league_config(&self, league: LeagueId, config: LeagueConfig) -> Result<()> {
        self.apply(StoreMutation::PutLeagueConfig { league, config: Box::new(config) }).await?;
        Ok(())
    }

    async fn upsert_team(&self, team: Team) -> Result<()> {
        self.apply(StoreMutation::UpsertTeam { team }).await?;
        Ok(())
    }

    async fn upsert_player(&self, player: Player) -> Result<()> {
        self.apply(StoreMutation::UpsertPlayer { player }).await?;
        Ok(())
    }

    async fn put_kickoff(&self, kickoff: GameKickoff) -> Result<()> {
        self.apply(StoreMutation::PutKickoff { kickoff }).await?;
        Ok(())
    }

    async fn insert_pick(&self, pick: DraftPick) -> Result<PickId> {
        inserted_id(self.apply(StoreMutation::InsertPick { pick }).await?)
    }

    async fn insert_claim(&self, claim: WaiverClaim) -> Result<ClaimId> {
        inserted_id(self.apply(StoreMutation::InsertClaim { claim }).await?)
    }

    async fn insert_trade(&self, trade: TradeProposal) -> Result<TradeId> {
        inserted_id(self.apply(StoreMutation::InsertTrade { trade }).await?)
    }

    /// Apply a guarded batch, returning the new ledger ids
    async fn commit(&self, batch: CommitBatch) -> Result<Vec<TransactionId>> {
        match self.apply(StoreMutation::Commit { batch }).await? {
            Applied::Committed(ids) => Ok(ids),
            other => Err(StoreError::invalid_operation(format!("unexpected commit result {other:?}"))),
        }
    }
}

fn inserted_id(applied: Applied) -> Result<u64> {
    match applied {
        Applied::Inserted(id) => Ok(id),
        other => Err(StoreError::invalid_operation(format!("unexpected insert result {other:?}"))),
    }
}

#[derive(Debug, Default)]
struct Tables {
    configs: BTreeMap<LeagueId, LeagueConfig>,
    teams: BTreeMap<TeamId, Team>,
    players: HashMap<PlayerId, Player>,
    transactions: Vec<Transaction>,
    claims: BTreeMap<ClaimId, WaiverClaim>,
    trades: BTreeMap<TradeId, TradeProposal>,
    picks: BTreeMap<PickId, DraftPick>,
    kickoffs: Vec<GameKickoff>,
    assignments: HashMap<(TeamId, Period), Vec<RosterSlotAssignment>>,
    last_transaction: TransactionId,
    last_claim: ClaimId,
    last_trade: TradeId,
    last_pick: PickId,
}

/// Give `*id` a fresh value when it is 0, otherwise keep it and advance `last`
fn assign_id(id: &mut u64, last: &mut u64) {
    if *id == 0 {
        *last += 1;
        *id = *last;
    } else {
        *last = (*last).max(*id);
    }
}

impl Tables {
    fn latest_for<F>(&self, league: LeagueId, year: i32, matches: F) -> Option<TransactionId>
    where
        F: Fn(&Transaction) -> bool,
    {
        self.transactions
            .iter()
            .rev()
            .find(|tx| tx.league == league && tx.year == year && matches(tx))
            .map(|tx| tx.id)
    }

    fn check_guard(&self, guard: &Guard) -> Result<()> {
        match guard {
            Guard::ClaimPending(id) => match self.claims.get(id) {
                Some(claim) if claim.is_pending() => Ok(()),
                Some(_) => Err(StoreError::conflict(format!("claim {id} is no longer pending"))),
                None => Err(StoreError::not_found(format!("claim {id}"))),
            },
            Guard::TradeOffered(id) => match self.trades.get(id) {
                Some(trade) if trade.is_offered() => Ok(()),
                Some(_) => Err(StoreError::conflict(format!("trade {id} is no longer offered"))),
                None => Err(StoreError::not_found(format!("trade {id}"))),
            },
            Guard::PickAvailable { pick, owner } => match self.picks.get(pick) {
                Some(p) if p.owner == *owner && !p.is_filled() => Ok(()),
                Some(_) => Err(StoreError::conflict(format!("pick {pick} is no longer available"))),
                None => Err(StoreError::not_found(format!("pick {pick}"))),
            },
            Guard::PlayerUnchanged { league, year, player, last_transaction } => {
                let current = self.latest_for(*league, *year, |tx| tx.player == *player);
                if current == *last_transaction {
                    Ok(())
                } else {
                    Err(StoreError::conflict(format!("player {player} changed since it was read")))
                }
            }
            Guard::TeamUnchanged { league, year, team, last_transaction } => {
                let current = self.latest_for(*league, *year, |tx| tx.team == *team);
                if current == *last_transaction {
                    Ok(())
                } else {
                    Err(StoreError::conflict(format!("team {team} changed since it was read")))
                }
            }
        }
    }

    /// Guards and referential checks; never mutates
    fn check(&self, mutation: &StoreMutation) -> Result<()> {
        match mutation {
            StoreMutation::InsertClaim { claim } => {
                if claim.id != 0 && self.claims.contains_key(&claim.id) {
                    return Err(StoreError::conflict(format!("claim {} already exists", claim.id)));
                }
                Ok(())
            }
            StoreMutation::InsertTrade { trade } => {
                if trade.id != 0 && self.trades.contains_key(&trade.id) {
                    return Err(StoreError::conflict(format!("trade {} already exists", trade.id)));
                }
                Ok(())
            }
            StoreMutation::InsertPick { pick } => {
                if pick.id != 0 && self.picks.contains_key(&pick.id) {
                    return Err(StoreError::conflict(format!("pick {} already exists", pick.id)));
                }
                Ok(())
            }
            StoreMutation::Commit { batch } => {
                for guard in &batch.guards {
                    self.check_guard(guard)?;
                }
                for update in &batch.claim_updates {
                    if !self.claims.contains_key(&update.claim) {
                        return Err(StoreError::not_found(format!("claim {}", update.claim)));
                    }
                }
                for update in &batch.trade_updates {
                    if !self.trades.contains_key(&update.trade) {
                        return Err(StoreError::not_found(format!("trade {}", update.trade)));
                    }
                    if update.status == TradeStatus::Offered {
                        return Err(StoreError::invalid_operation("trade update must be terminal"));
                    }
                }
                for update in &batch.pick_updates {
                    let pick = match update {
                        PickUpdate::Transfer { pick, .. } | PickUpdate::Fill { pick, .. } => pick,
                    };
                    if !self.picks.contains_key(pick) {
                        return Err(StoreError::not_found(format!("pick {pick}")));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn assign_ids(&mut self, mutation: &mut StoreMutation) {
        match mutation {
            StoreMutation::InsertClaim { claim } => assign_id(&mut claim.id, &mut self.last_claim),
            StoreMutation::InsertTrade { trade } => assign_id(&mut trade.id, &mut self.last_trade),
            StoreMutation::InsertPick { pick } => assign_id(&mut pick.id, &mut self.last_pick),
            StoreMutation::Commit { batch } => {
                for tx in &mut batch.transactions {
                    assign_id(&mut tx.id, &mut self.last_transaction);
                }
            }
            _ => {}
        }
    }

    fn apply(&mut self, mutation: StoreMutation) -> Applied {
        match mutation {
            StoreMutation::PutLeagueConfig { league, config } => {
                self.configs.insert(league, *config);
                Applied::Done
            }
            StoreMutation::UpsertTeam { team } => {
                self.teams.insert(team.id, team);
                Applied::Done
            }
            StoreMutation::UpsertPlayer { player } => {
                self.players.insert(player.id, player);
                Applied::Done
            }
            StoreMutation::PutKickoff { kickoff } => {
                self.kickoffs.retain(|k| {
                    !(k.year == kickoff.year && k.week == kickoff.week && k.nfl_team == kickoff.nfl_team)
                });
                self.kickoffs.push(kickoff);
                Applied::Done
            }
            StoreMutation::InsertPick { pick } => {
                let id = pick.id;
                self.picks.insert(id, pick);
                Applied::Inserted(id)
            }
            StoreMutation::InsertClaim { claim } => {
                let id = claim.id;
                self.claims.insert(id, claim);
                Applied::Inserted(id)
            }
            StoreMutation::InsertTrade { trade } => {
                let id = trade.id;
                self.trades.insert(id, trade);
                Applied::Inserted(id)
            }
            StoreMutation::Commit { batch } => self.apply_batch(batch),
        }
    }

    fn apply_batch(&mut self, batch: CommitBatch) -> Applied {
        let ids = batch.transactions.iter().map(|tx| tx.id).collect();
        self.transactions.extend(batch.transactions);

        for update in batch.claim_updates {
            let Some(claim) = self.claims.get_mut(&update.claim) else { continue };
            // Terminal rows are never rewritten
            if !claim.is_pending() {
                continue;
            }
            match update.resolution {
                ClaimResolution::Processed { outcome, reason } => {
                    claim.processed_at = Some(update.at);
                    claim.outcome = Some(outcome);
                    claim.reason = reason;
                }
                ClaimResolution::Cancelled { reason } => {
                    claim.cancelled_at = Some(update.at);
                    claim.reason = Some(reason);
                }
            }
        }

        for update in batch.trade_updates {
            let Some(trade) = self.trades.get_mut(&update.trade) else { continue };
            if !trade.is_offered() {
                continue;
            }
            match update.status {
                TradeStatus::Accepted => trade.accepted_at = Some(update.at),
                TradeStatus::Rejected => trade.rejected_at = Some(update.at),
                TradeStatus::Cancelled => trade.cancelled_at = Some(update.at),
                TradeStatus::Vetoed => trade.vetoed_at = Some(update.at),
                TradeStatus::Offered => continue,
            }
            trade.reason = update.reason;
        }

        for update in batch.pick_updates {
            match update {
                PickUpdate::Transfer { pick, to } => {
                    if let Some(pick) = self.picks.get_mut(&pick) {
                        pick.owner = to;
                    }
                }
                PickUpdate::Fill { pick, player, at } => {
                    if let Some(pick) = self.picks.get_mut(&pick) {
                        pick.player = Some(player);
                        pick.picked_at = Some(at);
                    }
                }
            }
        }

        for replacement in batch.assignments {
            self.assignments.insert((replacement.team, replacement.period), replacement.rows);
        }

        Applied::Committed(ids)
    }
}

/// In-memory league store (tests and the journal's working set)
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a mutation, calling `hook` with the id-assigned mutation after
    /// guards pass and before any row changes. A hook error aborts the write.
    pub async fn apply_with<F>(&self, mut mutation: StoreMutation, hook: F) -> Result<Applied>
    where
        F: FnOnce(&StoreMutation) -> Result<()> + Send,
    {
        let mut tables = self.tables.write().await;
        if let Err(e) = tables.check(&mutation) {
            debug!(error = %e, "store write rejected by guard");
            return Err(e);
        }

        // Counters are restored if the hook fails
        let counters = (
            tables.last_transaction,
            tables.last_claim,
            tables.last_trade,
            tables.last_pick,
        );
        tables.assign_ids(&mut mutation);
        if let Err(e) = hook(&mutation) {
            warn!(error = %e, "store write aborted before apply");
            tables.last_transaction = counters.0;
            tables.last_claim = counters.1;
            tables.last_trade = counters.2;
            tables.last_pick = counters.3;
            return Err(e);
        }

        Ok(tables.apply(mutation))
    }
}

#[async_trait::async_trait]
impl LeagueStore for InMemoryStore {
    async fn leagues(&self) -> Result<Vec<LeagueId>> {
        Ok(self.tables.read().await.configs.keys().copied().collect())
    }

    async fn league_config(&self, league: LeagueId) -> Result<LeagueConfig> {
        self.tables
            .read()
            .await
            .configs
            .get(&league)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("league {league}")))
    }

    async fn team(&self, team: TeamId) -> Result<Team> {
        self.tables
            .read()
            .await
            .teams
            .get(&team)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("team {team}")))
    }

    async fn teams(&self, league: LeagueId) -> Result<Vec<Team>> {
        let tables = self.tables.read().await;
        Ok(tables.teams.values().filter(|t| t.league == league).cloned().collect())
    }

    async fn player(&self, player: PlayerId) -> Result<Player> {
        self.tables
            .read()
            .await
            .players
            .get(&player)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("player {player}")))
    }

    async fn players(&self, ids: &[PlayerId]) -> Result<Vec<Player>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.players.get(id).cloned()).collect())
    }

    async fn ledger(&self, league: LeagueId, year: i32) -> Result<Vec<Transaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .iter()
            .filter(|tx| tx.league == league && tx.year == year)
            .cloned()
            .collect())
    }

    async fn claims(&self, league: LeagueId, filter: &ClaimFilter) -> Result<Vec<WaiverClaim>> {
        let tables = self.tables.read().await;
        Ok(tables
            .claims
            .values()
            .filter(|c| c.league == league && filter.matches(c))
            .cloned()
            .collect())
    }

    async fn claim(&self, claim: ClaimId) -> Result<WaiverClaim> {
        self.tables
            .read()
            .await
            .claims
            .get(&claim)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("claim {claim}")))
    }

    async fn trades(&self, league: LeagueId, offered_only: bool) -> Result<Vec<TradeProposal>> {
        let tables = self.tables.read().await;
        Ok(tables
            .trades
            .values()
            .filter(|t| t.league == league && (!offered_only || t.is_offered()))
            .cloned()
            .collect())
    }

    async fn trade(&self, trade: TradeId) -> Result<TradeProposal> {
        self.tables
            .read()
            .await
            .trades
            .get(&trade)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("trade {trade}")))
    }

    async fn draft_picks(&self, league: LeagueId, year: i32) -> Result<Vec<DraftPick>> {
        let tables = self.tables.read().await;
        let mut picks: Vec<DraftPick> = tables
            .picks
            .values()
            .filter(|p| p.league == league && p.year == year)
            .cloned()
            .collect();
        picks.sort_by_key(|p| p.overall);
        Ok(picks)
    }

    async fn draft_pick(&self, pick: PickId) -> Result<DraftPick> {
        self.tables
            .read()
            .await
            .picks
            .get(&pick)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("pick {pick}")))
    }

    async fn kickoffs(&self, year: i32, week: u32) -> Result<Vec<GameKickoff>> {
        let tables = self.tables.read().await;
        Ok(tables.kickoffs.iter().filter(|k| k.year == year && k.week == week).cloned().collect())
    }

    async fn slot_assignments(
        &self,
        team: TeamId,
        period: Period,
    ) -> Result<Vec<RosterSlotAssignment>> {
        let tables = self.tables.read().await;
        Ok(tables.assignments.get(&(team, period)).cloned().unwrap_or_default())
    }

    async fn apply(&self, mutation: StoreMutation) -> Result<Applied> {
        self.apply_with(mutation, |_| Ok(())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Salary;
    use crate::types::{SlotCategory, TransactionKind};

    fn at(hour: u32) -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2025, 10, 1, hour, 0, 0).unwrap()
    }

    fn claim(team: TeamId, player: PlayerId) -> WaiverClaim {
        WaiverClaim {
            id: 0,
            league: 1,
            team,
            player,
            kind: ClaimKind::FreeAgency,
            bid: Some(10),
            priority_order: 1,
            releases: vec![],
            super_priority: false,
            year: 2025,
            week: 4,
            submitted_at: at(1),
            processed_at: None,
            cancelled_at: None,
            outcome: None,
            reason: None,
        }
    }

    fn add(team: TeamId, player: PlayerId) -> Transaction {
        Transaction::new(
            1,
            team,
            player,
            TransactionKind::RosterAdd,
            Salary::from_dollars(1),
            Some(SlotCategory::Bench),
            Period::new(2025, 4),
            at(2),
        )
    }

    #[tokio::test]
    async fn test_store_assigns_ids() {
        let store = InMemoryStore::new();
        let first = store.insert_claim(claim(1, 10)).await.unwrap();
        let second = store.insert_claim(claim(2, 10)).await.unwrap();
        assert_eq!((first, second), (1, 2));

        let mut batch = CommitBatch::new(1);
        batch.transactions = vec![add(1, 10), add(2, 11)];
        assert_eq!(store.commit(batch).await.unwrap(), vec![1, 2]);
        assert_eq!(store.ledger(1, 2025).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_guard_writes_nothing() {
        let store = InMemoryStore::new();
        let id = store.insert_claim(claim(1, 10)).await.unwrap();

        let mut batch = CommitBatch::new(1);
        batch.guards = vec![
            Guard::ClaimPending(id),
            Guard::PlayerUnchanged { league: 1, year: 2025, player: 10, last_transaction: Some(99) },
        ];
        batch.transactions = vec![add(1, 10)];
        batch.claim_updates = vec![ClaimUpdate {
            claim: id,
            resolution: ClaimResolution::Processed { outcome: ClaimOutcome::Success, reason: None },
            at: at(3),
        }];

        let err = store.commit(batch).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(store.ledger(1, 2025).await.unwrap().is_empty());
        assert!(store.claim(id).await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_terminal_claims_are_not_rewritten() {
        let store = InMemoryStore::new();
        let id = store.insert_claim(claim(1, 10)).await.unwrap();

        let cancel = |reason: &str| {
            let mut batch = CommitBatch::new(1);
            batch.claim_updates = vec![ClaimUpdate {
                claim: id,
                resolution: ClaimResolution::Cancelled { reason: reason.to_string() },
                at: at(4),
            }];
            batch
        };

        store.commit(cancel("first")).await.unwrap();
        store.commit(cancel("second")).await.unwrap();

        let stored = store.claim(id).await.unwrap();
        assert_eq!(stored.reason.as_deref(), Some("first"));
        assert!(store.claims(1, &ClaimFilter::pending()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hook_failure_aborts_write() {
        let store = InMemoryStore::new();
        let result = store
            .apply_with(StoreMutation::InsertClaim { claim: claim(1, 10) }, |_| {
                Err(StoreError::corruption("disk full"))
            })
            .await;
        assert!(result.is_err());
        assert!(store.claims(1, &ClaimFilter::default()).await.unwrap().is_empty());

        // The id counter was not consumed
        assert_eq!(store.insert_claim(claim(1, 10)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_claim_filter() {
        let store = InMemoryStore::new();
        store.insert_claim(claim(1, 10)).await.unwrap();
        store.insert_claim(claim(2, 10)).await.unwrap();
        store.insert_claim(claim(2, 11)).await.unwrap();

        let team_two = store.claims(1, &ClaimFilter::pending().team(2)).await.unwrap();
        assert_eq!(team_two.len(), 2);

        let player_ten = store.claims(1, &ClaimFilter::default().player(10)).await.unwrap();
        assert_eq!(player_ten.len(), 2);

        let poaches = store.claims(1, &ClaimFilter::default().kind(ClaimKind::Poach)).await.unwrap();
        assert!(poaches.is_empty());
    }
}
