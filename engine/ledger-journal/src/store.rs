//! Durable league store: an `InMemoryStore` fronted by the journal

use crate::config::JournalConfig;
use crate::journal::Journal;
use roster_ledger::{
    Applied, ClaimFilter, ClaimId, DraftPick, GameKickoff, InMemoryStore, LeagueConfig, LeagueId,
    LeagueStore, Period, PickId, Player, PlayerId, Result, RosterSlotAssignment, StoreError,
    StoreMutation, Team, TeamId, TradeId, TradeProposal, Transaction, WaiverClaim,
};
use std::sync::Arc;

/// League store whose every write is journaled before it is applied
#[derive(Debug, Clone)]
pub struct JournaledStore {
    inner: InMemoryStore,
    journal: Arc<Journal>,
}

impl JournaledStore {
    /// Open the journal and replay it into a fresh working set
    pub async fn open(config: JournalConfig) -> Result<Self> {
        let (journal, entries) = Journal::open(config)?;
        let inner = InMemoryStore::new();

        let replayed = entries.len();
        for entry in entries {
            inner.apply(entry.mutation).await.map_err(|e| {
                StoreError::corruption(format!("replay of entry {} failed: {e}", entry.sequence))
            })?;
        }

        tracing::info!(replayed, "league store recovered from journal");

        Ok(Self { inner, journal: Arc::new(journal) })
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Flush the journal to disk
    pub fn flush(&self) -> Result<()> {
        self.journal.flush()
    }
}

#[async_trait::async_trait]
impl LeagueStore for JournaledStore {
    async fn leagues(&self) -> Result<Vec<LeagueId>> {
        self.inner.leagues().await
    }

    async fn league_config(&self, league: LeagueId) -> Result<LeagueConfig> {
        self.inner.league_config(league).await
    }

    async fn team(&self, team: TeamId) -> Result<Team> {
        self.inner.team(team).await
    }

    async fn teams(&self, league: LeagueId) -> Result<Vec<Team>> {
        self.inner.teams(league).await
    }

    async fn player(&self, player: PlayerId) -> Result<Player> {
        self.inner.player(player).await
    }

    async fn players(&self, ids: &[PlayerId]) -> Result<Vec<Player>> {
        self.inner.players(ids).await
    }

    async fn ledger(&self, league: LeagueId, year: i32) -> Result<Vec<Transaction>> {
        self.inner.ledger(league, year).await
    }

    async fn claims(&self, league: LeagueId, filter: &ClaimFilter) -> Result<Vec<WaiverClaim>> {
        self.inner.claims(league, filter).await
    }

    async fn claim(&self, claim: ClaimId) -> Result<WaiverClaim> {
        self.inner.claim(claim).await
    }

    async fn trades(&self, league: LeagueId, offered_only: bool) -> Result<Vec<TradeProposal>> {
        self.inner.trades(league, offered_only).await
    }

    async fn trade(&self, trade: TradeId) -> Result<TradeProposal> {
        self.inner.trade(trade).await
    }

    async fn draft_picks(&self, league: LeagueId, year: i32) -> Result<Vec<DraftPick>> {
        self.inner.draft_picks(league, year).await
    }

    async fn draft_pick(&self, pick: PickId) -> Result<DraftPick> {
        self.inner.draft_pick(pick).await
    }

    async fn kickoffs(&self, year: i32, week: u32) -> Result<Vec<GameKickoff>> {
        self.inner.kickoffs(year, week).await
    }

    async fn slot_assignments(
        &self,
        team: TeamId,
        period: Period,
    ) -> Result<Vec<RosterSlotAssignment>> {
        self.inner.slot_assignments(team, period).await
    }

    /// The journal write is synchronous and runs under the store's write lock,
    /// so journal order is apply order. With `fsync_every_write` a commit
    /// blocks its worker thread until the entry is on disk.
    async fn apply(&self, mutation: StoreMutation) -> Result<Applied> {
        let journal = &self.journal;
        self.inner.apply_with(mutation, |m| journal.append(m).map(|_| ())).await
    }
}
