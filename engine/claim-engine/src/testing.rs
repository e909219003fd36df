//! Shared fixture for engine tests

use crate::auth::Actor;
use crate::engine::TransactionEngine;
use crate::notify::{ChannelBroadcaster, Notification, Notifier, NotifyError};
use crate::snapshot::LeagueSnapshot;
use chrono::{DateTime, TimeZone, Utc};
use eligibility_clock::{Clock, EligibilityClock, FixedClock};
use parking_lot::Mutex;
use roster_ledger::{
    CommitBatch, DraftPick, GameKickoff, InMemoryStore, LeagueConfig, LeagueId, LeagueStore,
    PickId, Player, PlayerId, Position, RosterProjection, Salary, SlotCategory, Team, TeamId,
    Transaction, TransactionId, TransactionKind, WaiverClaim,
};
use std::sync::Arc;

pub const LEAGUE: LeagueId = 1;
pub const COMMISSIONER: i64 = 99;

pub fn utc(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, month, day, hour, 0, 0).unwrap()
}

/// Notifier that keeps everything it is asked to send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().push(notification);
        Ok(())
    }
}

pub struct Fixture {
    pub config: LeagueConfig,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub broadcaster: ChannelBroadcaster,
    pub engine: TransactionEngine,
}

impl Fixture {
    /// League 1 with teams 1-4; team N is owned by user N*10 and has waiver priority N
    pub async fn new(now: DateTime<Utc>) -> Self {
        Self::with_config(LeagueConfig::default(), now).await
    }

    pub async fn with_config(config: LeagueConfig, now: DateTime<Utc>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        store.put_league_config(LEAGUE, config.clone()).await.unwrap();
        for id in 1..=4 {
            store
                .upsert_team(Team {
                    id,
                    league: LEAGUE,
                    name: format!("Team {id}"),
                    owner: id * 10,
                    waiver_priority: id as u32,
                })
                .await
                .unwrap();
        }

        let clock = Arc::new(FixedClock::new(now));
        let notifier = Arc::new(RecordingNotifier::default());
        let broadcaster = ChannelBroadcaster::new(64);
        let engine = TransactionEngine::new(store.clone(), clock.clone())
            .with_notifier(notifier.clone())
            .with_broadcaster(Arc::new(broadcaster.clone()));

        Self { config, store, clock, notifier, broadcaster, engine }
    }

    pub fn owner(&self, team: TeamId) -> Actor {
        Actor::Team { user: team * 10, team }
    }

    pub fn commissioner(&self) -> Actor {
        Actor::Commissioner { user: COMMISSIONER, league: LEAGUE }
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        self.clock.set(now);
    }

    pub async fn set_waiver_priority(&self, team: TeamId, priority: u32) {
        let mut row = self.store.team(team).await.unwrap();
        row.waiver_priority = priority;
        self.store.upsert_team(row).await.unwrap();
    }

    pub async fn add_player(&self, id: PlayerId, position: Position) {
        self.add_player_with(id, position, Some("KC"), None).await;
    }

    pub async fn add_rookie(&self, id: PlayerId, position: Position) {
        self.add_player_with(id, position, Some("KC"), Some(self.config.season_year)).await;
    }

    pub async fn add_player_with(
        &self,
        id: PlayerId,
        position: Position,
        nfl_team: Option<&str>,
        rookie_year: Option<i32>,
    ) {
        let player = Player {
            id,
            name: format!("Player {id}"),
            position,
            nfl_team: nfl_team.map(str::to_string),
            rookie_year,
        };
        self.store.upsert_player(player).await.unwrap();
    }

    /// Write one ledger entry directly, bypassing validation
    pub async fn record(
        &self,
        team: TeamId,
        player: PlayerId,
        kind: TransactionKind,
        slot: Option<SlotCategory>,
        value: i64,
        at: DateTime<Utc>,
    ) -> TransactionId {
        let period = EligibilityClock::new(&self.config).unwrap().period(at);
        let tx = Transaction::new(
            LEAGUE,
            team,
            player,
            kind,
            Salary::from_dollars(value),
            slot,
            period,
            at,
        );
        let mut batch = CommitBatch::new(LEAGUE);
        batch.transactions.push(tx);
        self.store.commit(batch).await.unwrap()[0]
    }

    /// Put a new player straight onto a roster
    pub async fn seed(
        &self,
        team: TeamId,
        player: PlayerId,
        position: Position,
        slot: SlotCategory,
        value: i64,
        at: DateTime<Utc>,
    ) -> TransactionId {
        self.add_player(player, position).await;
        let kind = if slot.is_practice_squad() {
            TransactionKind::PracticeAdd
        } else {
            TransactionKind::RosterAdd
        };
        self.record(team, player, kind, Some(slot), value, at).await
    }

    pub async fn kickoff(&self, nfl_team: &str, kickoff: DateTime<Utc>) {
        let week = EligibilityClock::new(&self.config).unwrap().period(kickoff).week;
        let kickoff = GameKickoff { year: 2025, week, nfl_team: nfl_team.into(), kickoff };
        self.store.put_kickoff(kickoff).await.unwrap();
    }

    /// Picks 1..=count; pick N belongs to team ((N - 1) % 4) + 1
    pub async fn draft_board(&self, count: u32) -> Vec<PickId> {
        let mut ids = Vec::new();
        for overall in 1..=count {
            let team = i64::from((overall - 1) % 4) + 1;
            let pick = DraftPick {
                id: 0,
                league: LEAGUE,
                year: self.config.season_year,
                round: (overall - 1) / 4 + 1,
                overall,
                original_team: team,
                owner: team,
                player: None,
                picked_at: None,
            };
            ids.push(self.store.insert_pick(pick).await.unwrap());
        }
        ids
    }

    pub async fn snapshot(&self) -> LeagueSnapshot {
        LeagueSnapshot::load(self.store.as_ref(), LEAGUE, self.clock.now(), &[]).await.unwrap()
    }

    pub async fn roster(&self, team: TeamId) -> RosterProjection {
        self.snapshot().await.roster(team)
    }

    pub async fn holder(&self, player: PlayerId) -> Option<TeamId> {
        self.snapshot().await.projection.holder(player)
    }

    pub async fn claim(&self, id: u64) -> WaiverClaim {
        self.store.claim(id).await.unwrap()
    }

    pub async fn ledger_len(&self) -> usize {
        self.store.ledger(LEAGUE, 2025).await.unwrap().len()
    }
}
