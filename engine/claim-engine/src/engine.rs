//! Transaction engine facade
//!
//! Every operation follows the same shape: authorize, lock the contested
//! resources, load a fresh [`LeagueSnapshot`], validate and plan effects, then
//! commit one guarded batch. Notifications and broadcasts go out after the
//! commit and never affect it.

use crate::auth::Actor;
use crate::effects::{into_batch, Effect};
use crate::error::{EngineError, Rejection, Result};
use crate::locks::{Resource, ResourceLocks};
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::notify::{
    Broadcaster, ChannelBroadcaster, LeagueEvent, LogNotifier, Notification, Notifier,
};
use crate::snapshot::LeagueSnapshot;
use crate::validator::{validate_claim, ClaimRequest, ValidationMode};
use eligibility_clock::Clock;
use roster_ledger::{
    ClaimFilter, ClaimId, ClaimKind, Guard, LeagueId, LeagueStore, PlayerId, StoreError, Team,
    TeamId, TransactionId, WaiverClaim,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default capacity of the league event channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

pub struct TransactionEngine {
    pub(crate) store: Arc<dyn LeagueStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) broadcaster: Arc<dyn Broadcaster>,
    pub(crate) locks: ResourceLocks,
    pub(crate) metrics: Arc<EngineMetrics>,
}

impl TransactionEngine {
    /// Create an engine that logs notifications and broadcasts to nobody
    pub fn new(store: Arc<dyn LeagueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            notifier: Arc::new(LogNotifier),
            broadcaster: Arc::new(ChannelBroadcaster::new(DEFAULT_BROADCAST_CAPACITY)),
            locks: ResourceLocks::new(),
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    pub fn store(&self) -> &Arc<dyn LeagueStore> {
        &self.store
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Validate and record a pending claim; nothing reaches the ledger
    pub async fn submit_claim(&self, actor: &Actor, request: ClaimRequest) -> Result<WaiverClaim> {
        let team_id = request.team.ok_or(Rejection::MissingField("team"))?;
        let team = self.load_team(team_id).await?;
        actor.authorize_team(&team)?;

        let _locks = self.locks.acquire(request.player.map(Resource::Player)).await;
        let extra: Vec<PlayerId> = request.player.into_iter().collect();
        let snap = self.snapshot(team.league, &extra).await?;

        let validated = match validate_claim(&snap, &request, ValidationMode::Submission) {
            Ok(validated) => validated,
            Err(rejection) => {
                self.metrics.claims_rejected.inc();
                info!(
                    league = team.league,
                    team = team.id,
                    player = ?request.player,
                    code = rejection.code(),
                    "claim rejected: {rejection}"
                );
                return Err(rejection.into());
            }
        };

        let mut claim = WaiverClaim {
            id: 0,
            league: team.league,
            team: team.id,
            player: validated.player,
            kind: validated.kind,
            bid: validated.bid,
            priority_order: team.waiver_priority,
            releases: validated.releases,
            super_priority: validated.super_priority,
            year: snap.period.year,
            week: snap.period.week,
            submitted_at: snap.now,
            processed_at: None,
            cancelled_at: None,
            outcome: None,
            reason: None,
        };
        claim.id = self.store.insert_claim(claim.clone()).await?;
        self.metrics.claims_submitted.inc();

        info!(
            league = claim.league,
            team = claim.team,
            player = claim.player,
            claim = claim.id,
            kind = %claim.kind,
            "claim submitted"
        );

        if claim.kind == ClaimKind::Poach {
            self.broadcast(LeagueEvent::PoachSubmitted {
                league: claim.league,
                claim: claim.id,
                team: claim.team,
                player: claim.player,
            });
        }

        Ok(claim)
    }

    /// Withdraw a pending claim owned by the actor's team
    pub async fn cancel_claim(&self, actor: &Actor, claim_id: ClaimId) -> Result<WaiverClaim> {
        let claim = self.store.claim(claim_id).await?;
        let team = self.load_team(claim.team).await?;
        actor.authorize_team(&team)?;

        let _locks = self.locks.acquire([Resource::Player(claim.player)]).await;
        let claim = self.store.claim(claim_id).await?;
        if !claim.is_pending() {
            return Err(Rejection::ClaimNotPending.into());
        }

        let effects = vec![
            Effect::Guard(Guard::ClaimPending(claim.id)),
            Effect::CancelClaim { claim: claim.id, reason: "cancelled by team".into() },
        ];
        match self.commit(claim.league, effects).await {
            Ok(_) => {}
            Err(err) if err.is_conflict() => return Err(Rejection::ClaimNotPending.into()),
            Err(err) => return Err(err),
        }
        self.metrics.claims_cancelled.inc();
        info!(league = claim.league, team = claim.team, claim = claim.id, "claim cancelled");

        Ok(self.store.claim(claim_id).await?)
    }

    /// Every claim of a team, pending and processed, oldest first
    pub async fn claim_history(&self, actor: &Actor, team_id: TeamId) -> Result<Vec<WaiverClaim>> {
        let team = self.load_team(team_id).await?;
        actor.authorize_team(&team)?;
        let filter = ClaimFilter::default().team(team_id);
        let mut claims = self.store.claims(team.league, &filter).await?;
        claims.sort_by_key(|c| (c.submitted_at, c.id));
        Ok(claims)
    }

    pub(crate) async fn snapshot(
        &self,
        league: LeagueId,
        extra_players: &[PlayerId],
    ) -> Result<LeagueSnapshot> {
        LeagueSnapshot::load(self.store.as_ref(), league, self.clock.now(), extra_players).await
    }

    pub(crate) async fn load_team(&self, team: TeamId) -> Result<Team> {
        match self.store.team(team).await {
            Ok(team) => Ok(team),
            Err(StoreError::NotFound(_)) => {
                Err(Rejection::NotAuthorized(format!("team {team} does not exist")).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Apply planned effects as one guarded batch stamped with the current time
    pub(crate) async fn commit(
        &self,
        league: LeagueId,
        effects: Vec<Effect>,
    ) -> Result<Vec<TransactionId>> {
        let batch = into_batch(league, self.clock.now(), effects);
        match self.store.commit(batch).await {
            Ok(ids) => Ok(ids),
            Err(err) => {
                let err = EngineError::from(err);
                if err.is_conflict() {
                    self.metrics.commit_conflicts.inc();
                    warn!(league, "commit rejected by guard: {err}");
                }
                Err(err)
            }
        }
    }

    pub(crate) async fn send(&self, notification: Notification) {
        let (league, kind) = (notification.league, notification.kind);
        if let Err(err) = self.notifier.notify(notification).await {
            warn!(league, kind = ?kind, "dropping notification: {err}");
        }
    }

    pub(crate) fn broadcast(&self, event: LeagueEvent) {
        debug!(league = event.league(), "broadcasting league event");
        self.broadcaster.broadcast(event);
    }
}
