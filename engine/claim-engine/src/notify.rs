//! Outbound notifications and real-time league events
//!
//! Both seams are best effort: delivery failures are logged and dropped and
//! never affect a committed transaction.

use chrono::{DateTime, Utc};
use roster_ledger::{ClaimId, ClaimKind, LeagueId, PickId, PlayerId, TeamId, TradeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TradeProposed,
    TradeAccepted,
    TradeRejected,
    TradeCancelled,
    TradeVetoed,
    PoachFailed,
}

/// Message for league members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub league: LeagueId,
    /// Recipient team; `None` addresses the whole league
    pub team: Option<TeamId>,
    pub kind: NotificationKind,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Notification dispatcher
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Notifier that writes every notification to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            league = notification.league,
            team = ?notification.team,
            kind = ?notification.kind,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Real-time league events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LeagueEvent {
    PlayerDrafted { league: LeagueId, pick: PickId, overall: u32, team: TeamId, player: PlayerId },
    PoachSubmitted { league: LeagueId, claim: ClaimId, team: TeamId, player: PlayerId },
    TradeAccepted {
        league: LeagueId,
        trade: TradeId,
        proposing_team: TeamId,
        accepting_team: TeamId,
    },
    WaiverProcessed { league: LeagueId, kind: ClaimKind, won: Vec<ClaimId>, lost: Vec<ClaimId> },
}

impl LeagueEvent {
    pub fn league(&self) -> LeagueId {
        match self {
            LeagueEvent::PlayerDrafted { league, .. }
            | LeagueEvent::PoachSubmitted { league, .. }
            | LeagueEvent::TradeAccepted { league, .. }
            | LeagueEvent::WaiverProcessed { league, .. } => *league,
        }
    }
}

/// Real-time event sink
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, event: LeagueEvent);
}

/// Broadcaster backed by a `tokio::sync::broadcast` channel
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<LeagueEvent>,
}

impl ChannelBroadcaster {
    /// Create a new broadcaster buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeagueEvent> {
        self.sender.subscribe()
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn broadcast(&self, event: LeagueEvent) {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            debug!(league = event.league(), "no subscribers for league event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_broadcaster_delivers_to_subscribers() {
        let broadcaster = ChannelBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        let event = LeagueEvent::PoachSubmitted { league: 1, claim: 4, team: 2, player: 9 };
        broadcaster.broadcast(event.clone());
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_broadcast_without_subscribers_is_dropped() {
        let broadcaster = ChannelBroadcaster::new(1);
        broadcaster.broadcast(LeagueEvent::TradeAccepted {
            league: 1,
            trade: 1,
            proposing_team: 1,
            accepting_team: 2,
        });
    }

    #[test]
    fn test_event_wire_format() {
        let event = LeagueEvent::PlayerDrafted { league: 1, pick: 5, overall: 5, team: 2, player: 77 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "player_drafted");
        assert_eq!(json["player"], 77);
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let notification = Notification {
            league: 1,
            team: Some(2),
            kind: NotificationKind::TradeVetoed,
            message: "trade 3 vetoed".into(),
            sent_at: Utc::now(),
        };
        assert!(LogNotifier.notify(notification).await.is_ok());
    }
}
