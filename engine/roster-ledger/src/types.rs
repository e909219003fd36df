//! League domain types: players, teams, ledger entries, claims, trades and picks

use crate::money::Salary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub type LeagueId = i64;
pub type TeamId = i64;
pub type PlayerId = i64;
pub type UserId = i64;
pub type TransactionId = u64;
pub type ClaimId = u64;
pub type TradeId = u64;
pub type PickId = u64;

/// A (year, week) pair. Week 0 is the off-season before week 1 kicks off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub week: u32,
}

impl Period {
    pub fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }

    pub fn is_offseason(&self) -> bool {
        self.week == 0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/wk{}", self.year, self.week)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    DEF,
}

impl Position {
    pub const ALL: [Position; 6] =
        [Position::QB, Position::RB, Position::WR, Position::TE, Position::K, Position::DEF];
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "QB" => Ok(Position::QB),
            "RB" => Ok(Position::RB),
            "WR" => Ok(Position::WR),
            "TE" => Ok(Position::TE),
            "K" => Ok(Position::K),
            "DEF" | "DST" => Ok(Position::DEF),
            other => Err(format!("unknown position: {other}")),
        }
    }
}

/// Roster slot categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotCategory {
    Starter,
    Bench,
    InjuredReserve,
    PracticeSquad,
    ProtectedPracticeSquad,
}

impl SlotCategory {
    pub const ALL: [SlotCategory; 5] = [
        SlotCategory::Starter,
        SlotCategory::Bench,
        SlotCategory::InjuredReserve,
        SlotCategory::PracticeSquad,
        SlotCategory::ProtectedPracticeSquad,
    ];

    /// Active-roster slots count against the salary cap
    pub fn is_active_roster(self) -> bool {
        matches!(self, SlotCategory::Starter | SlotCategory::Bench | SlotCategory::InjuredReserve)
    }

    pub fn is_practice_squad(self) -> bool {
        matches!(self, SlotCategory::PracticeSquad | SlotCategory::ProtectedPracticeSquad)
    }

    /// Protected slots cannot be poached or used as a release
    pub fn is_protected(self) -> bool {
        self == SlotCategory::ProtectedPracticeSquad
    }
}

impl fmt::Display for SlotCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotCategory::Starter => "starter",
            SlotCategory::Bench => "bench",
            SlotCategory::InjuredReserve => "injured reserve",
            SlotCategory::PracticeSquad => "practice squad",
            SlotCategory::ProtectedPracticeSquad => "protected practice squad",
        };
        f.write_str(name)
    }
}

/// Player identity, supplied by the data-import collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    /// NFL team abbreviation, used to look up game kickoffs
    pub nfl_team: Option<String>,
    /// Season of the player's NFL draft class
    pub rookie_year: Option<i32>,
}

impl Player {
    pub fn is_rookie(&self, year: i32) -> bool {
        self.rookie_year == Some(year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub league: LeagueId,
    pub name: String,
    pub owner: UserId,
    /// Lower number claims first
    pub waiver_priority: u32,
}

/// Ledger entry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Draft,
    RosterAdd,
    PracticeAdd,
    RosterRelease,
    Trade,
    RosterDeactivate,
    RosterActivate,
    PracticeProtect,
    RosterMove,
    /// Removal from the team that lost the player to a poach or transition bid
    Poached,
}

impl TransactionKind {
    /// The entry places the player on the entry's team
    pub fn acquires(self) -> bool {
        matches!(
            self,
            TransactionKind::Draft
                | TransactionKind::RosterAdd
                | TransactionKind::PracticeAdd
                | TransactionKind::Trade
        )
    }

    /// The entry takes the player off the entry's team
    pub fn removes(self) -> bool {
        matches!(self, TransactionKind::RosterRelease | TransactionKind::Poached)
    }

    /// The entry changes the slot of a player already on the team
    pub fn moves(self) -> bool {
        matches!(
            self,
            TransactionKind::RosterDeactivate
                | TransactionKind::RosterActivate
                | TransactionKind::PracticeProtect
                | TransactionKind::RosterMove
        )
    }

    /// Entries after which the player can be poached from a practice squad
    pub fn opens_poach_window(self) -> bool {
        matches!(
            self,
            TransactionKind::RosterDeactivate | TransactionKind::Draft | TransactionKind::PracticeAdd
        )
    }

    /// Slot used when the entry does not name one
    pub fn default_slot(self) -> Option<SlotCategory> {
        match self {
            TransactionKind::Draft
            | TransactionKind::PracticeAdd
            | TransactionKind::RosterDeactivate => Some(SlotCategory::PracticeSquad),
            TransactionKind::RosterAdd
            | TransactionKind::Trade
            | TransactionKind::RosterActivate
            | TransactionKind::RosterMove => Some(SlotCategory::Bench),
            TransactionKind::PracticeProtect => Some(SlotCategory::ProtectedPracticeSquad),
            TransactionKind::RosterRelease | TransactionKind::Poached => None,
        }
    }
}

/// An immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Assigned by the store on commit
    pub id: TransactionId,
    pub league: LeagueId,
    pub team: TeamId,
    pub player: PlayerId,
    pub kind: TransactionKind,
    pub value: Salary,
    pub slot: Option<SlotCategory>,
    pub year: i32,
    pub week: u32,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Create an uncommitted entry (id 0)
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        league: LeagueId,
        team: TeamId,
        player: PlayerId,
        kind: TransactionKind,
        value: Salary,
        slot: Option<SlotCategory>,
        period: Period,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            league,
            team,
            player,
            kind,
            value,
            slot,
            year: period.year,
            week: period.week,
            timestamp,
        }
    }

    pub fn period(&self) -> Period {
        Period::new(self.year, self.week)
    }
}

/// Materialized roster row for (team, year, week)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSlotAssignment {
    pub league: LeagueId,
    pub team: TeamId,
    pub year: i32,
    pub week: u32,
    pub player: PlayerId,
    pub slot: SlotCategory,
    pub value: Salary,
    pub contract_extensions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimKind {
    FreeAgency,
    FreeAgencyPractice,
    Poach,
    /// Restricted free agency bid on a player held by another team
    Transition,
}

impl ClaimKind {
    pub const ALL: [ClaimKind; 4] = [
        ClaimKind::FreeAgency,
        ClaimKind::FreeAgencyPractice,
        ClaimKind::Poach,
        ClaimKind::Transition,
    ];

    /// Kinds arbitrated by bid before waiver priority
    pub fn is_bid_ordered(self) -> bool {
        matches!(self, ClaimKind::FreeAgency | ClaimKind::Transition)
    }

    /// Slot the claimed player lands in
    pub fn destination(self) -> SlotCategory {
        match self {
            ClaimKind::FreeAgencyPractice => SlotCategory::PracticeSquad,
            ClaimKind::FreeAgency | ClaimKind::Poach | ClaimKind::Transition => {
                SlotCategory::Bench
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClaimKind::FreeAgency => "FREE_AGENCY",
            ClaimKind::FreeAgencyPractice => "FREE_AGENCY_PRACTICE",
            ClaimKind::Poach => "POACH",
            ClaimKind::Transition => "TRANSITION",
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        ClaimKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown claim type: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

/// A waiver, poach or transition claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaiverClaim {
    /// Assigned by the store on insert
    pub id: ClaimId,
    pub league: LeagueId,
    pub team: TeamId,
    pub player: PlayerId,
    pub kind: ClaimKind,
    pub bid: Option<i64>,
    pub priority_order: u32,
    pub releases: Vec<PlayerId>,
    pub super_priority: bool,
    pub year: i32,
    pub week: u32,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub outcome: Option<ClaimOutcome>,
    pub reason: Option<String>,
}

impl WaiverClaim {
    pub fn is_pending(&self) -> bool {
        self.processed_at.is_none() && self.cancelled_at.is_none()
    }

    pub fn status(&self) -> ClaimStatus {
        if self.cancelled_at.is_some() {
            ClaimStatus::Cancelled
        } else if self.processed_at.is_none() {
            ClaimStatus::Pending
        } else if self.outcome == Some(ClaimOutcome::Success) {
            ClaimStatus::Succeeded
        } else {
            ClaimStatus::Failed
        }
    }

    pub fn release_set(&self) -> BTreeSet<PlayerId> {
        self.releases.iter().copied().collect()
    }

    pub fn bid_amount(&self) -> i64 {
        self.bid.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Offered,
    Accepted,
    Rejected,
    Cancelled,
    Vetoed,
}

impl TradeStatus {
    pub fn is_terminal(self) -> bool {
        self != TradeStatus::Offered
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeProposal {
    /// Assigned by the store on insert
    pub id: TradeId,
    pub league: LeagueId,
    pub proposing_team: TeamId,
    pub accepting_team: TeamId,
    pub proposed_players: Vec<PlayerId>,
    pub accepted_players: Vec<PlayerId>,
    pub proposed_picks: Vec<PickId>,
    pub accepted_picks: Vec<PickId>,
    /// Players the proposing team drops to make room
    pub releases: Vec<PlayerId>,
    pub year: i32,
    pub week: u32,
    pub offered_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub vetoed_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl TradeProposal {
    pub fn status(&self) -> TradeStatus {
        if self.accepted_at.is_some() {
            TradeStatus::Accepted
        } else if self.rejected_at.is_some() {
            TradeStatus::Rejected
        } else if self.cancelled_at.is_some() {
            TradeStatus::Cancelled
        } else if self.vetoed_at.is_some() {
            TradeStatus::Vetoed
        } else {
            TradeStatus::Offered
        }
    }

    pub fn is_offered(&self) -> bool {
        self.status() == TradeStatus::Offered
    }

    /// Every player that changes hands
    pub fn traded_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.proposed_players.iter().chain(self.accepted_players.iter()).copied()
    }

    pub fn traded_picks(&self) -> impl Iterator<Item = PickId> + '_ {
        self.proposed_picks.iter().chain(self.accepted_picks.iter()).copied()
    }

    pub fn involves_player(&self, player: PlayerId) -> bool {
        self.traded_players().any(|p| p == player) || self.releases.contains(&player)
    }

    pub fn involves_pick(&self, pick: PickId) -> bool {
        self.traded_picks().any(|p| p == pick)
    }

    pub fn involves_team(&self, team: TeamId) -> bool {
        self.proposing_team == team || self.accepting_team == team
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPick {
    pub id: PickId,
    pub league: LeagueId,
    pub year: i32,
    pub round: u32,
    pub overall: u32,
    pub original_team: TeamId,
    pub owner: TeamId,
    pub player: Option<PlayerId>,
    pub picked_at: Option<DateTime<Utc>>,
}

impl DraftPick {
    pub fn is_filled(&self) -> bool {
        self.player.is_some()
    }
}

/// Real-world game kickoff for an NFL team in a given week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameKickoff {
    pub year: i32,
    pub week: u32,
    pub nfl_team: String,
    pub kickoff: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_kind_parsing() {
        assert_eq!("free_agency".parse::<ClaimKind>(), Ok(ClaimKind::FreeAgency));
        assert_eq!("FREE-AGENCY-PRACTICE".parse::<ClaimKind>(), Ok(ClaimKind::FreeAgencyPractice));
        assert_eq!(" poach ".parse::<ClaimKind>(), Ok(ClaimKind::Poach));
        assert!("trade".parse::<ClaimKind>().is_err());
    }

    #[test]
    fn test_transaction_kind_classes() {
        assert!(TransactionKind::Trade.acquires());
        assert!(TransactionKind::Poached.removes());
        assert!(TransactionKind::PracticeProtect.moves());
        assert!(TransactionKind::Draft.opens_poach_window());
        assert!(!TransactionKind::RosterAdd.opens_poach_window());
        assert_eq!(TransactionKind::RosterRelease.default_slot(), None);
    }

    #[test]
    fn test_trade_status_is_exclusive() {
        let now = Utc::now();
        let mut trade = TradeProposal {
            id: 1,
            league: 1,
            proposing_team: 1,
            accepting_team: 2,
            proposed_players: vec![10],
            accepted_players: vec![20],
            proposed_picks: vec![7],
            accepted_picks: vec![],
            releases: vec![11],
            year: 2025,
            week: 3,
            offered_at: now,
            accepted_at: None,
            rejected_at: None,
            cancelled_at: None,
            vetoed_at: None,
            reason: None,
        };

        assert_eq!(trade.status(), TradeStatus::Offered);
        assert!(trade.involves_player(11));
        assert!(trade.involves_pick(7));

        trade.vetoed_at = Some(now);
        assert_eq!(trade.status(), TradeStatus::Vetoed);
        assert!(trade.status().is_terminal());
    }
}
