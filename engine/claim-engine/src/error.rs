//! Rejections and engine errors

use eligibility_clock::ClockError;
use roster_ledger::{PickId, PlayerId, ProjectionError, StoreError};
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Why a claim, trade, pick or roster move was refused; nothing is written
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("season is locked")]
    SeasonLocked,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unknown claim type: {0}")]
    UnknownClaimKind(String),

    #[error("duplicate claim")]
    DuplicateClaim,

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    #[error("player is already rostered")]
    PlayerRostered,

    #[error("player is not on waivers")]
    PlayerNotOnWaivers,

    #[error("player is on waivers; submit a claim")]
    PlayerOnWaivers,

    #[error("players must be claimed during the waiver period")]
    WaiverPeriod,

    #[error("player has pending claims")]
    PendingClaims,

    #[error("player is in sanctuary")]
    PlayerInSanctuary,

    #[error("league is in a sanctuary period")]
    SanctuaryPeriod,

    #[error("player cannot be poached: {0}")]
    NotPoachable(&'static str),

    #[error("player is not a restricted free agent")]
    NotRestrictedFreeAgent,

    #[error("restricted free agency is not open")]
    RfaPeriodClosed,

    #[error("free agency is not open")]
    FreeAgencyClosed,

    #[error("rookie draft is not complete")]
    DraftNotComplete,

    #[error("super priority requires a poached transaction for the player")]
    SuperPriorityNotAllowed,

    #[error("invalid release: {0}")]
    InvalidRelease(String),

    #[error("no slots available")]
    NoSlotsAvailable,

    #[error("salary cap exceeded")]
    CapExceeded,

    #[error("invalid player: {0}")]
    InvalidPlayer(String),

    #[error("bid must not be negative")]
    InvalidBid,

    #[error("bid {bid} exceeds remaining FAAB {remaining}")]
    InsufficientFaab { bid: i64, remaining: i64 },

    #[error("claim is no longer pending")]
    ClaimNotPending,

    #[error("trade deadline has passed")]
    TradeDeadlinePassed,

    #[error("trade is no longer offered")]
    TradeNotOffered,

    #[error("invalid trade: {0}")]
    InvalidTrade(String),

    #[error("asset no longer owned: {0}")]
    AssetNotOwned(String),

    #[error("player {0} has a pending transition bid")]
    PendingTransition(PlayerId),

    #[error("player {0} is locked")]
    PlayerLocked(PlayerId),

    #[error("draft has not started")]
    DraftNotStarted,

    #[error("pick {0} is not on the clock")]
    PickNotOnClock(PickId),

    #[error("pick {0} has already been made")]
    PickFilled(PickId),

    #[error("player is not a rookie of the draft class")]
    NotARookie,

    #[error("invalid move: {0}")]
    InvalidMove(String),
}

impl Rejection {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::SeasonLocked => "season_locked",
            Rejection::MissingField(_) => "missing_field",
            Rejection::UnknownClaimKind(_) => "unknown_claim_type",
            Rejection::DuplicateClaim => "duplicate_claim",
            Rejection::NotAuthorized(_) => "not_authorized",
            Rejection::PlayerNotFound(_) => "player_not_found",
            Rejection::PlayerRostered => "player_rostered",
            Rejection::PlayerNotOnWaivers => "player_not_on_waivers",
            Rejection::PlayerOnWaivers => "player_on_waivers",
            Rejection::WaiverPeriod => "waiver_period",
            Rejection::PendingClaims => "pending_claims",
            Rejection::PlayerInSanctuary => "player_in_sanctuary",
            Rejection::SanctuaryPeriod => "sanctuary_period",
            Rejection::NotPoachable(_) => "not_poachable",
            Rejection::NotRestrictedFreeAgent => "not_restricted_free_agent",
            Rejection::RfaPeriodClosed => "rfa_period_closed",
            Rejection::FreeAgencyClosed => "free_agency_closed",
            Rejection::DraftNotComplete => "draft_not_complete",
            Rejection::SuperPriorityNotAllowed => "super_priority_not_allowed",
            Rejection::InvalidRelease(_) => "invalid_release",
            Rejection::NoSlotsAvailable => "no_slots_available",
            Rejection::CapExceeded => "cap_exceeded",
            Rejection::InvalidPlayer(_) => "invalid_player",
            Rejection::InvalidBid => "invalid_bid",
            Rejection::InsufficientFaab { .. } => "insufficient_faab",
            Rejection::ClaimNotPending => "claim_not_pending",
            Rejection::TradeDeadlinePassed => "trade_deadline_passed",
            Rejection::TradeNotOffered => "trade_not_offered",
            Rejection::InvalidTrade(_) => "invalid_trade",
            Rejection::AssetNotOwned(_) => "asset_not_owned",
            Rejection::PendingTransition(_) => "pending_transition",
            Rejection::PlayerLocked(_) => "player_locked",
            Rejection::DraftNotStarted => "draft_not_started",
            Rejection::PickNotOnClock(_) => "pick_not_on_clock",
            Rejection::PickFilled(_) => "pick_filled",
            Rejection::NotARookie => "not_a_rookie",
            Rejection::InvalidMove(_) => "invalid_move",
        }
    }
}

impl From<ProjectionError> for Rejection {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::SlotExceeded { .. } => Rejection::NoSlotsAvailable,
            ProjectionError::CapExceeded { .. } => Rejection::CapExceeded,
            ProjectionError::InvalidPlayer { reason, .. } => Rejection::InvalidPlayer(reason),
        }
    }
}

/// Errors returned by the transaction engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    /// A commit guard failed; nothing was written
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("clock error: {0}")]
    Clock(#[from] ClockError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => EngineError::Conflict(msg),
            other => EngineError::Store(other),
        }
    }
}

impl EngineError {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            EngineError::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }
}
