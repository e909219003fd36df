//! Admission checks for waiver, poach and transition claims
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. season lock
//! 2. required fields
//! 3. claim kind
//! 4. duplicate pending claim (submission only)
//! 5. kind-specific eligibility
//! 6. release set
//! 7. hypothetical roster, cap and FAAB
//!
//! The same checks re-run at resolution time against current state, with the
//! time-windowed gates evaluated at the claim's submission time.

use crate::error::Rejection;
use crate::snapshot::LeagueSnapshot;
use chrono::{DateTime, Utc};
use eligibility_clock::PoachWindow;
use roster_ledger::{
    ClaimKind, PlayerId, Position, RosterProjection, Salary, SlotCategory, TeamId, WaiverClaim,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

const NOT_ON_PRACTICE_SQUAD: &str = "player is not on a practice squad";

/// Claim as submitted by a team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub team: Option<TeamId>,
    pub player: Option<PlayerId>,
    pub kind: Option<String>,
    pub bid: Option<i64>,
    #[serde(default)]
    pub releases: Vec<PlayerId>,
    #[serde(default)]
    pub super_priority: bool,
}

impl ClaimRequest {
    pub fn new(team: TeamId, player: PlayerId, kind: ClaimKind) -> Self {
        Self {
            team: Some(team),
            player: Some(player),
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    pub fn bid(mut self, bid: i64) -> Self {
        self.bid = Some(bid);
        self
    }

    pub fn releasing(mut self, releases: impl IntoIterator<Item = PlayerId>) -> Self {
        self.releases = releases.into_iter().collect();
        self
    }

    pub fn with_super_priority(mut self) -> Self {
        self.super_priority = true;
        self
    }

    /// Rebuild the request behind a stored claim
    pub fn from_claim(claim: &WaiverClaim) -> Self {
        Self {
            team: Some(claim.team),
            player: Some(claim.player),
            kind: Some(claim.kind.to_string()),
            bid: claim.bid,
            releases: claim.releases.clone(),
            super_priority: claim.super_priority,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Submission,
    /// Re-validation of a stored claim
    ///
    /// The player's own windows are judged at `submitted_at`; the season lock and
    /// league-wide sanctuary periods at the current clock.
    Resolution { submitted_at: DateTime<Utc> },
}

/// A claim that passed every check, with the roster it would produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedClaim {
    pub team: TeamId,
    pub player: PlayerId,
    pub position: Position,
    pub kind: ClaimKind,
    /// Bid charged to FAAB; only bid-ordered kinds carry one
    pub bid: Option<i64>,
    pub releases: Vec<PlayerId>,
    pub super_priority: bool,
    pub value: Salary,
    pub slot: SlotCategory,
    /// Team losing the player on a poach or transition win
    pub previous_holder: Option<TeamId>,
    pub roster_after: RosterProjection,
}

pub fn validate_claim(
    snap: &LeagueSnapshot,
    req: &ClaimRequest,
    mode: ValidationMode,
) -> Result<ValidatedClaim, Rejection> {
    let at = match mode {
        ValidationMode::Submission => snap.now,
        ValidationMode::Resolution { submitted_at } => submitted_at,
    };

    // Step 1: season lock, always against the current clock
    if snap.clock.season_locked(snap.now) {
        return Err(Rejection::SeasonLocked);
    }

    // Step 2: required fields
    let team = req.team.ok_or(Rejection::MissingField("team"))?;
    let player_id = req.player.ok_or(Rejection::MissingField("player"))?;
    let kind_name = req.kind.as_deref().ok_or(Rejection::MissingField("type"))?;
    if !snap.teams.contains_key(&team) {
        let msg = format!("team {team} is not in league {}", snap.league);
        return Err(Rejection::NotAuthorized(msg));
    }

    // Step 3: kind membership
    let kind = ClaimKind::from_str(kind_name)
        .map_err(|_| Rejection::UnknownClaimKind(kind_name.into()))?;

    // Step 4: duplicates
    if mode == ValidationMode::Submission
        && snap.pending_claims().any(|c| c.team == team && c.player == player_id && c.kind == kind)
    {
        return Err(Rejection::DuplicateClaim);
    }

    // Step 5: kind-specific gates
    let player = snap.player(player_id)?;
    let holding = snap.holding(player_id);
    let (value, previous_holder) = match kind {
        ClaimKind::FreeAgency | ClaimKind::FreeAgencyPractice => {
            check_free_agent(snap, team, player_id, req.super_priority, kind, at)?;
            (snap.config.min_salary, None)
        }
        ClaimKind::Poach => {
            check_poach(snap, team, player_id, at)?;
            let holding = holding.ok_or(Rejection::NotPoachable(NOT_ON_PRACTICE_SQUAD))?;
            (holding.value, Some(holding.team))
        }
        ClaimKind::Transition => {
            if !snap.clock.in_rfa_period(at) {
                return Err(Rejection::RfaPeriodClosed);
            }
            let holding = holding.ok_or(Rejection::NotRestrictedFreeAgent)?;
            if holding.team == team {
                return Err(Rejection::NotRestrictedFreeAgent);
            }
            (holding.value, Some(holding.team))
        }
    };

    // Step 6: releases
    validate_releases(snap, team, &req.releases, &[player_id])?;

    // Step 7: hypothetical roster and FAAB
    let slot = kind.destination();
    let roster_after =
        roster_with(snap.roster(team), &req.releases, player_id, player.position, slot, value)?;

    let bid = if kind.is_bid_ordered() { req.bid } else { None };
    if let Some(bid) = bid {
        if bid < 0 {
            return Err(Rejection::InvalidBid);
        }
        let remaining = snap.faab_remaining(team);
        if bid > remaining {
            return Err(Rejection::InsufficientFaab { bid, remaining });
        }
    }

    Ok(ValidatedClaim {
        team,
        player: player_id,
        position: player.position,
        kind,
        bid,
        releases: req.releases.clone(),
        super_priority: req.super_priority,
        value,
        slot,
        previous_holder,
        roster_after,
    })
}

fn check_free_agent(
    snap: &LeagueSnapshot,
    team: TeamId,
    player_id: PlayerId,
    super_priority: bool,
    kind: ClaimKind,
    at: DateTime<Utc>,
) -> Result<(), Rejection> {
    if snap.projection.is_rostered(player_id) {
        return Err(Rejection::PlayerRostered);
    }

    if super_priority && !snap.projection.lost_by_poach(team, player_id) {
        return Err(Rejection::SuperPriorityNotAllowed);
    }

    let week = snap.clock.period(at).week;
    if week >= 1 {
        // In season, outside the waiver period only players on waivers can be claimed
        if !snap.clock.in_waiver_period(at) && !snap.on_waivers(player_id, at) {
            return Err(Rejection::PlayerNotOnWaivers);
        }
        return Ok(());
    }

    if super_priority {
        return Ok(());
    }

    let rookie = snap.player(player_id)?.is_rookie(snap.config.season_year);
    match kind {
        ClaimKind::FreeAgencyPractice if rookie => {
            if !snap.rookie_draft_complete() {
                return Err(Rejection::DraftNotComplete);
            }
        }
        _ => {
            if !snap.clock.free_agency_open(at) {
                return Err(Rejection::FreeAgencyClosed);
            }
        }
    }

    Ok(())
}

fn check_poach(
    snap: &LeagueSnapshot,
    team: TeamId,
    player: PlayerId,
    at: DateTime<Utc>,
) -> Result<(), Rejection> {
    // League-wide freezes apply at the current clock; the player's window at `at`
    if snap.clock.in_sanctuary_period(snap.now) {
        return Err(Rejection::SanctuaryPeriod);
    }

    let holding = snap.holding(player).ok_or(Rejection::NotPoachable(NOT_ON_PRACTICE_SQUAD))?;
    if holding.team == team {
        return Err(Rejection::NotPoachable("player is already on your roster"));
    }
    match holding.slot {
        SlotCategory::PracticeSquad => {}
        SlotCategory::ProtectedPracticeSquad => {
            return Err(Rejection::NotPoachable("player is protected"))
        }
        _ => return Err(Rejection::NotPoachable(NOT_ON_PRACTICE_SQUAD)),
    }

    let last = snap
        .last_transaction(player)
        .ok_or(Rejection::NotPoachable("player has no qualifying transaction"))?;
    match snap.clock.poach_window(last, at) {
        PoachWindow::Open => Ok(()),
        PoachWindow::Sanctuary => Err(Rejection::PlayerInSanctuary),
        PoachWindow::Expired => Err(Rejection::PlayerNotOnWaivers),
        PoachWindow::NotEligible => {
            Err(Rejection::NotPoachable("player has no qualifying transaction"))
        }
    }
}

/// Releases must be distinct, held by `team`, unprotected and unlocked
pub fn validate_releases(
    snap: &LeagueSnapshot,
    team: TeamId,
    releases: &[PlayerId],
    excluded: &[PlayerId],
) -> Result<(), Rejection> {
    let mut seen = HashSet::new();
    for &release in releases {
        if !seen.insert(release) {
            return Err(Rejection::InvalidRelease(format!("player {release} listed twice")));
        }
        if excluded.contains(&release) {
            return Err(Rejection::InvalidRelease(format!("player {release} cannot be released")));
        }
        let holding = snap.holding(release).filter(|h| h.team == team).ok_or_else(|| {
            Rejection::InvalidRelease(format!("player {release} is not on your roster"))
        })?;
        if holding.slot.is_protected() {
            return Err(Rejection::InvalidRelease(format!("player {release} is protected")));
        }
        if snap.is_locked(release) {
            return Err(Rejection::InvalidRelease(format!("player {release} is locked")));
        }
    }
    Ok(())
}

/// `roster` without `releases` and with `player` added, checked against the cap and slot limits
pub fn roster_with(
    roster: RosterProjection,
    releases: &[PlayerId],
    player: PlayerId,
    position: Position,
    slot: SlotCategory,
    value: Salary,
) -> Result<RosterProjection, Rejection> {
    let mut next = roster;
    for release in releases {
        next = next.with_player_removed(*release)?;
    }
    let next = next.with_player_added(player, position, slot, value)?;
    next.check_invariants()?;
    Ok(next)
}
