//! Calendar gates computed from league configuration and a point in time
//!
//! Windows are derived from the `SeasonCalendar` on every call.

use crate::error::ClockError;
use chrono::{DateTime, Duration, Utc};
use roster_ledger::{DraftType, LeagueConfig, Period, SeasonCalendar, TimeWindow, Transaction};
use serde::{Deserialize, Serialize};

/// Where a practice-squad player sits relative to the poach window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoachWindow {
    /// Last transaction cannot open a poach window
    NotEligible,
    /// Too soon after the qualifying transaction
    Sanctuary,
    Open,
    /// Too long after the qualifying transaction
    Expired,
}

/// Time-windowed eligibility gates for one league
#[derive(Debug, Clone)]
pub struct EligibilityClock {
    season_year: i32,
    calendar: SeasonCalendar,
}

impl EligibilityClock {
    /// Create a new eligibility clock from a validated league configuration
    pub fn new(config: &LeagueConfig) -> Result<Self, ClockError> {
        config.validate().map_err(ClockError::Config)?;
        tracing::debug!(
            season = config.season_year,
            final_week = config.calendar.final_week,
            "eligibility clock configured"
        );
        Ok(Self { season_year: config.season_year, calendar: config.calendar.clone() })
    }

    pub fn calendar(&self) -> &SeasonCalendar {
        &self.calendar
    }

    /// Current (year, week); week 0 before the season starts
    pub fn period(&self, now: DateTime<Utc>) -> Period {
        if now < self.calendar.season_start {
            return Period::new(self.season_year, 0);
        }
        let elapsed_weeks = (now - self.calendar.season_start).num_weeks();
        Period::new(self.season_year, u32::try_from(elapsed_weeks + 1).unwrap_or(u32::MAX))
    }

    /// Claims are closed once the final week is over
    pub fn season_locked(&self, now: DateTime<Utc>) -> bool {
        self.period(now).week > self.calendar.final_week
    }

    /// Waiver period of the current week, if the season is running
    pub fn current_waiver_period(&self, now: DateTime<Utc>) -> Option<TimeWindow> {
        let week = self.period(now).week;
        if week == 0 || week > self.calendar.final_week {
            return None;
        }
        Some(self.calendar.waiver_period(week)).filter(|window| window.contains(now))
    }

    pub fn in_waiver_period(&self, now: DateTime<Utc>) -> bool {
        self.current_waiver_period(now).is_some()
    }

    pub fn free_agency_open(&self, now: DateTime<Utc>) -> bool {
        now >= self.calendar.free_agency_opens_at
    }

    /// When a player released at `released_at` clears waivers
    pub fn waivers_clear_at(&self, released_at: DateTime<Utc>) -> DateTime<Utc> {
        released_at + Duration::hours(self.calendar.waiver_hours)
    }

    /// A released player stays on waivers for `waiver_hours`
    pub fn on_waivers(&self, released_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now >= released_at && now < self.waivers_clear_at(released_at)
    }

    pub fn draft_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.calendar.draft.starts_at
    }

    /// Timed drafts open pick N `(N - 1) * hours_per_pick` after the start
    /// even if earlier picks are still unfilled
    pub fn draft_fallback_open(&self, overall: u32, now: DateTime<Utc>) -> bool {
        match self.calendar.draft.kind {
            DraftType::Sequential => false,
            DraftType::Timed { hours_per_pick } => {
                let offset = i64::from(overall.saturating_sub(1)) * hours_per_pick;
                now >= self.calendar.draft.starts_at + Duration::hours(offset)
            }
        }
    }

    /// League-wide poaching freeze
    pub fn in_sanctuary_period(&self, now: DateTime<Utc>) -> bool {
        self.calendar.sanctuary_periods.iter().any(|window| window.contains(now))
    }

    pub fn poach_window(&self, last_tx: &Transaction, at: DateTime<Utc>) -> PoachWindow {
        if !last_tx.kind.opens_poach_window() {
            return PoachWindow::NotEligible;
        }
        let elapsed = at - last_tx.timestamp;
        if elapsed < Duration::hours(self.calendar.player_sanctuary_hours) {
            PoachWindow::Sanctuary
        } else if elapsed > Duration::hours(self.calendar.poach_window_hours) {
            PoachWindow::Expired
        } else {
            PoachWindow::Open
        }
    }

    /// Per-player sanctuary after a deactivate, draft or practice-squad add
    pub fn player_in_sanctuary(&self, last_tx: &Transaction, now: DateTime<Utc>) -> bool {
        self.poach_window(last_tx, now) == PoachWindow::Sanctuary
    }

    /// When poach claims against `last_tx` can be resolved
    pub fn poach_resolves_at(&self, last_tx: &Transaction) -> DateTime<Utc> {
        last_tx.timestamp + Duration::hours(self.calendar.poach_window_hours)
    }

    pub fn trade_deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.calendar.trade_deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Trades stay closed from the deadline until the season ends
    pub fn trading_closed(&self, now: DateTime<Utc>) -> bool {
        self.trade_deadline_passed(now) && !self.season_locked(now)
    }

    pub fn in_rfa_period(&self, now: DateTime<Utc>) -> bool {
        self.calendar.rfa_period.is_some_and(|window| window.contains(now))
    }

    /// Transition bids resolve when the RFA period closes
    pub fn rfa_period_end(&self) -> Option<DateTime<Utc>> {
        self.calendar.rfa_period.map(|window| window.end)
    }
}
