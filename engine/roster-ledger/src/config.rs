//! League configuration: cap, roster slots and the season calendar

use crate::money::Salary;
use crate::types::{Position, SlotCategory};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-league rules, read-only to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeagueConfig {
    /// Season the calendar describes
    pub season_year: i32,

    /// Maximum combined salary of the active roster
    pub salary_cap: Salary,

    /// Salary of a player signed off waivers or free agency
    pub min_salary: Salary,

    /// Rookie contract value per draft round (index 0 = round 1)
    pub rookie_salaries: Vec<Salary>,

    /// Free-agent acquisition budget per team and season
    pub faab_budget: i64,

    /// Maximum players per slot category
    pub slots: SlotLimits,

    /// Positions each slot category accepts
    pub slot_eligibility: BTreeMap<SlotCategory, Vec<Position>>,

    /// Season calendar
    pub calendar: SeasonCalendar,
}

/// Maximum number of players per slot category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotLimits {
    pub starter: usize,
    pub bench: usize,
    pub injured_reserve: usize,
    pub practice_squad: usize,
    pub protected_practice_squad: usize,
}

impl SlotLimits {
    pub fn limit(&self, slot: SlotCategory) -> usize {
        match slot {
            SlotCategory::Starter => self.starter,
            SlotCategory::Bench => self.bench,
            SlotCategory::InjuredReserve => self.injured_reserve,
            SlotCategory::PracticeSquad => self.practice_squad,
            SlotCategory::ProtectedPracticeSquad => self.protected_practice_squad,
        }
    }
}

impl Default for SlotLimits {
    fn default() -> Self {
        Self { starter: 9, bench: 12, injured_reserve: 3, practice_squad: 4, protected_practice_squad: 2 }
    }
}

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Recurring weekly window, offset from the start of each league week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyWindow {
    pub start_offset_hours: i64,
    pub duration_hours: i64,
}

impl Default for WeeklyWindow {
    fn default() -> Self {
        // Tuesday 00:00 through Wednesday 12:00 for a Thursday week start
        Self { start_offset_hours: 5 * 24, duration_hours: 36 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftType {
    /// Picks open only when the previous pick is filled
    Sequential,
    /// Pick N also opens `(N - 1) * hours_per_pick` after the draft starts
    Timed { hours_per_pick: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSettings {
    pub kind: DraftType,
    pub starts_at: DateTime<Utc>,
}

/// Dates and windows that gate claims, trades and draft picks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonCalendar {
    /// Start of week 1; earlier times are the off-season (week 0)
    pub season_start: DateTime<Utc>,
    pub final_week: u32,
    pub waiver_window: WeeklyWindow,
    /// How long a released player stays on waivers
    pub waiver_hours: i64,
    pub free_agency_opens_at: DateTime<Utc>,
    pub draft: DraftSettings,
    /// League-wide poaching freezes
    pub sanctuary_periods: Vec<TimeWindow>,
    pub trade_deadline: Option<DateTime<Utc>>,
    pub rfa_period: Option<TimeWindow>,
    pub player_sanctuary_hours: i64,
    pub poach_window_hours: i64,
}

fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).single().unwrap_or_default()
}

impl Default for SeasonCalendar {
    fn default() -> Self {
        Self {
            season_start: utc(2025, 9, 4, 0),
            final_week: 17,
            waiver_window: WeeklyWindow::default(),
            waiver_hours: 24,
            free_agency_opens_at: utc(2025, 5, 15, 0),
            draft: DraftSettings {
                kind: DraftType::Timed { hours_per_pick: 8 },
                starts_at: utc(2025, 5, 1, 16),
            },
            sanctuary_periods: Vec::new(),
            trade_deadline: Some(utc(2025, 11, 20, 0)),
            rfa_period: Some(TimeWindow::new(utc(2025, 3, 1, 0), utc(2025, 3, 15, 0))),
            player_sanctuary_hours: 24,
            poach_window_hours: 48,
        }
    }
}

impl SeasonCalendar {
    /// Start of league week `week` (week 1 = season start)
    pub fn week_start(&self, week: u32) -> DateTime<Utc> {
        self.season_start + Duration::weeks(i64::from(week.max(1)) - 1)
    }

    /// Waiver period of league week `week`
    pub fn waiver_period(&self, week: u32) -> TimeWindow {
        let start = self.week_start(week) + Duration::hours(self.waiver_window.start_offset_hours);
        TimeWindow::new(start, start + Duration::hours(self.waiver_window.duration_hours))
    }
}

impl Default for LeagueConfig {
    fn default() -> Self {
        let all = Position::ALL.to_vec();
        let practice: Vec<Position> =
            Position::ALL.into_iter().filter(|p| *p != Position::DEF).collect();

        let mut slot_eligibility = BTreeMap::new();
        slot_eligibility.insert(SlotCategory::Starter, all.clone());
        slot_eligibility.insert(SlotCategory::Bench, all.clone());
        slot_eligibility.insert(SlotCategory::InjuredReserve, all);
        slot_eligibility.insert(SlotCategory::PracticeSquad, practice.clone());
        slot_eligibility.insert(SlotCategory::ProtectedPracticeSquad, practice);

        Self {
            season_year: 2025,
            salary_cap: Salary::from_dollars(200),
            min_salary: Salary::from_dollars(1),
            rookie_salaries: [5, 4, 3, 2, 1].into_iter().map(Salary::from_dollars).collect(),
            faab_budget: 100,
            slots: SlotLimits::default(),
            slot_eligibility,
            calendar: SeasonCalendar::default(),
        }
    }
}

impl LeagueConfig {
    /// Whether `slot` accepts players at `position`
    pub fn accepts(&self, slot: SlotCategory, position: Position) -> bool {
        self.slot_eligibility.get(&slot).is_some_and(|positions| positions.contains(&position))
    }

    /// Contract value of a pick in `round`
    pub fn rookie_salary(&self, round: u32) -> Salary {
        round
            .checked_sub(1)
            .and_then(|index| self.rookie_salaries.get(index as usize))
            .copied()
            .unwrap_or(self.min_salary)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.salary_cap.dollars <= 0 {
            return Err("salary_cap must be greater than 0".to_string());
        }

        if self.min_salary.is_negative() || self.min_salary > self.salary_cap {
            return Err("min_salary must be between 0 and salary_cap".to_string());
        }

        if self.faab_budget < 0 {
            return Err("faab_budget must not be negative".to_string());
        }

        if self.slots.starter + self.slots.bench == 0 {
            return Err("roster must allow at least one active slot".to_string());
        }

        let calendar = &self.calendar;
        if calendar.final_week == 0 {
            return Err("final_week must be at least 1".to_string());
        }

        if calendar.waiver_hours <= 0 {
            return Err("waiver_hours must be greater than 0".to_string());
        }

        if calendar.waiver_window.duration_hours <= 0 {
            return Err("waiver_window duration must be greater than 0".to_string());
        }

        if calendar.player_sanctuary_hours < 0
            || calendar.poach_window_hours <= calendar.player_sanctuary_hours
        {
            return Err("poach_window_hours must exceed player_sanctuary_hours".to_string());
        }

        if let DraftType::Timed { hours_per_pick } = calendar.draft.kind {
            if hours_per_pick <= 0 {
                return Err("hours_per_pick must be greater than 0".to_string());
            }
        }

        let windows = calendar.sanctuary_periods.iter().chain(calendar.rfa_period.iter());
        for window in windows {
            if window.end <= window.start {
                return Err(format!("window {} .. {} is empty", window.start, window.end));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(LeagueConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_poach_window() {
        let mut config = LeagueConfig::default();
        config.calendar.poach_window_hours = 12;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rookie_salary_falls_back_to_minimum() {
        let config = LeagueConfig::default();
        assert_eq!(config.rookie_salary(1), Salary::from_dollars(5));
        assert_eq!(config.rookie_salary(9), config.min_salary);
        assert_eq!(config.rookie_salary(0), config.min_salary);
    }

    #[test]
    fn test_slot_eligibility() {
        let config = LeagueConfig::default();
        assert!(config.accepts(SlotCategory::Bench, Position::DEF));
        assert!(!config.accepts(SlotCategory::PracticeSquad, Position::DEF));
    }

    #[test]
    fn test_waiver_period_of_week() {
        let calendar = SeasonCalendar::default();
        let window = calendar.waiver_period(2);
        assert_eq!(window.start, utc(2025, 9, 16, 0));
        assert_eq!(window.end, utc(2025, 9, 17, 12));
        assert!(window.contains(utc(2025, 9, 16, 0)));
        assert!(!window.contains(utc(2025, 9, 17, 12)));
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config: LeagueConfig =
            serde_json::from_str(r#"{"salary_cap": 250, "slots": {"bench": 3}}"#).unwrap();
        assert_eq!(config.salary_cap, Salary::from_dollars(250));
        assert_eq!(config.slots.bench, 3);
        assert_eq!(config.slots.starter, 9);
        assert_eq!(config.calendar.final_week, 17);
    }
}
