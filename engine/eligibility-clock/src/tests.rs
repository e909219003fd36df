//! Unit tests for the eligibility clock

use chrono::{DateTime, Duration, TimeZone, Utc};
use roster_ledger::{
    DraftType, LeagueConfig, Period, Salary, SlotCategory, TimeWindow, Transaction,
    TransactionKind,
};

use crate::{Clock, ClockError, EligibilityClock, FixedClock, PoachWindow, SystemClock};

fn utc(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, month, day, hour, 0, 0).unwrap()
}

fn eligibility() -> EligibilityClock {
    EligibilityClock::new(&LeagueConfig::default()).unwrap()
}

fn qualifying(kind: TransactionKind, at: DateTime<Utc>) -> Transaction {
    Transaction::new(
        1,
        1,
        10,
        kind,
        Salary::from_dollars(1),
        Some(SlotCategory::PracticeSquad),
        Period::new(2025, 3),
        at,
    )
}

#[cfg(test)]
mod clock_tests {
    use super::*;

    #[test]
    fn test_fixed_clock_is_settable() {
        let clock = FixedClock::new(utc(9, 1, 0));
        assert_eq!(clock.now(), utc(9, 1, 0));

        clock.advance(Duration::hours(30));
        assert_eq!(clock.now(), utc(9, 2, 6));

        clock.set(utc(10, 1, 0));
        assert_eq!(clock.now(), utc(10, 1, 0));
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = LeagueConfig::default();
        config.calendar.final_week = 0;
        assert!(matches!(EligibilityClock::new(&config), Err(ClockError::Config(_))));
    }
}

#[cfg(test)]
mod calendar_tests {
    use super::*;

    #[test]
    fn test_period_from_season_start() {
        let clock = eligibility();
        assert_eq!(clock.period(utc(8, 1, 0)), Period::new(2025, 0));
        assert_eq!(clock.period(utc(9, 4, 0)), Period::new(2025, 1));
        assert_eq!(clock.period(utc(9, 10, 23)), Period::new(2025, 1));
        assert_eq!(clock.period(utc(9, 11, 0)), Period::new(2025, 2));
    }

    #[test]
    fn test_season_lock_after_final_week() {
        let clock = eligibility();
        // Week 17 starts 2025-12-25; week 18 on 2026-01-01
        assert!(!clock.season_locked(utc(12, 31, 23)));
        assert!(clock.season_locked(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_waiver_period() {
        let clock = eligibility();
        assert!(clock.in_waiver_period(utc(9, 16, 6)));
        assert!(!clock.in_waiver_period(utc(9, 17, 12)));
        assert!(!clock.in_waiver_period(utc(9, 14, 0)));
        // No weekly waivers in the off-season
        assert!(!clock.in_waiver_period(utc(6, 3, 0)));

        let window = clock.current_waiver_period(utc(9, 16, 6)).unwrap();
        assert_eq!(window.end, utc(9, 17, 12));
    }

    #[test]
    fn test_on_waivers_after_release() {
        let clock = eligibility();
        let released = utc(10, 1, 12);
        assert!(clock.on_waivers(released, utc(10, 2, 11)));
        assert!(!clock.on_waivers(released, utc(10, 2, 12)));
        assert_eq!(clock.waivers_clear_at(released), utc(10, 2, 12));
    }

    #[test]
    fn test_free_agency_and_rfa() {
        let clock = eligibility();
        assert!(!clock.free_agency_open(utc(5, 14, 23)));
        assert!(clock.free_agency_open(utc(5, 15, 0)));

        assert!(clock.in_rfa_period(utc(3, 5, 0)));
        assert!(!clock.in_rfa_period(utc(3, 15, 0)));
        assert_eq!(clock.rfa_period_end(), Some(utc(3, 15, 0)));
    }

    #[test]
    fn test_trade_deadline_until_season_end() {
        let clock = eligibility();
        assert!(!clock.trading_closed(utc(11, 19, 23)));
        assert!(clock.trading_closed(utc(11, 20, 0)));
        assert!(clock.trade_deadline_passed(Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap()));
        assert!(!clock.trading_closed(Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_league_sanctuary_period() {
        let mut config = LeagueConfig::default();
        config.calendar.sanctuary_periods = vec![TimeWindow::new(utc(8, 1, 0), utc(8, 8, 0))];
        let clock = EligibilityClock::new(&config).unwrap();

        assert!(clock.in_sanctuary_period(utc(8, 4, 0)));
        assert!(!clock.in_sanctuary_period(utc(8, 8, 0)));
    }
}

#[cfg(test)]
mod draft_tests {
    use super::*;

    #[test]
    fn test_timed_draft_fallback() {
        let clock = eligibility();
        // Draft starts 2025-05-01 16:00 with 8 hours per pick
        assert!(!clock.draft_started(utc(5, 1, 15)));
        assert!(clock.draft_fallback_open(1, utc(5, 1, 16)));
        assert!(!clock.draft_fallback_open(5, utc(5, 2, 23)));
        assert!(clock.draft_fallback_open(5, utc(5, 3, 0)));
    }

    #[test]
    fn test_sequential_draft_has_no_fallback() {
        let mut config = LeagueConfig::default();
        config.calendar.draft.kind = DraftType::Sequential;
        let clock = EligibilityClock::new(&config).unwrap();
        assert!(!clock.draft_fallback_open(2, utc(12, 1, 0)));
    }
}

#[cfg(test)]
mod poach_tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_poach_window_boundaries() {
        let clock = eligibility();
        let tx = qualifying(TransactionKind::RosterDeactivate, utc(10, 1, 0));

        assert_eq!(clock.poach_window(&tx, utc(10, 1, 12)), PoachWindow::Sanctuary);
        assert!(clock.player_in_sanctuary(&tx, utc(10, 1, 23)));
        assert_eq!(clock.poach_window(&tx, utc(10, 2, 0)), PoachWindow::Open);
        assert_eq!(clock.poach_window(&tx, utc(10, 2, 6)), PoachWindow::Open);
        assert_eq!(clock.poach_window(&tx, utc(10, 3, 0)), PoachWindow::Open);
        assert_eq!(clock.poach_window(&tx, utc(10, 3, 2)), PoachWindow::Expired);
        assert_eq!(clock.poach_resolves_at(&tx), utc(10, 3, 0));
    }

    #[test]
    fn test_only_qualifying_kinds_open_window() {
        let clock = eligibility();
        let tx = qualifying(TransactionKind::RosterAdd, utc(10, 1, 0));
        assert_eq!(clock.poach_window(&tx, utc(10, 2, 6)), PoachWindow::NotEligible);

        let tx = qualifying(TransactionKind::PracticeAdd, utc(10, 1, 0));
        assert_eq!(clock.poach_window(&tx, utc(10, 2, 6)), PoachWindow::Open);
    }

    proptest! {
        #[test]
        fn prop_poach_window_follows_elapsed_hours(hours in 0i64..200) {
            let clock = eligibility();
            let tx = qualifying(TransactionKind::Draft, utc(10, 1, 0));
            let window = clock.poach_window(&tx, tx.timestamp + Duration::hours(hours));

            let expected = if hours < 24 {
                PoachWindow::Sanctuary
            } else if hours > 48 {
                PoachWindow::Expired
            } else {
                PoachWindow::Open
            };
            prop_assert_eq!(window, expected);
        }
    }
}
