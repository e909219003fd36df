//! Service tests: configuration, seed import and the waiver scheduler

use crate::config::{load_config, ServiceConfig};
use crate::seed::{import, LeagueSeed};
use crate::service::ServiceState;
use chrono::{Duration, TimeZone, Utc};
use claim_engine::{Actor, ClaimRequest};
use eligibility_clock::FixedClock;
use roster_ledger::{ClaimKind, ClaimStatus, LeagueStore};
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

const SEED: &str = r#"{
    "league": 7,
    "config": { "season_year": 2025, "faab_budget": 100 },
    "teams": [
        { "id": 1, "name": "Ravens", "owner": 10, "waiver_priority": 2 },
        { "id": 2, "name": "Wolves", "owner": 20, "waiver_priority": 1 }
    ],
    "players": [
        { "id": 40, "name": "Slot Receiver", "position": "WR", "nfl_team": "KC" },
        { "id": 41, "name": "Backup Back", "position": "RB", "nfl_team": "BUF" }
    ],
    "picks": [
        { "round": 1, "overall": 1, "owner": 2 },
        { "round": 1, "overall": 2, "owner": 2, "original_team": 1 }
    ],
    "kickoffs": [
        { "year": 2025, "week": 1, "nfl_team": "KC", "kickoff": "2025-09-05T00:20:00Z" }
    ]
}"#;

fn service_config(dir: &TempDir) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.service.data_dir = dir.path().to_path_buf();
    config.service.waiver_run_interval_secs = 1;
    config
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ServiceConfig::default();
        assert_ok!(config.validate());
        assert_eq!(config.waiver_interval(), std::time::Duration::from_secs(300));
        assert_eq!(config.journal_config().max_file_size, 64 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ServiceConfig::default();
        config.logging.format = "xml".into();
        assert_err!(config.validate());

        let mut config = ServiceConfig::default();
        config.service.waiver_run_interval_secs = 0;
        assert_err!(config.validate());

        let mut config = ServiceConfig::default();
        config.logging.level = "loud".into();
        assert_err!(config.validate());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[service]\nwaiver_run_interval_secs = 60\n\n[logging]\nformat = \"json\"\n\n\
             [journal]\nfsync_every_write = false"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.service.waiver_run_interval_secs, 60);
        assert_eq!(config.logging.format, "json");
        assert!(!config.journal.fsync_every_write);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert_err!(load_config(Some(&dir.path().join("absent.toml"))));
    }

    #[test]
    fn test_environment_overrides() {
        std::env::set_var("LEAGUE_SERVICE__BROADCAST_CAPACITY", "32");
        let config = load_config(None);
        std::env::remove_var("LEAGUE_SERVICE__BROADCAST_CAPACITY");

        assert_eq!(config.unwrap().service.broadcast_capacity, 32);
    }

    #[test]
    fn test_printed_config_reloads() {
        let mut config = ServiceConfig::default();
        config.logging.file = Some("logs/league.log".into());
        let printed = config.to_toml().unwrap();

        let reloaded: ServiceConfig = toml::from_str(&printed).unwrap();
        assert_eq!(reloaded, config);
    }
}

#[cfg(test)]
mod seed_tests {
    use super::*;

    #[test]
    fn test_seed_parses_with_defaults() {
        let seed = LeagueSeed::from_json(SEED).unwrap();
        assert_eq!(seed.league, 7);
        assert_eq!(seed.config.faab_budget, 100);
        assert_eq!(seed.players[1].rookie_year, None);
        assert_eq!(seed.picks[0].original_team, None);
    }

    #[test]
    fn test_seed_validation() {
        let mut seed = LeagueSeed::from_json(SEED).unwrap();
        seed.teams[1].waiver_priority = 2;
        assert_err!(seed.validate());

        let mut seed = LeagueSeed::from_json(SEED).unwrap();
        seed.picks[1].owner = 9;
        assert_err!(seed.validate());

        let mut seed = LeagueSeed::from_json(SEED).unwrap();
        seed.teams.clear();
        assert_err!(seed.validate());
    }

    #[tokio::test]
    async fn test_import_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let state = ServiceState::new(service_config(&dir)).await.unwrap();
        let seed = LeagueSeed::from_json(SEED).unwrap();

        let first = import(state.store.as_ref(), &seed).await.unwrap();
        assert_eq!((first.teams, first.players, first.picks, first.kickoffs), (2, 2, 2, 1));

        let second = import(state.store.as_ref(), &seed).await.unwrap();
        assert_eq!(second.picks, 0);

        let store = state.store.as_ref();
        assert_eq!(store.leagues().await.unwrap(), vec![7]);
        assert_eq!(store.teams(7).await.unwrap().len(), 2);
        let picks = store.draft_picks(7, 2025).await.unwrap();
        assert_eq!(picks.len(), 2);
        assert_eq!(picks.iter().find(|p| p.overall == 2).unwrap().original_team, 1);
        assert_eq!(store.kickoffs(2025, 1).await.unwrap().len(), 1);
    }
}

#[cfg(test)]
mod service_tests {
    use super::*;

    #[tokio::test]
    async fn test_waiver_run_survives_restart() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap()));

        let claim = {
            let state =
                ServiceState::new_with_clock(service_config(&dir), clock.clone()).await.unwrap();
            import(state.store.as_ref(), &LeagueSeed::from_json(SEED).unwrap()).await.unwrap();

            let actor = Actor::Team { user: 10, team: 1 };
            let claim = state
                .engine
                .submit_claim(&actor, ClaimRequest::new(1, 40, ClaimKind::FreeAgency))
                .await
                .unwrap();

            // Not ready until a full waiver period has passed
            assert!(state.run_waivers_once(false).await.unwrap().is_empty());

            clock.advance(Duration::hours(25));
            let reports = state.run_waivers_once(false).await.unwrap();
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].won, vec![claim.id]);
            assert_eq!(state.engine.metrics().claims_won, 1);

            assert_ok!(state.shutdown());
            claim
        };

        let state = ServiceState::new_with_clock(service_config(&dir), clock).await.unwrap();
        let stored = state.store.claim(claim.id).await.unwrap();
        assert_eq!(stored.status(), ClaimStatus::Succeeded);
        assert_eq!(state.store.ledger(7, 2025).await.unwrap().len(), 1);

        // Nothing left to do after recovery
        assert!(state.run_waivers_once(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(ServiceState::new(service_config(&dir)).await.unwrap());
        let (tx, rx) = tokio::sync::watch::channel(false);

        let handle = {
            let state = state.clone();
            tokio::spawn(async move { state.run_scheduler(rx).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let stopped = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        assert_ok!(assert_ok!(stopped));
        assert_ok!(state.shutdown());
    }
}
