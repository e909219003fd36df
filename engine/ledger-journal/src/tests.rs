//! Journal durability tests

use crate::{read_entries, JournalConfig, JournaledStore};
use chrono::{TimeZone, Utc};
use roster_ledger::{
    ClaimFilter, ClaimKind, ClaimResolution, ClaimUpdate, CommitBatch, Guard, LeagueConfig,
    LeagueStore, Period, Position, Player, Salary, SlotCategory, StoreError, StoreMutation, Team,
    Transaction, TransactionKind, WaiverClaim,
};
use std::io::Write;
use tempfile::TempDir;

fn config(dir: &TempDir) -> JournalConfig {
    JournalConfig { fsync_every_write: false, ..JournalConfig::new(dir.path()) }
}

fn claim(team: i64, player: i64) -> WaiverClaim {
    WaiverClaim {
        id: 0,
        league: 1,
        team,
        player,
        kind: ClaimKind::FreeAgency,
        bid: Some(5),
        priority_order: 1,
        releases: vec![],
        super_priority: false,
        year: 2025,
        week: 2,
        submitted_at: Utc.with_ymd_and_hms(2025, 9, 12, 0, 0, 0).unwrap(),
        processed_at: None,
        cancelled_at: None,
        outcome: None,
        reason: None,
    }
}

async fn seed(store: &JournaledStore) {
    store.put_league_config(1, LeagueConfig::default()).await.unwrap();
    store
        .upsert_team(Team { id: 1, league: 1, name: "Gophers".into(), owner: 100, waiver_priority: 1 })
        .await
        .unwrap();
    store
        .upsert_player(Player {
            id: 10,
            name: "Test Receiver".into(),
            position: Position::WR,
            nfl_team: Some("KC".into()),
            rookie_year: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reopen_replays_every_mutation() {
    let dir = TempDir::new().unwrap();

    {
        let store = JournaledStore::open(config(&dir)).await.unwrap();
        seed(&store).await;
        let id = store.insert_claim(claim(1, 10)).await.unwrap();

        let mut batch = CommitBatch::new(1);
        batch.guards = vec![Guard::ClaimPending(id)];
        batch.transactions = vec![Transaction::new(
            1,
            1,
            10,
            TransactionKind::RosterAdd,
            Salary::from_dollars(1),
            Some(SlotCategory::Bench),
            Period::new(2025, 2),
            Utc.with_ymd_and_hms(2025, 9, 13, 0, 0, 0).unwrap(),
        )];
        batch.claim_updates = vec![ClaimUpdate {
            claim: id,
            resolution: ClaimResolution::Cancelled { reason: "test".into() },
            at: Utc.with_ymd_and_hms(2025, 9, 13, 0, 0, 0).unwrap(),
        }];
        store.commit(batch).await.unwrap();
        assert_eq!(store.journal().sequence(), 5);
    }

    let store = JournaledStore::open(config(&dir)).await.unwrap();
    assert_eq!(store.leagues().await.unwrap(), vec![1]);
    assert_eq!(store.team(1).await.unwrap().name, "Gophers");
    assert_eq!(store.ledger(1, 2025).await.unwrap().len(), 1);
    assert!(store.claims(1, &ClaimFilter::pending()).await.unwrap().is_empty());

    // Ids continue after the replayed ones
    assert_eq!(store.insert_claim(claim(1, 10)).await.unwrap(), 2);
    assert_eq!(store.journal().sequence(), 6);
}

#[tokio::test]
async fn test_rejected_commit_is_not_journaled() {
    let dir = TempDir::new().unwrap();
    let store = JournaledStore::open(config(&dir)).await.unwrap();
    seed(&store).await;

    let mut batch = CommitBatch::new(1);
    batch.guards = vec![Guard::ClaimPending(42)];
    let err = store.commit(batch).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(store.journal().sequence(), 3);
    assert_eq!(read_entries(store.journal().dir()).unwrap().len(), 3);
}

#[tokio::test]
async fn test_torn_tail_is_dropped() {
    let dir = TempDir::new().unwrap();
    {
        let store = JournaledStore::open(config(&dir)).await.unwrap();
        seed(&store).await;
        store.flush().unwrap();

        let path = std::fs::read_dir(store.journal().dir())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        write!(file, "{{\"id\":\"trunc").unwrap();
    }

    let store = JournaledStore::open(config(&dir)).await.unwrap();
    assert_eq!(store.journal().sequence(), 3);
    assert_eq!(store.player(10).await.unwrap().position, Position::WR);

    // Writing after recovery starts a new file and stays readable
    store.insert_claim(claim(1, 10)).await.unwrap();
    drop(store);
    let store = JournaledStore::open(config(&dir)).await.unwrap();
    assert_eq!(store.journal().sequence(), 4);
}

#[tokio::test]
async fn test_rotation_keeps_sequence_order() {
    let dir = TempDir::new().unwrap();
    let config = JournalConfig { max_file_size: 256, ..config(&dir) };

    {
        let store = JournaledStore::open(config.clone()).await.unwrap();
        seed(&store).await;
        for player in 20..30 {
            store.insert_claim(claim(1, player)).await.unwrap();
        }
    }

    let files = std::fs::read_dir(dir.path().join("journal")).unwrap().count();
    assert!(files > 1);

    let store = JournaledStore::open(config).await.unwrap();
    assert_eq!(store.claims(1, &ClaimFilter::default()).await.unwrap().len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_replay_in_commit_order() {
    let dir = TempDir::new().unwrap();
    let ids = {
        let store = JournaledStore::open(config(&dir)).await.unwrap();
        seed(&store).await;

        let mut handles = Vec::new();
        for player in 20..36 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert_claim(claim(1, player)).await.unwrap()
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        ids
    };
    assert_eq!(ids, (1..=16).collect::<Vec<_>>());

    // Sequence order on disk matches the ids handed out under the store lock
    let entries = read_entries(&dir.path().join("journal")).unwrap();
    let sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (1..=19).collect::<Vec<_>>());
    let journaled: Vec<u64> = entries
        .iter()
        .filter_map(|e| match &e.mutation {
            StoreMutation::InsertClaim { claim } => Some(claim.id),
            _ => None,
        })
        .collect();
    assert_eq!(journaled, ids);

    let store = JournaledStore::open(config(&dir)).await.unwrap();
    let mut replayed: Vec<_> =
        store.claims(1, &ClaimFilter::default()).await.unwrap().into_iter().map(|c| c.id).collect();
    replayed.sort_unstable();
    assert_eq!(replayed, ids);
}

#[test]
fn test_invalid_config() {
    let config = JournalConfig { max_file_size: 0, ..Default::default() };
    assert!(config.validate().is_err());
}
