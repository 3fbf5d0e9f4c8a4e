//! Serialized service front with an on-disk activity store.

use std::sync::Arc;

use gamepool::scenario::{run_scenario, Scenario};
use gamepool::service::GamePoolService;
use gamepool::store::GamePoolDb;
use gamepool::threshold::seed_commitment;
use gamepool::{
    Address, Amount, EngineConfig, EngineError, GamePool, ManualClock, PaperValueLedger,
    RoundState,
};

const FINNEY: Amount = 1_000_000_000_000_000;

fn temp_db() -> (tempfile::TempDir, Arc<GamePoolDb>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activity.db");
    let db = GamePoolDb::new(path.to_str().unwrap()).unwrap();
    (dir, Arc::new(db))
}

#[tokio::test]
async fn service_round_trip_persists_every_event() {
    let (_dir, db) = temp_db();
    let clock = ManualClock::new(0);
    let mut pool = GamePool::new(EngineConfig::default(), PaperValueLedger::new(), clock.clone());
    let alice = Address::new("alice");
    let bob = Address::new("bob");
    pool.custody_mut().credit(&alice, 50 * FINNEY).unwrap();
    pool.custody_mut().credit(&bob, 50 * FINNEY).unwrap();
    let params = pool.default_params(100, 600, vec!["BTC".into(), "ETH".into(), "LTC".into()], vec![5]);

    let service = GamePoolService::new(pool, Some(db.clone()));
    let id = service.create_round(params).await.unwrap();
    service
        .commit_seed(id, &seed_commitment(b"svc"))
        .await
        .unwrap();
    service
        .deliver_start_rates(id, vec![100, 100, 100])
        .await
        .unwrap();

    clock.set(100);
    assert_eq!(service.state(id).await, RoundState::Open);
    service.place_bet(id, 0, 10 * FINNEY, &alice).await.unwrap();
    service.place_bet(id, 1, 20 * FINNEY, &bob).await.unwrap();

    // Rejected calls surface the engine error and write nothing
    let rejected = service.place_bet(id, 2, 10 * FINNEY, &bob).await;
    assert!(matches!(rejected, Err(EngineError::AlreadyBet { .. })));

    clock.set(700);
    service
        .deliver_end_rates(id, vec![150, 90, 100])
        .await
        .unwrap();
    service.reveal_threshold(id, b"svc").await.unwrap();
    service.close(id).await.unwrap();

    let owed = service.calculate_award_amount(id, &alice).await.unwrap();
    assert_eq!(service.claim_or_err(id, &alice).await.unwrap(), owed);
    assert!(service.claim_or_err(id, &alice).await.is_err());

    let records = db.list_activity(100, Some(id)).await.unwrap();
    let kinds: Vec<&str> = records.iter().rev().map(|r| r.kind.as_str()).collect();
    assert_eq!(
        kinds,
        vec![
            "round_created",
            "seed_committed",
            "start_rates_delivered",
            "bet_placed",
            "bet_placed",
            "end_rates_delivered",
            "threshold_finalized",
            "round_closed",
            "award_claimed",
        ]
    );
    let claim = &records[0];
    assert_eq!(claim.bettor.as_deref(), Some("alice"));
    assert_eq!(claim.amount, Some(owed.to_string()));
}

#[tokio::test]
async fn concurrent_claims_pay_once() {
    let clock = ManualClock::new(0);
    let mut pool = GamePool::new(EngineConfig::default(), PaperValueLedger::new(), clock.clone());
    let alice = Address::new("alice");
    pool.custody_mut().credit(&alice, 10 * FINNEY).unwrap();
    let params = pool.default_params(10, 600, vec!["A".into(), "B".into()], vec![0]);
    let id = pool.create_round(params).unwrap();
    pool.commit_seed(id, &seed_commitment(b"c")).unwrap();
    pool.deliver_start_rates(id, &[10, 10]).unwrap();
    clock.set(10);
    pool.place_bet(id, 0, 10 * FINNEY, &alice).unwrap();
    clock.set(700);
    pool.deliver_end_rates(id, &[20, 10]).unwrap();
    pool.reveal_threshold(id, b"c").unwrap();
    pool.close(id).unwrap();

    let service = GamePoolService::new(pool, None);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let alice = alice.clone();
            tokio::spawn(async move { service.claim(id, &alice).await })
        })
        .collect();

    let mut paid = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            paid += 1;
        }
    }
    assert_eq!(paid, 1);
}

#[tokio::test]
async fn failed_activity_write_keeps_claim_and_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activity.db");
    let path = path.to_str().unwrap();
    let db = Arc::new(GamePoolDb::new(path).unwrap());

    let clock = ManualClock::new(0);
    let mut pool = GamePool::new(EngineConfig::default(), PaperValueLedger::new(), clock.clone());
    let alice = Address::new("alice");
    pool.custody_mut().credit(&alice, 10 * FINNEY).unwrap();
    let params = pool.default_params(10, 600, vec!["A".into(), "B".into()], vec![0]);
    let id = pool.create_round(params).unwrap();
    pool.commit_seed(id, &seed_commitment(b"w")).unwrap();
    pool.deliver_start_rates(id, &[10, 10]).unwrap();
    clock.set(10);
    pool.place_bet(id, 0, 10 * FINNEY, &alice).unwrap();
    clock.set(700);
    pool.deliver_end_rates(id, &[20, 10]).unwrap();
    pool.reveal_threshold(id, b"w").unwrap();
    pool.close(id).unwrap();
    pool.drain_events();

    let service = GamePoolService::new(pool, Some(db.clone()));
    rusqlite::Connection::open(path)
        .unwrap()
        .execute("DROP TABLE gamepool_activity", [])
        .unwrap();

    // The payout stands even though the store rejected the write
    let paid = service.claim(id, &alice).await.unwrap();
    assert_eq!(paid, 9_950 * FINNEY / 1_000);
    assert!(matches!(
        service.claim(id, &alice).await,
        Err(EngineError::AlreadyClaimed { .. })
    ));
    assert!(service.flush().await.is_err());

    // Reopening recreates the table; the buffered claim event lands then
    GamePoolDb::new(path).unwrap();
    assert_eq!(service.flush().await.unwrap(), 1);
    let records = db.list_activity(10, Some(id)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, "award_claimed");
    assert_eq!(records[0].amount, Some(paid.to_string()));
}

#[tokio::test]
async fn scenario_file_runs_and_records() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join("five_coins.toml");
    let scenario = Scenario::load(&path).unwrap();
    let report = run_scenario(&scenario).unwrap();

    assert_eq!(report.changes, vec![100, 10, 0, -10, 20]);
    assert_eq!(report.total_net_stake, 99_500_000_000_000_000);
    let micro = 1_000_000_000_000;
    assert_eq!(report.awards[&Address::new("0xa7")], 44_775 * micro);
    assert_eq!(report.awards[&Address::new("0xa8")], 49_750 * micro);
    assert_eq!(report.awards[&Address::new("0xa9")], 4_975 * micro);
    assert_eq!(report.awards[&Address::new("0xa1")], 0);
    assert_eq!(report.pool_balance, 0);

    let (_dir, db) = temp_db();
    db.insert_events(&report.events).await.unwrap();
    let records = db.list_activity(1000, Some(report.round)).await.unwrap();
    assert_eq!(records.len(), report.events.len());
}
