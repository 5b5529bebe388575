// End-to-end sync scenarios against in-memory backends and a SQLite cache

use chrono::NaiveDate;
use community_fund::{
    Contribution, ContributionDraft, FundConfig, FundError, MemoryKeyValueStore, MemorySheets, PaymentType,
    RemoteOutcome, RemoteStatus, Session, SheetsAdapter, SqliteKeyValueStore, SyncMode,
};

fn configured() -> FundConfig {
    FundConfig {
        spreadsheet_id: "community-fund-test".to_string(),
        api_key: Some("test-key".to_string()),
        ..FundConfig::default()
    }
}

fn chandrapur_draft() -> ContributionDraft {
    ContributionDraft {
        donor_name: "Test".to_string(),
        donor_contact: "123".to_string(),
        village: "Chandrapur".to_string(),
        locality: "Main Market".to_string(),
        amount: 1000,
        payment_type: Some(PaymentType::Cash),
        date: NaiveDate::from_ymd_opt(2024, 2, 1),
    }
}

fn is_chandrapur_test(c: &Contribution) -> bool {
    c.donor_name == "Test" && c.village == "Chandrapur" && c.amount == 1000
}

async fn provisioned_sheets() -> MemorySheets {
    let sheets = MemorySheets::new();
    let mut adapter = SheetsAdapter::new(sheets.clone(), &configured());
    assert_eq!(adapter.initialize().await, RemoteStatus::Available);
    adapter.initialize_sheets().await.unwrap();
    sheets
}

#[tokio::test]
async fn test_unset_credential_starts_local_only_with_seed_data() {
    let session = Session::start(FundConfig::default(), MemorySheets::new(), MemoryKeyValueStore::new()).await;

    assert_eq!(session.mode(), SyncMode::LocalOnly);
    let store = session.store();
    assert_eq!(store.contributions.len(), 4);
    assert_eq!(store.mentors.len(), 3);
    assert_eq!(store.villages.len(), 3);
    assert_eq!(store.users.len(), 9);
}

#[tokio::test]
async fn test_placeholder_credential_is_treated_as_unset() {
    let config = FundConfig {
        api_key: Some("YOUR_API_KEY".to_string()),
        ..configured()
    };
    let sheets = MemorySheets::new();

    let session = Session::start(config, sheets.clone(), MemoryKeyValueStore::new()).await;

    assert_eq!(session.mode(), SyncMode::LocalOnly);
    assert_eq!(sheets.write_count(), 0);
}

#[tokio::test]
async fn test_local_contribution_survives_fresh_session() {
    let kv = MemoryKeyValueStore::new();

    let mut session = Session::start(FundConfig::default(), MemorySheets::new(), kv.clone()).await;
    let (_, report) = session.submit_contribution(chandrapur_draft()).await.unwrap();
    assert_eq!(report.remote, RemoteOutcome::Skipped);
    assert!(report.persisted);
    drop(session);

    let fresh = Session::start(FundConfig::default(), MemorySheets::new(), kv).await;
    let found: Vec<&Contribution> = fresh
        .store()
        .query::<Contribution, _>(is_chandrapur_test)
        .collect();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].payment_type, PaymentType::Cash);
    assert_eq!(found[0].date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
}

#[tokio::test]
async fn test_sqlite_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("community-fund.db");

    {
        let kv = SqliteKeyValueStore::open(&path).unwrap();
        let mut session = Session::start(FundConfig::default(), MemorySheets::new(), kv).await;
        session.submit_contribution(chandrapur_draft()).await.unwrap();
        session.delete_mentor(1).await.unwrap();
    }

    let kv = SqliteKeyValueStore::open(&path).unwrap();
    let session = Session::start(FundConfig::default(), MemorySheets::new(), kv).await;

    assert_eq!(session.store().contributions.len(), 5);
    assert!(session.store().contributions.iter().any(is_chandrapur_test));
    assert_eq!(session.store().mentors.len(), 2);
}

#[tokio::test]
async fn test_remote_active_round_trip_through_sheet() {
    let sheets = provisioned_sheets().await;

    let mut first = Session::start(configured(), sheets.clone(), MemoryKeyValueStore::new()).await;
    assert_eq!(first.mode(), SyncMode::RemoteActive);
    assert!(first.store().contributions.is_empty());

    let (contribution, report) = first.submit_contribution(chandrapur_draft()).await.unwrap();
    assert_eq!(report.remote, RemoteOutcome::Mirrored);

    // A second device sees the same sheet
    let second = Session::start(configured(), sheets.clone(), MemoryKeyValueStore::new()).await;
    assert_eq!(second.store().get::<Contribution>(&contribution.id), Some(&contribution));
}

#[tokio::test]
async fn test_remote_failure_keeps_local_change() {
    let sheets = provisioned_sheets().await;
    let kv = MemoryKeyValueStore::new();
    let mut session = Session::start(configured(), sheets.clone(), kv.clone()).await;
    let writes_before = sheets.write_count();

    sheets.set_unreachable(true);
    let (contribution, report) = session.submit_contribution(chandrapur_draft()).await.unwrap();

    assert!(matches!(report.remote, RemoteOutcome::Failed(_)));
    assert!(report.persisted);
    assert_eq!(sheets.write_count(), writes_before);
    // Mode does not change on a failed write
    assert_eq!(session.mode(), SyncMode::RemoteActive);

    // Cache has it even though the sheet does not
    let offline = Session::start(FundConfig::default(), MemorySheets::new(), kv).await;
    assert!(offline.store().contributions.contains(&contribution.id));
}

#[tokio::test]
async fn test_header_only_sheets_hydrate_empty() {
    let sheets = provisioned_sheets().await;
    let session = Session::start(configured(), sheets, MemoryKeyValueStore::new()).await;

    assert!(session.store().contributions.is_empty());
    assert!(session.store().mentors.is_empty());
    assert_eq!(session.store().users.len(), 9);
}

#[tokio::test]
async fn test_update_by_key_missing_leaves_sheet_untouched() {
    let sheets = provisioned_sheets().await;
    let mut adapter = SheetsAdapter::new(sheets.clone(), &configured());
    adapter.initialize().await;
    let before = sheets.rows("Sheet1");
    let writes = sheets.write_count();

    let ghost = chandrapur_draft().into_contribution(424242).unwrap();
    let result = adapter.update_by_key(&ghost.id, &ghost).await;

    match result {
        Err(FundError::NotFound { key, .. }) => assert_eq!(key, "424242"),
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert_eq!(sheets.rows("Sheet1"), before);
    assert_eq!(sheets.write_count(), writes);
}

#[tokio::test]
async fn test_resync_moves_local_only_session_online() {
    let sheets = provisioned_sheets().await;
    sheets.set_unreachable(true);
    let mut session = Session::start(configured(), sheets.clone(), MemoryKeyValueStore::new()).await;
    assert_eq!(session.mode(), SyncMode::LocalOnly);
    assert_eq!(session.store().contributions.len(), 4);

    sheets.set_unreachable(false);
    assert_eq!(session.resync().await, SyncMode::RemoteActive);
    // Remote copy replaces the seed contributions
    assert!(session.store().contributions.is_empty());
}
