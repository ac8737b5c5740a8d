//! Save coordinator scenarios: whole-collection gating, removal, type
//! changes, superseded saves and persistence failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use credsync_core::{
    AccountRecord, AccountType, ChannelNotifier, CycleOutcome, FieldUpdate, MemoryGateway,
    NoopNotifier, PersistenceError, PersistenceGateway, PersistenceResult, PersistenceSettings,
    RecordField, SaveCoordinator, SaveError, SaveEvent, SaveState,
};

async fn start_with(gateway: &MemoryGateway) -> SaveCoordinator {
    SaveCoordinator::start(
        Arc::new(gateway.clone()),
        Arc::new(NoopNotifier),
        &PersistenceSettings::default(),
    )
    .await
    .expect("coordinator should start")
}

/// Gateway whose writes take a while and which tracks overlapping calls
#[derive(Default)]
struct SlowGateway {
    inner: MemoryGateway,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    loads: AtomicUsize,
}

#[async_trait]
impl PersistenceGateway for SlowGateway {
    async fn load(&self) -> PersistenceResult<Vec<AccountRecord>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load().await
    }

    async fn replace(&self, records: &[AccountRecord]) -> PersistenceResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = self.inner.replace(records).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn gateway_id(&self) -> &'static str {
        "slow"
    }
}

/// Gateway that fails a fixed number of writes before succeeding
struct FlakyGateway {
    inner: MemoryGateway,
    failures_left: AtomicUsize,
}

#[async_trait]
impl PersistenceGateway for FlakyGateway {
    async fn load(&self) -> PersistenceResult<Vec<AccountRecord>> {
        self.inner.load().await
    }

    async fn replace(&self, records: &[AccountRecord]) -> PersistenceResult<()> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PersistenceError::Unavailable("disk full".to_string()));
        }
        self.inner.replace(records).await
    }

    fn gateway_id(&self) -> &'static str {
        "flaky"
    }
}

/// Gateway whose load always fails
struct BrokenGateway;

#[async_trait]
impl PersistenceGateway for BrokenGateway {
    async fn load(&self) -> PersistenceResult<Vec<AccountRecord>> {
        Err(PersistenceError::Unavailable("offline".to_string()))
    }

    async fn replace(&self, _records: &[AccountRecord]) -> PersistenceResult<()> {
        Err(PersistenceError::Unavailable("offline".to_string()))
    }

    fn gateway_id(&self) -> &'static str {
        "broken"
    }
}

// ========== Whole-collection gating ==========

#[tokio::test]
async fn invalid_record_blocks_saving_valid_edits() {
    let valid = AccountRecord::local("alice", "secret");
    let invalid = AccountRecord::local("bob", "");
    let gateway = MemoryGateway::with_records(vec![valid.clone(), invalid.clone()]);
    let mut coordinator = start_with(&gateway).await;

    coordinator
        .update_field(0, FieldUpdate::Login("alicia".to_string()))
        .unwrap();
    let outcome = coordinator.commit_field(0, RecordField::Login).unwrap();

    match outcome {
        CycleOutcome::Rejected(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(
                errors.get(1, RecordField::Password),
                Some("password is required for local accounts")
            );
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(coordinator.last_cycle(), Some(SaveState::RejectedInvalid));
    assert_eq!(coordinator.state(), SaveState::Idle);

    coordinator.flush().await.unwrap();
    assert_eq!(gateway.replace_count(), 0);
    assert_eq!(gateway.stored().await, vec![valid, invalid]);

    // Fixing the other record releases both edits
    coordinator
        .update_field(1, FieldUpdate::Password(Some("hunter".to_string())))
        .unwrap();
    let outcome = coordinator.commit_field(1, RecordField::Password).unwrap();
    assert!(outcome.is_queued());
    assert!(coordinator.errors().is_empty());

    coordinator.flush().await.unwrap();
    let stored = gateway.stored().await;
    assert_eq!(stored[0].login, "alicia");
    assert_eq!(stored[1].password.as_deref(), Some("hunter"));
}

#[tokio::test]
async fn new_empty_record_blocks_saves_until_filled() {
    let gateway = MemoryGateway::with_records(vec![AccountRecord::local("alice", "x")]);
    let mut coordinator = start_with(&gateway).await;

    coordinator.add_record();
    assert!(!coordinator.request_save().is_queued());

    coordinator
        .update_field(1, FieldUpdate::Login("carol".to_string()))
        .unwrap();
    coordinator
        .update_field(1, FieldUpdate::Password(Some("pw".to_string())))
        .unwrap();
    coordinator
        .update_field(1, FieldUpdate::TagsText("ops;db".to_string()))
        .unwrap();
    let outcome = coordinator.commit_field(1, RecordField::Tags).unwrap();
    assert_eq!(outcome.generation(), Some(1));

    coordinator.flush().await.unwrap();
    let stored = gateway.stored().await;
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].login, "carol");
    assert_eq!(stored[1].tags.len(), 2);
}

#[tokio::test]
async fn committed_invalid_tags_are_reported_at_their_path() {
    let gateway = MemoryGateway::with_records(vec![AccountRecord::local("alice", "x")]);
    let mut coordinator = start_with(&gateway).await;

    coordinator
        .update_field(0, FieldUpdate::TagsText("prod;db2".to_string()))
        .unwrap();
    let outcome = coordinator.commit_field(0, RecordField::Tags).unwrap();

    assert!(matches!(outcome, CycleOutcome::FieldInvalid(_)));
    assert_eq!(
        coordinator.errors().get(0, RecordField::Tags),
        Some("tag \"db2\" may contain only letters and ';'")
    );
    coordinator.flush().await.unwrap();
    assert_eq!(gateway.replace_count(), 0);
}

// ========== Removal ==========

#[tokio::test]
async fn removing_invalid_record_saves_remaining_collection() {
    let a = AccountRecord::local("alice", "x");
    let broken = AccountRecord::local("", "");
    let c = AccountRecord::directory("carol");
    let gateway = MemoryGateway::with_records(vec![a.clone(), broken, c.clone()]);
    let mut coordinator = start_with(&gateway).await;

    assert!(!coordinator.request_save().is_queued());

    let outcome = coordinator.remove_record(1).unwrap();
    assert!(outcome.is_queued());

    coordinator.flush().await.unwrap();
    assert_eq!(gateway.stored().await, vec![a, c]);
    assert_eq!(gateway.replace_count(), 1);
}

#[tokio::test]
async fn error_paths_follow_records_after_removal() {
    let gateway = MemoryGateway::with_records(vec![
        AccountRecord::local("", "x"),
        AccountRecord::local("bob", "x"),
        AccountRecord::local("carol", ""),
    ]);
    let mut coordinator = start_with(&gateway).await;
    let carol_key = coordinator.collection().key_at(2).unwrap();

    coordinator.request_save();
    assert!(coordinator.errors().get(0, RecordField::Login).is_some());
    assert!(coordinator.errors().get(2, RecordField::Password).is_some());

    let outcome = coordinator.remove_record(0).unwrap();
    assert!(!outcome.is_queued());

    let errors = coordinator.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors.get(1, RecordField::Password).is_some());
    assert_eq!(coordinator.collection().position_of(carol_key), Some(1));
}

#[tokio::test]
async fn remove_out_of_bounds_is_an_error() {
    let gateway = MemoryGateway::new();
    let mut coordinator = start_with(&gateway).await;
    assert!(matches!(
        coordinator.remove_record(0),
        Err(SaveError::Collection(_))
    ));
}

// ========== Type changes ==========

#[tokio::test]
async fn change_to_directory_nulls_password_and_saves() {
    let bob = AccountRecord::local("bob", "x");
    let id = bob.id;
    let gateway = MemoryGateway::with_records(vec![bob]);
    let mut coordinator = start_with(&gateway).await;

    let outcome = coordinator.change_type(0, AccountType::Directory).unwrap();
    assert!(outcome.is_queued());

    let record = coordinator.collection().get(0).unwrap();
    assert_eq!(record.password, None);
    assert_eq!(record.kind, AccountType::Directory);

    coordinator.flush().await.unwrap();
    let stored = gateway.stored().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, id);
    assert_eq!(stored[0].password, None);
    assert_eq!(stored[0].kind, AccountType::Directory);
}

#[tokio::test]
async fn change_to_local_requires_password_again() {
    let gateway = MemoryGateway::with_records(vec![AccountRecord::directory("alice")]);
    let mut coordinator = start_with(&gateway).await;

    let outcome = coordinator.change_type(0, AccountType::Local).unwrap();
    match outcome {
        CycleOutcome::Rejected(errors) => {
            assert!(errors.get(0, RecordField::Password).is_some());
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    coordinator
        .update_field(0, FieldUpdate::Password(Some("pw".to_string())))
        .unwrap();
    assert!(coordinator.commit_field(0, RecordField::Password).unwrap().is_queued());
}

// ========== Identity ==========

#[tokio::test]
async fn entry_keys_and_ids_survive_edits_and_removals() {
    let gateway = MemoryGateway::with_records(vec![
        AccountRecord::local("a", "x"),
        AccountRecord::local("b", "x"),
        AccountRecord::local("c", "x"),
    ]);
    let mut coordinator = start_with(&gateway).await;
    let c_key = coordinator.collection().key_at(2).unwrap();
    let c_id = coordinator.collection().get(2).unwrap().id;

    coordinator
        .update_field(2, FieldUpdate::Login("charlie".to_string()))
        .unwrap();
    coordinator.remove_record(0).unwrap();
    coordinator.remove_record(0).unwrap();

    let collection = coordinator.collection();
    assert_eq!(collection.len(), 1);
    assert_eq!(collection.key_at(0).unwrap(), c_key);
    let record = collection.get_by_key(c_key).unwrap();
    assert_eq!(record.id, c_id);
    assert_eq!(record.login, "charlie");
}

// ========== Concurrency ==========

#[tokio::test]
async fn superseded_saves_never_overlap_and_store_latest() {
    let gateway = Arc::new(SlowGateway {
        inner: MemoryGateway::with_records(vec![AccountRecord::local("v0", "x")]),
        delay: Duration::from_millis(50),
        ..SlowGateway::default()
    });
    let mut coordinator = SaveCoordinator::start(
        gateway.clone(),
        Arc::new(NoopNotifier),
        &PersistenceSettings::default(),
    )
    .await
    .unwrap();

    coordinator
        .update_field(0, FieldUpdate::Login("v1".to_string()))
        .unwrap();
    coordinator.request_save();

    // Let the first write start
    tokio::time::sleep(Duration::from_millis(10)).await;

    for login in ["v2", "v3", "v4"] {
        coordinator
            .update_field(0, FieldUpdate::Login(login.to_string()))
            .unwrap();
        coordinator.commit_field(0, RecordField::Login).unwrap();
    }

    let report = coordinator.flush().await.unwrap();
    assert_eq!(report.generation, 4);
    assert!(report.is_saved());

    assert_eq!(gateway.inner.stored().await[0].login, "v4");
    assert_eq!(gateway.max_in_flight.load(Ordering::SeqCst), 1);
    assert!(gateway.inner.replace_count() < 4);
    assert_eq!(gateway.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn debounce_collapses_rapid_saves() {
    let gateway = MemoryGateway::with_records(vec![AccountRecord::local("v0", "x")]);
    let settings = PersistenceSettings { debounce_ms: 30 };
    let mut coordinator =
        SaveCoordinator::start(Arc::new(gateway.clone()), Arc::new(NoopNotifier), &settings)
            .await
            .unwrap();

    for login in ["v1", "v2", "v3"] {
        coordinator
            .update_field(0, FieldUpdate::Login(login.to_string()))
            .unwrap();
        coordinator.request_save();
    }

    coordinator.flush().await.unwrap();
    assert_eq!(gateway.replace_count(), 1);
    assert_eq!(gateway.stored().await[0].login, "v3");
}

// ========== Persistence failures ==========

#[tokio::test]
async fn failed_write_is_reported_and_can_be_retried() {
    let gateway = Arc::new(FlakyGateway {
        inner: MemoryGateway::with_records(vec![AccountRecord::local("alice", "x")]),
        failures_left: AtomicUsize::new(1),
    });
    let (notifier, mut events) = ChannelNotifier::channel();
    let mut coordinator = SaveCoordinator::start(
        gateway.clone(),
        Arc::new(notifier),
        &PersistenceSettings::default(),
    )
    .await
    .unwrap();

    coordinator
        .update_field(0, FieldUpdate::Login("alicia".to_string()))
        .unwrap();
    coordinator.request_save();

    let report = coordinator.flush().await.unwrap();
    assert!(report.is_failed());
    assert_eq!(
        events.recv().await.unwrap(),
        SaveEvent::Failed {
            generation: 1,
            reason: "Persistence unavailable: disk full".to_string(),
        }
    );
    assert_eq!(gateway.inner.stored().await[0].login, "alice");

    let retried = coordinator.retry_failed_save();
    assert_eq!(retried, Some(2));

    let report = coordinator.flush().await.unwrap();
    assert!(report.is_saved());
    assert_eq!(
        events.recv().await.unwrap(),
        SaveEvent::Saved {
            generation: 2,
            record_count: 1,
        }
    );
    assert_eq!(gateway.inner.stored().await[0].login, "alicia");
}

#[tokio::test]
async fn newer_save_supersedes_failed_snapshot() {
    let gateway = Arc::new(FlakyGateway {
        inner: MemoryGateway::with_records(vec![AccountRecord::local("alice", "x")]),
        failures_left: AtomicUsize::new(1),
    });
    let mut coordinator = SaveCoordinator::start(
        gateway.clone(),
        Arc::new(NoopNotifier),
        &PersistenceSettings::default(),
    )
    .await
    .unwrap();

    coordinator.request_save();
    assert!(coordinator.flush().await.unwrap().is_failed());

    coordinator
        .update_field(0, FieldUpdate::Login("alicia".to_string()))
        .unwrap();
    coordinator.request_save();
    assert_eq!(coordinator.retry_failed_save(), None);

    assert!(coordinator.flush().await.unwrap().is_saved());
    assert_eq!(gateway.inner.stored().await[0].login, "alicia");
}

#[tokio::test]
async fn load_failure_prevents_start() {
    let result = SaveCoordinator::start(
        Arc::new(BrokenGateway),
        Arc::new(NoopNotifier),
        &PersistenceSettings::default(),
    )
    .await;
    assert!(matches!(result, Err(SaveError::Persistence(_))));
}

#[tokio::test]
async fn every_completed_save_notifies() {
    let gateway = MemoryGateway::with_records(vec![AccountRecord::local("alice", "x")]);
    let (notifier, mut events) = ChannelNotifier::channel();
    let mut coordinator = SaveCoordinator::start(
        Arc::new(gateway.clone()),
        Arc::new(notifier),
        &PersistenceSettings::default(),
    )
    .await
    .unwrap();

    coordinator.request_save();
    coordinator.flush().await.unwrap();
    coordinator.change_type(0, AccountType::Directory).unwrap();
    coordinator.flush().await.unwrap();

    let first = events.recv().await.unwrap();
    let second = events.recv().await.unwrap();
    assert!(first.is_saved());
    assert!(second.is_saved());
    assert_eq!(second.generation(), 2);
    assert!(events.try_recv().is_err());

    let report = coordinator.shutdown().await.unwrap();
    assert_eq!(report.generation, 2);
}
