/// Data survives a restart, for both configured backends
use std::sync::Arc;

use daily_habit_tracker::*;
use tempfile::TempDir;

use crate::common::{day, time};

async fn survives_restart(kind: BackendKind) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = TrackerConfig::new(dir.path(), kind);
    let clock = Arc::new(FixedClock::at(day(1), 7, 30));

    let (run, read) = {
        let service = HabitService::open(&config, clock.clone()).await.unwrap();
        let run = service.create_habit("Run", Some(time("06:00")), true).await.unwrap();
        let read = service.create_habit("Read", None, false).await.unwrap();
        service.mark_habit_done(run, Some(20), Some(time("06:25"))).await.unwrap();
        (run, read)
    };

    clock.advance_days(1);
    let service = HabitService::open(&config, clock.clone()).await.unwrap();
    assert_eq!(service.repository().backend_name(), kind.as_str());

    service.delete_habit(read).await.unwrap();
    let yesterday = service.get_habits_for_date(day(1)).await.unwrap();
    assert_eq!(yesterday.len(), 2);
    assert_eq!(yesterday[0].id(), run);
    assert_eq!(yesterday[0].status, RecordStatus::Done);
    assert_eq!(yesterday[0].duration_minutes, Some(20));
    assert_eq!(yesterday[0].completion_time, Some(time("06:25")));

    let today = service.get_today_habits().await.unwrap();
    assert_eq!(today.len(), 1);
    assert_eq!(today[0].id(), run);
    assert_eq!(today[0].status, RecordStatus::Pending);

    // Ids keep counting after a restart
    let next = service.create_habit("Stretch", None, false).await.unwrap();
    assert!(next > read);
}

#[tokio::test]
async fn sqlite_survives_restart() {
    survives_restart(BackendKind::Sqlite).await;
}

#[tokio::test]
async fn key_value_survives_restart() {
    survives_restart(BackendKind::KeyValue).await;
}

#[tokio::test]
async fn backends_keep_separate_data() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let clock = Arc::new(FixedClock::at(day(1), 9, 0));

    let sqlite = HabitService::open(&TrackerConfig::new(dir.path(), BackendKind::Sqlite), clock.clone())
        .await
        .unwrap();
    sqlite.create_habit("Only in SQLite", None, false).await.unwrap();

    let key_value = HabitService::open(&TrackerConfig::new(dir.path(), BackendKind::KeyValue), clock)
        .await
        .unwrap();
    assert!(key_value.get_today_habits().await.unwrap().is_empty());
}

#[tokio::test]
async fn key_value_data_dir_admits_one_service_at_a_time() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = TrackerConfig::new(dir.path(), BackendKind::KeyValue);
    let clock = Arc::new(FixedClock::at(day(1), 9, 0));

    let first = HabitService::open(&config, clock.clone()).await.unwrap();
    first.create_habit("Stretch", None, false).await.unwrap();

    let second = HabitService::open(&config, clock.clone()).await;
    assert!(matches!(second, Err(TrackerError::Storage(StorageError::Initialization(_)))));

    drop(first);
    let reopened = HabitService::open(&config, clock).await.unwrap();
    assert_eq!(reopened.get_today_habits().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unusable_data_dir_fails_without_fallback() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "occupied").unwrap();
    let clock = Arc::new(FixedClock::at(day(1), 9, 0));

    for kind in [BackendKind::Sqlite, BackendKind::KeyValue] {
        let result = HabitService::open(&TrackerConfig::new(&blocker, kind), clock.clone()).await;
        assert!(
            matches!(result, Err(TrackerError::Storage(StorageError::Initialization(_)))),
            "{} backend should refuse to open",
            kind
        );
    }
}

#[tokio::test]
async fn diagnostics_snapshot_does_not_write() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let clock = Arc::new(FixedClock::at(day(1), 9, 0));
    let service = HabitService::open(&TrackerConfig::new(dir.path(), BackendKind::Sqlite), clock.clone())
        .await
        .unwrap();
    let id = service.create_habit("Floss", Some(time("22:00")), false).await.unwrap();

    clock.advance_days(2);
    let report = diagnostics::snapshot(&service).await.unwrap();

    assert_eq!(report.backend, "sqlite");
    assert_eq!(report.today, day(3));
    assert_eq!(report.all_habits.len(), 1);
    assert_eq!(report.active_habits.len(), 1);
    assert_eq!(report.all_records.len(), 1);
    assert_eq!(report.today_habits[0].id(), id);
    assert_eq!(report.yesterday_habits[0].status, RecordStatus::Pending);
    assert!(service.repository().get_record(id, day(3)).await.unwrap().is_none());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["backend"], "sqlite");
    assert_eq!(json["allHabits"][0]["scheduledTime"], "22:00");
}
