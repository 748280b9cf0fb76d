/// Storage contract checks, run identically against both backends
use daily_habit_tracker::*;

use crate::common::{day, time, Harness};

for_each_backend!(
    create_habit_creates_todays_pending_record,
    ids_are_monotonic_and_never_reused,
    scheduled_time_updates,
    active_habits_exclude_deleted_in_creation_order,
    delete_is_soft_and_keeps_records,
    visibility_window_matches_rule,
    upsert_fully_replaces,
    update_record_creates_missing_record,
    record_writes_need_an_existing_habit,
    habits_for_date_defaults_missing_records,
    diagnostics_list_everything,
    created_at_is_kept_to_the_millisecond,
);

async fn create_habit_creates_todays_pending_record(h: Harness) {
    let id = h
        .backend
        .create_habit("Exercise", Some(time("06:00")), true)
        .await
        .unwrap();

    let record = h.backend.get_record(id, day(1)).await.unwrap().expect("today's record");
    assert_eq!(record.status, RecordStatus::Pending);
    assert_eq!(record.duration_minutes, None);
    assert_eq!(record.completion_time, None);

    let habits = h.backend.get_habits_for_date(day(1)).await.unwrap();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].name(), "Exercise");
    assert_eq!(habits[0].scheduled_time(), Some(&time("06:00")));
    assert!(habits[0].is_critical());
    assert_eq!(habits[0].habit.deleted_at, None);
    assert_eq!(habits[0].habit.created_at, day(1).and_hms_opt(8, 0, 0).unwrap());
}

async fn ids_are_monotonic_and_never_reused(h: Harness) {
    let a = h.backend.create_habit("A", None, false).await.unwrap();
    let b = h.backend.create_habit("B", None, false).await.unwrap();
    assert!(b > a);

    h.backend.delete_habit(b).await.unwrap();
    let c = h.backend.create_habit("C", None, false).await.unwrap();
    assert!(c > b);
}

async fn scheduled_time_updates(h: Harness) {
    let id = h.backend.create_habit("Read", None, false).await.unwrap();

    h.backend
        .update_habit_scheduled_time(id, Some(time("21:30")))
        .await
        .unwrap();
    let habits = h.backend.get_all_active_habits().await.unwrap();
    assert_eq!(habits[0].scheduled_time, Some(time("21:30")));

    h.backend.update_habit_scheduled_time(id, None).await.unwrap();
    let habits = h.backend.get_all_active_habits().await.unwrap();
    assert_eq!(habits[0].scheduled_time, None);

    // Unknown ids are ignored
    h.backend
        .update_habit_scheduled_time(HabitId(999), Some(time("10:00")))
        .await
        .unwrap();
}

async fn active_habits_exclude_deleted_in_creation_order(h: Harness) {
    let first = h.backend.create_habit("First", None, false).await.unwrap();
    h.set_day(2);
    let second = h.backend.create_habit("Second", None, false).await.unwrap();
    h.set_time(2, 9, 0);
    let third = h.backend.create_habit("Third", None, false).await.unwrap();

    h.set_day(3);
    h.backend.delete_habit(second).await.unwrap();

    let active: Vec<HabitId> = h
        .backend
        .get_all_active_habits()
        .await
        .unwrap()
        .iter()
        .map(|habit| habit.id)
        .collect();
    assert_eq!(active, vec![first, third]);
}

async fn delete_is_soft_and_keeps_records(h: Harness) {
    let id = h.backend.create_habit("Journal", None, false).await.unwrap();
    h.backend
        .update_record(id, day(1), RecordUpdate::done(Some(15), Some(time("22:00"))))
        .await
        .unwrap();

    h.set_day(4);
    h.backend.delete_habit(id).await.unwrap();

    let habits = h.backend.all_habits().await.unwrap();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].deleted_at, Some(day(4)));

    let record = h.backend.get_record(id, day(1)).await.unwrap().expect("history kept");
    assert_eq!(record.status, RecordStatus::Done);

    // Deleting again does not move the deletion day
    h.set_day(6);
    h.backend.delete_habit(id).await.unwrap();
    assert_eq!(h.backend.all_habits().await.unwrap()[0].deleted_at, Some(day(4)));

    // Unknown ids are ignored
    h.backend.delete_habit(HabitId(404)).await.unwrap();
}

async fn visibility_window_matches_rule(h: Harness) {
    // (name, created on, deleted on)
    let plan: [(&str, u32, Option<u32>); 4] = [
        ("Always", 1, None),
        ("Short", 2, Some(4)),
        ("SameDay", 3, Some(3)),
        ("Late", 5, None),
    ];

    for (name, created, _) in plan {
        h.set_day(created);
        h.backend.create_habit(name, None, false).await.unwrap();
    }
    for (index, (_, _, deleted)) in plan.iter().enumerate() {
        if let Some(deleted) = deleted {
            h.set_day(*deleted);
            h.backend.delete_habit(HabitId(index as i64 + 1)).await.unwrap();
        }
    }

    for d in 1..=7 {
        let expected: Vec<&str> = plan
            .iter()
            .filter(|(_, created, deleted)| *created <= d && deleted.map_or(true, |x| x > d))
            .map(|(name, _, _)| *name)
            .collect();

        let habits = h.backend.get_habits_for_date(day(d)).await.unwrap();
        let actual: Vec<&str> = habits.iter().map(|habit| habit.name()).collect();
        assert_eq!(actual, expected, "visible habits on day {}", d);
    }
}

async fn upsert_fully_replaces(h: Harness) {
    let id = h.backend.create_habit("Walk", None, false).await.unwrap();

    h.backend
        .create_or_replace_record(id, day(1), RecordUpdate::done(Some(30), Some(time("06:30"))))
        .await
        .unwrap();
    h.backend
        .create_or_replace_record(id, day(1), RecordUpdate::pending())
        .await
        .unwrap();

    let record = h.backend.get_record(id, day(1)).await.unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Pending);
    assert_eq!(record.duration_minutes, None);
    assert_eq!(record.completion_time, None);

    let records = h.backend.all_records().await.unwrap();
    assert_eq!(records.len(), 1);
}

async fn update_record_creates_missing_record(h: Harness) {
    let id = h.backend.create_habit("Stretch", None, false).await.unwrap();
    h.set_day(3);

    assert!(h.backend.get_record(id, day(2)).await.unwrap().is_none());

    h.backend
        .update_record(id, day(2), RecordUpdate::done(Some(10), Some(time("09:05"))))
        .await
        .unwrap();
    let record = h.backend.get_record(id, day(2)).await.unwrap().expect("created on update");
    assert_eq!(record.status, RecordStatus::Done);
    assert_eq!(record.duration_minutes, Some(10));
    assert_eq!(record.completion_time, Some(time("09:05")));

    // Existing records are updated in place
    h.backend
        .update_record(id, day(2), RecordUpdate::done(Some(0), None))
        .await
        .unwrap();
    let record = h.backend.get_record(id, day(2)).await.unwrap().unwrap();
    assert_eq!(record.duration_minutes, Some(0));
    assert_eq!(record.completion_time, None);
}

async fn record_writes_need_an_existing_habit(h: Harness) {
    h.backend
        .update_record(HabitId(77), day(1), RecordUpdate::done(None, None))
        .await
        .unwrap();
    assert!(h.backend.get_record(HabitId(77), day(1)).await.unwrap().is_none());

    h.set_day(3);
    let id = h.backend.create_habit("Later", None, false).await.unwrap();
    h.backend
        .create_or_replace_record(id, day(2), RecordUpdate::pending())
        .await
        .unwrap();
    assert!(h.backend.get_record(id, day(2)).await.unwrap().is_none());
}

async fn habits_for_date_defaults_missing_records(h: Harness) {
    let id = h.backend.create_habit("Water", None, false).await.unwrap();
    h.set_day(2);

    let habits = h.backend.get_habits_for_date(day(2)).await.unwrap();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].status, RecordStatus::Pending);
    assert_eq!(habits[0].duration_minutes, None);

    // Reading does not write
    assert!(h.backend.get_record(id, day(2)).await.unwrap().is_none());
}

async fn diagnostics_list_everything(h: Harness) {
    let a = h.backend.create_habit("A", None, false).await.unwrap();
    let b = h.backend.create_habit("B", None, false).await.unwrap();
    h.set_day(2);
    h.backend.update_record(b, day(2), RecordUpdate::pending()).await.unwrap();
    h.backend.update_record(a, day(2), RecordUpdate::pending()).await.unwrap();
    h.backend.delete_habit(a).await.unwrap();

    assert_eq!(h.backend.all_habits().await.unwrap().len(), 2);

    let keys: Vec<(HabitId, chrono::NaiveDate)> = h
        .backend
        .all_records()
        .await
        .unwrap()
        .iter()
        .map(|r| (r.habit_id, r.date))
        .collect();
    assert_eq!(keys, vec![(a, day(2)), (b, day(2)), (a, day(1)), (b, day(1))]);
}

async fn created_at_is_kept_to_the_millisecond(h: Harness) {
    h.clock
        .set(day(1).and_hms_nano_opt(8, 0, 0, 123_456_789).unwrap());
    h.backend.create_habit("Precise", None, false).await.unwrap();

    let habits = h.backend.get_habits_for_date(day(1)).await.unwrap();
    assert_eq!(habits[0].habit.created_at, day(1).and_hms_milli_opt(8, 0, 0, 123).unwrap());
}

/// Both backends end up in the same observable state after the same calls
#[tokio::test]
async fn backends_agree_on_observable_state() {
    let sqlite = Harness::sqlite().await;
    let key_value = Harness::key_value().await;

    for h in [&sqlite, &key_value] {
        // Sub-millisecond precision must not leak into either backend
        h.clock
            .set(day(1).and_hms_nano_opt(8, 0, 0, 123_456_789).unwrap());
        let run = h.backend.create_habit("Run", Some(time("06:00")), true).await.unwrap();
        let read = h.backend.create_habit("Read", None, false).await.unwrap();
        h.backend
            .update_record(run, day(1), RecordUpdate::done(Some(25), Some(time("06:40"))))
            .await
            .unwrap();

        h.set_day(2);
        let tea = h.backend.create_habit("Tea", Some(time("16:00")), false).await.unwrap();
        h.backend.update_record(tea, day(2), RecordUpdate::done(None, None)).await.unwrap();

        h.set_day(3);
        h.backend.delete_habit(read).await.unwrap();
        h.backend.update_habit_scheduled_time(run, Some(time("05:45"))).await.unwrap();
    }

    for d in 1..=4 {
        assert_eq!(
            sqlite.backend.get_habits_for_date(day(d)).await.unwrap(),
            key_value.backend.get_habits_for_date(day(d)).await.unwrap(),
            "day {}",
            d
        );
    }
    assert_eq!(
        sqlite.backend.all_habits().await.unwrap(),
        key_value.backend.all_habits().await.unwrap()
    );
    assert_eq!(
        sqlite.backend.get_all_active_habits().await.unwrap(),
        key_value.backend.get_all_active_habits().await.unwrap()
    );
    assert_eq!(
        sqlite.backend.all_records().await.unwrap(),
        key_value.backend.all_records().await.unwrap()
    );
}
