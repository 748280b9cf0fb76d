/// Basic unit tests to verify core functionality
use chrono::NaiveDate;
use daily_habit_tracker::*;

fn habit(id: i64, critical: bool, time: Option<&str>) -> Habit {
    let created = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    Habit::from_existing(
        HabitId(id),
        format!("habit {}", id),
        created,
        None,
        time.map(|t| TimeOfDay::parse(t).unwrap()),
        critical,
    )
}

fn done_record(habit_id: i64) -> HabitRecord {
    HabitRecord::from_existing(
        RecordId(habit_id),
        HabitId(habit_id),
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        RecordStatus::Done,
        Some(5),
        None,
    )
}

#[cfg(test)]
mod basic_unit_tests {
    use super::*;

    #[test]
    fn test_time_of_day_parsing() {
        assert_eq!(TimeOfDay::parse("07:05").unwrap().as_str(), "07:05");
        assert_eq!(TimeOfDay::parse(" 21:30 ").unwrap().as_str(), "21:30");
        assert!(TimeOfDay::parse("24:00").is_err());
        assert!(TimeOfDay::parse("noon").is_err());
        assert!(TimeOfDay::parse("07:05").unwrap() < TimeOfDay::parse("19:00").unwrap());
    }

    #[test]
    fn test_date_strings() {
        let date = parse_date("2024-02-29").unwrap();
        assert_eq!(format_date(date), "2024-02-29");
        assert!(matches!(parse_date("2024-02-30"), Err(DomainError::InvalidDate(_))));

        let clock = FixedClock::at(date, 23, 59);
        assert_eq!(today_date_string(&clock), "2024-02-29");
        clock.advance_days(1);
        assert_eq!(today_date_string(&clock), "2024-03-01");
    }

    #[test]
    fn test_missing_record_defaults_to_pending() {
        let view = HabitWithStatus::from_parts(habit(1, false, None), None);
        assert_eq!(view.status, RecordStatus::Pending);
        assert_eq!(view.duration_minutes, None);
        assert!(!view.is_done());

        let record = done_record(1);
        let view = HabitWithStatus::from_parts(habit(1, false, None), Some(&record));
        assert!(view.is_done());
        assert_eq!(view.duration_minutes, Some(5));
    }

    #[test]
    fn test_priority_order() {
        let record = done_record(4);
        let mut habits = vec![
            HabitWithStatus::from_parts(habit(1, false, None), None),
            HabitWithStatus::from_parts(habit(2, false, Some("08:00")), None),
            HabitWithStatus::from_parts(habit(3, true, Some("21:00")), None),
            HabitWithStatus::from_parts(habit(4, true, Some("06:00")), Some(&record)),
            HabitWithStatus::from_parts(habit(5, false, Some("07:00")), None),
        ];

        sort_by_priority(&mut habits);

        let ids: Vec<i64> = habits.iter().map(|h| h.id().0).collect();
        assert_eq!(ids, vec![3, 5, 2, 1, 4]);
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("sqlite".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert_eq!("key-value".parse::<BackendKind>().unwrap(), BackendKind::KeyValue);
        assert!(matches!("redis".parse::<BackendKind>(), Err(ConfigError::UnknownBackend(_))));
        assert_eq!(BackendKind::KeyValue.to_string(), "kv");
    }

    #[test]
    fn test_habit_json_shape() {
        let json = serde_json::to_value(habit(9, true, Some("06:30"))).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["scheduledTime"], "06:30");
        assert_eq!(json["isCritical"], true);
        assert!(json["deletedAt"].is_null());

        let view = HabitWithStatus::from_parts(habit(9, true, None), None);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "habit 9");
        assert_eq!(json["status"], "pending");
    }
}
