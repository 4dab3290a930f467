//! Aggregation window tests, driven with fixed clocks.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use helpq::model::{EntryId, EntryState, QueueEntry, RemovalType};
use helpq::stats::StatsReport;

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().expect("bad timestamp in test")
}

/// A visit that ended in being helped: waited `wait_secs`, then was
/// helped for `help_secs`.
fn helped(id: i64, queue: &str, time_in: &str, wait_secs: i64, help_secs: i64) -> QueueEntry {
    let time_in = ts(time_in);
    let started = time_in + Duration::seconds(wait_secs);
    QueueEntry {
        id: EntryId(id),
        queue_code: queue.to_string(),
        student_id: format!("student-{id}"),
        state: EntryState::Removed,
        time_in,
        help_started_by: Some("ta".to_string()),
        time_help_started: Some(started),
        time_out: Some(started + Duration::seconds(help_secs)),
        removed_by: Some("ta".to_string()),
        removal_type: Some(RemovalType::Helped),
    }
}

/// A visit that left the line before help started.
fn removed_unhelped(id: i64, queue: &str, time_in: &str, removal_type: RemovalType) -> QueueEntry {
    QueueEntry {
        id: EntryId(id),
        queue_code: queue.to_string(),
        student_id: format!("student-{id}"),
        state: EntryState::Removed,
        time_in: ts(time_in),
        help_started_by: None,
        time_help_started: None,
        time_out: Some(ts(time_in) + Duration::seconds(300)),
        removed_by: Some("someone".to_string()),
        removal_type: Some(removal_type),
    }
}

/// A visit still waiting in line.
fn waiting(id: i64, queue: &str, time_in: &str) -> QueueEntry {
    QueueEntry {
        id: EntryId(id),
        queue_code: queue.to_string(),
        student_id: format!("student-{id}"),
        state: EntryState::Waiting,
        time_in: ts(time_in),
        help_started_by: None,
        time_help_started: None,
        time_out: None,
        removed_by: None,
        removal_type: None,
    }
}

// 2026-08-06 is a Thursday; its ISO week runs Mon 2026-08-03 .. Sun 2026-08-09.
const NOW: &str = "2026-08-06T12:00:00Z";

// ---------------------------------------------------------------------------
// Averages
// ---------------------------------------------------------------------------

#[test]
fn averages_cover_only_complete_timestamp_pairs() {
    let entries = vec![
        helped(1, "lab1", "2026-08-06T09:00:00Z", 60, 120),
        helped(2, "lab1", "2026-08-06T09:10:00Z", 120, 240),
        removed_unhelped(3, "lab1", "2026-08-06T09:20:00Z", RemovalType::SelfRemoved),
        waiting(4, "lab1", "2026-08-06T09:30:00Z"),
    ];

    let report = StatsReport::build(&entries, ts(NOW));
    let overall = &report.overall;

    // Everyone counts toward totals.
    assert_eq!(overall.entries, 4);
    assert_eq!(overall.helped, 2);
    assert_eq!(overall.self_removed, 1);

    // Only the two complete pairs feed the averages.
    assert_eq!(overall.avg_wait, Some(Duration::seconds(90)));
    assert_eq!(overall.avg_help, Some(Duration::seconds(180)));
}

#[test]
fn zero_helped_window_reports_null_not_zero() {
    let entries = vec![
        removed_unhelped(1, "lab1", "2026-08-06T09:00:00Z", RemovalType::SelfRemoved),
        removed_unhelped(2, "lab1", "2026-08-06T09:05:00Z", RemovalType::NoShow),
        waiting(3, "lab1", "2026-08-06T09:10:00Z"),
    ];

    let report = StatsReport::build(&entries, ts(NOW));
    assert_eq!(report.overall.entries, 3);
    assert_eq!(report.overall.avg_wait, None);
    assert_eq!(report.overall.avg_help, None);
}

#[test]
fn counts_split_by_removal_type() {
    let entries = vec![
        helped(1, "lab1", "2026-08-06T09:00:00Z", 10, 10),
        removed_unhelped(2, "lab1", "2026-08-06T09:01:00Z", RemovalType::SelfRemoved),
        removed_unhelped(3, "lab1", "2026-08-06T09:02:00Z", RemovalType::StaffRemoved),
        removed_unhelped(4, "lab1", "2026-08-06T09:03:00Z", RemovalType::NoShow),
        waiting(5, "lab1", "2026-08-06T09:04:00Z"),
    ];

    let report = StatsReport::build(&entries, ts(NOW));
    let overall = &report.overall;
    assert_eq!(
        (
            overall.entries,
            overall.helped,
            overall.self_removed,
            overall.staff_removed,
            overall.no_shows
        ),
        (5, 1, 1, 1, 1)
    );
}

#[test]
fn empty_history_builds_an_empty_report() {
    let report = StatsReport::build(&[], ts(NOW));
    assert_eq!(report.overall.entries, 0);
    assert_eq!(report.overall.avg_wait, None);
    assert!(report.week_day.is_empty());
    assert!(report.week_number.is_empty());
    assert!(report.per_queue.is_empty());
}

// ---------------------------------------------------------------------------
// Date windows
// ---------------------------------------------------------------------------

#[test]
fn today_window_excludes_other_days() {
    let entries = vec![
        helped(1, "lab1", "2026-08-06T09:00:00Z", 60, 60), // today
        helped(2, "lab1", "2026-08-05T09:00:00Z", 60, 60), // yesterday
        helped(3, "lab1", "2026-07-30T09:00:00Z", 60, 60), // last week
    ];

    let report = StatsReport::build(&entries, ts(NOW));
    assert_eq!(report.overall.entries, 3);
    assert_eq!(report.today.entries, 1);
}

#[test]
fn weekday_buckets_span_all_weeks() {
    let entries = vec![
        helped(1, "lab1", "2026-08-04T09:00:00Z", 60, 60), // Tuesday this week
        helped(2, "lab1", "2026-07-28T09:00:00Z", 60, 60), // Tuesday last week
        helped(3, "lab1", "2026-08-05T09:00:00Z", 60, 60), // Wednesday this week
    ];

    let report = StatsReport::build(&entries, ts(NOW));

    // Monday-first ordering: Tuesday bucket before Wednesday bucket.
    let buckets: Vec<(Weekday, u64)> = report
        .week_day
        .iter()
        .map(|(weekday, m)| (*weekday, m.entries))
        .collect();
    assert_eq!(buckets, vec![(Weekday::Tue, 2), (Weekday::Wed, 1)]);
}

#[test]
fn this_week_buckets_exclude_earlier_weeks() {
    let entries = vec![
        helped(1, "lab1", "2026-08-04T09:00:00Z", 60, 60), // Tuesday this week
        helped(2, "lab1", "2026-07-28T09:00:00Z", 60, 60), // Tuesday last week
    ];

    let report = StatsReport::build(&entries, ts(NOW));

    let buckets: Vec<(Weekday, u64)> = report
        .week_day_this_week
        .iter()
        .map(|(weekday, m)| (*weekday, m.entries))
        .collect();
    assert_eq!(buckets, vec![(Weekday::Tue, 1)]);
}

#[test]
fn week_number_buckets_are_iso_weeks_oldest_first() {
    let this_week = ts("2026-08-04T09:00:00Z").date_naive().iso_week();
    let last_week = ts("2026-07-28T09:00:00Z").date_naive().iso_week();
    assert_ne!(this_week, last_week);

    let entries = vec![
        helped(1, "lab1", "2026-08-04T09:00:00Z", 60, 60),
        helped(2, "lab1", "2026-07-28T09:00:00Z", 60, 60),
        helped(3, "lab1", "2026-07-27T09:00:00Z", 60, 60), // Monday of last week
    ];

    let report = StatsReport::build(&entries, ts(NOW));

    let buckets: Vec<_> = report
        .week_number
        .iter()
        .map(|(week, m)| (*week, m.entries))
        .collect();
    assert_eq!(buckets, vec![(last_week, 2), (this_week, 1)]);
}

#[test]
fn per_queue_buckets_are_sorted_by_code() {
    let entries = vec![
        helped(1, "lab2", "2026-08-06T09:00:00Z", 60, 60),
        helped(2, "lab1", "2026-08-06T09:05:00Z", 30, 60),
        waiting(3, "lab1", "2026-08-06T09:10:00Z"),
    ];

    let report = StatsReport::build(&entries, ts(NOW));

    let buckets: Vec<(&str, u64)> = report
        .per_queue
        .iter()
        .map(|(code, m)| (code.as_str(), m.entries))
        .collect();
    assert_eq!(buckets, vec![("lab1", 2), ("lab2", 1)]);

    // Per-queue averages stay queue-local.
    let lab1 = &report.per_queue[0].1;
    assert_eq!(lab1.avg_wait, Some(Duration::seconds(30)));
}
