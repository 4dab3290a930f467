//! Read-side statistics projection over the full entry history.
//!
//! Aggregation is pure: callers fetch the rows, this module folds them
//! into windows. Calendar convention: buckets are computed in UTC and
//! weeks are ISO weeks (Monday start). An entry lands in a window by its
//! join time.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, IsoWeek, Utc, Weekday};

use crate::model::{QueueEntry, RemovalType};

/// Aggregate metrics for one window of entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metrics {
    /// Total entries in the window, active ones included.
    pub entries: u64,
    pub helped: u64,
    pub self_removed: u64,
    pub staff_removed: u64,
    pub no_shows: u64,
    /// Mean time from join to help starting, over entries where help
    /// started. None when no entry in the window was ever helped —
    /// distinct from a computed zero.
    pub avg_wait: Option<Duration>,
    /// Mean time from help starting to removal, over entries with both
    /// endpoints present. None when the denominator is zero.
    pub avg_help: Option<Duration>,
}

/// The six statistics windows the reporting surface renders.
#[derive(Debug, Clone)]
pub struct StatsReport {
    /// Every entry ever recorded.
    pub overall: Metrics,
    /// Entries that joined on the current UTC date.
    pub today: Metrics,
    /// Per-weekday buckets across all weeks, Monday first.
    pub week_day: Vec<(Weekday, Metrics)>,
    /// Per-weekday buckets within the current ISO week, Monday first.
    pub week_day_this_week: Vec<(Weekday, Metrics)>,
    /// Per-ISO-week buckets, oldest first. Keyed by (year, week) so week
    /// 1 of different years never collides.
    pub week_number: Vec<(IsoWeek, Metrics)>,
    /// Per-queue buckets, ordered by queue code.
    pub per_queue: Vec<(String, Metrics)>,
}

impl StatsReport {
    /// Fold the full entry history into every window in one pass.
    pub fn build(entries: &[QueueEntry], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let this_week = now.iso_week();

        let mut overall = Acc::default();
        let mut today_acc = Acc::default();
        let mut by_weekday: BTreeMap<u32, (Weekday, Acc)> = BTreeMap::new();
        let mut by_weekday_this_week: BTreeMap<u32, (Weekday, Acc)> = BTreeMap::new();
        let mut by_week: BTreeMap<IsoWeek, Acc> = BTreeMap::new();
        let mut by_queue: BTreeMap<String, Acc> = BTreeMap::new();

        for entry in entries {
            let date = entry.time_in.date_naive();
            let weekday = date.weekday();

            overall.add(entry);
            if date == today {
                today_acc.add(entry);
            }
            by_weekday
                .entry(weekday.num_days_from_monday())
                .or_insert_with(|| (weekday, Acc::default()))
                .1
                .add(entry);
            if date.iso_week() == this_week {
                by_weekday_this_week
                    .entry(weekday.num_days_from_monday())
                    .or_insert_with(|| (weekday, Acc::default()))
                    .1
                    .add(entry);
            }
            by_week.entry(date.iso_week()).or_default().add(entry);
            by_queue
                .entry(entry.queue_code.clone())
                .or_default()
                .add(entry);
        }

        StatsReport {
            overall: overall.finish(),
            today: today_acc.finish(),
            week_day: by_weekday
                .into_values()
                .map(|(weekday, acc)| (weekday, acc.finish()))
                .collect(),
            week_day_this_week: by_weekday_this_week
                .into_values()
                .map(|(weekday, acc)| (weekday, acc.finish()))
                .collect(),
            week_number: by_week
                .into_iter()
                .map(|(week, acc)| (week, acc.finish()))
                .collect(),
            per_queue: by_queue
                .into_iter()
                .map(|(queue_code, acc)| (queue_code, acc.finish()))
                .collect(),
        }
    }
}

/// Running sums for one window. Entries with an incomplete timestamp
/// pair count toward totals but never toward an average.
struct Acc {
    entries: u64,
    helped: u64,
    self_removed: u64,
    staff_removed: u64,
    no_shows: u64,
    wait_sum: Duration,
    wait_n: u32,
    help_sum: Duration,
    help_n: u32,
}

impl Default for Acc {
    fn default() -> Self {
        Self {
            entries: 0,
            helped: 0,
            self_removed: 0,
            staff_removed: 0,
            no_shows: 0,
            wait_sum: Duration::zero(),
            wait_n: 0,
            help_sum: Duration::zero(),
            help_n: 0,
        }
    }
}

impl Acc {
    fn add(&mut self, entry: &QueueEntry) {
        self.entries += 1;
        match entry.removal_type {
            Some(RemovalType::Helped) => self.helped += 1,
            Some(RemovalType::SelfRemoved) => self.self_removed += 1,
            Some(RemovalType::StaffRemoved) => self.staff_removed += 1,
            Some(RemovalType::NoShow) => self.no_shows += 1,
            None => {}
        }

        if let Some(wait) = entry.wait_duration() {
            self.wait_sum = self.wait_sum + wait;
            self.wait_n += 1;
        }
        if let Some(help) = entry.help_duration() {
            self.help_sum = self.help_sum + help;
            self.help_n += 1;
        }
    }

    fn finish(self) -> Metrics {
        Metrics {
            entries: self.entries,
            helped: self.helped,
            self_removed: self.self_removed,
            staff_removed: self.staff_removed,
            no_shows: self.no_shows,
            avg_wait: (self.wait_n > 0).then(|| self.wait_sum / self.wait_n as i32),
            avg_help: (self.help_n > 0).then(|| self.help_sum / self.help_n as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_has_null_averages() {
        let metrics = Acc::default().finish();
        assert_eq!(metrics.entries, 0);
        assert_eq!(metrics.avg_wait, None);
        assert_eq!(metrics.avg_help, None);
    }
}
