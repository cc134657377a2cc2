//! Mood log projections.
//!
//! # Invariants
//! - Projections are pure functions of one snapshot.
//! - `StatsView` hands out whole recomputed sequences, never deltas.

use crate::model::mood::MoodAggregate;
use crate::model::stat::{DepartmentMoodStats, MoodStats, StatKind, StatRecord};
use crate::store::mood_store::MoodStore;
use crate::store::persisted::Subscription;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// One `mood` statistic per entry, in entry order.
pub fn stat_records(aggregate: &MoodAggregate) -> Vec<StatRecord> {
    aggregate
        .entries
        .iter()
        .map(|entry| StatRecord {
            id: entry.id.clone(),
            user_id: entry.user_id.clone(),
            company_id: entry.company_id.clone(),
            timestamp: entry.timestamp,
            kind: StatKind::Mood,
            value: entry.score,
        })
        .collect()
}

/// Average, count, most recent entry and per-department breakdown.
///
/// An empty log averages to `0.0`. "Most recent" is by timestamp; ties go
/// to the later entry in the log.
pub fn mood_stats(aggregate: &MoodAggregate) -> MoodStats {
    let entries = &aggregate.entries;
    let total_entries = entries.len();
    let average_score = average(entries.iter().map(|e| e.score));
    let last_entry = entries
        .iter()
        .enumerate()
        .max_by_key(|(index, entry)| (entry.timestamp, *index))
        .map(|(_, entry)| entry.clone());

    let mut scores_by_department: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for entry in entries {
        if let Some(department_id) = &entry.department_id {
            scores_by_department
                .entry(department_id.clone())
                .or_default()
                .push(entry.score);
        }
    }
    let by_department = scores_by_department
        .into_iter()
        .map(|(department_id, scores)| {
            let stats = DepartmentMoodStats {
                average_score: average(scores.iter().copied()),
                total_entries: scores.len(),
            };
            (department_id, stats)
        })
        .collect();

    MoodStats {
        average_score,
        total_entries,
        last_entry,
        by_department,
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Statistic records kept in step with a mood store.
pub struct StatsView {
    subscription: Subscription<MoodAggregate>,
    source: Arc<MoodAggregate>,
    records: Arc<[StatRecord]>,
}

impl StatsView {
    pub fn new(store: &MoodStore) -> Self {
        let subscription = store.subscribe();
        let source = Arc::clone(subscription.current());
        let records = stat_records(&source).into();
        Self {
            subscription,
            source,
            records,
        }
    }

    /// Records for the newest snapshot published so far.
    pub fn records(&mut self) -> Arc<[StatRecord]> {
        let latest = Arc::clone(self.subscription.latest());
        self.recompute_from(latest);
        Arc::clone(&self.records)
    }

    /// Waits up to `timeout` for the store to change, then returns fresh records.
    pub fn changed(&mut self, timeout: Duration) -> Option<Arc<[StatRecord]>> {
        let next = self.subscription.next_timeout(timeout)?;
        self.recompute_from(next);
        Some(self.records())
    }

    /// Summary over the same snapshot the records were computed from.
    pub fn summary(&mut self) -> MoodStats {
        self.records();
        mood_stats(&self.source)
    }

    fn recompute_from(&mut self, source: Arc<MoodAggregate>) {
        if Arc::ptr_eq(&source, &self.source) {
            return;
        }
        self.records = stat_records(&source).into();
        self.source = source;
    }
}

#[cfg(test)]
mod tests {
    use super::{mood_stats, stat_records};
    use crate::model::mood::{MoodAggregate, MoodEntry};
    use crate::model::stat::StatKind;

    fn entry(id: &str, department: Option<&str>, score: f64, timestamp: i64) -> MoodEntry {
        MoodEntry {
            id: id.to_string(),
            user_id: "u1".to_string(),
            company_id: "c1".to_string(),
            department_id: department.map(str::to_string),
            emoji: "🙂".to_string(),
            score,
            note: None,
            task: None,
            timestamp,
        }
    }

    #[test]
    fn stat_records_follow_entry_order() {
        let aggregate = MoodAggregate {
            entries: vec![entry("a", None, 4.0, 20), entry("b", None, 2.0, 10)],
        };
        let records = stat_records(&aggregate);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a");
        assert_eq!(records[0].value, 4.0);
        assert_eq!(records[1].timestamp, 10);
        assert!(records.iter().all(|r| r.kind == StatKind::Mood));
    }

    #[test]
    fn mood_stats_on_empty_log() {
        let stats = mood_stats(&MoodAggregate::default());
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.average_score, 0.0);
        assert!(stats.last_entry.is_none());
        assert!(stats.by_department.is_empty());
    }

    #[test]
    fn mood_stats_groups_by_department_and_picks_latest() {
        let aggregate = MoodAggregate {
            entries: vec![
                entry("a", Some("eng"), 5.0, 30),
                entry("b", Some("eng"), 3.0, 10),
                entry("c", Some("ops"), 1.0, 20),
                entry("d", None, 3.0, 30),
            ],
        };
        let stats = mood_stats(&aggregate);

        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.average_score, 3.0);
        assert_eq!(stats.last_entry.unwrap().id, "d");
        assert_eq!(stats.by_department["eng"].average_score, 4.0);
        assert_eq!(stats.by_department["eng"].total_entries, 2);
        assert_eq!(stats.by_department["ops"].total_entries, 1);
    }
}
