//! Reporting shapes derived from the mood log.

use super::mood::MoodEntry;
use super::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Mood,
    Productivity,
    Satisfaction,
}

/// One normalized statistic sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatRecord {
    pub id: EntityId,
    pub user_id: EntityId,
    pub company_id: EntityId,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: StatKind,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentMoodStats {
    pub average_score: f64,
    pub total_entries: usize,
}

/// Summary over a set of mood entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodStats {
    pub average_score: f64,
    pub total_entries: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_entry: Option<MoodEntry>,
    /// Keyed by department id; entries without a department are not counted here.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_department: BTreeMap<EntityId, DepartmentMoodStats>,
}
