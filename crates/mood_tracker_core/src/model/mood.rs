//! Mood entry log.

use super::{new_entity_id, now_epoch_ms, EntityId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: EntityId,
    pub user_id: EntityId,
    pub company_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<EntityId>,
    pub emoji: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Set by the store when the entry is recorded.
    pub timestamp: i64,
}

/// Caller-supplied fields for a mood entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMoodEntry {
    pub user_id: EntityId,
    pub company_id: EntityId,
    pub department_id: Option<EntityId>,
    pub emoji: String,
    pub score: f64,
    pub note: Option<String>,
    pub task: Option<String>,
}

impl NewMoodEntry {
    pub(crate) fn into_entry(self) -> MoodEntry {
        MoodEntry {
            id: new_entity_id(),
            user_id: self.user_id,
            company_id: self.company_id,
            department_id: self.department_id,
            emoji: self.emoji,
            score: self.score,
            note: self.note,
            task: self.task,
            timestamp: now_epoch_ms(),
        }
    }
}

/// Partial update merged into an existing entry; `None` keeps the old value.
/// For the optional fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoodEntryPatch {
    pub emoji: Option<String>,
    pub score: Option<f64>,
    pub note: Option<Option<String>>,
    pub task: Option<Option<String>>,
    pub department_id: Option<Option<EntityId>>,
}

impl MoodEntryPatch {
    pub(crate) fn apply(self, entry: &mut MoodEntry) {
        if let Some(emoji) = self.emoji {
            entry.emoji = emoji;
        }
        if let Some(score) = self.score {
            entry.score = score;
        }
        if let Some(note) = self.note {
            entry.note = note;
        }
        if let Some(task) = self.task {
            entry.task = task;
        }
        if let Some(department_id) = self.department_id {
            entry.department_id = department_id;
        }
    }
}

/// All mood entries, persisted as one record in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodAggregate {
    #[serde(default)]
    pub entries: Vec<MoodEntry>,
}
