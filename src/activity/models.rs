//! Daily study activity models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::flashcards::CardStatus;

/// Review counters for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    /// Date of the activity (YYYY-MM-DD), unique key
    pub date: NaiveDate,
    /// Reviews submitted
    #[serde(default)]
    pub reviewed: u32,
    /// Cards that entered MASTERED
    #[serde(default)]
    pub mastered: u32,
    /// Cards that left NEW
    #[serde(default)]
    pub learning: u32,
}

impl DailyActivity {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            reviewed: 0,
            mastered: 0,
            learning: 0,
        }
    }

    pub fn apply(&mut self, delta: ActivityDelta) {
        self.reviewed += delta.reviewed;
        self.mastered += delta.mastered;
        self.learning += delta.learning;
    }
}

/// Increment to apply to a day's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityDelta {
    pub reviewed: u32,
    pub mastered: u32,
    pub learning: u32,
}

impl ActivityDelta {
    /// Counters for one review that moved a card from `before` to `after`
    pub fn from_transition(before: CardStatus, after: CardStatus) -> Self {
        Self {
            reviewed: 1,
            mastered: u32::from(after == CardStatus::Mastered && before != CardStatus::Mastered),
            learning: u32::from(before == CardStatus::New && after != CardStatus::New),
        }
    }
}

/// One heatmap cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapEntry {
    pub date: NaiveDate,
    pub count: u32,
}

/// Computed streaks (not stored)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    /// Consecutive active days ending today
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Days with at least one review
    pub active_days: u32,
    pub total_reviews: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_deltas() {
        let first = ActivityDelta::from_transition(CardStatus::New, CardStatus::Learning);
        assert_eq!(first, ActivityDelta { reviewed: 1, mastered: 0, learning: 1 });

        let failed_new = ActivityDelta::from_transition(CardStatus::New, CardStatus::Relearning);
        assert_eq!(failed_new.learning, 1);

        let promoted = ActivityDelta::from_transition(CardStatus::Review, CardStatus::Mastered);
        assert_eq!(promoted, ActivityDelta { reviewed: 1, mastered: 1, learning: 0 });

        let stays = ActivityDelta::from_transition(CardStatus::Mastered, CardStatus::Mastered);
        assert_eq!(stays, ActivityDelta { reviewed: 1, mastered: 0, learning: 0 });
    }
}
