//! Activity storage: one `activity.json` per user, sorted by date

use std::fs;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use thiserror::Error;
use uuid::Uuid;

use super::models::*;
use super::streak;
use crate::flashcards::locks::{acquire, KeyedLocks};
use crate::flashcards::storage::{read_json, write_json_atomic};

#[derive(Error, Debug)]
pub enum ActivityError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, ActivityError>;

/// Widest window `recent` and `heatmap` will cover (about ten years)
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// First day of a `days`-long window ending `today`, clamped to the
/// widest window and to the calendar's range
fn window_start(days: u32, today: NaiveDate) -> NaiveDate {
    let span = i64::from(days.min(MAX_WINDOW_DAYS)) - 1;
    today
        .checked_sub_signed(Duration::days(span))
        .unwrap_or(NaiveDate::MIN)
}

/// Per-user daily review counters
pub struct ActivityStorage {
    users_dir: PathBuf,
    user_locks: KeyedLocks<Uuid>,
}

impl ActivityStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            users_dir: data_dir.join("users"),
            user_locks: KeyedLocks::new(),
        }
    }

    fn activity_file(&self, user_id: Uuid) -> PathBuf {
        self.users_dir.join(user_id.to_string()).join("activity.json")
    }

    /// All recorded days for a user, oldest first
    pub fn list(&self, user_id: Uuid) -> Result<Vec<DailyActivity>> {
        Ok(read_json(&self.activity_file(user_id))?.unwrap_or_default())
    }

    /// Increment a day's counters. Concurrent callers for the same user are
    /// serialized so no increment is lost.
    pub fn record(&self, user_id: Uuid, date: NaiveDate, delta: ActivityDelta) -> Result<DailyActivity> {
        let lock = self.user_locks.get(user_id);
        let _guard = acquire(&lock);

        let mut entries = self.list(user_id)?;
        let updated = match entries.binary_search_by(|a| a.date.cmp(&date)) {
            Ok(index) => {
                entries[index].apply(delta);
                entries[index].clone()
            }
            Err(index) => {
                let mut entry = DailyActivity::empty(date);
                entry.apply(delta);
                entries.insert(index, entry.clone());
                entry
            }
        };

        let path = self.activity_file(user_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_json_atomic(&path, &entries)?;

        log::debug!(
            "Activity for {} on {}: {} reviewed",
            user_id,
            date,
            updated.reviewed
        );
        Ok(updated)
    }

    /// Recorded days within `[start, end]`
    pub fn list_range(&self, user_id: Uuid, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyActivity>> {
        Ok(self
            .list(user_id)?
            .into_iter()
            .filter(|a| a.date >= start && a.date <= end)
            .collect())
    }

    /// Recorded days within the last `days` days ending `today`, at most
    /// `MAX_WINDOW_DAYS`
    pub fn recent(&self, user_id: Uuid, days: u32, today: NaiveDate) -> Result<Vec<DailyActivity>> {
        if days == 0 {
            return Ok(Vec::new());
        }
        self.list_range(user_id, window_start(days, today), today)
    }

    /// One cell per day for the last `days` days ending `today`, zero-filled.
    /// Windows wider than `MAX_WINDOW_DAYS` are clamped.
    pub fn heatmap(&self, user_id: Uuid, days: u32, today: NaiveDate) -> Result<Vec<HeatmapEntry>> {
        if days == 0 {
            return Ok(Vec::new());
        }
        let recorded = self.recent(user_id, days, today)?;
        let mut recorded = recorded.into_iter().peekable();

        let mut cells = Vec::with_capacity(days.min(MAX_WINDOW_DAYS) as usize);
        for date in window_start(days, today).iter_days().take_while(|d| *d <= today) {
            let count = match recorded.peek() {
                Some(entry) if entry.date == date => {
                    let count = entry.reviewed;
                    recorded.next();
                    count
                }
                _ => 0,
            };
            cells.push(HeatmapEntry { date, count });
        }

        Ok(cells)
    }

    pub fn streak(&self, user_id: Uuid, today: NaiveDate) -> Result<StreakSummary> {
        let activity = self.list(user_id)?;
        Ok(streak::summarize(&activity, today))
    }

    /// Rewrite a user's activity file in canonical form: sorted by date,
    /// one entry per date (duplicates summed), idle days dropped. Returns
    /// the canonical entries.
    pub fn refresh(&self, user_id: Uuid) -> Result<Vec<DailyActivity>> {
        let lock = self.user_locks.get(user_id);
        let _guard = acquire(&lock);

        let stored = self.list(user_id)?;
        let mut entries: Vec<DailyActivity> = Vec::with_capacity(stored.len());
        let mut sorted = stored.clone();
        sorted.sort_by_key(|a| a.date);
        for entry in sorted {
            match entries.last_mut() {
                Some(last) if last.date == entry.date => last.apply(ActivityDelta {
                    reviewed: entry.reviewed,
                    mastered: entry.mastered,
                    learning: entry.learning,
                }),
                _ => entries.push(entry),
            }
        }
        entries.retain(|a| a.reviewed > 0 || a.mastered > 0 || a.learning > 0);

        if entries != stored {
            write_json_atomic(&self.activity_file(user_id), &entries)?;
            log::info!(
                "Refreshed activity for {}: {} stored entries -> {}",
                user_id,
                stored.len(),
                entries.len()
            );
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::CardStatus;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_storage() -> (ActivityStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = ActivityStorage::new(temp_dir.path().to_path_buf());
        (storage, temp_dir)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn review() -> ActivityDelta {
        ActivityDelta::from_transition(CardStatus::Review, CardStatus::Review)
    }

    #[test]
    fn test_record_increments_and_sorts() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();

        storage.record(user, day(5), review()).unwrap();
        storage
            .record(user, day(5), ActivityDelta::from_transition(CardStatus::New, CardStatus::Learning))
            .unwrap();
        storage
            .record(user, day(3), ActivityDelta::from_transition(CardStatus::Review, CardStatus::Mastered))
            .unwrap();

        let entries = storage.list(user).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, day(3));
        assert_eq!(entries[0].mastered, 1);
        assert_eq!(entries[1].reviewed, 2);
        assert_eq!(entries[1].learning, 1);
    }

    #[test]
    fn test_users_are_isolated() {
        let (storage, _temp) = create_test_storage();
        let alice = Uuid::new_v4();
        storage.record(alice, day(1), review()).unwrap();
        assert!(storage.list(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn test_recent_and_heatmap() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        storage.record(user, day(1), review()).unwrap();
        storage.record(user, day(8), review()).unwrap();
        storage.record(user, day(8), review()).unwrap();
        storage.record(user, day(10), review()).unwrap();

        let recent = storage.recent(user, 3, day(10)).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].date, day(8));

        let heatmap = storage.heatmap(user, 3, day(10)).unwrap();
        assert_eq!(
            heatmap,
            vec![
                HeatmapEntry { date: day(8), count: 2 },
                HeatmapEntry { date: day(9), count: 0 },
                HeatmapEntry { date: day(10), count: 1 },
            ]
        );

        assert!(storage.heatmap(user, 0, day(10)).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_windows_are_clamped() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        storage.record(user, day(10), review()).unwrap();

        let heatmap = storage.heatmap(user, u32::MAX, day(10)).unwrap();
        assert_eq!(heatmap.len(), MAX_WINDOW_DAYS as usize);
        assert_eq!(heatmap.last().unwrap().date, day(10));
        assert_eq!(heatmap.last().unwrap().count, 1);

        let recent = storage.recent(user, 50_000_000, day(10)).unwrap();
        assert_eq!(recent.len(), 1);

        // Near the start of the calendar the window stops at the first date
        let early = storage.heatmap(user, 30, NaiveDate::MIN).unwrap();
        assert_eq!(early.len(), 1);
    }

    #[test]
    fn test_refresh_canonicalizes_file() {
        let (storage, temp) = create_test_storage();
        let user = Uuid::new_v4();
        let path = temp
            .path()
            .join("users")
            .join(user.to_string())
            .join("activity.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let mut idle = DailyActivity::empty(day(2));
        idle.reviewed = 0;
        let mut late = DailyActivity::empty(day(9));
        late.reviewed = 2;
        let mut early = DailyActivity::empty(day(4));
        early.reviewed = 1;
        let mut late_again = DailyActivity::empty(day(9));
        late_again.reviewed = 3;
        late_again.mastered = 1;
        write_json_atomic(&path, &vec![late, idle, early, late_again]).unwrap();

        let refreshed = storage.refresh(user).unwrap();
        assert_eq!(refreshed.len(), 2);
        assert_eq!(refreshed[0].date, day(4));
        assert_eq!(refreshed[1].reviewed, 5);
        assert_eq!(refreshed[1].mastered, 1);
        assert_eq!(storage.list(user).unwrap(), refreshed);

        // Already canonical: nothing changes
        assert_eq!(storage.refresh(user).unwrap(), refreshed);
        assert!(storage.refresh(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn test_streak_from_storage() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        for d in [6, 7, 9, 10] {
            storage.record(user, day(d), review()).unwrap();
        }
        let summary = storage.streak(user, day(10)).unwrap();
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.longest_streak, 2);
        assert_eq!(summary.total_reviews, 4);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let (storage, _temp) = create_test_storage();
        let storage = Arc::new(storage);
        let user = Uuid::new_v4();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let storage = Arc::clone(&storage);
                scope.spawn(move || {
                    for _ in 0..25 {
                        storage.record(user, day(1), review()).unwrap();
                    }
                });
            }
        });

        assert_eq!(storage.list(user).unwrap()[0].reviewed, 100);
    }
}
