//! Streak calculation over daily activity

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use super::models::{DailyActivity, StreakSummary};

/// Summarize streaks as of `today`.
///
/// The current streak walks backward from `today` and stops at the first day
/// without reviews, so a day with no study yet ends the streak at zero.
pub fn summarize(activity: &[DailyActivity], today: NaiveDate) -> StreakSummary {
    let active: BTreeSet<NaiveDate> = activity
        .iter()
        .filter(|a| a.reviewed > 0)
        .map(|a| a.date)
        .collect();

    StreakSummary {
        current_streak: current_streak(&active, today),
        longest_streak: longest_streak(&active),
        active_days: active.len() as u32,
        total_reviews: activity.iter().map(|a| u64::from(a.reviewed)).sum(),
    }
}

fn current_streak(active: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut check_date = Some(today);
    while let Some(date) = check_date.filter(|d| active.contains(d)) {
        streak += 1;
        check_date = date.pred_opt();
    }
    streak
}

fn longest_streak(active: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &date in active {
        run = match previous {
            Some(prev) if date - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }

    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn reviewed(date: NaiveDate, count: u32) -> DailyActivity {
        DailyActivity {
            reviewed: count,
            ..DailyActivity::empty(date)
        }
    }

    #[test]
    fn test_current_streak_walks_back_from_today() {
        let activity = vec![
            reviewed(day(1), 3),
            reviewed(day(3), 1),
            reviewed(day(4), 2),
            reviewed(day(5), 5),
        ];

        let summary = summarize(&activity, day(5));
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.longest_streak, 3);
        assert_eq!(summary.active_days, 4);
        assert_eq!(summary.total_reviews, 11);
    }

    #[test]
    fn test_idle_today_breaks_streak() {
        let activity = vec![reviewed(day(3), 1), reviewed(day(4), 1)];
        let summary = summarize(&activity, day(5));
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.longest_streak, 2);
    }

    #[test]
    fn test_zero_review_days_are_gaps() {
        let activity = vec![
            reviewed(day(8), 2),
            reviewed(day(9), 0),
            reviewed(day(10), 4),
        ];
        let summary = summarize(&activity, day(10));
        assert_eq!(summary.current_streak, 1);
        assert_eq!(summary.longest_streak, 1);
        assert_eq!(summary.active_days, 2);
    }

    #[test]
    fn test_longest_streak_across_month_boundary() {
        let activity = vec![
            reviewed(NaiveDate::from_ymd_opt(2024, 5, 30).unwrap(), 1),
            reviewed(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(), 1),
            reviewed(day(1), 1),
            reviewed(day(2), 1),
            reviewed(day(20), 1),
        ];
        let summary = summarize(&activity, day(20));
        assert_eq!(summary.longest_streak, 4);
        assert_eq!(summary.current_streak, 1);
    }

    #[test]
    fn test_streak_stops_at_first_calendar_day() {
        let first = NaiveDate::MIN;
        let activity = vec![reviewed(first, 1), reviewed(first.succ_opt().unwrap(), 1)];
        let summary = summarize(&activity, first.succ_opt().unwrap());
        assert_eq!(summary.current_streak, 2);
    }

    #[test]
    fn test_no_activity() {
        assert_eq!(summarize(&[], day(1)), StreakSummary::default());
    }
}
