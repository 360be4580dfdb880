//! SM-2 Spaced Repetition Algorithm
//!
//! Implementation of the SuperMemo 2 algorithm for calculating
//! optimal review intervals based on user performance.
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but upon seeing answer, remembered
//! - 2: Incorrect, but answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect response with no hesitation
//!
//! The scheduler is a pure function of the prior state, the quality and the
//! review time. Status moves NEW -> LEARNING -> REVIEW -> MASTERED on success;
//! any failed review lands in RELEARNING.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{CardState, CardStatus};

/// Minimum ease factor allowed
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Longest interval ever scheduled (100 years)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Lowest quality that counts as a successful recall
const PASSING_QUALITY: u8 = 3;

/// Rejected quality, carrying the submitted value as text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid quality {0}: expected an integer between 0 and 5")]
pub struct InvalidQuality(pub String);

/// A validated SM-2 quality rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    /// Complete blackout; what the client sends for "reject"
    pub const BLACKOUT: Quality = Quality(0);
    /// Perfect recall; what the client sends for "accept"
    pub const PERFECT: Quality = Quality(5);

    pub fn new(value: i64) -> Result<Self, InvalidQuality> {
        match value {
            0..=5 => Ok(Self(value as u8)),
            _ => Err(InvalidQuality(value.to_string())),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= PASSING_QUALITY
    }

    /// All six ratings in ascending order
    pub fn all() -> impl Iterator<Item = Quality> {
        (0..=5).map(Quality)
    }
}

impl TryFrom<i64> for Quality {
    type Error = InvalidQuality;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Tunable scheduling constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerPolicy {
    /// A successful review whose interval reaches this many days masters the card
    pub mastered_interval_days: u32,
    /// Interval assigned after a failed review
    pub relearning_interval_days: u32,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self {
            mastered_interval_days: 21,
            relearning_interval_days: 1,
        }
    }
}

/// Result of calculating the next review
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewResult {
    pub interval: u32,
    pub ease_factor: f64,
    pub repetition: u32,
    pub next_review_date: DateTime<Utc>,
    pub status: CardStatus,
}

/// EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), floored at 1.3
fn adjust_ease_factor(ease_factor: f64, quality: Quality) -> f64 {
    let miss = f64::from(5 - quality.value());
    (ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR)
}

/// Calculate the next scheduling state for a card using SM-2
pub fn calculate_next_review(
    state: &CardState,
    quality: Quality,
    now: DateTime<Utc>,
    policy: &SchedulerPolicy,
) -> ReviewResult {
    let ease_factor = adjust_ease_factor(state.ease_factor, quality);

    let (interval, repetition, status) = if quality.is_pass() {
        let repetition = state.repetition.saturating_add(1);
        let interval = match repetition {
            1 => 1,
            2 => 6,
            // Grows from the easiness the card had going into this review
            // `as` saturates, so huge products land on the cap below
            _ => ((f64::from(state.interval) * state.ease_factor).round() as u32).max(1),
        }
        .min(MAX_INTERVAL_DAYS);

        let status = if interval >= policy.mastered_interval_days {
            CardStatus::Mastered
        } else if repetition == 1 {
            CardStatus::Learning
        } else {
            CardStatus::Review
        };

        (interval, repetition, status)
    } else {
        (
            policy.relearning_interval_days.min(MAX_INTERVAL_DAYS),
            0,
            CardStatus::Relearning,
        )
    };

    ReviewResult {
        interval,
        ease_factor,
        repetition,
        next_review_date: due_after(now, interval),
        status,
    }
}

/// `now + days`, pinned to the latest representable instant
fn due_after(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl CardState {
    /// Write a scheduling result into this state. Every scheduling field
    /// changes together and the version is bumped.
    pub fn apply_review(&mut self, result: &ReviewResult, quality: Quality, now: DateTime<Utc>) {
        self.interval = result.interval;
        self.ease_factor = result.ease_factor;
        self.repetition = result.repetition;
        self.next_review_date = result.next_review_date;
        self.status = result.status;
        self.review_count += 1;
        if quality.is_pass() {
            self.correct_count += 1;
        }
        self.last_reviewed_at = Some(now);
        self.version += 1;
    }

    /// Put the card back at the start of its lifecycle, keeping lifetime counters
    pub fn reset_schedule(&mut self, now: DateTime<Utc>) {
        self.interval = 0;
        self.ease_factor = super::models::default_ease_factor();
        self.repetition = 0;
        self.next_review_date = now;
        self.status = CardStatus::New;
        self.version += 1;
    }
}

/// Interval in days each quality rating would produce, indexed by quality
pub fn preview_intervals(
    state: &CardState,
    now: DateTime<Utc>,
    policy: &SchedulerPolicy,
) -> [u32; 6] {
    let mut intervals = [0; 6];
    for quality in Quality::all() {
        intervals[quality.value() as usize] =
            calculate_next_review(state, quality, now, policy).interval;
    }
    intervals
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    if days == 0 {
        "now".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}
