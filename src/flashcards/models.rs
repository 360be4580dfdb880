//! Data models for the flashcard system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A deck is a collection of flashcards owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    /// Derived from the card store on read, never authoritative
    #[serde(default, skip_deserializing)]
    pub card_count: usize,
    /// Derived from the card store on read, never authoritative
    #[serde(default, skip_deserializing)]
    pub due_card_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(user_id: Uuid, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            description: None,
            is_public: false,
            card_count: 0,
            due_card_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to create a deck
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeckRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Partial deck update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeckRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// A flashcard with question (front) and answer (back)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub front: String,
    pub back: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flashcard {
    pub fn new(deck_id: Uuid, front: String, back: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            deck_id,
            front,
            back,
            note: None,
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to create a card
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Partial card update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    pub front: Option<String>,
    pub back: Option<String>,
    pub note: Option<String>,
}

/// Status of a card in the spaced repetition system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    /// Never reviewed
    #[default]
    New,
    /// First successful recall
    Learning,
    /// Regular spaced review
    Review,
    /// Interval has reached the mastery threshold
    Mastered,
    /// Failed and re-learning
    Relearning,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Learning => "LEARNING",
            Self::Review => "REVIEW",
            Self::Mastered => "MASTERED",
            Self::Relearning => "RELEARNING",
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NEW" => Ok(Self::New),
            "LEARNING" => Ok(Self::Learning),
            "REVIEW" => Ok(Self::Review),
            "MASTERED" => Ok(Self::Mastered),
            "RELEARNING" => Ok(Self::Relearning),
            other => Err(format!("unknown card status: {}", other)),
        }
    }
}

/// Current spaced repetition state for a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardState {
    pub card_id: Uuid,
    /// Current interval in days
    #[serde(default)]
    pub interval: u32,
    /// SM-2 easiness factor, never below 1.3
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    /// Consecutive successful reviews
    #[serde(default)]
    pub repetition: u32,
    /// When the card is due for review
    pub next_review_date: DateTime<Utc>,
    /// Total number of reviews
    #[serde(default)]
    pub review_count: u32,
    /// Number of correct responses
    #[serde(default)]
    pub correct_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Current status in the learning process
    #[serde(default)]
    pub status: CardStatus,
    /// Bumped on every persisted change
    #[serde(default)]
    pub version: u64,
}

pub(crate) fn default_ease_factor() -> f64 {
    2.5
}

impl CardState {
    pub fn new(card_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            card_id,
            interval: 0,
            ease_factor: default_ease_factor(),
            repetition: 0,
            next_review_date: now,
            review_count: 0,
            correct_count: 0,
            last_reviewed_at: None,
            status: CardStatus::New,
            version: 0,
        }
    }

    /// Check if the card is due for review at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }
}

/// A card with its current state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardWithState {
    pub card: Flashcard,
    pub state: CardState,
}

/// Filter and window for card listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
    pub status: Option<CardStatus>,
}

/// Window for deck listings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

/// One page of a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Paginated<T> {
    /// Cut one page out of a full listing. No limit means everything from
    /// `offset` on.
    pub fn from_items(items: Vec<T>, limit: Option<usize>, offset: usize) -> Self {
        let total = items.len();
        let limit = limit.unwrap_or(total);
        Self {
            items: items.into_iter().skip(offset).take(limit).collect(),
            total,
            limit,
            offset,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
