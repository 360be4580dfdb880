//! Study service: the review workflow and derived views over the stores

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::activity::{
    ActivityDelta, ActivityError, ActivityStorage, DailyActivity, HeatmapEntry, StreakSummary,
};
use crate::config::{self, AppConfig};
use crate::flashcards::aggregate::{self, DeckStats};
use crate::flashcards::algorithm::calculate_next_review;
use crate::flashcards::{
    CardStatus, CardWithState, Deck, FlashcardStorage, FlashcardStorageError, PageQuery,
    Paginated, Quality, SchedulerPolicy,
};

/// Days of activity included in the overview
pub const OVERVIEW_ACTIVITY_DAYS: u32 = 30;

#[derive(Error, Debug)]
pub enum StudyError {
    #[error(transparent)]
    Flashcards(#[from] FlashcardStorageError),

    #[error("Activity error: {0}")]
    Activity(#[from] ActivityError),
}

impl StudyError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Flashcards(err) => err.code(),
            Self::Activity(_) => "STORAGE_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, StudyError>;

/// Headline numbers for a user's dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningOverview {
    pub total_cards: usize,
    pub due_cards: usize,
    pub mastered_cards: usize,
    /// LEARNING, REVIEW and RELEARNING cards
    pub learning_cards: usize,
    pub new_cards: usize,
    pub total_decks: usize,
    pub recent_activity: Vec<DailyActivity>,
}

pub struct StudyService {
    cards: FlashcardStorage,
    activity: ActivityStorage,
    policy: SchedulerPolicy,
}

impl StudyService {
    pub fn new(data_dir: PathBuf, policy: SchedulerPolicy) -> Self {
        Self {
            cards: FlashcardStorage::new(data_dir.clone()),
            activity: ActivityStorage::new(data_dir),
            policy,
        }
    }

    pub fn from_config(config: &AppConfig) -> config::Result<Self> {
        let data_dir = config.resolve_data_dir()?;
        log::info!("Using data directory {:?}", data_dir);
        Ok(Self::new(data_dir, config.scheduler.clone()))
    }

    /// Direct access to deck and card CRUD
    pub fn cards(&self) -> &FlashcardStorage {
        &self.cards
    }

    pub fn activity(&self) -> &ActivityStorage {
        &self.activity
    }

    pub fn policy(&self) -> &SchedulerPolicy {
        &self.policy
    }

    // ==================== Reviews ====================

    /// Apply a review with `quality` (0-5) to a card.
    ///
    /// The quality is validated before the card is looked up. The new state
    /// is persisted as a whole; then the day's activity counters are bumped.
    pub fn apply_review(
        &self,
        user_id: Uuid,
        card_id: Uuid,
        quality: i64,
        expected_version: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<CardWithState> {
        let quality = Quality::new(quality).map_err(FlashcardStorageError::from)?;

        let mut before = CardStatus::New;
        let updated = self
            .cards
            .modify_card_state(user_id, card_id, expected_version, |state| {
                before = state.status;
                let result = calculate_next_review(state, quality, now, &self.policy);
                state.apply_review(&result, quality, now);
                Ok(())
            })?;

        log::info!(
            "Reviewed card {} with quality {}: {} -> {}, next in {}d",
            card_id,
            quality.value(),
            before,
            updated.state.status,
            updated.state.interval
        );

        // Activity only feeds the heatmap; the review itself already stands
        let delta = ActivityDelta::from_transition(before, updated.state.status);
        if let Err(e) = self.activity.record(user_id, now.date_naive(), delta) {
            log::warn!("Failed to record activity for card {}: {}", card_id, e);
        }

        Ok(updated)
    }

    /// Put a card back to NEW, due immediately
    pub fn reset_schedule(&self, user_id: Uuid, card_id: Uuid, now: DateTime<Utc>) -> Result<CardWithState> {
        let updated = self.cards.modify_card_state(user_id, card_id, None, |state| {
            state.reset_schedule(now);
            Ok(())
        })?;
        log::info!("Reset schedule of card {}", card_id);
        Ok(updated)
    }

    /// Load a card, failing with not-found unless it belongs to `deck_id`
    pub fn card_in_deck(&self, user_id: Uuid, deck_id: Uuid, card_id: Uuid) -> Result<CardWithState> {
        self.cards.get_deck(user_id, deck_id)?;
        let card = self.cards.get_card_with_state(user_id, card_id)?;
        if card.card.deck_id != deck_id {
            return Err(FlashcardStorageError::CardNotFound(card_id).into());
        }
        Ok(card)
    }

    pub fn due_cards(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<CardWithState>> {
        Ok(self.cards.get_due_cards(user_id, deck_id, now, limit)?)
    }

    // ==================== Decks ====================

    fn with_counts(&self, deck: Deck, now: DateTime<Utc>) -> Result<Deck> {
        let cards = self.cards.list_cards_with_state(deck.user_id, deck.id)?;
        let counts = aggregate::deck_counts(cards.iter().map(|c| &c.state), now);
        Ok(deck.with_counts(counts))
    }

    pub fn get_deck(&self, user_id: Uuid, deck_id: Uuid, now: DateTime<Utc>) -> Result<Deck> {
        let deck = self.cards.get_deck(user_id, deck_id)?;
        self.with_counts(deck, now)
    }

    pub fn list_decks(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Deck>> {
        self.cards
            .list_decks(user_id)?
            .into_iter()
            .map(|deck| self.with_counts(deck, now))
            .collect()
    }

    pub fn list_public_decks(&self, now: DateTime<Utc>) -> Result<Vec<Deck>> {
        self.cards
            .list_public_decks()?
            .into_iter()
            .map(|deck| self.with_counts(deck, now))
            .collect()
    }

    /// One page of a user's decks; counts are derived for that page only
    pub fn deck_page(&self, user_id: Uuid, page: PageQuery, now: DateTime<Utc>) -> Result<Paginated<Deck>> {
        let decks = self.cards.list_decks(user_id)?;
        self.counted_page(decks, page, now)
    }

    pub fn public_deck_page(&self, page: PageQuery, now: DateTime<Utc>) -> Result<Paginated<Deck>> {
        let decks = self.cards.list_public_decks()?;
        self.counted_page(decks, page, now)
    }

    fn counted_page(&self, decks: Vec<Deck>, page: PageQuery, now: DateTime<Utc>) -> Result<Paginated<Deck>> {
        let page = Paginated::from_items(decks, page.limit, page.offset);
        let items = page
            .items
            .into_iter()
            .map(|deck| self.with_counts(deck, now))
            .collect::<Result<Vec<_>>>()?;
        Ok(Paginated { items, ..page })
    }

    pub fn due_count(&self, user_id: Uuid, deck_id: Uuid, now: DateTime<Utc>) -> Result<usize> {
        Ok(self.get_deck(user_id, deck_id, now)?.due_card_count)
    }

    pub fn deck_stats(&self, user_id: Uuid, deck_id: Uuid, now: DateTime<Utc>) -> Result<DeckStats> {
        let cards = self.cards.list_cards_with_state(user_id, deck_id)?;
        Ok(aggregate::deck_stats(cards.iter().map(|c| &c.state), now))
    }

    // ==================== Analytics ====================

    pub fn overview(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<LearningOverview> {
        let decks = self.cards.list_decks(user_id)?;
        let cards = self.cards.list_all_cards_with_state(user_id)?;
        let stats = aggregate::deck_stats(cards.iter().map(|c| &c.state), now);

        Ok(LearningOverview {
            total_cards: stats.total_cards,
            due_cards: stats.due_cards,
            mastered_cards: stats.mastered_cards,
            learning_cards: stats.learning_cards + stats.review_cards + stats.relearning_cards,
            new_cards: stats.new_cards,
            total_decks: decks.len(),
            recent_activity: self.activity.recent(user_id, OVERVIEW_ACTIVITY_DAYS, now.date_naive())?,
        })
    }

    pub fn activity_history(&self, user_id: Uuid, days: u32, today: NaiveDate) -> Result<Vec<DailyActivity>> {
        Ok(self.activity.recent(user_id, days, today)?)
    }

    pub fn heatmap(&self, user_id: Uuid, days: u32, today: NaiveDate) -> Result<Vec<HeatmapEntry>> {
        Ok(self.activity.heatmap(user_id, days, today)?)
    }

    pub fn streak(&self, user_id: Uuid, today: NaiveDate) -> Result<StreakSummary> {
        Ok(self.activity.streak(user_id, today)?)
    }

    /// Rewrite the stored activity in canonical form and return the overview
    /// computed from it
    pub fn refresh_activity(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<LearningOverview> {
        self.activity.refresh(user_id)?;
        self.overview(user_id, now)
    }
}
