//! Storage operations for flashcards
//!
//! Directory structure per user:
//! ```text
//! users/{user-id}/flashcards/
//! ├── decks.json           # Array of all decks
//! ├── cards/
//! │   └── {card-id}.json   # Individual card files
//! └── states/
//!     └── {card-id}.json   # Card spaced repetition state
//! ```
//!
//! Every file is replaced atomically. Read-modify-write cycles on a card run
//! under that card's lock; changes to `decks.json` run under the user's lock.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::algorithm::InvalidQuality;
use super::locks::{acquire, KeyedLocks};
use super::models::*;

#[derive(Error, Debug)]
pub enum FlashcardStorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Deck not found: {0}")]
    DeckNotFound(Uuid),

    #[error("Card not found: {0}")]
    CardNotFound(Uuid),

    #[error(transparent)]
    InvalidQuality(#[from] InvalidQuality),

    #[error("Card {card_id} changed concurrently: expected version {expected}, found {actual}")]
    StaleState {
        card_id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FlashcardStorageError {
    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::Json(_) => "STORAGE_ERROR",
            Self::DeckNotFound(_) => "DECK_NOT_FOUND",
            Self::CardNotFound(_) => "CARD_NOT_FOUND",
            Self::InvalidQuality(_) => "INVALID_QUALITY",
            Self::StaleState { .. } => "STALE_STATE",
            Self::InvalidInput(_) => "INVALID_INPUT",
        }
    }
}

pub type Result<T> = std::result::Result<T, FlashcardStorageError>;

/// Serialize to a sibling `.tmp` file, then rename over the target
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> std::io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)
}

/// Read a JSON file, `None` if it does not exist
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> std::io::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FlashcardStorageError::InvalidInput(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

/// Order due cards oldest-due first, ties broken by card id
pub fn sort_by_due(cards: &mut [CardWithState]) {
    cards.sort_by(|a, b| {
        a.state
            .next_review_date
            .cmp(&b.state.next_review_date)
            .then_with(|| a.card.id.cmp(&b.card.id))
    });
}

/// Storage manager for flashcard operations
pub struct FlashcardStorage {
    /// Root data directory (e.g., ~/.local/share/flashdeck)
    data_dir: PathBuf,
    card_locks: KeyedLocks<Uuid>,
    deck_locks: KeyedLocks<Uuid>,
}

impl FlashcardStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            card_locks: KeyedLocks::new(),
            deck_locks: KeyedLocks::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }

    /// Get the flashcards directory for a user
    fn flashcards_dir(&self, user_id: Uuid) -> PathBuf {
        self.users_dir().join(user_id.to_string()).join("flashcards")
    }

    fn cards_dir(&self, user_id: Uuid) -> PathBuf {
        self.flashcards_dir(user_id).join("cards")
    }

    fn states_dir(&self, user_id: Uuid) -> PathBuf {
        self.flashcards_dir(user_id).join("states")
    }

    fn decks_path(&self, user_id: Uuid) -> PathBuf {
        self.flashcards_dir(user_id).join("decks.json")
    }

    fn card_path(&self, user_id: Uuid, card_id: Uuid) -> PathBuf {
        self.cards_dir(user_id).join(format!("{}.json", card_id))
    }

    fn state_path(&self, user_id: Uuid, card_id: Uuid) -> PathBuf {
        self.states_dir(user_id).join(format!("{}.json", card_id))
    }

    /// Initialize flashcard storage for a user
    pub fn init(&self, user_id: Uuid) -> Result<()> {
        fs::create_dir_all(self.cards_dir(user_id))?;
        fs::create_dir_all(self.states_dir(user_id))?;
        Ok(())
    }

    // ==================== Deck Operations ====================

    /// List all decks owned by a user
    pub fn list_decks(&self, user_id: Uuid) -> Result<Vec<Deck>> {
        Ok(read_json(&self.decks_path(user_id))?.unwrap_or_default())
    }

    /// List public decks across every user
    pub fn list_public_decks(&self) -> Result<Vec<Deck>> {
        let users_dir = self.users_dir();
        if !users_dir.exists() {
            return Ok(Vec::new());
        }

        let mut decks = Vec::new();
        for entry in fs::read_dir(&users_dir)? {
            let entry = entry?;
            let Some(user_id) = entry
                .file_name()
                .to_str()
                .and_then(|name| Uuid::parse_str(name).ok())
            else {
                log::debug!("Skipping non-user entry {:?}", entry.path());
                continue;
            };
            decks.extend(self.list_decks(user_id)?.into_iter().filter(|d| d.is_public));
        }

        decks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(decks)
    }

    /// Get a specific deck
    pub fn get_deck(&self, user_id: Uuid, deck_id: Uuid) -> Result<Deck> {
        self.list_decks(user_id)?
            .into_iter()
            .find(|d| d.id == deck_id)
            .ok_or(FlashcardStorageError::DeckNotFound(deck_id))
    }

    /// Create a new deck
    pub fn create_deck(&self, user_id: Uuid, request: CreateDeckRequest) -> Result<Deck> {
        require_text("title", &request.title)?;
        self.init(user_id)?;

        let mut deck = Deck::new(user_id, request.title.trim().to_string());
        deck.description = request.description;
        deck.is_public = request.is_public;

        let lock = self.deck_locks.get(user_id);
        let _guard = acquire(&lock);

        let mut decks = self.list_decks(user_id)?;
        decks.push(deck.clone());
        write_json_atomic(&self.decks_path(user_id), &decks)?;

        log::info!("Created deck {} for user {}", deck.id, user_id);
        Ok(deck)
    }

    /// Apply a partial update to a deck
    pub fn update_deck(&self, user_id: Uuid, deck_id: Uuid, request: UpdateDeckRequest) -> Result<Deck> {
        if let Some(title) = &request.title {
            require_text("title", title)?;
        }

        let lock = self.deck_locks.get(user_id);
        let _guard = acquire(&lock);

        let mut decks = self.list_decks(user_id)?;
        let deck = decks
            .iter_mut()
            .find(|d| d.id == deck_id)
            .ok_or(FlashcardStorageError::DeckNotFound(deck_id))?;

        if let Some(title) = request.title {
            deck.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            deck.description = Some(description).filter(|d| !d.is_empty());
        }
        if let Some(is_public) = request.is_public {
            deck.is_public = is_public;
        }
        deck.updated_at = Utc::now();

        let updated = deck.clone();
        write_json_atomic(&self.decks_path(user_id), &decks)?;
        Ok(updated)
    }

    /// Delete a deck and all its cards
    pub fn delete_deck(&self, user_id: Uuid, deck_id: Uuid) -> Result<()> {
        let lock = self.deck_locks.get(user_id);
        let _guard = acquire(&lock);

        let mut decks = self.list_decks(user_id)?;
        if !decks.iter().any(|d| d.id == deck_id) {
            return Err(FlashcardStorageError::DeckNotFound(deck_id));
        }

        let cards = self.cards_in_deck(user_id, deck_id)?;
        let card_total = cards.len();
        for card in cards {
            self.delete_card(user_id, card.id)?;
        }

        decks.retain(|d| d.id != deck_id);
        write_json_atomic(&self.decks_path(user_id), &decks)?;

        log::info!("Deleted deck {} with {} cards", deck_id, card_total);
        Ok(())
    }

    // ==================== Card Operations ====================

    /// Load every card file for a user, optionally keeping one deck
    fn scan_cards(&self, user_id: Uuid, deck_id: Option<Uuid>) -> Result<Vec<Flashcard>> {
        let cards_dir = self.cards_dir(user_id);
        if !cards_dir.exists() {
            return Ok(Vec::new());
        }

        let mut cards = Vec::new();
        for entry in fs::read_dir(&cards_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(&path)?;
                let card: Flashcard = serde_json::from_str(&content)?;
                if deck_id.map_or(true, |id| card.deck_id == id) {
                    cards.push(card);
                }
            }
        }

        cards.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        Ok(cards)
    }

    fn cards_in_deck(&self, user_id: Uuid, deck_id: Uuid) -> Result<Vec<Flashcard>> {
        self.scan_cards(user_id, Some(deck_id))
    }

    /// List all cards in a deck
    pub fn list_cards(&self, user_id: Uuid, deck_id: Uuid) -> Result<Vec<Flashcard>> {
        self.get_deck(user_id, deck_id)?;
        self.cards_in_deck(user_id, deck_id)
    }

    /// List all cards of a user across decks
    pub fn list_all_cards(&self, user_id: Uuid) -> Result<Vec<Flashcard>> {
        self.scan_cards(user_id, None)
    }

    fn attach_states(&self, user_id: Uuid, cards: Vec<Flashcard>) -> Result<Vec<CardWithState>> {
        cards
            .into_iter()
            .map(|card| {
                let state = self.load_state(user_id, &card)?;
                Ok(CardWithState { card, state })
            })
            .collect()
    }

    /// All cards of a deck paired with their scheduling state
    pub fn list_cards_with_state(&self, user_id: Uuid, deck_id: Uuid) -> Result<Vec<CardWithState>> {
        let cards = self.list_cards(user_id, deck_id)?;
        self.attach_states(user_id, cards)
    }

    /// All cards of a user paired with their scheduling state
    pub fn list_all_cards_with_state(&self, user_id: Uuid) -> Result<Vec<CardWithState>> {
        let cards = self.list_all_cards(user_id)?;
        self.attach_states(user_id, cards)
    }

    /// One page of a deck's cards, optionally filtered by status
    pub fn query_cards(
        &self,
        user_id: Uuid,
        deck_id: Uuid,
        query: &CardQuery,
    ) -> Result<Paginated<CardWithState>> {
        let mut cards = self.list_cards_with_state(user_id, deck_id)?;
        if let Some(status) = query.status {
            cards.retain(|c| c.state.status == status);
        }

        Ok(Paginated::from_items(cards, query.limit, query.offset))
    }

    /// Get a specific card
    pub fn get_card(&self, user_id: Uuid, card_id: Uuid) -> Result<Flashcard> {
        read_json(&self.card_path(user_id, card_id))?
            .ok_or(FlashcardStorageError::CardNotFound(card_id))
    }

    /// Get a card together with its state
    pub fn get_card_with_state(&self, user_id: Uuid, card_id: Uuid) -> Result<CardWithState> {
        let card = self.get_card(user_id, card_id)?;
        let state = self.load_state(user_id, &card)?;
        Ok(CardWithState { card, state })
    }

    fn write_new_card(&self, user_id: Uuid, card: &Flashcard) -> Result<CardState> {
        write_json_atomic(&self.card_path(user_id, card.id), card)?;
        let state = CardState::new(card.id, card.created_at);
        write_json_atomic(&self.state_path(user_id, card.id), &state)?;
        Ok(state)
    }

    /// Create a new card
    pub fn create_card(&self, user_id: Uuid, deck_id: Uuid, request: CreateCardRequest) -> Result<CardWithState> {
        let mut created = self.create_cards(user_id, deck_id, vec![request])?;
        Ok(created.remove(0))
    }

    /// Create several cards at once. Every request is validated before any
    /// card is written.
    pub fn create_cards(
        &self,
        user_id: Uuid,
        deck_id: Uuid,
        requests: Vec<CreateCardRequest>,
    ) -> Result<Vec<CardWithState>> {
        if requests.is_empty() {
            return Err(FlashcardStorageError::InvalidInput(
                "at least one card is required".to_string(),
            ));
        }
        for request in &requests {
            require_text("front", &request.front)?;
            require_text("back", &request.back)?;
        }

        let lock = self.deck_locks.get(user_id);
        let _guard = acquire(&lock);

        self.get_deck(user_id, deck_id)?;
        self.init(user_id)?;

        // Scan order is by position, so the last card holds the highest one
        let mut position = self
            .cards_in_deck(user_id, deck_id)?
            .last()
            .map_or(0, |card| card.position + 1);
        let mut created = Vec::with_capacity(requests.len());

        for request in requests {
            let mut card = Flashcard::new(deck_id, request.front, request.back);
            card.note = request.note.filter(|n| !n.is_empty());
            card.position = position;
            position += 1;

            let state = self.write_new_card(user_id, &card)?;
            created.push(CardWithState { card, state });
        }

        log::info!("Created {} card(s) in deck {}", created.len(), deck_id);
        Ok(created)
    }

    /// Update the content of a card
    pub fn update_card(&self, user_id: Uuid, card_id: Uuid, request: UpdateCardRequest) -> Result<Flashcard> {
        if let Some(front) = &request.front {
            require_text("front", front)?;
        }
        if let Some(back) = &request.back {
            require_text("back", back)?;
        }

        let lock = self.card_locks.get(card_id);
        let _guard = acquire(&lock);

        let mut card = self.get_card(user_id, card_id)?;
        if let Some(front) = request.front {
            card.front = front;
        }
        if let Some(back) = request.back {
            card.back = back;
        }
        if let Some(note) = request.note {
            card.note = Some(note).filter(|n| !n.is_empty());
        }
        card.updated_at = Utc::now();

        write_json_atomic(&self.card_path(user_id, card_id), &card)?;
        Ok(card)
    }

    /// Delete a card and its state
    pub fn delete_card(&self, user_id: Uuid, card_id: Uuid) -> Result<()> {
        let lock = self.card_locks.get(card_id);
        let _guard = acquire(&lock);

        let card_path = self.card_path(user_id, card_id);
        if !card_path.exists() {
            return Err(FlashcardStorageError::CardNotFound(card_id));
        }
        fs::remove_file(&card_path)?;

        let state_path = self.state_path(user_id, card_id);
        if state_path.exists() {
            fs::remove_file(&state_path)?;
        }

        self.card_locks.remove(&card_id);
        Ok(())
    }

    // ==================== State Operations ====================

    /// A card without a state file is treated as new since its creation
    fn load_state(&self, user_id: Uuid, card: &Flashcard) -> Result<CardState> {
        Ok(read_json(&self.state_path(user_id, card.id))?
            .unwrap_or_else(|| CardState::new(card.id, card.created_at)))
    }

    /// Get the state for a card
    pub fn get_card_state(&self, user_id: Uuid, card_id: Uuid) -> Result<CardState> {
        let card = self.get_card(user_id, card_id)?;
        self.load_state(user_id, &card)
    }

    /// Read-modify-write a card's state while holding the card lock.
    ///
    /// With `expected_version`, the write is refused unless the stored
    /// version still matches. `modify` works on a copy; nothing is written
    /// if it fails.
    pub fn modify_card_state<F>(
        &self,
        user_id: Uuid,
        card_id: Uuid,
        expected_version: Option<u64>,
        modify: F,
    ) -> Result<CardWithState>
    where
        F: FnOnce(&mut CardState) -> Result<()>,
    {
        let lock = self.card_locks.get(card_id);
        let _guard = acquire(&lock);

        let card = self.get_card(user_id, card_id)?;
        let current = self.load_state(user_id, &card)?;

        if let Some(expected) = expected_version {
            if expected != current.version {
                log::warn!(
                    "Rejecting stale update of card {}: expected version {}, found {}",
                    card_id,
                    expected,
                    current.version
                );
                return Err(FlashcardStorageError::StaleState {
                    card_id,
                    expected,
                    actual: current.version,
                });
            }
        }

        let mut next = current;
        modify(&mut next)?;
        write_json_atomic(&self.state_path(user_id, card_id), &next)?;

        Ok(CardWithState { card, state: next })
    }

    // ==================== Review Operations ====================

    /// Get due cards for a user (optionally filtered by deck), oldest-due first
    pub fn get_due_cards(
        &self,
        user_id: Uuid,
        deck_id: Option<Uuid>,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<CardWithState>> {
        let cards = match deck_id {
            Some(did) => self.list_cards_with_state(user_id, did)?,
            None => self.list_all_cards_with_state(user_id)?,
        };

        let mut due: Vec<CardWithState> = cards.into_iter().filter(|c| c.state.is_due(now)).collect();
        sort_by_due(&mut due);
        if let Some(limit) = limit {
            due.truncate(limit);
        }

        log::debug!("{} due card(s) for user {}", due.len(), user_id);
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_storage() -> (FlashcardStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FlashcardStorage::new(temp_dir.path().to_path_buf());
        (storage, temp_dir)
    }

    fn deck_request(title: &str) -> CreateDeckRequest {
        CreateDeckRequest {
            title: title.to_string(),
            description: None,
            is_public: false,
        }
    }

    fn card_request(front: &str) -> CreateCardRequest {
        CreateCardRequest {
            front: front.to_string(),
            back: format!("{} answer", front),
            note: None,
        }
    }

    fn set_due(storage: &FlashcardStorage, user: Uuid, card_id: Uuid, due: DateTime<Utc>) {
        storage
            .modify_card_state(user, card_id, None, |state| {
                state.next_review_date = due;
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_deck_crud() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();

        let deck = storage.create_deck(user, deck_request("  Spanish  ")).unwrap();
        assert_eq!(deck.title, "Spanish");
        assert_eq!(storage.list_decks(user).unwrap().len(), 1);

        let updated = storage
            .update_deck(
                user,
                deck.id,
                UpdateDeckRequest {
                    title: Some("Spanish verbs".to_string()),
                    description: Some("irregulars".to_string()),
                    is_public: Some(true),
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Spanish verbs");
        assert_eq!(updated.description.as_deref(), Some("irregulars"));
        assert!(updated.is_public);

        assert_eq!(storage.get_deck(user, deck.id).unwrap().title, "Spanish verbs");
        assert!(matches!(
            storage.get_deck(user, Uuid::new_v4()),
            Err(FlashcardStorageError::DeckNotFound(_))
        ));
    }

    #[test]
    fn test_create_deck_requires_title() {
        let (storage, _temp) = create_test_storage();
        let err = storage.create_deck(Uuid::new_v4(), deck_request("   ")).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_public_decks_across_users() {
        let (storage, _temp) = create_test_storage();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        storage.create_deck(alice, deck_request("private")).unwrap();
        storage
            .create_deck(
                bob,
                CreateDeckRequest {
                    is_public: true,
                    ..deck_request("shared")
                },
            )
            .unwrap();

        let public = storage.list_public_decks().unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].title, "shared");
        assert_eq!(public[0].user_id, bob);
    }

    #[test]
    fn test_card_crud_and_positions() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        let deck = storage.create_deck(user, deck_request("Deck")).unwrap();

        let first = storage.create_card(user, deck.id, card_request("one")).unwrap();
        let rest = storage
            .create_cards(user, deck.id, vec![card_request("two"), card_request("three")])
            .unwrap();

        assert_eq!(first.card.position, 0);
        assert_eq!(rest[0].card.position, 1);
        assert_eq!(rest[1].card.position, 2);
        assert_eq!(first.state.status, CardStatus::New);
        assert_eq!(first.state.ease_factor, 2.5);
        assert_eq!(first.state.interval, 0);

        let updated = storage
            .update_card(
                user,
                first.card.id,
                UpdateCardRequest {
                    note: Some("mnemonic".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.front, "one");
        assert_eq!(updated.note.as_deref(), Some("mnemonic"));

        storage.delete_card(user, first.card.id).unwrap();
        let fronts: Vec<String> = storage
            .list_cards(user, deck.id)
            .unwrap()
            .into_iter()
            .map(|c| c.front)
            .collect();
        assert_eq!(fronts, vec!["two", "three"]);
        assert!(matches!(
            storage.get_card(user, first.card.id),
            Err(FlashcardStorageError::CardNotFound(_))
        ));
    }

    #[test]
    fn test_positions_stay_unique_after_delete() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        let deck = storage.create_deck(user, deck_request("Deck")).unwrap();

        let cards = storage
            .create_cards(user, deck.id, vec![card_request("one"), card_request("two"), card_request("three")])
            .unwrap();
        storage.delete_card(user, cards[0].card.id).unwrap();

        let added = storage.create_card(user, deck.id, card_request("four")).unwrap();
        assert_eq!(added.card.position, 3);

        let listed = storage.list_cards(user, deck.id).unwrap();
        let positions: Vec<i32> = listed.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(listed.last().unwrap().front, "four");
    }

    #[test]
    fn test_bulk_create_is_validated_up_front() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        let deck = storage.create_deck(user, deck_request("Deck")).unwrap();

        let result = storage.create_cards(user, deck.id, vec![card_request("ok"), card_request("")]);
        assert!(matches!(result, Err(FlashcardStorageError::InvalidInput(_))));
        assert!(storage.list_cards(user, deck.id).unwrap().is_empty());
    }

    #[test]
    fn test_create_card_in_missing_deck() {
        let (storage, _temp) = create_test_storage();
        let result = storage.create_card(Uuid::new_v4(), Uuid::new_v4(), card_request("q"));
        assert!(matches!(result, Err(FlashcardStorageError::DeckNotFound(_))));
    }

    #[test]
    fn test_delete_deck_cascades() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        let doomed = storage.create_deck(user, deck_request("Doomed")).unwrap();
        let kept = storage.create_deck(user, deck_request("Kept")).unwrap();

        let card = storage.create_card(user, doomed.id, card_request("a")).unwrap();
        storage.create_card(user, kept.id, card_request("b")).unwrap();

        storage.delete_deck(user, doomed.id).unwrap();

        assert_eq!(storage.list_decks(user).unwrap().len(), 1);
        assert_eq!(storage.list_all_cards(user).unwrap().len(), 1);
        assert!(storage.get_card_state(user, card.card.id).is_err());
        assert!(!storage.state_path(user, card.card.id).exists());
    }

    #[test]
    fn test_query_cards_paginates_and_filters() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        let deck = storage.create_deck(user, deck_request("Deck")).unwrap();
        let cards = storage
            .create_cards(user, deck.id, (0..5).map(|i| card_request(&format!("q{}", i))).collect())
            .unwrap();

        storage
            .modify_card_state(user, cards[4].card.id, None, |state| {
                state.status = CardStatus::Review;
                Ok(())
            })
            .unwrap();

        let page = storage
            .query_cards(
                user,
                deck.id,
                &CardQuery {
                    limit: Some(2),
                    offset: 1,
                    status: None,
                },
            )
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].card.front, "q1");

        let review = storage
            .query_cards(
                user,
                deck.id,
                &CardQuery {
                    status: Some(CardStatus::Review),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(review.total, 1);
        assert_eq!(review.items[0].card.front, "q4");
    }

    #[test]
    fn test_due_cards_ordering() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        let deck = storage.create_deck(user, deck_request("Deck")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();

        let cards = storage
            .create_cards(user, deck.id, vec![card_request("future"), card_request("yesterday"), card_request("older")])
            .unwrap();
        set_due(&storage, user, cards[0].card.id, now + Duration::days(1));
        set_due(&storage, user, cards[1].card.id, now - Duration::days(1));
        set_due(&storage, user, cards[2].card.id, now - Duration::days(2));

        let due = storage.get_due_cards(user, Some(deck.id), now, None).unwrap();
        let fronts: Vec<&str> = due.iter().map(|c| c.card.front.as_str()).collect();
        assert_eq!(fronts, vec!["older", "yesterday"]);

        let limited = storage.get_due_cards(user, None, now, Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].card.front, "older");
    }

    #[test]
    fn test_due_ties_break_by_card_id() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        let deck = storage.create_deck(user, deck_request("Deck")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();

        let cards = storage
            .create_cards(user, deck.id, (0..4).map(|i| card_request(&format!("q{}", i))).collect())
            .unwrap();
        for card in &cards {
            set_due(&storage, user, card.card.id, now - Duration::hours(1));
        }

        let due = storage.get_due_cards(user, Some(deck.id), now, None).unwrap();
        let ids: Vec<Uuid> = due.iter().map(|c| c.card.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_modify_state_rejects_stale_version() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        let deck = storage.create_deck(user, deck_request("Deck")).unwrap();
        let card = storage.create_card(user, deck.id, card_request("q")).unwrap();

        let bump = |state: &mut CardState| {
            state.version += 1;
            Ok(())
        };

        let first = storage.modify_card_state(user, card.card.id, Some(0), bump).unwrap();
        assert_eq!(first.state.version, 1);

        let err = storage.modify_card_state(user, card.card.id, Some(0), bump).unwrap_err();
        assert!(matches!(
            err,
            FlashcardStorageError::StaleState {
                expected: 0,
                actual: 1,
                ..
            }
        ));
        assert_eq!(storage.get_card_state(user, card.card.id).unwrap().version, 1);
    }

    #[test]
    fn test_failed_modify_writes_nothing() {
        let (storage, _temp) = create_test_storage();
        let user = Uuid::new_v4();
        let deck = storage.create_deck(user, deck_request("Deck")).unwrap();
        let card = storage.create_card(user, deck.id, card_request("q")).unwrap();

        let result = storage.modify_card_state(user, card.card.id, None, |state| {
            state.interval = 99;
            Err(FlashcardStorageError::InvalidInput("nope".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(storage.get_card_state(user, card.card.id).unwrap().interval, 0);
    }

    #[test]
    fn test_concurrent_modifications_serialize() {
        let (storage, _temp) = create_test_storage();
        let storage = Arc::new(storage);
        let user = Uuid::new_v4();
        let deck = storage.create_deck(user, deck_request("Deck")).unwrap();
        let card_id = storage.create_card(user, deck.id, card_request("q")).unwrap().card.id;

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let storage = Arc::clone(&storage);
                scope.spawn(move || {
                    for _ in 0..10 {
                        storage
                            .modify_card_state(user, card_id, None, |state| {
                                state.version += 1;
                                state.review_count += 1;
                                Ok(())
                            })
                            .unwrap();
                    }
                });
            }
        });

        let state = storage.get_card_state(user, card_id).unwrap();
        assert_eq!(state.version, 80);
        assert_eq!(state.review_count, 80);
    }
}
