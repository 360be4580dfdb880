//! Derived deck counters, recomputed from card states on every read

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::{CardState, CardStatus, Deck};

/// Badge counters shown next to a deck
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckCounts {
    pub card_count: usize,
    pub due_card_count: usize,
}

/// Breakdown of a deck (or all decks) by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckStats {
    pub total_cards: usize,
    pub due_cards: usize,
    pub new_cards: usize,
    pub learning_cards: usize,
    pub review_cards: usize,
    pub relearning_cards: usize,
    pub mastered_cards: usize,
}

/// Count cards and due cards. Mastered cards count as due once their date passes.
pub fn deck_counts<'a, I>(states: I, now: DateTime<Utc>) -> DeckCounts
where
    I: IntoIterator<Item = &'a CardState>,
{
    states.into_iter().fold(DeckCounts::default(), |mut counts, state| {
        counts.card_count += 1;
        if state.is_due(now) {
            counts.due_card_count += 1;
        }
        counts
    })
}

pub fn deck_stats<'a, I>(states: I, now: DateTime<Utc>) -> DeckStats
where
    I: IntoIterator<Item = &'a CardState>,
{
    let mut stats = DeckStats::default();
    for state in states {
        stats.total_cards += 1;
        if state.is_due(now) {
            stats.due_cards += 1;
        }
        match state.status {
            CardStatus::New => stats.new_cards += 1,
            CardStatus::Learning => stats.learning_cards += 1,
            CardStatus::Review => stats.review_cards += 1,
            CardStatus::Relearning => stats.relearning_cards += 1,
            CardStatus::Mastered => stats.mastered_cards += 1,
        }
    }
    stats
}

impl Deck {
    pub fn with_counts(mut self, counts: DeckCounts) -> Self {
        self.card_count = counts.card_count;
        self.due_card_count = counts.due_card_count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn state(status: CardStatus, due_in_days: i64, now: DateTime<Utc>) -> CardState {
        CardState {
            status,
            next_review_date: now + Duration::days(due_in_days),
            ..CardState::new(Uuid::new_v4(), now)
        }
    }

    #[test]
    fn test_counts_include_overdue_mastered() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let states = vec![
            state(CardStatus::New, 0, now),
            state(CardStatus::Review, 3, now),
            state(CardStatus::Mastered, 30, now),
            state(CardStatus::Mastered, -1, now),
            state(CardStatus::Relearning, -2, now),
        ];

        let counts = deck_counts(&states, now);
        assert_eq!(counts, DeckCounts { card_count: 5, due_card_count: 3 });

        let stats = deck_stats(&states, now);
        assert_eq!(stats.total_cards, 5);
        assert_eq!(stats.due_cards, 3);
        assert_eq!(stats.new_cards, 1);
        assert_eq!(stats.review_cards, 1);
        assert_eq!(stats.mastered_cards, 2);
        assert_eq!(stats.relearning_cards, 1);
        assert_eq!(stats.learning_cards, 0);
    }

    #[test]
    fn test_empty_deck() {
        let now = Utc::now();
        assert_eq!(deck_counts(&Vec::<CardState>::new(), now), DeckCounts::default());
        assert_eq!(deck_stats(&Vec::<CardState>::new(), now), DeckStats::default());
    }

    #[test]
    fn test_with_counts() {
        let deck = Deck::new(Uuid::new_v4(), "Deck".to_string()).with_counts(DeckCounts {
            card_count: 4,
            due_card_count: 2,
        });
        assert_eq!(deck.card_count, 4);
        assert_eq!(deck.due_card_count, 2);
    }
}
