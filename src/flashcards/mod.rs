//! Flashcard and spaced repetition system
//!
//! This module provides:
//! - Deck management (per-user flashcard collections)
//! - Flashcard CRUD
//! - SM-2 spaced repetition algorithm
//! - Review state tracking with per-card serialization
//! - Derived deck counters

pub mod aggregate;
pub mod algorithm;
pub mod locks;
pub mod models;
pub mod storage;

pub use aggregate::{DeckCounts, DeckStats};
pub use algorithm::{InvalidQuality, Quality, SchedulerPolicy};
pub use models::*;
pub use storage::{FlashcardStorage, FlashcardStorageError};
