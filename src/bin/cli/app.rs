use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use flashdeck_lib::config::AppConfig;
use flashdeck_lib::flashcards::{CardWithState, Deck};
use flashdeck_lib::study::StudyService;

/// Shared application state for CLI commands
pub struct App {
    pub config: AppConfig,
    pub service: StudyService,
    pub user_id: Uuid,
}

impl App {
    /// Load config, apply flag overrides and open the stores
    pub fn new(config_path: Option<&Path>, data_dir: Option<PathBuf>, user_id: Uuid) -> Result<Self> {
        let mut config = AppConfig::load(config_path).context("Failed to load config")?;
        if let Some(dir) = data_dir {
            config.data_dir = Some(dir);
        }

        let service = StudyService::from_config(&config).context("Failed to get data directory")?;
        service
            .cards()
            .init(user_id)
            .context("Failed to initialize card storage")?;

        Ok(Self {
            config,
            service,
            user_id,
        })
    }

    /// Find a deck by id, id prefix or title (case-insensitive prefix match)
    pub fn find_deck(&self, name: &str) -> Result<Deck> {
        let decks = self
            .service
            .list_decks(self.user_id, chrono::Utc::now())
            .context("Failed to list decks")?;

        let name_lower = name.to_lowercase();

        // Exact id or title first
        if let Some(deck) = decks
            .iter()
            .find(|d| d.id.to_string() == name_lower || d.title.to_lowercase() == name_lower)
        {
            return Ok(deck.clone());
        }

        let matches: Vec<&Deck> = decks
            .iter()
            .filter(|d| {
                d.title.to_lowercase().starts_with(&name_lower)
                    || d.id.to_string().starts_with(&name_lower)
            })
            .collect();

        match matches.len() {
            0 => bail!(
                "No deck matching '{}'. Available decks:\n{}",
                name,
                decks
                    .iter()
                    .map(|d| format!("  - {}", d.title))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
            1 => Ok(matches[0].clone()),
            _ => bail!(
                "Ambiguous deck name '{}'. Matches:\n{}",
                name,
                matches
                    .iter()
                    .map(|d| format!("  - {} ({})", d.title, d.id))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        }
    }

    /// Find a card by id or id prefix across all decks
    pub fn find_card(&self, id: &str) -> Result<CardWithState> {
        if let Ok(card_id) = Uuid::parse_str(id) {
            return self
                .service
                .cards()
                .get_card_with_state(self.user_id, card_id)
                .with_context(|| format!("Card '{}' not found", id));
        }

        let cards = self
            .service
            .cards()
            .list_all_cards_with_state(self.user_id)
            .context("Failed to list cards")?;
        let id_lower = id.to_lowercase();
        let mut matches: Vec<CardWithState> = cards
            .into_iter()
            .filter(|c| c.card.id.to_string().starts_with(&id_lower))
            .collect();

        match matches.len() {
            0 => bail!("No card with id '{}'", id),
            1 => Ok(matches.remove(0)),
            n => bail!("Card id prefix '{}' is ambiguous ({} matches)", id, n),
        }
    }
}
