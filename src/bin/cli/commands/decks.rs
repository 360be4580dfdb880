use anyhow::Result;
use chrono::Utc;

use flashdeck_lib::flashcards::CreateDeckRequest;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run_list(app: &App, public: bool, format: &OutputFormat, use_color: bool) -> Result<()> {
    let now = Utc::now();
    let decks = if public {
        app.service.list_public_decks(now)?
    } else {
        app.service.list_decks(app.user_id, now)?
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&decks)?);
        }
        OutputFormat::Plain => {
            if decks.is_empty() {
                println!("No decks found.");
                return Ok(());
            }

            let max_title = decks.iter().map(|d| d.title.chars().count()).max().unwrap_or(5).max(5);

            println!("{:<8} {:<width$} {:>5} {:>5}", "Id", "Deck", "Cards", "Due", width = max_title);
            println!(
                "{} {} {} {}",
                "\u{2500}".repeat(8),
                "\u{2500}".repeat(max_title),
                "\u{2500}".repeat(5),
                "\u{2500}".repeat(5)
            );

            for deck in &decks {
                let id = deck.id.to_string();
                let due = format!("{:>5}", deck.due_card_count);
                let due = if deck.due_card_count > 0 {
                    paint(&due, Color::YELLOW, use_color)
                } else {
                    due
                };
                let public = if deck.is_public { " [public]" } else { "" };
                println!(
                    "{:<8} {:<width$} {:>5} {}{}",
                    &id[..8],
                    deck.title,
                    deck.card_count,
                    due,
                    public,
                    width = max_title
                );
            }
        }
    }

    Ok(())
}

pub fn run_create(
    app: &App,
    title: &str,
    description: Option<String>,
    public: bool,
    format: &OutputFormat,
) -> Result<()> {
    let deck = app.service.cards().create_deck(
        app.user_id,
        CreateDeckRequest {
            title: title.to_string(),
            description,
            is_public: public,
        },
    )?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&deck)?),
        OutputFormat::Plain => println!("Created deck \"{}\" ({})", deck.title, deck.id),
    }
    Ok(())
}

pub fn run_delete(app: &App, deck_name: &str, format: &OutputFormat) -> Result<()> {
    let deck = app.find_deck(deck_name)?;
    app.service.cards().delete_deck(app.user_id, deck.id)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": deck.id.to_string(),
                "title": deck.title,
                "deletedCards": deck.card_count,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Deleted deck \"{}\" and {} card(s)", deck.title, deck.card_count);
        }
    }
    Ok(())
}
