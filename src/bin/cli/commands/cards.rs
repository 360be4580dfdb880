use anyhow::Result;
use chrono::Utc;

use flashdeck_lib::flashcards::{CardQuery, CardStatus, CreateCardRequest};

use crate::app::App;
use crate::render::terminal::{due_label, status_label, truncate};
use crate::OutputFormat;

pub fn run_list(
    app: &App,
    deck_name: &str,
    status: Option<CardStatus>,
    limit: Option<usize>,
    offset: usize,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let deck = app.find_deck(deck_name)?;
    let page = app.service.cards().query_cards(
        app.user_id,
        deck.id,
        &CardQuery {
            limit,
            offset,
            status,
        },
    )?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        OutputFormat::Plain => {
            if page.items.is_empty() {
                println!("No cards in \"{}\".", deck.title);
                return Ok(());
            }

            let now = Utc::now();
            for item in &page.items {
                let id = item.card.id.to_string();
                println!(
                    "{}  {} {:<8} {}  \u{2192}  {}",
                    &id[..8],
                    status_label(item.state.status, use_color),
                    due_label(item.state.next_review_date, now),
                    truncate(&item.card.front, 40),
                    truncate(&item.card.back, 30),
                );
            }

            let shown_to = page.offset + page.items.len();
            println!("\n{}-{} of {} cards", page.offset + 1, shown_to, page.total);
        }
    }

    Ok(())
}

pub fn run_add(
    app: &App,
    deck_name: &str,
    front: String,
    back: String,
    note: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let deck = app.find_deck(deck_name)?;
    let card = app
        .service
        .cards()
        .create_card(app.user_id, deck.id, CreateCardRequest { front, back, note })?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&card)?),
        OutputFormat::Plain => {
            println!("Added card {} to \"{}\"", card.card.id, deck.title);
        }
    }
    Ok(())
}

/// Bulk import from tab-separated `front<TAB>back[<TAB>note]` lines
pub fn run_import(app: &App, deck_name: &str, text: &str, format: &OutputFormat) -> Result<()> {
    let deck = app.find_deck(deck_name)?;
    let requests = parse_tsv(text)?;
    let created = app.service.cards().create_cards(app.user_id, deck.id, requests)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&created)?),
        OutputFormat::Plain => println!("Imported {} card(s) into \"{}\"", created.len(), deck.title),
    }
    Ok(())
}

fn parse_tsv(text: &str) -> Result<Vec<CreateCardRequest>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let mut fields = line.split('\t');
            match (fields.next(), fields.next()) {
                (Some(front), Some(back)) => Ok(CreateCardRequest {
                    front: front.trim().to_string(),
                    back: back.trim().to_string(),
                    note: fields.next().map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                }),
                _ => anyhow::bail!("Line {}: expected front<TAB>back", i + 1),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tsv() {
        let cards = parse_tsv("hola\thello\n\nadios\tgoodbye\tinformal\n").unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].front, "hola");
        assert_eq!(cards[0].note, None);
        assert_eq!(cards[1].note.as_deref(), Some("informal"));
    }

    #[test]
    fn test_parse_tsv_missing_back() {
        assert!(parse_tsv("just a front").is_err());
    }
}
