use anyhow::{bail, Result};
use chrono::Utc;

use flashdeck_lib::flashcards::algorithm::{format_interval, preview_intervals};

use crate::app::App;
use crate::render::terminal::{paint, status_color, status_label, truncate, Color};
use crate::OutputFormat;

/// Accept a numeric grade or one of the named shortcuts
pub fn parse_quality(input: &str) -> Result<i64> {
    if let Ok(value) = input.parse::<i64>() {
        return Ok(value);
    }
    match input.to_lowercase().as_str() {
        "again" | "blackout" => Ok(0),
        "hard" => Ok(3),
        "good" => Ok(4),
        "easy" | "perfect" => Ok(5),
        _ => bail!("Invalid quality '{}': use 0-5, again, hard, good or easy", input),
    }
}

pub fn run_due(
    app: &App,
    deck_name: Option<&str>,
    limit: Option<usize>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let deck = deck_name.map(|name| app.find_deck(name)).transpose()?;
    let now = Utc::now();
    let due = app
        .service
        .due_cards(app.user_id, deck.as_ref().map(|d| d.id), now, limit)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&due)?);
        }
        OutputFormat::Plain => {
            if due.is_empty() {
                println!("Nothing due. Come back later.");
                return Ok(());
            }

            for item in &due {
                let id = item.card.id.to_string();
                let preview = preview_intervals(&item.state, now, app.service.policy());
                let preview: Vec<String> = preview
                    .iter()
                    .enumerate()
                    .map(|(q, days)| format!("{}:{}", q, format_interval(*days)))
                    .collect();
                println!(
                    "{}  {} {}",
                    &id[..8],
                    status_label(item.state.status, use_color),
                    truncate(&item.card.front, 50)
                );
                println!("          {}", paint(&preview.join("  "), Color::GRAY, use_color));
            }
            println!("\n{} card(s) due", due.len());
        }
    }

    Ok(())
}

pub fn run_review(
    app: &App,
    card_id: &str,
    quality: &str,
    expected_version: Option<u64>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let quality = parse_quality(quality)?;
    let card = app.find_card(card_id)?;
    let updated = app
        .service
        .apply_review(app.user_id, card.card.id, quality, expected_version, Utc::now())?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&updated)?),
        OutputFormat::Plain => {
            println!("{}", truncate(&updated.card.front, 60));
            println!(
                "  {} \u{2192} {}  next in {}  (ease {:.2}, version {})",
                paint(card.state.status.as_str(), status_color(card.state.status), use_color),
                paint(updated.state.status.as_str(), status_color(updated.state.status), use_color),
                format_interval(updated.state.interval),
                updated.state.ease_factor,
                updated.state.version,
            );
        }
    }
    Ok(())
}

pub fn run_reset(app: &App, card_id: &str, format: &OutputFormat) -> Result<()> {
    let card = app.find_card(card_id)?;
    let updated = app
        .service
        .reset_schedule(app.user_id, card.card.id, Utc::now())?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&updated)?),
        OutputFormat::Plain => println!("Reset card {} to NEW", updated.card.id),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quality() {
        assert_eq!(parse_quality("4").unwrap(), 4);
        assert_eq!(parse_quality("Again").unwrap(), 0);
        assert_eq!(parse_quality("easy").unwrap(), 5);
        // Range is checked by the service
        assert_eq!(parse_quality("9").unwrap(), 9);
        assert!(parse_quality("meh").is_err());
    }
}
