use anyhow::Result;
use chrono::Utc;

use flashdeck_lib::flashcards::DeckStats;

use crate::app::App;
use crate::render::terminal::{bar, paint, Color};
use crate::OutputFormat;

pub fn run_stats(app: &App, deck_name: Option<&str>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let now = Utc::now();

    match deck_name {
        Some(name) => {
            let deck = app.find_deck(name)?;
            let stats = app.service.deck_stats(app.user_id, deck.id, now)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                OutputFormat::Plain => {
                    println!("{}", paint(&deck.title, Color::BOLD, use_color));
                    print_breakdown(&stats, use_color);
                }
            }
        }
        None => {
            let overview = app.service.overview(app.user_id, now)?;
            let streak = app.service.streak(app.user_id, now.date_naive())?;
            match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "overview": overview,
                        "streak": streak,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Plain => {
                    println!("Decks      {}", overview.total_decks);
                    println!("Cards      {}", overview.total_cards);
                    println!(
                        "Due        {}",
                        paint(&overview.due_cards.to_string(), Color::YELLOW, use_color)
                    );
                    println!("New        {}", overview.new_cards);
                    println!("Learning   {}", overview.learning_cards);
                    println!(
                        "Mastered   {}",
                        paint(&overview.mastered_cards.to_string(), Color::GREEN, use_color)
                    );
                    println!();
                    println!(
                        "Streak     {} day(s), longest {}",
                        streak.current_streak, streak.longest_streak
                    );
                    println!(
                        "Reviews    {} over {} active day(s)",
                        streak.total_reviews, streak.active_days
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_breakdown(stats: &DeckStats, use_color: bool) {
    let rows = [
        ("New", stats.new_cards, Color::BLUE),
        ("Learning", stats.learning_cards, Color::YELLOW),
        ("Review", stats.review_cards, Color::CYAN),
        ("Relearning", stats.relearning_cards, Color::RED),
        ("Mastered", stats.mastered_cards, Color::GREEN),
    ];
    let max = rows.iter().map(|(_, n, _)| *n).max().unwrap_or(0) as u32;

    for (label, count, color) in rows {
        println!(
            "  {:<10} {:>5} {}",
            label,
            count,
            paint(&bar(count as u32, max, 30), color, use_color)
        );
    }
    println!("  {:<10} {:>5}", "Total", stats.total_cards);
    println!("  {:<10} {:>5}", "Due", stats.due_cards);
}

pub fn run_activity(app: &App, days: u32, format: &OutputFormat, use_color: bool) -> Result<()> {
    let today = Utc::now().date_naive();
    let cells = app.service.heatmap(app.user_id, days, today)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&cells)?);
        }
        OutputFormat::Plain => {
            let max = cells.iter().map(|c| c.count).max().unwrap_or(0);
            if max == 0 {
                println!("No reviews in the last {} day(s).", days);
                return Ok(());
            }
            for cell in &cells {
                let count = if cell.count == 0 {
                    paint("    0", Color::GRAY, use_color)
                } else {
                    format!("{:>5}", cell.count)
                };
                println!(
                    "{} {} {}",
                    cell.date.format("%Y-%m-%d %a"),
                    count,
                    paint(&bar(cell.count, max, 40), Color::GREEN, use_color)
                );
            }
        }
    }

    Ok(())
}
