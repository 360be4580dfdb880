use chrono::{DateTime, Utc};
use flashdeck_lib::flashcards::algorithm::format_interval;
use flashdeck_lib::flashcards::CardStatus;

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

pub fn status_color(status: CardStatus) -> &'static str {
    match status {
        CardStatus::New => Color::BLUE,
        CardStatus::Learning => Color::YELLOW,
        CardStatus::Review => Color::CYAN,
        CardStatus::Mastered => Color::GREEN,
        CardStatus::Relearning => Color::RED,
    }
}

/// Status name padded to a fixed column width
pub fn status_label(status: CardStatus, use_color: bool) -> String {
    paint(&format!("{:<10}", status.as_str()), status_color(status), use_color)
}

/// "due", or the time until the card comes up
pub fn due_label(next_review: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if next_review <= now {
        return "due".to_string();
    }
    let days = (next_review - now).num_days();
    if days == 0 {
        let hours = (next_review - now).num_hours();
        format!("in {}h", hours.max(1))
    } else {
        format!("in {}", format_interval(days as u32))
    }
}

/// Truncate to `max` characters, adding an ellipsis
pub fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max {
        single_line
    } else {
        let cut: String = single_line.chars().take(max.saturating_sub(1)).collect();
        format!("{}\u{2026}", cut)
    }
}

/// One row of a bar chart scaled to `max`
pub fn bar(count: u32, max: u32, width: usize) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let len = ((count as f64 / max as f64) * width as f64).ceil() as usize;
    "\u{2588}".repeat(len.clamp(1, width))
}
