mod app;
mod commands;
mod render;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use flashdeck_lib::flashcards::CardStatus;

#[derive(Parser)]
#[command(name = "flashdeck-cli", about = "Spaced repetition flashcards from the terminal", version)]
struct Cli {
    /// Config file (default: ~/.config/flashdeck/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// User whose decks to use (default: the local profile)
    #[arg(long, global = true, default_value_t = Uuid::nil())]
    user: Uuid,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List decks with card and due counts
    Decks {
        /// List public decks of every user instead
        #[arg(long)]
        public: bool,
    },

    /// Create a deck
    DeckNew {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Make the deck visible in the public listing
        #[arg(long)]
        public: bool,
    },

    /// Delete a deck and all its cards
    DeckRm {
        /// Deck title or id (case-insensitive prefix match)
        deck: String,
    },

    /// List cards in a deck
    Cards {
        /// Deck title or id
        deck: String,
        /// Only cards with this status (new, learning, review, mastered, relearning)
        #[arg(long)]
        status: Option<CardStatus>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Add a card, or import tab-separated cards with --tsv
    Add {
        /// Deck title or id
        deck: String,
        front: Option<String>,
        back: Option<String>,
        #[arg(long)]
        note: Option<String>,
        /// File of front<TAB>back[<TAB>note] lines ("-" for stdin)
        #[arg(long, conflicts_with_all = ["front", "back", "note"])]
        tsv: Option<String>,
    },

    /// Show cards due now, oldest first
    Due {
        /// Limit to one deck
        deck: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Grade a card: 0-5 or again/hard/good/easy
    Review {
        /// Card id or id prefix
        card: String,
        quality: String,
        /// Reject the review if the card changed since this version
        #[arg(long)]
        expected_version: Option<u64>,
    },

    /// Reset a card's schedule to NEW
    Reset {
        /// Card id or id prefix
        card: String,
    },

    /// Show totals, streaks or one deck's breakdown
    Stats {
        /// Deck title or id
        deck: Option<String>,
    },

    /// Show reviews per day
    Activity {
        #[arg(long, default_value = "30")]
        days: u32,
    },

    /// Run the HTTP API server
    Serve {
        /// Override the configured host
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
}

fn read_input(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let app = app::App::new(cli.config.as_deref(), cli.data_dir.clone(), cli.user)?;

    match cli.command {
        Command::Decks { public } => {
            commands::decks::run_list(&app, public, &cli.format, use_color)?;
        }
        Command::DeckNew { title, description, public } => {
            commands::decks::run_create(&app, &title, description, public, &cli.format)?;
        }
        Command::DeckRm { deck } => {
            commands::decks::run_delete(&app, &deck, &cli.format)?;
        }
        Command::Cards { deck, status, limit, offset } => {
            commands::cards::run_list(&app, &deck, status, limit, offset, &cli.format, use_color)?;
        }
        Command::Add { deck, front, back, note, tsv } => match (tsv, front, back) {
            (Some(source), _, _) => {
                let text = read_input(&source)?;
                commands::cards::run_import(&app, &deck, &text, &cli.format)?;
            }
            (None, Some(front), Some(back)) => {
                commands::cards::run_add(&app, &deck, front, back, note, &cli.format)?;
            }
            _ => bail!("Give FRONT and BACK, or --tsv FILE"),
        },
        Command::Due { deck, limit } => {
            commands::review::run_due(&app, deck.as_deref(), limit, &cli.format, use_color)?;
        }
        Command::Review { card, quality, expected_version } => {
            commands::review::run_review(&app, &card, &quality, expected_version, &cli.format, use_color)?;
        }
        Command::Reset { card } => {
            commands::review::run_reset(&app, &card, &cli.format)?;
        }
        Command::Stats { deck } => {
            commands::stats::run_stats(&app, deck.as_deref(), &cli.format, use_color)?;
        }
        Command::Activity { days } => {
            commands::stats::run_activity(&app, days, &cli.format, use_color)?;
        }
        Command::Serve { host, port } => {
            let mut config = app.config.clone();
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
            runtime.block_on(flashdeck_lib::serve(&config))?;
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
