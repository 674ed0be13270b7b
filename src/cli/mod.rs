pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "viewdeck")]
#[command(about = "A terminal hub for a YouTube channel's RSS feed", long_about = None)]
pub struct Cli {
    /// Path to the config file (defaults to ~/.config/viewdeck/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the feed (cache-aware) and print a summary
    Fetch {
        /// Bypass caches and hit the network
        #[arg(long)]
        refresh: bool,
    },
    /// List videos from the current snapshot
    List {
        /// Kind filter: all, videos, shorts
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// Sort order: newest, oldest
        #[arg(short, long, default_value = "newest")]
        sort: String,

        /// Case-insensitive substring match on the title
        #[arg(long)]
        search: Option<String>,

        /// Exact (case-insensitive) keyword match
        #[arg(short, long)]
        keyword: Option<String>,

        /// Probe thumbnails to classify unknown entries first
        #[arg(long)]
        classify: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Import feed markup from a file ("-" reads stdin), replacing the
    /// manual override
    Import {
        path: PathBuf,
    },
    /// Probe thumbnails to classify unknown entries
    Classify,
    /// Show watch history
    History {
        /// Clear the history instead
        #[arg(long)]
        clear: bool,
    },
    /// Show or change settings
    Settings {
        /// Theme: light, dark, system
        #[arg(long)]
        theme: Option<String>,

        /// Autoplay on selection
        #[arg(long)]
        autoplay: Option<bool>,

        /// Ad slots enabled
        #[arg(long)]
        ads: Option<bool>,
    },
    /// Clear stored state: snapshot, manual, classifications, history, all
    Clear {
        target: String,
    },
    /// Run the CORS proxy
    Proxy {
        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Launch the TUI
    Tui,
}
