//! # Viewdeck
//!
//! A terminal-first hub for browsing a YouTube channel's public RSS feed.
//!
//! ## Architecture
//!
//! Viewdeck follows a modular pipeline architecture:
//!
//! ```text
//! Fetcher → Parser → Classifier → Store → Hub → UI
//! ```
//!
//! - [`fetcher`]: HTTP client for the feed document and thumbnails
//! - [`parser`]: Converts the channel's Atom feed into typed items
//! - [`classifier`]: Resolves video vs. Short from thumbnail geometry
//! - [`store`]: SQLite persistence with per-entity repositories
//! - [`hub`]: Composes the above into load/import/filter operations
//! - [`tui`]: Terminal user interface built with ratatui
//!
//! ## Quick Start
//!
//! ```bash
//! # Fetch and summarize the configured channel feed
//! viewdeck fetch
//!
//! # Browse shorts only, oldest first
//! viewdeck list --filter shorts --sort oldest
//!
//! # Import a feed document by hand
//! viewdeck import feed.xml
//!
//! # Launch the TUI
//! viewdeck tui
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all
/// components: store, fetcher, classifier, hub.
pub mod app;

/// Resolves video vs. Short from natural thumbnail dimensions, with a
/// persistent result cache and bounded probe concurrency.
pub mod classifier;

/// Command-line interface using clap.
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/viewdeck/config.toml`: channel id, feed URL
/// override, cache TTL, proxy bind address, default settings.
pub mod config;

/// Core domain models.
///
/// - [`FeedItem`](domain::FeedItem): one video or Short from the feed
/// - [`FeedSnapshot`](domain::FeedSnapshot): a fetched batch with a TTL
/// - [`FeedQuery`](domain::FeedQuery): search/keyword/kind/sort projection
/// - [`HistoryEntry`](domain::HistoryEntry) and [`Settings`](domain::Settings)
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait over text and byte fetches
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// The feed orchestrator: load, manual import, classification passes,
/// filtered views, history and settings pass-throughs.
pub mod hub;

/// YouTube channel Atom feed parsing (`yt:`/`media:` extensions included).
pub mod parser;

/// Same-origin CORS proxy (`GET /proxy?url=...` passthrough).
pub mod proxy;

/// SQLite persistence layer.
///
/// One repository trait per entity — snapshots, classifications, history,
/// settings — all implemented by [`SqliteStore`](store::SqliteStore).
pub mod store;

/// Terminal user interface.
///
/// Single-list layout with a detail pane and status bar. Keybindings:
/// j/k navigate, Enter opens in the browser (and records history),
/// f/s/t cycle filter/sort/tag, / searches, h shows history, c runs
/// classification, R refreshes, q quits.
pub mod tui;
