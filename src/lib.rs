//! # Reviewhound
//!
//! Collects product descriptions and customer reviews for a product and its
//! closest competitors, and serves the result over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! POST /scrape → Orchestrator → Store (cache hit?)
//!                            → Drivers → discovery → description + reviews
//!                            → Store upserts → Corpus
//! ```
//!
//! - [`scraper`]: Browser drivers behind the [`Page`](scraper::Page) trait
//! - [`pipeline`]: Discovery, extraction, the review state machine and fan-out
//! - [`store`]: SQLite persistence with idempotent upserts
//! - [`server`]: HTTP API built with axum
//!
//! ## Quick Start
//!
//! ```bash
//! # Sign in once and save the session cookies
//! reviewhound login
//!
//! # One-shot scrape
//! reviewhound scrape "LED TV" B0XXXXXXXX
//!
//! # Run the API
//! reviewhound serve --port 3000
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration
//! - [`domain`]: Core domain models (ReviewRecord, ProductDescription, Corpus)
//! - [`session`]: Captured cookies and interactive login

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, session file, driver factory, orchestrator.
pub mod app;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `serve` - Run the HTTP API
/// - `scrape <keyword> <asin>` - Scrape once and print JSON
/// - `login` - Capture a signed-in session
/// - `repair-session` - Fix same-site values in the cookies file
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/reviewhound/config.toml`, with sections for the
/// server, database, session, browser, site and pipeline budgets.
pub mod config;

/// Core domain models.
///
/// - [`ReviewRecord`](domain::ReviewRecord): One review keyed by (review id, product)
/// - [`ProductDescription`](domain::ProductDescription): Title and bullet points
/// - [`SearchResult`](domain::SearchResult): Competitors for a keyword
/// - [`Corpus`](domain::Corpus): Everything returned for one request
pub mod domain;

/// Scrape pipeline.
///
/// - [`Orchestrator`](pipeline::Orchestrator): Cache check, drivers, fan-out, persistence
/// - [`WorkerPool`](pipeline::WorkerPool): One sequential worker per driver
/// - [`RetryPolicy`](pipeline::RetryPolicy): Bounded retries with optional backoff
pub mod pipeline;

/// Headless browser drivers.
///
/// Uses Chrome via chromiumoxide, with a randomized fingerprint per browser
/// and an optional humanizing gesture sequence after the first navigation.
///
/// - [`Page`](scraper::Page): Async trait over one browser tab
/// - [`Driver`](scraper::Driver): A page plus humanizer and session refresh
/// - [`ChromeDriverFactory`](scraper::ChromeDriverFactory): Launches drivers
pub mod scraper;

/// HTTP API.
///
/// - `POST /scrape` - Resolve a keyword and identifier into a corpus
/// - `GET /health` - Liveness check
pub mod server;

/// Session cookies captured by an operator login.
pub mod session;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
