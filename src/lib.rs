//! # Trailbuster
//!
//! Logs in to Trailhead with a one-time email code and crawls modules,
//! lessons and trails into structured JSON.
//!
//! ## Architecture
//!
//! ```text
//! AuthSession → Crawler → ContentParser → OutputStore
//!      ↓
//! VerificationCodeFetcher → Mailbox
//! ```
//!
//! - [`auth`]: Login state machine with saved-session reuse
//! - [`mail`]: Verification code retrieval from Gmail
//! - [`parser`]: Lesson, module and trail extraction
//! - [`crawler`]: Retrying navigation, progress tracking, JSON output
//!
//! ## Quick Start
//!
//! ```bash
//! # Crawl the default module
//! SALESFORCE_EMAIL=me@example.com trailbuster module
//!
//! # Crawl a trail with a visible browser and a fresh login
//! trailbuster trail https://trailhead.salesforce.com/content/learn/trails/force_com_admin_beginner --headed --no-session
//!
//! # Crawl every URL in a file
//! trailbuster batch urls.txt
//!
//! # Show statistics
//! trailbuster stats
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`browser`]: Page abstraction over Chrome and static HTML
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration
//! - [`domain`]: Content, crawl records and progress state
//! - [`locator`]: Multi-selector element lookup

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together configuration,
/// parser and crawler, and launches the browser on demand.
pub mod app;

/// Login state machine.
///
/// - [`AuthSession`](auth::AuthSession): restore or perform a login
/// - [`SessionStore`](auth::SessionStore): saved cookies and local storage
/// - [`CaptchaGate`](auth::CaptchaGate): operator hand-off for CAPTCHAs
pub mod auth;

/// Browser pages.
///
/// - [`Page`](browser::Page): async trait the pipeline drives
/// - [`ChromePage`](browser::ChromePage): chromiumoxide implementation
/// - [`HtmlPage`](browser::HtmlPage): static in-memory implementation
pub mod browser;

/// Command-line interface using clap.
///
/// - `module [url]` - Crawl one module (the default command)
/// - `trail <url>` - Crawl every module of a trail
/// - `batch <file>` - Crawl a list of URLs
/// - `stats` - Show crawl statistics
/// - `clear-session` - Delete the saved session
/// - `parse <file> --url <url>` - Parse a saved page offline
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/trailbuster/config.toml`.
pub mod config;

/// Module, trail and batch crawling with resumable progress.
pub mod crawler;

/// Core domain models.
pub mod domain;

pub mod locator;

/// Verification code retrieval.
///
/// - [`VerificationCodeFetcher`](mail::VerificationCodeFetcher): polls a mailbox
/// - [`GmailMailbox`](mail::GmailMailbox): Gmail REST implementation with OAuth
pub mod mail;

/// Content extraction from loaded pages.
pub mod parser;
