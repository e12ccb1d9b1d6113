//! # Horoscope Cards
//!
//! Daily readings for the twelve zodiac signs, cached per date and language
//! and rendered as square image cards ready to post.
//!
//! # Architecture: Resolve, Then Render
//!
//! ```text
//! 1. Resolve  (date, language)  →  ReadingSet     cache / translate / fetch
//! 2. Layout   reading text      →  FittedText     font-size search + greedy wrap
//! 3. Render   ReadingSet        →  6 × JPEG       two readings per card
//! ```
//!
//! Resolution is the only stage with side effects on shared state (the
//! cache). Layout is pure and rendering only writes its own output files, so
//! both are tested without a cache or a network.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `Sign`, `Language`, `Reading` and the twelve-sign `ReadingSet` |
//! | [`dates`] | Display-date parsing, reference-timezone "today", retention cutoff |
//! | [`cache`] | `CacheStore` trait, in-memory and JSON-file stores, staleness purge |
//! | [`fetch`] | `Fetcher` trait, bounded parallel fan-out with deadlines, snapshot source |
//! | [`translate`] | `Translator` trait and per-reading batch translation |
//! | [`resolve`] | Cache → translate → fetch decision policy |
//! | [`imaging`] | Text layout, templates, fonts and the card compositor |
//! | [`config`] | `horoscope.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Collaborators Are Injected
//!
//! The resolver owns no I/O. It borrows a [`cache::CacheStore`], a
//! [`fetch::Fetcher`] and a [`translate::Translator`], so every policy path
//! (hit, translate, fetch, degraded cache, incomplete batch) is exercised in
//! unit tests with in-memory mocks. The bundled `JsonStore` has an explicit
//! `open`/`close` lifecycle instead of a process-wide connection.
//!
//! ## Degrade, Don't Abort
//!
//! Outside services fail routinely. A failed sign becomes a placeholder, a
//! failed translation keeps the English text, and a cache outage reads as a
//! miss. The result carries a list of what degraded. Only a batch missing a
//! sign outright is an error, and such a batch is never cached.
//!
//! ## Canonical Order
//!
//! Fetches complete in any order. [`types::ReadingSet`] can only be built
//! from exactly twelve distinct signs and always sorts them Aries → Pisces,
//! so card pairing is stable no matter how the fan-out was scheduled.
//!
//! ## Pure-Rust Imaging
//!
//! Backgrounds are decoded and resampled with the `image` crate (Lanczos3)
//! and text is rasterized with `rusttype`. No system image or font libraries
//! are needed at runtime; font files are read from the assets directory.

pub mod cache;
pub mod config;
pub mod dates;
pub mod fetch;
pub mod imaging;
pub mod output;
pub mod resolve;
pub mod translate;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
