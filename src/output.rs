//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Fetch
//!
//! ```text
//! 15 March 2026 (telugu, fetched)
//! 001 aries: Bold moves pay off today. Trust the first instinct and... (142 chars)
//! 002 taurus: Error fetching data. (unavailable)
//! ...
//! Degraded
//!     taurus: source unavailable: connection reset
//! Cache: 0 hit, 2 miss, 2 written
//! ```
//!
//! ## Render
//!
//! ```text
//! 001 cards/horoscope_1.jpg
//!     Template: assets/final-template-without-para-date/zodiac_sign_template_page-0001.jpg
//! 002 cards/horoscope_2.jpg
//!     Background: blank
//!
//! Rendered 6 cards
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::cache::CacheStats;
use crate::imaging::template::{self, DateMode, Rect};
use crate::imaging::{Background, RenderedCard};
use crate::resolve::Resolved;
use crate::types::Language;

const PREVIEW_CHARS: usize = 60;

// ============================================================================
// Helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn rect_line(label: &str, r: &Rect) -> String {
    format!(
        "{}{:<7}{},{} → {},{} ({}×{})",
        indent(1),
        label,
        r.x1,
        r.y1,
        r.x2,
        r.y2,
        r.width(),
        r.height()
    )
}

// ============================================================================
// Fetch
// ============================================================================

pub fn format_resolved(resolved: &Resolved, stats: &CacheStats) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}, {})",
        resolved.date, resolved.language, resolved.source
    )];

    for (i, reading) in resolved.readings.readings().iter().enumerate() {
        let detail = if reading.is_placeholder() {
            "unavailable".to_string()
        } else {
            format!("{} chars", reading.count)
        };
        lines.push(format!(
            "{} {}: {} ({detail})",
            format_index(i + 1),
            reading.sign,
            truncate_chars(&reading.text, PREVIEW_CHARS)
        ));
    }

    if resolved.is_degraded() {
        lines.push("Degraded".to_string());
        for d in &resolved.degradations {
            lines.push(format!("{}{d}", indent(1)));
        }
    }
    lines.push(format!("Cache: {stats}"));
    lines
}

pub fn print_resolved(resolved: &Resolved, stats: &CacheStats) {
    for line in format_resolved(resolved, stats) {
        println!("{line}");
    }
}

// ============================================================================
// Dates and purge
// ============================================================================

pub fn format_dates(language: Language, dates: &[String]) -> Vec<String> {
    if dates.is_empty() {
        return vec![format!("No cached dates ({language})")];
    }
    let mut lines = vec![format!("Cached dates ({language})")];
    lines.extend(dates.iter().map(|d| format!("{}{d}", indent(1))));
    lines
}

pub fn print_dates(language: Language, dates: &[String]) {
    for line in format_dates(language, dates) {
        println!("{line}");
    }
}

pub fn format_purge(language: Language, removed: usize) -> String {
    format!("Purged {} ({language})", plural(removed, "stale record", "stale records"))
}

// ============================================================================
// Render
// ============================================================================

pub fn format_cards(cards: &[RenderedCard]) -> Vec<String> {
    let mut lines = Vec::new();
    for card in cards {
        lines.push(format!("{} {}", format_index(card.index), card.path.display()));
        match &card.background {
            Background::Template(path) => {
                lines.push(format!("{}Template: {}", indent(1), path.display()))
            }
            Background::Blank => lines.push(format!("{}Background: blank", indent(1))),
        }
    }
    lines.push(String::new());
    lines.push(format!("Rendered {}", plural(cards.len(), "card", "cards")));
    let blank = cards.iter().filter(|c| c.background.is_blank()).count();
    if blank > 0 {
        lines.push(format!(
            "{} without a template background",
            plural(blank, "card", "cards")
        ));
    }
    lines
}

pub fn print_cards(cards: &[RenderedCard]) {
    for line in format_cards(cards) {
        println!("{line}");
    }
}

// ============================================================================
// Templates
// ============================================================================

pub fn format_templates() -> Vec<String> {
    let mut lines = Vec::new();
    for t in template::all() {
        let mode = match t.date_mode {
            DateMode::Full => "full date",
            DateMode::NoYear => "date without year",
        };
        lines.push(format!("{} {} ({mode})", t.id, t.dir_name));
        lines.push(format!("{}first card: {}", indent(1), t.file_pattern.file_name(1)));
        lines.push(rect_line("date", &t.date_rect));
        lines.push(rect_line("block1", &t.block1));
        lines.push(rect_line("block2", &t.block2));
    }
    lines
}

pub fn print_templates() {
    for line in format_templates() {
        println!("{line}");
    }
}
