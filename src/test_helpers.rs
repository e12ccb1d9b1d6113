//! Shared test utilities for the horoscope-cards test suite.
//!
//! Provides sample batches plus mock collaborators for every seam the
//! resolver and the layout engine are written against: fetchers that fail,
//! stall or panic on chosen signs, translators that tag or fail, a cache
//! store that is always down, and a fixed-advance text measure.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fetcher = Arc::new(StaticFetcher::new("15 March 2026").failing(&[Sign::Leo]));
//! let set = sample_set("15 March 2026");
//! assert_eq!(set.get(Sign::Leo).date, "15 March 2026");
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;

use crate::cache::{CacheError, CacheRecord, CacheStore, PutOutcome};
use crate::fetch::{FetchError, FetchedReading, Fetcher};
use crate::imaging::layout::TextMeasure;
use crate::translate::{TranslateError, Translator};
use crate::types::{Language, Reading, ReadingSet, Sign};

// =========================================================================
// Sample content
// =========================================================================

fn sample_text(sign: Sign, date: &str) -> String {
    format!("{sign} reading for {date}. Keep plans simple and let the evening settle things.")
}

/// Twelve distinct readings in canonical order, all dated `date`.
pub fn sample_readings(date: &str) -> Vec<Reading> {
    Sign::ALL
        .iter()
        .map(|&sign| Reading::new(sign, sample_text(sign, date), date))
        .collect()
}

pub fn sample_set(date: &str) -> ReadingSet {
    ReadingSet::from_readings(sample_readings(date)).unwrap()
}

// =========================================================================
// Fetchers
// =========================================================================

/// Answers every sign with sample text. Records calls.
///
/// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
pub struct StaticFetcher {
    date: String,
    failing: HashSet<Sign>,
    overrides: HashMap<Sign, String>,
    calls: Mutex<Vec<(Sign, i32)>>,
}

impl StaticFetcher {
    pub fn new(date: &str) -> Self {
        Self {
            date: date.to_string(),
            failing: HashSet::new(),
            overrides: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make `signs` fail with [`FetchError::Unavailable`].
    pub fn failing(mut self, signs: &[Sign]) -> Self {
        self.failing.extend(signs.iter().copied());
        self
    }

    pub fn with_text(mut self, sign: Sign, text: &str) -> Self {
        self.overrides.insert(sign, text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn recorded(&self) -> Vec<(Sign, i32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, sign: Sign, day_offset: i32) -> Result<FetchedReading, FetchError> {
        self.calls.lock().unwrap().push((sign, day_offset));
        if self.failing.contains(&sign) {
            return Err(FetchError::Unavailable(format!("{sign} refused")));
        }
        let text = self
            .overrides
            .get(&sign)
            .cloned()
            .unwrap_or_else(|| sample_text(sign, &self.date));
        Ok(FetchedReading {
            text,
            date: self.date.clone(),
        })
    }
}

/// Sleeps per sign before answering, to scramble completion order.
pub struct DelayedFetcher {
    date: String,
    delays: HashMap<Sign, Duration>,
}

impl DelayedFetcher {
    /// Later signs answer first: sign `i` waits `(11 - i) * step`.
    pub fn reverse_staggered(date: &str, step: Duration) -> Self {
        let delays = Sign::ALL
            .iter()
            .map(|&sign| (sign, step * (11 - sign.index()) as u32))
            .collect();
        Self {
            date: date.to_string(),
            delays,
        }
    }

    /// Only `sign` is slow.
    pub fn only(date: &str, sign: Sign, delay: Duration) -> Self {
        Self {
            date: date.to_string(),
            delays: HashMap::from([(sign, delay)]),
        }
    }
}

impl Fetcher for DelayedFetcher {
    fn fetch(&self, sign: Sign, _day_offset: i32) -> Result<FetchedReading, FetchError> {
        if let Some(delay) = self.delays.get(&sign) {
            std::thread::sleep(*delay);
        }
        Ok(FetchedReading {
            text: sample_text(sign, &self.date),
            date: self.date.clone(),
        })
    }
}

/// Panics on one sign, answers the rest.
pub struct PanickingFetcher {
    inner: StaticFetcher,
    sign: Sign,
}

impl PanickingFetcher {
    pub fn new(date: &str, sign: Sign) -> Self {
        Self {
            inner: StaticFetcher::new(date),
            sign,
        }
    }
}

impl Fetcher for PanickingFetcher {
    fn fetch(&self, sign: Sign, day_offset: i32) -> Result<FetchedReading, FetchError> {
        if sign == self.sign {
            panic!("fetcher blew up on {sign}");
        }
        self.inner.fetch(sign, day_offset)
    }
}

// =========================================================================
// Translators
// =========================================================================

/// Prefixes the target language code: `"[te] text"`.
pub struct TaggingTranslator;

impl Translator for TaggingTranslator {
    fn translate(&self, text: &str, target: Language) -> Result<String, TranslateError> {
        Ok(format!("[{}] {text}", target.code()))
    }
}

/// Tags like [`TaggingTranslator`] but fails on the listed source texts.
pub struct FailingTranslator {
    fail_on: HashSet<String>,
}

impl FailingTranslator {
    pub fn on(texts: &[&str]) -> Self {
        Self {
            fail_on: texts.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Translator for FailingTranslator {
    fn translate(&self, text: &str, target: Language) -> Result<String, TranslateError> {
        if self.fail_on.contains(text) {
            return Err(TranslateError::Unavailable("quota exceeded".into()));
        }
        TaggingTranslator.translate(text, target)
    }
}

// =========================================================================
// Cache store
// =========================================================================

/// Every operation fails with [`CacheError::Unavailable`].
pub struct UnavailableStore;

impl CacheStore for UnavailableStore {
    fn get(&self, _date: &str, _language: Language) -> Result<Option<CacheRecord>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    fn put(
        &mut self,
        _date: &str,
        _language: Language,
        _readings: &ReadingSet,
    ) -> Result<PutOutcome, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    fn list_dates(&self, _language: Language) -> Result<Vec<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    fn delete_where(
        &mut self,
        _language: Language,
        _predicate: &dyn Fn(NaiveDate) -> bool,
    ) -> Result<usize, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

// =========================================================================
// Text measurement
// =========================================================================

/// Every visible character advances `size` pixels; spaces are free.
/// Glyph height equals the size.
///
/// At size 10, `"aaaaaaaaaa"` is 100 px wide and so is `"aaaaa aaaaa"`.
pub struct FixedMeasure;

impl TextMeasure for FixedMeasure {
    fn width(&self, text: &str, size: u32) -> u32 {
        text.chars().filter(|c| !c.is_whitespace()).count() as u32 * size
    }

    fn height(&self, _text: &str, size: u32) -> u32 {
        size
    }
}
