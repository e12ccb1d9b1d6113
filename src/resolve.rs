//! Content resolution: cache first, then translate, then fetch.
//!
//! [`Resolver::resolve`] answers "give me the twelve readings for this date
//! in this language" with the cheapest source that can:
//!
//! ```text
//! 1. cache (date, language)                      → return as-is
//! 2. cache (date, English), language is Telugu   → translate, store, return
//! 3. fallback offset given                       → fetch 12 signs, store English,
//!                                                  purge stale, translate if needed
//! 4. otherwise                                   → NotCached
//! ```
//!
//! The first step that succeeds ends the request. Only step 1 is free of
//! side effects.
//!
//! ## Degrading instead of failing
//!
//! Problems are absorbed at the smallest scope that can absorb them and
//! reported in [`Resolved::degradations`]:
//!
//! - a failed sign fetch becomes a placeholder reading;
//! - a failed translation keeps that reading in English;
//! - a cache error reads as a miss, and a failed write or purge is skipped.
//!
//! The only hard failure is a fetch that cannot produce all twelve signs
//! ([`ResolveError::IncompleteBatch`]). Nothing from such a batch is cached.
//!
//! ## Concurrency
//!
//! Two resolvers asked for the same uncached key will both fetch. The store's
//! upsert makes the second write harmless, so the duplicate work is tolerated
//! rather than coordinated.

use crate::cache::{CacheRecord, CacheStats, CacheStore, PutOutcome, purge_stale};
use crate::dates::{sort_display_dates, today_in};
use crate::fetch::{FetchError, FetchSettings, Fetcher, fetch_all, fetch_with_deadline};
use crate::translate::{Translator, translate_set};
use crate::types::{Language, ReadingSet, Sign, UNKNOWN_DATE};
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no cached readings for {date} ({language}) and no fallback offset to fetch with")]
    NotCached { date: String, language: Language },
    #[error("fetch at offset {offset} produced {got} of 12 signs")]
    IncompleteBatch { offset: i32, got: usize },
    #[error("could not start fetch workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Where a resolved batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Translated,
    Fetched,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Cache => f.write_str("cache"),
            Source::Translated => f.write_str("translated from cache"),
            Source::Fetched => f.write_str("fetched"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Get,
    Put,
    Purge,
    List,
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheOp::Get => "get",
            CacheOp::Put => "put",
            CacheOp::Purge => "purge",
            CacheOp::List => "list",
        };
        f.write_str(name)
    }
}

/// Something that went wrong without stopping the resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    FetchFailed { sign: Sign, error: FetchError },
    TranslationFailed { sign: Sign },
    CacheUnavailable { op: CacheOp, error: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::FetchFailed { sign, error } => write!(f, "{sign}: {error}"),
            Degradation::TranslationFailed { sign } => {
                write!(f, "{sign}: kept untranslated")
            }
            Degradation::CacheUnavailable { op, error } => write!(f, "cache {op}: {error}"),
        }
    }
}

/// A complete batch and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Date key the batch is stored under. For fetched batches this is the
    /// date the source reported, which may differ from the requested one.
    pub date: String,
    pub language: Language,
    pub readings: ReadingSet,
    pub source: Source,
    pub degradations: Vec<Degradation>,
}

impl Resolved {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Tunables for [`Resolver`].
#[derive(Debug, Clone, Copy)]
pub struct ResolverSettings {
    pub fetch: FetchSettings,
    pub retention_days: u32,
    pub timezone: Tz,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            retention_days: 1,
            timezone: chrono_tz::Asia::Kolkata,
        }
    }
}

/// Resolves reading batches against an injected store, fetcher and
/// translator.
pub struct Resolver<'a> {
    store: &'a mut dyn CacheStore,
    fetcher: Arc<dyn Fetcher>,
    translator: &'a dyn Translator,
    settings: ResolverSettings,
    today: Option<NaiveDate>,
    stats: CacheStats,
}

impl<'a> Resolver<'a> {
    pub fn new(
        store: &'a mut dyn CacheStore,
        fetcher: Arc<dyn Fetcher>,
        translator: &'a dyn Translator,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            translator,
            settings,
            today: None,
            stats: CacheStats::default(),
        }
    }

    /// Pin "today" instead of reading the clock in the reference timezone.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| today_in(self.settings.timezone))
    }

    #[tracing::instrument(skip(self))]
    pub fn resolve(
        &mut self,
        target_date: &str,
        language: Language,
        fallback_offset: Option<i32>,
    ) -> Result<Resolved, ResolveError> {
        let mut degradations = Vec::new();

        if let Some(record) = self.cached(target_date, language, &mut degradations) {
            return Ok(Resolved {
                date: record.date,
                language,
                readings: record.readings,
                source: Source::Cache,
                degradations,
            });
        }

        if !language.is_primary()
            && let Some(primary) = self.cached(target_date, Language::PRIMARY, &mut degradations)
        {
            tracing::info!("translating cached {} readings", Language::PRIMARY);
            let readings =
                self.translate_and_store(target_date, &primary.readings, language, &mut degradations);
            return Ok(Resolved {
                date: target_date.to_string(),
                language,
                readings,
                source: Source::Translated,
                degradations,
            });
        }

        let Some(offset) = fallback_offset else {
            return Err(ResolveError::NotCached {
                date: target_date.to_string(),
                language,
            });
        };

        tracing::info!(offset, "fetching from source");
        let fetched = fetch_all(&self.fetcher, &Sign::ALL, offset, self.settings.fetch)?;
        let got = fetched.len();
        let mut readings = Vec::with_capacity(got);
        for f in fetched {
            if let Some(error) = f.error {
                degradations.push(Degradation::FetchFailed {
                    sign: f.reading.sign,
                    error,
                });
            }
            readings.push(f.reading);
        }
        let readings = ReadingSet::from_readings(readings).map_err(|e| {
            tracing::warn!(offset, error = %e, "fetch did not return every sign");
            ResolveError::IncompleteBatch { offset, got }
        })?;

        let date = authoritative_date(&readings, target_date);
        if date != target_date {
            tracing::info!(requested = target_date, reported = %date, "source reported a different date");
        }

        self.store_set(&date, Language::PRIMARY, &readings, &mut degradations);
        self.purge(Language::PRIMARY, &mut degradations);

        if language.is_primary() {
            return Ok(Resolved {
                date,
                language,
                readings,
                source: Source::Fetched,
                degradations,
            });
        }

        let translated = self.translate_and_store(&date, &readings, language, &mut degradations);
        self.purge(language, &mut degradations);
        Ok(Resolved {
            date,
            language,
            readings: translated,
            source: Source::Fetched,
            degradations,
        })
    }

    /// Display date the source reports for `day_offset`, read from the first
    /// sign alone.
    pub fn probe_date(&self, day_offset: i32) -> Result<String, FetchError> {
        let sign = Sign::ALL[0];
        fetch_with_deadline(&self.fetcher, sign, day_offset, self.settings.fetch.timeout)
            .unwrap_or_else(|| Err(FetchError::Unavailable("fetch thread exited".into())))
            .map(|fetched| fetched.date)
    }

    /// Cached dates for `language`, oldest first. Empty when the cache is
    /// unavailable.
    pub fn available_dates(&mut self, language: Language) -> Vec<String> {
        match self.store.list_dates(language) {
            Ok(mut dates) => {
                sort_display_dates(&mut dates);
                dates
            }
            Err(e) => {
                tracing::warn!(%language, error = %e, "could not list cached dates");
                self.stats.error();
                Vec::new()
            }
        }
    }

    /// Run the staleness purge for `language` now.
    pub fn purge_now(&mut self, language: Language) -> Result<usize, crate::cache::CacheError> {
        let today = self.today();
        purge_stale(self.store, language, self.settings.retention_days, today)
    }

    fn cached(
        &mut self,
        date: &str,
        language: Language,
        degradations: &mut Vec<Degradation>,
    ) -> Option<CacheRecord> {
        match self.store.get(date, language) {
            Ok(Some(record)) => {
                tracing::info!(date, %language, "cache hit");
                self.stats.hit();
                Some(record)
            }
            Ok(None) => {
                tracing::info!(date, %language, "cache miss");
                self.stats.miss();
                None
            }
            Err(e) => {
                tracing::warn!(date, %language, error = %e, "cache read failed; treating as miss");
                self.stats.error();
                degradations.push(Degradation::CacheUnavailable {
                    op: CacheOp::Get,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn store_set(
        &mut self,
        date: &str,
        language: Language,
        readings: &ReadingSet,
        degradations: &mut Vec<Degradation>,
    ) {
        match self.store.put(date, language, readings) {
            Ok(PutOutcome::Unchanged) => {
                tracing::info!(date, %language, "cache already up to date");
            }
            Ok(outcome) => {
                tracing::info!(date, %language, ?outcome, "saved readings");
                self.stats.write();
            }
            Err(e) => {
                tracing::warn!(date, %language, error = %e, "cache write failed; continuing");
                self.stats.error();
                degradations.push(Degradation::CacheUnavailable {
                    op: CacheOp::Put,
                    error: e.to_string(),
                });
            }
        }
    }

    fn purge(&mut self, language: Language, degradations: &mut Vec<Degradation>) {
        if let Err(e) = self.purge_now(language) {
            tracing::warn!(%language, error = %e, "stale record cleanup failed");
            self.stats.error();
            degradations.push(Degradation::CacheUnavailable {
                op: CacheOp::Purge,
                error: e.to_string(),
            });
        }
    }

    fn translate_and_store(
        &mut self,
        date: &str,
        source: &ReadingSet,
        language: Language,
        degradations: &mut Vec<Degradation>,
    ) -> ReadingSet {
        let translated = translate_set(self.translator, source, language);
        degradations.extend(
            translated
                .failed
                .iter()
                .map(|&sign| Degradation::TranslationFailed { sign }),
        );
        self.store_set(date, language, &translated.readings, degradations);
        translated.readings
    }
}

/// The first sign's date, unless that sign failed or reported nothing.
fn authoritative_date(readings: &ReadingSet, requested: &str) -> String {
    let reported = readings.display_date();
    if reported.is_empty() || reported == UNKNOWN_DATE {
        requested.to_string()
    } else {
        reported.to_string()
    }
}
