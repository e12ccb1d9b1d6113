//! Reading cache keyed by (display date, language).
//!
//! Fetching twelve sign pages and translating them is slow and hits a third
//! party on every call, so resolved batches are stored and served back by
//! exact key. The resolver is the only writer.
//!
//! # Design
//!
//! ## Keys
//!
//! Records are keyed by the **exact display-date string** the source
//! reported (`"15 March 2026"`), not a normalized calendar date, plus the
//! [`Language`]. Each language lives in its own namespace
//! ([`Language::namespace`]), so lookups never mix English and Telugu.
//!
//! ## Writes
//!
//! [`CacheStore::put`] is an upsert: a later write for the same key replaces
//! the earlier record wholesale. Each record carries a SHA-256 `digest` of
//! its readings; writing identical readings again is reported as
//! [`PutOutcome::Unchanged`] and leaves the stored record as it was, so
//! repeated writes of the same batch are indistinguishable from one.
//!
//! ## Staleness
//!
//! [`purge_stale`] drops records whose date parses to a day strictly before
//! the retention cutoff. Records whose date string does not parse are kept.
//!
//! ## Storage
//!
//! [`JsonStore`] keeps one JSON document per namespace under a cache
//! directory (`<dir>/horoscopes_en.json`, `<dir>/horoscopes_te.json`) and
//! writes through on every change. A missing, corrupt, or wrong-version file
//! loads as an empty namespace. [`MemoryStore`] holds the same data in a
//! map and is used for `--no-cache` runs and tests.

use crate::dates::{parse_display_date, retention_cutoff};
use crate::types::{Language, ReadingSet};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Version of the on-disk namespace format. Files written with another
/// version are ignored.
const STORE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// A stored batch for one (date, language) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub date: String,
    pub language: Language,
    pub readings: ReadingSet,
    pub created_at: DateTime<Utc>,
    pub digest: String,
}

impl CacheRecord {
    pub fn new(date: &str, language: Language, readings: ReadingSet) -> Self {
        Self {
            date: date.to_string(),
            language,
            digest: digest_readings(&readings),
            readings,
            created_at: Utc::now(),
        }
    }
}

/// SHA-256 of the serialized readings, as a hex string.
pub fn digest_readings(readings: &ReadingSet) -> String {
    let mut hasher = Sha256::new();
    for r in readings.readings() {
        hasher.update(r.sign.key().as_bytes());
        hasher.update(b"\0");
        hasher.update(r.date.as_bytes());
        hasher.update(b"\0");
        hasher.update(r.text.as_bytes());
        hasher.update(b"\0");
    }
    format!("{:x}", hasher.finalize())
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    Replaced,
    /// A record with identical readings already existed.
    Unchanged,
}

/// Key-value store of reading batches.
///
/// Implementations report failures through [`CacheError`]; deciding what a
/// failure means (usually "treat as a miss") is the caller's job.
pub trait CacheStore {
    fn get(&self, date: &str, language: Language) -> Result<Option<CacheRecord>, CacheError>;

    /// Insert or fully replace the record for `(date, language)`.
    fn put(
        &mut self,
        date: &str,
        language: Language,
        readings: &ReadingSet,
    ) -> Result<PutOutcome, CacheError>;

    /// Distinct date keys stored for `language`, in no particular order.
    fn list_dates(&self, language: Language) -> Result<Vec<String>, CacheError>;

    /// Delete every record of `language` whose date parses and satisfies
    /// `predicate`. Records with unparseable dates are never passed to the
    /// predicate and never deleted. Returns the number of records removed.
    fn delete_where(
        &mut self,
        language: Language,
        predicate: &dyn Fn(NaiveDate) -> bool,
    ) -> Result<usize, CacheError>;
}

/// Delete records dated strictly before `today - retention_days`.
pub fn purge_stale(
    store: &mut dyn CacheStore,
    language: Language,
    retention_days: u32,
    today: NaiveDate,
) -> Result<usize, CacheError> {
    let cutoff = retention_cutoff(today, retention_days);
    let deleted = store.delete_where(language, &|date| date < cutoff)?;
    if deleted > 0 {
        tracing::info!(
            %language,
            deleted,
            %cutoff,
            "purged stale records"
        );
    }
    Ok(deleted)
}

// =============================================================================
// Namespace: shared record map used by both stores
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Namespace {
    version: u32,
    records: BTreeMap<String, CacheRecord>,
}

impl Namespace {
    fn empty() -> Self {
        Self {
            version: STORE_VERSION,
            records: BTreeMap::new(),
        }
    }

    fn upsert(&mut self, date: &str, language: Language, readings: &ReadingSet) -> PutOutcome {
        let digest = digest_readings(readings);
        let outcome = match self.records.get(date) {
            Some(existing) if existing.digest == digest => return PutOutcome::Unchanged,
            Some(_) => PutOutcome::Replaced,
            None => PutOutcome::Inserted,
        };
        self.records.insert(
            date.to_string(),
            CacheRecord::new(date, language, readings.clone()),
        );
        outcome
    }

    fn delete_where(&mut self, predicate: &dyn Fn(NaiveDate) -> bool) -> usize {
        let before = self.records.len();
        self.records
            .retain(|date, _| !parse_display_date(date).is_some_and(predicate));
        before - self.records.len()
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-process store. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: HashMap<Language, Namespace>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all languages.
    pub fn len(&self) -> usize {
        self.namespaces.values().map(|ns| ns.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, date: &str, language: Language) -> Result<Option<CacheRecord>, CacheError> {
        Ok(self
            .namespaces
            .get(&language)
            .and_then(|ns| ns.records.get(date))
            .cloned())
    }

    fn put(
        &mut self,
        date: &str,
        language: Language,
        readings: &ReadingSet,
    ) -> Result<PutOutcome, CacheError> {
        Ok(self
            .namespaces
            .entry(language)
            .or_insert_with(Namespace::empty)
            .upsert(date, language, readings))
    }

    fn list_dates(&self, language: Language) -> Result<Vec<String>, CacheError> {
        Ok(self
            .namespaces
            .get(&language)
            .map(|ns| ns.records.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn delete_where(
        &mut self,
        language: Language,
        predicate: &dyn Fn(NaiveDate) -> bool,
    ) -> Result<usize, CacheError> {
        Ok(self
            .namespaces
            .get_mut(&language)
            .map(|ns| ns.delete_where(predicate))
            .unwrap_or(0))
    }
}

// =============================================================================
// JsonStore
// =============================================================================

/// File-backed store: one JSON document per language namespace.
///
/// Open with [`JsonStore::open`], which creates the directory and loads
/// whatever is there. Every write is flushed immediately; [`JsonStore::close`]
/// performs a final flush and releases the store.
#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    namespaces: HashMap<Language, Namespace>,
}

impl JsonStore {
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(dir)?;
        let namespaces = Language::all()
            .map(|lang| (lang, load_namespace(&namespace_path(dir, lang))))
            .collect();
        tracing::debug!(dir = %dir.display(), "opened cache store");
        Ok(Self {
            dir: dir.to_path_buf(),
            namespaces,
        })
    }

    pub fn close(self) -> Result<(), CacheError> {
        for lang in Language::all() {
            self.save(lang)?;
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn namespace(&self, language: Language) -> Option<&Namespace> {
        self.namespaces.get(&language)
    }

    fn namespace_mut(&mut self, language: Language) -> &mut Namespace {
        self.namespaces
            .entry(language)
            .or_insert_with(Namespace::empty)
    }

    fn save(&self, language: Language) -> Result<(), CacheError> {
        let empty = Namespace::empty();
        let ns = self.namespace(language).unwrap_or(&empty);
        let json = serde_json::to_string_pretty(ns)?;
        // Write to a sibling file first so a crash never leaves half a document.
        let path = namespace_path(&self.dir, language);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn namespace_path(dir: &Path, language: Language) -> PathBuf {
    dir.join(format!("{}.json", language.namespace()))
}

fn load_namespace(path: &Path) -> Namespace {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Namespace::empty(),
    };
    match serde_json::from_str::<Namespace>(&content) {
        Ok(ns) if ns.version == STORE_VERSION => ns,
        Ok(ns) => {
            tracing::warn!(
                path = %path.display(),
                found = ns.version,
                expected = STORE_VERSION,
                "ignoring cache file with a different version"
            );
            Namespace::empty()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable cache file");
            Namespace::empty()
        }
    }
}

impl CacheStore for JsonStore {
    fn get(&self, date: &str, language: Language) -> Result<Option<CacheRecord>, CacheError> {
        Ok(self
            .namespace(language)
            .and_then(|ns| ns.records.get(date))
            .cloned())
    }

    fn put(
        &mut self,
        date: &str,
        language: Language,
        readings: &ReadingSet,
    ) -> Result<PutOutcome, CacheError> {
        let outcome = self.namespace_mut(language).upsert(date, language, readings);
        if outcome != PutOutcome::Unchanged {
            self.save(language)?;
        }
        Ok(outcome)
    }

    fn list_dates(&self, language: Language) -> Result<Vec<String>, CacheError> {
        Ok(self
            .namespace(language)
            .map(|ns| ns.records.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn delete_where(
        &mut self,
        language: Language,
        predicate: &dyn Fn(NaiveDate) -> bool,
    ) -> Result<usize, CacheError> {
        let deleted = self.namespace_mut(language).delete_where(predicate);
        if deleted > 0 {
            self.save(language)?;
        }
        Ok(deleted)
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Cache activity for one CLI run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
    pub writes: u32,
    pub errors: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn write(&mut self) {
        self.writes += 1;
    }

    pub fn error(&mut self) {
        self.errors += 1;
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hit, {} miss, {} written",
            self.hits, self.misses, self.writes
        )?;
        if self.errors > 0 {
            write!(f, " ({} unavailable)", self.errors)?;
        }
        Ok(())
    }
}
