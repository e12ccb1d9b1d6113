//! Shared types passed between the resolver, the cache and the compositor.
//!
//! A [`Reading`] is one sign's text for one date. A [`ReadingSet`] is the
//! complete batch of twelve, always held in canonical [`Sign`] order. The
//! only way to build a `ReadingSet` is [`ReadingSet::from_readings`], so any
//! set that exists has passed the completeness check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Date string placed on readings whose fetch failed.
pub const UNKNOWN_DATE: &str = "Unknown";

/// The twelve zodiac signs, declared in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl Sign {
    /// All signs in canonical order.
    pub const ALL: [Sign; 12] = [
        Sign::Aries,
        Sign::Taurus,
        Sign::Gemini,
        Sign::Cancer,
        Sign::Leo,
        Sign::Virgo,
        Sign::Libra,
        Sign::Scorpio,
        Sign::Sagittarius,
        Sign::Capricorn,
        Sign::Aquarius,
        Sign::Pisces,
    ];

    /// Zero-based position in [`Sign::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lower-case key used by the source site and in stored records.
    pub fn key(self) -> &'static str {
        match self {
            Sign::Aries => "aries",
            Sign::Taurus => "taurus",
            Sign::Gemini => "gemini",
            Sign::Cancer => "cancer",
            Sign::Leo => "leo",
            Sign::Virgo => "virgo",
            Sign::Libra => "libra",
            Sign::Scorpio => "scorpio",
            Sign::Sagittarius => "sagittarius",
            Sign::Capricorn => "capricorn",
            Sign::Aquarius => "aquarius",
            Sign::Pisces => "pisces",
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown sign: {0}")]
pub struct UnknownSign(pub String);

impl FromStr for Sign {
    type Err = UnknownSign;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Sign::ALL
            .into_iter()
            .find(|sign| sign.key() == lower)
            .ok_or(UnknownSign(s.to_string()))
    }
}

/// Content language. English is the source language; Telugu is produced
/// by translating English readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Telugu,
}

struct LanguageInfo {
    language: Language,
    code: &'static str,
    namespace: &'static str,
}

/// Storage routing. One row per variant; [`Language::info`] relies on the
/// rows being in declaration order.
const LANGUAGES: [LanguageInfo; 2] = [
    LanguageInfo {
        language: Language::English,
        code: "en",
        namespace: "horoscopes_en",
    },
    LanguageInfo {
        language: Language::Telugu,
        code: "te",
        namespace: "horoscopes_te",
    },
];

impl Language {
    pub const PRIMARY: Language = Language::English;

    fn info(self) -> &'static LanguageInfo {
        &LANGUAGES[self as usize]
    }

    /// Whether readings in this language come straight from the fetcher.
    pub fn is_primary(self) -> bool {
        self == Self::PRIMARY
    }

    /// ISO 639-1 code, as passed to translators.
    pub fn code(self) -> &'static str {
        self.info().code
    }

    /// Cache namespace holding this language's records.
    pub fn namespace(self) -> &'static str {
        self.info().namespace
    }

    pub fn all() -> impl Iterator<Item = Language> {
        LANGUAGES.iter().map(|row| row.language)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::English => f.write_str("english"),
            Language::Telugu => f.write_str("telugu"),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown language: {0} (expected en or te)")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "te" | "telugu" => Ok(Language::Telugu),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

/// One sign's reading for one date.
///
/// Readings are never edited in place. Translation goes through
/// [`Reading::translated`], which returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub sign: Sign,
    pub text: String,
    /// Display date as reported by the source, e.g. `"15 March 2026"`.
    pub date: String,
    /// Character count of `text`. Zero for placeholders.
    pub count: usize,
}

impl Reading {
    pub fn new(sign: Sign, text: impl Into<String>, date: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            sign,
            count: text.chars().count(),
            text,
            date: date.into(),
        }
    }

    /// Placeholder for a sign whose content could not be obtained.
    pub fn unavailable(sign: Sign, marker: &str) -> Self {
        Self {
            sign,
            text: marker.to_string(),
            date: UNKNOWN_DATE.to_string(),
            count: 0,
        }
    }

    /// A copy of this reading carrying `text` instead.
    pub fn translated(&self, text: String) -> Self {
        Self {
            sign: self.sign,
            count: text.chars().count(),
            text,
            date: self.date.clone(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.count == 0
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IncompleteSet {
    #[error("expected 12 readings, got {0}")]
    WrongLength(usize),
    #[error("duplicate reading for {0}")]
    Duplicate(Sign),
}

/// The complete twelve-sign batch for one date and language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReadingSet(Vec<Reading>);

impl ReadingSet {
    /// Sort readings into canonical order and check that every sign is
    /// present exactly once. Input order does not matter.
    pub fn from_readings(mut readings: Vec<Reading>) -> Result<Self, IncompleteSet> {
        if readings.len() != Sign::ALL.len() {
            return Err(IncompleteSet::WrongLength(readings.len()));
        }
        readings.sort_by_key(|r| r.sign.index());
        for pair in readings.windows(2) {
            if pair[0].sign == pair[1].sign {
                return Err(IncompleteSet::Duplicate(pair[0].sign));
            }
        }
        Ok(Self(readings))
    }

    pub fn readings(&self) -> &[Reading] {
        &self.0
    }

    pub fn into_readings(self) -> Vec<Reading> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Date reported by the first sign. The source renders the same date on
    /// every sign page, so the first one is treated as authoritative.
    pub fn display_date(&self) -> &str {
        &self.0[0].date
    }

    /// Consecutive sign pairs, in the order they are laid out on cards.
    pub fn pairs(&self) -> std::slice::Chunks<'_, Reading> {
        self.0.chunks(2)
    }

    pub fn get(&self, sign: Sign) -> &Reading {
        &self.0[sign.index()]
    }
}

impl<'de> Deserialize<'de> for ReadingSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let readings = Vec::<Reading>::deserialize(deserializer)?;
        ReadingSet::from_readings(readings).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_readings;

    // =========================================================================
    // Sign
    // =========================================================================

    #[test]
    fn sign_index_matches_declaration_order() {
        for (i, sign) in Sign::ALL.iter().enumerate() {
            assert_eq!(sign.index(), i);
        }
        assert_eq!(Sign::Aries.index(), 0);
        assert_eq!(Sign::Pisces.index(), 11);
    }

    #[test]
    fn sign_parses_case_insensitively() {
        assert_eq!("Leo".parse::<Sign>(), Ok(Sign::Leo));
        assert_eq!(" sagittarius ".parse::<Sign>(), Ok(Sign::Sagittarius));
        assert!("ophiuchus".parse::<Sign>().is_err());
    }

    #[test]
    fn sign_serializes_as_key() {
        assert_eq!(serde_json::to_string(&Sign::Capricorn).unwrap(), "\"capricorn\"");
    }

    // =========================================================================
    // Language routing
    // =========================================================================

    #[test]
    fn language_table_routes_each_variant() {
        assert_eq!(Language::English.namespace(), "horoscopes_en");
        assert_eq!(Language::Telugu.namespace(), "horoscopes_te");
        assert_eq!(Language::English.code(), "en");
        assert_eq!(Language::Telugu.code(), "te");
        assert!(Language::English.is_primary());
        assert!(!Language::Telugu.is_primary());
    }

    #[test]
    fn language_table_rows_follow_declaration_order() {
        for lang in Language::all() {
            assert_eq!(lang.info().language, lang);
        }
    }

    #[test]
    fn language_parses_codes_and_names() {
        assert_eq!("te".parse::<Language>(), Ok(Language::Telugu));
        assert_eq!("English".parse::<Language>(), Ok(Language::English));
        assert!("fr".parse::<Language>().is_err());
    }

    // =========================================================================
    // Reading
    // =========================================================================

    #[test]
    fn reading_counts_characters_not_bytes() {
        let r = Reading::new(Sign::Leo, "నమస్తే", "1 May 2026");
        assert_eq!(r.count, "నమస్తే".chars().count());
        assert!(r.count < "నమస్తే".len());
    }

    #[test]
    fn translated_leaves_source_untouched() {
        let source = Reading::new(Sign::Virgo, "Good day", "2 May 2026");
        let copy = source.translated("మంచి రోజు".to_string());
        assert_eq!(source.text, "Good day");
        assert_eq!(copy.text, "మంచి రోజు");
        assert_eq!(copy.date, source.date);
        assert_eq!(copy.sign, Sign::Virgo);
    }

    #[test]
    fn unavailable_reading_is_placeholder() {
        let r = Reading::unavailable(Sign::Libra, "Error fetching data.");
        assert!(r.is_placeholder());
        assert_eq!(r.date, UNKNOWN_DATE);
    }

    // =========================================================================
    // ReadingSet
    // =========================================================================

    #[test]
    fn reading_set_sorts_into_canonical_order() {
        let mut readings = sample_readings("3 March 2026");
        readings.reverse();
        let set = ReadingSet::from_readings(readings).unwrap();
        let signs: Vec<Sign> = set.readings().iter().map(|r| r.sign).collect();
        assert_eq!(signs, Sign::ALL.to_vec());
    }

    #[test]
    fn reading_set_rejects_short_batch() {
        let mut readings = sample_readings("3 March 2026");
        readings.pop();
        assert_eq!(
            ReadingSet::from_readings(readings),
            Err(IncompleteSet::WrongLength(11))
        );
    }

    #[test]
    fn reading_set_rejects_duplicates() {
        let mut readings = sample_readings("3 March 2026");
        readings[11] = Reading::new(Sign::Aries, "again", "3 March 2026");
        assert_eq!(
            ReadingSet::from_readings(readings),
            Err(IncompleteSet::Duplicate(Sign::Aries))
        );
    }

    #[test]
    fn reading_set_pairs_cover_all_signs() {
        let set = ReadingSet::from_readings(sample_readings("3 March 2026")).unwrap();
        let pairs: Vec<&[Reading]> = set.pairs().collect();
        assert_eq!(pairs.len(), 6);
        assert_eq!(pairs[0][0].sign, Sign::Aries);
        assert_eq!(pairs[0][1].sign, Sign::Taurus);
        assert_eq!(pairs[5][1].sign, Sign::Pisces);
    }

    #[test]
    fn reading_set_deserialize_validates() {
        let set = ReadingSet::from_readings(sample_readings("3 March 2026")).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        let back: ReadingSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);

        let short = serde_json::to_string(&set.readings()[..3]).unwrap();
        assert!(serde_json::from_str::<ReadingSet>(&short).is_err());
    }
}
