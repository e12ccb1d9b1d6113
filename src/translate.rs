//! Translation of reading batches.
//!
//! The translator itself is opaque ([`Translator`]). What this module owns is
//! the batch policy: every reading is translated on its own, and a failure
//! keeps that one reading in its source language instead of failing the set.

use crate::types::{Language, Reading, ReadingSet, Sign};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("translation service unavailable: {0}")]
    Unavailable(String),
    #[error("translator returned no text")]
    EmptyResult,
}

/// Text-to-text translation into a target language.
pub trait Translator {
    fn translate(&self, text: &str, target: Language) -> Result<String, TranslateError>;
}

/// Returns its input unchanged. Used when no translation backend is wired
/// in; Telugu records then carry the English text.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTranslator;

impl Translator for NoopTranslator {
    fn translate(&self, text: &str, _target: Language) -> Result<String, TranslateError> {
        Ok(text.to_string())
    }
}

/// A translated batch plus the signs that stayed untranslated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedSet {
    pub readings: ReadingSet,
    pub failed: Vec<Sign>,
}

/// Translate every reading in `source` into `target`.
///
/// Readings are processed one at a time. When the translator fails, or
/// returns blank text, the source reading is carried over as-is. The result
/// always has the same signs, in the same order, as `source`.
pub fn translate_set(
    translator: &dyn Translator,
    source: &ReadingSet,
    target: Language,
) -> TranslatedSet {
    let mut failed = Vec::new();
    let readings: Vec<Reading> = source
        .readings()
        .iter()
        .map(|reading| {
            let result = translator
                .translate(&reading.text, target)
                .and_then(|text| {
                    if text.trim().is_empty() && !reading.text.trim().is_empty() {
                        Err(TranslateError::EmptyResult)
                    } else {
                        Ok(text)
                    }
                });
            match result {
                Ok(text) => reading.translated(text),
                Err(error) => {
                    tracing::warn!(
                        sign = %reading.sign,
                        %target,
                        %error,
                        "translation failed; keeping source text"
                    );
                    failed.push(reading.sign);
                    reading.clone()
                }
            }
        })
        .collect();

    let readings =
        ReadingSet::from_readings(readings).expect("translation preserves the sign set");
    TranslatedSet { readings, failed }
}
