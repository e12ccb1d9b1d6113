//! Source fetching and the per-sign fan-out.
//!
//! The source itself is behind the [`Fetcher`] trait: given a sign and a day
//! offset (0 = today, 1 = tomorrow, -1 = yesterday) it returns the reading
//! text and the display date the source printed next to it.
//!
//! ## Fan-out
//!
//! [`fetch_all`] requests every sign on a dedicated rayon pool of fixed width
//! (4 by default). Each call runs on a helper thread and the pool worker
//! waits for it with a deadline, so a stuck source costs one timeout per
//! sign, never a hung pool. Failures and timeouts become placeholder
//! readings carrying the error; there are no retries. A helper that panics
//! produces no result at all for its sign, which the caller sees as a
//! short batch.
//!
//! Results are sorted by [`Sign::index`] before they are returned, so the
//! order never depends on which fetch finished first.

use crate::types::{Reading, Sign};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;

/// Placeholder text for a sign whose request failed.
pub const FETCH_FAILED_TEXT: &str = "Error fetching data.";

/// Placeholder text for a sign whose page had no reading on it.
pub const NO_TEXT_FOUND: &str = "Could not retrieve text.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("no reading text found")]
    Empty,
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

impl FetchError {
    /// Text shown in place of the reading.
    pub fn placeholder_text(&self) -> &'static str {
        match self {
            FetchError::Empty => NO_TEXT_FOUND,
            FetchError::Unavailable(_) | FetchError::TimedOut(_) => FETCH_FAILED_TEXT,
        }
    }
}

/// Raw content for one sign as returned by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedReading {
    pub text: String,
    pub date: String,
}

/// A source of daily readings.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, sign: Sign, day_offset: i32) -> Result<FetchedReading, FetchError>;
}

/// Fan-out parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub workers: usize,
    pub timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Result of fetching one sign. `error` is set when `reading` is a
/// placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignFetch {
    pub reading: Reading,
    pub error: Option<FetchError>,
}

impl SignFetch {
    fn from_result(sign: Sign, result: Result<FetchedReading, FetchError>) -> Self {
        let result = result.and_then(|fetched| {
            if fetched.text.trim().is_empty() {
                Err(FetchError::Empty)
            } else {
                Ok(fetched)
            }
        });
        match result {
            Ok(fetched) => Self {
                reading: Reading::new(sign, fetched.text.trim(), fetched.date.trim()),
                error: None,
            },
            Err(error) => Self {
                reading: Reading::unavailable(sign, error.placeholder_text()),
                error: Some(error),
            },
        }
    }
}

/// Fetch every sign in `signs` at `day_offset` and return the results in
/// canonical sign order.
pub fn fetch_all(
    fetcher: &Arc<dyn Fetcher>,
    signs: &[Sign],
    day_offset: i32,
    settings: FetchSettings,
) -> Result<Vec<SignFetch>, rayon::ThreadPoolBuildError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.workers.max(1))
        .thread_name(|i| format!("fetch-{i}"))
        .build()?;

    let mut results: Vec<SignFetch> = pool.install(|| {
        signs
            .par_iter()
            .filter_map(|&sign| {
                let result = fetch_with_deadline(fetcher, sign, day_offset, settings.timeout)?;
                let fetched = SignFetch::from_result(sign, result);
                match &fetched.error {
                    None => tracing::info!(
                        %sign,
                        day_offset,
                        count = fetched.reading.count,
                        "fetched reading"
                    ),
                    Some(error) => tracing::warn!(%sign, day_offset, %error, "fetch failed"),
                }
                Some(fetched)
            })
            .collect()
    });

    results.sort_by_key(|f| f.reading.sign.index());
    Ok(results)
}

/// Run one fetch on a helper thread and wait at most `timeout` for it.
///
/// Returns `None` when the helper died without answering.
pub fn fetch_with_deadline(
    fetcher: &Arc<dyn Fetcher>,
    sign: Sign,
    day_offset: i32,
    timeout: Duration,
) -> Option<Result<FetchedReading, FetchError>> {
    let (tx, rx) = mpsc::channel();
    let fetcher = Arc::clone(fetcher);
    let spawned = std::thread::Builder::new()
        .name(format!("fetch-{sign}"))
        .spawn(move || {
            // The receiver is gone if the deadline already passed.
            let _ = tx.send(fetcher.fetch(sign, day_offset));
        });
    if let Err(e) = spawned {
        return Some(Err(FetchError::Unavailable(format!(
            "could not start fetch thread: {e}"
        ))));
    }

    match rx.recv_timeout(timeout) {
        Ok(result) => Some(result),
        Err(RecvTimeoutError::Timeout) => Some(Err(FetchError::TimedOut(timeout))),
        Err(RecvTimeoutError::Disconnected) => {
            tracing::error!(%sign, day_offset, "fetch thread exited without a result");
            None
        }
    }
}

// =============================================================================
// SnapshotFetcher
// =============================================================================

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct SnapshotEntry {
    sign: Sign,
    text: String,
    #[serde(default)]
    date: String,
}

/// Serves readings from a JSON file captured earlier.
///
/// ```json
/// {
///   "0": [{"sign": "aries", "text": "...", "date": "15 March 2026"}, ...],
///   "1": [...]
/// }
/// ```
///
/// Keys are day offsets. A sign missing from an offset fetches as
/// [`FetchError::Unavailable`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotFetcher {
    offsets: BTreeMap<i32, BTreeMap<Sign, FetchedReading>>,
}

impl SnapshotFetcher {
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let raw: BTreeMap<i32, Vec<SnapshotEntry>> = serde_json::from_str(json)?;
        let offsets = raw
            .into_iter()
            .map(|(offset, entries)| {
                let by_sign = entries
                    .into_iter()
                    .map(|e| {
                        (
                            e.sign,
                            FetchedReading {
                                text: e.text,
                                date: e.date,
                            },
                        )
                    })
                    .collect();
                (offset, by_sign)
            })
            .collect();
        Ok(Self { offsets })
    }

    pub fn offsets(&self) -> impl Iterator<Item = i32> + '_ {
        self.offsets.keys().copied()
    }
}

impl Fetcher for SnapshotFetcher {
    fn fetch(&self, sign: Sign, day_offset: i32) -> Result<FetchedReading, FetchError> {
        self.offsets
            .get(&day_offset)
            .and_then(|by_sign| by_sign.get(&sign))
            .cloned()
            .ok_or_else(|| {
                FetchError::Unavailable(format!("no snapshot entry for {sign} at offset {day_offset}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{DelayedFetcher, PanickingFetcher, StaticFetcher};

    fn settings(workers: usize, timeout_ms: u64) -> FetchSettings {
        FetchSettings {
            workers,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn signs_of(results: &[SignFetch]) -> Vec<Sign> {
        results.iter().map(|f| f.reading.sign).collect()
    }

    // =========================================================================
    // Fan-out ordering
    // =========================================================================

    #[test]
    fn results_follow_canonical_order_regardless_of_completion() {
        // Later signs finish first.
        let fetcher: Arc<dyn Fetcher> = Arc::new(DelayedFetcher::reverse_staggered(
            "15 March 2026",
            Duration::from_millis(5),
        ));
        let first = fetch_all(&fetcher, &Sign::ALL, 0, settings(4, 5_000)).unwrap();
        let second = fetch_all(&fetcher, &Sign::ALL, 0, settings(4, 5_000)).unwrap();

        assert_eq!(signs_of(&first), Sign::ALL.to_vec());
        assert_eq!(signs_of(&first), signs_of(&second));
        assert!(first.iter().all(|f| f.error.is_none()));
    }

    #[test]
    fn shuffled_input_comes_back_sorted() {
        let fetcher: Arc<dyn Fetcher> = Arc::new(StaticFetcher::new("1 May 2026"));
        let mut signs = Sign::ALL.to_vec();
        signs.reverse();
        signs.swap(2, 7);
        let results = fetch_all(&fetcher, &signs, 0, settings(3, 5_000)).unwrap();
        assert_eq!(signs_of(&results), Sign::ALL.to_vec());
    }

    // =========================================================================
    // Failure isolation
    // =========================================================================

    #[test]
    fn failed_sign_becomes_placeholder() {
        let fetcher: Arc<dyn Fetcher> =
            Arc::new(StaticFetcher::new("1 May 2026").failing(&[Sign::Gemini]));
        let results = fetch_all(&fetcher, &Sign::ALL, 0, settings(4, 5_000)).unwrap();

        assert_eq!(results.len(), 12);
        let gemini = &results[Sign::Gemini.index()];
        assert_eq!(gemini.reading.text, FETCH_FAILED_TEXT);
        assert_eq!(gemini.reading.count, 0);
        assert!(matches!(gemini.error, Some(FetchError::Unavailable(_))));
        assert!(results[Sign::Cancer.index()].error.is_none());
    }

    #[test]
    fn empty_text_is_reported_as_missing() {
        let fetcher: Arc<dyn Fetcher> =
            Arc::new(StaticFetcher::new("1 May 2026").with_text(Sign::Leo, "   "));
        let results = fetch_all(&fetcher, &Sign::ALL, 0, settings(4, 5_000)).unwrap();
        let leo = &results[Sign::Leo.index()];
        assert_eq!(leo.error, Some(FetchError::Empty));
        assert_eq!(leo.reading.text, NO_TEXT_FOUND);
    }

    #[test]
    fn slow_sign_times_out_into_placeholder() {
        let fetcher: Arc<dyn Fetcher> = Arc::new(DelayedFetcher::only(
            "1 May 2026",
            Sign::Pisces,
            Duration::from_millis(500),
        ));
        let results = fetch_all(&fetcher, &Sign::ALL, 0, settings(4, 50)).unwrap();
        assert_eq!(results.len(), 12);
        assert!(matches!(
            results[Sign::Pisces.index()].error,
            Some(FetchError::TimedOut(_))
        ));
        assert!(results[Sign::Aries.index()].error.is_none());
    }

    #[test]
    fn panicking_sign_is_dropped_from_batch() {
        let fetcher: Arc<dyn Fetcher> =
            Arc::new(PanickingFetcher::new("1 May 2026", Sign::Taurus));
        let results = fetch_all(&fetcher, &Sign::ALL, 0, settings(4, 5_000)).unwrap();
        assert_eq!(results.len(), 11);
        assert!(!signs_of(&results).contains(&Sign::Taurus));
    }

    // =========================================================================
    // SnapshotFetcher
    // =========================================================================

    #[test]
    fn snapshot_serves_by_offset_and_sign() {
        let json = r#"{
            "0": [{"sign": "aries", "text": "Bold moves.", "date": "15 March 2026"}],
            "-1": [{"sign": "aries", "text": "Rest.", "date": "14 March 2026"}]
        }"#;
        let snapshot = SnapshotFetcher::from_json(json).unwrap();

        let today = snapshot.fetch(Sign::Aries, 0).unwrap();
        assert_eq!(today.text, "Bold moves.");
        assert_eq!(today.date, "15 March 2026");
        assert_eq!(snapshot.fetch(Sign::Aries, -1).unwrap().text, "Rest.");
        assert!(snapshot.fetch(Sign::Leo, 0).is_err());
        assert!(snapshot.fetch(Sign::Aries, 1).is_err());
        assert_eq!(snapshot.offsets().collect::<Vec<_>>(), vec![-1, 0]);
    }

    #[test]
    fn snapshot_rejects_unknown_sign() {
        let json = r#"{"0": [{"sign": "ophiuchus", "text": "?"}]}"#;
        assert!(SnapshotFetcher::from_json(json).is_err());
    }
}
