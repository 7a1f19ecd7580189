//! Optional forecast cache, keyed by a content fingerprint of the input
//! series and parameters.
//!
//! Purely a performance optimization: a hit returns a previously computed
//! report for byte-identical input, so cached and uncached calls are
//! indistinguishable to the caller. The cache is injected explicitly; the
//! engine holds no global state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::models::{ForecastReport, PreparedSeries};

/// SHA-256 fingerprint of a prepared series plus the forecast parameters.
/// Any change to a timestamp, value, service label, the horizon or the
/// confidence level produces a different key.
pub fn series_fingerprint(
    series: &PreparedSeries,
    horizon: usize,
    confidence_level: f64,
) -> String {
    let mut hasher = Sha256::new();
    for point in series.points() {
        hasher.update(point.timestamp.timestamp().to_le_bytes());
        hasher.update(point.value.to_le_bytes());
        hasher.update(point.service.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update((horizon as u64).to_le_bytes());
    hasher.update(confidence_level.to_le_bytes());

    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

struct CacheEntry {
    inserted_at: Instant,
    report: ForecastReport,
}

/// TTL-bounded forecast cache. Interior mutability keeps the forecaster's
/// API immutable; expired entries are dropped on access.
pub struct ForecastCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ForecastCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<ForecastReport> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                Some(entry.report.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, report: ForecastReport) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CacheEntry {
                    inserted_at: Instant::now(),
                    report,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
