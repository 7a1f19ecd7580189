//! Ensemble combination and deduplication of per-algorithm anomaly
//! candidates.
//!
//! Agreement by any single algorithm is sufficient for a point to surface;
//! the number of agreeing algorithms raises the ensemble confidence and
//! severity instead of gating inclusion.

use std::collections::{BTreeMap, HashSet};

use crate::models::{CandidateAnomaly, EnsembleAnomaly, PreparedSeries, Severity};

/// Number of algorithms the agreement share is measured against.
const ALGORITHM_COUNT: f64 = 4.0;

/// Merge candidates by series index into ensemble anomalies, deduplicate by
/// `(date, service)` key and sort descending by ensemble confidence.
pub fn combine_candidates(
    series: &PreparedSeries,
    candidates: Vec<CandidateAnomaly>,
) -> Vec<EnsembleAnomaly> {
    let mut by_index: BTreeMap<usize, Vec<CandidateAnomaly>> = BTreeMap::new();
    for candidate in candidates {
        by_index
            .entry(candidate.series_index)
            .or_default()
            .push(candidate);
    }

    let mut seen_keys = HashSet::new();
    let mut anomalies = Vec::new();

    for (index, group) in by_index {
        let Some(point) = series.get(index) else {
            continue;
        };

        let count = group.len();
        let avg_confidence =
            group.iter().map(|c| c.confidence).sum::<f64>() / count as f64;
        let confidence = avg_confidence * 0.7 + count as f64 * 0.3 / ALGORITHM_COUNT;

        let any_critical = group.iter().any(|c| c.severity == Severity::Critical);
        let any_high = group.iter().any(|c| c.severity == Severity::High);
        let severity = if any_critical {
            Severity::Critical
        } else if any_high || count >= 3 {
            Severity::High
        } else if count >= 2 {
            Severity::Medium
        } else {
            Severity::Low
        };

        let needs_immediate_alert = severity == Severity::Critical
            || (severity == Severity::High && count >= 3);

        let unique_key = format!("{}_{}", point.date(), point.service);
        if !seen_keys.insert(unique_key.clone()) {
            continue;
        }

        anomalies.push(EnsembleAnomaly {
            series_index: index,
            date: point.date(),
            service: point.service.clone(),
            value: point.value,
            algorithms: group.iter().map(|c| c.algorithm).collect(),
            confidence,
            severity,
            needs_immediate_alert,
            unique_key,
            organization: point.organization.clone(),
            region: point.region.clone(),
        });
    }

    // Stable sort: equal confidences keep ascending index order, so repeated
    // runs produce identical output.
    anomalies.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    anomalies
}

/// Reconcile overlapping detection runs: the first run that reported a
/// `(date, service)` pair wins, later duplicates are dropped.
pub fn merge_anomaly_runs(runs: Vec<Vec<EnsembleAnomaly>>) -> Vec<EnsembleAnomaly> {
    let mut seen_keys = HashSet::new();
    let mut merged = Vec::new();
    for run in runs {
        for anomaly in run {
            if seen_keys.insert(anomaly.unique_key.clone()) {
                merged.push(anomaly);
            }
        }
    }
    merged.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    merged
}
