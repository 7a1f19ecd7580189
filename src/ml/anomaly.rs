//! Statistical anomaly detection over a prepared cost series.
//!
//! Four independent, pure algorithms: rolling z-score, IQR, regression
//! residual and seasonal deviation. Each returns candidates keyed by series
//! index; below its own minimum data size an algorithm returns an empty list
//! so the ensemble degrades gracefully.

use crate::models::{
    AlgorithmKind, AnomalyStats, CandidateAnomaly, PreparedSeries, Severity,
};

use super::stats;

/// Rolling z-score window cap.
const MAX_WINDOW: usize = 14;
/// Minimum points for the regression-residual detector.
const REGRESSION_MIN_POINTS: usize = 10;
/// Minimum points for the seasonal-deviation detector (three weeks).
const SEASONAL_MIN_POINTS: usize = 21;
/// IQR outlier fence factor.
const IQR_FENCE: f64 = 1.5;

pub fn run_algorithm(
    kind: AlgorithmKind,
    series: &PreparedSeries,
    threshold: f64,
) -> Vec<CandidateAnomaly> {
    match kind {
        AlgorithmKind::ZScore => detect_zscore(series, threshold),
        AlgorithmKind::Iqr => detect_iqr(series),
        AlgorithmKind::Regression => detect_regression(series),
        AlgorithmKind::Seasonal => detect_seasonal(series),
    }
}

/// Severity bucket shared by all detectors: `ratio` is the deviation measure
/// over the flagging threshold, so 1.0 is the flagging boundary.
fn severity_from_ratio(ratio: f64) -> Severity {
    if ratio > 2.0 {
        Severity::Critical
    } else if ratio > 1.5 {
        Severity::High
    } else {
        Severity::Medium
    }
}

/// Rolling z-score against the preceding window (`min(14, n/2)` points).
pub fn detect_zscore(series: &PreparedSeries, threshold: f64) -> Vec<CandidateAnomaly> {
    let values = series.values();
    let n = values.len();
    let window = MAX_WINDOW.min(n / 2);
    if window == 0 || n < window + 1 {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for i in window..n {
        let slice = &values[i - window..i];
        let window_mean = stats::mean(slice);
        let window_std = stats::std_dev(slice);
        if window_std < stats::DEGENERACY_EPSILON {
            continue;
        }

        let z_score = ((values[i] - window_mean) / window_std).abs();
        if z_score > threshold {
            candidates.push(CandidateAnomaly {
                series_index: i,
                value: values[i],
                algorithm: AlgorithmKind::ZScore,
                confidence: (z_score / threshold).min(5.0) / 5.0,
                severity: severity_from_ratio(z_score / threshold),
                stats: AnomalyStats::ZScore {
                    z_score,
                    window_mean,
                    window_std,
                },
            });
        }
    }
    candidates
}

/// Interquartile-range fences over the entire series.
pub fn detect_iqr(series: &PreparedSeries) -> Vec<CandidateAnomaly> {
    let values = series.values();
    if values.is_empty() {
        return Vec::new();
    }

    let mut sorted = values.clone();
    sorted.sort_by(f64::total_cmp);
    let q1 = stats::quantile(&sorted, 0.25);
    let q3 = stats::quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    if iqr < stats::DEGENERACY_EPSILON {
        // A flat distribution has no usable fences.
        return Vec::new();
    }

    let lower_bound = q1 - IQR_FENCE * iqr;
    let upper_bound = q3 + IQR_FENCE * iqr;
    let max_deviation = (upper_bound - q3).max(q1 - lower_bound);

    let mut candidates = Vec::new();
    for (i, &value) in values.iter().enumerate() {
        if value < lower_bound || value > upper_bound {
            let deviation = if value < lower_bound {
                lower_bound - value
            } else {
                value - upper_bound
            };
            let ratio = deviation / max_deviation;
            candidates.push(CandidateAnomaly {
                series_index: i,
                value,
                algorithm: AlgorithmKind::Iqr,
                confidence: ratio.min(3.0) / 3.0,
                severity: severity_from_ratio(ratio),
                stats: AnomalyStats::Iqr {
                    q1,
                    q3,
                    lower_bound,
                    upper_bound,
                },
            });
        }
    }
    candidates
}

/// Residuals against an OLS fit of value on index; the flagging threshold is
/// `mean(residual) + 2·stddev(residual)`.
pub fn detect_regression(series: &PreparedSeries) -> Vec<CandidateAnomaly> {
    let values = series.values();
    if values.len() < REGRESSION_MIN_POINTS {
        return Vec::new();
    }

    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect();
    let Some(fit) = stats::linear_regression(&points) else {
        return Vec::new();
    };

    let residuals: Vec<f64> = points
        .iter()
        .map(|&(x, y)| (y - fit.predict(x)).abs())
        .collect();
    let threshold = stats::mean(&residuals) + 2.0 * stats::std_dev(&residuals);
    if threshold < stats::DEGENERACY_EPSILON {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for (i, &residual) in residuals.iter().enumerate() {
        if residual > threshold {
            let ratio = residual / threshold;
            candidates.push(CandidateAnomaly {
                series_index: i,
                value: values[i],
                algorithm: AlgorithmKind::Regression,
                confidence: ratio.min(4.0) / 4.0,
                severity: severity_from_ratio(ratio),
                stats: AnomalyStats::Regression {
                    residual,
                    threshold,
                },
            });
        }
    }
    candidates
}

/// Deviation from weekly (and, with intraday timestamps, hourly) mean
/// profiles. A point is compared against whichever profile expectation is
/// closer to it, and flagged past two series stddevs.
pub fn detect_seasonal(series: &PreparedSeries) -> Vec<CandidateAnomaly> {
    if series.len() < SEASONAL_MIN_POINTS {
        return Vec::new();
    }

    let values = series.values();
    let series_std = stats::std_dev(&values);
    if series_std < stats::DEGENERACY_EPSILON {
        return Vec::new();
    }
    let limit = 2.0 * series_std;

    let weekly = profile_means(series.points().iter().map(|p| (p.day_of_week as usize, p.value)), 7);
    let hourly = series.has_intraday_resolution().then(|| {
        profile_means(series.points().iter().map(|p| (p.hour as usize, p.value)), 24)
    });

    let mut candidates = Vec::new();
    for point in series.points() {
        let weekly_expected = weekly[point.day_of_week as usize];
        let hourly_expected = hourly
            .as_ref()
            .and_then(|profile| profile[point.hour as usize]);

        let expected = match (weekly_expected, hourly_expected) {
            (Some(w), Some(h)) => {
                if (point.value - h).abs() < (point.value - w).abs() {
                    h
                } else {
                    w
                }
            }
            (Some(w), None) => w,
            (None, Some(h)) => h,
            (None, None) => continue,
        };

        let deviation = (point.value - expected).abs();
        if deviation > limit {
            let ratio = deviation / limit;
            candidates.push(CandidateAnomaly {
                series_index: point.index,
                value: point.value,
                algorithm: AlgorithmKind::Seasonal,
                confidence: ratio.min(3.0) / 3.0,
                severity: severity_from_ratio(ratio),
                stats: AnomalyStats::Seasonal {
                    expected,
                    deviation,
                },
            });
        }
    }
    candidates
}

fn profile_means(
    pairs: impl Iterator<Item = (usize, f64)>,
    buckets: usize,
) -> Vec<Option<f64>> {
    let mut sums = vec![0.0; buckets];
    let mut counts = vec![0usize; buckets];
    for (bucket, value) in pairs {
        sums[bucket] += value;
        counts[bucket] += 1;
    }
    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| (count > 0).then(|| sum / count as f64))
        .collect()
}
