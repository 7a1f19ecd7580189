//! The four forecasting models: linear regression, polynomial regression,
//! triple exponential smoothing (Holt-Winters) and seasonal-pattern
//! projection.
//!
//! Each model is fit independently on the prepared series and returns a
//! `ModelResult`; a fitting failure is reported as a `ModelFitError` and the
//! caller excludes that model from the ensemble.

use chrono::{Datelike, Duration, NaiveDate};

use crate::errors::ModelFitError;
use crate::models::{
    ModelKind, ModelPrediction, ModelResult, PreparedSeries, Reliability,
};

use super::stats;

/// Holt-Winters smoothing constants: level, trend, seasonal.
const HW_ALPHA: f64 = 0.3;
const HW_BETA: f64 = 0.1;
const HW_GAMMA: f64 = 0.1;
/// Weekly seasonal period.
const SEASONAL_PERIOD: usize = 7;
/// Seasonal-pattern model: weekly vs monthly profile mix.
const WEEKLY_PROFILE_WEIGHT: f64 = 0.7;
const MONTHLY_PROFILE_WEIGHT: f64 = 0.3;
/// Fixed point confidence of the seasonal-pattern model.
const SEASONAL_CONFIDENCE: f64 = 0.75;
/// Point confidences are capped here across all models.
const MAX_CONFIDENCE: f64 = 0.95;

pub fn run_model(
    kind: ModelKind,
    series: &PreparedSeries,
    horizon: usize,
) -> Result<ModelResult, ModelFitError> {
    match kind {
        ModelKind::Linear => linear_forecast(series, horizon),
        ModelKind::Polynomial => polynomial_forecast(series, horizon),
        ModelKind::ExponentialSmoothing => holt_winters_forecast(series, horizon),
        ModelKind::Seasonal => seasonal_forecast(series, horizon),
    }
}

fn future_dates(series: &PreparedSeries, horizon: usize) -> Vec<NaiveDate> {
    let last = series
        .last_date()
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default());
    (1..=horizon as i64).map(|i| last + Duration::days(i)).collect()
}

fn index_points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect()
}

/// OLS extrapolation of value on index.
pub fn linear_forecast(
    series: &PreparedSeries,
    horizon: usize,
) -> Result<ModelResult, ModelFitError> {
    let values = series.values();
    let fit = stats::linear_regression(&index_points(&values))
        .ok_or(ModelFitError::DegenerateSeries("linear fit denominator is zero"))?;

    let n = values.len() as f64;
    let confidence = fit.r_squared.clamp(0.0, MAX_CONFIDENCE);
    let predictions = future_dates(series, horizon)
        .into_iter()
        .enumerate()
        .map(|(i, date)| ModelPrediction {
            date,
            value: fit.predict(n + i as f64).max(0.0),
            confidence,
        })
        .collect();

    let reliability = if fit.r_squared > 0.7 {
        Reliability::High
    } else if fit.r_squared > 0.4 {
        Reliability::Medium
    } else {
        Reliability::Low
    };

    Ok(ModelResult {
        model: ModelKind::Linear,
        predictions,
        reliability,
        fit_quality: fit.r_squared,
    })
}

/// Least-squares polynomial of degree `min(3, n/10)` (floor 1), solved via
/// the normal equations.
pub fn polynomial_forecast(
    series: &PreparedSeries,
    horizon: usize,
) -> Result<ModelResult, ModelFitError> {
    let values = series.values();
    let n = values.len();
    let degree = (n / 10).clamp(1, 3);

    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let coefficients = fit_polynomial(&xs, &values, degree)?;

    let fitted: Vec<f64> = xs.iter().map(|&x| eval_polynomial(&coefficients, x)).collect();
    let r_squared = stats::r_squared(&values, &fitted);

    let confidence = r_squared.clamp(0.0, MAX_CONFIDENCE);
    let predictions = future_dates(series, horizon)
        .into_iter()
        .enumerate()
        .map(|(i, date)| ModelPrediction {
            date,
            value: eval_polynomial(&coefficients, (n + i) as f64).max(0.0),
            confidence,
        })
        .collect();

    let reliability = if r_squared > 0.8 {
        Reliability::High
    } else if r_squared > 0.6 {
        Reliability::Medium
    } else {
        Reliability::Low
    };

    Ok(ModelResult {
        model: ModelKind::Polynomial,
        predictions,
        reliability,
        fit_quality: r_squared,
    })
}

/// Triple exponential smoothing with multiplicative weekly seasonals.
/// Level/trend/seasonals are initialized from the first two periods, then
/// updated through the series; forecast confidence decays linearly from 0.8
/// to 0.5 across the horizon.
pub fn holt_winters_forecast(
    series: &PreparedSeries,
    horizon: usize,
) -> Result<ModelResult, ModelFitError> {
    let values = series.values();
    let n = values.len();
    if n < 2 * SEASONAL_PERIOD {
        return Err(ModelFitError::DegenerateSeries(
            "need two full seasonal periods",
        ));
    }

    let first_mean = stats::mean(&values[..SEASONAL_PERIOD]);
    let second_mean = stats::mean(&values[SEASONAL_PERIOD..2 * SEASONAL_PERIOD]);
    if first_mean.abs() < stats::DEGENERACY_EPSILON {
        return Err(ModelFitError::DegenerateSeries("zero initial level"));
    }

    let mut level = first_mean;
    let mut trend = (second_mean - first_mean) / SEASONAL_PERIOD as f64;
    let mut seasonals: Vec<f64> = values[..SEASONAL_PERIOD]
        .iter()
        .map(|&v| {
            let s = v / first_mean;
            if s.is_finite() && s > 0.0 {
                s
            } else {
                1.0
            }
        })
        .collect();

    let mut fitted = Vec::with_capacity(n - SEASONAL_PERIOD);
    for t in SEASONAL_PERIOD..n {
        let season_index = t % SEASONAL_PERIOD;
        let season = seasonals[season_index].max(1e-6);

        fitted.push((level + trend) * season);

        let previous_level = level;
        level = HW_ALPHA * (values[t] / season) + (1.0 - HW_ALPHA) * (level + trend);
        trend = HW_BETA * (level - previous_level) + (1.0 - HW_BETA) * trend;
        seasonals[season_index] =
            HW_GAMMA * (values[t] / level.max(1e-6)) + (1.0 - HW_GAMMA) * seasonals[season_index];
    }
    let fit_quality = stats::r_squared(&values[SEASONAL_PERIOD..], &fitted);

    let decay_steps = (horizon.saturating_sub(1)).max(1) as f64;
    let predictions = future_dates(series, horizon)
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let season = seasonals[(n + i) % SEASONAL_PERIOD];
            ModelPrediction {
                date,
                value: ((level + (i as f64 + 1.0) * trend) * season).max(0.0),
                confidence: 0.8 - 0.3 * (i as f64 / decay_steps),
            }
        })
        .collect();

    Ok(ModelResult {
        model: ModelKind::ExponentialSmoothing,
        predictions,
        reliability: Reliability::Medium,
        fit_quality,
    })
}

/// Projects multiplicative weekly and monthly (4 buckets of ~7 days)
/// profiles relative to the series mean, mixed 0.7/0.3, plus a linear trend
/// term. Empty buckets fall back to a neutral 1.0 index.
pub fn seasonal_forecast(
    series: &PreparedSeries,
    horizon: usize,
) -> Result<ModelResult, ModelFitError> {
    let values = series.values();
    let overall_mean = stats::mean(&values);
    if overall_mean.abs() < stats::DEGENERACY_EPSILON {
        return Err(ModelFitError::DegenerateSeries("zero series mean"));
    }

    let mut weekly = [1.0; 7];
    let mut monthly = [1.0; 4];
    fill_profile(&mut weekly, series, overall_mean, |p| p.day_of_week as usize);
    fill_profile(&mut monthly, series, overall_mean, |p| {
        month_bucket(p.day_of_month)
    });

    let slope = stats::linear_regression(&index_points(&values))
        .map(|fit| fit.slope)
        .unwrap_or(0.0);

    let fitted: Vec<f64> = series
        .points()
        .iter()
        .map(|p| {
            overall_mean
                * (WEEKLY_PROFILE_WEIGHT * weekly[p.day_of_week as usize]
                    + MONTHLY_PROFILE_WEIGHT * monthly[month_bucket(p.day_of_month)])
        })
        .collect();
    let fit_quality = stats::r_squared(&values, &fitted);

    let predictions = future_dates(series, horizon)
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let dow = date.weekday().num_days_from_monday() as usize;
            let factor = WEEKLY_PROFILE_WEIGHT * weekly[dow]
                + MONTHLY_PROFILE_WEIGHT * monthly[month_bucket(date.day())];
            ModelPrediction {
                date,
                value: (overall_mean * factor + slope * (i as f64 + 1.0)).max(0.0),
                confidence: SEASONAL_CONFIDENCE,
            }
        })
        .collect();

    Ok(ModelResult {
        model: ModelKind::Seasonal,
        predictions,
        reliability: Reliability::Medium,
        fit_quality,
    })
}

fn month_bucket(day_of_month: u32) -> usize {
    (((day_of_month.saturating_sub(1)) / 7) as usize).min(3)
}

fn fill_profile<const N: usize>(
    profile: &mut [f64; N],
    series: &PreparedSeries,
    overall_mean: f64,
    bucket_of: impl Fn(&crate::models::SeriesPoint) -> usize,
) {
    let mut sums = [0.0; N];
    let mut counts = [0usize; N];
    for point in series.points() {
        let bucket = bucket_of(point);
        sums[bucket] += point.value;
        counts[bucket] += 1;
    }
    for i in 0..N {
        if counts[i] > 0 {
            let index = sums[i] / counts[i] as f64 / overall_mean;
            if index.is_finite() && index > 0.0 {
                profile[i] = index;
            }
        }
    }
}

fn eval_polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, &c| acc * x + c)
}

/// Normal-equation polynomial fit (coefficients in ascending power order),
/// solved with Gaussian elimination and partial pivoting.
fn fit_polynomial(
    xs: &[f64],
    ys: &[f64],
    degree: usize,
) -> Result<Vec<f64>, ModelFitError> {
    let terms = degree + 1;

    // A[i][j] = sum(x^(i+j)), b[i] = sum(y * x^i)
    let mut matrix = vec![vec![0.0; terms + 1]; terms];
    for (&x, &y) in xs.iter().zip(ys) {
        let mut power = 1.0;
        let mut powers = Vec::with_capacity(2 * terms - 1);
        for _ in 0..(2 * terms - 1) {
            powers.push(power);
            power *= x;
        }
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().take(terms).enumerate() {
                *cell += powers[i + j];
            }
            row[terms] += y * powers[i];
        }
    }

    // Forward elimination with partial pivoting.
    for col in 0..terms {
        let pivot_row = (col..terms)
            .max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))
            .unwrap_or(col);
        if matrix[pivot_row][col].abs() < 1e-12 {
            return Err(ModelFitError::SingularFit("polynomial normal equations"));
        }
        matrix.swap(col, pivot_row);

        for row in (col + 1)..terms {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..=terms {
                matrix[row][k] -= factor * matrix[col][k];
            }
        }
    }

    // Back substitution.
    let mut coefficients = vec![0.0; terms];
    for row in (0..terms).rev() {
        let mut sum = matrix[row][terms];
        for col in (row + 1)..terms {
            sum -= matrix[row][col] * coefficients[col];
        }
        coefficients[row] = sum / matrix[row][row];
    }

    Ok(coefficients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CostObservation;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn series_from(values: &[f64]) -> PreparedSeries {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let records: Vec<CostObservation> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                CostObservation::new(start + ChronoDuration::days(i as i64), "rds", v)
            })
            .collect();
        PreparedSeries::prepare(&records, 1).unwrap()
    }

    #[test]
    fn test_linear_perfect_series() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let result = linear_forecast(&series_from(&values), 10).unwrap();

        assert!((result.fit_quality - 1.0).abs() < 1e-9);
        assert_eq!(result.reliability, Reliability::High);
        assert_eq!(result.predictions.len(), 10);
        // First step extrapolates index 30.
        assert!((result.predictions[0].value - 160.0).abs() < 1e-6);
        assert!((result.predictions[9].value - 178.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_dates_continue_series() {
        let values: Vec<f64> = (0..14).map(|i| 10.0 + i as f64).collect();
        let result = linear_forecast(&series_from(&values), 3).unwrap();
        assert_eq!(result.predictions[0].date.to_string(), "2025-06-15");
        assert_eq!(result.predictions[2].date.to_string(), "2025-06-17");
    }

    #[test]
    fn test_polynomial_fits_quadratic() {
        let values: Vec<f64> = (0..30)
            .map(|i| 50.0 + 0.5 * (i * i) as f64)
            .collect();
        let result = polynomial_forecast(&series_from(&values), 5).unwrap();
        assert!(result.fit_quality > 0.99);
        assert_eq!(result.reliability, Reliability::High);
        // Degree 3 cap: next value follows the quadratic closely.
        let expected = 50.0 + 0.5 * 900.0;
        assert!((result.predictions[0].value - expected).abs() / expected < 0.05);
    }

    #[test]
    fn test_polynomial_confidence_capped() {
        let values: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        let result = polynomial_forecast(&series_from(&values), 5).unwrap();
        for p in &result.predictions {
            assert!(p.confidence <= 0.95);
        }
    }

    #[test]
    fn test_holt_winters_confidence_decay() {
        let values: Vec<f64> = (0..28)
            .map(|i| if i % 7 < 5 { 120.0 } else { 40.0 })
            .collect();
        let result = holt_winters_forecast(&series_from(&values), 10).unwrap();

        assert_eq!(result.reliability, Reliability::Medium);
        assert_eq!(result.predictions.len(), 10);
        assert!((result.predictions[0].confidence - 0.8).abs() < 1e-9);
        assert!((result.predictions[9].confidence - 0.5).abs() < 1e-9);
        let confidences: Vec<f64> =
            result.predictions.iter().map(|p| p.confidence).collect();
        assert!(confidences.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_holt_winters_tracks_weekly_pattern() {
        // Strong 7-day cycle: forecast should stay periodic, not flat.
        let values: Vec<f64> = (0..35)
            .map(|i| if i % 7 == 0 { 300.0 } else { 100.0 })
            .collect();
        let result = holt_winters_forecast(&series_from(&values), 7).unwrap();

        let max = result
            .predictions
            .iter()
            .map(|p| p.value)
            .fold(f64::MIN, f64::max);
        let min = result
            .predictions
            .iter()
            .map(|p| p.value)
            .fold(f64::MAX, f64::min);
        assert!(max > min * 1.5, "expected a seasonal swing, got {min}..{max}");
    }

    #[test]
    fn test_holt_winters_rejects_short_series() {
        let values = vec![10.0; 13];
        assert!(holt_winters_forecast(&series_from(&values), 5).is_err());
    }

    #[test]
    fn test_seasonal_fixed_confidence_and_trend() {
        let values: Vec<f64> = (0..28).map(|i| 100.0 + 3.0 * i as f64).collect();
        let result = seasonal_forecast(&series_from(&values), 7).unwrap();
        assert_eq!(result.reliability, Reliability::Medium);
        for p in &result.predictions {
            assert!((p.confidence - 0.75).abs() < 1e-9);
            assert!(p.value >= 0.0);
        }
        // A full week ahead, the upward trend dominates the weekday factors.
        assert!(result.predictions[6].value > result.predictions[0].value);
    }

    #[test]
    fn test_seasonal_rejects_zero_mean() {
        let values = vec![0.0; 28];
        assert!(seasonal_forecast(&series_from(&values), 5).is_err());
    }

    #[test]
    fn test_predictions_non_negative_on_steep_decline() {
        let values: Vec<f64> = (0..20).map(|i| (200.0 - 15.0 * i as f64).max(0.0)).collect();
        for kind in ModelKind::ALL {
            if let Ok(result) = run_model(kind, &series_from(&values), 14) {
                for p in &result.predictions {
                    assert!(p.value >= 0.0, "{kind:?} produced negative {}", p.value);
                }
            }
        }
    }

    #[test]
    fn test_fit_polynomial_recovers_coefficients() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| 1.0 + 2.0 * x + 0.5 * x * x).collect();
        let coefficients = fit_polynomial(&xs, &ys, 2).unwrap();
        assert!((coefficients[0] - 1.0).abs() < 1e-6);
        assert!((coefficients[1] - 2.0).abs() < 1e-6);
        assert!((coefficients[2] - 0.5).abs() < 1e-6);
    }
}
