//! Weighted combination of the individual forecasting models, confidence
//! intervals and summary statistics.

use crate::errors::EngineError;
use crate::models::{
    ConfidenceInterval, ForecastPoint, ModelAccuracy, ModelKind, ModelResult,
    ModelWeight, PreparedSeries, TrendDirection,
};

use super::stats;

/// Interval width grows by this fraction over the horizon (time decay).
const TIME_DECAY_FACTOR: f64 = 0.5;

/// Estimated accuracy of a model on this series: a per-model base accuracy,
/// penalized by the series' volatility, scaled down for short histories and
/// clamped to [0.4, 0.95]. Not cross-validated.
pub fn model_accuracy(kind: ModelKind, series: &PreparedSeries) -> f64 {
    let (base, penalty) = match kind {
        ModelKind::Linear => (0.75, 0.2),
        ModelKind::Polynomial => (0.80, 0.3),
        ModelKind::ExponentialSmoothing => (0.78, 0.25),
        ModelKind::Seasonal => (0.73, 0.2),
    };
    let volatility = stats::coefficient_of_variation(&series.values());
    let history_scale = (series.len() as f64 / 30.0).min(1.0);
    ((base - volatility * penalty) * history_scale).clamp(0.4, 0.95)
}

#[derive(Debug)]
pub struct EnsembleForecast {
    pub predictions: Vec<ForecastPoint>,
    pub weights: Vec<ModelWeight>,
    pub accuracies: Vec<ModelAccuracy>,
    pub ensemble_accuracy: f64,
}

/// Weight each model by `accuracy · reliability multiplier`, normalize over
/// the models that produced predictions, and blend per-day values and
/// confidences.
pub fn combine_models(
    series: &PreparedSeries,
    results: &[ModelResult],
    horizon: usize,
) -> Result<EnsembleForecast, EngineError> {
    let usable: Vec<&ModelResult> = results
        .iter()
        .filter(|r| !r.predictions.is_empty())
        .collect();
    if usable.is_empty() {
        return Err(EngineError::NoViableModel);
    }

    let accuracies: Vec<ModelAccuracy> = usable
        .iter()
        .map(|r| ModelAccuracy {
            model: r.model,
            accuracy: model_accuracy(r.model, series),
        })
        .collect();

    let raw_weights: Vec<f64> = usable
        .iter()
        .zip(&accuracies)
        .map(|(r, a)| a.accuracy * r.reliability.weight_multiplier())
        .collect();
    let total_weight: f64 = raw_weights.iter().sum();

    let weights: Vec<ModelWeight> = usable
        .iter()
        .zip(&raw_weights)
        .map(|(r, &w)| ModelWeight {
            model: r.model,
            weight: w / total_weight,
        })
        .collect();

    let ensemble_accuracy = weights
        .iter()
        .zip(&accuracies)
        .map(|(w, a)| w.weight * a.accuracy)
        .sum();

    let mut predictions = Vec::with_capacity(horizon);
    for day in 0..horizon {
        let Some(date) = usable
            .iter()
            .find_map(|r| r.predictions.get(day).map(|p| p.date))
        else {
            break;
        };

        let mut predicted = 0.0;
        let mut confidence = 0.0;
        for (result, weight) in usable.iter().zip(&weights) {
            if let Some(p) = result.predictions.get(day) {
                predicted += weight.weight * p.value;
                confidence += weight.weight * p.confidence;
            }
        }

        predictions.push(ForecastPoint {
            date,
            predicted,
            confidence,
            model_contributions: weights.clone(),
        });
    }

    Ok(EnsembleForecast {
        predictions,
        weights,
        accuracies,
        ensemble_accuracy,
    })
}

/// Two-sided interval around each ensemble point: `z · stddev(history)`
/// widened linearly with the day index. The lower bound never goes negative.
pub fn confidence_intervals(
    history_std: f64,
    predictions: &[ForecastPoint],
    confidence_level: f64,
    horizon: usize,
) -> Vec<ConfidenceInterval> {
    let z = z_value(confidence_level);
    let horizon = horizon.max(1) as f64;

    predictions
        .iter()
        .enumerate()
        .map(|(day, p)| {
            let time_decay = 1.0 + (day as f64 / horizon) * TIME_DECAY_FACTOR;
            let margin = z * history_std * time_decay;
            ConfidenceInterval {
                date: p.date,
                predicted: p.predicted,
                lower_bound: (p.predicted - margin).max(0.0),
                upper_bound: p.predicted + margin,
            }
        })
        .collect()
}

fn z_value(confidence_level: f64) -> f64 {
    if (confidence_level - 0.90).abs() < 1e-9 {
        1.645
    } else {
        1.96
    }
}

/// Trend of the ensemble prediction sequence (first vs last point).
pub fn trend_direction(predictions: &[ForecastPoint]) -> TrendDirection {
    match (predictions.first(), predictions.last()) {
        (Some(first), Some(last)) if last.predicted > first.predicted => {
            TrendDirection::Increasing
        }
        (Some(first), Some(last)) if last.predicted < first.predicted => {
            TrendDirection::Decreasing
        }
        _ => TrendDirection::Stable,
    }
}

/// Relative spread of the predicted values (stddev/mean, 0 when degenerate).
pub fn prediction_volatility(predictions: &[ForecastPoint]) -> f64 {
    let values: Vec<f64> = predictions.iter().map(|p| p.predicted).collect();
    stats::coefficient_of_variation(&values)
}

/// Share of the series variance explained by a 7-day (day-of-week)
/// decomposition: the variance of the day-of-week group means over the total
/// variance, clamped to [0, 1]. Zero total variance yields 0.
pub fn seasonality_strength(series: &PreparedSeries) -> f64 {
    let values = series.values();
    let total_variance = stats::variance(&values);
    if total_variance < stats::DEGENERACY_EPSILON {
        return 0.0;
    }

    let overall_mean = stats::mean(&values);
    let mut sums = [0.0; 7];
    let mut counts = [0usize; 7];
    for point in series.points() {
        sums[point.day_of_week as usize] += point.value;
        counts[point.day_of_week as usize] += 1;
    }

    let between_group: f64 = sums
        .iter()
        .zip(&counts)
        .filter(|(_, &count)| count > 0)
        .map(|(&sum, &count)| {
            let group_mean = sum / count as f64;
            count as f64 * (group_mean - overall_mean).powi(2)
        })
        .sum::<f64>()
        / values.len() as f64;

    (between_group / total_variance).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::forecast;
    use crate::models::CostObservation;
    use chrono::{Duration, TimeZone, Utc};

    fn series_from(values: &[f64]) -> PreparedSeries {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let records: Vec<CostObservation> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                CostObservation::new(start + Duration::days(i as i64), "lambda", v)
            })
            .collect();
        PreparedSeries::prepare(&records, 1).unwrap()
    }

    fn all_model_results(series: &PreparedSeries, horizon: usize) -> Vec<crate::models::ModelResult> {
        ModelKind::ALL
            .iter()
            .filter_map(|&kind| forecast::run_model(kind, series, horizon).ok())
            .collect()
    }

    #[test]
    fn test_weights_sum_to_one() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let series = series_from(&values);
        let results = all_model_results(&series, 10);
        let ensemble = combine_models(&series, &results, 10).unwrap();

        let total: f64 = ensemble.weights.iter().map(|w| w.weight).sum();
        assert!((total - 1.0).abs() < 1e-6);
        for point in &ensemble.predictions {
            let contributed: f64 =
                point.model_contributions.iter().map(|w| w.weight).sum();
            assert!((contributed - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_no_viable_model() {
        let series = series_from(&[1.0, 2.0, 3.0]);
        let err = combine_models(&series, &[], 5).unwrap_err();
        assert!(matches!(err, EngineError::NoViableModel));
    }

    #[test]
    fn test_accuracy_clamped_and_scaled() {
        let stable: Vec<f64> = (0..30).map(|i| 100.0 + (i % 2) as f64).collect();
        let series = series_from(&stable);
        for kind in ModelKind::ALL {
            let accuracy = model_accuracy(kind, &series);
            assert!((0.4..=0.95).contains(&accuracy));
        }

        // A short history scales accuracy down.
        let short = series_from(&stable[..15]);
        assert!(model_accuracy(ModelKind::Linear, &short) < model_accuracy(ModelKind::Linear, &series));
    }

    #[test]
    fn test_intervals_ordered_and_widening() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let series = series_from(&values);
        let results = all_model_results(&series, 10);
        let ensemble = combine_models(&series, &results, 10).unwrap();

        let history_std = stats::std_dev(&series.values());
        let intervals = confidence_intervals(history_std, &ensemble.predictions, 0.95, 10);

        let mut previous_width = 0.0;
        for interval in &intervals {
            assert!(interval.lower_bound <= interval.predicted);
            assert!(interval.predicted <= interval.upper_bound);
            assert!(interval.lower_bound >= 0.0);
            let width = interval.upper_bound - interval.lower_bound;
            assert!(width >= previous_width);
            previous_width = width;
        }
    }

    #[test]
    fn test_z_values() {
        assert!((z_value(0.95) - 1.96).abs() < 1e-12);
        assert!((z_value(0.90) - 1.645).abs() < 1e-12);
        assert!((z_value(0.42) - 1.96).abs() < 1e-12);
    }

    #[test]
    fn test_trend_direction() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let series = series_from(&values);
        let results = all_model_results(&series, 10);
        let ensemble = combine_models(&series, &results, 10).unwrap();
        assert_eq!(trend_direction(&ensemble.predictions), TrendDirection::Increasing);
        assert_eq!(trend_direction(&[]), TrendDirection::Stable);
    }

    #[test]
    fn test_seasonality_strength_bounds() {
        // Strong weekly pattern.
        let seasonal: Vec<f64> = (0..28)
            .map(|i| if i % 7 < 5 { 200.0 } else { 50.0 })
            .collect();
        let strong = seasonality_strength(&series_from(&seasonal));
        assert!(strong > 0.4, "expected strong seasonality, got {strong}");

        // Flat series has no seasonality signal.
        let flat = vec![100.0; 28];
        assert_eq!(seasonality_strength(&series_from(&flat)), 0.0);

        // Always within [0, 1].
        assert!((0.0..=1.0).contains(&strong));
    }
}
