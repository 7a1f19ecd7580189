//! The analysis engine: anomaly detection and forecasting facades over the
//! individual algorithms and ensembles.
//!
//! Both engines are pure with respect to their input: no shared mutable
//! state, safely re-entrant, and deterministic for identical input and
//! configuration (report run ids and timestamps aside). Overlapping
//! detection runs are reconciled through unique-key deduplication
//! (`ensemble::merge_anomaly_runs`), never through locking.

pub mod anomaly;
pub mod ensemble;
pub mod forecast;
pub mod forecast_ensemble;
pub mod insights;
pub mod stats;

use std::collections::BTreeMap;

use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::cache::{series_fingerprint, ForecastCache};
use crate::config::{DetectionConfig, ForecastConfig};
use crate::errors::EngineError;
use crate::models::{
    classify_severity_by_deviation_pct, AnomalyReport, CostObservation, DateRange,
    EnsembleAnomaly, ForecastReport, ForecastSummary, ModelKind, PreparedSeries,
    ServiceCount, Severity, SeverityBreakdown,
};

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Multi-algorithm anomaly detection over raw cost records.
#[derive(Debug, Clone, Default)]
pub struct CostAnomalyDetector {
    config: DetectionConfig,
}

impl CostAnomalyDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, records: &[CostObservation]) -> Result<AnomalyReport, EngineError> {
        let series = PreparedSeries::prepare(records, self.config.min_data_points)?;

        let mut candidates = Vec::new();
        for &kind in &self.config.algorithms {
            let found = anomaly::run_algorithm(kind, &series, self.config.threshold);
            tracing::debug!(
                algorithm = kind.name(),
                count = found.len(),
                "Algorithm pass complete"
            );
            candidates.extend(found);
        }

        let anomalies = ensemble::combine_candidates(&series, candidates);
        tracing::info!(count = anomalies.len(), "Detected anomalies");

        Ok(build_anomaly_report(
            &series,
            anomalies,
            self.config.max_reported,
        ))
    }
}

fn build_anomaly_report(
    series: &PreparedSeries,
    anomalies: Vec<EnsembleAnomaly>,
    cap: usize,
) -> AnomalyReport {
    let mut severity_breakdown = SeverityBreakdown::default();
    for anomaly in &anomalies {
        match anomaly.severity {
            Severity::Critical => severity_breakdown.critical += 1,
            Severity::High => severity_breakdown.high += 1,
            Severity::Medium => severity_breakdown.medium += 1,
            Severity::Low => severity_breakdown.low += 1,
        }
    }

    let mut service_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for anomaly in &anomalies {
        *service_counts.entry(anomaly.service.as_str()).or_default() += 1;
    }
    let mut top_services: Vec<ServiceCount> = service_counts
        .into_iter()
        .map(|(service, count)| ServiceCount {
            service: service.to_string(),
            count,
        })
        .collect();
    top_services.sort_by(|a, b| b.count.cmp(&a.count).then(a.service.cmp(&b.service)));
    top_services.truncate(5);

    let recommendations =
        build_recommendations(series, &anomalies, &severity_breakdown, &top_services);

    let date_range = DateRange {
        start: series.first_date().unwrap_or_default(),
        end: series.last_date().unwrap_or_default(),
    };

    let total_anomalies = anomalies.len();
    let mut anomalies = anomalies;
    anomalies.truncate(cap);

    AnomalyReport {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        total_anomalies,
        severity_breakdown,
        top_services,
        date_range,
        recommendations,
        anomalies,
    }
}

fn build_recommendations(
    series: &PreparedSeries,
    anomalies: &[EnsembleAnomaly],
    breakdown: &SeverityBreakdown,
    top_services: &[ServiceCount],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if breakdown.critical > 0 {
        let noun = if breakdown.critical == 1 {
            "anomaly"
        } else {
            "anomalies"
        };
        recommendations.push(format!(
            "{} critical cost {noun} detected; investigate immediately.",
            breakdown.critical
        ));
    }

    if let Some(top) = top_services.first() {
        if top.count >= 3 && top.count * 2 > anomalies.len() {
            recommendations.push(format!(
                "Service '{}' accounts for {} of {} anomalies; review its recent deployments and configuration changes.",
                top.service,
                top.count,
                anomalies.len()
            ));
        }
    }

    let mut weekday_counts = [0usize; 7];
    for anomaly in anomalies {
        weekday_counts[anomaly.date.weekday().num_days_from_monday() as usize] += 1;
    }
    if let Some((weekday, &count)) = weekday_counts
        .iter()
        .enumerate()
        .max_by_key(|(_, &count)| count)
    {
        if count >= 3 {
            recommendations.push(format!(
                "Anomalies recur on {}s; check scheduled jobs and batch workloads.",
                WEEKDAY_NAMES[weekday]
            ));
        }
    }

    if let Some(top_anomaly) = anomalies.first() {
        let mean = stats::mean(&series.values());
        if mean.abs() > stats::DEGENERACY_EPSILON {
            let deviation_pct = ((top_anomaly.value - mean) / mean * 100.0).abs();
            if classify_severity_by_deviation_pct(deviation_pct) >= Severity::High {
                recommendations.push(format!(
                    "The largest anomaly deviates {deviation_pct:.0}% from the period average of ${mean:.2}."
                ));
            }
        }
    }

    recommendations
}

/// Multi-model forecasting over raw cost records.
#[derive(Debug, Clone, Default)]
pub struct CostForecaster {
    config: ForecastConfig,
}

impl CostForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn forecast(
        &self,
        records: &[CostObservation],
        horizon: usize,
    ) -> Result<ForecastReport, EngineError> {
        if horizon == 0 {
            return Err(EngineError::InvalidHorizon(horizon));
        }
        let series = PreparedSeries::prepare(records, self.config.min_data_points)?;
        self.forecast_series(&series, horizon)
    }

    /// Forecast over the configured default horizon.
    pub fn forecast_default(
        &self,
        records: &[CostObservation],
    ) -> Result<ForecastReport, EngineError> {
        self.forecast(records, self.config.default_horizon)
    }

    /// Like [`forecast`](Self::forecast), but consults the injected cache
    /// first. Identical input (by fingerprint) within the cache's TTL
    /// returns the previously computed report.
    pub fn forecast_cached(
        &self,
        records: &[CostObservation],
        horizon: usize,
        cache: &ForecastCache,
    ) -> Result<ForecastReport, EngineError> {
        if horizon == 0 {
            return Err(EngineError::InvalidHorizon(horizon));
        }
        let series = PreparedSeries::prepare(records, self.config.min_data_points)?;

        let key = series_fingerprint(&series, horizon, self.config.confidence_level);
        if let Some(report) = cache.get(&key) {
            tracing::debug!(fingerprint = %key, "Forecast cache hit");
            return Ok(report);
        }

        let report = self.forecast_series(&series, horizon)?;
        cache.insert(key, report.clone());
        Ok(report)
    }

    fn forecast_series(
        &self,
        series: &PreparedSeries,
        horizon: usize,
    ) -> Result<ForecastReport, EngineError> {
        let mut results = Vec::new();
        for kind in ModelKind::ALL {
            match forecast::run_model(kind, series, horizon) {
                Ok(result) => results.push(result),
                Err(error) => {
                    tracing::warn!(
                        model = kind.name(),
                        %error,
                        "Model fit failed; excluded from ensemble"
                    );
                }
            }
        }

        let combined = forecast_ensemble::combine_models(series, &results, horizon)?;

        let values = series.values();
        let history_std = stats::std_dev(&values);
        let confidence_intervals = forecast_ensemble::confidence_intervals(
            history_std,
            &combined.predictions,
            self.config.confidence_level,
            horizon,
        );

        let predicted_total: f64 = combined.predictions.iter().map(|p| p.predicted).sum();
        let average_daily_cost = if combined.predictions.is_empty() {
            0.0
        } else {
            predicted_total / combined.predictions.len() as f64
        };
        let volatility = forecast_ensemble::prediction_volatility(&combined.predictions);
        let seasonality_strength = forecast_ensemble::seasonality_strength(series);
        let historical_daily_avg = stats::mean(&values);

        let insights = insights::generate_insights(&insights::InsightInputs {
            historical_daily_avg,
            forecast_daily_avg: average_daily_cost,
            volatility,
            seasonality_strength,
            forecast_total: predicted_total,
            naive_total: historical_daily_avg * horizon as f64,
            horizon,
        });

        let summary = ForecastSummary {
            predicted_total,
            average_daily_cost,
            trend_direction: forecast_ensemble::trend_direction(&combined.predictions),
            volatility,
            seasonality_strength,
        };

        tracing::info!(horizon, predicted_total, "Generated forecast");

        Ok(ForecastReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            horizon,
            confidence_level: self.config.confidence_level,
            predictions: combined.predictions,
            confidence_intervals,
            model_accuracy: combined.accuracies,
            ensemble_accuracy: combined.ensemble_accuracy,
            insights,
            summary,
        })
    }
}
