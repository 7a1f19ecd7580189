use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Linear,
    Polynomial,
    ExponentialSmoothing,
    Seasonal,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Linear,
        ModelKind::Polynomial,
        ModelKind::ExponentialSmoothing,
        ModelKind::Seasonal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Polynomial => "polynomial",
            ModelKind::ExponentialSmoothing => "exponential_smoothing",
            ModelKind::Seasonal => "seasonal",
        }
    }
}

/// A model's self-reported confidence bucket, derived from fit quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reliability {
    Low,
    Medium,
    High,
}

impl Reliability {
    /// Multiplier applied to a model's accuracy when weighting the ensemble.
    pub fn weight_multiplier(self) -> f64 {
        match self {
            Reliability::High => 1.2,
            Reliability::Medium => 1.0,
            Reliability::Low => 0.8,
        }
    }
}

/// One model's prediction for one future day.
#[derive(Debug, Clone, Serialize)]
pub struct ModelPrediction {
    pub date: NaiveDate,
    pub value: f64,
    pub confidence: f64,
}

/// Everything a single forecasting model reports back. Owned by the model
/// that produced it; the ensemble combiner reads it without modification.
#[derive(Debug, Clone, Serialize)]
pub struct ModelResult {
    pub model: ModelKind,
    pub predictions: Vec<ModelPrediction>,
    pub reliability: Reliability,
    /// In-sample R² of the model's fitted values.
    pub fit_quality: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelWeight {
    pub model: ModelKind,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelAccuracy {
    pub model: ModelKind,
    pub accuracy: f64,
}

/// One day of the ensemble forecast.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub confidence: f64,
    pub model_contributions: Vec<ModelWeight>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfidenceInterval {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastSummary {
    pub predicted_total: f64,
    pub average_daily_cost: f64,
    pub trend_direction: TrendDirection,
    pub volatility: f64,
    pub seasonality_strength: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ForecastInsights {
    pub significant_changes: Vec<String>,
    pub recommendations: Vec<String>,
    pub alerts: Vec<String>,
}

/// The forecast report produced by a run, shaped for the reporting
/// collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub horizon: usize,
    pub confidence_level: f64,
    pub predictions: Vec<ForecastPoint>,
    pub confidence_intervals: Vec<ConfidenceInterval>,
    pub model_accuracy: Vec<ModelAccuracy>,
    pub ensemble_accuracy: f64,
    pub insights: ForecastInsights,
    pub summary: ForecastSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reliability_multipliers() {
        assert_eq!(Reliability::High.weight_multiplier(), 1.2);
        assert_eq!(Reliability::Medium.weight_multiplier(), 1.0);
        assert_eq!(Reliability::Low.weight_multiplier(), 0.8);
    }

    #[test]
    fn test_model_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ModelKind::ExponentialSmoothing).unwrap(),
            "\"exponential_smoothing\""
        );
    }
}
