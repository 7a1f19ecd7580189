use serde::Deserialize;

use crate::models::AlgorithmKind;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// Z-score threshold; also scales the severity buckets of the other
    /// algorithms.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<AlgorithmKind>,
    #[serde(default = "default_detection_min_points")]
    pub min_data_points: usize,
    /// Set by callers that invoke detection on a tight cadence. Has no effect
    /// on the computation itself; carried through for alert routing.
    #[serde(default)]
    pub real_time: bool,
    /// Cap on anomalies included in a report.
    #[serde(default = "default_max_reported")]
    pub max_reported: usize,
}

fn default_threshold() -> f64 {
    2.5
}
fn default_algorithms() -> Vec<AlgorithmKind> {
    vec![
        AlgorithmKind::ZScore,
        AlgorithmKind::Iqr,
        AlgorithmKind::Regression,
        AlgorithmKind::Seasonal,
    ]
}
fn default_detection_min_points() -> usize {
    7
}
fn default_max_reported() -> usize {
    50
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            algorithms: default_algorithms(),
            min_data_points: default_detection_min_points(),
            real_time: false,
            max_reported: default_max_reported(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastConfig {
    #[serde(default = "default_forecast_min_points")]
    pub min_data_points: usize,
    /// Confidence level for prediction intervals (0.95 or 0.90).
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    #[serde(default = "default_horizon")]
    pub default_horizon: usize,
}

fn default_forecast_min_points() -> usize {
    14
}
fn default_confidence_level() -> f64 {
    0.95
}
fn default_horizon() -> usize {
    30
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_data_points: default_forecast_min_points(),
            confidence_level: default_confidence_level(),
            default_horizon: default_horizon(),
        }
    }
}

impl EngineConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("costwatch").required(false))
            .add_source(config::Environment::with_prefix("COSTWATCH").separator("__"))
            .build()?;

        let engine_config: EngineConfig = config.try_deserialize()?;
        Ok(engine_config)
    }
}
