//! costwatch: a cost anomaly detection and forecasting engine.
//!
//! The engine consumes an already-materialized series of periodic cost
//! observations (one value per service per day) and produces two artifacts:
//!
//! - an anomaly report, combining four statistical detectors (rolling
//!   z-score, IQR, regression residual, seasonal deviation) through an
//!   ensemble with `(date, service)`-keyed deduplication, and
//! - a multi-horizon forecast with confidence bounds, blending four models
//!   (linear, polynomial, Holt-Winters, seasonal-pattern) by accuracy and
//!   reliability, plus rule-based business insights.
//!
//! All computation is synchronous, CPU-bound and deterministic for identical
//! input; fetching billing data, persisting results and delivering alerts
//! are the caller's concern.
//!
//! ```no_run
//! use costwatch::{CostAnomalyDetector, CostForecaster, CostObservation};
//!
//! # fn run(records: Vec<CostObservation>) -> anyhow::Result<()> {
//! let report = CostAnomalyDetector::default().detect(&records)?;
//! for anomaly in &report.anomalies {
//!     if anomaly.needs_immediate_alert {
//!         // hand off to the alerting collaborator
//!     }
//! }
//!
//! let forecast = CostForecaster::default().forecast(&records, 30)?;
//! println!("30-day total: {:.2}", forecast.summary.predicted_total);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod errors;
pub mod ml;
pub mod models;

pub use cache::{series_fingerprint, ForecastCache};
pub use config::{DetectionConfig, EngineConfig, ForecastConfig};
pub use errors::{EngineError, ModelFitError};
pub use ml::ensemble::merge_anomaly_runs;
pub use ml::{CostAnomalyDetector, CostForecaster};
pub use models::{
    AlgorithmKind, AnomalyReport, CandidateAnomaly, ConfidenceInterval,
    CostObservation, EnsembleAnomaly, ForecastPoint, ForecastReport, ModelKind,
    ModelResult, PreparedSeries, Reliability, Severity, TrendDirection,
};
