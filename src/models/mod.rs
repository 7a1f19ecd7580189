pub mod anomaly;
pub mod forecast;
pub mod series;

pub use anomaly::{
    classify_severity_by_deviation_pct, AlgorithmKind, AnomalyReport, AnomalyStats,
    CandidateAnomaly, DateRange, EnsembleAnomaly, ServiceCount, Severity,
    SeverityBreakdown,
};
pub use forecast::{
    ConfidenceInterval, ForecastInsights, ForecastPoint, ForecastReport,
    ForecastSummary, ModelAccuracy, ModelKind, ModelPrediction, ModelResult,
    ModelWeight, Reliability, TrendDirection,
};
pub use series::{CostObservation, PreparedSeries, SeriesPoint};
