use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    ZScore,
    Iqr,
    Regression,
    Seasonal,
}

impl AlgorithmKind {
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmKind::ZScore => "z_score",
            AlgorithmKind::Iqr => "iqr",
            AlgorithmKind::Regression => "regression",
            AlgorithmKind::Seasonal => "seasonal",
        }
    }
}

/// Per-algorithm statistics attached to a candidate, kept for explainability
/// in alert payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyStats {
    ZScore {
        z_score: f64,
        window_mean: f64,
        window_std: f64,
    },
    Iqr {
        q1: f64,
        q3: f64,
        lower_bound: f64,
        upper_bound: f64,
    },
    Regression {
        residual: f64,
        threshold: f64,
    },
    Seasonal {
        expected: f64,
        deviation: f64,
    },
}

/// One algorithm's finding for one series index. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateAnomaly {
    pub series_index: usize,
    pub value: f64,
    pub algorithm: AlgorithmKind,
    pub confidence: f64,
    pub severity: Severity,
    pub stats: AnomalyStats,
}

/// The ensemble's merged view of all candidates at one series index.
/// `unique_key` identifies the anomaly across overlapping detection runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleAnomaly {
    pub series_index: usize,
    pub date: NaiveDate,
    pub service: String,
    pub value: f64,
    pub algorithms: Vec<AlgorithmKind>,
    pub confidence: f64,
    pub severity: Severity,
    pub needs_immediate_alert: bool,
    pub unique_key: String,
    pub organization: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeverityBreakdown {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceCount {
    pub service: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The anomaly report produced by a detection run, shaped for the
/// alerting/reporting collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub total_anomalies: usize,
    pub severity_breakdown: SeverityBreakdown,
    pub top_services: Vec<ServiceCount>,
    pub date_range: DateRange,
    pub recommendations: Vec<String>,
    pub anomalies: Vec<EnsembleAnomaly>,
}

/// Bucket a percentage deviation from the expected value.
pub fn classify_severity_by_deviation_pct(deviation_pct: f64) -> Severity {
    if deviation_pct >= 100.0 {
        Severity::Critical
    } else if deviation_pct >= 50.0 {
        Severity::High
    } else if deviation_pct >= 25.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_classify_by_deviation_pct() {
        assert_eq!(classify_severity_by_deviation_pct(150.0), Severity::Critical);
        assert_eq!(classify_severity_by_deviation_pct(60.0), Severity::High);
        assert_eq!(classify_severity_by_deviation_pct(30.0), Severity::Medium);
        assert_eq!(classify_severity_by_deviation_pct(10.0), Severity::Low);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(
            serde_json::to_string(&AlgorithmKind::ZScore).unwrap(),
            "\"z_score\""
        );
    }
}
