use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// A raw cost record as handed over by the billing-data collaborator.
/// `amount` may be absent when the upstream export had a gap; such records
/// are dropped during preparation. `organization` and `region` pass through
/// unchanged for downstream alerting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostObservation {
    pub timestamp: DateTime<Utc>,
    pub service: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl CostObservation {
    pub fn new(timestamp: DateTime<Utc>, service: impl Into<String>, amount: f64) -> Self {
        Self {
            timestamp,
            service: service.into(),
            amount: Some(amount),
            organization: None,
            region: None,
        }
    }
}

/// One point of a prepared series. `index` is the 0-based position every
/// algorithm uses to correlate its findings with the others.
#[derive(Debug, Clone)]
pub struct SeriesPoint {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: u32,
    pub day_of_month: u32,
    pub hour: u32,
    pub service: String,
    pub organization: Option<String>,
    pub region: Option<String>,
}

impl SeriesPoint {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// A normalized, timestamp-sorted cost series. Immutable once prepared; both
/// detection and forecasting consume it read-only.
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    points: Vec<SeriesPoint>,
}

impl PreparedSeries {
    /// Normalize raw records into a sorted series with derived calendar
    /// fields. Records with a missing or non-finite amount are dropped; the
    /// sort is stable, so timestamp ties keep their input order.
    pub fn prepare(
        records: &[CostObservation],
        min_points: usize,
    ) -> Result<Self, EngineError> {
        let mut kept: Vec<&CostObservation> = records
            .iter()
            .filter(|r| r.amount.is_some_and(f64::is_finite))
            .collect();
        kept.sort_by_key(|r| r.timestamp);

        if kept.len() < min_points {
            return Err(EngineError::InsufficientData {
                required: min_points,
                actual: kept.len(),
            });
        }

        let points = kept
            .into_iter()
            .enumerate()
            .map(|(index, r)| SeriesPoint {
                index,
                timestamp: r.timestamp,
                value: r.amount.unwrap_or_default(),
                day_of_week: r.timestamp.weekday().num_days_from_monday(),
                day_of_month: r.timestamp.day(),
                hour: r.timestamp.hour(),
                service: r.service.clone(),
                organization: r.organization.clone(),
                region: r.region.clone(),
            })
            .collect();

        Ok(Self { points })
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&SeriesPoint> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(SeriesPoint::date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(SeriesPoint::date)
    }

    /// True when at least one timestamp carries sub-day resolution, in which
    /// case the seasonal detector also builds an hourly profile.
    pub fn has_intraday_resolution(&self) -> bool {
        self.points
            .iter()
            .any(|p| p.hour != 0 || p.timestamp.minute() != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn obs(day: u32, amount: f64) -> CostObservation {
        CostObservation::new(
            Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap(),
            "ec2",
            amount,
        )
    }

    #[test]
    fn test_prepare_sorts_and_indexes() {
        let records = vec![obs(3, 30.0), obs(1, 10.0), obs(2, 20.0), obs(4, 40.0)];
        let series = PreparedSeries::prepare(&records, 4).unwrap();

        let values = series.values();
        assert_eq!(values, vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(series.points()[0].index, 0);
        assert_eq!(series.points()[3].index, 3);
        assert_eq!(series.first_date().unwrap().to_string(), "2025-06-01");
        assert_eq!(series.last_date().unwrap().to_string(), "2025-06-04");
    }

    #[test]
    fn test_prepare_drops_missing_values() {
        let mut records = vec![obs(1, 10.0), obs(2, 20.0), obs(3, 30.0)];
        records.push(CostObservation {
            amount: None,
            ..obs(4, 0.0)
        });
        records.push(CostObservation {
            amount: Some(f64::NAN),
            ..obs(5, 0.0)
        });

        let series = PreparedSeries::prepare(&records, 3).unwrap();
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_prepare_insufficient_data() {
        let records = vec![obs(1, 10.0), obs(2, 20.0)];
        let err = PreparedSeries::prepare(&records, 7).unwrap_err();
        match err {
            EngineError::InsufficientData { required, actual } => {
                assert_eq!(required, 7);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_calendar_fields() {
        // 2025-06-02 is a Monday.
        let series = PreparedSeries::prepare(&[obs(2, 1.0)], 1).unwrap();
        let point = &series.points()[0];
        assert_eq!(point.day_of_week, 0);
        assert_eq!(point.day_of_month, 2);
        assert_eq!(point.hour, 0);
        assert!(!series.has_intraday_resolution());
    }

    #[test]
    fn test_intraday_resolution() {
        let mut record = obs(1, 5.0);
        record.timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 13, 0, 0).unwrap();
        let series = PreparedSeries::prepare(&[record], 1).unwrap();
        assert!(series.has_intraday_resolution());
        assert_eq!(series.points()[0].hour, 13);
    }
}
