//! Rule-based business insights derived from the ensemble forecast.
//!
//! Advisory strings only; dispatching them to notification channels is the
//! caller's concern.

use crate::models::ForecastInsights;

/// Trend-change insight fires past this percent change in daily average.
const TREND_CHANGE_PCT: f64 = 15.0;
/// Volatility alert threshold (stddev/mean of the predictions).
const VOLATILITY_ALERT: f64 = 0.3;
/// Seasonality recommendation threshold.
const SEASONALITY_RECOMMENDATION: f64 = 0.4;
/// Budget-risk alert: forecast total vs naive run-rate extrapolation.
const BUDGET_RISK_RATIO: f64 = 1.2;

#[derive(Debug, Clone)]
pub struct InsightInputs {
    pub historical_daily_avg: f64,
    pub forecast_daily_avg: f64,
    pub volatility: f64,
    pub seasonality_strength: f64,
    pub forecast_total: f64,
    /// Current daily average extrapolated over the horizon.
    pub naive_total: f64,
    pub horizon: usize,
}

pub fn generate_insights(inputs: &InsightInputs) -> ForecastInsights {
    let mut insights = ForecastInsights::default();

    let change_pct = if inputs.historical_daily_avg.abs() > f64::EPSILON {
        (inputs.forecast_daily_avg - inputs.historical_daily_avg)
            / inputs.historical_daily_avg
            * 100.0
    } else {
        0.0
    };

    if change_pct.abs() > TREND_CHANGE_PCT {
        let direction = if change_pct > 0.0 { "rise" } else { "fall" };
        insights.significant_changes.push(format!(
            "Daily costs are forecast to {direction} {:.1}% (from ${:.2} to ${:.2} per day).",
            change_pct.abs(),
            inputs.historical_daily_avg,
            inputs.forecast_daily_avg,
        ));
    }

    if inputs.volatility > VOLATILITY_ALERT {
        insights.alerts.push(format!(
            "High forecast volatility ({:.0}% of the daily average). Expect wide day-to-day swings.",
            inputs.volatility * 100.0,
        ));
    }

    if inputs.seasonality_strength > SEASONALITY_RECOMMENDATION {
        insights.recommendations.push(format!(
            "Strong weekly cost pattern (strength {:.2}). Schedule discretionary workloads on low-cost days and size budgets per weekday.",
            inputs.seasonality_strength,
        ));
    }

    if inputs.naive_total > f64::EPSILON
        && inputs.forecast_total > BUDGET_RISK_RATIO * inputs.naive_total
    {
        insights.alerts.push(format!(
            "Budget risk: projected {}-day spend ${:.2} exceeds the current run rate (${:.2}) by more than 20%.",
            inputs.horizon, inputs.forecast_total, inputs.naive_total,
        ));
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_inputs() -> InsightInputs {
        InsightInputs {
            historical_daily_avg: 100.0,
            forecast_daily_avg: 102.0,
            volatility: 0.05,
            seasonality_strength: 0.1,
            forecast_total: 3060.0,
            naive_total: 3000.0,
            horizon: 30,
        }
    }

    #[test]
    fn test_quiet_forecast_emits_nothing() {
        let insights = generate_insights(&quiet_inputs());
        assert!(insights.significant_changes.is_empty());
        assert!(insights.recommendations.is_empty());
        assert!(insights.alerts.is_empty());
    }

    #[test]
    fn test_trend_change_insight() {
        let mut inputs = quiet_inputs();
        inputs.forecast_daily_avg = 120.0;
        let insights = generate_insights(&inputs);
        assert_eq!(insights.significant_changes.len(), 1);
        assert!(insights.significant_changes[0].contains("rise"));

        inputs.forecast_daily_avg = 80.0;
        let insights = generate_insights(&inputs);
        assert!(insights.significant_changes[0].contains("fall"));
    }

    #[test]
    fn test_volatility_alert() {
        let mut inputs = quiet_inputs();
        inputs.volatility = 0.45;
        let insights = generate_insights(&inputs);
        assert_eq!(insights.alerts.len(), 1);
        assert!(insights.alerts[0].contains("volatility"));
    }

    #[test]
    fn test_seasonality_recommendation() {
        let mut inputs = quiet_inputs();
        inputs.seasonality_strength = 0.6;
        let insights = generate_insights(&inputs);
        assert_eq!(insights.recommendations.len(), 1);
    }

    #[test]
    fn test_budget_risk_alert() {
        let mut inputs = quiet_inputs();
        inputs.forecast_total = 4000.0;
        let insights = generate_insights(&inputs);
        assert!(insights.alerts.iter().any(|a| a.contains("Budget risk")));
    }

    #[test]
    fn test_zero_history_is_neutral() {
        let mut inputs = quiet_inputs();
        inputs.historical_daily_avg = 0.0;
        inputs.naive_total = 0.0;
        let insights = generate_insights(&inputs);
        assert!(insights.significant_changes.is_empty());
        assert!(insights.alerts.is_empty());
    }
}
