use thiserror::Error;

/// Engine-level failures surfaced to the caller.
///
/// Everything else that can go wrong inside a detection or forecast run
/// (zero variance in a window, a singular regression fit, one model failing
/// to converge) is handled locally by skipping the affected point, algorithm
/// or model, so a run degrades gracefully instead of failing outright.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid forecast horizon: {0} (must be > 0)")]
    InvalidHorizon(usize),

    #[error("no forecasting model produced a usable fit")]
    NoViableModel,
}

/// Per-model fitting failure. Caught by the forecaster, which logs a warning
/// and excludes the model from the ensemble.
#[derive(Debug, Error)]
pub enum ModelFitError {
    #[error("degenerate series: {0}")]
    DegenerateSeries(&'static str),

    #[error("singular system while fitting {0}")]
    SingularFit(&'static str),
}
