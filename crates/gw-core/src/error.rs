use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid {what}: {value} (must be a positive integer)")]
    NonPositive { what: &'static str, value: i64 },

    #[error("Unknown boundary-condition type: '{value}' (expected riv, drn or ghb)")]
    UnknownBcType { value: String },

    #[error("Unknown flow unit: '{value}' (expected cfd, cfs or mgd)")]
    UnknownFlowUnit { value: String },
}
