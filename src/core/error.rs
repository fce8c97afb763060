use thiserror::Error;

/// Failures surfaced by the reform/situation builders and the simulation
/// engines. Builder rejections are client errors; everything else indicates
/// an inconsistency inside the engine itself.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid value for {lever}: {reason}")]
    InvalidLeverValue { lever: String, reason: String },
    #[error("no parameter at path {0}")]
    UnknownParameter(String),
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl PolicyError {
    pub fn invalid_lever(lever: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLeverValue {
            lever: lever.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the failure was caused by the caller's parameters rather
    /// than by the engine.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::InvalidLeverValue { .. })
    }
}
