pub type RtResult<T> = Result<T, RtError>;

#[derive(Debug, thiserror::Error)]
pub enum RtError {
    #[error("invalid parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("series `{series}` has no days")]
    EmptyInput { series: String },

    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("numerical instability at day {day}: {detail}")]
    NumericalInstability { day: usize, detail: String },

    #[error("invalid series `{series}`: {reason}")]
    InvalidSeries { series: String, reason: String },

    #[error(transparent)]
    Run(#[from] mrp::MrpError),
}

impl RtError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        RtError::InvalidParameters {
            reason: reason.into(),
        }
    }

    pub(crate) fn insufficient(reason: impl Into<String>) -> Self {
        RtError::InsufficientData {
            reason: reason.into(),
        }
    }
}
