use thiserror::Error;

/// Request-level failures. Anything that does not appear here degrades to a
/// `null` parameter or a placeholder weather record instead.
#[derive(Debug, Error)]
pub enum GeoEnvError {
    #[error("latitude must be between -90 and 90, got {0}")]
    InvalidLatitude(f64),

    #[error("longitude must be between -180 and 180, got {0}")]
    InvalidLongitude(f64),

    #[error("days_back must be between 1 and 365, got {0}")]
    InvalidDaysBack(i64),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("remote sensing provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl GeoEnvError {
    /// Name of the request field that caused a validation failure.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            GeoEnvError::InvalidLatitude(_) => Some("latitude"),
            GeoEnvError::InvalidLongitude(_) => Some("longitude"),
            GeoEnvError::InvalidDaysBack(_) => Some("days_back"),
            GeoEnvError::MissingField(name) => Some(*name),
            GeoEnvError::ProviderUnavailable(_) => None,
        }
    }

    /// True for errors caused by the caller's input.
    pub fn is_invalid_input(&self) -> bool {
        self.field().is_some()
    }
}
