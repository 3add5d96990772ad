//! Error handling and error classification for networktree

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("precision must be at least 2, got {0}")]
    InvalidPrecision(usize),

    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    /// The static position table has no entry for a code the data uses.
    #[error("country code '{0}' has no defined position")]
    UnknownCountry(String),

    #[error("geoname_id '{primary}' and '{fallback}' not found in city locations")]
    UnknownLocation { primary: String, fallback: String },

    #[error("node limit of {0} networks reached")]
    NodeLimit(usize),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("pipeline worker panicked")]
    WorkerPanicked,
}

/// Coarse classes a caller can act on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    InputData,
    Configuration,
    Invariant,
    Resource,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InputData => "Input data error",
            ErrorKind::Configuration => "Configuration error",
            ErrorKind::Invariant => "Invariant violation",
            ErrorKind::Resource => "Resource error",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            InvalidPrefix(_) | Csv(_) => ErrorKind::InputData,
            InvalidPrecision(_) | UnknownCountry(_) | UnknownLocation { .. } => {
                ErrorKind::Configuration
            }
            Invariant(_) | WorkerPanicked => ErrorKind::Invariant,
            Io(_) | Json(_) | NodeLimit(_) => ErrorKind::Resource,
        }
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Error::Invariant(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_are_configuration_errors() {
        assert_eq!(
            Error::UnknownCountry("QQ".into()).kind(),
            ErrorKind::Configuration
        );
        let e = Error::UnknownLocation {
            primary: "1".into(),
            fallback: "2".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Configuration);
        assert!(e.to_string().contains("'1' and '2'"));
    }

    #[test]
    fn io_is_a_resource_error() {
        let e: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(e.kind(), ErrorKind::Resource);
        assert_eq!(e.kind().as_str(), "Resource error");
    }
}
