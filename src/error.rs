use std::path::PathBuf;

/// Failures surfaced by the metrics engine.
///
/// Every variant is local to one command invocation: nothing is retried, and a
/// failure before `history::save` leaves the persisted history untouched.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Malformed or incomplete input document.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The compact codec rejected the document.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// Totals were requested before any category was recorded.
    #[error("no metrics data available")]
    NoData,

    /// Trend or history was requested with no persisted runs.
    #[error("no historical data available")]
    EmptyHistory,

    /// A savings percentage was requested against zero verbose tokens.
    #[error("cannot compute savings percentage: verbose token count is zero")]
    DivideByZero,

    #[error("malformed history file {}", path.display())]
    MalformedHistory {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MetricsError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = MetricsError> = std::result::Result<T, E>;
