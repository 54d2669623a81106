//! Load-time error taxonomy.
//!
//! Both variants of [`CongestionError`] are fatal to a session. Absence of
//! matching data at query time is never reported through these types.

/// The input could not be read, or was read but does not have the expected shape.
#[derive(thiserror::Error, Debug)]
pub enum CongestionError {
    #[error("congestion data unavailable from '{origin}': {source}")]
    DataUnavailable {
        origin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("congestion data schema error: {0}")]
    Schema(#[from] SchemaError),
}

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("no time bucket columns (no header contains '{0}')")]
    NoTimeBuckets(char),
    #[error("malformed row: {0}")]
    MalformedRow(#[from] csv::Error),
}

impl CongestionError {
    pub(crate) fn unavailable(origin: impl Into<String>, source: std::io::Error) -> Self {
        CongestionError::DataUnavailable {
            origin: origin.into(),
            source,
        }
    }

    /// Classifies a csv error: I/O failures mean the source went away mid-read,
    /// everything else is a malformed row.
    pub(crate) fn from_csv(origin: &str, err: csv::Error) -> Self {
        if err.is_io_error() {
            CongestionError::unavailable(origin, err.into())
        } else {
            CongestionError::Schema(SchemaError::MalformedRow(err))
        }
    }
}
