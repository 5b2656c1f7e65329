use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// SQLite primary result codes that mean another writer holds the lock.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed input detected before any write.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session {template_id} has no occurrence on {date}")]
    OccurrenceNotInSeries { template_id: Uuid, date: NaiveDate },

    #[error("Session {0} is cancelled")]
    SeriesAlreadyCancelled(Uuid),

    /// Lock wait on the template row timed out.
    #[error("Session is being modified concurrently: {0}")]
    ConcurrentModification(String),

    #[error("Database error")]
    Persistence(#[source] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous short ID. Did you mean one of these?")]
    AmbiguousId(Vec<(String, String)>), // Vec of (ID, title)
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let primary = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| code & 0xff);
            if matches!(primary, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED)) {
                return CoreError::ConcurrentModification(db_err.message().to_string());
            }
        }
        CoreError::Persistence(err)
    }
}

impl CoreError {
    /// Stable machine-readable code, one per error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation_error",
            CoreError::OccurrenceNotInSeries { .. } => "occurrence_not_in_series",
            CoreError::SeriesAlreadyCancelled(_) => "series_already_cancelled",
            CoreError::ConcurrentModification(_) => "concurrent_modification",
            CoreError::Persistence(_) => "persistence_failure",
            CoreError::Migration(_) => "migration_failure",
            CoreError::Io(_) => "io_failure",
            CoreError::NotFound(_) => "not_found",
            CoreError::AmbiguousId(_) => "ambiguous_id",
        }
    }

    /// What the caller can do about it.
    pub fn remediation(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "Correct the highlighted input and submit again.",
            CoreError::OccurrenceNotInSeries { .. } => "Pick a date the series actually produces.",
            CoreError::SeriesAlreadyCancelled(_) => "The series is cancelled; reinstate it before editing.",
            CoreError::ConcurrentModification(_) => "Someone else is editing this series. Try again.",
            CoreError::Persistence(_) | CoreError::Migration(_) | CoreError::Io(_) => {
                "Nothing was changed. Try again later."
            }
            CoreError::NotFound(_) => "Check the session ID.",
            CoreError::AmbiguousId(_) => "Use a longer ID prefix.",
        }
    }

    /// Whether retrying the same request unchanged can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::ConcurrentModification(_) | CoreError::Persistence(_)
        )
    }
}
