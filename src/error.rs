//! Error taxonomy for `sqlit`.
//!
//! Every error that can escape the crate is represented here. Callers are
//! expected to match on [`StoreError`] variants, not on message text.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The complete error taxonomy surfaced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// DDL emission preconditions violated (see [`crate::schema::validate`]).
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Empty insert, negative limit/skip, empty update values, and similar.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `update`/`delete` issued without a meaningful predicate.
    #[error("missing predicate: {operation} requires at least one condition")]
    MissingPredicate {
        /// The operation that was rejected (`"update"` or `"delete"`).
        operation: &'static str,
    },

    /// `values` passed to `update` was empty.
    #[error("empty update: no columns were provided to update")]
    EmptyUpdate,

    /// An operation was issued before `connect` or after `disconnect`.
    #[error("not connected to a database")]
    NotConnected,

    /// A backup/restore source file does not exist.
    #[error("backup not found: {0}")]
    BackupNotFound(String),

    /// A backup/restore source file exists but is not a valid backup.
    #[error("backup corrupt: {0}")]
    BackupCorrupt(String),

    /// Pool exhausted past `acquire_timeout`.
    #[error("timed out acquiring a pooled connection after {waited_ms}ms")]
    AcquireTimeout {
        /// How long the caller waited before giving up, in milliseconds.
        waited_ms: u64,
    },

    /// A waiter was rejected because the pool is shutting down.
    #[error("pool is closing")]
    PoolClosing,

    /// Surfaced only after the locked-database retry loop is exhausted.
    #[error("database is locked")]
    EngineLocked,

    /// The engine reported a unique/foreign-key/not-null violation.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A merge under the `fail` conflict-resolution strategy hit a conflict.
    #[error("merge conflict in table {table}: {message}")]
    MergeConflict {
        /// The table in which the conflict occurred.
        table: String,
        /// A human-readable description of the conflict.
        message: String,
    },

    /// The named table is not part of the registered schema.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// The named column is not part of the given table.
    #[error("unknown column {column} in table {table}")]
    UnknownColumn {
        /// The table that was queried.
        table: String,
        /// The column name that was not found.
        column: String,
    },

    /// A value did not satisfy a column's union (enum) constraint.
    #[error("value for column {column} is not in the allowed set: {value}")]
    UnionConstraintViolation {
        /// The column whose union constraint was violated.
        column: String,
        /// A debug rendering of the offending value.
        value: String,
    },

    /// I/O failure (backup/restore file handling, config file reads).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization failure (config layer).
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wraps an engine error whose shape we don't special-case.
    #[error("unexpected database error: {0}")]
    Unexpected(String),
}

impl StoreError {
    /// Build an [`StoreError::InvalidArgument`] with a formatted message.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Build an [`StoreError::InvalidSchema`] with a formatted message.
    #[must_use]
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema(message.into())
    }

    /// Whether this error indicates a transient "try again" condition.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::EngineLocked | Self::AcquireTimeout { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        classify_sqlite_error(&err)
    }
}

/// Classify a raw `rusqlite::Error` into the crate's taxonomy.
///
/// `SQLITE_BUSY`/`SQLITE_LOCKED` become [`StoreError::EngineLocked`] (the
/// caller of this function is expected to have already exhausted retries);
/// constraint failures become [`StoreError::ConstraintViolation`]; everything
/// else becomes [`StoreError::Unexpected`] carrying the original message.
pub(crate) fn classify_sqlite_error(err: &rusqlite::Error) -> StoreError {
    if is_locked_error(err) {
        return StoreError::EngineLocked;
    }
    if let rusqlite::Error::SqliteFailure(ffi_err, message) = err {
        if matches!(
            ffi_err.code,
            rusqlite::ErrorCode::ConstraintViolation
        ) {
            return StoreError::ConstraintViolation(
                message.clone().unwrap_or_else(|| ffi_err.to_string()),
            );
        }
    }
    tracing::error!(error = %err, "unexpected database error");
    StoreError::Unexpected(err.to_string())
}

/// Whether a `rusqlite::Error` represents SQLite's "database is locked/busy" condition.
pub(crate) fn is_locked_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(ffi_err, _)
            if matches!(
                ffi_err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}
