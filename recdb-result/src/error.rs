use std::fmt;
use thiserror::Error;

/// Unified error type for all recdb operations.
///
/// Every failure mode across the workspace, from gateway-level DDL failures to
/// recommender catalog inconsistencies, is expressed as one of these variants.
/// Errors propagate upward with `?`; at the command boundary they are reported
/// to the caller together with their [`ErrorCategory`].
///
/// # Error Handling Strategy
///
/// Callers that need to react to a specific failure match on the variant.
/// Callers that only need to report the failure use [`Error::category`] for a
/// stable symbolic code and `Display` for the human-readable message.
#[derive(Error, Debug)]
pub enum Error {
    /// Arrow error while materialising or reading columnar row data.
    ///
    /// Raised when a cursor snapshot cannot be assembled into a `RecordBatch`
    /// or when a cell value cannot be rendered as text.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Invalid user input or API parameter.
    ///
    /// Covers malformed identifiers, unknown columns in a projection, empty
    /// column lists, and values whose type does not match the target column.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Catalog metadata error.
    ///
    /// Raised for table-level catalog problems: creating a table that already
    /// exists, dropping or reading a table that does not, or a recommender
    /// directory row that does not describe its index table.
    #[error("{0}")]
    CatalogError(String),

    /// Data constraint violation.
    ///
    /// NOT NULL and PRIMARY KEY violations detected while inserting rows.
    #[error("Constraint Error: {0}")]
    ConstraintError(String),

    /// Transaction or savepoint error.
    ///
    /// Raised for unknown savepoints and for attempts to modify a table while a
    /// cursor over it is still open.
    #[error("{0}")]
    TransactionContextError(String),

    /// Internal error indicating a bug or unexpected state.
    #[error("An internal operation failed: {0}")]
    Internal(String),

    /// The named recommender is not registered in the directory.
    #[error("recommender {0} does not exist")]
    RecommenderNotFound(String),

    /// The recommender directory itself has never been created.
    #[error("no recommenders have been created")]
    NoRecommenders,

    /// A recommender with this name is already registered.
    #[error("recommender {0} already exists")]
    RecommenderExists(String),

    /// The method token does not name a known recommendation method.
    #[error("recommendation method {0} not recognized")]
    UnknownMethod(String),

    /// The command would modify state inside a read-only transaction.
    #[error("cannot execute {0} in a read-only transaction")]
    ReadOnlyTransaction(String),

    /// A model-building kernel reported a failure.
    #[error("model kernel error: {0}")]
    ModelKernel(String),
}

/// Stable symbolic category attached to every [`Error`].
///
/// The names follow SQLSTATE condition names so that they stay meaningful to
/// operators already familiar with relational error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InvalidParameterValue,
    InvalidSchemaName,
    UndefinedTable,
    DuplicateTable,
    DuplicateObject,
    IntegrityConstraintViolation,
    InvalidTransactionState,
    ReadOnlySqlTransaction,
    CaseNotFound,
    DataException,
    ExternalRoutineException,
    InternalError,
}

impl ErrorCategory {
    /// Stable lower-case identifier for this category.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::InvalidParameterValue => "invalid_parameter_value",
            ErrorCategory::InvalidSchemaName => "invalid_schema_name",
            ErrorCategory::UndefinedTable => "undefined_table",
            ErrorCategory::DuplicateTable => "duplicate_table",
            ErrorCategory::DuplicateObject => "duplicate_object",
            ErrorCategory::IntegrityConstraintViolation => "integrity_constraint_violation",
            ErrorCategory::InvalidTransactionState => "invalid_transaction_state",
            ErrorCategory::ReadOnlySqlTransaction => "read_only_sql_transaction",
            ErrorCategory::CaseNotFound => "case_not_found",
            ErrorCategory::DataException => "data_exception",
            ErrorCategory::ExternalRoutineException => "external_routine_exception",
            ErrorCategory::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Symbolic category of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use recdb_result::{Error, ErrorCategory};
    ///
    /// let err = Error::RecommenderNotFound("movies".into());
    /// assert_eq!(err.category(), ErrorCategory::InvalidSchemaName);
    /// assert_eq!(err.category().as_str(), "invalid_schema_name");
    /// ```
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Arrow(_) => ErrorCategory::DataException,
            Error::InvalidArgumentError(_) => ErrorCategory::InvalidParameterValue,
            Error::CatalogError(message) => {
                if message.contains("already exists") {
                    ErrorCategory::DuplicateTable
                } else {
                    ErrorCategory::UndefinedTable
                }
            }
            Error::ConstraintError(_) => ErrorCategory::IntegrityConstraintViolation,
            Error::TransactionContextError(_) => ErrorCategory::InvalidTransactionState,
            Error::Internal(_) => ErrorCategory::InternalError,
            Error::RecommenderNotFound(_) | Error::NoRecommenders => {
                ErrorCategory::InvalidSchemaName
            }
            Error::RecommenderExists(_) => ErrorCategory::DuplicateObject,
            Error::UnknownMethod(_) => ErrorCategory::CaseNotFound,
            Error::ReadOnlyTransaction(_) => ErrorCategory::ReadOnlySqlTransaction,
            Error::ModelKernel(_) => ErrorCategory::ExternalRoutineException,
        }
    }

    /// Create a model kernel error from any displayable error.
    ///
    /// Kernel implementations live outside this workspace and may carry their
    /// own error types; this keeps their message while folding them into
    /// [`Error::ModelKernel`].
    ///
    /// # Examples
    ///
    /// ```
    /// use recdb_result::Error;
    ///
    /// let err = Error::model_kernel("rating column is not numeric");
    /// assert!(matches!(err, Error::ModelKernel(msg) if msg.contains("numeric")));
    /// ```
    #[inline]
    pub fn model_kernel<E: fmt::Display>(err: E) -> Self {
        Error::ModelKernel(err.to_string())
    }
}
