//! Query gateway boundary for recdb.
//!
//! The recommender core does not parse or plan SQL. It hands typed plans from
//! `recdb-plan` to a [`QueryGateway`], which executes them for effect, opens
//! iterator-style query sessions ([`RowCursor`]), answers table-existence
//! questions, and scopes work in savepoints.
//!
//! [`MemGateway`] is a complete in-memory implementation backed by Arrow record
//! batches. It is what the tests run against, and it is usable for embedding
//! when no external engine is present.

pub mod cursor;
mod data_conversion;
pub mod mem_gateway;
pub mod row;
pub mod statement_result;

pub use cursor::{BatchCursor, RowCursor};
pub use mem_gateway::MemGateway;
pub use row::Row;
pub use statement_result::StatementResult;

use recdb_plan::{PlanStatement, SelectPlan};
use recdb_result::{Error, Result};

/// Service boundary to the relational engine.
///
/// All calls are synchronous and either return or raise. Implementations
/// provide their own isolation; callers add no locking of their own.
pub trait QueryGateway: Send + Sync {
    /// Execute a DDL or DML statement for effect.
    fn execute(&self, statement: PlanStatement) -> Result<StatementResult>;

    /// Start a query session over `plan`.
    ///
    /// The session ends when the returned cursor is dropped.
    fn open_cursor<'a>(&'a self, plan: &SelectPlan) -> Result<Box<dyn RowCursor + 'a>>;

    fn table_exists(&self, name: &str) -> Result<bool>;

    fn savepoint(&self, name: &str) -> Result<()>;

    /// Undo everything done since `name` was established. The savepoint stays
    /// defined afterwards.
    fn rollback_to_savepoint(&self, name: &str) -> Result<()>;

    fn release_savepoint(&self, name: &str) -> Result<()>;
}

/// Split an identifier into its display form and its lower-cased canonical form.
pub fn canonical_identifier(name: &str) -> Result<(String, String)> {
    if name.is_empty() {
        return Err(Error::InvalidArgumentError(
            "identifier must not be empty".into(),
        ));
    }
    let display = name.to_string();
    let canonical = display.to_ascii_lowercase();
    Ok((display, canonical))
}
