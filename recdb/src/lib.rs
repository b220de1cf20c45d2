//! recdb: in-database recommender lifecycle management.
//!
//! This crate is the entry point a command dispatcher calls into. It re-exports
//! the recommender core from `recdb-recommender`, the gateway boundary from
//! `recdb-gateway`, and the error types from `recdb-result`, and adds the
//! command-level concerns around them: read-only gating, statement logging, and
//! completion tags.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use recdb::{
//!     CosineStats, FactorBuild, MemGateway, ModelKernels, PearsonStats, QueryGateway,
//!     RecommenderCommand, RecommenderManager, SessionState, SimilarityBuild, StatsRequest,
//!     process_recommender_command,
//! };
//!
//! struct NoKernels;
//!
//! impl ModelKernels for NoKernels {
//!     fn cosine_stats(
//!         &self,
//!         _: &dyn QueryGateway,
//!         _: StatsRequest<'_>,
//!     ) -> recdb::Result<CosineStats> {
//!         Ok(CosineStats::default())
//!     }
//!     fn pearson_stats(
//!         &self,
//!         _: &dyn QueryGateway,
//!         _: StatsRequest<'_>,
//!     ) -> recdb::Result<PearsonStats> {
//!         Ok(PearsonStats::default())
//!     }
//!     fn build_similarity_model(
//!         &self,
//!         _: &dyn QueryGateway,
//!         _: SimilarityBuild<'_>,
//!     ) -> recdb::Result<u64> {
//!         Ok(0)
//!     }
//!     fn build_factor_model(
//!         &self,
//!         _: &dyn QueryGateway,
//!         _: FactorBuild<'_>,
//!     ) -> recdb::Result<u64> {
//!         Ok(0)
//!     }
//! }
//!
//! let manager = RecommenderManager::new(Arc::new(MemGateway::new()), Arc::new(NoKernels));
//! let mut tag = String::new();
//! let err = process_recommender_command(
//!     &manager,
//!     &SessionState::default(),
//!     &RecommenderCommand::drop("movies"),
//!     &mut tag,
//! )
//! .unwrap_err();
//! assert_eq!(err.to_string(), "no recommenders have been created");
//! assert!(tag.is_empty());
//! ```
#![forbid(unsafe_code)]

use std::fmt;

pub use recdb_gateway::{MemGateway, QueryGateway, Row, RowCursor, StatementResult};
pub use recdb_plan::{ColumnFilter, PlanValue, SelectPlan};
pub use recdb_recommender::{
    CellArtifacts, CellContext, CellRecord, CosineStats, CreateRecommenderRequest,
    CreatedRecommender, DropRecommenderRequest, FactorBuild, ModelKernels, ModelNames,
    PearsonStats, RecommendationMethod, RecommenderInfo, RecommenderManager, RecommenderOptions,
    RecommenderProperties, RecommenderStatementResult, SimilarityBuild, SimilarityStats,
    StatsRequest,
};
pub use recdb_result::{Error, ErrorCategory, Notice, NoticeLevel, Result};

/// Which statements a session writes to the statement log.
///
/// Levels are cumulative: `Mod` also logs DDL, `All` logs everything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatementLogLevel {
    #[default]
    None,
    Ddl,
    Mod,
    All,
}

/// Transaction-level state the dispatcher hands to every command.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionState {
    pub read_only: bool,
    pub log_statement: StatementLogLevel,
}

impl SessionState {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn with_log_statement(mut self, level: StatementLogLevel) -> Self {
        self.log_statement = level;
        self
    }
}

/// A parsed recommender command.
#[derive(Clone, Debug)]
pub enum RecommenderCommand {
    Create(CreateRecommenderRequest),
    Drop(DropRecommenderRequest),
}

impl RecommenderCommand {
    pub fn create(request: CreateRecommenderRequest) -> Self {
        RecommenderCommand::Create(request)
    }

    pub fn drop(name: impl Into<String>) -> Self {
        RecommenderCommand::Drop(DropRecommenderRequest::new(name))
    }

    /// Completion tag written on success.
    pub fn command_tag(&self) -> &'static str {
        match self {
            RecommenderCommand::Create(_) => "CREATE RECOMMENDER",
            RecommenderCommand::Drop(_) => "DROP RECOMMENDER",
        }
    }

    /// Both commands change the schema.
    pub fn log_level(&self) -> StatementLogLevel {
        StatementLogLevel::Ddl
    }
}

impl fmt::Display for RecommenderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommenderCommand::Create(request) => {
                write!(
                    f,
                    "CREATE RECOMMENDER {} USERS FROM {} KEY {} ITEMS FROM {} KEY {} RATINGS FROM {} VALUE {}",
                    request.name,
                    request.user_table,
                    request.user_key,
                    request.item_table,
                    request.item_key,
                    request.rating_table,
                    request.rating_value
                )?;
                if !request.context_attributes.is_empty() {
                    write!(f, " CONTEXT {}", request.context_attributes.join(", "))?;
                }
                write!(f, " USING {}", request.method)
            }
            RecommenderCommand::Drop(request) => write!(f, "DROP RECOMMENDER {}", request.name),
        }
    }
}

/// Run one recommender command inside the caller's session.
///
/// The read-only check happens before any catalog access. On success the
/// command's tag is written to `completion_tag`; on failure it is left as is.
pub fn process_recommender_command<G, K>(
    manager: &RecommenderManager<G, K>,
    session: &SessionState,
    command: &RecommenderCommand,
    completion_tag: &mut String,
) -> Result<RecommenderStatementResult>
where
    G: QueryGateway,
    K: ModelKernels,
{
    let tag = command.command_tag();
    if session.read_only {
        return Err(Error::ReadOnlyTransaction(tag.to_string()));
    }
    if session.log_statement >= command.log_level() {
        tracing::info!("statement: {}", command);
    }

    let result = match command {
        RecommenderCommand::Create(request) => manager.create_recommender(request)?,
        RecommenderCommand::Drop(request) => manager.drop_recommender(request)?,
    };
    for notice in result.notices() {
        tracing::debug!("{} reported {}", tag, notice);
    }

    completion_tag.clear();
    completion_tag.push_str(result.command_tag());
    Ok(result)
}
