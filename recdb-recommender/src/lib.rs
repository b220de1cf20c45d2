//! Recommender materialization and teardown.
//!
//! A recommender is declared over a user table, an item table, and a rating
//! table. Creating one registers it in the shared directory, makes sure the
//! properties singleton exists, creates its index table, splits the training
//! data into cells by its context attributes, and for every cell creates and
//! populates a model table set plus a view table before recording the cell in
//! the index. Dropping one walks the index and removes everything again.
//!
//! All storage work goes through a [`recdb_gateway::QueryGateway`]; the
//! numerical model builders are supplied through [`ModelKernels`].
//!
//! ```text
//! create: validate -> directory row -> properties -> index table
//!         -> global stats -> partition -> (models, view, sentinel, build, index row)*
//! drop:   directory lookup -> enumerate cells -> (models, view)* -> index table -> directory row
//! ```
#![forbid(unsafe_code)]

pub mod catalog;
pub mod create;
pub mod ddl;
pub mod destroy;
pub mod kernels;
pub mod manager;
pub mod materialize;
pub mod method;
pub mod naming;
pub mod options;
pub mod partition;
pub mod request;
pub mod strategy;

pub use catalog::{CellRecord, RecommenderCatalog, RecommenderInfo};
pub use create::{CREATE_SAVEPOINT, CreatedRecommender, create_recommender};
pub use destroy::{DropPhase, DroppedRecommender, drop_recommender};
pub use kernels::{
    CosineStats, FactorBuild, ModelKernels, PearsonStats, SimilarityBuild, SimilarityStats,
    StatsRequest,
};
pub use manager::{RecommenderManager, RecommenderStatementResult};
pub use method::{Entity, ModelRole, RecommendationMethod, SimilarityMeasure};
pub use naming::{ArtifactNamer, CellArtifacts, ModelNames};
pub use options::{RecommenderOptions, RecommenderProperties};
pub use partition::{CellContext, partition};
pub use request::{CreateRecommenderRequest, DropRecommenderRequest, RecommenderDefinition};
pub use strategy::ModelStrategy;
