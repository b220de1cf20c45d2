//! Entry points used by the command dispatcher.

use std::sync::Arc;

use recdb_gateway::QueryGateway;
use recdb_result::{Notice, Result};

use crate::catalog::{CellRecord, RecommenderCatalog, RecommenderInfo};
use crate::create::{CreatedRecommender, create_recommender};
use crate::destroy::{DroppedRecommender, drop_recommender};
use crate::kernels::ModelKernels;
use crate::method::RecommendationMethod;
use crate::options::{RecommenderOptions, RecommenderProperties};
use crate::request::{CreateRecommenderRequest, DropRecommenderRequest};

/// Outcome of a recommender command.
#[derive(Clone, Debug)]
pub enum RecommenderStatementResult {
    CreateRecommender {
        recommender: String,
        method: RecommendationMethod,
        cells: usize,
    },
    DropRecommender {
        recommender: String,
        cells_dropped: usize,
        tables_dropped: usize,
        notices: Vec<Notice>,
    },
}

impl RecommenderStatementResult {
    pub fn command_tag(&self) -> &'static str {
        match self {
            RecommenderStatementResult::CreateRecommender { .. } => "CREATE RECOMMENDER",
            RecommenderStatementResult::DropRecommender { .. } => "DROP RECOMMENDER",
        }
    }

    pub fn notices(&self) -> &[Notice] {
        match self {
            RecommenderStatementResult::CreateRecommender { .. } => &[],
            RecommenderStatementResult::DropRecommender { notices, .. } => notices,
        }
    }

    /// Short human-readable status line.
    pub fn status(&self) -> String {
        match self {
            RecommenderStatementResult::CreateRecommender {
                recommender,
                method,
                cells,
            } => format!("created recommender {recommender} ({method}, {cells} cell(s))"),
            RecommenderStatementResult::DropRecommender {
                recommender,
                cells_dropped,
                tables_dropped,
                ..
            } => format!(
                "dropped recommender {recommender} ({cells_dropped} cell(s), {tables_dropped} table(s))"
            ),
        }
    }
}

impl From<&CreatedRecommender> for RecommenderStatementResult {
    fn from(created: &CreatedRecommender) -> Self {
        RecommenderStatementResult::CreateRecommender {
            recommender: created.name.clone(),
            method: created.method,
            cells: created.cells.len(),
        }
    }
}

impl From<DroppedRecommender> for RecommenderStatementResult {
    fn from(dropped: DroppedRecommender) -> Self {
        RecommenderStatementResult::DropRecommender {
            recommender: dropped.name,
            cells_dropped: dropped.cells_dropped,
            tables_dropped: dropped.tables_dropped,
            notices: dropped.notices,
        }
    }
}

/// Recommender lifecycle over a shared gateway and kernel set.
pub struct RecommenderManager<G, K>
where
    G: QueryGateway,
    K: ModelKernels,
{
    gateway: Arc<G>,
    kernels: Arc<K>,
    catalog: RecommenderCatalog,
}

impl<G, K> RecommenderManager<G, K>
where
    G: QueryGateway,
    K: ModelKernels,
{
    pub fn new(gateway: Arc<G>, kernels: Arc<K>) -> Self {
        Self::with_options(gateway, kernels, RecommenderOptions::default())
    }

    pub fn with_options(gateway: Arc<G>, kernels: Arc<K>, options: RecommenderOptions) -> Self {
        Self {
            gateway,
            kernels,
            catalog: RecommenderCatalog::new(options),
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn kernels(&self) -> &Arc<K> {
        &self.kernels
    }

    pub fn catalog(&self) -> &RecommenderCatalog {
        &self.catalog
    }

    fn gw(&self) -> &dyn QueryGateway {
        &*self.gateway
    }

    /// Full create, returning every materialized cell.
    pub fn create(&self, request: &CreateRecommenderRequest) -> Result<CreatedRecommender> {
        create_recommender(self.gw(), &*self.kernels, &self.catalog, request)
    }

    pub fn create_recommender(
        &self,
        request: &CreateRecommenderRequest,
    ) -> Result<RecommenderStatementResult> {
        self.create(request).map(|created| (&created).into())
    }

    pub fn drop_recommender(
        &self,
        request: &DropRecommenderRequest,
    ) -> Result<RecommenderStatementResult> {
        drop_recommender(self.gw(), &self.catalog, request).map(Into::into)
    }

    pub fn recommender_exists(&self, name: &str) -> Result<bool> {
        self.catalog.recommender_exists(self.gw(), name)
    }

    pub fn recommender_info(&self, name: &str) -> Result<RecommenderInfo> {
        self.catalog.recommender_info(self.gw(), name)
    }

    pub fn list_recommenders(&self) -> Result<Vec<RecommenderInfo>> {
        self.catalog.list_recommenders(self.gw())
    }

    /// Index rows of `name`, in index-table order.
    pub fn cells(&self, name: &str) -> Result<Vec<CellRecord>> {
        let info = self.catalog.recommender_info(self.gw(), name)?;
        self.catalog.cells(self.gw(), &info)
    }

    pub fn load_properties(&self) -> Result<Option<RecommenderProperties>> {
        self.catalog.load_properties(self.gw())
    }
}
