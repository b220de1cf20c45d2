//! Call contract for the numerical model builders.
//!
//! The kernels themselves live outside this crate. They are handed the gateway
//! so they can read ratings and write rows into the model tables created for
//! them.

use recdb_gateway::QueryGateway;
use recdb_result::Result;

use crate::method::Entity;
use crate::partition::CellContext;
use crate::request::RecommenderDefinition;

/// Whole-rating-set statistics computed once per recommender.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CosineStats {
    pub entity_ids: Vec<i64>,
    pub vector_lengths: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PearsonStats {
    pub entity_ids: Vec<i64>,
    pub averages: Vec<f64>,
    pub pearson_constants: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SimilarityStats {
    Cosine(CosineStats),
    Pearson(PearsonStats),
}

impl SimilarityStats {
    pub fn entity_count(&self) -> usize {
        match self {
            SimilarityStats::Cosine(stats) => stats.entity_ids.len(),
            SimilarityStats::Pearson(stats) => stats.entity_ids.len(),
        }
    }
}

/// Inputs to a global statistics precomputation.
#[derive(Clone, Copy, Debug)]
pub struct StatsRequest<'a> {
    pub entity: Entity,
    pub entity_table: &'a str,
    pub entity_key: &'a str,
    pub rating_table: &'a str,
    pub rating_value: &'a str,
}

impl<'a> StatsRequest<'a> {
    pub fn for_entity(definition: &'a RecommenderDefinition, entity: Entity) -> Self {
        let (entity_table, entity_key) = match entity {
            Entity::User => (definition.user_table.as_str(), definition.user_key.as_str()),
            Entity::Item => (definition.item_table.as_str(), definition.item_key.as_str()),
        };
        Self {
            entity,
            entity_table,
            entity_key,
            rating_table: &definition.rating_table,
            rating_value: &definition.rating_value,
        }
    }
}

/// One similarity-model build for one cell.
#[derive(Clone, Copy, Debug)]
pub struct SimilarityBuild<'a> {
    pub definition: &'a RecommenderDefinition,
    pub entity: Entity,
    pub model_table: &'a str,
    pub context: &'a CellContext,
    pub stats: &'a SimilarityStats,
}

/// One factorization build for one cell.
#[derive(Clone, Copy, Debug)]
pub struct FactorBuild<'a> {
    pub definition: &'a RecommenderDefinition,
    pub user_model_table: &'a str,
    pub item_model_table: &'a str,
    pub context: &'a CellContext,
}

/// Numerical model builders.
///
/// Build calls return the number of ratings incorporated into the model,
/// restricted to the ratings matching the cell's context.
pub trait ModelKernels: Send + Sync {
    fn cosine_stats(
        &self,
        gateway: &dyn QueryGateway,
        request: StatsRequest<'_>,
    ) -> Result<CosineStats>;

    fn pearson_stats(
        &self,
        gateway: &dyn QueryGateway,
        request: StatsRequest<'_>,
    ) -> Result<PearsonStats>;

    fn build_similarity_model(
        &self,
        gateway: &dyn QueryGateway,
        build: SimilarityBuild<'_>,
    ) -> Result<u64>;

    fn build_factor_model(&self, gateway: &dyn QueryGateway, build: FactorBuild<'_>) -> Result<u64>;
}
