//! Strategy dispatch.
//!
//! The method is resolved once per recommender into a [`ModelStrategy`], which
//! carries whatever global statistics the method needs. Cells are then built
//! through it without the partitioner or materializer knowing the method.

use recdb_gateway::QueryGateway;
use recdb_result::{Error, Result};

use crate::kernels::{
    FactorBuild, ModelKernels, SimilarityBuild, SimilarityStats, StatsRequest,
};
use crate::method::{Entity, SimilarityMeasure};
use crate::naming::ModelNames;
use crate::partition::CellContext;
use crate::request::RecommenderDefinition;

#[derive(Clone, Debug)]
pub enum ModelStrategy {
    Similarity {
        entity: Entity,
        stats: SimilarityStats,
    },
    Factorization,
}

impl ModelStrategy {
    /// Resolve the strategy and run its global precomputation over the whole
    /// rating table.
    pub fn prepare(
        gateway: &dyn QueryGateway,
        kernels: &dyn ModelKernels,
        definition: &RecommenderDefinition,
    ) -> Result<Self> {
        let Some((entity, measure)) = definition.method.similarity() else {
            return Ok(ModelStrategy::Factorization);
        };
        let request = StatsRequest::for_entity(definition, entity);
        let stats = match measure {
            SimilarityMeasure::Cosine => {
                SimilarityStats::Cosine(kernels.cosine_stats(gateway, request)?)
            }
            SimilarityMeasure::Pearson => {
                SimilarityStats::Pearson(kernels.pearson_stats(gateway, request)?)
            }
        };
        tracing::debug!(
            "precomputed {:?} statistics for {} {:?} entities of '{}'",
            measure,
            stats.entity_count(),
            entity,
            definition.name
        );
        Ok(ModelStrategy::Similarity { entity, stats })
    }

    /// Populate the model table(s) of one cell; returns ratings processed.
    pub fn build_cell(
        &self,
        gateway: &dyn QueryGateway,
        kernels: &dyn ModelKernels,
        definition: &RecommenderDefinition,
        models: &ModelNames,
        context: &CellContext,
    ) -> Result<u64> {
        match (self, models) {
            (ModelStrategy::Similarity { entity, stats }, ModelNames::Similarity(model_table)) => {
                kernels.build_similarity_model(
                    gateway,
                    SimilarityBuild {
                        definition,
                        entity: *entity,
                        model_table,
                        context,
                        stats,
                    },
                )
            }
            (ModelStrategy::Factorization, ModelNames::Factors { user, item }) => kernels
                .build_factor_model(
                    gateway,
                    FactorBuild {
                        definition,
                        user_model_table: user,
                        item_model_table: item,
                        context,
                    },
                ),
            (strategy, models) => Err(Error::Internal(format!(
                "model tables {:?} do not fit strategy {:?} of recommender '{}'",
                models.tables(),
                strategy.kind(),
                definition.name
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ModelStrategy::Similarity { .. } => "similarity",
            ModelStrategy::Factorization => "factorization",
        }
    }
}
