//! The create pipeline.

use recdb_gateway::QueryGateway;
use recdb_result::Result;

use crate::catalog::{CellRecord, RecommenderCatalog};
use crate::kernels::ModelKernels;
use crate::materialize::CellMaterializer;
use crate::method::RecommendationMethod;
use crate::partition::partition;
use crate::request::{CreateRecommenderRequest, RecommenderDefinition};
use crate::strategy::ModelStrategy;

/// Savepoint that scopes a single create.
pub const CREATE_SAVEPOINT: &str = "recdb_create_recommender";

/// What a successful create produced.
#[derive(Clone, Debug)]
pub struct CreatedRecommender {
    pub name: String,
    pub method: RecommendationMethod,
    /// Directory id, also stamped into every artifact name.
    pub generation: i64,
    pub index_table: String,
    /// Whether this create also created the properties singleton.
    pub properties_created: bool,
    /// Cells in partition order.
    pub cells: Vec<CellRecord>,
}

/// Validate `request` and materialize the recommender.
///
/// Everything after validation runs inside [`CREATE_SAVEPOINT`]. On failure the
/// savepoint is rolled back, so the directory row, the properties row, the
/// index table, and any cells already built disappear together, and the
/// build error is returned. A failed release after a successful build is only
/// logged.
pub fn create_recommender(
    gateway: &dyn QueryGateway,
    kernels: &dyn ModelKernels,
    catalog: &RecommenderCatalog,
    request: &CreateRecommenderRequest,
) -> Result<CreatedRecommender> {
    let definition = request.validate(gateway, catalog)?;
    tracing::info!(
        "CREATE RECOMMENDER '{}' method={} context={:?}",
        definition.name,
        definition.method,
        definition.context_attributes
    );

    gateway.savepoint(CREATE_SAVEPOINT)?;
    match build(gateway, kernels, catalog, &definition) {
        Ok(created) => {
            // The build's changes stand whether or not the release succeeds.
            if let Err(release) = gateway.release_savepoint(CREATE_SAVEPOINT) {
                tracing::warn!(
                    "releasing savepoint for '{}' failed: {}",
                    created.name,
                    release
                );
            }
            tracing::info!(
                "created recommender '{}' with {} cell(s)",
                created.name,
                created.cells.len()
            );
            Ok(created)
        }
        Err(err) => {
            tracing::warn!(
                "create of recommender '{}' failed, rolling back: {}",
                definition.name,
                err
            );
            if let Err(rollback) = gateway.rollback_to_savepoint(CREATE_SAVEPOINT) {
                tracing::error!(
                    "rollback of recommender '{}' failed: {}",
                    definition.name,
                    rollback
                );
            } else if let Err(release) = gateway.release_savepoint(CREATE_SAVEPOINT) {
                tracing::error!(
                    "releasing savepoint for '{}' failed: {}",
                    definition.name,
                    release
                );
            }
            Err(err)
        }
    }
}

fn build(
    gateway: &dyn QueryGateway,
    kernels: &dyn ModelKernels,
    catalog: &RecommenderCatalog,
    definition: &RecommenderDefinition,
) -> Result<CreatedRecommender> {
    let generation = catalog.register(gateway, definition)?;
    let properties_created = catalog.ensure_properties(gateway)?;
    let index_table = catalog.create_index_table(gateway, definition)?;

    let strategy = ModelStrategy::prepare(gateway, kernels, definition)?;
    let contexts = partition(gateway, definition)?;

    let materializer = CellMaterializer::new(
        gateway,
        kernels,
        catalog,
        definition,
        &strategy,
        generation,
        &index_table,
    );
    let cells = contexts
        .into_iter()
        .enumerate()
        .map(|(ordinal, context)| materializer.materialize(ordinal, context))
        .collect::<Result<Vec<_>>>()?;

    Ok(CreatedRecommender {
        name: definition.name.clone(),
        method: definition.method,
        generation,
        index_table,
        properties_created,
        cells,
    })
}
