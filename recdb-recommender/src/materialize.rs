//! Per-cell materialization.

use std::time::{SystemTime, UNIX_EPOCH};

use recdb_gateway::QueryGateway;
use recdb_plan::{InsertPlan, PlanStatement};
use recdb_result::{Error, Result};

use crate::catalog::{CellRecord, RecommenderCatalog};
use crate::ddl::{self, SENTINEL_KEY, SENTINEL_SCORE, VIEW_SCORE};
use crate::kernels::ModelKernels;
use crate::naming::ArtifactNamer;
use crate::partition::CellContext;
use crate::request::RecommenderDefinition;
use crate::strategy::ModelStrategy;

/// Builds the cells of one recommender.
///
/// Each cell's model and view tables are created and populated before its
/// index row is appended, so a failure part way through can orphan tables but
/// never leaves an index row pointing at a table that does not exist.
pub struct CellMaterializer<'a> {
    gateway: &'a dyn QueryGateway,
    kernels: &'a dyn ModelKernels,
    catalog: &'a RecommenderCatalog,
    definition: &'a RecommenderDefinition,
    strategy: &'a ModelStrategy,
    namer: ArtifactNamer,
    index_table: &'a str,
}

impl<'a> CellMaterializer<'a> {
    pub fn new(
        gateway: &'a dyn QueryGateway,
        kernels: &'a dyn ModelKernels,
        catalog: &'a RecommenderCatalog,
        definition: &'a RecommenderDefinition,
        strategy: &'a ModelStrategy,
        generation: i64,
        index_table: &'a str,
    ) -> Self {
        Self {
            gateway,
            kernels,
            catalog,
            definition,
            strategy,
            namer: ArtifactNamer::new(&definition.name, generation),
            index_table,
        }
    }

    /// Materialize the cell at position `ordinal` of the partition.
    pub fn materialize(&self, ordinal: usize, context: CellContext) -> Result<CellRecord> {
        let method = self.definition.method;
        let artifacts = self.namer.cell(method, ordinal);
        tracing::debug!(
            "materializing cell {} of '{}' context={:?} tables={:?}",
            ordinal,
            self.definition.name,
            context.pairs(),
            artifacts.tables()
        );

        for plan in ddl::model_tables(method, &artifacts.models) {
            self.gateway.execute(PlanStatement::CreateTable(plan))?;
        }
        self.gateway
            .execute(ddl::view_table(self.definition, &artifacts.view_name).into())?;
        let sentinel = InsertPlan::new(&artifacts.view_name)
            .with_columns([
                self.definition.user_key.as_str(),
                self.definition.item_key.as_str(),
                VIEW_SCORE,
            ])
            .with_row(vec![SENTINEL_KEY.into(), SENTINEL_KEY.into(), SENTINEL_SCORE.into()]);
        self.gateway.execute(sentinel.into())?;

        let processed = self.strategy.build_cell(
            self.gateway,
            self.kernels,
            self.definition,
            &artifacts.models,
            &context,
        )?;
        let rating_total = i64::try_from(processed).map_err(|_| {
            Error::model_kernel(format!(
                "rating count {processed} for '{}' is out of range",
                self.definition.name
            ))
        })?;

        let record = CellRecord::new(artifacts, context, rating_total, now_micros()?);
        self.catalog.append_cell(self.gateway, self.index_table, &record)?;
        tracing::debug!(
            "cell {} of '{}' built from {} rating(s)",
            ordinal,
            self.definition.name,
            rating_total
        );
        Ok(record)
    }
}

fn now_micros() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Internal(format!("system clock is before the Unix epoch: {e}")))?;
    i64::try_from(elapsed.as_micros())
        .map_err(|_| Error::Internal("system clock is out of timestamp range".into()))
}
