//! The drop pipeline.

use std::fmt;

use recdb_gateway::QueryGateway;
use recdb_plan::DropTablePlan;
use recdb_result::{ErrorCategory, Notice, Result};

use crate::catalog::RecommenderCatalog;
use crate::method::RecommendationMethod;
use crate::naming::CellArtifacts;
use crate::request::DropRecommenderRequest;

/// Steps of a drop, in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropPhase {
    LookupMethod,
    EnumerateCells,
    DropCellArtifacts,
    DropIndexTable,
    RemoveDirectoryRow,
    Done,
}

impl fmt::Display for DropPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DropPhase::LookupMethod => "lookup method",
            DropPhase::EnumerateCells => "enumerate cells",
            DropPhase::DropCellArtifacts => "drop cell artifacts",
            DropPhase::DropIndexTable => "drop index table",
            DropPhase::RemoveDirectoryRow => "remove directory row",
            DropPhase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub struct DroppedRecommender {
    pub name: String,
    pub method: RecommendationMethod,
    pub cells_dropped: usize,
    /// Every table dropped, index table included.
    pub tables_dropped: usize,
    pub notices: Vec<Notice>,
}

/// Drop a recommender and every physical object it owns.
///
/// No savepoint is taken. If dropping a cell's tables fails, the remaining
/// steps are skipped: cells already dropped stay dropped, and the index table
/// and directory row remain in place.
pub fn drop_recommender(
    gateway: &dyn QueryGateway,
    catalog: &RecommenderCatalog,
    request: &DropRecommenderRequest,
) -> Result<DroppedRecommender> {
    let name = request.canonical_name()?;
    tracing::info!("DROP RECOMMENDER '{}'", name);

    let mut destroyer = Destroyer {
        gateway,
        catalog,
        phase: DropPhase::LookupMethod,
    };
    destroyer.run(&name).inspect_err(|err| {
        tracing::warn!(
            "drop of recommender '{}' stopped during {}: {}",
            name,
            destroyer.phase,
            err
        );
    })
}

struct Destroyer<'a> {
    gateway: &'a dyn QueryGateway,
    catalog: &'a RecommenderCatalog,
    phase: DropPhase,
}

impl Destroyer<'_> {
    fn run(&mut self, name: &str) -> Result<DroppedRecommender> {
        self.phase = DropPhase::LookupMethod;
        let info = self.catalog.recommender_info(self.gateway, name)?;

        self.phase = DropPhase::EnumerateCells;
        // The cursor is closed before any drop is issued.
        let cells: Vec<CellArtifacts> = self
            .catalog
            .cells(self.gateway, &info)?
            .into_iter()
            .map(|cell| cell.artifacts)
            .collect();

        let mut notices = Vec::new();
        if cells.is_empty() {
            let notice = Notice::warning(
                ErrorCategory::InvalidSchemaName,
                format!("failed to find cells for recommender {}", info.name),
            );
            tracing::warn!("{}", notice);
            notices.push(notice);
        }

        self.phase = DropPhase::DropCellArtifacts;
        let mut tables_dropped = 0;
        for cell in &cells {
            for table in cell.tables() {
                self.drop_table(table)?;
                tables_dropped += 1;
            }
        }

        self.phase = DropPhase::DropIndexTable;
        self.drop_table(&info.index_table)?;
        tables_dropped += 1;

        self.phase = DropPhase::RemoveDirectoryRow;
        let removed = self.catalog.remove_directory_row(self.gateway, &info.index_table)?;
        tracing::debug!("removed {} directory row(s) for '{}'", removed, info.name);

        self.phase = DropPhase::Done;
        tracing::info!(
            "dropped recommender '{}': {} cell(s), {} table(s)",
            info.name,
            cells.len(),
            tables_dropped
        );
        Ok(DroppedRecommender {
            name: info.name,
            method: info.method,
            cells_dropped: cells.len(),
            tables_dropped,
            notices,
        })
    }

    fn drop_table(&self, table: &str) -> Result<()> {
        tracing::trace!("dropping '{}'", table);
        self.gateway.execute(DropTablePlan::new(table).into())?;
        Ok(())
    }
}
