//! Recommender catalog: the shared directory, the properties singleton, and
//! per-recommender index tables.

use recdb_gateway::{QueryGateway, Row, StatementResult};
use recdb_plan::{ColumnFilter, DeletePlan, InsertPlan, PlanStatement, PlanValue, SelectPlan};
use recdb_result::{Error, Result};

use crate::ddl::{self, directory, index, properties};
use crate::method::{ModelRole, RecommendationMethod};
use crate::naming::{CellArtifacts, ModelNames};
use crate::options::{RecommenderOptions, RecommenderProperties};
use crate::partition::CellContext;
use crate::request::RecommenderDefinition;

/// A recommender as recorded in the directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommenderInfo {
    /// Serial directory id; also the generation stamped into artifact names.
    pub id: i64,
    pub name: String,
    pub index_table: String,
    pub user_table: String,
    pub item_table: String,
    pub rating_table: String,
    pub user_key: String,
    pub item_key: String,
    pub rating_value: String,
    pub method: RecommendationMethod,
    pub context_attribute_count: usize,
}

/// One index-table row.
#[derive(Clone, Debug, PartialEq)]
pub struct CellRecord {
    /// Assigned by the index table's serial column; `None` until stored.
    pub system_id: Option<i64>,
    pub artifacts: CellArtifacts,
    pub update_counter: i64,
    pub rating_total: i64,
    pub query_counter: i64,
    pub update_rate: f64,
    pub query_rate: f64,
    pub created_at_micros: i64,
    pub context: CellContext,
}

impl CellRecord {
    /// A freshly built cell: counters and rates start at zero.
    pub fn new(
        artifacts: CellArtifacts,
        context: CellContext,
        rating_total: i64,
        created_at_micros: i64,
    ) -> Self {
        Self {
            system_id: None,
            artifacts,
            update_counter: 0,
            rating_total,
            query_counter: 0,
            update_rate: 0.0,
            query_rate: 0.0,
            created_at_micros,
            context,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecommenderCatalog {
    options: RecommenderOptions,
}

impl RecommenderCatalog {
    pub fn new(options: RecommenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RecommenderOptions {
        &self.options
    }

    pub fn index_table_name(&self, name: &str) -> String {
        self.options.index_table_name(name)
    }

    pub fn directory_exists(&self, gateway: &dyn QueryGateway) -> Result<bool> {
        gateway.table_exists(&self.options.directory_table)
    }

    /// Create the directory if it is missing.
    pub fn ensure_directory(&self, gateway: &dyn QueryGateway) -> Result<()> {
        let result = gateway.execute(ddl::directory_table(&self.options).into())?;
        if matches!(result, StatementResult::CreateTable { .. }) {
            tracing::info!(
                "created recommender directory '{}'",
                self.options.directory_table
            );
        }
        Ok(())
    }

    /// Insert the directory row for `definition` and return its serial id.
    ///
    /// The row is visible to subsequent lookups as soon as this returns.
    pub fn register(
        &self,
        gateway: &dyn QueryGateway,
        definition: &RecommenderDefinition,
    ) -> Result<i64> {
        self.ensure_directory(gateway)?;
        let insert = InsertPlan::new(&self.options.directory_table)
            .with_columns(ddl::DIRECTORY_INSERT_COLUMNS)
            .with_row(ddl::directory_row(&self.options, definition));
        gateway.execute(insert.into())?;

        let info = self.recommender_info(gateway, &definition.name)?;
        tracing::debug!(
            "registered recommender '{}' with directory id {}",
            definition.name,
            info.id
        );
        Ok(info.id)
    }

    /// Whether `name` is registered. A missing directory means no.
    pub fn recommender_exists(&self, gateway: &dyn QueryGateway, name: &str) -> Result<bool> {
        if !self.directory_exists(gateway)? {
            return Ok(false);
        }
        Ok(self.find_directory_row(gateway, name)?.is_some())
    }

    /// Directory entry for `name`.
    ///
    /// Fails with [`Error::NoRecommenders`] when the directory was never
    /// created and [`Error::RecommenderNotFound`] when `name` is absent.
    pub fn recommender_info(
        &self,
        gateway: &dyn QueryGateway,
        name: &str,
    ) -> Result<RecommenderInfo> {
        if !self.directory_exists(gateway)? {
            return Err(Error::NoRecommenders);
        }
        self.find_directory_row(gateway, name)?
            .ok_or_else(|| Error::RecommenderNotFound(name.to_ascii_lowercase()))
    }

    /// Every registered recommender, in directory order.
    pub fn list_recommenders(&self, gateway: &dyn QueryGateway) -> Result<Vec<RecommenderInfo>> {
        if !self.directory_exists(gateway)? {
            return Ok(Vec::new());
        }
        let mut cursor = gateway.open_cursor(&SelectPlan::new(&self.options.directory_table))?;
        let mut out = Vec::new();
        while let Some(row) = cursor.next_row()? {
            out.push(self.info_from_row(&row)?);
        }
        Ok(out)
    }

    fn find_directory_row(
        &self,
        gateway: &dyn QueryGateway,
        name: &str,
    ) -> Result<Option<RecommenderInfo>> {
        let plan = SelectPlan::new(&self.options.directory_table).with_filter(ColumnFilter::eq(
            directory::INDEX_NAME,
            self.index_table_name(name),
        ));
        let mut cursor = gateway.open_cursor(&plan)?;
        match cursor.next_row()? {
            Some(row) => Ok(Some(self.info_from_row(&row)?)),
            None => Ok(None),
        }
    }

    fn info_from_row(&self, row: &Row) -> Result<RecommenderInfo> {
        let index_table = row.string_value(directory::INDEX_NAME)?;
        let suffix = self.options.index_suffix.to_ascii_lowercase();
        let name = index_table
            .strip_suffix(suffix.as_str())
            .ok_or_else(|| {
                Error::CatalogError(format!(
                    "Catalog Error: directory entry '{index_table}' does not name an index table"
                ))
            })?
            .to_string();
        let context_attribute_count = usize::try_from(row.i64_value(directory::CONTEXT_ATTRIBUTES)?)
            .map_err(|_| {
                Error::CatalogError(format!(
                    "Catalog Error: negative context attribute count for recommender '{name}'"
                ))
            })?;
        Ok(RecommenderInfo {
            id: row.i64_value(directory::ID)?,
            index_table,
            user_table: row.string_value(directory::USER_TABLE)?,
            item_table: row.string_value(directory::ITEM_TABLE)?,
            rating_table: row.string_value(directory::RATING_TABLE)?,
            user_key: row.string_value(directory::USER_KEY)?,
            item_key: row.string_value(directory::ITEM_KEY)?,
            rating_value: row.string_value(directory::RATING_VALUE)?,
            method: row.string_value(directory::METHOD)?.parse()?,
            context_attribute_count,
            name,
        })
    }

    /// Delete the directory row that points at `index_table`.
    pub fn remove_directory_row(
        &self,
        gateway: &dyn QueryGateway,
        index_table: &str,
    ) -> Result<usize> {
        let delete = DeletePlan::new(&self.options.directory_table)
            .with_filter(ColumnFilter::eq(directory::INDEX_NAME, index_table));
        Ok(gateway.execute(delete.into())?.rows_affected())
    }

    /// Create the properties singleton with its default row if it is missing.
    ///
    /// Returns whether the table was created by this call. An existing table is
    /// left untouched.
    pub fn ensure_properties(&self, gateway: &dyn QueryGateway) -> Result<bool> {
        if gateway.table_exists(&self.options.properties_table)? {
            return Ok(false);
        }
        gateway.execute(ddl::properties_table(&self.options).into())?;
        let defaults = &self.options.default_properties;
        let insert = InsertPlan::new(&self.options.properties_table)
            .with_columns([
                properties::UPDATE_THRESHOLD,
                properties::TAIL_LENGTH,
                properties::VERBOSE_QUERIES,
            ])
            .with_row(vec![
                defaults.update_threshold.into(),
                defaults.tail_length.into(),
                defaults.verbose_queries.into(),
            ]);
        gateway.execute(insert.into())?;
        tracing::info!(
            "created recommender properties '{}' with defaults {:?}",
            self.options.properties_table,
            defaults
        );
        Ok(true)
    }

    /// The properties row, or `None` before any recommender was created.
    pub fn load_properties(
        &self,
        gateway: &dyn QueryGateway,
    ) -> Result<Option<RecommenderProperties>> {
        if !gateway.table_exists(&self.options.properties_table)? {
            return Ok(None);
        }
        let mut cursor = gateway.open_cursor(&SelectPlan::new(&self.options.properties_table))?;
        let Some(row) = cursor.next_row()? else {
            return Ok(None);
        };
        Ok(Some(RecommenderProperties {
            update_threshold: row.f64_value(properties::UPDATE_THRESHOLD)?,
            tail_length: row.i64_value(properties::TAIL_LENGTH)?,
            verbose_queries: row.bool_value(properties::VERBOSE_QUERIES)?,
        }))
    }

    pub fn create_index_table(
        &self,
        gateway: &dyn QueryGateway,
        definition: &RecommenderDefinition,
    ) -> Result<String> {
        let plan = ddl::index_table(&self.options, definition);
        let name = plan.name.clone();
        gateway.execute(PlanStatement::CreateTable(plan))?;
        tracing::debug!("created index table '{}' for '{}'", name, definition.name);
        Ok(name)
    }

    /// Append one cell row to `index_table`.
    ///
    /// Context values go into the trailing columns named after their attributes.
    pub fn append_cell(
        &self,
        gateway: &dyn QueryGateway,
        index_table: &str,
        cell: &CellRecord,
    ) -> Result<()> {
        let mut columns: Vec<&str> = Vec::new();
        let mut values: Vec<PlanValue> = Vec::new();
        for (role, table) in cell.artifacts.models.by_role() {
            columns.push(role.index_column());
            values.push(table.into());
        }
        columns.extend([
            index::VIEW_NAME,
            index::UPDATE_COUNTER,
            index::RATING_TOTAL,
            index::QUERY_COUNTER,
            index::UPDATE_RATE,
            index::QUERY_RATE,
            index::CREATED_AT,
        ]);
        values.extend([
            PlanValue::from(&cell.artifacts.view_name),
            cell.update_counter.into(),
            cell.rating_total.into(),
            cell.query_counter.into(),
            cell.update_rate.into(),
            cell.query_rate.into(),
            PlanValue::Timestamp(cell.created_at_micros),
        ]);
        for (attribute, value) in cell.context.pairs() {
            columns.push(attribute.as_str());
            values.push(value.into());
        }

        let insert = InsertPlan::new(index_table)
            .with_columns(columns)
            .with_row(values);
        gateway.execute(insert.into())?;
        Ok(())
    }

    /// Read every cell of `info`'s index table.
    ///
    /// The scan completes and its cursor is closed before this returns, so the
    /// caller may drop the listed tables right away.
    pub fn cells(
        &self,
        gateway: &dyn QueryGateway,
        info: &RecommenderInfo,
    ) -> Result<Vec<CellRecord>> {
        let mut cursor = gateway.open_cursor(&SelectPlan::new(&info.index_table))?;
        let schema = cursor.schema();
        let fixed = ddl::index_fixed_columns(info.method);
        let context_columns: Vec<String> = schema
            .fields()
            .iter()
            .skip(fixed)
            .map(|field| field.name().clone())
            .collect();

        let mut cells = Vec::new();
        while let Some(row) = cursor.next_row()? {
            let models = if info.method.is_factorization() {
                ModelNames::Factors {
                    user: row.string_value(ModelRole::UserFactors.index_column())?,
                    item: row.string_value(ModelRole::ItemFactors.index_column())?,
                }
            } else {
                ModelNames::Similarity(row.string_value(ModelRole::Similarity.index_column())?)
            };
            let context = context_columns
                .iter()
                .map(|column| Ok((column.clone(), row.string_value(column)?)))
                .collect::<Result<Vec<_>>>()?;
            cells.push(CellRecord {
                system_id: Some(row.i64_value(index::SYSTEM_ID)?),
                artifacts: CellArtifacts {
                    models,
                    view_name: row.string_value(index::VIEW_NAME)?,
                },
                update_counter: row.i64_value(index::UPDATE_COUNTER)?,
                rating_total: row.i64_value(index::RATING_TOTAL)?,
                query_counter: row.i64_value(index::QUERY_COUNTER)?,
                update_rate: row.f64_value(index::UPDATE_RATE)?,
                query_rate: row.f64_value(index::QUERY_RATE)?,
                created_at_micros: row.timestamp_micros_value(index::CREATED_AT)?,
                context: CellContext::from_pairs(context),
            });
        }
        Ok(cells)
    }
}
