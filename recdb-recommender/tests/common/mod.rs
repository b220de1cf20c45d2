#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use arrow::datatypes::DataType;
use recdb_gateway::{MemGateway, QueryGateway, RowCursor, StatementResult};
use recdb_plan::{
    ColumnSpec, CreateTablePlan, InsertPlan, NotNull, PlanStatement, PlanValue, SelectPlan,
};
use recdb_recommender::{
    CosineStats, FactorBuild, ModelKernels, PearsonStats, SimilarityBuild, StatsRequest,
};
use recdb_result::{Error, Result};

/// Kernel that counts the ratings matching each cell's context and writes one
/// marker row per model table.
#[derive(Default)]
pub struct CountingKernels {
    calls: Mutex<Vec<String>>,
    builds: AtomicUsize,
    fail_on_build: Option<usize>,
}

impl CountingKernels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th (zero-based) model build.
    pub fn failing_on_build(n: usize) -> Self {
        Self {
            fail_on_build: Some(n),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn next_build(&self) -> Result<()> {
        let n = self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_build == Some(n) {
            return Err(Error::model_kernel(format!("injected failure on build {n}")));
        }
        Ok(())
    }

    fn entity_ids(gateway: &dyn QueryGateway, request: &StatsRequest<'_>) -> Result<Vec<i64>> {
        let plan = SelectPlan::new(request.entity_table).with_projections([request.entity_key]);
        let mut cursor = gateway.open_cursor(&plan)?;
        let mut ids = Vec::new();
        while let Some(row) = cursor.next_row()? {
            ids.push(row.i64_value(request.entity_key)?);
        }
        Ok(ids)
    }

    fn count_ratings(
        gateway: &dyn QueryGateway,
        rating_table: &str,
        context: &recdb_recommender::CellContext,
    ) -> Result<u64> {
        let plan = SelectPlan::new(rating_table).with_filter(context.to_filter());
        let mut cursor = gateway.open_cursor(&plan)?;
        let mut count = 0;
        while cursor.next_row()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

impl ModelKernels for CountingKernels {
    fn cosine_stats(
        &self,
        gateway: &dyn QueryGateway,
        request: StatsRequest<'_>,
    ) -> Result<CosineStats> {
        self.record(format!("cosine_stats:{:?}:{}", request.entity, request.entity_table));
        let entity_ids = Self::entity_ids(gateway, &request)?;
        let vector_lengths = vec![1.0; entity_ids.len()];
        Ok(CosineStats {
            entity_ids,
            vector_lengths,
        })
    }

    fn pearson_stats(
        &self,
        gateway: &dyn QueryGateway,
        request: StatsRequest<'_>,
    ) -> Result<PearsonStats> {
        self.record(format!("pearson_stats:{:?}:{}", request.entity, request.entity_table));
        let entity_ids = Self::entity_ids(gateway, &request)?;
        let n = entity_ids.len();
        Ok(PearsonStats {
            entity_ids,
            averages: vec![0.0; n],
            pearson_constants: vec![1.0; n],
        })
    }

    fn build_similarity_model(
        &self,
        gateway: &dyn QueryGateway,
        build: SimilarityBuild<'_>,
    ) -> Result<u64> {
        self.record(format!("similarity:{}", build.model_table));
        self.next_build()?;
        let count = Self::count_ratings(gateway, &build.definition.rating_table, build.context)?;
        gateway.execute(
            InsertPlan::new(build.model_table)
                .with_row(vec![1.into(), 2.into(), 0.5.into()])
                .into(),
        )?;
        Ok(count)
    }

    fn build_factor_model(
        &self,
        gateway: &dyn QueryGateway,
        build: FactorBuild<'_>,
    ) -> Result<u64> {
        self.record(format!(
            "factors:{}:{}",
            build.user_model_table, build.item_model_table
        ));
        self.next_build()?;
        let count = Self::count_ratings(gateway, &build.definition.rating_table, build.context)?;
        for table in [build.user_model_table, build.item_model_table] {
            gateway.execute(
                InsertPlan::new(table)
                    .with_row(vec![1.into(), 0.into(), 0.25.into()])
                    .into(),
            )?;
        }
        Ok(count)
    }
}

/// Gateway wrapper that logs every statement and can fail selected drops.
pub struct RecordingGateway {
    inner: MemGateway,
    log: Mutex<Vec<String>>,
    fail_drop_of: Mutex<Option<String>>,
    fail_release: AtomicBool,
}

impl RecordingGateway {
    pub fn new(inner: MemGateway) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
            fail_drop_of: Mutex::new(None),
            fail_release: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &MemGateway {
        &self.inner
    }

    pub fn fail_drop_of(&self, table: &str) {
        *self.fail_drop_of.lock().expect("fail lock") = Some(table.to_ascii_lowercase());
    }

    /// Make every savepoint release fail.
    pub fn fail_releases(&self) {
        self.fail_release.store(true, Ordering::SeqCst);
    }

    pub fn clear_log(&self) {
        self.log.lock().expect("log lock").clear();
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().expect("log lock").clone()
    }

    /// Tables dropped so far, in order.
    pub fn dropped_tables(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix("DROP ").map(str::to_string))
            .collect()
    }
}

impl QueryGateway for RecordingGateway {
    fn execute(&self, statement: PlanStatement) -> Result<StatementResult> {
        let verb = match &statement {
            PlanStatement::CreateTable(_) => "CREATE",
            PlanStatement::DropTable(_) => "DROP",
            PlanStatement::Insert(_) => "INSERT",
            PlanStatement::Delete(_) => "DELETE",
        };
        let table = statement.table_name().to_ascii_lowercase();
        if verb == "DROP" {
            let fail = self.fail_drop_of.lock().expect("fail lock").clone();
            if fail.as_deref() == Some(table.as_str()) {
                return Err(Error::Internal(format!("injected failure dropping '{table}'")));
            }
        }
        self.log.lock().expect("log lock").push(format!("{verb} {table}"));
        self.inner.execute(statement)
    }

    fn open_cursor<'a>(&'a self, plan: &SelectPlan) -> Result<Box<dyn RowCursor + 'a>> {
        self.inner.open_cursor(plan)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        self.inner.table_exists(name)
    }

    fn savepoint(&self, name: &str) -> Result<()> {
        self.inner.savepoint(name)
    }

    fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        self.inner.rollback_to_savepoint(name)
    }

    fn release_savepoint(&self, name: &str) -> Result<()> {
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(Error::TransactionContextError(format!(
                "injected failure releasing '{name}'"
            )));
        }
        self.inner.release_savepoint(name)
    }
}

/// Users, items, and ratings; users and ratings carry a `season` column.
///
/// Each season gets two users, and each user rates every item once.
pub fn seed_sources(gateway: &dyn QueryGateway, seasons: &[&str], items: i64) {
    let create = [
        CreateTablePlan::new("Users")
            .with_column(ColumnSpec::new("uid", DataType::Int32, false).with_primary_key(true))
            .with_column(("season", DataType::Utf8, NotNull)),
        CreateTablePlan::new("Items")
            .with_column(ColumnSpec::new("iid", DataType::Int32, false).with_primary_key(true))
            .with_column(("title", DataType::Utf8, NotNull)),
        CreateTablePlan::new("Ratings")
            .with_column(("uid", DataType::Int32, NotNull))
            .with_column(("iid", DataType::Int32, NotNull))
            .with_column(("score", DataType::Float32, NotNull))
            .with_column(("season", DataType::Utf8, NotNull)),
    ];
    for plan in create {
        gateway.execute(plan.into()).expect("create source table");
    }

    let mut items_insert = InsertPlan::new("items");
    for iid in 1..=items {
        items_insert = items_insert.with_row(vec![iid.into(), format!("item {iid}").into()]);
    }
    gateway.execute(items_insert.into()).expect("insert items");

    let mut uid: i64 = 0;
    for season in seasons {
        for _ in 0..2 {
            uid += 1;
            gateway
                .execute(
                    InsertPlan::new("users")
                        .with_row(vec![uid.into(), PlanValue::from(*season)])
                        .into(),
                )
                .expect("insert user");
            let mut ratings = InsertPlan::new("ratings");
            for iid in 1..=items {
                ratings = ratings.with_row(vec![
                    uid.into(),
                    iid.into(),
                    ((uid + iid) % 5 + 1).into(),
                    PlanValue::from(*season),
                ]);
            }
            gateway.execute(ratings.into()).expect("insert ratings");
        }
    }
}

/// Every value of `column` in `table`, as text.
pub fn column_strings(gateway: &dyn QueryGateway, table: &str, column: &str) -> Vec<String> {
    let mut cursor = gateway
        .open_cursor(&SelectPlan::new(table))
        .expect("open cursor");
    let mut out = Vec::new();
    while let Some(row) = cursor.next_row().expect("next row") {
        out.push(row.string_value(column).expect("string value"));
    }
    out
}

/// `(user, item, score)` rows of a view table.
pub fn view_rows(
    gateway: &dyn QueryGateway,
    view: &str,
    user_key: &str,
    item_key: &str,
) -> Vec<(i64, i64, f64)> {
    let mut cursor = gateway
        .open_cursor(&SelectPlan::new(view))
        .expect("open view cursor");
    let mut out = Vec::new();
    while let Some(row) = cursor.next_row().expect("next row") {
        out.push((
            row.i64_value(user_key).expect("user key"),
            row.i64_value(item_key).expect("item key"),
            row.f64_value("recscore").expect("score"),
        ));
    }
    out
}
