//! In-memory query gateway.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use recdb_plan::{
    ColumnFilter, ColumnSpec, CreateTablePlan, DeletePlan, DropTablePlan, InsertPlan,
    InsertSource, PlanStatement, PlanValue, SelectPlan,
};
use recdb_result::{Error, Result};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::data_conversion::{
    build_array_for_column, coerce_filter_value, is_supported_type, normalize_value_for_column,
};
use crate::{BatchCursor, QueryGateway, RowCursor, StatementResult, canonical_identifier};

#[derive(Clone, Debug)]
struct MemTable {
    display_name: String,
    columns: Vec<ColumnSpec>,
    schema: SchemaRef,
    rows: Vec<Vec<PlanValue>>,
    next_serial: i64,
}

impl MemTable {
    fn column_index(&self, name: &str) -> Result<usize> {
        let normalized = name.to_ascii_lowercase();
        self.columns
            .iter()
            .position(|c| c.name == normalized)
            .ok_or_else(|| {
                Error::InvalidArgumentError(format!(
                    "Binder Error: table '{}' does not have a column named '{}'",
                    self.display_name, name
                ))
            })
    }

    fn resolve_filter(&self, filter: Option<&ColumnFilter>) -> Result<Vec<(usize, PlanValue)>> {
        let Some(filter) = filter else {
            return Ok(Vec::new());
        };
        filter
            .predicates
            .iter()
            .map(|(column, value)| {
                let idx = self.column_index(column)?;
                Ok((idx, coerce_filter_value(&self.columns[idx], value.clone())?))
            })
            .collect()
    }

    fn primary_key_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(idx, _)| idx)
            .collect()
    }
}

fn row_matches(row: &[PlanValue], predicates: &[(usize, PlanValue)]) -> bool {
    predicates
        .iter()
        .all(|(idx, expected)| row[*idx].matches(expected))
}

fn key_of(row: &[PlanValue], indices: &[usize]) -> Vec<String> {
    indices.iter().map(|idx| row[*idx].distinct_key()).collect()
}

struct Savepoint {
    name: String,
    tables: FxHashMap<String, MemTable>,
}

/// Gateway that keeps every table in memory.
///
/// Identifiers are folded to lower case. Cursors see a snapshot taken when they
/// are opened, and a table with an open cursor refuses writes and drops until
/// the cursor is released.
pub struct MemGateway {
    tables: RwLock<FxHashMap<String, MemTable>>,
    savepoints: Mutex<Vec<Savepoint>>,
    readers: Arc<Mutex<FxHashMap<String, usize>>>,
}

impl Default for MemGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemGateway {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(FxHashMap::default()),
            savepoints: Mutex::new(Vec::new()),
            readers: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    fn read_tables(&self) -> Result<RwLockReadGuard<'_, FxHashMap<String, MemTable>>> {
        self.tables
            .read()
            .map_err(|_| Error::Internal("MemGateway tables read lock poisoned".into()))
    }

    fn write_tables(&self) -> Result<RwLockWriteGuard<'_, FxHashMap<String, MemTable>>> {
        self.tables
            .write()
            .map_err(|_| Error::Internal("MemGateway tables write lock poisoned".into()))
    }

    fn lock_savepoints(&self) -> Result<MutexGuard<'_, Vec<Savepoint>>> {
        self.savepoints
            .lock()
            .map_err(|_| Error::Internal("MemGateway savepoint lock poisoned".into()))
    }

    fn ensure_not_being_read(&self, canonical: &str) -> Result<()> {
        let readers = self
            .readers
            .lock()
            .map_err(|_| Error::Internal("MemGateway reader lock poisoned".into()))?;
        match readers.get(canonical) {
            Some(count) if *count > 0 => Err(Error::TransactionContextError(format!(
                "table '{canonical}' is being read by an open cursor"
            ))),
            _ => Ok(()),
        }
    }

    /// Names of all tables, canonical form, sorted.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let tables = self.read_tables()?;
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        let (table_label, canonical) = canonical_identifier(table)?;
        let tables = self.read_tables()?;
        tables
            .get(&canonical)
            .map(|t| t.rows.len())
            .ok_or_else(|| missing_table(&table_label))
    }

    /// Column names of `table` in declaration order.
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let (table_label, canonical) = canonical_identifier(table)?;
        let tables = self.read_tables()?;
        let table = tables.get(&canonical).ok_or_else(|| missing_table(&table_label))?;
        Ok(table.columns.iter().map(|c| c.name.clone()).collect())
    }

    /// Number of cursors currently open across all tables.
    pub fn open_cursor_count(&self) -> usize {
        self.readers
            .lock()
            .map(|readers| readers.values().sum())
            .unwrap_or(0)
    }

    fn create_table(&self, plan: CreateTablePlan) -> Result<StatementResult> {
        let (table_label, canonical) = canonical_identifier(&plan.name)?;
        tracing::trace!(
            "MemGateway CREATE TABLE '{}' columns={}",
            table_label,
            plan.columns.len()
        );
        if plan.columns.is_empty() {
            return Err(Error::InvalidArgumentError(
                "CREATE TABLE requires at least one column".into(),
            ));
        }

        let mut seen = FxHashSet::default();
        let mut columns = Vec::with_capacity(plan.columns.len());
        for column in plan.columns {
            let (_, name) = canonical_identifier(&column.name)?;
            if !seen.insert(name.clone()) {
                return Err(Error::CatalogError(format!(
                    "Catalog Error: column '{}' specified more than once in table '{}'",
                    column.name, table_label
                )));
            }
            if !is_supported_type(&column.data_type) {
                return Err(Error::InvalidArgumentError(format!(
                    "unsupported type {} for column '{}'",
                    column.data_type, column.name
                )));
            }
            columns.push(ColumnSpec {
                name,
                nullable: column.nullable && !column.primary_key,
                ..column
            });
        }

        let mut tables = self.write_tables()?;
        if tables.contains_key(&canonical) {
            if plan.if_not_exists {
                return Ok(StatementResult::NoOp);
            }
            return Err(Error::CatalogError(format!(
                "Catalog Error: Table '{}' already exists",
                table_label
            )));
        }

        let schema = Arc::new(Schema::new(
            columns
                .iter()
                .map(|c| Field::new(&c.name, c.data_type.clone(), c.nullable))
                .collect::<Vec<_>>(),
        ));
        tables.insert(
            canonical,
            MemTable {
                display_name: table_label.clone(),
                columns,
                schema,
                rows: Vec::new(),
                next_serial: 1,
            },
        );
        Ok(StatementResult::CreateTable {
            table_name: table_label,
        })
    }

    fn drop_table(&self, plan: DropTablePlan) -> Result<StatementResult> {
        let (table_label, canonical) = canonical_identifier(&plan.name)?;
        tracing::trace!("MemGateway DROP TABLE '{}'", table_label);
        self.ensure_not_being_read(&canonical)?;
        let mut tables = self.write_tables()?;
        if tables.remove(&canonical).is_none() {
            return Err(missing_table(&table_label));
        }
        Ok(StatementResult::DropTable {
            table_name: table_label,
        })
    }

    fn insert(&self, plan: InsertPlan) -> Result<StatementResult> {
        let (table_label, canonical) = canonical_identifier(&plan.table)?;
        self.ensure_not_being_read(&canonical)?;
        let mut tables = self.write_tables()?;
        let table = tables
            .get_mut(&canonical)
            .ok_or_else(|| missing_table(&table_label))?;

        let targets: Vec<usize> = if plan.columns.is_empty() {
            (0..table.columns.len()).collect()
        } else {
            plan.columns
                .iter()
                .map(|c| table.column_index(c))
                .collect::<Result<_>>()?
        };

        let InsertSource::Rows(source_rows) = plan.source;
        let pk = table.primary_key_indices();
        let mut existing_keys: FxHashSet<Vec<String>> = if pk.is_empty() {
            FxHashSet::default()
        } else {
            table.rows.iter().map(|r| key_of(r, &pk)).collect()
        };

        let mut next_serial = table.next_serial;
        let mut staged = Vec::with_capacity(source_rows.len());
        for source in source_rows {
            if source.len() != targets.len() {
                return Err(Error::InvalidArgumentError(format!(
                    "INSERT into '{}' expects {} values, got {}",
                    table_label,
                    targets.len(),
                    source.len()
                )));
            }
            let mut row = vec![PlanValue::Null; table.columns.len()];
            let mut provided = vec![false; table.columns.len()];
            for (idx, value) in targets.iter().zip(source) {
                row[*idx] = normalize_value_for_column(&table.columns[*idx], value)?;
                provided[*idx] = true;
            }
            for (idx, column) in table.columns.iter().enumerate() {
                if column.serial {
                    if provided[idx] {
                        if let PlanValue::Integer(v) = row[idx] {
                            next_serial = next_serial.max(v + 1);
                        }
                    } else {
                        row[idx] = PlanValue::Integer(next_serial);
                        next_serial += 1;
                    }
                }
                if row[idx].is_null() && !column.nullable {
                    return Err(Error::ConstraintError(format!(
                        "NOT NULL constraint failed for column '{}' of table '{}'",
                        column.name, table_label
                    )));
                }
            }
            if !pk.is_empty() && !existing_keys.insert(key_of(&row, &pk)) {
                return Err(Error::ConstraintError(format!(
                    "duplicate key value violates primary key of table '{}'",
                    table_label
                )));
            }
            staged.push(row);
        }

        let rows_inserted = staged.len();
        table.rows.extend(staged);
        table.next_serial = next_serial;
        Ok(StatementResult::Insert {
            table_name: table_label,
            rows_inserted,
        })
    }

    fn delete(&self, plan: DeletePlan) -> Result<StatementResult> {
        let (table_label, canonical) = canonical_identifier(&plan.table)?;
        self.ensure_not_being_read(&canonical)?;
        let mut tables = self.write_tables()?;
        let table = tables
            .get_mut(&canonical)
            .ok_or_else(|| missing_table(&table_label))?;
        let predicates = table.resolve_filter(plan.filter.as_ref())?;
        let before = table.rows.len();
        table.rows.retain(|row| !row_matches(row, &predicates));
        Ok(StatementResult::Delete {
            table_name: table_label,
            rows_deleted: before - table.rows.len(),
        })
    }

    fn snapshot(&self, plan: &SelectPlan) -> Result<(String, SchemaRef, RecordBatch)> {
        let (table_label, canonical) = canonical_identifier(&plan.table)?;
        let tables = self.read_tables()?;
        let table = tables.get(&canonical).ok_or_else(|| missing_table(&table_label))?;

        let projection: Vec<usize> = if plan.projections.is_empty() {
            (0..table.columns.len()).collect()
        } else {
            plan.projections
                .iter()
                .map(|c| table.column_index(c))
                .collect::<Result<_>>()?
        };
        let predicates = table.resolve_filter(plan.filter.as_ref())?;

        let mut seen: FxHashSet<Vec<String>> = FxHashSet::default();
        let mut selected: Vec<&Vec<PlanValue>> = Vec::new();
        for row in table.rows.iter().filter(|row| row_matches(row, &predicates)) {
            if plan.distinct && !seen.insert(key_of(row, &projection)) {
                continue;
            }
            selected.push(row);
        }

        let schema = Arc::new(Schema::new(
            projection
                .iter()
                .map(|idx| table.schema.field(*idx).clone())
                .collect::<Vec<_>>(),
        ));
        let arrays = projection
            .iter()
            .map(|idx| {
                let values: Vec<&PlanValue> = selected.iter().map(|row| &row[*idx]).collect();
                build_array_for_column(&table.columns[*idx].data_type, &values)
            })
            .collect::<Result<Vec<_>>>()?;
        let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)?;
        Ok((canonical, schema, batch))
    }
}

fn missing_table(table_label: &str) -> Error {
    Error::CatalogError(format!("Catalog Error: Table '{table_label}' does not exist"))
}

impl QueryGateway for MemGateway {
    fn execute(&self, statement: PlanStatement) -> Result<StatementResult> {
        match statement {
            PlanStatement::CreateTable(plan) => self.create_table(plan),
            PlanStatement::DropTable(plan) => self.drop_table(plan),
            PlanStatement::Insert(plan) => self.insert(plan),
            PlanStatement::Delete(plan) => self.delete(plan),
        }
    }

    fn open_cursor<'a>(&'a self, plan: &SelectPlan) -> Result<Box<dyn RowCursor + 'a>> {
        let (canonical, schema, batch) = self.snapshot(plan)?;
        {
            let mut readers = self
                .readers
                .lock()
                .map_err(|_| Error::Internal("MemGateway reader lock poisoned".into()))?;
            *readers.entry(canonical.clone()).or_insert(0) += 1;
        }
        tracing::trace!(
            "MemGateway opened cursor on '{}' rows={}",
            canonical,
            batch.num_rows()
        );
        let readers = Arc::clone(&self.readers);
        let cursor = BatchCursor::new(schema, vec![batch]).with_release_hook(move || {
            if let Ok(mut readers) = readers.lock() {
                if let Some(count) = readers.get_mut(&canonical) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        readers.remove(&canonical);
                    }
                }
            }
        });
        Ok(Box::new(cursor))
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let (_, canonical) = canonical_identifier(name)?;
        Ok(self.read_tables()?.contains_key(&canonical))
    }

    fn savepoint(&self, name: &str) -> Result<()> {
        let (_, canonical) = canonical_identifier(name)?;
        let tables = self.read_tables()?.clone();
        self.lock_savepoints()?.push(Savepoint {
            name: canonical,
            tables,
        });
        Ok(())
    }

    fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        let (savepoint_label, canonical) = canonical_identifier(name)?;
        let mut savepoints = self.lock_savepoints()?;
        let position = savepoints
            .iter()
            .rposition(|sp| sp.name == canonical)
            .ok_or_else(|| missing_savepoint(&savepoint_label))?;
        savepoints.truncate(position + 1);
        let restored = savepoints[position].tables.clone();
        *self.write_tables()? = restored;
        tracing::debug!("MemGateway rolled back to savepoint '{}'", savepoint_label);
        Ok(())
    }

    fn release_savepoint(&self, name: &str) -> Result<()> {
        let (savepoint_label, canonical) = canonical_identifier(name)?;
        let mut savepoints = self.lock_savepoints()?;
        let position = savepoints
            .iter()
            .rposition(|sp| sp.name == canonical)
            .ok_or_else(|| missing_savepoint(&savepoint_label))?;
        savepoints.truncate(position);
        Ok(())
    }
}

fn missing_savepoint(savepoint_label: &str) -> Error {
    Error::TransactionContextError(format!("savepoint '{savepoint_label}' does not exist"))
}
