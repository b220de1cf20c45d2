//! Typed statement descriptors for recdb.
//!
//! This module defines the plan structures handed to a query gateway in place of
//! SQL text. Each physical object the recommender core creates or removes is
//! described by one of these plans, so identifiers and values never pass through
//! string formatting on their way to the engine.

use std::fmt;

use arrow::datatypes::{DataType, TimeUnit};

// ============================================================================
// PlanValue Types
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum PlanValue {
    Null,
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
}

impl PlanValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PlanValue::Null)
    }

    /// Equality used by [`ColumnFilter`] evaluation.
    ///
    /// Values of the same variant compare directly. Mixed variants compare by
    /// their textual form, so a context value carried as text still matches an
    /// integer column. `Null` never matches anything.
    pub fn matches(&self, other: &PlanValue) -> bool {
        match (self, other) {
            (PlanValue::Null, _) | (_, PlanValue::Null) => false,
            (PlanValue::Integer(a), PlanValue::Float(b))
            | (PlanValue::Float(b), PlanValue::Integer(a)) => (*a as f64) == *b,
            (a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => a == b,
            (a, b) => a.to_string() == b.to_string(),
        }
    }

    /// Key used to deduplicate rows in a `DISTINCT` projection.
    pub fn distinct_key(&self) -> String {
        match self {
            PlanValue::Null => "n:".to_string(),
            PlanValue::Integer(v) => format!("i:{v}"),
            PlanValue::Float(v) => format!("f:{}", v.to_bits()),
            PlanValue::String(v) => format!("s:{v}"),
            PlanValue::Boolean(v) => format!("b:{v}"),
            PlanValue::Timestamp(v) => format!("t:{v}"),
        }
    }
}

impl fmt::Display for PlanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanValue::Null => f.write_str("NULL"),
            PlanValue::Integer(v) => write!(f, "{v}"),
            PlanValue::Float(v) => write!(f, "{v}"),
            PlanValue::String(v) => f.write_str(v),
            PlanValue::Boolean(v) => write!(f, "{v}"),
            PlanValue::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for PlanValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PlanValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for PlanValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<i64> for PlanValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for PlanValue {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<usize> for PlanValue {
    fn from(value: usize) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for PlanValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PlanValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

// ============================================================================
// CREATE TABLE Plan
// ============================================================================

/// Plan for creating a table.
#[derive(Clone, Debug)]
pub struct CreateTablePlan {
    pub name: String,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnSpec>,
}

impl CreateTablePlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            if_not_exists: false,
            columns: Vec::new(),
        }
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn with_column(mut self, column: impl IntoColumnSpec) -> Self {
        self.columns.push(column.into_column_spec());
        self
    }

    pub fn with_columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoColumnSpec,
    {
        self.columns
            .extend(columns.into_iter().map(IntoColumnSpec::into_column_spec));
        self
    }

    /// Names of the columns flagged as primary key, in declaration order.
    ///
    /// More than one name means a composite key.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Column specification for CREATE TABLE.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub primary_key: bool,
    /// Filled from a per-table sequence when an insert omits the column.
    pub serial: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
            primary_key: false,
            serial: false,
        }
    }

    /// `serial PRIMARY KEY` column: non-null 64-bit integer from a sequence.
    pub fn serial_primary_key(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Int64,
            nullable: false,
            primary_key: true,
            serial: true,
        }
    }

    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }
}

/// Data type used for timestamp columns.
pub fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, None)
}

/// Trait for types that can be converted into a ColumnSpec.
pub trait IntoColumnSpec {
    fn into_column_spec(self) -> ColumnSpec;
}

/// Column nullability specification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnNullability {
    Nullable,
    NotNull,
}

impl ColumnNullability {
    pub fn is_nullable(self) -> bool {
        matches!(self, ColumnNullability::Nullable)
    }
}

/// Convenience constant for non-null columns.
#[allow(non_upper_case_globals)]
pub const NotNull: ColumnNullability = ColumnNullability::NotNull;

impl IntoColumnSpec for ColumnSpec {
    fn into_column_spec(self) -> ColumnSpec {
        self
    }
}

impl<T> IntoColumnSpec for &T
where
    T: Clone + IntoColumnSpec,
{
    fn into_column_spec(self) -> ColumnSpec {
        self.clone().into_column_spec()
    }
}

impl IntoColumnSpec for (&str, DataType) {
    fn into_column_spec(self) -> ColumnSpec {
        ColumnSpec::new(self.0, self.1, true)
    }
}

impl IntoColumnSpec for (&str, DataType, ColumnNullability) {
    fn into_column_spec(self) -> ColumnSpec {
        ColumnSpec::new(self.0, self.1, self.2.is_nullable())
    }
}

impl IntoColumnSpec for (String, DataType, ColumnNullability) {
    fn into_column_spec(self) -> ColumnSpec {
        ColumnSpec::new(self.0, self.1, self.2.is_nullable())
    }
}

// ============================================================================
// DROP TABLE Plan
// ============================================================================

/// Plan for dropping a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropTablePlan {
    pub name: String,
}

impl DropTablePlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// ============================================================================
// INSERT Plan
// ============================================================================

/// Plan for inserting data into a table.
///
/// An empty `columns` list means every column, in declaration order. Columns
/// left out of a non-empty list take their sequence value (serial columns) or
/// NULL.
#[derive(Clone, Debug)]
pub struct InsertPlan {
    pub table: String,
    pub columns: Vec<String>,
    pub source: InsertSource,
}

impl InsertPlan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            source: InsertSource::Rows(Vec::new()),
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_row(mut self, row: Vec<PlanValue>) -> Self {
        match &mut self.source {
            InsertSource::Rows(rows) => rows.push(row),
        }
        self
    }
}

/// Source data for INSERT operations.
#[derive(Clone, Debug)]
pub enum InsertSource {
    Rows(Vec<Vec<PlanValue>>),
}

// ============================================================================
// Filters
// ============================================================================

/// Conjunction of `column = value` predicates.
///
/// An empty filter matches every row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnFilter {
    pub predicates: Vec<(String, PlanValue)>,
}

impl ColumnFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(column: impl Into<String>, value: impl Into<PlanValue>) -> Self {
        Self::new().and_eq(column, value)
    }

    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<PlanValue>) -> Self {
        self.predicates.push((column.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

// ============================================================================
// DELETE Plan
// ============================================================================

/// Plan for deleting rows from a table.
#[derive(Clone, Debug)]
pub struct DeletePlan {
    pub table: String,
    pub filter: Option<ColumnFilter>,
}

impl DeletePlan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: ColumnFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

// ============================================================================
// SELECT Plan
// ============================================================================

/// Single-table query plan.
///
/// An empty projection selects every column.
#[derive(Clone, Debug)]
pub struct SelectPlan {
    pub table: String,
    pub projections: Vec<String>,
    pub distinct: bool,
    pub filter: Option<ColumnFilter>,
}

impl SelectPlan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            projections: Vec::new(),
            distinct: false,
            filter: None,
        }
    }

    pub fn with_projections<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projections = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn with_filter(mut self, filter: ColumnFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

// ============================================================================
// Statement Enum
// ============================================================================

/// Statements executed for effect through a query gateway.
#[derive(Clone, Debug)]
pub enum PlanStatement {
    CreateTable(CreateTablePlan),
    DropTable(DropTablePlan),
    Insert(InsertPlan),
    Delete(DeletePlan),
}

impl PlanStatement {
    /// Name of the table the statement targets.
    pub fn table_name(&self) -> &str {
        match self {
            PlanStatement::CreateTable(plan) => &plan.name,
            PlanStatement::DropTable(plan) => &plan.name,
            PlanStatement::Insert(plan) => &plan.table,
            PlanStatement::Delete(plan) => &plan.table,
        }
    }
}

impl From<CreateTablePlan> for PlanStatement {
    fn from(plan: CreateTablePlan) -> Self {
        PlanStatement::CreateTable(plan)
    }
}

impl From<DropTablePlan> for PlanStatement {
    fn from(plan: DropTablePlan) -> Self {
        PlanStatement::DropTable(plan)
    }
}

impl From<InsertPlan> for PlanStatement {
    fn from(plan: InsertPlan) -> Self {
        PlanStatement::Insert(plan)
    }
}

impl From<DeletePlan> for PlanStatement {
    fn from(plan: DeletePlan) -> Self {
        PlanStatement::Delete(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_primary_key_is_reported_in_order() {
        let plan = CreateTablePlan::new("view")
            .with_column(ColumnSpec::new("uid", DataType::Int32, false).with_primary_key(true))
            .with_column(ColumnSpec::new("iid", DataType::Int32, false).with_primary_key(true))
            .with_column(("recscore", DataType::Float32, NotNull));
        assert_eq!(plan.primary_key(), vec!["uid", "iid"]);
    }

    #[test]
    fn mixed_variant_values_match_by_text() {
        assert!(PlanValue::Integer(3).matches(&PlanValue::String("3".into())));
        assert!(PlanValue::Integer(2).matches(&PlanValue::Float(2.0)));
        assert!(!PlanValue::String("winter".into()).matches(&PlanValue::String("summer".into())));
        assert!(!PlanValue::Null.matches(&PlanValue::Null));
    }

    #[test]
    fn distinct_keys_separate_variants() {
        assert_ne!(
            PlanValue::Integer(1).distinct_key(),
            PlanValue::String("1".into()).distinct_key()
        );
    }
}
