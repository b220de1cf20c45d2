//! Typed statement descriptors for recdb.
//!
//! The recommender core never builds SQL text. Every table it creates, fills,
//! scans, or drops is described by one of the plan types re-exported here and
//! handed to a query gateway, which is free to execute them however it likes.

pub mod plans;

pub use plans::{
    ColumnFilter, ColumnNullability, ColumnSpec, CreateTablePlan, DeletePlan, DropTablePlan,
    InsertPlan, InsertSource, IntoColumnSpec, NotNull, PlanStatement,
    PlanValue, SelectPlan, timestamp_type,
};
