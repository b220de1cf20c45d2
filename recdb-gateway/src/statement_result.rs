/// Outcome of a statement executed for effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatementResult {
    CreateTable { table_name: String },
    DropTable { table_name: String },
    Insert { table_name: String, rows_inserted: usize },
    Delete { table_name: String, rows_deleted: usize },
    NoOp,
}

impl StatementResult {
    pub fn rows_affected(&self) -> usize {
        match self {
            StatementResult::Insert { rows_inserted, .. } => *rows_inserted,
            StatementResult::Delete { rows_deleted, .. } => *rows_deleted,
            _ => 0,
        }
    }
}
