//! Iterator-style query sessions.

use std::collections::VecDeque;
use std::fmt;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use recdb_result::Result;

use crate::row::Row;

/// An open query session over a `SELECT`.
///
/// Dropping the cursor ends the session and releases whatever the gateway
/// holds for it, so early returns through `?` never leak an open scan.
pub trait RowCursor {
    fn schema(&self) -> SchemaRef;

    /// Next row, or `None` once the result is exhausted.
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Cursor over a fixed list of record batches.
///
/// The optional release hook runs exactly once when the cursor is dropped.
pub struct BatchCursor<'a> {
    schema: SchemaRef,
    batches: VecDeque<RecordBatch>,
    current: Option<(RecordBatch, usize)>,
    on_release: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> BatchCursor<'a> {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self {
            schema,
            batches: batches.into(),
            current: None,
            on_release: None,
        }
    }

    pub fn with_release_hook(mut self, hook: impl FnOnce() + 'a) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }
}

impl RowCursor for BatchCursor<'_> {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some((batch, offset)) = &mut self.current {
                if *offset < batch.num_rows() {
                    let row = Row::new(batch.clone(), *offset);
                    *offset += 1;
                    return Ok(Some(row));
                }
            }
            match self.batches.pop_front() {
                Some(batch) => self.current = Some((batch, 0)),
                None => {
                    self.current = None;
                    return Ok(None);
                }
            }
        }
    }
}

impl Drop for BatchCursor<'_> {
    fn drop(&mut self) {
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}

impl fmt::Debug for BatchCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchCursor")
            .field("schema", &self.schema)
            .field("pending_batches", &self.batches.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::cell::Cell;
    use std::sync::Arc;

    fn batch(values: Vec<i32>) -> (SchemaRef, RecordBatch) {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int32, false)]));
        let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from(values))])
            .expect("batch");
        (schema, batch)
    }

    #[test]
    fn walks_every_batch_then_releases_once() {
        let (schema, first) = batch(vec![1, 2]);
        let (_, second) = batch(vec![3]);
        let released = Cell::new(0);
        {
            let mut cursor = BatchCursor::new(schema, vec![first, second])
                .with_release_hook(|| released.set(released.get() + 1));
            let mut seen = Vec::new();
            while let Some(row) = cursor.next_row().expect("next row") {
                seen.push(row.i64_value("v").expect("value"));
            }
            assert_eq!(seen, vec![1, 2, 3]);
            assert!(cursor.next_row().expect("exhausted").is_none());
            assert_eq!(released.get(), 0);
        }
        assert_eq!(released.get(), 1);
    }
}
