//! Row views handed out by cursors.

use arrow::array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use recdb_result::{Error, Result};

/// One row of a cursor result.
///
/// A row is a cheap view (an `Arc`-backed batch plus an offset), so it stays
/// valid after the cursor advances or is closed.
#[derive(Clone, Debug)]
pub struct Row {
    batch: RecordBatch,
    index: usize,
}

impl Row {
    pub(crate) fn new(batch: RecordBatch, index: usize) -> Self {
        Self { batch, index }
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    fn column(&self, name: &str) -> Result<&dyn Array> {
        let normalized = name.to_ascii_lowercase();
        let idx = self.batch.schema().index_of(&normalized).map_err(|_| {
            Error::InvalidArgumentError(format!("row does not have a column named '{name}'"))
        })?;
        let array = self.batch.column(idx).as_ref();
        if array.is_null(self.index) {
            return Err(Error::InvalidArgumentError(format!(
                "column '{name}' is NULL and has no textual value"
            )));
        }
        Ok(array)
    }

    /// Textual representation of `column` in this row.
    ///
    /// NULL values and unknown columns are errors; callers treat a value that
    /// cannot be rendered as fatal for the row.
    pub fn string_value(&self, column: &str) -> Result<String> {
        let array = self.column(column)?;
        Ok(array_value_to_string(array, self.index)?)
    }

    /// Integer value of `column`, accepting 32- and 64-bit integer columns.
    pub fn i64_value(&self, column: &str) -> Result<i64> {
        let array = self.column(column)?;
        match array.data_type() {
            DataType::Int64 => Ok(downcast::<Int64Array>(array, column)?.value(self.index)),
            DataType::Int32 => {
                Ok(downcast::<Int32Array>(array, column)?.value(self.index) as i64)
            }
            other => Err(Error::InvalidArgumentError(format!(
                "column '{column}' has type {other}, expected an integer"
            ))),
        }
    }

    pub fn f64_value(&self, column: &str) -> Result<f64> {
        let array = self.column(column)?;
        match array.data_type() {
            DataType::Float64 => Ok(downcast::<Float64Array>(array, column)?.value(self.index)),
            DataType::Float32 => {
                Ok(downcast::<Float32Array>(array, column)?.value(self.index) as f64)
            }
            DataType::Int64 | DataType::Int32 => self.i64_value(column).map(|v| v as f64),
            other => Err(Error::InvalidArgumentError(format!(
                "column '{column}' has type {other}, expected a number"
            ))),
        }
    }

    /// Microseconds since the Unix epoch of a microsecond timestamp column.
    pub fn timestamp_micros_value(&self, column: &str) -> Result<i64> {
        let array = self.column(column)?;
        match array.data_type() {
            DataType::Timestamp(TimeUnit::Microsecond, _) => {
                Ok(downcast::<TimestampMicrosecondArray>(array, column)?.value(self.index))
            }
            other => Err(Error::InvalidArgumentError(format!(
                "column '{column}' has type {other}, expected a microsecond timestamp"
            ))),
        }
    }

    pub fn bool_value(&self, column: &str) -> Result<bool> {
        let array = self.column(column)?;
        Ok(downcast::<BooleanArray>(array, column)?.value(self.index))
    }
}

fn downcast<'a, A: Array + 'static>(array: &'a dyn Array, column: &str) -> Result<&'a A> {
    array.as_any().downcast_ref::<A>().ok_or_else(|| {
        Error::Internal(format!(
            "column '{column}' array does not match its declared type {}",
            array.data_type()
        ))
    })
}
