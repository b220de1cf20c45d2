//! Value normalisation on insert and Arrow array construction for cursors.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanBuilder, Float32Builder, Float64Builder, Int32Builder,
    Int64Builder, StringArray, StringBuilder, TimestampMicrosecondBuilder,
};
use arrow::compute::{CastOptions, cast_with_options};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit, TimestampMicrosecondType,
};
use recdb_plan::{ColumnSpec, PlanValue};
use recdb_result::{Error, Result};

/// Whether the in-memory gateway can store columns of this type.
pub(crate) fn is_supported_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int32
            | DataType::Int64
            | DataType::Float32
            | DataType::Float64
            | DataType::Utf8
            | DataType::Boolean
            | DataType::Timestamp(TimeUnit::Microsecond, None)
    )
}

/// Coerce an inserted value into the canonical variant for `column`.
///
/// After normalisation each column holds a single [`PlanValue`] variant (or
/// `Null`), which keeps filter comparison and array building simple.
pub(crate) fn normalize_value_for_column(
    column: &ColumnSpec,
    value: PlanValue,
) -> Result<PlanValue> {
    match (&column.data_type, value) {
        (_, PlanValue::Null) => Ok(PlanValue::Null),
        (DataType::Int32, PlanValue::Integer(v)) => {
            i32::try_from(v).map_err(|_| {
                Error::InvalidArgumentError(format!(
                    "integer {v} out of range for INTEGER column '{}'",
                    column.name
                ))
            })?;
            Ok(PlanValue::Integer(v))
        }
        (DataType::Int64, PlanValue::Integer(v)) => Ok(PlanValue::Integer(v)),
        (DataType::Float32, PlanValue::Integer(v)) => Ok(PlanValue::Float(v as f32 as f64)),
        (DataType::Float32, PlanValue::Float(v)) => Ok(PlanValue::Float(v as f32 as f64)),
        (DataType::Float64, PlanValue::Integer(v)) => Ok(PlanValue::Float(v as f64)),
        (DataType::Float64, PlanValue::Float(v)) => Ok(PlanValue::Float(v)),
        (DataType::Utf8, PlanValue::String(s)) => Ok(PlanValue::String(s)),
        (DataType::Utf8, PlanValue::Integer(v)) => Ok(PlanValue::String(v.to_string())),
        (DataType::Utf8, PlanValue::Float(v)) => Ok(PlanValue::String(v.to_string())),
        (DataType::Boolean, PlanValue::Boolean(v)) => Ok(PlanValue::Boolean(v)),
        (DataType::Boolean, PlanValue::String(s)) => {
            match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(PlanValue::Boolean(true)),
                "false" | "f" | "0" => Ok(PlanValue::Boolean(false)),
                _ => Err(Error::InvalidArgumentError(format!(
                    "cannot insert string '{}' into BOOLEAN column '{}'",
                    s, column.name
                ))),
            }
        }
        (DataType::Timestamp(TimeUnit::Microsecond, None), PlanValue::Timestamp(v)) => {
            Ok(PlanValue::Timestamp(v))
        }
        (dtype, other) => Err(Error::InvalidArgumentError(format!(
            "cannot insert {other:?} into {dtype} column '{}'",
            column.name
        ))),
    }
}

/// Coerce a filter operand into the stored variant of `column`.
///
/// Text operands are parsed with Arrow's string cast, the inverse of the
/// formatter behind `Row::string_value`, so a value read back as text selects
/// the rows it came from. Other operands go through insert normalisation and
/// are kept as given when that fails.
pub(crate) fn coerce_filter_value(column: &ColumnSpec, value: PlanValue) -> Result<PlanValue> {
    let text = match value {
        PlanValue::String(text) if column.data_type != DataType::Utf8 => text,
        other => {
            return Ok(normalize_value_for_column(column, other.clone()).unwrap_or(other));
        }
    };
    let source: ArrayRef = Arc::new(StringArray::from(vec![text.as_str()]));
    let options = CastOptions {
        safe: false,
        ..CastOptions::default()
    };
    let parsed = cast_with_options(&source, &column.data_type, &options).map_err(|err| {
        Error::InvalidArgumentError(format!(
            "cannot compare {} column '{}' with '{}': {err}",
            column.data_type, column.name, text
        ))
    })?;
    let value = plan_value_at(&parsed, 0)?;
    normalize_value_for_column(column, value)
}

fn plan_value_at(array: &ArrayRef, index: usize) -> Result<PlanValue> {
    if array.is_null(index) {
        return Ok(PlanValue::Null);
    }
    let value = match array.data_type() {
        DataType::Int32 => {
            PlanValue::Integer(array.as_primitive::<Int32Type>().value(index) as i64)
        }
        DataType::Int64 => PlanValue::Integer(array.as_primitive::<Int64Type>().value(index)),
        DataType::Float32 => {
            PlanValue::Float(array.as_primitive::<Float32Type>().value(index) as f64)
        }
        DataType::Float64 => PlanValue::Float(array.as_primitive::<Float64Type>().value(index)),
        DataType::Utf8 => PlanValue::String(array.as_string::<i32>().value(index).to_string()),
        DataType::Boolean => PlanValue::Boolean(array.as_boolean().value(index)),
        DataType::Timestamp(TimeUnit::Microsecond, None) => {
            PlanValue::Timestamp(array.as_primitive::<TimestampMicrosecondType>().value(index))
        }
        other => {
            return Err(Error::InvalidArgumentError(format!(
                "unsupported column type {other}"
            )));
        }
    };
    Ok(value)
}

/// Build one Arrow column from normalised values.
pub(crate) fn build_array_for_column(dtype: &DataType, values: &[&PlanValue]) -> Result<ArrayRef> {
    match dtype {
        DataType::Int32 => {
            let mut builder = Int32Builder::with_capacity(values.len());
            for value in values {
                match value {
                    PlanValue::Integer(v) => builder.append_value(*v as i32),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Int64 => {
            let mut builder = Int64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    PlanValue::Integer(v) => builder.append_value(*v),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Float32 => {
            let mut builder = Float32Builder::with_capacity(values.len());
            for value in values {
                match value {
                    PlanValue::Float(v) => builder.append_value(*v as f32),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    PlanValue::Float(v) => builder.append_value(*v),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Utf8 => {
            let mut builder = StringBuilder::with_capacity(values.len(), values.len() * 16);
            for value in values {
                match value {
                    PlanValue::String(s) => builder.append_value(s),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    PlanValue::Boolean(v) => builder.append_value(*v),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Timestamp(TimeUnit::Microsecond, None) => {
            let mut builder = TimestampMicrosecondBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    PlanValue::Timestamp(v) => builder.append_value(*v),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        other => Err(Error::InvalidArgumentError(format!(
            "unsupported column type {other}"
        ))),
    }
}
