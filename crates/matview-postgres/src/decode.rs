use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgRow, PgTypeKind};
use sqlx::{Column, Decode, Postgres, Row, Type, TypeInfo, ValueRef};

use matview_core::{Scalar, StoreError};

use crate::session::to_store_error;

pub(crate) fn decode_row(row: &PgRow) -> Result<Vec<Scalar>, StoreError> {
    (0..row.len()).map(|index| decode_cell(row, index)).collect()
}

fn decode_cell(row: &PgRow, index: usize) -> Result<Scalar, StoreError> {
    let raw = row.try_get_raw(index).map_err(to_store_error)?;
    if raw.is_null() {
        return Ok(Scalar::Null);
    }
    let type_info = raw.type_info().into_owned();

    let scalar = match type_info.name() {
        "BOOL" => Scalar::Bool(get::<bool>(row, index)?),
        "INT2" => Scalar::Int(get::<i16>(row, index)?.into()),
        "INT4" => Scalar::Int(get::<i32>(row, index)?.into()),
        "INT8" => Scalar::Int(get::<i64>(row, index)?),
        "FLOAT4" => Scalar::Float(get::<f32>(row, index)?.into()),
        "FLOAT8" => Scalar::Float(get::<f64>(row, index)?),
        "NUMERIC" => Scalar::Decimal(get::<Decimal>(row, index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Scalar::Text(get::<String>(row, index)?),
        "DATE" => Scalar::Text(get::<NaiveDate>(row, index)?.to_string()),
        "TIME" => Scalar::Text(get::<NaiveTime>(row, index)?.to_string()),
        "TIMESTAMP" => Scalar::Text(get::<NaiveDateTime>(row, index)?.to_string()),
        "TIMESTAMPTZ" => Scalar::Text(get::<DateTime<Utc>>(row, index)?.to_string()),
        "UUID" => Scalar::Text(get::<uuid::Uuid>(row, index)?.to_string()),
        "JSON" | "JSONB" => Scalar::Text(get::<serde_json::Value>(row, index)?.to_string()),
        // Enum labels and citext values are sent as plain text.
        other if matches!(type_info.kind(), PgTypeKind::Enum(_))
            || other.eq_ignore_ascii_case("citext") =>
        {
            Scalar::Text(
                row.try_get_unchecked::<String, _>(index)
                    .map_err(to_store_error)?,
            )
        }
        other => {
            let column = row.column(index).name();
            tracing::warn!(event = "unsupported_column_type", column, type_name = other);
            return Err(unsupported_type(column, other));
        }
    };

    Ok(scalar)
}

/// Error for a column whose type has no comparable representation.
fn unsupported_type(column: &str, type_name: &str) -> StoreError {
    StoreError::new(format!(
        "column `{column}` has unsupported type {type_name}; cast it in the query"
    ))
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<T, StoreError>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(index).map_err(to_store_error)
}
