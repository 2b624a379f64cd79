//! Handle the translation of literal values.

use query_engine_metadata::metadata::ClrType;
use query_engine_sql::sql;

use super::error::Error;

/// Convert a JSON literal into a SQL value of the given conceptual type.
pub fn translate_json_value(
    value: &serde_json::Value,
    r#type: &ClrType,
) -> Result<sql::ast::Value, Error> {
    let mismatch = || Error::TypeMismatch(value.clone(), r#type.clone());
    match (value, r#type) {
        (serde_json::Value::Null, _) => Ok(sql::ast::Value::Null),
        (_, ClrType::Nullable(inner)) => translate_json_value(value, inner),
        (_, ClrType::UserEnum { underlying, .. }) => translate_json_value(value, underlying),
        (_, ClrType::Object) => Ok(infer_value(value)),

        (serde_json::Value::Bool(b), ClrType::Boolean) => Ok(sql::ast::Value::Bool(*b)),

        (
            serde_json::Value::Number(n),
            ClrType::Byte
            | ClrType::SByte
            | ClrType::Int16
            | ClrType::UInt16
            | ClrType::Int32
            | ClrType::UInt32
            | ClrType::Int64,
        ) => n.as_i64().map(sql::ast::Value::Int).ok_or_else(mismatch),
        (serde_json::Value::Number(n), ClrType::UInt64) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => Ok(sql::ast::Value::Int(i)),
            (None, Some(_)) => Ok(sql::ast::Value::Number(n.to_string())),
            (None, None) => Err(mismatch()),
        },
        (serde_json::Value::Number(n), ClrType::Decimal) => Ok(n
            .as_i64()
            .map_or_else(|| sql::ast::Value::Number(n.to_string()), sql::ast::Value::Int)),
        (serde_json::Value::Number(n), ClrType::Single | ClrType::Double) => {
            n.as_f64().map(sql::ast::Value::Float).ok_or_else(mismatch)
        }

        (
            serde_json::Value::String(s),
            ClrType::String
            | ClrType::Char
            | ClrType::Guid
            | ClrType::DateTime
            | ClrType::DateTimeOffset
            | ClrType::TimeSpan
            | ClrType::Binary
            | ClrType::Type,
        ) => Ok(sql::ast::Value::String(s.clone())),

        (serde_json::Value::Object(_), ClrType::Structural(_)) => {
            Ok(sql::ast::Value::Json(value.clone()))
        }
        (serde_json::Value::Array(items), ClrType::Sequence(element)) => Ok(sql::ast::Value::Array(
            items
                .iter()
                .map(|item| translate_json_value(item, element))
                .collect::<Result<Vec<_>, Error>>()?,
        )),

        _ => Err(mismatch()),
    }
}

/// The SQL value of an untyped JSON literal.
fn infer_value(value: &serde_json::Value) -> sql::ast::Value {
    match value {
        serde_json::Value::Null => sql::ast::Value::Null,
        serde_json::Value::Bool(b) => sql::ast::Value::Bool(*b),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => sql::ast::Value::Int(i),
            (None, Some(_)) => sql::ast::Value::Number(n.to_string()),
            (None, None) => sql::ast::Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => sql::ast::Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            sql::ast::Value::Array(items.iter().map(infer_value).collect())
        }
        serde_json::Value::Object(_) => sql::ast::Value::Json(value.clone()),
    }
}
