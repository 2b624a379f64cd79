//! Storage types of the database and the mapping of conceptual types onto them.

use enum_iterator::Sequence;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::ClrType;

/// The storage types supported by the Engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    Bit,
    Tinyint,
    Smallint,
    Int,
    Bigint,
    Real,
    Float,
    #[serde(rename = "decimal(18,2)")]
    Decimal,
    #[serde(rename = "decimal(20,0)")]
    DecimalWide,
    #[serde(rename = "nchar(1)")]
    Char,
    #[serde(rename = "nvarchar(max)")]
    Nvarchar,
    Datetime2,
    Datetimeoffset,
    Time,
    Uniqueidentifier,
    #[serde(rename = "varbinary(max)")]
    Varbinary,
}

impl StoreType {
    /// The name of the type as written in SQL.
    pub fn name(&self) -> &'static str {
        match self {
            StoreType::Bit => "bit",
            StoreType::Tinyint => "tinyint",
            StoreType::Smallint => "smallint",
            StoreType::Int => "int",
            StoreType::Bigint => "bigint",
            StoreType::Real => "real",
            StoreType::Float => "float",
            StoreType::Decimal => "decimal(18,2)",
            StoreType::DecimalWide => "decimal(20,0)",
            StoreType::Char => "nchar(1)",
            StoreType::Nvarchar => "nvarchar(max)",
            StoreType::Datetime2 => "datetime2",
            StoreType::Datetimeoffset => "datetimeoffset",
            StoreType::Time => "time",
            StoreType::Uniqueidentifier => "uniqueidentifier",
            StoreType::Varbinary => "varbinary(max)",
        }
    }
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How values of a conceptual type are stored and compared in the database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeMapping {
    pub store_type: StoreType,
    pub clr_type: ClrType,
}

/// Resolves conceptual types to storage types.
///
/// Implementations must be pure: the translator asks repeatedly for the same
/// type and expects the same answer.
pub trait TypeMappingSource {
    fn find_mapping(&self, clr_type: &ClrType) -> Option<TypeMapping>;
}

/// The mappings of a SQL Server-like engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeMappingSource;

impl DefaultTypeMappingSource {
    fn store_type(clr_type: &ClrType) -> Option<StoreType> {
        match clr_type {
            ClrType::Boolean => Some(StoreType::Bit),
            ClrType::Byte => Some(StoreType::Tinyint),
            ClrType::SByte | ClrType::Int16 => Some(StoreType::Smallint),
            ClrType::UInt16 | ClrType::Int32 => Some(StoreType::Int),
            ClrType::UInt32 | ClrType::Int64 => Some(StoreType::Bigint),
            ClrType::UInt64 => Some(StoreType::DecimalWide),
            ClrType::Single => Some(StoreType::Real),
            ClrType::Double => Some(StoreType::Float),
            ClrType::Decimal => Some(StoreType::Decimal),
            ClrType::Char => Some(StoreType::Char),
            ClrType::String => Some(StoreType::Nvarchar),
            ClrType::DateTime => Some(StoreType::Datetime2),
            ClrType::DateTimeOffset => Some(StoreType::Datetimeoffset),
            ClrType::TimeSpan => Some(StoreType::Time),
            ClrType::Guid => Some(StoreType::Uniqueidentifier),
            ClrType::Binary => Some(StoreType::Varbinary),
            ClrType::UserEnum { underlying, .. } => Self::store_type(underlying),
            ClrType::Nullable(inner) => Self::store_type(inner),
            ClrType::Enum
            | ClrType::Object
            | ClrType::Type
            | ClrType::Structural(_)
            | ClrType::Sequence(_) => None,
        }
    }
}

impl TypeMappingSource for DefaultTypeMappingSource {
    fn find_mapping(&self, clr_type: &ClrType) -> Option<TypeMapping> {
        Self::store_type(clr_type).map(|store_type| TypeMapping {
            store_type,
            clr_type: clr_type.unwrap_nullable().clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_type_names_match_their_serialized_form() {
        for store_type in enum_iterator::all::<StoreType>() {
            let serialized = serde_json::to_value(store_type).unwrap();
            assert_eq!(
                serialized,
                serde_json::Value::String(store_type.name().to_string()),
                "The store type {store_type:?} is serialized under a different name."
            );
        }
    }

    #[test]
    fn enums_and_nullables_map_through_their_underlying_type() {
        let source = DefaultTypeMappingSource;
        let priority = ClrType::UserEnum {
            name: "Priority".into(),
            underlying: Box::new(ClrType::Int16),
        };
        let mapping = source
            .find_mapping(&ClrType::nullable(priority.clone()))
            .unwrap();
        assert_eq!(mapping.store_type, StoreType::Smallint);
        assert_eq!(mapping.clr_type, priority);
    }

    #[test]
    fn object_and_structural_types_are_not_mappable() {
        let source = DefaultTypeMappingSource;
        assert_eq!(source.find_mapping(&ClrType::Object), None);
        assert_eq!(source.find_mapping(&ClrType::structural("Customer")), None);
        assert_eq!(source.find_mapping(&ClrType::Type), None);
    }
}
