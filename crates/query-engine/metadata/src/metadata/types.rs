//! Conceptual (object model side) types of query expressions.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// The conceptual type of an expression, as seen by the object model.
///
/// Value types become nullable only through [`ClrType::Nullable`]; reference
/// types (strings, binary data, structural types, sequences, `Object`) are
/// always nullable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ClrType {
    Boolean,
    Byte,
    SByte,
    Char,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    String,
    DateTime,
    DateTimeOffset,
    TimeSpan,
    Guid,
    Binary,
    /// The abstract base of all enums.
    Enum,
    /// A user defined enum backed by an integral type.
    UserEnum {
        name: SmolStr,
        underlying: Box<ClrType>,
    },
    Object,
    /// The type of `typeof(T)` values.
    Type,
    /// An entity or complex type of the model, by name.
    Structural(SmolStr),
    Sequence(Box<ClrType>),
    Nullable(Box<ClrType>),
}

impl ClrType {
    pub fn structural(name: impl Into<SmolStr>) -> ClrType {
        ClrType::Structural(name.into())
    }

    pub fn nullable(inner: ClrType) -> ClrType {
        inner.make_nullable()
    }

    pub fn sequence(element: ClrType) -> ClrType {
        ClrType::Sequence(Box::new(element))
    }

    /// Strip a `Nullable` wrapper, if any.
    pub fn unwrap_nullable(&self) -> &ClrType {
        match self {
            ClrType::Nullable(inner) => inner,
            other => other,
        }
    }

    /// Wrap value types in `Nullable`. Reference types are returned unchanged.
    pub fn make_nullable(self) -> ClrType {
        if self.is_value_type() {
            ClrType::Nullable(Box::new(self))
        } else {
            self
        }
    }

    pub fn is_value_type(&self) -> bool {
        !matches!(
            self,
            ClrType::String
                | ClrType::Binary
                | ClrType::Object
                | ClrType::Type
                | ClrType::Enum
                | ClrType::Structural(_)
                | ClrType::Sequence(_)
                | ClrType::Nullable(_)
        )
    }

    /// Can a value of this type be null.
    pub fn is_nullable_type(&self) -> bool {
        !self.is_value_type()
    }

    pub fn is_boolean(&self) -> bool {
        *self.unwrap_nullable() == ClrType::Boolean
    }

    pub fn is_user_enum(&self) -> bool {
        matches!(self.unwrap_nullable(), ClrType::UserEnum { .. })
    }

    /// The integral type backing an enum, or the type itself.
    pub fn underlying_enum_type(&self) -> &ClrType {
        match self.unwrap_nullable() {
            ClrType::UserEnum { underlying, .. } => underlying,
            other => other,
        }
    }

    pub fn structural_type_name(&self) -> Option<&str> {
        match self.unwrap_nullable() {
            ClrType::Structural(name) => Some(name),
            _ => None,
        }
    }

    pub fn sequence_element_type(&self) -> Option<&ClrType> {
        match self {
            ClrType::Sequence(element) => Some(element),
            _ => None,
        }
    }

    /// Widening from these types to a four byte integer does not change the
    /// stored representation.
    pub fn widens_implicitly_to_int32(&self) -> bool {
        matches!(
            self,
            ClrType::Byte | ClrType::SByte | ClrType::Char | ClrType::Int16 | ClrType::UInt16
        )
    }

    /// The default value of a value type, as a JSON literal.
    pub fn default_value(&self) -> serde_json::Value {
        match self {
            ClrType::Boolean => serde_json::Value::Bool(false),
            ClrType::Byte
            | ClrType::SByte
            | ClrType::Int16
            | ClrType::UInt16
            | ClrType::Int32
            | ClrType::UInt32
            | ClrType::Int64
            | ClrType::UInt64
            | ClrType::Decimal => serde_json::Value::from(0),
            ClrType::Single | ClrType::Double => serde_json::Value::from(0.0),
            ClrType::UserEnum { underlying, .. } => underlying.default_value(),
            _ => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for ClrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClrType::Boolean => write!(f, "bool"),
            ClrType::Byte => write!(f, "byte"),
            ClrType::SByte => write!(f, "sbyte"),
            ClrType::Char => write!(f, "char"),
            ClrType::Int16 => write!(f, "short"),
            ClrType::UInt16 => write!(f, "ushort"),
            ClrType::Int32 => write!(f, "int"),
            ClrType::UInt32 => write!(f, "uint"),
            ClrType::Int64 => write!(f, "long"),
            ClrType::UInt64 => write!(f, "ulong"),
            ClrType::Single => write!(f, "float"),
            ClrType::Double => write!(f, "double"),
            ClrType::Decimal => write!(f, "decimal"),
            ClrType::String => write!(f, "string"),
            ClrType::DateTime => write!(f, "DateTime"),
            ClrType::DateTimeOffset => write!(f, "DateTimeOffset"),
            ClrType::TimeSpan => write!(f, "TimeSpan"),
            ClrType::Guid => write!(f, "Guid"),
            ClrType::Binary => write!(f, "byte[]"),
            ClrType::Enum => write!(f, "Enum"),
            ClrType::UserEnum { name, .. } | ClrType::Structural(name) => write!(f, "{name}"),
            ClrType::Object => write!(f, "object"),
            ClrType::Type => write!(f, "Type"),
            ClrType::Sequence(element) => write!(f, "IEnumerable<{element}>"),
            ClrType::Nullable(inner) => write!(f, "{inner}?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_types_are_not_wrapped_in_nullable() {
        assert_eq!(ClrType::String.make_nullable(), ClrType::String);
        assert_eq!(
            ClrType::structural("Customer").make_nullable(),
            ClrType::structural("Customer")
        );
        assert_eq!(
            ClrType::Int32.make_nullable(),
            ClrType::Nullable(Box::new(ClrType::Int32))
        );
    }

    #[test]
    fn nullable_wrappers_are_idempotent() {
        let once = ClrType::nullable(ClrType::Int64);
        assert_eq!(once.clone().make_nullable(), once);
        assert_eq!(once.unwrap_nullable(), &ClrType::Int64);
        assert!(once.is_nullable_type());
    }

    #[test]
    fn enums_expose_their_underlying_type() {
        let status = ClrType::UserEnum {
            name: "OrderStatus".into(),
            underlying: Box::new(ClrType::Byte),
        };
        assert_eq!(
            ClrType::nullable(status.clone()).underlying_enum_type(),
            &ClrType::Byte
        );
        assert_eq!(status.to_string(), "OrderStatus");
    }
}
