//! Structural values met while translating: rows of the current query and
//! single-row subqueries, and complex collections.

use query_engine_metadata::metadata::{ClrType, StructuralTypes};
use query_engine_sql::sql;

use crate::translation::expression::{ShapedQuery, StructuralTypeShaper};

/// A structural value which has no single SQL expression of its own. Its
/// properties are bound one by one when accessed.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralTypeReference {
    /// A row of a table in scope.
    Row(StructuralTypeShaper),
    /// The single row of a subquery, seen as `structural_type`.
    Subquery {
        query: ShapedQuery,
        structural_type: String,
    },
}

/// A complex collection property, stored whole in one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionResult {
    pub expression: sql::ast::Expression,
    pub complex_type: String,
}

impl StructuralTypeReference {
    /// The type the value is currently seen as.
    pub fn structural_type(&self) -> &str {
        match self {
            StructuralTypeReference::Row(shaper) => &shaper.structural_type,
            StructuralTypeReference::Subquery {
                structural_type, ..
            } => structural_type,
        }
    }

    pub fn r#type(&self) -> ClrType {
        ClrType::structural(self.structural_type())
    }

    /// Can the whole value be missing.
    pub fn is_nullable(&self) -> bool {
        match self {
            StructuralTypeReference::Row(shaper) => shaper.nullable,
            StructuralTypeReference::Subquery { .. } => true,
        }
    }

    /// View the value as another type.
    ///
    /// Casting to `object` or to a base type keeps the reference as it is,
    /// casting to a derived type narrows it.
    pub fn convert(&self, types: &StructuralTypes, target: &ClrType) -> Conversion {
        if *target.unwrap_nullable() == ClrType::Object {
            return Conversion::Unchanged;
        }
        let Some(target) = target.structural_type_name() else {
            return Conversion::Unsupported;
        };
        let current = self.structural_type();
        if types.is_assignable_from(target, current) {
            Conversion::Unchanged
        } else if types.is_assignable_from(current, target) {
            Conversion::Narrowed(match self {
                StructuralTypeReference::Row(shaper) => {
                    StructuralTypeReference::Row(StructuralTypeShaper {
                        structural_type: target.to_string(),
                        projection: shaper.projection.narrow_to(target),
                        nullable: shaper.nullable,
                    })
                }
                StructuralTypeReference::Subquery { query, .. } => {
                    StructuralTypeReference::Subquery {
                        query: query.clone(),
                        structural_type: target.to_string(),
                    }
                }
            })
        } else {
            Conversion::Unsupported
        }
    }
}

/// The outcome of casting a structural value.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Unchanged,
    /// Seen as a derived type.
    Narrowed(StructuralTypeReference),
    /// Neither a base nor a derived type.
    Unsupported,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use query_engine_metadata::metadata::StructuralTypeInfo;

    use super::*;

    fn vehicles() -> StructuralTypes {
        let derived = |base: &str| StructuralTypeInfo {
            base_type: Some(base.to_string()),
            ..StructuralTypeInfo::default()
        };
        StructuralTypes(BTreeMap::from([
            ("Vehicle".to_string(), StructuralTypeInfo::default()),
            ("Car".to_string(), derived("Vehicle")),
            ("Boat".to_string(), derived("Vehicle")),
        ]))
    }

    fn row(structural_type: &str) -> StructuralTypeReference {
        StructuralTypeReference::Row(StructuralTypeShaper {
            structural_type: structural_type.to_string(),
            projection: sql::projection::StructuralTypeProjection::new(structural_type),
            nullable: false,
        })
    }

    #[test]
    fn casts_follow_the_hierarchy() {
        let types = vehicles();
        let vehicle = row("Vehicle");

        assert_eq!(vehicle.convert(&types, &ClrType::Object), Conversion::Unchanged);
        assert_eq!(
            vehicle.convert(&types, &ClrType::structural("Car")),
            Conversion::Narrowed(StructuralTypeReference::Row(StructuralTypeShaper {
                structural_type: "Car".to_string(),
                projection: sql::projection::StructuralTypeProjection::new("Vehicle")
                    .narrow_to("Car"),
                nullable: false,
            }))
        );
        assert_eq!(
            row("Car").convert(&types, &ClrType::structural("Vehicle")),
            Conversion::Unchanged
        );
        assert_eq!(
            row("Car").convert(&types, &ClrType::structural("Boat")),
            Conversion::Unsupported
        );
        assert_eq!(vehicle.convert(&types, &ClrType::Int32), Conversion::Unsupported);
    }
}
