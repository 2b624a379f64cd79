//! Structural row projections: which SQL expression stands for every member
//! of a structural type in a row.

use indexmap::IndexMap;

use super::ast::Expression;

/// The columns (or computed expressions) a structural type is materialized from.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralTypeProjection {
    pub structural_type: String,
    pub property_map: IndexMap<String, Expression>,
    pub complex_property_map: IndexMap<String, ComplexPropertyBinding>,
    /// Computes the discriminator value of the row when the hierarchy is
    /// spread over several tables.
    pub discriminator: Option<Box<Expression>>,
    /// The whole row may be missing, e.g. on the dependent side of a left join.
    pub nullable: bool,
}

/// A complex property of a row: either a nested projection, or a single
/// expression holding the whole collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ComplexPropertyBinding {
    Single(StructuralTypeProjection),
    Collection(Expression),
}

impl StructuralTypeProjection {
    pub fn new(structural_type: impl Into<String>) -> Self {
        StructuralTypeProjection {
            structural_type: structural_type.into(),
            property_map: IndexMap::new(),
            complex_property_map: IndexMap::new(),
            discriminator: None,
            nullable: false,
        }
    }

    #[must_use]
    pub fn with_property(mut self, property: impl Into<String>, expression: Expression) -> Self {
        self.property_map.insert(property.into(), expression);
        self
    }

    #[must_use]
    pub fn with_complex_property(
        mut self,
        property: impl Into<String>,
        binding: ComplexPropertyBinding,
    ) -> Self {
        self.complex_property_map.insert(property.into(), binding);
        self
    }

    #[must_use]
    pub fn with_discriminator(mut self, discriminator: Expression) -> Self {
        self.discriminator = Some(Box::new(discriminator));
        self
    }

    pub fn bind_property(&self, property: &str) -> Option<&Expression> {
        self.property_map.get(property)
    }

    pub fn bind_complex_property(&self, property: &str) -> Option<&ComplexPropertyBinding> {
        self.complex_property_map.get(property)
    }

    /// The same row seen as one of its derived types.
    #[must_use]
    pub fn narrow_to(&self, derived_type: &str) -> Self {
        StructuralTypeProjection {
            structural_type: derived_type.to_string(),
            ..self.clone()
        }
    }

    /// Every scalar expression of the row, nested projections included, in
    /// declaration order. Used when the row must be flattened into a select list.
    pub fn columns(&self) -> Vec<(String, Expression)> {
        let mut columns: Vec<(String, Expression)> = self
            .property_map
            .iter()
            .map(|(property, expression)| (property.clone(), expression.clone()))
            .collect();
        for (property, binding) in &self.complex_property_map {
            match binding {
                ComplexPropertyBinding::Single(nested) => {
                    columns.extend(
                        nested
                            .columns()
                            .into_iter()
                            .map(|(inner, expression)| (format!("{property}_{inner}"), expression)),
                    );
                }
                ComplexPropertyBinding::Collection(expression) => {
                    columns.push((property.clone(), expression.clone()));
                }
            }
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use query_engine_metadata::metadata::ClrType;

    use super::*;
    use crate::sql::helpers;

    #[test]
    fn nested_columns_are_prefixed_with_their_property() {
        let alias = helpers::make_table_alias(0, "c".to_string());
        let column = |name: &str| helpers::make_column(alias.clone(), name, ClrType::Int32, None, false);
        let address = StructuralTypeProjection::new("Address")
            .with_property("ZipCode", column("ShippingAddress_ZipCode"));
        let customer = StructuralTypeProjection::new("Customer")
            .with_property("Id", column("Id"))
            .with_complex_property("ShippingAddress", ComplexPropertyBinding::Single(address));

        let names: Vec<String> = customer.columns().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Id", "ShippingAddress_ZipCode"]);
    }
}
