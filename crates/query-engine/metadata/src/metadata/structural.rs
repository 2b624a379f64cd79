//! Structural types of the conceptual model: entity types arranged in
//! inheritance hierarchies, and complex (value object) types nested in them.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::ClrType;

/// Mapping from a structural type name to its information.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct StructuralTypes(pub BTreeMap<String, StructuralTypeInfo>);

impl StructuralTypes {
    pub fn empty() -> Self {
        StructuralTypes(BTreeMap::new())
    }
}

/// Whether a structural type has identity of its own.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum StructuralKind {
    #[default]
    Entity,
    Complex,
}

/// How an inheritance hierarchy is spread over tables.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub enum MappingStrategy {
    /// Table per hierarchy: one table and a discriminator column.
    #[default]
    Tph,
    /// Table per type: a table for every type, joined.
    Tpt,
    /// Table per concrete type: a table for every concrete type, unioned.
    Tpc,
}

/// The table an entity type is stored in.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableMapping {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    /// This type is an optional dependent of a one-to-one relationship and
    /// shares its table with the principal.
    #[serde(default)]
    pub is_optional_dependent: bool,
}

/// Information about a structural type.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StructuralTypeInfo {
    #[serde(default)]
    pub kind: StructuralKind,
    #[serde(default)]
    pub base_type: Option<String>,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub discriminator_value: Option<serde_json::Value>,
    /// Scalar properties declared on this type (not inherited ones).
    #[serde(default)]
    pub properties: IndexMap<String, PropertyInfo>,
    #[serde(default)]
    pub complex_properties: IndexMap<String, ComplexPropertyInfo>,
    // The following are only meaningful on the root of a hierarchy.
    #[serde(default)]
    pub primary_key: Option<Vec<String>>,
    #[serde(default)]
    pub discriminator_property: Option<String>,
    #[serde(default)]
    pub mapping_strategy: MappingStrategy,
    #[serde(default = "default_true")]
    pub discriminator_mapping_complete: bool,
    #[serde(default)]
    pub table: Option<TableMapping>,
}

fn default_true() -> bool {
    true
}

/// Information about a scalar property.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
    pub column: String,
    pub r#type: ClrType,
    #[serde(default)]
    pub nullable: bool,
    /// The column is also mapped to a property of the principal sharing the table.
    #[serde(default)]
    pub shared_with_principal: bool,
    /// Only reachable through indexed access (`entity["Name"]`).
    #[serde(default)]
    pub is_indexer: bool,
}

/// Information about a property holding a nested structural value.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplexPropertyInfo {
    pub complex_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub is_collection: bool,
}

impl StructuralTypes {
    pub fn get(&self, name: &str) -> Option<&StructuralTypeInfo> {
        self.0.get(name)
    }

    pub fn is_entity_type(&self, name: &str) -> bool {
        self.get(name)
            .is_some_and(|info| info.kind == StructuralKind::Entity)
    }

    /// The base types of a type, closest first.
    pub fn base_types(&self, name: &str) -> Vec<&str> {
        let mut bases = vec![];
        let mut current = self.get(name).and_then(|info| info.base_type.as_deref());
        while let Some(base) = current {
            bases.push(base);
            current = self.get(base).and_then(|info| info.base_type.as_deref());
        }
        bases
    }

    /// The type itself followed by its base types, closest first.
    pub fn base_types_inclusive<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut types = vec![name];
        types.extend(self.base_types(name));
        types
    }

    pub fn root_type<'a>(&'a self, name: &'a str) -> &'a str {
        self.base_types(name).last().copied().unwrap_or(name)
    }

    pub fn directly_derived_types(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, info)| info.base_type.as_deref() == Some(name))
            .map(|(derived, _)| derived.as_str())
            .collect()
    }

    /// All types deriving from this one, at any depth.
    pub fn derived_types(&self, name: &str) -> Vec<&str> {
        let mut derived = vec![];
        let mut pending = self.directly_derived_types(name);
        pending.reverse();
        while let Some(next) = pending.pop() {
            derived.push(next);
            let mut children = self.directly_derived_types(next);
            children.reverse();
            pending.extend(children);
        }
        derived
    }

    pub fn derived_types_inclusive<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut types = vec![name];
        types.extend(self.derived_types(name));
        types
    }

    pub fn concrete_derived_types_inclusive<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        self.derived_types_inclusive(name)
            .into_iter()
            .filter(|ty| !self.is_abstract(ty))
            .collect()
    }

    pub fn is_abstract(&self, name: &str) -> bool {
        self.get(name).is_some_and(|info| info.is_abstract)
    }

    /// Does the type take part in an inheritance hierarchy.
    pub fn has_hierarchy(&self, name: &str) -> bool {
        self.get(name).is_some_and(|info| info.base_type.is_some())
            || !self.directly_derived_types(name).is_empty()
    }

    /// Is `derived` the same type as `base` or one of its descendants.
    pub fn is_assignable_from(&self, base: &str, derived: &str) -> bool {
        self.base_types_inclusive(derived).contains(&base)
    }

    /// Scalar properties of the type, inherited ones first.
    pub fn properties(&self, name: &str) -> Vec<(&str, &PropertyInfo)> {
        let mut hierarchy = self.base_types_inclusive(name);
        hierarchy.reverse();
        hierarchy
            .into_iter()
            .filter_map(|ty| self.get(ty))
            .flat_map(|info| {
                info.properties
                    .iter()
                    .map(|(property, info)| (property.as_str(), info))
            })
            .collect()
    }

    /// Complex properties of the type, inherited ones first.
    pub fn complex_properties(&self, name: &str) -> Vec<(&str, &ComplexPropertyInfo)> {
        let mut hierarchy = self.base_types_inclusive(name);
        hierarchy.reverse();
        hierarchy
            .into_iter()
            .filter_map(|ty| self.get(ty))
            .flat_map(|info| {
                info.complex_properties
                    .iter()
                    .map(|(property, info)| (property.as_str(), info))
            })
            .collect()
    }

    /// Find a scalar property declared on this type or inherited by it.
    pub fn find_property(&self, name: &str, property: &str) -> Option<&PropertyInfo> {
        self.base_types_inclusive(name)
            .into_iter()
            .filter_map(|ty| self.get(ty))
            .find_map(|info| info.properties.get(property))
    }

    pub fn find_complex_property(&self, name: &str, property: &str) -> Option<&ComplexPropertyInfo> {
        self.base_types_inclusive(name)
            .into_iter()
            .filter_map(|ty| self.get(ty))
            .find_map(|info| info.complex_properties.get(property))
    }

    fn root_info(&self, name: &str) -> Option<&StructuralTypeInfo> {
        self.get(self.root_type(name))
    }

    pub fn primary_key(&self, name: &str) -> Option<&[String]> {
        self.root_info(name)
            .and_then(|info| info.primary_key.as_deref())
    }

    pub fn is_primary_key(&self, name: &str, property: &str) -> bool {
        self.primary_key(name)
            .is_some_and(|key| key.iter().any(|part| part.as_str() == property))
    }

    pub fn discriminator_property(&self, name: &str) -> Option<&str> {
        self.root_info(name)
            .and_then(|info| info.discriminator_property.as_deref())
    }

    pub fn mapping_strategy(&self, name: &str) -> MappingStrategy {
        self.root_info(name)
            .map(|info| info.mapping_strategy)
            .unwrap_or_default()
    }

    pub fn is_discriminator_mapping_complete(&self, name: &str) -> bool {
        self.root_info(name)
            .map_or(true, |info| info.discriminator_mapping_complete)
    }

    pub fn discriminator_value(&self, name: &str) -> Option<&serde_json::Value> {
        self.get(name)
            .and_then(|info| info.discriminator_value.as_ref())
    }

    /// The table of the type: its own, or the closest one in its base types.
    pub fn table(&self, name: &str) -> Option<&TableMapping> {
        self.base_types_inclusive(name)
            .into_iter()
            .filter_map(|ty| self.get(ty))
            .find_map(|info| info.table.as_ref())
    }

    /// Properties whose columns belong to the dependent alone, i.e. are not
    /// shared with the principal and are not part of the key.
    pub fn non_principal_shared_non_key_properties(&self, name: &str) -> Vec<(&str, &PropertyInfo)> {
        self.properties(name)
            .into_iter()
            .filter(|(property, info)| {
                !info.shared_with_principal && !self.is_primary_key(name, property)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(base: Option<&str>, is_abstract: bool) -> StructuralTypeInfo {
        StructuralTypeInfo {
            base_type: base.map(ToString::to_string),
            is_abstract,
            discriminator_mapping_complete: true,
            ..StructuralTypeInfo::default()
        }
    }

    fn animals() -> StructuralTypes {
        StructuralTypes(BTreeMap::from([
            ("Animal".to_string(), entity(None, true)),
            ("Bird".to_string(), entity(Some("Animal"), true)),
            ("Eagle".to_string(), entity(Some("Bird"), false)),
            ("Kiwi".to_string(), entity(Some("Bird"), false)),
            ("Fish".to_string(), entity(Some("Animal"), false)),
        ]))
    }

    #[test]
    fn derived_types_are_listed_depth_first() {
        let types = animals();
        similar_asserts::assert_eq!(
            types.derived_types("Animal"),
            vec!["Bird", "Eagle", "Kiwi", "Fish"]
        );
        assert_eq!(
            types.concrete_derived_types_inclusive("Bird"),
            vec!["Eagle", "Kiwi"]
        );
    }

    #[test]
    fn base_types_walk_up_to_the_root() {
        let types = animals();
        assert_eq!(types.base_types("Eagle"), vec!["Bird", "Animal"]);
        assert_eq!(types.root_type("Eagle"), "Animal");
        assert_eq!(types.root_type("Animal"), "Animal");
        assert!(types.is_assignable_from("Bird", "Kiwi"));
        assert!(!types.is_assignable_from("Fish", "Kiwi"));
    }
}
