//! Build the SELECT reading all entities of a type.
//!
//! Subquery translators start from these selects. The projection of every
//! property of the type and of its derived types is registered under the root
//! projection member, so that narrowed references can bind the properties of
//! derived types too.

use std::collections::{BTreeMap, BTreeSet};

use query_engine_metadata::metadata::{self, ClrType, MappingStrategy, TypeMappingSource};
use query_engine_sql::sql;
use sql::projection::{ComplexPropertyBinding, StructuralTypeProjection};
use sql::select::{Projection, ProjectionMember, SelectExpression};

use super::error::Error;
use super::values;
use crate::translation::expression::StructuralTypeShaper;

/// Hands out table aliases: the first letter of the table, with a numeric
/// suffix once taken.
#[derive(Debug, Clone, Default)]
pub struct AliasGenerator {
    next_index: u64,
    used: BTreeSet<String>,
}

impl AliasGenerator {
    pub fn new() -> Self {
        AliasGenerator::default()
    }

    pub fn next(&mut self, table_name: &str) -> sql::ast::TableAlias {
        let base = table_name
            .chars()
            .next()
            .map_or_else(|| "t".to_string(), |c| c.to_lowercase().to_string());
        let mut candidate = base.clone();
        let mut counter = 0;
        while self.used.contains(&candidate) {
            candidate = format!("{base}{counter}");
            counter += 1;
        }
        self.used.insert(candidate.clone());
        let alias = sql::helpers::make_table_alias(self.next_index, candidate);
        self.next_index += 1;
        alias
    }
}

/// A select of all entities of `structural_type`, and the shaper of its rows.
pub fn select_structural_type(
    metadata: &metadata::Metadata,
    type_mapping_source: &dyn TypeMappingSource,
    aliases: &mut AliasGenerator,
    structural_type: &str,
) -> Result<(SelectExpression, StructuralTypeShaper), Error> {
    let types = &metadata.structural_types;
    if !types.is_entity_type(structural_type) {
        return Err(Error::StructuralTypeNotFound(structural_type.to_string()));
    }
    let builder = ProjectionBuilder {
        types,
        type_mapping_source,
    };

    let (mut select, projection) = match types.mapping_strategy(structural_type) {
        MappingStrategy::Tph => builder.select_tph(aliases, structural_type)?,
        MappingStrategy::Tpt => builder.select_tpt(aliases, structural_type)?,
        MappingStrategy::Tpc => builder.select_tpc(aliases, structural_type)?,
    };

    select.add_projection(
        ProjectionMember::root(),
        Projection::Structural(projection.clone()),
    );
    let shaper = StructuralTypeShaper {
        structural_type: structural_type.to_string(),
        projection,
        nullable: false,
    };

    tracing::debug!("root select of {structural_type}: {:?}", select);
    Ok((select, shaper))
}

struct ProjectionBuilder<'a> {
    types: &'a metadata::StructuralTypes,
    type_mapping_source: &'a dyn TypeMappingSource,
}

impl<'a> ProjectionBuilder<'a> {
    fn table(&self, structural_type: &str) -> Result<&'a metadata::TableMapping, Error> {
        self.types.table(structural_type).ok_or_else(|| {
            Error::Internal(format!(
                "The entity type '{structural_type}' is not mapped to a table."
            ))
        })
    }

    /// One table, and a discriminator column telling the types apart.
    fn select_tph(
        &self,
        aliases: &mut AliasGenerator,
        structural_type: &str,
    ) -> Result<(SelectExpression, StructuralTypeProjection), Error> {
        let root = self.types.root_type(structural_type);
        let table = self.table(root)?;
        let alias = aliases.next(&table.name);
        let mut select = SelectExpression::new(from_table(table, alias.clone()));
        let projection = self.project(structural_type, &|_| Some(alias.clone()));

        // rows with unmapped discriminator values are skipped
        if structural_type != root || !self.types.is_discriminator_mapping_complete(root) {
            if let Some(column) = self
                .types
                .discriminator_property(root)
                .and_then(|property| projection.bind_property(property))
            {
                let mut discriminator_values = vec![];
                for derived in self.types.concrete_derived_types_inclusive(structural_type) {
                    if let Some(value) = self.types.discriminator_value(derived) {
                        discriminator_values.push(self.constant(value, &column.r#type)?);
                    }
                }
                select.apply_predicate(sql::helpers::in_values(column.clone(), discriminator_values));
            }
        }

        Ok((select, projection))
    }

    /// A table per type, left joined to the root table on the key. The
    /// discriminator is computed from which joined rows are present.
    fn select_tpt(
        &self,
        aliases: &mut AliasGenerator,
        structural_type: &str,
    ) -> Result<(SelectExpression, StructuralTypeProjection), Error> {
        let root = self.types.root_type(structural_type);
        let root_table = self.table(root)?;
        let key = self.types.primary_key(root).unwrap_or_default();
        let key_column = |ty: &str, property: &str| {
            self.types
                .find_property(ty, property)
                .map_or_else(|| property.to_string(), |info| info.column.clone())
        };

        let mut table_aliases: BTreeMap<&str, sql::ast::TableAlias> = BTreeMap::new();
        let root_alias = aliases.next(&root_table.name);
        table_aliases.insert(root, root_alias.clone());
        let mut select = SelectExpression::new(from_table(root_table, root_alias.clone()));

        for derived in self.types.derived_types(root) {
            let Some(table) = self.types.get(derived).and_then(|info| info.table.as_ref()) else {
                continue;
            };
            let alias = aliases.next(&table.name);
            let on = sql::helpers::conjunction(key.iter().map(|property| {
                let column = key_column(derived, property);
                sql::helpers::equal(
                    self.key_column(&alias, derived, property, &column),
                    self.key_column(&root_alias, root, property, &column),
                )
            }))
            .unwrap_or_else(sql::helpers::true_expr);
            select.joins.push(sql::ast::Join::LeftOuterJoin(sql::ast::LeftOuterJoin {
                table: from_table(table, alias.clone()),
                on,
            }));
            table_aliases.insert(derived, alias);
        }

        // properties live in the table of their declaring type, or of its
        // closest base with a table; keys are read from the root table
        let alias_of = |declaring_type: &str| {
            self.types
                .base_types_inclusive(declaring_type)
                .into_iter()
                .find_map(|ty| table_aliases.get(ty).cloned())
        };
        let mut projection = self.project(structural_type, &alias_of);

        let presence_test = |ty: &str| {
            let alias = table_aliases.get(ty)?;
            let property = key.first()?;
            let column = key_column(ty, property);
            Some(sql::helpers::is_not_null(self.key_column(alias, ty, property, &column)))
        };

        let mut when_clauses = vec![];
        for derived in self.types.derived_types(root).into_iter().rev() {
            if self.types.is_abstract(derived) {
                continue;
            }
            if let Some(test) = presence_test(derived) {
                when_clauses.push(sql::ast::CaseWhenClause {
                    test,
                    result: self.type_name_constant(derived),
                });
            }
        }
        if !when_clauses.is_empty() {
            let r#type = ClrType::String;
            projection = projection.with_discriminator(sql::ast::Expression {
                kind: sql::ast::ExpressionKind::Case {
                    operand: None,
                    when_clauses,
                    else_result: None,
                },
                type_mapping: self.type_mapping_source.find_mapping(&r#type),
                r#type,
            });
        }

        if structural_type != root {
            if let Some(test) = presence_test(structural_type) {
                select.apply_predicate(test);
            }
        }

        Ok((select, projection))
    }

    /// A table per concrete type. Only hierarchies with a single concrete
    /// type below the queried one are read, as no union is built.
    fn select_tpc(
        &self,
        aliases: &mut AliasGenerator,
        structural_type: &str,
    ) -> Result<(SelectExpression, StructuralTypeProjection), Error> {
        match self
            .types
            .concrete_derived_types_inclusive(structural_type)
            .as_slice()
        {
            [concrete] => {
                let table = self.table(concrete)?;
                let alias = aliases.next(&table.name);
                let select = SelectExpression::new(from_table(table, alias.clone()));
                let projection = self.project(structural_type, &|_| Some(alias.clone()));
                Ok((select, projection))
            }
            _ => Err(Error::Internal(format!(
                "Reading '{structural_type}' needs a union over several tables, which is not supported."
            ))),
        }
    }

    fn key_column(
        &self,
        alias: &sql::ast::TableAlias,
        structural_type: &str,
        property: &str,
        column: &str,
    ) -> sql::ast::Expression {
        let r#type = self
            .types
            .find_property(structural_type, property)
            .map_or(ClrType::Int32, |info| info.r#type.clone());
        let mapping = self.type_mapping_source.find_mapping(&r#type);
        sql::helpers::make_column(alias.clone(), column, r#type, mapping, false)
    }

    /// The projection of a type: the properties of the type, its base types
    /// and its derived types.
    fn project(
        &self,
        structural_type: &str,
        alias_of: &dyn Fn(&str) -> Option<sql::ast::TableAlias>,
    ) -> StructuralTypeProjection {
        let root = self.types.root_type(structural_type);
        let mut declaring_types = self.types.base_types_inclusive(structural_type);
        declaring_types.reverse();
        declaring_types.extend(self.types.derived_types(structural_type));

        let mut projection = StructuralTypeProjection::new(structural_type);
        for declaring_type in declaring_types {
            let (Some(info), Some(alias)) = (self.types.get(declaring_type), alias_of(declaring_type))
            else {
                continue;
            };
            // columns of derived types hold NULL in rows of other types
            let optional = declaring_type != root;
            for (name, property) in &info.properties {
                let nullable = property.nullable || optional;
                projection = projection.with_property(
                    name.as_str(),
                    self.column(&alias, &property.column, property, nullable),
                );
            }
            for (name, complex) in &info.complex_properties {
                projection = projection.with_complex_property(
                    name.as_str(),
                    self.project_complex(&alias, name, complex, optional),
                );
            }
        }
        projection
    }

    /// Complex values are stored inline, in columns prefixed by the path of
    /// properties leading to them. Collections are stored whole in one column.
    fn project_complex(
        &self,
        alias: &sql::ast::TableAlias,
        prefix: &str,
        complex: &metadata::ComplexPropertyInfo,
        optional: bool,
    ) -> ComplexPropertyBinding {
        if complex.is_collection {
            let r#type = ClrType::sequence(ClrType::structural(complex.complex_type.as_str()));
            return ComplexPropertyBinding::Collection(sql::helpers::make_column(
                alias.clone(),
                prefix,
                r#type,
                None,
                true,
            ));
        }

        let optional = optional || complex.nullable;
        let mut projection = StructuralTypeProjection::new(complex.complex_type.as_str());
        projection.nullable = complex.nullable;
        for (name, property) in self.types.properties(&complex.complex_type) {
            let column = format!("{prefix}_{}", property.column);
            projection = projection.with_property(
                name,
                self.column(alias, &column, property, property.nullable || optional),
            );
        }
        for (name, nested) in self.types.complex_properties(&complex.complex_type) {
            projection = projection.with_complex_property(
                name,
                self.project_complex(alias, &format!("{prefix}_{name}"), nested, optional),
            );
        }
        ComplexPropertyBinding::Single(projection)
    }

    fn column(
        &self,
        alias: &sql::ast::TableAlias,
        column: &str,
        property: &metadata::PropertyInfo,
        nullable: bool,
    ) -> sql::ast::Expression {
        let r#type = if property.nullable {
            property.r#type.clone().make_nullable()
        } else {
            property.r#type.clone()
        };
        let mapping = self.type_mapping_source.find_mapping(&r#type);
        sql::helpers::make_column(alias.clone(), column, r#type, mapping, nullable)
    }

    fn constant(
        &self,
        value: &serde_json::Value,
        r#type: &ClrType,
    ) -> Result<sql::ast::Expression, Error> {
        Ok(sql::ast::Expression {
            kind: sql::ast::ExpressionKind::Value(values::translate_json_value(value, r#type)?),
            r#type: r#type.clone(),
            type_mapping: self.type_mapping_source.find_mapping(r#type),
        })
    }

    fn type_name_constant(&self, structural_type: &str) -> sql::ast::Expression {
        let r#type = ClrType::String;
        sql::ast::Expression {
            kind: sql::ast::ExpressionKind::Value(sql::ast::Value::String(
                structural_type.to_string(),
            )),
            type_mapping: self.type_mapping_source.find_mapping(&r#type),
            r#type,
        }
    }
}

fn from_table(table: &metadata::TableMapping, alias: sql::ast::TableAlias) -> sql::ast::From {
    sql::ast::From::Table {
        reference: sql::ast::TableReference::DBTable {
            schema: table
                .schema
                .as_ref()
                .map(|schema| sql::ast::SchemaName(schema.clone())),
            table: sql::ast::TableName(table.name.clone()),
        },
        alias,
    }
}
