//! Bind member accesses to the columns of structural values.

use query_engine_metadata::metadata::{ClrType, MappingStrategy};
use query_engine_sql::sql;
use sql::projection::ComplexPropertyBinding;
use sql::select::Projection;

use super::error::Error;
use super::helpers::{Env, State};
use super::structural_reference::{CollectionResult, StructuralTypeReference};
use super::{translate_expression, Translation};
use crate::translation::expression::{QueryExpression, Shaper, StructuralTypeShaper};

/// Translate `instance.member`.
pub fn translate_member(
    env: &Env,
    state: &mut State,
    instance: Option<&QueryExpression>,
    member: &str,
    r#type: &ClrType,
) -> Result<Translation, Error> {
    // a member of a conditional is the conditional of the members
    if let Some(QueryExpression::Conditional {
        test,
        if_true,
        if_false,
    }) = instance
    {
        let distributed = QueryExpression::Conditional {
            test: test.clone(),
            if_true: Box::new(QueryExpression::member(
                (**if_true).clone(),
                member,
                r#type.clone(),
            )),
            if_false: Box::new(QueryExpression::member(
                (**if_false).clone(),
                member,
                r#type.clone(),
            )),
        };
        return translate_expression(env, state, &distributed);
    }

    let translated_instance = match instance {
        Some(instance) => Some(translate_expression(env, state, instance)?),
        None => None,
    };

    if let Some(Translation::StructuralReference(reference)) = &translated_instance {
        if let Some(bound) = try_bind_member(env, state, reference, member)? {
            return Ok(bound);
        }
    }

    let sql_instance = match translated_instance {
        None => None,
        Some(Translation::Sql(sql_instance)) => Some(sql_instance),
        Some(_) => return Ok(Translation::NotTranslated),
    };

    Ok(
        match env
            .providers
            .members
            .translate(&mut env.provider_context(state), sql_instance.as_ref(), member, r#type)
        {
            Some(translation) => Translation::Sql(translation),
            None => Translation::NotTranslated,
        },
    )
}

/// Bind a scalar or complex property of a structural value. Unknown members
/// are recorded as an explanation and give `None`.
pub fn try_bind_member(
    env: &Env,
    state: &mut State,
    reference: &StructuralTypeReference,
    member: &str,
) -> Result<Option<Translation>, Error> {
    let structural_type = reference.structural_type();
    let types = env.types();

    if types.find_property(structural_type, member).is_some() {
        return bind_property(env, reference, member).map(|column| Some(Translation::Sql(column)));
    }
    if let Some(complex) = types.find_complex_property(structural_type, member) {
        return bind_complex_property(reference, member, &complex.complex_type, complex.nullable)
            .map(Some);
    }

    state.errors.add(format!(
        "The member '{member}' of type '{structural_type}' could not be translated. It may be unmapped."
    ));
    Ok(None)
}

/// The expression of a scalar property of a structural value.
pub fn bind_property(
    env: &Env,
    reference: &StructuralTypeReference,
    property: &str,
) -> Result<sql::ast::Expression, Error> {
    match reference {
        StructuralTypeReference::Row(shaper) => bind_row_property(env, shaper, property),
        StructuralTypeReference::Subquery { query, .. } => {
            let Shaper::Structural { member, .. } = query.shaper.without_convert() else {
                return Err(Error::MemberOverCorrelatedSubquery {
                    member: property.to_string(),
                });
            };
            let Some(Projection::Structural(projection)) = query.query.get_projection(member) else {
                return Err(Error::MemberOverCorrelatedSubquery {
                    member: property.to_string(),
                });
            };
            let column = projection.bind_property(property).cloned().ok_or_else(|| {
                Error::Internal(format!(
                    "The property '{property}' is missing from the projection of '{}'.",
                    projection.structural_type
                ))
            })?;

            let mut select = query.query.clone();
            let r#type = column.r#type.clone().make_nullable();
            let type_mapping = column.type_mapping.clone();
            select.replace_projection(vec![column]);
            Ok(env
                .factory
                .scalar_subquery(select.apply_projection(), r#type, type_mapping))
        }
    }
}

/// A property of a row. For an optional dependent sharing the table of its
/// principal, properties read as NULL unless the dependent is present.
fn bind_row_property(
    env: &Env,
    shaper: &StructuralTypeShaper,
    property: &str,
) -> Result<sql::ast::Expression, Error> {
    let column = shaper
        .projection
        .bind_property(property)
        .cloned()
        .ok_or_else(|| {
            Error::Internal(format!(
                "The property '{property}' is missing from the projection of '{}'.",
                shaper.projection.structural_type
            ))
        })?;

    let types = env.types();
    let structural_type = shaper.structural_type.as_str();
    let is_optional_dependent = types.is_entity_type(structural_type)
        && types.discriminator_property(structural_type).is_none()
        && types.primary_key(structural_type).is_some()
        && types.root_type(structural_type) == structural_type
        && types.mapping_strategy(structural_type) != MappingStrategy::Tpc
        && types
            .table(structural_type)
            .is_some_and(|table| table.is_optional_dependent);
    if !is_optional_dependent {
        return Ok(column);
    }

    let dependent_columns = types.non_principal_shared_non_key_properties(structural_type);
    if dependent_columns.iter().any(|(name, _)| *name == property) {
        return Ok(column);
    }

    let bound = |name: &str| shaper.projection.bind_property(name).cloned();

    let required_tests = dependent_columns
        .iter()
        .filter(|(_, info)| !info.nullable)
        .filter_map(|(name, _)| bound(name))
        .map(|column| env.factory.is_not_null(column));
    let mut condition = sql::helpers::conjunction(required_tests);

    if !dependent_columns.is_empty() && dependent_columns.iter().all(|(_, info)| info.nullable) {
        let any_present = sql::helpers::disjunction(
            dependent_columns
                .iter()
                .filter_map(|(name, _)| bound(name))
                .map(|column| env.factory.is_not_null(column)),
        );
        condition = match (condition, any_present) {
            (Some(condition), Some(any_present)) => Some(sql::helpers::and(condition, any_present)),
            (condition, any_present) => condition.or(any_present),
        };
    }

    Ok(match condition {
        None => column,
        Some(test) => env.factory.case(
            vec![sql::ast::CaseWhenClause {
                test,
                result: column,
            }],
            None,
        ),
    })
}

/// A complex property: a nested structural value, or a collection.
pub fn bind_complex_property(
    reference: &StructuralTypeReference,
    property: &str,
    complex_type: &str,
    nullable: bool,
) -> Result<Translation, Error> {
    match reference {
        StructuralTypeReference::Row(shaper) => {
            match shaper.projection.bind_complex_property(property) {
                Some(ComplexPropertyBinding::Single(projection)) => Ok(
                    Translation::StructuralReference(StructuralTypeReference::Row(
                        StructuralTypeShaper {
                            structural_type: complex_type.to_string(),
                            projection: projection.clone(),
                            nullable: shaper.nullable || nullable,
                        },
                    )),
                ),
                Some(ComplexPropertyBinding::Collection(expression)) => {
                    Ok(Translation::CollectionResult(CollectionResult {
                        expression: expression.clone(),
                        complex_type: complex_type.to_string(),
                    }))
                }
                None => Err(Error::Internal(format!(
                    "The complex property '{property}' is missing from the projection of '{}'.",
                    shaper.projection.structural_type
                ))),
            }
        }
        StructuralTypeReference::Subquery { .. } => Err(Error::ComplexPropertyOverSubquery {
            member: property.to_string(),
        }),
    }
}
