//! Expand comparisons of structural values into comparisons of their members.
//!
//! Entities are compared by key. Keyless entities and complex values are
//! compared member by member, descending into nested complex values. Members
//! that may be NULL on both sides compare NULL as equal to NULL.

use query_engine_metadata::metadata::ClrType;
use query_engine_sql::sql;
use sql::ast::{Expression, ExpressionKind, Value};

use super::error::Error;
use super::helpers::{Env, State};
use super::members;
use super::structural_reference::StructuralTypeReference;
use super::{structural_shaper, translate_expression, values, Translation};
use crate::translation::expression::{QueryExpression, ResultCardinality, Shaper};

/// One side of a structural comparison.
#[derive(Debug, Clone, Copy)]
enum Operand<'a> {
    Reference(&'a StructuralTypeReference),
    Null,
    /// A structural value known at translation time, keyed by member name.
    Constant(&'a serde_json::Value),
    Parameter(&'a str),
}

impl<'a> Operand<'a> {
    fn from_translation(translation: &'a Translation) -> Option<Operand<'a>> {
        match translation {
            Translation::StructuralReference(reference) => Some(Operand::Reference(reference)),
            Translation::Sql(expression) => match &expression.kind {
                ExpressionKind::Value(Value::Null) => Some(Operand::Null),
                ExpressionKind::Value(Value::Json(value)) => Some(Operand::Constant(value)),
                ExpressionKind::Parameter { name, .. }
                    if expression.r#type.structural_type_name().is_some() =>
                {
                    Some(Operand::Parameter(name))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn reference(self) -> Option<&'a StructuralTypeReference> {
        match self {
            Operand::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}

/// A scalar member reached from a structural value.
#[derive(Debug, Clone)]
struct MemberPath<'a> {
    path: Vec<&'a str>,
    r#type: ClrType,
}

/// Rewrite `left == right` (or `!=` when `equal` is false) where at least
/// one side is a structural value.
///
/// `None` when neither side is structural, so that the caller goes on with
/// scalar translation.
pub fn try_rewrite_structural_type_equality(
    env: &Env,
    state: &mut State,
    equal: bool,
    left: &Translation,
    right: &Translation,
) -> Result<Option<Translation>, Error> {
    let (Some(left), Some(right)) = (
        Operand::from_translation(left),
        Operand::from_translation(right),
    ) else {
        return Ok(None);
    };
    let Some(reference) = left.reference().or(right.reference()) else {
        return Ok(None);
    };

    if matches!(left, Operand::Null) || matches!(right, Operand::Null) {
        let non_null = if matches!(left, Operand::Null) { right } else { left };
        let Some(reference) = non_null.reference() else {
            return Ok(None);
        };
        return null_comparison(env, state, equal, reference).map(Some);
    }

    let types = env.types();
    if let (Some(left), Some(right)) = (left.reference(), right.reference()) {
        let (left_type, right_type) = (left.structural_type(), right.structural_type());
        if types.is_entity_type(left_type)
            && types.is_entity_type(right_type)
            && types.root_type(left_type) != types.root_type(right_type)
        {
            tracing::debug!(
                "Entities of '{left_type}' and '{right_type}' are never equal."
            );
            return Ok(Some(Translation::Sql(sql::helpers::bool_value(!equal))));
        }
    }

    let structural_type = reference.structural_type();
    let Some(members) = comparison_members(env, structural_type)? else {
        state.errors.add(format!(
            "Values of '{structural_type}' cannot be compared because they contain collections."
        ));
        return Ok(Some(Translation::NotTranslated));
    };

    let mut comparisons = vec![];
    for member in &members {
        let (Some(left), Some(right)) = (
            member_value(env, state, left, member)?,
            member_value(env, state, right, member)?,
        ) else {
            state.errors.add(format!(
                "Values of '{structural_type}' cannot be compared because a constant has no value for '{}'.",
                member.path.join(".")
            ));
            return Ok(Some(Translation::NotTranslated));
        };
        comparisons.push(if equal {
            member_equal(env, left, right)
        } else {
            member_not_equal(env, left, right)
        });
    }

    let combined = if equal {
        comparisons
            .into_iter()
            .reduce(|left, right| env.factory.and_also(left, right))
    } else {
        comparisons
            .into_iter()
            .reduce(|left, right| env.factory.or_else(left, right))
    };
    Ok(Some(Translation::Sql(
        combined.unwrap_or_else(|| sql::helpers::bool_value(equal)),
    )))
}

/// `x == null`: an entity is missing when any part of its key is, a complex
/// value when all of its members are.
fn null_comparison(
    env: &Env,
    state: &mut State,
    equal: bool,
    reference: &StructuralTypeReference,
) -> Result<Translation, Error> {
    let types = env.types();
    let structural_type = reference.structural_type();
    let Some(members) = comparison_members(env, structural_type)? else {
        state.errors.add(format!(
            "Values of '{structural_type}' cannot be compared because they contain collections."
        ));
        return Ok(Translation::NotTranslated);
    };

    let mut tests = vec![];
    for member in &members {
        let Some(value) = member_value(env, state, Operand::Reference(reference), member)? else {
            return Ok(Translation::NotTranslated);
        };
        tests.push(if equal {
            env.factory.is_null(value)
        } else {
            env.factory.is_not_null(value)
        });
    }

    let by_key = types.is_entity_type(structural_type)
        && types.primary_key(structural_type).is_some();
    let any = by_key == equal;
    let combined = if any {
        tests
            .into_iter()
            .reduce(|left, right| env.factory.or_else(left, right))
    } else {
        tests
            .into_iter()
            .reduce(|left, right| env.factory.and_also(left, right))
    };
    Ok(Translation::Sql(
        combined.unwrap_or_else(|| sql::helpers::bool_value(!equal)),
    ))
}

/// The members two values of `structural_type` are compared by. `None` when
/// the values hold collections.
fn comparison_members<'a>(
    env: &Env<'a>,
    structural_type: &str,
) -> Result<Option<Vec<MemberPath<'a>>>, Error> {
    let types = env.types();
    env.lookup_structural_type(structural_type)?;

    if types.is_entity_type(structural_type) {
        if let Some(key) = types.primary_key(structural_type) {
            return key
                .iter()
                .map(|property| {
                    let info = types.find_property(structural_type, property).ok_or_else(|| {
                        Error::Internal(format!(
                            "The key property '{property}' is not a property of '{structural_type}'."
                        ))
                    })?;
                    Ok(MemberPath {
                        path: vec![property.as_str()],
                        r#type: info.r#type.clone(),
                    })
                })
                .collect::<Result<Vec<_>, Error>>()
                .map(Some);
        }
    }

    let mut members = vec![];
    if collect_members(env, structural_type, &[], &mut members) {
        Ok(Some(members))
    } else {
        Ok(None)
    }
}

fn collect_members<'a>(
    env: &Env<'a>,
    structural_type: &str,
    prefix: &[&'a str],
    members: &mut Vec<MemberPath<'a>>,
) -> bool {
    let types = env.types();
    for (property, info) in types.properties(structural_type) {
        let mut path = prefix.to_vec();
        path.push(property);
        members.push(MemberPath {
            path,
            r#type: info.r#type.clone(),
        });
    }
    for (property, info) in types.complex_properties(structural_type) {
        if info.is_collection {
            return false;
        }
        let mut path = prefix.to_vec();
        path.push(property);
        if !collect_members(env, &info.complex_type, &path, members) {
            return false;
        }
    }
    true
}

/// The SQL for one member of one side. `None` when a constant has no value
/// for the member.
fn member_value(
    env: &Env,
    state: &mut State,
    operand: Operand,
    member: &MemberPath,
) -> Result<Option<Expression>, Error> {
    let Some((last, nested)) = member.path.split_last() else {
        return Err(Error::Internal("An empty member path.".to_string()));
    };

    match operand {
        Operand::Reference(reference) => {
            let mut current = reference.clone();
            for property in nested {
                let types = env.types();
                let complex = types
                    .find_complex_property(current.structural_type(), property)
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "'{property}' is not a complex property of '{}'.",
                            current.structural_type()
                        ))
                    })?;
                current = match members::bind_complex_property(
                    &current,
                    property,
                    &complex.complex_type,
                    complex.nullable,
                )? {
                    Translation::StructuralReference(nested) => nested,
                    _ => {
                        return Err(Error::Internal(format!(
                            "'{property}' is not a single complex value."
                        )))
                    }
                };
            }
            members::bind_property(env, &current, last).map(Some)
        }
        Operand::Null => Ok(Some(env.factory.constant(
            Value::Null,
            member.r#type.clone().make_nullable(),
        ))),
        Operand::Constant(value) => {
            // a null complex value has null members, a missing key is no value
            let mut field = value;
            for property in &member.path {
                if field.is_null() {
                    break;
                }
                match field.as_object().and_then(|object| object.get(*property)) {
                    Some(nested) => field = nested,
                    None => return Ok(None),
                }
            }
            let r#type = if field.is_null() {
                member.r#type.clone().make_nullable()
            } else {
                member.r#type.clone()
            };
            Ok(Some(env.factory.constant(
                values::translate_json_value(field, &r#type)?,
                r#type,
            )))
        }
        Operand::Parameter(name) => {
            let parameter = state.register_runtime_parameter(name, &member.path);
            Ok(Some(
                env.factory
                    .parameter(parameter, member.r#type.clone().make_nullable()),
            ))
        }
    }
}

/// `a = b`, also true when both may be and are NULL.
fn member_equal(env: &Env, left: Expression, right: Expression) -> Expression {
    if left.is_nullable()
        && right.is_nullable()
        && !left.is_null_constant()
        && !right.is_null_constant()
    {
        env.factory.or_else(
            env.factory.equal(left.clone(), right.clone()),
            env.factory
                .and_also(env.factory.is_null(left), env.factory.is_null(right)),
        )
    } else {
        env.factory.equal(left, right)
    }
}

/// `a <> b`, also true when exactly one of them is NULL.
fn member_not_equal(env: &Env, left: Expression, right: Expression) -> Expression {
    if left.is_null_constant() || right.is_null_constant() {
        return env.factory.not_equal(left, right);
    }
    let different = env.factory.not_equal(left.clone(), right.clone());
    match (left.is_nullable(), right.is_nullable()) {
        (true, true) => {
            let only_left = env.factory.and_also(
                env.factory.is_null(left.clone()),
                env.factory.is_not_null(right.clone()),
            );
            let only_right = env
                .factory
                .and_also(env.factory.is_not_null(left), env.factory.is_null(right));
            env.factory
                .or_else(env.factory.or_else(different, only_left), only_right)
        }
        (true, false) => env.factory.or_else(different, env.factory.is_null(left)),
        (false, true) => env.factory.or_else(different, env.factory.is_null(right)),
        (false, false) => different,
    }
}

/// Rewrite `source.Contains(item)` for a structural `item`.
///
/// A constant list of values becomes a disjunction of equalities. A query
/// source becomes `EXISTS` over its rows filtered by equality with the item.
/// `None` when the item is not structural or the source is neither, so that
/// the caller falls back to other strategies.
pub fn try_rewrite_contains_entity(
    env: &Env,
    state: &mut State,
    source: &QueryExpression,
    item: &QueryExpression,
) -> Result<Option<Translation>, Error> {
    if item.r#type().structural_type_name().is_none() {
        return Ok(None);
    }
    let item = translate_expression(env, state, item)?;
    if Operand::from_translation(&item).is_none() {
        return Ok(None);
    }

    if let Translation::Sql(Expression {
        kind: ExpressionKind::Value(Value::Array(elements)),
        r#type,
        ..
    }) = translate_expression(env, state, source)?
    {
        let element_type = r#type.sequence_element_type().cloned().unwrap_or(ClrType::Object);
        let mut equalities = vec![];
        for element in elements {
            let element = Translation::Sql(env.factory.constant(element, element_type.clone()));
            match try_rewrite_structural_type_equality(env, state, true, &element, &item)? {
                Some(Translation::Sql(equality)) => equalities.push(equality),
                _ => return Ok(None),
            }
        }
        return Ok(Some(Translation::Sql(
            equalities
                .into_iter()
                .reduce(|left, right| env.factory.or_else(left, right))
                .unwrap_or_else(sql::helpers::false_expr),
        )));
    }

    let Some(shaped) = env.providers.subqueries.translate_subquery(source)? else {
        return Ok(None);
    };
    let Shaper::Structural {
        structural_type,
        member,
        nullable,
    } = shaped.shaper.without_convert()
    else {
        return Ok(None);
    };
    if shaped.cardinality != ResultCardinality::Enumerable || shaped.query.is_limited() {
        return Ok(None);
    }
    let Some(row) = structural_shaper(&shaped.query, member, structural_type, *nullable) else {
        return Ok(None);
    };

    let row = Translation::StructuralReference(StructuralTypeReference::Row(row));
    let Some(Translation::Sql(predicate)) =
        try_rewrite_structural_type_equality(env, state, true, &row, &item)?
    else {
        return Ok(None);
    };

    let mut query = shaped.query;
    query.apply_predicate(predicate);
    Ok(Some(Translation::Sql(super::subquery::exists(env, &query))))
}
