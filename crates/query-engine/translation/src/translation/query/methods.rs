//! Translate method calls.
//!
//! A call falls into the first of these that applies: indexed property
//! access, `Equals`, `Contains`, n-ary `GREATEST`/`LEAST`, query operators,
//! and finally a scalar call handed to the method providers. Whatever the
//! providers cannot translate is retried as a subquery.

use query_engine_metadata::metadata::ClrType;
use query_engine_sql::sql;

use super::enumerable::EnumerableExpression;
use super::error::Error;
use super::helpers::{Env, State};
use super::{
    aggregates, binary, members, structural_equality, subquery, translate_expression,
    translate_sql, Translation,
};
use crate::translation::expression::{
    BinaryOperator, DeclaringType, MethodInfo, QueryExpression, UnaryOperator,
};

/// The two operands of a comparison, for the method providers.
type ScalarOperands = (sql::ast::Expression, sql::ast::Expression);

/// What the providers are called with once the special forms are ruled out.
enum CallArguments {
    /// The instance and arguments, all translated to SQL.
    Scalar {
        object: Option<sql::ast::Expression>,
        arguments: Vec<sql::ast::Expression>,
    },
    /// An aggregate over a grouping, with its remaining arguments.
    Aggregate {
        source: EnumerableExpression,
        arguments: Vec<sql::ast::Expression>,
    },
}

/// Translate `object.method(arguments)`, or `method(arguments)` when static.
pub fn translate_method_call(
    env: &Env,
    state: &mut State,
    object: Option<&QueryExpression>,
    method: &MethodInfo,
    arguments: &[QueryExpression],
) -> Result<Translation, Error> {
    let call = || QueryExpression::call(object.cloned(), method.clone(), arguments.to_vec());

    if let Some((source, property)) = property_arguments(method, arguments) {
        return translate_indexed_property(env, state, source, property, &call());
    }
    if let Some((source, property)) = indexer_arguments(env, object, method, arguments) {
        if let Translation::StructuralReference(reference) = translate_expression(env, state, source)? {
            if let Some(bound) = members::try_bind_member(env, state, &reference, property)? {
                return Ok(bound);
            }
        }
    }

    let call_arguments = match (object, method.name.as_str(), arguments) {
        (Some(instance), "Equals", [argument]) => {
            let argument = binary::converted_to_object(argument).unwrap_or(argument);
            match translate_equals(env, state, instance, argument)? {
                Ok(translation) => return Ok(translation),
                Err((left, right)) => CallArguments::Scalar {
                    object: Some(left),
                    arguments: vec![right],
                },
            }
        }
        (None, "Equals", [left, right]) => {
            if let Some(comparison) =
                binary::object_array_equality(BinaryOperator::Equal, left, right)
            {
                return translate_expression(env, state, &comparison);
            }
            let left = binary::converted_to_object(left).unwrap_or(left);
            let right = binary::converted_to_object(right).unwrap_or(right);
            match translate_equals(env, state, left, right)? {
                Ok(translation) => return Ok(translation),
                Err((left, right)) => CallArguments::Scalar {
                    object: None,
                    arguments: vec![left, right],
                },
            }
        }
        (None, "Contains", [source, item])
            if method.is_static && method.declaring_type == DeclaringType::Enumerable =>
        {
            match translate_contains(env, state, source, item)? {
                Ok(translation) => return Ok(translation),
                Err((source, item)) => CallArguments::Scalar {
                    object: None,
                    arguments: vec![source, item],
                },
            }
        }
        (None, "Contains", [source, item])
            if method.is_static && method.declaring_type == DeclaringType::Queryable =>
        {
            let item = binary::converted_to_object(item).unwrap_or(item);
            if let Some(translation) =
                structural_equality::try_rewrite_contains_entity(env, state, source, item)?
            {
                return Ok(translation);
            }
            return translate_query_operator(env, state, method, arguments, &call());
        }
        (Some(source), "Contains", [item]) if source.r#type().sequence_element_type().is_some() => {
            match translate_contains(env, state, source, item)? {
                Ok(translation) => return Ok(translation),
                Err((source, item)) => CallArguments::Scalar {
                    object: Some(source),
                    arguments: vec![item],
                },
            }
        }
        (
            None,
            "Greatest" | "Least",
            [_, QueryExpression::NewArray {
                element_type,
                expressions,
            }],
        ) if method.declaring_type == DeclaringType::DbFunctions => {
            let Some(values) = translate_all(env, state, expressions.iter())? else {
                return Ok(Translation::NotTranslated);
            };
            let r#type = element_type.unwrap_nullable().clone();
            return Ok(extremum(env, method, values, r#type));
        }
        (None, "Max" | "Min", [_, _]) if method.declaring_type == DeclaringType::Math => {
            let flattened = arguments
                .iter()
                .flat_map(|argument| flatten_extremum_arguments(method, argument));
            let Some(values) = translate_all(env, state, flattened)? else {
                return Ok(Translation::NotTranslated);
            };
            let r#type = method.return_type.unwrap_nullable().clone();
            return Ok(extremum(env, method, values, r#type));
        }
        (None, _, [_, ..])
            if method.is_static
                && matches!(
                    method.declaring_type,
                    DeclaringType::Queryable | DeclaringType::QueryableExtensions
                ) =>
        {
            return translate_query_operator(env, state, method, arguments, &call());
        }
        _ => match translate_call_arguments(env, state, object, arguments)? {
            Some(call_arguments) => call_arguments,
            None => return subquery::translate_as_subquery(env, state, &call()),
        },
    };

    let translation = match call_arguments {
        CallArguments::Scalar { object, arguments } => {
            env.providers
                .methods
                .translate(&mut env.provider_context(state), object.as_ref(), method, &arguments)
        }
        CallArguments::Aggregate { source, arguments } => {
            aggregates::translate_aggregate_method(env, state, source, method, &arguments)?
        }
    };
    if let Some(translation) = translation {
        return Ok(Translation::Sql(translation));
    }

    let translation = subquery::translate_as_subquery(env, state, &call())?;
    if translation != Translation::NotTranslated {
        return Ok(translation);
    }

    let is_string_equals_with_comparison = method.declaring_type == DeclaringType::String
        && method.name == "Equals"
        && arguments.len() == if method.is_static { 3 } else { 2 };
    if is_string_equals_with_comparison {
        state.errors.add(
            "Translation of the 'string.Equals' overload with a 'StringComparison' parameter is not supported."
                .to_string(),
        );
    } else {
        state.errors.add(format!(
            "Translation of method '{}.{}' failed.",
            method.declaring_type, method.name
        ));
    }
    Ok(Translation::NotTranslated)
}

/// `EF.Property(source, "Name")`.
fn property_arguments<'e>(
    method: &MethodInfo,
    arguments: &'e [QueryExpression],
) -> Option<(&'e QueryExpression, &'e str)> {
    if !method.is_static || !method.is(&DeclaringType::EF, "Property") {
        return None;
    }
    match arguments {
        [source, QueryExpression::Constant {
            value: serde_json::Value::String(property),
            ..
        }] => Some((source, property.as_str())),
        _ => None,
    }
}

/// `source["Name"]`, where `Name` is an indexer property of the model.
fn indexer_arguments<'e>(
    env: &Env,
    object: Option<&'e QueryExpression>,
    method: &MethodInfo,
    arguments: &'e [QueryExpression],
) -> Option<(&'e QueryExpression, &'e str)> {
    let object = object?;
    if method.is_static || method.name != "get_Item" {
        return None;
    }
    let [QueryExpression::Constant {
        value: serde_json::Value::String(property),
        ..
    }] = arguments
    else {
        return None;
    };
    let r#type = object.r#type();
    let structural_type = r#type.structural_type_name()?;
    env.types()
        .find_property(structural_type, property)
        .is_some_and(|info| info.is_indexer)
        .then_some((object, property.as_str()))
}

fn translate_indexed_property(
    env: &Env,
    state: &mut State,
    source: &QueryExpression,
    property: &str,
    call: &QueryExpression,
) -> Result<Translation, Error> {
    if let Translation::StructuralReference(reference) = translate_expression(env, state, source)? {
        if let Some(bound) = members::try_bind_member(env, state, &reference, property)? {
            return Ok(bound);
        }
    }

    if state.throw_for_unresolved_property {
        return Err(Error::UnresolvedPropertyAccess(call.to_string()));
    }
    state.errors.add(format!(
        "Translation of '{call}' failed. Either the query source is not an entity type, or the specified property does not exist on the entity type."
    ));
    Ok(Translation::NotTranslated)
}

/// `Ok` when the comparison is finished, otherwise the scalar operands for
/// the providers.
fn translate_equals(
    env: &Env,
    state: &mut State,
    left: &QueryExpression,
    right: &QueryExpression,
) -> Result<Result<Translation, ScalarOperands>, Error> {
    let left = translate_expression(env, state, left)?;
    let right = translate_expression(env, state, right)?;
    if let Some(rewritten) =
        structural_equality::try_rewrite_structural_type_equality(env, state, true, &left, &right)?
    {
        return Ok(Ok(rewritten));
    }
    Ok(match (left, right) {
        (Translation::Sql(left), Translation::Sql(right)) => Err((left, right)),
        _ => Ok(Translation::NotTranslated),
    })
}

/// `source.Contains(item)`: structural items are compared member by member,
/// scalar ones go to the providers.
fn translate_contains(
    env: &Env,
    state: &mut State,
    source: &QueryExpression,
    item: &QueryExpression,
) -> Result<Result<Translation, ScalarOperands>, Error> {
    let item = binary::converted_to_object(item).unwrap_or(item);
    if let Some(translation) =
        structural_equality::try_rewrite_contains_entity(env, state, source, item)?
    {
        return Ok(Ok(translation));
    }
    let source = translate_expression(env, state, source)?;
    let item = translate_expression(env, state, item)?;
    Ok(match (source, item) {
        (Translation::Sql(source), Translation::Sql(item)) => Err((source, item)),
        _ => Ok(Translation::NotTranslated),
    })
}

/// Query operators are either an aggregate over a grouping, or a subquery.
fn translate_query_operator(
    env: &Env,
    state: &mut State,
    method: &MethodInfo,
    arguments: &[QueryExpression],
    call: &QueryExpression,
) -> Result<Translation, Error> {
    if let Some(aggregate) =
        aggregates::try_translate_aggregate_method_call(env, state, method, arguments)?
    {
        return Ok(Translation::Sql(aggregate));
    }
    tracing::debug!("'{call}' is translated as a subquery");
    subquery::translate_as_subquery(env, state, call)
}

/// The operands of nested calls to the same `Max` or `Min`, in order.
fn flatten_extremum_arguments<'e>(
    method: &MethodInfo,
    argument: &'e QueryExpression,
) -> Vec<&'e QueryExpression> {
    match argument {
        QueryExpression::MethodCall {
            object: None,
            method: nested,
            arguments,
        } if nested == method && arguments.len() == 2 => arguments
            .iter()
            .flat_map(|argument| flatten_extremum_arguments(method, argument))
            .collect(),
        other => vec![other],
    }
}

fn extremum(
    env: &Env,
    method: &MethodInfo,
    values: Vec<sql::ast::Expression>,
    r#type: ClrType,
) -> Translation {
    let translation = if matches!(method.name.as_str(), "Max" | "Greatest") {
        env.factory.greatest(values, r#type)
    } else {
        env.factory.least(values, r#type)
    };
    translation.map_or(Translation::NotTranslated, Translation::Sql)
}

/// Translate every expression to SQL. `None` if any has no translation.
fn translate_all<'e>(
    env: &Env,
    state: &mut State,
    expressions: impl Iterator<Item = &'e QueryExpression>,
) -> Result<Option<Vec<sql::ast::Expression>>, Error> {
    let mut translated = vec![];
    for expression in expressions {
        match translate_sql(env, state, expression)? {
            Some(expression) => translated.push(expression),
            None => return Ok(None),
        }
    }
    Ok(Some(translated))
}

/// Translate the instance and arguments of a call one by one. At most one of
/// them may be a grouping to aggregate over. `None` when the call can only
/// run as a subquery.
fn translate_call_arguments(
    env: &Env,
    state: &mut State,
    object: Option<&QueryExpression>,
    arguments: &[QueryExpression],
) -> Result<Option<CallArguments>, Error> {
    let mut source = None;
    let mut sql_object = None;
    if let Some(object) = object {
        match aggregates::try_translate_as_enumerable(env, state, object)? {
            Some(enumerable) => source = Some(enumerable),
            None => match translate_sql(env, state, object)? {
                Some(object) => sql_object = Some(object),
                None => return Ok(None),
            },
        }
    }

    let mut scalar_arguments = vec![];
    for argument in arguments {
        if let Some(enumerable) = aggregates::try_translate_as_enumerable(env, state, argument)? {
            if source.is_some() {
                return Ok(None);
            }
            source = Some(enumerable);
            continue;
        }
        // a lambda outside of a query operator has nothing to bind to
        if matches!(
            argument,
            QueryExpression::Lambda { .. }
                | QueryExpression::Unary {
                    operator: UnaryOperator::Quote,
                    ..
                }
        ) {
            return Ok(None);
        }
        match translate_sql(env, state, argument)? {
            Some(argument) => scalar_arguments.push(argument),
            None => return Ok(None),
        }
    }

    Ok(Some(match source {
        Some(source) => CallArguments::Aggregate {
            source,
            arguments: scalar_arguments,
        },
        None => CallArguments::Scalar {
            object: sql_object,
            arguments: scalar_arguments,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> QueryExpression {
        QueryExpression::parameter(name, ClrType::Int32)
    }

    #[test]
    fn nested_calls_to_the_same_extremum_are_flattened_in_order() {
        let max = MethodInfo::new_static(DeclaringType::Math, "Max", ClrType::Int32);
        let min = MethodInfo::new_static(DeclaringType::Math, "Min", ClrType::Int32);
        let call = |method: &MethodInfo, left, right| {
            QueryExpression::call(None, method.clone(), vec![left, right])
        };
        let nested = call(
            &max,
            call(&max, call(&max, column("a"), column("b")), column("c")),
            call(&min, column("d"), column("e")),
        );

        let flattened: Vec<String> = flatten_extremum_arguments(&max, &nested)
            .into_iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(flattened, vec!["@a", "@b", "@c", "Math.Min(@d, @e)"]);
    }
}
