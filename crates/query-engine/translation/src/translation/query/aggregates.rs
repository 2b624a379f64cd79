//! Fold query operators over a grouping into an aggregate source, and
//! translate the aggregates computed over it.

use query_engine_sql::sql;
use sql::ast::{OrderByDirection, OrderByElement};

use super::enumerable::EnumerableExpression;
use super::error::Error;
use super::helpers::{Env, State};
use super::translate_internal;
use crate::translation::expression::{
    DeclaringType, MethodInfo, QueryExpression, StructuralTypeShaper, UnaryOperator,
};

/// View an expression as an aggregate source: the elements of a group, with
/// `Where`, `Select`, `Distinct` and orderings applied.
///
/// `None` when the expression is not such a chain, or when a filter or an
/// ordering key of the chain has no translation.
pub fn try_translate_as_enumerable(
    env: &Env,
    state: &mut State,
    expression: &QueryExpression,
) -> Result<Option<EnumerableExpression>, Error> {
    let (method, arguments) = match expression {
        QueryExpression::GroupByElement { element_selector } => {
            return Ok(Some(EnumerableExpression::new((**element_selector).clone())));
        }
        QueryExpression::Enumerable(enumerable) => return Ok(Some((**enumerable).clone())),
        QueryExpression::MethodCall {
            object: None,
            method,
            arguments,
        } if is_query_operator(method) => (method, arguments),
        _ => return Ok(None),
    };
    let Some((source, rest)) = arguments.split_first() else {
        return Ok(None);
    };
    let Some(source) = try_translate_as_enumerable(env, state, source)? else {
        return Ok(None);
    };

    match (method.name.as_str(), rest) {
        ("AsQueryable" | "AsEnumerable", []) => Ok(Some(source)),
        ("Distinct", []) => {
            // rows with a key are distinct already
            let has_key = matches!(
                &source.selector,
                QueryExpression::StructuralTypeShaper(StructuralTypeShaper { structural_type, .. })
                    if env.types().is_entity_type(structural_type)
                        && env.types().primary_key(structural_type).is_some()
            );
            if has_key || source.is_distinct {
                Ok(Some(source))
            } else {
                Ok(Some(source.set_distinct(true)))
            }
        }
        ("OrderBy", [key]) => process_ordering(env, state, source, key, false, OrderByDirection::Asc),
        ("OrderByDescending", [key]) => {
            process_ordering(env, state, source, key, false, OrderByDirection::Desc)
        }
        ("ThenBy", [key]) => process_ordering(env, state, source, key, true, OrderByDirection::Asc),
        ("ThenByDescending", [key]) => {
            process_ordering(env, state, source, key, true, OrderByDirection::Desc)
        }
        ("Select", [selector]) => Ok(process_selector(source, selector)),
        ("Where", [predicate]) => process_predicate(env, state, source, predicate),
        _ => Ok(None),
    }
}

/// Translate `source.Aggregate(...)` where the source folds into an
/// aggregate source. `None` when it does not, or when the aggregate is not
/// known.
pub fn try_translate_aggregate_method_call(
    env: &Env,
    state: &mut State,
    method: &MethodInfo,
    arguments: &[QueryExpression],
) -> Result<Option<sql::ast::Expression>, Error> {
    let Some((source, rest)) = arguments.split_first() else {
        return Ok(None);
    };
    let Some(source) = try_translate_as_enumerable(env, state, source)? else {
        return Ok(None);
    };

    let source = match (method.name.as_str(), rest) {
        ("Max" | "Min", []) => source.set_distinct(false),
        ("Max" | "Min", [selector]) => match process_selector(source.set_distinct(false), selector)
        {
            Some(source) => source,
            None => return Ok(None),
        },
        ("Average" | "Sum" | "Count" | "LongCount", []) => source,
        ("Average" | "Sum", [selector]) => match process_selector(source, selector) {
            Some(source) => source,
            None => return Ok(None),
        },
        ("Count" | "LongCount", [predicate]) => {
            match process_predicate(env, state, source, predicate)? {
                Some(source) => source,
                None => return Ok(None),
            }
        }
        _ => return Ok(None),
    };

    translate_aggregate_method(env, state, source, method, &[])
}

/// Hand a finished aggregate source to the aggregate provider. The selector
/// is translated here when it can be; a selector that cannot stays as it is
/// and the provider decides.
pub fn translate_aggregate_method(
    env: &Env,
    state: &mut State,
    source: EnumerableExpression,
    method: &MethodInfo,
    scalar_arguments: &[sql::ast::Expression],
) -> Result<Option<sql::ast::Expression>, Error> {
    let throw_for_unresolved_property = state.throw_for_unresolved_property;
    state.throw_for_unresolved_property = false;
    let selector = translate_internal(env, state, &source.selector, true);
    state.throw_for_unresolved_property = throw_for_unresolved_property;

    let source = match selector? {
        Some(selector) => source.apply_selector(QueryExpression::Sql(selector)),
        None => source,
    };
    Ok(env
        .providers
        .aggregates
        .translate(&mut env.provider_context(state), method, &source, scalar_arguments))
}

fn is_query_operator(method: &MethodInfo) -> bool {
    method.is_static
        && matches!(
            method.declaring_type,
            DeclaringType::Queryable | DeclaringType::Enumerable
        )
}

/// The body of a single-parameter lambda, over the current selector of the
/// source.
fn remap_lambda(source: &EnumerableExpression, lambda: &QueryExpression) -> Option<QueryExpression> {
    match lambda {
        QueryExpression::Unary {
            operator: UnaryOperator::Quote,
            operand,
            ..
        } => remap_lambda(source, operand),
        QueryExpression::Lambda { parameters, body } => match parameters.as_slice() {
            [(parameter, _)] => Some(body.replace_parameter(parameter, &source.selector)),
            _ => None,
        },
        _ => None,
    }
}

/// `None` over a distinct source: the new selector would change what is
/// distinct.
fn process_selector(
    source: EnumerableExpression,
    selector: &QueryExpression,
) -> Option<EnumerableExpression> {
    if source.is_distinct {
        return None;
    }
    let selector = remap_lambda(&source, selector)?;
    Some(source.apply_selector(selector))
}

fn process_predicate(
    env: &Env,
    state: &mut State,
    source: EnumerableExpression,
    predicate: &QueryExpression,
) -> Result<Option<EnumerableExpression>, Error> {
    let Some(predicate) = remap_lambda(&source, predicate) else {
        return Ok(None);
    };
    Ok(translate_internal(env, state, &predicate, true)?
        .map(|predicate| source.apply_predicate(predicate)))
}

fn process_ordering(
    env: &Env,
    state: &mut State,
    source: EnumerableExpression,
    key: &QueryExpression,
    then_by: bool,
    direction: OrderByDirection,
) -> Result<Option<EnumerableExpression>, Error> {
    let Some(key) = remap_lambda(&source, key) else {
        return Ok(None);
    };
    let Some(target) = translate_internal(env, state, &key, true)? else {
        return Ok(None);
    };
    let ordering = OrderByElement { target, direction };
    Ok(Some(if then_by {
        source.append_ordering(ordering)
    } else {
        source.apply_ordering(ordering)
    }))
}
