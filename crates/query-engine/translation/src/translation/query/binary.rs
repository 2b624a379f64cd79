//! Translate binary operators.

use std::borrow::Cow;

use query_engine_metadata::metadata::ClrType;
use query_engine_sql::sql;

use super::error::Error;
use super::helpers::{Env, State};
use super::{structural_equality, subquery, translate_expression, type_tests, Translation};
use crate::translation::expression::{
    BinaryOperator, DeclaringType, MethodInfo, QueryExpression, Shaper, UnaryOperator,
};

/// Translate `left <operator> right`.
pub fn translate_binary(
    env: &Env,
    state: &mut State,
    operator: BinaryOperator,
    left: &QueryExpression,
    right: &QueryExpression,
) -> Result<Translation, Error> {
    let is_equality = matches!(operator, BinaryOperator::Equal | BinaryOperator::NotEqual);

    if is_equality {
        if let Some(comparison) = object_array_equality(operator, left, right) {
            return translate_expression(env, state, &comparison);
        }
    }

    if is_equality && left.r#type() == ClrType::Type {
        let equal = operator == BinaryOperator::Equal;
        if let Some(translation) = try_translate_get_type_comparison(env, state, left, right, equal)? {
            return Ok(translation);
        }
        if let Some(translation) = try_translate_get_type_comparison(env, state, right, left, equal)? {
            return Ok(translation);
        }
    }

    let mut left = Cow::Borrowed(try_remove_implicit_convert(left));
    let mut right = Cow::Borrowed(try_remove_implicit_convert(right));

    // casts to object are dropped on both sides, or next to a null constant
    let unwrapped = match (converted_to_object(&left), converted_to_object(&right)) {
        (Some(left_operand), Some(right_operand)) => {
            Some((left_operand.clone(), right_operand.clone()))
        }
        (Some(left_operand), None) if right.is_null_constant() => Some((
            left_operand.clone(),
            QueryExpression::null(left_operand.r#type().make_nullable()),
        )),
        (None, Some(right_operand)) if left.is_null_constant() => Some((
            QueryExpression::null(right_operand.r#type().make_nullable()),
            right_operand.clone(),
        )),
        _ => None,
    };
    if let Some((left_operand, right_operand)) = unwrapped {
        left = Cow::Owned(left_operand);
        right = Cow::Owned(right_operand);
    }

    if is_equality {
        let equal = operator == BinaryOperator::Equal;
        let single_result = if right.is_null_constant() {
            Some(&*left)
        } else if left.is_null_constant() {
            Some(&*right)
        } else {
            None
        };
        if let Some(call) = single_result {
            if let Some(exists) = try_translate_single_result_as_exists(env, call, equal)? {
                return Ok(exists);
            }
        }
    }

    let left_type = left.r#type();
    let right_type = right.r#type();
    let left = translate_expression(env, state, &left)?;
    let right = translate_expression(env, state, &right)?;

    if is_equality {
        if let Some(rewritten) = structural_equality::try_rewrite_structural_type_equality(
            env,
            state,
            operator == BinaryOperator::Equal,
            &left,
            &right,
        )? {
            return Ok(rewritten);
        }
    }

    // bitwise operators over booleans short-circuit in SQL
    let operator = match operator {
        BinaryOperator::And if left_type.is_boolean() && right_type.is_boolean() => {
            BinaryOperator::AndAlso
        }
        BinaryOperator::Or if left_type.is_boolean() && right_type.is_boolean() => {
            BinaryOperator::OrElse
        }
        other => other.unchecked(),
    };

    let (Translation::Sql(left), Translation::Sql(right)) = (left, right) else {
        return Ok(Translation::NotTranslated);
    };

    if operator == BinaryOperator::Coalesce {
        return Ok(Translation::Sql(env.factory.coalesce(left, right, right_type)));
    }

    Ok(match sql_operator(operator) {
        Some(operator) => Translation::Sql(env.factory.make_binary(operator, left, right)),
        None => Translation::NotTranslated,
    })
}

fn sql_operator(operator: BinaryOperator) -> Option<sql::ast::BinaryOperator> {
    match operator {
        BinaryOperator::Add => Some(sql::ast::BinaryOperator::Add),
        BinaryOperator::Subtract => Some(sql::ast::BinaryOperator::Subtract),
        BinaryOperator::Multiply => Some(sql::ast::BinaryOperator::Multiply),
        BinaryOperator::Divide => Some(sql::ast::BinaryOperator::Divide),
        BinaryOperator::Modulo => Some(sql::ast::BinaryOperator::Modulo),
        BinaryOperator::And => Some(sql::ast::BinaryOperator::BitwiseAnd),
        BinaryOperator::Or => Some(sql::ast::BinaryOperator::BitwiseOr),
        BinaryOperator::ExclusiveOr => Some(sql::ast::BinaryOperator::ExclusiveOr),
        BinaryOperator::AndAlso => Some(sql::ast::BinaryOperator::AndAlso),
        BinaryOperator::OrElse => Some(sql::ast::BinaryOperator::OrElse),
        BinaryOperator::Equal => Some(sql::ast::BinaryOperator::Equal),
        BinaryOperator::NotEqual => Some(sql::ast::BinaryOperator::NotEqual),
        BinaryOperator::LessThan => Some(sql::ast::BinaryOperator::LessThan),
        BinaryOperator::LessThanOrEqual => Some(sql::ast::BinaryOperator::LessThanOrEqual),
        BinaryOperator::GreaterThan => Some(sql::ast::BinaryOperator::GreaterThan),
        BinaryOperator::GreaterThanOrEqual => Some(sql::ast::BinaryOperator::GreaterThanOrEqual),
        BinaryOperator::AddChecked
        | BinaryOperator::SubtractChecked
        | BinaryOperator::MultiplyChecked
        | BinaryOperator::Power
        | BinaryOperator::LeftShift
        | BinaryOperator::RightShift
        | BinaryOperator::Coalesce
        | BinaryOperator::ArrayIndex => None,
    }
}

/// `new object[] { a, b } == new object[] { c, d }` compares element-wise.
pub fn object_array_equality(
    operator: BinaryOperator,
    left: &QueryExpression,
    right: &QueryExpression,
) -> Option<QueryExpression> {
    let (
        QueryExpression::NewArray {
            element_type: ClrType::Object,
            expressions: left,
        },
        QueryExpression::NewArray {
            element_type: ClrType::Object,
            expressions: right,
        },
    ) = (left, right)
    else {
        return None;
    };
    if left.len() != right.len() {
        return None;
    }

    let (compare, combine) = if operator == BinaryOperator::NotEqual {
        (BinaryOperator::NotEqual, BinaryOperator::OrElse)
    } else {
        (BinaryOperator::Equal, BinaryOperator::AndAlso)
    };
    Some(
        left.iter()
            .zip(right)
            .map(|(left, right)| QueryExpression::binary(compare, left.clone(), right.clone()))
            .reduce(|left, right| QueryExpression::binary(combine, left, right))
            .unwrap_or_else(|| {
                QueryExpression::constant(
                    serde_json::Value::Bool(operator != BinaryOperator::NotEqual),
                    ClrType::Boolean,
                )
            }),
    )
}

/// `x.GetType() == typeof(T)`.
fn try_translate_get_type_comparison(
    env: &Env,
    state: &mut State,
    get_type: &QueryExpression,
    type_constant: &QueryExpression,
    equal: bool,
) -> Result<Option<Translation>, Error> {
    let (
        QueryExpression::MethodCall {
            object: Some(instance),
            method,
            arguments,
        },
        QueryExpression::TypeConstant(comparison_type),
    ) = (get_type, type_constant)
    else {
        return Ok(None);
    };
    if method.name != "GetType" || !arguments.is_empty() {
        return Ok(None);
    }

    match translate_expression(env, state, instance)? {
        Translation::StructuralReference(reference) => {
            let operator = if equal {
                BinaryOperator::Equal
            } else {
                BinaryOperator::NotEqual
            };
            let comparison =
                QueryExpression::binary(operator, get_type.clone(), type_constant.clone());
            type_tests::process_get_type(env, state, &comparison, &reference, comparison_type, equal)
                .map(Some)
        }
        _ => Ok(None),
    }
}

/// Strip conversions which do not change the stored representation: to the
/// same type, from an enum to its underlying type, and widenings of small
/// integers.
pub fn try_remove_implicit_convert(expression: &QueryExpression) -> &QueryExpression {
    if let QueryExpression::Unary {
        operator: UnaryOperator::Convert | UnaryOperator::ConvertChecked,
        operand,
        r#type,
    } = expression
    {
        let operand_type = operand.r#type();
        let inner = operand_type.underlying_enum_type();
        let converted = r#type.unwrap_nullable();
        if inner == converted
            || (*converted == ClrType::Int32 && inner.widens_implicitly_to_int32())
        {
            return try_remove_implicit_convert(operand);
        }
    }
    expression
}

/// The operand of a cast to `object`.
pub fn converted_to_object(expression: &QueryExpression) -> Option<&QueryExpression> {
    match expression {
        QueryExpression::Unary {
            operator: UnaryOperator::Convert | UnaryOperator::ConvertChecked,
            operand,
            r#type: ClrType::Object,
        } => Some(operand),
        _ => None,
    }
}

/// `source.First(...) == null` tests whether the source has rows, when the
/// row itself can never be NULL.
fn try_translate_single_result_as_exists(
    env: &Env,
    call: &QueryExpression,
    equal: bool,
) -> Result<Option<Translation>, Error> {
    let QueryExpression::MethodCall {
        object: None,
        method,
        arguments,
    } = call
    else {
        return Ok(None);
    };
    if !matches!(
        method.declaring_type,
        DeclaringType::Queryable | DeclaringType::Enumerable
    ) {
        return Ok(None);
    }
    let Some((source, rest)) = arguments.split_first() else {
        return Ok(None);
    };

    let rewrite = |name: &str, argument: &QueryExpression| {
        QueryExpression::call(
            None,
            MethodInfo::new_static(method.declaring_type.clone(), name, source.r#type()),
            vec![source.clone(), argument.clone()],
        )
    };
    let source = match (method.name.as_str(), rest) {
        (
            "First" | "FirstOrDefault" | "Single" | "SingleOrDefault" | "Last" | "LastOrDefault",
            [],
        ) => source.clone(),
        (
            "First" | "FirstOrDefault" | "Single" | "SingleOrDefault" | "Last" | "LastOrDefault",
            [predicate],
        ) => rewrite("Where", predicate),
        ("ElementAt" | "ElementAtOrDefault", [index]) => {
            if matches!(
                index,
                QueryExpression::Constant { value, .. } if value.as_i64() == Some(0)
            ) {
                source.clone()
            } else {
                rewrite("Skip", index)
            }
        }
        _ => return Ok(None),
    };

    let Some(shaped) = env.providers.subqueries.translate_subquery(&source)? else {
        return Ok(None);
    };
    let row_is_never_null = match shaped.shaper.without_convert() {
        Shaper::New { .. } | Shaper::Collection { .. } => true,
        Shaper::Structural { nullable, .. } => !nullable,
        Shaper::Scalar { .. } | Shaper::Convert { .. } => false,
    };
    if !row_is_never_null {
        return Ok(None);
    }

    tracing::debug!("'{call}' compared to null is translated as EXISTS");
    let exists = subquery::exists(env, &shaped.query);
    Ok(Some(Translation::Sql(if equal {
        env.factory.not(exists)
    } else {
        exists
    })))
}
