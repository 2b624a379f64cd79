//! Translate unary operators.

use query_engine_metadata::metadata::ClrType;

use super::error::Error;
use super::helpers::{Env, State};
use super::structural_reference::Conversion;
use super::{translate_expression, Translation};
use crate::translation::expression::{QueryExpression, UnaryOperator};

pub fn translate_unary(
    env: &Env,
    state: &mut State,
    operator: UnaryOperator,
    operand: &QueryExpression,
    r#type: &ClrType,
) -> Result<Translation, Error> {
    let translated = translate_expression(env, state, operand)?;

    let is_conversion = matches!(
        operator,
        UnaryOperator::Convert | UnaryOperator::ConvertChecked | UnaryOperator::TypeAs
    );
    if operator == UnaryOperator::Quote {
        return Ok(translated);
    }

    if let Translation::StructuralReference(reference) = &translated {
        if !is_conversion {
            return Ok(Translation::NotTranslated);
        }
        return Ok(match reference.convert(env.types(), r#type) {
            Conversion::Unchanged => Translation::StructuralReference(reference.clone()),
            Conversion::Narrowed(narrowed) => Translation::StructuralReference(narrowed),
            Conversion::Unsupported => {
                tracing::debug!(
                    "'{}' cannot be seen as '{}'",
                    reference.structural_type(),
                    r#type
                );
                Translation::NotTranslated
            }
        });
    }

    let Translation::Sql(sql_operand) = translated else {
        return Ok(Translation::NotTranslated);
    };

    Ok(match operator {
        UnaryOperator::Not => Translation::Sql(env.factory.not(sql_operand)),
        UnaryOperator::Negate | UnaryOperator::NegateChecked => {
            Translation::Sql(env.factory.negate(sql_operand))
        }
        UnaryOperator::Convert | UnaryOperator::ConvertChecked | UnaryOperator::TypeAs => {
            let target = r#type.unwrap_nullable();
            if target == sql_operand.r#type.unwrap_nullable() || *target == ClrType::Enum {
                Translation::Sql(sql_operand)
            } else if *r#type == ClrType::Object || env.factory.find_mapping(r#type).is_some() {
                let sql_operand = env.factory.apply_default_type_mapping(sql_operand);
                Translation::Sql(env.factory.convert(sql_operand, r#type.clone()))
            } else {
                Translation::NotTranslated
            }
        }
        UnaryOperator::Quote | UnaryOperator::ArrayLength => Translation::NotTranslated,
    })
}
