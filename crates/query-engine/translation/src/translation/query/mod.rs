//! Translate a query expression to a SQL expression.

pub mod aggregates;
pub mod binary;
pub mod enumerable;
pub mod error;
pub mod helpers;
pub mod members;
pub mod methods;
pub mod root;
pub mod structural_equality;
pub mod structural_reference;
pub mod subquery;
pub mod unary;
pub mod values;

use query_engine_configuration::{Configuration, TranslatorOptions};
use query_engine_metadata::metadata::{self, ClrType, TypeMappingSource};
use query_engine_sql::sql;

use crate::translation::expression::{QueryExpression, StructuralTypeShaper};
use crate::translation::providers::Providers;
use enumerable::EnumerableExpression;
use error::Error;
use helpers::{Env, State};
use structural_reference::{CollectionResult, StructuralTypeReference};

/// The outcome of translating one node.
///
/// Only `Sql` is a finished translation; the other translated variants are
/// intermediate values that surrounding nodes know how to consume.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    Sql(sql::ast::Expression),
    StructuralReference(StructuralTypeReference),
    CollectionResult(CollectionResult),
    Enumerable(EnumerableExpression),
    /// The node has no translation; the caller may fall back to another strategy.
    NotTranslated,
}

impl Translation {
    pub fn into_sql(self) -> Option<sql::ast::Expression> {
        match self {
            Translation::Sql(expression) => Some(expression),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> Option<&sql::ast::Expression> {
        match self {
            Translation::Sql(expression) => Some(expression),
            _ => None,
        }
    }
}

/// What a projected expression translates to.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionTranslation {
    Sql(sql::ast::Expression),
    Structural(StructuralTypeReference),
    Collection(CollectionResult),
}

/// Translates query expressions against a model.
///
/// The translator keeps the explanations of failed translations of the last
/// call, see [`SqlTranslator::translation_error_details`].
pub struct SqlTranslator<'a> {
    env: Env<'a>,
    state: State,
}

impl<'a> SqlTranslator<'a> {
    pub fn new(
        metadata: &'a metadata::Metadata,
        options: TranslatorOptions,
        type_mapping_source: &'a dyn TypeMappingSource,
        providers: Providers<'a>,
    ) -> SqlTranslator<'a> {
        SqlTranslator {
            env: Env::new(metadata, options, type_mapping_source, providers),
            state: State::new(options),
        }
    }

    pub fn from_configuration(
        configuration: &'a Configuration,
        type_mapping_source: &'a dyn TypeMappingSource,
        providers: Providers<'a>,
    ) -> SqlTranslator<'a> {
        SqlTranslator::new(
            &configuration.metadata,
            configuration.options,
            type_mapping_source,
            providers,
        )
    }

    /// Translate an expression to SQL.
    ///
    /// `Ok(None)` means the expression cannot run on the server; the caller
    /// may evaluate it client-side, and [`Self::translation_error_details`]
    /// tells why. Errors abort the translation of the whole query.
    pub fn translate(
        &mut self,
        expression: &QueryExpression,
        apply_default_type_mapping: bool,
    ) -> Result<Option<sql::ast::Expression>, Error> {
        self.state.errors.clear();
        let translation =
            translate_internal(&self.env, &mut self.state, expression, apply_default_type_mapping)?;

        match &translation {
            Some(sql_expression) => tracing::info!("SQL AST: {:?}", sql_expression),
            None => tracing::debug!("'{expression}' was not translated"),
        }
        Ok(translation)
    }

    /// Translate an expression of a projection, where structural values and
    /// complex collections are results too.
    pub fn translate_projection(
        &mut self,
        expression: &QueryExpression,
        apply_default_type_mapping: bool,
    ) -> Result<Option<ProjectionTranslation>, Error> {
        self.state.errors.clear();
        let translation = match translate_expression(&self.env, &mut self.state, expression)? {
            Translation::Sql(sql_expression) => {
                finish_sql(&self.env, sql_expression, apply_default_type_mapping)
                    .map(ProjectionTranslation::Sql)
            }
            Translation::StructuralReference(reference) => {
                Some(ProjectionTranslation::Structural(reference))
            }
            Translation::CollectionResult(collection) => {
                Some(ProjectionTranslation::Collection(collection))
            }
            Translation::Enumerable(_) | Translation::NotTranslated => None,
        };
        tracing::info!("SQL AST: {:?}", translation);
        Ok(translation)
    }

    /// Why the last translation gave up, one explanation per line.
    pub fn translation_error_details(&self) -> Option<String> {
        self.state.errors.details()
    }

    /// Record an explanation from a caller composing around the translator.
    pub fn add_translation_error_details(&mut self, details: String) {
        self.state.errors.add(details);
    }

    /// Parameters the caller must compute from structural query parameters
    /// before running the translated query.
    pub fn runtime_parameters(&self) -> &[helpers::RuntimeParameter] {
        &self.state.runtime_parameters
    }
}

/// Translate and finish an expression: a top-level cast to `object` is
/// dropped, and with `apply_default_type_mapping` the result must end up
/// typed.
pub fn translate_internal(
    env: &Env,
    state: &mut State,
    expression: &QueryExpression,
    apply_default_type_mapping: bool,
) -> Result<Option<sql::ast::Expression>, Error> {
    Ok(translate_expression(env, state, expression)?
        .into_sql()
        .and_then(|sql_expression| finish_sql(env, sql_expression, apply_default_type_mapping)))
}

fn finish_sql(
    env: &Env,
    sql_expression: sql::ast::Expression,
    apply_default_type_mapping: bool,
) -> Option<sql::ast::Expression> {
    let sql_expression = match sql_expression {
        sql::ast::Expression {
            kind: sql::ast::ExpressionKind::Convert { expression },
            r#type: ClrType::Object,
            ..
        } => *expression,
        other => other,
    };
    if apply_default_type_mapping {
        let sql_expression = env.factory.apply_default_type_mapping(sql_expression);
        sql_expression.type_mapping.is_some().then_some(sql_expression)
    } else {
        Some(sql_expression)
    }
}

/// Translate a sub-expression, expecting SQL.
pub fn translate_sql(
    env: &Env,
    state: &mut State,
    expression: &QueryExpression,
) -> Result<Option<sql::ast::Expression>, Error> {
    Ok(translate_expression(env, state, expression)?.into_sql())
}

/// Translate a single node, dispatching on its kind.
pub fn translate_expression(
    env: &Env,
    state: &mut State,
    expression: &QueryExpression,
) -> Result<Translation, Error> {
    match expression {
        QueryExpression::Constant { value, r#type } => Ok(Translation::Sql(
            env.factory
                .constant(values::translate_json_value(value, r#type)?, r#type.clone()),
        )),
        QueryExpression::TypeConstant(r#type) => Ok(Translation::Sql(env.factory.constant(
            sql::ast::Value::String(r#type.to_string()),
            ClrType::Type,
        ))),
        QueryExpression::Parameter { name, r#type }
        | QueryExpression::ParameterQueryRoot { name, r#type } => Ok(Translation::Sql(
            env.factory.parameter(name.as_str(), r#type.clone()),
        )),
        QueryExpression::Unary {
            operator,
            operand,
            r#type,
        } => unary::translate_unary(env, state, *operator, operand, r#type),
        QueryExpression::Binary {
            operator,
            left,
            right,
        } => binary::translate_binary(env, state, *operator, left, right),
        QueryExpression::Conditional {
            test,
            if_true,
            if_false,
        } => translate_conditional(env, state, test, if_true, if_false),
        QueryExpression::Member {
            expression: instance,
            member,
            r#type,
        } => members::translate_member(env, state, instance.as_deref(), member, r#type),
        QueryExpression::MethodCall {
            object,
            method,
            arguments,
        } => methods::translate_method_call(env, state, object.as_deref(), method, arguments),
        QueryExpression::TypeIs {
            expression: operand,
            type_operand,
        } => type_tests::translate_type_is(env, state, expression, operand, type_operand),
        QueryExpression::New { r#type, .. } | QueryExpression::MemberInit { r#type, .. } => {
            let value = constant_value(env.types(), expression);
            if value.is_none() {
                state.errors.add(format!(
                    "The construction '{expression}' could not be translated because it is not a constant of '{}'.",
                    r#type
                ));
            }
            Ok(evaluate_constant(env, r#type, value))
        }
        QueryExpression::NewArray { element_type, .. } => match constant_value(env.types(), expression) {
            Some(elements) => {
                let r#type = ClrType::sequence(element_type.clone());
                let value = values::translate_json_value(&elements, &r#type)?;
                Ok(Translation::Sql(env.factory.constant(value, r#type)))
            }
            None => {
                state.errors.add(format!(
                    "The array '{expression}' could not be translated because not all of its elements are constants."
                ));
                Ok(Translation::NotTranslated)
            }
        },
        QueryExpression::StructuralTypeShaper(shaper) => Ok(Translation::StructuralReference(
            StructuralTypeReference::Row(shaper.clone()),
        )),
        QueryExpression::Shaped(shaped) => subquery::translate_shaped_query(env, state, shaped),
        QueryExpression::Sql(sql_expression) => Ok(Translation::Sql(sql_expression.clone())),
        QueryExpression::Enumerable(enumerable) => {
            Ok(Translation::Enumerable(enumerable.as_ref().clone()))
        }
        QueryExpression::EntityQueryRoot { .. } | QueryExpression::GroupByElement { .. } => {
            Ok(Translation::NotTranslated)
        }
        QueryExpression::Lambda { .. }
        | QueryExpression::LambdaParameter { .. }
        | QueryExpression::Invocation { .. }
        | QueryExpression::ListInit { .. } => {
            Err(Error::TranslationFailed(expression.to_string()))
        }
    }
}

fn translate_conditional(
    env: &Env,
    state: &mut State,
    test: &QueryExpression,
    if_true: &QueryExpression,
    if_false: &QueryExpression,
) -> Result<Translation, Error> {
    let test = translate_expression(env, state, test)?;
    let if_true = translate_expression(env, state, if_true)?;
    let if_false = translate_expression(env, state, if_false)?;

    match (test, if_true, if_false) {
        (Translation::Sql(test), Translation::Sql(if_true), Translation::Sql(if_false)) => {
            Ok(Translation::Sql(env.factory.case(
                vec![sql::ast::CaseWhenClause {
                    test,
                    result: if_true,
                }],
                Some(if_false),
            )))
        }
        _ => Ok(Translation::NotTranslated),
    }
}

/// The value of a node which can be computed before the query runs.
///
/// A structural value is keyed by member name; the arguments of its
/// constructor bind the members in declaration order.
fn constant_value(
    types: &metadata::StructuralTypes,
    expression: &QueryExpression,
) -> Option<serde_json::Value> {
    match expression {
        QueryExpression::Constant { value, .. } => Some(value.clone()),
        QueryExpression::Unary {
            operator: crate::translation::expression::UnaryOperator::Convert,
            operand,
            ..
        } => constant_value(types, operand),
        QueryExpression::New { r#type, arguments } => match r#type.structural_type_name() {
            Some(structural_type) => {
                let members: Vec<&str> = types
                    .properties(structural_type)
                    .into_iter()
                    .map(|(name, _)| name)
                    .chain(
                        types
                            .complex_properties(structural_type)
                            .into_iter()
                            .map(|(name, _)| name),
                    )
                    .collect();
                if members.len() != arguments.len() {
                    return None;
                }
                members
                    .into_iter()
                    .zip(arguments)
                    .map(|(member, argument)| {
                        Some((member.to_string(), constant_value(types, argument)?))
                    })
                    .collect::<Option<serde_json::Map<_, _>>>()
                    .map(serde_json::Value::Object)
            }
            None => arguments
                .iter()
                .map(|argument| constant_value(types, argument))
                .collect::<Option<Vec<_>>>()
                .map(serde_json::Value::Array),
        },
        QueryExpression::MemberInit { bindings, .. } => bindings
            .iter()
            .map(|(member, binding)| Some((member.clone(), constant_value(types, binding)?)))
            .collect::<Option<serde_json::Map<_, _>>>()
            .map(serde_json::Value::Object),
        QueryExpression::NewArray { expressions, .. } => expressions
            .iter()
            .map(|element| constant_value(types, element))
            .collect::<Option<Vec<_>>>()
            .map(serde_json::Value::Array),
        _ => None,
    }
}

/// Object construction is only translated when all of it is known up front.
fn evaluate_constant(env: &Env, r#type: &ClrType, value: Option<serde_json::Value>) -> Translation {
    match value {
        Some(value) => Translation::Sql(env.factory.constant(
            sql::ast::Value::Json(value),
            r#type.clone(),
        )),
        None => Translation::NotTranslated,
    }
}

/// A shaper reading `structural_type` from the projection of a select.
pub fn structural_shaper(
    query: &sql::select::SelectExpression,
    member: &sql::select::ProjectionMember,
    structural_type: &str,
    nullable: bool,
) -> Option<StructuralTypeShaper> {
    match query.get_projection(member)? {
        sql::select::Projection::Structural(projection) => Some(StructuralTypeShaper {
            structural_type: structural_type.to_string(),
            projection: projection.clone(),
            nullable,
        }),
        sql::select::Projection::Sql(_) => None,
    }
}
