//! Built-in translations of aggregate operators over groupings.

use query_engine_metadata::metadata::ClrType;
use query_engine_sql::sql;
use sql::ast::{CaseWhenClause, Expression, ExpressionKind, Function, Value};

use super::{AggregateMethodCallTranslator, ProviderContext};
use crate::translation::expression::{DeclaringType, MethodInfo, QueryExpression};
use crate::translation::factory::SqlExpressionFactory;
use crate::translation::query::enumerable::EnumerableExpression;

/// `Count`, `LongCount`, `Sum`, `Average`, `Max` and `Min`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAggregateMethodCallTranslator;

impl AggregateMethodCallTranslator for DefaultAggregateMethodCallTranslator {
    fn translate(
        &self,
        context: &mut ProviderContext<'_, '_>,
        method: &MethodInfo,
        source: &EnumerableExpression,
        _arguments: &[Expression],
    ) -> Option<Expression> {
        let factory = context.factory;
        if !matches!(
            method.declaring_type,
            DeclaringType::Queryable | DeclaringType::Enumerable
        ) {
            return None;
        }

        let selector = match &source.selector {
            QueryExpression::Sql(selector) => Some(selector.clone()),
            _ => None,
        };
        let return_type = method.return_type.clone();

        match method.name.as_str() {
            "Count" | "LongCount" => {
                let term = combine_terms(factory, source, selector.unwrap_or_else(star));
                let mapping = factory.find_mapping(&return_type);
                Some(factory.function(Function::Count, vec![term], return_type, mapping))
            }
            "Sum" => {
                let term = combine_terms(factory, source, selector?);
                let mapping = term.type_mapping.clone();
                let sum = factory.function(
                    Function::Sum,
                    vec![term],
                    return_type.clone().make_nullable(),
                    mapping,
                );
                let zero = factory.constant(Value::Int(0), return_type.clone());
                Some(factory.coalesce(sum, zero, return_type))
            }
            "Average" => {
                let selector = selector?;
                let selector = if matches!(
                    selector.r#type.unwrap_nullable(),
                    ClrType::Int32 | ClrType::Int64
                ) {
                    factory.convert(selector, ClrType::Double)
                } else {
                    selector
                };
                let term = combine_terms(factory, source, selector);
                let mapping = factory.find_mapping(&return_type);
                Some(factory.function(Function::Avg, vec![term], return_type, mapping))
            }
            "Max" | "Min" => {
                let term = combine_terms(factory, source, selector?);
                let mapping = term.type_mapping.clone();
                let function = if method.name == "Max" {
                    Function::Max
                } else {
                    Function::Min
                };
                Some(factory.function(function, vec![term], return_type, mapping))
            }
            _ => None,
        }
    }
}

fn star() -> Expression {
    Expression {
        kind: ExpressionKind::Star,
        r#type: ClrType::Object,
        type_mapping: None,
    }
}

/// Fold the filter and distinctness of the source into the aggregated term:
/// `CASE WHEN predicate THEN term END`, then `DISTINCT term`.
fn combine_terms(
    factory: &SqlExpressionFactory,
    source: &EnumerableExpression,
    term: Expression,
) -> Expression {
    let term = match &source.predicate {
        None => factory.apply_default_type_mapping(term),
        Some(predicate) => {
            let result = if term.kind == ExpressionKind::Star {
                factory.apply_default_type_mapping(
                    factory.constant(Value::Int(1), ClrType::Int32),
                )
            } else {
                factory.apply_default_type_mapping(term)
            };
            factory.case(
                vec![CaseWhenClause {
                    test: predicate.clone(),
                    result,
                }],
                None,
            )
        }
    };

    if source.is_distinct {
        Expression {
            r#type: term.r#type.clone(),
            type_mapping: term.type_mapping.clone(),
            kind: ExpressionKind::Distinct(Box::new(term)),
        }
    } else {
        term
    }
}

#[cfg(test)]
mod tests {
    use query_engine_configuration::TranslatorOptions;
    use query_engine_metadata::metadata::{DefaultTypeMappingSource, Metadata, TypeMappingSource};

    use super::*;
    use crate::translation::query::error::TranslationErrors;

    fn column(name: &str, r#type: ClrType) -> Expression {
        sql::helpers::make_column(
            sql::helpers::make_table_alias(0, "o".to_string()),
            name,
            r#type.clone(),
            DefaultTypeMappingSource.find_mapping(&r#type),
            false,
        )
    }

    fn translate(name: &str, return_type: ClrType, source: &EnumerableExpression) -> String {
        let factory = SqlExpressionFactory::new(&DefaultTypeMappingSource, true);
        let metadata = Metadata::empty();
        let mut errors = TranslationErrors::default();
        let mut context = ProviderContext {
            factory: &factory,
            metadata: &metadata,
            options: TranslatorOptions::default(),
            errors: &mut errors,
        };
        let method = MethodInfo::new_static(DeclaringType::Queryable, name, return_type);
        DefaultAggregateMethodCallTranslator
            .translate(&mut context, &method, source, &[])
            .map(|aggregate| aggregate.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn count_of_a_filtered_source_counts_the_matching_rows() {
        let source = EnumerableExpression::new(QueryExpression::lambda_parameter(
            "o",
            ClrType::structural("Order"),
        ))
        .apply_predicate(sql::helpers::bool_binary(
            column("Quantity", ClrType::Int32),
            sql::ast::BinaryOperator::GreaterThan,
            sql::helpers::make_column(
                sql::helpers::make_table_alias(0, "o".to_string()),
                "Minimum",
                ClrType::Int32,
                None,
                false,
            ),
        ));
        assert_eq!(
            translate("Count", ClrType::Int32, &source),
            "COUNT(CASE WHEN ([o].[Quantity] > [o].[Minimum]) THEN 1 END)"
        );
    }

    #[test]
    fn distinct_sources_aggregate_distinct_values() {
        let source = EnumerableExpression::new(QueryExpression::Sql(column(
            "Quantity",
            ClrType::Int32,
        )))
        .set_distinct(true);
        assert_eq!(
            translate("Max", ClrType::Int32, &source),
            "MAX(DISTINCT [o].[Quantity])"
        );
        assert_eq!(
            translate("Sum", ClrType::Int32, &source),
            "COALESCE(SUM(DISTINCT [o].[Quantity]), 0)"
        );
    }

    #[test]
    fn averages_of_integers_are_computed_in_floating_point() {
        let source =
            EnumerableExpression::new(QueryExpression::Sql(column("Quantity", ClrType::Int32)));
        assert_eq!(
            translate("Average", ClrType::Double, &source),
            "AVG(CAST([o].[Quantity] AS float))"
        );
    }

    #[test]
    fn aggregates_of_structural_values_are_not_translated() {
        let source = EnumerableExpression::new(QueryExpression::lambda_parameter(
            "o",
            ClrType::structural("Order"),
        ));
        assert_eq!(translate("Min", ClrType::Int32, &source), "");
        assert_eq!(translate("Count", ClrType::Int32, &source), "COUNT(*)");
    }
}
