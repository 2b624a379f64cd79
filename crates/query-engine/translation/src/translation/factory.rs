//! Build SQL expressions with their type mappings.
//!
//! Every node handed out by the translator is built here, so that operands of
//! an operator end up compared and computed with one and the same mapping.

use query_engine_metadata::metadata::{ClrType, TypeMapping, TypeMappingSource};
use query_engine_sql::sql;
use sql::ast::{BinaryOperator, CaseWhenClause, Expression, ExpressionKind, Function, UnaryOperator};

/// Creates typed SQL expressions.
pub struct SqlExpressionFactory<'a> {
    type_mapping_source: &'a dyn TypeMappingSource,
    supports_greatest_least: bool,
}

impl<'a> SqlExpressionFactory<'a> {
    pub fn new(type_mapping_source: &'a dyn TypeMappingSource, supports_greatest_least: bool) -> Self {
        SqlExpressionFactory {
            type_mapping_source,
            supports_greatest_least,
        }
    }

    pub fn find_mapping(&self, r#type: &ClrType) -> Option<TypeMapping> {
        self.type_mapping_source.find_mapping(r#type)
    }

    /// Give an untyped expression the default mapping of its type.
    pub fn apply_default_type_mapping(&self, expression: Expression) -> Expression {
        if expression.type_mapping.is_some() {
            return expression;
        }
        let mapping = self.find_mapping(&expression.r#type);
        self.apply_type_mapping(expression, mapping)
    }

    /// Give an untyped expression, and its untyped operands, a mapping.
    /// Typed expressions are returned unchanged.
    pub fn apply_type_mapping(
        &self,
        expression: Expression,
        type_mapping: Option<TypeMapping>,
    ) -> Expression {
        if expression.type_mapping.is_some() || type_mapping.is_none() {
            return expression;
        }
        let Expression { kind, r#type, .. } = expression;
        let apply = |inner: Expression| self.apply_type_mapping(inner, type_mapping.clone());

        let kind = match kind {
            ExpressionKind::Case {
                operand,
                when_clauses,
                else_result,
            } => ExpressionKind::Case {
                operand,
                when_clauses: when_clauses
                    .into_iter()
                    .map(|clause| CaseWhenClause {
                        test: clause.test,
                        result: apply(clause.result),
                    })
                    .collect(),
                else_result: else_result.map(|result| Box::new(apply(*result))),
            },
            ExpressionKind::UnaryOperation {
                operator: UnaryOperator::Negate,
                expression,
            } => ExpressionKind::UnaryOperation {
                operator: UnaryOperator::Negate,
                expression: Box::new(apply(*expression)),
            },
            ExpressionKind::BinaryOperation {
                left,
                operator,
                right,
            } if !operator.is_comparison() && !operator.is_logical() => {
                ExpressionKind::BinaryOperation {
                    left: Box::new(apply(*left)),
                    operator,
                    right: Box::new(apply(*right)),
                }
            }
            ExpressionKind::FunctionCall {
                function: function @ (Function::Coalesce | Function::Greatest | Function::Least),
                args,
            } => ExpressionKind::FunctionCall {
                function,
                args: args.into_iter().map(apply).collect(),
            },
            ExpressionKind::Distinct(inner) => ExpressionKind::Distinct(Box::new(apply(*inner))),
            other => other,
        };

        Expression {
            kind,
            r#type,
            type_mapping,
        }
    }

    /// The mapping of the first typed expression, or the default mapping of
    /// the first non-null one.
    fn infer_type_mapping(&self, expressions: &[&Expression]) -> Option<TypeMapping> {
        expressions
            .iter()
            .find_map(|expression| expression.type_mapping.clone())
            .or_else(|| {
                expressions
                    .iter()
                    .find(|expression| !expression.is_null_constant())
                    .and_then(|expression| self.find_mapping(&expression.r#type))
            })
    }

    /// A binary operation. Comparing to the NULL literal becomes a null test.
    pub fn make_binary(
        &self,
        operator: BinaryOperator,
        left: Expression,
        right: Expression,
    ) -> Expression {
        if operator.is_logical() {
            let left = self.apply_type_mapping(left, Some(sql::helpers::bool_mapping()));
            let right = self.apply_type_mapping(right, Some(sql::helpers::bool_mapping()));
            return sql::helpers::bool_binary(left, operator, right);
        }

        if matches!(operator, BinaryOperator::Equal | BinaryOperator::NotEqual) {
            let null_test = |operand: Expression| {
                let operand = self.apply_default_type_mapping(operand);
                if operator == BinaryOperator::Equal {
                    sql::helpers::is_null(operand)
                } else {
                    sql::helpers::is_not_null(operand)
                }
            };
            if right.is_null_constant() {
                return null_test(left);
            }
            if left.is_null_constant() {
                return null_test(right);
            }
        }

        let mapping = self.infer_type_mapping(&[&left, &right]);
        let left = self.apply_type_mapping(left, mapping.clone());
        let right = self.apply_type_mapping(right, mapping.clone());

        if operator.is_comparison() {
            sql::helpers::bool_binary(left, operator, right)
        } else {
            let r#type = if left.is_null_constant() {
                right.r#type.clone()
            } else {
                left.r#type.clone()
            };
            Expression {
                kind: ExpressionKind::BinaryOperation {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                },
                r#type,
                type_mapping: mapping,
            }
        }
    }

    pub fn equal(&self, left: Expression, right: Expression) -> Expression {
        self.make_binary(BinaryOperator::Equal, left, right)
    }

    pub fn not_equal(&self, left: Expression, right: Expression) -> Expression {
        self.make_binary(BinaryOperator::NotEqual, left, right)
    }

    pub fn and_also(&self, left: Expression, right: Expression) -> Expression {
        self.make_binary(BinaryOperator::AndAlso, left, right)
    }

    pub fn or_else(&self, left: Expression, right: Expression) -> Expression {
        self.make_binary(BinaryOperator::OrElse, left, right)
    }

    pub fn is_null(&self, operand: Expression) -> Expression {
        sql::helpers::is_null(self.apply_default_type_mapping(operand))
    }

    pub fn is_not_null(&self, operand: Expression) -> Expression {
        sql::helpers::is_not_null(self.apply_default_type_mapping(operand))
    }

    /// Logical negation, folded into null tests, double negations and constants.
    pub fn not(&self, operand: Expression) -> Expression {
        if !operand.r#type.is_boolean() {
            let operand = self.apply_default_type_mapping(operand);
            return Expression {
                r#type: operand.r#type.clone(),
                type_mapping: operand.type_mapping.clone(),
                kind: ExpressionKind::UnaryOperation {
                    operator: UnaryOperator::Not,
                    expression: Box::new(operand),
                },
            };
        }

        let Expression {
            kind,
            r#type,
            type_mapping,
        } = operand;
        match kind {
            ExpressionKind::UnaryOperation {
                operator: UnaryOperator::IsNull,
                expression,
            } => sql::helpers::is_not_null(*expression),
            ExpressionKind::UnaryOperation {
                operator: UnaryOperator::IsNotNull,
                expression,
            } => sql::helpers::is_null(*expression),
            ExpressionKind::UnaryOperation {
                operator: UnaryOperator::Not,
                expression,
            } => *expression,
            ExpressionKind::Value(sql::ast::Value::Bool(value)) => sql::helpers::bool_value(!value),
            kind => sql::helpers::not(self.apply_type_mapping(
                Expression {
                    kind,
                    r#type,
                    type_mapping,
                },
                Some(sql::helpers::bool_mapping()),
            )),
        }
    }

    pub fn negate(&self, operand: Expression) -> Expression {
        let operand = self.apply_default_type_mapping(operand);
        Expression {
            r#type: operand.r#type.clone(),
            type_mapping: operand.type_mapping.clone(),
            kind: ExpressionKind::UnaryOperation {
                operator: UnaryOperator::Negate,
                expression: Box::new(operand),
            },
        }
    }

    /// `COALESCE(left, right)`, evaluating to `r#type`.
    pub fn coalesce(&self, left: Expression, right: Expression, r#type: ClrType) -> Expression {
        let mapping = self.infer_type_mapping(&[&left, &right]);
        let args = vec![
            self.apply_type_mapping(left, mapping.clone()),
            self.apply_type_mapping(right, mapping.clone()),
        ];
        self.function(Function::Coalesce, args, r#type, mapping)
    }

    /// A searched CASE. Without an ELSE arm the result may be NULL.
    pub fn case(
        &self,
        when_clauses: Vec<CaseWhenClause>,
        else_result: Option<Expression>,
    ) -> Expression {
        let mut results: Vec<&Expression> = when_clauses.iter().map(|clause| &clause.result).collect();
        results.extend(else_result.as_ref());
        let mapping = self.infer_type_mapping(&results);
        let result_type = results
            .iter()
            .find(|result| !result.is_null_constant())
            .or(results.first())
            .map_or(ClrType::Object, |result| result.r#type.clone());
        let r#type = if else_result.is_none() {
            result_type.make_nullable()
        } else {
            result_type
        };

        let when_clauses = when_clauses
            .into_iter()
            .map(|clause| CaseWhenClause {
                test: self.apply_type_mapping(clause.test, Some(sql::helpers::bool_mapping())),
                result: self.apply_type_mapping(clause.result, mapping.clone()),
            })
            .collect();
        let else_result =
            else_result.map(|result| Box::new(self.apply_type_mapping(result, mapping.clone())));

        Expression {
            kind: ExpressionKind::Case {
                operand: None,
                when_clauses,
                else_result,
            },
            r#type,
            type_mapping: mapping,
        }
    }

    /// An explicit conversion, typed with the default mapping of the target.
    pub fn convert(&self, operand: Expression, r#type: ClrType) -> Expression {
        let type_mapping = self.find_mapping(&r#type);
        Expression {
            kind: ExpressionKind::Convert {
                expression: Box::new(self.apply_default_type_mapping(operand)),
            },
            r#type,
            type_mapping,
        }
    }

    /// An untyped literal.
    pub fn constant(&self, value: sql::ast::Value, r#type: ClrType) -> Expression {
        Expression {
            kind: ExpressionKind::Value(value),
            r#type,
            type_mapping: None,
        }
    }

    /// An untyped query parameter.
    pub fn parameter(&self, name: impl Into<String>, r#type: ClrType) -> Expression {
        Expression {
            kind: ExpressionKind::Parameter {
                name: name.into(),
                nullable: r#type.is_nullable_type(),
            },
            r#type,
            type_mapping: None,
        }
    }

    pub fn in_values(&self, item: Expression, values: Vec<Expression>) -> Expression {
        let mut operands = vec![&item];
        operands.extend(values.iter());
        let mapping = self.infer_type_mapping(&operands);
        sql::helpers::in_values(
            self.apply_type_mapping(item, mapping.clone()),
            values
                .into_iter()
                .map(|value| self.apply_type_mapping(value, mapping.clone()))
                .collect(),
        )
    }

    pub fn exists(&self, select: sql::ast::Select) -> Expression {
        sql::helpers::exists(select)
    }

    pub fn scalar_subquery(
        &self,
        select: sql::ast::Select,
        r#type: ClrType,
        type_mapping: Option<TypeMapping>,
    ) -> Expression {
        Expression {
            kind: ExpressionKind::ScalarSubquery {
                select: Box::new(select),
            },
            r#type,
            type_mapping,
        }
    }

    pub fn function(
        &self,
        function: Function,
        args: Vec<Expression>,
        r#type: ClrType,
        type_mapping: Option<TypeMapping>,
    ) -> Expression {
        Expression {
            kind: ExpressionKind::FunctionCall { function, args },
            r#type,
            type_mapping,
        }
    }

    /// `GREATEST(args)`, when the database has it.
    pub fn greatest(&self, args: Vec<Expression>, r#type: ClrType) -> Option<Expression> {
        self.extremum(Function::Greatest, args, r#type)
    }

    /// `LEAST(args)`, when the database has it.
    pub fn least(&self, args: Vec<Expression>, r#type: ClrType) -> Option<Expression> {
        self.extremum(Function::Least, args, r#type)
    }

    fn extremum(
        &self,
        function: Function,
        args: Vec<Expression>,
        r#type: ClrType,
    ) -> Option<Expression> {
        if !self.supports_greatest_least {
            return None;
        }
        let mapping = self
            .infer_type_mapping(&args.iter().collect::<Vec<_>>())
            .or_else(|| self.find_mapping(&r#type));
        let args = args
            .into_iter()
            .map(|arg| self.apply_type_mapping(arg, mapping.clone()))
            .collect();
        Some(self.function(function, args, r#type, mapping))
    }
}

#[cfg(test)]
mod tests {
    use query_engine_metadata::metadata::{DefaultTypeMappingSource, StoreType};

    use super::*;

    fn column(name: &str, r#type: ClrType) -> Expression {
        let mapping = DefaultTypeMappingSource.find_mapping(&r#type);
        let nullable = r#type.is_nullable_type();
        sql::helpers::make_column(
            sql::helpers::make_table_alias(0, "o".to_string()),
            name,
            r#type,
            mapping,
            nullable,
        )
    }

    #[test]
    fn constants_take_the_mapping_of_the_column_they_are_compared_to() {
        let factory = SqlExpressionFactory::new(&DefaultTypeMappingSource, true);
        let comparison = factory.equal(
            column("Status", ClrType::Byte),
            factory.constant(sql::ast::Value::Int(3), ClrType::Byte),
        );
        match comparison.kind {
            ExpressionKind::BinaryOperation { right, .. } => assert_eq!(
                right.type_mapping.map(|mapping| mapping.store_type),
                Some(StoreType::Tinyint)
            ),
            other => panic!("expected a comparison, got {other:?}"),
        }
    }

    #[test]
    fn comparing_with_null_is_a_null_test() {
        let factory = SqlExpressionFactory::new(&DefaultTypeMappingSource, true);
        let null = factory.constant(sql::ast::Value::Null, ClrType::String);
        assert_eq!(
            factory.not_equal(null, column("Name", ClrType::String)).to_string(),
            "[o].[Name] IS NOT NULL"
        );
    }

    #[test]
    fn negation_folds_into_null_tests_and_constants() {
        let factory = SqlExpressionFactory::new(&DefaultTypeMappingSource, true);
        let test = factory.is_null(column("Name", ClrType::String));
        assert_eq!(factory.not(test).to_string(), "[o].[Name] IS NOT NULL");
        assert_eq!(
            factory.not(sql::helpers::true_expr()),
            sql::helpers::false_expr()
        );
        let flag = column("IsActive", ClrType::Boolean);
        assert_eq!(factory.not(factory.not(flag.clone())), flag);
    }

    #[test]
    fn greatest_is_only_built_when_supported() {
        let factory = SqlExpressionFactory::new(&DefaultTypeMappingSource, false);
        let args = vec![column("A", ClrType::Int32), column("B", ClrType::Int32)];
        assert_eq!(factory.greatest(args.clone(), ClrType::Int32), None);

        let factory = SqlExpressionFactory::new(&DefaultTypeMappingSource, true);
        assert_eq!(
            factory
                .least(args, ClrType::Int32)
                .map(|least| least.to_string())
                .as_deref(),
            Some("LEAST([o].[A], [o].[B])")
        );
    }
}
