//! Helpers for building sql::ast types in certain shapes and patterns.

use query_engine_metadata::metadata::{ClrType, StoreType, TypeMapping};

use super::ast::*;

// Empty clauses //

/// An empty `WHERE` clause.
pub fn empty_where() -> Expression {
    true_expr()
}

// Typed scalars //

/// The mapping of every boolean-valued node.
pub fn bool_mapping() -> TypeMapping {
    TypeMapping {
        store_type: StoreType::Bit,
        clr_type: ClrType::Boolean,
    }
}

/// A `true` expression.
pub fn true_expr() -> Expression {
    bool_value(true)
}

/// A `false` expression.
pub fn false_expr() -> Expression {
    bool_value(false)
}

pub fn bool_value(value: bool) -> Expression {
    Expression {
        kind: ExpressionKind::Value(Value::Bool(value)),
        r#type: ClrType::Boolean,
        type_mapping: Some(bool_mapping()),
    }
}

/// A reference to a column of a table in scope.
pub fn make_column(
    table: TableAlias,
    name: &str,
    r#type: ClrType,
    type_mapping: Option<TypeMapping>,
    nullable: bool,
) -> Expression {
    Expression {
        kind: ExpressionKind::Column(ColumnExpression {
            table,
            name: ColumnName(name.to_string()),
            nullable,
        }),
        r#type,
        type_mapping,
    }
}

/// Build a boolean-valued node around an already typed shape.
fn predicate(kind: ExpressionKind) -> Expression {
    Expression {
        kind,
        r#type: ClrType::Boolean,
        type_mapping: Some(bool_mapping()),
    }
}

pub fn is_null(expression: Expression) -> Expression {
    predicate(ExpressionKind::UnaryOperation {
        operator: UnaryOperator::IsNull,
        expression: Box::new(expression),
    })
}

pub fn is_not_null(expression: Expression) -> Expression {
    predicate(ExpressionKind::UnaryOperation {
        operator: UnaryOperator::IsNotNull,
        expression: Box::new(expression),
    })
}

pub fn not(expression: Expression) -> Expression {
    predicate(ExpressionKind::UnaryOperation {
        operator: UnaryOperator::Not,
        expression: Box::new(expression),
    })
}

/// A boolean binary node: a comparison or a logical connective.
pub fn bool_binary(left: Expression, operator: BinaryOperator, right: Expression) -> Expression {
    predicate(ExpressionKind::BinaryOperation {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    })
}

pub fn equal(left: Expression, right: Expression) -> Expression {
    bool_binary(left, BinaryOperator::Equal, right)
}

pub fn and(left: Expression, right: Expression) -> Expression {
    bool_binary(left, BinaryOperator::AndAlso, right)
}

pub fn or(left: Expression, right: Expression) -> Expression {
    bool_binary(left, BinaryOperator::OrElse, right)
}

/// Combine predicates with `AND`. An empty list is `None`.
pub fn conjunction(predicates: impl IntoIterator<Item = Expression>) -> Option<Expression> {
    predicates.into_iter().reduce(and)
}

/// Combine predicates with `OR`. An empty list is `None`.
pub fn disjunction(predicates: impl IntoIterator<Item = Expression>) -> Option<Expression> {
    predicates.into_iter().reduce(or)
}

pub fn in_values(item: Expression, values: Vec<Expression>) -> Expression {
    predicate(ExpressionKind::In {
        item: Box::new(item),
        values,
    })
}

pub fn exists(select: Select) -> Expression {
    predicate(ExpressionKind::Exists {
        select: Box::new(select),
    })
}

// Aliasing //

/// Create column aliases using this function so we build everything in one place.
pub fn make_column_alias(name: String) -> ColumnAlias {
    ColumnAlias { name }
}

/// Create table aliases using this function so they get a unique index.
pub fn make_table_alias(unique_index: u64, name: String) -> TableAlias {
    TableAlias { unique_index, name }
}
