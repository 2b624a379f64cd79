//! Type definitions of a SQL AST representation.

use query_engine_metadata::metadata::{ClrType, TypeMapping};

/// A SELECT clause, frozen once its projection was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub distinct: bool,
    pub select_list: SelectList,
    pub from: Option<From>,
    pub joins: Vec<Join>,
    pub where_: Where,
    pub group_by: GroupBy,
    pub having: Option<Expression>,
    pub order_by: OrderBy,
    pub limit: Limit,
}

/// A select list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectList {
    SelectList(Vec<(ColumnAlias, Expression)>),
    /// `SELECT 1`, used when only the existence of rows matters.
    Select1,
}

/// A FROM clause
#[derive(Debug, Clone, PartialEq)]
pub enum From {
    /// Select from a table reference
    Table {
        reference: TableReference,
        alias: TableAlias,
    },
}

/// A JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub enum Join {
    /// LEFT OUTER JOIN
    LeftOuterJoin(LeftOuterJoin),
}

/// A LEFT OUTER JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub struct LeftOuterJoin {
    pub table: From,
    pub on: Expression,
}

/// A WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Where(pub Expression);

/// A GROUP BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy {
    pub elements: Vec<Expression>,
}

/// An ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub elements: Vec<OrderByElement>,
}

/// A single element in an ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement {
    pub target: Expression,
    pub direction: OrderByDirection,
}

/// A direction for a single ORDER BY element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

/// LIMIT and OFFSET clauses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limit {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// A scalar expression.
///
/// Every node carries its conceptual type and, once known, the storage type
/// mapping it is read and compared with. A node without a mapping is untyped
/// and must gain one before it is handed out as a final result.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub r#type: ClrType,
    pub type_mapping: Option<TypeMapping>,
}

/// The shape of a scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// A column of a table in scope
    Column(ColumnExpression),
    /// An irreducible value
    Value(Value),
    /// A query parameter
    Parameter { name: String, nullable: bool },
    /// An unary operation on a scalar expression
    UnaryOperation {
        operator: UnaryOperator,
        expression: Box<Expression>,
    },
    /// A binary operation on two scalar expression
    BinaryOperation {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    /// A searched (or simple, when `operand` is set) CASE expression
    Case {
        operand: Option<Box<Expression>>,
        when_clauses: Vec<CaseWhenClause>,
        else_result: Option<Box<Expression>>,
    },
    /// A membership test against a list of values
    In {
        item: Box<Expression>,
        values: Vec<Expression>,
    },
    /// An EXISTS clause
    Exists { select: Box<Select> },
    /// A subquery returning a single row with a single column
    ScalarSubquery { select: Box<Select> },
    /// An explicit conversion to the type of this node
    Convert { expression: Box<Expression> },
    /// A scalar or aggregate function call
    FunctionCall {
        function: Function,
        args: Vec<Expression>,
    },
    /// `DISTINCT x`, as the argument of an aggregate function
    Distinct(Box<Expression>),
    /// `*`, as the argument of `COUNT`
    Star,
}

/// A reference to a column of a table in scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnExpression {
    pub table: TableAlias,
    pub name: ColumnName,
    pub nullable: bool,
}

/// A single `WHEN test THEN result` arm of a CASE expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseWhenClause {
    pub test: Expression,
    pub result: Expression,
}

/// An unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
    IsNull,
    IsNotNull,
}

/// A binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitwiseAnd,
    BitwiseOr,
    ExclusiveOr,
    AndAlso,
    OrElse,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Like,
}

impl BinaryOperator {
    /// Does the operator produce a boolean from two operands of the same type.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
                | BinaryOperator::Like
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::AndAlso | BinaryOperator::OrElse)
    }
}

/// A scalar function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    Coalesce,
    Greatest,
    Least,
    Count,
    Sum,
    Avg,
    Max,
    Min,
    Upper,
    Lower,
    Trim,
    Len,
    Abs,
    Round,
    Floor,
    Ceiling,
    Unknown(String),
}

/// Value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// A number printed as written, for integers beyond `i64` and decimals.
    Number(String),
    String(String),
    Array(Vec<Value>),
    /// A materialized structural value, kept whole until its members are
    /// compared one by one.
    Json(serde_json::Value),
}

/// A database schema name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaName(pub String);

/// A database table name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(pub String);

/// A reference to a table. Used when we want to query it,
/// for example in a FROM clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableReference {
    /// refers to a db table object name
    DBTable {
        schema: Option<SchemaName>,
        table: TableName,
    },
}

/// A database table's column name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnName(pub String);

/// aliases that we give to relations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableAlias {
    pub unique_index: u64,
    pub name: String,
}

/// aliases that we give to columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnAlias {
    pub name: String,
}

impl Expression {
    /// Can the expression evaluate to NULL.
    pub fn is_nullable(&self) -> bool {
        match &self.kind {
            ExpressionKind::Column(column) => column.nullable,
            ExpressionKind::Value(value) => *value == Value::Null,
            ExpressionKind::Parameter { nullable, .. } => *nullable,
            ExpressionKind::UnaryOperation {
                operator: UnaryOperator::IsNull | UnaryOperator::IsNotNull,
                ..
            }
            | ExpressionKind::Exists { .. }
            | ExpressionKind::In { .. }
            | ExpressionKind::Star => false,
            ExpressionKind::UnaryOperation { expression, .. }
            | ExpressionKind::Convert { expression }
            | ExpressionKind::Distinct(expression) => expression.is_nullable(),
            ExpressionKind::BinaryOperation { left, right, .. } => {
                left.is_nullable() || right.is_nullable()
            }
            ExpressionKind::Case {
                when_clauses,
                else_result,
                ..
            } => {
                else_result.as_ref().map_or(true, |e| e.is_nullable())
                    || when_clauses.iter().any(|clause| clause.result.is_nullable())
            }
            ExpressionKind::FunctionCall { function, args } => match function {
                Function::Count => false,
                Function::Coalesce => args.iter().all(Expression::is_nullable),
                _ => true,
            },
            ExpressionKind::ScalarSubquery { .. } => true,
        }
    }

    /// Is this the NULL literal.
    pub fn is_null_constant(&self) -> bool {
        matches!(self.kind, ExpressionKind::Value(Value::Null))
    }

    /// The literal value of a constant node.
    pub fn constant_value(&self) -> Option<&Value> {
        match &self.kind {
            ExpressionKind::Value(value) => Some(value),
            _ => None,
        }
    }
}
