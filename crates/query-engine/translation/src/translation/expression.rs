//! The query expressions handed to the translator.
//!
//! This is the object-model view of a query: operators, member accesses and
//! method calls over conceptual types, with the relational pieces produced by
//! earlier translation steps (shapers, shaped subqueries, SQL fragments)
//! embedded as extension nodes.

use std::fmt;

use query_engine_metadata::metadata::ClrType;
use query_engine_sql::sql;

use super::query::enumerable::EnumerableExpression;

/// A node of the query expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpression {
    /// A literal, or a value computed client-side before translation.
    Constant {
        value: serde_json::Value,
        r#type: ClrType,
    },
    /// `typeof(T)`.
    TypeConstant(ClrType),
    /// A value supplied when the query runs.
    Parameter { name: String, r#type: ClrType },
    /// A parameter of an enclosing lambda.
    LambdaParameter { name: String, r#type: ClrType },
    Unary {
        operator: UnaryOperator,
        operand: Box<QueryExpression>,
        /// The result type. Only differs from the operand's for conversions.
        r#type: ClrType,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<QueryExpression>,
        right: Box<QueryExpression>,
    },
    /// `test ? if_true : if_false`.
    Conditional {
        test: Box<QueryExpression>,
        if_true: Box<QueryExpression>,
        if_false: Box<QueryExpression>,
    },
    /// Access to a field or property. Static members have no instance.
    Member {
        expression: Option<Box<QueryExpression>>,
        member: String,
        r#type: ClrType,
    },
    MethodCall {
        object: Option<Box<QueryExpression>>,
        method: MethodInfo,
        arguments: Vec<QueryExpression>,
    },
    /// `expression is T`.
    TypeIs {
        expression: Box<QueryExpression>,
        type_operand: ClrType,
    },
    Lambda {
        parameters: Vec<(String, ClrType)>,
        body: Box<QueryExpression>,
    },
    Invocation {
        expression: Box<QueryExpression>,
        arguments: Vec<QueryExpression>,
    },
    ListInit {
        r#type: ClrType,
        initializers: Vec<QueryExpression>,
    },
    New {
        r#type: ClrType,
        arguments: Vec<QueryExpression>,
    },
    MemberInit {
        r#type: ClrType,
        bindings: Vec<(String, QueryExpression)>,
    },
    NewArray {
        element_type: ClrType,
        expressions: Vec<QueryExpression>,
    },
    /// A row of a structural type in the current query.
    StructuralTypeShaper(StructuralTypeShaper),
    /// A query already translated to a select, with its shaper.
    Shaped(Box<ShapedQuery>),
    /// A query rooted at a parameter holding a collection of values.
    ParameterQueryRoot { name: String, r#type: ClrType },
    /// The set of all entities of a type.
    EntityQueryRoot { structural_type: String },
    /// The elements of the current group of a grouping query.
    GroupByElement { element_selector: Box<QueryExpression> },
    /// A fragment already translated to SQL.
    Sql(sql::ast::Expression),
    /// An aggregate source under construction.
    Enumerable(Box<EnumerableExpression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
    NegateChecked,
    Convert,
    ConvertChecked,
    TypeAs,
    Quote,
    ArrayLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    AddChecked,
    Subtract,
    SubtractChecked,
    Multiply,
    MultiplyChecked,
    Divide,
    Modulo,
    Power,
    And,
    Or,
    ExclusiveOr,
    AndAlso,
    OrElse,
    LeftShift,
    RightShift,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Coalesce,
    ArrayIndex,
}

impl BinaryOperator {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }

    /// The overflow-checked operators map to their plain counterpart.
    #[must_use]
    pub fn unchecked(self) -> BinaryOperator {
        match self {
            BinaryOperator::AddChecked => BinaryOperator::Add,
            BinaryOperator::SubtractChecked => BinaryOperator::Subtract,
            BinaryOperator::MultiplyChecked => BinaryOperator::Multiply,
            other => other,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add | BinaryOperator::AddChecked => "+",
            BinaryOperator::Subtract | BinaryOperator::SubtractChecked => "-",
            BinaryOperator::Multiply | BinaryOperator::MultiplyChecked => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
            BinaryOperator::And => "&",
            BinaryOperator::Or => "|",
            BinaryOperator::ExclusiveOr => "^",
            BinaryOperator::AndAlso => "&&",
            BinaryOperator::OrElse => "||",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Coalesce => "??",
            BinaryOperator::ArrayIndex => "[]",
        }
    }
}

/// The class a method is declared on, as far as the translator cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaringType {
    /// Query operators over `IQueryable`.
    Queryable,
    /// Query operators over in-memory sequences.
    Enumerable,
    /// Provider specific query operators.
    QueryableExtensions,
    Math,
    /// Database functions callable from queries.
    DbFunctions,
    /// Helpers such as `EF.Property`.
    EF,
    Object,
    String,
    Other(String),
}

impl fmt::Display for DeclaringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaringType::Queryable => write!(f, "Queryable"),
            DeclaringType::Enumerable => write!(f, "Enumerable"),
            DeclaringType::QueryableExtensions => write!(f, "QueryableExtensions"),
            DeclaringType::Math => write!(f, "Math"),
            DeclaringType::DbFunctions => write!(f, "DbFunctions"),
            DeclaringType::EF => write!(f, "EF"),
            DeclaringType::Object => write!(f, "object"),
            DeclaringType::String => write!(f, "string"),
            DeclaringType::Other(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub declaring_type: DeclaringType,
    pub name: String,
    pub is_static: bool,
    pub return_type: ClrType,
}

impl MethodInfo {
    pub fn new_static(
        declaring_type: DeclaringType,
        name: impl Into<String>,
        return_type: ClrType,
    ) -> MethodInfo {
        MethodInfo {
            declaring_type,
            name: name.into(),
            is_static: true,
            return_type,
        }
    }

    pub fn new_instance(
        declaring_type: DeclaringType,
        name: impl Into<String>,
        return_type: ClrType,
    ) -> MethodInfo {
        MethodInfo {
            declaring_type,
            name: name.into(),
            is_static: false,
            return_type,
        }
    }

    pub fn is(&self, declaring_type: &DeclaringType, name: &str) -> bool {
        self.declaring_type == *declaring_type && self.name == name
    }
}

/// A row of a structural type, bound to the columns it is read from.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralTypeShaper {
    pub structural_type: String,
    pub projection: sql::projection::StructuralTypeProjection,
    pub nullable: bool,
}

/// How many rows a shaped query yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCardinality {
    Enumerable,
    Single,
    SingleOrDefault,
}

/// A subquery translated to a select, together with the description of
/// what each of its rows is.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedQuery {
    pub query: sql::select::SelectExpression,
    pub shaper: Shaper,
    pub cardinality: ResultCardinality,
}

/// What a row of a shaped query materializes into.
#[derive(Debug, Clone, PartialEq)]
pub enum Shaper {
    /// A structural value read from the projection of `member`.
    Structural {
        structural_type: String,
        member: sql::select::ProjectionMember,
        nullable: bool,
    },
    /// A scalar read from the projection of `member`.
    Scalar {
        member: sql::select::ProjectionMember,
        r#type: ClrType,
    },
    Convert { shaper: Box<Shaper>, r#type: ClrType },
    /// An anonymous object built client-side.
    New { r#type: ClrType },
    /// A nested collection.
    Collection { element_type: ClrType },
}

impl Shaper {
    pub fn r#type(&self) -> ClrType {
        match self {
            Shaper::Structural {
                structural_type, ..
            } => ClrType::structural(structural_type.as_str()),
            Shaper::Scalar { r#type, .. }
            | Shaper::Convert { r#type, .. }
            | Shaper::New { r#type } => r#type.clone(),
            Shaper::Collection { element_type } => ClrType::sequence(element_type.clone()),
        }
    }

    /// The shaper below any conversions.
    pub fn without_convert(&self) -> &Shaper {
        match self {
            Shaper::Convert { shaper, .. } => shaper.without_convert(),
            other => other,
        }
    }
}

impl ShapedQuery {
    pub fn r#type(&self) -> ClrType {
        match self.cardinality {
            ResultCardinality::Enumerable => ClrType::sequence(self.shaper.r#type()),
            ResultCardinality::Single | ResultCardinality::SingleOrDefault => self.shaper.r#type(),
        }
    }
}

impl QueryExpression {
    pub fn constant(value: serde_json::Value, r#type: ClrType) -> QueryExpression {
        QueryExpression::Constant { value, r#type }
    }

    pub fn null(r#type: ClrType) -> QueryExpression {
        QueryExpression::Constant {
            value: serde_json::Value::Null,
            r#type,
        }
    }

    pub fn parameter(name: impl Into<String>, r#type: ClrType) -> QueryExpression {
        QueryExpression::Parameter {
            name: name.into(),
            r#type,
        }
    }

    pub fn lambda_parameter(name: impl Into<String>, r#type: ClrType) -> QueryExpression {
        QueryExpression::LambdaParameter {
            name: name.into(),
            r#type,
        }
    }

    pub fn unary(operator: UnaryOperator, operand: QueryExpression, r#type: ClrType) -> Self {
        QueryExpression::Unary {
            operator,
            operand: Box::new(operand),
            r#type,
        }
    }

    pub fn convert(operand: QueryExpression, r#type: ClrType) -> QueryExpression {
        QueryExpression::unary(UnaryOperator::Convert, operand, r#type)
    }

    pub fn not(operand: QueryExpression) -> QueryExpression {
        let r#type = operand.r#type();
        QueryExpression::unary(UnaryOperator::Not, operand, r#type)
    }

    pub fn binary(operator: BinaryOperator, left: QueryExpression, right: QueryExpression) -> Self {
        QueryExpression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn equal(left: QueryExpression, right: QueryExpression) -> QueryExpression {
        QueryExpression::binary(BinaryOperator::Equal, left, right)
    }

    pub fn not_equal(left: QueryExpression, right: QueryExpression) -> QueryExpression {
        QueryExpression::binary(BinaryOperator::NotEqual, left, right)
    }

    pub fn member(expression: QueryExpression, member: impl Into<String>, r#type: ClrType) -> Self {
        QueryExpression::Member {
            expression: Some(Box::new(expression)),
            member: member.into(),
            r#type,
        }
    }

    pub fn call(
        object: Option<QueryExpression>,
        method: MethodInfo,
        arguments: Vec<QueryExpression>,
    ) -> QueryExpression {
        QueryExpression::MethodCall {
            object: object.map(Box::new),
            method,
            arguments,
        }
    }

    pub fn lambda(parameter: &str, r#type: ClrType, body: QueryExpression) -> QueryExpression {
        QueryExpression::Lambda {
            parameters: vec![(parameter.to_string(), r#type)],
            body: Box::new(body),
        }
    }

    pub fn entity_query_root(structural_type: impl Into<String>) -> QueryExpression {
        QueryExpression::EntityQueryRoot {
            structural_type: structural_type.into(),
        }
    }

    /// Is this the `null` constant.
    pub fn is_null_constant(&self) -> bool {
        matches!(
            self,
            QueryExpression::Constant {
                value: serde_json::Value::Null,
                ..
            }
        )
    }

    /// The conceptual type of the value this node evaluates to.
    pub fn r#type(&self) -> ClrType {
        match self {
            QueryExpression::Constant { r#type, .. }
            | QueryExpression::Parameter { r#type, .. }
            | QueryExpression::LambdaParameter { r#type, .. }
            | QueryExpression::Unary { r#type, .. }
            | QueryExpression::Member { r#type, .. }
            | QueryExpression::ListInit { r#type, .. }
            | QueryExpression::New { r#type, .. }
            | QueryExpression::MemberInit { r#type, .. }
            | QueryExpression::ParameterQueryRoot { r#type, .. } => r#type.clone(),
            QueryExpression::TypeConstant(_) => ClrType::Type,
            QueryExpression::Binary {
                operator,
                left,
                right,
            } => match operator {
                BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
                | BinaryOperator::AndAlso
                | BinaryOperator::OrElse => ClrType::Boolean,
                BinaryOperator::Coalesce => right.r#type(),
                BinaryOperator::ArrayIndex => match left.r#type() {
                    ClrType::Sequence(element) => *element,
                    other => other,
                },
                _ => left.r#type(),
            },
            QueryExpression::Conditional { if_true, .. } => if_true.r#type(),
            QueryExpression::MethodCall { method, .. } => method.return_type.clone(),
            QueryExpression::TypeIs { .. } => ClrType::Boolean,
            QueryExpression::Lambda { body, .. } => body.r#type(),
            QueryExpression::Invocation { expression, .. } => expression.r#type(),
            QueryExpression::NewArray { element_type, .. } => ClrType::sequence(element_type.clone()),
            QueryExpression::StructuralTypeShaper(shaper) => {
                ClrType::structural(shaper.structural_type.as_str())
            }
            QueryExpression::Shaped(shaped) => shaped.r#type(),
            QueryExpression::EntityQueryRoot { structural_type } => {
                ClrType::sequence(ClrType::structural(structural_type.as_str()))
            }
            QueryExpression::GroupByElement { element_selector } => {
                ClrType::sequence(element_selector.r#type())
            }
            QueryExpression::Sql(expression) => expression.r#type.clone(),
            QueryExpression::Enumerable(enumerable) => {
                ClrType::sequence(enumerable.selector.r#type())
            }
        }
    }

    /// Substitute a lambda parameter by an expression, leaving nested
    /// lambdas that rebind the same name alone.
    #[must_use]
    pub fn replace_parameter(&self, name: &str, replacement: &QueryExpression) -> QueryExpression {
        let replace = |expression: &QueryExpression| expression.replace_parameter(name, replacement);
        let replace_box = |expression: &QueryExpression| Box::new(replace(expression));
        match self {
            QueryExpression::LambdaParameter { name: current, .. } if current == name => {
                replacement.clone()
            }
            QueryExpression::Unary {
                operator,
                operand,
                r#type,
            } => QueryExpression::Unary {
                operator: *operator,
                operand: replace_box(operand),
                r#type: r#type.clone(),
            },
            QueryExpression::Binary {
                operator,
                left,
                right,
            } => QueryExpression::Binary {
                operator: *operator,
                left: replace_box(left),
                right: replace_box(right),
            },
            QueryExpression::Conditional {
                test,
                if_true,
                if_false,
            } => QueryExpression::Conditional {
                test: replace_box(test),
                if_true: replace_box(if_true),
                if_false: replace_box(if_false),
            },
            QueryExpression::Member {
                expression,
                member,
                r#type,
            } => QueryExpression::Member {
                expression: expression.as_deref().map(&replace_box),
                member: member.clone(),
                r#type: r#type.clone(),
            },
            QueryExpression::MethodCall {
                object,
                method,
                arguments,
            } => QueryExpression::MethodCall {
                object: object.as_deref().map(&replace_box),
                method: method.clone(),
                arguments: arguments.iter().map(&replace).collect(),
            },
            QueryExpression::TypeIs {
                expression,
                type_operand,
            } => QueryExpression::TypeIs {
                expression: replace_box(expression),
                type_operand: type_operand.clone(),
            },
            QueryExpression::Lambda { parameters, body }
                if !parameters.iter().any(|(parameter, _)| parameter == name) =>
            {
                QueryExpression::Lambda {
                    parameters: parameters.clone(),
                    body: replace_box(body),
                }
            }
            QueryExpression::Invocation {
                expression,
                arguments,
            } => QueryExpression::Invocation {
                expression: replace_box(expression),
                arguments: arguments.iter().map(&replace).collect(),
            },
            QueryExpression::ListInit {
                r#type,
                initializers,
            } => QueryExpression::ListInit {
                r#type: r#type.clone(),
                initializers: initializers.iter().map(&replace).collect(),
            },
            QueryExpression::New { r#type, arguments } => QueryExpression::New {
                r#type: r#type.clone(),
                arguments: arguments.iter().map(&replace).collect(),
            },
            QueryExpression::MemberInit { r#type, bindings } => QueryExpression::MemberInit {
                r#type: r#type.clone(),
                bindings: bindings
                    .iter()
                    .map(|(member, expression)| (member.clone(), replace(expression)))
                    .collect(),
            },
            QueryExpression::NewArray {
                element_type,
                expressions,
            } => QueryExpression::NewArray {
                element_type: element_type.clone(),
                expressions: expressions.iter().map(&replace).collect(),
            },
            QueryExpression::GroupByElement { element_selector } => {
                QueryExpression::GroupByElement {
                    element_selector: replace_box(element_selector),
                }
            }
            other => other.clone(),
        }
    }
}

/// A C#-like rendering, used in diagnostics.
impl fmt::Display for QueryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryExpression::Constant { value, .. } => write!(f, "{value}"),
            QueryExpression::TypeConstant(r#type) => write!(f, "typeof({})", r#type),
            QueryExpression::Parameter { name, .. }
            | QueryExpression::ParameterQueryRoot { name, .. } => write!(f, "@{name}"),
            QueryExpression::LambdaParameter { name, .. } => write!(f, "{name}"),
            QueryExpression::Unary {
                operator,
                operand,
                r#type,
            } => match operator {
                UnaryOperator::Not => write!(f, "!{operand}"),
                UnaryOperator::Negate | UnaryOperator::NegateChecked => write!(f, "-{operand}"),
                UnaryOperator::Convert | UnaryOperator::ConvertChecked => {
                    write!(f, "({}){operand}", r#type)
                }
                UnaryOperator::TypeAs => write!(f, "({operand} as {})", r#type),
                UnaryOperator::Quote => write!(f, "{operand}"),
                UnaryOperator::ArrayLength => write!(f, "{operand}.Length"),
            },
            QueryExpression::Binary {
                operator: BinaryOperator::ArrayIndex,
                left,
                right,
            } => write!(f, "{left}[{right}]"),
            QueryExpression::Binary {
                operator,
                left,
                right,
            } => write!(f, "({left} {} {right})", operator.symbol()),
            QueryExpression::Conditional {
                test,
                if_true,
                if_false,
            } => write!(f, "({test} ? {if_true} : {if_false})"),
            QueryExpression::Member {
                expression: Some(expression),
                member,
                ..
            } => write!(f, "{expression}.{member}"),
            QueryExpression::Member {
                expression: None,
                member,
                ..
            } => write!(f, "{member}"),
            QueryExpression::MethodCall {
                object,
                method,
                arguments,
            } => {
                match object {
                    Some(object) => write!(f, "{object}.{}(", method.name)?,
                    None => write!(f, "{}.{}(", method.declaring_type, method.name)?,
                }
                write_separated(f, arguments)?;
                write!(f, ")")
            }
            QueryExpression::TypeIs {
                expression,
                type_operand,
            } => write!(f, "({expression} is {type_operand})"),
            QueryExpression::Lambda { parameters, body } => {
                let names: Vec<&str> = parameters.iter().map(|(name, _)| name.as_str()).collect();
                write!(f, "({}) => {body}", names.join(", "))
            }
            QueryExpression::Invocation {
                expression,
                arguments,
            } => {
                write!(f, "Invoke({expression}")?;
                for argument in arguments {
                    write!(f, ", {argument}")?;
                }
                write!(f, ")")
            }
            QueryExpression::ListInit {
                r#type,
                initializers,
            } => {
                write!(f, "new {} {{ ", r#type)?;
                write_separated(f, initializers)?;
                write!(f, " }}")
            }
            QueryExpression::New { r#type, arguments } => {
                write!(f, "new {}(", r#type)?;
                write_separated(f, arguments)?;
                write!(f, ")")
            }
            QueryExpression::MemberInit { r#type, bindings } => {
                write!(f, "new {} {{ ", r#type)?;
                for (index, (member, expression)) in bindings.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{member} = {expression}")?;
                }
                write!(f, " }}")
            }
            QueryExpression::NewArray {
                element_type,
                expressions,
            } => {
                write!(f, "new {element_type}[] {{ ")?;
                write_separated(f, expressions)?;
                write!(f, " }}")
            }
            QueryExpression::StructuralTypeShaper(shaper) => {
                write!(f, "StructuralTypeShaper<{}>", shaper.structural_type)
            }
            QueryExpression::Shaped(shaped) => write!(f, "ShapedQuery<{}>", shaped.shaper.r#type()),
            QueryExpression::EntityQueryRoot { structural_type } => {
                write!(f, "DbSet<{structural_type}>()")
            }
            QueryExpression::GroupByElement { .. } => write!(f, "g"),
            QueryExpression::Sql(expression) => write!(f, "{expression}"),
            QueryExpression::Enumerable(enumerable) => write!(f, "Enumerable({})", enumerable.selector),
        }
    }
}

fn write_separated(f: &mut fmt::Formatter<'_>, expressions: &[QueryExpression]) -> fmt::Result {
    for (index, expression) in expressions.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{expression}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> QueryExpression {
        QueryExpression::lambda_parameter("o", ClrType::structural("Order"))
    }

    #[test]
    fn comparisons_are_boolean_and_coalesce_takes_the_right_type() {
        let amount = QueryExpression::member(order(), "Discount", ClrType::nullable(ClrType::Decimal));
        let zero = QueryExpression::constant(serde_json::json!(0), ClrType::Decimal);
        assert_eq!(
            QueryExpression::binary(BinaryOperator::Coalesce, amount.clone(), zero.clone()).r#type(),
            ClrType::Decimal
        );
        assert_eq!(
            QueryExpression::binary(BinaryOperator::LessThan, amount, zero).r#type(),
            ClrType::Boolean
        );
    }

    #[test]
    fn parameters_are_replaced_outside_shadowing_lambdas() {
        let body = QueryExpression::equal(
            QueryExpression::member(order(), "Id", ClrType::Int32),
            QueryExpression::constant(serde_json::json!(1), ClrType::Int32),
        );
        let shadowed = QueryExpression::lambda("o", ClrType::structural("Order"), order());
        let replacement = QueryExpression::parameter("current", ClrType::structural("Order"));

        assert_eq!(
            body.replace_parameter("o", &replacement).to_string(),
            "(@current.Id == 1)"
        );
        assert_eq!(shadowed.replace_parameter("o", &replacement), shadowed);
    }

    #[test]
    fn method_calls_print_their_declaring_type_when_static() {
        let call = QueryExpression::call(
            None,
            MethodInfo::new_static(DeclaringType::Math, "Max", ClrType::Int32),
            vec![
                QueryExpression::constant(serde_json::json!(1), ClrType::Int32),
                QueryExpression::parameter("p", ClrType::Int32),
            ],
        );
        assert_eq!(call.to_string(), "Math.Max(1, @p)");
    }
}
