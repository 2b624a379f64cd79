//! Convert a SQL AST to SQL text.
//!
//! The text is meant for diagnostics and tests; it is not parameterized and
//! is not tailored to a particular engine.

use std::fmt;

use super::ast::*;
use super::helpers;
use super::string::SQL;

impl Select {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("SELECT ");
        if self.distinct {
            sql.append_syntax("DISTINCT ");
        }

        self.select_list.to_sql(sql);

        if let Some(from) = &self.from {
            sql.append_syntax(" FROM ");
            from.to_sql(sql);
        }

        for join in &self.joins {
            join.to_sql(sql);
        }

        self.where_.to_sql(sql);

        self.group_by.to_sql(sql);

        if let Some(having) = &self.having {
            sql.append_syntax(" HAVING ");
            having.to_sql(sql);
        }

        self.order_by.to_sql(sql);

        self.limit.to_sql(sql);
    }
}

impl SelectList {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            SelectList::SelectList(select_list) => {
                sql.append_separated(select_list, ", ", |(alias, expression), sql| {
                    expression.to_sql(sql);
                    sql.append_syntax(" AS ");
                    alias.to_sql(sql);
                });
            }
            SelectList::Select1 => sql.append_syntax("1"),
        }
    }
}

impl From {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            From::Table { reference, alias } => {
                reference.to_sql(sql);
                sql.append_syntax(" AS ");
                alias.to_sql(sql);
            }
        }
    }
}

impl Join {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Join::LeftOuterJoin(join) => {
                sql.append_syntax(" LEFT JOIN ");
                join.table.to_sql(sql);
                sql.append_syntax(" ON ");
                join.on.to_sql(sql);
            }
        }
    }
}

impl Where {
    pub fn to_sql(&self, sql: &mut SQL) {
        let Where(expression) = self;
        if *expression != helpers::true_expr() {
            sql.append_syntax(" WHERE ");
            expression.to_sql(sql);
        }
    }
}

impl GroupBy {
    pub fn to_sql(&self, sql: &mut SQL) {
        if !self.elements.is_empty() {
            sql.append_syntax(" GROUP BY ");
            sql.append_separated(&self.elements, ", ", Expression::to_sql);
        }
    }
}

// scalars
impl Expression {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self.kind {
            ExpressionKind::Column(column) => column.to_sql(sql),
            ExpressionKind::Value(value) => value.to_sql(sql),
            ExpressionKind::Parameter { name, .. } => {
                sql.append_syntax("@");
                sql.append_syntax(name);
            }
            ExpressionKind::UnaryOperation {
                operator,
                expression,
            } => match operator {
                UnaryOperator::Not => {
                    sql.append_syntax("NOT (");
                    expression.to_sql(sql);
                    sql.append_syntax(")");
                }
                UnaryOperator::Negate => {
                    sql.append_syntax("-");
                    expression.to_sql(sql);
                }
                UnaryOperator::IsNull => {
                    expression.to_sql(sql);
                    sql.append_syntax(" IS NULL");
                }
                UnaryOperator::IsNotNull => {
                    expression.to_sql(sql);
                    sql.append_syntax(" IS NOT NULL");
                }
            },
            ExpressionKind::BinaryOperation {
                left,
                operator,
                right,
            } => {
                sql.append_syntax("(");
                left.to_sql(sql);
                operator.to_sql(sql);
                right.to_sql(sql);
                sql.append_syntax(")");
            }
            ExpressionKind::Case {
                operand,
                when_clauses,
                else_result,
            } => {
                sql.append_syntax("CASE");
                if let Some(operand) = operand {
                    sql.append_syntax(" ");
                    operand.to_sql(sql);
                }
                for clause in when_clauses {
                    sql.append_syntax(" WHEN ");
                    clause.test.to_sql(sql);
                    sql.append_syntax(" THEN ");
                    clause.result.to_sql(sql);
                }
                if let Some(else_result) = else_result {
                    sql.append_syntax(" ELSE ");
                    else_result.to_sql(sql);
                }
                sql.append_syntax(" END");
            }
            ExpressionKind::In { item, values } => {
                item.to_sql(sql);
                sql.append_syntax(" IN (");
                sql.append_separated(values, ", ", Expression::to_sql);
                sql.append_syntax(")");
            }
            ExpressionKind::Exists { select } => {
                sql.append_syntax("EXISTS (");
                select.to_sql(sql);
                sql.append_syntax(")");
            }
            ExpressionKind::ScalarSubquery { select } => {
                sql.append_syntax("(");
                select.to_sql(sql);
                sql.append_syntax(")");
            }
            ExpressionKind::Convert { expression } => {
                sql.append_syntax("CAST(");
                expression.to_sql(sql);
                sql.append_syntax(" AS ");
                match &self.type_mapping {
                    Some(mapping) => sql.append_syntax(mapping.store_type.name()),
                    None => sql.append_syntax(&self.r#type.to_string()),
                }
                sql.append_syntax(")");
            }
            ExpressionKind::FunctionCall { function, args } => {
                function.to_sql(sql);
                sql.append_syntax("(");
                sql.append_separated(args, ", ", Expression::to_sql);
                sql.append_syntax(")");
            }
            ExpressionKind::Distinct(expression) => {
                sql.append_syntax("DISTINCT ");
                expression.to_sql(sql);
            }
            ExpressionKind::Star => sql.append_syntax("*"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sql = SQL::new();
        self.to_sql(&mut sql);
        write!(f, "{}", sql.sql)
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sql = SQL::new();
        self.to_sql(&mut sql);
        write!(f, "{}", sql.sql)
    }
}

impl ColumnExpression {
    pub fn to_sql(&self, sql: &mut SQL) {
        self.table.to_sql(sql);
        sql.append_syntax(".");
        sql.append_identifier(&self.name.0);
    }
}

impl BinaryOperator {
    pub fn to_sql(self, sql: &mut SQL) {
        match self {
            BinaryOperator::Add => sql.append_syntax(" + "),
            BinaryOperator::Subtract => sql.append_syntax(" - "),
            BinaryOperator::Multiply => sql.append_syntax(" * "),
            BinaryOperator::Divide => sql.append_syntax(" / "),
            BinaryOperator::Modulo => sql.append_syntax(" % "),
            BinaryOperator::BitwiseAnd => sql.append_syntax(" & "),
            BinaryOperator::BitwiseOr => sql.append_syntax(" | "),
            BinaryOperator::ExclusiveOr => sql.append_syntax(" ^ "),
            BinaryOperator::AndAlso => sql.append_syntax(" AND "),
            BinaryOperator::OrElse => sql.append_syntax(" OR "),
            BinaryOperator::Equal => sql.append_syntax(" = "),
            BinaryOperator::NotEqual => sql.append_syntax(" <> "),
            BinaryOperator::LessThan => sql.append_syntax(" < "),
            BinaryOperator::LessThanOrEqual => sql.append_syntax(" <= "),
            BinaryOperator::GreaterThan => sql.append_syntax(" > "),
            BinaryOperator::GreaterThanOrEqual => sql.append_syntax(" >= "),
            BinaryOperator::Like => sql.append_syntax(" LIKE "),
        }
    }
}

impl Function {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Function::Coalesce => sql.append_syntax("COALESCE"),
            Function::Greatest => sql.append_syntax("GREATEST"),
            Function::Least => sql.append_syntax("LEAST"),
            Function::Count => sql.append_syntax("COUNT"),
            Function::Sum => sql.append_syntax("SUM"),
            Function::Avg => sql.append_syntax("AVG"),
            Function::Max => sql.append_syntax("MAX"),
            Function::Min => sql.append_syntax("MIN"),
            Function::Upper => sql.append_syntax("UPPER"),
            Function::Lower => sql.append_syntax("LOWER"),
            Function::Trim => sql.append_syntax("TRIM"),
            Function::Len => sql.append_syntax("LEN"),
            Function::Abs => sql.append_syntax("ABS"),
            Function::Round => sql.append_syntax("ROUND"),
            Function::Floor => sql.append_syntax("FLOOR"),
            Function::Ceiling => sql.append_syntax("CEILING"),
            Function::Unknown(name) => sql.append_syntax(name),
        }
    }
}

impl Value {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            Value::Null => sql.append_syntax("NULL"),
            Value::Bool(true) => sql.append_syntax("TRUE"),
            Value::Bool(false) => sql.append_syntax("FALSE"),
            Value::Int(i) => sql.append_syntax(&i.to_string()),
            Value::Float(f) => sql.append_syntax(&f.to_string()),
            Value::Number(text) => sql.append_syntax(text),
            Value::String(s) => sql.append_string_literal(s),
            Value::Array(items) => {
                sql.append_syntax("(");
                sql.append_separated(items, ", ", Value::to_sql);
                sql.append_syntax(")");
            }
            Value::Json(json) => sql.append_string_literal(&json.to_string()),
        }
    }
}

impl Limit {
    pub fn to_sql(&self, sql: &mut SQL) {
        if let Some(limit) = self.limit {
            sql.append_syntax(" LIMIT ");
            sql.append_syntax(&limit.to_string());
        }
        if let Some(offset) = self.offset {
            sql.append_syntax(" OFFSET ");
            sql.append_syntax(&offset.to_string());
        }
    }
}

// names
impl TableReference {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            TableReference::DBTable { schema, table } => {
                if let Some(schema) = schema {
                    sql.append_identifier(&schema.0);
                    sql.append_syntax(".");
                }
                sql.append_identifier(&table.0);
            }
        };
    }
}

impl TableAlias {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
    }
}

impl ColumnAlias {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
    }
}

impl OrderBy {
    pub fn to_sql(&self, sql: &mut SQL) {
        if !self.elements.is_empty() {
            sql.append_syntax(" ORDER BY ");
            sql.append_separated(&self.elements, ", ", OrderByElement::to_sql);
        }
    }
}

impl OrderByElement {
    pub fn to_sql(&self, sql: &mut SQL) {
        self.target.to_sql(sql);
        self.direction.to_sql(sql);
    }
}

impl OrderByDirection {
    pub fn to_sql(self, sql: &mut SQL) {
        match self {
            OrderByDirection::Asc => sql.append_syntax(" ASC"),
            OrderByDirection::Desc => sql.append_syntax(" DESC"),
        }
    }
}
