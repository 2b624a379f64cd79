//! The mutable SELECT builder filled while a (sub)query is translated.
//!
//! A `SelectExpression` is owned by a single translation frame. Applying its
//! projection consumes it and yields the immutable [`ast::Select`].

use indexmap::IndexMap;

use super::ast::{self, Expression, ExpressionKind, OrderByElement};
use super::helpers;
use super::projection::StructuralTypeProjection;

/// The name of a projected member. The empty name stands for the whole
/// element of the query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectionMember(pub String);

impl ProjectionMember {
    pub fn root() -> Self {
        ProjectionMember(String::new())
    }
}

/// What a projection member is bound to before the projection is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Sql(Expression),
    Structural(StructuralTypeProjection),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpression {
    pub from: Option<ast::From>,
    pub joins: Vec<ast::Join>,
    pub predicate: Option<Expression>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
    pub projection_mapping: IndexMap<ProjectionMember, Projection>,
    /// The explicit select list, once the mapping was replaced.
    pub projection: Vec<Expression>,
    pub orderings: Vec<OrderByElement>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub is_distinct: bool,
}

impl SelectExpression {
    /// A select over a single table or subquery.
    pub fn new(from: ast::From) -> Self {
        SelectExpression {
            from: Some(from),
            ..SelectExpression::empty()
        }
    }

    /// A select without tables, e.g. `SELECT 1` or a projection of scalars.
    pub fn empty() -> Self {
        SelectExpression {
            from: None,
            joins: vec![],
            predicate: None,
            group_by: vec![],
            having: None,
            projection_mapping: IndexMap::new(),
            projection: vec![],
            orderings: vec![],
            limit: None,
            offset: None,
            is_distinct: false,
        }
    }

    pub fn has_tables(&self) -> bool {
        self.from.is_some()
    }

    pub fn is_limited(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    /// AND a predicate into the WHERE clause, or into HAVING once grouped.
    /// The `TRUE` constant is dropped.
    pub fn apply_predicate(&mut self, predicate: Expression) {
        if predicate == helpers::true_expr() {
            return;
        }
        let target = if self.group_by.is_empty() {
            &mut self.predicate
        } else {
            &mut self.having
        };
        *target = Some(match target.take() {
            None => predicate,
            Some(existing) => helpers::and(existing, predicate),
        });
    }

    pub fn add_projection(&mut self, member: ProjectionMember, projection: Projection) {
        self.projection_mapping.insert(member, projection);
    }

    pub fn get_projection(&self, member: &ProjectionMember) -> Option<&Projection> {
        self.projection_mapping.get(member)
    }

    /// Replace the whole projection by an explicit list of expressions.
    /// An empty list projects `1`.
    pub fn replace_projection(&mut self, expressions: Vec<Expression>) {
        self.projection_mapping.clear();
        self.projection = expressions;
    }

    pub fn clear_ordering(&mut self) {
        self.orderings.clear();
    }

    /// Order by a single key, discarding previous orderings.
    pub fn apply_ordering(&mut self, ordering: OrderByElement) {
        self.orderings.clear();
        self.orderings.push(ordering);
    }

    /// Order by an additional key.
    pub fn append_ordering(&mut self, ordering: OrderByElement) {
        if !self.orderings.iter().any(|o| o.target == ordering.target) {
            self.orderings.push(ordering);
        }
    }

    pub fn apply_distinct(&mut self) {
        self.is_distinct = true;
    }

    /// Freeze the builder into a SELECT.
    pub fn apply_projection(self) -> ast::Select {
        let mut columns: Vec<(String, Expression)> = vec![];
        if self.projection.is_empty() {
            for (member, projection) in self.projection_mapping {
                match projection {
                    Projection::Sql(expression) => columns.push((member.0, expression)),
                    Projection::Structural(structural) => columns.extend(structural.columns()),
                }
            }
        } else {
            columns.extend(
                self.projection
                    .into_iter()
                    .map(|expression| (String::new(), expression)),
            );
        }

        let select_list = if columns.is_empty() {
            ast::SelectList::Select1
        } else {
            let mut used = vec![];
            ast::SelectList::SelectList(
                columns
                    .into_iter()
                    .map(|(name, expression)| {
                        let alias = unique_column_alias(&mut used, &name, &expression);
                        (helpers::make_column_alias(alias), expression)
                    })
                    .collect(),
            )
        };

        ast::Select {
            distinct: self.is_distinct,
            select_list,
            from: self.from,
            joins: self.joins,
            where_: ast::Where(self.predicate.unwrap_or_else(helpers::empty_where)),
            group_by: ast::GroupBy {
                elements: self.group_by,
            },
            having: self.having,
            order_by: ast::OrderBy {
                elements: self.orderings,
            },
            limit: ast::Limit {
                limit: self.limit,
                offset: self.offset,
            },
        }
    }
}

/// Columns keep their name, anything else is `c`. Clashes get a numeric suffix.
fn unique_column_alias(used: &mut Vec<String>, name: &str, expression: &Expression) -> String {
    let base = match (&expression.kind, name) {
        (_, name) if !name.is_empty() => name.to_string(),
        (ExpressionKind::Column(column), _) => column.name.0.clone(),
        _ => "c".to_string(),
    };
    let mut candidate = base.clone();
    let mut counter = 0;
    while used.contains(&candidate) {
        candidate = format!("{base}{counter}");
        counter += 1;
    }
    used.push(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use query_engine_metadata::metadata::ClrType;

    use super::*;
    use crate::sql::ast::{OrderByDirection, TableName, TableReference};

    fn orders() -> (SelectExpression, ast::TableAlias) {
        let alias = helpers::make_table_alias(0, "o".to_string());
        let select = SelectExpression::new(ast::From::Table {
            reference: TableReference::DBTable {
                schema: None,
                table: TableName("Orders".to_string()),
            },
            alias: alias.clone(),
        });
        (select, alias)
    }

    #[test]
    fn an_empty_projection_selects_one() {
        let (mut select, alias) = orders();
        select.apply_predicate(helpers::true_expr());
        select.apply_predicate(helpers::is_not_null(helpers::make_column(
            alias,
            "ShippedOn",
            ClrType::nullable(ClrType::DateTime),
            None,
            true,
        )));
        select.replace_projection(vec![]);
        similar_asserts::assert_eq!(
            select.apply_projection().to_string(),
            "SELECT 1 FROM [Orders] AS [o] WHERE [o].[ShippedOn] IS NOT NULL"
        );
    }

    #[test]
    fn clashing_aliases_get_a_suffix() {
        let (mut select, alias) = orders();
        let id = helpers::make_column(alias, "Id", ClrType::Int32, None, false);
        select.replace_projection(vec![id.clone(), id, helpers::true_expr()]);
        select.apply_ordering(OrderByElement {
            target: helpers::true_expr(),
            direction: OrderByDirection::Desc,
        });
        select.limit = Some(1);
        assert_eq!(
            select.apply_projection().to_string(),
            "SELECT [o].[Id] AS [Id], [o].[Id] AS [Id0], TRUE AS [c] FROM [Orders] AS [o] ORDER BY TRUE DESC LIMIT 1"
        );
    }
}
