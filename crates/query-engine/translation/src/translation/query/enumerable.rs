//! The source of an aggregate over a grouping: the element selector with the
//! filters, orderings and distinctness accumulated in front of the aggregate.

use query_engine_sql::sql;

use crate::translation::expression::QueryExpression;

/// An aggregate source under construction.
///
/// The selector stays an untranslated query expression until the aggregate
/// consumes it, so that operators composed after `Select` keep working on
/// the object model.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerableExpression {
    pub selector: QueryExpression,
    pub predicate: Option<sql::ast::Expression>,
    pub orderings: Vec<sql::ast::OrderByElement>,
    pub is_distinct: bool,
}

impl EnumerableExpression {
    pub fn new(selector: QueryExpression) -> Self {
        EnumerableExpression {
            selector,
            predicate: None,
            orderings: vec![],
            is_distinct: false,
        }
    }

    #[must_use]
    pub fn apply_selector(self, selector: QueryExpression) -> Self {
        EnumerableExpression { selector, ..self }
    }

    /// AND a filter into the existing one.
    #[must_use]
    pub fn apply_predicate(self, predicate: sql::ast::Expression) -> Self {
        let predicate = match self.predicate {
            None => predicate,
            Some(existing) => sql::helpers::and(existing, predicate),
        };
        EnumerableExpression {
            predicate: Some(predicate),
            ..self
        }
    }

    /// Order by a single key, replacing previous orderings.
    #[must_use]
    pub fn apply_ordering(self, ordering: sql::ast::OrderByElement) -> Self {
        EnumerableExpression {
            orderings: vec![ordering],
            ..self
        }
    }

    /// Order by an additional key.
    #[must_use]
    pub fn append_ordering(mut self, ordering: sql::ast::OrderByElement) -> Self {
        self.orderings.push(ordering);
        self
    }

    #[must_use]
    pub fn set_distinct(self, is_distinct: bool) -> Self {
        EnumerableExpression {
            is_distinct,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use query_engine_metadata::metadata::ClrType;

    use super::*;

    fn flag(name: &str) -> sql::ast::Expression {
        sql::helpers::make_column(
            sql::helpers::make_table_alias(0, "o".to_string()),
            name,
            ClrType::Boolean,
            Some(sql::helpers::bool_mapping()),
            false,
        )
    }

    #[test]
    fn predicates_accumulate_and_orderings_are_replaced() {
        let source = EnumerableExpression::new(QueryExpression::null(ClrType::Int32))
            .apply_predicate(flag("Shipped"))
            .apply_predicate(flag("Paid"))
            .append_ordering(sql::ast::OrderByElement {
                target: flag("Paid"),
                direction: sql::ast::OrderByDirection::Asc,
            })
            .apply_ordering(sql::ast::OrderByElement {
                target: flag("Shipped"),
                direction: sql::ast::OrderByDirection::Desc,
            });

        assert_eq!(
            source.predicate.as_ref().map(ToString::to_string).as_deref(),
            Some("([o].[Shipped] AND [o].[Paid])")
        );
        assert_eq!(source.orderings.len(), 1);
        assert!(!source.is_distinct);
        assert!(source.set_distinct(true).is_distinct);
    }
}
