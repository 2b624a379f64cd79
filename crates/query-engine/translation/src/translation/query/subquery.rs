//! Fall back to subqueries when a node has no local translation.

use query_engine_sql::sql;
use sql::select::{Projection, SelectExpression};

use super::error::Error;
use super::helpers::{Env, State};
use super::structural_reference::StructuralTypeReference;
use super::Translation;
use crate::translation::expression::{QueryExpression, ResultCardinality, ShapedQuery, Shaper};

/// Translates a query-level expression (a query root with operators applied
/// to it) into a select with its shaper.
///
/// This is the translator of whole queries, which owns the aliases and
/// joins; the scalar translator only asks it for nested queries.
pub trait SubqueryTranslator {
    /// `Ok(None)` when the expression is not a query this translator can
    /// handle.
    fn translate_subquery(&self, expression: &QueryExpression)
        -> Result<Option<ShapedQuery>, Error>;
}

/// Refuses every subquery.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSubqueries;

impl SubqueryTranslator for NoSubqueries {
    fn translate_subquery(
        &self,
        _expression: &QueryExpression,
    ) -> Result<Option<ShapedQuery>, Error> {
        Ok(None)
    }
}

/// Translate an expression as a nested query, and the nested query as a
/// scalar value.
pub fn translate_as_subquery(
    env: &Env,
    state: &mut State,
    expression: &QueryExpression,
) -> Result<Translation, Error> {
    match env.providers.subqueries.translate_subquery(expression)? {
        Some(shaped) => translate_shaped_query(env, state, &shaped),
        None => Ok(Translation::NotTranslated),
    }
}

/// A nested query yielding at most one row, as a value of the outer query.
///
/// A structural row becomes a reference whose members are bound one by one,
/// a scalar becomes a scalar subquery. Queries without tables are inlined.
pub fn translate_shaped_query(
    env: &Env,
    state: &mut State,
    shaped: &ShapedQuery,
) -> Result<Translation, Error> {
    if shaped.cardinality == ResultCardinality::Enumerable {
        return Ok(Translation::NotTranslated);
    }

    let member = match shaped.shaper.without_convert() {
        Shaper::Structural {
            structural_type, ..
        } => {
            return Ok(Translation::StructuralReference(
                StructuralTypeReference::Subquery {
                    query: shaped.clone(),
                    structural_type: structural_type.clone(),
                },
            ));
        }
        Shaper::Scalar { member, .. } => member,
        Shaper::New { .. } | Shaper::Collection { .. } | Shaper::Convert { .. } => {
            return Ok(Translation::NotTranslated);
        }
    };

    let Some(Projection::Sql(projection)) = shaped.query.get_projection(member) else {
        state.errors.add(format!(
            "The subquery projecting '{}' could not be used as a value.",
            member.0
        ));
        return Ok(Translation::NotTranslated);
    };
    let projection = projection.clone();

    if !shaped.query.has_tables() {
        return Ok(Translation::Sql(projection));
    }

    let r#type = shaped.shaper.r#type();
    let type_mapping = projection.type_mapping.clone();
    let mut select = shaped.query.clone();
    select.replace_projection(vec![projection]);
    let subquery = env.factory.scalar_subquery(
        select.apply_projection(),
        r#type.clone().make_nullable(),
        type_mapping,
    );

    Ok(Translation::Sql(
        if shaped.cardinality == ResultCardinality::SingleOrDefault && r#type.is_value_type() {
            let default = env.factory.constant(
                super::values::translate_json_value(&r#type.default_value(), &r#type)?,
                r#type.clone(),
            );
            env.factory.coalesce(subquery, default, r#type)
        } else {
            subquery
        },
    ))
}

/// `EXISTS` over the rows of a select. Only the presence of rows matters, so
/// the projection is dropped, and so is the ordering unless it decides which
/// rows are kept.
pub fn exists(env: &Env, query: &SelectExpression) -> sql::ast::Expression {
    let mut select = query.clone();
    select.replace_projection(vec![]);
    if !select.is_limited() {
        select.clear_ordering();
    }
    env.factory.exists(select.apply_projection())
}
