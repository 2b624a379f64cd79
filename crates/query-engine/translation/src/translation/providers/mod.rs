//! Pluggable translators for members, methods and aggregates, and the
//! defaults the translator ships with.

pub mod aggregates;
pub mod methods;

use query_engine_configuration::TranslatorOptions;
use query_engine_metadata::metadata::{ClrType, Metadata};
use query_engine_sql::sql;

use super::expression::MethodInfo;
use super::factory::SqlExpressionFactory;
use super::query::enumerable::EnumerableExpression;
use super::query::error::TranslationErrors;
use super::query::subquery::{NoSubqueries, SubqueryTranslator};

pub use aggregates::DefaultAggregateMethodCallTranslator;
pub use methods::{DefaultMemberTranslator, DefaultMethodCallTranslator};

/// What a provider sees of the translation in progress.
pub struct ProviderContext<'c, 'a> {
    pub factory: &'c SqlExpressionFactory<'a>,
    pub metadata: &'a Metadata,
    pub options: TranslatorOptions,
    /// Explanations for the user, when a provider declines a member or
    /// method it knows.
    pub errors: &'c mut TranslationErrors,
}

/// Translates accesses to members which are not mapped properties, e.g.
/// `string.Length`.
pub trait MemberTranslator {
    fn translate(
        &self,
        context: &mut ProviderContext<'_, '_>,
        instance: Option<&sql::ast::Expression>,
        member: &str,
        return_type: &ClrType,
    ) -> Option<sql::ast::Expression>;
}

/// Translates calls to scalar methods whose instance and arguments were
/// already translated.
pub trait MethodCallTranslator {
    fn translate(
        &self,
        context: &mut ProviderContext<'_, '_>,
        instance: Option<&sql::ast::Expression>,
        method: &MethodInfo,
        arguments: &[sql::ast::Expression],
    ) -> Option<sql::ast::Expression>;
}

/// Translates aggregate operators over a source built from a grouping.
pub trait AggregateMethodCallTranslator {
    fn translate(
        &self,
        context: &mut ProviderContext<'_, '_>,
        method: &MethodInfo,
        source: &EnumerableExpression,
        arguments: &[sql::ast::Expression],
    ) -> Option<sql::ast::Expression>;
}

/// The collaborators the translator delegates to.
#[derive(Clone, Copy)]
pub struct Providers<'a> {
    pub members: &'a dyn MemberTranslator,
    pub methods: &'a dyn MethodCallTranslator,
    pub aggregates: &'a dyn AggregateMethodCallTranslator,
    pub subqueries: &'a dyn SubqueryTranslator,
}

impl Providers<'static> {
    /// The built-in translators, without support for subqueries.
    pub fn defaults() -> Self {
        Providers {
            members: &DefaultMemberTranslator,
            methods: &DefaultMethodCallTranslator,
            aggregates: &DefaultAggregateMethodCallTranslator,
            subqueries: &NoSubqueries,
        }
    }
}

impl<'a> Providers<'a> {
    #[must_use]
    pub fn with_subqueries(self, subqueries: &'a dyn SubqueryTranslator) -> Providers<'a> {
        Providers { subqueries, ..self }
    }
}
