use std::path::PathBuf;

use query_engine_configuration::{make_runtime_configuration, parse_configuration, Configuration};
use query_engine_metadata::metadata::{self, DefaultTypeMappingSource};
use query_engine_sql::sql::ast::Expression;
use query_engine_sql::sql::select::ProjectionMember;
use query_engine_translation::translation::expression::{
    QueryExpression, ResultCardinality, ShapedQuery, Shaper,
};
use query_engine_translation::translation::providers::Providers;
use query_engine_translation::translation::query::error::Error;
use query_engine_translation::translation::query::root::{select_structural_type, AliasGenerator};
use query_engine_translation::translation::query::subquery::SubqueryTranslator;
use query_engine_translation::translation::query::SqlTranslator;

/// The outcome of translating one expression.
#[derive(Debug)]
pub struct Translated {
    pub sql: Option<String>,
    pub error_details: Option<String>,
    pub runtime_parameters: Vec<String>,
}

/// Load the configuration of a test from `tests/goldenfiles/<testname>`.
pub async fn configuration(testname: &str) -> anyhow::Result<Configuration> {
    let directory = PathBuf::from("tests/goldenfiles").join(testname);
    let parsed_configuration = parse_configuration(&directory).await?;
    Ok(make_runtime_configuration(parsed_configuration)?)
}

/// A row of all entities of a type, as the query translator would hand it
/// to the scalar translator.
pub fn row(configuration: &Configuration, structural_type: &str) -> QueryExpression {
    let (_, shaper) = select_structural_type(
        &configuration.metadata,
        &DefaultTypeMappingSource,
        &mut AliasGenerator::new(),
        structural_type,
    )
    .unwrap();
    QueryExpression::StructuralTypeShaper(shaper)
}

/// Translate an expression with the built-in providers, reading query roots
/// as subqueries.
pub fn translate(
    configuration: &Configuration,
    expression: &QueryExpression,
) -> Result<Translated, Error> {
    let subqueries = RootQueries {
        metadata: &configuration.metadata,
    };
    let mut translator = SqlTranslator::from_configuration(
        configuration,
        &DefaultTypeMappingSource,
        Providers::defaults().with_subqueries(&subqueries),
    );
    let sql = translator.translate(expression, true)?;
    Ok(Translated {
        sql: sql.map(|sql| sql.to_string()),
        error_details: translator.translation_error_details(),
        runtime_parameters: translator
            .runtime_parameters()
            .iter()
            .map(|parameter| parameter.name.clone())
            .collect(),
    })
}

/// Translate an expression twice with the same translator.
pub fn translate_twice(
    configuration: &Configuration,
    expression: &QueryExpression,
) -> Result<(Option<Expression>, Option<Expression>), Error> {
    let subqueries = RootQueries {
        metadata: &configuration.metadata,
    };
    let mut translator = SqlTranslator::from_configuration(
        configuration,
        &DefaultTypeMappingSource,
        Providers::defaults().with_subqueries(&subqueries),
    );
    let first = translator.translate(expression, true)?;
    let second = translator.translate(expression, true)?;
    Ok((first, second))
}

/// Reads query roots as the select of all entities of their type.
struct RootQueries<'a> {
    metadata: &'a metadata::Metadata,
}

impl SubqueryTranslator for RootQueries<'_> {
    fn translate_subquery(
        &self,
        expression: &QueryExpression,
    ) -> Result<Option<ShapedQuery>, Error> {
        let QueryExpression::EntityQueryRoot { structural_type } = expression else {
            return Ok(None);
        };
        let (query, _) = select_structural_type(
            self.metadata,
            &DefaultTypeMappingSource,
            &mut AliasGenerator::new(),
            structural_type,
        )?;
        Ok(Some(ShapedQuery {
            query,
            shaper: Shaper::Structural {
                structural_type: structural_type.clone(),
                member: ProjectionMember::root(),
                nullable: false,
            },
            cardinality: ResultCardinality::Enumerable,
        }))
    }
}
