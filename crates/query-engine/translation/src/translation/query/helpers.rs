//! Helpers for processing query expressions and building SQL.

use query_engine_configuration::TranslatorOptions;
use query_engine_metadata::metadata::{self, TypeMappingSource};

use super::error::{Error, TranslationErrors};
use crate::translation::factory::SqlExpressionFactory;
use crate::translation::providers::{ProviderContext, Providers};

/// Static information from the model and the collaborators of the translator.
pub struct Env<'a> {
    pub metadata: &'a metadata::Metadata,
    pub options: TranslatorOptions,
    pub factory: SqlExpressionFactory<'a>,
    pub providers: Providers<'a>,
}

/// What changes while an expression is translated.
#[derive(Debug, Clone)]
pub struct State {
    /// Why parts of the expression were left untranslated.
    pub errors: TranslationErrors,
    /// Fail the whole translation on an unresolved indexed property access.
    /// Switched off while aggregate selectors are probed.
    pub throw_for_unresolved_property: bool,
    /// Parameters derived from the members of structural parameters, which
    /// the caller computes before running the query.
    pub runtime_parameters: Vec<RuntimeParameter>,
}

/// A parameter standing for a member of a structural query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeParameter {
    pub name: String,
    /// The query parameter holding the structural value.
    pub parameter: String,
    /// The members leading from the structural value to the scalar.
    pub path: Vec<String>,
}

impl<'a> Env<'a> {
    pub fn new(
        metadata: &'a metadata::Metadata,
        options: TranslatorOptions,
        type_mapping_source: &'a dyn TypeMappingSource,
        providers: Providers<'a>,
    ) -> Env<'a> {
        Env {
            metadata,
            options,
            factory: SqlExpressionFactory::new(type_mapping_source, options.supports_greatest_least),
            providers,
        }
    }

    pub fn types(&self) -> &'a metadata::StructuralTypes {
        &self.metadata.structural_types
    }

    /// The view of the translation handed to the providers.
    pub fn provider_context<'c>(&'c self, state: &'c mut State) -> ProviderContext<'c, 'a> {
        ProviderContext {
            factory: &self.factory,
            metadata: self.metadata,
            options: self.options,
            errors: &mut state.errors,
        }
    }

    /// Lookup a structural type in the model.
    pub fn lookup_structural_type(
        &self,
        structural_type: &str,
    ) -> Result<&'a metadata::StructuralTypeInfo, Error> {
        self.types()
            .get(structural_type)
            .ok_or_else(|| Error::StructuralTypeNotFound(structural_type.to_string()))
    }
}

impl State {
    pub fn new(options: TranslatorOptions) -> State {
        State {
            errors: TranslationErrors::default(),
            throw_for_unresolved_property: options.throw_for_unresolved_property,
            runtime_parameters: vec![],
        }
    }

    /// Register the parameter for `parameter.path`, once.
    pub fn register_runtime_parameter(&mut self, parameter: &str, path: &[&str]) -> String {
        let name = format!("entity_equality_{parameter}_{}", path.join("_"));
        if !self.runtime_parameters.iter().any(|known| known.name == name) {
            self.runtime_parameters.push(RuntimeParameter {
                name: name.clone(),
                parameter: parameter.to_string(),
                path: path.iter().map(ToString::to_string).collect(),
            });
        }
        name
    }
}
