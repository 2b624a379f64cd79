//! Configuration for the translator.

use query_engine_metadata::metadata;
use schemars::{gen::SchemaSettings, schema::RootSchema};

use crate::error::MakeRuntimeConfigurationError;
use crate::version1::{ParsedConfiguration, TranslatorOptions};

/// The 'Configuration' type collects all the information necessary to translate queries.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration', which also checks that the model refers only
/// to properties it declares.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub metadata: metadata::Metadata,
    pub options: TranslatorOptions,
}

/// Generate the JSON schema of the on-disk configuration.
pub fn generate_schema() -> RootSchema {
    SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<ParsedConfiguration>()
}

/// Turn a parsed configuration into a runtime configuration.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    let structural_types = &parsed_config.metadata.structural_types;
    for (type_name, info) in &structural_types.0 {
        if let Some(property) = &info.discriminator_property {
            if structural_types.find_property(type_name, property).is_none() {
                return Err(MakeRuntimeConfigurationError::UnknownDiscriminatorProperty {
                    type_name: type_name.clone(),
                    property: property.clone(),
                });
            }
        }
        for property in info.primary_key.iter().flatten() {
            if structural_types.find_property(type_name, property).is_none() {
                return Err(MakeRuntimeConfigurationError::UnknownKeyProperty {
                    type_name: type_name.clone(),
                    property: property.clone(),
                });
            }
        }
    }

    Ok(Configuration {
        metadata: parsed_config.metadata,
        options: parsed_config.options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_generated_schema_validates_an_empty_configuration() {
        let schema = serde_json::to_value(generate_schema()).unwrap();
        let compiled = jsonschema::JSONSchema::compile(&schema).unwrap();
        let instance = serde_json::to_value(ParsedConfiguration::empty()).unwrap();
        assert!(compiled.is_valid(&instance));
    }

    #[test]
    fn unknown_key_properties_are_rejected() {
        let parsed: ParsedConfiguration = serde_json::from_value(serde_json::json!({
            "version": 1,
            "metadata": {
                "structuralTypes": {
                    "Blog": {
                        "primaryKey": ["BlogId"],
                        "properties": {
                            "Id": { "column": "Id", "type": "Int32" }
                        }
                    }
                }
            }
        }))
        .unwrap();

        let error = make_runtime_configuration(parsed).unwrap_err();
        assert_eq!(
            error.to_string(),
            "the key part BlogId of Blog is not one of its properties"
        );
    }
}
