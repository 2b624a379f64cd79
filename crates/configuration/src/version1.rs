//! Version 1 of the on-disk configuration: the conceptual model and the
//! options the translator runs with.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

use query_engine_metadata::metadata;

use crate::error::{ParseConfigurationError, WriteParsedConfigurationError};

pub const CURRENT_VERSION: u32 = 1;
pub const CONFIGURATION_FILENAME: &str = "configuration.json";
const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";

/// The configuration as it is stored on disk.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    // Which version of the configuration format are we using
    pub version: u32,
    #[serde(default)]
    pub metadata: metadata::Metadata,
    #[serde(skip_serializing_if = "TranslatorOptions::is_default")]
    #[serde(default)]
    pub options: TranslatorOptions,
}

impl ParsedConfiguration {
    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            metadata: metadata::Metadata::empty(),
            options: TranslatorOptions::default(),
        }
    }
}

/// Switches describing the target database and the strictness of the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorOptions {
    /// The database has n-ary GREATEST and LEAST functions.
    #[serde(default = "default_true")]
    pub supports_greatest_least: bool,
    /// Fail the whole translation when an indexed property access cannot be
    /// resolved, instead of giving up on the sub-expression only.
    #[serde(default = "default_true")]
    pub throw_for_unresolved_property: bool,
    /// Comparisons follow three-valued logic without compensation.
    #[serde(default)]
    pub use_relational_nulls: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        TranslatorOptions {
            supports_greatest_least: true,
            throw_for_unresolved_property: true,
            use_relational_nulls: false,
        }
    }
}

impl TranslatorOptions {
    pub fn is_default(&self) -> bool {
        *self == TranslatorOptions::default()
    }
}

/// Parse the configuration format from a directory.
pub async fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_file = configuration_dir.as_ref().join(CONFIGURATION_FILENAME);

    let configuration_file_contents =
        fs::read_to_string(&configuration_file)
            .await
            .map_err(|err| {
                ParseConfigurationError::IoErrorButStringified(format!(
                    "{}: {}",
                    &configuration_file.display(),
                    err
                ))
            })?;

    let parsed_config: ParsedConfiguration = serde_json::from_str(&configuration_file_contents)
        .map_err(|error| ParseConfigurationError::ParseError {
            file_path: configuration_file.clone(),
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        })?;

    if parsed_config.version != CURRENT_VERSION {
        return Err(ParseConfigurationError::UnsupportedVersion {
            file_path: configuration_file,
            version: parsed_config.version,
        });
    }

    // every base type must itself be part of the model.
    let structural_types = &parsed_config.metadata.structural_types;
    for (type_name, info) in &structural_types.0 {
        if let Some(base_type) = &info.base_type {
            if structural_types.get(base_type).is_none() {
                return Err(ParseConfigurationError::UnknownBaseType {
                    file_path: configuration_file,
                    type_name: type_name.clone(),
                    base_type: base_type.clone(),
                });
            }
        }
    }

    tracing::debug!(
        "parsed {} structural types from {}",
        structural_types.0.len(),
        configuration_file.display()
    );

    Ok(parsed_config)
}

/// Write the parsed configuration into a directory on disk.
pub async fn write_parsed_configuration(
    parsed_config: ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let configuration_file = out_dir.as_ref().to_owned().join(CONFIGURATION_FILENAME);
    fs::create_dir_all(out_dir.as_ref()).await?;

    // create the configuration file
    fs::write(
        configuration_file,
        serde_json::to_string_pretty(&parsed_config)
            .map_err(|e| WriteParsedConfigurationError::IoError(e.into()))?
            + "\n",
    )
    .await?;

    // create the jsonschema file
    let configuration_jsonschema_file_path = out_dir
        .as_ref()
        .to_owned()
        .join(CONFIGURATION_JSONSCHEMA_FILENAME);

    let output = schemars::schema_for!(ParsedConfiguration);
    fs::write(
        &configuration_jsonschema_file_path,
        serde_json::to_string_pretty(&output)
            .map_err(|e| WriteParsedConfigurationError::IoError(e.into()))?
            + "\n",
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn written_configuration_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ParsedConfiguration::empty();
        config.options.supports_greatest_least = false;

        write_parsed_configuration(config.clone(), dir.path())
            .await
            .unwrap();
        let parsed = parse_configuration(dir.path()).await.unwrap();

        similar_asserts::assert_eq!(parsed, config);
    }

    #[tokio::test]
    async fn json_errors_carry_their_location() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIGURATION_FILENAME),
            "{\n  \"version\": 1,\n  \"metadata\": [\n}",
        )
        .unwrap();

        match parse_configuration(dir.path()).await {
            Err(ParseConfigurationError::ParseError { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_base_types_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIGURATION_FILENAME),
            r#"{"version": 1, "metadata": {"structuralTypes": {"Kiwi": {"baseType": "Bird"}}}}"#,
        )
        .unwrap();

        let error = parse_configuration(dir.path()).await.unwrap_err();
        assert!(
            matches!(error, ParseConfigurationError::UnknownBaseType { ref base_type, .. } if base_type == "Bird"),
            "{error}"
        );
    }

    #[test]
    fn options_default_when_missing() {
        let config: ParsedConfiguration = serde_json::from_str(r#"{"version": 1}"#).unwrap();
        assert_eq!(config.options, TranslatorOptions::default());
        assert!(config.options.throw_for_unresolved_property);
    }
}
