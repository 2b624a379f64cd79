//! Errors that can be thrown when processing configuration.

use std::path::PathBuf;

/// The errors that can be thrown when parsing a configuration directory.
#[derive(Debug, thiserror::Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {file_path}:{line}:{column}: {message}")]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("unsupported configuration version {version} in {file_path}")]
    UnsupportedVersion { file_path: PathBuf, version: u32 },

    #[error("structural type {type_name} derives from unknown type {base_type} in {file_path}")]
    UnknownBaseType {
        file_path: PathBuf,
        type_name: String,
        base_type: String,
    },

    #[error("I/O error: {0}")]
    IoErrorButStringified(String),
}

/// The errors that can be thrown when writing a configuration directory.
#[derive(Debug, thiserror::Error)]
pub enum WriteParsedConfigurationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The errors that can be thrown when turning a parsed configuration into a runtime one.
#[derive(Debug, thiserror::Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("the discriminator {property} of {type_name} is not one of its properties")]
    UnknownDiscriminatorProperty { type_name: String, property: String },
    #[error("the key part {property} of {type_name} is not one of its properties")]
    UnknownKeyProperty { type_name: String, property: String },
}
