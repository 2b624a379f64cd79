//! Metadata information regarding the conceptual model and its storage.

pub mod database;
pub mod structural;
pub mod types;

// re-export without modules
pub use database::*;
pub use structural::*;
pub use types::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata information.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub structural_types: StructuralTypes,
}

impl Metadata {
    pub fn empty() -> Self {
        Metadata {
            structural_types: StructuralTypes::empty(),
        }
    }
}
