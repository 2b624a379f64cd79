//! Errors for query translation.

use query_engine_metadata::metadata::ClrType;

/// Failures that abort the translation of the whole query.
///
/// Sub-expressions that merely cannot be translated are not errors: they
/// come back as "not translated", and a description may be recorded in
/// [`TranslationErrors`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("The query expression '{0}' could not be translated.")]
    TranslationFailed(String),
    #[error("Translation of '{0}' failed. Either the query source is not an entity type, or the specified property does not exist on the entity type.")]
    UnresolvedPropertyAccess(String),
    #[error("The complex property '{member}' cannot be accessed on a subquery; project it before composing over the subquery.")]
    ComplexPropertyOverSubquery { member: String },
    #[error("The member '{member}' cannot be accessed on a subquery which does not project a structural type.")]
    MemberOverCorrelatedSubquery { member: String },
    #[error("Structural type '{0}' not found.")]
    StructuralTypeNotFound(String),
    #[error("The value {0} cannot be used as a constant of type '{1}'.")]
    TypeMismatch(serde_json::Value, ClrType),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Explanations of why parts of the query were not translated, kept so that
/// a caller giving up on the query can tell the user why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationErrors(Vec<String>);

impl TranslationErrors {
    pub fn add(&mut self, details: String) {
        tracing::debug!("{details}");
        if !self.0.contains(&details) {
            self.0.push(details);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All recorded explanations, one per line.
    pub fn details(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_details_are_reported_once() {
        let mut errors = TranslationErrors::default();
        assert_eq!(errors.details(), None);
        errors.add("first".to_string());
        errors.add("second".to_string());
        errors.add("first".to_string());
        assert_eq!(errors.details().as_deref(), Some("first\nsecond"));
        errors.clear();
        assert!(errors.is_empty());
    }
}
