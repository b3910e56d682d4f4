//! Errors for template resolution and rendering.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("missing required template variables: {0}")]
    MissingVariables(String),

    #[error("template render error: {0}")]
    Render(String),

    #[error(transparent)]
    Store(#[from] relay_store::StoreError),
}

impl TemplateError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variables_message() {
        let err = TemplateError::MissingVariables("a, b".into());
        assert_eq!(
            err.to_string(),
            "missing required template variables: a, b"
        );
    }
}
