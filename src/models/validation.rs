use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a synchronous rule check: errors block the write, warnings don't.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(field, message));
    }

    pub fn warning(&mut self, field: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(field, message));
    }

    pub fn finish(mut self) -> Self {
        self.is_valid = self.errors.is_empty();
        self
    }

    pub fn has_error_for(&self, field: &str) -> bool {
        self.errors.iter().any(|issue| issue.field == field)
    }

    pub fn has_warning_for(&self, field: &str) -> bool {
        self.warnings.iter().any(|issue| issue.field == field)
    }
}
