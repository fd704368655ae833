use serde_json::json;
use thiserror::Error;

/// Failures raised by the category/gradebook core.
///
/// Every failing operation leaves the receiving entity untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradebookError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("{0}")]
    Configuration(String),
}

impl GradebookError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Stable code reported over IPC.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_failed",
            Self::NotFound { .. } => "not_found",
            Self::Configuration(_) => "configuration_error",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation { field, .. } => Some(json!({ "field": field })),
            Self::NotFound { kind, name } => Some(json!({ "kind": kind, "name": name })),
            Self::Configuration(_) => None,
        }
    }
}

/// A `.gb` file that could not be turned into a gradebook.
///
/// Sections are numbered from 1 (section 1 is the gradebook header).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("section {section}: {message}")]
    SectionCount { section: usize, message: String },

    #[error("section {section}: missing {field}")]
    MissingField { section: usize, field: &'static str },

    #[error("section {section}: {field} is not a number: {value:?}")]
    BadNumber {
        section: usize,
        field: &'static str,
        value: String,
    },

    #[error("section {section}: bad date {value:?}")]
    BadDate { section: usize, value: String },

    #[error("section {section}: bad {field}: {value:?}")]
    BadFlag {
        section: usize,
        field: &'static str,
        value: String,
    },

    #[error("section {section}: duplicate category {name:?}")]
    DuplicateCategory { section: usize, name: String },

    #[error("section {section}: {source}")]
    Rejected {
        section: usize,
        #[source]
        source: GradebookError,
    },
}

impl LoadError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "load_io_failed",
            _ => "load_failed",
        }
    }
}
