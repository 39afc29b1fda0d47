use thiserror::Error;

use crate::registry::Category;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest {
        code: &'static str,
        message: &'static str,
    },
    #[error("not found: {message} `{target}`")]
    NotFound {
        code: &'static str,
        message: &'static str,
        target: String,
    },
    #[error("invalid argument `{parameter}`: {message}")]
    Validation {
        code: &'static str,
        parameter: String,
        message: String,
    },
    #[error("{name} failed: {message}")]
    ActionFailed { name: String, message: String },
}

impl AppError {
    pub fn bad_request(code: &'static str, message: &'static str) -> Self {
        Self::BadRequest { code, message }
    }

    pub fn not_found(category: Category, target: impl Into<String>) -> Self {
        let (code, message) = match category {
            Category::Action => ("tool_not_found", "unknown tool name"),
            Category::DataSource => ("resource_not_found", "unknown resource uri"),
            Category::Template => ("prompt_not_found", "unknown prompt name"),
        };

        Self::NotFound {
            code,
            message,
            target: target.into(),
        }
    }

    pub fn missing_argument(parameter: &str) -> Self {
        Self::Validation {
            code: "missing_argument",
            parameter: parameter.to_string(),
            message: "required argument is missing".to_string(),
        }
    }

    pub fn unknown_argument(parameter: &str) -> Self {
        Self::Validation {
            code: "unknown_argument",
            parameter: parameter.to_string(),
            message: "argument is not part of the signature".to_string(),
        }
    }

    pub fn invalid_argument_type(parameter: &str, expected: &str) -> Self {
        Self::Validation {
            code: "invalid_argument_type",
            parameter: parameter.to_string(),
            message: format!("expected a value of type {expected}"),
        }
    }

    pub fn action_failed(name: &str, message: impl Into<String>) -> Self {
        Self::ActionFailed {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Startup failures raised while populating the registry. All of them abort the process.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{category} `{name}` is already registered")]
    DuplicateName { category: Category, name: String },
    #[error("{category} `{name}` has a mismatched signature: {reason}")]
    SignatureMismatch {
        category: Category,
        name: String,
        reason: String,
    },
    #[error("data source pattern `{pattern}` is ambiguous with `{existing}`")]
    AmbiguousPattern { pattern: String, existing: String },
    #[error("invalid {category} name `{name}`: {reason}")]
    InvalidName {
        category: Category,
        name: String,
        reason: &'static str,
    },
}

impl RegistrationError {
    pub fn signature_mismatch(category: Category, name: &str, reason: impl Into<String>) -> Self {
        Self::SignatureMismatch {
            category,
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_name(category: Category, name: &str, reason: &'static str) -> Self {
        Self::InvalidName {
            category,
            name: name.to_string(),
            reason,
        }
    }
}
