use thiserror::Error;

/// One entry of the structured validation report returned for payloads that
/// fail their type schema.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldError {
    /// The offending field, e.g. `"foo"` for a missing required property.
    pub argument: String,
    pub message: String,
}

impl FieldError {
    pub fn new(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            message: message.into(),
        }
    }
}

/// Wire shape of every engine error: `{statusCode, error, message, data?}`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Request-scoped errors of the resource engine.
///
/// Every variant maps to one HTTP status; the three 403 sub-cases carry
/// deliberately distinct messages so callers can tell "this action admits
/// nobody" apart from "you are the wrong somebody".
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{message}")]
    QuerySyntax { message: String },

    #[error("Resource validation failed")]
    SchemaValidation { errors: Vec<FieldError> },

    #[error("Expiration date has already passed.")]
    ExpirationInPast,

    #[error("Not all uploaded assets were referenced from the resource")]
    UnusedAssets,

    #[error("User is not logged in.")]
    Unauthenticated,

    #[error("This action is private.")]
    ActionPrivate,

    #[error("User is not an app member.")]
    NotAppMember,

    #[error("User does not have sufficient permissions.")]
    InsufficientPermissions,

    #[error("{message}")]
    NotFound { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl ResourceError {
    #[must_use]
    pub fn query_syntax(message: impl Into<String>) -> Self {
        Self::QuerySyntax {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn schema_validation(errors: Vec<FieldError>) -> Self {
        Self::SchemaValidation { errors }
    }

    /// A single-field validation failure.
    #[must_use]
    pub fn invalid_field(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            errors: vec![FieldError::new(argument, message)],
        }
    }

    #[must_use]
    pub fn resource_not_found() -> Self {
        Self::NotFound {
            message: "Resource not found".to_owned(),
        }
    }

    #[must_use]
    pub fn type_not_found(name: &str) -> Self {
        Self::NotFound {
            message: format!("Resource type {name} not found"),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::QuerySyntax { .. }
            | Self::SchemaValidation { .. }
            | Self::ExpirationInPast
            | Self::UnusedAssets => 400,
            Self::Unauthenticated => 401,
            Self::ActionPrivate | Self::NotAppMember | Self::InsufficientPermissions => 403,
            Self::NotFound { .. } => 404,
            Self::Database { .. } => 500,
        }
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self.status() {
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            _ => "Internal Server Error",
        }
    }

    /// The serializable `{statusCode, error, message, data?}` body.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let data = match self {
            Self::SchemaValidation { errors } => {
                serde_json::to_value(errors).ok().map(|e| {
                    serde_json::json!({ "errors": e })
                })
            }
            _ => None,
        };
        ErrorBody {
            status_code: self.status(),
            error: self.reason(),
            message: self.to_string(),
            data,
        }
    }
}

impl From<resource_odata::QuerySyntaxError> for ResourceError {
    fn from(e: resource_odata::QuerySyntaxError) -> Self {
        Self::query_syntax(e.to_string())
    }
}

impl From<sea_orm::DbErr> for ResourceError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::database(e.to_string())
    }
}
