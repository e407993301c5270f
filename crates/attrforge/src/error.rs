use crate::pipeline::Direction;
use crate::transform::ValueError;
use crate::validation::Operation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot compile attribute '{attribute}' of '{object_type}': {source}")]
    AttributeCompilation {
        object_type: String,
        attribute: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Cannot transform attribute '{attribute}' as '{type_name}': {source}")]
    Transformation {
        attribute: String,
        type_name: String,
        #[source]
        source: ValueError,
    },

    #[error(
        "{direction} failed for data type '{data_type}' (attribute: {}): {source}",
        .attribute.as_deref().unwrap_or("<none>")
    )]
    Pipeline {
        direction: Direction,
        data_type: String,
        attribute: Option<String>,
        #[source]
        source: Box<Error>,
    },

    #[error("Resolver for '{class}.{attribute}' failed: {source}")]
    Resolution {
        class: String,
        attribute: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Undefined attribute '{attribute}' on '{class}'")]
    UndefinedAttribute { class: String, attribute: String },

    #[error("No resolver configured for '{class}.{attribute}'")]
    ResolverNotFound { class: String, attribute: String },

    #[error("Attribute '{attribute}' on '{class}' is not writable")]
    NotWritable { class: String, attribute: String },

    #[error("Validation failed for '{class}' on {operation}: {}", .messages.join("; "))]
    Validation {
        class: String,
        operation: Operation,
        messages: Vec<String>,
    },

    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),
}

impl Error {
    /// The attribute an error is attributed to, when it names one.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Error::AttributeCompilation { attribute, .. }
            | Error::Transformation { attribute, .. }
            | Error::Resolution { attribute, .. }
            | Error::UndefinedAttribute { attribute, .. }
            | Error::ResolverNotFound { attribute, .. }
            | Error::NotWritable { attribute, .. } => Some(attribute),
            Error::Pipeline { attribute, .. } => attribute.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
