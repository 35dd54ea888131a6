use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphinatorError {
    #[error("Graph store error: {0}")]
    Store(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Schema scan error: {0}")]
    Scan(String),

    #[error("Schema build error: {0}")]
    SchemaBuild(String),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Reasons a GraphQL selection cannot be turned into a statement.
///
/// Compilation either succeeds completely or fails with one of these before
/// anything reaches the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("Only query operations are supported")]
    UnsupportedOperation,

    #[error("Unknown field '{field}' on type '{type_name}'")]
    UnknownField { type_name: String, field: String },

    #[error("Unknown argument '{argument}' on field '{type_name}.{field}'")]
    UnknownArgument {
        type_name: String,
        field: String,
        argument: String,
    },

    #[error("Invalid value for argument '{argument}' on field '{field}': {reason}")]
    InvalidArgument {
        field: String,
        argument: String,
        reason: String,
    },

    #[error("Variable '${0}' is not declared by the operation")]
    UndeclaredVariable(String),

    #[error("Unknown fragment '{0}'")]
    UnknownFragment(String),

    #[error("Directive '@{directive}' is not supported on field '{field}'")]
    UnsupportedDirective { directive: String, field: String },

    #[error("Field '{field}' of type '{type_name}' must have a selection of subfields")]
    MissingSelection { type_name: String, field: String },

    #[error("Field '{field}' is a scalar and cannot have a selection")]
    UnexpectedSelection { field: String },

    #[error("Fields '{first}' and '{second}' conflict under response key '{key}'")]
    ConflictingFields {
        key: String,
        first: String,
        second: String,
    },
}

impl From<toml::de::Error> for GraphinatorError {
    fn from(err: toml::de::Error) -> Self {
        GraphinatorError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for GraphinatorError {
    fn from(err: toml::ser::Error) -> Self {
        GraphinatorError::Serialization(format!("TOML serialization error: {}", err))
    }
}

impl From<::config::ConfigError> for GraphinatorError {
    fn from(err: ::config::ConfigError) -> Self {
        GraphinatorError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for GraphinatorError {
    fn from(err: serde_json::Error) -> Self {
        GraphinatorError::Serialization(format!("JSON error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, GraphinatorError>;
