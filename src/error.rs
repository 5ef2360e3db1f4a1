//! Error types for building, wiring, initializing and (de)serializing
//! component hierarchies.

use thiserror::Error;

use crate::config::ConfigError;
use crate::types::ComponentId;

/// Errors raised while attaching children or coupling ports.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("component {0} cannot hold children")]
    NotAContainer(String),

    #[error("component {0} is not a digraph")]
    NotADigraph(String),

    #[error("wrapper {0} already holds a component")]
    WrapperOccupied(String),

    #[error("duplicate child name: {0}")]
    DuplicateName(String),

    #[error("child name '{0}' is reserved")]
    ReservedName(String),

    #[error("coupling endpoint {0} is neither a child nor the digraph itself")]
    UnknownEndpoint(ComponentId),

    #[error("no child named '{0}'")]
    UnknownChild(String),
}

/// Errors raised by the declarative builder.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("configuration has no string <typeName>")]
    MissingTypeName,

    #[error("unknown component type: {0}")]
    UnknownType(String),

    #[error("malformed <{field}> for {type_name}: {reason}")]
    MalformedField {
        type_name: String,
        field: &'static str,
        reason: String,
    },

    #[error("failed to build child '{name}'")]
    Child {
        name: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("failed to build wrapped component")]
    Wrapped {
        #[source]
        source: Box<BuildError>,
    },

    #[error("coupling references unknown model '{0}'")]
    UnresolvedCoupling(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Document(#[from] ConfigError),
}

/// Result type for builder operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Error reported by a component's own initialization hook.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct LogicError(pub String);

impl LogicError {
    /// Creates a new logic error with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Initialization failure, naming the component that failed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("initialization of {type_name} ({id}) failed: {source}")]
pub struct InitError {
    pub id: ComponentId,
    pub type_name: String,
    #[source]
    pub source: LogicError,
}

/// Error reported when a component rejects a recorded state payload.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid state: {0}")]
pub struct StateError(pub String);

impl StateError {
    /// Creates a new state error with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// Errors raised while saving or loading serialized documents.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Document(#[from] ConfigError),

    #[error("unknown component type at load time: {0}")]
    UnknownType(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("state of {type_name} rejected: {source}")]
    State {
        type_name: String,
        #[source]
        source: StateError,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
