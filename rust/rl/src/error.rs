//! Error types for the solvers.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    World(#[from] gridworld::Error),

    #[error("singular linear system (pivot {pivot}): the policy value is undefined")]
    SingularSystem { pivot: usize },

    #[error("invalid policy table: {0}")]
    InvalidPolicy(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
