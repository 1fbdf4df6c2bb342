//! Error types for the grid world.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid world dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("world map has {got} rows, expected {expected}")]
    RowCount { expected: usize, got: usize },

    #[error("world map row {row} has {got} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("unknown cell code '{code}' at ({x}, {y})")]
    UnknownCellCode { code: char, x: usize, y: usize },

    #[error("world has no start cell")]
    MissingStart,

    #[error("world has more than one start cell, second one at ({x}, {y})")]
    DuplicateStart { x: usize, y: usize },

    #[error("world has no goal cell")]
    MissingGoal,

    #[error("action success probability {0} is outside [0, 1]")]
    InvalidProbability(f64),

    #[error("episode did not terminate within {0} steps")]
    NoTermination(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
