//! Error types for position parsing, move input and engine line updates.

use thiserror::Error;

/// Ways a position string can be structurally wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPosition {
    #[error("expected 6 space-separated fields, found {0}")]
    FieldCount(usize),
    #[error("board layout must have 8 ranks, found {0}")]
    RankCount(usize),
    #[error("rank {rank} does not describe exactly 8 files")]
    RankWidth { rank: u8 },
    #[error("unknown piece code '{0}'")]
    UnknownPieceCode(char),
    #[error("full-move number '{0}' is not an unsigned integer")]
    MoveNumber(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("malformed position: {0}")]
    Malformed(#[from] MalformedPosition),
    #[error(
        "move number must be between 1 and {}",
        crate::domain::position::MAX_MOVE_NUMBER
    )]
    InvalidMoveNumber,
    /// Parsed fine but the legal move generator refuses it (missing kings etc).
    #[error("position cannot be played: {0}")]
    Unplayable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("'{0}' is not a UCI move")]
    Unparseable(String),
    #[error("{0} is not legal in the current position")]
    Illegal(String),
}

/// Reasons an engine line update is dropped. Never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("line {line_id} outside configured range 1..={capacity}")]
    OutOfRangeLine { line_id: u32, capacity: usize },
    #[error("update from search {generation} while search {current} is current")]
    StaleSearch { generation: u64, current: u64 },
    #[error("update from search {generation} while analysis is off")]
    NoSearch { generation: u64 },
}
