use thiserror::Error;

/// Engine errors. Rule violations and validation failures are expected,
/// recoverable outcomes reported to the acting caller; only `Storage`
/// represents an actual fault.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cell index {0} is out of range")]
    InvalidCell(usize),

    #[error("cell {0} is already occupied")]
    CellOccupied(usize),

    #[error("match is not active")]
    MatchNotActive,

    #[error("match is already full")]
    MatchFull,

    #[error("player holds no seat in this match")]
    NotASeatHolder,

    #[error("not your turn")]
    NotYourTurn,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not allowed to act on this {0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("storage error")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
