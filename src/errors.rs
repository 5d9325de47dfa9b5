//! Crate-wide error type.
//!
//! Rule violations during interactive play are reported as `bool` results by
//! the turn builder; this enum covers the failures that callers are expected
//! to surface as messages (parsing, replay, worker failures).

use thiserror::Error;

pub type ChessResult<T> = Result<T, ChessError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChessError {
    /// Notation text (headers, board FEN, move text) could not be parsed.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// A move was rejected by the legality engine.
    #[error("illegal move: {0}")]
    IllegalMove(String),
    /// A turn was submitted before every mandatory timeline was played.
    #[error("incomplete turn: {0}")]
    IncompleteTurn(String),
    /// Undo/redo/visit requested beyond the recorded history.
    #[error("navigation out of bounds: {0}")]
    NavigationBounds(String),
    /// A search worker thread panicked.
    #[error("search worker failed: {0}")]
    SearchPanicked(String),
}

impl ChessError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        ChessError::MalformedInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_detail() {
        let err = ChessError::malformed("bad size 9x9");
        assert_eq!(err.to_string(), "malformed input: bad size 9x9");

        let err = ChessError::IncompleteTurn("timeline 0 not played".to_owned());
        assert!(err.to_string().starts_with("incomplete turn"));
    }
}
