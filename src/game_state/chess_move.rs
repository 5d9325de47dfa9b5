//! Move and action value types.

use std::fmt;

use crate::game_state::coordinates::Vec4;
use crate::game_state::piece::PieceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Move {
    pub from: Vec4,
    pub to: Vec4,
    /// Promotion choice; `None` promotes to a queen when a pawn-like piece
    /// reaches the last rank. Never `Some(Queen)`.
    pub promotion: Option<PieceKind>,
}

/// Canonical promotion choice: queens and pieces that cannot be promoted to
/// collapse to `None`, so one move has one representation.
#[inline]
pub fn canonical_promotion(kind: Option<PieceKind>) -> Option<PieceKind> {
    kind.filter(|k| k.is_promotion_target() && *k != PieceKind::Queen)
}

impl Move {
    #[inline]
    pub const fn new(from: Vec4, to: Vec4) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    #[inline]
    pub fn with_promotion(from: Vec4, to: Vec4, promotion: PieceKind) -> Self {
        Self {
            from,
            to,
            promotion: canonical_promotion(Some(promotion)),
        }
    }

    #[inline]
    pub const fn is_physical(&self) -> bool {
        self.from.same_board(self.to)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)?;
        if let Some(p) = self.promotion {
            write!(f, "={}", p.letter())?;
        }
        Ok(())
    }
}

/// How a move interacts with the timeline structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// Source and target are the same board.
    Physical,
    /// Target board is the newest board of its timeline.
    NonBranching,
    /// Target board lies in the past of its timeline; a new timeline splits off.
    Branching,
}

/// The moves of one complete turn, in application order.
pub type Action = Vec<Move>;
