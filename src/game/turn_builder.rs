//! The turn in progress: a base position plus the moves staged on top of it.
//!
//! Each staged move keeps the partial position it produced, so undo and redo
//! only move the cursor; a timeline spawned by a branching move disappears
//! with the frame that created it.

use crate::game_state::chess_move::{canonical_promotion, Action, Move};
use crate::game_state::coordinates::Vec4;
use crate::game_state::piece::PieceKind;
use crate::game_state::position::Position;
use crate::move_generation::action_enumerator::is_complete_turn;
use crate::move_generation::legal_move_apply::{apply_move, is_promotion};
use crate::move_generation::legal_move_checks::gives_check;
use crate::move_generation::legal_move_generator::legal_moves_from;

#[derive(Debug, Clone)]
struct TurnFrame {
    mv: Move,
    position: Position,
}

#[derive(Debug, Clone)]
pub struct TurnBuilder {
    base: Position,
    frames: Vec<TurnFrame>,
    /// Number of frames currently applied.
    cursor: usize,
}

impl TurnBuilder {
    pub fn new(base: Position) -> Self {
        Self {
            base,
            frames: Vec::new(),
            cursor: 0,
        }
    }

    #[inline]
    pub fn base(&self) -> &Position {
        &self.base
    }

    /// Partial position after the applied moves.
    pub fn position(&self) -> &Position {
        match self.cursor {
            0 => &self.base,
            n => &self.frames[n - 1].position,
        }
    }

    /// Applied moves, in order.
    pub fn moves(&self) -> Action {
        self.frames[..self.cursor].iter().map(|f| f.mv).collect()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Stage the move `from -> to`. Returns `None` (and changes nothing)
    /// when it is not legal in the partial position, otherwise whether the
    /// mover now gives check.
    pub fn apply_move(
        &mut self,
        from: Vec4,
        to: Vec4,
        promotion: Option<PieceKind>,
    ) -> Option<bool> {
        let partial = self.position();
        let mut mv = legal_moves_from(partial, from)
            .into_iter()
            .find(|mv| mv.to == to)?;
        if is_promotion(partial, &mv) {
            mv.promotion = canonical_promotion(promotion);
        }
        let next = apply_move(partial, &mv).ok()?;
        let check = gives_check(&next);

        self.frames.truncate(self.cursor);
        self.frames.push(TurnFrame { mv, position: next });
        self.cursor += 1;
        Some(check)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.frames.len()
    }

    pub fn undo_move(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn redo_move(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Every mandatory timeline has been played and no royal piece of the
    /// mover is left in check.
    pub fn can_submit(&self) -> bool {
        is_complete_turn(self.position())
    }

    /// The submitted position and the action that produced it, or `None`
    /// when the turn is incomplete.
    pub fn finish(&self) -> Option<(Action, Position)> {
        if !self.can_submit() {
            return None;
        }
        let mut submitted = self.position().clone();
        if !submitted.submit() {
            return None;
        }
        Some((self.moves(), submitted))
    }

    /// Drop every staged move.
    pub fn reset(&mut self, base: Position) {
        self.base = base;
        self.frames.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::piece::Color;
    use crate::game_state::variants::builtin_position;

    fn builder() -> TurnBuilder {
        TurnBuilder::new(builtin_position("Very Small - Open").expect("variant"))
    }

    const PAWN: Vec4 = Vec4::new(0, 1, 1, 0);
    const PAWN_TO: Vec4 = Vec4::new(0, 2, 1, 0);

    #[test]
    fn illegal_move_changes_nothing() {
        let mut turn = builder();
        let before = turn.position().clone();
        assert_eq!(turn.apply_move(PAWN, Vec4::new(3, 3, 1, 0), None), None);
        assert_eq!(turn.apply_move(Vec4::new(2, 2, 1, 0), PAWN_TO, None), None);
        assert!(turn.is_empty());
        assert_eq!(turn.position(), &before);
    }

    #[test]
    fn undo_redo_restores_partial_position() {
        let mut turn = builder();
        assert!(!turn.can_submit());
        assert!(turn.apply_move(PAWN, PAWN_TO, None).is_some());
        let after = turn.position().clone();
        let moves = turn.moves();
        assert!(turn.can_submit());

        assert!(turn.undo_move());
        assert_eq!(turn.position(), turn.base());
        assert!(!turn.undo_move());
        assert!(turn.redo_move());
        assert_eq!(turn.position(), &after);
        assert_eq!(turn.moves(), moves);
        assert!(!turn.redo_move());
    }

    #[test]
    fn finish_submits_to_opponent() {
        let mut turn = builder();
        assert!(turn.finish().is_none());
        turn.apply_move(PAWN, PAWN_TO, None).expect("legal");
        let (action, submitted) = turn.finish().expect("complete");
        assert_eq!(action.len(), 1);
        assert_eq!(submitted.player(), Color::Black);
    }

    #[test]
    fn new_move_after_undo_drops_redo_tail() {
        let mut turn = builder();
        turn.apply_move(PAWN, PAWN_TO, None).expect("legal");
        turn.undo_move();
        let rook_to = Vec4::new(1, 1, 1, 0);
        turn.apply_move(Vec4::new(1, 0, 1, 0), rook_to, None).expect("rook lift");
        assert!(!turn.can_redo());
        assert_eq!(turn.moves().len(), 1);
        assert_eq!(turn.moves()[0].to, rook_to);
    }
}
