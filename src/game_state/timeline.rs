//! One timeline: an append-only run of boards sharing a timeline index.

use std::sync::Arc;

use crate::game_state::board::Board;
use crate::game_state::coordinates::TurnIndex;
use crate::game_state::piece::Color;
use crate::search::zobrist::{board_placement_key, PositionKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    l: i32,
    start_v: i32,
    boards: Vec<Arc<Board>>,
    key: PositionKey,
}

impl Timeline {
    /// New timeline whose first board is `board`, placed at `start`.
    pub fn new(l: i32, start: TurnIndex, board: Board) -> Self {
        let mut timeline = Self {
            l,
            start_v: start.v(),
            boards: Vec::with_capacity(8),
            key: PositionKey::default(),
        };
        timeline.push_board(board);
        timeline
    }

    #[inline]
    pub fn l(&self) -> i32 {
        self.l
    }

    #[inline]
    pub fn start(&self) -> TurnIndex {
        TurnIndex::from_v(self.start_v)
    }

    /// Turn index of the newest board.
    #[inline]
    pub fn end(&self) -> TurnIndex {
        TurnIndex::from_v(self.start_v + self.boards.len() as i32 - 1)
    }

    /// Time index of the newest board.
    #[inline]
    pub fn present_time(&self) -> i32 {
        self.end().t
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn board(&self, t: i32, color: Color) -> Option<&Arc<Board>> {
        let idx = TurnIndex::new(t, color).v() - self.start_v;
        usize::try_from(idx).ok().and_then(|i| self.boards.get(i))
    }

    pub fn last_board(&self) -> Option<&Arc<Board>> {
        self.boards.last()
    }

    pub fn boards(&self) -> impl Iterator<Item = &Arc<Board>> {
        self.boards.iter()
    }

    /// Append `board` as the next snapshot; its tag is rewritten to match.
    pub fn push_board(&mut self, board: Board) {
        let next = if self.boards.is_empty() {
            TurnIndex::from_v(self.start_v)
        } else {
            self.end().next()
        };
        let board = if board.l == self.l && board.t == next.t && board.color == next.color {
            board
        } else {
            board.retagged(self.l, next.t, next.color)
        };
        self.key ^= board_placement_key(board.content_hash(), self.l, next.v());
        self.boards.push(Arc::new(board));
    }

    /// Append a copy of the newest board (a pass on this timeline).
    pub fn push_copy_of_last(&mut self) {
        if let Some(last) = self.boards.last() {
            let copy = Board::clone(last);
            self.push_board(copy);
        }
    }

    #[inline]
    pub fn key(&self) -> PositionKey {
        self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::piece::{Piece, PieceKind};

    fn sample_board() -> Board {
        let mut b = Board::empty(4, 4, 0, 0, Color::White);
        b.set(0, 0, Some(Piece::unmoved(PieceKind::King, Color::White)));
        b.set(3, 3, Some(Piece::unmoved(PieceKind::King, Color::Black)));
        b
    }

    #[test]
    fn push_advances_end_and_tags_boards() {
        let mut tl = Timeline::new(0, TurnIndex::new(1, Color::White), sample_board());
        assert_eq!(tl.end(), TurnIndex::new(1, Color::White));
        tl.push_copy_of_last();
        assert_eq!(tl.end(), TurnIndex::new(1, Color::Black));
        tl.push_copy_of_last();
        assert_eq!(tl.end(), TurnIndex::new(2, Color::White));
        assert_eq!(tl.len(), 3);

        let b = tl.board(1, Color::Black).expect("board at 1b");
        assert_eq!((b.l, b.t, b.color), (0, 1, Color::Black));
        assert!(tl.board(0, Color::Black).is_none());
        assert!(tl.board(3, Color::White).is_none());
    }

    #[test]
    fn key_depends_on_history() {
        let mut a = Timeline::new(0, TurnIndex::new(1, Color::White), sample_board());
        let b = a.clone();
        assert_eq!(a.key(), b.key());
        a.push_copy_of_last();
        assert_ne!(a.key(), b.key());
    }
}
