//! Single 2-D board snapshot.
//!
//! Boards are historical facts: once wrapped in an `Arc` and appended to a
//! timeline they are never mutated. New boards are derived by cloning and
//! editing before they are shared. The content hash is maintained
//! incrementally on every edit.

use crate::game_state::piece::{Color, Piece};
use crate::search::zobrist::{piece_square_key, PositionKey, MAX_SQUARES};

pub const MAX_BOARD_LENGTH: i32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: i32,
    height: i32,
    /// Timeline this board belongs to.
    pub l: i32,
    /// Time index within the timeline.
    pub t: i32,
    /// Player to move on this board.
    pub color: Color,
    squares: [Option<Piece>; MAX_SQUARES],
    hash: PositionKey,
}

impl Board {
    /// Empty board; `width` and `height` are clamped to `1..=8`.
    pub fn empty(width: i32, height: i32, l: i32, t: i32, color: Color) -> Self {
        Self {
            width: width.clamp(1, MAX_BOARD_LENGTH),
            height: height.clamp(1, MAX_BOARD_LENGTH),
            l,
            t,
            color,
            squares: [None; MAX_SQUARES],
            hash: PositionKey::default(),
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        (0..self.width).contains(&x) && (0..self.height).contains(&y)
    }

    #[inline]
    fn index(x: i32, y: i32) -> usize {
        (y * MAX_BOARD_LENGTH + x) as usize
    }

    /// Piece at `(x, y)`; `None` for empty or out-of-range squares.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<Piece> {
        if self.in_bounds(x, y) {
            self.squares[Self::index(x, y)]
        } else {
            None
        }
    }

    /// Replace the content of a square. Out-of-range writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, piece: Option<Piece>) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = Self::index(x, y);
        if let Some(old) = self.squares[idx] {
            self.hash ^= piece_square_key(old, idx);
        }
        if let Some(new) = piece {
            self.hash ^= piece_square_key(new, idx);
        }
        self.squares[idx] = piece;
    }

    /// Move whatever stands on `from` to `to`, clearing its unmoved flag.
    pub fn move_piece(&mut self, from: (i32, i32), to: (i32, i32)) {
        let piece = self.get(from.0, from.1).map(Piece::moved);
        self.set(from.0, from.1, None);
        self.set(to.0, to.1, piece);
    }

    /// Copy of this board placed at a new `(l, t, color)` slot.
    pub fn retagged(&self, l: i32, t: i32, color: Color) -> Board {
        Board {
            l,
            t,
            color,
            ..self.clone()
        }
    }

    /// Hash of the square contents only, independent of the board's tag.
    #[inline]
    pub fn content_hash(&self) -> PositionKey {
        self.hash
    }

    /// All occupied squares as `(x, y, piece)`, rank by rank from `a1`.
    pub fn pieces(&self) -> impl Iterator<Item = (i32, i32, Piece)> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).filter_map(move |x| self.get(x, y).map(|p| (x, y, p)))
        })
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (i32, i32, Piece)> + '_ {
        self.pieces().filter(move |(_, _, p)| p.color == color)
    }

    pub fn has_royal(&self, color: Color) -> bool {
        self.pieces_of(color).any(|(_, _, p)| p.kind.is_royal())
    }
}
