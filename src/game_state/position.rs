//! A multiverse plus present-turn bookkeeping.
//!
//! `present` and `player` describe whose turn it is. They change on
//! `submit`, and `present` also drops back when a branching move activates a
//! timeline that ends earlier than the current present.

use crate::game_state::chess_move::{Move, MoveKind};
use crate::game_state::coordinates::{TurnIndex, Vec4};
use crate::game_state::multiverse::Multiverse;
use crate::game_state::piece::{Color, Piece};
use crate::search::zobrist::{present_key, PositionKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub(crate) multiverse: Multiverse,
    pub(crate) present: i32,
    pub(crate) player: Color,
}

impl Position {
    pub fn new(multiverse: Multiverse) -> Self {
        let present = multiverse.present();
        Self {
            multiverse,
            present: present.t,
            player: present.color,
        }
    }

    #[inline]
    pub fn multiverse(&self) -> &Multiverse {
        &self.multiverse
    }

    #[inline]
    pub fn present(&self) -> i32 {
        self.present
    }

    #[inline]
    pub fn player(&self) -> Color {
        self.player
    }

    #[inline]
    pub fn turn(&self) -> TurnIndex {
        TurnIndex::new(self.present, self.player)
    }

    #[inline]
    pub fn board_size(&self) -> (i32, i32) {
        (self.multiverse.width(), self.multiverse.height())
    }

    #[inline]
    pub fn piece_at(&self, p: Vec4) -> Option<Piece> {
        self.multiverse.piece_at(p, self.player)
    }

    /// True when `(l, t)` is the newest board of its timeline and the side
    /// to move is the one to play on it.
    pub fn is_playable_board(&self, l: i32, t: i32) -> bool {
        self.multiverse.timeline_end(l) == Some(TurnIndex::new(t, self.player))
    }

    /// Classify `mv` against the current timeline ends.
    pub fn move_kind(&self, mv: &Move) -> MoveKind {
        if mv.is_physical() {
            MoveKind::Physical
        } else if self.multiverse.timeline_end(mv.to.l)
            == Some(TurnIndex::new(mv.to.t, self.player))
        {
            MoveKind::NonBranching
        } else {
            MoveKind::Branching
        }
    }

    /// Timeline index a branching move by the side to move would create.
    #[inline]
    pub fn new_line(&self) -> i32 {
        self.multiverse.new_line(self.player)
    }

    /// True when every mandatory timeline has been played, i.e. the
    /// multiverse present has passed to the opponent.
    pub fn present_passed(&self) -> bool {
        self.multiverse.present().color != self.player
    }

    /// Hand the move to the opponent. Fails (returning false, no change)
    /// while the side to move still owes moves on the present.
    pub fn submit(&mut self) -> bool {
        let present = self.multiverse.present();
        if present.color == self.player {
            return false;
        }
        self.present = present.t;
        self.player = present.color;
        true
    }

    /// Copy in which every timeline whose newest board belongs to `color`
    /// receives a pass board, so that it ends on the other color.
    pub fn phantom_for(&self, color: Color) -> Position {
        let mut out = self.clone();
        let (l_min, l_max) = self.multiverse.l_range();
        for l in l_min..=l_max {
            if self.multiverse.timeline_end(l).map(|e| e.color) == Some(color) {
                if let Some(tl) = out.multiverse.timeline_mut(l) {
                    tl.push_copy_of_last();
                }
            }
        }
        out
    }

    /// Transposition key over every board plus the present bookkeeping.
    pub fn key(&self) -> PositionKey {
        let mut key = self.multiverse.key();
        key ^= present_key(self.present, self.player);
        key
    }
}
