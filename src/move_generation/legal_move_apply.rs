//! Move application.
//!
//! A move never edits an existing board. It derives the boards it creates
//! (`MoveOutcome`) and appends them: to the end of the source and target
//! timelines, or for a branching move, as the first board of a new timeline.

use crate::errors::{ChessError, ChessResult};
use crate::game_state::board::Board;
use crate::game_state::chess_move::{Move, MoveKind};
use crate::game_state::coordinates::TurnIndex;
use crate::game_state::multiverse::Multiverse;
use crate::game_state::piece::{Color, Piece, PieceKind};
use crate::game_state::position::Position;
use crate::move_generation::legal_move_checks::{line_counts_for_checks, royal_attacked_on_board};

/// Boards created by a single move, before they are appended.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub kind: MoveKind,
    /// Successor of the source board.
    pub source: Board,
    /// Successor of the target board (or first board of the new timeline).
    pub target: Option<Board>,
}

impl MoveOutcome {
    /// True when a created board leaves a royal piece of `mover` capturable
    /// on that same board, on a line whose checks count against `mover`.
    pub fn exposes_royal(&self, m: &Multiverse, mover: Color) -> bool {
        let opponent = mover.opposite();
        let source_exposed = line_counts_for_checks(m, self.source.l, opponent)
            && royal_attacked_on_board(&self.source, mover);
        source_exposed
            || self.target.as_ref().is_some_and(|b| {
                (self.kind == MoveKind::Branching || line_counts_for_checks(m, b.l, opponent))
                    && royal_attacked_on_board(b, mover)
            })
    }
}

fn last_rank(color: Color, height: i32) -> i32 {
    match color {
        Color::White => height - 1,
        Color::Black => 0,
    }
}

/// Piece as it lands on `y`, promoted when a pawn-like piece reaches its
/// last rank.
fn landed_piece(piece: Piece, mv: &Move, height: i32) -> Piece {
    if piece.kind.is_pawn_like() && mv.to.y == last_rank(piece.color, height) {
        let kind = mv
            .promotion
            .filter(|k| k.is_promotion_target())
            .unwrap_or(PieceKind::Queen);
        Piece::new(kind, piece.color)
    } else {
        piece.moved()
    }
}

/// Whether `mv` brings a pawn-like piece of the side to move to its last rank.
pub fn is_promotion(pos: &Position, mv: &Move) -> bool {
    let height = pos.multiverse().height();
    pos.piece_at(mv.from)
        .is_some_and(|p| p.kind.is_pawn_like() && mv.to.y == last_rank(p.color, height))
}

/// Derive the boards `mv` creates without touching `pos`.
pub fn move_outcome(pos: &Position, mv: &Move) -> ChessResult<MoveOutcome> {
    let player = pos.player();
    let m = pos.multiverse();
    let (from, to) = (mv.from, mv.to);

    if !pos.is_playable_board(from.l, from.t) {
        return Err(ChessError::IllegalMove(format!(
            "source board of {mv} is not playable"
        )));
    }
    let source = m
        .board(from.l, from.t, player)
        .ok_or_else(|| ChessError::IllegalMove(format!("no source board for {mv}")))?;
    let piece = source
        .get(from.x, from.y)
        .filter(|p| p.color == player)
        .ok_or_else(|| ChessError::IllegalMove(format!("no {player} piece on {from}")))?;
    if !m.in_bounds(to, player) {
        return Err(ChessError::IllegalMove(format!("target of {mv} does not exist")));
    }

    let height = m.height();
    let kind = pos.move_kind(mv);
    let landed = landed_piece(piece, mv, height);

    if kind == MoveKind::Physical {
        let mut board = Board::clone(source);
        let dx = to.x - from.x;
        if piece.kind.is_pawn_like() && dx != 0 && board.get(to.x, to.y).is_none() {
            board.set(to.x, from.y, None);
        }
        if piece.kind == PieceKind::King && dx.abs() > 1 {
            let rook_x = if dx < 0 { 0 } else { board.width() - 1 };
            board.move_piece((rook_x, from.y), (to.x - dx.signum(), from.y));
        }
        board.set(from.x, from.y, None);
        board.set(to.x, to.y, Some(landed));
        return Ok(MoveOutcome {
            kind,
            source: board,
            target: None,
        });
    }

    let mut source_board = Board::clone(source);
    source_board.set(from.x, from.y, None);

    let target = m
        .board(to.l, to.t, player)
        .ok_or_else(|| ChessError::IllegalMove(format!("no target board for {mv}")))?;
    let mut target_board = Board::clone(target);
    target_board.set(to.x, to.y, Some(landed));

    Ok(MoveOutcome {
        kind,
        source: source_board,
        target: Some(target_board),
    })
}

/// Append the boards of `outcome` (derived from `mv`) to `pos`.
pub fn commit_outcome(pos: &mut Position, mv: &Move, outcome: MoveOutcome) -> ChessResult<()> {
    let player = pos.player();
    let missing = |l: i32| ChessError::IllegalMove(format!("timeline {l} does not exist"));

    pos.multiverse
        .timeline_mut(mv.from.l)
        .ok_or_else(|| missing(mv.from.l))?
        .push_board(outcome.source);

    let Some(target) = outcome.target else {
        return Ok(());
    };
    match outcome.kind {
        MoveKind::Branching => {
            let start = TurnIndex::new(mv.to.t, player).next();
            pos.multiverse.add_timeline(player, start, target);
            let present = pos.multiverse.present();
            if present.t < pos.present {
                pos.present = present.t;
            }
        }
        _ => pos
            .multiverse
            .timeline_mut(mv.to.l)
            .ok_or_else(|| missing(mv.to.l))?
            .push_board(target),
    }
    Ok(())
}

/// Apply `mv` in place; returns how it was classified.
pub fn apply_move_in_place(pos: &mut Position, mv: &Move) -> ChessResult<MoveKind> {
    let outcome = move_outcome(pos, mv)?;
    let kind = outcome.kind;
    commit_outcome(pos, mv, outcome)?;
    Ok(kind)
}

pub fn apply_move(pos: &Position, mv: &Move) -> ChessResult<Position> {
    let mut next = pos.clone();
    apply_move_in_place(&mut next, mv)?;
    Ok(next)
}
