//! Legal move generation pipeline.
//!
//! Collects pseudo-legal destinations for pieces on playable boards, derives
//! the boards each move would create and drops moves that leave the mover's
//! royal piece capturable on one of those boards. Whole-turn legality (checks
//! that cross boards) is settled when a turn is submitted; see
//! `action_enumerator`.

use std::collections::BTreeSet;
use std::ops::ControlFlow;

use crate::game_state::chess_move::Move;
use crate::game_state::coordinates::Vec4;
use crate::game_state::position::Position;
use crate::move_generation::action_enumerator::for_each_action;
use crate::move_generation::legal_move_apply::move_outcome;
use crate::move_generation::legal_move_checks::is_self_in_check;
use crate::move_generation::piece_moves::piece_destinations;

/// Timeline indices grouped by what the side to move must do on them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineStatus {
    /// Active lines whose newest board sits on the present: a move is owed.
    pub mandatory: Vec<i32>,
    /// Other lines ending on a board of the side to move.
    pub optional: Vec<i32>,
    pub unplayable: Vec<i32>,
}

pub fn classify_timelines(pos: &Position) -> TimelineStatus {
    let m = pos.multiverse();
    let mut status = TimelineStatus::default();
    for timeline in m.timelines() {
        let l = timeline.l();
        let end = timeline.end();
        if m.is_active(l) && end == pos.turn() {
            status.mandatory.push(l);
        } else if end.color == pos.player() {
            status.optional.push(l);
        } else {
            status.unplayable.push(l);
        }
    }
    status
}

/// Timelines whose newest board belongs to the side to move, ascending.
pub fn playable_lines(pos: &Position) -> impl Iterator<Item = i32> + '_ {
    pos.multiverse()
        .timelines()
        .filter(move |tl| tl.end().color == pos.player())
        .map(|tl| tl.l())
}

/// Legal single moves of the piece on `from`.
pub fn legal_moves_from(pos: &Position, from: Vec4) -> Vec<Move> {
    let mut out = Vec::new();
    push_legal_moves_from(pos, from, &mut Vec::with_capacity(64), &mut out);
    out
}

fn push_legal_moves_from(pos: &Position, from: Vec4, scratch: &mut Vec<Vec4>, out: &mut Vec<Move>) {
    if !pos.is_playable_board(from.l, from.t) {
        return;
    }
    let player = pos.player();
    scratch.clear();
    piece_destinations(pos.multiverse(), from, player, scratch);
    for to in scratch.iter() {
        let mv = Move::new(from, *to);
        match move_outcome(pos, &mv) {
            Ok(outcome) if !outcome.exposes_royal(pos.multiverse(), player) => out.push(mv),
            _ => {}
        }
    }
}

pub fn moves_from(pos: &Position, from: Vec4) -> Vec<Vec4> {
    legal_moves_from(pos, from).into_iter().map(|mv| mv.to).collect()
}

/// Legal single moves whose source lies on timeline `l`.
pub fn legal_moves_on_line(pos: &Position, l: i32) -> Vec<Move> {
    let mut out = Vec::new();
    let Some(board) = pos.multiverse().timeline(l).and_then(|tl| tl.last_board()) else {
        return out;
    };
    if board.color != pos.player() {
        return out;
    }
    let mut scratch = Vec::with_capacity(64);
    for (x, y, _) in board.pieces_of(pos.player()) {
        push_legal_moves_from(pos, Vec4::new(x, y, board.t, l), &mut scratch, &mut out);
    }
    out
}

/// Every legal single move of the side to move, by ascending source line.
pub fn legal_moves(pos: &Position) -> Vec<Move> {
    playable_lines(pos)
        .flat_map(|l| legal_moves_on_line(pos, l))
        .collect()
}

pub fn movable_pieces(pos: &Position) -> Vec<Vec4> {
    let mut sources: Vec<Vec4> = legal_moves(pos).into_iter().map(|mv| mv.from).collect();
    sources.dedup();
    sources
}

/// Pieces that can take part in resolving the current position. Outside of
/// check this is every movable piece; in check it is the sources of the
/// moves that make up some legal completion of the turn.
pub fn movable_critical(pos: &Position) -> Vec<Vec4> {
    let movable = movable_pieces(pos);
    if !is_self_in_check(pos) {
        return movable;
    }
    let mut critical = BTreeSet::new();
    let _ = for_each_action(pos, |moves, _| {
        critical.extend(moves.iter().map(|mv| mv.from));
        if critical.len() >= movable.len() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    movable.into_iter().filter(|p| critical.contains(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::multiverse::Multiverse;
    use crate::game_state::piece::Color;
    use crate::game_state::variants::builtin_position;
    use crate::move_generation::legal_move_apply::apply_move;
    use crate::utils::board_fen::parse_board_fen;

    fn single(fen: &str) -> Position {
        let board = parse_board_fen(fen, 4, 4, 0, 1, Color::White).expect("fen");
        Position::new(Multiverse::new(4, 4, vec![board]).expect("multiverse"))
    }

    #[test]
    fn opening_lines_are_mandatory() {
        let pos = builtin_position("Very Small - Open").expect("variant");
        let status = classify_timelines(&pos);
        assert_eq!(status.mandatory, vec![0]);
        assert!(status.optional.is_empty());
        assert!(status.unplayable.is_empty());

        let mv = legal_moves(&pos)[0];
        let after = apply_move(&pos, &mv).expect("apply");
        let status = classify_timelines(&after);
        assert_eq!(status.unplayable, vec![0]);
        assert!(status.mandatory.is_empty());
    }

    #[test]
    fn moves_from_is_empty_for_foreign_or_unplayable_squares() {
        let pos = builtin_position("Very Small - Open").expect("variant");
        assert!(moves_from(&pos, Vec4::new(3, 3, 1, 0)).is_empty());
        assert!(moves_from(&pos, Vec4::new(2, 2, 1, 0)).is_empty());
        assert!(moves_from(&pos, Vec4::new(0, 1, 0, 0)).is_empty());
        assert!(moves_from(&pos, Vec4::new(0, 1, 1, 5)).is_empty());
        assert!(!moves_from(&pos, Vec4::new(0, 1, 1, 0)).is_empty());
    }

    #[test]
    fn pinned_piece_cannot_expose_king() {
        // The white rook on b1 shields the king on a1 from the rook on d1.
        let pos = single("k3/4/4/KR1r");
        let rook_moves = moves_from(&pos, Vec4::new(1, 0, 1, 0));
        assert_eq!(rook_moves, vec![Vec4::new(2, 0, 1, 0), Vec4::new(3, 0, 1, 0)]);
    }

    #[test]
    fn movable_pieces_lists_each_source_once() {
        let pos = builtin_position("Very Small - Open").expect("variant");
        let movable = movable_pieces(&pos);
        let mut sorted = movable.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), movable.len());
        assert!(movable.contains(&Vec4::new(0, 1, 1, 0)));
        assert_eq!(movable_critical(&pos), movable);
    }
}
