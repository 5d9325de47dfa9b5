//! Enumeration of complete legal turns (actions).
//!
//! A turn is a set of single moves on distinct source timelines. To visit
//! each set once, moves are played in a canonical order: physical and
//! non-branching moves first, by strictly increasing source line, then
//! branching moves, again by strictly increasing source line. Every state
//! along the way that may be submitted without leaving a royal piece in check
//! is an action. The walk continues past such states since optional
//! timelines may still be played.

use std::ops::ControlFlow;

use log::trace;

use crate::game_state::chess_move::{Action, Move, MoveKind};
use crate::game_state::position::Position;
use crate::move_generation::legal_move_apply::apply_move;
use crate::move_generation::legal_move_checks::is_self_in_check;
use crate::move_generation::legal_move_generator::{legal_moves_on_line, playable_lines};

/// Next source line allowed in each phase.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    /// `None` once a branching move has been played.
    settled_from: Option<i32>,
    branching_from: i32,
}

impl Cursor {
    const START: Cursor = Cursor {
        settled_from: Some(i32::MIN),
        branching_from: i32::MIN,
    };
}

/// Whether the partial turn in `pos` may be submitted as it stands.
pub fn is_complete_turn(pos: &Position) -> bool {
    pos.present_passed() && !is_self_in_check(pos)
}

/// Call `visit` with the moves and resulting (unsubmitted) position of
/// every legal action from `pos`, until it breaks.
pub fn for_each_action<F>(pos: &Position, mut visit: F) -> ControlFlow<()>
where
    F: FnMut(&[Move], &Position) -> ControlFlow<()>,
{
    let mut moves = Vec::with_capacity(4);
    walk(pos, Cursor::START, &mut moves, &mut visit)
}

fn walk<F>(pos: &Position, cursor: Cursor, moves: &mut Vec<Move>, visit: &mut F) -> ControlFlow<()>
where
    F: FnMut(&[Move], &Position) -> ControlFlow<()>,
{
    if is_complete_turn(pos) {
        visit(moves, pos)?;
    }

    let lines: Vec<i32> = playable_lines(pos).collect();

    if let Some(settled_from) = cursor.settled_from {
        for &l in lines.iter().filter(|l| **l >= settled_from) {
            for mv in legal_moves_on_line(pos, l) {
                if pos.move_kind(&mv) == MoveKind::Branching {
                    continue;
                }
                let next_cursor = Cursor {
                    settled_from: Some(l + 1),
                    branching_from: i32::MIN,
                };
                descend(pos, mv, next_cursor, moves, visit)?;
            }
        }
    }

    for &l in lines.iter().filter(|l| **l >= cursor.branching_from) {
        for mv in legal_moves_on_line(pos, l) {
            if pos.move_kind(&mv) != MoveKind::Branching {
                continue;
            }
            let next_cursor = Cursor {
                settled_from: None,
                branching_from: l + 1,
            };
            descend(pos, mv, next_cursor, moves, visit)?;
        }
    }

    ControlFlow::Continue(())
}

fn descend<F>(
    pos: &Position,
    mv: Move,
    cursor: Cursor,
    moves: &mut Vec<Move>,
    visit: &mut F,
) -> ControlFlow<()>
where
    F: FnMut(&[Move], &Position) -> ControlFlow<()>,
{
    let next = match apply_move(pos, &mv) {
        Ok(next) => next,
        Err(err) => {
            trace!("skipping generated move {mv}: {err}");
            return ControlFlow::Continue(());
        }
    };
    moves.push(mv);
    let flow = walk(&next, cursor, moves, visit);
    moves.pop();
    flow
}

pub fn count_actions(pos: &Position) -> u64 {
    let mut count = 0u64;
    let _ = for_each_action(pos, |_, _| {
        count += 1;
        ControlFlow::Continue(())
    });
    count
}

pub fn legal_actions(pos: &Position) -> Vec<Action> {
    let mut actions = Vec::new();
    let _ = for_each_action(pos, |moves, _| {
        actions.push(moves.to_vec());
        ControlFlow::Continue(())
    });
    actions
}

pub fn first_action(pos: &Position) -> Option<Action> {
    let mut found = None;
    let _ = for_each_action(pos, |moves, _| {
        found = Some(moves.to_vec());
        ControlFlow::Break(())
    });
    found
}

pub fn has_legal_action(pos: &Position) -> bool {
    for_each_action(pos, |_, _| ControlFlow::Break(())).is_break()
}

/// Every legal action paired with the submitted position it leads to.
pub fn legal_children(pos: &Position) -> Vec<(Action, Position)> {
    let mut children = Vec::new();
    let _ = for_each_action(pos, |moves, partial| {
        let mut child = partial.clone();
        if child.submit() {
            children.push((moves.to_vec(), child));
        }
        ControlFlow::Continue(())
    });
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::coordinates::Vec4;
    use crate::game_state::multiverse::Multiverse;
    use crate::game_state::piece::Color;
    use crate::game_state::variants::builtin_position;
    use crate::move_generation::legal_move_generator::legal_moves;
    use crate::utils::board_fen::parse_board_fen;

    fn single(fen: &str) -> Position {
        let board = parse_board_fen(fen, 4, 4, 0, 1, Color::White).expect("fen");
        Position::new(Multiverse::new(4, 4, vec![board]).expect("multiverse"))
    }

    #[test]
    fn opening_actions_are_single_moves() {
        let pos = builtin_position("Very Small - Open").expect("variant");
        let actions = legal_actions(&pos);
        assert!(!actions.is_empty());
        assert!(actions.iter().all(|a| a.len() == 1));
        assert_eq!(count_actions(&pos), actions.len() as u64);
        assert_eq!(first_action(&pos), actions.first().cloned());
        // One board, so every legal single move is a whole turn.
        assert_eq!(actions.len(), legal_moves(&pos).len());
    }

    #[test]
    fn children_are_submitted() {
        let pos = builtin_position("Very Small - Open").expect("variant");
        for (action, child) in legal_children(&pos) {
            assert_eq!(action.len(), 1);
            assert_eq!(child.player(), Color::Black);
            assert_eq!(child.present(), 1);
        }
    }

    #[test]
    fn checkmated_side_has_no_action() {
        // The rook on d1 checks along the first rank; the king is boxed in
        // by its own pawns.
        let pos = single("3k/4/PP2/K2r");
        assert!(is_self_in_check(&pos));
        assert!(!has_legal_action(&pos));
        assert_eq!(count_actions(&pos), 0);
        assert!(first_action(&pos).is_none());
    }

    #[test]
    fn check_is_resolved_by_capture_or_escape() {
        let pos = single("3k/4/1N2/K2r");
        assert!(is_self_in_check(&pos));
        let actions = legal_actions(&pos);
        assert_eq!(actions.len(), 2);
        let capture = Move::new(Vec4::new(1, 1, 1, 0), Vec4::new(3, 0, 1, 0));
        let escape = Move::new(Vec4::new(0, 0, 1, 0), Vec4::new(0, 1, 1, 0));
        assert!(actions.contains(&vec![capture]));
        assert!(actions.contains(&vec![escape]));
    }
}
