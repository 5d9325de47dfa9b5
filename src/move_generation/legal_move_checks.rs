//! Check detection.
//!
//! Single-board attack tests serve as a fast prefilter. Multiverse checks
//! scan every piece of the attacker on boards it is to move on, across all
//! four axes, and report the `(from, to)` pairs that capture a royal piece.

use std::ops::ControlFlow;

use crate::game_state::board::Board;
use crate::game_state::coordinates::Vec4;
use crate::game_state::multiverse::Multiverse;
use crate::game_state::piece::{Color, PieceKind};
use crate::game_state::position::Position;
use crate::move_generation::piece_moves::piece_destinations;

const KNIGHT_STEPS: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const RAYS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

#[inline]
fn reaches_along(kind: PieceKind, diagonal: bool, adjacent: bool) -> bool {
    match kind {
        PieceKind::Queen | PieceKind::RoyalQueen | PieceKind::Princess => true,
        PieceKind::Rook => !diagonal,
        PieceKind::Bishop => diagonal,
        PieceKind::King | PieceKind::CommonKing => adjacent,
        _ => false,
    }
}

/// Whether `attacker` could capture on `(x, y)` with a move that stays on
/// `board`.
pub fn square_attacked_on_board(board: &Board, x: i32, y: i32, attacker: Color) -> bool {
    let hostile = |px: i32, py: i32| board.get(px, py).filter(|p| p.color == attacker);

    for (dx, dy) in KNIGHT_STEPS {
        if hostile(x + dx, y + dy).is_some_and(|p| p.kind == PieceKind::Knight) {
            return true;
        }
    }

    let behind = y - attacker.forward_y();
    for dx in [-1, 1] {
        if hostile(x + dx, behind).is_some_and(|p| p.kind.is_pawn_like()) {
            return true;
        }
    }

    for (dx, dy) in RAYS {
        let diagonal = dx != 0 && dy != 0;
        let (mut cx, mut cy) = (x + dx, y + dy);
        let mut adjacent = true;
        while board.in_bounds(cx, cy) {
            if let Some(piece) = board.get(cx, cy) {
                if piece.color == attacker && reaches_along(piece.kind, diagonal, adjacent) {
                    return true;
                }
                break;
            }
            cx += dx;
            cy += dy;
            adjacent = false;
        }
    }

    false
}

/// True when a royal piece of `color` on `board` can be captured without
/// leaving the board.
pub fn royal_attacked_on_board(board: &Board, color: Color) -> bool {
    board
        .pieces_of(color)
        .filter(|(_, _, p)| p.kind.is_royal())
        .any(|(x, y, _)| square_attacked_on_board(board, x, y, color.opposite()))
}

/// Whether checks from `attacker` pieces on timeline `l` count. Lines the
/// attacker created that are currently inactive are ignored.
pub fn line_counts_for_checks(m: &Multiverse, l: i32, attacker: Color) -> bool {
    if m.is_active(l) {
        return true;
    }
    let (l0_min, l0_max) = m.initial_lines();
    match attacker {
        Color::White => l <= l0_max,
        Color::Black => l >= l0_min,
    }
}

fn scan_checks(
    m: &Multiverse,
    attacker: Color,
    mut visit: impl FnMut(Vec4, Vec4) -> ControlFlow<()>,
) -> ControlFlow<()> {
    let mut destinations = Vec::with_capacity(64);
    for timeline in m.timelines() {
        if timeline.end().color != attacker || !line_counts_for_checks(m, timeline.l(), attacker) {
            continue;
        }
        let Some(board) = timeline.last_board() else {
            continue;
        };
        for (x, y, _) in board.pieces_of(attacker) {
            let from = Vec4::new(x, y, board.t, timeline.l());
            destinations.clear();
            piece_destinations(m, from, attacker, &mut destinations);
            for to in &destinations {
                let hit = m
                    .piece_at(*to, attacker)
                    .is_some_and(|p| p.color != attacker && p.kind.is_royal());
                if hit {
                    visit(from, *to)?;
                }
            }
        }
    }
    ControlFlow::Continue(())
}

/// Every `(from, to)` pair where an `attacker` piece on a timeline end it
/// plays on can capture an enemy royal piece. The attacker's own inactive
/// lines are skipped.
pub fn find_checks(m: &Multiverse, attacker: Color) -> Vec<(Vec4, Vec4)> {
    let mut checks = Vec::new();
    let _ = scan_checks(m, attacker, |from, to| {
        checks.push((from, to));
        ControlFlow::Continue(())
    });
    checks
}

pub fn has_check(m: &Multiverse, attacker: Color) -> bool {
    scan_checks(m, attacker, |_, _| ControlFlow::Break(())).is_break()
}

/// Attacks on the side to move's royal pieces, as they would stand if the
/// side to move passed on every timeline it still owes a move on.
pub fn detect_checks(pos: &Position) -> Vec<(Vec4, Vec4)> {
    let player = pos.player();
    find_checks(pos.phantom_for(player).multiverse(), player.opposite())
}

/// Whether the side to move currently leaves a royal piece capturable.
pub fn is_self_in_check(pos: &Position) -> bool {
    let player = pos.player();
    has_check(pos.phantom_for(player).multiverse(), player.opposite())
}

/// Whether the side to move attacks an enemy royal piece from its current
/// boards, once the opponent's owed boards are passed.
pub fn gives_check(pos: &Position) -> bool {
    let player = pos.player();
    has_check(pos.phantom_for(player.opposite()).multiverse(), player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::board_fen::parse_board_fen;

    fn board(fen: &str) -> Board {
        parse_board_fen(fen, 4, 4, 0, 1, Color::White).expect("fen")
    }

    fn single(fen: &str) -> Multiverse {
        Multiverse::new(4, 4, vec![board(fen)]).expect("multiverse")
    }

    #[test]
    fn physical_attacks_by_each_piece_family() {
        let b = board("3k/4/4/R3");
        assert!(square_attacked_on_board(&b, 0, 3, Color::White));
        assert!(square_attacked_on_board(&b, 3, 0, Color::White));
        assert!(!square_attacked_on_board(&b, 1, 1, Color::White));

        let b = board("3k/4/2N1/4");
        assert!(square_attacked_on_board(&b, 3, 3, Color::White));

        let b = board("3k/2P1/4/4");
        assert!(square_attacked_on_board(&b, 3, 3, Color::White));
        assert!(!square_attacked_on_board(&b, 2, 3, Color::White));

        let b = board("3k/2p1/4/B3");
        assert!(!square_attacked_on_board(&b, 3, 3, Color::White));
        assert!(square_attacked_on_board(&b, 1, 1, Color::White));
    }

    #[test]
    fn black_pawns_attack_downwards() {
        let b = board("4/1p2/4/K3");
        assert!(square_attacked_on_board(&b, 0, 1, Color::Black));
        assert!(!square_attacked_on_board(&b, 0, 3, Color::Black));
        assert!(royal_attacked_on_board(&board("4/4/1p2/K3"), Color::White));
    }

    #[test]
    fn find_checks_reports_attacking_pairs() {
        let m = single("3k/4/4/R2K");
        let checks = find_checks(&m, Color::White);
        assert!(checks.is_empty());

        let m = single("k3/4/4/R2K");
        let checks = find_checks(&m, Color::White);
        assert_eq!(checks, vec![(Vec4::new(0, 0, 1, 0), Vec4::new(0, 3, 1, 0))]);
        assert!(has_check(&m, Color::White));
        assert!(!has_check(&m, Color::Black));
    }

    #[test]
    fn side_to_move_check_uses_passed_boards() {
        // White to move with a black rook facing the white king.
        let pos = Position::new(single("k2r/4/4/3K"));
        assert!(is_self_in_check(&pos));
        assert_eq!(detect_checks(&pos).len(), 1);
        assert!(!gives_check(&pos));
    }
}
