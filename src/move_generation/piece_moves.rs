//! Pseudo-legal destinations for every piece kind.
//!
//! Movement happens in four dimensions. A direction is a vector over
//! `(x, y, t, l)` with entries in `{-1, 0, 1}`; a step along `t` moves one
//! full turn, so every destination lies on a board of the mover's color.
//! Destinations on missing boards or off the board edge do not exist and
//! stop a slide.

use std::sync::OnceLock;

use crate::game_state::coordinates::Vec4;
use crate::game_state::multiverse::Multiverse;
use crate::game_state::piece::{Color, Piece, PieceKind};
use crate::move_generation::legal_move_checks::square_attacked_on_board;

struct DirectionTables {
    /// Unit directions grouped by number of non-zero axes (index 1..=4).
    by_axes: [Vec<Vec4>; 5],
    knight: Vec<Vec4>,
}

static DIRECTIONS: OnceLock<DirectionTables> = OnceLock::new();

fn directions() -> &'static DirectionTables {
    DIRECTIONS.get_or_init(build_directions)
}

fn build_directions() -> DirectionTables {
    let mut by_axes: [Vec<Vec4>; 5] = Default::default();
    for x in -1..=1 {
        for y in -1..=1 {
            for t in -1..=1 {
                for l in -1..=1 {
                    let d = Vec4::new(x, y, t, l);
                    let n = d.axis_count();
                    if n > 0 {
                        by_axes[n].push(d);
                    }
                }
            }
        }
    }

    let mut knight = Vec::with_capacity(48);
    for long_axis in 0..4 {
        for short_axis in 0..4 {
            if long_axis == short_axis {
                continue;
            }
            for long in [-2, 2] {
                for short in [-1, 1] {
                    let mut a = [0; 4];
                    a[long_axis] = long;
                    a[short_axis] = short;
                    knight.push(Vec4::from_axes(a));
                }
            }
        }
    }

    DirectionTables { by_axes, knight }
}

/// Directions a piece slides (or steps, for kings) along.
fn line_directions(kind: PieceKind) -> impl Iterator<Item = &'static Vec4> {
    let tables = directions();
    let axes: &'static [usize] = match kind {
        PieceKind::Rook => &[1],
        PieceKind::Bishop => &[2],
        PieceKind::Unicorn => &[3],
        PieceKind::Dragon => &[4],
        PieceKind::Princess => &[1, 2],
        PieceKind::Queen | PieceKind::RoyalQueen | PieceKind::King | PieceKind::CommonKing => {
            &[1, 2, 3, 4]
        }
        PieceKind::Knight | PieceKind::Pawn | PieceKind::Brawn => &[],
    };
    axes.iter().flat_map(move |n| tables.by_axes[*n].iter())
}

#[inline]
fn is_slider(kind: PieceKind) -> bool {
    !matches!(
        kind,
        PieceKind::King
            | PieceKind::CommonKing
            | PieceKind::Knight
            | PieceKind::Pawn
            | PieceKind::Brawn
    )
}

/// What stands at `q` from the point of view of `color`, or `None` when the
/// square does not exist.
#[inline]
fn probe(m: &Multiverse, q: Vec4, color: Color) -> Option<Option<Piece>> {
    let board = m.board(q.l, q.t, color)?;
    if !board.in_bounds(q.x, q.y) {
        return None;
    }
    Some(board.get(q.x, q.y))
}

/// Append every pseudo-legal destination of the `color` piece at `p`.
///
/// `p` addresses the board of `color` at `(p.l, p.t)`. Nothing is appended
/// when the square is empty or holds an enemy piece.
pub fn piece_destinations(m: &Multiverse, p: Vec4, color: Color, out: &mut Vec<Vec4>) {
    let Some(Some(piece)) = probe(m, p, color) else {
        return;
    };
    if piece.color != color {
        return;
    }

    match piece.kind {
        PieceKind::Pawn | PieceKind::Brawn => pawn_destinations(m, p, piece, out),
        PieceKind::Knight => {
            for d in &directions().knight {
                push_if_enterable(m, p + *d, color, out);
            }
        }
        kind if is_slider(kind) => {
            for d in line_directions(kind) {
                let mut q = p + *d;
                while let Some(content) = probe(m, q, color) {
                    match content {
                        None => out.push(q),
                        Some(other) => {
                            if other.color != color {
                                out.push(q);
                            }
                            break;
                        }
                    }
                    q = q + *d;
                }
            }
        }
        kind => {
            for d in line_directions(kind) {
                push_if_enterable(m, p + *d, color, out);
            }
            if kind == PieceKind::King && piece.unmoved {
                castling_destinations(m, p, color, out);
            }
        }
    }
}

/// Collect destinations into a fresh vector.
pub fn destinations_of(m: &Multiverse, p: Vec4, color: Color) -> Vec<Vec4> {
    let mut out = Vec::with_capacity(32);
    piece_destinations(m, p, color, &mut out);
    out
}

#[inline]
fn push_if_enterable(m: &Multiverse, q: Vec4, color: Color, out: &mut Vec<Vec4>) {
    match probe(m, q, color) {
        Some(None) => out.push(q),
        Some(Some(other)) if other.color != color => out.push(q),
        _ => {}
    }
}

#[inline]
fn push_if_empty(m: &Multiverse, q: Vec4, color: Color, out: &mut Vec<Vec4>) -> bool {
    if probe(m, q, color) == Some(None) {
        out.push(q);
        true
    } else {
        false
    }
}

#[inline]
fn push_if_hostile(m: &Multiverse, q: Vec4, color: Color, out: &mut Vec<Vec4>) {
    if let Some(Some(other)) = probe(m, q, color) {
        if other.color != color {
            out.push(q);
        }
    }
}

fn pawn_destinations(m: &Multiverse, p: Vec4, piece: Piece, out: &mut Vec<Vec4>) {
    let color = piece.color;
    let fy = color.forward_y();
    let fl = color.forward_l();

    // Physical advance.
    let one = p + Vec4::new(0, fy, 0, 0);
    if push_if_empty(m, one, color, out) && piece.unmoved {
        push_if_empty(m, one + Vec4::new(0, fy, 0, 0), color, out);
    }

    // Physical captures and en passant.
    for dx in [-1, 1] {
        push_if_hostile(m, p + Vec4::new(dx, fy, 0, 0), color, out);
        if let Some(q) = en_passant_target(m, p, dx, color) {
            out.push(q);
        }
    }

    // Advance across timelines.
    let across = p + Vec4::new(0, 0, 0, fl);
    if push_if_empty(m, across, color, out) && piece.unmoved {
        push_if_empty(m, across + Vec4::new(0, 0, 0, fl), color, out);
    }

    // Captures across timelines.
    for dt in [-1, 1] {
        push_if_hostile(m, p + Vec4::new(0, 0, dt, fl), color, out);
    }

    if piece.kind == PieceKind::Brawn {
        for dx in [-1, 1] {
            push_if_hostile(m, p + Vec4::new(dx, 0, 0, fl), color, out);
        }
        for dt in [-1, 1] {
            push_if_hostile(m, p + Vec4::new(0, fy, dt, 0), color, out);
        }
        push_if_hostile(m, p + Vec4::new(0, fy, 0, fl), color, out);
    }
}

/// Square diagonally ahead of `p` if an enemy pawn beside it just made a
/// double step (it stood unmoved two ranks further on the previous board).
fn en_passant_target(m: &Multiverse, p: Vec4, dx: i32, color: Color) -> Option<Vec4> {
    let fy = color.forward_y();
    let board = m.board(p.l, p.t, color)?;
    let victim = board.get(p.x + dx, p.y)?;
    if victim.color == color || !victim.kind.is_pawn_like() {
        return None;
    }
    let dest = (p.x + dx, p.y + fy);
    let origin = (p.x + dx, p.y + 2 * fy);
    if !board.in_bounds(dest.0, dest.1) || !board.in_bounds(origin.0, origin.1) {
        return None;
    }
    if board.get(dest.0, dest.1).is_some() || board.get(origin.0, origin.1).is_some() {
        return None;
    }
    let previous = m.board(p.l, p.t - 1, color)?;
    let before = previous.get(origin.0, origin.1)?;
    if before.color != color && before.kind.is_pawn_like() && before.unmoved {
        Some(p.with_xy(dest.0, dest.1))
    } else {
        None
    }
}

fn castling_destinations(m: &Multiverse, p: Vec4, color: Color, out: &mut Vec<Vec4>) {
    let Some(board) = m.board(p.l, p.t, color) else {
        return;
    };
    let enemy = color.opposite();
    if square_attacked_on_board(board, p.x, p.y, enemy) {
        return;
    }

    for dir in [-1, 1] {
        let rook_x = if dir < 0 { 0 } else { board.width() - 1 };
        let dest_x = p.x + 2 * dir;
        // The king must stop short of the rook.
        if (rook_x - dest_x) * dir <= 0 {
            continue;
        }
        let Some(rook) = board.get(rook_x, p.y) else {
            continue;
        };
        if rook.kind != PieceKind::Rook || rook.color != color || !rook.unmoved {
            continue;
        }
        let path_clear = between(p.x, rook_x).all(|x| board.get(x, p.y).is_none());
        if !path_clear {
            continue;
        }
        let safe = [p.x + dir, dest_x]
            .iter()
            .all(|x| !square_attacked_on_board(board, *x, p.y, enemy));
        if safe {
            out.push(p.with_xy(dest_x, p.y));
        }
    }
}

/// Files strictly between `a` and `b`.
fn between(a: i32, b: i32) -> impl Iterator<Item = i32> {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    (lo + 1)..hi
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::coordinates::TurnIndex;
    use crate::utils::board_fen::parse_board_fen;

    fn single(fen: &str, size: i32) -> Multiverse {
        let board = parse_board_fen(fen, size, size, 0, 1, Color::White).expect("fen");
        Multiverse::new(size, size, vec![board]).expect("multiverse")
    }

    #[test]
    fn direction_table_sizes() {
        let t = directions();
        assert_eq!(t.by_axes[1].len(), 8);
        assert_eq!(t.by_axes[2].len(), 24);
        assert_eq!(t.by_axes[3].len(), 32);
        assert_eq!(t.by_axes[4].len(), 16);
        assert_eq!(t.knight.len(), 48);
    }

    #[test]
    fn rook_on_single_board_moves_physically_only() {
        let m = single("4/4/4/R3", 4);
        let d = destinations_of(&m, Vec4::new(0, 0, 1, 0), Color::White);
        assert_eq!(d.len(), 6);
        assert!(d.iter().all(|q| q.t == 1 && q.l == 0));
    }

    #[test]
    fn enemy_and_empty_squares_yield_nothing() {
        let m = single("4/4/4/r3", 4);
        assert!(destinations_of(&m, Vec4::new(0, 0, 1, 0), Color::White).is_empty());
        assert!(destinations_of(&m, Vec4::new(2, 2, 1, 0), Color::White).is_empty());
        assert!(destinations_of(&m, Vec4::new(9, 9, 1, 0), Color::White).is_empty());
    }

    #[test]
    fn knight_reaches_previous_board_of_same_color() {
        let base = parse_board_fen("4/4/4/N3", 4, 4, 0, 1, Color::White).expect("fen");
        let mut m = Multiverse::new(4, 4, vec![base]).expect("multiverse");
        let line = m.timeline_mut(0).expect("line");
        line.push_copy_of_last();
        line.push_copy_of_last();
        assert_eq!(line.end(), TurnIndex::new(2, Color::White));

        let d = destinations_of(&m, Vec4::new(0, 0, 2, 0), Color::White);
        assert!(d.contains(&Vec4::new(1, 2, 2, 0)));
        assert!(d.contains(&Vec4::new(2, 1, 2, 0)));
        assert!(d.contains(&Vec4::new(2, 0, 1, 0)));
        assert!(d.contains(&Vec4::new(0, 2, 1, 0)));
        assert_eq!(d.len(), 4);
    }

    #[test]
    fn white_pawn_advances_and_captures() {
        let m = single("4/1n2/P*3/4", 4);
        let d = destinations_of(&m, Vec4::new(0, 1, 1, 0), Color::White);
        assert!(d.contains(&Vec4::new(0, 2, 1, 0)));
        assert!(d.contains(&Vec4::new(0, 3, 1, 0)));
        assert!(d.contains(&Vec4::new(1, 2, 1, 0)));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn castling_requires_clear_unattacked_path() {
        let m = single("4k3/8/8/8/8/8/8/R*3K*2R*", 8);
        let d = destinations_of(&m, Vec4::new(4, 0, 1, 0), Color::White);
        assert!(d.contains(&Vec4::new(6, 0, 1, 0)));
        assert!(d.contains(&Vec4::new(2, 0, 1, 0)));

        // A rook on the f-file guards the king's crossing square.
        let guarded = single("4kr2/8/8/8/8/8/8/R*3K*2R*", 8);
        let d = destinations_of(&guarded, Vec4::new(4, 0, 1, 0), Color::White);
        assert!(!d.contains(&Vec4::new(6, 0, 1, 0)));
        assert!(d.contains(&Vec4::new(2, 0, 1, 0)));

        let moved_rook = single("4k3/8/8/8/8/8/8/R*3K*2R", 8);
        let d = destinations_of(&moved_rook, Vec4::new(4, 0, 1, 0), Color::White);
        assert!(!d.contains(&Vec4::new(6, 0, 1, 0)));
    }

    #[test]
    fn board_lookup_for_missing_board_is_none() {
        let m = single("4/4/4/K3", 4);
        assert!(probe(&m, Vec4::new(0, 0, 0, 0), Color::White).is_none());
        assert!(probe(&m, Vec4::new(0, 0, 1, 1), Color::White).is_none());
        assert_eq!(probe(&m, Vec4::new(1, 1, 1, 0), Color::White), Some(None));
    }
}
