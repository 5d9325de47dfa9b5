//! Terminal-oriented Unicode multiverse renderer.
//!
//! Prints every timeline as a strip of boards, oldest on the left, for
//! debugging, tests, and the `render --boards` CLI output.

use crate::game_state::board::Board;
use crate::game_state::coordinates::TurnIndex;
use crate::game_state::piece::{Color, Piece, PieceKind};
use crate::game_state::position::Position;

const GAP: &str = "   ";

/// Render the whole multiverse of `pos`, one timeline per block.
pub fn render_position(pos: &Position) -> String {
    let m = pos.multiverse();
    let mut out = format!("to move: {} at T{}\n", pos.player(), pos.present());

    for timeline in m.timelines() {
        out.push('\n');
        let marker = if m.is_active(timeline.l()) { "" } else { " (inactive)" };
        out.push_str(&format!("L{}{marker}\n", m.line_label(timeline.l())));
        let boards: Vec<&Board> = timeline.boards().map(|b| b.as_ref()).collect();
        out.push_str(&render_strip(&boards));
    }

    out
}

/// Boards side by side, each with a `TtC` caption.
pub fn render_strip(boards: &[&Board]) -> String {
    let Some(first) = boards.first() else {
        return String::new();
    };
    let width = first.width() as usize;
    let mut out = String::new();

    let captions: Vec<String> = boards
        .iter()
        .map(|b| format!("{:<w$}", TurnIndex::new(b.t, b.color).to_string(), w = width * 2 + 1))
        .collect();
    out.push_str(captions.join(GAP).trim_end());
    out.push('\n');

    for y in (0..first.height()).rev() {
        let rows: Vec<String> = boards.iter().map(|b| render_row(b, y)).collect();
        out.push_str(&rows.join(GAP));
        out.push('\n');
    }

    out
}

/// A single board; rank labels on both sides, `a1` bottom left.
pub fn render_board(board: &Board) -> String {
    let files: String = (0..board.width())
        .map(|x| char::from(b'a' + x as u8).to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let mut out = format!("  {files}\n");

    for y in (0..board.height()).rev() {
        out.push_str(&format!("{} {} {}\n", y + 1, render_row(board, y), y + 1));
    }

    out.push_str(&format!("  {files}"));
    out
}

fn render_row(board: &Board, y: i32) -> String {
    (0..board.width())
        .map(|x| board.get(x, y).map_or('·', piece_to_unicode).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn piece_to_unicode(piece: Piece) -> char {
    match (piece.color, piece.kind) {
        (Color::White, PieceKind::Pawn) => '♙',
        (Color::White, PieceKind::Knight) => '♘',
        (Color::White, PieceKind::Bishop) => '♗',
        (Color::White, PieceKind::Rook) => '♖',
        (Color::White, PieceKind::Queen) => '♕',
        (Color::White, PieceKind::King) => '♔',
        (Color::Black, PieceKind::Pawn) => '♟',
        (Color::Black, PieceKind::Knight) => '♞',
        (Color::Black, PieceKind::Bishop) => '♝',
        (Color::Black, PieceKind::Rook) => '♜',
        (Color::Black, PieceKind::Queen) => '♛',
        (Color::Black, PieceKind::King) => '♚',
        // No glyphs for the fairy pieces.
        _ => piece.symbol(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::variants::builtin_position;

    #[test]
    fn renders_single_board_with_labels() {
        let pos = builtin_position("Very Small - Open").expect("variant");
        let board = pos.multiverse().board(0, 1, Color::White).expect("board");
        let text = render_board(board);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "  a b c d");
        assert_eq!(lines[1], "4 ♞ ♝ ♜ ♚ 4");
        assert_eq!(lines[4], "1 ♔ ♖ ♗ ♘ 1");
    }

    #[test]
    fn position_lists_each_timeline() {
        let pos = builtin_position("Standard - Turn Zero").expect("variant");
        let text = render_position(&pos);
        assert!(text.starts_with("to move: white at T1"));
        assert!(text.contains("L0\n"));
        assert!(text.contains("0b"));
        assert!(text.contains("1w"));
    }

    #[test]
    fn even_layout_shows_signed_zero_lines() {
        let pos = builtin_position("Very Small - Two Timelines").expect("variant");
        let text = render_position(&pos);
        assert!(text.contains("L-0\n"));
        assert!(text.contains("L+0\n"));
    }

    #[test]
    fn fairy_pieces_fall_back_to_letters() {
        assert_eq!(piece_to_unicode(Piece::new(PieceKind::Unicorn, Color::Black)), 'u');
        assert_eq!(piece_to_unicode(Piece::new(PieceKind::Brawn, Color::White)), 'W');
    }
}
