//! Board FEN parsing and generation.
//!
//! Rows are listed from the top rank down, separated by `/`. Digits encode
//! runs of empty squares, letters are pieces (upper case white) and a `*`
//! after a letter marks a piece that has not moved yet.
//!
//! A board block in game notation wraps a board FEN with its coordinates:
//! `[r*nbqk*bnr*/.../R*NBQK*BNR*:0:1:w]`.

use crate::errors::{ChessError, ChessResult};
use crate::game_state::board::Board;
use crate::game_state::multiverse::{LineLabel, LineParity};
use crate::game_state::piece::{Color, Piece, PieceKind};

pub fn parse_board_fen(
    fen: &str,
    width: i32,
    height: i32,
    l: i32,
    t: i32,
    color: Color,
) -> ChessResult<Board> {
    let rows: Vec<&str> = fen.split('/').collect();
    if rows.len() != height as usize {
        return Err(ChessError::malformed(format!(
            "board FEN '{fen}' has {} rows, expected {height}",
            rows.len()
        )));
    }

    let mut board = Board::empty(width, height, l, t, color);
    for (row_idx, row) in rows.iter().enumerate() {
        let y = height - 1 - row_idx as i32;
        let mut x = 0i32;
        let mut chars = row.chars().peekable();

        while let Some(ch) = chars.next() {
            if let Some(d) = ch.to_digit(10) {
                // Multi-digit runs are allowed for wide boards.
                let mut run = d as i32;
                while let Some(next) = chars.peek().and_then(|c| c.to_digit(10)) {
                    run = run * 10 + next as i32;
                    chars.next();
                }
                if run == 0 {
                    return Err(ChessError::malformed(format!(
                        "zero-length empty run in board FEN row '{row}'"
                    )));
                }
                x += run;
                continue;
            }

            let kind = PieceKind::from_letter(ch).ok_or_else(|| {
                ChessError::malformed(format!("invalid piece character '{ch}' in board FEN"))
            })?;
            let piece_color = if ch.is_ascii_uppercase() {
                Color::White
            } else {
                Color::Black
            };
            let unmoved = chars.peek() == Some(&'*');
            if unmoved {
                chars.next();
            }
            if x >= width {
                return Err(ChessError::malformed(format!(
                    "board FEN row '{row}' is wider than {width}"
                )));
            }
            board.set(
                x,
                y,
                Some(Piece {
                    kind,
                    color: piece_color,
                    unmoved,
                }),
            );
            x += 1;
        }

        if x != width {
            return Err(ChessError::malformed(format!(
                "board FEN row '{row}' covers {x} files, expected {width}"
            )));
        }
    }

    Ok(board)
}

pub fn board_to_fen(board: &Board) -> String {
    let mut rows = Vec::<String>::with_capacity(board.height() as usize);
    for y in (0..board.height()).rev() {
        let mut row = String::new();
        let mut empty = 0;
        for x in 0..board.width() {
            match board.get(x, y) {
                Some(piece) => {
                    if empty > 0 {
                        row.push_str(&empty.to_string());
                        empty = 0;
                    }
                    row.push(piece.symbol());
                    if piece.unmoved {
                        row.push('*');
                    }
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            row.push_str(&empty.to_string());
        }
        rows.push(row);
    }
    rows.join("/")
}

/// Board block text `fen:l:t:c` (without brackets), with the timeline
/// written under `parity`.
pub fn board_block(board: &Board, parity: LineParity) -> String {
    let c = match board.color {
        Color::White => 'w',
        Color::Black => 'b',
    };
    format!("{}:{}:{}:{}", board_to_fen(board), parity.label(board.l), board.t, c)
}

/// Fields of a `[fen:l:t:c]` block before the timeline label is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardBlock<'a> {
    pub fen: &'a str,
    pub line: LineLabel,
    pub t: i32,
    pub color: Color,
}

impl<'a> BoardBlock<'a> {
    pub fn parse(block: &'a str) -> ChessResult<Self> {
        let mut parts = block.rsplitn(4, ':');
        let color_part = parts.next().unwrap_or_default().trim();
        let t_part = parts.next().unwrap_or_default().trim();
        let l_part = parts.next().unwrap_or_default().trim();
        let fen = parts
            .next()
            .ok_or_else(|| ChessError::malformed(format!("board block '{block}' needs fen:l:t:c")))?
            .trim();

        let color = match color_part {
            "w" | "W" => Color::White,
            "b" | "B" => Color::Black,
            other => {
                return Err(ChessError::malformed(format!(
                    "board block color must be w or b, got '{other}'"
                )))
            }
        };
        let line = LineLabel::parse(l_part).ok_or_else(|| {
            ChessError::malformed(format!("invalid timeline '{l_part}' in board block"))
        })?;
        let t = t_part
            .parse::<i32>()
            .map_err(|_| ChessError::malformed(format!("invalid time '{t_part}' in board block")))?;

        Ok(Self { fen, line, t, color })
    }

    pub fn board(&self, width: i32, height: i32, parity: LineParity) -> ChessResult<Board> {
        parse_board_fen(self.fen, width, height, self.line.index(parity), self.t, self.color)
    }
}

/// Parse the inside of a `[fen:l:t:c]` block into a board of the given size.
pub fn parse_board_block(
    block: &str,
    width: i32,
    height: i32,
    parity: LineParity,
) -> ChessResult<Board> {
    BoardBlock::parse(block)?.board(width, height, parity)
}
