//! Built-in starting setups, selectable by the `Board` header.

use crate::errors::{ChessError, ChessResult};
use crate::game_state::multiverse::{LineParity, Multiverse};
use crate::game_state::piece::Color;
use crate::game_state::position::Position;
use crate::utils::board_fen::parse_board_fen;

pub const STANDARD_FEN: &str = "r*nbqk*bnr*/p*p*p*p*p*p*p*p*/8/8/8/8/P*P*P*P*P*P*P*P*/R*NBQK*BNR*";
pub const VERY_SMALL_OPEN_FEN: &str = "nbrk/3p*/P*3/KRBN";

#[derive(Debug, Clone, Copy)]
pub struct Variant {
    pub name: &'static str,
    pub width: i32,
    pub height: i32,
    pub parity: LineParity,
    /// `(fen, l, t, color)` of every starting board; `l` is the internal
    /// index, so `-1` is line `-0` in an even layout.
    pub boards: &'static [(&'static str, i32, i32, Color)],
}

pub const VARIANTS: &[Variant] = &[
    Variant {
        name: "Standard",
        width: 8,
        height: 8,
        parity: LineParity::Odd,
        boards: &[(STANDARD_FEN, 0, 1, Color::White)],
    },
    Variant {
        name: "Standard - Turn Zero",
        width: 8,
        height: 8,
        parity: LineParity::Odd,
        boards: &[
            (STANDARD_FEN, 0, 0, Color::Black),
            (STANDARD_FEN, 0, 1, Color::White),
        ],
    },
    Variant {
        name: "Very Small - Open",
        width: 4,
        height: 4,
        parity: LineParity::Odd,
        boards: &[(VERY_SMALL_OPEN_FEN, 0, 1, Color::White)],
    },
    Variant {
        name: "Standard - Two Timelines",
        width: 8,
        height: 8,
        parity: LineParity::Even,
        boards: &[
            (STANDARD_FEN, -1, 1, Color::White),
            (STANDARD_FEN, 0, 1, Color::White),
        ],
    },
    Variant {
        name: "Very Small - Two Timelines",
        width: 4,
        height: 4,
        parity: LineParity::Even,
        boards: &[
            (VERY_SMALL_OPEN_FEN, -1, 1, Color::White),
            (VERY_SMALL_OPEN_FEN, 0, 1, Color::White),
        ],
    },
];

pub fn find_variant(name: &str) -> Option<&'static Variant> {
    VARIANTS.iter().find(|v| v.name == name)
}

impl Variant {
    pub fn multiverse(&self) -> ChessResult<Multiverse> {
        let boards = self
            .boards
            .iter()
            .map(|(fen, l, t, c)| parse_board_fen(fen, self.width, self.height, *l, *t, *c))
            .collect::<ChessResult<Vec<_>>>()?;
        Multiverse::with_parity(self.width, self.height, boards, self.parity)
    }

    pub fn position(&self) -> ChessResult<Position> {
        Ok(Position::new(self.multiverse()?))
    }
}

/// Starting position of a built-in variant by name.
pub fn builtin_position(name: &str) -> ChessResult<Position> {
    find_variant(name)
        .ok_or_else(|| ChessError::malformed(format!("unknown variant: {name}")))?
        .position()
}
