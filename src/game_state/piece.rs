//! Piece model: colors, kinds, and the per-piece unmoved flag.

use std::fmt;

/// Side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank direction a pawn of this color advances in.
    #[inline]
    pub const fn forward_y(self) -> i32 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Timeline direction a pawn of this color advances in.
    #[inline]
    pub const fn forward_l(self) -> i32 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PieceKind {
    King,
    CommonKing,
    Queen,
    RoyalQueen,
    Princess,
    Rook,
    Bishop,
    Knight,
    Unicorn,
    Dragon,
    Pawn,
    Brawn,
}

impl PieceKind {
    pub const ALL: [PieceKind; 12] = [
        PieceKind::King,
        PieceKind::CommonKing,
        PieceKind::Queen,
        PieceKind::RoyalQueen,
        PieceKind::Princess,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
        PieceKind::Unicorn,
        PieceKind::Dragon,
        PieceKind::Pawn,
        PieceKind::Brawn,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Losing every royal piece (or having one captured) loses the game.
    #[inline]
    pub const fn is_royal(self) -> bool {
        matches!(self, PieceKind::King | PieceKind::RoyalQueen)
    }

    #[inline]
    pub const fn is_pawn_like(self) -> bool {
        matches!(self, PieceKind::Pawn | PieceKind::Brawn)
    }

    /// Upper-case notation letter.
    pub const fn letter(self) -> char {
        match self {
            PieceKind::King => 'K',
            PieceKind::CommonKing => 'C',
            PieceKind::Queen => 'Q',
            PieceKind::RoyalQueen => 'Y',
            PieceKind::Princess => 'S',
            PieceKind::Rook => 'R',
            PieceKind::Bishop => 'B',
            PieceKind::Knight => 'N',
            PieceKind::Unicorn => 'U',
            PieceKind::Dragon => 'D',
            PieceKind::Pawn => 'P',
            PieceKind::Brawn => 'W',
        }
    }

    pub fn from_letter(ch: char) -> Option<Self> {
        let kind = match ch.to_ascii_uppercase() {
            'K' => PieceKind::King,
            'C' => PieceKind::CommonKing,
            'Q' => PieceKind::Queen,
            'Y' => PieceKind::RoyalQueen,
            'S' => PieceKind::Princess,
            'R' => PieceKind::Rook,
            'B' => PieceKind::Bishop,
            'N' => PieceKind::Knight,
            'U' => PieceKind::Unicorn,
            'D' => PieceKind::Dragon,
            'P' => PieceKind::Pawn,
            'W' => PieceKind::Brawn,
            _ => return None,
        };
        Some(kind)
    }

    /// Kinds a pawn or brawn may promote to.
    pub const fn is_promotion_target(self) -> bool {
        !matches!(
            self,
            PieceKind::King | PieceKind::RoyalQueen | PieceKind::Pawn | PieceKind::Brawn
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
    pub unmoved: bool,
}

impl Piece {
    #[inline]
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Self {
            kind,
            color,
            unmoved: false,
        }
    }

    #[inline]
    pub const fn unmoved(kind: PieceKind, color: Color) -> Self {
        Self {
            kind,
            color,
            unmoved: true,
        }
    }

    #[inline]
    pub const fn moved(self) -> Self {
        Self {
            unmoved: false,
            ..self
        }
    }

    /// Notation letter, upper case for white.
    pub fn symbol(self) -> char {
        match self.color {
            Color::White => self.kind.letter(),
            Color::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }

    /// Dense code in `0..48` used for hashing.
    #[inline]
    pub const fn code(self) -> usize {
        (self.kind.index() * 2 + self.color.index()) * 2 + self.unmoved as usize
    }
}
