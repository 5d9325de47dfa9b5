//! Four-dimensional coordinates and turn indices.
//!
//! A square in the multiverse is addressed by `(x, y, t, l)`: file, rank,
//! time and timeline. Boards inside a timeline are ordered by the turn index
//! `v = 2t + c`, where `c` is 0 for white and 1 for black.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use crate::game_state::piece::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Vec4 {
    pub x: i32,
    pub y: i32,
    pub t: i32,
    pub l: i32,
}

impl Vec4 {
    #[inline]
    pub const fn new(x: i32, y: i32, t: i32, l: i32) -> Self {
        Self { x, y, t, l }
    }

    /// Same board, different square.
    #[inline]
    pub const fn with_xy(self, x: i32, y: i32) -> Self {
        Self { x, y, ..self }
    }

    #[inline]
    pub const fn same_board(self, other: Vec4) -> bool {
        self.t == other.t && self.l == other.l
    }

    /// Number of non-zero axes, used to classify movement directions.
    #[inline]
    pub fn axis_count(self) -> usize {
        [self.x, self.y, self.t, self.l]
            .iter()
            .filter(|v| **v != 0)
            .count()
    }

    #[inline]
    pub fn axes(self) -> [i32; 4] {
        [self.x, self.y, self.t, self.l]
    }

    #[inline]
    pub const fn from_axes(a: [i32; 4]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }
}

impl Add for Vec4 {
    type Output = Vec4;

    #[inline]
    fn add(self, rhs: Vec4) -> Vec4 {
        Vec4::new(self.x + rhs.x, self.y + rhs.y, self.t + rhs.t, self.l + rhs.l)
    }
}

impl Sub for Vec4 {
    type Output = Vec4;

    #[inline]
    fn sub(self, rhs: Vec4) -> Vec4 {
        Vec4::new(self.x - rhs.x, self.y - rhs.y, self.t - rhs.t, self.l - rhs.l)
    }
}

impl Mul<i32> for Vec4 {
    type Output = Vec4;

    #[inline]
    fn mul(self, k: i32) -> Vec4 {
        Vec4::new(self.x * k, self.y * k, self.t * k, self.l * k)
    }
}

impl fmt::Display for Vec4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}T{}){}", self.l, self.t, square_name(self.x, self.y))
    }
}

/// `(t, color)`: the board on which `color` moves at time `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnIndex {
    pub t: i32,
    pub color: Color,
}

impl TurnIndex {
    #[inline]
    pub const fn new(t: i32, color: Color) -> Self {
        Self { t, color }
    }

    #[inline]
    pub const fn v(self) -> i32 {
        self.t * 2 + self.color.index() as i32
    }

    #[inline]
    pub const fn from_v(v: i32) -> Self {
        let t = v.div_euclid(2);
        let color = if v.rem_euclid(2) == 0 {
            Color::White
        } else {
            Color::Black
        };
        Self { t, color }
    }

    #[inline]
    pub const fn next(self) -> Self {
        Self::from_v(self.v() + 1)
    }

    #[inline]
    pub const fn previous(self) -> Self {
        Self::from_v(self.v() - 1)
    }
}

impl PartialOrd for TurnIndex {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TurnIndex {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.v().cmp(&other.v())
    }
}

impl fmt::Display for TurnIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self.color {
            Color::White => 'w',
            Color::Black => 'b',
        };
        write!(f, "{}{}", self.t, c)
    }
}

/// Algebraic name of a square, `a1` being `(0, 0)`.
pub fn square_name(x: i32, y: i32) -> String {
    let file = u8::try_from(x)
        .ok()
        .filter(|f| *f < 26)
        .map(|f| char::from(b'a' + f))
        .unwrap_or('?');
    format!("{file}{}", y + 1)
}
