//! Zobrist hashing support for multiverse positions.
//!
//! Board contents are hashed from fixed piece-square tables. A board's
//! contribution to a position is its content hash mixed with its timeline
//! and turn index, so identical boards at different coordinates never cancel.
//! Two independent 64-bit lanes are kept, each with its own piece-square
//! table: `key` indexes the transposition table, `verify` guards against
//! index collisions.

use std::ops::BitXorAssign;
use std::sync::OnceLock;

use crate::game_state::piece::{Color, Piece};

pub const MAX_SQUARES: usize = 64;
const PIECE_CODES: usize = 48;

#[derive(Debug)]
struct ZobristTables {
    piece_square: [[u64; MAX_SQUARES]; PIECE_CODES],
    piece_square_verify: [[u64; MAX_SQUARES]; PIECE_CODES],
    black_to_move: u64,
    lane_seed: [u64; 2],
}

static TABLES: OnceLock<ZobristTables> = OnceLock::new();

#[inline]
fn tables() -> &'static ZobristTables {
    TABLES.get_or_init(build_tables)
}

fn build_tables() -> ZobristTables {
    let mut seed: u64 = 0x5D5D_C4E5_5EED_0001;

    let mut piece_square = [[0u64; MAX_SQUARES]; PIECE_CODES];
    for code in &mut piece_square {
        for sq in code.iter_mut() {
            *sq = next_random_u64(&mut seed);
        }
    }

    let mut verify_seed: u64 = 0xA11C_E5E7_0F0F_7E57;
    let mut piece_square_verify = [[0u64; MAX_SQUARES]; PIECE_CODES];
    for code in &mut piece_square_verify {
        for sq in code.iter_mut() {
            *sq = next_random_u64(&mut verify_seed);
        }
    }

    let black_to_move = next_random_u64(&mut seed);
    let lane_seed = [next_random_u64(&mut seed), next_random_u64(&mut seed)];

    ZobristTables {
        piece_square,
        piece_square_verify,
        black_to_move,
        lane_seed,
    }
}

#[inline]
fn next_random_u64(state: &mut u64) -> u64 {
    // splitmix64
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    mix64(*state)
}

#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Pair of independent hash lanes identifying a position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub key: u64,
    pub verify: u64,
}

impl BitXorAssign for PositionKey {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Self) {
        self.key ^= rhs.key;
        self.verify ^= rhs.verify;
    }
}

/// Zobrist keys for a piece standing on a board square, one per lane.
#[inline]
pub fn piece_square_key(piece: Piece, square: usize) -> PositionKey {
    let t = tables();
    let sq = square % MAX_SQUARES;
    PositionKey {
        key: t.piece_square[piece.code()][sq],
        verify: t.piece_square_verify[piece.code()][sq],
    }
}

/// Contribution of a board with content hash `content` placed at timeline
/// `l`, turn index `v`.
#[inline]
pub fn board_placement_key(content: PositionKey, l: i32, v: i32) -> PositionKey {
    let t = tables();
    let coord = ((l as u32 as u64) << 32) | (v as u32 as u64);
    PositionKey {
        key: mix64(content.key ^ mix64(coord ^ t.lane_seed[0])),
        verify: mix64(content.verify ^ mix64(coord ^ t.lane_seed[1])),
    }
}

/// Contribution of the present bookkeeping (`present` time, player to move).
#[inline]
pub fn present_key(present: i32, player: Color) -> PositionKey {
    let t = tables();
    let side = if player == Color::Black {
        t.black_to_move
    } else {
        0
    };
    let p = present as u32 as u64;
    PositionKey {
        key: mix64(p ^ t.lane_seed[1]) ^ side,
        verify: mix64(p ^ t.lane_seed[0]) ^ side.rotate_left(17),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::piece::PieceKind;

    #[test]
    fn tables_are_deterministic_and_non_trivial() {
        let a = piece_square_key(Piece::new(PieceKind::King, Color::White), 3);
        let b = piece_square_key(Piece::new(PieceKind::King, Color::White), 3);
        let c = piece_square_key(Piece::unmoved(PieceKind::King, Color::White), 3);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a.key, 0);
    }

    #[test]
    fn verify_lane_uses_its_own_table() {
        let t = tables();
        assert_ne!(t.piece_square, t.piece_square_verify);

        // Two contents colliding on `key` are still told apart by `verify`.
        let k = piece_square_key(Piece::new(PieceKind::Rook, Color::Black), 9);
        let a = PositionKey { key: 1, verify: 2 };
        let b = PositionKey { key: 1, verify: 3 };
        assert_ne!(k.key, k.verify);
        let (pa, pb) = (board_placement_key(a, 0, 4), board_placement_key(b, 0, 4));
        assert_eq!(pa.key, pb.key);
        assert_ne!(pa.verify, pb.verify);
    }

    #[test]
    fn placement_depends_on_coordinates() {
        let content = PositionKey {
            key: 0xDEAD_BEEF,
            verify: 0xFEED_F00D,
        };
        let k1 = board_placement_key(content, 0, 2);
        let k2 = board_placement_key(content, 1, 2);
        let k3 = board_placement_key(content, 0, 3);
        assert_ne!(k1, k2);
        assert_ne!(k1, k3);
        assert_ne!(k1.key, k1.verify);
    }

    #[test]
    fn present_key_distinguishes_side() {
        assert_ne!(present_key(1, Color::White), present_key(1, Color::Black));
        assert_ne!(present_key(1, Color::White), present_key(2, Color::White));
    }
}
