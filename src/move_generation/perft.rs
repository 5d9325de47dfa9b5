//! Sequential perft: the number of action sequences of a given length.
//!
//! Every parallel strategy in `search::parallel_perft` must agree with these
//! counts.

use std::ops::ControlFlow;

use crate::game_state::chess_move::Action;
use crate::game_state::position::Position;
use crate::move_generation::action_enumerator::{count_actions, for_each_action};

/// Number of action sequences of length `depth` from `pos`.
pub fn perft(pos: &Position, depth: u8) -> u64 {
    perft_single_thread(pos, depth)
}

pub fn perft_single_thread(pos: &Position, depth: u8) -> u64 {
    match depth {
        0 => 1,
        1 => count_actions(pos),
        _ => {
            let mut total = 0u64;
            let _ = for_each_action(pos, |_, partial| {
                let mut child = partial.clone();
                if child.submit() {
                    total += perft_single_thread(&child, depth - 1);
                }
                ControlFlow::Continue(())
            });
            total
        }
    }
}

/// Per-root-action breakdown of `perft(pos, depth)`.
pub fn perft_divide(pos: &Position, depth: u8) -> Vec<(Action, u64)> {
    if depth == 0 {
        return Vec::new();
    }
    let mut rows = Vec::new();
    let _ = for_each_action(pos, |moves, partial| {
        let mut child = partial.clone();
        if child.submit() {
            rows.push((moves.to_vec(), perft_single_thread(&child, depth - 1)));
        }
        ControlFlow::Continue(())
    });
    rows
}
