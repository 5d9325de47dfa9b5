//! Crate root module declarations for the multiverse chess engine.
//!
//! Exposes the multiverse state model, the legality engine, the parallel
//! perft search, the game facade and the notation helpers so the CLI, the
//! benches and embedding hosts can import stable module paths.

pub mod errors;

pub mod game_state {
    pub mod board;
    pub mod chess_move;
    pub mod coordinates;
    pub mod multiverse;
    pub mod piece;
    pub mod position;
    pub mod timeline;
    pub mod variants;
}

pub mod move_generation {
    pub mod action_enumerator;
    pub mod legal_move_apply;
    pub mod legal_move_checks;
    pub mod legal_move_generator;
    pub mod perft;
    pub mod piece_moves;
}

pub mod search {
    pub mod parallel_perft;
    pub mod threading;
    pub mod transposition_table;
    pub mod work_queue;
    pub mod zobrist;
}

pub mod game {
    pub mod game;
    pub mod history;
    pub mod turn_builder;
}

pub mod utils {
    pub mod board_fen;
    pub mod move_notation;
    pub mod pgn;
    pub mod render_game_state;
}

pub use errors::{ChessError, ChessResult};
pub use game::game::{Game, MatchStatus};
pub use utils::pgn::RenderFlags;
