//! The `Game` facade: history tree, in-progress turn and the search surface.
//!
//! A host owns one `Game`. Every query about moves answers for the partial
//! position of the turn being built; perft and action counts run from the
//! submitted position at the history cursor.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::time::Duration;

use log::debug;

use crate::errors::ChessResult;
use crate::game::history::{History, HistoryNode};
use crate::game::turn_builder::TurnBuilder;
use crate::game_state::chess_move::Action;
use crate::game_state::coordinates::Vec4;
use crate::game_state::piece::{Color, PieceKind};
use crate::game_state::position::Position;
use crate::game_state::variants::builtin_position;
use crate::move_generation::action_enumerator::{count_actions, for_each_action, has_legal_action};
use crate::move_generation::legal_move_checks::{detect_checks, is_self_in_check};
use crate::move_generation::legal_move_generator::{
    classify_timelines, movable_critical, movable_pieces, moves_from, TimelineStatus,
};
use crate::move_generation::perft::perft;
use crate::search::parallel_perft::{perft_dynamic, perft_parallel, perft_timed, perft_with_tt};
use crate::utils::move_notation::render_action;
use crate::utils::pgn::{read_pgn, write_pgn, RenderFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Playing,
    WhiteWins,
    BlackWins,
    Stalemate,
}

#[derive(Debug, Clone)]
pub struct Game {
    headers: BTreeMap<String, String>,
    history: History,
    turn: TurnBuilder,
}

impl Game {
    /// Fresh game on a built-in variant.
    pub fn new(variant: &str) -> ChessResult<Self> {
        let root = builtin_position(variant)?;
        let mut headers = BTreeMap::new();
        headers.insert("Board".to_owned(), variant.to_owned());
        headers.insert("Mode".to_owned(), "5D".to_owned());
        Ok(Self::with_history(headers, History::new(root)))
    }

    /// Load a game; the cursor rests on the last node read.
    pub fn from_pgn(text: &str) -> ChessResult<Self> {
        let parsed = read_pgn(text)?;
        let mut history = parsed.history;
        history.set_cursor(parsed.last_node);
        Ok(Self::with_history(parsed.headers, history))
    }

    fn with_history(headers: BTreeMap<String, String>, history: History) -> Self {
        let turn = TurnBuilder::new(history.current().position.clone());
        Self {
            headers,
            history,
            turn,
        }
    }

    #[inline]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[inline]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Submitted position at the history cursor.
    #[inline]
    pub fn node_position(&self) -> &Position {
        &self.history.current().position
    }

    /// Partial position of the turn being built.
    #[inline]
    pub fn position(&self) -> &Position {
        self.turn.position()
    }

    /// Moves staged so far in the current turn.
    pub fn staged_moves(&self) -> Action {
        self.turn.moves()
    }

    pub fn apply_move(&mut self, from: Vec4, to: Vec4) -> bool {
        self.try_apply_move(from, to, None).is_some()
    }

    pub fn apply_move_with_promotion(
        &mut self,
        from: Vec4,
        to: Vec4,
        promotion: PieceKind,
    ) -> bool {
        self.try_apply_move(from, to, Some(promotion)).is_some()
    }

    /// `None` when the move is illegal, otherwise whether it gives check.
    pub fn try_apply_move(
        &mut self,
        from: Vec4,
        to: Vec4,
        promotion: Option<PieceKind>,
    ) -> Option<bool> {
        self.turn.apply_move(from, to, promotion)
    }

    pub fn undo_move(&mut self) -> bool {
        self.turn.undo_move()
    }

    pub fn redo_move(&mut self) -> bool {
        self.turn.redo_move()
    }

    pub fn can_undo_move(&self) -> bool {
        self.turn.can_undo()
    }

    pub fn can_redo_move(&self) -> bool {
        self.turn.can_redo()
    }

    pub fn can_submit(&self) -> bool {
        self.turn.can_submit()
    }

    /// Record the staged turn as a child of the cursor and move onto it.
    pub fn submit(&mut self) -> bool {
        let Some((action, position)) = self.turn.finish() else {
            return false;
        };
        let parent = self.history.cursor();
        let child = self.history.add_child(parent, action, position);
        self.history.set_cursor(child);
        self.reset_turn();
        debug!("submitted turn as node {child}");
        true
    }

    /// Stage a legal action from the cursor node, preferring one that is not
    /// already recorded as a child. False when there is none.
    pub fn suggest_action(&mut self) -> bool {
        let base = self.node_position().clone();
        let recorded: Vec<&Action> = self
            .history
            .children(self.history.cursor())
            .iter()
            .filter_map(|c| self.history.node(*c))
            .map(|n| &n.action)
            .collect();

        let mut first = None;
        let mut fresh = None;
        let _ = for_each_action(&base, |moves, _| {
            if first.is_none() {
                first = Some(moves.to_vec());
            }
            if recorded.iter().any(|a| a.as_slice() == moves) {
                ControlFlow::Continue(())
            } else {
                fresh = Some(moves.to_vec());
                ControlFlow::Break(())
            }
        });
        let Some(action) = fresh.or(first) else {
            return false;
        };

        self.turn.reset(base);
        for mv in &action {
            if self.turn.apply_move(mv.from, mv.to, mv.promotion).is_none() {
                self.reset_turn();
                return false;
            }
        }
        true
    }

    pub fn visit_parent(&mut self) -> bool {
        self.navigate(History::visit_parent)
    }

    pub fn visit_child(&mut self, index: usize) -> bool {
        self.navigate(|h| h.visit_child(index))
    }

    pub fn undo(&mut self) -> bool {
        self.navigate(History::undo)
    }

    pub fn redo(&mut self) -> bool {
        self.navigate(History::redo)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn navigate(&mut self, step: impl FnOnce(&mut History) -> bool) -> bool {
        let moved = step(&mut self.history);
        if moved {
            self.reset_turn();
        }
        moved
    }

    fn reset_turn(&mut self) {
        self.turn.reset(self.history.current().position.clone());
    }

    pub fn moves_from(&self, from: Vec4) -> Vec<Vec4> {
        moves_from(self.position(), from)
    }

    pub fn movable_pieces(&self) -> Vec<Vec4> {
        movable_pieces(self.position())
    }

    pub fn movable_critical(&self) -> Vec<Vec4> {
        movable_critical(self.position())
    }

    pub fn timeline_status(&self) -> TimelineStatus {
        classify_timelines(self.position())
    }

    /// `(attacker, royal)` pairs threatening the side to move.
    pub fn detect_checks(&self) -> Vec<(Vec4, Vec4)> {
        detect_checks(self.position())
    }

    pub fn currently_check(&self) -> bool {
        is_self_in_check(self.position())
    }

    pub fn match_status(&self) -> MatchStatus {
        let pos = self.node_position();
        if has_legal_action(pos) {
            return MatchStatus::Playing;
        }
        if !is_self_in_check(pos) {
            return MatchStatus::Stalemate;
        }
        match pos.player() {
            Color::White => MatchStatus::BlackWins,
            Color::Black => MatchStatus::WhiteWins,
        }
    }

    pub fn comments(&self) -> &[String] {
        &self.history.current().comments
    }

    pub fn set_comments(&mut self, comments: Vec<String>) {
        self.history.current_mut().comments = comments;
    }

    /// Rendered action of each child of the cursor node.
    pub fn child_moves(&self) -> Vec<String> {
        let parent = self.node_position();
        self.history
            .children(self.history.cursor())
            .iter()
            .filter_map(|c| self.history.node(*c))
            .filter_map(|n: &HistoryNode| render_action(parent, &n.action, false).ok())
            .collect()
    }

    pub fn render(&self, flags: RenderFlags) -> ChessResult<String> {
        write_pgn(&self.headers, &self.history, flags)
    }

    pub fn count_actions(&self) -> u64 {
        count_actions(self.node_position())
    }

    pub fn perft(&self, depth: u8) -> u64 {
        perft(self.node_position(), depth)
    }

    pub fn perft_parallel(&self, depth: u8, threads: usize) -> ChessResult<u64> {
        perft_parallel(self.node_position(), depth, threads)
    }

    pub fn perft_dynamic(&self, depth: u8, threads: usize, split_depth: u8) -> ChessResult<u64> {
        perft_dynamic(self.node_position(), depth, threads, split_depth)
    }

    pub fn perft_with_tt(&self, depth: u8, threads: usize, tt_mb: usize) -> ChessResult<u64> {
        perft_with_tt(self.node_position(), depth, threads, tt_mb)
    }

    pub fn perft_timed(
        &self,
        depth: u8,
        timeout: Duration,
        threads: usize,
    ) -> ChessResult<(u64, bool)> {
        perft_timed(self.node_position(), depth, timeout, threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ChessError;
    use crate::move_generation::action_enumerator::legal_actions;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const KINGS_PGN: &str =
        "[Board \"Custom\"]\n[Size \"4x4\"]\n[3k/4/4/K3:0:1:w]\n\n1. Ka2 / Kd3\n";

    fn small() -> Game {
        Game::new("Very Small - Open").expect("variant")
    }

    const PAWN: Vec4 = Vec4::new(0, 1, 1, 0);
    const PAWN_TO: Vec4 = Vec4::new(0, 2, 1, 0);

    #[test]
    fn illegal_apply_returns_false_and_changes_nothing() {
        let mut game = small();
        let before = game.position().clone();
        assert!(!game.apply_move(PAWN, Vec4::new(0, 3, 1, 0)));
        assert!(!game.apply_move(Vec4::new(3, 3, 1, 0), Vec4::new(3, 2, 1, 0)));
        assert_eq!(game.position(), &before);
        assert!(game.staged_moves().is_empty());
    }

    #[test]
    fn submit_without_complete_turn_changes_nothing() {
        let mut game = small();
        assert!(!game.submit());
        assert_eq!(game.history().len(), 1);
        assert_eq!(game.history().cursor(), History::ROOT);
    }

    #[test]
    fn submit_then_undo_redo_are_inverse() {
        let mut game = small();
        let root = game.node_position().clone();
        assert!(game.apply_move(PAWN, PAWN_TO));
        assert!(game.can_submit());
        assert!(game.submit());
        let after = game.node_position().clone();
        assert_eq!(after.player(), Color::Black);

        assert!(game.undo());
        assert_eq!(game.node_position(), &root);
        assert_eq!(game.position(), &root);
        assert!(game.redo());
        assert_eq!(game.node_position(), &after);
        assert!(!game.redo());
        assert_eq!(game.child_moves().len(), 0);
    }

    #[test]
    fn resubmitting_same_action_reuses_node() {
        let mut game = small();
        assert!(game.apply_move(PAWN, PAWN_TO));
        assert!(game.submit());
        assert!(game.visit_parent());
        assert!(game.apply_move(PAWN, PAWN_TO));
        assert!(game.submit());
        assert_eq!(game.history().len(), 2);
        assert!(game.visit_parent());
        assert_eq!(game.child_moves(), vec!["(0T1)a2a3".to_owned()]);
    }

    #[test]
    fn suggest_action_prefers_new_variation() {
        let mut game = small();
        assert!(game.suggest_action());
        assert!(game.can_submit());
        assert!(game.submit());
        assert!(game.visit_parent());
        assert!(game.suggest_action());
        assert!(game.submit());
        assert!(game.visit_parent());
        assert_eq!(game.history().children(History::ROOT).len(), 2);
    }

    #[test]
    fn branching_jump_adds_one_line_and_keeps_history() {
        let mut game = Game::from_pgn(KINGS_PGN).expect("pgn");
        assert_eq!(game.history().len(), 3);
        let before = game.node_position().clone();
        let old_board = before
            .multiverse()
            .board(0, 1, Color::White)
            .expect("1w board")
            .clone();

        assert!(game.apply_move(Vec4::new(0, 1, 2, 0), Vec4::new(1, 1, 1, 0)));
        let m = game.position().multiverse();
        assert_eq!(m.timeline_count(), 2);
        assert_eq!(m.l_range(), (0, 1));
        assert_eq!(m.board(0, 1, Color::White), Some(&old_board));
        assert_eq!(m.timeline(1).expect("new line").len(), 1);
        // Both lines now end on black boards: nothing left for white.
        let status = game.timeline_status();
        assert!(status.mandatory.is_empty());
        assert_eq!(status.unplayable, vec![0, 1]);
        assert!(game.can_submit());

        assert!(game.undo_move());
        assert_eq!(game.position(), &before);
    }

    #[test]
    fn render_round_trips_through_from_pgn() {
        let mut game = small();
        game.set_comments(vec!["start".to_owned()]);
        assert!(game.apply_move(PAWN, PAWN_TO));
        assert!(game.submit());
        assert!(game.suggest_action());
        assert!(game.submit());
        assert!(game.undo());
        assert!(game.undo());
        assert!(game.suggest_action());
        assert!(game.submit());

        let text = game.render(RenderFlags::ALL).expect("render");
        let reloaded = Game::from_pgn(&text).expect("reload");
        assert!(game
            .history()
            .same_subtree(History::ROOT, reloaded.history(), History::ROOT));
    }

    #[test]
    fn malformed_pgn_builds_nothing() {
        assert!(matches!(
            Game::from_pgn("[Board \"Very Small - Open\"]\n\n1. Qh8\n"),
            Err(ChessError::MalformedInput(_))
        ));
    }

    #[test]
    fn match_status_reports_mate() {
        let mate = "[Board \"Custom\"]\n[Size \"4x4\"]\n[3k/4/PP2/K2r:0:1:w]\n";
        let game = Game::from_pgn(mate).expect("pgn");
        assert_eq!(game.match_status(), MatchStatus::BlackWins);
        assert!(game.currently_check());
        assert!(!game.detect_checks().is_empty());
        assert_eq!(small().match_status(), MatchStatus::Playing);
    }

    #[test]
    fn match_status_reports_white_win_and_stalemate() {
        // Black to move, boxed in by its own pawns against a rook on the back rank.
        let white_mates = "[Board \"Custom\"]\n[Size \"4x4\"]\n[k2R/pp2/4/3K:0:1:b]\n";
        let game = Game::from_pgn(white_mates).expect("pgn");
        assert_eq!(game.node_position().player(), Color::Black);
        assert!(game.currently_check());
        assert_eq!(game.match_status(), MatchStatus::WhiteWins);

        // White king in the corner, every flight square covered, no check.
        let stalemate = "[Board \"Custom\"]\n[Size \"4x4\"]\n[4/2k1/1r2/K3:0:1:w]\n";
        let game = Game::from_pgn(stalemate).expect("pgn");
        assert!(!game.currently_check());
        assert!(game.detect_checks().is_empty());
        assert_eq!(game.count_actions(), 0);
        assert_eq!(game.match_status(), MatchStatus::Stalemate);
    }

    #[test]
    fn explicit_queen_promotion_reuses_child() {
        let pgn = "[Board \"Custom\"]\n[Size \"4x4\"]\n[3k/P3/4/K3:0:1:w]\n";
        let mut game = Game::from_pgn(pgn).expect("pgn");
        let (from, to) = (Vec4::new(0, 2, 1, 0), Vec4::new(0, 3, 1, 0));

        assert!(game.apply_move_with_promotion(from, to, PieceKind::Queen));
        assert!(game.submit());
        let queened = game.node_position().clone();
        assert!(game.visit_parent());

        assert!(game.apply_move(from, to));
        assert!(game.submit());
        assert_eq!(game.node_position(), &queened);
        assert!(game.visit_parent());
        assert_eq!(game.history().children(History::ROOT).len(), 1);

        assert!(game.apply_move_with_promotion(from, to, PieceKind::Knight));
        assert!(game.submit());
        assert!(game.visit_parent());
        assert_eq!(game.history().children(History::ROOT).len(), 2);
    }

    #[test]
    fn search_surface_agrees() {
        let game = small();
        let expected = game.perft(2);
        assert_eq!(game.count_actions(), game.perft(1));
        assert_eq!(game.perft_parallel(2, 2).expect("parallel"), expected);
        assert_eq!(game.perft_dynamic(2, 2, 1).expect("dynamic"), expected);
        assert_eq!(game.perft_with_tt(2, 2, 1).expect("tt"), expected);
        assert_eq!(
            game.perft_timed(2, Duration::from_secs(600), 2).expect("timed"),
            (expected, true)
        );
    }

    #[test]
    fn seeded_random_playout_undoes_cleanly() {
        let mut rng = StdRng::seed_from_u64(0x5D);
        let mut game = small();
        let mut visited = vec![game.node_position().clone()];

        for _ in 0..6 {
            let actions = legal_actions(game.node_position());
            if actions.is_empty() {
                break;
            }
            let action = &actions[rng.random_range(0..actions.len())];
            for mv in action {
                assert!(game.try_apply_move(mv.from, mv.to, mv.promotion).is_some());
            }
            assert!(game.can_submit());
            assert!(game.submit());
            visited.push(game.node_position().clone());
        }

        for expected in visited.iter().rev().skip(1) {
            assert!(game.undo());
            assert_eq!(game.node_position(), expected);
        }
        assert!(!game.undo());
        while game.redo() {}
        assert_eq!(Some(game.node_position()), visited.last());
    }
}
