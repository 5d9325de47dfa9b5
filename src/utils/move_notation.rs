//! Move text in the multiverse dialect.
//!
//! A move is written as its source board, piece letter (pawns omitted),
//! source square, then for jumps `>` or `>>` (the latter when a new timeline
//! splits off), an optional `x`, the target board and the target square:
//!
//! ```text
//! (0T1)Nd1b2            physical
//! (0T2)Ka2>>(0T1)b2     branching jump, absolute target
//! (0T2)Ka2>>$(L=T-1)b2  same jump, target relative to the source
//! (0T1)a3a4=N           promotion
//! (-0T1)Kb1>(+0T1)b2    jump between the zero lines of an even layout
//! ```
//!
//! Parsing is lenient: every field except the target square may be left
//! out, and the text is resolved against the legal moves of the position.
//! Trailing `+`, `#` and annotation marks are ignored.

use crate::errors::{ChessError, ChessResult};
use crate::game_state::chess_move::{canonical_promotion, Action, Move, MoveKind};
use crate::game_state::coordinates::square_name;
use crate::game_state::multiverse::{LineLabel, LineParity};
use crate::game_state::piece::PieceKind;
use crate::game_state::position::Position;
use crate::move_generation::action_enumerator::has_legal_action;
use crate::move_generation::legal_move_apply::{apply_move, is_promotion};
use crate::move_generation::legal_move_checks::{gives_check, is_self_in_check};
use crate::move_generation::legal_move_generator::legal_moves;

/// Render `mv` as played from `pos`.
pub fn render_move(pos: &Position, mv: &Move, relative: bool) -> String {
    let m = pos.multiverse();
    let mut out = format!("({}T{})", m.line_label(mv.from.l), mv.from.t);
    if let Some(piece) = pos.piece_at(mv.from) {
        if piece.kind != PieceKind::Pawn {
            out.push(piece.kind.letter());
        }
    }
    out.push_str(&square_name(mv.from.x, mv.from.y));

    let capture = pos.piece_at(mv.to).is_some();
    if mv.is_physical() {
        if capture {
            out.push('x');
        }
    } else {
        out.push_str(match pos.move_kind(mv) {
            MoveKind::Branching => ">>",
            _ => ">",
        });
        if capture {
            out.push('x');
        }
        if relative {
            out.push_str(&format!(
                "$(L{}T{})",
                show_diff(mv.to.l - mv.from.l),
                show_diff(mv.to.t - mv.from.t)
            ));
        } else {
            out.push_str(&format!("({}T{})", m.line_label(mv.to.l), mv.to.t));
        }
    }
    out.push_str(&square_name(mv.to.x, mv.to.y));

    if let Some(kind) = mv.promotion {
        out.push('=');
        out.push(kind.letter());
    }
    out
}

/// Render the moves of `action`, each against the partial position it is
/// played in.
pub fn render_action(pos: &Position, action: &[Move], relative: bool) -> ChessResult<String> {
    let mut partial = pos.clone();
    let mut parts = Vec::with_capacity(action.len());
    for mv in action {
        parts.push(render_move(&partial, mv, relative));
        partial = apply_move(&partial, mv)?;
    }
    Ok(parts.join(" "))
}

/// As `render_action`, with `+` after every move that gives check. The last
/// checking move gets `#` instead when the submitted action mates.
pub fn render_action_marked(
    pos: &Position,
    action: &[Move],
    relative: bool,
) -> ChessResult<String> {
    let mut partial = pos.clone();
    let mut parts = Vec::with_capacity(action.len());
    let mut last_check = None;
    for (i, mv) in action.iter().enumerate() {
        let mut text = render_move(&partial, mv, relative);
        partial = apply_move(&partial, mv)?;
        if gives_check(&partial) {
            text.push('+');
            last_check = Some(i);
        }
        parts.push(text);
    }

    if let Some(i) = last_check {
        let mut next = partial;
        if next.submit() && is_self_in_check(&next) && !has_legal_action(&next) {
            parts[i].pop();
            parts[i].push('#');
        }
    }
    Ok(parts.join(" "))
}

/// Resolve move text against the legal moves of `pos`.
pub fn parse_move(pos: &Position, text: &str) -> ChessResult<Move> {
    let pattern = MovePattern::parse(text, pos.multiverse().parity())?;
    let candidates: Vec<Move> = legal_moves(pos)
        .into_iter()
        .filter(|mv| pattern.matches(pos, mv))
        .collect();

    let chosen = match candidates.as_slice() {
        [only] => *only,
        [] => {
            return Err(ChessError::malformed(format!(
                "no legal move matches '{text}'"
            )))
        }
        many => {
            let pawns: Vec<&Move> = many
                .iter()
                .filter(|mv| {
                    pattern.piece.is_none()
                        && pos.piece_at(mv.from).is_some_and(|p| p.kind.is_pawn_like())
                })
                .collect();
            match pawns.as_slice() {
                [only] => **only,
                _ => {
                    return Err(ChessError::malformed(format!(
                        "move '{text}' is ambiguous ({} candidates)",
                        many.len()
                    )))
                }
            }
        }
    };

    let mut mv = chosen;
    if is_promotion(pos, &mv) {
        mv.promotion = canonical_promotion(pattern.promotion);
    }
    Ok(mv)
}

/// Parse a whitespace separated action, applying each move in turn.
/// Returns the action and the partial position after its last move.
pub fn parse_action(pos: &Position, text: &str) -> ChessResult<(Action, Position)> {
    let mut partial = pos.clone();
    let mut action = Action::new();
    for token in text.split_whitespace() {
        let mv = parse_move(&partial, token)?;
        partial = apply_move(&partial, &mv)?;
        action.push(mv);
    }
    Ok((action, partial))
}

fn show_diff(d: i32) -> String {
    if d == 0 {
        "=".to_owned()
    } else {
        format!("{d:+}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Jump {
    NonBranching,
    Branching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetBoard {
    Absolute { l: i32, t: i32 },
    Relative { dl: i32, dt: i32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct MovePattern {
    board: Option<(i32, i32)>,
    piece: Option<PieceKind>,
    from: Option<(i32, i32)>,
    jump: Option<Jump>,
    target: Option<TargetBoard>,
    to: (i32, i32),
    promotion: Option<PieceKind>,
}

impl MovePattern {
    fn parse(text: &str, parity: LineParity) -> ChessResult<Self> {
        let cleaned = text.trim().trim_end_matches(['+', '#', '!', '?', '~']);
        let mut s = Scanner::new(cleaned);
        let mut pattern = MovePattern::default();

        if s.peek() == Some('(') {
            pattern.board = Some(s.board_ref(text, parity)?);
        }
        if let Some(ch) = s.peek().filter(|c| c.is_ascii_uppercase()) {
            let kind = PieceKind::from_letter(ch)
                .ok_or_else(|| ChessError::malformed(format!("unknown piece '{ch}' in '{text}'")))?;
            pattern.piece = Some(kind);
            s.bump();
        }

        let first = s.square();
        if s.eat_str(">>") {
            pattern.jump = Some(Jump::Branching);
        } else if s.eat('>') {
            pattern.jump = Some(Jump::NonBranching);
        }
        s.eat('x');
        match s.peek() {
            Some('(') => {
                let (l, t) = s.board_ref(text, parity)?;
                pattern.target = Some(TargetBoard::Absolute { l, t });
            }
            Some('$') => pattern.target = Some(s.relative_ref(text)?),
            _ => {}
        }
        let second = s.square();

        match (first, second) {
            (Some(from), Some(to)) => {
                pattern.from = Some(from);
                pattern.to = to;
            }
            (Some(to), None) | (None, Some(to)) => pattern.to = to,
            (None, None) => {
                return Err(ChessError::malformed(format!(
                    "move '{text}' has no target square"
                )))
            }
        }

        if s.eat('=') {
            let kind = s
                .bump()
                .and_then(PieceKind::from_letter)
                .filter(|k| k.is_promotion_target())
                .ok_or_else(|| ChessError::malformed(format!("bad promotion in '{text}'")))?;
            pattern.promotion = Some(kind);
        }
        if !s.is_done() {
            return Err(ChessError::malformed(format!(
                "unexpected trailing text in move '{text}'"
            )));
        }
        Ok(pattern)
    }

    fn matches(&self, pos: &Position, mv: &Move) -> bool {
        if self.board.is_some_and(|(l, t)| (mv.from.l, mv.from.t) != (l, t)) {
            return false;
        }
        if let Some(kind) = self.piece {
            if pos.piece_at(mv.from).map(|p| p.kind) != Some(kind) {
                return false;
            }
        }
        if self.from.is_some_and(|sq| sq != (mv.from.x, mv.from.y)) {
            return false;
        }
        if self.to != (mv.to.x, mv.to.y) {
            return false;
        }
        let jumps = self.jump.is_some() || self.target.is_some();
        if jumps == mv.is_physical() {
            return false;
        }
        if let Some(jump) = self.jump {
            let branching = pos.move_kind(mv) == MoveKind::Branching;
            if branching != (jump == Jump::Branching) {
                return false;
            }
        }
        match self.target {
            Some(TargetBoard::Absolute { l, t }) if (mv.to.l, mv.to.t) != (l, t) => return false,
            Some(TargetBoard::Relative { dl, dt })
                if (mv.to.l - mv.from.l, mv.to.t - mv.from.t) != (dl, dt) =>
            {
                return false
            }
            _ => {}
        }
        self.promotion.is_none() || is_promotion(pos, mv)
    }
}

struct Scanner {
    chars: Vec<char>,
    at: usize,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            at: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.at).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.at += 1;
        Some(ch)
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.at += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let n = s.chars().count();
        let matches = self.chars.len() >= self.at + n
            && self.chars[self.at..self.at + n].iter().copied().eq(s.chars());
        if matches {
            self.at += n;
        }
        matches
    }

    fn is_done(&self) -> bool {
        self.at >= self.chars.len()
    }

    /// Optional sign followed by digits.
    fn int(&mut self) -> Option<i32> {
        let start = self.at;
        let negative = if self.eat('-') {
            true
        } else {
            self.eat('+');
            false
        };
        let digits_start = self.at;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.at += 1;
        }
        if self.at == digits_start {
            self.at = start;
            return None;
        }
        let value: i32 = self.chars[digits_start..self.at]
            .iter()
            .collect::<String>()
            .parse()
            .ok()?;
        Some(if negative { -value } else { value })
    }

    /// A signed offset, `=` meaning zero.
    fn diff(&mut self) -> Option<i32> {
        if self.eat('=') {
            Some(0)
        } else {
            self.int()
        }
    }

    fn square(&mut self) -> Option<(i32, i32)> {
        let start = self.at;
        let file = self.peek().filter(|c| c.is_ascii_lowercase() && *c != 'x')?;
        self.at += 1;
        let digits_start = self.at;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.at += 1;
        }
        let rank: Option<i32> = self.chars[digits_start..self.at]
            .iter()
            .collect::<String>()
            .parse()
            .ok();
        match rank {
            Some(rank) if rank >= 1 => Some((file as i32 - 'a' as i32, rank - 1)),
            _ => {
                self.at = start;
                None
            }
        }
    }

    /// Timeline label with its sign kept, so `-0` and `+0` stay apart.
    fn line_label(&mut self) -> Option<LineLabel> {
        let start = self.at;
        if !self.eat('-') {
            self.eat('+');
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.at += 1;
        }
        let label = LineLabel::parse(&self.chars[start..self.at].iter().collect::<String>());
        if label.is_none() {
            self.at = start;
        }
        label
    }

    /// `(LTt)`
    fn board_ref(&mut self, text: &str, parity: LineParity) -> ChessResult<(i32, i32)> {
        let bad = || ChessError::malformed(format!("bad board reference in '{text}'"));
        if !self.eat('(') {
            return Err(bad());
        }
        let label = self.line_label().ok_or_else(bad)?;
        if label.is_signed_zero() && parity == LineParity::Odd && label.negative {
            return Err(ChessError::malformed(format!(
                "timeline -0 in '{text}' needs an even layout"
            )));
        }
        let l = label.index(parity);
        if !self.eat('T') {
            return Err(bad());
        }
        let t = self.int().ok_or_else(bad)?;
        if !self.eat(')') {
            return Err(bad());
        }
        Ok((l, t))
    }

    /// `$(L+dT-d)`
    fn relative_ref(&mut self, text: &str) -> ChessResult<TargetBoard> {
        let bad = || ChessError::malformed(format!("bad relative board in '{text}'"));
        if !self.eat_str("$(L") {
            return Err(bad());
        }
        let dl = self.diff().ok_or_else(bad)?;
        if !self.eat('T') {
            return Err(bad());
        }
        let dt = self.diff().ok_or_else(bad)?;
        if !self.eat(')') {
            return Err(bad());
        }
        Ok(TargetBoard::Relative { dl, dt })
    }
}
