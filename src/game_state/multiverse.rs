//! The arena of timelines.
//!
//! Timelines are stored contiguously and addressed by their signed index
//! `l`; `timelines[0]` holds `l_min`. White creates timelines above the
//! current maximum, black below the current minimum. Each timeline sits
//! behind an `Arc` so cloning a multiverse for a child position only bumps
//! reference counts; a timeline is copied on first write.
//!
//! Even layouts have two zero lines written `-0` and `+0`. Internally a
//! negative label `-n` is stored as `!n`, so `-1, -0, +0, +1` map to
//! `-2, -1, 0, 1` and the arena stays contiguous. Move generation and the
//! active-range balance only ever see internal indices.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{ChessError, ChessResult};
use crate::game_state::board::{Board, MAX_BOARD_LENGTH};
use crate::game_state::coordinates::{TurnIndex, Vec4};
use crate::game_state::piece::{Color, Piece};
use crate::game_state::timeline::Timeline;
use crate::search::zobrist::PositionKey;

/// How timelines are numbered in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineParity {
    #[default]
    Odd,
    Even,
}

impl LineParity {
    /// Text form of the internal index `l`.
    pub fn label(self, l: i32) -> String {
        match self {
            LineParity::Odd => l.to_string(),
            LineParity::Even if l < 0 => format!("-{}", !l),
            LineParity::Even => format!("+{l}"),
        }
    }
}

/// A timeline label as written in game text: `3`, `-1`, `+0`, `-0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineLabel {
    pub negative: bool,
    /// An explicit `+` or `-` was written.
    pub signed: bool,
    pub magnitude: i32,
}

impl LineLabel {
    pub fn parse(text: &str) -> Option<Self> {
        let (negative, signed, digits) = if let Some(rest) = text.strip_prefix('-') {
            (true, true, rest)
        } else if let Some(rest) = text.strip_prefix('+') {
            (false, true, rest)
        } else {
            (false, false, text)
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            negative,
            signed,
            magnitude: digits.parse().ok()?,
        })
    }

    /// `-0` or `+0`; only even layouts have these.
    #[inline]
    pub fn is_signed_zero(self) -> bool {
        self.signed && self.magnitude == 0
    }

    /// Internal timeline index under `parity`.
    #[inline]
    pub fn index(self, parity: LineParity) -> i32 {
        match (parity, self.negative) {
            (_, false) => self.magnitude,
            (LineParity::Odd, true) => -self.magnitude,
            (LineParity::Even, true) => !self.magnitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multiverse {
    width: i32,
    height: i32,
    parity: LineParity,
    initial_lines: (i32, i32),
    l_min: i32,
    timelines: Vec<Arc<Timeline>>,
}

impl Multiverse {
    /// Build an odd-numbered multiverse from tagged starting boards.
    ///
    /// Boards sharing a timeline index must cover consecutive turn indices,
    /// and the timeline indices must form a contiguous range.
    pub fn new(width: i32, height: i32, boards: Vec<Board>) -> ChessResult<Self> {
        Self::with_parity(width, height, boards, LineParity::Odd)
    }

    /// As `new`, with board tags holding internal indices under `parity`.
    pub fn with_parity(
        width: i32,
        height: i32,
        boards: Vec<Board>,
        parity: LineParity,
    ) -> ChessResult<Self> {
        if !(1..=MAX_BOARD_LENGTH).contains(&width) || !(1..=MAX_BOARD_LENGTH).contains(&height) {
            return Err(ChessError::malformed(format!(
                "board size {width}x{height} out of range \
                 (max {MAX_BOARD_LENGTH}x{MAX_BOARD_LENGTH})"
            )));
        }
        if boards.is_empty() {
            return Err(ChessError::malformed("no starting boards given"));
        }

        let mut by_line = BTreeMap::<i32, Vec<Board>>::new();
        for board in boards {
            if board.width() != width || board.height() != height {
                return Err(ChessError::malformed(format!(
                    "board on timeline {} is {}x{}, expected {width}x{height}",
                    board.l,
                    board.width(),
                    board.height()
                )));
            }
            by_line.entry(board.l).or_default().push(board);
        }

        let mut timelines = Vec::with_capacity(by_line.len());
        let mut expected_l: Option<i32> = None;
        for (l, mut line_boards) in by_line {
            if let Some(expected) = expected_l {
                if l != expected {
                    return Err(ChessError::malformed(format!(
                        "timeline {} is missing between starting timelines",
                        parity.label(expected)
                    )));
                }
            }
            expected_l = Some(l + 1);

            line_boards.sort_by_key(|b| TurnIndex::new(b.t, b.color).v());
            let mut iter = line_boards.into_iter();
            let Some(first) = iter.next() else {
                continue;
            };
            let start = TurnIndex::new(first.t, first.color);
            let mut timeline = Timeline::new(l, start, first);
            for board in iter {
                let expected = timeline.end().next();
                if TurnIndex::new(board.t, board.color) != expected {
                    return Err(ChessError::malformed(format!(
                        "timeline {} has a gap or duplicate before {}{}",
                        parity.label(l),
                        board.t,
                        if board.color == Color::White { 'w' } else { 'b' }
                    )));
                }
                timeline.push_board(board);
            }
            timelines.push(Arc::new(timeline));
        }

        let l_min = timelines.first().map(|t| t.l()).unwrap_or(0);
        let l_max = timelines.last().map(|t| t.l()).unwrap_or(0);
        Ok(Self {
            width,
            height,
            parity,
            initial_lines: (l_min, l_max),
            l_min,
            timelines,
        })
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn parity(&self) -> LineParity {
        self.parity
    }

    /// Text label of timeline `l`.
    #[inline]
    pub fn line_label(&self, l: i32) -> String {
        self.parity.label(l)
    }

    #[inline]
    pub fn initial_lines(&self) -> (i32, i32) {
        self.initial_lines
    }

    /// `(l_min, l_max)` over all existing timelines.
    #[inline]
    pub fn l_range(&self) -> (i32, i32) {
        (self.l_min, self.l_min + self.timelines.len() as i32 - 1)
    }

    pub fn timeline(&self, l: i32) -> Option<&Timeline> {
        let idx = usize::try_from(l - self.l_min).ok()?;
        self.timelines.get(idx).map(|t| t.as_ref())
    }

    /// Mutable access; clones the timeline if it is shared.
    pub fn timeline_mut(&mut self, l: i32) -> Option<&mut Timeline> {
        let idx = usize::try_from(l - self.l_min).ok()?;
        self.timelines.get_mut(idx).map(Arc::make_mut)
    }

    pub fn timelines(&self) -> impl Iterator<Item = &Timeline> {
        self.timelines.iter().map(|t| t.as_ref())
    }

    pub fn timeline_count(&self) -> usize {
        self.timelines.len()
    }

    pub fn board(&self, l: i32, t: i32, color: Color) -> Option<&Arc<Board>> {
        self.timeline(l)?.board(t, color)
    }

    /// Piece at `p` on the board of `color`.
    pub fn piece_at(&self, p: Vec4, color: Color) -> Option<Piece> {
        self.board(p.l, p.t, color)?.get(p.x, p.y)
    }

    /// True when the board of `color` at `p` exists and `p` is on it.
    pub fn in_bounds(&self, p: Vec4, color: Color) -> bool {
        self.board(p.l, p.t, color)
            .is_some_and(|b| b.in_bounds(p.x, p.y))
    }

    pub fn timeline_end(&self, l: i32) -> Option<TurnIndex> {
        self.timeline(l).map(|t| t.end())
    }

    /// Inclusive range of active timelines.
    pub fn active_range(&self) -> (i32, i32) {
        let (l0_min, l0_max) = self.initial_lines;
        let (l_min, l_max) = self.l_range();
        let whites_lines = l_max - l0_max;
        let blacks_lines = l0_min - l_min;
        (
            l0_min - blacks_lines.min(whites_lines + 1),
            l0_max + whites_lines.min(blacks_lines + 1),
        )
    }

    pub fn is_active(&self, l: i32) -> bool {
        let (lo, hi) = self.active_range();
        (lo..=hi).contains(&l)
    }

    /// Earliest end board among active timelines.
    pub fn present(&self) -> TurnIndex {
        let (lo, hi) = self.active_range();
        (lo..=hi)
            .filter_map(|l| self.timeline_end(l))
            .min()
            .unwrap_or(TurnIndex::new(0, Color::White))
    }

    /// Index the next timeline created by `player` receives.
    pub fn new_line(&self, player: Color) -> i32 {
        let (l_min, l_max) = self.l_range();
        match player {
            Color::White => l_max + 1,
            Color::Black => l_min - 1,
        }
    }

    /// Create the timeline `new_line(player)` starting with `board` at `start`.
    pub fn add_timeline(&mut self, player: Color, start: TurnIndex, board: Board) -> i32 {
        let l = self.new_line(player);
        let timeline = Arc::new(Timeline::new(l, start, board));
        match player {
            Color::White => self.timelines.push(timeline),
            Color::Black => {
                self.timelines.insert(0, timeline);
                self.l_min = l;
            }
        }
        l
    }

    /// Combined key of every board at its coordinates.
    pub fn key(&self) -> PositionKey {
        let mut key = PositionKey::default();
        for t in &self.timelines {
            key ^= t.key();
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::piece::PieceKind;

    fn kings(l: i32, t: i32, color: Color) -> Board {
        let mut b = Board::empty(4, 4, l, t, color);
        b.set(0, 0, Some(Piece::unmoved(PieceKind::King, Color::White)));
        b.set(3, 3, Some(Piece::unmoved(PieceKind::King, Color::Black)));
        b
    }

    #[test]
    fn builds_from_tagged_boards() {
        let m = Multiverse::new(
            4,
            4,
            vec![kings(0, 1, Color::White), kings(0, 0, Color::Black)],
        )
        .expect("multiverse");
        assert_eq!(m.l_range(), (0, 0));
        let tl = m.timeline(0).expect("timeline 0");
        assert_eq!(tl.start(), TurnIndex::new(0, Color::Black));
        assert_eq!(tl.end(), TurnIndex::new(1, Color::White));
        assert_eq!(m.present(), TurnIndex::new(1, Color::White));
    }

    #[test]
    fn rejects_gaps_and_bad_sizes() {
        assert!(Multiverse::new(9, 4, vec![kings(0, 1, Color::White)]).is_err());
        assert!(Multiverse::new(4, 4, vec![]).is_err());
        assert!(Multiverse::new(
            4,
            4,
            vec![kings(0, 1, Color::White), kings(0, 3, Color::White)]
        )
        .is_err());
        assert!(Multiverse::new(
            4,
            4,
            vec![kings(0, 1, Color::White), kings(2, 1, Color::White)]
        )
        .is_err());
    }

    #[test]
    fn active_range_follows_branch_balance() {
        let mut m = Multiverse::new(4, 4, vec![kings(0, 1, Color::White)]).expect("multiverse");
        assert_eq!(m.active_range(), (0, 0));

        // White branches twice; only the first extra white line is active
        // while black has none.
        let at_1b = TurnIndex::new(1, Color::Black);
        let l1 = m.add_timeline(Color::White, at_1b, kings(0, 1, Color::Black));
        let l2 = m.add_timeline(Color::White, at_1b, kings(0, 1, Color::Black));
        assert_eq!((l1, l2), (1, 2));
        assert_eq!(m.active_range(), (0, 1));
        assert!(!m.is_active(2));

        let at_1w = TurnIndex::new(1, Color::White);
        let l3 = m.add_timeline(Color::Black, at_1w, kings(0, 1, Color::White));
        assert_eq!(l3, -1);
        assert_eq!(m.l_range(), (-1, 2));
        assert_eq!(m.active_range(), (-1, 2));
        assert_eq!(m.timeline(-1).map(|t| t.l()), Some(-1));
    }

    #[test]
    fn key_changes_with_content_and_clone_is_cheap() {
        let m = Multiverse::new(4, 4, vec![kings(0, 1, Color::White)]).expect("multiverse");
        let mut n = m.clone();
        assert_eq!(m.key(), n.key());
        n.timeline_mut(0).expect("line 0").push_copy_of_last();
        assert_ne!(m.key(), n.key());
        assert_eq!(m.timeline(0).map(|t| t.len()), Some(1));
    }

    #[test]
    fn even_layout_labels_and_balance() {
        let m = Multiverse::with_parity(
            4,
            4,
            vec![kings(-1, 1, Color::White), kings(0, 1, Color::White)],
            LineParity::Even,
        )
        .expect("multiverse");
        assert_eq!(m.initial_lines(), (-1, 0));
        assert_eq!((m.line_label(-1), m.line_label(0)), ("-0".to_owned(), "+0".to_owned()));
        assert_eq!(m.active_range(), (-1, 0));

        let mut m = m;
        let at_1b = TurnIndex::new(1, Color::Black);
        assert_eq!(m.add_timeline(Color::White, at_1b, kings(0, 1, Color::Black)), 1);
        assert_eq!(m.add_timeline(Color::White, at_1b, kings(0, 1, Color::Black)), 2);
        assert_eq!(m.line_label(2), "+2");
        assert_eq!(m.active_range(), (-1, 1));

        let at_1w = TurnIndex::new(1, Color::White);
        assert_eq!(m.add_timeline(Color::Black, at_1w, kings(0, 1, Color::White)), -2);
        assert_eq!(m.line_label(-2), "-1");
        assert_eq!(m.active_range(), (-2, 2));
    }

    #[test]
    fn line_labels_map_to_internal_indices() {
        let parse = |s: &str| LineLabel::parse(s).expect("label");
        assert!(parse("+0").is_signed_zero());
        assert!(parse("-0").is_signed_zero());
        assert!(!parse("0").is_signed_zero());
        assert_eq!(parse("-0").index(LineParity::Even), -1);
        assert_eq!(parse("+0").index(LineParity::Even), 0);
        assert_eq!(parse("-2").index(LineParity::Even), -3);
        assert_eq!(parse("-2").index(LineParity::Odd), -2);
        assert_eq!(parse("-0").index(LineParity::Odd), 0);
        assert_eq!(parse("3").index(LineParity::Even), 3);
        assert!(LineLabel::parse("+").is_none());
        assert!(LineLabel::parse("1a").is_none());
        for l in -4..4 {
            let label = LineParity::Even.label(l);
            assert_eq!(parse(&label).index(LineParity::Even), l);
        }
    }
}
