//! PGN read/write for multiverse game trees.
//!
//! Headers are `[Key "Value"]` lines. Starting boards come from the `Board`
//! header (a built-in variant) or from explicit board blocks
//! `[fen:l:t:w|b]` sized by the `Size "WxH"` header. Movetext holds turn
//! labels (`1w.`, `1b.`, `1.`, `/`), actions, `{comments}` and
//! parenthesised variations. A variation branches from the node written just
//! before it and is listed ahead of the main continuation.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::errors::{ChessError, ChessResult};
use crate::game::history::{History, NodeId};
use crate::game_state::multiverse::{LineParity, Multiverse};
use crate::game_state::piece::Color;
use crate::game_state::position::Position;
use crate::game_state::variants::{builtin_position, find_variant};
use crate::move_generation::action_enumerator::is_complete_turn;
use crate::utils::board_fen::{board_block, BoardBlock};
use crate::utils::move_notation::{parse_action, render_action, render_action_marked};

/// Output options for `write_pgn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderFlags {
    /// Write every variation, not just the main line.
    pub all_variations: bool,
    /// Write jump targets as `$(L..T..)` offsets from the source board.
    pub relative_targets: bool,
    /// Suffix checking moves with `+`, or `#` when the action mates.
    pub check_marks: bool,
}

impl RenderFlags {
    pub const ALL: RenderFlags = RenderFlags {
        all_variations: true,
        relative_targets: false,
        check_marks: false,
    };
}

#[derive(Debug, Clone)]
pub struct PgnGame {
    pub headers: BTreeMap<String, String>,
    pub history: History,
    /// Last node created while reading, in text order.
    pub last_node: NodeId,
}

pub fn read_pgn(pgn: &str) -> ChessResult<PgnGame> {
    let mut headers = BTreeMap::<String, String>::new();
    let mut blocks = Vec::<String>::new();
    let mut movetext_lines = Vec::<&str>::new();

    for line in pgn.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            let inner = &trimmed[1..trimmed.len() - 1];
            if inner.contains('"') {
                let (k, v) = parse_header_line(trimmed)?;
                headers.insert(k, v);
            } else {
                blocks.push(inner.trim().to_owned());
            }
        } else {
            movetext_lines.push(trimmed);
        }
    }

    let root = initial_position(&headers, &blocks)?;
    debug!(
        "PGN start position: {} timelines, {}x{}",
        root.multiverse().timeline_count(),
        root.board_size().0,
        root.board_size().1
    );

    let tokens = tokenize(&movetext_lines.join("\n"))?;
    let mut reader = TreeReader::new(root);
    for token in tokens {
        reader.feed(token)?;
    }
    let (history, last_node) = reader.finish()?;
    info!("loaded PGN with {} nodes", history.len());

    Ok(PgnGame {
        headers,
        history,
        last_node,
    })
}

/// Starting position from headers and board blocks. Explicit blocks win
/// over a named variant. Blocks use even numbering when the `Board` header
/// says `Custom - Even` (or `Even`), or when any block sits on `-0`/`+0`.
pub fn initial_position(
    headers: &BTreeMap<String, String>,
    blocks: &[String],
) -> ChessResult<Position> {
    let board_name = headers.get("Board").map(String::as_str);
    if blocks.is_empty() {
        return builtin_position(board_name.unwrap_or("Standard"));
    }
    let parsed = blocks
        .iter()
        .map(|b| BoardBlock::parse(b))
        .collect::<ChessResult<Vec<_>>>()?;
    let parity = match board_name {
        Some("Custom - Even" | "Even") => LineParity::Even,
        Some("Custom - Odd" | "Odd") => LineParity::Odd,
        _ if parsed.iter().any(|b| b.line.is_signed_zero()) => LineParity::Even,
        _ => LineParity::Odd,
    };

    let (width, height) = match headers.get("Size") {
        Some(size) => parse_size(size)?,
        None => board_name
            .and_then(find_variant)
            .map_or((8, 8), |v| (v.width, v.height)),
    };
    let boards = parsed
        .iter()
        .map(|b| b.board(width, height, parity))
        .collect::<ChessResult<Vec<_>>>()?;
    Ok(Position::new(Multiverse::with_parity(width, height, boards, parity)?))
}

pub fn write_pgn(
    headers: &BTreeMap<String, String>,
    history: &History,
    flags: RenderFlags,
) -> ChessResult<String> {
    let root = history
        .node(History::ROOT)
        .ok_or_else(|| ChessError::NavigationBounds("history has no root".to_owned()))?;
    let builtin = headers
        .get("Board")
        .and_then(|name| find_variant(name))
        .and_then(|v| v.position().ok());
    let needs_blocks = builtin.as_ref() != Some(&root.position);

    let parity = root.position.multiverse().parity();
    let mut headers = headers.clone();
    if needs_blocks {
        let (w, h) = root.position.board_size();
        if parity == LineParity::Even {
            headers.insert("Board".to_owned(), "Custom - Even".to_owned());
        } else {
            headers
                .entry("Board".to_owned())
                .or_insert_with(|| "Custom".to_owned());
        }
        headers.insert("Size".to_owned(), format!("{w}x{h}"));
    }

    let mut out = String::new();
    for (key, value) in &headers {
        out.push_str(&format!("[{} \"{}\"]\n", key, escape_pgn_value(value)));
    }
    if needs_blocks {
        for timeline in root.position.multiverse().timelines() {
            for board in timeline.boards() {
                out.push_str(&format!("[{}]\n", board_block(board, parity)));
            }
        }
    }
    out.push('\n');

    if !root.comments.is_empty() {
        out.push_str(&show_comments(&root.comments));
        out.push('\n');
    }
    write_children(history, History::ROOT, flags, &mut out)?;
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push('\n');

    Ok(out)
}

fn write_children(
    history: &History,
    id: NodeId,
    flags: RenderFlags,
    out: &mut String,
) -> ChessResult<()> {
    let Some((main, rest)) = history.children(id).split_last() else {
        return Ok(());
    };
    if flags.all_variations {
        for child in rest {
            out.push('(');
            write_node(history, *child, true, flags, out)?;
            let trimmed_len = out.trim_end().len();
            out.truncate(trimmed_len);
            out.push_str(")\n");
        }
    }
    write_node(history, *main, flags.all_variations && !rest.is_empty(), flags, out)
}

fn write_node(
    history: &History,
    id: NodeId,
    full_label: bool,
    flags: RenderFlags,
    out: &mut String,
) -> ChessResult<()> {
    let node = history
        .node(id)
        .ok_or_else(|| ChessError::NavigationBounds(format!("node {id} missing")))?;
    let parent = node
        .parent
        .and_then(|p| history.node(p))
        .ok_or_else(|| ChessError::NavigationBounds(format!("node {id} has no parent")))?;

    let turn = parent.position.turn();
    if full_label {
        out.push_str(&format!("{turn}. "));
    } else if turn.color == Color::Black {
        out.push_str("/ ");
    } else {
        out.push_str(&format!("{}. ", turn.t));
    }
    let action = if flags.check_marks {
        render_action_marked(&parent.position, &node.action, flags.relative_targets)?
    } else {
        render_action(&parent.position, &node.action, flags.relative_targets)?
    };
    out.push_str(&action);
    out.push(' ');
    if !node.comments.is_empty() {
        out.push_str(&show_comments(&node.comments));
        out.push(' ');
    }
    if turn.color == Color::Black && !node.children.is_empty() {
        out.push('\n');
    }
    write_children(history, id, flags, out)
}

fn show_comments(comments: &[String]) -> String {
    comments
        .iter()
        .map(|c| format!("{{{}}}", c.replace(['{', '}'], "")))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    TurnLabel,
    Move(String),
    Comment(String),
    Open,
    Close,
}

fn tokenize(text: &str) -> ChessResult<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '{' => {
                let start = i + 1;
                let mut depth = 0usize;
                let mut end = None;
                for (j, ch) in chars.iter().enumerate().skip(i) {
                    match *ch {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(j);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let end = end.ok_or_else(|| ChessError::malformed("unterminated comment"))?;
                let body: String = chars[start..end].iter().collect();
                tokens.push(Token::Comment(body.trim().to_owned()));
                i = end + 1;
            }
            '(' if !starts_board_ref(&chars[i..]) => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '/' => {
                tokens.push(Token::TurnLabel);
                i += 1;
            }
            _ => {
                let start = i;
                let mut depth = 0usize;
                while i < chars.len() {
                    let c = chars[i];
                    if c.is_whitespace() || c == '{' {
                        break;
                    }
                    if c == '(' {
                        depth += 1;
                    } else if c == ')' {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                    }
                    i += 1;
                    if c == '.' && is_turn_label(&chars[start..i].iter().collect::<String>()) {
                        break;
                    }
                }
                let word: String = chars[start..i].iter().collect();
                if is_result_token(&word) {
                    continue;
                }
                if is_turn_label(&word) {
                    tokens.push(Token::TurnLabel);
                } else if word.starts_with(|c: char| c.is_ascii_digit()) {
                    return Err(ChessError::malformed(format!("unexpected token '{word}'")));
                } else {
                    tokens.push(Token::Move(word));
                }
            }
        }
    }

    Ok(tokens)
}

/// Builds the history tree from movetext tokens.
struct TreeReader {
    history: History,
    current: NodeId,
    variations: Vec<NodeId>,
    pending: Vec<String>,
    last_node: NodeId,
}

impl TreeReader {
    fn new(root: Position) -> Self {
        Self {
            history: History::new(root),
            current: History::ROOT,
            variations: Vec::new(),
            pending: Vec::new(),
            last_node: History::ROOT,
        }
    }

    fn feed(&mut self, token: Token) -> ChessResult<()> {
        match token {
            Token::Move(text) => self.pending.push(text),
            Token::TurnLabel => self.flush()?,
            Token::Comment(text) => {
                self.flush()?;
                if let Some(node) = self.history.node_mut(self.current) {
                    node.comments.push(text);
                }
            }
            Token::Open => {
                self.flush()?;
                self.variations.push(self.current);
            }
            Token::Close => {
                self.flush()?;
                self.current = self
                    .variations
                    .pop()
                    .ok_or_else(|| ChessError::malformed("unbalanced ')' in movetext"))?;
            }
        }
        Ok(())
    }

    /// Turn the pending move texts into one submitted action.
    fn flush(&mut self) -> ChessResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let text = self.pending.join(" ");
        self.pending.clear();

        let base = self
            .history
            .node(self.current)
            .map(|n| n.position.clone())
            .ok_or_else(|| ChessError::malformed("movetext refers to a missing node"))?;
        let (action, mut partial) = parse_action(&base, &text)?;
        if !is_complete_turn(&partial) || !partial.submit() {
            return Err(ChessError::malformed(format!(
                "action '{text}' does not complete the turn"
            )));
        }
        self.current = self.history.add_child(self.current, action, partial);
        self.last_node = self.current;
        Ok(())
    }

    fn finish(mut self) -> ChessResult<(History, NodeId)> {
        self.flush()?;
        if !self.variations.is_empty() {
            return Err(ChessError::malformed("unclosed variation in movetext"));
        }
        Ok((self.history, self.last_node))
    }
}

fn parse_header_line(line: &str) -> ChessResult<(String, String)> {
    if !line.starts_with('[') || !line.ends_with(']') {
        return Err(ChessError::malformed(format!("invalid PGN header line: {line}")));
    }
    let inner = &line[1..line.len() - 1];
    let mut parts = inner.splitn(2, ' ');
    let key = parts
        .next()
        .ok_or_else(|| ChessError::malformed(format!("invalid PGN header key: {line}")))?
        .trim();
    let value_raw = parts
        .next()
        .ok_or_else(|| ChessError::malformed(format!("invalid PGN header value: {line}")))?
        .trim();

    if !value_raw.starts_with('"') || !value_raw.ends_with('"') || value_raw.len() < 2 {
        return Err(ChessError::malformed(format!(
            "invalid quoted PGN header value: {line}"
        )));
    }
    let value = value_raw[1..value_raw.len() - 1].replace("\\\"", "\"");
    Ok((key.to_owned(), value))
}

fn parse_size(size: &str) -> ChessResult<(i32, i32)> {
    let bad = || ChessError::malformed(format!("invalid Size header '{size}'"));
    let (w, h) = size.split_once('x').ok_or_else(bad)?;
    let w = w.trim().parse::<i32>().map_err(|_| bad())?;
    let h = h.trim().parse::<i32>().map_err(|_| bad())?;
    Ok((w, h))
}

/// `(` followed by a signed timeline number and `T`.
fn starts_board_ref(chars: &[char]) -> bool {
    let mut rest = chars.iter().copied().skip(1).peekable();
    if matches!(rest.peek(), Some('+' | '-')) {
        rest.next();
    }
    let mut digits = 0;
    while rest.peek().is_some_and(|c| c.is_ascii_digit()) {
        rest.next();
        digits += 1;
    }
    digits > 0 && rest.next() == Some('T')
}

fn is_turn_label(token: &str) -> bool {
    let Some(head) = token.strip_suffix('.') else {
        return false;
    };
    let digits = head.trim_end_matches(['w', 'b']);
    head.len() - digits.len() <= 1
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_result_token(token: &str) -> bool {
    matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*")
}

fn escape_pgn_value(value: &str) -> String {
    value.replace('"', "\\\"")
}
