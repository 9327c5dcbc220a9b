//! Lossless lexer.
//!
//! Turns raw text into an ordered token sequence whose texts concatenate back to
//! the input. It never fails: anything it does not recognise becomes a `Text`
//! token (a word, or a single markup character). Line-level constructs are
//! recognised with `nom` at the start of each line; the rest of the line is
//! split into spaces, markup punctuation, timestamps, link delimiters and words.

use crate::config::ParserConfig;
use crate::core::{
    BlockType, CheckState, Diagnostic, FileKeyword, OrderedMarker, PlanningKeyword, Timestamp,
    UnorderedMarker,
};
use crate::timestamp;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, line_ending, one_of, satisfy, space0},
    combinator::{eof, map, peek, recognize, value, verify},
    error::VerboseError,
    multi::{many1_count, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
};
use serde::Serialize;
use std::ops::Range;

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Characters that always lex as single-character `Text` tokens.
const MARKUP_CHARS: &str = "*/_+=~[]<>#:()@$\\|";

/* ------------------------------- Tokens ------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte range in the source.
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    StartOfInput,
    EndOfInput,
    LineBreak,
    /// A single space or tab.
    Space,
    HeadingStars {
        level: usize,
    },
    TodoKeyword {
        done: bool,
    },
    Priority {
        value: char,
    },
    /// Marker text includes the indentation.
    UnorderedListMarker {
        indent: usize,
        style: UnorderedMarker,
    },
    OrderedListMarker {
        indent: usize,
        style: OrderedMarker,
    },
    CheckBox {
        state: CheckState,
    },
    BlockStart {
        block: BlockType,
    },
    BlockEnd {
        block: BlockType,
    },
    DrawerStart,
    DrawerEnd,
    PropertyKey {
        key: String,
    },
    /// Rest of a property line after the key and spaces.
    PropertyValue,
    FileKeyword {
        keyword: FileKeyword,
    },
    TagString {
        tags: Vec<String>,
    },
    LinkStart,
    LinkTitleSeparator,
    LinkEnd,
    Timestamp(Timestamp),
    DateRangeSeparator,
    Planning(PlanningKeyword),
    HorizontalRule,
    Text,
}

impl Token {
    /// A `Text` token with exactly this text.
    pub fn is_text(&self, text: &str) -> bool {
        self.kind == TokenKind::Text && self.text == text
    }

    pub fn is_line_break(&self) -> bool {
        self.kind == TokenKind::LineBreak
    }

    pub fn is_space(&self) -> bool {
        self.kind == TokenKind::Space
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::EndOfInput
    }

    /// Line break or end of input.
    pub fn ends_line(&self) -> bool {
        self.is_line_break() || self.is_end()
    }
}

/// Lexer output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn lex(input: &str) -> Lexed {
    lex_with(input, &ParserConfig::default())
}

pub fn lex_with(input: &str, config: &ParserConfig) -> Lexed {
    Lexer::new(input, config).run()
}

/* ------------------------------- Lexer ------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeadingPhase {
    Keyword,
    Priority,
    Title,
}

struct Lexer<'a> {
    input: &'a str,
    config: &'a ParserConfig,
    pos: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    line_start: bool,
    heading: Option<HeadingPhase>,
    in_drawer: bool,
    expect_property_value: bool,
    after_list_marker: bool,
    link_depth: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str, config: &'a ParserConfig) -> Self {
        Self {
            input,
            config,
            pos: 0,
            tokens: Vec::with_capacity(input.len() / 3 + 2),
            diagnostics: vec![],
            line_start: true,
            heading: None,
            in_drawer: false,
            expect_property_value: false,
            after_list_marker: false,
            link_depth: 0,
        }
    }

    fn run(mut self) -> Lexed {
        self.push(TokenKind::StartOfInput, 0);
        while self.pos < self.input.len() {
            self.step();
        }
        self.push(TokenKind::EndOfInput, 0);
        log::debug!(
            "lexed {} bytes into {} tokens",
            self.input.len(),
            self.tokens.len()
        );
        Lexed {
            tokens: self.tokens,
            diagnostics: self.diagnostics,
        }
    }

    fn push(&mut self, kind: TokenKind, len: usize) {
        let range = self.pos..self.pos + len;
        let text = self.input[range.clone()].to_string();
        self.tokens.push(Token { kind, text, range });
        self.pos += len;
    }

    fn previous(&self) -> Option<&TokenKind> {
        self.tokens.last().map(|t| &t.kind)
    }

    fn end_line(&mut self) {
        self.line_start = true;
        self.heading = None;
        self.expect_property_value = false;
        self.after_list_marker = false;
        self.link_depth = 0;
    }

    fn step(&mut self) {
        let input = self.input;
        let rest = &input[self.pos..];

        if let Some(len) = consumed(line_break, rest) {
            if self.line_start {
                // a blank line closes an unterminated drawer
                self.in_drawer = false;
            }
            self.push(TokenKind::LineBreak, len);
            self.end_line();
            return;
        }

        if std::mem::take(&mut self.line_start) {
            if let Some((kind, len)) = self.line_construct(rest) {
                self.push(kind, len);
                return;
            }
        }

        if rest.starts_with([' ', '\t']) {
            self.push(TokenKind::Space, 1);
            return;
        }

        if std::mem::take(&mut self.expect_property_value) {
            self.push(TokenKind::PropertyValue, line_len(rest));
            return;
        }

        if let Some((kind, len)) = self.heading_prefix(rest) {
            self.push(kind, len);
            return;
        }

        let after_marker = std::mem::take(&mut self.after_list_marker);
        if after_marker && self.previous() == Some(&TokenKind::Space) {
            if let Ok((after, state)) = checkbox(rest) {
                self.push(TokenKind::CheckBox { state }, rest.len() - after.len());
                return;
            }
        }

        if self.heading == Some(HeadingPhase::Title) && self.previous() == Some(&TokenKind::Space)
        {
            if let Ok((after, tags)) = tag_string(rest) {
                self.push(TokenKind::TagString { tags }, rest.len() - after.len());
                return;
            }
        }

        if rest.starts_with("--") && matches!(self.previous(), Some(TokenKind::Timestamp(_))) {
            if timestamp::scan(self.input, self.pos + 2).is_some() {
                self.push(TokenKind::DateRangeSeparator, 2);
                return;
            }
        }

        if rest.starts_with(['<', '[']) {
            if let Some(scanned) = timestamp::scan(self.input, self.pos) {
                if let Some(warning) = scanned.warning {
                    self.diagnostics
                        .push(Diagnostic::warning(warning, self.pos..self.pos + scanned.len));
                }
                self.push(TokenKind::Timestamp(scanned.timestamp), scanned.len);
                return;
            }
        }

        if rest.starts_with("[[") {
            self.link_depth += 1;
            self.push(TokenKind::LinkStart, 2);
            return;
        }
        if self.link_depth > 0 {
            if rest.starts_with("][") {
                self.push(TokenKind::LinkTitleSeparator, 2);
                return;
            }
            if rest.starts_with("]]") {
                self.link_depth -= 1;
                self.push(TokenKind::LinkEnd, 2);
                return;
            }
        }

        if matches!(
            self.previous(),
            None | Some(TokenKind::Space | TokenKind::LineBreak | TokenKind::StartOfInput)
        ) {
            if let Ok((after, keyword)) = planning_keyword(rest) {
                self.push(TokenKind::Planning(keyword), rest.len() - after.len());
                return;
            }
        }

        let len = match rest.chars().next() {
            Some(c) if MARKUP_CHARS.contains(c) => c.len_utf8(),
            Some(c) => match word_len(rest) {
                0 => c.len_utf8(),
                n => n,
            },
            None => return,
        };
        self.push(TokenKind::Text, len);
    }

    /// Constructs only recognised at the very start of a line.
    ///
    /// A drawer stays open only while its lines are property keys; any other
    /// line ends it, so an unterminated `:PROPERTIES:` cannot leak forward.
    fn line_construct(&mut self, rest: &'a str) -> Option<(TokenKind, usize)> {
        let in_drawer = std::mem::take(&mut self.in_drawer);
        if let Ok((_, level)) = heading_stars(rest) {
            self.heading = Some(HeadingPhase::Keyword);
            return Some((TokenKind::HeadingStars { level }, level));
        }
        if let Some(len) = consumed(horizontal_rule, rest) {
            return Some((TokenKind::HorizontalRule, len));
        }
        if let Ok((after, (begin, name))) = block_delimiter(rest) {
            let block = BlockType::from_name(name);
            let kind = if begin {
                TokenKind::BlockStart { block }
            } else {
                TokenKind::BlockEnd { block }
            };
            return Some((kind, rest.len() - after.len()));
        }
        if in_drawer {
            if let Some(len) = consumed(drawer_end, rest) {
                return Some((TokenKind::DrawerEnd, len));
            }
            if let Ok((after, key)) = property_key(rest) {
                self.in_drawer = true;
                self.expect_property_value = true;
                let key = key.to_string();
                return Some((TokenKind::PropertyKey { key }, rest.len() - after.len()));
            }
        } else if let Some(len) = consumed(drawer_start, rest) {
            self.in_drawer = true;
            return Some((TokenKind::DrawerStart, len));
        }
        if let Ok((after, name)) = file_keyword(rest) {
            let keyword = FileKeyword::from_name(name);
            return Some((TokenKind::FileKeyword { keyword }, rest.len() - after.len()));
        }
        if let Ok((after, (indent, style))) = unordered_marker(rest) {
            self.after_list_marker = true;
            let kind = TokenKind::UnorderedListMarker { indent, style };
            return Some((kind, rest.len() - after.len()));
        }
        if let Ok((after, (indent, style))) = ordered_marker(rest) {
            self.after_list_marker = true;
            let kind = TokenKind::OrderedListMarker { indent, style };
            return Some((kind, rest.len() - after.len()));
        }
        None
    }

    /// TODO keyword then priority cookie, each tried once right after the stars.
    fn heading_prefix(&mut self, rest: &str) -> Option<(TokenKind, usize)> {
        if self.heading == Some(HeadingPhase::Keyword) {
            self.heading = Some(HeadingPhase::Priority);
            let word = &rest[..word_len(rest)];
            if let Some(done) = self.config.todo_state(word) {
                if is_line_or_word_end(&rest[word.len()..]) {
                    return Some((TokenKind::TodoKeyword { done }, word.len()));
                }
            }
        }
        if self.heading == Some(HeadingPhase::Priority) {
            self.heading = Some(HeadingPhase::Title);
            if let Ok((after, value)) = priority_cookie(rest) {
                return Some((TokenKind::Priority { value }, rest.len() - after.len()));
            }
        }
        None
    }
}

/* ----------------------------- Recognisers ----------------------------- */

fn consumed<'a, O>(
    mut parser: impl FnMut(&'a str) -> PResult<'a, O>,
    input: &'a str,
) -> Option<usize> {
    parser(input)
        .ok()
        .map(|(rest, _)| input.len() - rest.len())
}

/// Length of the current line without its line ending.
fn line_len(rest: &str) -> usize {
    match rest.find('\n') {
        Some(n) if n > 0 && rest.as_bytes()[n - 1] == b'\r' => n - 1,
        Some(n) => n,
        None => rest.len(),
    }
}

fn word_len(rest: &str) -> usize {
    rest.find(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r') || MARKUP_CHARS.contains(c))
        .unwrap_or(rest.len())
}

fn is_line_or_word_end(rest: &str) -> bool {
    rest.is_empty() || rest.starts_with([' ', '\t', '\n', '\r'])
}

fn line_break(i: &str) -> PResult<'_, &str> {
    line_ending(i)
}

fn end_of_line(i: &str) -> PResult<'_, &str> {
    preceded(space0, alt((line_ending, eof)))(i)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '%')
}

fn heading_stars(i: &str) -> PResult<'_, usize> {
    terminated(many1_count(char('*')), peek(char(' ')))(i)
}

fn horizontal_rule(i: &str) -> PResult<'_, &str> {
    terminated(
        recognize(tuple((
            space0,
            verify(take_while1(|c: char| c == '-'), |s: &str| s.len() >= 5),
            space0,
        ))),
        peek(alt((line_ending, eof))),
    )(i)
}

/// `#+BEGIN_name` / `#+END_name`, case-insensitive, optionally indented.
fn block_delimiter(i: &str) -> PResult<'_, (bool, &str)> {
    map(
        tuple((
            space0,
            tag("#+"),
            alt((
                value(true, tag_no_case("begin_")),
                value(false, tag_no_case("end_")),
            )),
            take_while1(is_name_char),
        )),
        |(_, _, begin, name)| (begin, name),
    )(i)
}

fn drawer_start(i: &str) -> PResult<'_, &str> {
    terminated(
        recognize(pair(space0, tag_no_case(":PROPERTIES:"))),
        peek(end_of_line),
    )(i)
}

fn drawer_end(i: &str) -> PResult<'_, &str> {
    terminated(recognize(pair(space0, tag_no_case(":END:"))), peek(end_of_line))(i)
}

fn property_key(i: &str) -> PResult<'_, &str> {
    terminated(
        preceded(
            pair(space0, char(':')),
            terminated(
                take_while1(|c: char| c != ':' && !c.is_whitespace()),
                char(':'),
            ),
        ),
        peek(alt((recognize(one_of(" \t")), line_ending, eof))),
    )(i)
}

fn file_keyword(i: &str) -> PResult<'_, &str> {
    delimited(tag("#+"), take_while1(is_name_char), char(':'))(i)
}

fn unordered_marker(i: &str) -> PResult<'_, (usize, UnorderedMarker)> {
    map(
        terminated(
            pair(
                take_while(|c: char| c == ' '),
                alt((
                    value(UnorderedMarker::Dash, char('-')),
                    value(UnorderedMarker::Plus, char('+')),
                )),
            ),
            peek(one_of(" \t")),
        ),
        |(indent, style): (&str, _)| (indent.len(), style),
    )(i)
}

fn ordered_marker(i: &str) -> PResult<'_, (usize, OrderedMarker)> {
    map(
        terminated(
            tuple((
                take_while(|c: char| c == ' '),
                digit1,
                alt((
                    value(OrderedMarker::Period, char('.')),
                    value(OrderedMarker::Parenthesis, char(')')),
                )),
            )),
            peek(one_of(" \t")),
        ),
        |(indent, _, style): (&str, &str, _)| (indent.len(), style),
    )(i)
}

fn checkbox(i: &str) -> PResult<'_, CheckState> {
    alt((
        value(CheckState::Unchecked, tag("[ ]")),
        value(CheckState::Checked, tag_no_case("[x]")),
        value(CheckState::Partial, tag("[-]")),
    ))(i)
}

fn priority_cookie(i: &str) -> PResult<'_, char> {
    terminated(
        delimited(tag("[#"), satisfy(|c| c.is_ascii_alphanumeric()), char(']')),
        peek(alt((recognize(one_of(" \t")), line_ending, eof))),
    )(i)
}

/// `:work:urgent:` running to the end of the line.
fn tag_string(i: &str) -> PResult<'_, Vec<String>> {
    map(
        terminated(
            delimited(
                char(':'),
                separated_list1(char(':'), take_while1(is_tag_char)),
                char(':'),
            ),
            peek(end_of_line),
        ),
        |tags: Vec<&str>| tags.into_iter().map(str::to_string).collect(),
    )(i)
}

fn planning_keyword(i: &str) -> PResult<'_, PlanningKeyword> {
    alt((
        value(PlanningKeyword::Scheduled, tag("SCHEDULED:")),
        value(PlanningKeyword::Deadline, tag("DEADLINE:")),
        value(PlanningKeyword::Closed, tag("CLOSED:")),
    ))(i)
}
