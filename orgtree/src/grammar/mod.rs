//! Grammar rules over the token stream.
//!
//! Rules without parameters are plain `fn(&[Token], usize) -> PResult<T>` items,
//! which makes mutual recursion between them free. Rules parameterised by an
//! indentation level return `impl Parser<T>` and recurse through
//! [`lazy`](crate::combinator::lazy).

pub mod block;
pub mod chunk;
pub mod inline;
pub mod list;
pub mod preamble;
pub mod section;

use crate::combinator::{Parser, match_token};
use crate::lexer::{Token, TokenKind};

/// Token `pos` starts a line.
pub(crate) fn at_line_start(tokens: &[Token], pos: usize) -> bool {
    pos == 0
        || tokens
            .get(pos - 1)
            .is_some_and(|t| t.is_line_break() || t.kind == TokenKind::StartOfInput)
}

/// A single token of exactly `kind`.
pub(crate) fn kind(expected: &'static str, kind: TokenKind) -> impl Parser<Token> {
    match_token(expected, move |t| t.kind == kind)
}

pub use block::block;
pub use chunk::{chunk, paragraph};
pub use inline::{inline_elems, line};
pub use list::list;
pub use preamble::{preamble, preface};
pub use section::{heading, properties, section};
