//! Lossless parser for org-style outline documents.
//!
//! Text flows through three stages:
//! - [`lexer`] splits it into tokens whose texts concatenate back to the input;
//! - [`grammar`] rules, built from the [`combinator`] engine, turn tokens into nodes
//!   that record the [`Span`](crate::core::Span) of tokens they cover;
//! - [`document`] assembles the preamble, preface and heading-nested sections.
//!
//! Because every node keeps its span, `unparse(parse(x)) == x` for any input the
//! grammar accepts.

pub mod combinator;
pub mod config;
pub mod core;
pub mod document;
pub mod format;
pub mod grammar;
pub mod lexer;
pub mod storage;
pub mod timestamp;
pub mod tree;

pub use config::ParserConfig;
pub use crate::core::{Diagnostic, Document, ParseError, Span, Spanned};
pub use document::{ParsedDocument, TokenOrgParser, parse, parse_tokens, parse_with, unparse};
pub use format::unfill_text;
pub use lexer::{Lexed, Token, TokenKind, lex, lex_with};
