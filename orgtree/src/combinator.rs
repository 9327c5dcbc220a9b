//! Token-level parser combinators.
//!
//! A parser is any `Fn(&[Token], usize) -> PResult<T>`: given the immutable token
//! slice and a cursor it either succeeds with the next cursor and a value, or
//! fails with a message and the position it gave up at. Parsers hold no mutable
//! state, so the same parser may be run any number of times, from any thread.

use crate::core::Span;
use crate::lexer::{Token, TokenKind};

/// Why a parser did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    /// Token index where matching stopped.
    pub pos: usize,
}

impl Failure {
    pub fn new(message: impl Into<String>, pos: usize) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }

    /// Failure naming the token found at `pos`.
    pub fn unexpected(expected: &str, tokens: &[Token], pos: usize) -> Self {
        let found = match tokens.get(pos) {
            Some(t) if t.is_end() => "end of input".to_string(),
            Some(t) => format!("{:?}", t.text),
            None => "nothing".to_string(),
        };
        Self::new(format!("expected {expected}, found {found}"), pos)
    }
}

/// `Ok((next_position, value))` or a [`Failure`].
pub type PResult<T> = Result<(usize, T), Failure>;

pub trait Parser<T>: Fn(&[Token], usize) -> PResult<T> {}

impl<T, F> Parser<T> for F where F: Fn(&[Token], usize) -> PResult<T> {}

pub type BoxedParser<T> = Box<dyn Parser<T>>;

/* ----------------------------- Sequencing ----------------------------- */

/// Tuples of parsers run one after another.
pub trait Sequence<O> {
    fn parse_seq(&self, tokens: &[Token], pos: usize) -> PResult<O>;
}

macro_rules! impl_sequence {
    ($($p:ident $o:ident),+) => {
        impl<$($p, $o),+> Sequence<($($o,)+)> for ($($p,)+)
        where
            $($p: Parser<$o>),+
        {
            #[allow(non_snake_case)]
            fn parse_seq(&self, tokens: &[Token], pos: usize) -> PResult<($($o,)+)> {
                let ($($p,)+) = self;
                $(let (pos, $o) = $p(tokens, pos)?;)+
                Ok((pos, ($($o,)+)))
            }
        }
    };
}

impl_sequence!(P1 O1, P2 O2);
impl_sequence!(P1 O1, P2 O2, P3 O3);
impl_sequence!(P1 O1, P2 O2, P3 O3, P4 O4);
impl_sequence!(P1 O1, P2 O2, P3 O3, P4 O4, P5 O5);
impl_sequence!(P1 O1, P2 O2, P3 O3, P4 O4, P5 O5, P6 O6);
impl_sequence!(P1 O1, P2 O2, P3 O3, P4 O4, P5 O5, P6 O6, P7 O7);
impl_sequence!(P1 O1, P2 O2, P3 O3, P4 O4, P5 O5, P6 O6, P7 O7, P8 O8);

/// All parsers in order; the first failure aborts the whole sequence.
pub fn seq<S, O>(parsers: S) -> impl Parser<O>
where
    S: Sequence<O>,
{
    move |tokens: &[Token], pos: usize| parsers.parse_seq(tokens, pos)
}

/* ---------------------------- Alternation ---------------------------- */

/// Tuples of parsers tried in order.
pub trait Alternatives<O> {
    fn parse_alt(&self, tokens: &[Token], pos: usize) -> PResult<O>;
}

macro_rules! impl_alternatives {
    ($($p:ident),+) => {
        impl<O, $($p),+> Alternatives<O> for ($($p,)+)
        where
            $($p: Parser<O>),+
        {
            #[allow(non_snake_case)]
            fn parse_alt(&self, tokens: &[Token], pos: usize) -> PResult<O> {
                let ($($p,)+) = self;
                let mut furthest: Option<Failure> = None;
                $(
                    match $p(tokens, pos) {
                        Ok(done) => return Ok(done),
                        Err(e) => {
                            if furthest.as_ref().is_none_or(|f| e.pos > f.pos) {
                                furthest = Some(e);
                            }
                        }
                    }
                )+
                Err(furthest.unwrap_or_else(|| Failure::new("no alternative matched", pos)))
            }
        }
    };
}

impl_alternatives!(P1, P2);
impl_alternatives!(P1, P2, P3);
impl_alternatives!(P1, P2, P3, P4);
impl_alternatives!(P1, P2, P3, P4, P5);
impl_alternatives!(P1, P2, P3, P4, P5, P6);
impl_alternatives!(P1, P2, P3, P4, P5, P6, P7);
impl_alternatives!(P1, P2, P3, P4, P5, P6, P7, P8);

/// First alternative that succeeds; otherwise the failure that got furthest.
pub fn one_of<A, O>(alternatives: A) -> impl Parser<O>
where
    A: Alternatives<O>,
{
    move |tokens: &[Token], pos: usize| alternatives.parse_alt(tokens, pos)
}

/* ----------------------------- Repetition ----------------------------- */

/// Between `min` and `max` (unbounded when `None`) matches of `p`.
///
/// Stops as soon as a match consumes nothing, so a parser that can succeed on
/// empty input never loops.
pub fn repeat<T, P>(min: usize, max: Option<usize>, p: P) -> impl Parser<Vec<T>>
where
    P: Parser<T>,
{
    move |tokens: &[Token], pos: usize| {
        let mut out = Vec::new();
        let mut cur = pos;
        while max.is_none_or(|m| out.len() < m) {
            match p(tokens, cur) {
                Ok((next, v)) => {
                    let progressed = next > cur;
                    out.push(v);
                    cur = next;
                    if !progressed {
                        break;
                    }
                }
                Err(e) if out.len() < min => return Err(e),
                Err(_) => break,
            }
        }
        if out.len() < min {
            return Err(Failure::new(
                format!("expected at least {min} repetitions, got {}", out.len()),
                cur,
            ));
        }
        Ok((cur, out))
    }
}

pub fn zero_or_more<T, P>(p: P) -> impl Parser<Vec<T>>
where
    P: Parser<T>,
{
    repeat(0, None, p)
}

pub fn one_or_more<T, P>(p: P) -> impl Parser<Vec<T>>
where
    P: Parser<T>,
{
    repeat(1, None, p)
}

/* ------------------------------ Wrappers ------------------------------ */

/// Optional match; never fails.
pub fn maybe<T, P>(p: P) -> impl Parser<Option<T>>
where
    P: Parser<T>,
{
    move |tokens: &[Token], pos: usize| match p(tokens, pos) {
        Ok((next, v)) => Ok((next, Some(v))),
        Err(_) => Ok((pos, None)),
    }
}

pub fn map<T, U, P, F>(p: P, f: F) -> impl Parser<U>
where
    P: Parser<T>,
    F: Fn(T) -> U,
{
    move |tokens: &[Token], pos: usize| p(tokens, pos).map(|(next, v)| (next, f(v)))
}

/// Runs `p` without consuming anything.
pub fn peek<T, P>(p: P) -> impl Parser<T>
where
    P: Parser<T>,
{
    move |tokens: &[Token], pos: usize| p(tokens, pos).map(|(_, v)| (pos, v))
}

/// Pairs the value of `p` with the span of tokens it consumed.
pub fn spanned<T, P>(p: P) -> impl Parser<(Span, T)>
where
    P: Parser<T>,
{
    move |tokens: &[Token], pos: usize| {
        p(tokens, pos).map(|(next, v)| (next, (Span::new(pos, next), v)))
    }
}

/// Builds the inner parser only when invoked, for recursive rules.
pub fn lazy<T, F>(thunk: F) -> impl Parser<T>
where
    F: Fn() -> BoxedParser<T>,
{
    move |tokens: &[Token], pos: usize| thunk()(tokens, pos)
}

/* ---------------------------- Token matching ---------------------------- */

/// A single token satisfying `pred`.
pub fn match_token<F>(expected: &'static str, pred: F) -> impl Parser<Token>
where
    F: Fn(&Token) -> bool,
{
    move |tokens: &[Token], pos: usize| match tokens.get(pos) {
        Some(t) if pred(t) => Ok((pos + 1, t.clone())),
        _ => Err(Failure::unexpected(expected, tokens, pos)),
    }
}

/// Tokens up to, not including, the first one satisfying `stop`. Never fails
/// and never consumes the end-of-input token.
pub fn collect_until<F>(stop: F) -> impl Parser<Vec<Token>>
where
    F: Fn(&Token) -> bool,
{
    move |tokens: &[Token], pos: usize| {
        let mut cur = pos;
        while let Some(t) = tokens.get(cur) {
            if t.is_end() || stop(t) {
                break;
            }
            cur += 1;
        }
        let collected = tokens.get(pos..cur).map(<[Token]>::to_vec).unwrap_or_default();
        Ok((cur, collected))
    }
}

/* ------------------------- Positional helpers ------------------------- */

pub fn start_of_input(tokens: &[Token], pos: usize) -> PResult<Token> {
    match_token("start of input", |t| t.kind == TokenKind::StartOfInput)(tokens, pos)
}

pub fn end_of_input(tokens: &[Token], pos: usize) -> PResult<Token> {
    match_token("end of input", Token::is_end)(tokens, pos)
}

pub fn line_break(tokens: &[Token], pos: usize) -> PResult<Token> {
    match_token("line break", Token::is_line_break)(tokens, pos)
}

pub fn space(tokens: &[Token], pos: usize) -> PResult<Token> {
    match_token("space", Token::is_space)(tokens, pos)
}

pub fn spaces(tokens: &[Token], pos: usize) -> PResult<Vec<Token>> {
    one_or_more(space)(tokens, pos)
}

/// A word: a text token that is not a single markup character.
pub fn word(tokens: &[Token], pos: usize) -> PResult<Token> {
    match_token("word", |t| {
        t.kind == TokenKind::Text && t.text.chars().any(char::is_alphanumeric)
    })(tokens, pos)
}

/// One or more line breaks, or a look at the end of input.
pub fn line_end(tokens: &[Token], pos: usize) -> PResult<()> {
    one_of((
        map(one_or_more(line_break), |_| ()),
        map(peek(end_of_input), |_| ()),
    ))(tokens, pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input).tokens
    }

    #[test]
    fn seq_threads_the_cursor() {
        let toks = tokens("a b");
        let (next, (a, _, b)) = seq((word, space, word))(&toks, 1).unwrap();
        assert_eq!((a.text.as_str(), b.text.as_str()), ("a", "b"));
        assert_eq!(next, 4);
    }

    #[test]
    fn seq_failure_discards_partial_work() {
        let toks = tokens("a\nb");
        let err = seq((word, space, word))(&toks, 1).unwrap_err();
        assert_eq!(err.pos, 2);
        assert!(err.message.contains("space"), "{}", err.message);
    }

    #[test]
    fn one_of_reports_furthest_failure() {
        let toks = tokens("a b\n");
        let p = one_of((
            map(seq((word, space, space)), |_| 1),
            map(line_break, |_| 2),
        ));
        let err = p(&toks, 1).unwrap_err();
        assert_eq!(err.pos, 3);
    }

    #[test]
    fn repetition_bounds() {
        let toks = tokens("   x");
        assert_eq!(repeat(2, Some(2), space)(&toks, 1).unwrap().0, 3);
        assert_eq!(zero_or_more(space)(&toks, 1).unwrap().0, 4);
        assert!(repeat(4, None, space)(&toks, 1).is_err());
        assert_eq!(zero_or_more(line_break)(&toks, 1).unwrap(), (1, vec![]));
    }

    #[test]
    fn repetition_of_empty_matches_terminates() {
        let toks = tokens("x");
        let (next, found) = zero_or_more(maybe(space))(&toks, 1).unwrap();
        assert_eq!(next, 1);
        assert_eq!(found, vec![None]);
    }

    #[test]
    fn spanned_and_peek() {
        let toks = tokens("a b");
        let (next, (span, _)) = spanned(seq((word, spaces)))(&toks, 1).unwrap();
        assert_eq!((next, span), (3, Span::new(1, 3)));
        assert_eq!(peek(word)(&toks, 3).unwrap().0, 3);
    }

    #[test]
    fn collect_until_stops_before_the_end_marker() {
        let toks = tokens("a b");
        let (next, got) = collect_until(Token::is_line_break)(&toks, 1).unwrap();
        assert_eq!(next, 4);
        assert_eq!(got.len(), 3);
        assert!(toks[next].is_end());
    }

    fn nested(tokens: &[Token], pos: usize) -> PResult<usize> {
        one_of((
            map(
                seq((
                    match_token("(", |t| t.is_text("(")),
                    lazy(|| -> BoxedParser<usize> { Box::new(nested) }),
                    match_token(")", |t| t.is_text(")")),
                )),
                |(_, depth, _): (Token, usize, Token)| depth + 1,
            ),
            map(word, |_| 0),
        ))(tokens, pos)
    }

    #[test]
    fn lazy_allows_recursive_rules() {
        let toks = tokens("((x))");
        assert_eq!(nested(&toks, 1).unwrap(), (6, 2));
    }

    #[test]
    fn positional_helpers() {
        let toks = tokens("x");
        assert!(start_of_input(&toks, 0).is_ok());
        assert!(end_of_input(&toks, 2).is_ok());
        assert_eq!(line_end(&toks, 2).unwrap().0, 2);
        assert!(line_end(&toks, 1).is_err());
    }
}
