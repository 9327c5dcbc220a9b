//! File keywords before the first chunk, and the preface that follows them.

use super::chunk::chunk;
use super::inline::line_from;
use super::section::properties;
use crate::combinator::{
    Failure, PResult, collect_until, line_break, line_end, map, maybe, one_or_more, seq, spanned,
    zero_or_more,
};
use crate::core::{FileKeyword, Options, Preamble, Preface, Span, Tags};
use crate::lexer::{Token, TokenKind};
use crate::timestamp;
use chrono::NaiveDate;

/// A `#+KEY: value` line: keyword and the value's token range.
struct KeywordLine {
    keyword: FileKeyword,
    value: (usize, usize),
}

/// Optional property drawer, one or more keyword lines, trailing blank lines.
///
/// `#+NAME:` and `#+TBLFM:` belong to the block or table that follows them and
/// end the preamble.
pub fn preamble(tokens: &[Token], pos: usize) -> PResult<Preamble> {
    let (next, (span, (properties, lines, _))) = spanned(seq((
        maybe(map(seq((properties, line_end)), |(p, _)| p)),
        one_or_more(keyword_line),
        zero_or_more(line_break),
    )))(tokens, pos)?;

    let mut preamble = Preamble {
        properties,
        span,
        ..Preamble::empty(pos)
    };
    for line in lines {
        let (start, end) = line.value;
        let value = line_from(tokens, start, end);
        let text = value.span.text(tokens);
        match line.keyword {
            FileKeyword::Title => preamble.title = value,
            FileKeyword::Author => preamble.author = Some(text),
            FileKeyword::Email => preamble.email = Some(text),
            FileKeyword::Category => preamble.category = Some(text),
            FileKeyword::Date => preamble.date = parse_date(&text),
            FileKeyword::FileTags => preamble.filetags = Some(split_tags(&text, value.span)),
            FileKeyword::Tags => preamble.tags = Some(split_tags(&text, value.span)),
            FileKeyword::Options => preamble.options = Some(split_options(&text, value.span)),
            FileKeyword::Pile => preamble.pile = Some(split_options(&text, value.span)),
            FileKeyword::Name | FileKeyword::TableFormula | FileKeyword::Other(_) => {
                log::trace!("keeping {:?} uninterpreted", line.keyword)
            }
        }
    }
    Ok((next, preamble))
}

fn keyword_line(tokens: &[Token], pos: usize) -> PResult<KeywordLine> {
    let keyword = match tokens.get(pos).map(|t| &t.kind) {
        Some(TokenKind::FileKeyword { keyword })
            if !matches!(keyword, FileKeyword::Name | FileKeyword::TableFormula) =>
        {
            keyword.clone()
        }
        _ => return Err(Failure::unexpected("file keyword", tokens, pos)),
    };
    let (end, _) = collect_until(Token::ends_line)(tokens, pos + 1)?;
    let (next, _) = maybe(line_break)(tokens, end)?;
    Ok((
        next,
        KeywordLine {
            keyword,
            value: (pos + 1, end),
        },
    ))
}

/// `2024-01-15`, or any timestamp such as `<2024-01-15 Mon>`.
fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| timestamp::scan(text, 0).map(|s| s.timestamp.date))
}

/// `:a:b:` or `a b`.
fn split_tags(text: &str, span: Span) -> Tags {
    let tags = text
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    Tags { tags, span }
}

/// `toc:nil num:2`; a word without a colon maps to an empty value.
fn split_options(text: &str, span: Span) -> Options {
    let map = text
        .split_whitespace()
        .map(|word| match word.split_once(':') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (word.to_string(), String::new()),
        })
        .collect();
    Options { map, span }
}

/// Leading blank lines, then chunks up to the first heading.
pub fn preface(tokens: &[Token], pos: usize) -> PResult<Preface> {
    map(
        spanned(seq((zero_or_more(line_break), zero_or_more(chunk)))),
        |(span, (_, body))| Preface { body, span },
    )(tokens, pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Chunk;
    use crate::lexer::lex;
    use pretty_assertions::assert_eq;

    #[test]
    fn typed_fields() {
        let input = "#+TITLE: My *Notes*\n#+AUTHOR: Ann Example\n#+DATE: 2024-01-15\n\
                     #+FILETAGS: :a:b:\n#+TAGS: x y\n#+OPTIONS: toc:nil num:2 todo\n\
                     #+RESULTS: whatever\n\nBody";
        let tokens = lex(input).tokens;
        let (next, preamble) = preamble(&tokens, 1).unwrap();
        assert!(tokens[next].is_text("Body"));
        assert_eq!(preamble.title.plain_text(), "My Notes");
        assert_eq!(preamble.title.span.text(&tokens), "My *Notes*");
        assert_eq!(preamble.author.as_deref(), Some("Ann Example"));
        assert_eq!(preamble.date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(preamble.filetags.map(|t| t.tags), Some(vec!["a".into(), "b".into()]));
        assert_eq!(preamble.tags.map(|t| t.tags), Some(vec!["x".into(), "y".into()]));
        let options = preamble.options.expect("options");
        assert_eq!(
            options.map.into_iter().collect::<Vec<_>>(),
            vec![
                ("toc".to_string(), "nil".to_string()),
                ("num".to_string(), "2".to_string()),
                ("todo".to_string(), String::new()),
            ]
        );
        assert_eq!(preamble.span, Span::new(1, next));
    }

    #[test]
    fn leading_drawer_and_timestamp_date() {
        let input = ":PROPERTIES:\n:ID: 42\n:END:\n#+title: Hi\n#+date: <2023-10-27 Fri>";
        let tokens = lex(input).tokens;
        let (next, preamble) = preamble(&tokens, 1).unwrap();
        assert!(tokens[next].is_end());
        assert_eq!(preamble.properties.expect("drawer").map["ID"], "42");
        assert_eq!(preamble.title.plain_text(), "Hi");
        assert_eq!(preamble.date, NaiveDate::from_ymd_opt(2023, 10, 27));
    }

    #[test]
    fn name_keyword_is_left_for_the_block() {
        let tokens = lex("#+TITLE: T\n#+NAME: x\n#+BEGIN_SRC\n#+END_SRC\n").tokens;
        let (next, _) = preamble(&tokens, 1).unwrap();
        assert!(matches!(
            tokens[next].kind,
            TokenKind::FileKeyword {
                keyword: FileKeyword::Name
            }
        ));
    }

    #[test]
    fn no_keywords_no_preamble() {
        let tokens = lex("Just text\n").tokens;
        assert!(preamble(&tokens, 1).is_err());
    }

    #[test]
    fn preface_skips_blank_lines() {
        let tokens = lex("\n\nIntro.\n\n- a\n* H").tokens;
        let (next, preface) = preface(&tokens, 1).unwrap();
        assert_eq!(preface.span, Span::new(1, next));
        assert!(matches!(
            preface.body.as_slice(),
            [Chunk::Paragraph(_), Chunk::List(_)]
        ));
        assert!(matches!(tokens[next].kind, TokenKind::HeadingStars { .. }));
    }
}
