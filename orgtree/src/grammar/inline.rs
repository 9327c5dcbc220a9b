//! Inline elements: text runs, timestamps, links, hashtags, footnotes,
//! citations, math, raw quotes and emphasis.
//!
//! Scanning and assembly are split: [`inline_elems`] walks forward until its
//! stop predicate fires, then [`build`] turns the scanned token range into
//! elements. Unrecognised tokens coalesce into text runs.

use crate::combinator::{PResult, Parser};
use crate::core::{
    FormatStyle, InlineElem, Line, Link, MathStyle, QuoteKind, Span, Stamp,
};
use crate::lexer::{Token, TokenKind};

/// Inline elements up to (not including) the first token where
/// `stop(previous, current)` holds. `previous` is `None` for the first token.
/// The end of input always stops.
pub fn inline_elems<S>(stop: S) -> impl Parser<Vec<InlineElem>>
where
    S: Fn(Option<&Token>, &Token) -> bool,
{
    move |tokens: &[Token], pos: usize| {
        let end = scan_until(tokens, pos, &stop);
        Ok((end, build(tokens, pos, end)))
    }
}

/// A line whose scan ends where `stop` fires. Leading and trailing spaces are
/// consumed but left outside the line's span.
pub fn line_until<S>(stop: S) -> impl Parser<Line>
where
    S: Fn(Option<&Token>, &Token) -> bool,
{
    move |tokens: &[Token], pos: usize| {
        let end = scan_until(tokens, pos, &stop);
        Ok((end, line_from(tokens, pos, end)))
    }
}

/// Rest of the current line, up to the line break or end of input.
pub fn line(tokens: &[Token], pos: usize) -> PResult<Line> {
    line_until(|_, t: &Token| t.ends_line())(tokens, pos)
}

fn scan_until<S>(tokens: &[Token], pos: usize, stop: &S) -> usize
where
    S: Fn(Option<&Token>, &Token) -> bool,
{
    let mut cur = pos;
    while let Some(t) = tokens.get(cur) {
        let previous = if cur > pos { tokens.get(cur - 1) } else { None };
        if t.is_end() || stop(previous, t) {
            break;
        }
        cur += 1;
    }
    cur
}

fn is_blank(t: &Token) -> bool {
    t.is_space() || t.is_line_break()
}

/// Line over `[start, end)` with surrounding blanks trimmed off.
pub fn line_from(tokens: &[Token], start: usize, end: usize) -> Line {
    let mut start = start.min(end);
    let mut end = end;
    while start < end && is_blank(&tokens[start]) {
        start += 1;
    }
    while end > start && is_blank(&tokens[end - 1]) {
        end -= 1;
    }
    Line {
        items: build(tokens, start, end),
        span: Span::new(start, end),
    }
}

/// The timestamp carried by token `i`, if any.
pub fn stamp_at(tokens: &[Token], i: usize) -> Option<Stamp> {
    match &tokens.get(i)?.kind {
        TokenKind::Timestamp(ts) => Some(Stamp {
            timestamp: ts.clone(),
            span: Span::new(i, i + 1),
        }),
        _ => None,
    }
}

/// Assemble inline elements from `[start, end)`. Trailing line breaks are
/// treated as separators and not emitted.
pub fn build(tokens: &[Token], start: usize, end: usize) -> Vec<InlineElem> {
    let mut end = end.min(tokens.len());
    while end > start && tokens[end - 1].is_line_break() {
        end -= 1;
    }
    Builder {
        tokens,
        start,
        end,
        items: vec![],
        text_from: None,
    }
    .run()
}

/* ------------------------------- Builder ------------------------------- */

struct Builder<'t> {
    tokens: &'t [Token],
    start: usize,
    end: usize,
    items: Vec<InlineElem>,
    text_from: Option<usize>,
}

impl<'t> Builder<'t> {
    fn run(mut self) -> Vec<InlineElem> {
        let mut i = self.start;
        while i < self.end {
            match self.element_at(i) {
                Some((next, elem)) => {
                    self.flush_text(i);
                    self.items.push(elem);
                    i = next;
                }
                None => {
                    self.text_from.get_or_insert(i);
                    i += 1;
                }
            }
        }
        self.flush_text(self.end);
        self.items
    }

    fn flush_text(&mut self, upto: usize) {
        if let Some(from) = self.text_from.take() {
            let span = Span::new(from, upto);
            self.items.push(InlineElem::Text {
                text: span.text(self.tokens),
                span,
            });
        }
    }

    fn tok(&self, i: usize) -> Option<&'t Token> {
        if i < self.end { self.tokens.get(i) } else { None }
    }

    fn is_text_at(&self, i: usize, text: &str) -> bool {
        self.tok(i).is_some_and(|t| t.is_text(text))
    }

    fn previous(&self, i: usize) -> Option<&'t Token> {
        if i > self.start { self.tokens.get(i - 1) } else { None }
    }

    /// First index in `[from, end)` matching `pred`, not crossing a blank line.
    fn find(&self, from: usize, pred: impl Fn(usize, &Token) -> bool) -> Option<usize> {
        let mut i = from;
        while let Some(t) = self.tok(i) {
            if pred(i, t) {
                return Some(i);
            }
            if t.is_line_break() && self.tok(i + 1).is_some_and(Token::is_line_break) {
                return None;
            }
            i += 1;
        }
        None
    }

    fn element_at(&self, i: usize) -> Option<(usize, InlineElem)> {
        let tok = self.tok(i)?;
        match &tok.kind {
            TokenKind::Timestamp(_) => self.timestamp(i),
            TokenKind::LinkStart => self.link(i),
            TokenKind::Text => match tok.text.as_str() {
                "#" => self.hashtag(i),
                "[" => self.footnote(i).or_else(|| self.bracket_citation(i)),
                "cite" => self.citation(i),
                "$" => self.dollar_math(i),
                "\\" => self.ams_math(i),
                "@" => self.inline_quote(i),
                marker => FormatStyle::from_marker(marker)
                    .and_then(|style| self.formatted(i, marker, style)),
            },
            _ => None,
        }
    }

    fn timestamp(&self, i: usize) -> Option<(usize, InlineElem)> {
        let start = stamp_at(self.tokens, i)?;
        let ranged = self
            .tok(i + 1)
            .filter(|t| t.kind == TokenKind::DateRangeSeparator)
            .and_then(|_| self.tok(i + 2))
            .and_then(|_| stamp_at(self.tokens, i + 2));
        Some(match ranged {
            Some(end) => (
                i + 3,
                InlineElem::TimestampRange {
                    start,
                    end,
                    span: Span::new(i, i + 3),
                },
            ),
            None => (i + 1, InlineElem::Timestamp(start)),
        })
    }

    fn link(&self, i: usize) -> Option<(usize, InlineElem)> {
        let mut depth = 0usize;
        let mut separator = None;
        let mut close = None;
        for j in i + 1..self.end {
            match self.tokens[j].kind {
                TokenKind::LinkStart => depth += 1,
                TokenKind::LinkTitleSeparator if depth == 0 && separator.is_none() => {
                    separator = Some(j)
                }
                TokenKind::LinkEnd if depth == 0 => {
                    close = Some(j);
                    break;
                }
                TokenKind::LinkEnd => depth -= 1,
                _ => {}
            }
        }
        let close = close?;
        let target_end = separator.unwrap_or(close);
        let raw = Span::new(i + 1, target_end).text(self.tokens);
        let (scheme, target) = split_target(raw.trim());
        let title = separator.map(|s| Line {
            items: build(self.tokens, s + 1, close),
            span: Span::new(s + 1, close),
        });
        Some((
            close + 1,
            InlineElem::Link(Link {
                scheme,
                target,
                title,
                span: Span::new(i, close + 1),
            }),
        ))
    }

    fn hashtag(&self, i: usize) -> Option<(usize, InlineElem)> {
        if !self.previous(i).is_none_or(|p| is_blank(p) || p.is_text("(")) {
            return None;
        }
        let mut j = i + 1;
        while self
            .tok(j)
            .is_some_and(|t| is_word(t) || t.is_text("_"))
        {
            j += 1;
        }
        if j == i + 1 || !self.tok(i + 1).is_some_and(is_word) {
            return None;
        }
        let tag = Span::new(i + 1, j).text(self.tokens);
        if self.is_text_at(j, "(") {
            let close = self.find(j + 1, |_, t| t.is_text(")") || t.is_line_break());
            if let Some(close) = close.filter(|&c| self.is_text_at(c, ")")) {
                let value = Span::new(j + 1, close).text(self.tokens).trim().to_string();
                return Some((
                    close + 1,
                    InlineElem::HashtagMetric {
                        tag,
                        value,
                        span: Span::new(i, close + 1),
                    },
                ));
            }
        }
        Some((
            j,
            InlineElem::Hashtag {
                tag,
                span: Span::new(i, j),
            },
        ))
    }

    /// `[fn:key]`, `[fn:key:body]`, `[fn::body]`
    fn footnote(&self, i: usize) -> Option<(usize, InlineElem)> {
        if !(self.is_text_at(i + 1, "fn") && self.is_text_at(i + 2, ":")) {
            return None;
        }
        let close = self.matching_bracket(i)?;
        let (key, body_start) = if self.is_text_at(i + 3, ":") {
            (None, i + 4)
        } else {
            let key_end = (i + 3..close)
                .find(|&j| self.tokens[j].is_text(":"))
                .unwrap_or(close);
            let key = Span::new(i + 3, key_end).text(self.tokens);
            if key.is_empty() || key.contains(char::is_whitespace) {
                return None;
            }
            (Some(key), (key_end + 1).min(close))
        };
        Some((
            close + 1,
            InlineElem::Footnote {
                key,
                body: line_from(self.tokens, body_start, close),
                span: Span::new(i, close + 1),
            },
        ))
    }

    /// `[cite:@key]`, `[cite/style:@a;@b]`
    fn bracket_citation(&self, i: usize) -> Option<(usize, InlineElem)> {
        if !self.is_text_at(i + 1, "cite") {
            return None;
        }
        let close = self.matching_bracket(i)?;
        let colon = (i + 2..close).find(|&j| self.tokens[j].is_text(":"))?;
        let cite = Span::new(colon + 1, close).text(self.tokens).trim().to_string();
        if cite.is_empty() {
            return None;
        }
        Some((
            close + 1,
            InlineElem::Citation {
                cite,
                span: Span::new(i, close + 1),
            },
        ))
    }

    /// `cite:key`
    fn citation(&self, i: usize) -> Option<(usize, InlineElem)> {
        if !self.previous(i).is_none_or(|p| is_blank(p) || p.is_text("(")) {
            return None;
        }
        if !self.is_text_at(i + 1, ":") {
            return None;
        }
        let mut j = i + 2;
        while self.tok(j).is_some_and(|t| {
            t.kind == TokenKind::Text && !matches!(t.text.as_str(), ")" | "]" | "," | ";")
        }) {
            j += 1;
        }
        if j == i + 2 {
            return None;
        }
        let raw = Span::new(i + 2, j).text(self.tokens);
        let cite = raw.trim_end_matches(['.', ',', ';']).to_string();
        Some((
            j,
            InlineElem::Citation {
                cite,
                span: Span::new(i, j),
            },
        ))
    }

    /// `$x^2$`
    fn dollar_math(&self, i: usize) -> Option<(usize, InlineElem)> {
        let first = self.tok(i + 1)?;
        if is_blank(first) || first.is_text("$") {
            return None;
        }
        let close = self.find(i + 2, |j, t| {
            t.is_text("$")
                && !is_blank(&self.tokens[j - 1])
                && self
                    .tok(j + 1)
                    .is_none_or(|n| !n.text.starts_with(char::is_alphanumeric))
        })?;
        Some((
            close + 1,
            InlineElem::InlineMath {
                style: MathStyle::Dollar,
                text: Span::new(i + 1, close).text(self.tokens),
                span: Span::new(i, close + 1),
            },
        ))
    }

    /// `\( .. \)` and `\[ .. \]`
    fn ams_math(&self, i: usize) -> Option<(usize, InlineElem)> {
        let closer = if self.is_text_at(i + 1, "(") {
            ")"
        } else if self.is_text_at(i + 1, "[") {
            "]"
        } else {
            return None;
        };
        let close = self.find(i + 2, |j, t| t.is_text("\\") && self.is_text_at(j + 1, closer))?;
        Some((
            close + 2,
            InlineElem::InlineMath {
                style: MathStyle::Ams,
                text: Span::new(i + 2, close).text(self.tokens),
                span: Span::new(i, close + 2),
            },
        ))
    }

    /// `@@html:<b>@@`, `@@latex:\LaTeX@@`
    fn inline_quote(&self, i: usize) -> Option<(usize, InlineElem)> {
        if !(self.is_text_at(i + 1, "@") && self.is_text_at(i + 3, ":")) {
            return None;
        }
        let kind = match self.tok(i + 2)?.text.to_ascii_lowercase().as_str() {
            "html" => QuoteKind::Html,
            "latex" => QuoteKind::Latex,
            _ => return None,
        };
        let close = self.find(i + 4, |j, t| t.is_text("@") && self.is_text_at(j + 1, "@"))?;
        Some((
            close + 2,
            InlineElem::InlineQuote {
                kind,
                text: Span::new(i + 4, close).text(self.tokens),
                span: Span::new(i, close + 2),
            },
        ))
    }

    fn formatted(&self, i: usize, marker: &str, style: FormatStyle) -> Option<(usize, InlineElem)> {
        if !self.previous(i).is_none_or(opens_emphasis) {
            return None;
        }
        let first = self.tok(i + 1)?;
        if is_blank(first) || first.is_text(marker) {
            return None;
        }
        let close = self.find(i + 2, |j, t| {
            t.is_text(marker)
                && !is_blank(&self.tokens[j - 1])
                && self.tok(j + 1).is_none_or(closes_emphasis)
        })?;
        let content = if style.is_literal() {
            let span = Span::new(i + 1, close);
            vec![InlineElem::Text {
                text: span.text(self.tokens),
                span,
            }]
        } else {
            build(self.tokens, i + 1, close)
        };
        Some((
            close + 1,
            InlineElem::Formatted {
                style,
                content,
                span: Span::new(i, close + 1),
            },
        ))
    }

    /// Index of the `]` closing the `[` at `i`.
    fn matching_bracket(&self, i: usize) -> Option<usize> {
        let mut depth = 0usize;
        for j in i + 1..self.end {
            let t = &self.tokens[j];
            if t.is_line_break() {
                return None;
            }
            if t.is_text("[") {
                depth += 1;
            } else if t.is_text("]") {
                if depth == 0 {
                    return Some(j);
                }
                depth -= 1;
            }
        }
        None
    }
}

fn is_word(t: &Token) -> bool {
    t.kind == TokenKind::Text && t.text.starts_with(char::is_alphanumeric)
}

fn opens_emphasis(previous: &Token) -> bool {
    is_blank(previous)
        || previous.kind == TokenKind::StartOfInput
        || matches!(previous.text.as_str(), "(" | "{" | "'" | "\"" | "-")
        || FormatStyle::from_marker(&previous.text).is_some()
}

fn closes_emphasis(next: &Token) -> bool {
    is_blank(next)
        || next.is_end()
        || next.kind != TokenKind::Text
        || next.text.starts_with(['-', '.', ',', ';', ':', '!', '?', '\'', ')', '}', '"', '['])
        || FormatStyle::from_marker(&next.text).is_some()
}

/// `https://example.com` becomes (`https`, `example.com`); targets without a
/// scheme are kept whole.
fn split_target(raw: &str) -> (Option<String>, String) {
    match raw.split_once(':') {
        Some((scheme, rest))
            if !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
        {
            (
                Some(scheme.to_string()),
                rest.trim_start_matches("//").to_string(),
            )
        }
        _ => (None, raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use pretty_assertions::assert_eq;

    /// Elements of a single line of input.
    fn elems(input: &str) -> (Vec<Token>, Vec<InlineElem>) {
        let tokens = lex(input).tokens;
        let end = tokens.len() - 1;
        let items = build(&tokens, 1, end);
        (tokens, items)
    }

    fn text(s: &str, start: usize, end: usize) -> InlineElem {
        InlineElem::Text {
            text: s.into(),
            span: Span::new(start, end),
        }
    }

    #[test]
    fn plain_words_coalesce_into_one_run() {
        let (_, items) = elems("just some words");
        assert_eq!(items, vec![text("just some words", 1, 6)]);
    }

    #[test]
    fn link_with_title() {
        let (_, items) = elems("[[https://example.com][desc]]");
        let InlineElem::Link(link) = &items[0] else {
            panic!("expected link, got {items:?}");
        };
        assert_eq!(link.scheme.as_deref(), Some("https"));
        assert_eq!(link.target, "example.com");
        let title = link.title.as_ref().expect("title");
        assert_eq!(title.items, vec![text("desc", 8, 9)]);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn link_without_title() {
        let (_, items) = elems("[[file:x.png]]");
        assert_eq!(
            items,
            vec![InlineElem::Link(Link {
                scheme: Some("file".into()),
                target: "x.png".into(),
                title: None,
                span: Span::new(1, 6),
            })]
        );
    }

    #[test]
    fn link_without_scheme_and_unclosed_link() {
        let (_, items) = elems("[[Some heading]]");
        let InlineElem::Link(link) = &items[0] else {
            panic!("expected link");
        };
        assert_eq!((link.scheme.as_deref(), link.target.as_str()), (None, "Some heading"));

        let (_, items) = elems("[[never closed");
        assert_eq!(items, vec![text("[[never closed", 1, 5)]);
    }

    #[test]
    fn timestamp_range_collapses() {
        let (_, items) = elems("from <2024-01-15 Mon>--<2024-01-17 Wed>");
        assert!(matches!(
            items.as_slice(),
            [InlineElem::Text { .. }, InlineElem::TimestampRange { span, .. }] if *span == Span::new(3, 6)
        ));
    }

    #[test]
    fn hashtags_and_metrics() {
        let (_, items) = elems("#work and #weight(72.5 kg) but not a#b");
        assert_eq!(
            items[0],
            InlineElem::Hashtag {
                tag: "work".into(),
                span: Span::new(1, 3)
            }
        );
        assert!(items.iter().any(|i| matches!(
            i,
            InlineElem::HashtagMetric { tag, value, .. } if tag == "weight" && value == "72.5 kg"
        )));
        assert_eq!(
            items
                .iter()
                .filter(|i| matches!(i, InlineElem::Hashtag { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn footnotes() {
        let (_, items) = elems("a[fn:1] b [fn::inline note] c [fn:name:a definition]");
        let notes: Vec<_> = items
            .iter()
            .filter_map(|i| match i {
                InlineElem::Footnote { key, body, .. } => Some((key.clone(), body.plain_text())),
                _ => None,
            })
            .collect();
        assert_eq!(
            notes,
            vec![
                (Some("1".to_string()), String::new()),
                (None, "inline note".to_string()),
                (Some("name".to_string()), "a definition".to_string()),
            ]
        );
    }

    #[test]
    fn citations() {
        let (_, items) = elems("see cite:tukey1962future. and [cite:@knuth84]");
        let cites: Vec<_> = items
            .iter()
            .filter_map(|i| match i {
                InlineElem::Citation { cite, .. } => Some(cite.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(cites, vec!["tukey1962future", "@knuth84"]);
    }

    #[test]
    fn math_and_raw_quotes() {
        let (_, items) = elems(r"$a+b$ and \(x^2\) then @@html:<b>@@ costs $5");
        let found: Vec<_> = items
            .iter()
            .filter_map(|i| match i {
                InlineElem::InlineMath { style, text, .. } => Some(format!("{style:?}:{text}")),
                InlineElem::InlineQuote { kind, text, .. } => Some(format!("{kind:?}:{text}")),
                _ => None,
            })
            .collect();
        assert_eq!(found, vec!["Dollar:a+b", "Ams:x^2", "Html:<b>"]);
    }

    #[test]
    fn emphasis_nests_and_literals_do_not() {
        let (_, items) = elems("*bold /it/* and =*raw*= but 2*3*4");
        let InlineElem::Formatted { style, content, .. } = &items[0] else {
            panic!("expected emphasis, got {items:?}");
        };
        assert_eq!(*style, FormatStyle::Bold);
        assert!(matches!(
            content.as_slice(),
            [InlineElem::Text { .. }, InlineElem::Formatted { style: FormatStyle::Italic, .. }]
        ));
        let verbatim = items
            .iter()
            .find_map(|i| match i {
                InlineElem::Formatted {
                    style: FormatStyle::Verbatim,
                    content,
                    ..
                } => Some(content.clone()),
                _ => None,
            })
            .expect("verbatim");
        assert!(matches!(verbatim.as_slice(), [InlineElem::Text { text, .. }] if text == "*raw*"));
        assert!(matches!(items.last(), Some(InlineElem::Text { text, .. }) if text.ends_with("2*3*4")));
    }

    #[test]
    fn trailing_line_breaks_are_not_text() {
        let tokens = lex("a\nb\n\n").tokens;
        let items = build(&tokens, 1, 6);
        assert_eq!(items, vec![text("a\nb", 1, 4)]);
    }

    #[test]
    fn line_trims_surrounding_spaces() {
        let tokens = lex("  title  \nnext").tokens;
        let (next, line) = line(&tokens, 1).unwrap();
        assert_eq!(next, 6);
        assert_eq!(line.span, Span::new(3, 4));
        assert_eq!(line.plain_text(), "title");
    }

    #[test]
    fn inline_elems_stop_on_blank_line() {
        let tokens = lex("a\nb\n\nc").tokens;
        let stop = |prev: Option<&Token>, t: &Token| {
            t.is_line_break() && prev.is_some_and(Token::is_line_break)
        };
        let (next, items) = inline_elems(stop)(&tokens, 1).unwrap();
        assert_eq!(next, 5);
        assert_eq!(items.len(), 1);
    }
}
