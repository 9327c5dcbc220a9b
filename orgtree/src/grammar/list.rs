//! Ordered, unordered and description lists.
//!
//! A list at `level` accepts items whose marker is indented by at least
//! `level * 2` columns. Inside an item a deeper list (`level + 1`) is tried
//! before the next sibling item, so indentation decides nesting.

use super::chunk::paragraph;
use crate::combinator::{
    BoxedParser, Failure, PResult, Parser, lazy, line_break, map, match_token, maybe, one_of,
    one_or_more, repeat, seq, space, spanned, zero_or_more,
};
use crate::core::{
    CheckState, Chunk, List, ListItem, OrderedList, OrderedMarker, Paragraph, Span,
    UnorderedList, UnorderedMarker,
};
use crate::lexer::{Token, TokenKind};

pub fn list(level: usize) -> impl Parser<List> {
    one_of((unordered_list(level), ordered_list(level)))
}

fn unordered_list(level: usize) -> impl Parser<List> {
    map(
        spanned(one_or_more(list_item(level, false))),
        |(span, items): (Span, Vec<(Token, ListItem)>)| {
            let marker = match items.first().map(|(t, _)| &t.kind) {
                Some(TokenKind::UnorderedListMarker { style, .. }) => *style,
                _ => UnorderedMarker::Dash,
            };
            List::Unordered(UnorderedList {
                marker,
                items: items.into_iter().map(|(_, item)| item).collect(),
                span,
            })
        },
    )
}

fn ordered_list(level: usize) -> impl Parser<List> {
    map(
        spanned(one_or_more(list_item(level, true))),
        |(span, items): (Span, Vec<(Token, ListItem)>)| {
            let marker = match items.first().map(|(t, _)| &t.kind) {
                Some(TokenKind::OrderedListMarker { style, .. }) => *style,
                _ => OrderedMarker::Period,
            };
            List::Ordered(OrderedList {
                marker,
                items: items.into_iter().map(|(_, item)| item).collect(),
                span,
            })
        },
    )
}

/// One item, returned with its marker token.
fn list_item(level: usize, ordered: bool) -> impl Parser<(Token, ListItem)> {
    move |tokens: &[Token], pos: usize| {
        let marker = match_token("list marker", |t: &Token| match t.kind {
            TokenKind::UnorderedListMarker { indent, .. } => !ordered && indent >= level * 2,
            TokenKind::OrderedListMarker { indent, .. } => ordered && indent >= level * 2,
            _ => false,
        });
        let (next, (marker, _, checkbox, term, (first, rest))) = seq((
            marker,
            space,
            maybe(checkbox),
            maybe(description_term),
            item_chunks(level),
        ))(tokens, pos)?;

        let span = Span::new(pos, next);
        let item = match term {
            Some(term) => ListItem::Description {
                term,
                description: first.unwrap_or_else(|| Paragraph {
                    items: vec![],
                    span: Span::empty(next),
                }),
                content: rest,
                span,
            },
            None => ListItem::Plain {
                checkbox,
                content: first.map(Chunk::Paragraph).into_iter().chain(rest).collect(),
                span,
            },
        };
        Ok((next, (marker, item)))
    }
}

fn checkbox(tokens: &[Token], pos: usize) -> PResult<CheckState> {
    let (next, (token, _)) = seq((
        match_token("checkbox", |t| matches!(t.kind, TokenKind::CheckBox { .. })),
        zero_or_more(space),
    ))(tokens, pos)?;
    match token.kind {
        TokenKind::CheckBox { state } => Ok((next, state)),
        _ => Err(Failure::unexpected("checkbox", tokens, pos)),
    }
}

/// `term :: ` ahead on the current line.
fn description_term(tokens: &[Token], pos: usize) -> PResult<String> {
    let mut j = pos;
    while let Some(t) = tokens.get(j) {
        if t.ends_line() {
            break;
        }
        let separator = t.is_space()
            && tokens.get(j + 1).is_some_and(|t| t.is_text(":"))
            && tokens.get(j + 2).is_some_and(|t| t.is_text(":"))
            && tokens.get(j + 3).is_some_and(|t| t.is_space() || t.ends_line());
        if separator {
            let term = Span::new(pos, j).text(tokens).trim().to_string();
            if term.is_empty() {
                break;
            }
            let (next, _) = zero_or_more(space)(tokens, j + 3)?;
            return Ok((next, term));
        }
        j += 1;
    }
    Err(Failure::unexpected("description term", tokens, pos))
}

/// The item's first paragraph, then nested lists and indented continuation
/// paragraphs. Trailing blank lines are folded into each chunk's span.
fn item_chunks(level: usize) -> impl Parser<(Option<Paragraph>, Vec<Chunk>)> {
    let nested = lazy(move || -> BoxedParser<List> { Box::new(list(level + 1)) });
    seq((
        maybe(map(
            spanned(seq((paragraph, zero_or_more(line_break)))),
            |(span, (p, _))| Paragraph { span, ..p },
        )),
        zero_or_more(map(
            spanned(seq((
                one_of((
                    map(nested, Chunk::List),
                    map(continuation(level), Chunk::Paragraph),
                )),
                zero_or_more(line_break),
            ))),
            |(span, (chunk, _))| chunk.with_span(span),
        )),
    ))
}

/// A paragraph indented past the item's marker.
fn continuation(level: usize) -> impl Parser<Paragraph> {
    map(
        spanned(seq((repeat((level + 1) * 2, None, space), paragraph))),
        |(span, (_, p))| Paragraph { span, ..p },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Spanned;
    use crate::lexer::lex;
    use pretty_assertions::assert_eq;

    fn parse_list(input: &str) -> (Vec<Token>, usize, List) {
        let tokens = lex(input).tokens;
        let (next, list) = list(0)(&tokens, 1).expect("list");
        (tokens, next, list)
    }

    fn paragraph_text(chunk: &Chunk) -> String {
        match chunk {
            Chunk::Paragraph(p) => p.plain_text(),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn checkboxes() {
        let (tokens, next, list) = parse_list("- [ ] a\n- [X] b\n");
        assert!(tokens[next].is_end());
        let List::Unordered(list) = list else {
            panic!("expected unordered list");
        };
        assert_eq!(list.marker, UnorderedMarker::Dash);
        let summary: Vec<_> = list
            .items
            .iter()
            .map(|item| {
                assert_eq!(item.content().len(), 1);
                (item.checkbox(), paragraph_text(&item.content()[0]))
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some(CheckState::Unchecked), "a".to_string()),
                (Some(CheckState::Checked), "b".to_string()),
            ]
        );
        assert_eq!(list.span, Span::new(1, next));
    }

    #[test]
    fn nested_lists_of_mixed_kinds() {
        let (_, _, list) = parse_list("1. one\n   - sub a\n   - sub b\n2) two\n");
        let List::Ordered(list) = list else {
            panic!("expected ordered list");
        };
        assert_eq!(list.marker, OrderedMarker::Period);
        assert_eq!(list.items.len(), 2);
        let first = list.items[0].content();
        assert_eq!(first.len(), 2);
        let Chunk::List(List::Unordered(sub)) = &first[1] else {
            panic!("expected nested list, got {:?}", first[1]);
        };
        assert_eq!(sub.items.len(), 2);
        assert_eq!(paragraph_text(&sub.items[1].content()[0]), "sub b");
        assert!(list.items[0].span().contains(sub.span));
    }

    #[test]
    fn continuation_paragraph_after_blank_line() {
        let (_, _, list) = parse_list("- a\n\n  more about a\n- b\n");
        let items = list.items();
        assert_eq!(items.len(), 2);
        let texts: Vec<_> = items[0].content().iter().map(paragraph_text).collect();
        assert_eq!(texts, vec!["a", "more about a"]);
    }

    #[test]
    fn unindented_text_ends_the_list() {
        let (tokens, next, list) = parse_list("- a\n\nafterwards\n");
        assert_eq!(list.items().len(), 1);
        assert!(tokens[next].is_text("afterwards"));
    }

    #[test]
    fn description_items() {
        let (_, _, list) = parse_list("- Term :: the definition\n- plain\n");
        let ListItem::Description {
            term, description, ..
        } = &list.items()[0]
        else {
            panic!("expected description item");
        };
        assert_eq!(term, "Term");
        assert_eq!(description.plain_text(), "the definition");
        assert!(matches!(list.items()[1], ListItem::Plain { checkbox: None, .. }));
    }

    #[test]
    fn deeper_level_stops_at_shallower_marker() {
        let tokens = lex("  - inner\n- outer\n").tokens;
        let (next, inner) = list(1)(&tokens, 1).unwrap();
        assert_eq!(inner.items().len(), 1);
        assert!(matches!(
            tokens[next].kind,
            TokenKind::UnorderedListMarker { indent: 0, .. }
        ));
    }

    #[test]
    fn item_with_only_a_marker() {
        let (_, _, list) = parse_list("- \n- b");
        assert_eq!(list.items().len(), 2);
    }
}
