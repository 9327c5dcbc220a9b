//! Headings and flat sections. Nesting by level happens later, in
//! [`crate::document`].

use super::chunk::chunk;
use super::inline::{line_until, stamp_at};
use super::kind;
use crate::combinator::{
    Failure, PResult, line_break, line_end, map, match_token, maybe, one_or_more, seq, space,
    spanned, zero_or_more,
};
use crate::core::{
    Heading, Planning, PlanningKeyword, Priority, Properties, Section, Span, Stamp, Tags,
    TodoState,
};
use crate::lexer::{Token, TokenKind};
use indexmap::IndexMap;

/// A heading and the chunks up to the next heading. `children` is left empty.
pub fn section(tokens: &[Token], pos: usize) -> PResult<Section> {
    map(
        spanned(seq((heading, zero_or_more(chunk)))),
        |(span, (heading, body))| Section {
            heading,
            body,
            children: vec![],
            span,
        },
    )(tokens, pos)
}

/// `** TODO [#A] Title :tags:` plus optional planning and property drawer lines.
pub fn heading(tokens: &[Token], pos: usize) -> PResult<Heading> {
    let (next, (span, (level, _, todo, priority, title, tags, _, (planning, properties)))) =
        spanned(seq((
            stars,
            space,
            maybe(todo_keyword),
            maybe(priority),
            line_until(|_, t: &Token| {
                t.ends_line() || matches!(t.kind, TokenKind::TagString { .. })
            }),
            maybe(tags),
            line_end,
            seq((
                maybe(map(
                    seq((zero_or_more(space), planning, line_end)),
                    |(_, planning, _)| planning,
                )),
                maybe(map(seq((properties, line_end)), |(properties, _)| properties)),
            )),
        )))(tokens, pos)?;
    Ok((
        next,
        Heading {
            level,
            todo,
            priority,
            title,
            tags,
            planning,
            properties,
            span,
        },
    ))
}

fn stars(tokens: &[Token], pos: usize) -> PResult<usize> {
    match tokens.get(pos).map(|t| &t.kind) {
        Some(TokenKind::HeadingStars { level }) => Ok((pos + 1, *level)),
        _ => Err(Failure::unexpected("heading", tokens, pos)),
    }
}

fn todo_keyword(tokens: &[Token], pos: usize) -> PResult<TodoState> {
    match tokens.get(pos) {
        Some(Token {
            kind: TokenKind::TodoKeyword { done },
            text,
            ..
        }) => {
            let (next, _) = zero_or_more(space)(tokens, pos + 1)?;
            let state = TodoState {
                keyword: text.clone(),
                done: *done,
            };
            Ok((next, state))
        }
        _ => Err(Failure::unexpected("TODO keyword", tokens, pos)),
    }
}

fn priority(tokens: &[Token], pos: usize) -> PResult<Priority> {
    match tokens.get(pos).map(|t| &t.kind) {
        Some(TokenKind::Priority { value }) => {
            let (next, _) = zero_or_more(space)(tokens, pos + 1)?;
            Ok((next, Priority { value: *value }))
        }
        _ => Err(Failure::unexpected("priority cookie", tokens, pos)),
    }
}

fn tags(tokens: &[Token], pos: usize) -> PResult<Tags> {
    match tokens.get(pos).map(|t| &t.kind) {
        Some(TokenKind::TagString { tags }) => {
            let (next, _) = zero_or_more(space)(tokens, pos + 1)?;
            let tags = Tags {
                tags: tags.clone(),
                span: Span::new(pos, pos + 1),
            };
            Ok((next, tags))
        }
        _ => Err(Failure::unexpected("tags", tokens, pos)),
    }
}

/* ------------------------------- Planning ------------------------------- */

fn stamp(tokens: &[Token], pos: usize) -> PResult<Stamp> {
    stamp_at(tokens, pos)
        .map(|stamp| (pos + 1, stamp))
        .ok_or_else(|| Failure::unexpected("timestamp", tokens, pos))
}

/// `KEYWORD: <stamp>` with an optional `--<stamp>` range end, which is kept in
/// the span only.
fn planning_entry(tokens: &[Token], pos: usize) -> PResult<(PlanningKeyword, Stamp)> {
    let (next, (keyword, _, stamp, _)) = seq((
        match_token("planning keyword", |t| matches!(t.kind, TokenKind::Planning(_))),
        zero_or_more(space),
        stamp,
        maybe(seq((
            kind("date range", TokenKind::DateRangeSeparator),
            stamp,
        ))),
    ))(tokens, pos)?;
    match keyword.kind {
        TokenKind::Planning(keyword) => Ok((next, (keyword, stamp))),
        _ => Err(Failure::unexpected("planning keyword", tokens, pos)),
    }
}

/// One planning line; a repeated keyword keeps its last stamp.
fn planning(tokens: &[Token], pos: usize) -> PResult<Planning> {
    let (next, (span, entries)) = spanned(one_or_more(map(
        seq((planning_entry, zero_or_more(space))),
        |(entry, _)| entry,
    )))(tokens, pos)?;
    let mut planning = Planning {
        scheduled: None,
        deadline: None,
        closed: None,
        span,
    };
    for (keyword, stamp) in entries {
        let slot = match keyword {
            PlanningKeyword::Scheduled => &mut planning.scheduled,
            PlanningKeyword::Deadline => &mut planning.deadline,
            PlanningKeyword::Closed => &mut planning.closed,
        };
        *slot = Some(stamp);
    }
    Ok((next, planning))
}

/* ------------------------------ Properties ------------------------------ */

/// `:PROPERTIES:` ... `:END:` drawer. Duplicate keys keep the last value.
pub fn properties(tokens: &[Token], pos: usize) -> PResult<Properties> {
    map(
        spanned(seq((
            kind("property drawer", TokenKind::DrawerStart),
            zero_or_more(space),
            line_break,
            zero_or_more(property),
            kind(":END:", TokenKind::DrawerEnd),
            zero_or_more(space),
        ))),
        |(span, (_, _, _, entries, _, _))| Properties {
            map: entries.into_iter().collect::<IndexMap<_, _>>(),
            span,
        },
    )(tokens, pos)
}

fn property(tokens: &[Token], pos: usize) -> PResult<(String, String)> {
    let key = match tokens.get(pos).map(|t| &t.kind) {
        Some(TokenKind::PropertyKey { key }) => key.clone(),
        _ => return Err(Failure::unexpected("property", tokens, pos)),
    };
    let (value_at, _) = zero_or_more(space)(tokens, pos + 1)?;
    let (end, value) = maybe(match_token("property value", |t| {
        t.kind == TokenKind::PropertyValue
    }))(tokens, value_at)?;
    let (next, _) = line_break(tokens, end)?;
    let value = value.map_or_else(String::new, |t| t.text.trim_end().to_string());
    Ok((next, (key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Chunk;
    use crate::lexer::lex;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn full_heading() {
        let input = "** TODO [#A] Write it  :work:home:\n\
                     SCHEDULED: <2024-01-15 Mon> DEADLINE: <2024-01-20 Sat>\n\
                     :PROPERTIES:\n:ID: abc\n:END:\nBody text\n* Next\n";
        let tokens = lex(input).tokens;
        let (next, section) = section(&tokens, 1).unwrap();
        let heading = &section.heading;
        assert_eq!(heading.level, 2);
        assert_eq!(
            heading.todo,
            Some(TodoState {
                keyword: "TODO".into(),
                done: false
            })
        );
        assert_eq!(heading.priority, Some(Priority { value: 'A' }));
        assert_eq!(heading.title.plain_text(), "Write it");
        assert_eq!(
            heading.tags.as_ref().map(|t| t.tags.clone()),
            Some(vec!["work".to_string(), "home".to_string()])
        );
        let planning = heading.planning.as_ref().expect("planning");
        assert_eq!(
            planning.scheduled.as_ref().map(|s| s.timestamp.date),
            Some(date(2024, 1, 15))
        );
        assert_eq!(
            planning.deadline.as_ref().map(|s| s.timestamp.date),
            Some(date(2024, 1, 20))
        );
        assert_eq!(planning.closed, None);
        let properties = heading.properties.as_ref().expect("properties");
        assert_eq!(properties.map["ID"], "abc");

        assert_eq!(section.body.len(), 1);
        assert!(matches!(&section.body[0], Chunk::Paragraph(p) if p.plain_text() == "Body text"));
        assert!(matches!(tokens[next].kind, TokenKind::HeadingStars { level: 1 }));
    }

    #[test]
    fn plain_heading_at_end_of_input() {
        let tokens = lex("* Plain").tokens;
        let (next, heading) = heading(&tokens, 1).unwrap();
        assert!(tokens[next].is_end());
        assert_eq!(heading.title.plain_text(), "Plain");
        assert_eq!(heading.title.span, Span::new(3, 4));
        assert_eq!(heading.todo, None);
        assert_eq!(heading.tags, None);
    }

    #[test]
    fn done_keyword_and_empty_title() {
        let tokens = lex("*** DONE\n").tokens;
        let (_, heading) = heading(&tokens, 1).unwrap();
        assert_eq!(heading.level, 3);
        assert!(heading.todo.is_some_and(|t| t.done));
        assert!(heading.title.span.is_empty());
    }

    #[test]
    fn planning_range_and_repeats() {
        let input = "* Met\n  CLOSED: [2024-01-15 Mon]--[2024-01-16 Tue] CLOSED: [2024-02-01 Thu]\n";
        let tokens = lex(input).tokens;
        let (next, heading) = heading(&tokens, 1).unwrap();
        assert!(tokens[next].is_end());
        let closed = heading.planning.and_then(|p| p.closed).expect("closed");
        assert_eq!(closed.timestamp.date, date(2024, 2, 1));
        assert!(!closed.timestamp.active);
    }

    #[test]
    fn property_drawer_edge_cases() {
        let input = ":PROPERTIES:\n:A: one\n:EMPTY:\n:A: two\n:END:\n";
        let tokens = lex(input).tokens;
        let (next, props) = properties(&tokens, 1).unwrap();
        assert!(tokens[next].is_line_break());
        let keys: Vec<_> = props.map.keys().cloned().collect();
        assert_eq!(keys, vec!["A", "EMPTY"]);
        assert_eq!(props.map["A"], "two");
        assert_eq!(props.map["EMPTY"], "");
    }

    #[test]
    fn property_values_are_kept_verbatim() {
        let tokens = lex(":PROPERTIES:\n:SEEN:  <2024-01-15 Mon> [[x][y]]  \n:END:\n").tokens;
        let (_, props) = properties(&tokens, 1).unwrap();
        assert_eq!(props.map["SEEN"], "<2024-01-15 Mon> [[x][y]]");
    }

    #[test]
    fn stray_drawer_line_is_body_text() {
        let tokens = lex("* H\n:PROPERTIES:\nnot a property\n:END:\n").tokens;
        let (_, section) = section(&tokens, 1).unwrap();
        assert_eq!(section.heading.properties, None);
        assert!(!section.body.is_empty());
    }
}
