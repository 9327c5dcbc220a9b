//! Document assembly: the top-level rule, heading nesting, and the public
//! `parse` / `unparse` entry points.

use crate::combinator::{
    Failure, PResult, end_of_input, maybe, seq, spanned, start_of_input, zero_or_more,
};
use crate::config::ParserConfig;
use crate::core::{Diagnostic, Document, ParseError, Preamble, Section, Span};
use crate::format::unfill_text;
use crate::grammar::{preamble, preface, section};
use crate::lexer::{Token, lex_with};
use crate::storage::OrgParser;
use anyhow::{Context, Result};
use serde::Serialize;
use std::{borrow::Cow, fs, path::Path};

/* ----------------------------- Entry points ----------------------------- */

/// A parsed document together with the tokens its spans index into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedDocument {
    pub document: Document,
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedDocument {
    /// Source text covered by `span`.
    pub fn text_of(&self, span: Span) -> String {
        span.text(&self.tokens)
    }

    /// The text that was lexed (after unfilling, when enabled).
    pub fn source(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

pub fn parse(text: &str) -> Result<ParsedDocument, ParseError> {
    parse_with(text, &ParserConfig::default())
}

pub fn parse_with(text: &str, config: &ParserConfig) -> Result<ParsedDocument, ParseError> {
    let text = if config.unfill {
        Cow::Owned(unfill_text(text))
    } else {
        Cow::Borrowed(text)
    };
    let lexed = lex_with(&text, config);
    let document = parse_tokens(&lexed.tokens)?;

    let mut diagnostics = lexed.diagnostics;
    if document.preamble.title.span.is_empty() {
        let range = document
            .preamble
            .span
            .byte_range(&lexed.tokens)
            .unwrap_or(0..0);
        diagnostics.push(Diagnostic::warning("document has no #+TITLE", range));
    }

    Ok(ParsedDocument {
        document,
        tokens: lexed.tokens,
        diagnostics,
    })
}

/// Text reconstructed from the document's span. Equal to the parsed input.
pub fn unparse(parsed: &ParsedDocument) -> String {
    parsed.text_of(parsed.document.span)
}

/// Runs the document rule over a complete token stream (start and end of
/// input markers included).
pub fn parse_tokens(tokens: &[Token]) -> Result<Document, ParseError> {
    match document(tokens, 0) {
        Ok((_, document)) => {
            log::debug!(
                "parsed {} top-level sections from {} tokens",
                document.sections.len(),
                tokens.len()
            );
            Ok(document)
        }
        Err(failure) => Err(grammar_error(tokens, failure)),
    }
}

fn grammar_error(tokens: &[Token], failure: Failure) -> ParseError {
    let offset = tokens
        .get(failure.pos)
        .or_else(|| tokens.last())
        .map_or(0, |t| t.range.start);
    let line = 1 + tokens
        .iter()
        .take(failure.pos)
        .filter(|t| t.is_line_break())
        .count();
    let found = match tokens.get(failure.pos) {
        Some(t) if t.is_end() => "end of input".to_string(),
        Some(t) => t.text.clone(),
        None => String::new(),
    };
    log::debug!("grammar failure at token {}: {}", failure.pos, failure.message);
    ParseError::Grammar {
        message: failure.message,
        offset,
        line,
        found,
    }
}

/* ---------------------------- Document rule ---------------------------- */

fn document(tokens: &[Token], pos: usize) -> PResult<Document> {
    let (next, (span, (_, preamble, preface, sections, _))) = spanned(seq((
        start_of_input,
        maybe(preamble),
        preface,
        zero_or_more(section),
        end_of_input,
    )))(tokens, pos)?;
    let preamble = preamble.unwrap_or_else(|| Preamble::empty(pos + 1));
    Ok((
        next,
        Document {
            preamble,
            preface,
            sections: nest_sections(sections),
            span,
        },
    ))
}

/* ------------------------------- Nesting ------------------------------- */

/// Nests a flat run of sections by heading level.
///
/// The list is partitioned into runs, each starting at a section whose level is
/// not deeper than the current run's head. Within a run the head keeps the
/// remaining sections, nested recursively, as its children and its span grows to
/// cover them. Skipped levels (`*` then `***`) nest directly.
pub fn nest_sections(flat: Vec<Section>) -> Vec<Section> {
    let mut runs: Vec<Vec<Section>> = vec![];
    for section in flat {
        match runs.last_mut() {
            Some(run) if run.first().is_some_and(|head| section.level() > head.level()) => {
                run.push(section)
            }
            _ => runs.push(vec![section]),
        }
    }
    runs.into_iter().filter_map(merge_run).collect()
}

fn merge_run(run: Vec<Section>) -> Option<Section> {
    let mut run = run.into_iter();
    let head = run.next()?;
    let children = nest_sections(run.collect());
    let end = children.last().map_or(head.span.end, |c| c.span.end);
    Some(Section {
        span: Span::new(head.span.start, end),
        children,
        ..head
    })
}

/* ------------------------------- Storage ------------------------------- */

/// [`OrgParser`] over the token grammar.
#[derive(Debug, Clone, Default)]
pub struct TokenOrgParser {
    pub config: ParserConfig,
}

impl OrgParser for TokenOrgParser {
    fn parse_str(&self, text: &str) -> Result<ParsedDocument> {
        Ok(parse_with(text, &self.config)?)
    }

    fn parse_file(&self, abs_path: &Path) -> Result<ParsedDocument> {
        let text =
            fs::read_to_string(abs_path).with_context(|| format!("reading {:?}", abs_path))?;
        parse_with(&text, &self.config).with_context(|| format!("parsing {:?}", abs_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Chunk, Severity};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn levels(sections: &[Section]) -> Vec<(usize, Vec<usize>)> {
        sections
            .iter()
            .map(|s| (s.level(), s.children.iter().map(Section::level).collect()))
            .collect()
    }

    #[test]
    fn nests_by_level() {
        let parsed = parse("* a\n** b\n** c\n*** d\n* e\n").unwrap();
        let top = &parsed.document.sections;
        assert_eq!(levels(top), vec![(1, vec![2, 2]), (1, vec![])]);
        assert_eq!(levels(&top[0].children), vec![(2, vec![]), (2, vec![3])]);
        assert_eq!(parsed.text_of(top[0].span), "* a\n** b\n** c\n*** d\n");
        assert_eq!(parsed.text_of(top[1].span), "* e\n");
    }

    #[test]
    fn skipped_and_shallower_first_levels() {
        let parsed = parse("** deep first\n* shallow\n*** skipped\n").unwrap();
        let top = &parsed.document.sections;
        assert_eq!(levels(top), vec![(2, vec![]), (1, vec![3])]);
    }

    #[test]
    fn whole_document_round_trips() {
        let input = "#+TITLE: Notes\n\nIntro text.\n\n* One\nBody\n** Two :tag:\n- item\n";
        let parsed = parse(input).unwrap();
        assert_eq!(unparse(&parsed), input);
        assert_eq!(parsed.source(), input);
        assert_eq!(parsed.document.span, Span::new(0, parsed.tokens.len()));
        assert_eq!(parsed.document.preamble.title.plain_text(), "Notes");
        assert!(matches!(
            parsed.document.preface.body.as_slice(),
            [Chunk::Paragraph(_)]
        ));
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn empty_input() {
        let parsed = parse("").unwrap();
        assert_eq!(parsed.document.span, Span::new(0, 2));
        assert!(parsed.document.sections.is_empty());
        assert!(parsed.document.preface.body.is_empty());
        assert_eq!(parsed.document.preamble.span, Span::empty(1));
        assert_eq!(unparse(&parsed), "");
    }

    #[test]
    fn missing_title_and_weekday_warnings() {
        let parsed = parse("Meeting on <2024-01-15 Fri>\n").unwrap();
        let messages: Vec<_> = parsed
            .diagnostics
            .iter()
            .map(|d| (d.severity, d.message.contains("TITLE")))
            .collect();
        assert_eq!(
            messages,
            vec![(Severity::Warning, false), (Severity::Warning, true)]
        );
    }

    #[test]
    fn stray_block_end_is_an_error() {
        let err = parse("#+TITLE: x\n\ntext\n\n#+END_QUOTE\nmore\n").unwrap_err();
        let ParseError::Grammar {
            line, found, offset, ..
        } = err;
        assert_eq!(line, 5);
        assert_eq!(found, "#+END_QUOTE");
        assert_eq!(offset, 18);
    }

    #[test]
    fn unfill_runs_before_lexing() {
        let config = ParserConfig {
            unfill: true,
            ..ParserConfig::default()
        };
        let parsed = parse_with("#+TITLE: T\n\nwrapped\nprose\n", &config).unwrap();
        let Chunk::Paragraph(p) = &parsed.document.preface.body[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.plain_text(), "wrapped prose");
        assert_eq!(parsed.source(), "#+TITLE: T\n\nwrapped prose\n");
    }

    #[test]
    fn parser_reads_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("notes.org");
        let mut f = fs::File::create(&path)?;
        write!(f, "#+TITLE: File\n* TODO Task\n")?;

        let parser = TokenOrgParser::default();
        let parsed = parser.parse_file(&path)?;
        assert_eq!(parsed.document.sections.len(), 1);
        assert!(parsed.document.sections[0].heading.todo.is_some());

        let err = parser
            .parse_file(&dir.path().join("missing.org"))
            .expect_err("missing file");
        assert!(format!("{err:#}").contains("missing.org"));
        Ok(())
    }
}
