//! Body chunks: paragraphs, rules, comment lines, tables, blocks and lists.

use super::block::block;
use super::inline::{inline_elems, line_from};
use super::list::list;
use super::{at_line_start, kind};
use crate::combinator::{
    Failure, PResult, collect_until, line_break, map, maybe, one_of, one_or_more, seq, spanned,
    zero_or_more,
};
use crate::core::{
    Chunk, CommentLine, FileKeyword, HorizontalRule, Paragraph, Span, Table, TableRow,
};
use crate::lexer::{Token, TokenKind};

/// One chunk plus the blank lines after it, which become part of its span.
pub fn chunk(tokens: &[Token], pos: usize) -> PResult<Chunk> {
    map(
        spanned(seq((
            one_of((
                map(horizontal_rule, Chunk::HorizontalRule),
                map(table, Chunk::Table),
                map(comment_line, Chunk::CommentLine),
                map(block, Chunk::Block),
                map(list(0), Chunk::List),
                map(paragraph, Chunk::Paragraph),
            )),
            zero_or_more(line_break),
        ))),
        |(span, (chunk, _))| chunk.with_span(span),
    )(tokens, pos)
}

/* ------------------------------ Paragraph ------------------------------ */

/// Whether a paragraph ends before `t`. A blank line ends it after the first
/// of the two line breaks. Recognised block delimiters always end it, so a
/// block opening without a matching end is left for the caller to reject.
fn ends_paragraph(previous: Option<&Token>, t: &Token) -> bool {
    match &t.kind {
        TokenKind::EndOfInput
        | TokenKind::HeadingStars { .. }
        | TokenKind::UnorderedListMarker { .. }
        | TokenKind::OrderedListMarker { .. } => true,
        TokenKind::BlockStart { block } => block.is_recognized(),
        TokenKind::BlockEnd { block } => block.is_recognized(),
        TokenKind::LineBreak => previous.is_some_and(Token::is_line_break),
        _ => false,
    }
}

pub fn paragraph(tokens: &[Token], pos: usize) -> PResult<Paragraph> {
    let (next, (span, items)) = spanned(inline_elems(ends_paragraph))(tokens, pos)?;
    if span.is_empty() {
        return Err(Failure::unexpected("paragraph", tokens, pos));
    }
    Ok((next, Paragraph { items, span }))
}

/* --------------------------- Rules & comments --------------------------- */

pub fn horizontal_rule(tokens: &[Token], pos: usize) -> PResult<HorizontalRule> {
    map(
        spanned(kind("horizontal rule", TokenKind::HorizontalRule)),
        |(span, _)| HorizontalRule { span },
    )(tokens, pos)
}

/// `# remark` at the start of a line.
pub fn comment_line(tokens: &[Token], pos: usize) -> PResult<CommentLine> {
    let is_comment = at_line_start(tokens, pos)
        && tokens.get(pos).is_some_and(|t| t.is_text("#"))
        && tokens
            .get(pos + 1)
            .is_some_and(|t| t.is_space() || t.ends_line());
    if !is_comment {
        return Err(Failure::unexpected("comment line", tokens, pos));
    }
    let (end, _) = collect_until(Token::ends_line)(tokens, pos)?;
    let body = Span::new(pos + 1, end).text(tokens);
    let text = body.strip_prefix([' ', '\t']).unwrap_or(&body).to_string();
    Ok((
        end,
        CommentLine {
            text,
            span: Span::new(pos, end),
        },
    ))
}

/* -------------------------------- Tables -------------------------------- */

enum RawRow {
    Rule,
    Cells(TableRow),
}

/// `| a | b |` rows, optional `|---+---|` rules, optional `#+TBLFM:` line.
pub fn table(tokens: &[Token], pos: usize) -> PResult<Table> {
    map(
        spanned(seq((one_or_more(table_row), maybe(table_formula)))),
        |(span, (rows, formula))| assemble_table(rows, formula, span),
    )(tokens, pos)
}

fn table_row(tokens: &[Token], pos: usize) -> PResult<RawRow> {
    if !at_line_start(tokens, pos) {
        return Err(Failure::unexpected("table row", tokens, pos));
    }
    let bar = (pos..tokens.len())
        .find(|&i| !tokens[i].is_space())
        .filter(|&i| tokens[i].is_text("|"))
        .ok_or_else(|| Failure::unexpected("table row", tokens, pos))?;
    let (end, _) = collect_until(Token::ends_line)(tokens, bar)?;
    let (next, _) = maybe(line_break)(tokens, end)?;

    let is_rule = tokens
        .get(bar + 1)
        .is_some_and(|t| t.kind == TokenKind::Text && t.text.starts_with('-'));
    if is_rule {
        return Ok((next, RawRow::Rule));
    }

    let mut cells = vec![];
    let mut cell_start = bar + 1;
    for i in bar + 1..end {
        if tokens[i].is_text("|") {
            cells.push(line_from(tokens, cell_start, i));
            cell_start = i + 1;
        }
    }
    if cell_start < end {
        let last = line_from(tokens, cell_start, end);
        if !last.span.is_empty() {
            cells.push(last);
        }
    }
    Ok((
        next,
        RawRow::Cells(TableRow {
            cells,
            span: Span::new(bar, end),
        }),
    ))
}

fn table_formula(tokens: &[Token], pos: usize) -> PResult<String> {
    map(
        seq((
            kind(
                "table formula",
                TokenKind::FileKeyword {
                    keyword: FileKeyword::TableFormula,
                },
            ),
            collect_until(Token::ends_line),
            maybe(line_break),
        )),
        |(_, body, _)| {
            body.iter()
                .map(|t| t.text.as_str())
                .collect::<String>()
                .trim()
                .to_string()
        },
    )(tokens, pos)
}

fn assemble_table(rows: Vec<RawRow>, formula: Option<String>, span: Span) -> Table {
    let mut groups: Vec<Vec<TableRow>> = vec![vec![]];
    for row in rows {
        match row {
            RawRow::Rule => groups.push(vec![]),
            RawRow::Cells(r) => {
                if let Some(group) = groups.last_mut() {
                    group.push(r);
                }
            }
        }
    }
    groups.retain(|g| !g.is_empty());

    let header = if groups.len() > 1 && groups[0].len() == 1 {
        groups.remove(0).pop()
    } else {
        None
    };
    let rows = header.iter().count() + groups.iter().map(Vec::len).sum::<usize>();
    let columns = header
        .iter()
        .chain(groups.iter().flatten())
        .map(|r| r.cells.len())
        .max()
        .unwrap_or(0);
    Table {
        dimensions: (rows, columns),
        header,
        groups,
        formula,
        span,
    }
}
