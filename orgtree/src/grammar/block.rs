//! `#+BEGIN_x` / `#+END_x` blocks.
//!
//! Source, example, comment, verse, latex and html blocks keep their body
//! verbatim. Quote, center, aside, page-intro, edits and video blocks parse
//! their body as nested chunks. A `#+NAME:` line directly above a block is part
//! of the block.

use super::chunk::chunk;
use super::kind;
use crate::combinator::{
    Failure, PResult, Parser, collect_until, line_break, line_end, map, maybe, seq, space,
    zero_or_more,
};
use crate::core::{
    Block, BlockType, Chunk, ContainerBlock, FileKeyword, HtmlBlock, RawBlock, SourceBlock, Span,
};
use crate::lexer::{Token, TokenKind};
use indexmap::IndexMap;

pub fn block(tokens: &[Token], pos: usize) -> PResult<Block> {
    let (start, name) = maybe(name_line)(tokens, pos)?;
    let block_type = match tokens.get(start).map(|t| &t.kind) {
        Some(TokenKind::BlockStart { block }) if block.is_recognized() => block.clone(),
        _ => return Err(Failure::unexpected("block", tokens, start)),
    };

    let (next, block) = match block_type {
        BlockType::Src => map(verbatim(BlockType::Src), |(config, body)| {
            let (language, switches, header_args) = source_config(&config);
            Block::Source(SourceBlock {
                language,
                switches,
                header_args,
                body,
                name: name.clone(),
                span: Span::default(),
            })
        })(tokens, start)?,
        BlockType::Html => map(verbatim(BlockType::Html), |(_, body)| {
            Block::Html(HtmlBlock {
                body,
                name: name.clone(),
                span: Span::default(),
            })
        })(tokens, start)?,
        raw @ (BlockType::Example | BlockType::Comment | BlockType::Verse | BlockType::Latex) => {
            let (next, (_, body)) = verbatim(raw.clone())(tokens, start)?;
            let raw_block = RawBlock {
                body,
                span: Span::default(),
            };
            let block = match raw {
                BlockType::Example => Block::Example(raw_block),
                BlockType::Comment => Block::Comment(raw_block),
                BlockType::Verse => Block::Verse(raw_block),
                _ => Block::Latex(raw_block),
            };
            (next, block)
        }
        container_type => {
            let (next, body) = container(container_type.clone())(tokens, start)?;
            let container_block = ContainerBlock {
                body,
                span: Span::default(),
            };
            let block = match container_type {
                BlockType::Quote => Block::Quote(container_block),
                BlockType::Center => Block::Center(container_block),
                BlockType::Aside => Block::Aside(container_block),
                BlockType::PageIntro => Block::PageIntro(container_block),
                BlockType::Edits => Block::Edits(container_block),
                BlockType::Video => Block::Video(container_block),
                other => {
                    return Err(Failure::new(
                        format!("no grammar for block type {other:?}"),
                        start,
                    ));
                }
            };
            (next, block)
        }
    };
    Ok((next, block.with_span(Span::new(pos, next))))
}

/// `#+NAME: value` followed by a line break.
fn name_line(tokens: &[Token], pos: usize) -> PResult<String> {
    map(
        seq((
            kind(
                "#+NAME:",
                TokenKind::FileKeyword {
                    keyword: FileKeyword::Name,
                },
            ),
            collect_until(Token::ends_line),
            line_break,
        )),
        |(_, value, _)| concat(&value).trim().to_string(),
    )(tokens, pos)
}

fn opening(block: BlockType) -> impl Parser<Token> {
    kind("block start", TokenKind::BlockStart { block })
}

fn closing(block: BlockType) -> impl Parser<Token> {
    kind("block end", TokenKind::BlockEnd { block })
}

/// Opening line (returned as config text), verbatim body, closing line.
fn verbatim(block: BlockType) -> impl Parser<(String, String)> {
    move |tokens: &[Token], pos: usize| {
        let end_kind = TokenKind::BlockEnd {
            block: block.clone(),
        };
        let (next, (_, config, _, mut body, _, _)) = seq((
            opening(block.clone()),
            collect_until(Token::ends_line),
            line_break,
            collect_until(move |t: &Token| t.kind == end_kind),
            closing(block.clone()),
            zero_or_more(space),
        ))(tokens, pos)?;
        // the line break before the closing delimiter is not part of the body
        if body.last().is_some_and(Token::is_line_break) {
            body.pop();
        }
        Ok((next, (concat(&config), concat(&body))))
    }
}

fn container(block: BlockType) -> impl Parser<Vec<Chunk>> {
    map(
        seq((
            opening(block.clone()),
            collect_until(Token::ends_line),
            line_end,
            zero_or_more(chunk),
            closing(block),
            zero_or_more(space),
        )),
        |(_, _, _, body, _, _)| body,
    )
}

fn concat(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// `rust -n -l "(ref:%s)" :results output :exports both` into language,
/// switches and header arguments.
fn source_config(config: &str) -> (Option<String>, Vec<String>, IndexMap<String, String>) {
    let mut words = config.split_whitespace().peekable();
    let language = words
        .next_if(|w| !w.starts_with(['-', ':']))
        .map(str::to_string);
    let mut switches: Vec<String> = vec![];
    let mut header_args = IndexMap::new();
    while let Some(word) = words.next() {
        if let Some(key) = word.strip_prefix(':') {
            let mut value = vec![];
            while let Some(v) = words.next_if(|v| !v.starts_with(':')) {
                value.push(v);
            }
            header_args.insert(key.to_string(), value.join(" "));
        } else if word.starts_with('-') {
            switches.push(word.to_string());
        } else if let Some(last) = switches.last_mut() {
            // switch argument, e.g. the format of `-l`
            last.push(' ');
            last.push_str(word);
        }
    }
    (language, switches, header_args)
}
