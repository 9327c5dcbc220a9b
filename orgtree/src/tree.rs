//! Uniform read-only view over the document tree.
//!
//! [`NodeRef`] borrows any node, so generic passes (span checks, outlines,
//! statistics) can walk the tree without matching on every concrete type.

use crate::core::{
    Block, Chunk, Document, Heading, InlineElem, Line, ListItem, Options, Planning, Preamble,
    Preface, Properties, Section, Span, Spanned, Stamp, TableRow, Tags,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    Document(&'a Document),
    Preamble(&'a Preamble),
    Preface(&'a Preface),
    Section(&'a Section),
    Heading(&'a Heading),
    Planning(&'a Planning),
    Properties(&'a Properties),
    Tags(&'a Tags),
    Options(&'a Options),
    Stamp(&'a Stamp),
    Chunk(&'a Chunk),
    ListItem(&'a ListItem),
    TableRow(&'a TableRow),
    Line(&'a Line),
    Inline(&'a InlineElem),
}

impl<'a> NodeRef<'a> {
    pub fn span(&self) -> Span {
        match self {
            NodeRef::Document(n) => n.span(),
            NodeRef::Preamble(n) => n.span(),
            NodeRef::Preface(n) => n.span(),
            NodeRef::Section(n) => n.span(),
            NodeRef::Heading(n) => n.span(),
            NodeRef::Planning(n) => n.span(),
            NodeRef::Properties(n) => n.span(),
            NodeRef::Tags(n) => n.span(),
            NodeRef::Options(n) => n.span(),
            NodeRef::Stamp(n) => n.span(),
            NodeRef::Chunk(n) => n.span(),
            NodeRef::ListItem(n) => n.span(),
            NodeRef::TableRow(n) => n.span(),
            NodeRef::Line(n) => n.span(),
            NodeRef::Inline(n) => n.span(),
        }
    }

    /// Short name of the node type.
    pub fn kind(&self) -> &'static str {
        match self {
            NodeRef::Document(_) => "document",
            NodeRef::Preamble(_) => "preamble",
            NodeRef::Preface(_) => "preface",
            NodeRef::Section(_) => "section",
            NodeRef::Heading(_) => "heading",
            NodeRef::Planning(_) => "planning",
            NodeRef::Properties(_) => "properties",
            NodeRef::Tags(_) => "tags",
            NodeRef::Options(_) => "options",
            NodeRef::Stamp(_) => "timestamp",
            NodeRef::Chunk(chunk) => match chunk {
                Chunk::Paragraph(_) => "paragraph",
                Chunk::HorizontalRule(_) => "horizontal-rule",
                Chunk::CommentLine(_) => "comment-line",
                Chunk::Table(_) => "table",
                Chunk::Block(block) => block_kind(block),
                Chunk::List(_) => "list",
            },
            NodeRef::ListItem(_) => "list-item",
            NodeRef::TableRow(_) => "table-row",
            NodeRef::Line(_) => "line",
            NodeRef::Inline(elem) => match elem {
                InlineElem::Text { .. } => "text",
                InlineElem::Timestamp(_) => "timestamp",
                InlineElem::TimestampRange { .. } => "timestamp-range",
                InlineElem::Link(_) => "link",
                InlineElem::Hashtag { .. } => "hashtag",
                InlineElem::HashtagMetric { .. } => "hashtag-metric",
                InlineElem::Footnote { .. } => "footnote",
                InlineElem::Citation { .. } => "citation",
                InlineElem::InlineMath { .. } => "inline-math",
                InlineElem::InlineQuote { .. } => "inline-quote",
                InlineElem::Formatted { .. } => "formatted",
            },
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match *self {
            NodeRef::Document(doc) => {
                let mut out = vec![NodeRef::Preamble(&doc.preamble), NodeRef::Preface(&doc.preface)];
                out.extend(doc.sections.iter().map(NodeRef::Section));
                out
            }
            NodeRef::Preamble(p) => {
                let mut out: Vec<NodeRef<'a>> = vec![];
                out.extend(p.properties.as_ref().map(NodeRef::Properties));
                if !p.title.span.is_empty() {
                    out.push(NodeRef::Line(&p.title));
                }
                for tags in [&p.filetags, &p.tags].into_iter().flatten() {
                    out.push(NodeRef::Tags(tags));
                }
                for options in [&p.options, &p.pile].into_iter().flatten() {
                    out.push(NodeRef::Options(options));
                }
                sorted(out)
            }
            NodeRef::Preface(p) => p.body.iter().map(NodeRef::Chunk).collect(),
            NodeRef::Section(s) => {
                let mut out = vec![NodeRef::Heading(&s.heading)];
                out.extend(s.body.iter().map(NodeRef::Chunk));
                out.extend(s.children.iter().map(NodeRef::Section));
                out
            }
            NodeRef::Heading(h) => {
                let mut out = vec![NodeRef::Line(&h.title)];
                out.extend(h.tags.as_ref().map(NodeRef::Tags));
                out.extend(h.planning.as_ref().map(NodeRef::Planning));
                out.extend(h.properties.as_ref().map(NodeRef::Properties));
                out
            }
            NodeRef::Planning(p) => sorted(
                [&p.scheduled, &p.deadline, &p.closed]
                    .into_iter()
                    .flatten()
                    .map(NodeRef::Stamp)
                    .collect(),
            ),
            NodeRef::Properties(_) | NodeRef::Tags(_) | NodeRef::Options(_) | NodeRef::Stamp(_) => {
                vec![]
            }
            NodeRef::Chunk(chunk) => chunk_children(chunk),
            NodeRef::ListItem(item) => match item {
                ListItem::Plain { content, .. } => content.iter().map(NodeRef::Chunk).collect(),
                ListItem::Description {
                    description,
                    content,
                    ..
                } => description
                    .items
                    .iter()
                    .map(NodeRef::Inline)
                    .chain(content.iter().map(NodeRef::Chunk))
                    .collect(),
            },
            NodeRef::TableRow(row) => row.cells.iter().map(NodeRef::Line).collect(),
            NodeRef::Line(line) => line.items.iter().map(NodeRef::Inline).collect(),
            NodeRef::Inline(elem) => match elem {
                InlineElem::TimestampRange { start, end, .. } => {
                    vec![NodeRef::Stamp(start), NodeRef::Stamp(end)]
                }
                InlineElem::Link(link) => link.title.iter().map(NodeRef::Line).collect(),
                InlineElem::Footnote { body, .. } => vec![NodeRef::Line(body)],
                InlineElem::Formatted { content, .. } => {
                    content.iter().map(NodeRef::Inline).collect()
                }
                _ => vec![],
            },
        }
    }
}

fn block_kind(block: &Block) -> &'static str {
    match block {
        Block::Source(_) => "src-block",
        Block::Example(_) => "example-block",
        Block::Comment(_) => "comment-block",
        Block::Verse(_) => "verse-block",
        Block::Latex(_) => "latex-block",
        Block::Html(_) => "html-block",
        Block::Quote(_) => "quote-block",
        Block::Center(_) => "center-block",
        Block::Aside(_) => "aside-block",
        Block::PageIntro(_) => "page-intro-block",
        Block::Edits(_) => "edits-block",
        Block::Video(_) => "video-block",
    }
}

fn chunk_children(chunk: &Chunk) -> Vec<NodeRef<'_>> {
    match chunk {
        Chunk::Paragraph(p) => p.items.iter().map(NodeRef::Inline).collect(),
        Chunk::HorizontalRule(_) | Chunk::CommentLine(_) => vec![],
        Chunk::Table(table) => table
            .header
            .iter()
            .chain(table.groups.iter().flatten())
            .map(NodeRef::TableRow)
            .collect(),
        Chunk::Block(block) => block.body_chunks().iter().map(NodeRef::Chunk).collect(),
        Chunk::List(list) => list.items().iter().map(NodeRef::ListItem).collect(),
    }
}

fn sorted(mut nodes: Vec<NodeRef<'_>>) -> Vec<NodeRef<'_>> {
    nodes.sort_by_key(|n| n.span().start);
    nodes
}

/// Every node under `root`, `root` first, in pre-order.
pub fn walk(root: NodeRef<'_>) -> Vec<NodeRef<'_>> {
    let mut out = vec![];
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        stack.extend(node.children().into_iter().rev());
        out.push(node);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn preorder_kinds() {
        let parsed = parse("#+TITLE: T\n* H :x:\n- [[a][b]]\n").unwrap();
        let kinds: Vec<_> = walk(NodeRef::Document(&parsed.document))
            .iter()
            .map(NodeRef::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                "document", "preamble", "line", "text", "preface", "section", "heading", "line",
                "text", "tags", "list", "list-item", "paragraph", "link", "line", "text",
            ]
        );
    }

    #[test]
    fn children_are_ordered_and_contained() {
        let input = "#+FILETAGS: :a:\n#+TITLE: T\n* H\n:PROPERTIES:\n:B: 2\n:A: 1\n:B: 3\n:END:\n";
        let parsed = parse(input).unwrap();
        for node in walk(NodeRef::Document(&parsed.document)) {
            let mut last_end = node.span().start;
            for child in node.children() {
                assert!(node.span().contains(child.span()), "{} in {}", child.kind(), node.kind());
                assert!(child.span().start >= last_end, "{} out of order", child.kind());
                last_end = child.span().end;
            }
        }
    }
}
