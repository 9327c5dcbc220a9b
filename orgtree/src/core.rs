//! Core domain model: spans, value objects shared by tokens and nodes, the parsed
//! document tree, diagnostics and errors.
//!
//! Every node is immutable once built and carries the [`Span`] of tokens it was
//! built from. Extending a node's span produces a new node (see the `with_span`
//! constructors) instead of mutating a shared one.

use crate::lexer::Token;
use chrono::{NaiveDate, NaiveTime};
use indexmap::IndexMap;
use serde::Serialize;
use std::ops::Range;

/* ------------------------------- Spans ------------------------------- */

/// Half-open range `[start, end)` of token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} after end {end}");
        Self { start, end }
    }

    /// Zero-width span at `at`.
    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The tokens covered by this span. Out-of-range spans clamp to the slice.
    pub fn tokens<'t>(&self, tokens: &'t [Token]) -> &'t [Token] {
        let end = self.end.min(tokens.len());
        let start = self.start.min(end);
        &tokens[start..end]
    }

    /// Concatenated source text of the covered tokens.
    pub fn text(&self, tokens: &[Token]) -> String {
        self.tokens(tokens).iter().map(|t| t.text.as_str()).collect()
    }

    /// Byte range in the source covered by this span, if it covers any token.
    pub fn byte_range(&self, tokens: &[Token]) -> Option<Range<usize>> {
        let covered = self.tokens(tokens);
        let first = covered.first()?;
        let last = covered.last()?;
        Some(first.range.start..last.range.end)
    }
}

/// Anything built from a contiguous run of tokens.
pub trait Spanned {
    fn span(&self) -> Span;
}

/* ---------------------------- Value Objects ---------------------------- */

/// A date, optionally with a time or time range and a repeater cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timestamp {
    /// `<...>` stamps are active, `[...]` stamps are inactive.
    pub active: bool,
    pub date: NaiveDate,
    /// Whether a weekday abbreviation was written after the date.
    pub weekday_shown: bool,
    pub time: Option<TimeRange>,
    /// Repeater cookie as written, e.g. `+1w`, `.+2d`, `.1w`.
    pub repeater: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: Option<NaiveTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckState {
    Unchecked, // [ ]
    Checked,   // [X]
    Partial,   // [-]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnorderedMarker {
    Dash,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderedMarker {
    Period,
    Parenthesis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanningKeyword {
    Scheduled,
    Deadline,
    Closed,
}

impl PlanningKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanningKeyword::Scheduled => "SCHEDULED:",
            PlanningKeyword::Deadline => "DEADLINE:",
            PlanningKeyword::Closed => "CLOSED:",
        }
    }
}

/// Kind of a `#+BEGIN_x` / `#+END_x` delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum BlockType {
    Src,
    Example,
    Quote,
    Center,
    Verse,
    Html,
    Latex,
    Aside,
    PageIntro,
    Edits,
    Comment,
    Video,
    Other(String),
}

impl BlockType {
    /// Case-insensitive lookup of the word following `BEGIN_` / `END_`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "src" => BlockType::Src,
            "example" => BlockType::Example,
            "quote" => BlockType::Quote,
            "center" => BlockType::Center,
            "verse" => BlockType::Verse,
            "html" => BlockType::Html,
            "latex" => BlockType::Latex,
            "aside" => BlockType::Aside,
            "page-intro" | "page_intro" => BlockType::PageIntro,
            "edits" => BlockType::Edits,
            "comment" => BlockType::Comment,
            "video" => BlockType::Video,
            _ => BlockType::Other(name.to_string()),
        }
    }

    /// Recognized blocks terminate paragraphs and have a grammar rule.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, BlockType::Other(_))
    }
}

/// Kind of a `#+KEY:` file keyword line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum FileKeyword {
    Title,
    Author,
    Email,
    Date,
    Category,
    FileTags,
    Tags,
    Options,
    Pile,
    Name,
    TableFormula,
    Other(String),
}

impl FileKeyword {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "title" => FileKeyword::Title,
            "author" => FileKeyword::Author,
            "email" => FileKeyword::Email,
            "date" => FileKeyword::Date,
            "category" => FileKeyword::Category,
            "filetags" => FileKeyword::FileTags,
            "tags" => FileKeyword::Tags,
            "options" => FileKeyword::Options,
            "pile" => FileKeyword::Pile,
            "name" => FileKeyword::Name,
            "tblfm" => FileKeyword::TableFormula,
            _ => FileKeyword::Other(name.to_string()),
        }
    }
}

/* ------------------------------ Document ------------------------------ */

/// Root of the tree: preamble, preface, then top-level sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub preamble: Preamble,
    pub preface: Preface,
    pub sections: Vec<Section>,
    pub span: Span,
}

/// File keywords (`#+TITLE:` and friends), optionally led by a property drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preamble {
    pub title: Line,
    pub author: Option<String>,
    pub email: Option<String>,
    pub date: Option<NaiveDate>,
    pub category: Option<String>,
    pub filetags: Option<Tags>,
    /// `#+TAGS:` declares the tag vocabulary; kept apart from `#+FILETAGS:`.
    pub tags: Option<Tags>,
    pub options: Option<Options>,
    pub pile: Option<Options>,
    pub properties: Option<Properties>,
    pub span: Span,
}

impl Preamble {
    /// Preamble of a document that has none.
    pub fn empty(at: usize) -> Self {
        Self {
            title: Line::empty(at),
            author: None,
            email: None,
            date: None,
            category: None,
            filetags: None,
            tags: None,
            options: None,
            pile: None,
            properties: None,
            span: Span::empty(at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tags {
    pub tags: Vec<String>,
    pub span: Span,
}

/// `key:value` pairs from `#+OPTIONS:` or `#+PILE:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Options {
    pub map: IndexMap<String, String>,
    pub span: Span,
}

/// Content between the preamble and the first heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preface {
    pub body: Vec<Chunk>,
    pub span: Span,
}

/// A heading, the chunks under it, and its nested subsections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub heading: Heading,
    pub body: Vec<Chunk>,
    pub children: Vec<Section>,
    pub span: Span,
}

impl Section {
    pub fn level(&self) -> usize {
        self.heading.level
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: usize,
    pub todo: Option<TodoState>,
    pub priority: Option<Priority>,
    pub title: Line,
    pub tags: Option<Tags>,
    pub planning: Option<Planning>,
    pub properties: Option<Properties>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoState {
    pub keyword: String,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Priority {
    pub value: char,
}

/// `SCHEDULED:` / `DEADLINE:` / `CLOSED:` entries. A repeated keyword keeps the last stamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Planning {
    pub scheduled: Option<Stamp>,
    pub deadline: Option<Stamp>,
    pub closed: Option<Stamp>,
    pub span: Span,
}

/// Property drawer: insertion-ordered key to raw value. A key without a value
/// maps to an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Properties {
    pub map: IndexMap<String, String>,
    pub span: Span,
}

/// A timestamp token lifted into the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stamp {
    pub timestamp: Timestamp,
    pub span: Span,
}

/* ------------------------------- Chunks ------------------------------- */

/// Body-level unit of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Chunk {
    Paragraph(Paragraph),
    HorizontalRule(HorizontalRule),
    CommentLine(CommentLine),
    Table(Table),
    Block(Block),
    List(List),
}

impl Chunk {
    /// Same chunk covering `span` (used to absorb trailing blank lines).
    pub fn with_span(self, span: Span) -> Self {
        match self {
            Chunk::Paragraph(p) => Chunk::Paragraph(Paragraph { span, ..p }),
            Chunk::HorizontalRule(_) => Chunk::HorizontalRule(HorizontalRule { span }),
            Chunk::CommentLine(c) => Chunk::CommentLine(CommentLine { span, ..c }),
            Chunk::Table(t) => Chunk::Table(Table { span, ..t }),
            Chunk::Block(b) => Chunk::Block(b.with_span(span)),
            Chunk::List(l) => Chunk::List(l.with_span(span)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub items: Vec<InlineElem>,
    pub span: Span,
}

impl Paragraph {
    pub fn plain_text(&self) -> String {
        plain_text_of(&self.items)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HorizontalRule {
    pub span: Span,
}

/// `# some remark`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentLine {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    /// (rows, columns); rows count the header and every data row.
    pub dimensions: (usize, usize),
    pub header: Option<TableRow>,
    /// Data rows, split into groups by rule lines.
    pub groups: Vec<Vec<TableRow>>,
    /// Text of a trailing `#+TBLFM:` line.
    pub formula: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub cells: Vec<Line>,
    pub span: Span,
}

/* ------------------------------- Blocks ------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Block {
    Source(SourceBlock),
    Example(RawBlock),
    Comment(RawBlock),
    Verse(RawBlock),
    Latex(RawBlock),
    Html(HtmlBlock),
    Quote(ContainerBlock),
    Center(ContainerBlock),
    Aside(ContainerBlock),
    PageIntro(ContainerBlock),
    Edits(ContainerBlock),
    Video(ContainerBlock),
}

impl Block {
    pub fn with_span(self, span: Span) -> Self {
        match self {
            Block::Source(b) => Block::Source(SourceBlock { span, ..b }),
            Block::Example(b) => Block::Example(RawBlock { span, ..b }),
            Block::Comment(b) => Block::Comment(RawBlock { span, ..b }),
            Block::Verse(b) => Block::Verse(RawBlock { span, ..b }),
            Block::Latex(b) => Block::Latex(RawBlock { span, ..b }),
            Block::Html(b) => Block::Html(HtmlBlock { span, ..b }),
            Block::Quote(b) => Block::Quote(ContainerBlock { span, ..b }),
            Block::Center(b) => Block::Center(ContainerBlock { span, ..b }),
            Block::Aside(b) => Block::Aside(ContainerBlock { span, ..b }),
            Block::PageIntro(b) => Block::PageIntro(ContainerBlock { span, ..b }),
            Block::Edits(b) => Block::Edits(ContainerBlock { span, ..b }),
            Block::Video(b) => Block::Video(ContainerBlock { span, ..b }),
        }
    }

    /// Nested chunks of container blocks; empty for raw blocks.
    pub fn body_chunks(&self) -> &[Chunk] {
        match self {
            Block::Quote(b)
            | Block::Center(b)
            | Block::Aside(b)
            | Block::PageIntro(b)
            | Block::Edits(b)
            | Block::Video(b) => &b.body,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceBlock {
    pub language: Option<String>,
    /// Words such as `-n` or `-r` from the opening line.
    pub switches: Vec<String>,
    pub header_args: IndexMap<String, String>,
    pub body: String,
    pub name: Option<String>,
    pub span: Span,
}

/// Block whose body is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawBlock {
    pub body: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HtmlBlock {
    pub body: String,
    pub name: Option<String>,
    pub span: Span,
}

/// Block whose body is parsed as nested chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerBlock {
    pub body: Vec<Chunk>,
    pub span: Span,
}

/* -------------------------------- Lists -------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum List {
    Unordered(UnorderedList),
    Ordered(OrderedList),
}

impl List {
    pub fn items(&self) -> &[ListItem] {
        match self {
            List::Unordered(l) => &l.items,
            List::Ordered(l) => &l.items,
        }
    }

    pub fn with_span(self, span: Span) -> Self {
        match self {
            List::Unordered(l) => List::Unordered(UnorderedList { span, ..l }),
            List::Ordered(l) => List::Ordered(OrderedList { span, ..l }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnorderedList {
    pub marker: UnorderedMarker,
    pub items: Vec<ListItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedList {
    pub marker: OrderedMarker,
    pub items: Vec<ListItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ListItem {
    /// `- [ ] content`
    Plain {
        checkbox: Option<CheckState>,
        content: Vec<Chunk>,
        span: Span,
    },
    /// `- term :: description`
    Description {
        term: String,
        description: Paragraph,
        content: Vec<Chunk>,
        span: Span,
    },
}

impl ListItem {
    pub fn checkbox(&self) -> Option<CheckState> {
        match self {
            ListItem::Plain { checkbox, .. } => *checkbox,
            ListItem::Description { .. } => None,
        }
    }

    pub fn content(&self) -> &[Chunk] {
        match self {
            ListItem::Plain { content, .. } | ListItem::Description { content, .. } => content,
        }
    }
}

/* -------------------------------- Inline -------------------------------- */

/// A single line of inline content (titles, property values, table cells).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub items: Vec<InlineElem>,
    pub span: Span,
}

impl Line {
    pub fn empty(at: usize) -> Self {
        Self {
            items: vec![],
            span: Span::empty(at),
        }
    }

    pub fn plain_text(&self) -> String {
        plain_text_of(&self.items)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FormatStyle {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    Verbatim,
    Code,
}

impl FormatStyle {
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "*" => Some(FormatStyle::Bold),
            "/" => Some(FormatStyle::Italic),
            "_" => Some(FormatStyle::Underline),
            "+" => Some(FormatStyle::StrikeThrough),
            "=" => Some(FormatStyle::Verbatim),
            "~" => Some(FormatStyle::Code),
            _ => None,
        }
    }

    /// Verbatim and code hold their content uninterpreted.
    pub fn is_literal(&self) -> bool {
        matches!(self, FormatStyle::Verbatim | FormatStyle::Code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MathStyle {
    /// `\( .. \)` or `\[ .. \]`
    Ams,
    /// `$ .. $`
    Dollar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuoteKind {
    Html,
    Latex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Part of the target before the first `:`, if any.
    pub scheme: Option<String>,
    pub target: String,
    pub title: Option<Line>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InlineElem {
    Text {
        text: String,
        span: Span,
    },
    Timestamp(Stamp),
    TimestampRange {
        start: Stamp,
        end: Stamp,
        span: Span,
    },
    Link(Link),
    Hashtag {
        tag: String,
        span: Span,
    },
    /// `#tag(value)`
    HashtagMetric {
        tag: String,
        value: String,
        span: Span,
    },
    /// `[fn:key]`, `[fn:key:body]` or `[fn::body]`.
    Footnote {
        key: Option<String>,
        body: Line,
        span: Span,
    },
    Citation {
        cite: String,
        span: Span,
    },
    InlineMath {
        style: MathStyle,
        text: String,
        span: Span,
    },
    InlineQuote {
        kind: QuoteKind,
        text: String,
        span: Span,
    },
    Formatted {
        style: FormatStyle,
        content: Vec<InlineElem>,
        span: Span,
    },
}

impl InlineElem {
    /// Plain text approximation, dropping markup.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        push_plain_text(self, &mut out);
        out
    }
}

fn plain_text_of(items: &[InlineElem]) -> String {
    let mut out = String::new();
    for item in items {
        push_plain_text(item, &mut out);
    }
    out
}

fn push_plain_text(item: &InlineElem, out: &mut String) {
    match item {
        InlineElem::Text { text, .. } => out.push_str(text),
        InlineElem::Timestamp(stamp) => out.push_str(&stamp.timestamp.to_string()),
        InlineElem::TimestampRange { start, end, .. } => {
            out.push_str(&start.timestamp.to_string());
            out.push_str("--");
            out.push_str(&end.timestamp.to_string());
        }
        InlineElem::Link(Link {
            title: Some(title), ..
        }) => out.push_str(&title.plain_text()),
        InlineElem::Link(Link {
            scheme, target, ..
        }) => {
            if let Some(scheme) = scheme {
                out.push_str(scheme);
                out.push(':');
            }
            out.push_str(target);
        }
        InlineElem::Hashtag { tag, .. } => {
            out.push('#');
            out.push_str(tag);
        }
        InlineElem::HashtagMetric { tag, value, .. } => {
            out.push('#');
            out.push_str(tag);
            out.push('(');
            out.push_str(value);
            out.push(')');
        }
        InlineElem::Footnote { key, .. } => {
            if let Some(key) = key {
                out.push_str(key);
            }
        }
        InlineElem::Citation { cite, .. } => out.push_str(cite),
        InlineElem::InlineMath { text, .. } | InlineElem::InlineQuote { text, .. } => {
            out.push_str(text)
        }
        InlineElem::Formatted { content, .. } => {
            for c in content {
                push_plain_text(c, out);
            }
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (open, close) = if self.active { ('<', '>') } else { ('[', ']') };
        write!(f, "{open}{}", self.date.format("%Y-%m-%d"))?;
        if self.weekday_shown {
            write!(f, " {}", self.date.format("%a"))?;
        }
        if let Some(time) = &self.time {
            write!(f, " {}", time.start.format("%H:%M"))?;
            if let Some(end) = time.end {
                write!(f, "-{}", end.format("%H:%M"))?;
            }
        }
        if let Some(repeater) = &self.repeater {
            write!(f, " {repeater}")?;
        }
        write!(f, "{close}")
    }
}

/* ---------------------------- Spanned impls ---------------------------- */

macro_rules! impl_spanned {
    ($($ty:ty),* $(,)?) => {
        $(impl Spanned for $ty {
            fn span(&self) -> Span {
                self.span
            }
        })*
    };
}

impl_spanned!(
    Document,
    Preamble,
    Tags,
    Options,
    Preface,
    Section,
    Heading,
    Planning,
    Properties,
    Stamp,
    Paragraph,
    HorizontalRule,
    CommentLine,
    Table,
    TableRow,
    SourceBlock,
    RawBlock,
    HtmlBlock,
    ContainerBlock,
    UnorderedList,
    OrderedList,
    Line,
    Link,
);

impl Spanned for Chunk {
    fn span(&self) -> Span {
        match self {
            Chunk::Paragraph(p) => p.span,
            Chunk::HorizontalRule(h) => h.span,
            Chunk::CommentLine(c) => c.span,
            Chunk::Table(t) => t.span,
            Chunk::Block(b) => b.span(),
            Chunk::List(l) => l.span(),
        }
    }
}

impl Spanned for Block {
    fn span(&self) -> Span {
        match self {
            Block::Source(b) => b.span,
            Block::Example(b) | Block::Comment(b) | Block::Verse(b) | Block::Latex(b) => b.span,
            Block::Html(b) => b.span,
            Block::Quote(b)
            | Block::Center(b)
            | Block::Aside(b)
            | Block::PageIntro(b)
            | Block::Edits(b)
            | Block::Video(b) => b.span,
        }
    }
}

impl Spanned for List {
    fn span(&self) -> Span {
        match self {
            List::Unordered(l) => l.span,
            List::Ordered(l) => l.span,
        }
    }
}

impl Spanned for ListItem {
    fn span(&self) -> Span {
        match self {
            ListItem::Plain { span, .. } | ListItem::Description { span, .. } => *span,
        }
    }
}

impl Spanned for InlineElem {
    fn span(&self) -> Span {
        match self {
            InlineElem::Timestamp(stamp) => stamp.span,
            InlineElem::Link(link) => link.span,
            InlineElem::Text { span, .. }
            | InlineElem::TimestampRange { span, .. }
            | InlineElem::Hashtag { span, .. }
            | InlineElem::HashtagMetric { span, .. }
            | InlineElem::Footnote { span, .. }
            | InlineElem::Citation { span, .. }
            | InlineElem::InlineMath { span, .. }
            | InlineElem::InlineQuote { span, .. }
            | InlineElem::Formatted { span, .. } => *span,
        }
    }
}

/* ----------------------------- Diagnostics ----------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

/// Non-fatal finding reported next to a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Byte range in the source text.
    pub range: Range<usize>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, range: Range<usize>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            range,
        }
    }
}

/* ---------------------------- Errors (domain) ---------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("parse failed at line {line} (byte {offset}) near {found:?}: {message}")]
    Grammar {
        message: String,
        offset: usize,
        line: usize,
        found: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn span_containment_and_emptiness() {
        let outer = Span::new(2, 10);
        assert!(outer.contains(Span::new(2, 10)));
        assert!(outer.contains(Span::empty(5)));
        assert!(!outer.contains(Span::new(1, 4)));
        assert!(Span::empty(3).is_empty());
        assert_eq!(outer.len(), 8);
    }

    #[test]
    fn block_types_are_case_insensitive() {
        assert_eq!(BlockType::from_name("SRC"), BlockType::Src);
        assert_eq!(BlockType::from_name("page-intro"), BlockType::PageIntro);
        assert_eq!(
            BlockType::from_name("details"),
            BlockType::Other("details".into())
        );
        assert!(!BlockType::from_name("details").is_recognized());
    }

    #[test]
    fn timestamp_display_keeps_written_parts() {
        let ts = Timestamp {
            active: true,
            date: NaiveDate::from_ymd_opt(2023, 10, 27).unwrap(),
            weekday_shown: true,
            time: Some(TimeRange {
                start: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
                end: None,
            }),
            repeater: Some(".1w".into()),
        };
        assert_eq!(ts.to_string(), "<2023-10-27 Fri 10:30 .1w>");
    }

    #[test]
    fn chunk_with_span_rebuilds_node() {
        let para = Chunk::Paragraph(Paragraph {
            items: vec![],
            span: Span::new(1, 2),
        });
        let wider = para.clone().with_span(Span::new(1, 4));
        assert_eq!(wider.span(), Span::new(1, 4));
        assert_eq!(para.span(), Span::new(1, 2));
    }
}
