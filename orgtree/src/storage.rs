//! Parsing seam used by the CLI and other callers that work with files.

use crate::document::ParsedDocument;
use anyhow::Result;
use std::path::Path;

/// Parsing is independent of where the text comes from.
pub trait OrgParser {
    fn parse_str(&self, text: &str) -> Result<ParsedDocument>;

    fn parse_file(&self, abs_path: &Path) -> Result<ParsedDocument>;
}
