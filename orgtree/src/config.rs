//! Parser configuration. Only the lexer reads it; the grammar is a pure function of tokens.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Keywords recognised as open TODO states after heading stars.
    pub todo_keywords: Vec<String>,
    /// Keywords recognised as finished states.
    pub done_keywords: Vec<String>,
    /// Re-flow hard-wrapped prose before lexing.
    pub unfill: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            todo_keywords: vec!["TODO".into(), "NEXT".into(), "WAIT".into()],
            done_keywords: vec!["DONE".into(), "CANCELLED".into()],
            unfill: false,
        }
    }
}

impl ParserConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("decoding config {:?}", path))
    }

    /// `Some(done)` when `word` is a configured keyword.
    pub fn todo_state(&self, word: &str) -> Option<bool> {
        if self.done_keywords.iter().any(|k| k == word) {
            Some(true)
        } else if self.todo_keywords.iter().any(|k| k == word) {
            Some(false)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_vocabulary() {
        let config = ParserConfig::default();
        assert_eq!(config.todo_state("TODO"), Some(false));
        assert_eq!(config.todo_state("DONE"), Some(true));
        assert_eq!(config.todo_state("todo"), None);
    }

    #[test]
    fn partial_json_keeps_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("orgtree.json");
        let mut f = fs::File::create(&path)?;
        writeln!(f, r#"{{ "todo_keywords": ["OPEN"], "unfill": true }}"#)?;

        let config = ParserConfig::from_json_file(&path)?;
        assert_eq!(config.todo_keywords, vec!["OPEN".to_string()]);
        assert_eq!(config.done_keywords, ParserConfig::default().done_keywords);
        assert!(config.unfill);
        Ok(())
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ParserConfig::from_json_file(Path::new("/nonexistent/orgtree.json"))
            .expect_err("missing file");
        assert!(format!("{err:#}").contains("orgtree.json"));
    }
}
