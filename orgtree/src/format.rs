//! Text re-flow applied before lexing when `ParserConfig::unfill` is set.

use nom::{
    IResult,
    branch::alt,
    character::complete::{char, digit1, one_of},
    combinator::recognize,
    error::VerboseError,
    multi::many1_count,
    sequence::pair,
};

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Line prefixes that must never be merged into the line before them.
fn structural_marker(i: &str) -> PResult<'_, &str> {
    alt((
        recognize(one_of("#:|+-")),
        recognize(pair(digit1, char('.'))),
        recognize(pair(many1_count(char('*')), char(' '))),
    ))(i)
}

fn is_structural(line: &str) -> bool {
    structural_marker(line).is_ok()
}

/// Joins runs of hard-wrapped prose lines with single spaces.
///
/// Blank lines and lines starting with a structural marker (`#`, `:`, `|`,
/// `+`, `-`, `N.`, heading stars) are kept as they are and end the current
/// run. Line endings are normalised to `\n`.
pub fn unfill_text(text: &str) -> String {
    let mut out: Vec<String> = vec![];
    let mut buffer = String::new();

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if is_structural(line) || line.trim().is_empty() {
            if !buffer.is_empty() {
                out.push(std::mem::take(&mut buffer));
            }
            out.push(line.to_string());
        } else {
            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(line);
        }
    }
    if !buffer.is_empty() {
        out.push(buffer);
    }
    log::trace!("unfilled {} bytes into {} lines", text.len(), out.len());
    out.join("\n")
}
