//! Reader and writer for the pattern file dialect.
//!
//! The pattern file holds a single parenthesized object literal with
//! unquoted keys, single-quoted strings, trailing commas and `//` line
//! comments:
//!
//! ```text
//! // description
//! ({
//!     bpm: 30,
//!     melody: { notes: ['C5', '~'], ... },
//! })
//! ```
//!
//! Only the shape [`render`] produces (plus small hand edits) is supported.
//! Reading runs a fixed sequence of passes, each of which can be tested on
//! its own: [`strip_comments`], [`extract_object`], [`token::tokenize`],
//! [`token::quote_keys`], [`token::drop_trailing_commas`] and finally a
//! strict JSON decode.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub mod render;
pub mod token;

pub use render::{HEADER, render, render_at, render_body};

lazy_static! {
    static ref RE_OBJECT: Regex = Regex::new(r"(?s)\(\s*\{.*\}\s*\)").unwrap();
    static ref RE_TIMESTAMP: Regex = Regex::new(r"(?m)^\s*//\s*TIMESTAMP:\s*(.+)$").unwrap();
}

/// Which pass rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStage {
    Extract,
    Tokenize,
    Decode,
}

impl std::fmt::Display for ParseStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseStage::Extract => f.write_str("extract"),
            ParseStage::Tokenize => f.write_str("tokenize"),
            ParseStage::Decode => f.write_str("decode"),
        }
    }
}

/// 1-based line and column inside [`ParseError::text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Position of a byte offset within `text`.
    pub fn of_offset(text: &str, offset: usize) -> Self {
        let before = &text[..offset.min(text.len())];
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        Position { line, column }
    }
}

/// Error type for parsing failures.
#[derive(Debug, Clone, Serialize)]
pub struct ParseError {
    pub stage: ParseStage,
    pub message: String,
    /// The text as it looked when the failing pass ran.
    pub text: String,
    pub position: Option<Position>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.position {
            Some(pos) => write!(
                f,
                "Could not parse pattern ({} at line {} column {}): {}",
                self.stage, pos.line, pos.column, self.message
            ),
            None => write!(f, "Could not parse pattern ({}): {}", self.stage, self.message),
        }
    }
}

impl std::error::Error for ParseError {}

/// Remove `//` comments. Each line is cut at its first `//`; line breaks are
/// kept so positions in later passes still line up with the source.
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| match line.find("//") {
            Some(at) => &line[..at],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find the parenthesized object literal and return it without the
/// parentheses. The match runs from the first `(` that opens `{` to the last
/// `}` closed by `)`.
pub fn extract_object(text: &str) -> Result<&str, ParseError> {
    let found = RE_OBJECT.find(text).ok_or_else(|| ParseError {
        stage: ParseStage::Extract,
        message: "Could not find pattern object in file".to_string(),
        text: text.to_string(),
        position: None,
    })?;
    let literal = found.as_str();
    Ok(&literal[1..literal.len() - 1])
}

/// Parse dialect text into an untyped record. Run the result through
/// [`crate::schema::validate`] to get a [`crate::Pattern`].
pub fn parse(raw: &str) -> Result<Value, ParseError> {
    let stripped = strip_comments(raw);
    let object = extract_object(stripped.trim())?;

    let tokens = token::tokenize(object)?;
    let tokens = token::quote_keys(tokens);
    let tokens = token::drop_trailing_commas(tokens);
    let json = token::to_json(&tokens);

    serde_json::from_str(&json).map_err(|err| {
        debug!("pattern JSON failed to decode:\n{}", json);
        ParseError {
            stage: ParseStage::Decode,
            message: err.to_string(),
            position: Some(Position {
                line: err.line(),
                column: err.column(),
            }),
            text: json,
        }
    })
}

/// The `TIMESTAMP:` comment value, if the file carries one.
pub fn last_edited(raw: &str) -> Option<String> {
    RE_TIMESTAMP
        .captures(raw)
        .map(|caps| caps[1].trim().to_string())
}

/// The edit description comment: the first comment line before the object
/// that is neither the file header nor the timestamp.
pub fn description(raw: &str) -> Option<String> {
    let header = HEADER.trim_start_matches("//").trim();
    raw.lines()
        .take_while(|line| !line.trim_start().starts_with('('))
        .filter_map(|line| line.trim().strip_prefix("//"))
        .map(str::trim)
        .find(|text| !text.is_empty() && !text.starts_with("TIMESTAMP:") && *text != header)
        .map(str::to_string)
}
