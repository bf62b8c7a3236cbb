//! Token view of the object literal, and the passes that turn it into JSON.
//!
//! Whitespace before each token is kept so the JSON handed to the decoder
//! has the same line layout as the source, which keeps decode errors
//! pointing at recognizable lines.

use super::{ParseError, ParseStage, Position};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// One of `{ } [ ] : ,`
    Punct(char),
    /// Quoted text, quotes removed.
    Str(String),
    /// Anything else: numbers, bare keys, `true`, stray words.
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Whitespace preceding the token in the source.
    pub leading: String,
    /// Byte offset of the token in the source.
    pub offset: usize,
}

impl Token {
    fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }
}

fn is_punct(c: char) -> bool {
    matches!(c, '{' | '}' | '[' | ']' | ':' | ',')
}

fn is_quote(c: char) -> bool {
    c == '\'' || c == '"'
}

/// Split the object literal into tokens.
///
/// Single and double quotes are interchangeable and a string ends at the next
/// quote of either kind. There are no escape sequences.
pub fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut leading = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c.is_whitespace() {
            leading.push(c);
            continue;
        }

        let kind = if is_punct(c) {
            TokenKind::Punct(c)
        } else if is_quote(c) {
            let mut content = String::new();
            let mut closed = false;
            for (_, next) in chars.by_ref() {
                if is_quote(next) {
                    closed = true;
                    break;
                }
                content.push(next);
            }
            if !closed {
                return Err(ParseError {
                    stage: ParseStage::Tokenize,
                    message: "Unterminated string".to_string(),
                    text: text.to_string(),
                    position: Some(Position::of_offset(text, offset)),
                });
            }
            TokenKind::Str(content)
        } else {
            let mut word = String::from(c);
            while let Some(&(_, next)) = chars.peek() {
                if next.is_whitespace() || is_punct(next) || is_quote(next) {
                    break;
                }
                word.push(next);
                chars.next();
            }
            TokenKind::Word(word)
        };

        tokens.push(Token {
            kind,
            leading: std::mem::take(&mut leading),
            offset,
        });
    }

    Ok(tokens)
}

/// Turn every bare word that is directly followed by `:` into a string.
pub fn quote_keys(mut tokens: Vec<Token>) -> Vec<Token> {
    for i in 0..tokens.len().saturating_sub(1) {
        if !tokens[i + 1].is_punct(':') {
            continue;
        }
        if let TokenKind::Word(word) = &mut tokens[i].kind {
            let key = std::mem::take(word);
            tokens[i].kind = TokenKind::Str(key);
        }
    }
    tokens
}

/// Remove commas that sit directly before a closing `]` or `}`.
pub fn drop_trailing_commas(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let closing = token.is_punct(']') || token.is_punct('}');
        if closing && out.last().is_some_and(|prev| prev.is_punct(',')) {
            out.pop();
        }
        out.push(token);
    }
    out
}

/// Append `s` as a quoted JSON string.
fn push_json_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Render tokens as JSON text.
pub fn to_json(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&token.leading);
        match &token.kind {
            TokenKind::Punct(c) => out.push(*c),
            TokenKind::Str(s) => push_json_string(&mut out, s),
            TokenKind::Word(w) => out.push_str(w),
        }
    }
    out
}
