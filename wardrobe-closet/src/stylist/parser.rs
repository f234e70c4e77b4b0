//! Reply parsing for outfit suggestions
//!
//! Free-text replies are expected to carry a fenced block holding a nested
//! list literal such as `[['a.jpg', 'b.jpg'], ['c.jpg']]`. The literal is read
//! by a small recursive-descent parser that only understands quoted strings,
//! lists and tuples. Names, calls, numbers and operators are rejected, so
//! nothing in a reply is ever evaluated.

use thiserror::Error;
use wardrobe_common::models::normalize_separators;

use super::Outfit;

const FENCE: &str = "```";
const MAX_DEPTH: usize = 32;

/// Why a reply could not be turned into outfits
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no fenced code block found in reply")]
    FenceNotFound,

    #[error("fenced code block is not closed")]
    UnterminatedFence,

    #[error("invalid literal at offset {offset}: {message}")]
    Literal { offset: usize, message: String },

    #[error("expected a list of outfits, each a list of image paths")]
    Shape,

    #[error("invalid JSON reply: {0}")]
    Json(String),
}

/// Parse a free-text reply into outfits
///
/// Uses the first fenced block; every path has backslashes turned into `/`.
pub fn parse_outfits(raw: &str) -> Result<Vec<Outfit>, ParseError> {
    let block = extract_fenced_block(raw)?;
    let value = parse_literal(block)?;
    into_outfits(value)
}

/// Parse a schema-constrained JSON reply (`[["a.jpg"], ...]`)
pub fn parse_structured(raw: &str) -> Result<Vec<Outfit>, ParseError> {
    let outfits: Vec<Vec<String>> =
        serde_json::from_str(raw.trim()).map_err(|e| ParseError::Json(e.to_string()))?;
    Ok(outfits
        .into_iter()
        .map(|outfit| outfit.iter().map(|p| normalize_separators(p)).collect())
        .collect())
}

/// Contents of the first fenced block, without its language tag
pub fn extract_fenced_block(raw: &str) -> Result<&str, ParseError> {
    let start = raw.find(FENCE).ok_or(ParseError::FenceNotFound)?;
    let after = &raw[start + FENCE.len()..];

    let body = match after.find('\n') {
        Some(newline) if is_info_string(&after[..newline]) => &after[newline + 1..],
        _ => after,
    };

    let end = body.find(FENCE).ok_or(ParseError::UnterminatedFence)?;
    Ok(body[..end].trim())
}

fn is_info_string(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.'))
}

/// A parsed literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Seq(Vec<Literal>),
}

/// Parse a literal made only of quoted strings, lists and tuples
pub fn parse_literal(source: &str) -> Result<Literal, ParseError> {
    let mut parser = LiteralParser { src: source, pos: 0 };
    let value = parser.value(0)?;
    parser.skip_trivia();
    if parser.pos < source.len() {
        return Err(parser.error("unexpected trailing content"));
    }
    Ok(value)
}

fn into_outfits(value: Literal) -> Result<Vec<Outfit>, ParseError> {
    let Literal::Seq(outfits) = value else {
        return Err(ParseError::Shape);
    };

    outfits
        .into_iter()
        .map(|outfit| match outfit {
            Literal::Seq(paths) => paths
                .into_iter()
                .map(|path| match path {
                    Literal::Str(s) => Ok(normalize_separators(&s)),
                    Literal::Seq(_) => Err(ParseError::Shape),
                })
                .collect::<Result<Outfit, ParseError>>(),
            Literal::Str(_) => Err(ParseError::Shape),
        })
        .collect()
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Literal {
            offset: self.pos,
            message: message.into(),
        }
    }

    /// Whitespace and `#` comments
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn value(&mut self, depth: usize) -> Result<Literal, ParseError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }

        self.skip_trivia();
        match self.peek() {
            Some('[') => self.sequence(']', depth),
            Some('(') => self.sequence(')', depth),
            Some(_) if self.at_string() => self.strings(),
            Some(c) => Err(self.error(format!(
                "unexpected {:?}; only quoted strings, lists and tuples are allowed",
                c
            ))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn sequence(&mut self, close: char, depth: usize) -> Result<Literal, ParseError> {
        self.bump();
        let mut items = Vec::new();
        let mut trailing_comma = false;

        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            if !items.is_empty() && !trailing_comma {
                return Err(self.error(format!("expected ',' or {:?}", close)));
            }

            items.push(self.value(depth + 1)?);

            self.skip_trivia();
            trailing_comma = self.peek() == Some(',');
            if trailing_comma {
                self.bump();
            }
        }

        // `('a')` is a parenthesised string, `('a',)` a one-element tuple
        if close == ')' && items.len() == 1 && !trailing_comma {
            return Ok(items.remove(0));
        }
        Ok(Literal::Seq(items))
    }

    /// A quote, optionally after a `u` or `r` prefix; `b` and `f` are not strings
    fn at_string(&self) -> bool {
        let mut chars = self.src[self.pos..].chars();
        match chars.next() {
            Some('\'' | '"') => true,
            Some('u' | 'U' | 'r' | 'R') => matches!(chars.next(), Some('\'' | '"')),
            _ => false,
        }
    }

    fn at_triple(&self, quote: char) -> bool {
        self.src[self.pos..].chars().take(3).filter(|&c| c == quote).count() == 3
    }

    /// One or more adjacent string literals, concatenated
    fn strings(&mut self) -> Result<Literal, ParseError> {
        let mut out = self.string()?;
        loop {
            let checkpoint = self.pos;
            self.skip_trivia();
            if self.at_string() {
                out.push_str(&self.string()?);
            } else {
                self.pos = checkpoint;
                return Ok(Literal::Str(out));
            }
        }
    }

    /// One string literal: optional `u`/`r` prefix, single or triple quotes
    fn string(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let raw = match self.peek() {
            Some('r' | 'R') => {
                self.bump();
                true
            }
            Some('u' | 'U') => {
                self.bump();
                false
            }
            _ => false,
        };

        let Some(quote) = self.peek() else {
            return Err(self.error("unexpected end of input"));
        };
        let triple = self.at_triple(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut out = String::new();
        loop {
            if triple && self.at_triple(quote) {
                self.pos += 3;
                return Ok(out);
            }
            match self.bump() {
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                }
                Some('\n') if !triple => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                }
                Some(c) if c == quote && !triple => return Ok(out),
                // Raw strings keep the backslash and the character after it
                Some('\\') if raw => {
                    out.push('\\');
                    if let Some(c) = self.bump() {
                        out.push(c);
                    }
                }
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        match self.bump() {
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\n') => {}
            Some('x') => out.push(self.hex_char(2)?),
            Some('u') => out.push(self.hex_char(4)?),
            // Unknown escapes keep their backslash (`'a\b.jpg'` style paths)
            Some(c) => {
                out.push('\\');
                out.push(c);
            }
            None => return Err(self.error("unterminated string")),
        }
        Ok(())
    }

    fn hex_char(&mut self, digits: usize) -> Result<char, ParseError> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .filter(|h| h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("invalid hex escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid hex escape"))?;
        let c = char::from_u32(code).ok_or_else(|| self.error("invalid character escape"))?;
        self.pos = end;
        Ok(c)
    }
}
