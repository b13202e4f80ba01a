//! XML tokenizer - single forward pass over the input
//!
//! Pull-parser that turns raw XML text into a token stream:
//! - Element open/close/self-close tags
//! - Attributes (emitted after the tag-open token they belong to)
//! - Text content (entity-decoded; CDATA sections yield raw text)
//! - Comments
//!
//! XML declarations, DOCTYPE declarations and processing instructions are
//! consumed and skipped. The stream is finite and ends with an `Eof` token;
//! it cannot be restarted.

use super::entities::decode_text;
use super::scanner::{is_name_start_char, Scanner};
use crate::error::{Error, Result};
use std::borrow::Cow;
use std::collections::VecDeque;

/// A lexed token with the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub position: usize,
}

/// Token kinds produced by the tokenizer.
///
/// A self-closing tag `<b x="1"/>` is emitted as `TagOpen("b")`, its
/// attributes, then `TagSelfClose("b")`, so attributes always follow the
/// open token of the element they belong to.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    TagOpen(&'a str),
    TagClose(&'a str),
    TagSelfClose(&'a str),
    Attribute { name: &'a str, value: Cow<'a, str> },
    Text(Cow<'a, str>),
    Comment(&'a str),
    Eof,
}

/// XML tokenizer implementing a pull-parser pattern
pub struct Tokenizer<'a> {
    input: &'a str,
    scanner: Scanner<'a>,
    /// Tokens already lexed but not yet handed out (a tag and its
    /// attributes are lexed together).
    queue: VecDeque<Token<'a>>,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for the given input
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            input,
            scanner: Scanner::new(input.as_bytes()),
            queue: VecDeque::new(),
            done: false,
        }
    }

    /// Get the next token. Returns `Eof` at end of input (and on every call
    /// after that).
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Ok(token);
            }
            if self.done || self.scanner.is_eof() {
                self.done = true;
                return Ok(Token {
                    kind: TokenKind::Eof,
                    position: self.scanner.position(),
                });
            }

            match self.scanner.peek() {
                Some(b'<') => self.lex_markup()?,
                Some(_) => self.lex_text()?,
                None => {}
            }
        }
    }

    /// Borrow a str slice of the input
    fn text(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    /// Lex text content up to the next tag start
    fn lex_text(&mut self) -> Result<()> {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(self.input.len());
        self.scanner.set_position(end);

        let content = decode_text(self.text(start, end), start)?;
        self.queue.push_back(Token {
            kind: TokenKind::Text(content),
            position: start,
        });
        Ok(())
    }

    /// Lex markup starting with '<'
    fn lex_markup(&mut self) -> Result<()> {
        let start = self.scanner.position();
        self.scanner.advance(1); // '<'

        match self.scanner.peek() {
            Some(b'/') => self.lex_close_tag(start),
            Some(b'!') => self.lex_bang_markup(start),
            Some(b'?') => self.lex_processing_instruction(start),
            Some(b) if is_name_start_char(b) => self.lex_open_tag(start),
            _ => Err(Error::malformed(
                "'<' must start a tag; escape literal '<' as &lt;",
                start,
            )),
        }
    }

    /// Lex a start tag or self-closing tag, queueing its attribute tokens
    fn lex_open_tag(&mut self, start: usize) -> Result<()> {
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| Error::malformed("invalid element name", start))?;
        let name = std::str::from_utf8(name)
            .map_err(|_| Error::malformed("element name is not valid UTF-8", start))?;

        let end = self
            .scanner
            .find_tag_end_quoted()
            .ok_or_else(|| Error::malformed(format!("unterminated tag <{name}"), start))?;

        let self_closing = end > start && self.input.as_bytes()[end - 1] == b'/';
        let attr_end = if self_closing { end - 1 } else { end };

        self.queue.push_back(Token {
            kind: TokenKind::TagOpen(name),
            position: start,
        });
        self.lex_attributes(attr_end)?;

        if self_closing {
            self.queue.push_back(Token {
                kind: TokenKind::TagSelfClose(name),
                position: start,
            });
        }

        self.scanner.set_position(end + 1);
        Ok(())
    }

    /// Lex the attribute region of the current tag, up to `limit`
    fn lex_attributes(&mut self, limit: usize) -> Result<()> {
        loop {
            self.scanner.skip_whitespace();
            let pos = self.scanner.position();
            if pos >= limit {
                return Ok(());
            }

            let name = self
                .scanner
                .read_name()
                .ok_or_else(|| Error::malformed("expected attribute name", pos))?;
            let name = std::str::from_utf8(name)
                .map_err(|_| Error::malformed("attribute name is not valid UTF-8", pos))?;

            self.scanner.skip_whitespace();
            if self.scanner.peek() != Some(b'=') {
                return Err(Error::malformed(
                    format!("attribute '{name}' is missing '='"),
                    self.scanner.position(),
                ));
            }
            self.scanner.advance(1);
            self.scanner.skip_whitespace();

            let quote = match self.scanner.peek() {
                Some(q @ (b'"' | b'\'')) => q,
                _ => {
                    return Err(Error::malformed(
                        format!("attribute '{name}' value must be quoted"),
                        self.scanner.position(),
                    ))
                }
            };
            self.scanner.advance(1);
            let value_start = self.scanner.position();
            let value_end = self.scanner.find_byte(quote).ok_or_else(|| {
                Error::malformed(
                    format!("mismatched quote in attribute '{name}' value"),
                    value_start,
                )
            })?;
            if value_end > limit {
                return Err(Error::malformed(
                    format!("mismatched quote in attribute '{name}' value"),
                    value_start,
                ));
            }
            self.scanner.set_position(value_end + 1);

            let value = decode_text(self.text(value_start, value_end), value_start)?;
            self.queue.push_back(Token {
                kind: TokenKind::Attribute { name, value },
                position: pos,
            });
        }
    }

    /// Lex a closing tag
    fn lex_close_tag(&mut self, start: usize) -> Result<()> {
        self.scanner.advance(1); // '/'
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| Error::malformed("invalid name in closing tag", start))?;
        let name = std::str::from_utf8(name)
            .map_err(|_| Error::malformed("closing tag name is not valid UTF-8", start))?;

        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return Err(Error::malformed(
                format!("unterminated closing tag </{name}"),
                start,
            ));
        }
        self.scanner.advance(1);

        self.queue.push_back(Token {
            kind: TokenKind::TagClose(name),
            position: start,
        });
        Ok(())
    }

    /// Lex '<!' markup: comments, CDATA sections, DOCTYPE declarations
    fn lex_bang_markup(&mut self, start: usize) -> Result<()> {
        if self.scanner.starts_with(b"!--") {
            self.scanner.advance(3);
            let content_start = self.scanner.position();
            let end = self
                .scanner
                .find_sequence(b"-->")
                .ok_or_else(|| Error::malformed("unterminated comment", start))?;
            self.scanner.set_position(end + 3);
            self.queue.push_back(Token {
                kind: TokenKind::Comment(self.text(content_start, end)),
                position: start,
            });
            Ok(())
        } else if self.scanner.starts_with(b"![CDATA[") {
            self.scanner.advance(8);
            let content_start = self.scanner.position();
            let end = self
                .scanner
                .find_sequence(b"]]>")
                .ok_or_else(|| Error::malformed("unterminated CDATA section", start))?;
            self.scanner.set_position(end + 3);
            // CDATA content is literal: no entity decoding
            self.queue.push_back(Token {
                kind: TokenKind::Text(Cow::Borrowed(self.text(content_start, end))),
                position: start,
            });
            Ok(())
        } else if self.scanner.starts_with(b"!DOCTYPE") {
            self.skip_doctype(start)
        } else {
            Err(Error::malformed("unrecognized markup after '<!'", start))
        }
    }

    /// Skip a DOCTYPE declaration, honoring an internal subset in brackets
    fn skip_doctype(&mut self, start: usize) -> Result<()> {
        let mut depth = 0usize;
        while let Some(b) = self.scanner.peek() {
            match b {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => {
                    self.scanner.advance(1);
                    return Ok(());
                }
                _ => {}
            }
            self.scanner.advance(1);
        }
        Err(Error::malformed("unterminated DOCTYPE declaration", start))
    }

    /// Skip a processing instruction or XML declaration
    fn lex_processing_instruction(&mut self, start: usize) -> Result<()> {
        let end = self
            .scanner
            .find_sequence(b"?>")
            .ok_or_else(|| Error::malformed("unterminated processing instruction", start))?;
        self.scanner.set_position(end + 2);
        Ok(())
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done && self.queue.is_empty() {
            return None;
        }
        match self.next_token() {
            Ok(token) if matches!(token.kind, TokenKind::Eof) => None,
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        Tokenizer::new(input)
            .map(|t| t.map(|t| t.kind))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            kinds("<root>hello</root>"),
            vec![
                TokenKind::TagOpen("root"),
                TokenKind::Text(Cow::Borrowed("hello")),
                TokenKind::TagClose("root"),
            ]
        );
    }

    #[test]
    fn test_self_closing_with_attributes() {
        assert_eq!(
            kinds("<b x=\"1\" y='2'/>"),
            vec![
                TokenKind::TagOpen("b"),
                TokenKind::Attribute {
                    name: "x",
                    value: Cow::Borrowed("1")
                },
                TokenKind::Attribute {
                    name: "y",
                    value: Cow::Borrowed("2")
                },
                TokenKind::TagSelfClose("b"),
            ]
        );
    }

    #[test]
    fn test_whitespace_only_text_is_preserved() {
        let tokens = kinds("<a> <b/> </a>");
        assert!(tokens.contains(&TokenKind::Text(Cow::Borrowed(" "))));
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            kinds("<a><!-- note --></a>"),
            vec![
                TokenKind::TagOpen("a"),
                TokenKind::Comment(" note "),
                TokenKind::TagClose("a"),
            ]
        );
    }

    #[test]
    fn test_cdata_is_raw_text() {
        let tokens = kinds("<s><![CDATA[a < b & c]]></s>");
        assert_eq!(tokens[1], TokenKind::Text(Cow::Borrowed("a < b & c")));
    }

    #[test]
    fn test_entity_in_text_and_attribute() {
        let tokens = kinds("<a t=\"x&amp;y\">1 &lt; 2</a>");
        assert_eq!(
            tokens[1],
            TokenKind::Attribute {
                name: "t",
                value: Cow::Owned("x&y".to_string())
            }
        );
        assert_eq!(tokens[2], TokenKind::Text(Cow::Owned("1 < 2".to_string())));
    }

    #[test]
    fn test_declaration_and_doctype_skipped() {
        assert_eq!(
            kinds("<?xml version=\"1.0\"?><!DOCTYPE r []><r/>"),
            vec![TokenKind::TagOpen("r"), TokenKind::TagSelfClose("r")]
        );
    }

    #[test]
    fn test_unterminated_tag() {
        let err = Tokenizer::new("<root attr=\"v\"")
            .collect::<Result<Vec<_>>>()
            .unwrap_err();
        assert!(matches!(err, Error::MalformedXml { position: 0, .. }));
    }

    #[test]
    fn test_mismatched_quote() {
        let result = Tokenizer::new("<a x=\"1'/>").collect::<Result<Vec<_>>>();
        assert!(result.is_err());
    }

    #[test]
    fn test_stray_angle_bracket() {
        let result = Tokenizer::new("<a>1 < 2</a>").collect::<Result<Vec<_>>>();
        assert!(result.is_err());
    }

    #[test]
    fn test_eof_token_after_end() {
        let mut tokenizer = Tokenizer::new("<a/>");
        tokenizer.next_token().unwrap();
        tokenizer.next_token().unwrap();
        assert!(matches!(
            tokenizer.next_token().unwrap().kind,
            TokenKind::Eof
        ));
        assert!(matches!(
            tokenizer.next_token().unwrap().kind,
            TokenKind::Eof
        ));
    }
}
