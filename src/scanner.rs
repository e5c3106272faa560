//! Lexical analyzer.
//!
//! Turns the source text into positioned tokens. Whitespace and comments are
//! skipped, string literals are emitted as an opener/body/closer triple with
//! the standard escapes decoded in the body, and the stream always ends with
//! a zero-width end-of-file token.

use std::rc::Rc;

use crate::diag::{DiagCollector, Diagnostic, Span};
use crate::interner::Symbol;
use crate::token::{keyword, Token, TokenKind};
use crate::value::Eval;

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }
}

pub fn lex(src: &str, diag: &mut DiagCollector) -> Eval<Vec<Token>> {
    let mut s = Scanner { src, pos: 0 };
    let mut tokens = Vec::new();

    while let Some(ch) = s.peek() {
        let start = s.pos;

        // Whitespace and comments advance without emitting.
        if ch.is_whitespace() {
            s.bump();
            continue;
        }
        if ch == '/' && s.peek_second() == Some('/') {
            while let Some(c) = s.peek() {
                if c == '\n' {
                    break;
                }
                s.bump();
            }
            continue;
        }
        if ch == '/' && s.peek_second() == Some('*') {
            s.bump();
            s.bump();
            while s.peek().is_some() {
                if s.peek() == Some('*') && s.peek_second() == Some('/') {
                    s.bump();
                    s.bump();
                    break;
                }
                s.bump();
            }
            continue;
        }

        if ch.is_ascii_alphabetic() {
            s.bump();
            while matches!(s.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
                s.bump();
            }
            let text = &src[start..s.pos];
            let kind = keyword(text)
                .unwrap_or_else(|| TokenKind::Identifier(Symbol::intern(text)));
            tokens.push(Token {
                kind,
                span: Span::new(start, s.pos),
            });
            continue;
        }

        if ch.is_ascii_digit() {
            s.bump();
            while matches!(s.peek(), Some(c) if c.is_ascii_digit()) {
                s.bump();
            }

            // A dot only extends the literal when a digit follows, so `1.x`
            // stays an integer followed by a member access.
            if s.peek() == Some('.') && matches!(s.peek_second(), Some(c) if c.is_ascii_digit()) {
                s.bump();
                while matches!(s.peek(), Some(c) if c.is_ascii_digit()) {
                    s.bump();
                }
                let text = &src[start..s.pos];
                let value = text.parse::<f64>().map_err(|_| {
                    diag.fatal(
                        Diagnostic::error("E0002", "number literal out of range")
                            .with_primary_label(Span::new(start, s.pos), "not a valid number"),
                    )
                })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    span: Span::new(start, s.pos),
                });
            } else {
                let text = &src[start..s.pos];
                let value = text.parse::<i64>().map_err(|_| {
                    diag.fatal(
                        Diagnostic::error("E0002", "integer literal out of range")
                            .with_primary_label(Span::new(start, s.pos), "not a valid integer"),
                    )
                })?;
                tokens.push(Token {
                    kind: TokenKind::Integer(value),
                    span: Span::new(start, s.pos),
                });
            }
            continue;
        }

        if ch == '"' {
            s.bump();
            tokens.push(Token {
                kind: TokenKind::StrOpen,
                span: Span::new(start, s.pos),
            });

            let body_start = s.pos;
            let mut text = String::new();
            while let Some(c) = s.peek() {
                if c == '"' {
                    break;
                }
                s.bump();
                if c == '\\' {
                    match s.bump() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('"') => text.push('"'),
                        Some('\\') => text.push('\\'),
                        // Unknown escapes pass through untouched.
                        Some(other) => {
                            text.push('\\');
                            text.push(other);
                        }
                        None => text.push('\\'),
                    }
                } else {
                    text.push(c);
                }
            }
            let body_end = s.pos;
            tokens.push(Token {
                kind: TokenKind::StrSpan(Rc::from(text.as_str())),
                span: Span::new(body_start, body_end),
            });

            if s.peek() == Some('"') {
                let close_start = s.pos;
                s.bump();
                tokens.push(Token {
                    kind: TokenKind::StrClose,
                    span: Span::new(close_start, s.pos),
                });
            } else {
                return Err(diag.fatal(
                    Diagnostic::error("E0001", "unterminated string literal")
                        .with_primary_label(Span::new(start, body_end), "string started here")
                        .with_help("add a closing '\"' to terminate the string"),
                ));
            }
            continue;
        }

        s.bump();
        let kind = match ch {
            '=' => {
                if s.peek() == Some('=') {
                    s.bump();
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            '!' => {
                if s.peek() == Some('=') {
                    s.bump();
                    TokenKind::BangEqual
                } else {
                    return Err(diag.fatal(
                        Diagnostic::error("E0002", "unexpected character")
                            .with_primary_label(Span::new(start, s.pos), "unexpected character"),
                    ));
                }
            }
            '<' => {
                if s.peek() == Some('=') {
                    s.bump();
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if s.peek() == Some('=') {
                    s.bump();
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '{' => TokenKind::LeftCurly,
            '}' => TokenKind::RightCurly,
            ',' => TokenKind::Comma,
            '#' => TokenKind::Hash,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '~' => TokenKind::Tilde,
            '&' => TokenKind::Ampersand,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            _ => {
                return Err(diag.fatal(
                    Diagnostic::error("E0002", "unexpected character")
                        .with_primary_label(Span::new(start, s.pos), "unexpected character"),
                ));
            }
        };
        tokens.push(Token {
            kind,
            span: Span::new(start, s.pos),
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::point(src.len()),
    });

    Ok(tokens)
}
