//! Lexer module
//!
//! Hand-written byte-cursor scanner for Alpha source text. Tokens are
//! produced on demand; lexical failures become [`TokenKind::Error`]
//! tokens so the parser can surface them as ordinary parse errors.

pub mod tokens;

use tokens::{Keyword, Op, Token, TokenKind};

use crate::util::span::{Position, Span};

/// Tokenize a whole source string.
///
/// The returned stream always ends with exactly one `Eof` token. Lexical
/// errors are embedded as `Error` tokens; the scanner never fails.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut scanner = Scanner::new(source);
    let mut out = Vec::new();
    loop {
        let token = scanner.next_token();
        let done = matches!(token.kind, TokenKind::Eof);
        out.push(token);
        if done {
            break;
        }
    }
    out
}

/// Byte-cursor scanner
///
/// State is deliberately small: the cursor, the current line/column, and
/// the start position of the in-progress token. Every call to
/// [`Scanner::next_token`] advances the cursor by at least one byte
/// unless the input is exhausted, at which point `Eof` is returned
/// idempotently.
#[derive(Debug)]
pub struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    start_pos: usize,
    start_line: usize,
    start_column: usize,
}

impl<'a> Scanner<'a> {
    /// Create a scanner over a source string
    pub fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            start_pos: 0,
            start_line: 1,
            start_column: 1,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    #[inline]
    fn peek_next(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    #[inline]
    fn span(&self) -> Span {
        Span::new(
            Position::with_offset(self.start_line, self.start_column, self.start_pos),
            Position::with_offset(self.line, self.column, self.pos),
        )
    }

    #[inline]
    fn lexeme(&self) -> &'a str {
        // The scanner only ever slices at ASCII boundaries it created.
        std::str::from_utf8(&self.src[self.start_pos..self.pos]).unwrap_or("")
    }

    fn make(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.lexeme(), self.span())
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_next() == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_next() == Some(b'*') => {
                    self.advance();
                    self.advance();
                    // Non-nested: stop at the first `*/` or end of input.
                    while let Some(b) = self.advance() {
                        if b == b'*' && self.peek() == Some(b'/') {
                            self.advance();
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        self.start_pos = self.pos;
        self.start_line = self.line;
        self.start_column = self.column;

        let b = match self.advance() {
            Some(b) => b,
            None => return self.make(TokenKind::Eof),
        };

        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.scan_word(),
            b'0'..=b'9' => self.scan_number(),
            b'"' => self.scan_string(),
            _ => self.scan_operator(b),
        }
    }

    /// Identifier, keyword, or generic parameter; absorbs a trailing `?`
    fn scan_word(&mut self) -> Token {
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        // Absorb a single trailing `?` into the lexeme; the non-empty
        // prefix requirement holds because a word byte got us here.
        if self.peek() == Some(b'?') {
            self.advance();
        }

        let raw = self.lexeme();
        let base = raw.strip_suffix('?').unwrap_or(raw);

        let kind = if let Some(kw) = Keyword::from_str(base) {
            TokenKind::Keyword(kw)
        } else if base.len() == 1 && base.as_bytes()[0].is_ascii_uppercase() {
            TokenKind::GenericParam(base.as_bytes()[0] as char)
        } else {
            TokenKind::Identifier(base.to_string())
        };
        self.make(kind)
    }

    /// Integer or float literal
    fn scan_number(&mut self) -> Token {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.advance();
        }

        let mut is_float = false;

        // Fractional part only when the dot is followed by a digit, so
        // `a.0.len` style member chains stay unambiguous.
        if self.peek() == Some(b'.') && matches!(self.peek_next(), Some(b'0'..=b'9')) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }

        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.advance();
            }
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return self.make(TokenKind::Error(
                    "exponent requires at least one digit".to_string(),
                ));
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }

        let text = self.lexeme();
        if is_float {
            match text.parse::<f64>() {
                Ok(n) => self.make(TokenKind::FloatLiteral(n)),
                Err(_) => self.make(TokenKind::Error(format!("invalid float literal '{text}'"))),
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => self.make(TokenKind::IntLiteral(n)),
                Err(_) => self.make(TokenKind::Error(format!(
                    "integer literal '{text}' out of range"
                ))),
            }
        }
    }

    /// String literal. A backslash swallows the following byte
    /// unconditionally; the recognized escapes are decoded and unknown
    /// escapes keep the literal following byte.
    fn scan_string(&mut self) -> Token {
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(b'"') => return self.make(TokenKind::StringLiteral(value)),
                Some(b'\\') => match self.advance() {
                    Some(b'n') => value.push('\n'),
                    Some(b't') => value.push('\t'),
                    Some(b'r') => value.push('\r'),
                    Some(b'"') => value.push('"'),
                    Some(b'\\') => value.push('\\'),
                    Some(b) => value.push(b as char),
                    None => {
                        return self.make(TokenKind::Error(
                            "unterminated string literal".to_string(),
                        ))
                    }
                },
                Some(b) => value.push(b as char),
                None => {
                    return self.make(TokenKind::Error("unterminated string literal".to_string()))
                }
            }
        }
    }

    /// Operator: greedy two-byte match first, then single byte. Unknown
    /// bytes produce an `Error` token but the cursor has already moved,
    /// so progress is guaranteed.
    fn scan_operator(&mut self, first: u8) -> Token {
        let two = self.peek().and_then(|second| {
            let op = match (first, second) {
                (b'=', b'=') => Op::EqEq,
                (b'!', b'=') => Op::Neq,
                (b'<', b'=') => Op::Le,
                (b'>', b'=') => Op::Ge,
                (b'&', b'&') => Op::AndAnd,
                (b'|', b'|') => Op::OrOr,
                (b'+', b'+') => Op::PlusPlus,
                (b'-', b'-') => Op::MinusMinus,
                (b'+', b'=') => Op::PlusEq,
                (b'-', b'=') => Op::MinusEq,
                (b'*', b'=') => Op::StarEq,
                (b'/', b'=') => Op::SlashEq,
                _ => return None,
            };
            Some(op)
        });
        if let Some(op) = two {
            self.advance();
            return self.make(TokenKind::Operator(op));
        }

        let op = match first {
            b'+' => Op::Plus,
            b'-' => Op::Minus,
            b'*' => Op::Star,
            b'/' => Op::Slash,
            b'%' => Op::Percent,
            b'=' => Op::Eq,
            b'!' => Op::Not,
            b'&' => Op::Amp,
            b'|' => Op::Pipe,
            b';' => Op::Semicolon,
            b',' => Op::Comma,
            b'.' => Op::Dot,
            b':' => Op::Colon,
            b'?' => Op::Question,
            b'(' => Op::LParen,
            b')' => Op::RParen,
            b'{' => Op::LBrace,
            b'}' => Op::RBrace,
            b'[' => Op::LBracket,
            b']' => Op::RBracket,
            b'<' => {
                let mut token = self.make(TokenKind::Operator(Op::Lt));
                token.generic_open = self.generic_look_behind();
                return token;
            }
            b'>' => Op::Gt,
            other => {
                return self.make(TokenKind::Error(format!(
                    "unexpected character '{}' (0x{other:02x})",
                    other as char
                )))
            }
        };
        self.make(TokenKind::Operator(op))
    }

    /// Bounded look-behind from the `<` just scanned: skip whitespace,
    /// collect the preceding word, and flag a generic-open when that
    /// word is `generic` or a single uppercase letter.
    fn generic_look_behind(&self) -> bool {
        let mut i = self.start_pos;
        while i > 0 && matches!(self.src[i - 1], b' ' | b'\t' | b'\r' | b'\n') {
            i -= 1;
        }
        let end = i;
        while i > 0 && (self.src[i - 1].is_ascii_alphanumeric() || self.src[i - 1] == b'_') {
            i -= 1;
        }
        if i == end {
            return false;
        }
        let word = &self.src[i..end];
        word == b"generic" || (word.len() == 1 && word[0].is_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests;
