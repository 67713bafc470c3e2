//! Tokenizer for trigger expressions
//!
//! The lexer never fails: characters outside the grammar become `Unknown`
//! tokens and the parser reports them with its usual expected-set
//! diagnostics. The token stream always ends with `EndOfInput`.

use super::types::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    Number,
    Boolean,
    Identifier,
    Dot,
    LeftParen,
    RightParen,
    Not,
    Minus,
    Plus,
    Star,
    Slash,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    EqualEqual,
    NotEqual,
    AndAnd,
    OrOr,
    Unknown,
    EndOfInput,
}

impl TokenKind {
    /// Name used in "expected one of" lists
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Number => "number",
            TokenKind::Boolean => "boolean",
            TokenKind::Identifier => "identifier",
            TokenKind::Dot => "'.'",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::Not => "'!'",
            TokenKind::Minus => "'-'",
            TokenKind::Plus => "'+'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Greater => "'>'",
            TokenKind::Less => "'<'",
            TokenKind::GreaterEqual => "'>='",
            TokenKind::LessEqual => "'<='",
            TokenKind::EqualEqual => "'=='",
            TokenKind::NotEqual => "'!='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Unknown => "unknown character",
            TokenKind::EndOfInput => "end of input",
        }
    }
}

/// A lexical unit with its byte span and primitive type
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind,
    pub data_type: DataType,
}

impl Token {
    fn new(kind: TokenKind, value: &str, start: usize, end: usize) -> Self {
        let data_type = match kind {
            TokenKind::Number => DataType::Number,
            TokenKind::Boolean => DataType::Boolean,
            _ => DataType::Any,
        };
        Self {
            value: value.to_string(),
            start,
            end,
            kind,
            data_type,
        }
    }

    /// How this token is named when it shows up where it should not
    pub fn found(&self) -> String {
        match self.kind {
            TokenKind::EndOfInput => "end of input".to_string(),
            TokenKind::Unknown => format!("character '{}'", self.value),
            _ => format!("'{}'", self.value),
        }
    }
}

/// Split source text into tokens
pub fn tokenize(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let next = bytes.get(pos + 1).copied();
        let kind = if c.is_ascii_digit() || (c == b'.' && next.is_some_and(|n| n.is_ascii_digit()))
        {
            pos = scan_number(bytes, pos);
            TokenKind::Number
        } else if c.is_ascii_alphabetic() || c == b'_' {
            pos = scan_identifier(bytes, pos);
            match &source[start..pos] {
                "true" | "false" => TokenKind::Boolean,
                _ => TokenKind::Identifier,
            }
        } else {
            let (kind, len) = match (c, next) {
                (b'>', Some(b'=')) => (TokenKind::GreaterEqual, 2),
                (b'<', Some(b'=')) => (TokenKind::LessEqual, 2),
                (b'=', Some(b'=')) => (TokenKind::EqualEqual, 2),
                (b'!', Some(b'=')) => (TokenKind::NotEqual, 2),
                (b'&', Some(b'&')) => (TokenKind::AndAnd, 2),
                (b'|', Some(b'|')) => (TokenKind::OrOr, 2),
                (b'>', _) => (TokenKind::Greater, 1),
                (b'<', _) => (TokenKind::Less, 1),
                (b'!', _) => (TokenKind::Not, 1),
                (b'-', _) => (TokenKind::Minus, 1),
                (b'+', _) => (TokenKind::Plus, 1),
                (b'*', _) => (TokenKind::Star, 1),
                (b'/', _) => (TokenKind::Slash, 1),
                (b'.', _) => (TokenKind::Dot, 1),
                (b'(', _) => (TokenKind::LeftParen, 1),
                (b')', _) => (TokenKind::RightParen, 1),
                _ => {
                    let len = source[pos..].chars().next().map_or(1, char::len_utf8);
                    (TokenKind::Unknown, len)
                }
            };
            pos += len;
            kind
        };

        tokens.push(Token::new(kind, &source[start..pos], start, pos));
    }

    tokens.push(Token::new(
        TokenKind::EndOfInput,
        "",
        source.len(),
        source.len(),
    ));
    tokens
}

/// Integer part is `0` or a nonzero digit followed by digits; the optional
/// fraction needs at least one digit after the dot.
fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    if bytes[pos] == b'0' {
        pos += 1;
    } else if bytes[pos].is_ascii_digit() {
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }

    let has_fraction = bytes.get(pos) == Some(&b'.')
        && bytes.get(pos + 1).is_some_and(|d| d.is_ascii_digit());
    if has_fraction {
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    pos
}

fn scan_identifier(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
        pos += 1;
    }
    pos
}
