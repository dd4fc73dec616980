use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token { kind, span }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Returns the exact source text this token was scanned from.
    pub fn lexeme<'src>(&self, src: &'src str) -> &'src str {
        self.span.substr(src)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span)
    }
}

/// A source region, in bytes, along with the line and column where it starts.
///
/// Lines and columns are 1-based; columns count characters, not bytes.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub lo: usize,
    pub len: u32,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(lo: usize, len: u32, position: Position) -> Span {
        Span {
            lo,
            len,
            line: position.line,
            column: position.column,
        }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    /// Returns a span which starts at `self` and ends at `other`'s end.
    pub fn to(self, other: Span) -> Span {
        debug_assert!(other.hi() >= self.lo);
        let len = u32::try_from(other.hi() - self.lo).expect("span length overflows u32");
        Span { len, ..self }
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, at {})", self.position())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.lo, self.hi())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const START: Position = Position { line: 1, column: 1 };
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

impl<T> Spanned<T> {
    pub fn position(&self) -> Position {
        self.span.position()
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position(), self.inner)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Fn,
    Return,
    Let,
    I32,
    I64,

    Plus,
    Minus,
    Star,
    Slash,
    /// `=`
    Assign,
    /// `->`
    Arrow,

    LParen,
    RParen,
    LBrace,
    RBrace,
    Semicolon,
    Comma,

    Identifier,
    Number,
    String,

    Eof,
}

impl TokenKind {
    pub fn is_type(self) -> bool {
        matches!(self, TokenKind::I32 | TokenKind::I64)
    }

    /// Fixed text of punctuation and keyword tokens.
    pub const fn text(self) -> Option<&'static str> {
        use TokenKind::*;
        Some(match self {
            Fn => "fn",
            Return => "return",
            Let => "let",
            I32 => "i32",
            I64 => "i64",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Assign => "=",
            Arrow => "->",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            Semicolon => ";",
            Comma => ",",
            Identifier | Number | String | Eof => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.text() {
            return write!(f, "`{text}`");
        }
        f.write_str(match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "integer literal",
            TokenKind::String => "string literal",
            _ => "end of input",
        })
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "fn" => TokenKind::Fn,
    "return" => TokenKind::Return,
    "let" => TokenKind::Let,
    "i32" => TokenKind::I32,
    "i64" => TokenKind::I64,
};
