use std::{iter::Peekable, num::ParseIntError};

use crate::token::{Position, Span, Spanned, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Lexes the provided string, producing the tokens into the provided buffer.
///
/// On success, the last token in the buffer is always [`TokenKind::Eof`].
/// Whitespace and comments are discarded.
pub fn lex(src: &str, tokens: &mut Vec<Token>) -> Result<()> {
    let lexer = Lexer::new(src, tokens);
    lexer.lex()
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens)?;
    Ok(tokens)
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
}

/// The Blitz lexer
struct Lexer<'src, 'tok> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    position: Position,
    current_lo: usize,
    current_position: Position,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    fn lex(mut self) -> Result<()> {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            // Trivia yields no token.
            let Some(next) = self.scan_token_kind()? else {
                continue;
            };
            self.produce(next);
            if next == TokenKind::Eof {
                break;
            }
        }
        log::trace!("lexed {} tokens", self.tokens.len());
        Ok(())
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> Result<Option<TokenKind>> {
        use TokenKind::*;
        let Some(current) = self.mark_advance() else {
            return Ok(Some(Eof));
        };
        let kind = match current {
            '+' => Plus,
            '-' => match self.peek() {
                Some('>') => self.advance_with(Arrow),
                _ => Minus,
            },
            '*' => Star,
            '/' => match self.peek() {
                Some('/') => return Ok(self.line_comment()),
                Some('*') => return self.block_comment().map(|()| None),
                _ => Slash,
            },
            '=' => Assign,
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            ';' => Semicolon,
            ',' => Comma,
            '"' => self.string()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_whitespace() => return Ok(self.whitespace()),
            c => return Err(self.span().wrap(Error::UnexpectedChar(c))),
        };
        Ok(Some(kind))
    }

    /// Scans a string literal, which must be closed before the end of its
    /// line. A backslash makes the following character part of the literal;
    /// escape sequences are otherwise kept verbatim.
    fn string(&mut self) -> Result<TokenKind> {
        let mut is_escaping = false;
        loop {
            match (is_escaping, self.peek()) {
                (_, None | Some('\n')) => {
                    return Err(self.span().wrap(Error::UnterminatedString));
                }
                (false, Some('"')) => {
                    self.advance();
                    return Ok(TokenKind::String);
                }
                (false, Some('\\')) => is_escaping = true,
                (_, Some(_)) => is_escaping = false,
            }
            self.advance();
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_';

        while self.peek().is_some_and(valid_identifier_suffix) {
            self.advance();
        }
        KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        TokenKind::Number
    }

    fn whitespace(&mut self) -> Option<TokenKind> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
        None
    }

    fn line_comment(&mut self) -> Option<TokenKind> {
        while !matches!(self.peek(), Some('\n') | None) {
            self.advance();
        }
        None
    }

    fn block_comment(&mut self) -> Result<()> {
        assert_eq!(self.advance(), Some('*'));
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => continue,
                None => return Err(self.span().wrap(Error::UnterminatedComment)),
            }
        }
    }
}

impl Lexer<'_, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            position: Position::START,
            current_lo: 0,
            current_position: Position::START,
            tokens,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> Option<char> {
        self.current_lo = self.cursor;
        self.current_position = self.position;
        self.advance()
    }

    /// Returns the next character and advances the iterator, keeping track of
    /// the current line and column.
    fn advance(&mut self) -> Option<char> {
        let c = self.iter.next()?;
        self.cursor += c.len_utf8();
        if c == '\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
        Some(c)
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> Option<char> {
        self.iter.peek().copied()
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        let len = u32::try_from(self.cursor - self.current_lo).expect("token too long");
        Span::new(self.current_lo, len, self.current_position)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        let token = Token::new(kind, self.span());
        self.tokens.push(token);
    }
}

pub mod extract {
    use super::*;

    pub fn int(token: Token, src: &str) -> Result<i64, ParseIntError> {
        debug_assert_eq!(token.kind, TokenKind::Number);
        token.lexeme(src).parse()
    }

    pub fn ident(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        Box::from(token.lexeme(src))
    }
}
