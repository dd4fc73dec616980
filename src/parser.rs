use crate::{
    ast::{
        BinaryOperator, Block, Declaration, Expr, ExprKind, Function, Ident, Param, Program, Stmt,
        StmtKind, Untyped,
    },
    lexer::{self, extract},
    token::{Spanned, Token, TokenKind},
    types::Type,
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Maximum number of binary operators and parenthesized groupings a single
/// expression may contain. Bounds the recursion depth of every pass that walks
/// expression trees, so the whole pipeline fits a default 2 MiB thread stack.
pub const MAX_EXPR_COMPLEXITY: u32 = 256;

/// Lexes and parses a whole program. Fails with the first lexical or syntax
/// error found.
pub fn parse_program(src: &str, tokens: &mut Vec<Token>) -> Result<Program<Untyped>, crate::Error> {
    parse(src, tokens, Parser::parse_program)
}

/// Lexes and parses a single expression, which must span the entire input.
pub fn parse_expr(src: &str, tokens: &mut Vec<Token>) -> Result<Expr<Untyped>, crate::Error> {
    parse(src, tokens, |p| {
        let expr = p.parse_expr()?;
        p.consume(TokenKind::Eof)?;
        Ok(expr)
    })
}

fn parse<'src, 'tok, T>(
    src: &'src str,
    tokens: &'tok mut Vec<Token>,
    f: impl FnOnce(&mut Parser<'src, 'tok>) -> Result<T>,
) -> Result<T, crate::Error> {
    assert!(tokens.is_empty());

    lexer::lex(src, tokens)?;
    log::debug!("lexed {} tokens", tokens.len());

    let mut p = Parser::new(src, tokens);
    Ok(f(&mut p)?)
}

struct Parser<'src, 'tok> {
    src: &'src str,
    tokens: &'tok [Token],
    cursor: usize,
    /// Operators and groupings seen in the current top-level expression.
    complexity: u32,
}

impl Parser<'_, '_> {
    fn parse_program(&mut self) -> Result<Program<Untyped>> {
        let mut functions = Vec::with_capacity(4);
        while !self.is(TokenKind::Eof) {
            functions.push(self.parse_function()?);
        }
        let eof = self.consume(TokenKind::Eof)?;
        if functions.is_empty() {
            return Err(eof.span().wrap(Error::EmptyProgram));
        }
        Ok(Program { functions })
    }

    fn parse_function(&mut self) -> Result<Function<Untyped>> {
        let start = self.consume(TokenKind::Fn)?;
        let name = self.parse_ident()?;

        self.consume(TokenKind::LParen)?;
        let params = self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_param)?;
        self.consume(TokenKind::RParen)?;

        self.consume(TokenKind::Arrow)?;
        let return_ty = self.parse_type()?;
        let body = self.parse_block()?;

        Ok(Function {
            name,
            params,
            return_ty,
            span: start.span().to(body.span),
            body,
        })
    }

    fn parse_param(&mut self) -> Result<Param> {
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        Ok(Param { name, ty })
    }

    fn parse_block(&mut self) -> Result<Block<Untyped>> {
        let start = self.consume(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while self.except([TokenKind::RBrace]) {
            stmts.push(self.parse_stmt()?);
        }
        // Reaching the end of input here means the brace was never closed.
        let end = self.consume(TokenKind::RBrace)?;
        Ok(Block {
            stmts,
            span: start.span().to(end.span()),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt<Untyped>> {
        let start = self.peek();
        let kind = match start.kind {
            TokenKind::Return => {
                self.advance();
                StmtKind::Return(self.parse_expr()?)
            }
            TokenKind::Let => {
                self.advance();
                StmtKind::Declaration(self.parse_declaration(start)?)
            }
            _ => StmtKind::Expr(self.parse_expr()?),
        };
        let end = self.consume(TokenKind::Semicolon)?;
        Ok(Stmt {
            kind,
            span: start.span().to(end.span()),
        })
    }

    /// Parses the remainder of `let [type] name [= expr]`, after `let`.
    fn parse_declaration(&mut self, let_token: Token) -> Result<Declaration<Untyped>> {
        let ty = if self.peek().kind.is_type() {
            Some(self.parse_type()?)
        } else {
            None
        };
        let name = self.parse_ident()?;
        let initializer = if self.take(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        if ty.is_none() && initializer.is_none() {
            let span = let_token.span().to(name.span);
            let error = Error::UntypedDeclaration { name: name.name };
            return Err(span.wrap(error));
        }
        Ok(Declaration {
            name,
            ty,
            initializer,
        })
    }

    fn parse_type(&mut self) -> Result<Type> {
        let c = self.peek();
        if let Some(ty) = Type::from_token(c.kind) {
            self.advance();
            Ok(ty)
        } else {
            Err(c.span().wrap(Error::UnexpectedAny {
                actual: c.kind,
                expected: Box::from([TokenKind::I32, TokenKind::I64]),
            }))
        }
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident {
            name: extract::ident(token, self.src),
            span: token.span(),
        })
    }

    /// Parses a top-level expression.
    fn parse_expr(&mut self) -> Result<Expr<Untyped>> {
        self.complexity = 0;
        self.parse_additive()
    }

    /// additive ::= multiplicative (('+' | '-') multiplicative)*
    fn parse_additive(&mut self) -> Result<Expr<Untyped>> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            let op_token = self.advance();
            self.grow_complexity(op_token)?;
            let rhs = self.parse_multiplicative()?;
            lhs = Self::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// multiplicative ::= primary (('*' | '/') primary)*
    fn parse_multiplicative(&mut self) -> Result<Expr<Untyped>> {
        let mut lhs = self.parse_primary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::Slash => BinaryOperator::Div,
                _ => break,
            };
            let op_token = self.advance();
            self.grow_complexity(op_token)?;
            let rhs = self.parse_primary()?;
            lhs = Self::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// primary ::= integer | ID | '(' expr ')'
    fn parse_primary(&mut self) -> Result<Expr<Untyped>> {
        let token = self.advance();
        let kind = match token.kind {
            TokenKind::Number => {
                let Ok(parsed) = extract::int(token, self.src) else {
                    return Err(token.span().wrap(Error::ParseInt));
                };
                ExprKind::Int(parsed)
            }
            TokenKind::Identifier => ExprKind::Id(Ident {
                name: extract::ident(token, self.src),
                span: token.span(),
            }),
            // Grouping only reshapes the tree; the inner expression takes over
            // the span of the parentheses.
            TokenKind::LParen => {
                self.grow_complexity(token)?;
                let inner = self.parse_additive()?;
                let end = self.consume(TokenKind::RParen)?;
                return Ok(Expr {
                    span: token.span().to(end.span()),
                    ..inner
                });
            }
            other => {
                let error = Error::UnexpectedTokenInExpr { token: other };
                return Err(token.span().wrap(error));
            }
        };
        Ok(Expr {
            kind,
            span: token.span(),
            info: (),
        })
    }

    fn binary(op: BinaryOperator, lhs: Expr<Untyped>, rhs: Expr<Untyped>) -> Expr<Untyped> {
        Expr {
            span: lhs.span.to(rhs.span),
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            info: (),
        }
    }

    fn grow_complexity(&mut self, at: Token) -> Result<()> {
        self.complexity += 1;
        if self.complexity > MAX_EXPR_COMPLEXITY {
            let error = Error::ExpressionTooComplex {
                limit: MAX_EXPR_COMPLEXITY,
            };
            return Err(at.span().wrap(error));
        }
        Ok(())
    }

    /// Parses `item (separator item)*` until `end_delim` is found. Does **NOT**
    /// consume the end delimiter.
    fn parse_list<T>(
        &mut self,
        end_delim: TokenKind,
        separator: TokenKind,
        parse_item: impl Fn(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        debug_assert_ne!(end_delim, separator);

        let mut items = Vec::new();
        if self.is(end_delim) {
            return Ok(items);
        }
        loop {
            items.push(parse_item(self)?);
            if self.take(separator) {
                continue;
            }
            if self.is(end_delim) {
                break;
            }
            let c = self.peek();
            return Err(c.span().wrap(Error::UnexpectedAny {
                actual: c.kind,
                expected: Box::from([separator, end_delim]),
            }));
        }
        Ok(items)
    }
}

impl Parser<'_, '_> {
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok [Token]) -> Parser<'src, 'tok> {
        assert!(
            tokens.last().is_some_and(Token::is_eof),
            "token stream must end with Eof"
        );
        Parser {
            src,
            tokens,
            cursor: 0,
            complexity: 0,
        }
    }

    /// Returns the current token.
    #[inline]
    fn peek(&self) -> Token {
        self.tokens[self.cursor]
    }

    /// Returns the current token and advances. Never moves past the final
    /// [`TokenKind::Eof`].
    fn advance(&mut self) -> Token {
        let c = self.peek();
        if !c.is_eof() {
            self.cursor += 1;
        }
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one, returning it.
    /// If not, fails with the mismatch.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        let c = self.peek();
        if self.is(expect) {
            self.advance();
            Ok(c)
        } else {
            Err(c.span().wrap(Error::Unexpected {
                actual: c.kind,
                expected: expect,
            }))
        }
    }

    /// Returns true while the current token does *not* match one of the
    /// provided ones. [`TokenKind::Eof`] is implicitly included in the list.
    ///
    /// This won't advance the cursor.
    fn except(&self, except: impl IntoIterator<Item = TokenKind>) -> bool {
        let c = self.peek();
        if c.kind == TokenKind::Eof {
            return false;
        }
        except.into_iter().all(|e| c.kind != e)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("expected {expected}, but got {actual}")]
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    #[error("expected one of {}, but got {actual}", one_of(.expected))]
    UnexpectedAny {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    #[error("unexpected {token} in expression")]
    UnexpectedTokenInExpr { token: TokenKind },
    #[error("empty program, expected at least one function")]
    EmptyProgram,
    #[error("declaration of {name} needs a type or an initializer")]
    UntypedDeclaration { name: Box<str> },
    #[error("integer literal out of range")]
    ParseInt,
    #[error("expression too complex, at most {limit} operators and groupings are allowed")]
    ExpressionTooComplex { limit: u32 },
}

fn one_of(kinds: &[TokenKind]) -> String {
    let names: Vec<_> = kinds.iter().map(ToString::to_string).collect();
    names.join(", ")
}
