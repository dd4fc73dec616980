// program ::= function+
// function ::= fn ID '(' [param (',' param)*] ')' '->' type '{' statement* '}'
// param ::= type ID
// statement ::= return expr ';'
//             | let [type] ID ['=' expr] ';'
//             | expr ';'
// expr ::= expr '+' expr
//        | expr '-' expr
//        | expr '*' expr
//        | expr '/' expr
//        | '(' expr ')'
//        | ID
//        | integer
// type ::= i32 | i64

// Precedence
//
// * /
// + -

use std::fmt;

use crate::{token::Span, types::Type};

/// Distinguishes the tree produced by the parser from the one produced by the
/// checker, which has every declaration and expression type resolved.
pub trait Info {
    /// Type of a `let` declaration.
    type Ty: fmt::Debug + PartialEq;
    /// Information attached to every expression.
    type Expr: fmt::Debug + PartialEq;
}

#[derive(Debug, PartialEq)]
pub struct Untyped;

impl Info for Untyped {
    type Ty = Option<Type>;
    type Expr = ();
}

#[derive(Debug, PartialEq)]
pub struct Typed;

impl Info for Typed {
    type Ty = Type;
    type Expr = Type;
}

#[derive(Debug, PartialEq)]
pub struct Program<I: Info> {
    /// Non empty list of functions, in declaration order.
    pub functions: Vec<Function<I>>,
}

#[derive(Debug, PartialEq)]
pub struct Function<I: Info> {
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_ty: Type,
    pub body: Block<I>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: Type,
}

#[derive(Debug, PartialEq)]
pub struct Block<I: Info> {
    pub stmts: Vec<Stmt<I>>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub struct Stmt<I: Info> {
    pub kind: StmtKind<I>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum StmtKind<I: Info> {
    Return(Expr<I>),
    Declaration(Declaration<I>),
    Expr(Expr<I>),
}

#[derive(Debug, PartialEq)]
pub struct Declaration<I: Info> {
    pub name: Ident,
    pub ty: I::Ty,
    pub initializer: Option<Expr<I>>,
}

#[derive(Debug, PartialEq)]
pub struct Expr<I: Info> {
    pub kind: ExprKind<I>,
    pub span: Span,
    pub info: I::Expr,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind<I: Info> {
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr<I>>,
        rhs: Box<Expr<I>>,
    },
    Id(Ident),
    Int(i64),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: Box<str>,
    pub span: Span,
}

impl Ident {
    pub fn as_str(&self) -> &str {
        &self.name
    }
}
