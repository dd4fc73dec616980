use std::collections::HashMap;

use crate::{
    ast::{
        Block, Declaration, Expr, ExprKind, Function, Ident, Program, Stmt, StmtKind, Typed,
        Untyped,
    },
    token::{Position, Span, Spanned},
    types::Type,
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Maximum number of parameters a function may declare. Each one is received in
/// a System V argument register.
pub const MAX_PARAMETERS: usize = 6;

/// Checks the program, resolving the type of every declaration and expression.
/// Fails with the first semantic error found.
pub fn check(program: Program<Untyped>) -> Result<Program<Typed>> {
    let mut checker = Checker::default();
    let functions = program
        .functions
        .into_iter()
        .map(|function| checker.check_function(function))
        .collect::<Result<Vec<_>>>()?;
    log::debug!("checked {} functions", functions.len());
    Ok(Program { functions })
}

/// Checks a standalone expression against an empty scope, with no context
/// type.
pub fn check_expr(expr: Expr<Untyped>) -> Result<Expr<Typed>> {
    Scope::default().check_expr(expr, None)
}

#[derive(Default)]
struct Checker {
    /// Maps each function name to its definition span.
    functions: HashMap<Box<str>, Span>,
}

impl Checker {
    fn check_function(&mut self, function: Function<Untyped>) -> Result<Function<Typed>> {
        let Function {
            name,
            params,
            return_ty,
            body,
            span,
        } = function;
        log::trace!("checking function {}", name.as_str());

        if let Some(previous) = self.functions.insert(name.name.clone(), name.span) {
            let error = Error::DuplicateFunction {
                name: name.name,
                previous: previous.position(),
            };
            return Err(name.span.wrap(error));
        }

        if let Some(extra) = params.get(MAX_PARAMETERS) {
            let error = Error::TooManyParameters {
                max: MAX_PARAMETERS,
                actual: params.len(),
            };
            return Err(extra.name.span.wrap(error));
        }

        // The scope lives exactly as long as the function is being checked.
        let mut scope = Scope::default();
        for param in &params {
            scope.declare(&param.name, param.ty)?;
        }
        let body = scope.check_block(body, return_ty)?;

        Ok(Function {
            name,
            params,
            return_ty,
            body,
            span,
        })
    }
}

/// The variables visible inside a function body. Blitz has no nested scopes.
#[derive(Default)]
struct Scope {
    /// Maps each variable name to its type and declaration span.
    vars: HashMap<Box<str>, (Type, Span)>,
}

impl Scope {
    fn declare(&mut self, name: &Ident, ty: Type) -> Result<()> {
        if let Some(&(_, previous)) = self.vars.get(&name.name) {
            let error = Error::Redeclaration {
                name: name.name.clone(),
                previous: previous.position(),
            };
            return Err(name.span.wrap(error));
        }
        self.vars.insert(name.name.clone(), (ty, name.span));
        Ok(())
    }

    fn lookup(&self, name: &Ident) -> Result<Type> {
        match self.vars.get(&name.name) {
            Some(&(ty, _)) => Ok(ty),
            None => Err(name.span.wrap(Error::UndefinedName(name.name.clone()))),
        }
    }

    fn check_block(&mut self, block: Block<Untyped>, return_ty: Type) -> Result<Block<Typed>> {
        let stmts = block
            .stmts
            .into_iter()
            .map(|stmt| self.check_stmt(stmt, return_ty))
            .collect::<Result<_>>()?;
        Ok(Block {
            stmts,
            span: block.span,
        })
    }

    fn check_stmt(&mut self, stmt: Stmt<Untyped>, return_ty: Type) -> Result<Stmt<Typed>> {
        let kind = match stmt.kind {
            StmtKind::Return(expr) => {
                let expr = self.check_expr(expr, Some(return_ty))?;
                if expr.info != return_ty {
                    let error = Error::ReturnMismatch {
                        expected: return_ty,
                        actual: expr.info,
                    };
                    return Err(expr.span.wrap(error));
                }
                StmtKind::Return(expr)
            }
            StmtKind::Declaration(declaration) => {
                StmtKind::Declaration(self.check_declaration(declaration)?)
            }
            StmtKind::Expr(expr) => StmtKind::Expr(self.check_expr(expr, None)?),
        };
        Ok(Stmt {
            kind,
            span: stmt.span,
        })
    }

    fn check_declaration(
        &mut self,
        Declaration {
            name,
            ty,
            initializer,
        }: Declaration<Untyped>,
    ) -> Result<Declaration<Typed>> {
        // The initializer can't see the name being declared.
        let initializer = initializer
            .map(|expr| self.check_expr(expr, ty))
            .transpose()?;

        let ty = match (ty, &initializer) {
            (Some(declared), Some(init)) if declared != init.info => {
                let error = Error::DeclarationMismatch {
                    expected: declared,
                    actual: init.info,
                };
                return Err(init.span.wrap(error));
            }
            (Some(declared), _) => declared,
            (None, Some(init)) => init.info,
            (None, None) => unreachable!("parser rejects declarations without type and initializer"),
        };

        self.declare(&name, ty)?;
        Ok(Declaration {
            name,
            ty,
            initializer,
        })
    }

    /// Types an expression. Variables fix the type of the whole expression;
    /// an expression made only of literals takes `context`, or the default
    /// integer type.
    fn check_expr(&self, expr: Expr<Untyped>, context: Option<Type>) -> Result<Expr<Typed>> {
        let ty = self
            .infer(&expr)?
            .or(context)
            .unwrap_or(Type::DEFAULT_INT);
        annotate(expr, ty)
    }

    /// Returns the type shared by every variable in the expression, or `None`
    /// if it has none.
    fn infer(&self, expr: &Expr<Untyped>) -> Result<Option<Type>> {
        match &expr.kind {
            ExprKind::Binary { lhs, rhs, .. } => match (self.infer(lhs)?, self.infer(rhs)?) {
                (Some(lhs), Some(rhs)) if lhs != rhs => {
                    Err(expr.span.wrap(Error::BinaryMismatch { lhs, rhs }))
                }
                (lhs, rhs) => Ok(lhs.or(rhs)),
            },
            ExprKind::Id(ident) => self.lookup(ident).map(Some),
            ExprKind::Int(_) => Ok(None),
        }
    }
}

/// Assigns `ty` to every node of an already inferred expression.
fn annotate(expr: Expr<Untyped>, ty: Type) -> Result<Expr<Typed>> {
    let kind = match expr.kind {
        ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
            op,
            lhs: Box::new(annotate(*lhs, ty)?),
            rhs: Box::new(annotate(*rhs, ty)?),
        },
        ExprKind::Id(ident) => ExprKind::Id(ident),
        ExprKind::Int(value) => {
            if !ty.fits(value) {
                return Err(expr.span.wrap(Error::IntegerOutOfRange { value, ty }));
            }
            ExprKind::Int(value)
        }
    };
    Ok(Expr {
        kind,
        span: expr.span,
        info: ty,
    })
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{0} is not defined")]
    UndefinedName(Box<str>),
    #[error("{name} is already defined (previous definition at {previous})")]
    Redeclaration { name: Box<str>, previous: Position },
    #[error("function {name} is already defined (previous definition at {previous})")]
    DuplicateFunction { name: Box<str>, previous: Position },
    #[error("type mismatch, can't combine {lhs} with {rhs}")]
    BinaryMismatch { lhs: Type, rhs: Type },
    #[error("declaration type mismatch, expected type {expected}, but got {actual}")]
    DeclarationMismatch { expected: Type, actual: Type },
    #[error("return type mismatch, expected type {expected}, but got {actual}")]
    ReturnMismatch { expected: Type, actual: Type },
    #[error("integer literal {value} doesn't fit in type {ty}")]
    IntegerOutOfRange { value: i64, ty: Type },
    #[error("too many parameters, at most {max} are supported, but got {actual}")]
    TooManyParameters { max: usize, actual: usize },
}
