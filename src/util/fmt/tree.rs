use std::io::Write;

use crate::{ast::*, types::Type};

const INDENT_WIDTH: usize = 2;

pub fn print_program_string<I: InfoWriter>(program: &Program<I>) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, program).expect("writing to a Vec is infallible");
    String::from_utf8(buf).expect("tree output is UTF-8")
}

pub fn print_expr_string<I: InfoWriter>(expr: &Expr<I>) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, 0, expr).expect("writing to a Vec is infallible");
    String::from_utf8(buf).expect("tree output is UTF-8")
}

pub fn print_program<I: InfoWriter>(w: &mut impl Write, program: &Program<I>) -> std::io::Result<()> {
    for function in &program.functions {
        print_function(w, 0, function)?;
    }
    Ok(())
}

fn print_function<I: InfoWriter>(
    w: &mut impl Write,
    i: usize,
    function: &Function<I>,
) -> std::io::Result<()> {
    sp(w, i)?;
    write!(w, "function {}(", function.name.as_str())?;
    for (idx, param) in function.params.iter().enumerate() {
        if idx > 0 {
            write!(w, ", ")?;
        }
        write!(w, "{} {}", param.ty, param.name.as_str())?;
    }
    writeln!(w, ") -> {} ({})", function.return_ty, function.span)?;
    for stmt in &function.body.stmts {
        print_stmt(w, i + 1, stmt)?;
    }
    Ok(())
}

fn print_stmt<I: InfoWriter>(w: &mut impl Write, i: usize, stmt: &Stmt<I>) -> std::io::Result<()> {
    sp(w, i)?;
    let span = stmt.span;
    match &stmt.kind {
        StmtKind::Return(expr) => {
            writeln!(w, "return ({span})")?;
            print_expr(w, i + 1, expr)?;
        }
        StmtKind::Declaration(Declaration {
            name,
            ty,
            initializer,
        }) => {
            write!(w, "let {}", name.as_str())?;
            if let Some(ty) = I::declared(ty) {
                write!(w, ": {ty}")?;
            }
            writeln!(w, " ({span})")?;
            if let Some(initializer) = initializer {
                print_expr(w, i + 1, initializer)?;
            }
        }
        StmtKind::Expr(expr) => {
            writeln!(w, "expr ({span})")?;
            print_expr(w, i + 1, expr)?;
        }
    }
    Ok(())
}

pub fn print_expr<I: InfoWriter>(w: &mut impl Write, i: usize, expr: &Expr<I>) -> std::io::Result<()> {
    sp(w, i)?;
    let span = expr.span;
    // Inferred type, for typed trees.
    let info = match I::inferred(&expr.info) {
        Some(ty) => format!(" %: {ty}"),
        None => String::new(),
    };
    match &expr.kind {
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?} ({span}{info})")?;
            print_expr(w, i + 1, lhs)?;
            print_expr(w, i + 1, rhs)?;
        }
        ExprKind::Id(ident) => {
            writeln!(w, "ident {} ({span}{info})", ident.as_str())?;
        }
        ExprKind::Int(val) => {
            writeln!(w, "int {val} ({span}{info})")?;
        }
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

/// Exposes the type information a tree carries, if any.
pub trait InfoWriter: Info {
    fn declared(ty: &Self::Ty) -> Option<Type>;

    fn inferred(info: &Self::Expr) -> Option<Type>;
}

impl InfoWriter for Untyped {
    fn declared(ty: &Option<Type>) -> Option<Type> {
        *ty
    }

    fn inferred(_: &()) -> Option<Type> {
        None
    }
}

impl InfoWriter for Typed {
    fn declared(ty: &Type) -> Option<Type> {
        Some(*ty)
    }

    fn inferred(info: &Type) -> Option<Type> {
        Some(*info)
    }
}
