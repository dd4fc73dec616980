use std::{format_args as f, io, marker::PhantomData};

use crate::{
    ast::{self, BinaryOperator, Expr, ExprKind, StmtKind, Typed},
    codegen::{
        frame::{FrameLayout, Slot},
        x86_64_env,
    },
    types::Type,
};

/// Name of the function that becomes the program's entry point.
pub const MAIN: &str = "main";

/// System V integer argument registers, in order, as `(32-bit, 64-bit)`.
const ARGUMENT_REGISTERS: [(&str, &str); crate::checker::MAX_PARAMETERS] = [
    ("edi", "rdi"),
    ("esi", "rsi"),
    ("edx", "rdx"),
    ("ecx", "rcx"),
    ("r8d", "r8"),
    ("r9d", "r9"),
];

/// Emits a stack machine: every expression leaves its value in the primary
/// register (`eax`/`rax`), and binary operators park their right operand on
/// the hardware stack while the left one is evaluated.
pub struct Generator<W, E> {
    writer: W,
    indent: bool,
    /// Compilation-wide counter for local labels.
    label_count: u32,
    _env: PhantomData<E>,
}

impl<W, E> Generator<W, E>
where
    W: io::Write,
    E: x86_64_env::Env,
{
    pub fn new(writer: W) -> Generator<W, E> {
        Generator {
            writer,
            indent: false,
            label_count: 0,
            _env: PhantomData,
        }
    }

    pub fn generate(mut self, program: &ast::Program<Typed>) {
        self.g_program_prologue();
        self.g_data();
        self.g_functions(program);
    }
}

/// Target-specific functions.
impl<W, E> Generator<W, E>
where
    W: io::Write,
    E: x86_64_env::Env,
{
    fn g_program_prologue(&mut self) {
        self.out(E::GLOBAL_PROLOGUE);
    }

    /// The base language has no literal buffers, but the section is always
    /// present.
    fn g_data(&mut self) {
        self.out(f!(".section {}", E::SECTION_DATA));
        self.out_line();
    }

    fn g_functions(&mut self, program: &ast::Program<Typed>) {
        self.out(f!(".section {}", E::SECTION_TEXT));
        self.out_line();

        for function in &program.functions {
            self.g_function(function);
        }

        if !program.functions.iter().any(|f| f.name.as_str() == MAIN) {
            log::warn!("no `{MAIN}` function, the output has no entry point");
            self.out(f!("# no `{MAIN}` function, no entry point emitted"));
        }
    }

    fn g_function(&mut self, function: &ast::Function<Typed>) {
        let name = function.name.as_str();
        let layout = FrameLayout::of(function);
        log::trace!("frame of {name}: {} bytes", layout.size());

        self.out(f!("# fn {name}"));
        if name == MAIN {
            self.out(f!(".global {}", E::ENTRY_POINT));
            self.out(f!("{}:", E::ENTRY_POINT));
        } else {
            self.out(f!(".blitz__{name}:"));
        }

        self.indented(|this| {
            this.g_function_prologue(function, &layout);

            let mut after_return = false;
            for stmt in &function.body.stmts {
                if after_return {
                    // Never executed, but kept in the output.
                    let label = this.new_label("unreachable");
                    this.out_label(&label);
                }
                this.g_stmt(stmt, &layout);
                after_return = matches!(stmt.kind, StmtKind::Return(_));
            }

            // Falling off the end returns 0.
            if !after_return {
                this.out("xor eax, eax");
                this.g_function_epilogue();
            }
        });
    }

    fn g_function_prologue(&mut self, function: &ast::Function<Typed>, layout: &FrameLayout) {
        self.out("push rbp");
        self.out("mov rbp, rsp");
        if layout.size() > 0 {
            self.out(f!("sub rsp, {}", layout.size()));
        }

        for (param, registers) in function.params.iter().zip(ARGUMENT_REGISTERS) {
            let slot = Self::slot(layout, param.name.as_str());
            let register = match slot.ty {
                Type::I32 => registers.0,
                Type::I64 => registers.1,
            };
            self.out(f!("mov {}, {register}", Self::mem(slot)));
        }
    }

    fn g_function_epilogue(&mut self) {
        self.out("mov rsp, rbp");
        self.out("pop rbp");
        self.out("ret");
    }

    fn g_stmt(&mut self, stmt: &ast::Stmt<Typed>, layout: &FrameLayout) {
        match &stmt.kind {
            StmtKind::Return(expr) => {
                self.g_expr(expr, layout);
                self.g_function_epilogue();
            }
            StmtKind::Declaration(declaration) => {
                let name = declaration.name.as_str();
                let slot = Self::slot(layout, name);
                if let Some(initializer) = &declaration.initializer {
                    self.g_expr(initializer, layout);
                    let primary = Registers::of(slot.ty).primary;
                    self.out(f!("mov {}, {primary}", Self::mem(slot)));
                } else {
                    // The slot keeps whatever the stack held before.
                    self.out(f!("# {name} is uninitialized"));
                }
            }
            // Evaluated for its effects (such as a division fault); the value
            // is dropped.
            StmtKind::Expr(expr) => self.g_expr(expr, layout),
        }
    }

    fn g_expr(&mut self, e: &Expr<Typed>, layout: &FrameLayout) {
        let Registers { primary, secondary } = Registers::of(e.info);
        match &e.kind {
            ExprKind::Binary { op, lhs, rhs } => {
                self.g_expr(rhs, layout);
                self.out("push rax");
                self.g_expr(lhs, layout);
                self.out("pop rcx");
                match op {
                    BinaryOperator::Add => self.out(f!("add {primary}, {secondary}")),
                    BinaryOperator::Sub => self.out(f!("sub {primary}, {secondary}")),
                    BinaryOperator::Mul => self.out(f!("imul {primary}, {secondary}")),
                    BinaryOperator::Div => {
                        // Sign-extend the dividend into edx:eax (rdx:rax).
                        self.out(match e.info {
                            Type::I32 => "cdq",
                            Type::I64 => "cqo",
                        });
                        self.out(f!("idiv {secondary}"));
                    }
                }
            }
            ExprKind::Id(ident) => {
                let slot = Self::slot(layout, ident.as_str());
                self.out(f!("mov {primary}, {}", Self::mem(slot)));
            }
            ExprKind::Int(int) => self.out(f!("mov {primary}, {int}")),
        }
    }
}

/// Utility functions.
impl<W, E> Generator<W, E>
where
    W: io::Write,
    E: x86_64_env::Env,
{
    /// Prints a line.
    fn out(&mut self, f: impl std::fmt::Display) {
        let indent = if self.indent { "    " } else { "" };
        writeln!(self.writer, "{indent}{f}").expect("Failed to write to sink");
    }

    /// Prints an empty line.
    fn out_line(&mut self) {
        writeln!(self.writer).expect("Failed to write to sink");
    }

    /// Prints a label, never indented.
    fn out_label(&mut self, label: &str) {
        writeln!(self.writer, "{label}:").expect("Failed to write to sink");
    }

    /// Returns a label no other call returns within this compilation.
    fn new_label(&mut self, name: &str) -> String {
        let n = self.label_count;
        self.label_count += 1;
        format!("{}{name}_{n}", E::LOCAL_LABEL_PREFIX)
    }

    /// Writes in an indented block that is finished with an empty line.
    fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.indent = true;
        let res = f(self);
        self.indent = false;
        self.out_line();
        res
    }

    fn slot(layout: &FrameLayout, name: &str) -> Slot {
        layout
            .get(name)
            .unwrap_or_else(|| panic!("{name} has no frame slot, was the program checked?"))
    }

    fn mem(slot: Slot) -> String {
        let width = match slot.ty {
            Type::I32 => "DWORD",
            Type::I64 => "QWORD",
        };
        format!("{width} PTR [rbp - {}]", slot.offset)
    }
}

struct Registers {
    primary: &'static str,
    secondary: &'static str,
}

impl Registers {
    const fn of(ty: Type) -> Registers {
        match ty {
            Type::I32 => Registers {
                primary: "eax",
                secondary: "ecx",
            },
            Type::I64 => Registers {
                primary: "rax",
                secondary: "rcx",
            },
        }
    }
}
