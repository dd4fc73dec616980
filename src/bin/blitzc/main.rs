use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::Context;
use blitz::{checker, lexer, parser, util::fmt::tree};
use clap::Parser;

use crate::target::{Target, DEFAULT_TARGET};

mod target;

/// Compiles a Blitz source file into x86-64 assembly (GNU `as`, Intel syntax).
///
/// Assembling and linking the output is left to the system toolchain, e.g.
/// `cc prog.s -o prog`.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// The Blitz source file.
    input: PathBuf,

    /// Where to write the assembly. Defaults to the input path with an `.s`
    /// extension; `-` writes to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to produce. Tokens and trees are printed to stdout.
    #[arg(long, value_enum, default_value_t = Emit::Asm)]
    emit: Emit,

    #[arg(long, value_enum, default_value_t = DEFAULT_TARGET)]
    target: Target,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    Asm,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if let Some(e) = error.downcast_ref::<blitz::Error>() {
                let path = args.input.display();
                eprintln!("{path}:{}: {} error: {}", e.position(), e.kind(), e.message());
            } else {
                eprintln!("error: {error:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let src = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    match args.emit {
        Emit::Tokens => {
            let tokens = lexer::lex_in_new(&src).map_err(blitz::Error::from)?;
            let mut out = io::stdout().lock();
            for token in tokens {
                let span = token.span();
                let lexeme = token.lexeme(&src);
                writeln!(out, "{}\t{:?}\t{lexeme:?}", span.position(), token.kind)?;
            }
        }
        Emit::Ast => {
            let program = parser::parse_program(&src, &mut Vec::new())?;
            let program = checker::check(program).map_err(blitz::Error::from)?;
            io::stdout().write_all(tree::print_program_string(&program).as_bytes())?;
        }
        Emit::Asm => {
            let asm = blitz::compile(&src, args.target.into())?;
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| args.input.with_extension("s"));
            if output.as_os_str() == "-" {
                io::stdout().write_all(asm.as_bytes())?;
            } else {
                fs::write(&output, asm)
                    .with_context(|| format!("failed to write {}", output.display()))?;
                log::info!("wrote {}", output.display());
            }
        }
    }
    Ok(())
}
