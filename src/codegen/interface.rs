use std::io;

use crate::{
    ast::{Program, Typed},
    codegen::{x86_64::Generator, x86_64_env},
};

/// Emits the assembly for a checked program.
///
/// Never fails: every user error has been reported by the earlier stages, so
/// a malformed tree reaching this point is a compiler bug and panics.
pub fn generate(program: &Program<Typed>, target: Target) -> String {
    let mut buf = Vec::with_capacity(4096);
    generate_to(&mut buf, program, target);
    String::from_utf8(buf).expect("assembly output is UTF-8")
}

/// Like [`generate`], but writes into the given sink.
pub fn generate_to<W>(writer: W, program: &Program<Typed>, target: Target)
where
    W: io::Write,
{
    type DarwinGenerator<W> = Generator<W, x86_64_env::Darwin>;
    type LinuxGenerator<W> = Generator<W, x86_64_env::Linux>;

    log::debug!("generating {} functions for {target}", program.functions.len());
    match target {
        Target::x86_64_darwin => DarwinGenerator::new(writer).generate(program),
        Target::x86_64_linux => LinuxGenerator::new(writer).generate(program),
    }
}

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    x86_64_darwin,
    x86_64_linux,
}

impl Target {
    pub const ALL: &[Target] = &[Target::x86_64_darwin, Target::x86_64_linux];
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::x86_64_darwin => f.write_str("x86_64_darwin"),
            Target::x86_64_linux => f.write_str("x86_64_linux"),
        }
    }
}
