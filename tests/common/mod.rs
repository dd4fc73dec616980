//! A tiny interpreter for the subset of x86-64 the compiler emits, so
//! generated programs can be run without an assembler or linker.

#![allow(dead_code)]

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};

const STACK_SIZE: usize = 64 * 1024;
const STACK_BASE: u64 = 0x7fff_0000_0000;
/// Return address of the outermost frame. Returning to it ends the run.
const HALT: u64 = 0xdead_beef;
const MAX_STEPS: usize = 1_000_000;

/// How a run ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The entry function returned; carries the full `rax`.
    Returned(u64),
    /// `idiv` by zero, or a quotient that doesn't fit (what `SIGFPE` reports
    /// on real hardware).
    DivideError,
}

impl Outcome {
    /// The process exit status a real run would report.
    pub fn exit_code(self) -> Option<u8> {
        match self {
            Outcome::Returned(rax) => Some(rax.to_le_bytes()[0]),
            Outcome::DivideError => None,
        }
    }

    /// `eax` as a signed value.
    pub fn as_i32(self) -> Option<i32> {
        match self {
            #[allow(clippy::cast_possible_truncation)]
            Outcome::Returned(rax) => Some(rax as u32 as i32),
            Outcome::DivideError => None,
        }
    }

    /// `rax` as a signed value.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Outcome::Returned(rax) => Some(rax as i64),
            Outcome::DivideError => None,
        }
    }
}

/// Runs `main` (the Linux entry symbol).
pub fn run_main(asm: &str) -> Result<Outcome> {
    run(asm, "main", &[])
}

/// Runs the function under `label`, passing `args` in the System V argument
/// registers.
pub fn run(asm: &str, label: &str, args: &[i64]) -> Result<Outcome> {
    let program = Program::parse(asm)?;
    let mut machine = Machine::new();
    for (register, &arg) in [Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9]
        .into_iter()
        .zip(args)
    {
        machine.regs[register as usize] = arg as u64;
    }
    machine.push(HALT)?;

    let mut pc = *program
        .labels
        .get(label)
        .with_context(|| format!("no label {label}"))?;

    for _ in 0..MAX_STEPS {
        let instr = program
            .instrs
            .get(pc)
            .with_context(|| format!("ran past the end of the program from {label}"))?;
        pc += 1;
        match machine.step(instr)? {
            Flow::Next => {}
            Flow::Return(HALT) => return Ok(Outcome::Returned(machine.regs[Reg::Rax as usize])),
            Flow::Return(address) => bail!("returned to unknown address {address:#x}"),
            Flow::DivideError => return Ok(Outcome::DivideError),
        }
    }
    bail!("step limit exceeded")
}

struct Program {
    instrs: Vec<Instr>,
    /// Maps each label to the index of the instruction following it.
    labels: HashMap<String, usize>,
}

impl Program {
    fn parse(asm: &str) -> Result<Program> {
        let mut instrs = Vec::new();
        let mut labels = HashMap::new();
        for (n, line) in asm.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(label) = line.strip_suffix(':') {
                labels.insert(label.to_owned(), instrs.len());
                continue;
            }
            if line.starts_with('.') {
                // Directive.
                continue;
            }
            let instr = Instr::parse(line).with_context(|| format!("line {}: {line}", n + 1))?;
            instrs.push(instr);
        }
        Ok(Program { instrs, labels })
    }
}

#[derive(Debug)]
struct Instr {
    mnemonic: String,
    operands: Vec<Operand>,
}

impl Instr {
    fn parse(line: &str) -> Result<Instr> {
        let (mnemonic, rest) = line.split_once(' ').unwrap_or((line, ""));
        let operands = if rest.trim().is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(Operand::parse).collect::<Result<_>>()?
        };
        Ok(Instr {
            mnemonic: mnemonic.to_owned(),
            operands,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Width {
    D,
    Q,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(usize)]
enum Reg {
    Rax,
    Rcx,
    Rdx,
    Rbx,
    Rsp,
    Rbp,
    Rsi,
    Rdi,
    R8,
    R9,
}

#[derive(Copy, Clone, Debug)]
enum Operand {
    Reg(Reg, Width),
    Imm(i64),
    /// `[rbp +/- disp]`
    Mem(Width, i64),
}

impl Operand {
    fn parse(text: &str) -> Result<Operand> {
        let text = text.trim();
        if let Some((width, rest)) = text.split_once(" PTR ") {
            let width = match width {
                "DWORD" => Width::D,
                "QWORD" => Width::Q,
                _ => bail!("unsupported width {width}"),
            };
            let inner = rest
                .trim()
                .strip_prefix("[rbp")
                .and_then(|r| r.strip_suffix(']'))
                .with_context(|| format!("unsupported address {rest}"))?
                .replace(' ', "");
            let disp = if inner.is_empty() {
                0
            } else {
                inner.parse::<i64>()?
            };
            return Ok(Operand::Mem(width, disp));
        }
        if let Ok(imm) = text.parse::<i64>() {
            return Ok(Operand::Imm(imm));
        }
        let (reg, width) = match text {
            "rax" => (Reg::Rax, Width::Q),
            "rcx" => (Reg::Rcx, Width::Q),
            "rdx" => (Reg::Rdx, Width::Q),
            "rbx" => (Reg::Rbx, Width::Q),
            "rsp" => (Reg::Rsp, Width::Q),
            "rbp" => (Reg::Rbp, Width::Q),
            "rsi" => (Reg::Rsi, Width::Q),
            "rdi" => (Reg::Rdi, Width::Q),
            "r8" => (Reg::R8, Width::Q),
            "r9" => (Reg::R9, Width::Q),
            "eax" => (Reg::Rax, Width::D),
            "ecx" => (Reg::Rcx, Width::D),
            "edx" => (Reg::Rdx, Width::D),
            "ebx" => (Reg::Rbx, Width::D),
            "esi" => (Reg::Rsi, Width::D),
            "edi" => (Reg::Rdi, Width::D),
            "r8d" => (Reg::R8, Width::D),
            "r9d" => (Reg::R9, Width::D),
            _ => bail!("unsupported operand {text}"),
        };
        Ok(Operand::Reg(reg, width))
    }
}

enum Flow {
    Next,
    Return(u64),
    DivideError,
}

struct Machine {
    regs: [u64; 10],
    stack: Vec<u8>,
}

impl Machine {
    fn new() -> Machine {
        let mut regs = [0; 10];
        regs[Reg::Rsp as usize] = STACK_BASE + STACK_SIZE as u64;
        // Fresh stack memory holds garbage, not zeroes.
        Machine {
            regs,
            stack: vec![0xcc; STACK_SIZE],
        }
    }

    fn step(&mut self, instr: &Instr) -> Result<Flow> {
        match (instr.mnemonic.as_str(), &instr.operands[..]) {
            ("mov", &[dst, src]) => {
                let value = self.read(src, Self::width_of(dst, src)?)?;
                self.write(dst, value)?;
            }
            ("push", &[Operand::Reg(reg, Width::Q)]) => self.push(self.regs[reg as usize])?,
            ("pop", &[Operand::Reg(reg, Width::Q)]) => self.regs[reg as usize] = self.pop()?,
            ("add" | "sub" | "imul" | "xor", &[dst, src]) => {
                let width = Self::width_of(dst, src)?;
                let (a, b) = (self.read(dst, width)?, self.read(src, width)?);
                let value = match instr.mnemonic.as_str() {
                    "add" => a.wrapping_add(b),
                    "sub" => a.wrapping_sub(b),
                    "imul" => a.wrapping_mul(b),
                    _ => a ^ b,
                };
                self.write(dst, value)?;
            }
            ("cdq", []) => {
                let eax = self.regs[Reg::Rax as usize] as u32 as i32;
                self.regs[Reg::Rdx as usize] = if eax < 0 { 0xffff_ffff } else { 0 };
            }
            ("cqo", []) => {
                let rax = self.regs[Reg::Rax as usize] as i64;
                self.regs[Reg::Rdx as usize] = if rax < 0 { u64::MAX } else { 0 };
            }
            ("idiv", &[Operand::Reg(divisor, width)]) => return Ok(self.idiv(divisor, width)),
            ("ret", []) => return Ok(Flow::Return(self.pop()?)),
            _ => bail!("unsupported instruction {instr:?}"),
        }
        Ok(Flow::Next)
    }

    fn idiv(&mut self, divisor: Reg, width: Width) -> Flow {
        let rax = self.regs[Reg::Rax as usize];
        let rdx = self.regs[Reg::Rdx as usize];
        let divisor = self.regs[divisor as usize];
        match width {
            Width::D => {
                let dividend = (((rdx as u32 as u64) << 32) | (rax as u32 as u64)) as i64;
                let divisor = i64::from(divisor as u32 as i32);
                if divisor == 0 {
                    return Flow::DivideError;
                }
                let (q, r) = (dividend / divisor, dividend % divisor);
                let Ok(q) = i32::try_from(q) else {
                    return Flow::DivideError;
                };
                self.regs[Reg::Rax as usize] = u64::from(q as u32);
                self.regs[Reg::Rdx as usize] = u64::from(r as i32 as u32);
            }
            Width::Q => {
                let dividend = ((i128::from(rdx as i64)) << 64) | i128::from(rax);
                let divisor = i128::from(divisor as i64);
                if divisor == 0 {
                    return Flow::DivideError;
                }
                let (q, r) = (dividend / divisor, dividend % divisor);
                let Ok(q) = i64::try_from(q) else {
                    return Flow::DivideError;
                };
                self.regs[Reg::Rax as usize] = q as u64;
                self.regs[Reg::Rdx as usize] = r as i64 as u64;
            }
        }
        Flow::Next
    }

    fn width_of(dst: Operand, src: Operand) -> Result<Width> {
        match (dst, src) {
            (Operand::Reg(_, a) | Operand::Mem(a, _), Operand::Reg(_, b) | Operand::Mem(b, _))
                if a != b =>
            {
                Err(anyhow!("operand size mismatch"))
            }
            (Operand::Reg(_, w) | Operand::Mem(w, _), _) => Ok(w),
            (Operand::Imm(_), _) => bail!("immediate destination"),
        }
    }

    /// Reads an operand, zero-extended to 64 bits.
    fn read(&self, operand: Operand, width: Width) -> Result<u64> {
        Ok(match operand {
            Operand::Reg(reg, Width::Q) => self.regs[reg as usize],
            Operand::Reg(reg, Width::D) => self.regs[reg as usize] & 0xffff_ffff,
            Operand::Imm(imm) => match width {
                Width::Q => imm as u64,
                Width::D => u64::from(i32::try_from(imm)? as u32),
            },
            Operand::Mem(w, disp) => self.load(self.address(disp), w)?,
        })
    }

    /// Writes an operand. 32-bit register writes clear the upper half.
    fn write(&mut self, operand: Operand, value: u64) -> Result<()> {
        match operand {
            Operand::Reg(reg, Width::Q) => self.regs[reg as usize] = value,
            Operand::Reg(reg, Width::D) => self.regs[reg as usize] = value & 0xffff_ffff,
            Operand::Mem(w, disp) => self.store(self.address(disp), w, value)?,
            Operand::Imm(_) => bail!("immediate destination"),
        }
        Ok(())
    }

    fn address(&self, disp: i64) -> u64 {
        self.regs[Reg::Rbp as usize].wrapping_add(disp as u64)
    }

    fn push(&mut self, value: u64) -> Result<()> {
        let rsp = self.regs[Reg::Rsp as usize] - 8;
        self.regs[Reg::Rsp as usize] = rsp;
        self.store(rsp, Width::Q, value)
    }

    fn pop(&mut self) -> Result<u64> {
        let rsp = self.regs[Reg::Rsp as usize];
        let value = self.load(rsp, Width::Q)?;
        self.regs[Reg::Rsp as usize] = rsp + 8;
        Ok(value)
    }

    fn range(address: u64, width: Width) -> Result<std::ops::Range<usize>> {
        let len = match width {
            Width::D => 4,
            Width::Q => 8,
        };
        let start = address
            .checked_sub(STACK_BASE)
            .and_then(|offset| usize::try_from(offset).ok())
            .filter(|&offset| offset + len <= STACK_SIZE)
            .with_context(|| format!("access outside the stack at {address:#x}"))?;
        Ok(start..start + len)
    }

    fn load(&self, address: u64, width: Width) -> Result<u64> {
        let mut bytes = [0; 8];
        let range = Self::range(address, width)?;
        bytes[..range.len()].copy_from_slice(&self.stack[range]);
        Ok(u64::from_le_bytes(bytes))
    }

    fn store(&mut self, address: u64, width: Width, value: u64) -> Result<()> {
        let range = Self::range(address, width)?;
        let len = range.len();
        self.stack[range].copy_from_slice(&value.to_le_bytes()[..len]);
        Ok(())
    }
}
