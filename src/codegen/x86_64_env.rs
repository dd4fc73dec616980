/// Object-format details for one x86-64 target. The instruction set is shared;
/// only directives and symbol spelling differ.
pub trait Env {
    const ENTRY_POINT: &str;

    const GLOBAL_PROLOGUE: &str;

    const SECTION_TEXT: &str;
    const SECTION_DATA: &str;

    /// Prefix that keeps a label out of the object's symbol table.
    const LOCAL_LABEL_PREFIX: &str;
}

impl Env for Darwin {
    const ENTRY_POINT: &str = "_main";

    const GLOBAL_PROLOGUE: &str = ".intel_syntax noprefix\n";

    const SECTION_TEXT: &str = "__TEXT,__text,regular,pure_instructions";
    const SECTION_DATA: &str = "__DATA,__data";

    const LOCAL_LABEL_PREFIX: &str = "L";
}

impl Env for Linux {
    const ENTRY_POINT: &str = "main";

    const GLOBAL_PROLOGUE: &str = concat!(
        ".intel_syntax noprefix\n",
        ".section .note.GNU-stack,\"\",@progbits\n",
    );

    const SECTION_TEXT: &str = ".text";
    const SECTION_DATA: &str = ".data";

    const LOCAL_LABEL_PREFIX: &str = ".L";
}

pub struct Darwin;

pub struct Linux;
