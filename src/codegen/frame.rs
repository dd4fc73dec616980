use std::collections::HashMap;

use crate::{
    ast::{Function, StmtKind, Typed},
    types::Type,
};

/// Stack frames are kept 16-byte aligned, as the System V ABI requires at
/// call boundaries.
pub const FRAME_ALIGNMENT: u32 = 16;

/// Where a variable lives inside its function's frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    /// Distance in bytes below `rbp`. The value occupies
    /// `[rbp - offset, rbp - offset + size)`.
    pub offset: u32,
    pub ty: Type,
}

/// The symbol table of a single function: every parameter and `let`, in
/// declaration order, mapped to its own stack slot.
///
/// Built right before a function is emitted and dropped right after, so
/// offsets never leak from one function into another.
#[derive(Debug)]
pub struct FrameLayout {
    slots: HashMap<Box<str>, Slot>,
    size: u32,
}

impl FrameLayout {
    pub fn of(function: &Function<Typed>) -> FrameLayout {
        let mut layout = FrameLayout {
            slots: HashMap::new(),
            size: 0,
        };

        for param in &function.params {
            layout.push(&param.name.name, param.ty);
        }
        for stmt in &function.body.stmts {
            if let StmtKind::Declaration(declaration) = &stmt.kind {
                layout.push(&declaration.name.name, declaration.ty);
            }
        }

        layout.size = align_up(layout.size, FRAME_ALIGNMENT);
        layout
    }

    /// Total bytes to reserve below `rbp`. Always a multiple of
    /// [`FRAME_ALIGNMENT`].
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn get(&self, name: &str) -> Option<Slot> {
        self.slots.get(name).copied()
    }

    fn push(&mut self, name: &str, ty: Type) {
        let offset = align_up(self.size + ty.size(), ty.size());
        let previous = self.slots.insert(Box::from(name), Slot { offset, ty });
        assert!(previous.is_none(), "{name} was given two frame slots");
        self.size = offset;
    }
}

const fn align_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}
