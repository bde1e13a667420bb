use serde::{Deserialize, Serialize};

use crate::lang::expr::{Cmp, DeclIdx};

// =============================================================================
// OP - Bytecode instructions
// =============================================================================

/// Stack-machine instruction.
///
/// Stack effects are written for the operand stack, top on the right.
/// Jump offsets are relative to the jump's own index: `Jmp(1)` falls
/// through, `Jmp(0)` spins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    // literals / loads
    /// `( -- c )`
    LoadConst(i32),
    /// `( -- x )`
    LoadInt(DeclIdx),
    /// `( i -- x[i] )`
    LoadArr(DeclIdx),

    // stores
    /// `( v -- )`
    StoreInt(DeclIdx),
    /// `( v i -- )`
    StoreArr(DeclIdx),

    // fused store-side instructions, no stack traffic
    /// `x := c`
    SetI(DeclIdx, i32),
    /// `x := x + c`
    IncI(DeclIdx, i32),

    // arithmetic
    /// `( a -- a+c )`
    Incr(i32),
    /// `( a -- a*c )`
    CMul(i32),
    /// `( a b -- a+b )`
    BinAdd,

    // I/O
    /// `( v -- )`, prints `v` followed by a space
    Put,

    // control flow
    Jmp(i16),
    /// `( right left -- )`, jumps when `cmp.eval(left, right)`
    CJmp(Cmp, i16),
    Halt,
}

impl Op {
    /// Net change of the stack depth. Depends on the opcode only.
    pub fn stack_delta(&self) -> i8 {
        match self {
            Op::LoadConst(_) | Op::LoadInt(_) => 1,
            Op::LoadArr(_) => 0,
            Op::StoreInt(_) => -1,
            Op::StoreArr(_) => -2,
            Op::SetI(..) | Op::IncI(..) => 0,
            Op::Incr(_) | Op::CMul(_) => 0,
            Op::BinAdd => -1,
            Op::Put => -1,
            Op::Jmp(_) => 0,
            Op::CJmp(..) => -2,
            Op::Halt => 0,
        }
    }

    /// Values read from the stack before the handler writes its result.
    pub fn stack_inputs(&self) -> u8 {
        match self {
            Op::LoadArr(_) | Op::StoreInt(_) | Op::Incr(_) | Op::CMul(_) | Op::Put => 1,
            Op::StoreArr(_) | Op::BinAdd | Op::CJmp(..) => 2,
            _ => 0,
        }
    }

    pub fn jump_offset(&self) -> Option<i16> {
        match self {
            Op::Jmp(offset) | Op::CJmp(_, offset) => Some(*offset),
            _ => None,
        }
    }

    /// Same instruction with its jump offset replaced.
    pub fn with_offset(self, offset: i16) -> Op {
        match self {
            Op::Jmp(_) => Op::Jmp(offset),
            Op::CJmp(cmp, _) => Op::CJmp(cmp, offset),
            other => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::LoadConst(_) => "LOAD_CONST",
            Op::LoadInt(_) => "LOAD_INT",
            Op::LoadArr(_) => "LOAD_ARR",
            Op::StoreInt(_) => "STORE_INT",
            Op::StoreArr(_) => "STORE_ARR",
            Op::SetI(..) => "SET_I",
            Op::IncI(..) => "INC_I",
            Op::Incr(_) => "INCR",
            Op::CMul(_) => "CMUL",
            Op::BinAdd => "BIN_ADD",
            Op::Put => "PUT",
            Op::Jmp(_) => "JMP",
            Op::CJmp(..) => "CJMP",
            Op::Halt => "HALT",
        }
    }
}
