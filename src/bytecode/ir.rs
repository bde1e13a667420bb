use serde::{Deserialize, Serialize};

use crate::bytecode::Op;
use crate::lang::program::VarDecl;

/// One instruction together with its precomputed stack-depth change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instr {
    pub op: Op,
    pub delta: i8,
}

impl Instr {
    pub fn new(op: Op) -> Self {
        Instr {
            op,
            delta: op.stack_delta(),
        }
    }
}

/// A compiled bytecode program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramBc {
    /// Declaration table. The first `user_decls` entries mirror the source
    /// program; the rest are compiler-owned temporaries (loop bounds).
    pub decls: Vec<VarDecl>,
    pub user_decls: usize,

    /// Instruction stream, always terminated by `Halt`.
    pub code: Vec<Instr>,
}

impl ProgramBc {
    /// Wraps raw ops, computing every instruction's stack delta.
    pub fn from_ops(decls: Vec<VarDecl>, user_decls: usize, ops: Vec<Op>) -> Self {
        ProgramBc {
            decls,
            user_decls,
            code: ops.into_iter().map(Instr::new).collect(),
        }
    }

    /// Serializes into a postcard bytecode image.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Reads a postcard bytecode image.
    ///
    /// Stored deltas are not trusted: they are recomputed from the opcodes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        let mut program: ProgramBc = postcard::from_bytes(bytes)?;
        for instr in &mut program.code {
            instr.delta = instr.op.stack_delta();
        }
        Ok(program)
    }

    #[allow(dead_code)]
    pub fn ops(&self) -> impl Iterator<Item = Op> + '_ {
        self.code.iter().map(|i| i.op)
    }
}
