use crate::bytecode::Op;
use crate::bytecode::compile_error::CompileError;

/// Append-only op buffer with backpatching and tail rewriting.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    ops: Vec<Op>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next emitted op will get.
    pub fn here(&self) -> usize {
        self.ops.len()
    }

    pub fn emit(&mut self, op: Op) -> usize {
        self.ops.push(op);
        self.ops.len() - 1
    }

    /// The last `n` ops, or `None` when fewer have been emitted.
    pub fn tail(&self, n: usize) -> Option<&[Op]> {
        self.ops.len().checked_sub(n).map(|start| &self.ops[start..])
    }

    /// Replaces the last `n` ops with `op`.
    ///
    /// Callers only rewrite windows that no jump targets the inside of.
    pub fn replace_tail(&mut self, n: usize, op: Op) {
        let start = self.ops.len().saturating_sub(n);
        self.ops.truncate(start);
        self.ops.push(op);
    }

    /// Points the jump at `at` to `target`. Offsets are relative to `at`.
    pub fn patch_jump(&mut self, at: usize, target: usize) -> Result<(), CompileError> {
        let offset = target as i64 - at as i64;
        let offset = i16::try_from(offset).map_err(|_| CompileError::jump_out_of_range(at, target))?;

        match self.ops.get(at).copied() {
            Some(op @ (Op::Jmp(_) | Op::CJmp(..))) => {
                self.ops[at] = op.with_offset(offset);
                Ok(())
            }
            other => Err(CompileError::internal(format!(
                "patch target {} is not a jump: {:?}",
                at, other
            ))),
        }
    }

    pub fn finish(self) -> Vec<Op> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::expr::Cmp;

    #[test]
    fn test_tail_and_replace() {
        let mut b = CodeBuilder::new();
        b.emit(Op::LoadInt(0));
        b.emit(Op::Incr(1));
        b.emit(Op::StoreInt(0));

        assert_eq!(b.tail(2), Some(&[Op::Incr(1), Op::StoreInt(0)][..]));
        assert_eq!(b.tail(4), None);

        b.replace_tail(3, Op::IncI(0, 1));
        assert_eq!(b.finish(), vec![Op::IncI(0, 1)]);
    }

    #[test]
    fn test_patch_forward_and_backward() {
        let mut b = CodeBuilder::new();
        let fwd = b.emit(Op::Jmp(0));
        b.emit(Op::Put);
        let back = b.emit(Op::CJmp(Cmp::Lt, 0));
        b.patch_jump(fwd, b.here()).unwrap();
        b.patch_jump(back, 1).unwrap();

        assert_eq!(b.finish(), vec![Op::Jmp(3), Op::Put, Op::CJmp(Cmp::Lt, -1)]);
    }

    #[test]
    fn test_patch_out_of_range() {
        let mut b = CodeBuilder::new();
        let at = b.emit(Op::Jmp(0));
        let err = b.patch_jump(at, 40_000).unwrap_err();
        assert!(matches!(err, CompileError::JumpOutOfRange { from: 0, to: 40_000, .. }));
    }

    #[test]
    fn test_patch_non_jump_is_internal_error() {
        let mut b = CodeBuilder::new();
        let at = b.emit(Op::Put);
        assert!(matches!(b.patch_jump(at, 0), Err(CompileError::Internal(_))));
    }
}
