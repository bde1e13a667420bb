use std::io::Write;

use log::debug;

use crate::bytecode::ProgramBc;
use crate::bytecode::op::Op;
use crate::bytecode::stack_check::check_code;
use crate::runtime::runtime_error::{RuntimeError, output_failed, step_limit};
use crate::runtime::store::VarStore;

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Operand stack slots. Programs needing more are rejected before running.
    pub stack_capacity: usize,
    pub max_steps: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_capacity: 512,
            max_steps: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VmStats {
    pub dispatched: usize,
    pub max_depth: usize,
}

/// Stack virtual machine.
///
/// The dispatch loop applies each instruction's precomputed delta to `sp`
/// first; handlers then address their operands at fixed offsets from the
/// new `sp`. The stack grows upward and `sp` counts live values.
pub struct VmBc {
    stack: Vec<i32>,
    store: VarStore,
    config: VmConfig,
    stats: VmStats,
}

impl VmBc {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            stack: Vec::new(),
            store: VarStore::new(&[]),
            config,
            stats: VmStats::default(),
        }
    }

    /// Variable storage of the last run, compiler-owned slots included.
    pub fn store(&self) -> &VarStore {
        &self.store
    }

    pub fn stats(&self) -> &VmStats {
        &self.stats
    }

    pub fn run_compiled(&mut self, prog: &ProgramBc, out: &mut dyn Write) -> Result<(), RuntimeError> {
        let max_depth = check_code(&prog.code, self.config.stack_capacity)
            .map_err(|e| RuntimeError::new(&e.to_string()))?;

        self.stack = vec![0; self.config.stack_capacity];
        self.store = VarStore::new(&prog.decls);
        self.stats = VmStats {
            dispatched: 0,
            max_depth,
        };

        let result = self.exec(prog, out);

        debug!(
            "vm: {} instructions dispatched, max stack depth {}",
            self.stats.dispatched, self.stats.max_depth
        );
        result
    }

    fn exec(&mut self, prog: &ProgramBc, out: &mut dyn Write) -> Result<(), RuntimeError> {
        let code = &prog.code;
        let stack = &mut self.stack;
        let store = &mut self.store;
        let stats = &mut self.stats;
        let max_steps = self.config.max_steps;

        let mut pc: usize = 0;
        let mut sp: usize = 0;

        loop {
            let instr = code[pc];

            stats.dispatched += 1;
            if let Some(max) = max_steps {
                if stats.dispatched > max {
                    return Err(step_limit(max));
                }
            }

            sp = sp.wrapping_add_signed(instr.delta as isize);

            let at = move |e: RuntimeError| e.with_context(&format!("{:04} {}", pc, instr.op.name()));

            match instr.op {
                Op::LoadConst(c) => stack[sp - 1] = c,
                Op::LoadInt(x) => stack[sp - 1] = store.scalar(x).map_err(at)?,
                Op::LoadArr(x) => stack[sp - 1] = store.element(x, stack[sp - 1]).map_err(at)?,
                Op::StoreInt(x) => store.set_scalar(x, stack[sp]).map_err(at)?,
                Op::StoreArr(x) => store.set_element(x, stack[sp + 1], stack[sp]).map_err(at)?,
                Op::SetI(x, c) => store.set_scalar(x, c).map_err(at)?,
                Op::IncI(x, c) => {
                    let v = store.scalar(x).map_err(at)?;
                    store.set_scalar(x, v.wrapping_add(c)).map_err(at)?;
                }
                Op::Incr(c) => stack[sp - 1] = stack[sp - 1].wrapping_add(c),
                Op::CMul(c) => stack[sp - 1] = stack[sp - 1].wrapping_mul(c),
                Op::BinAdd => stack[sp - 1] = stack[sp - 1].wrapping_add(stack[sp]),
                Op::Put => write!(out, "{} ", stack[sp]).map_err(output_failed)?,
                Op::Jmp(offset) => {
                    pc = pc.wrapping_add_signed(offset as isize);
                    continue;
                }
                Op::CJmp(cmp, offset) => {
                    // right was pushed first
                    if cmp.eval(stack[sp + 1], stack[sp]) {
                        pc = pc.wrapping_add_signed(offset as isize);
                        continue;
                    }
                }
                Op::Halt => return Ok(()),
            }

            pc += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::expr::Cmp;
    use crate::lang::program::VarDecl;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn program_from_ops(decls: Vec<VarDecl>, ops: Vec<Op>) -> ProgramBc {
        let user_decls = decls.len();
        ProgramBc::from_ops(decls, user_decls, ops)
    }

    /// Run ops with custom config and return the printed output
    fn run_ops_with_config(
        decls: Vec<VarDecl>,
        ops: Vec<Op>,
        config: VmConfig,
    ) -> Result<(String, VarStore), RuntimeError> {
        let mut vm = VmBc::with_config(config);
        let prog = program_from_ops(decls, ops);
        let mut out = Vec::new();
        vm.run_compiled(&prog, &mut out)?;
        Ok((String::from_utf8(out).unwrap(), vm.store().clone()))
    }

    fn run_ops(decls: Vec<VarDecl>, ops: Vec<Op>) -> Result<(String, VarStore), RuntimeError> {
        run_ops_with_config(decls, ops, VmConfig::default())
    }

    /// Assert the program prints exactly `expected`
    fn assert_output(decls: Vec<VarDecl>, ops: Vec<Op>, expected: &str) {
        let (out, _) = run_ops(decls, ops).expect("execution should succeed");
        assert_eq!(out, expected, "output mismatch");
    }

    /// Assert execution produces an error containing the given substring
    fn assert_error(decls: Vec<VarDecl>, ops: Vec<Op>, error_contains: &str) {
        match run_ops(decls, ops) {
            Ok((out, _)) => panic!(
                "expected error containing '{}', got output: {:?}",
                error_contains, out
            ),
            Err(e) => assert!(
                e.message.contains(error_contains),
                "expected error containing '{}', got: {}",
                error_contains,
                e
            ),
        }
    }

    fn scalars(n: usize) -> Vec<VarDecl> {
        (0..n).map(|i| VarDecl::scalar(format!("v{}", i))).collect()
    }

    // ============================================================
    // Straight-line code
    // ============================================================

    #[test]
    fn test_put_constant() {
        assert_output(vec![], vec![Op::LoadConst(7), Op::Put, Op::Halt], "7 ");
    }

    #[test]
    fn test_arithmetic() {
        // (2 + 3) * 4 + 1
        assert_output(
            vec![],
            vec![
                Op::LoadConst(2),
                Op::LoadConst(3),
                Op::BinAdd,
                Op::CMul(4),
                Op::Incr(1),
                Op::Put,
                Op::Halt,
            ],
            "21 ",
        );
    }

    #[test]
    fn test_arithmetic_wraps() {
        assert_output(
            vec![],
            vec![Op::LoadConst(i32::MAX), Op::Incr(1), Op::Put, Op::LoadConst(i32::MIN), Op::CMul(-1), Op::Put, Op::Halt],
            "-2147483648 -2147483648 ",
        );
    }

    #[test]
    fn test_scalar_store_and_load() {
        let (out, store) = run_ops(
            scalars(2),
            vec![
                Op::LoadConst(5),
                Op::StoreInt(0),
                Op::SetI(1, 10),
                Op::IncI(1, -3),
                Op::LoadInt(0),
                Op::LoadInt(1),
                Op::BinAdd,
                Op::Put,
                Op::Halt,
            ],
        )
        .unwrap();
        assert_eq!(out, "12 ");
        assert_eq!(store.scalar(0).unwrap(), 5);
        assert_eq!(store.scalar(1).unwrap(), 7);
    }

    #[test]
    fn test_array_store_takes_value_then_index() {
        let (out, store) = run_ops(
            vec![VarDecl::array("a", 1, 3)],
            vec![
                Op::LoadConst(42), // value
                Op::LoadConst(3),  // index
                Op::StoreArr(0),
                Op::LoadConst(3),
                Op::LoadArr(0),
                Op::Put,
                Op::Halt,
            ],
        )
        .unwrap();
        assert_eq!(out, "42 ");
        assert_eq!(store.element(0, 3).unwrap(), 42);
        assert_eq!(store.element(0, 1).unwrap(), 0);
    }

    #[test]
    fn test_array_index_out_of_bounds() {
        assert_error(
            vec![VarDecl::array("a", 0, 2)],
            vec![Op::LoadConst(3), Op::LoadArr(0), Op::Put, Op::Halt],
            "out of bounds",
        );
    }

    #[test]
    fn test_error_context_names_instruction() {
        let err = run_ops(
            vec![VarDecl::array("a", 0, 2)],
            vec![Op::LoadConst(1), Op::LoadConst(-1), Op::StoreArr(0), Op::Halt],
        )
        .unwrap_err();
        assert_eq!(err.context, vec!["0002 STORE_ARR".to_string()]);
    }

    #[test]
    fn test_unknown_variable() {
        assert_error(vec![], vec![Op::SetI(0, 1), Op::Halt], "no variable #0");
    }

    // ============================================================
    // Control flow
    // ============================================================

    #[test]
    fn test_jmp_skips_forward() {
        assert_output(
            vec![],
            vec![Op::Jmp(3), Op::LoadConst(1), Op::Put, Op::LoadConst(2), Op::Put, Op::Halt],
            "2 ",
        );
    }

    #[test]
    fn test_cjmp_every_comparison() {
        // left = 2, right = 3
        for cmp in Cmp::ALL {
            let (out, _) = run_ops(
                vec![],
                vec![
                    Op::LoadConst(3),
                    Op::LoadConst(2),
                    Op::CJmp(cmp, 3),
                    Op::LoadConst(0),
                    Op::Put,
                    Op::Halt,
                ],
            )
            .unwrap();
            let taken = cmp.eval(2, 3);
            assert_eq!(out, if taken { "" } else { "0 " }, "{}", cmp);
        }
    }

    #[test]
    fn test_counting_loop() {
        // x := 0; while x < 5 { print x; x += 1 }
        assert_output(
            scalars(1),
            vec![
                Op::SetI(0, 0),
                Op::Jmp(4),
                Op::LoadInt(0),
                Op::Put,
                Op::IncI(0, 1),
                Op::LoadConst(5),
                Op::LoadInt(0),
                Op::CJmp(Cmp::Lt, -5),
                Op::Halt,
            ],
            "0 1 2 3 4 ",
        );
    }

    // ============================================================
    // Limits and validation
    // ============================================================

    #[test]
    fn test_step_limit() {
        let config = VmConfig {
            max_steps: Some(50),
            ..VmConfig::default()
        };
        let err = run_ops_with_config(vec![], vec![Op::Jmp(0), Op::Halt], config).unwrap_err();
        assert!(err.message.contains("step limit exceeded (50)"));
    }

    #[test]
    fn test_capacity_checked_before_running() {
        let config = VmConfig {
            stack_capacity: 2,
            ..VmConfig::default()
        };
        let ops = vec![
            Op::LoadConst(1),
            Op::Put,
            Op::LoadConst(1),
            Op::LoadConst(2),
            Op::LoadConst(3),
            Op::BinAdd,
            Op::BinAdd,
            Op::Put,
            Op::Halt,
        ];
        let err = run_ops_with_config(vec![], ops, config).unwrap_err();
        assert!(err.message.contains("exceeds capacity 2"), "{}", err);
    }

    #[test]
    fn test_underflow_rejected() {
        assert_error(vec![], vec![Op::Put, Op::Halt], "underflow");
    }

    #[test]
    fn test_stats() {
        let mut vm = VmBc::new();
        let prog = program_from_ops(vec![], vec![Op::LoadConst(1), Op::LoadConst(2), Op::BinAdd, Op::Put, Op::Halt]);
        let mut out = Vec::new();
        vm.run_compiled(&prog, &mut out).unwrap();
        assert_eq!(vm.stats(), &VmStats { dispatched: 5, max_depth: 2 });
    }
}
