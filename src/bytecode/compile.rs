use log::debug;

use crate::bytecode::builder::CodeBuilder;
use crate::bytecode::compile_error::CompileError;
use crate::bytecode::{Op, ProgramBc};
use crate::lang::expr::{Cmp, Cond, DeclIdx, Expr, Operand};
use crate::lang::program::{Program, VarDecl};
use crate::lang::stmt::Stmt;

#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Apply peephole fusion while emitting stores.
    pub fuse: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions { fuse: true }
    }
}

/// Lowers a parsed program to stack-machine bytecode.
///
/// Every statement leaves the operand stack empty, so all jump targets sit at
/// stack depth zero.
pub struct Compiler {
    options: CompilerOptions,
    code: CodeBuilder,

    /// Source declarations followed by compiler-owned slots.
    decls: Vec<VarDecl>,

    /// Hidden `for` bound slots, one per loop nesting level.
    bound_slots: Vec<DeclIdx>,
    for_depth: usize,
}

impl Compiler {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Self {
            options,
            code: CodeBuilder::new(),
            decls: Vec::new(),
            bound_slots: Vec::new(),
            for_depth: 0,
        }
    }

    pub fn compile_program(mut self, program: &Program) -> Result<ProgramBc, CompileError> {
        self.decls = program.decls.clone();

        self.compile_block(&program.stmts)?;
        self.code.emit(Op::Halt);

        let ops = self.code.finish();
        debug!(
            "compiled {} statements to {} instructions ({} hidden slots)",
            program.stmts.len(),
            ops.len(),
            self.bound_slots.len()
        );

        Ok(ProgramBc::from_ops(self.decls, program.decls.len(), ops))
    }

    fn compile_block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::If { cond, body } => {
                let skip = self.compile_cond(cond, cond.cmp.invert());
                self.compile_block(body)?;
                self.code.patch_jump(skip, self.code.here())?;
            }

            Stmt::While { cond, body } => {
                let to_check = self.code.emit(Op::Jmp(0));
                let body_start = self.code.here();
                self.compile_block(body)?;

                self.code.patch_jump(to_check, self.code.here())?;
                let back = self.compile_cond(cond, cond.cmp);
                self.code.patch_jump(back, body_start)?;
            }

            Stmt::For {
                var,
                start,
                end,
                body,
            } => {
                let slot = self.bound_slot();
                self.for_depth += 1;

                // start and end are both evaluated before the variable is written
                self.compile_expr(start);
                self.compile_expr(end);
                self.compile_store(&Operand::Scalar(slot));
                self.compile_store(var);

                let to_check = self.code.emit(Op::Jmp(0));
                let body_start = self.code.here();
                self.compile_block(body)?;

                let mut next = Expr::operand(var.clone());
                next.add_constant(1);
                self.compile_expr(&next);
                self.compile_store(var);

                self.code.patch_jump(to_check, self.code.here())?;
                let bound = Cond {
                    cmp: Cmp::Le,
                    left: Expr::operand(var.clone()),
                    right: Expr::operand(Operand::Scalar(slot)),
                };
                let back = self.compile_cond(&bound, Cmp::Le);
                self.code.patch_jump(back, body_start)?;

                self.for_depth -= 1;
            }

            Stmt::Print(value) => {
                self.compile_expr(value);
                self.code.emit(Op::Put);
            }

            Stmt::Assign { target, value } => {
                self.compile_expr(value);
                self.compile_store(target);
            }
        }
        Ok(())
    }

    /// Slot holding the evaluated bound of the `for` loop at the current depth.
    fn bound_slot(&mut self) -> DeclIdx {
        if let Some(&slot) = self.bound_slots.get(self.for_depth) {
            return slot;
        }
        let slot = self.decls.len();
        self.decls
            .push(VarDecl::scalar(format!("$hor{}", self.bound_slots.len())));
        self.bound_slots.push(slot);
        slot
    }

    /// Emits `right, left, CJmp(cmp, _)` and returns the jump's index for
    /// backpatching.
    fn compile_cond(&mut self, cond: &Cond, cmp: Cmp) -> usize {
        self.compile_expr(&cond.right);
        self.compile_expr(&cond.left);
        self.code.emit(Op::CJmp(cmp, 0))
    }

    fn compile_load(&mut self, operand: &Operand) {
        match operand {
            Operand::Scalar(decl) => {
                self.code.emit(Op::LoadInt(*decl));
            }
            Operand::Element { decl, index } => {
                self.compile_expr(index);
                self.code.emit(Op::LoadArr(*decl));
            }
        }
    }

    /// Pops the value on top of the stack into `target`.
    fn compile_store(&mut self, target: &Operand) {
        match target {
            Operand::Scalar(decl) => {
                self.code.emit(Op::StoreInt(*decl));
                if self.options.fuse {
                    self.fuse_store();
                }
            }
            Operand::Element { decl, index } => {
                self.compile_expr(index);
                self.code.emit(Op::StoreArr(*decl));
            }
        }
    }

    /// Peephole rewrites ending at a just-emitted `StoreInt`:
    /// - `LoadInt(x) Incr(c) StoreInt(x)` → `IncI(x, c)`
    /// - `LoadConst(c) StoreInt(x)` → `SetI(x, c)`
    fn fuse_store(&mut self) {
        if let Some(&[Op::LoadInt(src), Op::Incr(c), Op::StoreInt(dst)]) = self.code.tail(3) {
            if src == dst {
                self.code.replace_tail(3, Op::IncI(dst, c));
                return;
            }
        }
        if let Some(&[Op::LoadConst(c), Op::StoreInt(dst)]) = self.code.tail(2) {
            self.code.replace_tail(2, Op::SetI(dst, c));
        }
    }

    /// Emits code leaving the expression's value on top of the stack.
    ///
    /// - no terms: `LoadConst(constant)`
    /// - one term and a nonzero constant: load, `CMul` unless the
    ///   coefficient is 1, `Incr(constant)`
    /// - otherwise the nonzero constant (if any) and one value per run of
    ///   equal coefficients, summed with `BinAdd`. A run adds its operands
    ///   and multiplies once.
    ///
    /// Every `BinAdd` is emitted as soon as its second input is on the stack,
    /// so the depth an expression needs does not grow with its term count.
    pub fn compile_expr(&mut self, expr: &Expr) {
        if expr.terms.is_empty() {
            self.code.emit(Op::LoadConst(expr.constant));
            return;
        }

        if let [term] = expr.terms.as_slice() {
            if expr.constant != 0 {
                self.compile_load(&term.operand);
                if term.coef != 1 {
                    self.code.emit(Op::CMul(term.coef));
                }
                self.code.emit(Op::Incr(expr.constant));
                return;
            }
        }

        let mut items = 0;
        if expr.constant != 0 {
            self.code.emit(Op::LoadConst(expr.constant));
            items += 1;
        }

        for group in expr.terms.chunk_by(|a, b| a.coef == b.coef) {
            for (n, term) in group.iter().enumerate() {
                self.compile_load(&term.operand);
                if n > 0 {
                    self.code.emit(Op::BinAdd);
                }
            }
            if group[0].coef != 1 {
                self.code.emit(Op::CMul(group[0].coef));
            }
            if items > 0 {
                self.code.emit(Op::BinAdd);
            }
            items += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::stack_check::check_code;
    use crate::frontend::parse_source;

    fn compile_with(source: &str, options: CompilerOptions) -> ProgramBc {
        let program = parse_source(source).unwrap();
        Compiler::with_options(options).compile_program(&program).unwrap()
    }

    fn compile(source: &str) -> ProgramBc {
        compile_with(source, CompilerOptions::default())
    }

    fn ops(source: &str) -> Vec<Op> {
        compile(source).ops().collect()
    }

    fn unfused_ops(source: &str) -> Vec<Op> {
        compile_with(source, CompilerOptions { fuse: false }).ops().collect()
    }

    fn expr_ops(decls: usize, expr: &Expr) -> Vec<Op> {
        let mut c = Compiler::new();
        c.decls = (0..decls).map(|i| VarDecl::scalar(format!("v{}", i))).collect();
        c.compile_expr(expr);
        c.code.finish()
    }

    #[test]
    fn test_constant_expression() {
        assert_eq!(expr_ops(0, &Expr::constant(0)), vec![Op::LoadConst(0)]);
        assert_eq!(expr_ops(0, &Expr::constant(-4)), vec![Op::LoadConst(-4)]);
    }

    #[test]
    fn test_single_term_with_constant() {
        let mut e = Expr::constant(3);
        e.add_term(1, Operand::Scalar(0));
        assert_eq!(expr_ops(1, &e), vec![Op::LoadInt(0), Op::Incr(3)]);

        let mut e = Expr::constant(3);
        e.add_term(-2, Operand::Scalar(0));
        assert_eq!(expr_ops(1, &e), vec![Op::LoadInt(0), Op::CMul(-2), Op::Incr(3)]);
    }

    #[test]
    fn test_single_term_without_constant() {
        assert_eq!(expr_ops(1, &Expr::operand(Operand::Scalar(0))), vec![Op::LoadInt(0)]);

        let mut e = Expr::default();
        e.add_term(5, Operand::Scalar(0));
        assert_eq!(expr_ops(1, &e), vec![Op::LoadInt(0), Op::CMul(5)]);
    }

    #[test]
    fn test_coefficient_groups() {
        // 7 + 2a + 2b + c - d
        let mut e = Expr::constant(7);
        e.add_term(2, Operand::Scalar(0));
        e.add_term(2, Operand::Scalar(1));
        e.add_term(1, Operand::Scalar(2));
        e.add_term(-1, Operand::Scalar(3));
        e.normalize();

        assert_eq!(
            expr_ops(4, &e),
            vec![
                Op::LoadConst(7),
                Op::LoadInt(0),
                Op::LoadInt(1),
                Op::BinAdd,
                Op::CMul(2),
                Op::BinAdd,
                Op::LoadInt(2),
                Op::BinAdd,
                Op::LoadInt(3),
                Op::CMul(-1),
                Op::BinAdd,
            ]
        );
    }

    #[test]
    fn test_long_sum_keeps_stack_shallow() {
        let names: Vec<String> = (0..600).map(|i| format!("v{}", i)).collect();
        let source = format!(
            "{{vars {}}} :yosoro {} :yosoro 5+{}",
            names.iter().map(|n| format!("{}:int", n)).collect::<Vec<_>>().join(" "),
            names.join("+"),
            names.join("-"),
        );

        let program = compile(&source);
        assert_eq!(check_code(&program.code, 512).unwrap(), 3);
    }

    #[test]
    fn test_element_load_emits_index_first() {
        assert_eq!(
            ops("{vars a:array[int,0..3] i:int} :yosoro a[i]"),
            vec![Op::LoadInt(1), Op::LoadArr(0), Op::Put, Op::Halt]
        );
    }

    #[test]
    fn test_element_store_emits_value_then_index() {
        assert_eq!(
            ops("{vars a:array[int,0..3] i:int} :set a[i+1], 9"),
            vec![
                Op::LoadConst(9),
                Op::LoadInt(1),
                Op::Incr(1),
                Op::StoreArr(0),
                Op::Halt,
            ]
        );
    }

    #[test]
    fn test_fusion_set_and_increment() {
        assert_eq!(
            ops("{vars x:int} :set x, 5 :set x, x+3"),
            vec![Op::SetI(0, 5), Op::IncI(0, 3), Op::Halt]
        );
        assert_eq!(
            unfused_ops("{vars x:int} :set x, 5 :set x, x+3"),
            vec![
                Op::LoadConst(5),
                Op::StoreInt(0),
                Op::LoadInt(0),
                Op::Incr(3),
                Op::StoreInt(0),
                Op::Halt,
            ]
        );
    }

    #[test]
    fn test_no_fusion_across_variables() {
        assert_eq!(
            ops("{vars x:int y:int} :set y, x+1"),
            vec![Op::LoadInt(0), Op::Incr(1), Op::StoreInt(1), Op::Halt]
        );
    }

    #[test]
    fn test_if_jumps_past_body_with_inverted_cmp() {
        assert_eq!(
            ops("{vars x:int} {ihu lt, x, 5 :yosoro x}"),
            vec![
                Op::LoadConst(5),
                Op::LoadInt(0),
                Op::CJmp(Cmp::Ge, 3),
                Op::LoadInt(0),
                Op::Put,
                Op::Halt,
            ]
        );
    }

    #[test]
    fn test_while_layout() {
        assert_eq!(
            ops("{vars x:int} {while lt, x, 5 :set x, x+1}"),
            vec![
                Op::Jmp(2),
                Op::IncI(0, 1),
                Op::LoadConst(5),
                Op::LoadInt(0),
                Op::CJmp(Cmp::Lt, -3),
                Op::Halt,
            ]
        );
    }

    #[test]
    fn test_for_layout_uses_hidden_bound_slot() {
        let program = compile("{vars i:int} {hor i, 1, 5 :yosoro i}");
        assert_eq!(program.user_decls, 1);
        assert_eq!(program.decls.len(), 2);

        let ops: Vec<Op> = program.ops().collect();
        assert_eq!(
            ops,
            vec![
                Op::LoadConst(1),
                Op::SetI(1, 5),
                Op::StoreInt(0),
                Op::Jmp(4),
                Op::LoadInt(0),
                Op::Put,
                Op::IncI(0, 1),
                Op::LoadInt(1),
                Op::LoadInt(0),
                Op::CJmp(Cmp::Le, -5),
                Op::Halt,
            ]
        );
    }

    #[test]
    fn test_nested_for_gets_one_slot_per_depth() {
        let program = compile(
            "{vars i:int j:int}
             {hor i, 1, 2 {hor j, 1, 2 :yosoro j}}
             {hor i, 1, 2 :yosoro i}",
        );
        assert_eq!(program.decls.len(), 4);
        assert_eq!(program.decls[2].name, "$hor0");
        assert_eq!(program.decls[3].name, "$hor1");
    }

    #[test]
    fn test_deltas_are_filled() {
        let program = compile("{vars x:int} :yosoro x+x+1");
        for instr in &program.code {
            assert_eq!(instr.delta, instr.op.stack_delta());
        }
        assert_eq!(program.code.last().map(|i| i.op), Some(Op::Halt));
    }

    #[test]
    fn test_jump_out_of_range() {
        let mut source = String::from("{vars x:int} {ihu eq, x, 0");
        for _ in 0..17_000 {
            source.push_str(" :yosoro x");
        }
        source.push('}');

        let program = parse_source(&source).unwrap();
        let err = Compiler::new().compile_program(&program).unwrap_err();
        assert!(matches!(err, CompileError::JumpOutOfRange { .. }), "{}", err);
    }
}
