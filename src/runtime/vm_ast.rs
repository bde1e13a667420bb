use std::io::Write;

use log::debug;

use crate::lang::expr::{Cond, Expr, Operand};
use crate::lang::program::Program;
use crate::lang::stmt::Stmt;
use crate::runtime::runtime_error::{RuntimeError, output_failed, step_limit};
use crate::runtime::store::VarStore;

#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// Upper bound on executed statements plus loop iterations.
    pub max_steps: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpreterStats {
    pub operand_reads: usize,
    pub operand_writes: usize,
    pub expr_evals: usize,
    pub steps: usize,
}

/// Tree-walking interpreter over the parsed program.
pub struct VmAst<'p> {
    program: &'p Program,
    store: VarStore,
    config: InterpreterConfig,
    stats: InterpreterStats,
}

impl<'p> VmAst<'p> {
    #[allow(dead_code)]
    pub fn new(program: &'p Program) -> Self {
        Self::with_config(program, InterpreterConfig::default())
    }

    pub fn with_config(program: &'p Program, config: InterpreterConfig) -> Self {
        VmAst {
            program,
            store: VarStore::new(&program.decls),
            config,
            stats: InterpreterStats::default(),
        }
    }

    pub fn store(&self) -> &VarStore {
        &self.store
    }

    pub fn stats(&self) -> &InterpreterStats {
        &self.stats
    }

    /// Runs the program from a fresh, zeroed store. Printed values go to `out`.
    pub fn run(&mut self, out: &mut dyn Write) -> Result<(), RuntimeError> {
        self.store = VarStore::new(&self.program.decls);
        self.stats = InterpreterStats::default();

        let program = self.program;
        let result = self.exec_block(&program.stmts, out);

        debug!(
            "interpreter: {} steps, {} expression evaluations, {} reads, {} writes",
            self.stats.steps,
            self.stats.expr_evals,
            self.stats.operand_reads,
            self.stats.operand_writes
        );
        result
    }

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.stats.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.stats.steps > max {
                return Err(step_limit(max));
            }
        }
        Ok(())
    }

    fn exec_block(&mut self, stmts: &[Stmt], out: &mut dyn Write) -> Result<(), RuntimeError> {
        for stmt in stmts {
            self.exec_stmt(stmt, out)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt, out: &mut dyn Write) -> Result<(), RuntimeError> {
        self.check_limits()?;

        match stmt {
            Stmt::If { cond, body } => {
                if self.eval_cond(cond)? {
                    self.exec_block(body, out)?;
                }
            }
            Stmt::While { cond, body } => {
                while self.eval_cond(cond)? {
                    self.exec_block(body, out)?;
                    self.check_limits()?;
                }
            }
            Stmt::For {
                var,
                start,
                end,
                body,
            } => {
                let first = self.eval(start)?;
                let last = self.eval(end)?;
                self.write(var, first)?;

                while self.read(var)? <= last {
                    self.exec_block(body, out)?;
                    let next = self.read(var)?.wrapping_add(1);
                    self.write(var, next)?;
                    self.check_limits()?;
                }
            }
            Stmt::Print(value) => {
                let v = self.eval(value)?;
                write!(out, "{} ", v).map_err(output_failed)?;
            }
            Stmt::Assign { target, value } => {
                let v = self.eval(value)?;
                self.write(target, v)?;
            }
        }
        Ok(())
    }

    fn eval_cond(&mut self, cond: &Cond) -> Result<bool, RuntimeError> {
        let left = self.eval(&cond.left)?;
        let right = self.eval(&cond.right)?;
        Ok(cond.cmp.eval(left, right))
    }

    /// `constant + Σ coef * operand` with wrapping arithmetic.
    fn eval(&mut self, expr: &Expr) -> Result<i32, RuntimeError> {
        self.stats.expr_evals += 1;

        let mut acc = expr.constant;
        for term in &expr.terms {
            let v = self.read(&term.operand)?;
            acc = acc.wrapping_add(term.coef.wrapping_mul(v));
        }
        Ok(acc)
    }

    fn read(&mut self, operand: &Operand) -> Result<i32, RuntimeError> {
        self.stats.operand_reads += 1;

        match operand {
            Operand::Scalar(decl) => self.store.scalar(*decl),
            Operand::Element { decl, index } => {
                let i = self.eval(index)?;
                self.store.element(*decl, i)
            }
        }
    }

    /// Element targets evaluate their index here, after the stored value.
    fn write(&mut self, operand: &Operand, value: i32) -> Result<(), RuntimeError> {
        self.stats.operand_writes += 1;

        match operand {
            Operand::Scalar(decl) => self.store.set_scalar(*decl, value),
            Operand::Element { decl, index } => {
                let i = self.eval(index)?;
                self.store.set_element(*decl, i, value)
            }
        }
    }
}
