use serde::{Deserialize, Serialize};

use super::expr::DeclIdx;
use super::stmt::{Stmt, fmt_block};

/// Storage shape of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Scalar,
    /// Inclusive index range `start..=end`.
    Array { start: i32, end: i32 },
}

/// Entry of the declaration table. Its position in the table is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub kind: VarKind,
}

impl VarDecl {
    pub fn scalar(name: impl Into<String>) -> Self {
        VarDecl {
            name: name.into(),
            kind: VarKind::Scalar,
        }
    }

    #[allow(dead_code)]
    pub fn array(name: impl Into<String>, start: i32, end: i32) -> Self {
        VarDecl {
            name: name.into(),
            kind: VarKind::Array { start, end },
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, VarKind::Array { .. })
    }

    /// Number of storage cells.
    pub fn cells(&self) -> usize {
        match self.kind {
            VarKind::Scalar => 1,
            VarKind::Array { start, end } => (end as i64 - start as i64 + 1).max(0) as usize,
        }
    }
}

/// Parsed CYaRon program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Declaration table; operands refer to entries by index.
    pub decls: Vec<VarDecl>,
    /// Top-level statements in source order.
    pub stmts: Vec<Stmt>,
}

impl Program {
    #[allow(dead_code)]
    pub fn decl(&self, idx: DeclIdx) -> &VarDecl {
        &self.decls[idx]
    }

    /// Index of the declaration named `name`.
    #[allow(dead_code)]
    pub fn lookup(&self, name: &str) -> Option<DeclIdx> {
        self.decls.iter().position(|d| d.name == name)
    }
}

impl std::fmt::Display for VarDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            VarKind::Scalar => write!(f, "{}:int", self.name),
            VarKind::Array { start, end } => {
                write!(f, "{}:array[int,{}..{}]", self.name, start, end)
            }
        }
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Vars{{")?;
        for (idx, decl) in self.decls.iter().enumerate() {
            writeln!(f, "    #{} {}", idx, decl)?;
        }
        writeln!(f, "}}")?;
        fmt_block(&self.stmts, f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::expr::{Expr, Operand};

    #[test]
    fn test_cells() {
        assert_eq!(VarDecl::scalar("a").cells(), 1);
        assert_eq!(VarDecl::array("b", 1, 100).cells(), 100);
        assert_eq!(VarDecl::array("c", -3, 3).cells(), 7);
        assert_eq!(VarDecl::array("d", 5, 5).cells(), 1);
    }

    #[test]
    fn test_lookup_by_name() {
        let program = Program {
            decls: vec![VarDecl::scalar("a"), VarDecl::array("b", 0, 4)],
            stmts: vec![],
        };
        assert_eq!(program.lookup("b"), Some(1));
        assert_eq!(program.lookup("c"), None);
        assert!(program.decl(1).is_array());
    }

    #[test]
    fn test_display() {
        let program = Program {
            decls: vec![VarDecl::scalar("a"), VarDecl::array("b", 1, 3)],
            stmts: vec![Stmt::Print(Expr::operand(Operand::Scalar(0)))],
        };
        assert_eq!(
            program.to_string(),
            "Vars{\n    #0 a:int\n    #1 b:array[int,1..3]\n}\nPrint(+1*#0)\n"
        );
    }
}
