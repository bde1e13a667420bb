use super::expr::{Cond, Expr, Operand};

/// Statement of a CYaRon program.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    // ─────────────────────────── Blocks ───────────────────────────
    /// `{ihu cond ...}`: run the body once when the condition holds.
    If { cond: Cond, body: Vec<Stmt> },

    /// `{while cond ...}`: re-test before every iteration.
    While { cond: Cond, body: Vec<Stmt> },

    /// `{hor var, start, end ...}`: counted loop over `start..=end`.
    ///
    /// `start` and `end` are evaluated once, before the first iteration.
    For {
        var: Operand,
        start: Expr,
        end: Expr,
        body: Vec<Stmt>,
    },

    // ────────────────────────── Commands ──────────────────────────
    /// `:yosoro expr`
    Print(Expr),

    /// `:set target, value`
    Assign { target: Operand, value: Expr },
}

impl Stmt {
    fn fmt_indented(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        let pad = "    ".repeat(depth);
        match self {
            Stmt::If { cond, body } => {
                writeln!(f, "{}If({}){{", pad, cond)?;
                fmt_block(body, f, depth + 1)?;
                writeln!(f, "{}}}", pad)
            }
            Stmt::While { cond, body } => {
                writeln!(f, "{}While({}){{", pad, cond)?;
                fmt_block(body, f, depth + 1)?;
                writeln!(f, "{}}}", pad)
            }
            Stmt::For {
                var,
                start,
                end,
                body,
            } => {
                writeln!(f, "{}For({},{},{}){{", pad, var, start, end)?;
                fmt_block(body, f, depth + 1)?;
                writeln!(f, "{}}}", pad)
            }
            Stmt::Print(value) => writeln!(f, "{}Print({})", pad, value),
            Stmt::Assign { target, value } => writeln!(f, "{}Set({},{})", pad, target, value),
        }
    }
}

pub(crate) fn fmt_block(
    stmts: &[Stmt],
    f: &mut std::fmt::Formatter<'_>,
    depth: usize,
) -> std::fmt::Result {
    for stmt in stmts {
        stmt.fmt_indented(f, depth)?;
    }
    Ok(())
}

impl std::fmt::Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::expr::Cmp;

    #[test]
    fn test_display_nests_blocks() {
        let stmt = Stmt::While {
            cond: Cond {
                cmp: Cmp::Lt,
                left: Expr::operand(Operand::Scalar(0)),
                right: Expr::constant(5),
            },
            body: vec![
                Stmt::Assign {
                    target: Operand::Scalar(0),
                    value: {
                        let mut e = Expr::constant(1);
                        e.add_term(1, Operand::Scalar(0));
                        e
                    },
                },
                Stmt::Print(Expr::operand(Operand::Scalar(0))),
            ],
        };

        assert_eq!(
            stmt.to_string(),
            "While(lt,+1*#0,+5){\n    Set(#0,+1+1*#0)\n    Print(+1*#0)\n}\n"
        );
    }
}
