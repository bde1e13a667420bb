use serde::{Deserialize, Serialize};

/// Index of a variable in the declaration table.
pub type DeclIdx = usize;

/// An addressable storage location.
///
/// Equality is structural: two element operands are the same operand only
/// when their (normalized) index expressions are identical, even if they
/// would alias at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A scalar `int` variable.
    Scalar(DeclIdx),
    /// One element of an array variable.
    Element { decl: DeclIdx, index: Box<Expr> },
}

impl Operand {
    pub fn decl(&self) -> DeclIdx {
        match self {
            Operand::Scalar(decl) => *decl,
            Operand::Element { decl, .. } => *decl,
        }
    }
}

/// A `coef * operand` term of a flattened expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub coef: i32,
    pub operand: Operand,
}

/// Flattened linear expression: `constant + Σ coef * operand`.
///
/// After [`Expr::normalize`]:
/// - every operand appears at most once,
/// - no term has a zero coefficient,
/// - terms are ordered by descending coefficient, then ascending
///   declaration index (stable among elements of the same array).
///
/// The constant is always present, so an expression with no terms still
/// evaluates to something.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expr {
    pub constant: i32,
    pub terms: Vec<Term>,
}

impl Expr {
    #[allow(dead_code)]
    pub fn constant(value: i32) -> Self {
        Expr {
            constant: value,
            terms: Vec::new(),
        }
    }

    /// `1 * operand`, already normalized.
    pub fn operand(operand: Operand) -> Self {
        Expr {
            constant: 0,
            terms: vec![Term { coef: 1, operand }],
        }
    }

    pub fn add_constant(&mut self, value: i32) {
        self.constant = self.constant.wrapping_add(value);
    }

    /// Add `coef * operand`, merging into an existing term for the same operand.
    pub fn add_term(&mut self, coef: i32, operand: Operand) {
        match self.terms.iter_mut().find(|t| t.operand == operand) {
            Some(term) => term.coef = term.coef.wrapping_add(coef),
            None => self.terms.push(Term { coef, operand }),
        }
    }

    /// Merge duplicate operands, drop cancelled terms and sort canonically.
    ///
    /// Idempotent: normalizing a normalized expression leaves it unchanged.
    pub fn normalize(&mut self) {
        let mut merged: Vec<Term> = Vec::with_capacity(self.terms.len());
        for term in self.terms.drain(..) {
            match merged.iter_mut().find(|t| t.operand == term.operand) {
                Some(existing) => existing.coef = existing.coef.wrapping_add(term.coef),
                None => merged.push(term),
            }
        }

        merged.retain(|t| t.coef != 0);
        merged.sort_by(|a, b| {
            b.coef
                .cmp(&a.coef)
                .then(a.operand.decl().cmp(&b.operand.decl()))
        });

        self.terms = merged;
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Scalar(decl) => write!(f, "#{}", decl),
            Operand::Element { decl, index } => write!(f, "#{}[{}]", decl, index),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.constant != 0 || self.terms.is_empty() {
            write!(f, "{:+}", self.constant)?;
        }
        for term in &self.terms {
            write!(f, "{:+}*{}", term.coef, term.operand)?;
        }
        Ok(())
    }
}

/// Comparison kind, encoded as a 3-bit truth mask.
///
/// Bit 0 holds the result for `left < right`, bit 1 for `left == right`,
/// bit 2 for `left > right`. Evaluating a comparison is a single shift and
/// mask (see [`Cmp::eval`]), and the logical negation is the 3-bit
/// complement of the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Cmp {
    Lt = 0b001,
    Eq = 0b010,
    Le = 0b011,
    Gt = 0b100,
    Neq = 0b101,
    Ge = 0b110,
}

impl Cmp {
    #[allow(dead_code)]
    pub const ALL: [Cmp; 6] = [Cmp::Lt, Cmp::Eq, Cmp::Le, Cmp::Gt, Cmp::Neq, Cmp::Ge];

    pub fn mask(self) -> u8 {
        self as u8
    }

    /// Comparison that holds exactly when `self` does not.
    pub fn invert(self) -> Cmp {
        match self {
            Cmp::Lt => Cmp::Ge,
            Cmp::Eq => Cmp::Neq,
            Cmp::Le => Cmp::Gt,
            Cmp::Gt => Cmp::Le,
            Cmp::Neq => Cmp::Eq,
            Cmp::Ge => Cmp::Lt,
        }
    }

    /// Branchless comparison: `gt + ge` is 0, 1 or 2 for less, equal and
    /// greater, which selects the matching bit of the mask.
    #[inline(always)]
    pub fn eval(self, left: i32, right: i32) -> bool {
        let gt = (left > right) as u8;
        let ge = (left >= right) as u8;
        (self.mask() >> (gt + ge)) & 1 == 1
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Cmp::Lt => "lt",
            Cmp::Eq => "eq",
            Cmp::Le => "le",
            Cmp::Gt => "gt",
            Cmp::Neq => "neq",
            Cmp::Ge => "ge",
        }
    }
}

impl std::fmt::Display for Cmp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// `cmp, left, right` as written after `ihu` / `while`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cond {
    pub cmp: Cmp,
    pub left: Expr,
    pub right: Expr,
}

impl std::fmt::Display for Cond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.cmp, self.left, self.right)
    }
}
