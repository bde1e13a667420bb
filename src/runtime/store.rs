use crate::lang::expr::DeclIdx;
use crate::lang::program::{VarDecl, VarKind};
use crate::runtime::runtime_error::{RuntimeError, index_out_of_bounds};

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Scalar(i32),
    Array { start: i32, cells: Vec<i32> },
}

/// Storage for every declared variable of one run.
///
/// Built from a declaration table with all cells zeroed; slot `i` backs
/// declaration `i`. Both backends read and write through this type, so two
/// stores can be compared after running the same program.
#[derive(Debug, Clone, PartialEq)]
pub struct VarStore {
    names: Vec<String>,
    slots: Vec<Slot>,
}

impl VarStore {
    pub fn new(decls: &[VarDecl]) -> Self {
        let slots = decls
            .iter()
            .map(|decl| match decl.kind {
                VarKind::Scalar => Slot::Scalar(0),
                VarKind::Array { start, .. } => Slot::Array {
                    start,
                    cells: vec![0; decl.cells()],
                },
            })
            .collect();

        VarStore {
            names: decls.iter().map(|d| d.name.clone()).collect(),
            slots,
        }
    }

    fn missing(&self, decl: DeclIdx) -> RuntimeError {
        RuntimeError::new(&format!("no variable #{} ({} declared)", decl, self.slots.len()))
    }

    fn shape_mismatch(&self, decl: DeclIdx, expected: &str) -> RuntimeError {
        RuntimeError::new(&format!(
            "variable '{}' is not {}",
            self.names[decl], expected
        ))
    }

    pub fn scalar(&self, decl: DeclIdx) -> Result<i32, RuntimeError> {
        match self.slots.get(decl) {
            Some(Slot::Scalar(v)) => Ok(*v),
            Some(Slot::Array { .. }) => Err(self.shape_mismatch(decl, "a scalar")),
            None => Err(self.missing(decl)),
        }
    }

    pub fn set_scalar(&mut self, decl: DeclIdx, value: i32) -> Result<(), RuntimeError> {
        match self.slots.get_mut(decl) {
            Some(Slot::Scalar(v)) => {
                *v = value;
                Ok(())
            }
            Some(Slot::Array { .. }) => Err(self.shape_mismatch(decl, "a scalar")),
            None => Err(self.missing(decl)),
        }
    }

    /// Position of `index` in the array's cell buffer.
    fn cell(&self, decl: DeclIdx, index: i32) -> Result<usize, RuntimeError> {
        match self.slots.get(decl) {
            Some(Slot::Array { start, cells }) => {
                let offset = index as i64 - *start as i64;
                if offset < 0 || offset >= cells.len() as i64 {
                    let end = (*start as i64 + cells.len() as i64 - 1) as i32;
                    return Err(index_out_of_bounds(&self.names[decl], index, *start, end));
                }
                Ok(offset as usize)
            }
            Some(Slot::Scalar(_)) => Err(self.shape_mismatch(decl, "an array")),
            None => Err(self.missing(decl)),
        }
    }

    pub fn element(&self, decl: DeclIdx, index: i32) -> Result<i32, RuntimeError> {
        let at = self.cell(decl, index)?;
        match &self.slots[decl] {
            Slot::Array { cells, .. } => Ok(cells[at]),
            Slot::Scalar(_) => Err(self.shape_mismatch(decl, "an array")),
        }
    }

    pub fn set_element(&mut self, decl: DeclIdx, index: i32, value: i32) -> Result<(), RuntimeError> {
        let at = self.cell(decl, index)?;
        match &mut self.slots[decl] {
            Slot::Array { cells, .. } => {
                cells[at] = value;
                Ok(())
            }
            Slot::Scalar(_) => Err(self.shape_mismatch(decl, "an array")),
        }
    }

    /// Current value of a scalar, looked up by name.
    #[allow(dead_code)]
    pub fn scalar_named(&self, name: &str) -> Option<i32> {
        let decl = self.names.iter().position(|n| n == name)?;
        self.scalar(decl).ok()
    }

    /// Drops slots past the first `len`, e.g. compiler-owned temporaries.
    pub fn truncate(&mut self, len: usize) {
        self.names.truncate(len);
        self.slots.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VarStore {
        VarStore::new(&[VarDecl::scalar("a"), VarDecl::array("b", -2, 2)])
    }

    #[test]
    fn test_zero_initialized() {
        let s = store();
        assert_eq!(s.scalar(0).unwrap(), 0);
        for i in -2..=2 {
            assert_eq!(s.element(1, i).unwrap(), 0);
        }
    }

    #[test]
    fn test_element_addressed_relative_to_start() {
        let mut s = store();
        s.set_element(1, -2, 10).unwrap();
        s.set_element(1, 2, 50).unwrap();
        assert_eq!(s.element(1, -2).unwrap(), 10);
        assert_eq!(s.element(1, 2).unwrap(), 50);
        assert_eq!(s.element(1, 0).unwrap(), 0);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut s = store();
        let err = s.element(1, 3).unwrap_err();
        assert!(err.message.contains("index 3 out of bounds for array 'b' [-2..2]"), "{}", err);
        assert!(s.set_element(1, -3, 1).is_err());
        assert!(s.element(1, i32::MIN).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let mut s = store();
        assert!(s.scalar(1).unwrap_err().message.contains("not a scalar"));
        assert!(s.set_element(0, 0, 1).unwrap_err().message.contains("not an array"));
        assert!(s.scalar(9).unwrap_err().message.contains("no variable #9"));
    }

    #[test]
    fn test_scalar_named() {
        let mut s = store();
        s.set_scalar(0, 42).unwrap();
        assert_eq!(s.scalar_named("a"), Some(42));
        assert_eq!(s.scalar_named("b"), None);
        assert_eq!(s.scalar_named("zz"), None);
    }

    #[test]
    fn test_truncate_drops_trailing_slots() {
        let mut s = store();
        s.truncate(1);
        assert!(s.element(1, 0).is_err());
        assert_eq!(s, VarStore::new(&[VarDecl::scalar("a")]));
    }
}
