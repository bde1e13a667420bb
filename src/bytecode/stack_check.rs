use crate::bytecode::Op;
use crate::bytecode::ir::Instr;

#[derive(Debug)]
pub struct StackCheckError {
    pub message: String,
}

impl std::fmt::Display for StackCheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stack-check error: {}", self.message)
    }
}

impl std::error::Error for StackCheckError {}

impl StackCheckError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Validates an instruction stream before execution and returns its maximum
/// stack depth.
///
/// The scan is linear: the depth entering each instruction is the depth after
/// its predecessor. That is exact for jump-based code as long as every jump
/// arrives with the same depth the fallthrough path has at its target, which
/// is checked here. Under that condition the VM can index its stack without
/// bounds checks failing:
/// - no instruction reads below the bottom of the stack,
/// - the depth never exceeds `capacity`,
/// - every jump lands inside the code,
/// - the code ends with `Halt`, so `pc` never runs off the end,
/// - each stored delta matches its opcode.
pub fn check_code(code: &[Instr], capacity: usize) -> Result<usize, StackCheckError> {
    match code.last() {
        Some(Instr { op: Op::Halt, .. }) => {}
        _ => return Err(StackCheckError::new("code must end with HALT")),
    }

    let mut depth_before = Vec::with_capacity(code.len());
    let mut arrivals: Vec<(usize, usize, i64)> = Vec::new();
    let mut h: i64 = 0;
    let mut max: i64 = 0;

    for (ip, instr) in code.iter().enumerate() {
        let op = &instr.op;
        if instr.delta != op.stack_delta() {
            return Err(StackCheckError::new(format!(
                "wrong stack delta at ip={}, op={:?}: {} (expected {})",
                ip,
                op,
                instr.delta,
                op.stack_delta()
            )));
        }

        depth_before.push(h);

        let needed = op.stack_inputs() as i64;
        if h < needed {
            return Err(StackCheckError::new(format!(
                "stack underflow at ip={}, op={:?}, needed {} items",
                ip, op, needed
            )));
        }

        h += instr.delta as i64;
        max = max.max(h);

        if let Some(offset) = op.jump_offset() {
            let target = ip as i64 + offset as i64;
            if target < 0 || target >= code.len() as i64 {
                return Err(StackCheckError::new(format!(
                    "jump at ip={} lands outside the code (→ {})",
                    ip, target
                )));
            }
            arrivals.push((ip, target as usize, h));
        }
    }

    for (ip, target, h) in arrivals {
        if depth_before[target] != h {
            return Err(StackCheckError::new(format!(
                "jump at ip={} arrives at ip={} with depth {}, fallthrough has {}",
                ip, target, h, depth_before[target]
            )));
        }
    }

    let max = max as usize;
    if max > capacity {
        return Err(StackCheckError::new(format!(
            "stack depth {} exceeds capacity {}",
            max, capacity
        )));
    }
    Ok(max)
}
