#[derive(Debug, Clone)]
pub enum CompileError {
    /// A jump whose distance does not fit the signed 16-bit offset field
    JumpOutOfRange {
        from: usize,
        to: usize,
        hint: Option<String>,
    },
    /// Internal compiler error (shouldn't happen in normal use)
    Internal(String),
}

impl CompileError {
    pub fn jump_out_of_range(from: usize, to: usize) -> Self {
        CompileError::JumpOutOfRange {
            from,
            to,
            hint: Some(format!(
                "jump offsets are limited to {}..={} instructions; split the enclosing loop or condition body",
                i16::MIN,
                i16::MAX
            )),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::JumpOutOfRange { from, to, hint } => {
                write!(
                    f,
                    "compile error: jump from {:04} to {:04} is out of range",
                    from, to
                )?;
                if let Some(h) = hint {
                    write!(f, "\n  hint: {}", h)?;
                }
                Ok(())
            }
            CompileError::Internal(msg) => write!(f, "internal compiler error: {}", msg),
        }
    }
}

impl std::error::Error for CompileError {}
