#[derive(Debug)]
pub struct RuntimeError {
    pub message: String,
    pub context: Vec<String>,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime error: {}", self.message)?;

        if !self.context.is_empty() {
            write!(f, "\n  while:")?;

            for (i, frame) in self.context.iter().rev().enumerate() {
                write!(f, "\n    {}: {}", i, frame)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn new(msg: &str) -> Self {
        RuntimeError {
            message: msg.to_string(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context.push(context.to_string());
        self
    }
}

pub fn index_out_of_bounds(name: &str, index: i32, start: i32, end: i32) -> RuntimeError {
    RuntimeError::new(&format!(
        "index {} out of bounds for array '{}' [{}..{}]",
        index, name, start, end
    ))
}

pub fn step_limit(max: usize) -> RuntimeError {
    RuntimeError::new(&format!("execution step limit exceeded ({})", max))
}

pub fn output_failed(err: std::io::Error) -> RuntimeError {
    RuntimeError::new(&format!("failed to write output: {}", err))
}
