pub mod runtime_error;
pub mod store;
pub mod vm_ast;
pub mod vm_bc;
