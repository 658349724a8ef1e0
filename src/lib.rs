//! A single-pass bytecode compiler and stack VM for a small scripting
//! language: numbers, booleans, `nil`, global variables, arithmetic and
//! comparison operators, `print`, `if`/`else`, and `while`.
//!
//! [`compiler::compile`] lowers source text straight into a [`chunk::Chunk`]
//! with no intermediate AST; [`vm::Vm`] then executes that chunk. Diagnostics
//! from either phase flow through the [`error::Reporter`] trait rather than
//! being printed directly, so embedders can capture or redirect them.

pub mod chunk;
pub mod compiler;
pub mod error;
pub mod interner;
pub mod scanner;
pub mod token;
pub mod value;
pub mod vm;

use error::StderrReporter;
pub use vm::{InterpretResult, Vm};

/// Compiles and runs `source` in a fresh [`Vm`], reporting diagnostics to
/// stderr. A convenience for one-shot callers; a host that needs globals to
/// persist across multiple calls should hold onto a [`Vm`] itself instead.
pub fn interpret(source: &str) -> InterpretResult {
    let mut vm = Vm::new();
    let mut reporter = StderrReporter::default();
    vm.interpret(source, &mut reporter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpret_runs_a_program_end_to_end() {
        assert_eq!(interpret("print 1 + 1;"), InterpretResult::Ok);
    }

    #[test]
    fn interpret_reports_compile_errors() {
        assert_eq!(interpret("print ;"), InterpretResult::CompileError);
    }

    #[test]
    fn each_call_starts_from_an_empty_global_table() {
        // a fresh Vm per call means `a` from the first program never leaks
        // into the second
        assert_eq!(interpret("var a = 1;"), InterpretResult::Ok);
        assert_eq!(interpret("print a;"), InterpretResult::RuntimeError);
    }
}
