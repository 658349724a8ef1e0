use embers::error::StderrReporter;
use embers::{InterpretResult, Vm};
use std::{env, fs, process};

fn main() {
    let mut args = env::args().skip(1);

    let path = args.next().unwrap_or_else(|| {
        eprintln!("Usage: embers <path>");
        process::exit(exitcode::USAGE);
    });
    if args.next().is_some() {
        eprintln!("Usage: embers <path>");
        process::exit(exitcode::USAGE);
    }

    let source = fs::read_to_string(&path).unwrap_or_else(|err| {
        eprintln!("Error reading '{}': {}", path, err);
        process::exit(exitcode::IOERR);
    });

    let mut vm = Vm::new();
    let mut reporter = StderrReporter::default();
    match vm.interpret(&source, &mut reporter) {
        InterpretResult::Ok => {}
        InterpretResult::CompileError => process::exit(exitcode::DATAERR),
        InterpretResult::RuntimeError => process::exit(exitcode::SOFTWARE),
    }
}
