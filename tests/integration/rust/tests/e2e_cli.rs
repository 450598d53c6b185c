//! The CLI host running modules that went through the JSON file format

use std::io::Write;

use builtins::CaptureWriter;
use bytecode_system::{BytecodeModule, Opcode};
use core_types::Value;
use integration_tests::{closure_pair_module, fib_module, single_function};
use interpreter::{EngineError, RuntimeConfig};
use js_cli::{load_module_file, run_file, CliError, Host};
use tempfile::NamedTempFile;

fn write_module(module: &BytecodeModule) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(module.to_json().unwrap().as_bytes()).unwrap();
    file
}

fn host() -> (Host, CaptureWriter) {
    let console = CaptureWriter::new();
    let host = Host::new(RuntimeConfig::default(), Box::new(console.clone())).unwrap();
    (host, console)
}

#[test]
fn test_json_file_round_trip_preserves_module() {
    let module = fib_module(10);
    let file = write_module(&module);
    assert_eq!(load_module_file(file.path()).unwrap(), module);
}

#[test]
fn test_fib_from_file() {
    let (mut host, _) = host();
    let file = write_module(&fib_module(10));
    assert_eq!(run_file(&mut host, file.path(), false).unwrap(), Value::number(55.0));
}

#[test]
fn test_closures_from_file() {
    let (mut host, _) = host();
    let file = write_module(&closure_pair_module());
    assert_eq!(run_file(&mut host, file.path(), false).unwrap(), Value::number(2.0));
}

#[test]
fn test_uncaught_throw_surfaces_as_engine_error() {
    let (mut host, _) = host();
    let module = single_function("throw.js", |f, m| {
        let text = m.string("plain");
        let r = f.reg();
        f.emit(Opcode::LoadConst { dst: r, index: text });
        f.emit(Opcode::Throw { value: r });
    });
    let file = write_module(&module);
    let err = run_file(&mut host, file.path(), false).unwrap_err();
    match &err {
        CliError::Engine(EngineError::Uncaught { value, .. }) => {
            assert_eq!(*value, Value::string("plain"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(err.to_string(), "Uncaught plain");
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_host_survives_failed_module() {
    let (mut host, console) = host();
    let failing = single_function("bad.js", |f, _| {
        let (undef, r) = (f.reg(), f.reg());
        f.emit(Opcode::LoadUndefined { dst: undef });
        f.emit(Opcode::Call { dst: r, callee: undef, this: undef, first_arg: undef, argc: 0 });
        f.emit(Opcode::Return { value: r });
    });
    assert!(host.run_module(failing).is_err());
    assert_eq!(host.runtime().frame_depth(), 0);

    let logging = single_function("ok.js", |f, m| {
        let console_name = m.string("print");
        let text = m.string("still alive");
        let (print, undef, arg, r) = (f.reg(), f.reg(), f.reg(), f.reg());
        f.emit(Opcode::GetGlobal { dst: print, name: console_name });
        f.emit(Opcode::LoadUndefined { dst: undef });
        f.emit(Opcode::LoadConst { dst: arg, index: text });
        f.emit(Opcode::Call { dst: r, callee: print, this: undef, first_arg: arg, argc: 1 });
        f.emit(Opcode::Return { value: r });
    });
    host.run_module(logging).unwrap();
    assert_eq!(console.lines(), vec!["still alive"]);
}

#[test]
fn test_corrupt_module_is_rejected_before_running() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(br#"{"source_url":"x.js","constants":[],"functions":[],"entry":3}"#)
        .unwrap();
    let (mut host, _) = host();
    let err = run_file(&mut host, file.path(), false).unwrap_err();
    assert!(matches!(err, CliError::Module { .. }));
}
