//! Tests for modules, builders and the disassembler

use bytecode_system::{
    disassemble, BytecodeModule, Constant, FunctionBuilder, ModuleBuilder, Opcode,
};
use core_types::SourceLocation;

fn sample_module() -> BytecodeModule {
    let mut m = ModuleBuilder::new("sample.js");
    let greeting = m.string("hello");
    let inner_index = m.reserve_function();

    let mut main = FunctionBuilder::new("main", 0).strict();
    main.set_location(Some(SourceLocation::new((1, 1), (1, 20), 0..19)));
    let env = main.reg();
    let closure = main.reg();
    let value = main.reg();
    main.emit(Opcode::CreateEnvironment { dst: env, size: 1 });
    main.emit(Opcode::CreateClosure { dst: closure, env, function: inner_index });
    main.emit(Opcode::LoadConst { dst: value, index: greeting });
    main.emit(Opcode::Return { value });
    let main = m.add_function(main.finish().unwrap());

    let mut inner = FunctionBuilder::new("inner", 1).arrow();
    inner.emit(Opcode::Return { value: inner.param(0) });
    m.define_function(inner_index, inner.finish().unwrap());
    m.set_entry(main);
    m.finish().unwrap()
}

#[test]
fn test_module_json_round_trip_keeps_locations() {
    let module = sample_module();
    let json = module.to_json().unwrap();
    let back = BytecodeModule::from_json(&json).unwrap();
    assert_eq!(back, module);
    assert_eq!(back.entry_function().map(|f| f.name.as_str()), Some("main"));
    assert!(back.functions[1].flags.arrow);
    assert!(!back.functions[1].flags.constructor);
}

#[test]
fn test_hand_written_json_module() {
    let text = r#"{
        "source_url": "hand.js",
        "constants": [{"type": "String", "value": "x"}, {"type": "BigInt", "value": "-12"}],
        "functions": [{
            "name": "",
            "param_count": 0,
            "register_count": 1,
            "instructions": [
                {"op": "TryGetGlobal", "dst": 0, "name": 0,
                 "loc": {"start": {"line": 1, "column": 1}, "end": {"line": 1, "column": 2}},
                 "range": [0, 1]},
                {"op": "Return", "value": 0}
            ]
        }],
        "entry": 0
    }"#;
    let module = BytecodeModule::from_json(text).unwrap();
    assert_eq!(module.string_constant(0), Some("x"));
    assert_eq!(module.constants[1], Constant::BigInt("-12".into()));
    assert_eq!(module.instruction_count(), 2);
    let first = &module.functions[0].instructions[0];
    assert_eq!(first.loc.map(|l| l.range), Some([0, 1]));
    assert!(module.functions[0].instructions[1].loc.is_none());
}

#[test]
fn test_disassembly_lists_functions() {
    let text = disassemble(&sample_module());
    assert!(text.contains("function #0 main (params=0, registers=3, caches=0) strict"));
    assert!(text.contains("function #1 inner"));
    assert!(text.contains("arrow"));
    assert!(text.contains("[0] \"hello\""));
    assert!(text.contains("@1:1"));
}
