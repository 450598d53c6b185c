//! Contract compliance tests for bytecode_system
//!
//! These pin the module boundary the interpreter consumes.

use bytecode_system::{
    BuildError, FunctionBuilder, FunctionFlags, FunctionRecord, HandlerEntry, ModuleBuilder,
    Opcode, RegisterId,
};

/// Contract: function records expose arity, register count, flags and handlers
#[test]
fn test_function_record_fields() {
    let record = FunctionRecord {
        name: "f".to_string(),
        param_count: 2,
        register_count: 4,
        cache_count: 1,
        flags: FunctionFlags {
            strict: true,
            ..FunctionFlags::default()
        },
        instructions: vec![],
        handlers: vec![HandlerEntry { start: 0, end: 3, target: 5 }],
    };
    assert!(record.find_handler(2).is_some());
    assert!(record.flags.strict);
}

/// Contract: the builder reserves parameter registers first
#[test]
fn test_builder_parameter_registers() {
    let mut f = FunctionBuilder::new("g", 3);
    assert_eq!(f.param(2), RegisterId(2));
    assert_eq!(f.reg(), RegisterId(3));
    assert_eq!(f.regs(2), RegisterId(4));
    assert_eq!(f.reg(), RegisterId(6));
}

/// Contract: builders allocate one inline cache slot per property site
#[test]
fn test_builder_cache_slots() {
    let mut m = ModuleBuilder::new("c.js");
    let name = m.string("x");
    let mut f = FunctionBuilder::new("c", 1);
    let dst = f.reg();
    f.get_by_id(dst, f.param(0), name);
    f.put_by_id(f.param(0), name, dst);
    f.emit(Opcode::Return { value: dst });
    let record = f.finish().unwrap();
    assert_eq!(record.cache_count, 2);
    assert_eq!(record.instructions[1].opcode.cache_slot(), Some(1));
}

/// Contract: empty modules are rejected
#[test]
fn test_empty_module() {
    assert_eq!(ModuleBuilder::new("e.js").finish().unwrap_err(), BuildError::Empty);
}
