//! Tests for Opcode enum

use bytecode_system::{Opcode, RegisterId};

#[test]
fn test_binary_arithmetic_classification() {
    let r = RegisterId(0);
    assert!(Opcode::Exp { dst: r, lhs: r, rhs: r }.is_binary_arithmetic());
    assert!(!Opcode::BitAnd { dst: r, lhs: r, rhs: r }.is_binary_arithmetic());
}

#[test]
fn test_unconditional_terminators() {
    let r = RegisterId(1);
    assert!(Opcode::Throw { value: r }.is_unconditional_terminator());
    assert!(!Opcode::JmpTrue { cond: r, target: 0 }.is_unconditional_terminator());
    assert!(Opcode::JmpTrue { cond: r, target: 0 }.is_terminator());
}

#[test]
fn test_name_operands() {
    let r = RegisterId(0);
    assert_eq!(Opcode::DeclareGlobal { name: 9 }.name_operand(), Some(9));
    assert_eq!(
        Opcode::PutById { obj: r, name: 2, value: r, cache: 5 }.name_operand(),
        Some(2)
    );
    assert_eq!(Opcode::GetByVal { dst: r, obj: r, key: r }.name_operand(), None);
}

#[test]
fn test_cache_slots() {
    let r = RegisterId(0);
    assert_eq!(
        Opcode::GetById { dst: r, obj: r, name: 0, cache: 3 }.cache_slot(),
        Some(3)
    );
    assert_eq!(Opcode::PutOwnById { obj: r, name: 0, value: r }.cache_slot(), None);
}

#[test]
fn test_calls_are_safepoints() {
    let r = RegisterId(0);
    let call = Opcode::Call { dst: r, callee: r, this: r, first_arg: r, argc: 0 };
    assert!(call.is_safepoint(0));
    assert!(Opcode::Return { value: r }.is_safepoint(0));
    // forward jumps are not
    assert!(!Opcode::Jmp { target: 9 }.is_safepoint(4));
}

#[test]
fn test_optional_register_operand_json() {
    let mapped = Opcode::CreateArguments { dst: RegisterId(0), env: Some(RegisterId(3)) };
    let json = serde_json::to_string(&mapped).unwrap();
    assert_eq!(json, r#"{"op":"CreateArguments","dst":0,"env":3}"#);
    let unmapped: Opcode =
        serde_json::from_str(r#"{"op":"CreateArguments","dst":0,"env":null}"#).unwrap();
    assert_eq!(unmapped, Opcode::CreateArguments { dst: RegisterId(0), env: None });
}
