//! Tests for Instruction

use bytecode_system::{Instruction, Opcode, RegisterId};
use core_types::SourceLocation;

#[test]
fn test_instruction_without_location_has_no_loc_keys() {
    let inst = Instruction::new(Opcode::LoadInt { dst: RegisterId(0), value: -3 });
    let json = serde_json::to_value(&inst).unwrap();
    assert!(json.get("loc").is_none());
    assert!(json.get("range").is_none());
    let back: Instruction = serde_json::from_value(json).unwrap();
    assert_eq!(back, inst);
}

#[test]
fn test_instruction_with_location() {
    let loc = SourceLocation::at(12, 4);
    let inst = Instruction::with_location(Opcode::LoadThis { dst: RegisterId(1) }, loc);
    assert_eq!(inst.loc.map(|l| l.start_position().line), Some(12));
}
