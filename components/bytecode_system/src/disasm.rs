//! Human-readable listing of a module (`--dump-bytecode`).

use std::fmt::Write;

use crate::module::{BytecodeModule, Constant};

fn describe_constant(constant: &Constant) -> String {
    match constant {
        Constant::Undefined => "undefined".to_string(),
        Constant::Null => "null".to_string(),
        Constant::Boolean(b) => b.to_string(),
        Constant::Number(n) => core_types::number::number_to_string(*n),
        Constant::String(s) => format!("{:?}", s),
        Constant::BigInt(digits) => format!("{}n", digits),
    }
}

/// Render every function with its constants, handlers and locations.
///
/// ```
/// use bytecode_system::{disassemble, FunctionBuilder, ModuleBuilder, Opcode};
///
/// let mut m = ModuleBuilder::new("t.js");
/// let name = m.string("x");
/// let mut f = FunctionBuilder::new("main", 0);
/// let r = f.reg();
/// f.emit(Opcode::GetGlobal { dst: r, name });
/// f.emit(Opcode::Return { value: r });
/// m.add_function(f.finish().unwrap());
/// let text = disassemble(&m.finish().unwrap());
/// assert!(text.contains("GetGlobal { dst: r0, name: 0 }  ; \"x\""));
/// ```
pub fn disassemble(module: &BytecodeModule) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "module {} (entry #{})", module.source_url, module.entry);
    let _ = writeln!(out, "constants:");
    for (i, c) in module.constants.iter().enumerate() {
        let _ = writeln!(out, "  [{}] {}", i, describe_constant(c));
    }

    for (index, function) in module.functions.iter().enumerate() {
        let flags = function.flags;
        let mut tags = Vec::new();
        if flags.strict {
            tags.push("strict");
        }
        if flags.generator {
            tags.push("generator");
        }
        if flags.arrow {
            tags.push("arrow");
        }
        let _ = writeln!(
            out,
            "\nfunction #{} {} (params={}, registers={}, caches={}){}{}",
            index,
            if function.name.is_empty() { "<anonymous>" } else { &function.name },
            function.param_count,
            function.register_count,
            function.cache_count,
            if tags.is_empty() { "" } else { " " },
            tags.join(" ")
        );
        for (pc, inst) in function.instructions.iter().enumerate() {
            let _ = write!(out, "  {:04}: {:?}", pc, inst.opcode);
            if let Some(name) = inst.opcode.name_operand() {
                match module.string_constant(name) {
                    Some(s) => {
                        let _ = write!(out, "  ; {:?}", s);
                    }
                    None => {
                        let _ = write!(out, "  ; <bad name constant>");
                    }
                }
            }
            if let Some(loc) = inst.loc {
                let _ = write!(out, "  @{}:{}", loc.loc.start.line, loc.loc.start.column);
            }
            out.push('\n');
        }
        for h in &function.handlers {
            let _ = writeln!(out, "  handler [{}, {}) -> {}", h.start, h.end, h.target);
        }
    }
    out
}
