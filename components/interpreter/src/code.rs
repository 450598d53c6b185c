//! Loaded bytecode: modules with their constant pools materialized.

use std::rc::Rc;

use bytecode_system::{BytecodeModule, Constant, FunctionRecord};
use core_types::number::parse_bigint_literal;
use core_types::Value;

use crate::error::FatalError;
use crate::inline_cache::InlineCache;

/// Index of a loaded module in its runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(pub u32);

/// A function inside a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeRef {
    pub module: ModuleId,
    pub function: u32,
}

/// A module ready for execution.
///
/// Code is immutable and shared by every frame running it; the mutable
/// inline caches live beside it in the runtime.
#[derive(Debug)]
pub struct LoadedModule {
    pub id: ModuleId,
    pub source_url: Rc<str>,
    pub constants: Vec<Value>,
    pub functions: Vec<Rc<FunctionRecord>>,
    pub entry: u32,
}

impl LoadedModule {
    /// Materialize constants and wrap function records.
    pub fn load(id: ModuleId, module: BytecodeModule) -> Result<Self, FatalError> {
        let constants = module
            .constants
            .iter()
            .map(|c| match c {
                Constant::Undefined => Ok(Value::Undefined),
                Constant::Null => Ok(Value::Null),
                Constant::Boolean(b) => Ok(Value::Boolean(*b)),
                Constant::Number(n) => Ok(Value::number(*n)),
                Constant::String(s) => Ok(Value::string(s)),
                Constant::BigInt(digits) => parse_bigint_literal(digits)
                    .map(|b| Value::BigInt(Rc::new(b)))
                    .ok_or_else(|| {
                        FatalError::MalformedBytecode(format!("bad BigInt constant {:?}", digits))
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if module.entry as usize >= module.functions.len() {
            return Err(FatalError::MalformedBytecode(format!(
                "entry function {} out of range",
                module.entry
            )));
        }
        Ok(Self {
            id,
            source_url: Rc::from(module.source_url.as_str()),
            constants,
            functions: module.functions.into_iter().map(Rc::new).collect(),
            entry: module.entry,
        })
    }

    pub fn function(&self, index: u32) -> Option<&Rc<FunctionRecord>> {
        self.functions.get(index as usize)
    }

    /// Fresh inline cache tables, one per function.
    pub(crate) fn new_caches(&self) -> Vec<Vec<InlineCache>> {
        self.functions
            .iter()
            .map(|f| vec![InlineCache::default(); f.cache_count as usize])
            .collect()
    }
}
