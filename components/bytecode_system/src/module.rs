//! Bytecode modules: the unit the compiler hands to the interpreter.
//!
//! The JSON form is the interchange format read by the CLI:
//!
//! ```json
//! {
//!   "source_url": "fib.js",
//!   "constants": [{"type": "String", "value": "fib"}, {"type": "Number", "value": 2}],
//!   "functions": [ ... ],
//!   "entry": 0
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::function::FunctionRecord;

/// Constant pool entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Constant {
    Undefined,
    Null,
    Boolean(bool),
    /// Non-finite values are written as `"NaN"`, `"Infinity"`, `"-Infinity"`
    Number(#[serde(with = "number_repr")] f64),
    String(String),
    /// Decimal digits, optionally prefixed by `-`
    BigInt(String),
}

mod number_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(n: &f64, s: S) -> Result<S::Ok, S::Error> {
        if n.is_finite() {
            s.serialize_f64(*n)
        } else if n.is_nan() {
            s.serialize_str("NaN")
        } else if *n > 0.0 {
            s.serialize_str("Infinity")
        } else {
            s.serialize_str("-Infinity")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(t) => match t.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(serde::de::Error::custom(format!(
                    "invalid number constant {:?}",
                    other
                ))),
            },
        }
    }
}

/// Failure to read a module.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("invalid bytecode module JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("entry function {entry} out of range ({count} functions)")]
    BadEntry { entry: u32, count: usize },
}

/// A compiled script: constant pool, function table and entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytecodeModule {
    pub source_url: String,
    pub constants: Vec<Constant>,
    pub functions: Vec<FunctionRecord>,
    pub entry: u32,
}

impl BytecodeModule {
    /// Parse the JSON interchange form.
    pub fn from_json(text: &str) -> Result<Self, ModuleError> {
        let module: BytecodeModule = serde_json::from_str(text)?;
        if module.entry as usize >= module.functions.len() {
            return Err(ModuleError::BadEntry {
                entry: module.entry,
                count: module.functions.len(),
            });
        }
        Ok(module)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ModuleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn entry_function(&self) -> Option<&FunctionRecord> {
        self.functions.get(self.entry as usize)
    }

    /// String constant at `index`, if it is one.
    pub fn string_constant(&self, index: u32) -> Option<&str> {
        match self.constants.get(index as usize)? {
            Constant::String(s) => Some(s),
            _ => None,
        }
    }

    /// Total instruction count across all functions.
    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(|f| f.instructions.len()).sum()
    }
}
