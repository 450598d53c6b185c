//! Property keys, attributes and descriptors.

use std::fmt;
use std::rc::Rc;

use core_types::number::canonical_array_index;
use core_types::{SymbolId, Value};

/// A normalized property key.
///
/// Strings that are canonical array indices are always stored as
/// [`PropertyKey::Index`], so `"1"` and `1` name the same property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKey {
    Index(u32),
    String(Rc<str>),
    Symbol(SymbolId),
}

impl PropertyKey {
    /// Key for a string, normalizing canonical indices.
    pub fn from_str(s: &str) -> Self {
        match canonical_array_index(s) {
            Some(i) => PropertyKey::Index(i),
            None => PropertyKey::String(Rc::from(s)),
        }
    }

    /// Key for an already shared string.
    pub fn from_rc(s: Rc<str>) -> Self {
        match canonical_array_index(&s) {
            Some(i) => PropertyKey::Index(i),
            None => PropertyKey::String(s),
        }
    }

    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }

    /// True if this key is the string `name`.
    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, PropertyKey::String(s) if &**s == name)
    }

    /// The key as a script value (indices become strings).
    pub fn to_value(&self) -> Value {
        match self {
            PropertyKey::Index(i) => Value::String(Rc::from(i.to_string())),
            PropertyKey::String(s) => Value::String(s.clone()),
            PropertyKey::Symbol(id) => Value::Symbol(*id),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::from_str(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        if i == u32::MAX {
            PropertyKey::String(Rc::from(i.to_string()))
        } else {
            PropertyKey::Index(i)
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(i) => write!(f, "{}", i),
            PropertyKey::String(s) => f.write_str(s),
            PropertyKey::Symbol(id) => write!(f, "Symbol({})", id.0),
        }
    }
}

/// Property attributes.
///
/// `accessor` distinguishes accessor properties from data properties; for
/// accessors `writable` is meaningless and kept false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyFlags {
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
    pub accessor: bool,
}

impl PropertyFlags {
    /// Plain assignment: writable, enumerable, configurable.
    pub const DEFAULT: PropertyFlags = PropertyFlags {
        writable: true,
        enumerable: true,
        configurable: true,
        accessor: false,
    };

    /// Builtin methods: writable, configurable, not enumerable.
    pub const HIDDEN: PropertyFlags = PropertyFlags {
        writable: true,
        enumerable: false,
        configurable: true,
        accessor: false,
    };

    /// `name` / `length` of functions.
    pub const READ_ONLY_CONFIGURABLE: PropertyFlags = PropertyFlags {
        writable: false,
        enumerable: false,
        configurable: true,
        accessor: false,
    };

    /// Constants such as `Math.PI`.
    pub const FROZEN: PropertyFlags = PropertyFlags {
        writable: false,
        enumerable: false,
        configurable: false,
        accessor: false,
    };

    pub const fn data(writable: bool, enumerable: bool, configurable: bool) -> Self {
        PropertyFlags {
            writable,
            enumerable,
            configurable,
            accessor: false,
        }
    }

    pub const fn accessor(enumerable: bool, configurable: bool) -> Self {
        PropertyFlags {
            writable: false,
            enumerable,
            configurable,
            accessor: true,
        }
    }
}

/// Stored contents of a property slot.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Data(Value),
    /// Getter / setter functions; `undefined` when absent.
    Accessor { get: Value, set: Value },
}

impl PropertyValue {
    pub fn data_value(&self) -> Option<&Value> {
        match self {
            PropertyValue::Data(v) => Some(v),
            PropertyValue::Accessor { .. } => None,
        }
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &Value> {
        let (a, b) = match self {
            PropertyValue::Data(v) => (Some(v), None),
            PropertyValue::Accessor { get, set } => (Some(get), Some(set)),
        };
        a.into_iter().chain(b)
    }
}

/// A property with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub value: PropertyValue,
    pub flags: PropertyFlags,
}

impl Property {
    pub fn data(value: Value, flags: PropertyFlags) -> Self {
        Property {
            value: PropertyValue::Data(value),
            flags,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self.value, PropertyValue::Accessor { .. })
    }
}

/// A possibly partial descriptor, as passed to `Object.defineProperty`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyDescriptor {
    pub value: Option<Value>,
    pub writable: Option<bool>,
    pub get: Option<Value>,
    pub set: Option<Value>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    /// Fully specified data descriptor.
    pub fn data(value: Value, flags: PropertyFlags) -> Self {
        PropertyDescriptor {
            value: Some(value),
            writable: Some(flags.writable),
            get: None,
            set: None,
            enumerable: Some(flags.enumerable),
            configurable: Some(flags.configurable),
        }
    }

    /// Fully specified accessor descriptor.
    pub fn accessor(get: Value, set: Value, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor {
            value: None,
            writable: None,
            get: Some(get),
            set: Some(set),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn is_accessor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_data(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_generic(&self) -> bool {
        !self.is_accessor() && !self.is_data()
    }

    /// Descriptor describing an existing property.
    pub fn from_property(prop: &Property) -> Self {
        match &prop.value {
            PropertyValue::Data(v) => Self::data(v.clone(), prop.flags),
            PropertyValue::Accessor { get, set } => Self::accessor(
                get.clone(),
                set.clone(),
                prop.flags.enumerable,
                prop.flags.configurable,
            ),
        }
    }
}
