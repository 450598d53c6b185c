//! The runtime: one realm, its heap and its interpreter state.
//!
//! All engine state is threaded through a single [`Runtime`] value; there
//! are no globals, so independent runtimes can coexist on one thread.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use bytecode_system::BytecodeModule;
use core_types::{HeapRef, SymbolId, Value};
use memory_manager::{edges_of, HeapConfig, Trace};
use tracing::{debug, info, warn};

use crate::call_frame::CallFrame;
use crate::code::{CodeRef, LoadedModule, ModuleId};
use crate::environment::Environment;
use crate::error::{EngineError, FatalError, JsResult, Throw};
use crate::function::{FunctionKind, NativeFunction};
use crate::gc_integration::Cell;
use crate::inline_cache::InlineCache;
use crate::interrupt::{InterruptHandle, InterruptMode};
use crate::object::{JsObject, ObjectClass};
use crate::property::{Property, PropertyFlags, PropertyKey};
use crate::realm::{Intrinsics, WELL_KNOWN_SYMBOLS};
use crate::shape::ShapeTable;
use crate::utf16::Utf16Cache;
use core_types::ErrorKind;
use memory_manager::Heap;

/// Bytes only error construction may use, so exhaustion can still be
/// reported as a `RangeError`.
const ERROR_HEADROOM: usize = 16 * 1024;

/// Runtime limits and heap tuning.
///
/// ```
/// use interpreter::RuntimeConfig;
/// use memory_manager::HeapConfig;
///
/// let config = RuntimeConfig::default()
///     .with_max_frames(500)
///     .with_heap(HeapConfig::default().with_max_heap(8 << 20));
/// assert_eq!(config.max_frames, 500);
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub heap: HeapConfig,
    /// Interpreted frames allowed on the stack at once.
    pub max_frames: usize,
    /// Nested native calls allowed at once (each one recurses on the host stack).
    pub max_native_depth: usize,
    /// Longest prototype chain a lookup will walk.
    pub max_prototype_chain: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            heap: HeapConfig::default(),
            max_frames: 10_000,
            max_native_depth: 64,
            max_prototype_chain: 10_000,
        }
    }
}

impl RuntimeConfig {
    pub fn with_heap(mut self, heap: HeapConfig) -> Self {
        self.heap = heap;
        self
    }

    pub fn with_max_frames(mut self, frames: usize) -> Self {
        self.max_frames = frames.max(1);
        self
    }

    pub fn with_max_native_depth(mut self, depth: usize) -> Self {
        self.max_native_depth = depth.max(1);
        self
    }

    pub fn with_max_prototype_chain(mut self, length: usize) -> Self {
        self.max_prototype_chain = length.max(1);
        self
    }
}

/// Handle to a value pinned with [`Runtime::persist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PersistentHandle(usize);

/// A native call on the host stack, for stack traces.
#[derive(Debug, Clone)]
pub(crate) struct NativeFrame {
    pub name: Rc<str>,
    /// Interpreted frames below this call.
    pub js_depth: usize,
}

/// A JavaScript realm with its heap and interpreter.
pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    pub(crate) heap: Heap<Cell>,
    pub(crate) shapes: ShapeTable,
    pub(crate) modules: Vec<Rc<LoadedModule>>,
    /// Inline caches, indexed by module, function and cache slot.
    pub(crate) caches: Vec<Vec<Vec<InlineCache>>>,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) native_frames: Vec<NativeFrame>,
    /// Nested entries into the dispatch loop or native code.
    pub(crate) reentry_depth: usize,
    pub(crate) intrinsics: Intrinsics,
    symbols: Vec<Option<Rc<str>>>,
    persistent: Vec<Option<Value>>,
    persistent_free: Vec<usize>,
    /// Temporaries held by native code; rooted until flushed.
    pub(crate) gc_scope: Vec<Value>,
    interrupt: InterruptHandle,
    pub(crate) constructing_error: bool,
    host_data: HashMap<TypeId, Box<dyn Any>>,
    pub(crate) utf16: Utf16Cache,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("heap", &self.heap)
            .field("shapes", &self.shapes.len())
            .field("modules", &self.modules.len())
            .field("frames", &self.frames.len())
            .field("native_frames", &self.native_frames.len())
            .field("gc_scope", &self.gc_scope.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Create a runtime with a fresh realm.
    ///
    /// Only the bare intrinsic objects exist afterwards; install a library
    /// (such as `builtins::install`) to populate them.
    pub fn new(config: RuntimeConfig) -> Result<Self, EngineError> {
        let mut heap = Heap::new(config.heap.clone());
        let mut shapes = ShapeTable::new();
        let intrinsics = Intrinsics::create(&mut heap, &mut shapes)
            .map_err(|_| EngineError::Fatal(FatalError::OutOfMemory))?;
        Ok(Self {
            config,
            heap,
            shapes,
            modules: Vec::new(),
            caches: Vec::new(),
            frames: Vec::new(),
            native_frames: Vec::new(),
            reentry_depth: 0,
            intrinsics,
            symbols: WELL_KNOWN_SYMBOLS
                .iter()
                .map(|d| Some(Rc::from(*d)))
                .collect(),
            persistent: Vec::new(),
            persistent_free: Vec::new(),
            gc_scope: Vec::new(),
            interrupt: InterruptHandle::new(),
            constructing_error: false,
            host_data: HashMap::new(),
            utf16: Utf16Cache::default(),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    pub fn global_object(&self) -> HeapRef {
        self.intrinsics.global
    }

    pub fn shapes(&self) -> &ShapeTable {
        &self.shapes
    }

    /// Interpreted frames currently on the stack.
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    // ---- heap access ------------------------------------------------------

    /// Store `cell` in the heap.
    ///
    /// On a full heap one full collection is attempted before the request
    /// fails with a thrown `RangeError`. The new handle is rooted in the
    /// current GC scope.
    pub(crate) fn alloc(&mut self, cell: Cell) -> JsResult<HeapRef> {
        let size = cell.size_hint().max(1);
        let needed = if self.constructing_error {
            size
        } else {
            size.saturating_add(ERROR_HEADROOM)
        };
        if self.heap.reserve(needed).is_err() && !self.collect_for(needed, &edges_of(&cell)) {
            return Err(self.out_of_memory());
        }
        let is_env = matches!(cell, Cell::Environment(_));
        let r = match self.heap.allocate(cell) {
            Ok(r) => r,
            Err(_) => return Err(self.out_of_memory()),
        };
        self.gc_scope.push(if is_env {
            Value::Environment(r)
        } else {
            Value::Object(r)
        });
        Ok(r)
    }

    pub(crate) fn alloc_object(&mut self, obj: JsObject) -> JsResult<HeapRef> {
        self.alloc(Cell::Object(obj))
    }

    pub(crate) fn alloc_environment(&mut self, env: Environment) -> JsResult<HeapRef> {
        self.alloc(Cell::Environment(env))
    }

    /// The thrown value for an exhausted heap; fatal while an error object
    /// is already being built.
    pub(crate) fn out_of_memory(&mut self) -> Throw {
        if self.constructing_error {
            warn!(target: "engine::interp", "out of memory while constructing an error");
            return Throw::Fatal(FatalError::OutOfMemory);
        }
        warn!(target: "engine::interp", in_use = self.heap.in_use(), "heap exhausted");
        match self.create_error(ErrorKind::RangeError, "Out of memory") {
            Ok(err) => Throw::Value(Value::Object(err)),
            Err(t) => t,
        }
    }

    /// Shared access to a script object.
    pub fn object(&self, r: HeapRef) -> JsResult<&JsObject> {
        match self.heap.get(r) {
            Some(Cell::Object(obj)) => Ok(obj),
            Some(Cell::Environment(_)) => {
                Err(FatalError::Internal(format!("{:?} is an environment, not an object", r)).into())
            }
            None => Err(FatalError::StaleHandle(r).into()),
        }
    }

    /// Mutable access to a script object through the write barrier.
    pub fn object_mut(&mut self, r: HeapRef) -> JsResult<&mut JsObject> {
        match self.heap.write(r) {
            Some(Cell::Object(obj)) => Ok(obj),
            Some(Cell::Environment(_)) => {
                Err(FatalError::Internal(format!("{:?} is an environment, not an object", r)).into())
            }
            None => Err(FatalError::StaleHandle(r).into()),
        }
    }

    /// An object together with the shape table, for storage updates.
    pub(crate) fn object_with_shapes(
        &mut self,
        r: HeapRef,
    ) -> JsResult<(&mut JsObject, &mut ShapeTable)> {
        match self.heap.write(r) {
            Some(Cell::Object(obj)) => Ok((obj, &mut self.shapes)),
            Some(Cell::Environment(_)) => {
                Err(FatalError::Internal(format!("{:?} is an environment, not an object", r)).into())
            }
            None => Err(FatalError::StaleHandle(r).into()),
        }
    }

    pub(crate) fn environment(&self, r: HeapRef) -> JsResult<&Environment> {
        match self.heap.get(r) {
            Some(Cell::Environment(env)) => Ok(env),
            Some(Cell::Object(_)) => {
                Err(FatalError::MalformedBytecode(format!("{:?} is not an environment", r)).into())
            }
            None => Err(FatalError::StaleHandle(r).into()),
        }
    }

    pub(crate) fn environment_mut(&mut self, r: HeapRef) -> JsResult<&mut Environment> {
        match self.heap.write(r) {
            Some(Cell::Environment(env)) => Ok(env),
            Some(Cell::Object(_)) => {
                Err(FatalError::MalformedBytecode(format!("{:?} is not an environment", r)).into())
            }
            None => Err(FatalError::StaleHandle(r).into()),
        }
    }

    /// True if `value` is a callable object.
    pub fn is_callable(&self, value: &Value) -> bool {
        match value {
            Value::Object(r) => self.object(*r).map_or(false, JsObject::is_callable),
            _ => false,
        }
    }

    pub fn is_constructor(&self, value: &Value) -> bool {
        match value {
            Value::Object(r) => self.object(*r).map_or(false, JsObject::is_constructor),
            _ => false,
        }
    }

    // ---- GC scopes and persistent handles ----------------------------------

    /// Current depth of the GC scope, for a later [`Runtime::flush_gc_scope`].
    pub fn gc_scope_marker(&self) -> usize {
        self.gc_scope.len()
    }

    /// Keep `value` alive until the scope is flushed past it.
    pub fn root(&mut self, value: Value) {
        if value.heap_ref().is_some() {
            self.gc_scope.push(value);
        }
    }

    /// Drop every temporary rooted since `marker`.
    pub fn flush_gc_scope(&mut self, marker: usize) {
        self.gc_scope.truncate(marker);
    }

    /// Pin `value` until [`Runtime::unpersist`].
    pub fn persist(&mut self, value: Value) -> PersistentHandle {
        match self.persistent_free.pop() {
            Some(i) => {
                self.persistent[i] = Some(value);
                PersistentHandle(i)
            }
            None => {
                self.persistent.push(Some(value));
                PersistentHandle(self.persistent.len() - 1)
            }
        }
    }

    pub fn persistent(&self, handle: PersistentHandle) -> Option<&Value> {
        self.persistent.get(handle.0).and_then(Option::as_ref)
    }

    pub fn unpersist(&mut self, handle: PersistentHandle) -> Option<Value> {
        let value = self.persistent.get_mut(handle.0)?.take()?;
        self.persistent_free.push(handle.0);
        Some(value)
    }

    pub(crate) fn persistent_values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.persistent.iter().flatten()
    }

    // ---- symbols ----------------------------------------------------------

    /// A fresh symbol. Symbols are never collected.
    pub fn new_symbol(&mut self, description: Option<Rc<str>>) -> SymbolId {
        self.symbols.push(description);
        SymbolId(self.symbols.len() as u32 - 1)
    }

    pub fn symbol_description(&self, id: SymbolId) -> Option<Rc<str>> {
        self.symbols.get(id.0 as usize).cloned().flatten()
    }

    // ---- interrupts and host data -----------------------------------------

    /// A handle other threads can use to interrupt this runtime.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub(crate) fn poll_interrupt(&mut self) -> JsResult<()> {
        match self.interrupt.take() {
            None => Ok(()),
            Some(InterruptMode::Catchable) => {
                info!(target: "engine::interp", depth = self.frames.len(), "execution interrupted");
                self.throw_error(ErrorKind::Error, "Execution interrupted")
            }
            Some(InterruptMode::Terminate) => {
                warn!(target: "engine::interp", depth = self.frames.len(), "execution terminated");
                Err(FatalError::Terminated.into())
            }
        }
    }

    /// Attach host state, replacing any previous value of the same type.
    pub fn set_host_data<T: Any>(&mut self, data: T) {
        self.host_data.insert(TypeId::of::<T>(), Box::new(data));
    }

    pub fn host_data<T: Any>(&self) -> Option<&T> {
        self.host_data.get(&TypeId::of::<T>())?.downcast_ref()
    }

    // ---- modules ----------------------------------------------------------

    /// Make `module` executable. Constants are materialized once here.
    pub fn load_module(&mut self, module: BytecodeModule) -> Result<ModuleId, EngineError> {
        let id = ModuleId(self.modules.len() as u32);
        let loaded = LoadedModule::load(id, module)?;
        debug!(
            target: "engine::interp",
            module = id.0,
            url = %loaded.source_url,
            functions = loaded.functions.len(),
            "module loaded"
        );
        self.caches.push(loaded.new_caches());
        self.modules.push(Rc::new(loaded));
        Ok(id)
    }

    pub fn module(&self, id: ModuleId) -> Option<&Rc<LoadedModule>> {
        self.modules.get(id.0 as usize)
    }

    /// Run the entry function of a loaded module and return its result.
    pub fn run_module(&mut self, id: ModuleId) -> Result<Value, EngineError> {
        let Some(module) = self.module(id).cloned() else {
            return Err(FatalError::Internal(format!("unknown module {}", id.0)).into());
        };
        let code = CodeRef {
            module: id,
            function: module.entry,
        };
        let result = self.run_entry(code, &module);
        self.report(result)
    }

    fn run_entry(&mut self, code: CodeRef, module: &LoadedModule) -> JsResult<Value> {
        let closure = self.create_closure(code, None, None)?;
        let strict = module
            .function(code.function)
            .map_or(false, |f| f.flags.strict);
        let this = if strict {
            Value::Undefined
        } else {
            Value::Object(self.intrinsics.global)
        };
        self.call(&Value::Object(closure), this, Vec::new())
    }

    /// Convert an abrupt completion into the host-facing error.
    pub fn report<T>(&mut self, result: JsResult<T>) -> Result<T, EngineError> {
        match result {
            Ok(v) => Ok(v),
            Err(Throw::Value(value)) => {
                let error = self.describe_exception(&value);
                let rendered = self.render_exception(&value, &error);
                debug!(target: "engine::interp", error = %error.header(), "uncaught exception");
                Err(EngineError::Uncaught {
                    error,
                    value,
                    rendered,
                })
            }
            Err(Throw::Fatal(fatal)) => {
                warn!(target: "engine::interp", error = %fatal, "fatal engine error");
                Err(EngineError::Fatal(fatal))
            }
        }
    }

    // ---- object creation ----------------------------------------------------

    pub fn new_object(&mut self) -> JsResult<HeapRef> {
        let proto = self.intrinsics.object_prototype;
        self.alloc_object(JsObject::ordinary(Some(proto)))
    }

    pub fn new_object_with_prototype(&mut self, prototype: Option<HeapRef>) -> JsResult<HeapRef> {
        self.alloc_object(JsObject::ordinary(prototype))
    }

    /// An array holding `values` at indices `0..len`.
    pub fn new_array(&mut self, values: Vec<Value>) -> JsResult<HeapRef> {
        let length = u32::try_from(values.len()).unwrap_or(u32::MAX);
        let mut obj = JsObject::new(
            Some(self.intrinsics.array_prototype),
            ObjectClass::Array {
                length,
                length_writable: true,
            },
        );
        for (i, v) in values.into_iter().enumerate() {
            obj.elements.set_value(i as u32, v);
        }
        self.alloc_object(obj)
    }

    /// A host function object.
    ///
    /// `magic` is passed through to the body, so one body can serve a family
    /// of functions (the error or typed-array constructors, say).
    pub fn new_native(
        &mut self,
        name: &str,
        arity: u32,
        func: NativeFunction,
        magic: u32,
        constructor: bool,
    ) -> JsResult<HeapRef> {
        let mut obj = JsObject::new(
            Some(self.intrinsics.function_prototype),
            ObjectClass::Function(FunctionKind::Native {
                func,
                magic,
                constructor,
            }),
        );
        obj.add_named(
            &mut self.shapes,
            PropertyKey::from("length"),
            Property::data(Value::number(arity as f64), PropertyFlags::READ_ONLY_CONFIGURABLE),
        );
        obj.add_named(
            &mut self.shapes,
            PropertyKey::from("name"),
            Property::data(Value::string(name), PropertyFlags::READ_ONLY_CONFIGURABLE),
        );
        self.alloc_object(obj)
    }

    pub fn new_native_function(
        &mut self,
        name: &str,
        arity: u32,
        func: NativeFunction,
    ) -> JsResult<HeapRef> {
        self.new_native(name, arity, func, 0, false)
    }

    /// Define a host function on the global object.
    pub fn register_native(
        &mut self,
        name: &str,
        arity: u32,
        func: NativeFunction,
    ) -> JsResult<HeapRef> {
        let f = self.new_native_function(name, arity, func)?;
        let global = self.intrinsics.global;
        self.define_hidden(global, PropertyKey::from(name), Value::Object(f))?;
        Ok(f)
    }

    /// Define a writable, configurable, non-enumerable data property.
    pub fn define_hidden(&mut self, obj: HeapRef, key: PropertyKey, value: Value) -> JsResult<()> {
        self.define_property_or_throw(obj, key, value, PropertyFlags::HIDDEN)
    }

    /// A bound function over `target`, as `Function.prototype.bind` makes.
    ///
    /// `name` and `length` are derived from the target's own properties.
    pub fn new_bound_function(
        &mut self,
        target: HeapRef,
        this: Value,
        args: Vec<Value>,
    ) -> JsResult<HeapRef> {
        if !self.is_callable(&Value::Object(target)) {
            return self.throw_type_error("Bind must be called on a function");
        }
        let target_value = Value::Object(target);
        let length = match self.get_by_name(&target_value, "length")? {
            Value::Number(n) if n.is_finite() => (n.trunc() - args.len() as f64).max(0.0),
            Value::Number(n) if n == f64::INFINITY => n,
            _ => 0.0,
        };
        let name = match self.get_by_name(&target_value, "name")? {
            Value::String(s) => format!("bound {}", s),
            _ => String::from("bound "),
        };
        let proto = self.object(target)?.prototype;
        let mut obj = JsObject::new(
            proto,
            ObjectClass::Function(FunctionKind::Bound { target, this, args }),
        );
        obj.add_named(
            &mut self.shapes,
            PropertyKey::from("length"),
            Property::data(Value::number(length), PropertyFlags::READ_ONLY_CONFIGURABLE),
        );
        obj.add_named(
            &mut self.shapes,
            PropertyKey::from("name"),
            Property::data(Value::string(&name), PropertyFlags::READ_ONLY_CONFIGURABLE),
        );
        self.alloc_object(obj)
    }

    /// Instantiate a bytecode function over `env`.
    ///
    /// Constructors get a fresh `prototype` object; generator functions get
    /// one inheriting from the generator prototype.
    pub(crate) fn create_closure(
        &mut self,
        code: CodeRef,
        env: Option<HeapRef>,
        lexical_this: Option<Value>,
    ) -> JsResult<HeapRef> {
        let Some(record) = self
            .module(code.module)
            .and_then(|m| m.function(code.function))
            .cloned()
        else {
            return Err(FatalError::MalformedBytecode(format!(
                "function index {} out of range",
                code.function
            ))
            .into());
        };
        let flags = record.flags;
        let lexical_this = if flags.arrow { lexical_this } else { None };
        let mut obj = JsObject::new(
            Some(self.intrinsics.function_prototype),
            ObjectClass::Function(FunctionKind::Bytecode {
                code,
                env,
                lexical_this,
                constructor: flags.constructor && !flags.arrow && !flags.generator,
                generator: flags.generator,
            }),
        );
        obj.add_named(
            &mut self.shapes,
            PropertyKey::from("length"),
            Property::data(
                Value::number(record.param_count as f64),
                PropertyFlags::READ_ONLY_CONFIGURABLE,
            ),
        );
        obj.add_named(
            &mut self.shapes,
            PropertyKey::from("name"),
            Property::data(Value::string(&record.name), PropertyFlags::READ_ONLY_CONFIGURABLE),
        );
        let closure = self.alloc_object(obj)?;

        if flags.generator {
            let proto = self.new_object_with_prototype(Some(self.intrinsics.generator_prototype))?;
            self.define_property_or_throw(
                closure,
                PropertyKey::from("prototype"),
                Value::Object(proto),
                PropertyFlags::data(true, false, false),
            )?;
        } else if flags.constructor && !flags.arrow {
            let proto = self.new_object()?;
            self.define_property_or_throw(
                proto,
                PropertyKey::from("constructor"),
                Value::Object(closure),
                PropertyFlags::HIDDEN,
            )?;
            self.define_property_or_throw(
                closure,
                PropertyKey::from("prototype"),
                Value::Object(proto),
                PropertyFlags::data(true, false, false),
            )?;
        }
        Ok(closure)
    }
}
