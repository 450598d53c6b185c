//! The realm's intrinsic objects.
//!
//! The runtime creates the bare prototype objects and the global object
//! itself, so core operations (property access on primitives, error
//! construction, generator creation) work before any library is installed.
//! `builtins::install` then fills them with methods.

use std::rc::Rc;

use core_types::{ErrorKind, HeapRef, SymbolId, Value};
use memory_manager::{AllocError, Heap, Tracer};

use crate::function::{CallArgs, FunctionKind, NativeFunction};
use crate::error::JsResult;
use crate::gc_integration::Cell;
use crate::object::{JsObject, ObjectClass};
use crate::property::{Property, PropertyFlags, PropertyKey};
use crate::runtime::Runtime;
use crate::shape::ShapeTable;
use crate::typed_array::TypedArrayKind;

/// `Symbol.iterator`
pub const SYMBOL_ITERATOR: SymbolId = SymbolId(0);
/// `Symbol.toPrimitive`
pub const SYMBOL_TO_PRIMITIVE: SymbolId = SymbolId(1);
/// `Symbol.hasInstance`
pub const SYMBOL_HAS_INSTANCE: SymbolId = SymbolId(2);

/// Descriptions of the well-known symbols, indexed by id.
pub(crate) const WELL_KNOWN_SYMBOLS: [&str; 3] =
    ["Symbol.iterator", "Symbol.toPrimitive", "Symbol.hasInstance"];

/// Handles of the objects every realm starts with.
#[derive(Debug, Clone)]
pub struct Intrinsics {
    pub global: HeapRef,
    pub object_prototype: HeapRef,
    pub function_prototype: HeapRef,
    pub array_prototype: HeapRef,
    /// Indexed like [`ErrorKind::ALL`].
    pub error_prototypes: [HeapRef; 7],
    pub string_prototype: HeapRef,
    pub number_prototype: HeapRef,
    pub boolean_prototype: HeapRef,
    pub symbol_prototype: HeapRef,
    pub bigint_prototype: HeapRef,
    pub iterator_prototype: HeapRef,
    pub generator_prototype: HeapRef,
    pub array_buffer_prototype: HeapRef,
    pub typed_array_prototype: HeapRef,
    /// Indexed like [`TypedArrayKind::ALL`].
    pub typed_array_prototypes: [HeapRef; 11],
    pub map_prototype: HeapRef,
    pub set_prototype: HeapRef,
    pub weak_map_prototype: HeapRef,
    pub weak_set_prototype: HeapRef,
    pub weak_ref_prototype: HeapRef,
    /// Shared accessor that throws for poisoned properties such as
    /// `arguments.callee` in strict code.
    pub throw_type_error: HeapRef,
}

fn function_prototype_body(_rt: &mut Runtime, _args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Undefined)
}

fn throw_type_error_body(rt: &mut Runtime, _args: &CallArgs) -> JsResult<Value> {
    rt.throw_type_error(
        "'caller', 'callee', and 'arguments' properties may not be accessed on strict mode functions or the arguments objects for calls to them",
    )
}

struct Builder<'a> {
    heap: &'a mut Heap<Cell>,
    shapes: &'a mut ShapeTable,
}

impl Builder<'_> {
    fn object(&mut self, prototype: Option<HeapRef>, class: ObjectClass) -> Result<HeapRef, AllocError> {
        self.heap.allocate(Cell::Object(JsObject::new(prototype, class)))
    }

    fn native(
        &mut self,
        prototype: HeapRef,
        name: &str,
        func: NativeFunction,
    ) -> Result<HeapRef, AllocError> {
        let mut obj = JsObject::new(
            Some(prototype),
            ObjectClass::Function(FunctionKind::Native {
                func,
                magic: 0,
                constructor: false,
            }),
        );
        obj.add_named(
            self.shapes,
            PropertyKey::from("length"),
            Property::data(Value::number(0.0), PropertyFlags::READ_ONLY_CONFIGURABLE),
        );
        obj.add_named(
            self.shapes,
            PropertyKey::from("name"),
            Property::data(Value::string(name), PropertyFlags::READ_ONLY_CONFIGURABLE),
        );
        self.heap.allocate(Cell::Object(obj))
    }

    fn error_prototype(&mut self, prototype: HeapRef, kind: ErrorKind) -> Result<HeapRef, AllocError> {
        let mut obj = JsObject::ordinary(Some(prototype));
        obj.add_named(
            self.shapes,
            PropertyKey::from("name"),
            Property::data(Value::string(kind.name()), PropertyFlags::HIDDEN),
        );
        obj.add_named(
            self.shapes,
            PropertyKey::from("message"),
            Property::data(Value::string(""), PropertyFlags::HIDDEN),
        );
        self.heap.allocate(Cell::Object(obj))
    }
}

impl Intrinsics {
    /// Allocate the intrinsic objects of a fresh realm.
    pub(crate) fn create(heap: &mut Heap<Cell>, shapes: &mut ShapeTable) -> Result<Self, AllocError> {
        let mut b = Builder { heap, shapes };
        let object_prototype = b.object(None, ObjectClass::Ordinary)?;
        let function_prototype = b.native(object_prototype, "", function_prototype_body)?;
        let array_prototype = b.object(
            Some(object_prototype),
            ObjectClass::Array {
                length: 0,
                length_writable: true,
            },
        )?;

        let base_error = b.error_prototype(object_prototype, ErrorKind::Error)?;
        let mut error_prototypes = [base_error; 7];
        for (slot, kind) in error_prototypes.iter_mut().zip(ErrorKind::ALL) {
            if kind != ErrorKind::Error {
                *slot = b.error_prototype(base_error, kind)?;
            }
        }

        let string_prototype = b.object(
            Some(object_prototype),
            ObjectClass::Primitive(Value::String(Rc::from(""))),
        )?;
        let number_prototype = b.object(
            Some(object_prototype),
            ObjectClass::Primitive(Value::number(0.0)),
        )?;
        let boolean_prototype = b.object(
            Some(object_prototype),
            ObjectClass::Primitive(Value::Boolean(false)),
        )?;
        let symbol_prototype = b.object(Some(object_prototype), ObjectClass::Ordinary)?;
        let bigint_prototype = b.object(Some(object_prototype), ObjectClass::Ordinary)?;
        let iterator_prototype = b.object(Some(object_prototype), ObjectClass::Ordinary)?;
        let generator_prototype = b.object(Some(iterator_prototype), ObjectClass::Ordinary)?;
        let array_buffer_prototype = b.object(Some(object_prototype), ObjectClass::Ordinary)?;
        let typed_array_prototype = b.object(Some(object_prototype), ObjectClass::Ordinary)?;
        let mut typed_array_prototypes = [typed_array_prototype; 11];
        for slot in typed_array_prototypes.iter_mut() {
            *slot = b.object(Some(typed_array_prototype), ObjectClass::Ordinary)?;
        }
        let map_prototype = b.object(Some(object_prototype), ObjectClass::Ordinary)?;
        let set_prototype = b.object(Some(object_prototype), ObjectClass::Ordinary)?;
        let weak_map_prototype = b.object(Some(object_prototype), ObjectClass::Ordinary)?;
        let weak_set_prototype = b.object(Some(object_prototype), ObjectClass::Ordinary)?;
        let weak_ref_prototype = b.object(Some(object_prototype), ObjectClass::Ordinary)?;

        let throw_type_error = b.native(function_prototype, "", throw_type_error_body)?;
        if let Some(Cell::Object(thrower)) = b.heap.write(throw_type_error) {
            thrower.extensible = false;
        }
        let global = b.object(Some(object_prototype), ObjectClass::Ordinary)?;

        Ok(Self {
            global,
            object_prototype,
            function_prototype,
            array_prototype,
            error_prototypes,
            string_prototype,
            number_prototype,
            boolean_prototype,
            symbol_prototype,
            bigint_prototype,
            iterator_prototype,
            generator_prototype,
            array_buffer_prototype,
            typed_array_prototype,
            typed_array_prototypes,
            map_prototype,
            set_prototype,
            weak_map_prototype,
            weak_set_prototype,
            weak_ref_prototype,
            throw_type_error,
        })
    }

    pub fn error_prototype(&self, kind: ErrorKind) -> HeapRef {
        let index = ErrorKind::ALL.iter().position(|k| *k == kind).unwrap_or(0);
        self.error_prototypes[index]
    }

    pub fn typed_array_prototype_for(&self, kind: TypedArrayKind) -> HeapRef {
        self.typed_array_prototypes[kind.index()]
    }

    pub(crate) fn trace(&self, tracer: &mut Tracer) {
        for r in [
            self.global,
            self.object_prototype,
            self.function_prototype,
            self.array_prototype,
            self.string_prototype,
            self.number_prototype,
            self.boolean_prototype,
            self.symbol_prototype,
            self.bigint_prototype,
            self.iterator_prototype,
            self.generator_prototype,
            self.array_buffer_prototype,
            self.typed_array_prototype,
            self.map_prototype,
            self.set_prototype,
            self.weak_map_prototype,
            self.weak_set_prototype,
            self.weak_ref_prototype,
            self.throw_type_error,
        ] {
            tracer.visit(r);
        }
        for r in self.error_prototypes.iter().chain(&self.typed_array_prototypes) {
            tracer.visit(*r);
        }
    }
}
