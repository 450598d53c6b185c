//! ArrayBuffer storage and typed-array element access.
//!
//! Every element access re-reads the view and its buffer from the heap, so
//! a buffer detached by script code between two accesses is always seen.

use core_types::{HeapRef, Value};

use crate::error::{FatalError, JsResult};
use crate::object::{JsObject, ObjectClass};
use crate::runtime::Runtime;
use crate::typed_array::{TypedArrayData, TypedArrayKind};

/// Largest ArrayBuffer the runtime will create.
pub const MAX_BYTE_LENGTH: usize = u32::MAX as usize;

impl Runtime {
    /// A zero-filled buffer of `byte_length` bytes.
    pub fn new_array_buffer(&mut self, byte_length: usize) -> JsResult<HeapRef> {
        if byte_length > MAX_BYTE_LENGTH {
            return self.throw_range_error("Invalid array buffer length");
        }
        if self.heap.reserve(byte_length).is_err() && !self.collect_for(byte_length, &[]) {
            return Err(self.out_of_memory());
        }
        self.array_buffer_from(vec![0; byte_length])
    }

    /// A buffer taking ownership of `bytes`.
    pub fn array_buffer_from(&mut self, bytes: Vec<u8>) -> JsResult<HeapRef> {
        let proto = self.intrinsics.array_buffer_prototype;
        self.alloc_object(JsObject::new(Some(proto), ObjectClass::ArrayBuffer(Some(bytes))))
    }

    pub fn is_array_buffer(&self, value: &Value) -> bool {
        match value {
            Value::Object(r) => matches!(
                self.object(*r).map(|o| &o.class),
                Ok(ObjectClass::ArrayBuffer(_))
            ),
            _ => false,
        }
    }

    /// Contents of `buffer`; `None` once detached (or for non-buffers).
    pub fn array_buffer_bytes(&self, buffer: HeapRef) -> JsResult<Option<&[u8]>> {
        Ok(match &self.object(buffer)?.class {
            ObjectClass::ArrayBuffer(Some(bytes)) => Some(bytes.as_slice()),
            _ => None,
        })
    }

    pub fn is_detached(&self, buffer: HeapRef) -> JsResult<bool> {
        Ok(matches!(
            self.object(buffer)?.class,
            ObjectClass::ArrayBuffer(None)
        ))
    }

    /// Detach `buffer`, returning its former contents.
    ///
    /// Every view over the buffer reads as empty afterwards.
    pub fn detach_array_buffer(&mut self, buffer: HeapRef) -> JsResult<Vec<u8>> {
        let bytes = match &mut self.object_mut(buffer)?.class {
            ObjectClass::ArrayBuffer(bytes) => bytes.take(),
            _ => return self.throw_type_error("Argument is not an ArrayBuffer"),
        };
        let Some(bytes) = bytes else {
            return self.throw_type_error("ArrayBuffer is already detached");
        };
        self.note_resize(buffer)?;
        Ok(bytes)
    }

    /// A `kind` view of `length` elements at `byte_offset` into `buffer`.
    pub fn new_typed_array(
        &mut self,
        kind: TypedArrayKind,
        buffer: HeapRef,
        byte_offset: usize,
        length: usize,
    ) -> JsResult<HeapRef> {
        let buffer_len = match &self.object(buffer)?.class {
            ObjectClass::ArrayBuffer(Some(bytes)) => bytes.len(),
            ObjectClass::ArrayBuffer(None) => {
                return self.throw_type_error("Cannot perform Construct on a detached ArrayBuffer");
            }
            _ => return self.throw_type_error("Argument is not an ArrayBuffer"),
        };
        let size = kind.element_size();
        if byte_offset % size != 0 {
            let message = format!(
                "start offset of {} should be a multiple of {}",
                kind.name(),
                size
            );
            return self.throw_range_error(&message);
        }
        let end = length
            .checked_mul(size)
            .and_then(|bytes| bytes.checked_add(byte_offset));
        if end.map_or(true, |end| end > buffer_len) {
            let message = format!("Invalid typed array length: {}", length);
            return self.throw_range_error(&message);
        }
        let proto = self.intrinsics.typed_array_prototype_for(kind);
        self.alloc_object(JsObject::new(
            Some(proto),
            ObjectClass::TypedArray(TypedArrayData {
                kind,
                buffer,
                byte_offset,
                length,
            }),
        ))
    }

    /// View metadata of `r`, or `None` if it is not a typed array.
    pub fn typed_array_data(&self, r: HeapRef) -> JsResult<Option<TypedArrayData>> {
        Ok(match &self.object(r)?.class {
            ObjectClass::TypedArray(view) => Some(view.clone()),
            _ => None,
        })
    }

    /// Element count of a view; zero once its buffer is detached.
    pub fn typed_array_length(&self, r: HeapRef) -> JsResult<usize> {
        let Some(view) = self.typed_array_data(r)? else {
            return Ok(0);
        };
        Ok(match self.array_buffer_bytes(view.buffer)? {
            Some(bytes) if view.byte_offset + view.byte_length() <= bytes.len() => view.length,
            _ => 0,
        })
    }

    /// Element `index` of view `r`; `None` when out of range or detached.
    pub fn typed_array_get(&self, r: HeapRef, index: usize) -> JsResult<Option<Value>> {
        let Some(view) = self.typed_array_data(r)? else {
            return Ok(None);
        };
        let Some(bytes) = self.array_buffer_bytes(view.buffer)? else {
            return Ok(None);
        };
        Ok(view
            .element_range(index, bytes.len())
            .map(|range| view.kind.read(&bytes[range])))
    }

    /// Store `value` at `index` of view `r`.
    ///
    /// The value is converted first; conversion may run script that
    /// detaches the buffer, in which case the store is dropped.
    pub fn typed_array_set(&mut self, r: HeapRef, index: usize, value: Value) -> JsResult<()> {
        let Some(kind) = self.typed_array_data(r)?.map(|v| v.kind) else {
            return Err(FatalError::Internal(format!("{:?} is not a typed array", r)).into());
        };
        let converted = if kind.is_bigint() {
            Value::BigInt(self.to_bigint(&value)?)
        } else {
            Value::number(self.to_number(&value)?)
        };
        self.typed_array_store(r, index, &converted)
    }

    /// Store an already converted element; no script code runs.
    pub(crate) fn typed_array_store(&mut self, r: HeapRef, index: usize, value: &Value) -> JsResult<()> {
        let Some(view) = self.typed_array_data(r)? else {
            return Ok(());
        };
        if let ObjectClass::ArrayBuffer(Some(bytes)) = &mut self.object_mut(view.buffer)?.class {
            if let Some(range) = view.element_range(index, bytes.len()) {
                view.kind.write(&mut bytes[range], value);
            }
        }
        Ok(())
    }
}
