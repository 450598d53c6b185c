//! GC integration for JavaScript heap cells
//!
//! Every script object and environment record lives in the runtime's
//! [`Heap`] as a [`Cell`]. This module teaches the collector how to walk
//! cells and gathers the root set: the realm's intrinsics, persistent
//! handles, the native GC scope and every live call frame.
//!
//! Weak collections hold their keys weakly: `WeakMap` entries are traced
//! as ephemerons, `WeakSet` members and `WeakRef` targets not at all, and
//! the heap prunes dead entries after each collection.

use std::mem::size_of;

use core_types::{HeapRef, Value};
use memory_manager::{CollectionKind, GcStats, HeapSnapshot, Trace, Tracer};
use tracing::debug;

use crate::environment::Environment;
use crate::error::{FatalError, JsResult};
use crate::function::FunctionKind;
use crate::object::{JsObject, ObjectClass};
use crate::property::PropertyValue;
use crate::runtime::Runtime;

/// A garbage-collected heap cell.
#[derive(Debug)]
pub enum Cell {
    Object(JsObject),
    Environment(Environment),
}

impl Trace for Cell {
    fn trace(&self, tracer: &mut Tracer) {
        match self {
            Cell::Object(obj) => trace_object(obj, tracer),
            Cell::Environment(env) => {
                tracer.visit_opt(env.parent);
                for v in &env.slots {
                    tracer.visit_value(v);
                }
            }
        }
    }

    fn size_hint(&self) -> usize {
        let value = size_of::<Value>();
        match self {
            Cell::Object(obj) => {
                let mut size = size_of::<Cell>()
                    + obj.named_len() * size_of::<PropertyValue>()
                    + obj.elements.approx_len() * value;
                match &obj.class {
                    ObjectClass::ArrayBuffer(Some(bytes)) => size += bytes.len(),
                    ObjectClass::Generator(data) => {
                        if let Some(frame) = &data.frame {
                            size += (frame.registers.len() + frame.arguments.len()) * value;
                        }
                    }
                    ObjectClass::Function(FunctionKind::Bound { args, .. }) => {
                        size += args.len() * value
                    }
                    ObjectClass::Map(table) | ObjectClass::Set(table) => {
                        size += table.len() * 2 * value
                    }
                    ObjectClass::WeakMap(table) => {
                        size += table.len() * (value + size_of::<HeapRef>())
                    }
                    ObjectClass::WeakSet(members) => size += members.len() * size_of::<HeapRef>(),
                    _ => {}
                }
                size
            }
            Cell::Environment(env) => size_of::<Cell>() + env.slots.len() * value,
        }
    }

    fn holds_weak(&self) -> bool {
        matches!(
            self,
            Cell::Object(JsObject {
                class: ObjectClass::WeakMap(_) | ObjectClass::WeakSet(_) | ObjectClass::WeakRef(_),
                ..
            })
        )
    }

    fn clear_weak(&mut self, is_live: &dyn Fn(HeapRef) -> bool) -> usize {
        let Cell::Object(obj) = self else {
            return 0;
        };
        match &mut obj.class {
            ObjectClass::WeakMap(table) => {
                let before = table.len();
                table.retain(|key, _| is_live(*key));
                before - table.len()
            }
            ObjectClass::WeakSet(members) => {
                let before = members.len();
                members.retain(|member| is_live(*member));
                before - members.len()
            }
            ObjectClass::WeakRef(target) => match *target {
                Some(r) if !is_live(r) => {
                    *target = None;
                    1
                }
                _ => 0,
            },
            _ => 0,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Cell::Object(obj) => obj.class_name(),
            Cell::Environment(_) => "Environment",
        }
    }
}

fn trace_object(obj: &JsObject, tracer: &mut Tracer) {
    tracer.visit_opt(obj.prototype);
    for v in obj.property_values() {
        tracer.visit_value(v);
    }
    match &obj.class {
        ObjectClass::Function(FunctionKind::Bytecode {
            env, lexical_this, ..
        }) => {
            tracer.visit_opt(*env);
            if let Some(this) = lexical_this {
                tracer.visit_value(this);
            }
        }
        ObjectClass::Function(FunctionKind::Bound { target, this, args }) => {
            tracer.visit(*target);
            tracer.visit_value(this);
            for v in args {
                tracer.visit_value(v);
            }
        }
        ObjectClass::Arguments(Some(mapped)) => tracer.visit(mapped.env),
        ObjectClass::TypedArray(view) => tracer.visit(view.buffer),
        ObjectClass::Generator(data) => {
            if let Some(frame) = &data.frame {
                frame.trace(tracer);
            }
        }
        ObjectClass::Map(table) | ObjectClass::Set(table) => table.trace(tracer),
        ObjectClass::WeakMap(table) => {
            for (key, value) in table {
                tracer.visit_ephemeron(*key, value);
            }
        }
        ObjectClass::Function(FunctionKind::Native { .. })
        | ObjectClass::WeakSet(_)
        | ObjectClass::WeakRef(_)
        | ObjectClass::Ordinary
        | ObjectClass::Array { .. }
        | ObjectClass::Error(_)
        | ObjectClass::Arguments(None)
        | ObjectClass::ArrayBuffer(_)
        | ObjectClass::Primitive(_) => {}
    }
}

impl Runtime {
    /// Every handle the mutator can reach without going through the heap.
    pub(crate) fn roots(&self) -> Vec<HeapRef> {
        let mut tracer = Tracer::new();
        self.intrinsics.trace(&mut tracer);
        for v in self.persistent_values() {
            tracer.visit_value(v);
        }
        for v in &self.gc_scope {
            tracer.visit_value(v);
        }
        for frame in &self.frames {
            frame.trace(&mut tracer);
        }
        tracer.into_edges()
    }

    /// Poll for interrupts and service pending GC work.
    ///
    /// Called by the dispatch loop at back-edges, calls and returns only;
    /// never in the middle of an instruction.
    pub(crate) fn safepoint(&mut self) -> JsResult<()> {
        self.poll_interrupt()?;
        if self.heap.needs_safepoint() {
            let roots = self.roots();
            self.heap.safepoint(&roots);
        }
        Ok(())
    }

    /// Run a full collection now.
    pub fn collect_garbage(&mut self) {
        let roots = self.roots();
        self.heap.collect(CollectionKind::Full, &roots);
        debug!(target: "engine::gc", live = self.heap.len(), "explicit collection finished");
    }

    /// Run a young-generation scavenge now.
    pub fn collect_young(&mut self) {
        let roots = self.roots();
        self.heap.collect(CollectionKind::Young, &roots);
    }

    pub fn heap_stats(&self) -> GcStats {
        self.heap.stats()
    }

    pub fn heap_snapshot(&self) -> HeapSnapshot {
        self.heap.snapshot()
    }

    /// True if `value` is a primitive or names a cell that is still alive.
    pub fn is_live(&self, value: &Value) -> bool {
        value.heap_ref().map_or(true, |r| self.heap.is_live(r))
    }

    /// Collect once with `extra` treated as roots, then re-check the limit.
    pub(crate) fn collect_for(&mut self, size: usize, extra: &[HeapRef]) -> bool {
        let mut roots = self.roots();
        roots.extend_from_slice(extra);
        self.heap.collect(CollectionKind::Full, &roots);
        self.heap.reserve(size).is_ok()
    }

    /// Re-account `r` after it grew or shrank.
    pub(crate) fn note_resize(&mut self, r: HeapRef) -> JsResult<()> {
        let Some(size) = self.heap.get(r).map(Trace::size_hint) else {
            return Err(FatalError::StaleHandle(r).into());
        };
        if self.heap.resize(r, size).is_ok() {
            return Ok(());
        }
        self.collect_for(0, &[r]);
        if self.heap.resize(r, size).is_ok() {
            return Ok(());
        }
        Err(self.out_of_memory())
    }
}
