//! Contract tests verifying the memory_manager API the interpreter builds on.

use core_types::{HeapRef, Value};
use memory_manager::{
    AllocError, CollectionKind, GcStats, Heap, HeapConfig, Space, Trace, Tracer,
};

/// A cell holding arbitrary values, like an environment record.
struct Slots(Vec<Value>);

impl Trace for Slots {
    fn trace(&self, tracer: &mut Tracer) {
        for v in &self.0 {
            tracer.visit_value(v);
        }
    }

    fn size_hint(&self) -> usize {
        32 + self.0.len() * 16
    }

    fn kind_name(&self) -> &'static str {
        "slots"
    }
}

fn alloc(heap: &mut Heap<Slots>, values: Vec<Value>) -> HeapRef {
    heap.allocate(Slots(values)).expect("allocation")
}

/// Contract: allocate returns a live handle readable through get
#[test]
fn contract_heap_allocate_and_get() {
    let mut heap = Heap::new(HeapConfig::default());
    let r = alloc(&mut heap, vec![Value::number(7.0)]);
    assert!(heap.is_live(r));
    assert_eq!(heap.get(r).map(|s| s.0.len()), Some(1));
    assert_eq!(heap.generation_of(r), Some(Space::Young));
}

/// Contract: values held only by a rooted cell survive every collection kind
#[test]
fn contract_reachable_cells_survive() {
    let mut heap = Heap::new(HeapConfig::default());
    let captured = alloc(&mut heap, vec![]);
    let closure_env = alloc(&mut heap, vec![Value::Object(captured)]);
    for kind in [
        CollectionKind::Young,
        CollectionKind::Full,
        CollectionKind::Young,
        CollectionKind::Young,
        CollectionKind::Full,
    ] {
        heap.collect(kind, &[closure_env]);
        assert!(heap.is_live(captured), "lost after {:?}", kind);
    }
    assert_eq!(heap.generation_of(captured), Some(Space::Old));
}

/// Contract: unreachable cycles are reclaimed by a full collection
#[test]
fn contract_cycles_are_collected() {
    let mut heap = Heap::new(HeapConfig::default());
    let a = alloc(&mut heap, vec![]);
    let b = alloc(&mut heap, vec![Value::Object(a)]);
    heap.write(a).unwrap().0.push(Value::Object(b));
    // promote both so the cycle lives in the old generation
    heap.collect(CollectionKind::Young, &[a]);
    heap.collect(CollectionKind::Young, &[a]);
    assert_eq!(heap.generation_of(b), Some(Space::Old));

    heap.collect(CollectionKind::Full, &[]);
    assert!(!heap.is_live(a));
    assert!(!heap.is_live(b));
}

/// Contract: exceeding the hard limit is an AllocError, not a panic
#[test]
fn contract_heap_limit_error() {
    let mut heap = Heap::new(HeapConfig::default().with_max_heap(100));
    alloc(&mut heap, vec![Value::Null; 2]);
    let err = heap.allocate(Slots(vec![Value::Null; 4])).unwrap_err();
    assert!(matches!(err, AllocError::HeapLimit { .. }));
    assert!(err.to_string().contains("heap limit"));
}

/// Contract: statistics count collections and live cells
#[test]
fn contract_stats() {
    let mut heap = Heap::new(HeapConfig::default());
    let r = alloc(&mut heap, vec![]);
    alloc(&mut heap, vec![]);
    heap.collect(CollectionKind::Young, &[r]);
    let stats: GcStats = heap.stats();
    assert_eq!(stats.young_collections, 1);
    assert_eq!(stats.freed_cells, 1);
    assert_eq!(stats.live_cells, 1);
    assert_eq!(stats.collections(), 1);
}

/// Contract: incremental marking is serviced at safepoints
#[test]
fn contract_incremental_safepoints() {
    let config = HeapConfig::default()
        .with_incremental(true)
        .with_mark_step_budget(1)
        .with_old_trigger(0)
        .with_large_object_threshold(1);
    let mut heap = Heap::new(config);
    let keep = alloc(&mut heap, vec![]);
    let chain = alloc(&mut heap, vec![Value::Object(keep)]);
    let lost = alloc(&mut heap, vec![]);
    assert_eq!(heap.collection_requested(), Some(CollectionKind::Full));

    // first safepoint starts marking without collecting
    assert_eq!(heap.safepoint(&[chain]), None);
    assert!(heap.is_marking());

    let mut finished = None;
    for _ in 0..10 {
        if let Some(kind) = heap.safepoint(&[chain]) {
            finished = Some(kind);
            break;
        }
    }
    assert_eq!(finished, Some(CollectionKind::Full));
    assert!(heap.is_live(keep));
    assert!(!heap.is_live(lost));
}

/// Contract: heap snapshots serialize to JSON
#[test]
fn contract_snapshot_json() {
    let mut heap = Heap::new(HeapConfig::default());
    alloc(&mut heap, vec![]);
    let json = heap.snapshot().to_json().unwrap();
    assert!(json.contains("\"kind\": \"slots\""));
}
