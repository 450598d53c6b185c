//! Heap management with generational garbage collection.
//!
//! Cells live behind a handle table, so [`HeapRef`]s stay valid while the
//! collector moves cells between spaces or compacts the old generation.
//!
//! - Young generation: cells are evacuated into a fresh space by a scavenge;
//!   survivors are promoted after `promotion_age` scavenges.
//! - Old generation: mark-and-sweep, with sliding compaction once the slot
//!   array is fragmented past `compaction_threshold`.
//! - Old cells handed out through [`Heap::write`] are remembered as possible
//!   holders of young references.
//! - Weak references are never followed. Ephemeron values are marked only
//!   once their key is. Cells reporting [`Trace::holds_weak`] are asked to
//!   drop dead entries at the end of every collection.
//!
//! Collection is never run from inside [`Heap::allocate`]. Pressure sets a
//! request that the embedder services at its next safepoint via
//! [`Heap::safepoint`], where it can enumerate every root.

use std::collections::HashSet;
use std::time::Instant;

use core_types::HeapRef;
use tracing::{debug, trace};

use crate::gc::{AllocError, CollectionKind, GcStats, HeapConfig, MarkColor};
use crate::incremental::IncrementalMarker;
use crate::snapshot::{CellSnapshot, HeapSnapshot};
use crate::trace::{edges_of, Trace, Tracer};
use crate::write_barrier::RememberedSet;

/// Space a live cell currently occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    Young,
    Old,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Free,
    Young(u32),
    Old(u32),
}

#[derive(Debug)]
struct HandleEntry {
    generation: u32,
    location: Location,
}

struct Record<C> {
    cell: C,
    handle: u32,
    age: u8,
    color: MarkColor,
    size: usize,
}

/// The main heap structure.
///
/// # Examples
///
/// ```
/// use core_types::HeapRef;
/// use memory_manager::{CollectionKind, Heap, HeapConfig, Trace, Tracer};
///
/// struct Pair(Option<HeapRef>);
/// impl Trace for Pair {
///     fn trace(&self, tracer: &mut Tracer) {
///         tracer.visit_opt(self.0);
///     }
/// }
///
/// let mut heap = Heap::new(HeapConfig::default());
/// let leaf = heap.allocate(Pair(None)).unwrap();
/// let root = heap.allocate(Pair(Some(leaf))).unwrap();
/// let garbage = heap.allocate(Pair(None)).unwrap();
///
/// heap.collect(CollectionKind::Full, &[root]);
/// assert!(heap.is_live(leaf));
/// assert!(!heap.is_live(garbage));
/// ```
pub struct Heap<C: Trace> {
    config: HeapConfig,
    handles: Vec<HandleEntry>,
    free_handles: Vec<u32>,
    young: Vec<Record<C>>,
    young_bytes: usize,
    old: Vec<Option<Record<C>>>,
    old_free: Vec<u32>,
    old_bytes: usize,
    old_trigger: usize,
    remembered: RememberedSet,
    marker: IncrementalMarker,
    requested: Option<CollectionKind>,
    stats: GcStats,
    tracer: Tracer,
    /// Handles of cells that hold weak references.
    weak_holders: HashSet<u32>,
    /// Ephemerons seen during marking whose key is not yet marked.
    pending_ephemerons: Vec<(HeapRef, HeapRef)>,
}

impl<C: Trace> Heap<C> {
    /// Creates an empty heap.
    pub fn new(config: HeapConfig) -> Self {
        let old_trigger = config.old_trigger;
        Heap {
            config,
            handles: Vec::new(),
            free_handles: Vec::new(),
            young: Vec::new(),
            young_bytes: 0,
            old: Vec::new(),
            old_free: Vec::new(),
            old_bytes: 0,
            old_trigger,
            remembered: RememberedSet::new(),
            marker: IncrementalMarker::new(),
            requested: None,
            stats: GcStats::default(),
            tracer: Tracer::new(),
            weak_holders: HashSet::new(),
            pending_ephemerons: Vec::new(),
        }
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Bytes currently accounted to live or not-yet-collected cells.
    pub fn in_use(&self) -> usize {
        self.young_bytes + self.old_bytes
    }

    /// Number of cells not yet reclaimed.
    pub fn len(&self) -> usize {
        self.young.len() + self.old.len() - self.old_free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that `size` more bytes fit under the hard limit.
    pub fn reserve(&self, size: usize) -> Result<(), AllocError> {
        let in_use = self.in_use();
        if in_use.saturating_add(size) > self.config.max_heap {
            return Err(AllocError::HeapLimit {
                requested: size,
                in_use,
                limit: self.config.max_heap,
            });
        }
        Ok(())
    }

    /// Move `cell` into the heap.
    ///
    /// Large cells are pretenured into the old generation. Crossing the
    /// young capacity or the old trigger only requests a collection.
    pub fn allocate(&mut self, cell: C) -> Result<HeapRef, AllocError> {
        let size = cell.size_hint().max(1);
        self.reserve(size)?;
        let handle = self.new_handle()?;
        if cell.holds_weak() {
            self.weak_holders.insert(handle);
        }
        let marking = self.marker.is_marking();
        let color = if marking {
            MarkColor::Gray
        } else {
            MarkColor::White
        };

        if size >= self.config.large_object_threshold {
            let record = Record {
                cell,
                handle,
                age: self.config.promotion_age,
                color,
                size,
            };
            let slot = self.place_old(record);
            self.handles[handle as usize].location = Location::Old(slot);
            self.remembered.add(handle);
            self.stats.pretenured_cells += 1;
            trace!(target: "engine::gc", handle, size, "pretenured cell");
            if self.old_bytes > self.old_trigger {
                self.request(CollectionKind::Full);
            }
        } else {
            let slot = self.young.len() as u32;
            self.young.push(Record {
                cell,
                handle,
                age: 0,
                color,
                size,
            });
            self.young_bytes += size;
            self.handles[handle as usize].location = Location::Young(slot);
            if self.young_bytes >= self.config.young_capacity {
                self.request(CollectionKind::Young);
            }
        }

        if marking {
            self.marker.mark_stack().push(handle);
        }
        self.stats.allocated_cells += 1;
        Ok(HeapRef::new(handle, self.handles[handle as usize].generation))
    }

    fn new_handle(&mut self) -> Result<u32, AllocError> {
        if let Some(index) = self.free_handles.pop() {
            return Ok(index);
        }
        let index = u32::try_from(self.handles.len()).map_err(|_| AllocError::HandlesExhausted)?;
        self.handles.push(HandleEntry {
            generation: 0,
            location: Location::Free,
        });
        Ok(index)
    }

    fn free_handle(&mut self, index: u32) {
        let entry = &mut self.handles[index as usize];
        entry.generation = entry.generation.wrapping_add(1);
        entry.location = Location::Free;
        self.free_handles.push(index);
        self.remembered.remove(index);
        self.weak_holders.remove(&index);
    }

    fn place_old(&mut self, record: Record<C>) -> u32 {
        self.old_bytes += record.size;
        if let Some(slot) = self.old_free.pop() {
            self.old[slot as usize] = Some(record);
            slot
        } else {
            self.old.push(Some(record));
            (self.old.len() - 1) as u32
        }
    }

    fn request(&mut self, kind: CollectionKind) {
        self.requested = match (self.requested, kind) {
            (Some(CollectionKind::Full), _) | (_, CollectionKind::Full) => Some(CollectionKind::Full),
            _ => Some(CollectionKind::Young),
        };
    }

    fn resolve(&self, r: HeapRef) -> Option<Location> {
        let entry = self.handles.get(r.index() as usize)?;
        if entry.generation != r.generation() || entry.location == Location::Free {
            return None;
        }
        Some(entry.location)
    }

    fn location_of_index(&self, index: u32) -> Option<Location> {
        match self.handles.get(index as usize)?.location {
            Location::Free => None,
            loc => Some(loc),
        }
    }

    fn record(&self, loc: Location) -> Option<&Record<C>> {
        match loc {
            Location::Young(i) => self.young.get(i as usize),
            Location::Old(i) => self.old.get(i as usize)?.as_ref(),
            Location::Free => None,
        }
    }

    fn record_mut(&mut self, loc: Location) -> Option<&mut Record<C>> {
        match loc {
            Location::Young(i) => self.young.get_mut(i as usize),
            Location::Old(i) => self.old.get_mut(i as usize)?.as_mut(),
            Location::Free => None,
        }
    }

    /// Shared access to a cell. `None` for a stale or unknown handle.
    pub fn get(&self, r: HeapRef) -> Option<&C> {
        let loc = self.resolve(r)?;
        self.record(loc).map(|rec| &rec.cell)
    }

    /// Mutable access to a cell, with the write barrier applied.
    ///
    /// An old holder is remembered for the next scavenge; during incremental
    /// marking a black holder is turned gray and rescanned.
    pub fn write(&mut self, r: HeapRef) -> Option<&mut C> {
        let loc = self.resolve(r)?;
        let marking = self.marker.is_marking();
        if matches!(loc, Location::Old(_)) {
            self.remembered.add(r.index());
        }
        let rec = match loc {
            Location::Young(i) => self.young.get_mut(i as usize)?,
            Location::Old(i) => self.old.get_mut(i as usize)?.as_mut()?,
            Location::Free => return None,
        };
        if marking && rec.color == MarkColor::Black {
            rec.color = MarkColor::Gray;
            self.marker.note_regrey(r.index());
        }
        Some(&mut rec.cell)
    }

    /// Re-account a cell whose retained size changed after allocation.
    ///
    /// Growth past the hard limit is refused and the recorded size is left
    /// unchanged. Unknown handles are ignored.
    pub fn resize(&mut self, r: HeapRef, new_size: usize) -> Result<(), AllocError> {
        let Some(loc) = self.resolve(r) else {
            return Ok(());
        };
        let old_size = self.record(loc).map_or(0, |rec| rec.size);
        if new_size > old_size {
            self.reserve(new_size - old_size)?;
        }
        if let Some(rec) = self.record_mut(loc) {
            rec.size = new_size;
        }
        match loc {
            Location::Young(_) => {
                self.young_bytes = self.young_bytes - old_size + new_size;
                if self.young_bytes >= self.config.young_capacity {
                    self.request(CollectionKind::Young);
                }
            }
            Location::Old(_) => {
                self.old_bytes = self.old_bytes - old_size + new_size;
                if self.old_bytes > self.old_trigger {
                    self.request(CollectionKind::Full);
                }
            }
            Location::Free => {}
        }
        Ok(())
    }

    /// True if `r` still names a live cell.
    pub fn is_live(&self, r: HeapRef) -> bool {
        self.resolve(r).is_some()
    }

    /// Which generation holds `r`.
    pub fn generation_of(&self, r: HeapRef) -> Option<Space> {
        match self.resolve(r)? {
            Location::Young(_) => Some(Space::Young),
            Location::Old(_) => Some(Space::Old),
            Location::Free => None,
        }
    }

    /// Handles of every cell not yet reclaimed.
    pub fn handles(&self) -> impl Iterator<Item = HeapRef> + '_ {
        self.handles
            .iter()
            .enumerate()
            .filter(|(_, e)| e.location != Location::Free)
            .map(|(i, e)| HeapRef::new(i as u32, e.generation))
    }

    pub fn remembered_set(&self) -> &RememberedSet {
        &self.remembered
    }

    /// Pending collection request, if allocation pressure raised one.
    pub fn collection_requested(&self) -> Option<CollectionKind> {
        self.requested
    }

    /// True if [`Heap::safepoint`] has work to do.
    pub fn needs_safepoint(&self) -> bool {
        self.requested.is_some() || self.marker.is_marking()
    }

    pub fn is_marking(&self) -> bool {
        self.marker.is_marking()
    }

    /// Service pending GC work. Returns the collection that ran, if any.
    ///
    /// With incremental marking enabled a full request starts marking, and
    /// later safepoints advance it; marking finishes (and sweeps) once the
    /// mark stack drains or a scavenge is requested in the meantime.
    pub fn safepoint(&mut self, roots: &[HeapRef]) -> Option<CollectionKind> {
        if self.marker.is_marking() {
            if self.requested.is_some() || self.incremental_step() {
                self.collect(CollectionKind::Full, roots);
                return Some(CollectionKind::Full);
            }
            return None;
        }
        match self.requested {
            Some(CollectionKind::Full) if self.config.incremental => {
                self.start_incremental_mark(roots);
                None
            }
            Some(kind) => {
                self.collect(kind, roots);
                Some(kind)
            }
            None => None,
        }
    }

    /// Begin an incremental marking cycle from `roots`.
    pub fn start_incremental_mark(&mut self, roots: &[HeapRef]) {
        if self.marker.is_marking() {
            return;
        }
        self.requested = None;
        self.whiten_all();
        self.marker.begin();
        for r in roots {
            self.grey(*r);
        }
        debug!(
            target: "engine::gc",
            roots = roots.len(),
            cells = self.len(),
            "incremental marking started"
        );
    }

    /// Blacken up to `mark_step_budget` gray cells. Returns true once the
    /// mark stack is empty.
    pub fn incremental_step(&mut self) -> bool {
        if !self.marker.is_marking() {
            return true;
        }
        let budget = self.config.mark_step_budget;
        let marked = self.mark_some(Some(budget));
        self.marker.note_increment(marked);
        self.stats.incremental_steps += 1;
        self.marker.mark_stack().is_empty()
    }

    fn whiten_all(&mut self) {
        self.pending_ephemerons.clear();
        for rec in self.young.iter_mut() {
            rec.color = MarkColor::White;
        }
        for rec in self.old.iter_mut().flatten() {
            rec.color = MarkColor::White;
        }
    }

    fn grey(&mut self, r: HeapRef) {
        let Some(loc) = self.resolve(r) else {
            return;
        };
        if let Some(rec) = self.record_mut(loc) {
            if rec.color == MarkColor::White {
                rec.color = MarkColor::Gray;
                self.marker.mark_stack().push(r.index());
            }
        }
    }

    fn mark_some(&mut self, limit: Option<usize>) -> usize {
        let mut tracer = std::mem::take(&mut self.tracer);
        let mut marked = 0;
        while limit.map_or(true, |l| marked < l) {
            let Some(index) = self.marker.mark_stack().pop() else {
                break;
            };
            let Some(loc) = self.location_of_index(index) else {
                continue;
            };
            let Some(rec) = self.record_mut(loc) else {
                continue;
            };
            if rec.color == MarkColor::Black {
                continue;
            }
            rec.color = MarkColor::Black;
            tracer.clear();
            rec.cell.trace(&mut tracer);
            marked += 1;
            for edge in tracer.drain() {
                self.grey(edge);
            }
            for (key, value) in tracer.take_ephemerons() {
                if self.is_marked(key) {
                    self.grey(value);
                } else {
                    self.pending_ephemerons.push((key, value));
                }
            }
        }
        self.tracer = tracer;
        marked
    }

    fn is_marked(&self, r: HeapRef) -> bool {
        self.resolve(r)
            .and_then(|loc| self.record(loc))
            .map_or(false, |rec| rec.color != MarkColor::White)
    }

    /// Mark ephemeron values whose keys turned out reachable, repeating
    /// until no further key becomes marked.
    fn settle_ephemerons(&mut self) {
        loop {
            let mut progressed = false;
            for (key, value) in std::mem::take(&mut self.pending_ephemerons) {
                if self.is_marked(key) {
                    self.grey(value);
                    progressed = true;
                } else {
                    self.pending_ephemerons.push((key, value));
                }
            }
            if !progressed {
                break;
            }
            self.mark_some(None);
        }
        self.pending_ephemerons.clear();
    }

    /// Ask every weak holder to drop entries whose targets were freed.
    fn clear_weak_refs(&mut self) -> usize {
        let handles = &self.handles;
        let is_live = |r: HeapRef| {
            handles.get(r.index() as usize).map_or(false, |entry| {
                entry.generation == r.generation() && entry.location != Location::Free
            })
        };
        let mut cleared = 0;
        for index in &self.weak_holders {
            let rec = match handles.get(*index as usize).map(|entry| entry.location) {
                Some(Location::Young(i)) => self.young.get_mut(i as usize),
                Some(Location::Old(i)) => self.old.get_mut(i as usize).and_then(Option::as_mut),
                _ => None,
            };
            if let Some(rec) = rec {
                cleared += rec.cell.clear_weak(&is_live);
            }
        }
        if cleared > 0 {
            trace!(target: "engine::gc", cleared, "weak references cleared");
        }
        cleared
    }

    /// Run a collection now. `roots` must name every cell the embedder can
    /// still reach; anything else may be reclaimed.
    pub fn collect(&mut self, kind: CollectionKind, roots: &[HeapRef]) {
        let kind = if self.marker.is_marking() {
            CollectionKind::Full
        } else {
            kind
        };
        let start = Instant::now();
        let cells_before = self.len();
        debug!(
            target: "engine::gc",
            ?kind,
            roots = roots.len(),
            young_bytes = self.young_bytes,
            old_bytes = self.old_bytes,
            "collection starting"
        );

        self.requested = None;
        let (freed, promoted) = match kind {
            CollectionKind::Young => self.scavenge(roots),
            CollectionKind::Full => self.full(roots),
        };
        let cleared = self.clear_weak_refs();
        self.stats.cleared_weak += cleared;

        match kind {
            CollectionKind::Young => self.stats.young_collections += 1,
            CollectionKind::Full => self.stats.full_collections += 1,
        }
        self.stats.freed_cells += freed;
        self.stats.promoted_cells += promoted;
        let pause = start.elapsed().as_micros() as u64;
        self.stats.record_pause(pause);

        debug!(
            target: "engine::gc",
            ?kind,
            cells_before,
            freed,
            promoted,
            cleared_weak = cleared,
            pause_us = pause,
            live_cells = self.len(),
            young_bytes = self.young_bytes,
            old_bytes = self.old_bytes,
            "collection complete"
        );
    }

    fn reach_young(&self, r: HeapRef, reached: &mut [bool], worklist: &mut Vec<usize>) {
        if let Some(Location::Young(i)) = self.resolve(r) {
            let i = i as usize;
            if !reached[i] {
                reached[i] = true;
                worklist.push(i);
            }
        }
    }

    /// True if ephemeron `key` survives the scavenge in progress: old keys
    /// are assumed live, young ones must have been reached.
    fn key_survives_scavenge(&self, key: HeapRef, reached: &[bool]) -> bool {
        match self.resolve(key) {
            Some(Location::Young(i)) => reached.get(i as usize).copied().unwrap_or(false),
            Some(Location::Old(_)) => true,
            _ => false,
        }
    }

    /// Follow the strong edges and ephemerons `tracer` collected.
    fn scan_for_young(
        &self,
        tracer: &Tracer,
        reached: &mut [bool],
        worklist: &mut Vec<usize>,
        pending: &mut Vec<(HeapRef, HeapRef)>,
    ) {
        for edge in tracer.edges() {
            self.reach_young(*edge, reached, worklist);
        }
        for &(key, value) in tracer.ephemerons() {
            if self.key_survives_scavenge(key, reached) {
                self.reach_young(value, reached, worklist);
            } else {
                pending.push((key, value));
            }
        }
    }

    fn scavenge(&mut self, roots: &[HeapRef]) -> (usize, usize) {
        let mut tracer = std::mem::take(&mut self.tracer);
        let mut reached = vec![false; self.young.len()];
        let mut worklist = Vec::new();
        let mut pending = Vec::new();

        for r in roots {
            self.reach_young(*r, &mut reached, &mut worklist);
        }
        for holder in self.remembered.as_roots() {
            let Some(loc @ Location::Old(_)) = self.location_of_index(holder) else {
                continue;
            };
            tracer.clear();
            if let Some(rec) = self.record(loc) {
                rec.cell.trace(&mut tracer);
            }
            self.scan_for_young(&tracer, &mut reached, &mut worklist, &mut pending);
        }
        loop {
            while let Some(i) = worklist.pop() {
                tracer.clear();
                self.young[i].cell.trace(&mut tracer);
                self.scan_for_young(&tracer, &mut reached, &mut worklist, &mut pending);
            }
            let mut progressed = false;
            for (key, value) in std::mem::take(&mut pending) {
                if self.key_survives_scavenge(key, &reached) {
                    self.reach_young(value, &mut reached, &mut worklist);
                    progressed = true;
                } else {
                    pending.push((key, value));
                }
            }
            if !progressed {
                break;
            }
        }

        let (freed, promoted) = self.evacuate_young(&reached);
        self.prune_remembered(&mut tracer);
        self.tracer = tracer;

        if self.old_bytes > self.old_trigger {
            self.request(CollectionKind::Full);
        }
        (freed, promoted)
    }

    /// Rebuild the young space from the survivors in `reached`, promoting
    /// those old enough.
    fn evacuate_young(&mut self, reached: &[bool]) -> (usize, usize) {
        let from_space = std::mem::take(&mut self.young);
        self.young_bytes = 0;
        let mut freed = 0;
        let mut promoted = 0;

        for (i, mut rec) in from_space.into_iter().enumerate() {
            if !reached.get(i).copied().unwrap_or(false) {
                self.free_handle(rec.handle);
                freed += 1;
                continue;
            }
            rec.age = rec.age.saturating_add(1);
            let handle = rec.handle;
            if rec.age >= self.config.promotion_age {
                let slot = self.place_old(rec);
                self.handles[handle as usize].location = Location::Old(slot);
                // may hold young references that stayed behind
                self.remembered.add(handle);
                promoted += 1;
            } else {
                self.young_bytes += rec.size;
                self.handles[handle as usize].location = Location::Young(self.young.len() as u32);
                self.young.push(rec);
            }
        }
        (freed, promoted)
    }

    fn holds_young(&self, loc: Location, tracer: &mut Tracer) -> bool {
        let Some(rec) = self.record(loc) else {
            return false;
        };
        tracer.clear();
        rec.cell.trace(tracer);
        let young = |r: &HeapRef| matches!(self.resolve(*r), Some(Location::Young(_)));
        tracer.edges().iter().any(young)
            || tracer
                .ephemerons()
                .iter()
                .any(|(key, value)| young(key) || young(value))
    }

    fn prune_remembered(&mut self, tracer: &mut Tracer) {
        for holder in self.remembered.as_roots() {
            let keep = match self.location_of_index(holder) {
                Some(loc @ Location::Old(_)) => self.holds_young(loc, tracer),
                _ => false,
            };
            if !keep {
                self.remembered.remove(holder);
            }
        }
    }

    fn full(&mut self, roots: &[HeapRef]) -> (usize, usize) {
        if !self.marker.is_marking() {
            self.whiten_all();
            self.marker.begin();
        }
        // rescan roots: they may have changed since marking began
        for r in roots {
            self.grey(*r);
        }
        self.mark_some(None);
        self.settle_ephemerons();
        let marking = self.marker.end();
        if marking.increments > 0 {
            debug!(
                target: "engine::gc",
                increments = marking.increments,
                regreys = marking.barrier_regreys,
                "incremental marking finished"
            );
        }

        let reached: Vec<bool> = self
            .young
            .iter()
            .map(|rec| rec.color != MarkColor::White)
            .collect();
        let (mut freed, promoted) = self.evacuate_young(&reached);

        for slot in 0..self.old.len() {
            let dead = matches!(&self.old[slot], Some(rec) if rec.color == MarkColor::White);
            if !dead {
                continue;
            }
            if let Some(rec) = self.old[slot].take() {
                self.old_bytes -= rec.size;
                self.free_handle(rec.handle);
                self.old_free.push(slot as u32);
                freed += 1;
            }
        }

        self.whiten_all();
        self.maybe_compact();

        let mut tracer = std::mem::take(&mut self.tracer);
        self.remembered.clear();
        for slot in 0..self.old.len() {
            let loc = Location::Old(slot as u32);
            let holder = self.record(loc).map(|rec| rec.handle);
            if let Some(handle) = holder {
                if self.holds_young(loc, &mut tracer) {
                    self.remembered.add(handle);
                }
            }
        }
        self.tracer = tracer;

        let grown = (self.old_bytes as f64 * self.config.growth_factor) as usize;
        self.old_trigger = grown.max(self.config.old_trigger);
        (freed, promoted)
    }

    fn maybe_compact(&mut self) -> bool {
        let total = self.old.len();
        let free = self.old_free.len();
        if total < self.config.compaction_min_slots
            || (free as f64) / (total as f64) <= self.config.compaction_threshold
        {
            return false;
        }
        let slots = std::mem::take(&mut self.old);
        self.old = Vec::with_capacity(total - free);
        for rec in slots.into_iter().flatten() {
            self.handles[rec.handle as usize].location = Location::Old(self.old.len() as u32);
            self.old.push(Some(rec));
        }
        self.old_free.clear();
        self.stats.compactions += 1;
        debug!(
            target: "engine::gc",
            slots_before = total,
            slots_after = self.old.len(),
            "old generation compacted"
        );
        true
    }

    /// Current statistics.
    pub fn stats(&self) -> GcStats {
        GcStats {
            live_cells: self.len(),
            young_bytes: self.young_bytes,
            old_bytes: self.old_bytes,
            ..self.stats.clone()
        }
    }

    /// Dump every cell with its outgoing edges.
    pub fn snapshot(&self) -> HeapSnapshot {
        let mut cells = Vec::with_capacity(self.len());
        for (index, entry) in self.handles.iter().enumerate() {
            let (space, rec) = match entry.location {
                Location::Free => continue,
                loc @ Location::Young(_) => ("young", self.record(loc)),
                loc @ Location::Old(_) => ("old", self.record(loc)),
            };
            let Some(rec) = rec else {
                continue;
            };
            cells.push(CellSnapshot {
                id: index as u32,
                generation: entry.generation,
                kind: rec.cell.kind_name().to_string(),
                space: space.to_string(),
                size: rec.size,
                edges: edges_of(&rec.cell).iter().map(|e| e.index()).collect(),
            });
        }
        HeapSnapshot {
            cells,
            stats: self.stats(),
        }
    }
}

impl<C: Trace> std::fmt::Debug for Heap<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("young_cells", &self.young.len())
            .field("old_cells", &(self.old.len() - self.old_free.len()))
            .field("young_bytes", &self.young_bytes)
            .field("old_bytes", &self.old_bytes)
            .field("marking", &self.marker.is_marking())
            .finish()
    }
}
