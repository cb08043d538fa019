//! Deterministic host heap and the collection hook.
//!
//! The heap is the only shared resource the harness has. Objects are kept
//! alive by [`Strong`] roots (owned guards, counted per object) and by edges
//! from other live objects. [`GcTrigger::collect`] runs a synchronous
//! mark-sweep pass; when it returns, every object unreachable from a root is
//! gone and any weak handle pointing at it observes absence.
//!
//! Everything here is single-threaded: the heap lives behind
//! `Rc<RefCell<..>>` and is deliberately not `Send`.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace};
use serde::Serialize;

use crate::errors::HarnessError;
use crate::value::{ObjectId, Value};

/// Source of per-heap tags; every heap gets a distinct one.
static NEXT_HEAP_TAG: AtomicU64 = AtomicU64::new(1);

/// Callback run once, after the sweep, for an object that was reclaimed.
pub type Finalizer = Box<dyn FnOnce(ObjectId)>;

// ============================================================================
// COLLECTION HOOK
// ============================================================================

/// Abstraction over "force a garbage collection cycle now".
///
/// Implementations must be synchronous: after `collect` returns, objects with
/// no path from a root are reclaimed.
pub trait GcTrigger {
    fn collect(&self) -> CollectionStats;
}

/// Statistics from a single collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub marked: usize,
    pub swept: usize,
    pub finalized: usize,
}

// ============================================================================
// HEAP STATE
// ============================================================================

#[derive(Debug, Default)]
struct HeapObject {
    /// Outgoing strong edges. `BTreeSet` keeps marking order deterministic.
    references: BTreeSet<ObjectId>,
    /// Number of live [`Strong`] guards for this object.
    roots: usize,
}

#[derive(Default)]
struct HeapState {
    tag: u64,
    objects: BTreeMap<ObjectId, HeapObject>,
    finalizers: BTreeMap<ObjectId, Finalizer>,
    next_id: u64,
    collection_count: u64,
    total_swept: u64,
}

impl HeapState {
    fn object_mut(&mut self, id: ObjectId) -> Result<&mut HeapObject, HarnessError> {
        self.objects
            .get_mut(&id)
            .ok_or(HarnessError::Heap { object: id })
    }

    /// Marks from every rooted object, sweeps the rest and hands back the
    /// finalizers of swept objects so they can run without the state borrowed.
    fn mark_sweep(&mut self) -> (CollectionStats, Vec<(ObjectId, Finalizer)>) {
        let mut marked: BTreeSet<ObjectId> = BTreeSet::new();
        let mut work_stack: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, obj)| obj.roots > 0)
            .map(|(id, _)| *id)
            .collect();

        while let Some(id) = work_stack.pop() {
            if !marked.insert(id) {
                continue;
            }
            // Dangling edges are ignored.
            if let Some(obj) = self.objects.get(&id) {
                work_stack.extend(obj.references.iter().filter(|r| !marked.contains(*r)));
            }
        }

        let doomed: Vec<ObjectId> = self
            .objects
            .keys()
            .filter(|id| !marked.contains(*id))
            .copied()
            .collect();

        let mut pending = Vec::new();
        for id in &doomed {
            self.objects.remove(id);
            trace!("swept {}", id);
            if let Some(finalizer) = self.finalizers.remove(id) {
                pending.push((*id, finalizer));
            }
        }

        self.collection_count += 1;
        self.total_swept += doomed.len() as u64;

        let stats = CollectionStats {
            marked: marked.len(),
            swept: doomed.len(),
            finalized: pending.len(),
        };
        (stats, pending)
    }
}

// ============================================================================
// HEAP
// ============================================================================

/// Shared handle to the host heap. Cloning shares the same heap.
#[derive(Clone)]
pub struct Heap {
    state: Rc<RefCell<HeapState>>,
}

impl Heap {
    pub fn new() -> Self {
        let state = HeapState {
            tag: NEXT_HEAP_TAG.fetch_add(1, Ordering::Relaxed),
            ..HeapState::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Tag stamped into every id this heap allocates.
    pub fn tag(&self) -> u64 {
        self.state.borrow().tag
    }

    /// True when `id` was allocated by this heap, live or not.
    pub fn owns(&self, id: ObjectId) -> bool {
        id.heap == self.tag()
    }

    /// Allocates a new object rooted by the returned guard.
    pub fn allocate(&self) -> Strong {
        let mut state = self.state.borrow_mut();
        let id = ObjectId {
            heap: state.tag,
            index: state.next_id,
        };
        state.next_id += 1;
        state.objects.insert(
            id,
            HeapObject {
                references: BTreeSet::new(),
                roots: 1,
            },
        );
        trace!("allocated {}", id);
        Strong {
            heap: self.clone(),
            id,
        }
    }

    /// Takes a new root on a live object.
    pub fn root(&self, id: ObjectId) -> Result<Strong, HarnessError> {
        self.state.borrow_mut().object_mut(id)?.roots += 1;
        Ok(Strong {
            heap: self.clone(),
            id,
        })
    }

    /// Adds a strong edge `from -> to`. Both objects must be live.
    pub fn add_reference(&self, from: ObjectId, to: ObjectId) -> Result<(), HarnessError> {
        let mut state = self.state.borrow_mut();
        if !state.objects.contains_key(&to) {
            return Err(HarnessError::Heap { object: to });
        }
        state.object_mut(from)?.references.insert(to);
        Ok(())
    }

    /// Removes a strong edge. Removing an edge that does not exist is a no-op.
    pub fn remove_reference(&self, from: ObjectId, to: ObjectId) -> Result<(), HarnessError> {
        self.state
            .borrow_mut()
            .object_mut(from)?
            .references
            .remove(&to);
        Ok(())
    }

    /// Registers a callback to run when `id` is reclaimed. Replaces any
    /// previous finalizer for the same object.
    pub fn set_finalizer<F>(&self, id: ObjectId, finalizer: F) -> Result<(), HarnessError>
    where
        F: FnOnce(ObjectId) + 'static,
    {
        let mut state = self.state.borrow_mut();
        if !state.objects.contains_key(&id) {
            return Err(HarnessError::Heap { object: id });
        }
        let previous = state.finalizers.insert(id, Box::new(finalizer));
        // The replaced closure may own roots; drop it once the state is released.
        drop(state);
        drop(previous);
        Ok(())
    }

    pub fn is_live(&self, id: ObjectId) -> bool {
        self.state.borrow().objects.contains_key(&id)
    }

    /// Number of strong roots held on `id`, or `None` once it is reclaimed.
    pub fn root_count(&self, id: ObjectId) -> Option<usize> {
        self.state.borrow().objects.get(&id).map(|obj| obj.roots)
    }

    pub fn object_count(&self) -> usize {
        self.state.borrow().objects.len()
    }

    pub fn collection_count(&self) -> u64 {
        self.state.borrow().collection_count
    }

    pub fn total_swept(&self) -> u64 {
        self.state.borrow().total_swept
    }

    /// True when both handles share the same underlying heap.
    pub fn ptr_eq(&self, other: &Heap) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    fn release_root(&self, id: ObjectId) {
        let mut state = self.state.borrow_mut();
        if let Some(obj) = state.objects.get_mut(&id) {
            obj.roots = obj.roots.saturating_sub(1);
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl GcTrigger for Heap {
    /// Every pending finalizer runs even if an earlier one panics; the first
    /// panic is re-raised once they have all run.
    fn collect(&self) -> CollectionStats {
        let (stats, pending) = self.state.borrow_mut().mark_sweep();
        // Finalizers may allocate or drop roots, so the borrow is released first.
        let mut first_panic = None;
        for (id, finalizer) in pending {
            debug!("running finalizer for {}", id);
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| finalizer(id))) {
                debug!("finalizer for {} panicked", id);
                first_panic.get_or_insert(payload);
            }
        }
        debug!(
            "gc cycle {}: marked {}, swept {}, finalized {}",
            self.collection_count(),
            stats.marked,
            stats.swept,
            stats.finalized
        );
        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
        stats
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Heap")
            .field("tag", &state.tag)
            .field("objects", &state.objects.len())
            .field("finalizers", &state.finalizers.len())
            .field("collection_count", &state.collection_count)
            .finish()
    }
}

// ============================================================================
// STRONG ROOTS
// ============================================================================

/// An owned strong reference. While any `Strong` for an object exists, the
/// object survives collection. Dropping the last one is the Rust spelling of
/// `obj = null`.
pub struct Strong {
    heap: Heap,
    id: ObjectId,
}

impl Strong {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn value(&self) -> Value {
        Value::Object(self.id)
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }
}

impl Clone for Strong {
    fn clone(&self) -> Self {
        if let Some(obj) = self.heap.state.borrow_mut().objects.get_mut(&self.id) {
            obj.roots += 1;
        }
        Self {
            heap: self.heap.clone(),
            id: self.id,
        }
    }
}

impl Drop for Strong {
    fn drop(&mut self) {
        self.heap.release_root(self.id);
    }
}

impl fmt::Debug for Strong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Strong").field(&self.id).finish()
    }
}
