//! Weak references into the host heap.
//!
//! A [`WeakHandle`] never roots its target. It reads as present while the
//! target is live and the handle has not been cleared; once either stops
//! being true it reads as absent forever.

use std::cell::Cell;

use log::trace;

use crate::err_msg;
use crate::errors::HarnessError;
use crate::heap::{Heap, Strong};
use crate::value::{ObjectId, Value};

#[derive(Debug)]
pub struct WeakHandle {
    heap: Heap,
    target: Cell<Option<ObjectId>>,
}

impl WeakHandle {
    /// Creates a weak handle to `target`.
    ///
    /// Fails with `InvalidArgument` when the target is absent, `null`,
    /// `undefined`, any other primitive, an object allocated by another heap,
    /// or an object that is no longer live.
    pub fn create(heap: &Heap, target: Option<&Value>) -> Result<Self, HarnessError> {
        let Some(target) = target else {
            return Err(err_msg!(
                InvalidArgument,
                "WeakRef requires a target object, none was given"
            ));
        };
        let Value::Object(id) = target else {
            return Err(err_msg!(
                InvalidArgument,
                "WeakRef target must be an object, got {}",
                target.type_name()
            ));
        };
        if !heap.owns(*id) {
            return Err(err_msg!(
                InvalidArgument,
                "WeakRef target {} belongs to a different heap",
                id
            ));
        }
        if !heap.is_live(*id) {
            return Err(err_msg!(
                InvalidArgument,
                "WeakRef target {} has already been collected",
                id
            ));
        }
        trace!("weak handle created for {}", id);
        Ok(Self {
            heap: heap.clone(),
            target: Cell::new(Some(*id)),
        })
    }

    /// Convenience for the common case of pointing at a rooted object.
    pub fn to(strong: &Strong) -> Self {
        Self {
            heap: strong.heap().clone(),
            target: Cell::new(Some(strong.id())),
        }
    }

    /// The target if it is still live and the handle is not cleared,
    /// `Value::Null` otherwise.
    pub fn get(&self) -> Value {
        match self.live_target() {
            Some(id) => Value::Object(id),
            None => Value::Null,
        }
    }

    /// Alias of [`WeakHandle::get`].
    #[allow(clippy::should_implement_trait)]
    pub fn deref(&self) -> Value {
        self.get()
    }

    /// Re-roots the target, if there still is one.
    pub fn upgrade(&self) -> Option<Strong> {
        let id = self.live_target()?;
        self.heap.root(id).ok()
    }

    pub fn is_alive(&self) -> bool {
        self.live_target().is_some()
    }

    /// Drops the relation to the target. Idempotent and permanent.
    pub fn clear(&self) {
        if let Some(id) = self.target.take() {
            trace!("weak handle to {} cleared", id);
        }
    }

    /// Whether the handle has been cleared, explicitly or by observing that
    /// its target was collected.
    pub fn is_cleared(&self) -> bool {
        self.target.get().is_none()
    }

    fn live_target(&self) -> Option<ObjectId> {
        let id = self.target.get()?;
        if self.heap.is_live(id) {
            return Some(id);
        }
        // Latch: a swept target never comes back.
        self.target.set(None);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::GcTrigger;

    #[test]
    fn rejects_absent_and_primitive_targets() {
        let heap = Heap::new();
        let primitives = [
            Value::Null,
            Value::Undefined,
            Value::Number(0.0),
            Value::Bool(false),
            Value::String(String::new()),
        ];
        for value in &primitives {
            let err = WeakHandle::create(&heap, Some(value)).unwrap_err();
            assert!(matches!(err, HarnessError::InvalidArgument { .. }), "{}", value);
        }
        assert!(WeakHandle::create(&heap, None).is_err());
    }

    #[test]
    fn get_returns_target_while_rooted() {
        let heap = Heap::new();
        let obj = heap.allocate();
        let weak = WeakHandle::create(&heap, Some(&obj.value())).unwrap();
        heap.collect();
        assert_eq!(weak.get(), obj.value());
        assert_eq!(weak.deref(), obj.value());
        assert!(weak.is_alive());
    }

    #[test]
    fn reads_null_after_target_is_collected() {
        let heap = Heap::new();
        let obj = heap.allocate();
        let weak = WeakHandle::to(&obj);
        drop(obj);
        heap.collect();
        assert_eq!(weak.get(), Value::Null);
        assert_eq!(weak.deref(), Value::Null);
        assert!(weak.is_cleared());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn clear_wins_over_strong_references() {
        let heap = Heap::new();
        let obj = heap.allocate();
        let weak = WeakHandle::to(&obj);
        weak.clear();
        weak.clear();
        assert!(weak.get().is_null());
        assert!(heap.is_live(obj.id()));
    }

    #[test]
    fn upgrade_keeps_target_alive() {
        let heap = Heap::new();
        let obj = heap.allocate();
        let weak = WeakHandle::to(&obj);
        let upgraded = weak.upgrade().expect("target is live");
        drop(obj);
        heap.collect();
        assert_eq!(weak.get(), upgraded.value());
        drop(upgraded);
        heap.collect();
        assert!(weak.get().is_null());
    }

    #[test]
    fn rejects_object_from_another_heap() {
        let ours = Heap::new();
        let theirs = Heap::new();
        let _local = ours.allocate();
        let foreign = theirs.allocate();
        let err = WeakHandle::create(&ours, Some(&foreign.value())).unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::InvalidArgument);
        assert!(err.to_string().contains("different heap"), "{}", err);
    }

    #[test]
    fn rejects_already_collected_object() {
        let heap = Heap::new();
        let stale = heap.allocate().value();
        heap.collect();
        let err = WeakHandle::create(&heap, Some(&stale)).unwrap_err();
        assert!(err.to_string().contains("already been collected"));
    }
}
