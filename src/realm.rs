//! Host realm: the shared heap plus the globals a test body can look up.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::errors::HarnessError;
use crate::heap::{CollectionStats, GcTrigger, Heap, Strong};
use crate::value::Value;
use crate::weak::WeakHandle;

/// Name under which the weak reference constructor is installed.
pub const WEAK_REF: &str = "WeakRef";

/// A heap together with its rooted global bindings. Cloning shares both.
#[derive(Debug, Clone)]
pub struct Realm {
    heap: Heap,
    globals: Rc<RefCell<BTreeMap<String, Strong>>>,
}

impl Realm {
    /// A fresh heap with the built-in constructors installed.
    pub fn new() -> Self {
        Self::with_heap(Heap::new())
    }

    pub fn with_heap(heap: Heap) -> Self {
        let mut globals = BTreeMap::new();
        globals.insert(WEAK_REF.to_string(), heap.allocate());
        Self {
            heap,
            globals: Rc::new(RefCell::new(globals)),
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Looks up a global binding. Unknown names read as `undefined`.
    pub fn global(&self, name: &str) -> Value {
        self.globals
            .borrow()
            .get(name)
            .map(Strong::value)
            .unwrap_or(Value::Undefined)
    }

    /// Binds `name` to `value`'s object, rooting it for the realm's lifetime.
    /// Primitives cannot be bound. Visible through every clone of the realm.
    pub fn define_global(&self, name: &str, value: &Value) -> Result<(), HarnessError> {
        let Some(id) = value.as_object() else {
            return Err(crate::err_msg!(
                InvalidArgument,
                "global '{}' must be bound to an object, got {}",
                name,
                value.type_name()
            ));
        };
        let root = self.heap.root(id)?;
        self.globals.borrow_mut().insert(name.to_string(), root);
        Ok(())
    }

    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().keys().cloned().collect()
    }

    /// The host spelling of `new WeakRef(...args)`: only the first argument
    /// is considered, and calling with none is an error.
    pub fn construct_weak_ref(&self, args: &[Value]) -> Result<WeakHandle, HarnessError> {
        WeakHandle::create(&self.heap, args.first())
    }

    /// The host `gc()` hook.
    pub fn gc(&self) -> CollectionStats {
        self.heap.collect()
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_ref_constructor_is_installed_and_survives_gc() {
        let realm = Realm::new();
        let ctor = realm.global(WEAK_REF);
        assert!(ctor.is_referenceable());
        realm.gc();
        assert!(realm.heap().is_live(ctor.as_object().unwrap()));
        assert_eq!(realm.global("Missing"), Value::Undefined);
    }

    #[test]
    fn construct_weak_ref_uses_first_argument() {
        let realm = Realm::new();
        let obj = realm.heap().allocate();
        let weak = realm
            .construct_weak_ref(&[obj.value(), Value::Number(1.0)])
            .unwrap();
        assert_eq!(weak.get(), obj.value());
        assert!(realm.construct_weak_ref(&[]).is_err());
    }

    #[test]
    fn defined_globals_are_rooted() {
        let realm = Realm::new();
        let obj = realm.heap().allocate();
        let id = obj.id();
        realm.define_global("keep", &obj.value()).unwrap();
        drop(obj);
        realm.gc();
        assert!(realm.heap().is_live(id));
        assert!(realm.define_global("n", &Value::Number(3.0)).is_err());
        assert_eq!(realm.global_names(), vec!["WeakRef", "keep"]);
    }

    #[test]
    fn clones_share_globals() {
        let realm = Realm::new();
        let per_case = realm.clone();
        let obj = per_case.heap().allocate();
        per_case.define_global("shared", &obj.value()).unwrap();
        assert_eq!(realm.global("shared"), obj.value());
        assert!(per_case.heap().ptr_eq(realm.heap()));
    }
}
