//! Process-wide (or, here, explicit-context) mapping of `(type-name, id)` to
//! an opaque pointer, used to serialize fat pointers and cross-object
//! references as symbolic identifiers.
//!
//! The base spec describes this as a singleton; the Design Notes (§9)
//! explicitly allow modelling it as "an explicit context passed through
//! calls" instead of a true global, and that is what this type is: an
//! ordinary value the caller constructs, populates, and hands to a
//! [`Serializer`](crate::serializer::Serializer) (see `DESIGN.md`).

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};

/// The reserved type name for delegate fat pointers.
pub const GENERIC_DELEGATE: &str = "GenericDelegate";
/// The reserved type name for function-pointer fat pointers.
pub const GENERIC_FUNCTION: &str = "GenericFunction";

#[derive(Default)]
struct TypeEntries {
    by_id: HashMap<String, Rc<dyn Any>>,
    /// `Rc::as_ptr(...).cast::<()>() as usize` -> id. A plain integer key,
    /// never dereferenced; see the `Any`'s own `by_id` map for the live
    /// handle.
    by_ptr: HashMap<usize, String>,
    next_entry: u64,
}

fn ptr_key<T: ?Sized>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc).cast::<()>() as usize
}

/// A `(type-name, id) -> opaque pointer` map, usable in both directions.
///
/// Identity of "a type" is its fully qualified name as a string (base spec
/// §4.B); identity of "a pointer" is reference-counted object identity
/// (`Rc::ptr_eq`), recovered here by keying on the `Rc`'s address.
#[derive(Default)]
pub struct ReferenceRegistry {
    by_type: HashMap<String, TypeEntries>,
}

impl ReferenceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `ptr` under `id` for `type_name`.
    ///
    /// Returns `Ok(())` if the pair is newly registered or already mapped
    /// identically. Fails with [`Error::RegistryConflict`] if `id` is
    /// already bound to a different pointer, and with
    /// [`Error::EmptyReferenceId`] for an empty id.
    pub fn store<T: Any>(&mut self, type_name: &str, ptr: Rc<T>, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::EmptyReferenceId);
        }

        let key = ptr_key(&ptr);
        let entries = self.by_type.entry(type_name.to_owned()).or_default();

        if let Some(existing) = entries.by_id.get(id) {
            if ptr_key(existing) == key {
                return Ok(());
            }
            return Err(Error::RegistryConflict(id.to_owned()));
        }

        entries.by_id.insert(id.to_owned(), ptr);
        entries.by_ptr.insert(key, id.to_owned());
        Ok(())
    }

    /// Removes whatever is registered for `type_name` under `id`, if any.
    pub fn remove_by_id(&mut self, type_name: &str, id: &str) {
        if let Some(entries) = self.by_type.get_mut(type_name) {
            if let Some(ptr) = entries.by_id.remove(id) {
                entries.by_ptr.remove(&ptr_key(&ptr));
            }
        }
    }

    /// Removes whatever `ptr` is registered under for `type_name`, if any.
    pub fn remove_by_ptr<T: Any>(&mut self, type_name: &str, ptr: &Rc<T>) {
        if let Some(entries) = self.by_type.get_mut(type_name) {
            let key = ptr_key(ptr);
            if let Some(id) = entries.by_ptr.remove(&key) {
                entries.by_id.remove(&id);
            }
        }
    }

    /// Looks up the pointer registered under `id` for `type_name`, if any,
    /// downcast to `T`.
    #[must_use]
    pub fn lookup_by_id<T: Any>(&self, type_name: &str, id: &str) -> Option<Rc<T>> {
        self.lookup_by_id_any(type_name, id)
            .and_then(|any| any.downcast::<T>().ok())
    }

    /// Type-erased variant of [`Self::lookup_by_id`], used by generated
    /// [`Publisher`](crate::publisher::Publisher) code that only knows the
    /// concrete type at the call site, not inside the engine.
    #[must_use]
    pub fn lookup_by_id_any(&self, type_name: &str, id: &str) -> Option<Rc<dyn Any>> {
        self.by_type.get(type_name)?.by_id.get(id).cloned()
    }

    /// Looks up the id `ptr` is registered under for `type_name`, empty if
    /// not stored.
    #[must_use]
    pub fn lookup_by_ptr<T: Any>(&self, type_name: &str, ptr: &Rc<T>) -> Option<&str> {
        let key = ptr_key(ptr);
        self.by_type
            .get(type_name)?
            .by_ptr
            .get(&key)
            .map(String::as_str)
    }

    /// If `ptr` already has an id registered, returns it; otherwise returns
    /// the first unused string of the form `entry_<N>`, starting at
    /// `entry_1`, without registering it.
    #[must_use]
    pub fn propose_id<T: Any>(&mut self, type_name: &str, ptr: &Rc<T>) -> String {
        if let Some(id) = self.lookup_by_ptr(type_name, ptr) {
            return id.to_owned();
        }

        let entries = self.by_type.entry(type_name.to_owned()).or_default();
        loop {
            entries.next_entry += 1;
            let candidate = format!("entry_{}", entries.next_entry);
            if !entries.by_id.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// True if `type_name`/`id` is currently registered.
    #[must_use]
    pub fn contains(&self, type_name: &str, id: &str) -> bool {
        self.by_type
            .get(type_name)
            .is_some_and(|e| e.by_id.contains_key(id))
    }

    /// Clears every registered type and id.
    pub fn reset(&mut self) {
        self.by_type.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_lookup_round_trip() {
        let mut reg = ReferenceRegistry::new();
        let ptr = Rc::new(42i32);
        reg.store("Widget", ptr.clone(), "widget_1").unwrap();

        assert_eq!(reg.lookup_by_id::<i32>("Widget", "widget_1"), Some(ptr.clone()));
        assert_eq!(reg.lookup_by_ptr("Widget", &ptr), Some("widget_1"));
    }

    #[test]
    fn conflicting_store_fails_without_overwrite() {
        let mut reg = ReferenceRegistry::new();
        let p1 = Rc::new(1i32);
        let p2 = Rc::new(2i32);

        reg.store("Widget", p1.clone(), "id").unwrap();
        let err = reg.store("Widget", p2, "id").unwrap_err();
        assert!(matches!(err, Error::RegistryConflict(id) if id == "id"));

        assert_eq!(reg.lookup_by_id::<i32>("Widget", "id"), Some(p1));
    }

    #[test]
    fn identical_restore_is_not_a_conflict() {
        let mut reg = ReferenceRegistry::new();
        let p1 = Rc::new(1i32);

        reg.store("Widget", p1.clone(), "id").unwrap();
        reg.store("Widget", p1, "id").unwrap();
    }

    #[test]
    fn empty_id_fails() {
        let mut reg = ReferenceRegistry::new();
        let err = reg.store("Widget", Rc::new(1i32), "").unwrap_err();
        assert!(matches!(err, Error::EmptyReferenceId));
    }

    #[test]
    fn propose_id_reuses_existing_then_fills_gaps() {
        let mut reg = ReferenceRegistry::new();
        let p1 = Rc::new(1i32);

        assert_eq!(reg.propose_id("Widget", &p1), "entry_1");
        reg.store("Widget", p1.clone(), "entry_1").unwrap();
        assert_eq!(reg.propose_id("Widget", &p1), "entry_1");

        let p2 = Rc::new(2i32);
        assert_eq!(reg.propose_id("Widget", &p2), "entry_2");
    }

    #[test]
    fn remove_by_id_clears_both_directions() {
        let mut reg = ReferenceRegistry::new();
        let ptr = Rc::new(1i32);
        reg.store("Widget", ptr.clone(), "id").unwrap();

        reg.remove_by_id("Widget", "id");
        assert!(!reg.contains("Widget", "id"));
        assert_eq!(reg.lookup_by_ptr("Widget", &ptr), None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut reg = ReferenceRegistry::new();
        reg.store("Widget", Rc::new(1i32), "id").unwrap();
        reg.reset();
        assert!(!reg.contains("Widget", "id"));
    }
}
