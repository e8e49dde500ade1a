//! Typed reference fields: the safe, compile-time stand-in for the runtime
//! declarator-pointer comparison the base spec's source language used to
//! tell an owned sub-object apart from a shared one.
//!
//! A field of a type implementing [`Publisher`](crate::publisher::Publisher)
//! (by value or `Box`) is always owned and inlined. A field of type
//! [`Ref<T>`] is always a reference: only its registry id is serialized, and
//! loading it means resolving that id through a
//! [`ReferenceRegistry`](crate::registry::ReferenceRegistry) rather than
//! recursing into the IST.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// A possibly-null, possibly-unresolved reference to an externally-owned
/// `T`.
#[derive(Debug, Clone)]
pub struct Ref<T: ?Sized> {
    id: Option<String>,
    target: Option<Rc<RefCell<T>>>,
}

impl<T> Ref<T> {
    /// A null reference with no id.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            id: None,
            target: None,
        }
    }

    /// A reference carrying only an id, not yet resolved to a live object.
    #[must_use]
    pub fn unresolved(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            target: None,
        }
    }

    /// A reference to a live, already-registered object.
    #[must_use]
    pub fn bound(target: Rc<RefCell<T>>, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            target: Some(target),
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn get(&self) -> Option<Rc<RefCell<T>>> {
        self.target.clone()
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.target.is_none() && self.id.is_none()
    }

    /// Binds this reference to a live target and its id, replacing whatever
    /// was there before.
    pub fn bind(&mut self, target: Rc<RefCell<T>>, id: impl Into<String>) {
        self.id = Some(id.into());
        self.target = Some(target);
    }
}

impl<T> Default for Ref<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.target, &other.target) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => self.id == other.id,
            _ => false,
        }
    }
}

/// Type-erased view of a [`Ref<T>`] field, used by generated
/// [`Publisher`](crate::publisher::Publisher) code so the engine can resolve
/// a reference field without knowing `T` itself.
pub trait RefSlot {
    /// Fully qualified type name used as the registry key for this slot.
    fn type_name(&self) -> &'static str;

    /// The id currently carried by this reference, if any.
    fn current_id(&self) -> Option<&str>;

    /// Whether this slot already resolves to a live object.
    fn is_bound(&self) -> bool;

    /// Attempts to bind this slot to a registry entry. Returns `false` if
    /// `any`'s concrete type does not match the slot's `T`.
    fn bind_any(&mut self, any: Rc<dyn Any>, id: String) -> bool;
}

impl<T: Any> RefSlot for Ref<T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn current_id(&self) -> Option<&str> {
        self.id()
    }

    fn is_bound(&self) -> bool {
        self.target.is_some()
    }

    fn bind_any(&mut self, any: Rc<dyn Any>, id: String) -> bool {
        match any.downcast::<RefCell<T>>() {
            Ok(target) => {
                self.bind(target, id);
                true
            },
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_ref_has_no_id_and_no_target() {
        let r: Ref<i32> = Ref::null();
        assert!(r.is_null());
        assert_eq!(r.id(), None);
        assert_eq!(r.get(), None);
    }

    #[test]
    fn bind_any_rejects_wrong_type() {
        let mut r: Ref<i32> = Ref::null();
        let wrong: Rc<dyn Any> = Rc::new(RefCell::new("not an i32".to_owned()));
        assert!(!RefSlot::bind_any(&mut r, wrong, "id".to_owned()));
        assert!(!r.is_bound());
    }

    #[test]
    fn bind_any_accepts_matching_type() {
        let mut r: Ref<i32> = Ref::null();
        let target: Rc<RefCell<i32>> = Rc::new(RefCell::new(5));
        let any: Rc<dyn Any> = target.clone();
        assert!(RefSlot::bind_any(&mut r, any, "id".to_owned()));
        assert!(r.is_bound());
        assert!(Rc::ptr_eq(&r.get().unwrap(), &target));
    }
}
