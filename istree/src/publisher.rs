//! The publisher layer: per-object collection of descriptors, recursive
//! descent over composite publishers, ownership tracking.

use std::cell::RefCell;
use std::rc::Rc;

use crate::declarator::DeclaratorId;
use crate::descriptor::{Access, Descriptor, PublicationShape};
use crate::error::{Error, Result};
use crate::node::SerNodeInfo;
use crate::reference::RefSlot;
use crate::rtti::Rtti;
use crate::value::{PropertyValue, Value};

/// A read-only view of an object-kind publication's current value.
pub enum ObjectView<'a> {
    /// An owned, inlined sub-object: recurse into it.
    Owned(&'a dyn Publisher),
    /// A reference to an externally-owned object, serialized by id alone.
    /// `id` is `None` when the reference is currently null.
    Reference {
        class_name: &'a str,
        id: Option<&'a str>,
    },
}

/// A mutable handle to an object-kind publication, used while loading.
pub enum ObjectSlotMut<'a> {
    Owned(&'a mut dyn Publisher),
    Reference(&'a mut dyn RefSlot),
}

/// Any object exposing a list of descriptors and an owner back-reference
/// (base spec §3 "Publisher").
///
/// Reading (`read_value`/`read_object`) is addressed by publication index,
/// matching store-time preorder iteration. Writing (`write_value`/
/// `object_mut`) is addressed by name, matching how `ist_to_publisher` looks
/// up a target publication for each IST node it visits; this also avoids
/// needing simultaneous mutable borrows of more than one field at a time.
pub trait Publisher {
    /// The target type's name, used as the value of object-kind nodes and
    /// as the registry type key for reference fields declared on it.
    fn class_name(&self) -> &str;

    /// A stable identity for this publisher instance.
    fn identity(&self) -> DeclaratorId;

    /// The owner that instantiated this publisher. Defaults to this
    /// publisher's own identity until a containing publisher claims it
    /// (base spec §4.D: "RAII: if it's initialized, it's mine").
    fn declarator(&self) -> DeclaratorId;

    /// Claims ownership of this publisher on behalf of a containing
    /// publisher.
    fn set_declarator(&mut self, id: DeclaratorId);

    /// Metadata for every publication, in publication order. Names must be
    /// unique within one publisher (base spec §3).
    fn publications(&self) -> Vec<Descriptor>;

    #[must_use]
    fn publication_count(&self) -> usize {
        self.publications().len()
    }

    #[must_use]
    fn publication_at(&self, index: usize) -> Option<Descriptor> {
        self.publications().into_iter().nth(index)
    }

    #[must_use]
    fn publication_by_name(&self, name: &str) -> Option<Descriptor> {
        self.publications().into_iter().find(|d| d.name == name)
    }

    #[must_use]
    fn publication_type(&self, index: usize) -> Option<Rtti> {
        self.publication_at(index).map(|d| d.rtti)
    }

    /// Reads the current value of the `index`th publication. Only called
    /// for `PublicationShape::Value`/`Stream`/`FatPointer` descriptors.
    fn read_value(&self, index: usize) -> Option<Value>;

    /// Reads the current value of the `index`th publication. Only called
    /// for `PublicationShape::Object` descriptors.
    fn read_object(&self, index: usize) -> Option<ObjectView<'_>>;

    /// Writes `value` into the publication named `name`. Returns `Ok(false)`
    /// if there is no such publication (the caller treats this as an
    /// "unknown property" per base spec §7).
    fn write_value(&mut self, name: &str, value: Value) -> Result<bool>;

    /// Gets mutable access to the object-kind publication named `name`.
    fn object_mut(&mut self, name: &str) -> Option<ObjectSlotMut<'_>>;
}

impl dyn Publisher + '_ {
    /// `parent_publisher.declarator() == self.identity()`, i.e. whether
    /// `parent_publisher` is the one that claimed ownership of `self`
    /// (base spec §3 "Ownership"). Only meaningful for nested publishers;
    /// the root of a store is always treated as owned regardless.
    #[must_use]
    pub fn is_owned_by(&self, parent: &dyn Publisher) -> bool {
        self.declarator().is(&parent.identity())
    }
}

/// What a target lacked when the engine tried to restore a node into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WantReason {
    /// No publication with this name exists on the target.
    UnknownProperty,
    /// A publication exists but its RTTI didn't match the node's.
    RttiMismatch,
}

/// Outcome of the `on_want_object` callback for a null/unresolved reference
/// slot.
pub enum WantObjectOutcome {
    /// Resolve the slot by looking up this id in the registry.
    ResolveReference(String),
    /// The callback already bound the slot itself; do nothing further.
    Handled,
    /// Leave the slot as-is.
    Skip,
}

/// Fired when a target publisher lacks a publication matching `node.name`.
pub type WantDescriptorCallback<'cb> =
    dyn FnMut(&SerNodeInfo, WantReason) -> Option<Descriptor> + 'cb;

/// Fired when a target reference slot is null/unresolved during load. The
/// callback may bind the slot itself (and return `Handled`), hand back a
/// different id to resolve (`ResolveReference`), or decline (`Skip`).
pub type WantObjectCallback<'cb> =
    dyn FnMut(&SerNodeInfo, &mut dyn RefSlot) -> WantObjectOutcome + 'cb;

/// A value cell backing one field of a [`DynPublisher`], or a field bound
/// into a [`PropertyBinder`](crate::binder::PropertyBinder).
pub type ValueCell = Rc<RefCell<Value>>;

struct DynField {
    descriptor: Descriptor,
    cell: ValueCell,
}

/// An ad-hoc publisher assembled at runtime rather than generated by
/// `#[derive(Publish)]` (base spec §4.D: "or when a user assembles an
/// ad-hoc group").
///
/// Every field is a plain value (`PublicationShape::Value`); object-kind
/// and fat-pointer fields are not supported here since they need static
/// typing the derive macro provides. This is primarily useful for tests and
/// for backing a [`PropertyBinder`](crate::binder::PropertyBinder).
pub struct DynPublisher {
    class_name: String,
    identity: DeclaratorId,
    declarator: RefCell<DeclaratorId>,
    fields: Vec<DynField>,
}

impl DynPublisher {
    #[must_use]
    pub fn new(class_name: impl Into<String>) -> Self {
        let identity = DeclaratorId::new();
        Self {
            class_name: class_name.into(),
            declarator: RefCell::new(identity.clone()),
            identity,
            fields: Vec::new(),
        }
    }

    /// Declares a new read-write value publication, returning the backing
    /// cell so the caller (or a [`PropertyBinder`](crate::binder::PropertyBinder))
    /// can read and write it directly.
    pub fn declare<T: PropertyValue>(&mut self, name: impl Into<String>, initial: T) -> ValueCell {
        let name = name.into();
        let cell = Rc::new(RefCell::new(initial.into_value()));
        let descriptor = Descriptor::new(
            name,
            T::RTTI,
            Access::ReadWrite,
            PublicationShape::Value,
        );
        self.fields.push(DynField {
            descriptor,
            cell: cell.clone(),
        });
        cell
    }

    #[must_use]
    pub fn cell(&self, name: &str) -> Option<ValueCell> {
        self.fields
            .iter()
            .find(|f| f.descriptor.name == name)
            .map(|f| f.cell.clone())
    }
}

impl Publisher for DynPublisher {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn identity(&self) -> DeclaratorId {
        self.identity.clone()
    }

    fn declarator(&self) -> DeclaratorId {
        self.declarator.borrow().clone()
    }

    fn set_declarator(&mut self, id: DeclaratorId) {
        *self.declarator.borrow_mut() = id;
    }

    fn publications(&self) -> Vec<Descriptor> {
        self.fields.iter().map(|f| f.descriptor.clone()).collect()
    }

    fn read_value(&self, index: usize) -> Option<Value> {
        self.fields.get(index).map(|f| f.cell.borrow().clone())
    }

    fn read_object(&self, _index: usize) -> Option<ObjectView<'_>> {
        None
    }

    fn write_value(&mut self, name: &str, value: Value) -> Result<bool> {
        let Some(field) = self.fields.iter().find(|f| f.descriptor.name == name) else {
            return Ok(false);
        };

        if value.rtti() != field.descriptor.rtti {
            return Err(Error::InvalidValue(value.rtti()));
        }

        *field.cell.borrow_mut() = value;
        Ok(true)
    }

    fn object_mut(&mut self, _name: &str) -> Option<ObjectSlotMut<'_>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dyn_publisher_round_trips_a_value() {
        let mut pub_ = DynPublisher::new("Widget");
        pub_.declare("count", 7i32);

        assert_eq!(pub_.publication_count(), 1);
        assert_eq!(pub_.read_value(0), Some(7i32.into_value()));

        pub_.write_value("count", 9i32.into_value()).unwrap();
        assert_eq!(pub_.read_value(0), Some(9i32.into_value()));
    }

    #[test]
    fn unknown_publication_name_is_reported() {
        let mut pub_ = DynPublisher::new("Widget");
        assert!(!pub_.write_value("missing", 1i32.into_value()).unwrap());
    }

    #[test]
    fn ownership_compares_declarator_against_parent_identity() {
        let parent = DynPublisher::new("Parent");
        let mut child = DynPublisher::new("Child");

        assert!(!(&child as &dyn Publisher).is_owned_by(&parent));

        child.set_declarator(parent.identity());
        assert!((&child as &dyn Publisher).is_owned_by(&parent));
    }
}
