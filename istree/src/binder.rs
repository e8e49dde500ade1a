//! Property binder: keeps several descriptors of the same type in sync, with
//! one designated "source" (base spec §4.H).

use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::publisher::ValueCell;
use crate::rtti::Rtti;
use crate::value::Value;

struct Binding {
    descriptor: Descriptor,
    cell: ValueCell,
    is_source: bool,
}

/// Keeps an ordered list of same-typed bindings in sync. All bound
/// descriptors must share one [`Rtti`], fixed by the first binding added.
///
/// This is a UI-oriented convenience (think "these three widgets show the
/// same underlying property") rather than a persistence primitive, but it
/// reuses the descriptor/value-cell machinery end to end rather than
/// inventing its own notification mechanism.
#[derive(Default)]
pub struct PropertyBinder {
    rtti: Option<Rtti>,
    bindings: Vec<Binding>,
}

impl PropertyBinder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rtti: None,
            bindings: Vec::new(),
        }
    }

    /// Binds an existing descriptor/cell pair, returning its index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if `descriptor.rtti` doesn't match a
    /// previously bound descriptor's type.
    pub fn add(&mut self, descriptor: Descriptor, cell: ValueCell, is_source: bool) -> Result<usize> {
        self.check_rtti(descriptor.rtti)?;
        self.rtti.get_or_insert(descriptor.rtti);

        let index = self.bindings.len();
        if is_source {
            for binding in &mut self.bindings {
                binding.is_source = false;
            }
        }
        self.bindings.push(Binding {
            descriptor,
            cell,
            is_source,
        });
        Ok(index)
    }

    /// Creates a fresh descriptor/cell pair owned by the binder itself and
    /// binds it, returning its index. Useful when a binding has no
    /// independent existence outside the binder (base spec §4.H
    /// "descriptor whose lifetime is managed by the binder").
    pub fn new_binding(&mut self, name: impl Into<String>, rtti: Rtti, initial: Value) -> Result<usize> {
        self.check_rtti(rtti)?;
        let descriptor = Descriptor::new(
            name.into(),
            rtti,
            crate::descriptor::Access::ReadWrite,
            crate::descriptor::PublicationShape::Value,
        );
        let cell = std::rc::Rc::new(std::cell::RefCell::new(initial));
        self.add(descriptor, cell, false)
    }

    pub fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.bindings.len() {
            return Err(Error::custom(format!("no binding at index {index}")));
        }
        self.bindings.remove(index);
        Ok(())
    }

    /// Pushes `value` into every read-write binding's cell.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if `value`'s RTTI doesn't match this
    /// binder's type.
    pub fn change(&mut self, value: Value) -> Result<()> {
        self.check_rtti(value.rtti())?;
        for binding in &self.bindings {
            if binding.descriptor.access.can_write() {
                *binding.cell.borrow_mut() = value.clone();
            }
        }
        Ok(())
    }

    /// Reads the designated source binding and pushes its value to every
    /// other read-write binding. A no-op if no source is designated.
    pub fn update_from_source(&mut self) {
        let Some(value) = self
            .bindings
            .iter()
            .find(|b| b.is_source)
            .map(|b| b.cell.borrow().clone())
        else {
            return;
        };
        for binding in &self.bindings {
            if !binding.is_source && binding.descriptor.access.can_write() {
                *binding.cell.borrow_mut() = value.clone();
            }
        }
    }

    #[must_use]
    pub fn sources(&self) -> Vec<&Descriptor> {
        self.bindings
            .iter()
            .filter(|b| b.is_source)
            .map(|b| &b.descriptor)
            .collect()
    }

    #[must_use]
    pub fn bound(&self) -> Vec<&Descriptor> {
        self.bindings.iter().map(|b| &b.descriptor).collect()
    }

    fn check_rtti(&self, rtti: Rtti) -> Result<()> {
        match self.rtti {
            Some(existing) if existing != rtti => Err(Error::InvalidValue(rtti)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Access, PublicationShape};
    use crate::rtti::Kind;
    use crate::value::PropertyValue;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn cell(initial: i32) -> ValueCell {
        Rc::new(RefCell::new(initial.into_value()))
    }

    fn descriptor(name: &str) -> Descriptor {
        Descriptor::new(
            name.to_owned(),
            Rtti::scalar(Kind::Int),
            Access::ReadWrite,
            PublicationShape::Value,
        )
    }

    #[test]
    fn update_from_source_pushes_to_every_other_binding() {
        let mut binder = PropertyBinder::new();
        let source_cell = cell(1);
        let a_cell = cell(0);
        let b_cell = cell(0);
        binder.add(descriptor("source"), source_cell.clone(), true).unwrap();
        binder.add(descriptor("a"), a_cell.clone(), false).unwrap();
        binder.add(descriptor("b"), b_cell.clone(), false).unwrap();

        *source_cell.borrow_mut() = 42i32.into_value();
        binder.update_from_source();

        assert_eq!(*a_cell.borrow(), 42i32.into_value());
        assert_eq!(*b_cell.borrow(), 42i32.into_value());
    }

    #[test]
    fn change_pushes_to_every_read_write_binding() {
        let mut binder = PropertyBinder::new();
        let a_cell = cell(0);
        let b_cell = cell(0);
        binder.add(descriptor("a"), a_cell.clone(), false).unwrap();
        binder.add(descriptor("b"), b_cell.clone(), false).unwrap();

        binder.change(7i32.into_value()).unwrap();

        assert_eq!(*a_cell.borrow(), 7i32.into_value());
        assert_eq!(*b_cell.borrow(), 7i32.into_value());
    }

    #[test]
    fn rtti_mismatch_is_rejected() {
        let mut binder = PropertyBinder::new();
        binder.add(descriptor("a"), cell(0), false).unwrap();

        let wrong = Descriptor::new(
            "b".to_owned(),
            Rtti::scalar(Kind::Float),
            Access::ReadWrite,
            PublicationShape::Value,
        );
        assert!(binder.add(wrong, Rc::new(RefCell::new(1.0f32.into_value())), false).is_err());
    }

    #[test]
    fn new_binding_is_owned_by_the_binder() {
        let mut binder = PropertyBinder::new();
        let index = binder
            .new_binding("count", Rtti::scalar(Kind::Int), 0i32.into_value())
            .unwrap();
        binder.change(5i32.into_value()).unwrap();
        assert_eq!(binder.bound()[index].name, "count");
    }

    #[test]
    fn remove_drops_a_binding() {
        let mut binder = PropertyBinder::new();
        binder.add(descriptor("a"), cell(0), false).unwrap();
        binder.add(descriptor("b"), cell(0), false).unwrap();
        binder.remove(0).unwrap();
        assert_eq!(binder.bound().len(), 1);
        assert_eq!(binder.bound()[0].name, "b");
    }
}
