//! Borrow-scoped access to earlier-registered systems.

use std::any::{TypeId, type_name};

use orrery_core::alloc::HashMap;

use crate::error::{RegistryError, RegistryResult, Requester};
use crate::storage::{SystemEntry, SystemIndex};
use crate::system::System;

/// Lookup handle passed to every [`System`] callback.
///
/// It only reaches systems registered strictly before the caller. Anything
/// else, including the caller itself, is reported as
/// [`RegistryError::NotFound`]. References it hands out live no longer than
/// the callback.
pub struct Locator<'a> {
    earlier: &'a mut [SystemEntry],
    lookup: &'a HashMap<TypeId, SystemIndex>,
    caller: &'static str,
    caller_index: SystemIndex,
}

impl<'a> Locator<'a> {
    pub(crate) fn new(
        earlier: &'a mut [SystemEntry],
        lookup: &'a HashMap<TypeId, SystemIndex>,
        caller: &'static str,
        caller_index: SystemIndex,
    ) -> Self {
        debug_assert_eq!(earlier.len(), caller_index.get());
        Self {
            earlier,
            lookup,
            caller,
            caller_index,
        }
    }

    /// Name of the system this locator was handed to.
    #[inline]
    pub fn caller(&self) -> &'static str {
        self.caller
    }

    #[inline]
    pub fn caller_index(&self) -> SystemIndex {
        self.caller_index
    }

    /// Borrow the earlier-registered system `T`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if `T` was never registered, is the
    /// caller, or was registered after the caller.
    pub fn locate<T: System>(&self) -> RegistryResult<&T> {
        let index = self.visible_index::<T>()?;
        self.earlier[index.get()]
            .downcast_ref::<T>()
            .ok_or_else(|| self.not_found::<T>(Some(index)))
    }

    /// Mutably borrow the earlier-registered system `T`.
    pub fn locate_mut<T: System>(&mut self) -> RegistryResult<&mut T> {
        let index = self.visible_index::<T>()?;
        let not_found = self.not_found::<T>(Some(index));
        self.earlier[index.get()]
            .downcast_mut::<T>()
            .ok_or(not_found)
    }

    /// Whether [`locate`](Self::locate) would succeed for `T`.
    ///
    /// Use this for optional dependencies.
    pub fn contains<T: System>(&self) -> bool {
        self.visible_index::<T>().is_ok()
    }

    /// The systems visible to the caller, in registration order.
    pub fn visible(&self) -> impl ExactSizeIterator<Item = &SystemEntry> + '_ {
        self.earlier.iter()
    }

    fn visible_index<T: System>(&self) -> RegistryResult<SystemIndex> {
        match self.lookup.get(&TypeId::of::<T>()) {
            Some(&index) if index < self.caller_index => Ok(index),
            registered_at => Err(self.not_found::<T>(registered_at.copied())),
        }
    }

    fn not_found<T>(&self, registered_at: Option<SystemIndex>) -> RegistryError {
        RegistryError::NotFound {
            type_name: type_name::<T>(),
            requester: Requester::System {
                name: self.caller,
                index: self.caller_index,
            },
            registered_at,
        }
    }
}
