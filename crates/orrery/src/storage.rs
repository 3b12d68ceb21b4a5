//! Ordered, type-indexed ownership of system instances.

use std::any::{Any, TypeId, type_name};
use std::convert::Infallible;
use std::fmt;

use orrery_core::alloc::HashMap;

use crate::context::StorageContext;
use crate::error::{RegistryError, RegistryResult, Requester};
use crate::locator::Locator;
use crate::system::System;
use crate::type_key::TypeKey;

/// Position of a system in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemIndex(usize);

impl SystemIndex {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

static_assertions::assert_eq_size!(SystemIndex, usize);

impl fmt::Display for SystemIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a [`SystemStorage`] is in its life.
///
/// States only ever move forward, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LifecycleState {
    /// Nothing registered yet.
    #[default]
    Empty,
    /// At least one system registered; more may follow.
    Registering,
    /// The attach pass is running.
    Attaching,
    /// Every system attached.
    Attached,
    /// The finalize pass is running.
    Finalizing,
    /// Startup succeeded; frames may be dispatched.
    Ready,
    /// The storage is being dropped.
    ShuttingDown,
}

impl LifecycleState {
    /// Whether systems may still be registered.
    #[inline]
    pub fn accepts_registration(self) -> bool {
        matches!(self, LifecycleState::Empty | LifecycleState::Registering)
    }

    /// Whether the owner may look systems up: every system has attached
    /// and the storage is not shutting down.
    #[inline]
    pub fn allows_lookup(self) -> bool {
        self >= LifecycleState::Attached && self < LifecycleState::ShuttingDown
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Empty => "empty",
            LifecycleState::Registering => "registering",
            LifecycleState::Attaching => "attaching",
            LifecycleState::Attached => "attached",
            LifecycleState::Finalizing => "finalizing",
            LifecycleState::Ready => "ready",
            LifecycleState::ShuttingDown => "shutting down",
        };
        f.write_str(name)
    }
}

/// One registered system.
pub struct SystemEntry {
    key: TypeKey,
    index: SystemIndex,
    name: &'static str,
    pub(crate) instance: Box<dyn System>,
}

impl SystemEntry {
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[inline]
    pub fn index(&self) -> SystemIndex {
        self.index
    }

    /// The system's [`System::name`], captured at registration.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn system(&self) -> &dyn System {
        self.instance.as_ref()
    }

    pub fn downcast_ref<T: System>(&self) -> Option<&T> {
        (self.instance.as_ref() as &dyn Any).downcast_ref::<T>()
    }

    pub fn downcast_mut<T: System>(&mut self) -> Option<&mut T> {
        (self.instance.as_mut() as &mut dyn Any).downcast_mut::<T>()
    }
}

impl fmt::Debug for SystemEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemEntry")
            .field("index", &self.index)
            .field("name", &self.name)
            .finish()
    }
}

/// Owns one instance of each registered system type, in registration order.
///
/// Registration order doubles as dependency order: a system can only
/// [`locate`](Locator::locate) systems registered before it, and every pass
/// and frame phase visits systems in that order. Dropping the storage drops
/// the systems in reverse order.
///
/// # Example
///
/// ```
/// use orrery::{StorageContext, System, SystemStorage};
///
/// struct Window;
/// impl System for Window {}
///
/// let mut storage = SystemStorage::new(StorageContext::default());
/// let index = storage.register(Window).unwrap();
/// assert_eq!(index.get(), 0);
/// assert!(storage.contains::<Window>());
/// assert!(storage.register(Window).is_err());
/// ```
pub struct SystemStorage {
    pub(crate) state: LifecycleState,
    pub(crate) entries: Vec<SystemEntry>,
    pub(crate) lookup: HashMap<TypeId, SystemIndex>,
    pub(crate) context: StorageContext,
    pub(crate) engine_running: bool,
    pub(crate) frame: u64,
}

impl SystemStorage {
    /// Create an empty storage around the context every system will see.
    pub fn new(context: StorageContext) -> Self {
        Self {
            state: LifecycleState::Empty,
            entries: Vec::new(),
            lookup: HashMap::new(),
            context,
            engine_running: false,
            frame: 0,
        }
    }

    /// Take ownership of `system` and append it to the registration order.
    ///
    /// Fails with [`RegistryError::DuplicateRegistration`] if `T` is already
    /// registered and [`RegistryError::InvalidState`] once startup has begun.
    pub fn register<T: System>(&mut self, system: T) -> RegistryResult<SystemIndex> {
        if !self.state.accepts_registration() {
            return Err(RegistryError::InvalidState {
                operation: "register a system",
                state: self.state,
            });
        }

        let key = TypeKey::of::<T>();
        if let Some(&existing_index) = self.lookup.get(&key.id()) {
            return Err(RegistryError::DuplicateRegistration {
                type_name: key.name(),
                existing_index,
            });
        }

        let index = SystemIndex::new(self.entries.len());
        let name = system.name();
        self.entries.push(SystemEntry {
            key,
            index,
            name,
            instance: Box::new(system),
        });
        self.lookup.insert(key.id(), index);
        self.state = LifecycleState::Registering;

        tracing::debug!("Registered system {} at index {}", name, index);
        Ok(index)
    }

    /// Whether `T` is registered at all.
    pub fn contains<T: System>(&self) -> bool {
        self.lookup.contains_key(&TypeId::of::<T>())
    }

    /// Registration index of `T`, if registered.
    pub fn index_of<T: System>(&self) -> Option<SystemIndex> {
        self.lookup.get(&TypeId::of::<T>()).copied()
    }

    /// Borrow a registered system from the owning side.
    ///
    /// Legal once the attach pass has completed. Before that, or after an
    /// attach failure, some systems never attached and this fails with
    /// [`RegistryError::InvalidState`].
    pub fn get<T: System>(&self) -> RegistryResult<&T> {
        let index = self.owner_lookup::<T>("get a system")?;
        self.entries[index.get()]
            .downcast_ref::<T>()
            .ok_or_else(|| owner_not_found::<T>(Some(index)))
    }

    /// Mutably borrow a registered system from the owning side.
    pub fn get_mut<T: System>(&mut self) -> RegistryResult<&mut T> {
        let index = self.owner_lookup::<T>("get a system")?;
        self.entries[index.get()]
            .downcast_mut::<T>()
            .ok_or_else(|| owner_not_found::<T>(Some(index)))
    }

    fn owner_lookup<T: System>(&self, operation: &'static str) -> RegistryResult<SystemIndex> {
        if !self.state.allows_lookup() {
            return Err(RegistryError::InvalidState {
                operation,
                state: self.state,
            });
        }
        self.index_of::<T>()
            .ok_or_else(|| owner_not_found::<T>(None))
    }

    /// Entries in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, SystemEntry> {
        self.entries.iter()
    }

    pub fn entry(&self, index: SystemIndex) -> Option<&SystemEntry> {
        self.entries.get(index.get())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[inline]
    pub fn context(&self) -> &StorageContext {
        &self.context
    }

    /// Number of frames dispatched so far.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub(crate) fn transition(&mut self, next: LifecycleState) {
        debug_assert!(next >= self.state, "lifecycle went backwards");
        tracing::debug!("System storage: {} -> {}", self.state, next);
        self.state = next;
    }

    pub(crate) fn require_state(
        &self,
        operation: &'static str,
        allowed: impl Fn(LifecycleState) -> bool,
    ) -> RegistryResult<()> {
        if allowed(self.state) {
            Ok(())
        } else {
            Err(RegistryError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Visit every system in registration order, each with a locator over
    /// the systems before it. Stops at the first error.
    pub(crate) fn try_for_each<E>(
        &mut self,
        mut visit: impl FnMut(&mut dyn System, &mut Locator<'_>, &StorageContext) -> Result<(), E>,
    ) -> Result<(), (&'static str, SystemIndex, E)> {
        let Self {
            entries,
            lookup,
            context,
            ..
        } = self;

        for position in 0..entries.len() {
            let (earlier, rest) = entries.split_at_mut(position);
            let entry = &mut rest[0];
            let (name, index) = (entry.name, entry.index);

            let mut locator = Locator::new(earlier, lookup, name, index);
            if let Err(error) = visit(entry.instance.as_mut(), &mut locator, context) {
                return Err((name, index, error));
            }
        }
        Ok(())
    }

    /// Infallible [`try_for_each`](Self::try_for_each).
    pub(crate) fn for_each(&mut self, mut visit: impl FnMut(&mut dyn System, &mut Locator<'_>)) {
        let result = self.try_for_each::<Infallible>(|system, locator, _| {
            visit(system, locator);
            Ok(())
        });
        if let Err((_, _, never)) = result {
            match never {}
        }
    }
}

fn owner_not_found<T>(registered_at: Option<SystemIndex>) -> RegistryError {
    RegistryError::NotFound {
        type_name: type_name::<T>(),
        requester: Requester::Owner,
        registered_at,
    }
}

impl Drop for SystemStorage {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }

        self.state = LifecycleState::ShuttingDown;
        tracing::debug!("Shutting down {} systems", self.entries.len());

        // Later systems may still reference earlier ones while dropping.
        while let Some(entry) = self.entries.pop() {
            tracing::trace!("Dropping system {} (index {})", entry.name, entry.index);
            drop(entry);
        }
        self.lookup.clear();
    }
}

impl fmt::Debug for SystemStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemStorage")
            .field("state", &self.state)
            .field("systems", &self.entries.iter().map(|e| e.name).collect::<Vec<_>>())
            .field("frame", &self.frame)
            .finish()
    }
}
