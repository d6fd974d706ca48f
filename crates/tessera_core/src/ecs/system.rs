//! # Systems
//!
//! A system is a stateful object with four phase hooks, driven against a
//! [`World`] by a [`SystemManager`]:
//!
//! ```text
//! initialize ──> update ─┬─> render ─┬─> ... ──> shutdown
//!                        └───────────┘
//! ```
//!
//! - Systems run in the order they were added
//! - At most one system per type; lookup is by type
//! - `render` gets a shared borrow of the world, the other phases a mutable one

use std::any::{type_name, Any, TypeId};
use std::fmt;

use super::world::World;
use crate::collections::HashMap;
use crate::error::{fatal, StorageError, StorageResult};

/// Upcasts to [`Any`] so boxed systems can be downcast by type.
///
/// Blanket-implemented for every `'static` type.
pub trait AsAny: Any {
    /// `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// The box as `Box<dyn Any>`.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Per-frame logic over a [`World`].
///
/// Only `update` is required.
pub trait System: AsAny {
    /// Runs once, before the first update.
    fn initialize(&mut self, _world: &mut World) {}

    /// Runs every frame.
    fn update(&mut self, world: &mut World);

    /// Runs every frame after `update`, without mutating the world.
    fn render(&mut self, _world: &World) {}

    /// Runs once, when the manager shuts down.
    fn shutdown(&mut self, _world: &mut World) {}
}

struct NamedSystem {
    name: &'static str,
    system: Box<dyn System>,
}

/// Ordered, type-keyed set of systems.
///
/// # Example
///
/// ```rust
/// use tessera_core::ecs::{System, SystemManager, World};
///
/// #[derive(Default)]
/// struct Ticks(u32);
///
/// impl System for Ticks {
///     fn update(&mut self, _world: &mut World) {
///         self.0 += 1;
///     }
/// }
///
/// let mut world = World::default();
/// let mut systems = SystemManager::new();
/// systems.add_system(Ticks::default());
///
/// systems.initialize(&mut world);
/// systems.update(&mut world);
/// systems.update(&mut world);
/// assert_eq!(systems.get_system::<Ticks>().0, 2);
/// ```
#[derive(Default)]
pub struct SystemManager {
    systems: Vec<NamedSystem>,
    by_type: HashMap<TypeId, usize>,
}

impl SystemManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered systems.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if no system is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Type names of the registered systems, in run order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.systems.iter().map(|entry| entry.name)
    }

    /// Returns `true` if a system of type `S` is registered.
    #[inline]
    #[must_use]
    pub fn has_system<S: System>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<S>())
    }

    /// Appends `system` to the run order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateSystem`] if an `S` is already
    /// registered.
    pub fn try_add_system<S: System>(&mut self, system: S) -> StorageResult<&mut S> {
        let name = type_name::<S>();
        if self.has_system::<S>() {
            return Err(StorageError::DuplicateSystem(name));
        }
        let index = self.systems.len();
        self.by_type.insert(TypeId::of::<S>(), index);
        self.systems.push(NamedSystem {
            name,
            system: Box::new(system),
        });
        tracing::debug!(system = name, index, "system added");
        self.try_get_system_mut::<S>()
    }

    /// Appends `system` to the run order.
    ///
    /// # Panics
    ///
    /// Panics if an `S` is already registered.
    #[track_caller]
    pub fn add_system<S: System>(&mut self, system: S) -> &mut S {
        match self.try_add_system(system) {
            Ok(system) => system,
            Err(err) => fatal(err),
        }
    }

    /// Returns the registered `S`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingSystem`] if no `S` is registered.
    pub fn try_get_system<S: System>(&self) -> StorageResult<&S> {
        self.by_type
            .get(&TypeId::of::<S>())
            .and_then(|&index| self.systems.get(index))
            .and_then(|entry| (*entry.system).as_any().downcast_ref::<S>())
            .ok_or(StorageError::MissingSystem(type_name::<S>()))
    }

    /// Returns the registered `S` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingSystem`] if no `S` is registered.
    pub fn try_get_system_mut<S: System>(&mut self) -> StorageResult<&mut S> {
        let index = self.by_type.get(&TypeId::of::<S>()).copied();
        index
            .and_then(|index| self.systems.get_mut(index))
            .and_then(|entry| (*entry.system).as_any_mut().downcast_mut::<S>())
            .ok_or(StorageError::MissingSystem(type_name::<S>()))
    }

    /// Returns the registered `S`.
    ///
    /// # Panics
    ///
    /// Panics if no `S` is registered.
    #[track_caller]
    #[must_use]
    pub fn get_system<S: System>(&self) -> &S {
        match self.try_get_system() {
            Ok(system) => system,
            Err(err) => fatal(err),
        }
    }

    /// Returns the registered `S` mutably.
    ///
    /// # Panics
    ///
    /// Panics if no `S` is registered.
    #[track_caller]
    pub fn get_system_mut<S: System>(&mut self) -> &mut S {
        match self.try_get_system_mut() {
            Ok(system) => system,
            Err(err) => fatal(err),
        }
    }

    /// Unregisters `S` and hands it back. Its `shutdown` hook does not run.
    pub fn remove_system<S: System>(&mut self) -> Option<S> {
        let index = self.by_type.remove(&TypeId::of::<S>())?;
        let entry = self.systems.remove(index);
        for slot in self.by_type.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        tracing::debug!(system = entry.name, "system removed");
        entry.system.into_any().downcast::<S>().ok().map(|system| *system)
    }

    /// Runs every system's `initialize` hook.
    pub fn initialize(&mut self, world: &mut World) {
        for entry in &mut self.systems {
            entry.system.initialize(world);
        }
        tracing::debug!(systems = self.systems.len(), "systems initialized");
    }

    /// Runs every system's `update` hook.
    pub fn update(&mut self, world: &mut World) {
        for entry in &mut self.systems {
            entry.system.update(world);
        }
    }

    /// Runs every system's `render` hook.
    pub fn render(&mut self, world: &World) {
        for entry in &mut self.systems {
            entry.system.render(world);
        }
    }

    /// Runs every system's `shutdown` hook, then drops all systems.
    pub fn shutdown(&mut self, world: &mut World) {
        for entry in &mut self.systems {
            entry.system.shutdown(world);
        }
        let count = self.systems.len();
        self.systems.clear();
        self.by_type.clear();
        tracing::debug!(systems = count, "systems shut down");
    }
}

impl fmt::Debug for SystemManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Counter(u32);

    impl System for Counter {
        fn update(&mut self, _world: &mut World) {
            self.0 += 1;
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Idle;

    impl System for Idle {
        fn update(&mut self, _world: &mut World) {}
    }

    #[test]
    fn test_lookup_by_type() {
        let mut systems = SystemManager::new();
        systems.add_system(Counter(4));
        systems.add_system(Idle);

        assert_eq!(systems.len(), 2);
        assert!(systems.has_system::<Idle>());
        assert_eq!(systems.get_system::<Counter>(), &Counter(4));
        systems.get_system_mut::<Counter>().0 = 9;
        assert_eq!(systems.get_system::<Counter>().0, 9);
    }

    #[test]
    fn test_duplicate_system_is_rejected() {
        let mut systems = SystemManager::new();
        systems.add_system(Idle);
        assert!(matches!(
            systems.try_add_system(Idle),
            Err(StorageError::DuplicateSystem(_))
        ));
        assert_eq!(systems.len(), 1);
    }

    #[test]
    fn test_remove_keeps_other_lookups() {
        let mut systems = SystemManager::new();
        systems.add_system(Idle);
        systems.add_system(Counter(1));

        assert_eq!(systems.remove_system::<Idle>(), Some(Idle));
        assert_eq!(systems.remove_system::<Idle>(), None);
        assert_eq!(systems.get_system::<Counter>(), &Counter(1));
        assert_eq!(
            systems.try_get_system::<Idle>(),
            Err(StorageError::MissingSystem(type_name::<Idle>()))
        );
    }

    #[test]
    #[should_panic(expected = "no system")]
    fn test_missing_system_is_fatal() {
        let systems = SystemManager::new();
        let _ = systems.get_system::<Counter>();
    }
}
