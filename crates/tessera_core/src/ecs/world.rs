//! # World
//!
//! The entity/component registry. A world owns every table:
//!
//! ```text
//! entities:  Pool<Entity>                    live entity slots
//! slots:     EntityId -> entity slot
//! masks:     EntityId -> ComponentMask       which components it owns
//! handles:   EntityId -> Pool<ComponentHandle>
//! pools:     ComponentMask -> Pool<C>        one pool per component type
//! ```
//!
//! An entity is alive exactly while its id is a key of `masks`. Creation and
//! destruction update all tables in one call, so an entity is never
//! observable half-built.
//!
//! Iteration with [`World::for_each`] scans every live entity and tests its
//! mask, so its cost follows the number of entities, not matches.

use std::any::type_name;
use std::fmt;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::component::{Component, ComponentHandle, ComponentRegistry, ComponentView};
use super::entity::{Entity, EntityId};
use super::erased::{pool_mut, pool_ref, ErasedPool, PoolMap};
use super::events::{EcsEvent, EventHub, EventReceiver};
use super::mask::ComponentMask;
use super::query::Query;
use crate::collections::{GrowthPolicy, HashMap};
use crate::config::{EcsConfig, StorageConfig};
use crate::error::{fatal, ConfigError, StorageError, StorageResult};
use crate::memory::Pool;

/// Where an entity's component of one type lives.
#[derive(Clone, Copy, Debug)]
struct Located {
    /// Component type bit.
    bit: ComponentMask,
    /// Slot of the handle in the entity's handle pool.
    slot: usize,
    /// The handle itself.
    handle: ComponentHandle,
}

/// Entity/component registry.
///
/// # Example
///
/// ```rust
/// use tessera_core::ecs::{Component, World};
///
/// #[derive(Clone, Default)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// impl Component for Position {}
///
/// let mut world = World::default();
/// let entity = world.create_entity();
///
/// world.add_component::<Position>(entity).x = 1.0;
/// assert_eq!(world.get_component::<Position>(entity).x, 1.0);
///
/// world.destroy(entity);
/// assert!(!world.is_valid(entity));
/// ```
pub struct World {
    config: EcsConfig,
    entities: Pool<Entity>,
    slots: HashMap<EntityId, usize>,
    masks: HashMap<EntityId, ComponentMask>,
    handles: HashMap<EntityId, Pool<ComponentHandle>>,
    pools: PoolMap,
    components: ComponentRegistry,
    events: EventHub,
    ids: ChaCha8Rng,
}

impl World {
    /// Creates an empty world.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`StorageConfig::validate`].
    #[track_caller]
    #[must_use]
    pub fn new(config: StorageConfig) -> Self {
        match Self::try_new(config) {
            Ok(world) => world,
            Err(err) => {
                tracing::error!(error = %err, "world config rejected");
                panic!("{err}");
            }
        }
    }

    /// Creates an empty world after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn try_new(config: StorageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let StorageConfig {
            hash_map: policy,
            ecs,
        } = config;
        let per_entity = GrowthPolicy {
            initial_capacity: policy.initial_capacity.max(ecs.entity_capacity),
            ..policy
        };

        Ok(Self {
            entities: Pool::new(ecs.entity_capacity),
            slots: HashMap::with_policy(per_entity),
            masks: HashMap::with_policy(per_entity),
            handles: HashMap::with_policy(per_entity),
            pools: HashMap::with_policy(policy),
            components: ComponentRegistry::new(ecs.max_components),
            events: EventHub::default(),
            ids: ChaCha8Rng::seed_from_u64(ecs.id_seed),
            config: ecs,
        })
    }

    /// The registry sizing this world was created with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EcsConfig {
        &self.config
    }

    /// Subscribes to lifecycle events with the configured channel capacity.
    pub fn subscribe(&mut self) -> EventReceiver {
        self.events.subscribe(self.config.event_capacity)
    }

    /// Subscribes to lifecycle events with an explicit channel capacity.
    ///
    /// A capacity of zero is raised to one.
    pub fn subscribe_with_capacity(&mut self, capacity: usize) -> EventReceiver {
        self.events.subscribe(capacity)
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with a fresh random id.
    pub fn create_entity(&mut self) -> Entity {
        let id = loop {
            let id = EntityId::from_raw(self.ids.next_u64());
            if !id.is_null() && !self.masks.contains_key(&id) {
                break id;
            }
        };
        self.register(id)
    }

    /// Creates an entity with a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEntity`] for the null id and
    /// [`StorageError::DuplicateEntity`] if the id is already alive.
    pub fn try_create_entity_with_id(&mut self, id: EntityId) -> StorageResult<Entity> {
        if id.is_null() {
            return Err(StorageError::InvalidEntity(id));
        }
        if self.masks.contains_key(&id) {
            return Err(StorageError::DuplicateEntity(id));
        }
        Ok(self.register(id))
    }

    /// Creates an entity with a caller-chosen id.
    ///
    /// # Panics
    ///
    /// Panics for the null id or an id that is already alive.
    #[track_caller]
    pub fn create_entity_with_id(&mut self, id: EntityId) -> Entity {
        match self.try_create_entity_with_id(id) {
            Ok(entity) => entity,
            Err(err) => fatal(err),
        }
    }

    fn register(&mut self, id: EntityId) -> Entity {
        let entity = Entity::new(id);
        let (slot, stored) = self.entities.alloc();
        *stored = entity;

        self.slots.insert(id, slot);
        self.masks.insert(id, ComponentMask::EMPTY);
        self.handles
            .insert(id, Pool::new(self.config.handles_per_entity));

        tracing::trace!(entity = %id, "entity created");
        self.events.broadcast(&EcsEvent::EntityCreated { entity });
        entity
    }

    /// Returns `true` while `entity` is alive in this world.
    #[inline]
    #[must_use]
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.masks.contains_key(&entity.id())
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Iterates over live entities in slot order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter().map(|(_, entity)| *entity)
    }

    /// Calls `f` for every live entity.
    pub fn for_all(&self, mut f: impl FnMut(Entity)) {
        for entity in self.entities() {
            f(entity);
        }
    }

    /// Destroys an entity and every component it owns.
    ///
    /// Sends [`EcsEvent::EntityDestroyed`] first, then runs each
    /// component's removal hook before dropping it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEntity`] if the entity is not alive.
    pub fn try_destroy(&mut self, entity: Entity) -> StorageResult<()> {
        let id = entity.id();
        let mask = self.try_component_mask(entity)?;

        self.events.broadcast(&EcsEvent::EntityDestroyed {
            entity,
            components: mask,
        });

        if let Some(handles) = self.handles.remove(&id) {
            for (_, handle) in handles.iter() {
                let Some(pool) = self.pools.get_mut(&handle.mask) else {
                    fatal(StorageError::UnknownComponentType(handle.mask));
                };
                pool.notify_removed(handle.index, entity);
                pool.remove_at(handle.index);
            }
        }

        self.masks.remove(&id);
        if let Some(slot) = self.slots.remove(&id) {
            self.entities.remove(slot);
        }
        tracing::trace!(entity = %id, components = mask.count(), "entity destroyed");
        Ok(())
    }

    /// Destroys an entity and every component it owns.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    #[track_caller]
    pub fn destroy(&mut self, entity: Entity) {
        if let Err(err) = self.try_destroy(entity) {
            fatal(err);
        }
    }

    /// Destroys every entity, with notifications, and drops all pools.
    ///
    /// Component bits stay assigned; the world is ready for reuse.
    pub fn shutdown(&mut self) {
        let live: Vec<Entity> = self.entities().collect();
        for entity in &live {
            self.destroy(*entity);
        }
        self.pools.clear();
        tracing::debug!(
            destroyed = live.len(),
            component_types = self.components.len(),
            "world shut down"
        );
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Mask of every component `entity` owns.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEntity`] if the entity is not alive.
    pub fn try_component_mask(&self, entity: Entity) -> StorageResult<ComponentMask> {
        self.masks
            .get(&entity.id())
            .copied()
            .ok_or(StorageError::InvalidEntity(entity.id()))
    }

    /// Mask of every component `entity` owns.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    #[track_caller]
    #[must_use]
    pub fn component_mask(&self, entity: Entity) -> ComponentMask {
        match self.try_component_mask(entity) {
            Ok(mask) => mask,
            Err(err) => fatal(err),
        }
    }

    /// Bit assigned to `C` in this world, if `C` was ever added.
    #[inline]
    #[must_use]
    pub fn mask_of<C: Component>(&self) -> Option<ComponentMask> {
        self.components.mask_of::<C>()
    }

    /// OR of the bits of every type in `Q`, if all were ever added.
    #[inline]
    #[must_use]
    pub fn query_mask<Q: Query>(&self) -> Option<ComponentMask> {
        Q::mask(&self.components)
    }

    /// Returns `true` if `entity` owns a `C`.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    #[track_caller]
    #[must_use]
    pub fn has_component<C: Component>(&self, entity: Entity) -> bool {
        let mask = self.component_mask(entity);
        self.mask_of::<C>().is_some_and(|bit| mask.contains(bit))
    }

    /// Returns `true` if `entity` owns every type in `Q`.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    #[track_caller]
    #[must_use]
    pub fn has_components<Q: Query>(&self, entity: Entity) -> bool {
        let mask = self.component_mask(entity);
        self.query_mask::<Q>().is_some_and(|query| mask.contains(query))
    }

    /// Handles of every component `entity` owns, in handle-slot order.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    #[track_caller]
    #[must_use]
    pub fn component_handles(&self, entity: Entity) -> Vec<ComponentHandle> {
        match self.handles.get(&entity.id()) {
            Some(handles) => handles.iter().map(|(_, handle)| *handle).collect(),
            None => fatal(StorageError::InvalidEntity(entity.id())),
        }
    }

    /// Type names of every component `entity` owns.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    #[track_caller]
    #[must_use]
    pub fn component_names(&self, entity: Entity) -> Vec<&'static str> {
        self.component_handles(entity)
            .iter()
            .filter_map(|handle| self.pools.get(&handle.mask))
            .map(|pool| pool.component_name())
            .collect()
    }

    /// Type-erased views of every component `entity` owns, in handle-slot
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEntity`] if the entity is not alive,
    /// [`StorageError::UnknownComponentType`] or
    /// [`StorageError::MissingComponent`] if a handle points nowhere.
    pub fn try_components(&self, entity: Entity) -> StorageResult<Vec<ComponentView<'_>>> {
        let id = entity.id();
        let handles = self
            .handles
            .get(&id)
            .ok_or(StorageError::InvalidEntity(id))?;
        handles
            .iter()
            .map(|(_, handle)| {
                let pool = self
                    .pools
                    .get(&handle.mask)
                    .ok_or(StorageError::UnknownComponentType(handle.mask))?;
                let value = pool
                    .component(handle.index)
                    .ok_or(StorageError::MissingComponent {
                        entity: id,
                        component: pool.component_name(),
                    })?;
                Ok::<_, StorageError>(ComponentView::new(*handle, pool.component_name(), value))
            })
            .collect()
    }

    /// Type-erased views of every component `entity` owns.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive or a handle points nowhere.
    #[track_caller]
    #[must_use]
    pub fn components(&self, entity: Entity) -> Vec<ComponentView<'_>> {
        match self.try_components(entity) {
            Ok(views) => views,
            Err(err) => fatal(err),
        }
    }

    /// Attaches `value` to `entity` and returns it.
    ///
    /// The component's pool is created on first use. `on_added` runs before
    /// [`EcsEvent::ComponentAdded`] is sent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEntity`],
    /// [`StorageError::DuplicateComponent`] or
    /// [`StorageError::ComponentLimit`].
    pub fn try_add_component_with<C: Component>(
        &mut self,
        entity: Entity,
        value: C,
    ) -> StorageResult<&mut C> {
        let id = entity.id();
        let mask = self.try_component_mask(entity)?;
        let bit = self.components.register::<C>()?;
        if mask.contains(bit) {
            return Err(StorageError::DuplicateComponent {
                entity: id,
                component: type_name::<C>(),
            });
        }
        let Some(handles) = self.handles.get_mut(&id) else {
            return Err(StorageError::InvalidEntity(id));
        };

        let capacity = self.config.component_capacity;
        let erased = self.pools.get_or_insert_with(bit, || -> Box<dyn ErasedPool> {
            tracing::debug!(component = type_name::<C>(), capacity, "component pool created");
            Box::new(Pool::<C>::new(capacity))
        });
        let Some(pool) = erased.as_any_mut().downcast_mut::<Pool<C>>() else {
            return Err(StorageError::UnknownComponentType(bit));
        };

        let (index, component) = pool.alloc();
        *component = value;
        component.on_added(entity);

        let (_, handle) = handles.alloc();
        *handle = ComponentHandle::new(bit, index, pool.generation(index));
        if let Some(mask) = self.masks.get_mut(&id) {
            mask.insert(bit);
        }

        tracing::trace!(entity = %id, component = type_name::<C>(), "component added");
        self.events.broadcast(&EcsEvent::ComponentAdded {
            entity,
            component: bit,
            name: type_name::<C>(),
        });
        Ok(pool.get_mut(index))
    }

    /// Attaches `value` to `entity` and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive, already owns a `C`, or no
    /// component bit is left.
    #[track_caller]
    pub fn add_component_with<C: Component>(&mut self, entity: Entity, value: C) -> &mut C {
        match self.try_add_component_with(entity, value) {
            Ok(component) => component,
            Err(err) => fatal(err),
        }
    }

    /// Attaches a default-constructed `C` to `entity`.
    ///
    /// # Errors
    ///
    /// Same as [`World::try_add_component_with`].
    pub fn try_add_component<C: Component>(&mut self, entity: Entity) -> StorageResult<&mut C> {
        self.try_add_component_with(entity, C::default())
    }

    /// Attaches a default-constructed `C` to `entity`.
    ///
    /// # Panics
    ///
    /// Same as [`World::add_component_with`].
    #[track_caller]
    pub fn add_component<C: Component>(&mut self, entity: Entity) -> &mut C {
        self.add_component_with(entity, C::default())
    }

    /// Finds the handle of `entity`'s `C` by scanning its handle pool.
    fn locate<C: Component>(&self, entity: Entity) -> StorageResult<Located> {
        let id = entity.id();
        let mask = self.try_component_mask(entity)?;
        let missing = StorageError::MissingComponent {
            entity: id,
            component: type_name::<C>(),
        };
        let Some(bit) = self.mask_of::<C>().filter(|bit| mask.contains(*bit)) else {
            return Err(missing);
        };
        self.handles
            .get(&id)
            .and_then(|handles| handles.iter().find(|(_, handle)| handle.is(bit)))
            .map(|(slot, handle)| Located {
                bit,
                slot,
                handle: *handle,
            })
            .ok_or(missing)
    }

    /// Returns `entity`'s `C`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEntity`] or
    /// [`StorageError::MissingComponent`].
    pub fn try_get_component<C: Component>(&self, entity: Entity) -> StorageResult<&C> {
        let Located { bit, handle, .. } = self.locate::<C>(entity)?;
        pool_ref::<C>(&self.pools, bit)
            .ok_or(StorageError::UnknownComponentType(bit))?
            .get_checked(handle.index, handle.generation)
    }

    /// Returns `entity`'s `C` mutably.
    ///
    /// # Errors
    ///
    /// Same as [`World::try_get_component`].
    pub fn try_get_component_mut<C: Component>(&mut self, entity: Entity) -> StorageResult<&mut C> {
        let Located { bit, handle, .. } = self.locate::<C>(entity)?;
        pool_mut::<C>(&mut self.pools, bit)
            .ok_or(StorageError::UnknownComponentType(bit))?
            .get_checked_mut(handle.index, handle.generation)
    }

    /// Returns `entity`'s `C`.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive or owns no `C`.
    #[track_caller]
    #[must_use]
    pub fn get_component<C: Component>(&self, entity: Entity) -> &C {
        match self.try_get_component(entity) {
            Ok(component) => component,
            Err(err) => fatal(err),
        }
    }

    /// Returns `entity`'s `C` mutably.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive or owns no `C`.
    #[track_caller]
    pub fn get_component_mut<C: Component>(&mut self, entity: Entity) -> &mut C {
        match self.try_get_component_mut(entity) {
            Ok(component) => component,
            Err(err) => fatal(err),
        }
    }

    /// Whether `entity`'s `C` is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEntity`] or
    /// [`StorageError::MissingComponent`].
    pub fn try_is_component_enabled<C: Component>(&self, entity: Entity) -> StorageResult<bool> {
        self.locate::<C>(entity).map(|located| located.handle.enabled)
    }

    /// Whether `entity`'s `C` is enabled.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive or owns no `C`.
    #[track_caller]
    #[must_use]
    pub fn is_component_enabled<C: Component>(&self, entity: Entity) -> bool {
        match self.try_is_component_enabled::<C>(entity) {
            Ok(enabled) => enabled,
            Err(err) => fatal(err),
        }
    }

    /// Sets the enabled flag of `entity`'s `C`.
    ///
    /// The flag is advisory: [`World::for_each`] still visits disabled
    /// components.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEntity`] or
    /// [`StorageError::MissingComponent`].
    pub fn try_set_component_enabled<C: Component>(
        &mut self,
        entity: Entity,
        enabled: bool,
    ) -> StorageResult<()> {
        let id = entity.id();
        let Located { slot, .. } = self.locate::<C>(entity)?;
        let handles = self
            .handles
            .get_mut(&id)
            .ok_or(StorageError::InvalidEntity(id))?;
        handles.try_get_mut(slot)?.enabled = enabled;
        tracing::trace!(entity = %id, component = type_name::<C>(), enabled, "component toggled");
        Ok(())
    }

    /// Sets the enabled flag of `entity`'s `C`.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive or owns no `C`.
    #[track_caller]
    pub fn set_component_enabled<C: Component>(&mut self, entity: Entity, enabled: bool) {
        if let Err(err) = self.try_set_component_enabled::<C>(entity, enabled) {
            fatal(err);
        }
    }

    /// Detaches `entity`'s `C` and returns it.
    ///
    /// [`EcsEvent::ComponentRemoved`] is sent and `on_removed` runs while
    /// the component is still in place.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEntity`] or
    /// [`StorageError::MissingComponent`].
    pub fn try_remove_component<C: Component>(&mut self, entity: Entity) -> StorageResult<C> {
        let id = entity.id();
        let Located { bit, slot, handle } = self.locate::<C>(entity)?;

        self.events.broadcast(&EcsEvent::ComponentRemoved {
            entity,
            component: bit,
            name: type_name::<C>(),
        });

        let pool =
            pool_mut::<C>(&mut self.pools, bit).ok_or(StorageError::UnknownComponentType(bit))?;
        pool.get_checked_mut(handle.index, handle.generation)?
            .on_removed(entity);
        let value = pool.try_remove(handle.index)?;

        if let Some(mask) = self.masks.get_mut(&id) {
            mask.remove(bit);
        }
        if let Some(handles) = self.handles.get_mut(&id) {
            handles.try_remove(slot)?;
        }

        tracing::trace!(entity = %id, component = type_name::<C>(), "component removed");
        Ok(value)
    }

    /// Detaches `entity`'s `C` and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive or owns no `C`.
    #[track_caller]
    pub fn remove_component<C: Component>(&mut self, entity: Entity) -> C {
        match self.try_remove_component(entity) {
            Ok(component) => component,
            Err(err) => fatal(err),
        }
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Calls `f` for every live entity owning all component types of `Q`.
    ///
    /// Entities are visited in slot order. If some type of `Q` was never
    /// added in this world, nothing matches and `f` is never called.
    ///
    /// ```rust
    /// use tessera_core::ecs::{Component, World};
    ///
    /// #[derive(Clone, Default)]
    /// struct Position(f32);
    /// #[derive(Clone, Default)]
    /// struct Velocity(f32);
    ///
    /// impl Component for Position {}
    /// impl Component for Velocity {}
    ///
    /// let mut world = World::default();
    /// let entity = world.create_entity();
    /// world.add_component_with(entity, Position(1.0));
    /// world.add_component_with(entity, Velocity(0.5));
    ///
    /// world.for_each::<(Position, Velocity)>(|_, (position, velocity)| {
    ///     position.0 += velocity.0;
    /// });
    /// assert_eq!(world.get_component::<Position>(entity).0, 1.5);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `Q` names the same component type twice, or if a matching
    /// entity's component handle is missing or stale.
    #[track_caller]
    pub fn for_each<Q: Query + 'static>(&mut self, f: impl FnMut(Entity, Q::Item<'_>)) {
        if let Err(err) = self.try_for_each::<Q>(f) {
            fatal(err);
        }
    }

    /// Calls `f` for every live entity owning all component types of `Q`.
    ///
    /// Stops at the first entity whose handles do not back up its mask.
    /// The pools are back in place when this returns, error or not.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingComponent`] or
    /// [`StorageError::StaleHandle`] for a corrupted entity.
    ///
    /// # Panics
    ///
    /// Panics if `Q` names the same component type twice.
    pub fn try_for_each<Q: Query + 'static>(
        &mut self,
        mut f: impl FnMut(Entity, Q::Item<'_>),
    ) -> StorageResult<()> {
        let Some(query) = Q::mask(&self.components) else {
            return Ok(());
        };
        let Some(mut columns) = Q::detach(&self.components, &mut self.pools) else {
            return Ok(());
        };

        let mut outcome = Ok(());
        for (_, &entity) in self.entities.iter() {
            let id = entity.id();
            if !self.masks.get(&id).is_some_and(|mask| mask.contains(query)) {
                continue;
            }
            let Some(handles) = self.handles.get(&id) else {
                outcome = Err(StorageError::InvalidEntity(id));
                break;
            };
            match Q::fetch(&mut columns, entity, handles) {
                Ok(item) => f(entity, item),
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }

        Q::attach(columns, &mut self.pools);
        outcome
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(StorageConfig::default())
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("component_types", &self.components.len())
            .field("pools", &self.pools.len())
            .field("subscribers", &self.events.subscriber_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Velocity {
        dx: i32,
        dy: i32,
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Frozen;

    impl Component for Position {}
    impl Component for Velocity {}
    impl Component for Frozen {}

    #[test]
    fn test_create_and_destroy() {
        let mut world = World::default();
        let a = world.create_entity();
        let b = world.create_entity();

        assert_ne!(a, b);
        assert!(!a.is_null());
        assert!(world.is_valid(a));
        assert_eq!(world.entity_count(), 2);

        world.destroy(a);
        assert!(!world.is_valid(a));
        assert!(world.is_valid(b));
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn test_ids_follow_seed() {
        let mut first = World::default();
        let mut second = World::default();
        assert_eq!(first.create_entity(), second.create_entity());
    }

    #[test]
    fn test_add_get_remove() {
        let mut world = World::default();
        let entity = world.create_entity();

        let position = world.add_component::<Position>(entity);
        assert_eq!(*position, Position::default());
        position.x = 1;
        position.y = 2;

        assert!(world.has_component::<Position>(entity));
        assert_eq!(*world.get_component::<Position>(entity), Position { x: 1, y: 2 });

        let removed = world.remove_component::<Position>(entity);
        assert_eq!(removed, Position { x: 1, y: 2 });
        assert!(!world.has_component::<Position>(entity));
        assert!(world.try_get_component::<Position>(entity).is_err());
    }

    #[test]
    fn test_masks_track_components() {
        let mut world = World::default();
        let entity = world.create_entity();
        world.add_component::<Position>(entity);
        world.add_component::<Velocity>(entity);

        let position = world.mask_of::<Position>().unwrap();
        let velocity = world.mask_of::<Velocity>().unwrap();
        assert_eq!(world.component_mask(entity), position | velocity);
        assert!(world.has_components::<(Position, Velocity)>(entity));
        assert!(!world.has_components::<(Position, Frozen)>(entity));
        assert_eq!(world.component_handles(entity).len(), 2);
    }

    #[test]
    fn test_duplicate_component_is_rejected() {
        let mut world = World::default();
        let entity = world.create_entity();
        world.add_component::<Position>(entity);
        assert!(matches!(
            world.try_add_component::<Position>(entity),
            Err(StorageError::DuplicateComponent { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn test_missing_component_is_fatal() {
        let mut world = World::default();
        let entity = world.create_entity();
        world.add_component::<Velocity>(entity);
        let _ = world.get_component::<Position>(entity);
    }

    #[test]
    #[should_panic(expected = "invalid entity")]
    fn test_destroyed_entity_is_fatal() {
        let mut world = World::default();
        let entity = world.create_entity();
        world.destroy(entity);
        world.add_component::<Position>(entity);
    }

    #[test]
    fn test_create_with_id() {
        let mut world = World::default();
        let id = EntityId::from_raw(77);
        let entity = world.create_entity_with_id(id);
        assert_eq!(entity.id(), id);
        assert_eq!(
            world.try_create_entity_with_id(id),
            Err(StorageError::DuplicateEntity(id))
        );
        assert_eq!(
            world.try_create_entity_with_id(EntityId::NULL),
            Err(StorageError::InvalidEntity(EntityId::NULL))
        );
    }

    #[test]
    fn test_component_limit() {
        let mut config = StorageConfig::default();
        config.ecs.max_components = 1;
        let mut world = World::new(config);
        let entity = world.create_entity();
        world.add_component::<Position>(entity);
        assert_eq!(
            world.try_add_component::<Velocity>(entity).map(|_| ()),
            Err(StorageError::ComponentLimit { max: 1 })
        );
    }

    #[test]
    fn test_destroy_frees_component_slots() {
        let mut world = World::default();
        let a = world.create_entity();
        world.add_component_with(a, Position { x: 5, y: 5 });
        world.destroy(a);

        let b = world.create_entity();
        world.add_component::<Position>(b);
        assert_eq!(*world.get_component::<Position>(b), Position::default());
    }

    #[test]
    fn test_for_each_visits_matching_entities() {
        let mut world = World::default();
        let moving = world.create_entity();
        let still = world.create_entity();
        world.add_component_with(moving, Position { x: 0, y: 0 });
        world.add_component_with(moving, Velocity { dx: 2, dy: 3 });
        world.add_component_with(still, Position { x: 9, y: 9 });

        let mut visited = Vec::new();
        world.for_each::<(Position, Velocity)>(|entity, (position, velocity)| {
            position.x += velocity.dx;
            position.y += velocity.dy;
            visited.push(entity);
        });

        assert_eq!(visited, vec![moving]);
        assert_eq!(*world.get_component::<Position>(moving), Position { x: 2, y: 3 });
        assert_eq!(*world.get_component::<Position>(still), Position { x: 9, y: 9 });
    }

    #[test]
    fn test_for_each_with_unknown_type_visits_nothing() {
        let mut world = World::default();
        let entity = world.create_entity();
        world.add_component::<Position>(entity);

        let mut calls = 0;
        world.for_each::<(Position, Frozen)>(|_, _| calls += 1);
        assert_eq!(calls, 0);
        assert!(world.has_component::<Position>(entity));
    }

    #[test]
    fn test_shutdown_destroys_everything() {
        let mut world = World::default();
        let events = world.subscribe();
        for _ in 0..3 {
            let entity = world.create_entity();
            world.add_component::<Position>(entity);
        }
        events.drain();

        world.shutdown();
        assert_eq!(world.entity_count(), 0);
        let destroyed = events
            .drain()
            .into_iter()
            .filter(|event| matches!(event, EcsEvent::EntityDestroyed { .. }))
            .count();
        assert_eq!(destroyed, 3);

        let entity = world.create_entity();
        world.add_component::<Position>(entity);
        assert!(world.has_component::<Position>(entity));
    }

    #[test]
    fn test_component_names() {
        let mut world = World::default();
        let entity = world.create_entity();
        world.add_component::<Frozen>(entity);
        assert_eq!(world.component_names(entity), vec![type_name::<Frozen>()]);
    }

    fn corrupt_position(world: &mut World) {
        let bit = world.mask_of::<Position>().unwrap();
        let pool = pool_mut::<Position>(&mut world.pools, bit).unwrap();
        pool.remove(0);
        pool.alloc();
    }

    #[test]
    fn test_try_for_each_reports_stale_handle() {
        let mut world = World::default();
        let entity = world.create_entity();
        world.add_component_with(entity, Position { x: 1, y: 1 });
        corrupt_position(&mut world);

        let mut calls = 0;
        let result = world.try_for_each::<(Position,)>(|_, _| calls += 1);
        assert!(matches!(result, Err(StorageError::StaleHandle { .. })));
        assert_eq!(calls, 0);

        let bit = world.mask_of::<Position>().unwrap();
        assert!(pool_ref::<Position>(&world.pools, bit).is_some());
    }

    #[test]
    #[should_panic(expected = "stale handle")]
    fn test_for_each_stale_handle_is_fatal() {
        let mut world = World::default();
        let entity = world.create_entity();
        world.add_component_with(entity, Position { x: 1, y: 1 });
        corrupt_position(&mut world);
        world.for_each::<(Position,)>(|_, _| {});
    }

    #[test]
    fn test_try_new_rejects_invalid_config() {
        let mut config = StorageConfig::default();
        config.ecs.handles_per_entity = 0;
        assert!(matches!(World::try_new(config), Err(ConfigError::Invalid(_))));
        assert!(World::try_new(StorageConfig::default()).is_ok());
    }

    #[test]
    #[should_panic(expected = "invalid configuration")]
    fn test_new_with_invalid_config_is_fatal() {
        let mut config = StorageConfig::default();
        config.hash_map.count_div = 0;
        let _ = World::new(config);
    }

    #[test]
    fn test_zero_capacity_subscriber_still_receives() {
        let mut world = World::default();
        let events = world.subscribe_with_capacity(0);
        let entity = world.create_entity();
        assert_eq!(events.drain(), vec![EcsEvent::EntityCreated { entity }]);
    }
}
