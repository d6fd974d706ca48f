//! # Lifecycle Events
//!
//! The world announces entity and component lifecycle changes over bounded
//! crossbeam channels.
//!
//! ```text
//! ┌─────────┐  try_send   ┌──────────┐  drain   ┌────────────┐
//! │  World  │────────────>│ EventBus │─────────>│ Subscriber │
//! └─────────┘             └──────────┘          └────────────┘
//! ```
//!
//! Sending never blocks. A full channel drops the event.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use super::entity::Entity;
use super::mask::ComponentMask;

/// Entity and component lifecycle notifications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EcsEvent {
    /// An entity was created.
    EntityCreated {
        /// The new entity.
        entity: Entity,
    },

    /// An entity is being destroyed. Sent before its components are dropped.
    EntityDestroyed {
        /// The entity being destroyed.
        entity: Entity,
        /// Every component the entity still owned.
        components: ComponentMask,
    },

    /// A component was attached and initialized.
    ComponentAdded {
        /// Owner of the component.
        entity: Entity,
        /// Bit of the component type.
        component: ComponentMask,
        /// Type name of the component.
        name: &'static str,
    },

    /// A component is being detached. Sent while it is still readable.
    ComponentRemoved {
        /// Owner of the component.
        entity: Entity,
        /// Bit of the component type.
        component: ComponentMask,
        /// Type name of the component.
        name: &'static str,
    },
}

impl EcsEvent {
    /// The entity the event is about.
    #[inline]
    #[must_use]
    pub const fn entity(&self) -> Entity {
        match self {
            Self::EntityCreated { entity }
            | Self::EntityDestroyed { entity, .. }
            | Self::ComponentAdded { entity, .. }
            | Self::ComponentRemoved { entity, .. } => *entity,
        }
    }
}

/// A bounded channel for [`EcsEvent`]s.
pub struct EventBus {
    sender: Sender<EcsEvent>,
    receiver: Receiver<EcsEvent>,
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undelivered events.
    ///
    /// A capacity of zero is raised to one; a zero-capacity channel would
    /// reject every non-blocking send.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Creates a sender handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Creates a connected sender and receiver.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (EventSender, EventReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

/// Outcome of a non-blocking send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendStatus {
    /// The event was queued.
    Sent,
    /// The channel was full and the event was dropped.
    Full,
    /// Every receiver is gone.
    Disconnected,
}

/// Producer side of an [`EventBus`].
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: Sender<EcsEvent>,
}

impl EventSender {
    /// Sends an event without blocking.
    #[inline]
    pub fn send(&self, event: EcsEvent) -> SendStatus {
        match self.sender.try_send(event) {
            Ok(()) => SendStatus::Sent,
            Err(TrySendError::Full(_)) => SendStatus::Full,
            Err(TrySendError::Disconnected(_)) => SendStatus::Disconnected,
        }
    }
}

/// Consumer side of an [`EventBus`].
#[derive(Clone, Debug)]
pub struct EventReceiver {
    receiver: Receiver<EcsEvent>,
}

impl EventReceiver {
    /// Takes every pending event.
    #[inline]
    pub fn drain(&self) -> Vec<EcsEvent> {
        self.receiver.try_iter().collect()
    }

    /// Takes one pending event.
    #[inline]
    pub fn try_recv(&self) -> Option<EcsEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if events are pending.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

/// Fans events out to every subscriber.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Vec<EventSender>,
}

impl EventHub {
    /// Adds a subscriber with its own bounded channel of at least one slot.
    pub fn subscribe(&mut self, capacity: usize) -> EventReceiver {
        let (sender, receiver) = EventBus::create_pair(capacity);
        self.subscribers.push(sender);
        receiver
    }

    /// Number of connected subscribers.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Sends `event` to every subscriber.
    ///
    /// Subscribers whose receivers were dropped are forgotten.
    pub fn broadcast(&mut self, event: &EcsEvent) {
        self.subscribers.retain(|sender| match sender.send(event.clone()) {
            SendStatus::Sent => true,
            SendStatus::Full => {
                tracing::warn!(?event, "event channel full, event dropped");
                true
            }
            SendStatus::Disconnected => false,
        });
    }
}
