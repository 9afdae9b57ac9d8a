//! Typed handler registry.
//!
//! Populated once during module registration through [`HandlerRegistryBuilder`],
//! then frozen into a [`HandlerRegistry`] that is only ever read. Lookups need
//! no locking.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{Event, EventHandler};

/// A handler bound to `E`, with the name it was registered under.
pub struct HandlerEntry<E: Event> {
    name: &'static str,
    handler: Arc<dyn EventHandler<E>>,
}

impl<E: Event> HandlerEntry<E> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn handler(&self) -> &dyn EventHandler<E> {
        self.handler.as_ref()
    }
}

impl<E: Event> Clone for HandlerEntry<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<E: Event> core::fmt::Debug for HandlerEntry<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerEntry").field("name", &self.name).finish()
    }
}

/// Handlers for one event type, in registration order.
struct Slot {
    event_type: &'static str,
    names: Vec<&'static str>,
    /// Always a `Vec<HandlerEntry<E>>` for the `E` this slot is keyed by.
    handlers: Box<dyn Any + Send + Sync>,
}

impl Slot {
    fn new<E: Event>() -> Self {
        Self {
            event_type: core::any::type_name::<E>(),
            names: Vec::new(),
            handlers: Box::new(Vec::<HandlerEntry<E>>::new()),
        }
    }

    fn entries<E: Event>(&self) -> &[HandlerEntry<E>] {
        self.handlers
            .downcast_ref::<Vec<HandlerEntry<E>>>()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn push<E: Event>(&mut self, entry: HandlerEntry<E>) {
        match self.handlers.downcast_mut::<Vec<HandlerEntry<E>>>() {
            Some(list) => {
                self.names.push(entry.name);
                list.push(entry);
            }
            None => unreachable!("slot keyed by TypeId::of::<E>() holds HandlerEntry<E>"),
        }
    }
}

/// Registered handlers for one event type (read-only summary for auditing/logging).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub event_type: &'static str,
    pub handlers: Vec<&'static str>,
}

/// Mutable registry used during the startup registration phase.
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    slots: HashMap<TypeId, Slot>,
    /// Event types in first-subscription order, so summaries are deterministic.
    order: Vec<TypeId>,
}

impl HandlerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to event type `E`. Handlers for the same type run in the
    /// order they were subscribed.
    pub fn subscribe<E, H>(&mut self, handler: H) -> &mut Self
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        self.subscribe_arc::<E>(Arc::new(handler))
    }

    /// Bind an already shared handler to event type `E`.
    pub fn subscribe_arc<E: Event>(&mut self, handler: Arc<dyn EventHandler<E>>) -> &mut Self {
        let type_id = TypeId::of::<E>();
        if !self.slots.contains_key(&type_id) {
            self.order.push(type_id);
        }

        let entry = HandlerEntry {
            name: handler.name(),
            handler,
        };
        tracing::debug!(
            event_type = core::any::type_name::<E>(),
            handler = entry.name,
            "handler subscribed"
        );
        self.slots
            .entry(type_id)
            .or_insert_with(Slot::new::<E>)
            .push(entry);
        self
    }

    pub fn handler_count<E: Event>(&self) -> usize {
        self.slots
            .get(&TypeId::of::<E>())
            .map_or(0, |slot| slot.names.len())
    }

    /// Freeze the registry. No handler can be added afterwards.
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            slots: self.slots,
            order: self.order,
        }
    }
}

impl core::fmt::Debug for HandlerRegistryBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerRegistryBuilder")
            .field("event_types", &self.order.len())
            .finish()
    }
}

/// Immutable mapping from event type to its ordered handlers.
pub struct HandlerRegistry {
    slots: HashMap<TypeId, Slot>,
    order: Vec<TypeId>,
}

impl HandlerRegistry {
    /// A registry with no handlers at all (every publish is a no-op).
    pub fn empty() -> Self {
        HandlerRegistryBuilder::new().build()
    }

    /// Handlers bound to exactly `E`, in registration order.
    pub fn handlers_for<E: Event>(&self) -> &[HandlerEntry<E>] {
        self.slots
            .get(&TypeId::of::<E>())
            .map(|slot| slot.entries::<E>())
            .unwrap_or(&[])
    }

    pub fn handler_count<E: Event>(&self) -> usize {
        self.handlers_for::<E>().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every event type with at least one handler, in first-subscription order.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.order
            .iter()
            .filter_map(|type_id| self.slots.get(type_id))
            .map(|slot| Subscription {
                event_type: slot.event_type,
                handlers: slot.names.clone(),
            })
            .collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl core::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("subscriptions", &self.subscriptions())
            .finish()
    }
}
