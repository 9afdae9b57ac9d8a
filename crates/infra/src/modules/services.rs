//! Registration surface handed to modules, and its frozen counterpart.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use agora_events::{HandlerRegistry, HandlerRegistryBuilder, InProcessEventBus, Subscription};
use thiserror::Error;

use crate::operation::OperationScope;
use crate::unit_of_work::Participant;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service `{service}` is already registered")]
    Duplicate { service: &'static str },

    #[error("service `{service}` is not registered (is the module providing it registered earlier?)")]
    Missing { service: &'static str },

    #[error("a participant named `{participant}` is already registered")]
    DuplicateParticipant { participant: &'static str },
}

type SharedService = Arc<dyn Any + Send + Sync>;

/// One participant instance, viewed both as a commit target and as its concrete type.
pub(crate) struct ScopedParticipant {
    pub(crate) name: &'static str,
    pub(crate) participant: Arc<dyn Participant>,
    pub(crate) typed: SharedService,
}

type ParticipantFactory = Box<dyn Fn() -> ScopedParticipant + Send + Sync>;

struct ServiceSlot {
    name: &'static str,
    service: SharedService,
}

/// Mutable registration surface used during startup.
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, ServiceSlot>,
    handlers: HandlerRegistryBuilder,
    participants: Vec<(&'static str, ParticipantFactory)>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared service by type. A second registration of `T` fails.
    pub fn insert<T>(&mut self, service: Arc<T>) -> Result<&mut Self, ServiceError>
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        let name = type_name::<T>();
        if self.services.contains_key(&type_id) {
            return Err(ServiceError::Duplicate { service: name });
        }
        tracing::debug!(service = name, "service registered");
        self.services.insert(type_id, ServiceSlot { name, service });
        Ok(self)
    }

    pub fn insert_value<T>(&mut self, service: T) -> Result<&mut Self, ServiceError>
    where
        T: Send + Sync + 'static,
    {
        self.insert(Arc::new(service))
    }

    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        lookup(&self.services)
    }

    pub fn require<T>(&self) -> Result<Arc<T>, ServiceError>
    where
        T: Send + Sync + 'static,
    {
        self.get::<T>().ok_or(ServiceError::Missing {
            service: type_name::<T>(),
        })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Handler subscriptions for the in-process event bus.
    pub fn handlers(&mut self) -> &mut HandlerRegistryBuilder {
        &mut self.handlers
    }

    /// Register a persistence boundary under `name`. `factory` runs once per
    /// operation, in registration order relative to other factories.
    ///
    /// The name is how the owning module finds its participant again
    /// ([`OperationScope::participant`]); a second factory with the same name fails.
    pub fn add_participant_factory<P, F>(&mut self, name: &'static str, factory: F) -> Result<&mut Self, ServiceError>
    where
        P: Participant + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        if self.participants.iter().any(|(existing, _)| *existing == name) {
            return Err(ServiceError::DuplicateParticipant { participant: name });
        }
        tracing::debug!(participant = name, kind = type_name::<P>(), "participant factory registered");
        self.participants.push((
            name,
            Box::new(move || {
                let instance = Arc::new(factory());
                ScopedParticipant {
                    name,
                    participant: instance.clone(),
                    typed: instance,
                }
            }),
        ));
        Ok(self)
    }

    pub fn service_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.services.values().map(|slot| slot.name).collect();
        names.sort_unstable();
        names
    }

    /// Freeze everything registered so far.
    pub fn build(self) -> ServiceProvider {
        let registry = Arc::new(self.handlers.build());
        ServiceProvider {
            inner: Arc::new(ProviderInner {
                bus: InProcessEventBus::new(registry.clone()),
                registry,
                services: self.services,
                participants: self.participants,
            }),
        }
    }
}

impl core::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.service_names())
            .field("handlers", &self.handlers)
            .field("participants", &self.participants.len())
            .finish()
    }
}

fn lookup<T>(services: &HashMap<TypeId, ServiceSlot>) -> Option<Arc<T>>
where
    T: Send + Sync + 'static,
{
    services
        .get(&TypeId::of::<T>())
        .and_then(|slot| slot.service.clone().downcast::<T>().ok())
}

struct ProviderInner {
    services: HashMap<TypeId, ServiceSlot>,
    registry: Arc<HandlerRegistry>,
    bus: InProcessEventBus,
    participants: Vec<(&'static str, ParticipantFactory)>,
}

/// Immutable, cheaply cloneable view of the composed platform.
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        lookup(&self.inner.services)
    }

    pub fn require<T>(&self) -> Result<Arc<T>, ServiceError>
    where
        T: Send + Sync + 'static,
    {
        self.get::<T>().ok_or(ServiceError::Missing {
            service: type_name::<T>(),
        })
    }

    pub fn event_bus(&self) -> &InProcessEventBus {
        &self.inner.bus
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.inner.registry.subscriptions()
    }

    /// Registered participant names, in commit order.
    pub fn participant_names(&self) -> Vec<&'static str> {
        self.inner.participants.iter().map(|(name, _)| *name).collect()
    }

    pub fn service_count(&self) -> usize {
        self.inner.services.len()
    }

    /// Start a logical operation with one fresh participant per registered factory.
    pub fn begin_operation(&self) -> OperationScope {
        let mut scope = OperationScope::new(self.inner.bus.clone());
        for (_, factory) in &self.inner.participants {
            scope.attach_scoped(factory());
        }
        scope
    }
}

impl core::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("services", &self.inner.services.len())
            .field("subscriptions", &self.subscriptions())
            .field("participants", &self.participant_names())
            .finish()
    }
}
