//! Shared, thread-safe collaborators of every engine.

use alloc::sync::Arc;
use core::fmt;

use crate::config::ContextConfig;
use crate::events::EventHub;
use crate::guard::AotGuard;
use crate::registry::{ConstructionService, ExtensionFactory, TypeRegistry};
use crate::resolver::{TypeResolver, resolver_for};

// -----------------------------------------------------------------------------
// SerialContext

/// Everything an engine consults besides its own per-pass state.
///
/// A context is built once, wrapped in an `Arc` and handed to any number of
/// engines, on any number of threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vc_serial::SerialContext;
/// use vc_serial::config::{ContextConfig, ResolverKind};
/// use vc_serial::registry::TypeRegistry;
///
/// let registry = Arc::new(TypeRegistry::new());
/// let ctx = SerialContext::builder(registry)
///     .with_config(&ContextConfig { resolver: ResolverKind::Name, guard_active: true })
///     .build();
///
/// assert_eq!(ctx.resolver().kind(), ResolverKind::Name);
/// assert!(ctx.guard().is_active());
/// ```
pub struct SerialContext {
    registry: Arc<TypeRegistry>,
    resolver: Arc<dyn TypeResolver>,
    guard: Arc<AotGuard>,
    extensions: Arc<dyn ExtensionFactory>,
    construction: Arc<dyn ConstructionService>,
    events: Arc<EventHub>,
}

impl SerialContext {
    /// A context with the default configuration over `registry`.
    pub fn new(registry: Arc<TypeRegistry>) -> Arc<Self> {
        Self::builder(registry).build()
    }

    #[inline]
    pub fn builder(registry: Arc<TypeRegistry>) -> SerialContextBuilder {
        SerialContextBuilder::new(registry)
    }

    #[inline]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    #[inline]
    pub fn resolver(&self) -> &dyn TypeResolver {
        &*self.resolver
    }

    #[inline]
    pub fn guard(&self) -> &AotGuard {
        &self.guard
    }

    #[inline]
    pub fn extensions(&self) -> &dyn ExtensionFactory {
        &*self.extensions
    }

    #[inline]
    pub fn construction(&self) -> &dyn ConstructionService {
        &*self.construction
    }

    #[inline]
    pub fn events(&self) -> &EventHub {
        &self.events
    }
}

impl fmt::Debug for SerialContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialContext")
            .field("registry", &self.registry)
            .field("resolver", &self.resolver.kind())
            .field("guard", &self.guard)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// SerialContextBuilder

/// Builder for [`SerialContext`].
///
/// Unless replaced, the registry serves as construction service and
/// extension factory, and the resolver follows the configured
/// [`ResolverKind`](crate::config::ResolverKind).
pub struct SerialContextBuilder {
    registry: Arc<TypeRegistry>,
    config: ContextConfig,
    resolver: Option<Arc<dyn TypeResolver>>,
    guard: Option<Arc<AotGuard>>,
    extensions: Option<Arc<dyn ExtensionFactory>>,
    construction: Option<Arc<dyn ConstructionService>>,
    events: Option<Arc<EventHub>>,
}

impl SerialContextBuilder {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            config: ContextConfig::default(),
            resolver: None,
            guard: None,
            extensions: None,
            construction: None,
            events: None,
        }
    }

    #[inline]
    pub fn with_config(mut self, config: &ContextConfig) -> Self {
        self.config = config.clone();
        self
    }

    #[inline]
    pub fn with_resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Shares an existing guard. Its activity flag is left untouched.
    #[inline]
    pub fn with_guard(mut self, guard: Arc<AotGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    #[inline]
    pub fn with_extensions(mut self, extensions: Arc<dyn ExtensionFactory>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    #[inline]
    pub fn with_construction(mut self, construction: Arc<dyn ConstructionService>) -> Self {
        self.construction = Some(construction);
        self
    }

    #[inline]
    pub fn with_events(mut self, events: Arc<EventHub>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> Arc<SerialContext> {
        let Self {
            registry,
            config,
            resolver,
            guard,
            extensions,
            construction,
            events,
        } = self;

        let resolver = resolver.unwrap_or_else(|| resolver_for(config.resolver, Arc::clone(&registry)));
        let guard = guard.unwrap_or_else(|| {
            let guard = AotGuard::new();
            guard.set_active(config.guard_active);
            Arc::new(guard)
        });
        let extensions =
            extensions.unwrap_or_else(|| Arc::clone(&registry) as Arc<dyn ExtensionFactory>);
        let construction =
            construction.unwrap_or_else(|| Arc::clone(&registry) as Arc<dyn ConstructionService>);

        Arc::new(SerialContext {
            registry,
            resolver,
            guard,
            extensions,
            construction,
            events: events.unwrap_or_default(),
        })
    }
}
