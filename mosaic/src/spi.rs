//! Priority-ordered service provider registry.
//!
//! A [`ServiceRegistry`] maps a request to the best provider able to satisfy
//! it. Providers are tried from the highest priority down; the first one that
//! returns `Some` wins. Providers never fail loudly: returning `None` simply
//! hands the request to the next provider.
//!
//! The same generic registry backs tile reader selection
//! ([`crate::tilereader::TileReaderRegistry`]) and elevation lookup
//! ([`crate::elevation::ElevationManager`]).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mosaic::spi::{Provider, ServiceRegistry};
//!
//! struct Doubler;
//!
//! impl Provider<i32> for Doubler {
//!     type Output = i32;
//!
//!     fn name(&self) -> &str {
//!         "doubler"
//!     }
//!
//!     fn create(&self, input: &i32) -> Option<i32> {
//!         Some(input * 2)
//!     }
//! }
//!
//! let registry = ServiceRegistry::new();
//! registry.register(Arc::new(Doubler), 0);
//! assert_eq!(registry.create(&21), Some(42));
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

/// A pluggable implementation selected at runtime from a [`ServiceRegistry`].
pub trait Provider<I: ?Sized>: Send + Sync {
    /// The value produced on success.
    type Output;

    /// Short identifier, used for explicit selection via
    /// [`ServiceRegistry::create_with_hint`] and for diagnostics.
    fn name(&self) -> &str;

    /// Cheap probe run before [`create`](Self::create). Providers that can
    /// rule a request out without doing real work should override it.
    fn is_supported(&self, _input: &I) -> bool {
        true
    }

    /// Attempt to satisfy `input`.
    ///
    /// Must not panic; `None` means "not applicable, try the next provider".
    fn create(&self, input: &I) -> Option<Self::Output>;
}

/// Shared handle to a registered provider.
pub type ProviderRef<I, O> = Arc<dyn Provider<I, Output = O>>;

struct Registration<I: ?Sized, O> {
    provider: ProviderRef<I, O>,
    priority: i32,
}

impl<I: ?Sized, O> Clone for Registration<I, O> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            priority: self.priority,
        }
    }
}

/// Registry of providers ordered by descending priority.
///
/// Providers with equal priority keep their registration order. Mutations
/// take the write lock; lookups snapshot the table under the read lock and
/// call providers without holding it, so a slow provider never blocks
/// registration.
pub struct ServiceRegistry<I: ?Sized, O> {
    providers: RwLock<Vec<Registration<I, O>>>,
}

impl<I: ?Sized, O> Default for ServiceRegistry<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ?Sized, O> ServiceRegistry<I, O> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
        }
    }

    /// Register `provider` with the given priority (higher is preferred).
    ///
    /// Registering the same provider instance twice is a no-op and returns
    /// `false`; the existing priority is kept.
    pub fn register(&self, provider: ProviderRef<I, O>, priority: i32) -> bool {
        let mut providers = self.providers.write();

        if providers
            .iter()
            .any(|r| same_provider(&r.provider, &provider))
        {
            return false;
        }

        // Insert after every entry of equal or higher priority
        let index = providers
            .iter()
            .position(|r| r.priority < priority)
            .unwrap_or(providers.len());

        debug!(
            provider = provider.name(),
            priority,
            position = index,
            "Registered provider"
        );

        providers.insert(index, Registration { provider, priority });
        true
    }

    /// Remove `provider`. Returns `false` if it was not registered.
    pub fn unregister(&self, provider: &ProviderRef<I, O>) -> bool {
        let mut providers = self.providers.write();
        match providers
            .iter()
            .position(|r| same_provider(&r.provider, provider))
        {
            Some(index) => {
                let removed = providers.remove(index);
                debug!(provider = removed.provider.name(), "Unregistered provider");
                true
            }
            None => false,
        }
    }

    /// Ask each provider in priority order to satisfy `input`.
    ///
    /// Returns the first `Some` result, or `None` when no provider applies.
    pub fn create(&self, input: &I) -> Option<O> {
        self.create_with_hint(input, None)
    }

    /// Like [`create`](Self::create), but when `hint` is given only providers
    /// whose [`Provider::name`] equals it are consulted.
    pub fn create_with_hint(&self, input: &I, hint: Option<&str>) -> Option<O> {
        self.snapshot()
            .iter()
            .filter(|r| hint.map_or(true, |h| r.provider.name() == h))
            .filter(|r| r.provider.is_supported(input))
            .find_map(|r| r.provider.create(input))
    }

    /// Names of the providers whose probe accepts `input`, in priority order.
    pub fn supporting(&self, input: &I) -> Vec<String> {
        self.snapshot()
            .iter()
            .filter(|r| r.provider.is_supported(input))
            .map(|r| r.provider.name().to_string())
            .collect()
    }

    /// Registered providers in iteration order, with their priorities.
    pub fn providers(&self) -> Vec<(ProviderRef<I, O>, i32)> {
        self.snapshot()
            .into_iter()
            .map(|r| (r.provider, r.priority))
            .collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Returns `true` if no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// Remove every provider.
    pub fn clear(&self) {
        self.providers.write().clear();
    }

    fn snapshot(&self) -> Vec<Registration<I, O>> {
        self.providers.read().clone()
    }
}

/// Compare provider identity by data pointer; vtable pointers are not unique.
fn same_provider<I: ?Sized, O>(a: &ProviderRef<I, O>, b: &ProviderRef<I, O>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const u8,
        Arc::as_ptr(b) as *const u8,
    )
}
