//! Background providers: named surface effects loaded on first use.
//!
//! Providers register themselves in a [`ProviderRegistry`] once their module
//! is loaded. The registry only grows. [`ProviderLoader::resolve`] triggers a
//! load at most once per name at a time and then waits for that name to be
//! registered, up to a fixed timeout.

use async_trait::async_trait;
use dashmap::DashMap;
use lumo_ztmf::Meta;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tracing::{debug, warn};
use url::Url;

use crate::error::{RuntimeError, RuntimeResult};
use crate::host::CanvasHandle;

/// What a provider receives besides its canvas.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub base_url: Url,
    pub meta: Meta,
}

/// A running background effect.
#[async_trait]
pub trait BackgroundHandle: Send + Sync {
    async fn destroy(&mut self) -> RuntimeResult<()>;
}

/// Constructor of one background effect.
pub trait BackgroundProvider: Send + Sync {
    fn create(
        &self,
        canvas: CanvasHandle,
        options: ProviderOptions,
    ) -> RuntimeResult<Box<dyn BackgroundHandle>>;
}

impl<F> BackgroundProvider for F
where
    F: Fn(CanvasHandle, ProviderOptions) -> RuntimeResult<Box<dyn BackgroundHandle>> + Send + Sync,
{
    fn create(
        &self,
        canvas: CanvasHandle,
        options: ProviderOptions,
    ) -> RuntimeResult<Box<dyn BackgroundHandle>> {
        self(canvas, options)
    }
}

pub type ProviderFactory = Arc<dyn BackgroundProvider>;

/// Proof that a provider is registered under `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    name: String,
    newly_added: bool,
}

impl Registration {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// False when the name was already taken; the first factory stays.
    pub fn newly_added(&self) -> bool {
        self.newly_added
    }
}

/// Process-wide, append-only name → factory map.
pub struct ProviderRegistry {
    providers: DashMap<String, ProviderFactory>,
    revision: watch::Sender<u64>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            providers: DashMap::new(),
            revision,
        }
    }

    pub fn register(&self, name: &str, factory: ProviderFactory) -> Registration {
        let newly_added = match self.providers.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(factory);
                true
            }
        };
        if newly_added {
            debug!(provider = name, "background provider registered");
            self.revision.send_modify(|r| *r += 1);
        }
        Registration {
            name: name.to_string(),
            newly_added,
        }
    }

    pub fn get(&self, name: &str) -> Option<ProviderFactory> {
        self.providers.get(name).map(|f| Arc::clone(f.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Wait until `name` is registered. Unbounded; callers add the timeout.
    pub async fn wait_for(&self, name: &str) -> ProviderFactory {
        let mut revisions = self.revision.subscribe();
        loop {
            if let Some(factory) = self.get(name) {
                return factory;
            }
            // The sender lives as long as `self`, so this only fails if we outlive it.
            if revisions.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Loads the module of a provider. A successful load is expected to
/// register the provider, now or shortly after.
#[async_trait]
pub trait ProviderSource: Send + Sync {
    async fn load(&self, name: &str, base_url: &Url, registry: &ProviderRegistry)
        -> RuntimeResult<()>;
}

/// Providers compiled into the binary, registered when first asked for.
#[derive(Default)]
pub struct BundledProviders {
    factories: HashMap<String, ProviderFactory>,
}

impl BundledProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, factory: ProviderFactory) -> Self {
        self.factories.insert(name.to_string(), factory);
        self
    }
}

#[async_trait]
impl ProviderSource for BundledProviders {
    async fn load(
        &self,
        name: &str,
        _base_url: &Url,
        registry: &ProviderRegistry,
    ) -> RuntimeResult<()> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RuntimeError::ProviderNotFound(name.to_string()))?;
        registry.register(name, Arc::clone(factory));
        Ok(())
    }
}

/// Resolves provider names to factories, loading on demand.
pub struct ProviderLoader {
    registry: Arc<ProviderRegistry>,
    source: Arc<dyn ProviderSource>,
    in_flight: DashMap<String, Arc<OnceCell<()>>>,
    timeout: Duration,
}

impl ProviderLoader {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        source: Arc<dyn ProviderSource>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            source,
            in_flight: DashMap::new(),
            timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// The factory for `name`, or `None` when it is still missing after the
    /// timeout. A missing provider is logged, never an error.
    pub async fn resolve(&self, name: &str, base_url: &Url) -> Option<ProviderFactory> {
        if let Some(factory) = self.registry.get(name) {
            return Some(factory);
        }

        let load = self.in_flight.entry(name.to_string()).or_default().clone();

        let waited = tokio::time::timeout(self.timeout, async {
            let loaded = load
                .get_or_try_init(|| self.source.load(name, base_url, &self.registry))
                .await;
            if let Err(e) = loaded {
                warn!(provider = name, error = %e, "failed to load background provider");
                return None;
            }
            Some(self.registry.wait_for(name).await)
        })
        .await;

        match waited {
            Ok(Some(factory)) => Some(factory),
            Ok(None) => self.registry.get(name),
            Err(_) => {
                let present = self.registry.get(name);
                if present.is_none() {
                    warn!(
                        provider = name,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "background provider not registered in time"
                    );
                }
                present
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Noop;

    #[async_trait]
    impl BackgroundHandle for Noop {
        async fn destroy(&mut self) -> RuntimeResult<()> {
            Ok(())
        }
    }

    fn noop_factory() -> ProviderFactory {
        Arc::new(
            |_canvas: CanvasHandle, _options: ProviderOptions| -> RuntimeResult<Box<dyn BackgroundHandle>> {
                Ok(Box::new(Noop))
            },
        )
    }

    fn base() -> Url {
        Url::parse("https://site.test/docs/").unwrap()
    }

    /// Registers after a delay, counting how often it was asked to load.
    struct SlowSource {
        loads: Arc<AtomicUsize>,
        registry: Arc<ProviderRegistry>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ProviderSource for SlowSource {
        async fn load(&self, name: &str, _base: &Url, _registry: &ProviderRegistry) -> RuntimeResult<()> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                let registry = Arc::clone(&self.registry);
                let name = name.to_string();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    registry.register(&name, noop_factory());
                });
            }
            Ok(())
        }
    }

    fn slow_loader(delay: Option<Duration>) -> (ProviderLoader, Arc<AtomicUsize>) {
        let registry = Arc::new(ProviderRegistry::new());
        let loads = Arc::new(AtomicUsize::new(0));
        let source = SlowSource {
            loads: Arc::clone(&loads),
            registry: Arc::clone(&registry),
            delay,
        };
        let loader = ProviderLoader::new(registry, Arc::new(source), Duration::from_secs(5));
        (loader, loads)
    }

    #[test]
    fn test_registry_is_append_only() {
        let registry = ProviderRegistry::new();
        let first = noop_factory();
        assert!(!registry.contains("blob"));
        let registration = registry.register("blob", Arc::clone(&first));
        assert_eq!(registration.name(), "blob");
        assert!(registration.newly_added());
        assert!(!registry.register("blob", noop_factory()).newly_added());
        assert!(registry.contains("blob"));
        let kept = registry.get("blob").unwrap();
        assert!(Arc::ptr_eq(&kept, &first));
        assert_eq!(registry.names(), vec!["blob".to_string()]);
    }

    #[tokio::test]
    async fn test_registered_provider_resolves_without_loading() {
        let (loader, loads) = slow_loader(None);
        loader.registry().register("cubic", noop_factory());
        assert!(loader.resolve("cubic", &base()).await.is_some());
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_share_one_load() {
        let (loader, loads) = slow_loader(Some(Duration::from_millis(300)));
        let base = base();
        let (a, b) = tokio::join!(loader.resolve("blob", &base), loader.resolve("blob", &base));
        assert!(a.is_some());
        assert!(b.is_some());
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        assert!(loader.resolve("blob", &base).await.is_some());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_registered_times_out_softly() {
        let (loader, loads) = slow_loader(None);
        let started = tokio::time::Instant::now();
        let found = loader.resolve("ghost", &base()).await;
        assert!(found.is_none());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(5));
        assert!(waited < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_bundled_unknown_name_fails_fast() {
        let registry = Arc::new(ProviderRegistry::new());
        let source = BundledProviders::new().with("blob", noop_factory());
        let loader = ProviderLoader::new(registry, Arc::new(source), Duration::from_secs(5));

        assert!(loader.resolve("blob", &base()).await.is_some());
        assert!(loader.resolve("cnprtcl", &base()).await.is_none());
    }
}
