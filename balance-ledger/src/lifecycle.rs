//! Host lifecycle hooks
//!
//! The host drives the ledger through [`LifecycleHooks`]:
//!
//! - `on_server_starting` builds the service on first start and installs it
//!   in the registry; later starts only rebind it
//! - `on_world_load` rebinds the service when the primary server-side world
//!   loads

use crate::{
    error::Result,
    metrics::Metrics,
    registry::LedgerRegistry,
    service::LedgerService,
    world::{ActiveWorld, World},
};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

/// Lifecycle events the host reports to the ledger
pub trait LifecycleHooks {
    /// Server is starting; `host` knows the active world
    fn on_server_starting(&self, host: &dyn ActiveWorld) -> Result<()>;

    /// A world finished loading
    fn on_world_load(&self, world: Arc<dyn World>);
}

/// Wires the ledger service into a registry as host events arrive
#[derive(Debug)]
pub struct LedgerLifecycle<'r> {
    registry: &'r LedgerRegistry,
    service: OnceLock<Arc<LedgerService>>,
    metrics: Option<Arc<Metrics>>,
    // Held across check-then-install so concurrent startups build one service
    startup: Mutex<()>,
}

impl<'r> LedgerLifecycle<'r> {
    /// Lifecycle that installs into `registry`
    pub fn new(registry: &'r LedgerRegistry) -> Self {
        Self {
            registry,
            service: OnceLock::new(),
            metrics: None,
            startup: Mutex::new(()),
        }
    }

    /// Attach metrics to the service built at startup
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Service built at first startup
    pub fn service(&self) -> Option<&Arc<LedgerService>> {
        self.service.get()
    }

    fn build_service(&self, world: Option<Arc<dyn World>>) -> LedgerService {
        let service = match world {
            Some(world) => LedgerService::new(world),
            None => {
                tracing::warn!("No active world at startup; ledger starts unbound");
                LedgerService::unbound()
            }
        };
        match &self.metrics {
            Some(metrics) => service.with_metrics(metrics.clone()),
            None => service,
        }
    }
}

impl LifecycleHooks for LedgerLifecycle<'_> {
    fn on_server_starting(&self, host: &dyn ActiveWorld) -> Result<()> {
        let active = host.active_world();
        let _startup = self.startup.lock();

        if let Some(service) = self.service.get() {
            match active {
                Some(world) => service.set_world(world),
                None => {
                    tracing::warn!("No active world on restart; ledger unbound");
                    service.unbind();
                }
            }
            return Ok(());
        }

        let service = Arc::new(self.build_service(active));
        self.registry.set_instance(service.clone())?;
        if self.service.set(service).is_err() {
            // Unreachable while `startup` is held; the registry already has it
            tracing::error!("Ledger service installed twice");
        }
        Ok(())
    }

    fn on_world_load(&self, world: Arc<dyn World>) {
        if world.is_remote() || !world.is_primary() {
            tracing::debug!(world = %world.id(), "Ignoring non-primary world load");
            return;
        }

        match self.service.get() {
            Some(service) => service.set_world(world),
            None => tracing::warn!(
                world = %world.id(),
                "World loaded before server start; ledger not yet built"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        service::LedgerApi,
        types::{PlayerId, WorldId},
        world::MemoryWorld,
    };

    #[derive(Default)]
    struct TestHost {
        active: Mutex<Option<Arc<dyn World>>>,
    }

    impl TestHost {
        fn load(&self, world: Arc<dyn World>) {
            *self.active.lock() = Some(world);
        }
    }

    impl ActiveWorld for TestHost {
        fn active_world(&self) -> Option<Arc<dyn World>> {
            self.active.lock().clone()
        }
    }

    #[test]
    fn test_startup_installs_service() {
        let registry = LedgerRegistry::new();
        let lifecycle = LedgerLifecycle::new(&registry);
        let host = TestHost::default();
        let world: Arc<dyn World> = Arc::new(MemoryWorld::new("world"));
        host.load(world.clone());

        assert!(!registry.is_initialized());
        lifecycle.on_server_starting(&host).unwrap();
        assert!(registry.is_initialized());

        let player = PlayerId::random();
        assert!(registry.add_balance(player, 10.0).unwrap());
        assert_eq!(world.balances().balance(&player), 10.0);
    }

    #[test]
    fn test_restart_rebinds_instead_of_reinstalling() {
        let registry = LedgerRegistry::new();
        let lifecycle = LedgerLifecycle::new(&registry);
        let host = TestHost::default();
        host.load(Arc::new(MemoryWorld::new("world")));
        lifecycle.on_server_starting(&host).unwrap();
        let first = lifecycle.service().unwrap().clone();

        host.load(Arc::new(MemoryWorld::new("world_b")));
        lifecycle.on_server_starting(&host).unwrap();

        assert!(Arc::ptr_eq(&first, lifecycle.service().unwrap()));
        assert_eq!(first.world_id(), Some(WorldId::new("world_b")));
    }

    #[test]
    fn test_restart_without_world_unbinds() {
        let registry = LedgerRegistry::new();
        let lifecycle = LedgerLifecycle::new(&registry);
        let host = TestHost::default();
        host.load(Arc::new(MemoryWorld::new("world")));
        lifecycle.on_server_starting(&host).unwrap();

        let player = PlayerId::random();
        assert!(registry.add_balance(player, 7.0).unwrap());

        *host.active.lock() = None;
        lifecycle.on_server_starting(&host).unwrap();

        assert!(lifecycle.service().unwrap().world_id().is_none());
        assert_eq!(registry.balance(&player).unwrap(), 0.0);
        assert!(!registry.add_balance(player, 1.0).unwrap());
    }

    #[test]
    fn test_concurrent_startup_installs_once() {
        let registry = LedgerRegistry::new();
        let lifecycle = LedgerLifecycle::new(&registry);
        let host = TestHost::default();
        host.load(Arc::new(MemoryWorld::new("world")));

        let results: Vec<Result<()>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| lifecycle.on_server_starting(&host)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|r| r.is_ok()));
        let service = lifecycle.service().unwrap();
        let player = PlayerId::random();
        assert!(service.add_balance(player, 3.0));
        assert_eq!(registry.balance(&player).unwrap(), 3.0);
    }

    #[test]
    fn test_world_load_rebinds_primary_only() {
        let registry = LedgerRegistry::new();
        let lifecycle = LedgerLifecycle::new(&registry);
        let host = TestHost::default();
        host.load(Arc::new(MemoryWorld::new("world")));
        lifecycle.on_server_starting(&host).unwrap();
        let service = lifecycle.service().unwrap().clone();

        lifecycle.on_world_load(Arc::new(MemoryWorld::new("world_nether").secondary()));
        lifecycle.on_world_load(Arc::new(MemoryWorld::new("client").remote()));
        assert_eq!(service.world_id(), Some(WorldId::new("world")));

        lifecycle.on_world_load(Arc::new(MemoryWorld::new("world2")));
        assert_eq!(service.world_id(), Some(WorldId::new("world2")));
    }

    #[test]
    fn test_world_load_before_startup_is_ignored() {
        let registry = LedgerRegistry::new();
        let lifecycle = LedgerLifecycle::new(&registry);

        lifecycle.on_world_load(Arc::new(MemoryWorld::new("world")));
        assert!(lifecycle.service().is_none());
        assert!(!registry.is_initialized());
    }

    #[test]
    fn test_startup_without_world_is_unbound() {
        let registry = LedgerRegistry::new();
        let lifecycle = LedgerLifecycle::new(&registry);
        lifecycle.on_server_starting(&TestHost::default()).unwrap();

        let player = PlayerId::random();
        assert!(!registry.add_balance(player, 5.0).unwrap());
        assert_eq!(registry.balance(&player).unwrap(), 0.0);

        lifecycle.on_world_load(Arc::new(MemoryWorld::new("world")));
        assert!(registry.add_balance(player, 5.0).unwrap());
    }

    #[test]
    fn test_foreign_instance_blocks_startup() {
        let registry = LedgerRegistry::new();
        registry
            .set_instance(Arc::new(LedgerService::unbound()))
            .unwrap();

        let lifecycle = LedgerLifecycle::new(&registry);
        let err = lifecycle.on_server_starting(&TestHost::default()).unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized));
        assert!(lifecycle.service().is_none());
    }

    #[test]
    fn test_service_answers_through_trait() {
        let registry = LedgerRegistry::new();
        let lifecycle = LedgerLifecycle::new(&registry);
        let host = TestHost::default();
        host.load(Arc::new(MemoryWorld::new("world")));
        lifecycle.on_server_starting(&host).unwrap();

        let service = lifecycle.service().unwrap();
        let player = PlayerId::random();
        service.add_balance(player, 2.5);
        assert_eq!(registry.balance(&player).unwrap(), 2.5);
    }
}
