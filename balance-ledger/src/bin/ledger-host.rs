//! Reference host process
//!
//! Opens the primary world save, installs the ledger in the global registry
//! and flushes dirty balances on the autosave interval until Ctrl-C.

use anyhow::Context;
use balance_ledger::{
    ActiveWorld, Config, FileWorld, LedgerLifecycle, LedgerRegistry, LifecycleHooks, Metrics,
    World,
};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

struct Host {
    world: Arc<FileWorld>,
}

impl ActiveWorld for Host {
    fn active_world(&self) -> Option<Arc<dyn World>> {
        let world: Arc<dyn World> = self.world.clone();
        Some(world)
    }
}

fn flush(world: &FileWorld, metrics: Option<&Metrics>) {
    match world.flush() {
        Ok(true) => {
            if let Some(metrics) = metrics {
                metrics.record_save();
            }
        }
        Ok(false) => {}
        Err(e) => tracing::error!(error = %e, "Autosave failed; will retry"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Economy ledger host starting");

    // Load configuration
    let config = match std::env::var("ECONOMY_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env()?,
    };

    let metrics = if config.metrics_enabled {
        Some(Arc::new(Metrics::new()?))
    } else {
        None
    };

    let world = Arc::new(
        FileWorld::open(&config, config.primary_world.as_str())
            .context("opening primary world save")?,
    );
    let host = Host {
        world: world.clone(),
    };

    let mut lifecycle = LedgerLifecycle::new(LedgerRegistry::global());
    if let Some(metrics) = &metrics {
        lifecycle = lifecycle.with_metrics(metrics.clone());
    }
    lifecycle.on_server_starting(&host)?;

    let mut autosave = interval(Duration::from_secs(config.autosave_interval_secs));
    autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = autosave.tick() => flush(&world, metrics.as_deref()),
            _ = &mut shutdown => break,
        }
    }

    tracing::info!("Shutting down; writing final save");
    world.flush().context("final save")?;
    Ok(())
}
