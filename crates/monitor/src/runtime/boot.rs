//! Boot: logging init, config load, source probing, sink construction.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::MonitorConfig;
use crate::docker::DockerClient;
use crate::engine::filter::FilterPipeline;
use crate::engine::{EngineSettings, MonitorEngine};
use crate::notify::{self, Notifier};
use crate::remote::{RemoteDocker, SshConnectionPool};
use crate::sched::Scheduler;
use crate::source::LogSource;

/// Everything the monitoring loop needs, assembled once at startup.
pub struct App {
    pub config: MonitorConfig,
    pub scheduler: Scheduler,
    pub notifiers: Vec<Notifier>,
    pub pool: Arc<SshConnectionPool>,
}

/// Initialise the tracing / logging subsystem.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "monitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Write a default configuration file and exit.
pub fn setup(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    MonitorConfig::save_default(path)?;
    info!("Default configuration written to: {}", path);
    info!("Edit it and start the monitor without --setup");
    Ok(())
}

/// Load config, probe every configured source, and build the scheduler
/// and notification sinks. Unreachable sources are skipped with a
/// warning; only a run with zero reachable sources is an error.
pub async fn boot(path: &str) -> Result<App, Box<dyn std::error::Error>> {
    info!("Starting Docker log monitor");

    let config = MonitorConfig::load(path)?;
    info!("Loaded configuration: {}", path);

    let filter = Arc::new(FilterPipeline::new(&config));
    let settings = EngineSettings::from_config(&config);
    let pool = Arc::new(SshConnectionPool::new(config.ssh_settings.pool_size));
    let remote_docker = Arc::new(RemoteDocker::new(Arc::clone(&pool)));

    let mut engines: Vec<Arc<MonitorEngine>> = Vec::new();

    if config.local_monitoring.enabled {
        match DockerClient::new() {
            Ok(client) => {
                let source = LogSource::local(client, config.containers.clone());
                if source.probe().await {
                    info!("✓ Local Docker daemon reachable");
                    engines.push(Arc::new(MonitorEngine::new(
                        source,
                        Arc::clone(&filter),
                        settings.clone(),
                    )));
                } else {
                    warn!("Local Docker daemon not responding, local monitoring disabled");
                }
            }
            Err(e) => {
                warn!("Cannot connect to local Docker daemon: {}", e);
            }
        }
    }

    for server in &config.remote_servers {
        let source = LogSource::remote(Arc::clone(&remote_docker), server.clone());
        if source.probe().await {
            info!("✓ Remote host reachable: {}", server.label());
            engines.push(Arc::new(MonitorEngine::new(
                source,
                Arc::clone(&filter),
                settings.clone(),
            )));
        } else {
            warn!(
                "Remote host unreachable or Docker unavailable, skipping: {}",
                server.label()
            );
        }
    }

    if engines.is_empty() {
        return Err("no reachable log sources; check local_monitoring and remote_servers".into());
    }

    let notifiers = notify::build_notifiers(&config.notifications);
    if notifiers.is_empty() {
        warn!("No notification sinks enabled; qualifying errors will only appear in the log");
    }

    info!("========================================");
    info!("Monitoring {} source(s)", engines.len());
    info!("Check interval: {}s", config.check_interval);
    info!(
        "Error threshold: {} within cooldown of {}min",
        config.error_threshold, config.cooldown_minutes
    );
    info!("Press Ctrl+C to shutdown gracefully");
    info!("========================================");

    Ok(App {
        scheduler: Scheduler::new(engines),
        config,
        notifiers,
        pool,
    })
}
