use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use shelly_exporter::{
    actors::scheduler::{Cadence, Scheduler},
    api::{ApiConfig, ApiState, spawn_api_server},
    config::{Config, read_config_file},
    discovery::{DiscoveryService, ServiceFilter, mdns::MdnsBrowser},
    observations::ObservationStore,
    registry::DeviceRegistry,
    sampler::HttpSampler,
    util::{CONFIG_PATH_ENV, get_default_config_path},
};
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short, long, env = CONFIG_PATH_ENV, default_value_t = get_default_config_path())]
    file: String,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_targets(vec![
        ("shelly_exporter", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = read_config_file(&args.file)?;
    init(config.level_filter());
    trace!("started with args: {args:?}");

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr()?;

    let registry = DeviceRegistry::new();
    for device in &config.devices {
        registry.add(device.clone()).await;
    }
    debug!("seeded {} devices from config", registry.count().await);

    let browser = MdnsBrowser::on_interface(&config.interface)
        .with_context(|| format!("could not start mDNS on {}", config.interface))?;
    let filter = ServiceFilter::instance_pattern(&config.service_pattern)
        .with_context(|| format!("invalid service pattern {}", config.service_pattern))?;
    let discovery = DiscoveryService::new(Arc::new(browser), filter, registry.clone());

    discovery.discover(config.discovery_timeout()).await;
    if registry.is_empty().await {
        bail!("no devices configured or discovered");
    }
    info!("monitoring {} devices", registry.count().await);

    let store = ObservationStore::new();
    let sampler = HttpSampler::new(config.request_timeout())?;

    let api = spawn_api_server(
        ApiConfig { bind_addr },
        ApiState::new(registry.clone(), store.clone()),
    )
    .await?;

    let mut scheduler = Scheduler::new(
        Cadence {
            sampling: config.sampling_interval(),
            discovery: config.discovery_interval(),
        },
        registry,
        store,
        Arc::new(sampler),
        discovery,
    )
    .with_scan_timeout(config.discovery_timeout());
    scheduler.start()?;

    tokio::signal::ctrl_c()
        .await
        .context("could not listen for ctrl-c")?;
    info!("shutting down");

    scheduler.stop().await;
    api.shutdown().await;

    Ok(())
}
