//! depthcast-server: entry point.
//!
//! ```text
//! depthcast-server                  Serve on the configured port
//! depthcast-server 9100             Serve on port 9100
//! depthcast-server --config <path>  Load a custom config TOML
//! depthcast-server --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use depthcast_server::config::ServerConfig;
use depthcast_server::service::DepthcastService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "depthcast-server", about = "Depth sensor broadcast service")]
struct Cli {
    /// Listening port; overrides the config file.
    port: Option<u16>,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "depthcast.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ServerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Loaded before tracing is up; the outcome is logged below.
    let loaded = ServerConfig::load(&cli.config);
    let mut config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.network.port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("depthcast-server v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(Some(_)) => info!("config loaded from {}", cli.config.display()),
        Ok(None) => info!("no config at {}; using defaults", cli.config.display()),
        Err(e) => warn!("{e}; using defaults"),
    }
    info!(
        "sensor: {}x{} @ {} fps",
        config.sensor.width, config.sensor.height, config.sensor.fps
    );
    info!(
        "pipeline: stride {}, keyframe every {} frames",
        config.pipeline.stride, config.pipeline.keyframe_interval
    );

    let service = DepthcastService::new(config);
    let stop = service.stop_handle();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.cancel();
    });

    service.run().await?;

    Ok(())
}
