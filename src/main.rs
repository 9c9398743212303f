use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use watchsync::config::{Args, Config};
use watchsync::engine::SyncEngine;
use watchsync::remote;
use watchsync::shutdown::Shutdown;
use watchsync::transport::{HttpTransport, Transport};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = match Config::resolve(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let transport = HttpTransport::new(config.url.clone(), config.timeout)?;
    if let Err(e) = transport.probe() {
        error!("Remote store {} is unreachable: {}", config.url, e);
        std::process::exit(1);
    }
    info!("Connected to {}", config.url);

    if let Some(receive_dir) = &config.receive_dir {
        if args.no_seed {
            info!("Skipping initial sync into {:?}", receive_dir);
        } else if let Err(e) = remote::seed(&transport, receive_dir, args.progress) {
            warn!("Initial sync from {} failed: {}", config.url, e);
        }
    }

    let shutdown = Shutdown::new();
    shutdown.register_signals()?;

    let mut engine = SyncEngine::from_config(&config, transport)?.with_shutdown(shutdown);

    if args.once {
        let report = engine.run_cycle()?;
        info!(
            "Sync completed: {} uploaded, {} deleted, {} unchanged, {} failed.",
            report.uploaded, report.deleted, report.unchanged, report.failed
        );
        if report.failed > 0 {
            std::process::exit(1);
        }
        return Ok(());
    }

    engine.run();
    Ok(())
}
