use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use ftmq_bridge::cli::Cli;
use ftmq_bridge::{Bridge, BridgeHandle, LookupTable};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup(cli.verbose)?;

    let lookup_path = cli.lookup_path();
    let table = LookupTable::load(&lookup_path)
        .await
        .map_err(|e| eyre!("Failed to load lookup table {}: {}", lookup_path.display(), e))?;

    let bridge = Bridge::new(cli.settings(), table);
    let handle = BridgeHandle::spawn(bridge);

    let report = handle
        .run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Ctrl-C received"),
                Err(e) => error!("Unable to listen for shutdown signal: {}", e),
            }
        })
        .await
        .map_err(|e| eyre!("Bridge stopped with error: {}", e))?;

    info!(
        "Relayed {} frames to the broker and {} messages to the serial port",
        report.serial.messages_published, report.broker.frames_queued
    );
    Ok(())
}

fn setup(verbose: bool) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env(if verbose { Level::DEBUG } else { Level::INFO });
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}
