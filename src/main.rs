use color_eyre::{eyre::eyre, Result};
use opendpad::config::AppSettings;
use opendpad::controller::{forward_to_engine, CollectorHandle};
use opendpad::engine::{DpadEngineHandle, EngineCommand, EngineOutput};
use opendpad::persistence::profile_store::ProfileStore;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let settings = AppSettings::load(&AppSettings::default_path()).await?;
    let store = match &settings.profile_path {
        Some(path) => ProfileStore::new(path),
        None => ProfileStore::default_location(),
    };
    info!("Using profile {}", store.path().display());
    let profile = store.load_or_default().await;

    let mut engine_handle = DpadEngineHandle::new("main".to_string());
    let (mut output_rx, command_tx) = engine_handle
        .start(&profile, settings.engine)
        .map_err(|e| eyre!("Failed to start dpad engine: {}", e))?;

    let (raw_tx, raw_rx) = mpsc::channel(settings.engine.channel_capacity);
    let collector = CollectorHandle::spawn(Some(settings.collector.clone()), raw_tx);
    let forwarder = tokio::spawn(forward_to_engine(raw_rx, command_tx.clone()));

    let output_logger = tokio::spawn(async move {
        while let Some(output) = output_rx.recv().await {
            match output {
                EngineOutput::Button {
                    set,
                    dpad,
                    transition,
                    slots,
                } => info!(
                    "Set {} dpad {}: {} {} ({} slots)",
                    set + 1,
                    dpad + 1,
                    transition.button,
                    if transition.active { "pressed" } else { "released" },
                    slots.len()
                ),
                EngineOutput::Notification { set, dpad, event } => {
                    debug!("Set {} dpad {}: {:?}", set + 1, dpad + 1, event)
                }
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for ctrl-c: {}", e))?;
    info!("Shutting down");

    let (response_tx, response_rx) = oneshot::channel();
    if command_tx
        .send(EngineCommand::Snapshot { response_tx })
        .await
        .is_ok()
    {
        match response_rx.await {
            Ok(snapshot) => {
                if let Err(e) = store.save(&snapshot).await {
                    error!("Failed to save profile: {}", e);
                }
            }
            Err(e) => warn!("No profile snapshot received: {}", e),
        }
    }

    drop(command_tx);
    engine_handle
        .shutdown()
        .await
        .map_err(|e| eyre!("Engine shutdown failed: {}", e))?;

    forwarder.abort();
    if let Err(e) = collector.join().await {
        warn!("Collector stopped with error: {}", e);
    }
    let _ = output_logger.await;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
