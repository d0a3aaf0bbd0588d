use color_eyre::{eyre::eyre, Result};
use padstate::config::{default_config_path, InputConfig};
use padstate::controller::{ControllerHandle, ControllerSettings, InputSnapshot, LogicalInput};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = load_config().await;
    info!("Initializing controller with config: {:?}", config);

    let controller = ControllerHandle::spawn(Some(ControllerSettings::from(&config)))
        .map_err(|e| eyre!("Failed to spawn controller: {}", e))?;
    let mut snapshots = controller.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("Input processor stopped");
                    break;
                }
                report(&snapshots.borrow_and_update());
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}

// Logs what a gameplay loop would react to
fn report(snapshot: &InputSnapshot) {
    if snapshot.query_down(LogicalInput::ButtonSouth) {
        info!("BUTTON SOUTH KEY DOWN");
    }
    if snapshot.query_held(LogicalInput::ButtonSouth) {
        info!("BUTTON SOUTH KEY HELD");
    }
    if snapshot.query_up(LogicalInput::ButtonSouth) {
        info!("BUTTON SOUTH KEY UP");
    }
    let left = snapshot.left_stick;
    if left.angled != glam::Vec2::ZERO {
        info!(
            "Left stick raw=({:.2},{:.2}) angled=({:.2},{:.2})",
            left.raw.x, left.raw.y, left.angled.x, left.angled.y
        );
    }
}

async fn load_config() -> InputConfig {
    let Some(path) = default_config_path() else {
        warn!("No config directory available, using defaults");
        return InputConfig::default();
    };
    match InputConfig::load_or_create(&path).await {
        Ok(config) => config,
        Err(e) => {
            warn!("{}; using defaults", e);
            InputConfig::default()
        }
    }
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
