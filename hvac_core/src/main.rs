use clap::Parser;
use hvac_core::config::Cli;
use hvac_core::logging;
use hvac_core::supervisor::Supervisor;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let cli = Cli::parse();
    let room_count = cli.room_count;
    let cfg = cli.build_config();
    info!(?cfg, "HVAC controller starting");

    let supervisor = Supervisor::init(cfg, room_count, "logs/rooms.json".into()).await;
    supervisor.run().await;

    info!("shutdown complete");
    Ok(())
}
