// Starts the two ticking loops, owns the single dispatcher instance,
// and coordinates cooperative shutdown.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::api::HvacApi;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::simulator::Simulator;
use crate::store::RoomStore;

pub struct Supervisor {
    pub api: HvacApi,
    dispatcher: Arc<Dispatcher>,
    store: RoomStore,
    cfg: Config,
    shutdown: Arc<AtomicBool>,
}

impl Supervisor {
    /// Loads (or initializes) the room set, reconstructs the dispatcher's
    /// queues from persisted status, and returns a ready-to-run Supervisor.
    pub async fn init(cfg: Config, room_count: usize, snapshot_path: std::path::PathBuf) -> Self {
        let store = RoomStore::load_or_init(&cfg, room_count, snapshot_path).await;
        let dispatcher = Arc::new(Dispatcher::reconstruct(store.clone(), cfg.clone()));
        let api = HvacApi::new(store.clone(), dispatcher.clone(), cfg.clone());
        Self {
            api,
            dispatcher,
            store,
            cfg,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the dispatcher tick loop and the simulator loop, then run
    /// until `shutdown()` is called or the process receives Ctrl+C.
    pub async fn run(&self) {
        let dispatcher_loop = self.spawn_dispatcher_loop();
        let simulator_loop = self.spawn_simulator_loop();

        tokio::select! {
            _ = dispatcher_loop => {},
            _ = simulator_loop => {},
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                self.shutdown.store(true, Ordering::SeqCst);
            }
        }

        // best-effort final snapshot on the way out
        self.store.snapshot_best_effort().await;
    }

    fn spawn_dispatcher_loop(&self) -> tokio::task::JoinHandle<()> {
        let dispatcher = self.dispatcher.clone();
        let tick = self.cfg.tick;
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                dispatcher.tick(tick);
            }
        })
    }

    fn spawn_simulator_loop(&self) -> tokio::task::JoinHandle<()> {
        let store = self.store.clone();
        let dispatcher = self.dispatcher.clone();
        let cfg = self.cfg.clone();
        let tick = self.cfg.tick;
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let simulator = Simulator::new(store.clone(), dispatcher, cfg);
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut snapshot_countdown = 10u32;
            loop {
                ticker.tick().await;
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                simulator.tick(tick);

                snapshot_countdown = snapshot_countdown.saturating_sub(1);
                if snapshot_countdown == 0 {
                    store.snapshot_best_effort().await;
                    snapshot_countdown = 10;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_creates_configured_room_count() {
        let cfg = crate::config::test_config();
        let sup = Supervisor::init(cfg, 5, std::path::PathBuf::from("/tmp/does-not-exist-sup.json")).await;
        assert_eq!(sup.store.room_ids().len(), 5);
    }
}
