// Tick-driven thermal model: advances every room's current_temp, accrues
// AC fees while serving, and evaluates hysteresis to drive the dispatcher.
use hvac_protocol::{Mode, RoomState, RoomStatus};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::store::RoomStore;

enum Demand {
    Request,
    Release,
}

pub struct Simulator {
    store: RoomStore,
    dispatcher: Arc<Dispatcher>,
    cfg: Config,
}

impl Simulator {
    pub fn new(store: RoomStore, dispatcher: Arc<Dispatcher>, cfg: Config) -> Self {
        Self { store, dispatcher, cfg }
    }

    /// Advance every room by `dt`. A panic while updating one room is
    /// isolated — it is logged, and the remaining rooms still get ticked.
    pub fn tick(&self, dt: Duration) {
        for room_id in self.store.room_ids() {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| self.update_room(&room_id, dt)));
            if result.is_err() {
                error!(room = %room_id, "simulator: room update panicked, skipping this tick");
            }
        }
    }

    fn update_room(&self, room_id: &str, dt: Duration) {
        let dt_min = dt.as_secs_f64() / 60.0;
        let mut needs_force_idle = false;
        let mut demand = None;

        {
            let mut r = match self.store.rooms().get_mut(room_id) {
                Some(r) => r,
                None => return,
            };

            if !r.is_on {
                Self::drift_toward_ambient(&mut r, self.cfg.ambient, self.cfg.recovery, dt_min);
                needs_force_idle = r.status != RoomStatus::Idle;
            } else {
                match r.status {
                    RoomStatus::Serving => {
                        Self::advance_active(&mut r, self.cfg.delta(r.fan_speed), dt_min);
                        let fee_delta = self.cfg.rate(r.fan_speed) * dt_min;
                        r.fee += fee_delta;
                        r.total_fee += fee_delta;
                    }
                    RoomStatus::Idle | RoomStatus::Waiting => {
                        Self::drift_toward_ambient(&mut r, self.cfg.ambient, self.cfg.recovery, dt_min);
                    }
                }
                demand = Self::evaluate_hysteresis(&r, self.cfg.hyst);
            }
        }

        if needs_force_idle {
            // Safety net: is_on=false should already have released the room
            // via PowerOff. If it hasn't (internal inconsistency), self-heal
            // by releasing through the dispatcher rather than poking status
            // directly, so queues stay consistent with reality.
            self.dispatcher.release(room_id);
        }

        match demand {
            Some(Demand::Request) => {
                self.dispatcher.request(room_id);
            }
            Some(Demand::Release) => {
                self.dispatcher.release(room_id);
            }
            None => {}
        }
    }

    /// Active conditioning supersedes passive drift: clamp so the unit
    /// cannot overshoot target_temp.
    fn advance_active(r: &mut RoomState, delta_per_min: f64, dt_min: f64) {
        let step = delta_per_min * dt_min;
        r.current_temp = match r.mode {
            Mode::Cool => (r.current_temp - step).max(r.target_temp),
            Mode::Heat => (r.current_temp + step).min(r.target_temp),
        };
    }

    /// Passive drift toward ambient, clamped so it never crosses ambient.
    fn drift_toward_ambient(r: &mut RoomState, ambient: f64, recovery_per_min: f64, dt_min: f64) {
        let step = recovery_per_min * dt_min;
        if r.current_temp > ambient {
            r.current_temp = (r.current_temp - step).max(ambient);
        } else if r.current_temp < ambient {
            r.current_temp = (r.current_temp + step).min(ambient);
        }
    }

    fn evaluate_hysteresis(r: &RoomState, hyst: f64) -> Option<Demand> {
        let serving = r.status == RoomStatus::Serving;
        let demand = match r.mode {
            Mode::Cool => {
                (serving && r.current_temp > r.target_temp)
                    || (!serving && r.current_temp >= r.target_temp + hyst)
            }
            Mode::Heat => {
                (serving && r.current_temp < r.target_temp)
                    || (!serving && r.current_temp <= r.target_temp - hyst)
            }
        };

        if demand && r.status == RoomStatus::Idle {
            Some(Demand::Request)
        } else if !demand && matches!(r.status, RoomStatus::Serving | RoomStatus::Waiting) {
            Some(Demand::Release)
        } else {
            None
        }
    }
}
