// Thin external interface: the four control calls plus checkout. No
// HTTP/JSON here — that surface is a separate, out-of-scope wrapper; this
// module is what it would call into.
use hvac_protocol::{mode_range, FanSpeed, HvacError, HvacResult, Mode};
use std::sync::Arc;

use crate::billing;
use crate::dispatcher::Dispatcher;
use crate::store::RoomStore;
use crate::Config;

#[derive(Clone)]
pub struct HvacApi {
    store: RoomStore,
    dispatcher: Arc<Dispatcher>,
    cfg: Config,
}

impl HvacApi {
    pub fn new(store: RoomStore, dispatcher: Arc<Dispatcher>, cfg: Config) -> Self {
        Self { store, dispatcher, cfg }
    }

    pub fn power_on(&self, room_id: &str) -> HvacResult<()> {
        self.require_known(room_id)?;
        if let Some(mut r) = self.store.rooms().get_mut(room_id) {
            r.is_on = true;
        }
        self.dispatcher.request(room_id);
        Ok(())
    }

    pub fn power_off(&self, room_id: &str) -> HvacResult<()> {
        self.require_known(room_id)?;
        self.dispatcher.release(room_id);
        if let Some(mut r) = self.store.rooms().get_mut(room_id) {
            r.is_on = false;
        }
        Ok(())
    }

    /// Re-evaluates priority: a speed change is the only setpoint change
    /// that re-enters scheduling.
    pub fn set_fan_speed(&self, room_id: &str, speed: FanSpeed) -> HvacResult<()> {
        self.require_known(room_id)?;
        let is_on = {
            let mut r = self
                .store
                .rooms()
                .get_mut(room_id)
                .ok_or_else(|| HvacError::UnknownRoom(room_id.to_string()))?;
            r.fan_speed = speed;
            r.is_on
        };
        if is_on {
            self.dispatcher.request(room_id);
        }
        Ok(())
    }

    /// Does not call Request: target changes must not reset wait timers.
    pub fn set_target(&self, room_id: &str, mode: Mode, temp: f64) -> HvacResult<()> {
        self.require_known(room_id)?;
        let range = mode_range(mode, self.cfg.range_cool, self.cfg.range_heat);
        if !range.contains(temp) {
            return Err(HvacError::InvalidSetpoint(format!(
                "target {temp} out of range [{}, {}] for mode {mode:?}",
                range.min(),
                range.max()
            )));
        }
        if let Some(mut r) = self.store.rooms().get_mut(room_id) {
            r.mode = mode;
            r.target_temp = temp;
        }
        Ok(())
    }

    pub async fn checkout_reset(&self, room_id: &str) -> HvacResult<()> {
        billing::checkout_reset(&self.store, &self.dispatcher, room_id).await
    }

    /// Force a write-through snapshot now, instead of waiting for the
    /// supervisor's periodic best-effort write. `CoreError` composes into
    /// `HvacError::Storage` here — this is the one boundary where a storage
    /// failure is surfaced to a caller rather than logged and swallowed.
    pub async fn snapshot_now(&self) -> HvacResult<()> {
        self.store.snapshot().await.map_err(HvacError::from)
    }

    fn require_known(&self, room_id: &str) -> HvacResult<()> {
        if self.store.contains(room_id) {
            Ok(())
        } else {
            Err(HvacError::UnknownRoom(room_id.to_string()))
        }
    }
}
