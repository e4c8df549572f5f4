// Billing ledger: fee/total_fee accrual happens inside the simulator's
// per-tick update (RATE[fan_speed] * dt/60 while SERVING); this module only
// owns checkout, the one external operation that touches the fee fields
// directly.
use hvac_protocol::{HvacError, HvacResult};

use crate::dispatcher::Dispatcher;
use crate::logging::csv;
use crate::store::RoomStore;

/// PowerOff the room, then zero both fee counters. `total_fee` is not
/// reset by anything else — checkout is the only path that clears it.
pub async fn checkout_reset(store: &RoomStore, dispatcher: &Dispatcher, room_id: &str) -> HvacResult<()> {
    if !store.contains(room_id) {
        return Err(HvacError::UnknownRoom(room_id.to_string()));
    }

    dispatcher.release(room_id);

    let (prev_fee, prev_total) = {
        let mut r = store
            .rooms()
            .get_mut(room_id)
            .ok_or_else(|| HvacError::UnknownRoom(room_id.to_string()))?;
        r.is_on = false;
        let prev = (r.fee, r.total_fee);
        r.fee = 0.0;
        r.total_fee = 0.0;
        prev
    };

    csv::log_fee_event(room_id, "checkout_reset", prev_fee, prev_total).await;
    Ok(())
}
