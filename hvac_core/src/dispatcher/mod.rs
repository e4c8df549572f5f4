// The scheduler: owns the bounded serving queue S and the waiting queue W,
// and is the only code allowed to change a room's `status`, `service_time`,
// or `wait_remaining`. Everything here runs under a single process-wide
// mutex (`queues`); per-room field reads/writes go through the store's
// DashMap, which gives per-room locking without serializing unrelated rooms.
use hvac_protocol::{FanSpeed, RoomId, RoomStatus, WaitTimer};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::logging::csv;
use crate::store::RoomStore;

/// Fire-and-forget CSV audit line. Called from sync code that may or may not
/// be running inside a tokio runtime (property tests drive the dispatcher
/// directly without entering one), so this is a no-op outside of one rather
/// than a hard dependency.
fn log_event(room_id: &str, event: &str, detail: String) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        let room_id = room_id.to_string();
        let event = event.to_string();
        handle.spawn(async move {
            csv::log_dispatch_event(&room_id, &event, &detail).await;
        });
    }
}

/// What a scheduling call actually did, for logging and tests — this is an
/// observation of the decision, not a second source of truth.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Admitted,
    Preempted { victim: RoomId },
    Queued,
    Released,
    NoOp,
    UnknownRoom,
}

struct Queues {
    serving: Vec<RoomId>,
    waiting: Vec<(RoomId, WaitTimer)>,
}

pub struct Dispatcher {
    store: RoomStore,
    cfg: Config,
    queues: Mutex<Queues>,
}

impl Dispatcher {
    pub fn new(store: RoomStore, cfg: Config) -> Self {
        Self {
            store,
            cfg,
            queues: Mutex::new(Queues {
                serving: Vec::new(),
                waiting: Vec::new(),
            }),
        }
    }

    /// Rebuild S/W from the persisted room statuses. Must run before any
    /// external Request/Release call or tick.
    pub fn reconstruct(store: RoomStore, cfg: Config) -> Self {
        let mut serving = Vec::new();
        let mut waiting = Vec::new();
        for id in store.room_ids() {
            if let Ok(r) = store.get(&id) {
                match r.status {
                    RoomStatus::Serving => serving.push(id),
                    RoomStatus::Waiting => {
                        let timer = r.wait_remaining.unwrap_or(WaitTimer::Indefinite);
                        waiting.push((id, timer));
                    }
                    RoomStatus::Idle => {}
                }
            }
        }
        info!(
            serving = serving.len(),
            waiting = waiting.len(),
            "dispatcher reconstructed from persisted room state"
        );
        let dispatcher = Self {
            store,
            cfg,
            queues: Mutex::new(Queues { serving, waiting }),
        };

        // Self-heal a stale or partial snapshot: a crash between freeing a
        // slot and promoting its replacement can persist S under capacity
        // while W is non-empty. Fill every free slot from W the same way a
        // live Release would, so a restart never leaves a waiter stranded
        // behind an empty serving slot.
        {
            let mut q = dispatcher.queues.lock();
            while q.serving.len() < dispatcher.cfg.capacity && !q.waiting.is_empty() {
                let before = q.serving.len();
                dispatcher.promote_from_waiting(&mut q);
                if q.serving.len() == before {
                    break;
                }
            }
        }

        dispatcher
    }

    pub fn store(&self) -> &RoomStore {
        &self.store
    }

    fn priority_of(&self, room_id: &str) -> u8 {
        self.store
            .get(room_id)
            .map(|r| self.cfg.prio(r.fan_speed))
            .unwrap_or(0)
    }

    fn fan_speed_of(&self, room_id: &str) -> FanSpeed {
        self.store
            .get(room_id)
            .map(|r| r.fan_speed)
            .unwrap_or(FanSpeed::Low)
    }

    fn service_time_of(&self, room_id: &str) -> Duration {
        self.store
            .get(room_id)
            .map(|r| r.service_time)
            .unwrap_or(Duration::ZERO)
    }

    fn set_serving(&self, room_id: &str) {
        if let Some(mut r) = self.store.rooms().get_mut(room_id) {
            r.status = RoomStatus::Serving;
            r.service_time = Duration::ZERO;
            r.wait_remaining = None;
        }
    }

    fn set_waiting(&self, room_id: &str, timer: WaitTimer) {
        if let Some(mut r) = self.store.rooms().get_mut(room_id) {
            r.status = RoomStatus::Waiting;
            r.wait_remaining = Some(timer);
        }
    }

    fn clear_room(&self, room_id: &str) {
        if let Some(mut r) = self.store.rooms().get_mut(room_id) {
            r.status = RoomStatus::Idle;
            r.service_time = Duration::ZERO;
            r.wait_remaining = None;
        }
    }

    /// The room wants service now.
    pub fn request(&self, room_id: &str) -> DispatchOutcome {
        if !self.store.contains(room_id) {
            return DispatchOutcome::UnknownRoom;
        }
        let mut q = self.queues.lock();
        let status = self.store.get(room_id).map(|r| r.status).unwrap_or(RoomStatus::Idle);
        match status {
            RoomStatus::Serving => DispatchOutcome::NoOp,
            RoomStatus::Waiting => {
                // Re-evaluation: priority may have changed (fan speed
                // upgrade). Remove then re-enter the full decision — this
                // intentionally resets the time-slice clock.
                q.waiting.retain(|(id, _)| id != room_id);
                self.enter_decision(&mut q, room_id)
            }
            RoomStatus::Idle => self.enter_decision(&mut q, room_id),
        }
    }

    fn enter_decision(&self, q: &mut Queues, room_id: &str) -> DispatchOutcome {
        if q.serving.len() < self.cfg.capacity {
            q.serving.push(room_id.to_string());
            self.set_serving(room_id);
            debug!(room = room_id, "dispatcher: admitted to empty slot");
            log_event(room_id, "admitted", "empty_slot".to_string());
            return DispatchOutcome::Admitted;
        }

        let p_star = self.priority_of(room_id);
        let (victim_idx, p_min) = self.find_min_priority_victim(q);

        if p_star > p_min {
            let victim = q.serving.remove(victim_idx);
            self.set_waiting(&victim, WaitTimer::Indefinite);
            q.waiting.push((victim.clone(), WaitTimer::Indefinite));
            q.serving.push(room_id.to_string());
            self.set_serving(room_id);
            info!(room = room_id, victim = %victim, "dispatcher: preempted by priority");
            log_event(room_id, "preempted", format!("victim={victim}"));
            return DispatchOutcome::Preempted { victim };
        }

        if p_star == p_min {
            q.waiting.push((room_id.to_string(), WaitTimer::Slice(self.cfg.slice)));
            self.set_waiting(room_id, WaitTimer::Slice(self.cfg.slice));
            debug!(room = room_id, "dispatcher: queued for round-robin slice");
            log_event(room_id, "queued", "equal_priority_slice".to_string());
            return DispatchOutcome::Queued;
        }

        q.waiting.push((room_id.to_string(), WaitTimer::Indefinite));
        self.set_waiting(room_id, WaitTimer::Indefinite);
        debug!(room = room_id, "dispatcher: queued, lower priority than all servers");
        log_event(room_id, "queued", "lower_priority".to_string());
        DispatchOutcome::Queued
    }

    /// Among serving rooms, the lowest priority; ties broken by the largest
    /// accumulated service_time (it has benefited most recently).
    fn find_min_priority_victim(&self, q: &Queues) -> (usize, u8) {
        let mut best_idx = 0;
        let mut best_prio = u8::MAX;
        let mut best_service = Duration::ZERO;
        for (idx, id) in q.serving.iter().enumerate() {
            let prio = self.priority_of(id);
            let service = self.service_time_of(id);
            let better = prio < best_prio || (prio == best_prio && service > best_service);
            if idx == 0 || better {
                best_idx = idx;
                best_prio = prio;
                best_service = service;
            }
        }
        (best_idx, best_prio)
    }

    /// Among serving rooms at exactly `prio`, the one with the largest
    /// service_time (round-robin victim for an expired equal-priority slice).
    fn find_same_priority_victim(&self, q: &Queues, prio: u8) -> Option<usize> {
        let mut best_idx = None;
        let mut best_service = Duration::ZERO;
        for (idx, id) in q.serving.iter().enumerate() {
            if self.priority_of(id) != prio {
                continue;
            }
            let service = self.service_time_of(id);
            if best_idx.is_none() || service > best_service {
                best_idx = Some(idx);
                best_service = service;
            }
        }
        best_idx
    }

    /// The room no longer wants service.
    pub fn release(&self, room_id: &str) -> DispatchOutcome {
        if !self.store.contains(room_id) {
            return DispatchOutcome::UnknownRoom;
        }
        let mut q = self.queues.lock();
        let status = self.store.get(room_id).map(|r| r.status).unwrap_or(RoomStatus::Idle);
        match status {
            RoomStatus::Idle => DispatchOutcome::NoOp,
            RoomStatus::Serving => {
                q.serving.retain(|id| id != room_id);
                self.clear_room(room_id);
                self.promote_from_waiting(&mut q);
                log_event(room_id, "released", "from_serving".to_string());
                DispatchOutcome::Released
            }
            RoomStatus::Waiting => {
                q.waiting.retain(|(id, _)| id != room_id);
                self.clear_room(room_id);
                log_event(room_id, "released", "from_waiting".to_string());
                DispatchOutcome::Released
            }
        }
    }

    /// A slot is free: promote the best waiter — highest priority, ties
    /// broken by smallest wait_remaining (closest to slice expiry, i.e. has
    /// waited longest). `Indefinite` loses every tie against a finite timer.
    fn promote_from_waiting(&self, q: &mut Queues) {
        if q.serving.len() >= self.cfg.capacity || q.waiting.is_empty() {
            return;
        }
        let mut best_idx = 0;
        let mut best_prio = 0u8;
        let mut best_key = Duration::MAX;
        for (idx, (id, timer)) in q.waiting.iter().enumerate() {
            let prio = self.priority_of(id);
            let key = timer.promotion_key();
            let better = prio > best_prio || (prio == best_prio && key < best_key);
            if idx == 0 || better {
                best_idx = idx;
                best_prio = prio;
                best_key = key;
            }
        }
        let (room, _) = q.waiting.remove(best_idx);
        q.serving.push(room.clone());
        self.set_serving(&room);
        info!(room = %room, "dispatcher: promoted from waiting");
        log_event(&room, "promoted", "slot_freed".to_string());
    }

    /// Must be called periodically with the elapsed time.
    pub fn tick(&self, dt: Duration) {
        let mut q = self.queues.lock();

        // 1) advance timers for serving rooms
        for id in &q.serving {
            if let Some(mut r) = self.store.rooms().get_mut(id) {
                r.service_time += dt;
            }
        }

        // 2) advance timers for waiting rooms
        for (id, timer) in q.waiting.iter_mut() {
            *timer = timer.tick(dt);
            if let Some(mut r) = self.store.rooms().get_mut(id) {
                r.wait_remaining = Some(*timer);
            }
        }

        // 3) process time-slice expirations
        let expired: Vec<RoomId> = q
            .waiting
            .iter()
            .filter(|(_, t)| t.is_expired())
            .map(|(id, _)| id.clone())
            .collect();

        for waiter_id in expired {
            // The waiter may already have been consumed by an earlier swap
            // in this same loop (two waiters of the same priority expiring
            // in the same tick); skip if it's no longer waiting.
            if !q.waiting.iter().any(|(id, _)| id == &waiter_id) {
                continue;
            }
            let p_wait = self.priority_of(&waiter_id);
            match self.find_same_priority_victim(&q, p_wait) {
                Some(victim_idx) => {
                    let victim = q.serving.remove(victim_idx);
                    q.waiting.retain(|(id, _)| id != &waiter_id);
                    self.set_waiting(&victim, WaitTimer::Slice(self.cfg.slice));
                    q.waiting.push((victim.clone(), WaitTimer::Slice(self.cfg.slice)));
                    q.serving.push(waiter_id.clone());
                    self.set_serving(&waiter_id);
                    info!(room = %waiter_id, victim = %victim, "dispatcher: round-robin swap");
                    log_event(&waiter_id, "round_robin_swap", format!("victim={victim}"));
                }
                None => {
                    // No same-priority victim available this tick (e.g. S
                    // has been displaced by higher-priority requests since).
                    // Leave wait_remaining at 0; re-attempt next tick.
                }
            }
        }
    }

    /// Snapshot of the serving queue S, for introspection/tests/logging.
    pub fn serving_snapshot(&self) -> Vec<RoomId> {
        self.queues.lock().serving.clone()
    }

    /// Snapshot of the waiting queue W, for introspection/tests/logging.
    pub fn waiting_snapshot(&self) -> Vec<(RoomId, WaitTimer)> {
        self.queues.lock().waiting.clone()
    }
}
