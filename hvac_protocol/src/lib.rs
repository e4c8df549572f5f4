// lib.rs — shared HVAC domain types (no scheduling logic lives here)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Timestamp = DateTime<Utc>;
pub type RoomId = String;

// =============================== Enums ======================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanSpeed {
    Low,
    Mid,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Cool,
    Heat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Idle,
    Waiting,
    Serving,
}

/// An explicit tagged value for `wait_remaining`, instead of a sentinel
/// float: a waiter is either indefinite (lost a priority fight, no slice
/// clock) or ticking down a round-robin slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WaitTimer {
    Indefinite,
    Slice(std::time::Duration),
}

impl WaitTimer {
    pub fn tick(self, dt: std::time::Duration) -> Self {
        match self {
            WaitTimer::Indefinite => WaitTimer::Indefinite,
            WaitTimer::Slice(remaining) => WaitTimer::Slice(remaining.saturating_sub(dt)),
        }
    }

    pub fn is_expired(self) -> bool {
        matches!(self, WaitTimer::Slice(d) if d.is_zero())
    }

    /// Ordering used to pick the best waiter on slot-free promotion: among
    /// equal priority, the smallest `wait_remaining` wins (closest to
    /// expiry = waited longest). `Indefinite` sorts after any finite value.
    pub fn promotion_key(self) -> std::time::Duration {
        match self {
            WaitTimer::Slice(d) => d,
            WaitTimer::Indefinite => std::time::Duration::MAX,
        }
    }
}

// =============================== Errors =====================================

#[derive(Error, Debug)]
pub enum HvacError {
    #[error("unknown room: {0}")]
    UnknownRoom(RoomId),
    #[error("invalid setpoint: {0}")]
    InvalidSetpoint(String),
    #[error("storage: {0}")]
    Storage(String),
}

pub type HvacResult<T> = Result<T, HvacError>;

// ============================== RoomState ===================================

/// The canonical per-room record. Mutated by the dispatcher (scheduling
/// fields) and the simulator (thermal/fee fields) under the dispatcher's
/// mutex / the room's DashMap shard; setpoint fields are mutated by
/// external control calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomState {
    pub room_id: RoomId,

    // Setpoint inputs
    pub is_on: bool,
    pub mode: Mode,
    pub fan_speed: FanSpeed,
    pub target_temp: f64,

    // Physical state
    pub current_temp: f64,

    // Scheduling state
    pub status: RoomStatus,
    pub service_time: std::time::Duration,
    pub wait_remaining: Option<WaitTimer>,

    // Fee
    pub fee: f64,
    pub total_fee: f64,
}

impl RoomState {
    pub fn new(room_id: impl Into<RoomId>, ambient: f64) -> Self {
        Self {
            room_id: room_id.into(),
            is_on: false,
            mode: Mode::Cool,
            fan_speed: FanSpeed::Low,
            target_temp: ambient,
            current_temp: ambient,
            status: RoomStatus::Idle,
            service_time: std::time::Duration::ZERO,
            wait_remaining: None,
            fee: 0.0,
            total_fee: 0.0,
        }
    }
}

// ============================ Config values =================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempRange {
    pub min_milli: i64,
    pub max_milli: i64,
}

impl TempRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min_milli: (min * 1000.0).round() as i64,
            max_milli: (max * 1000.0).round() as i64,
        }
    }

    pub fn contains(&self, temp: f64) -> bool {
        let t = (temp * 1000.0).round() as i64;
        t >= self.min_milli && t <= self.max_milli
    }

    pub fn min(&self) -> f64 {
        self.min_milli as f64 / 1000.0
    }

    pub fn max(&self) -> f64 {
        self.max_milli as f64 / 1000.0
    }
}

pub fn mode_range(mode: Mode, range_cool: TempRange, range_heat: TempRange) -> TempRange {
    match mode {
        Mode::Cool => range_cool,
        Mode::Heat => range_heat,
    }
}
