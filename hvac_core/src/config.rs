// runtime configuration: capacity, timing, rates, ranges — all loaded once
// at startup and treated as immutable for the lifetime of the process.
use clap::Parser;
use hvac_protocol::{FanSpeed, TempRange};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub capacity: usize,
    pub tick: Duration,
    pub slice: Duration,
    pub rate_low: f64,
    pub rate_mid: f64,
    pub rate_high: f64,
    pub delta_low: f64,
    pub delta_mid: f64,
    pub delta_high: f64,
    pub prio_low: u8,
    pub prio_mid: u8,
    pub prio_high: u8,
    pub ambient: f64,
    pub recovery: f64,
    pub hyst: f64,
    pub range_cool: TempRange,
    pub range_heat: TempRange,
}

impl Config {
    pub fn rate(&self, speed: FanSpeed) -> f64 {
        match speed {
            FanSpeed::Low => self.rate_low,
            FanSpeed::Mid => self.rate_mid,
            FanSpeed::High => self.rate_high,
        }
    }

    pub fn delta(&self, speed: FanSpeed) -> f64 {
        match speed {
            FanSpeed::Low => self.delta_low,
            FanSpeed::Mid => self.delta_mid,
            FanSpeed::High => self.delta_high,
        }
    }

    pub fn prio(&self, speed: FanSpeed) -> u8 {
        match speed {
            FanSpeed::Low => self.prio_low,
            FanSpeed::Mid => self.prio_mid,
            FanSpeed::High => self.prio_high,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Max simultaneously serving rooms (K)
    #[arg(long, default_value_t = 3)]
    pub capacity: usize,
    /// Dispatcher + simulator tick period, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub tick_ms: u64,
    /// Round-robin time-slice for equal-priority waiters, in seconds
    #[arg(long, default_value_t = 120)]
    pub slice_secs: u64,
    #[arg(long, default_value_t = 1.0 / 3.0)]
    pub rate_low: f64,
    #[arg(long, default_value_t = 0.5)]
    pub rate_mid: f64,
    #[arg(long, default_value_t = 1.0)]
    pub rate_high: f64,
    #[arg(long, default_value_t = 1.0 / 3.0)]
    pub delta_low: f64,
    #[arg(long, default_value_t = 0.5)]
    pub delta_mid: f64,
    #[arg(long, default_value_t = 1.0)]
    pub delta_high: f64,
    #[arg(long, default_value_t = 20.0)]
    pub ambient: f64,
    #[arg(long, default_value_t = 0.5)]
    pub recovery: f64,
    #[arg(long, default_value_t = 1.0)]
    pub hyst: f64,
    #[arg(long, default_value_t = 18.0)]
    pub range_cool_min: f64,
    #[arg(long, default_value_t = 25.0)]
    pub range_cool_max: f64,
    #[arg(long, default_value_t = 25.0)]
    pub range_heat_min: f64,
    #[arg(long, default_value_t = 30.0)]
    pub range_heat_max: f64,
    /// Number of rooms to create on first run if the store is empty
    #[arg(long, default_value_t = 5)]
    pub room_count: usize,
}

impl Cli {
    pub fn build_config(self) -> Config {
        Config {
            capacity: self.capacity,
            tick: Duration::from_millis(self.tick_ms),
            slice: Duration::from_secs(self.slice_secs),
            rate_low: self.rate_low,
            rate_mid: self.rate_mid,
            rate_high: self.rate_high,
            delta_low: self.delta_low,
            delta_mid: self.delta_mid,
            delta_high: self.delta_high,
            prio_low: 1,
            prio_mid: 2,
            prio_high: 3,
            ambient: self.ambient,
            recovery: self.recovery,
            hyst: self.hyst,
            range_cool: TempRange::new(self.range_cool_min, self.range_cool_max),
            range_heat: TempRange::new(self.range_heat_min, self.range_heat_max),
        }
    }
}

/// A config matching the worked examples in the design (K=3, SLICE=120s,
/// TICK=1s); used by the test suite and available to integration tests.
pub fn test_config() -> Config {
    Config {
        capacity: 3,
        tick: Duration::from_secs(1),
        slice: Duration::from_secs(120),
        rate_low: 1.0 / 3.0,
        rate_mid: 0.5,
        rate_high: 1.0,
        delta_low: 1.0 / 3.0,
        delta_mid: 0.5,
        delta_high: 1.0,
        prio_low: 1,
        prio_mid: 2,
        prio_high: 3,
        ambient: 20.0,
        recovery: 0.5,
        hyst: 1.0,
        range_cool: TempRange::new(18.0, 25.0),
        range_heat: TempRange::new(25.0, 30.0),
    }
}
