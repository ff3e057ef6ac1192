//! Hydropower process simulator: a time-stepped plant model (water
//! inlet -> turbine -> exciter -> transformer -> grid breaker) coupled
//! to thermal and cooling dynamics, with fault latching. One tick per
//! second; owned exclusively by the simulator thread.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::constant::hydropower::*;
use crate::registry::Registry;
use crate::types::Measurement;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

const MAX_WATER_SPEED: f32 = 5.0;
const MAX_TURBINE_SPEED: f32 = 250.0;
const PROD_VOLTAGE_MIDPOINT: f32 = 3300.0;
const PROD_VOLTAGE_LOW: f32 = 2500.0;
const GRID_POWER_ADJUSTMENT_INTERVAL: Duration = Duration::from_secs(120);
const GRID_POWER_FLUCTUATION: f32 = 0.4;
const GRID_POWER_MIDPOINT: f32 = 1305.0;
const ADJUSTMENT_FACTOR: f32 = 30.0;
const TEMPERATURE_ENV: f32 = AMBIENT_TEMPERATURE_C;
const TEMPERATURE_START_COOLING: f32 = 70.0;
const COOLING_FACTOR: f32 = 0.02;
const COOLING_DURATION: Duration = Duration::from_secs(30);
const TEMPERATURE_ERROR: f32 = 110.0;
const ERROR_FLOAT: f32 = 9999.0;

const STARTUP_WATER_INLET_WAIT: Duration = Duration::from_secs(15);
const STARTUP_EXCITER_WAIT: Duration = Duration::from_secs(25);
const STARTUP_TRANSFORMER_WAIT: Duration = Duration::from_secs(3);
const SHUTDOWN_GRID_WAIT: Duration = Duration::from_secs(1);
const SHUTDOWN_EXCITER_WAIT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceKind {
    Startup,
    Shutdown,
}

/// Startup/shutdown expressed as a small state machine advanced on
/// each tick, rather than a dedicated sleeping thread per sequence.
struct PendingSequence {
    kind: SequenceKind,
    step: u8,
    deadline: Instant,
}

pub struct Simulator {
    registry: Arc<Registry>,
    water_speed: f32,
    grid_voltage: f32,
    grid_power_target: f32,
    last_target_update: Instant,
    last_cooling_start: Option<Instant>,
    process_error: bool,
    pending: Option<PendingSequence>,
}

impl Simulator {
    /// `registry` must already have the hydropower point set
    /// registered (see `server::register_hydropower_points`).
    pub fn new(registry: Arc<Registry>) -> Self {
        Simulator {
            registry,
            water_speed: 0.0,
            grid_voltage: GRID_POWER_MIDPOINT,
            grid_power_target: GRID_POWER_MIDPOINT,
            last_target_update: Instant::now(),
            last_cooling_start: None,
            process_error: false,
            pending: None,
        }
    }

    fn read_bool(&self, ioa: u32) -> bool {
        self.registry
            .read(ioa)
            .ok()
            .and_then(|p| p.value.as_bool())
            .unwrap_or(false)
    }

    fn read_float(&self, ioa: u32) -> f32 {
        self.registry
            .read(ioa)
            .ok()
            .and_then(|p| p.value.as_f32())
            .unwrap_or(0.0)
    }

    fn write_bool(&self, ioa: u32, value: bool) {
        if let Err(e) = self.registry.write_measurement(ioa, Measurement::Bool(value)) {
            log::warn!("simulator write to IOA {} failed: {}", ioa, e);
        }
    }

    fn write_float(&self, ioa: u32, value: f32) {
        if let Err(e) = self
            .registry
            .write_measurement(ioa, Measurement::Float32(value))
        {
            log::warn!("simulator write to IOA {} failed: {}", ioa, e);
        }
    }

    /// Advance the plant model by one second. Call once per tick from
    /// the server's simulator thread.
    pub fn tick(&mut self, rng: &mut impl Rng) {
        self.maybe_spawn_sequence();
        self.advance_pending_sequence();

        self.update_water_speed();
        self.update_grid_voltage(rng);
        let turbine = self.calculate_turbine_speed();
        self.write_float(ANA_TURBINE_RPM, turbine);
        let generator_voltage = self.update_generator_voltage(turbine, rng);
        self.write_float(ANA_GENERATOR_VOLTAGE, generator_voltage);
        self.update_grid_power_target(rng);
        let grid_power = self.update_grid_power(generator_voltage);
        self.write_float(ANA_GRID_POWER, grid_power);
        let bearing_temp = self.update_bearing_temperature(turbine, grid_power);
        self.write_float(ANA_BEARING_TEMP, bearing_temp);
        let cooling = self.manage_cooling_system(bearing_temp);
        self.write_bool(SP_COOLING, cooling);

        if self.process_error {
            log::warn!("process error latched, reporting sentinel values");
            self.latch_error_values();
        }
    }

    fn maybe_spawn_sequence(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let start = self.read_bool(SP_START);
        let shutdown = self.read_bool(SP_SHUTDOWN);
        if start && !shutdown {
            self.write_bool(SP_WATER_INLET, true);
            self.pending = Some(PendingSequence {
                kind: SequenceKind::Startup,
                step: 1,
                deadline: Instant::now() + STARTUP_WATER_INLET_WAIT,
            });
        } else if shutdown && !start {
            self.write_bool(SP_GRID, false);
            self.write_bool(SP_TRANSFORMER, false);
            self.pending = Some(PendingSequence {
                kind: SequenceKind::Shutdown,
                step: 1,
                deadline: Instant::now() + SHUTDOWN_GRID_WAIT,
            });
        }
    }

    fn advance_pending_sequence(&mut self) {
        let now = Instant::now();
        let ready = matches!(&self.pending, Some(seq) if now >= seq.deadline);
        if !ready {
            return;
        }
        let seq = self.pending.take().expect("checked Some above");
        match (seq.kind, seq.step) {
            (SequenceKind::Startup, 1) => {
                self.write_bool(SP_EXCITER, true);
                self.pending = Some(PendingSequence {
                    kind: SequenceKind::Startup,
                    step: 2,
                    deadline: now + STARTUP_EXCITER_WAIT,
                });
            }
            (SequenceKind::Startup, 2) => {
                self.write_bool(SP_TRANSFORMER, true);
                self.pending = Some(PendingSequence {
                    kind: SequenceKind::Startup,
                    step: 3,
                    deadline: now + STARTUP_TRANSFORMER_WAIT,
                });
            }
            (SequenceKind::Startup, _) => {
                self.write_bool(SP_GRID, true);
                self.write_bool(SP_START, false);
            }
            (SequenceKind::Shutdown, 1) => {
                self.write_bool(SP_EXCITER, false);
                self.pending = Some(PendingSequence {
                    kind: SequenceKind::Shutdown,
                    step: 2,
                    deadline: now + SHUTDOWN_EXCITER_WAIT,
                });
            }
            (SequenceKind::Shutdown, _) => {
                self.write_bool(SP_WATER_INLET, false);
                self.write_bool(SP_COOLING, false);
                self.write_bool(SP_SHUTDOWN, false);
            }
        }
    }

    fn update_water_speed(&mut self) {
        if self.read_bool(SP_WATER_INLET) {
            self.water_speed = (self.water_speed + 0.15).min(MAX_WATER_SPEED);
        } else {
            self.water_speed = (self.water_speed - 0.15).max(0.0);
        }
    }

    fn calculate_turbine_speed(&self) -> f32 {
        let speed = if self.water_speed <= 0.80 * MAX_WATER_SPEED {
            self.water_speed * (MAX_TURBINE_SPEED / MAX_WATER_SPEED)
        } else {
            self.read_float(ANA_TURBINE_RPM) + 3.0
        };
        speed.min(MAX_TURBINE_SPEED)
    }

    fn update_generator_voltage(&mut self, turbine: f32, rng: &mut impl Rng) -> f32 {
        let mut generator_voltage = if !self.read_bool(SP_EXCITER) {
            0.0
        } else {
            let proportion = turbine / MAX_TURBINE_SPEED;
            let base_voltage = proportion * PROD_VOLTAGE_MIDPOINT;
            let fluctuation = rng.gen_range(-0.05f32..=0.05f32);
            base_voltage * (1.0 + fluctuation)
        };

        if self.read_bool(SP_GRID) {
            if generator_voltage < PROD_VOLTAGE_LOW {
                self.process_error = true;
            } else {
                generator_voltage = self.grid_voltage;
            }
        }
        generator_voltage
    }

    fn update_grid_voltage(&mut self, rng: &mut impl Rng) {
        let fluctuation = rng.gen_range(-0.03f32..=0.03f32);
        self.grid_voltage = (PROD_VOLTAGE_MIDPOINT * (1.0 + fluctuation)) as i32 as f32;
    }

    fn update_grid_power_target(&mut self, rng: &mut impl Rng) {
        if self.last_target_update.elapsed() >= GRID_POWER_ADJUSTMENT_INTERVAL {
            let fluctuation = GRID_POWER_MIDPOINT * GRID_POWER_FLUCTUATION;
            self.grid_power_target = GRID_POWER_MIDPOINT + rng.gen_range(-fluctuation..=fluctuation);
            self.last_target_update = Instant::now();
        }
    }

    fn update_grid_power(&self, generator_voltage: f32) -> f32 {
        let transformer = self.read_bool(SP_TRANSFORMER);
        let grid = self.read_bool(SP_GRID);
        if !transformer || !grid || generator_voltage < PROD_VOLTAGE_MIDPOINT * 0.8 {
            return 0.0;
        }
        let prev = self.read_float(ANA_GRID_POWER);
        if prev == 0.0 {
            let step = (self.grid_power_target - GRID_POWER_MIDPOINT) / ADJUSTMENT_FACTOR;
            GRID_POWER_MIDPOINT + step
        } else {
            let step = (self.grid_power_target - prev) / ADJUSTMENT_FACTOR;
            prev + step
        }
    }

    fn update_bearing_temperature(&mut self, turbine: f32, grid_power: f32) -> f32 {
        let prev = self.read_float(ANA_BEARING_TEMP);
        let mut bearing_temp = if turbine > 0.0 {
            let grid_load_factor = grid_power / GRID_POWER_MIDPOINT;
            let grid_load = 0.5 + grid_load_factor * grid_load_factor;
            let increment_rate = (turbine / MAX_TURBINE_SPEED) * 0.5 * grid_load;
            prev + increment_rate
        } else {
            let decrease = prev * COOLING_FACTOR;
            (prev - decrease).max(TEMPERATURE_ENV)
        };

        // An active cooling system always recomputes the decay from
        // the previous tick's value, discarding whatever the
        // turbine-load branch above just computed.
        if self.read_bool(SP_COOLING) {
            let decrease = prev * COOLING_FACTOR;
            bearing_temp = (prev - decrease).max(TEMPERATURE_ENV);
        }

        if bearing_temp > TEMPERATURE_ERROR {
            self.process_error = true;
        }
        bearing_temp
    }

    fn manage_cooling_system(&mut self, bearing_temp: f32) -> bool {
        let now = Instant::now();
        let cooling_active_duration = self
            .last_cooling_start
            .map(|t| now.duration_since(t))
            .unwrap_or(Duration::ZERO);
        let current = self.read_bool(SP_COOLING);

        if bearing_temp > TEMPERATURE_START_COOLING {
            if self.last_cooling_start.is_none() || cooling_active_duration >= COOLING_DURATION {
                self.last_cooling_start = Some(now);
                true
            } else {
                current
            }
        } else if cooling_active_duration > COOLING_DURATION {
            self.last_cooling_start = None;
            false
        } else {
            current
        }
    }

    fn latch_error_values(&self) {
        for &ioa in FLOAT_POINTS.iter() {
            self.write_float(ioa, ERROR_FLOAT);
        }
        for &ioa in SINGLE_POINTS.iter() {
            self.write_bool(ioa, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fresh_registry() -> Arc<Registry> {
        let registry = Arc::new(Registry::new());
        crate::server::register_hydropower_points(&registry);
        registry
    }

    #[test]
    fn fresh_tick_keeps_everything_at_rest() {
        let registry = fresh_registry();
        let mut sim = Simulator::new(registry.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        sim.tick(&mut rng);

        assert_eq!(registry.read(ANA_TURBINE_RPM).unwrap().value.as_f32(), Some(0.0));
        assert_eq!(registry.read(ANA_BEARING_TEMP).unwrap().value.as_f32(), Some(TEMPERATURE_ENV));
        assert_eq!(registry.read(SP_WATER_INLET).unwrap().value.as_bool(), Some(false));
    }

    #[test]
    fn starting_process_opens_the_water_inlet_immediately() {
        let registry = fresh_registry();
        registry.write_measurement(SP_START, Measurement::Bool(true)).unwrap();
        let mut sim = Simulator::new(registry.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        sim.tick(&mut rng);

        assert_eq!(registry.read(SP_WATER_INLET).unwrap().value.as_bool(), Some(true));
        // exciter only switches on after the 15s startup wait.
        assert_eq!(registry.read(SP_EXCITER).unwrap().value.as_bool(), Some(false));
    }

    #[test]
    fn high_bearing_temperature_latches_process_error() {
        let registry = fresh_registry();
        registry
            .write_measurement(ANA_BEARING_TEMP, Measurement::Float32(120.0))
            .unwrap();
        let mut sim = Simulator::new(registry.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        sim.tick(&mut rng);

        assert_eq!(registry.read(ANA_BEARING_TEMP).unwrap().value.as_f32(), Some(ERROR_FLOAT));
        assert_eq!(registry.read(SP_WATER_INLET).unwrap().value.as_bool(), Some(true));
    }
}
