//! Point registry: a typed table of IOA -> measurement, plus the set
//! of command IOAs peers may write to. The simulator holds the write
//! lock briefly once per tick; the dispatcher takes the read lock to
//! answer a General Interrogation.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::Error;
use crate::types::{Measurement, Point, Quality, TypeId};

/// A registered command IOA: the TypeID it accepts and the IOA of the
/// measurement point it mirrors into.
#[derive(Debug, Clone, Copy)]
struct Command {
    type_id: TypeId,
    measurement_ioa: u32,
}

pub struct Registry {
    measurements: RwLock<BTreeMap<u32, Point>>,
    commands: RwLock<BTreeMap<u32, Command>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            measurements: RwLock::new(BTreeMap::new()),
            commands: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a measurement point at server init. Panics on a
    /// duplicate registration, which is a programming error in the
    /// server binary wiring up its point set, not a runtime condition.
    pub fn register_measurement(&self, ioa: u32, value: Measurement) {
        let mut points = self.measurements.write().unwrap_or_else(|e| e.into_inner());
        if points.insert(ioa, Point::new(ioa, value)).is_some() {
            panic!("duplicate measurement registration for IOA {}", ioa);
        }
    }

    /// Register a command IOA accepting `type_id`, mirroring writes
    /// into `measurement_ioa`.
    pub fn register_command(&self, ioa: u32, type_id: TypeId, measurement_ioa: u32) {
        let mut commands = self.commands.write().unwrap_or_else(|e| e.into_inner());
        if commands
            .insert(
                ioa,
                Command {
                    type_id,
                    measurement_ioa,
                },
            )
            .is_some()
        {
            panic!("duplicate command registration for IOA {}", ioa);
        }
    }

    /// Read the current value of a measurement point.
    pub fn read(&self, ioa: u32) -> Result<Point, Error> {
        let points = self.measurements.read().map_err(|_| Error::Lock)?;
        points.get(&ioa).copied().ok_or(Error::UnknownIoa { ioa })
    }

    /// Overwrite a measurement point's value. Used by the simulator
    /// tick; the dispatcher never calls this directly.
    pub fn write_measurement(&self, ioa: u32, value: Measurement) -> Result<(), Error> {
        let mut points = self.measurements.write().map_err(|_| Error::Lock)?;
        match points.get_mut(&ioa) {
            Some(point) => {
                point.value = value;
                point.quality = Quality::Good;
                point.updated_at = std::time::SystemTime::now();
                Ok(())
            }
            None => Err(Error::UnknownIoa { ioa }),
        }
    }

    /// Apply a command arriving from a peer: validate the IOA is
    /// registered and its declared TypeID matches, then mirror the
    /// value into the corresponding measurement point.
    pub fn apply_command(&self, ioa: u32, type_id: TypeId, value: Measurement) -> Result<(), Error> {
        let measurement_ioa = {
            let commands = self.commands.read().map_err(|_| Error::Lock)?;
            let cmd = commands.get(&ioa).ok_or(Error::UnknownIoa { ioa })?;
            if cmd.type_id != type_id {
                return Err(Error::TypeMismatch {
                    ioa,
                    expected: cmd.type_id,
                    got: type_id,
                });
            }
            cmd.measurement_ioa
        };
        self.write_measurement(measurement_ioa, value)
    }

    /// A snapshot of every measurement point, ordered Bool IOAs
    /// ascending first, then Float IOAs ascending, matching the
    /// General Interrogation burst order.
    pub fn interrogation_snapshot(&self) -> Result<Vec<Point>, Error> {
        let points = self.measurements.read().map_err(|_| Error::Lock)?;
        let mut bools: Vec<Point> = Vec::new();
        let mut floats: Vec<Point> = Vec::new();
        for point in points.values() {
            match point.value {
                Measurement::Bool(_) => bools.push(*point),
                Measurement::Float32(_) => floats.push(*point),
            }
        }
        bools.extend(floats);
        Ok(bools)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_command_mirrors_into_measurement() {
        let reg = Registry::new();
        reg.register_measurement(1100, Measurement::Bool(false));
        reg.register_command(15100, TypeId::SingleCommand, 1100);

        reg.apply_command(15100, TypeId::SingleCommand, Measurement::Bool(true))
            .unwrap();

        let point = reg.read(1100).unwrap();
        assert_eq!(point.value.as_bool(), Some(true));
    }

    #[test]
    fn unknown_command_ioa_is_rejected() {
        let reg = Registry::new();
        let err = reg
            .apply_command(99999, TypeId::SingleCommand, Measurement::Bool(true))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownIoa { ioa: 99999 }));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let reg = Registry::new();
        reg.register_measurement(10010, Measurement::Float32(0.0));
        reg.register_command(15100, TypeId::SetpointCommand, 10010);

        let err = reg
            .apply_command(15100, TypeId::SingleCommand, Measurement::Bool(true))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn interrogation_snapshot_orders_bools_then_floats() {
        let reg = Registry::new();
        reg.register_measurement(10011, Measurement::Float32(1.0));
        reg.register_measurement(1101, Measurement::Bool(false));
        reg.register_measurement(10010, Measurement::Float32(2.0));
        reg.register_measurement(1100, Measurement::Bool(true));

        let snapshot = reg.interrogation_snapshot().unwrap();
        let ioas: Vec<u32> = snapshot.iter().map(|p| p.ioa).collect();
        assert_eq!(ioas, vec![1100, 1101, 10010, 10011]);
    }
}
