//! Shared value types: the ASDU type identifiers this crate speaks, the
//! causes of transmission it recognizes, and the measurement values that
//! flow through the point registry.

use std::time::SystemTime;

/// ASDU type identification, restricted to the subset this crate
/// implements (single point, short float, single command, short float
/// setpoint command, and general interrogation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeId {
    /// M_SP_NA_1 - single point information.
    SinglePoint,
    /// M_ME_NC_1 - measured value, short floating point.
    ShortFloat,
    /// C_SC_NA_1 - single command.
    SingleCommand,
    /// C_SE_NC_1 - short float setpoint command.
    SetpointCommand,
    /// C_IC_NA_1 - general interrogation command.
    Interrogation,
}

impl TypeId {
    pub fn as_raw(&self) -> u8 {
        match self {
            TypeId::SinglePoint => 1,
            TypeId::ShortFloat => 13,
            TypeId::SingleCommand => 45,
            TypeId::SetpointCommand => 50,
            TypeId::Interrogation => 100,
        }
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(TypeId::SinglePoint),
            13 => Some(TypeId::ShortFloat),
            45 => Some(TypeId::SingleCommand),
            50 => Some(TypeId::SetpointCommand),
            100 => Some(TypeId::Interrogation),
            _ => None,
        }
    }

    /// True for the two monitor-direction types the registry can hold.
    pub fn is_measurement(&self) -> bool {
        matches!(self, TypeId::SinglePoint | TypeId::ShortFloat)
    }
}

/// Cause of transmission, restricted to the values this crate emits or
/// accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cot {
    /// 6 - act: a command requesting activation.
    Activation,
    /// 7 - actcon: positive activation confirmation.
    ActivationConfirm,
    /// 20 - inrogen: response to a general interrogation.
    Interrogated,
    /// 47 - unknown IOA: negative confirmation, the addressed point does
    /// not exist.
    UnknownIoa,
}

impl Cot {
    pub fn as_raw(&self) -> u8 {
        match self {
            Cot::Activation => 6,
            Cot::ActivationConfirm => 7,
            Cot::Interrogated => 20,
            Cot::UnknownIoa => 47,
        }
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            6 => Some(Cot::Activation),
            7 => Some(Cot::ActivationConfirm),
            20 => Some(Cot::Interrogated),
            47 => Some(Cot::UnknownIoa),
            _ => None,
        }
    }

    /// Human-readable name, for diagnostics only. Never used to make a
    /// wire decision.
    pub fn name(&self) -> &'static str {
        match self {
            Cot::Activation => "activation",
            Cot::ActivationConfirm => "activation confirmation",
            Cot::Interrogated => "interrogated by station",
            Cot::UnknownIoa => "unknown information object address",
        }
    }
}

/// Quality descriptor attached to a measurement. This crate only ever
/// produces `Good`; `Invalid` is kept so a consumer decoding arbitrary
/// wire bytes can represent a bit it does not trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Good,
    Invalid,
}

/// A measurement value, tagged by which of the two monitor-direction
/// types it carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Bool(bool),
    Float32(f32),
}

impl Measurement {
    pub fn type_id(&self) -> TypeId {
        match self {
            Measurement::Bool(_) => TypeId::SinglePoint,
            Measurement::Float32(_) => TypeId::ShortFloat,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Measurement::Bool(b) => Some(*b),
            Measurement::Float32(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Measurement::Float32(f) => Some(*f),
            Measurement::Bool(_) => None,
        }
    }
}

/// A registered point's current value, quality and the instant it was
/// last updated.
#[derive(Debug, Clone, Copy)]
pub struct Point {
    pub ioa: u32,
    pub value: Measurement,
    pub quality: Quality,
    pub updated_at: SystemTime,
}

impl Point {
    pub fn new(ioa: u32, value: Measurement) -> Self {
        Point {
            ioa,
            value,
            quality: Quality::Good,
            updated_at: SystemTime::now(),
        }
    }
}
