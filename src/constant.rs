//! Wire-level constants: APCI control bytes, the fixed start byte, and
//! the hydropower point-set IOA map.

/// Every APDU begins with this byte.
pub const START: u8 = 0x68;

// U-format control field, first octet (byte 2 of the APCI). The
// remaining three control octets of a U-format APDU are always zero.
pub const STARTDT_ACT: u8 = 0x07;
pub const STARTDT_CON: u8 = 0x0B;
pub const STOPDT_ACT: u8 = 0x13;
pub const STOPDT_CON: u8 = 0x23;

/// Offset added to a measurement IOA to obtain the IOA a corresponding
/// command addresses, per the informative IOA map below.
pub const SET_POINT_OFFSET: u32 = 14000;

/// The fixed hydropower point set this crate's server and simulator
/// operate on: seven boolean points (1100..1106) and four float points
/// (10010..10013), matching the informative IOA map. These are real,
/// used constants rather than documentation: a server binary wires up
/// its registry from exactly these IOAs.
pub mod hydropower {
    // Single point measurements, 1100..1106.
    pub const SP_WATER_INLET: u32 = 1100;
    pub const SP_EXCITER: u32 = 1101;
    pub const SP_TRANSFORMER: u32 = 1102;
    pub const SP_GRID: u32 = 1103;
    pub const SP_COOLING: u32 = 1104;
    pub const SP_START: u32 = 1105;
    pub const SP_SHUTDOWN: u32 = 1106;

    pub const SINGLE_POINTS: [u32; 7] = [
        SP_WATER_INLET,
        SP_EXCITER,
        SP_TRANSFORMER,
        SP_GRID,
        SP_COOLING,
        SP_START,
        SP_SHUTDOWN,
    ];

    // Measured values (short float), 10010..10013.
    pub const ANA_TURBINE_RPM: u32 = 10010;
    pub const ANA_GENERATOR_VOLTAGE: u32 = 10011;
    pub const ANA_GRID_POWER: u32 = 10012;
    pub const ANA_BEARING_TEMP: u32 = 10013;

    pub const FLOAT_POINTS: [u32; 4] = [
        ANA_TURBINE_RPM,
        ANA_GENERATOR_VOLTAGE,
        ANA_GRID_POWER,
        ANA_BEARING_TEMP,
    ];

    /// Ambient temperature the plant's bearing cools toward, and the
    /// value it is registered at on server start.
    pub const AMBIENT_TEMPERATURE_C: f32 = 15.0;

    // Command IOAs, 15100..15106. Each equals its target single-point
    // IOA plus `SET_POINT_OFFSET`.
    pub const CMD_WATER_INLET: u32 = super::SET_POINT_OFFSET + SP_WATER_INLET;
    pub const CMD_EXCITER: u32 = super::SET_POINT_OFFSET + SP_EXCITER;
    pub const CMD_TRANSFORMER: u32 = super::SET_POINT_OFFSET + SP_TRANSFORMER;
    pub const CMD_GRID: u32 = super::SET_POINT_OFFSET + SP_GRID;
    pub const CMD_COOLING: u32 = super::SET_POINT_OFFSET + SP_COOLING;
    pub const CMD_START: u32 = super::SET_POINT_OFFSET + SP_START;
    pub const CMD_SHUTDOWN: u32 = super::SET_POINT_OFFSET + SP_SHUTDOWN;
}
